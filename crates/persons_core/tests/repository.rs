mod common;

use common::bulk_persons;
use persons_core::db::open_db_in_memory;
use persons_core::model::{City, EntityKind, Person, PhoneNumber, PhoneNumberType, Relationship, RelationshipType};
use persons_core::repo::{EntryState, Filter, ListQuery, OrderBy, Page, RepoError, UnitOfWork};
use tokio_util::sync::CancellationToken;

fn uow() -> UnitOfWork {
    UnitOfWork::try_new(open_db_in_memory().unwrap()).unwrap()
}

#[test]
fn get_by_id_loads_scalars_without_relations() {
    let mut uow = uow();
    let cancel = CancellationToken::new();

    let person = uow
        .repository()
        .get_by_id::<Person>(1, &cancel)
        .unwrap()
        .unwrap();

    assert_eq!(person.name, "Alex");
    assert_eq!(person.personal_number, "12345678901");
    assert!(person.city.is_none());
    assert!(person.phone_numbers.is_empty());
    assert!(uow.repository().get_by_id::<Person>(99, &cancel).unwrap().is_none());
}

#[test]
fn get_by_id_with_includes_populates_every_relation() {
    let mut uow = uow();
    let cancel = CancellationToken::new();

    let person = uow
        .repository()
        .get_by_id_with_includes::<Person>(1, &cancel)
        .unwrap()
        .unwrap();

    assert_eq!(person.city.as_ref().map(|city| city.name.as_str()), Some("Tbilisi"));
    assert_eq!(person.phone_numbers.len(), 1);
    assert_eq!(person.phone_numbers[0].number, "5551234");
    assert_eq!(person.relationships.len(), 1);
    assert_eq!(person.relationships[0].related_person_id, 2);
}

#[test]
fn includes_match_storage_rows_without_duplicates() {
    let mut uow = uow();
    let cancel = CancellationToken::new();
    let mut repo = uow.repository();
    repo.add(PhoneNumber::new(PhoneNumberType::Office, "5550001", 1));
    repo.add(PhoneNumber::new(PhoneNumberType::Home, "5550002", 1));
    repo.add(Relationship::new(RelationshipType::Relative, 1, 3));
    uow.commit(&cancel).unwrap();

    let person = uow
        .repository()
        .get_by_id_with_includes::<Person>(1, &cancel)
        .unwrap()
        .unwrap();

    let numbers: Vec<&str> = person.phone_numbers.iter().map(|phone| phone.number.as_str()).collect();
    assert_eq!(numbers, ["5551234", "5550001", "5550002"]);
    let related: Vec<i64> = person
        .relationships
        .iter()
        .map(|relationship| relationship.related_person_id)
        .collect();
    assert_eq!(related, [2, 3]);
}

#[test]
fn to_one_relations_load_on_dependent_entities() {
    let mut uow = uow();
    let cancel = CancellationToken::new();

    let relationship = uow
        .repository()
        .get_by_id_with_includes::<Relationship>(1, &cancel)
        .unwrap()
        .unwrap();

    assert_eq!(relationship.person.as_ref().map(|person| person.id), Some(1));
    assert_eq!(relationship.related_person.as_ref().map(|person| person.id), Some(2));
    assert!(relationship.related_person.unwrap().phone_numbers.is_empty());
}

#[test]
fn find_list_filters_orders_and_pages() {
    let mut uow = uow();
    let cancel = CancellationToken::new();

    let query = ListQuery::filtered(Filter::new().contains("personal_number", "1234567890"))
        .ordered_by(OrderBy::desc("date_of_birth"))
        .paged(Page::new(1, 2));
    let persons = uow
        .repository()
        .find_list_with_includes::<Person>(&query, &cancel)
        .unwrap();

    let names: Vec<&str> = persons.iter().map(|person| person.name.as_str()).collect();
    assert_eq!(names, ["Sophia", "Alex"]);
    assert!(persons.iter().all(|person| person.city.is_some()));

    let second_page = uow
        .repository()
        .find_list_with_includes::<Person>(&query.clone().paged(Page::new(2, 2)), &cancel)
        .unwrap();
    let names: Vec<&str> = second_page.iter().map(|person| person.name.as_str()).collect();
    assert_eq!(names, ["Maria", "Ivan"]);
}

#[test]
fn contains_filter_treats_wildcards_literally() {
    let mut uow = uow();
    let cancel = CancellationToken::new();

    let persons = uow
        .repository()
        .find_list_with_includes::<Person>(&ListQuery::filtered(Filter::new().contains("name", "%")), &cancel)
        .unwrap();

    assert!(persons.is_empty());
}

#[test]
fn unknown_filter_column_is_rejected() {
    let mut uow = uow();
    let cancel = CancellationToken::new();

    let err = uow
        .repository()
        .find_list_with_includes::<Person>(&ListQuery::filtered(Filter::new().eq("nickname", "x".to_string())), &cancel)
        .unwrap_err();

    assert!(matches!(
        err,
        RepoError::UnknownColumn { kind: EntityKind::Person, ref name } if name == "nickname"
    ));
}

#[test]
fn find_all_returns_every_row_in_id_order() {
    let mut uow = uow();
    let cancel = CancellationToken::new();

    let cities = uow.repository().find_all::<City>(&cancel).unwrap();

    let ids: Vec<i64> = cities.iter().map(|city| city.id).collect();
    assert_eq!(ids, [1, 2, 3, 4]);
}

#[test]
fn single_or_default_loads_named_relations_only() {
    let mut uow = uow();
    let cancel = CancellationToken::new();

    let person = uow
        .repository()
        .single_or_default::<Person>(&Filter::new().eq("personal_number", "12345678902".to_string()), "city, phone_numbers", &cancel)
        .unwrap()
        .unwrap();

    assert_eq!(person.name, "Maria");
    assert_eq!(person.city.map(|city| city.name), Some("Kutaisi".to_string()));
    assert_eq!(person.phone_numbers.len(), 1);
    assert!(person.relationships.is_empty());

    let missing = uow
        .repository()
        .single_or_default::<Person>(&Filter::new().eq("personal_number", "00000000000".to_string()), "", &cancel)
        .unwrap();
    assert!(missing.is_none());
}

#[test]
fn single_or_default_fails_on_multiple_matches() {
    let mut uow = uow();
    let cancel = CancellationToken::new();

    let err = uow
        .repository()
        .single_or_default::<Person>(&Filter::new().eq("gender", persons_core::Gender::Female), "", &cancel)
        .unwrap_err();

    assert!(matches!(
        err,
        RepoError::MultipleResults {
            kind: EntityKind::Person,
            count: 2
        }
    ));
}

#[test]
fn single_or_default_rejects_unknown_relation_names() {
    let mut uow = uow();
    let cancel = CancellationToken::new();

    let err = uow
        .repository()
        .single_or_default::<Person>(&Filter::new().eq("id", 1), "city,friends", &cancel)
        .unwrap_err();

    assert!(matches!(err, RepoError::UnknownRelation { ref name, .. } if name == "friends"));
}

#[test]
fn staging_requires_identity_for_update_and_delete() {
    let mut uow = uow();
    let mut repo = uow.repository();

    let err = repo.update(City::new("Nowhere")).unwrap_err();
    assert!(matches!(err, RepoError::MissingIdentity { kind: EntityKind::City }));

    let mut known = City::new("Gori");
    known.id = 1;
    let err = repo.update_range([known, City::new("Nowhere")]).unwrap_err();
    assert!(matches!(err, RepoError::MissingIdentity { .. }));
    assert!(!uow.has_pending_changes());
}

#[test]
fn delete_attaches_entity_carrying_only_an_id() {
    let mut uow = uow();
    let cancel = CancellationToken::new();

    let mut stub = Relationship::new(RelationshipType::Other, 0, 0);
    stub.id = 4;
    uow.repository().delete(stub).unwrap();
    assert_eq!(uow.commit(&cancel).unwrap(), 1);

    assert!(uow.repository().get_by_id::<Relationship>(4, &cancel).unwrap().is_none());
}

#[test]
fn added_entity_is_tracked_until_flush_assigns_an_id() {
    let mut uow = uow();
    let cancel = CancellationToken::new();

    let staged = uow.repository().add(City::new("Zugdidi"));
    assert_eq!(uow.repository().entry_state(staged), Some(EntryState::Added));
    assert_eq!(uow.entity(staged).map(|city| city.id), Some(0));

    uow.commit(&cancel).unwrap();

    let city = uow.entity(staged).unwrap().clone();
    assert_eq!(city.id, 5);
    assert_eq!(uow.repository().entry_state(staged), Some(EntryState::Unchanged));
    assert_eq!(uow.repository().tracked(staged), Some(&city));
}

#[test]
fn includes_load_for_result_sets_beyond_the_bound_variable_limit() {
    let conn = open_db_in_memory().unwrap();
    bulk_persons(&conn, 40_000);
    let mut uow = UnitOfWork::try_new(conn).unwrap();

    let persons = uow
        .repository()
        .find_list_with_includes::<Person>(&ListQuery::default(), &CancellationToken::new())
        .unwrap();

    assert_eq!(persons.len(), 40_004);
    assert!(persons
        .iter()
        .all(|person| person.phone_numbers.len() == 1 && person.city.is_some()));
    let last = persons.last().unwrap();
    assert_eq!(last.id, 40_004);
    assert_eq!(last.phone_numbers[0].number, "0040004");
    assert_eq!(last.city.as_ref().map(|city| city.id), Some(1));
}
