mod common;

use common::{create_alex, date, Harness};
use persons_core::model::{EntityKind, Gender, PhoneNumberType, RelationshipType};
use persons_core::service::{
    AddRelationship, CreatePerson, DeletePerson, DeleteRelationship, GetPersonById,
    GetRelationshipReport, NewPhoneNumber, NewRelatedIndividual, PhoneNumberChange,
    UpdatePerson, UploadOrChangeImage,
};
use persons_core::{AppError, UnitOfWorkState};
use std::path::Path;

fn phone(number_type: PhoneNumberType, number: &str) -> NewPhoneNumber {
    NewPhoneNumber {
        number_type,
        number: number.to_string(),
    }
}

fn nino_with_two_phones() -> CreatePerson {
    CreatePerson {
        name: "Nino".to_string(),
        surname: "Beridze".to_string(),
        gender: Gender::Female,
        personal_number: "01020304050".to_string(),
        date_of_birth: date(1992, 4, 12),
        city_id: 2,
        phone_numbers: vec![
            phone(PhoneNumberType::Mobile, "5990001"),
            phone(PhoneNumberType::Home, "5990002"),
        ],
        related_individuals: vec![NewRelatedIndividual {
            type_of_connection: RelationshipType::Colleague,
            related_person_id: 1,
        }],
    }
}

fn update_of(id: i64, phone_numbers: Vec<PhoneNumberChange>) -> UpdatePerson {
    UpdatePerson {
        id,
        name: "Nino".to_string(),
        surname: "Kapanadze".to_string(),
        gender: Gender::Female,
        personal_number: "01020304050".to_string(),
        date_of_birth: date(1992, 4, 12),
        city_id: 3,
        phone_numbers,
    }
}

#[test]
fn created_person_reads_back_with_phone_and_city() {
    let harness = Harness::without_persons();

    let created = harness.run(create_alex("12345678901")).unwrap();
    assert!(created.id > 0);
    assert_eq!(created.created_at, created.updated_at);

    let loaded = harness.run(GetPersonById { id: created.id }).unwrap();
    assert_eq!(loaded.first_name, "Alex");
    assert_eq!(loaded.phone_numbers.len(), 1);
    assert_eq!(loaded.phone_numbers[0].number, "5551234");
    assert_eq!(loaded.city.as_ref().map(|city| city.id), Some(1));
}

#[test]
fn create_writes_related_individuals_in_the_same_transaction() {
    let harness = Harness::seeded();

    let created = harness.run(nino_with_two_phones()).unwrap();

    assert_eq!(created.phone_numbers.len(), 2);
    assert_eq!(created.relationships.len(), 1);
    assert_eq!(created.relationships[0].related_person_id, 1);
    assert_eq!(created.city.map(|city| city.name), Some("Kutaisi".to_string()));
    assert_eq!(harness.count("relationships"), 5);
}

#[test]
fn duplicate_personal_number_is_a_conflict_and_writes_nothing() {
    let harness = Harness::seeded();

    let err = harness.run(create_alex("12345678901")).unwrap_err();

    assert_eq!(err.code(), "conflict");
    assert_eq!(harness.count("persons"), 4);
    assert_eq!(harness.count("phone_numbers"), 4);
}

#[test]
fn failing_child_write_rolls_back_the_whole_aggregate() {
    let harness = Harness::seeded();
    let mut request = nino_with_two_phones();
    request.related_individuals[0].related_person_id = 999;

    let err = harness.run(request).unwrap_err();

    assert!(matches!(
        err,
        AppError::OperationFailure {
            code: "create_person_failed",
            ..
        }
    ));
    assert!(err.to_string().starts_with("Failed to create a new person"));
    assert_eq!(harness.count("persons"), 4);
    assert_eq!(harness.count("phone_numbers"), 4);
    assert_eq!(harness.count("relationships"), 4);
}

#[test]
fn relating_a_new_person_to_itself_rolls_back() {
    let harness = Harness::without_persons();
    let mut request = create_alex("12345678901");
    // Seeded persons keep their ids reserved, so the next person is 5.
    request.related_individuals.push(NewRelatedIndividual {
        type_of_connection: RelationshipType::Relative,
        related_person_id: 5,
    });

    let AppError::Validation(errors) = harness.run(request).unwrap_err() else {
        panic!("expected validation failure");
    };

    assert_eq!(errors[0].field, "relatedIndividuals");
    assert_eq!(harness.count("persons"), 0);
    assert_eq!(harness.count("relationships"), 0);
}

#[test]
fn invalid_request_never_reaches_storage() {
    let harness = Harness::seeded();
    let request = CreatePerson {
        name: "Alex1".to_string(),
        surname: "J".to_string(),
        gender: Gender::Male,
        personal_number: "123".to_string(),
        date_of_birth: chrono::Utc::now().date_naive(),
        city_id: 0,
        phone_numbers: vec![phone(PhoneNumberType::Mobile, "55")],
        related_individuals: Vec::new(),
    };

    let AppError::Validation(errors) = harness.run(request).unwrap_err() else {
        panic!("expected validation failure");
    };

    let fields: Vec<&str> = errors.iter().map(|error| error.field.as_str()).collect();
    for expected in [
        "name",
        "surname",
        "personalNumber",
        "dateOfBirth",
        "cityId",
        "phoneNumbers[0].number",
    ] {
        assert!(fields.contains(&expected), "missing error for {expected}");
    }
    assert_eq!(harness.count("persons"), 4);
}

#[test]
fn update_reconciles_phone_numbers_by_identity() {
    let harness = Harness::seeded();
    let created = harness.run(nino_with_two_phones()).unwrap();
    let kept = created.phone_numbers[0].id;
    let dropped = created.phone_numbers[1].id;

    let updated = harness
        .run(update_of(
            created.id,
            vec![
                PhoneNumberChange {
                    id: Some(kept),
                    number_type: PhoneNumberType::Office,
                    number: "5990009".to_string(),
                },
                PhoneNumberChange {
                    id: None,
                    number_type: PhoneNumberType::Mobile,
                    number: "5990003".to_string(),
                },
            ],
        ))
        .unwrap();

    let phones: Vec<(i64, &str)> = updated
        .phone_numbers
        .iter()
        .map(|phone| (phone.id, phone.number.as_str()))
        .collect();
    assert_eq!(phones.len(), 2);
    assert_eq!(phones[0], (kept, "5990009"));
    assert_eq!(updated.phone_numbers[0].number_type, PhoneNumberType::Office);
    assert_eq!(phones[1].1, "5990003");
    assert!(phones.iter().all(|(id, _)| *id != dropped));

    assert_eq!(updated.last_name, "Kapanadze");
    assert_eq!(updated.city_id, 3);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);
    assert_eq!(updated.relationships.len(), 1);
    assert_eq!(harness.count("phone_numbers"), 6);
}

#[test]
fn update_of_missing_person_is_not_found_and_closes_the_transaction() {
    let harness = Harness::seeded();
    let mut uow = harness.store.unit_of_work().unwrap();

    let err = persons_core::dispatch(
        update_of(404, Vec::new()),
        &mut uow,
        &persons_core::HandlerContext::new(&harness.cancel, &harness.files),
    )
    .unwrap_err();

    assert_eq!(
        err,
        AppError::NotFound {
            entity: EntityKind::Person,
            id: 404
        }
    );
    assert_eq!(uow.state(), UnitOfWorkState::Closed);
}

#[test]
fn update_to_taken_personal_number_is_a_conflict() {
    let harness = Harness::seeded();
    let mut request = update_of(2, Vec::new());
    request.personal_number = "12345678901".to_string();

    let err = harness.run(request).unwrap_err();

    assert_eq!(err.code(), "conflict");
    let maria = harness.run(GetPersonById { id: 2 }).unwrap();
    assert_eq!(maria.last_name, "Garcia");
    assert_eq!(maria.phone_numbers.len(), 1);
}

#[test]
fn delete_person_reports_missing_and_restricted_rows() {
    let harness = Harness::seeded();

    assert!(!harness.run(DeletePerson { person_id: 404 }).unwrap());

    let err = harness.run(DeletePerson { person_id: 1 }).unwrap_err();
    assert_eq!(err.code(), "conflict");
    assert_eq!(harness.count("persons"), 4);
    assert_eq!(harness.count("phone_numbers"), 4);
}

#[test]
fn delete_person_cascades_owned_phone_numbers() {
    let harness = Harness::without_persons();
    let created = harness.run(create_alex("12345678901")).unwrap();

    assert!(harness.run(DeletePerson { person_id: created.id }).unwrap());

    assert_eq!(harness.count("persons"), 0);
    assert_eq!(harness.count("phone_numbers"), 0);
}

#[test]
fn add_relationship_checks_both_persons() {
    let harness = Harness::seeded();

    let id = harness
        .run(AddRelationship {
            person_id: 1,
            related_person_id: 3,
            relationship_type: RelationshipType::Relative,
        })
        .unwrap();
    assert_eq!(id, 5);

    let err = harness
        .run(AddRelationship {
            person_id: 2,
            related_person_id: 2,
            relationship_type: RelationshipType::Other,
        })
        .unwrap_err();
    assert_eq!(err.code(), "validation_failed");

    let err = harness
        .run(AddRelationship {
            person_id: 1,
            related_person_id: 40,
            relationship_type: RelationshipType::Other,
        })
        .unwrap_err();
    assert_eq!(
        err,
        AppError::NotFound {
            entity: EntityKind::Person,
            id: 40
        }
    );

    let report = harness.run(GetRelationshipReport { person_id: Some(1) }).unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].type_and_counts.len(), 2);
}

#[test]
fn delete_relationship_is_idempotent() {
    let harness = Harness::seeded();

    assert!(harness.run(DeleteRelationship { relationship_id: 1 }).unwrap());
    assert!(!harness.run(DeleteRelationship { relationship_id: 1 }).unwrap());
    assert_eq!(harness.count("relationships"), 3);
}

#[test]
fn image_upload_replaces_previous_file() {
    let harness = Harness::seeded();

    let first = harness
        .run(UploadOrChangeImage {
            person_id: 1,
            file_name: "portrait.jpg".to_string(),
            bytes: b"first".to_vec(),
        })
        .unwrap();
    assert!(Path::new(&first).exists());
    assert!(first.ends_with(".jpg"));

    let second = harness
        .run(UploadOrChangeImage {
            person_id: 1,
            file_name: "portrait.png".to_string(),
            bytes: b"second".to_vec(),
        })
        .unwrap();

    assert!(!Path::new(&first).exists());
    assert_eq!(std::fs::read(&second).unwrap(), b"second");
    let person = harness.run(GetPersonById { id: 1 }).unwrap();
    assert_eq!(person.image.as_deref(), Some(second.as_str()));
}

#[test]
fn image_upload_for_missing_person_is_not_found() {
    let harness = Harness::seeded();

    let err = harness
        .run(UploadOrChangeImage {
            person_id: 404,
            file_name: "portrait.jpg".to_string(),
            bytes: b"x".to_vec(),
        })
        .unwrap_err();

    assert_eq!(err.code(), "not_found");
    assert_eq!(harness.count("persons"), 4);
}
