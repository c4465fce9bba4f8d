//! Person write handlers.
//!
//! # Responsibility
//! - Create and update a person together with its owned phone numbers as
//!   one atomic write.
//! - Delete persons and replace their image.
//!
//! # Invariants
//! - Compound writes run inside `in_transaction`; callers never observe a
//!   partially written aggregate.
//! - Update reconciles phone numbers by identity and leaves relationships
//!   untouched.

use crate::mapping::PersonResource;
use crate::model::{
    Entity, EntityId, EntityKind, Gender, Person, PhoneNumberType, Relationship, RelationshipType,
};
use crate::repo::{RepoError, Staged, UnitOfWork};
use crate::service::dispatch::{in_transaction, HandlerContext, Request};
use crate::service::error::{AppError, AppResult};
use crate::service::reconcile::reconcile_by_id;
use crate::validation::{FieldError, Rules, Validate};
use chrono::NaiveDate;
use log::warn;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPhoneNumber {
    pub number_type: PhoneNumberType,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRelatedIndividual {
    pub type_of_connection: RelationshipType,
    pub related_person_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePerson {
    pub name: String,
    pub surname: String,
    pub gender: Gender,
    pub personal_number: String,
    pub date_of_birth: NaiveDate,
    pub city_id: EntityId,
    #[serde(default)]
    pub phone_numbers: Vec<NewPhoneNumber>,
    #[serde(default)]
    pub related_individuals: Vec<NewRelatedIndividual>,
}

/// Desired state of one phone number; `id: None` means a new number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumberChange {
    #[serde(default)]
    pub id: Option<EntityId>,
    pub number_type: PhoneNumberType,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePerson {
    pub id: EntityId,
    pub name: String,
    pub surname: String,
    pub gender: Gender,
    pub personal_number: String,
    pub date_of_birth: NaiveDate,
    pub city_id: EntityId,
    #[serde(default)]
    pub phone_numbers: Vec<PhoneNumberChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletePerson {
    pub person_id: EntityId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOrChangeImage {
    pub person_id: EntityId,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

fn person_rules(
    rules: &mut Rules,
    name: &str,
    surname: &str,
    personal_number: &str,
    date_of_birth: NaiveDate,
    city_id: EntityId,
) {
    rules
        .person_name("name", "Name", name)
        .person_name("surname", "Surname", surname)
        .personal_number("personalNumber", personal_number)
        .adult("dateOfBirth", date_of_birth)
        .positive_id("cityId", "City identifier", city_id);
}

impl Validate for CreatePerson {
    fn validate(&self) -> Vec<FieldError> {
        let mut rules = Rules::new();
        person_rules(
            &mut rules,
            &self.name,
            &self.surname,
            &self.personal_number,
            self.date_of_birth,
            self.city_id,
        );
        for (index, phone) in self.phone_numbers.iter().enumerate() {
            rules.phone_number(&format!("phoneNumbers[{index}].number"), &phone.number);
        }
        for (index, related) in self.related_individuals.iter().enumerate() {
            rules.positive_id(
                &format!("relatedIndividuals[{index}].relatedPersonId"),
                "Related person identifier",
                related.related_person_id,
            );
        }
        rules.finish()
    }
}

impl Validate for UpdatePerson {
    fn validate(&self) -> Vec<FieldError> {
        let mut rules = Rules::new();
        rules.positive_id("id", "Person identifier", self.id);
        person_rules(
            &mut rules,
            &self.name,
            &self.surname,
            &self.personal_number,
            self.date_of_birth,
            self.city_id,
        );
        for (index, phone) in self.phone_numbers.iter().enumerate() {
            let field = format!("phoneNumbers[{index}]");
            rules.phone_number(&format!("{field}.number"), &phone.number);
            if let Some(id) = phone.id {
                rules.positive_id(&format!("{field}.id"), "Phone number identifier", id);
            }
        }
        rules.finish()
    }
}

impl Validate for DeletePerson {
    fn validate(&self) -> Vec<FieldError> {
        Rules::new()
            .positive_id("personId", "Person identifier", self.person_id)
            .finish()
    }
}

impl Validate for UploadOrChangeImage {
    fn validate(&self) -> Vec<FieldError> {
        Rules::new()
            .positive_id("personId", "Person identifier", self.person_id)
            .check("fileName", !self.file_name.trim().is_empty(), "File name is required.")
            .check("imageFile", !self.bytes.is_empty(), "The image file is invalid.")
            .finish()
    }
}

/// Reloads the person with every relation inside the current unit of work.
fn load_resource(
    uow: &mut UnitOfWork,
    person_id: EntityId,
    cancel: &CancellationToken,
    fail: impl Fn(RepoError) -> AppError,
) -> AppResult<PersonResource> {
    uow.repository()
        .get_by_id_with_includes::<Person>(person_id, cancel)
        .map_err(fail)?
        .map(PersonResource::from)
        .ok_or(AppError::NotFound {
            entity: EntityKind::Person,
            id: person_id,
        })
}

impl Request for CreatePerson {
    type Response = PersonResource;
    const NAME: &'static str = "create_person";

    fn handle(self, uow: &mut UnitOfWork, ctx: &HandlerContext<'_>) -> AppResult<PersonResource> {
        const CODE: &str = "create_person_failed";
        const ACTION: &str = "Failed to create a new person";
        let cancel = ctx.cancel;
        let fail = |err: RepoError| AppError::from_repo(CODE, ACTION, err);

        in_transaction(uow, cancel, CODE, ACTION, |uow| {
            let staged = uow.repository().add(Person::from(&self));
            uow.commit(cancel).map_err(fail)?;
            let person_id = staged_id(uow, staged, CODE)?;

            let relationships: Vec<Relationship> = self
                .related_individuals
                .iter()
                .map(|related| related.to_entity(person_id))
                .collect();
            if relationships.iter().any(Relationship::is_self_relationship) {
                return Err(AppError::Validation(vec![FieldError::new(
                    "relatedIndividuals",
                    "A person cannot be related to themselves.",
                )]));
            }

            let mut repo = uow.repository();
            for phone in &self.phone_numbers {
                repo.add(phone.to_entity(person_id));
            }
            for relationship in relationships {
                repo.add(relationship);
            }
            uow.commit(cancel).map_err(fail)?;

            load_resource(uow, person_id, cancel, fail)
        })
    }
}

fn staged_id<T: Entity>(uow: &UnitOfWork, staged: Staged<T>, code: &'static str) -> AppResult<EntityId> {
    uow.entity(staged)
        .map(Entity::id)
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::failure(code, format!("{} was not assigned an id", T::KIND)))
}

impl Request for UpdatePerson {
    type Response = PersonResource;
    const NAME: &'static str = "update_person";

    fn handle(self, uow: &mut UnitOfWork, ctx: &HandlerContext<'_>) -> AppResult<PersonResource> {
        const CODE: &str = "update_failed";
        const ACTION: &str = "Failed to update person";
        let cancel = ctx.cancel;
        let fail = |err: RepoError| AppError::from_repo(CODE, ACTION, err);

        in_transaction(uow, cancel, CODE, ACTION, |uow| {
            let mut person = uow
                .repository()
                .get_by_id_with_includes::<Person>(self.id, cancel)
                .map_err(fail)?
                .ok_or(AppError::NotFound {
                    entity: EntityKind::Person,
                    id: self.id,
                })?;

            self.apply_to(&mut person);
            let person_id = person.id;
            let plan = reconcile_by_id(
                std::mem::take(&mut person.phone_numbers),
                &self.phone_numbers,
                |change| change.id,
                PhoneNumberChange::apply_to,
                |change| change.to_entity(person_id),
            );

            let mut repo = uow.repository();
            for phone in plan.removed {
                repo.delete(phone).map_err(fail)?;
            }
            repo.update_range(plan.updated).map_err(fail)?;
            for phone in plan.inserted {
                repo.add(phone);
            }
            repo.update(person.without_relations()).map_err(fail)?;
            uow.commit(cancel).map_err(fail)?;

            load_resource(uow, person_id, cancel, fail)
        })
    }
}

impl Request for DeletePerson {
    type Response = bool;
    const NAME: &'static str = "delete_person";

    fn handle(self, uow: &mut UnitOfWork, ctx: &HandlerContext<'_>) -> AppResult<bool> {
        const CODE: &str = "delete_person_failed";
        const ACTION: &str = "Failed to delete person";
        let fail = |err: RepoError| match err {
            RepoError::ReferentialIntegrity(_) => AppError::Conflict(format!(
                "person {} is still referenced by relationships",
                self.person_id
            )),
            other => AppError::from_repo(CODE, ACTION, other),
        };

        let mut repo = uow.repository();
        let Some(person) = repo
            .get_by_id::<Person>(self.person_id, ctx.cancel)
            .map_err(fail)?
        else {
            return Ok(false);
        };
        repo.delete(person).map_err(fail)?;
        uow.commit(ctx.cancel).map_err(fail)?;
        Ok(true)
    }
}

impl Request for UploadOrChangeImage {
    type Response = String;
    const NAME: &'static str = "upload_or_change_image";

    fn handle(self, uow: &mut UnitOfWork, ctx: &HandlerContext<'_>) -> AppResult<String> {
        const CODE: &str = "image_upload_failed";
        const ACTION: &str = "Failed to upload image";
        let fail = |err: RepoError| AppError::from_repo(CODE, ACTION, err);

        let mut person = uow
            .repository()
            .get_by_id::<Person>(self.person_id, ctx.cancel)
            .map_err(fail)?
            .ok_or(AppError::NotFound {
                entity: EntityKind::Person,
                id: self.person_id,
            })?;

        if let Some(previous) = person.image.as_deref() {
            ctx.files
                .delete_image(previous)
                .map_err(|err| AppError::failure(CODE, format!("{ACTION}. Error: {err}")))?;
        }
        let path = ctx
            .files
            .save_image(self.person_id, &self.file_name, &self.bytes)
            .map_err(|err| AppError::failure(CODE, format!("{ACTION}. Error: {err}")))?;

        person.image = Some(path.clone());
        let staged = uow.repository().update(person);
        let stored = staged.and_then(|()| uow.commit(ctx.cancel));
        if let Err(err) = stored {
            if let Err(cleanup) = ctx.files.delete_image(&path) {
                warn!("event=image_cleanup module=service status=error error={cleanup}");
            }
            return Err(fail(err));
        }
        Ok(path)
    }
}
