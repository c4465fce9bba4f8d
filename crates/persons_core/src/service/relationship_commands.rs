//! Relationship write handlers.

use crate::model::{EntityId, EntityKind, Person, Relationship, RelationshipType};
use crate::repo::{RepoError, UnitOfWork};
use crate::service::dispatch::{HandlerContext, Request};
use crate::service::error::{AppError, AppResult};
use crate::validation::{FieldError, Rules, Validate};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRelationship {
    pub person_id: EntityId,
    pub related_person_id: EntityId,
    pub relationship_type: RelationshipType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteRelationship {
    pub relationship_id: EntityId,
}

impl Validate for AddRelationship {
    fn validate(&self) -> Vec<FieldError> {
        Rules::new()
            .positive_id("personId", "Person identifier", self.person_id)
            .positive_id("relatedPersonId", "Related person identifier", self.related_person_id)
            .check(
                "relatedPersonId",
                !self.to_entity().is_self_relationship(),
                "A person cannot be related to themselves.",
            )
            .finish()
    }
}

impl Validate for DeleteRelationship {
    fn validate(&self) -> Vec<FieldError> {
        Rules::new()
            .positive_id("relationshipId", "Relationship identifier", self.relationship_id)
            .finish()
    }
}

impl Request for AddRelationship {
    /// Id of the new relationship.
    type Response = EntityId;
    const NAME: &'static str = "add_relationship";

    fn handle(self, uow: &mut UnitOfWork, ctx: &HandlerContext<'_>) -> AppResult<EntityId> {
        const CODE: &str = "add_relationship_failed";
        const ACTION: &str = "Failed to add relationship";
        let fail = |err: RepoError| AppError::from_repo(CODE, ACTION, err);

        for id in [self.person_id, self.related_person_id] {
            if uow
                .repository()
                .get_by_id::<Person>(id, ctx.cancel)
                .map_err(fail)?
                .is_none()
            {
                return Err(AppError::NotFound {
                    entity: EntityKind::Person,
                    id,
                });
            }
        }

        let staged = uow.repository().add(self.to_entity());
        uow.commit(ctx.cancel).map_err(fail)?;
        uow.entity(staged)
            .map(|relationship| relationship.id)
            .ok_or_else(|| AppError::failure(CODE, "relationship was not assigned an id"))
    }
}

impl Request for DeleteRelationship {
    /// `false` when no such relationship exists.
    type Response = bool;
    const NAME: &'static str = "delete_relationship";

    fn handle(self, uow: &mut UnitOfWork, ctx: &HandlerContext<'_>) -> AppResult<bool> {
        let fail = |err: RepoError| {
            AppError::from_repo("delete_relationship_failed", "Failed to delete relationship", err)
        };

        let mut repo = uow.repository();
        let Some(relationship) = repo
            .get_by_id::<Relationship>(self.relationship_id, ctx.cancel)
            .map_err(fail)?
        else {
            return Ok(false);
        };
        repo.delete(relationship).map_err(fail)?;
        uow.commit(ctx.cancel).map_err(fail)?;
        Ok(true)
    }
}
