//! Relationship count report.

use crate::model::{EntityId, Relationship, RelationshipType};
use crate::repo::UnitOfWork;
use crate::service::dispatch::{HandlerContext, Request};
use crate::service::error::{AppError, AppResult};
use crate::validation::{FieldError, Rules, Validate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Counts outgoing relationships per type, for one person or all persons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetRelationshipReport {
    pub person_id: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipReport {
    pub person_id: EntityId,
    pub type_and_counts: Vec<RelationshipTypeCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipTypeCount {
    pub relationship_type: RelationshipType,
    pub count: usize,
}

impl Validate for GetRelationshipReport {
    fn validate(&self) -> Vec<FieldError> {
        let mut rules = Rules::new();
        if let Some(person_id) = self.person_id {
            rules.positive_id("personId", "Person identifier", person_id);
        }
        rules.finish()
    }
}

impl Request for GetRelationshipReport {
    /// One row per person with at least one outgoing relationship, by id.
    type Response = Vec<RelationshipReport>;
    const NAME: &'static str = "get_relationship_report";

    fn handle(self, uow: &mut UnitOfWork, ctx: &HandlerContext<'_>) -> AppResult<Vec<RelationshipReport>> {
        let relationships = uow
            .repository()
            .find_all::<Relationship>(ctx.cancel)
            .map_err(|err| AppError::from_repo("report_failed", "Failed to build relationship report", err))?;
        Ok(summarize(relationships, self.person_id))
    }
}

fn summarize(relationships: Vec<Relationship>, person_id: Option<EntityId>) -> Vec<RelationshipReport> {
    let mut counts: BTreeMap<EntityId, BTreeMap<RelationshipType, usize>> = BTreeMap::new();
    for relationship in relationships
        .into_iter()
        .filter(|relationship| person_id.map_or(true, |id| relationship.person_id == id))
    {
        *counts
            .entry(relationship.person_id)
            .or_default()
            .entry(relationship.relationship_type)
            .or_default() += 1;
    }

    counts
        .into_iter()
        .map(|(person_id, by_type)| RelationshipReport {
            person_id,
            type_and_counts: by_type
                .into_iter()
                .map(|(relationship_type, count)| RelationshipTypeCount {
                    relationship_type,
                    count,
                })
                .collect(),
        })
        .collect()
}
