//! Directed relationship between two persons.
//!
//! # Invariants
//! - `person_id != related_person_id`; enforced by the calling handlers.
//! - Storage restricts deleting either referenced person.

use super::entity::{AnyEntity, Audit, Entity, EntityId, EntityKind, RelationDescriptor};
use super::Person;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    Colleague,
    Acquaintance,
    Relative,
    Other,
}

text_enum!(RelationshipType {
    Colleague => "colleague",
    Acquaintance => "acquaintance",
    Relative => "relative",
    Other => "other",
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: EntityId,
    pub relationship_type: RelationshipType,
    pub person_id: EntityId,
    pub related_person_id: EntityId,
    pub audit: Audit,
    pub person: Option<Box<Person>>,
    pub related_person: Option<Box<Person>>,
}

impl Relationship {
    pub fn new(
        relationship_type: RelationshipType,
        person_id: EntityId,
        related_person_id: EntityId,
    ) -> Self {
        Self {
            id: 0,
            relationship_type,
            person_id,
            related_person_id,
            audit: Audit::default(),
            person: None,
            related_person: None,
        }
    }

    pub fn is_self_relationship(&self) -> bool {
        self.person_id == self.related_person_id
    }
}

impl Entity for Relationship {
    const KIND: EntityKind = EntityKind::Relationship;
    const COLUMNS: &'static [&'static str] =
        &["relationship_type", "person_id", "related_person_id"];
    const RELATIONS: &'static [RelationDescriptor] = &[
        RelationDescriptor::to_one("person", EntityKind::Person, "person_id"),
        RelationDescriptor::to_one("related_person", EntityKind::Person, "related_person_id"),
    ];

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn audit(&self) -> Audit {
        self.audit
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn column_values(&self) -> Vec<Value> {
        vec![
            Value::from(self.relationship_type),
            Value::Integer(self.person_id),
            Value::Integer(self.related_person_id),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            relationship_type: row.get("relationship_type")?,
            person_id: row.get("person_id")?,
            related_person_id: row.get("related_person_id")?,
            audit: Audit {
                created_at: row.get("created_at")?,
                updated_at: row.get("updated_at")?,
            },
            person: None,
            related_person: None,
        })
    }

    fn foreign_key(&self, column: &str) -> Option<EntityId> {
        match column {
            "person_id" => Some(self.person_id),
            "related_person_id" => Some(self.related_person_id),
            _ => None,
        }
    }

    fn attach_related(&mut self, relation: &str, related: Vec<AnyEntity>) -> bool {
        let person = related.into_iter().find_map(Person::from_any).map(Box::new);
        match relation {
            "person" => self.person = person,
            "related_person" => self.related_person = person,
            _ => return false,
        }
        true
    }

    fn into_any(self) -> AnyEntity {
        AnyEntity::Relationship(self)
    }

    fn from_any(any: AnyEntity) -> Option<Self> {
        match any {
            AnyEntity::Relationship(relationship) => Some(relationship),
            _ => None,
        }
    }

    fn from_any_ref(any: &AnyEntity) -> Option<&Self> {
        match any {
            AnyEntity::Relationship(relationship) => Some(relationship),
            _ => None,
        }
    }
}
