//! City reference record.

use super::entity::{AnyEntity, Audit, Entity, EntityId, EntityKind, RelationDescriptor};
use rusqlite::types::Value;
use rusqlite::Row;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct City {
    pub id: EntityId,
    pub name: String,
    pub audit: Audit,
}

impl City {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Entity for City {
    const KIND: EntityKind = EntityKind::City;
    const COLUMNS: &'static [&'static str] = &["name"];
    const RELATIONS: &'static [RelationDescriptor] = &[];

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
        vec![Value::Text(self.name.clone())]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            audit: Audit {
                created_at: row.get("created_at")?,
                updated_at: row.get("updated_at")?,
            },
        })
    }

    fn foreign_key(&self, _column: &str) -> Option<EntityId> {
        None
    }

    fn attach_related(&mut self, _relation: &str, _related: Vec<AnyEntity>) -> bool {
        false
    }

    fn into_any(self) -> AnyEntity {
        AnyEntity::City(self)
    }

    fn from_any(any: AnyEntity) -> Option<Self> {
        match any {
            AnyEntity::City(city) => Some(city),
            _ => None,
        }
    }

    fn from_any_ref(any: &AnyEntity) -> Option<&Self> {
        match any {
            AnyEntity::City(city) => Some(city),
            _ => None,
        }
    }
}
