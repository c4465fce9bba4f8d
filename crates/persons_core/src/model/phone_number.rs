//! Phone number owned by a person.

use super::entity::{AnyEntity, Audit, Entity, EntityId, EntityKind, RelationDescriptor};
use super::Person;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneNumberType {
    Mobile,
    Home,
    Office,
}

text_enum!(PhoneNumberType {
    Mobile => "mobile",
    Home => "home",
    Office => "office",
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneNumber {
    pub id: EntityId,
    pub number_type: PhoneNumberType,
    /// 4 to 50 characters.
    pub number: String,
    pub person_id: EntityId,
    pub audit: Audit,
    pub person: Option<Box<Person>>,
}

impl PhoneNumber {
    pub fn new(number_type: PhoneNumberType, number: impl Into<String>, person_id: EntityId) -> Self {
        Self {
            id: 0,
            number_type,
            number: number.into(),
            person_id,
            audit: Audit::default(),
            person: None,
        }
    }
}

impl Entity for PhoneNumber {
    const KIND: EntityKind = EntityKind::PhoneNumber;
    const COLUMNS: &'static [&'static str] = &["number_type", "number", "person_id"];
    const RELATIONS: &'static [RelationDescriptor] = &[RelationDescriptor::to_one(
        "person",
        EntityKind::Person,
        "person_id",
    )];

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
            Value::from(self.number_type),
            Value::Text(self.number.clone()),
            Value::Integer(self.person_id),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            number_type: row.get("number_type")?,
            number: row.get("number")?,
            person_id: row.get("person_id")?,
            audit: Audit {
                created_at: row.get("created_at")?,
                updated_at: row.get("updated_at")?,
            },
            person: None,
        })
    }

    fn foreign_key(&self, column: &str) -> Option<EntityId> {
        match column {
            "person_id" => Some(self.person_id),
            _ => None,
        }
    }

    fn attach_related(&mut self, relation: &str, related: Vec<AnyEntity>) -> bool {
        match relation {
            "person" => {
                self.person = related.into_iter().find_map(Person::from_any).map(Box::new);
                true
            }
            _ => false,
        }
    }

    fn into_any(self) -> AnyEntity {
        AnyEntity::PhoneNumber(self)
    }

    fn from_any(any: AnyEntity) -> Option<Self> {
        match any {
            AnyEntity::PhoneNumber(phone) => Some(phone),
            _ => None,
        }
    }

    fn from_any_ref(any: &AnyEntity) -> Option<&Self> {
        match any {
            AnyEntity::PhoneNumber(phone) => Some(phone),
            _ => None,
        }
    }
}
