//! Person aggregate root.
//!
//! # Invariants
//! - `personal_number` is unique across all persons (enforced by storage).
//! - `phone_numbers` and `relationships` are owned by the person; they are
//!   populated only by eager loading and are never written through the person.

use super::entity::{AnyEntity, Audit, Entity, EntityId, EntityKind, RelationDescriptor};
use super::{City, PhoneNumber, Relationship};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::Row;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

text_enum!(Gender {
    Male => "male",
    Female => "female",
    Other => "other",
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: EntityId,
    pub name: String,
    pub surname: String,
    pub gender: Gender,
    /// Exactly 11 digits.
    pub personal_number: String,
    pub date_of_birth: NaiveDate,
    pub city_id: EntityId,
    /// Path returned by the file storage collaborator.
    pub image: Option<String>,
    pub audit: Audit,
    pub city: Option<City>,
    pub phone_numbers: Vec<PhoneNumber>,
    /// Outgoing relationships (`relationship.person_id == self.id`).
    pub relationships: Vec<Relationship>,
}

impl Person {
    pub fn new(
        name: impl Into<String>,
        surname: impl Into<String>,
        gender: Gender,
        personal_number: impl Into<String>,
        date_of_birth: NaiveDate,
        city_id: EntityId,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            surname: surname.into(),
            gender,
            personal_number: personal_number.into(),
            date_of_birth,
            city_id,
            image: None,
            audit: Audit::default(),
            city: None,
            phone_numbers: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Returns a copy carrying scalar fields only.
    pub fn without_relations(&self) -> Self {
        Self {
            city: None,
            phone_numbers: Vec::new(),
            relationships: Vec::new(),
            ..self.clone()
        }
    }
}

impl Entity for Person {
    const KIND: EntityKind = EntityKind::Person;
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "surname",
        "gender",
        "personal_number",
        "date_of_birth",
        "city_id",
        "image",
    ];
    const RELATIONS: &'static [RelationDescriptor] = &[
        RelationDescriptor::to_one("city", EntityKind::City, "city_id"),
        RelationDescriptor::to_many("phone_numbers", EntityKind::PhoneNumber, "person_id"),
        RelationDescriptor::to_many("relationships", EntityKind::Relationship, "person_id"),
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
            Value::Text(self.name.clone()),
            Value::Text(self.surname.clone()),
            Value::from(self.gender),
            Value::Text(self.personal_number.clone()),
            Value::Text(self.date_of_birth.format("%F").to_string()),
            Value::Integer(self.city_id),
            Value::from(self.image.clone()),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            surname: row.get("surname")?,
            gender: row.get("gender")?,
            personal_number: row.get("personal_number")?,
            date_of_birth: row.get("date_of_birth")?,
            city_id: row.get("city_id")?,
            image: row.get("image")?,
            audit: Audit {
                created_at: row.get("created_at")?,
                updated_at: row.get("updated_at")?,
            },
            city: None,
            phone_numbers: Vec::new(),
            relationships: Vec::new(),
        })
    }

    fn foreign_key(&self, column: &str) -> Option<EntityId> {
        match column {
            "city_id" => Some(self.city_id),
            _ => None,
        }
    }

    fn attach_related(&mut self, relation: &str, related: Vec<AnyEntity>) -> bool {
        match relation {
            "city" => {
                self.city = related.into_iter().find_map(City::from_any);
                true
            }
            "phone_numbers" => {
                self.phone_numbers = related.into_iter().filter_map(PhoneNumber::from_any).collect();
                true
            }
            "relationships" => {
                self.relationships = related
                    .into_iter()
                    .filter_map(Relationship::from_any)
                    .collect();
                true
            }
            _ => false,
        }
    }

    fn into_any(self) -> AnyEntity {
        AnyEntity::Person(self)
    }

    fn from_any(any: AnyEntity) -> Option<Self> {
        match any {
            AnyEntity::Person(person) => Some(person),
            _ => None,
        }
    }

    fn from_any_ref(any: &AnyEntity) -> Option<&Self> {
        match any {
            AnyEntity::Person(person) => Some(person),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Gender;

    #[test]
    fn gender_parses_case_insensitively() {
        assert_eq!("Female".parse::<Gender>(), Ok(Gender::Female));
        assert_eq!(" MALE ".parse::<Gender>(), Ok(Gender::Male));
        assert!("robot".parse::<Gender>().is_err());
    }
}
