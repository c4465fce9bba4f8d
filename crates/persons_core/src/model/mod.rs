//! Entity model for the persons directory.
//!
//! # Responsibility
//! - Define the four persisted record kinds and their enumerations.
//! - Declare per-kind schema metadata (columns, relations) used by the
//!   generic repository.
//!
//! # Invariants
//! - Identity and audit timestamps are assigned by the persistence layer only.
//! - Relation names live in one place per kind: `Entity::RELATIONS`.

/// Declares a fieldless enum persisted as lowercase text.
///
/// Generates `as_str`, `ALL`, `Display`, `FromStr` and the rusqlite
/// `ToSql`/`FromSql` conversions so every enum column encodes the same way.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Storage and wire representation.
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::model::ParseEnumError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(crate::model::ParseEnumError {
                        kind: stringify!($name),
                        value: value.to_string(),
                    }),
                }
            }
        }

        impl rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                let text = value.as_str()?;
                text.parse()
                    .map_err(|err| rusqlite::types::FromSqlError::Other(Box::new(err)))
            }
        }

        impl From<$name> for rusqlite::types::Value {
            fn from(value: $name) -> Self {
                rusqlite::types::Value::Text(value.as_str().to_string())
            }
        }
    };
}

pub mod city;
pub mod entity;
pub mod person;
pub mod phone_number;
pub mod relationship;

pub use city::City;
pub use entity::{
    AnyEntity, Audit, Cardinality, Entity, EntityId, EntityKind, RelationDescriptor, RelationKey,
};
pub use person::{Gender, Person};
pub use phone_number::{PhoneNumber, PhoneNumberType};
pub use relationship::{Relationship, RelationshipType};

/// Text did not name any variant of a persisted enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} value `{value}`")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}
