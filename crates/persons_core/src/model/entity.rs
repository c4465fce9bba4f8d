//! Shared entity contract and compile-time schema metadata.
//!
//! # Responsibility
//! - Give the generic repository uniform access to identity, audit stamps,
//!   column values and declared relations of every record kind.
//! - Provide `AnyEntity`, the type-erased carrier used by change tracking
//!   and relation loading.
//!
//! # Invariants
//! - `COLUMNS` never contains `id`, `created_at` or `updated_at`.
//! - `column_values()` returns values in `COLUMNS` order.
//! - Relations declared with `RelationKey::Local` name a column in `COLUMNS`.

use super::{City, Person, PhoneNumber, Relationship};
use rusqlite::types::Value;
use rusqlite::Row;
use std::fmt::{Display, Formatter};

/// Store-generated integer identity. `0` means "not yet persisted".
pub type EntityId = i64;

/// Persisted record kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    City,
    Person,
    PhoneNumber,
    Relationship,
}

impl EntityKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::City => "cities",
            Self::Person => "persons",
            Self::PhoneNumber => "phone_numbers",
            Self::Relationship => "relationships",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Person => "person",
            Self::PhoneNumber => "phone_number",
            Self::Relationship => "relationship",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Creation and last-update stamps in Unix epoch milliseconds.
///
/// Written by the unit of work flush hook; values set by callers are ignored
/// on insert and `created_at` is never rewritten by an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Audit {
    pub created_at: i64,
    pub updated_at: i64,
}

/// How a relation's rows are located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKey {
    /// Foreign-key column on the owning record pointing at the target id.
    Local(&'static str),
    /// Foreign-key column on the target table pointing back at the owner id.
    Foreign(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// One navigational relation of an entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDescriptor {
    pub name: &'static str,
    pub target: EntityKind,
    pub key: RelationKey,
}

impl RelationDescriptor {
    pub const fn to_one(name: &'static str, target: EntityKind, column: &'static str) -> Self {
        Self {
            name,
            target,
            key: RelationKey::Local(column),
        }
    }

    pub const fn to_many(name: &'static str, target: EntityKind, column: &'static str) -> Self {
        Self {
            name,
            target,
            key: RelationKey::Foreign(column),
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        match self.key {
            RelationKey::Local(_) => Cardinality::One,
            RelationKey::Foreign(_) => Cardinality::Many,
        }
    }
}

/// Contract every persisted record kind implements.
pub trait Entity: Clone + std::fmt::Debug + Sized + 'static {
    const KIND: EntityKind;
    /// Writable columns, excluding identity and audit columns.
    const COLUMNS: &'static [&'static str];
    /// Declared navigational relations, eagerly loadable by name.
    const RELATIONS: &'static [RelationDescriptor];

    fn id(&self) -> EntityId;
    fn set_id(&mut self, id: EntityId);
    fn audit(&self) -> Audit;
    fn audit_mut(&mut self) -> &mut Audit;

    /// Values for `COLUMNS`, in the same order.
    fn column_values(&self) -> Vec<Value>;

    /// Decodes a row that selected `id`, `COLUMNS` and the audit columns.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Reads a local foreign-key column; `None` for unknown columns.
    fn foreign_key(&self, column: &str) -> Option<EntityId>;

    /// Installs eagerly loaded records under the named relation.
    ///
    /// Returns `false` when the relation is unknown to this kind.
    fn attach_related(&mut self, relation: &str, related: Vec<AnyEntity>) -> bool;

    fn into_any(self) -> AnyEntity;
    fn from_any(any: AnyEntity) -> Option<Self>;
    fn from_any_ref(any: &AnyEntity) -> Option<&Self>;

    fn relation(name: &str) -> Option<&'static RelationDescriptor> {
        Self::RELATIONS.iter().find(|relation| relation.name == name)
    }

    fn has_column(name: &str) -> bool {
        matches!(name, "id" | "created_at" | "updated_at") || Self::COLUMNS.contains(&name)
    }
}

/// Type-erased entity used where kinds are mixed.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyEntity {
    City(City),
    Person(Person),
    PhoneNumber(PhoneNumber),
    Relationship(Relationship),
}

macro_rules! dispatch {
    ($value:expr, $entity:ident => $body:expr) => {
        match $value {
            AnyEntity::City($entity) => $body,
            AnyEntity::Person($entity) => $body,
            AnyEntity::PhoneNumber($entity) => $body,
            AnyEntity::Relationship($entity) => $body,
        }
    };
}

impl AnyEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::City(_) => EntityKind::City,
            Self::Person(_) => EntityKind::Person,
            Self::PhoneNumber(_) => EntityKind::PhoneNumber,
            Self::Relationship(_) => EntityKind::Relationship,
        }
    }

    pub fn id(&self) -> EntityId {
        dispatch!(self, entity => entity.id())
    }

    pub fn set_id(&mut self, id: EntityId) {
        dispatch!(self, entity => entity.set_id(id))
    }

    pub fn audit(&self) -> Audit {
        dispatch!(self, entity => entity.audit())
    }

    pub fn audit_mut(&mut self) -> &mut Audit {
        dispatch!(self, entity => entity.audit_mut())
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::City(_) => City::COLUMNS,
            Self::Person(_) => Person::COLUMNS,
            Self::PhoneNumber(_) => PhoneNumber::COLUMNS,
            Self::Relationship(_) => Relationship::COLUMNS,
        }
    }

    pub fn column_values(&self) -> Vec<Value> {
        dispatch!(self, entity => entity.column_values())
    }

    pub fn foreign_key(&self, column: &str) -> Option<EntityId> {
        dispatch!(self, entity => entity.foreign_key(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_metadata_consistent<T: Entity>() {
        for relation in T::RELATIONS {
            if let RelationKey::Local(column) = relation.key {
                assert!(
                    T::COLUMNS.contains(&column),
                    "{} relation `{}` names unknown column `{column}`",
                    T::KIND,
                    relation.name
                );
            }
        }
        for column in T::COLUMNS {
            assert!(!matches!(*column, "id" | "created_at" | "updated_at"));
        }
    }

    #[test]
    fn relation_metadata_points_at_declared_columns() {
        assert_metadata_consistent::<City>();
        assert_metadata_consistent::<Person>();
        assert_metadata_consistent::<PhoneNumber>();
        assert_metadata_consistent::<Relationship>();
    }

    #[test]
    fn person_declares_all_navigations() {
        let names: Vec<_> = Person::RELATIONS.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["city", "phone_numbers", "relationships"]);
        assert_eq!(
            Person::relation("phone_numbers").map(RelationDescriptor::cardinality),
            Some(Cardinality::Many)
        );
        assert_eq!(
            Person::relation("city").map(RelationDescriptor::cardinality),
            Some(Cardinality::One)
        );
        assert!(City::RELATIONS.is_empty());
    }

    #[test]
    fn has_column_accepts_identity_and_audit_columns() {
        assert!(Person::has_column("id"));
        assert!(Person::has_column("updated_at"));
        assert!(Person::has_column("personal_number"));
        assert!(!Person::has_column("personal_number; DROP TABLE persons"));
    }
}
