//! Identity-based reconciliation of an owned collection.
//!
//! # Invariants
//! - Existing entries whose id is absent from the desired list are removed.
//! - Desired entries with a matching id overwrite that entry in place.
//! - Desired entries without an id are inserted.
//! - Desired entries carrying an id that matches nothing are ignored.

use crate::model::{Entity, EntityId};

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation<T> {
    pub updated: Vec<T>,
    pub inserted: Vec<T>,
    pub removed: Vec<T>,
}

/// Plans the writes that turn `existing` into `desired`.
///
/// `identity` reads the id a desired entry targets, `apply` overwrites an
/// existing entity, and `create` builds a new one.
pub fn reconcile_by_id<T: Entity, D>(
    existing: Vec<T>,
    desired: &[D],
    identity: impl Fn(&D) -> Option<EntityId>,
    apply: impl Fn(&D, &mut T),
    create: impl Fn(&D) -> T,
) -> Reconciliation<T> {
    let (mut kept, removed): (Vec<T>, Vec<T>) = existing
        .into_iter()
        .partition(|entity| desired.iter().any(|item| identity(item) == Some(entity.id())));

    let mut inserted = Vec::new();
    for item in desired {
        match identity(item) {
            Some(id) => {
                if let Some(entity) = kept.iter_mut().find(|entity| entity.id() == id) {
                    apply(item, entity);
                }
            }
            None => inserted.push(create(item)),
        }
    }
    kept.sort_by_key(|entity| entity.id());

    Reconciliation {
        updated: kept,
        inserted,
        removed,
    }
}
