//! In-memory change tracking for one unit of work.
//!
//! # Responsibility
//! - Hold entities staged for insert, update or delete until the next flush.
//! - Keep flushed entities addressable through their `Staged` handle so
//!   callers can read generated ids and audit stamps.
//!
//! # Invariants
//! - At most one pending entry exists per persisted `(kind, id)`.
//! - Entry indices are stable for the lifetime of the tracker; removed entries
//!   leave a hole instead of shifting later ones.

use crate::model::{AnyEntity, Entity, EntityId, EntityKind};
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Added,
    Modified,
    Deleted,
    /// Flushed and not dirtied since.
    Unchanged,
}

#[derive(Debug, Clone)]
pub(crate) struct Entry {
    pub(crate) state: EntryState,
    pub(crate) entity: AnyEntity,
}

/// Handle to an entity staged through `Repository::add`.
///
/// Resolves to the tracked entity, including its store-generated id once the
/// unit of work has flushed.
pub struct Staged<T> {
    index: usize,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Clone for Staged<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Staged<T> {}

impl<T> Debug for Staged<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Staged").field("index", &self.index).finish()
    }
}

/// Outcome of writing one pending entry.
#[derive(Debug)]
pub(crate) enum Flushed {
    Persisted(usize, AnyEntity),
    Removed(usize),
}

#[derive(Debug, Default)]
pub struct ChangeTracker {
    entries: Vec<Option<Entry>>,
}

impl ChangeTracker {
    pub(crate) fn stage_added(&mut self, entity: AnyEntity) -> usize {
        self.entries.push(Some(Entry {
            state: EntryState::Added,
            entity,
        }));
        self.entries.len() - 1
    }

    pub(crate) fn stage_modified(&mut self, entity: AnyEntity) {
        match self.position(entity.kind(), entity.id()) {
            Some(index) => {
                if let Some(entry) = self.entries[index].as_mut() {
                    entry.entity = entity;
                    if entry.state != EntryState::Added {
                        entry.state = EntryState::Modified;
                    }
                }
            }
            None => {
                self.entries.push(Some(Entry {
                    state: EntryState::Modified,
                    entity,
                }));
            }
        }
    }

    /// Marks a tracked entity deleted, attaching it first when untracked.
    pub(crate) fn stage_deleted(&mut self, entity: AnyEntity) {
        match self.position(entity.kind(), entity.id()) {
            Some(index) => {
                let never_written = self.entries[index]
                    .as_ref()
                    .is_some_and(|entry| entry.state == EntryState::Added);
                if never_written {
                    self.entries[index] = None;
                } else if let Some(entry) = self.entries[index].as_mut() {
                    entry.state = EntryState::Deleted;
                }
            }
            None => {
                self.entries.push(Some(Entry {
                    state: EntryState::Deleted,
                    entity,
                }));
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        self.entries
            .iter()
            .flatten()
            .any(|entry| entry.state != EntryState::Unchanged)
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .flatten()
            .filter(|entry| entry.state != EntryState::Unchanged)
            .count()
    }

    /// Pending entries in staging order.
    pub(crate) fn pending(&self) -> impl Iterator<Item = (usize, &Entry)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.as_ref().map(|entry| (index, entry)))
            .filter(|(_, entry)| entry.state != EntryState::Unchanged)
    }

    /// Applies the results of a successful flush.
    pub(crate) fn accept(&mut self, flushed: Vec<Flushed>) {
        for outcome in flushed {
            match outcome {
                Flushed::Persisted(index, entity) => {
                    self.entries[index] = Some(Entry {
                        state: EntryState::Unchanged,
                        entity,
                    });
                }
                Flushed::Removed(index) => self.entries[index] = None,
            }
        }
    }

    /// Forgets every entry, pending or flushed.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn state_of<T: Entity>(&self, staged: Staged<T>) -> Option<EntryState> {
        self.entries
            .get(staged.index)
            .and_then(Option::as_ref)
            .map(|entry| entry.state)
    }

    pub(crate) fn get<T: Entity>(&self, staged: Staged<T>) -> Option<&T> {
        self.entries
            .get(staged.index)
            .and_then(Option::as_ref)
            .and_then(|entry| T::from_any_ref(&entry.entity))
    }

    pub(crate) fn handle<T: Entity>(index: usize) -> Staged<T> {
        Staged {
            index,
            _kind: PhantomData,
        }
    }

    fn position(&self, kind: EntityKind, id: EntityId) -> Option<usize> {
        if id == 0 {
            return None;
        }
        self.entries.iter().position(|entry| {
            entry
                .as_ref()
                .is_some_and(|entry| entry.entity.kind() == kind && entry.entity.id() == id)
        })
    }
}
