//! Generic repository over every entity kind.
//!
//! # Responsibility
//! - Read records immediately, with optional eager loading of relations
//!   discovered from `Entity::RELATIONS`.
//! - Stage inserts, updates and deletes in the unit of work's change tracker.
//!
//! # Invariants
//! - Reads go through the owning unit of work's session and therefore see
//!   its open transaction, including flushed-but-uncommitted rows.
//! - Staging never touches storage; changes land on the next flush.
//! - Eager loading is one level deep and yields each related row once.

use crate::model::{AnyEntity, Entity, EntityId, RelationDescriptor, RelationKey};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::filter::{Filter, ListQuery, OrderBy};
use crate::repo::sql;
use crate::repo::tracker::{ChangeTracker, EntryState, Staged};
use crate::repo::unit_of_work::Session;
use rusqlite::Connection;
use std::collections::{BTreeSet, HashMap};
use tokio_util::sync::CancellationToken;

/// Repository bound to one unit of work.
///
/// Obtained from `UnitOfWork::repository`; the borrow keeps every call on a
/// unit of work strictly sequential.
pub struct Repository<'uow> {
    session: &'uow Session,
    tracker: &'uow mut ChangeTracker,
}

impl<'uow> Repository<'uow> {
    pub(crate) fn new(session: &'uow Session, tracker: &'uow mut ChangeTracker) -> Self {
        Self { session, tracker }
    }

    /// Loads one record without relations.
    pub fn get_by_id<T: Entity>(
        &self,
        id: EntityId,
        cancel: &CancellationToken,
    ) -> RepoResult<Option<T>> {
        self.session
            .run(cancel, |conn| sql::select_by_id::<T>(conn, id))
    }

    /// Loads one record with every declared relation populated.
    pub fn get_by_id_with_includes<T: Entity>(
        &self,
        id: EntityId,
        cancel: &CancellationToken,
    ) -> RepoResult<Option<T>> {
        self.session.run(cancel, |conn| {
            let Some(entity) = sql::select_by_id::<T>(conn, id)? else {
                return Ok(None);
            };
            let mut loaded = vec![entity];
            include_relations(conn, &mut loaded, T::RELATIONS)?;
            Ok(loaded.pop())
        })
    }

    /// Loads every matching record with every declared relation populated.
    pub fn find_list_with_includes<T: Entity>(
        &self,
        query: &ListQuery,
        cancel: &CancellationToken,
    ) -> RepoResult<Vec<T>> {
        let (where_sql, bind_values) = query.filter.to_sql::<T>()?;
        let order_sql = OrderBy::to_sql::<T>(query.order_by.as_ref())?;
        self.session.run(cancel, |conn| {
            let mut entities = sql::select::<T>(conn, &where_sql, bind_values, &order_sql, query.page)?;
            include_relations(conn, &mut entities, T::RELATIONS)?;
            Ok(entities)
        })
    }

    /// Loads every record of a kind, unfiltered and without relations.
    pub fn find_all<T: Entity>(&self, cancel: &CancellationToken) -> RepoResult<Vec<T>> {
        let order_sql = OrderBy::to_sql::<T>(None)?;
        self.session
            .run(cancel, |conn| sql::select::<T>(conn, "", Vec::new(), &order_sql, None))
    }

    /// Loads the single matching record with the named relations.
    ///
    /// `include_properties` is a comma-separated list of relation names.
    /// More than one match fails with `MultipleResults`.
    pub fn single_or_default<T: Entity>(
        &self,
        filter: &Filter,
        include_properties: &str,
        cancel: &CancellationToken,
    ) -> RepoResult<Option<T>> {
        let relations = include_properties
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                T::relation(name).copied().ok_or_else(|| RepoError::UnknownRelation {
                    kind: T::KIND,
                    name: name.to_string(),
                })
            })
            .collect::<RepoResult<Vec<_>>>()?;
        let (where_sql, bind_values) = filter.to_sql::<T>()?;
        let order_sql = OrderBy::to_sql::<T>(None)?;

        self.session.run(cancel, |conn| {
            let mut matches = sql::select::<T>(conn, &where_sql, bind_values, &order_sql, None)?;
            if matches.len() > 1 {
                return Err(RepoError::MultipleResults {
                    kind: T::KIND,
                    count: matches.len(),
                });
            }
            include_relations(conn, &mut matches, &relations)?;
            Ok(matches.pop())
        })
    }

    /// Stages an insert. The returned handle resolves to the entity, with
    /// its generated id, after the next flush.
    pub fn add<T: Entity>(&mut self, entity: T) -> Staged<T> {
        let index = self.tracker.stage_added(entity.into_any());
        ChangeTracker::handle(index)
    }

    /// Stages a full overwrite of every writable column.
    pub fn update<T: Entity>(&mut self, entity: T) -> RepoResult<()> {
        require_identity(&entity)?;
        self.tracker.stage_modified(entity.into_any());
        Ok(())
    }

    /// Stages a full overwrite of each entity; nothing is staged if any
    /// entity lacks an identity.
    pub fn update_range<T: Entity>(&mut self, entities: impl IntoIterator<Item = T>) -> RepoResult<()> {
        let entities: Vec<T> = entities.into_iter().collect();
        for entity in &entities {
            require_identity(entity)?;
        }
        for entity in entities {
            self.tracker.stage_modified(entity.into_any());
        }
        Ok(())
    }

    /// Stages a delete. Only the id is needed; untracked entities are attached.
    pub fn delete<T: Entity>(&mut self, entity: T) -> RepoResult<()> {
        require_identity(&entity)?;
        self.tracker.stage_deleted(entity.into_any());
        Ok(())
    }

    /// Resolves a staged handle to the tracked entity.
    pub fn tracked<T: Entity>(&self, staged: Staged<T>) -> Option<&T> {
        self.tracker.get(staged)
    }

    pub fn entry_state<T: Entity>(&self, staged: Staged<T>) -> Option<EntryState> {
        self.tracker.state_of(staged)
    }
}

fn require_identity<T: Entity>(entity: &T) -> RepoResult<()> {
    if entity.id() == 0 {
        return Err(RepoError::MissingIdentity { kind: T::KIND });
    }
    Ok(())
}

/// Populates `relations` on every entity with batched `IN` lookups.
fn include_relations<T: Entity>(
    conn: &Connection,
    entities: &mut [T],
    relations: &[RelationDescriptor],
) -> RepoResult<()> {
    if entities.is_empty() {
        return Ok(());
    }

    for relation in relations {
        match relation.key {
            RelationKey::Local(column) => {
                let keys = unique_keys(entities.iter().filter_map(|entity| entity.foreign_key(column)));
                let targets: HashMap<EntityId, AnyEntity> =
                    sql::select_related(conn, relation.target, "id", &keys)?
                        .into_iter()
                        .map(|target| (target.id(), target))
                        .collect();
                for entity in entities.iter_mut() {
                    let related = entity
                        .foreign_key(column)
                        .and_then(|key| targets.get(&key).cloned())
                        .into_iter()
                        .collect();
                    attach(entity, relation, related)?;
                }
            }
            RelationKey::Foreign(column) => {
                let keys = unique_keys(entities.iter().map(Entity::id));
                let mut grouped: HashMap<EntityId, Vec<AnyEntity>> = HashMap::new();
                for target in sql::select_related(conn, relation.target, column, &keys)? {
                    if let Some(owner) = target.foreign_key(column) {
                        grouped.entry(owner).or_default().push(target);
                    }
                }
                for entity in entities.iter_mut() {
                    let related = grouped.remove(&entity.id()).unwrap_or_default();
                    attach(entity, relation, related)?;
                }
            }
        }
    }

    Ok(())
}

fn unique_keys(keys: impl Iterator<Item = EntityId>) -> Vec<EntityId> {
    keys.collect::<BTreeSet<_>>().into_iter().collect()
}

fn attach<T: Entity>(
    entity: &mut T,
    relation: &RelationDescriptor,
    related: Vec<AnyEntity>,
) -> RepoResult<()> {
    if entity.attach_related(relation.name, related) {
        Ok(())
    } else {
        Err(RepoError::UnknownRelation {
            kind: T::KIND,
            name: relation.name.to_string(),
        })
    }
}
