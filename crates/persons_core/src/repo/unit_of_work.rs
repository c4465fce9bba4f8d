//! Unit of work: one connection, one change tracker, at most one transaction.
//!
//! # Responsibility
//! - Hand out the generic repository bound to this unit of work.
//! - Flush staged changes atomically, stamping audit timestamps once per flush.
//! - Drive the explicit transaction lifecycle.
//!
//! # Invariants
//! - State moves `Idle -> InTransaction -> Closed` and never backwards.
//! - A flush writes all staged changes or none of them.
//! - After any failure inside an explicit transaction, the transaction is
//!   rollback-only: commit is refused until the caller rolls back.
//! - Rollback always reaches the store, even when cancellation was requested.
//! - Dropping a unit of work with an open transaction rolls it back.

use crate::db::migrations::{current_version, latest_version};
use crate::model::{Audit, Entity};
use crate::repo::clock;
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::repository::Repository;
use crate::repo::sql;
use crate::repo::tracker::{ChangeTracker, EntryState, Flushed, Staged};
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::cell::Cell;
use std::ffi::c_int;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Virtual machine steps between cancellation checks inside one statement.
const PROGRESS_STEPS: c_int = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkState {
    Idle,
    InTransaction,
    Closed,
}

/// Connection plus transaction bookkeeping shared by the unit of work and
/// the repository it lends out.
pub(crate) struct Session {
    conn: Connection,
    state: Cell<UnitOfWorkState>,
    rollback_only: Cell<bool>,
}

impl Session {
    /// Runs one store round trip under `cancel`.
    ///
    /// Cancellation is checked before the call and polled while statements
    /// execute; a cancelled call inside a transaction marks it rollback-only.
    pub(crate) fn run<R>(
        &self,
        cancel: &CancellationToken,
        op: impl FnOnce(&Connection) -> RepoResult<R>,
    ) -> RepoResult<R> {
        if cancel.is_cancelled() {
            self.poison();
            return Err(RepoError::Cancelled);
        }

        let watched = AssertUnwindSafe(cancel.clone());
        self.conn
            .progress_handler(PROGRESS_STEPS, Some(move || interrupt_requested(&watched)));
        let result = op(&self.conn);
        self.conn.progress_handler(0, None::<fn() -> bool>);

        if matches!(result, Err(RepoError::Cancelled)) {
            self.poison();
        }
        result
    }

    /// Discards a partially written flush. A store that already rolled the
    /// whole transaction back has nothing left to undo.
    fn undo_flush(&self) {
        if self.conn.is_autocommit() {
            return;
        }
        if let Err(err) = self
            .conn
            .execute_batch("ROLLBACK TO uow_flush; RELEASE uow_flush;")
        {
            error!("event=uow_flush_undo module=repo status=error error={err}");
        }
    }

    fn poison(&self) {
        if self.state.get() == UnitOfWorkState::InTransaction {
            self.rollback_only.set(true);
        }
    }
}

fn interrupt_requested(token: &AssertUnwindSafe<CancellationToken>) -> bool {
    token.is_cancelled()
}

pub struct UnitOfWork {
    session: Session,
    tracker: ChangeTracker,
}

impl UnitOfWork {
    /// Wraps a connection whose schema is already at the latest migration.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_version(&conn)?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self {
            session: Session {
                conn,
                state: Cell::new(UnitOfWorkState::Idle),
                rollback_only: Cell::new(false),
            },
            tracker: ChangeTracker::default(),
        })
    }

    pub fn state(&self) -> UnitOfWorkState {
        self.session.state.get()
    }

    pub fn is_rollback_only(&self) -> bool {
        self.session.rollback_only.get()
    }

    pub fn has_pending_changes(&self) -> bool {
        self.tracker.has_pending()
    }

    /// Generic repository for any entity kind.
    pub fn repository(&mut self) -> Repository<'_> {
        Repository::new(&self.session, &mut self.tracker)
    }

    /// Tracked copy of a staged entity, reflecting the last successful flush.
    pub fn entity<T: Entity>(&self, staged: Staged<T>) -> Option<&T> {
        self.tracker.get(staged)
    }

    pub fn begin_transaction(&mut self, cancel: &CancellationToken) -> RepoResult<()> {
        match self.state() {
            UnitOfWorkState::Idle => {}
            UnitOfWorkState::InTransaction => {
                return Err(RepoError::CallerMisuse("a transaction is already open"));
            }
            UnitOfWorkState::Closed => return Err(RepoError::CallerMisuse("unit of work is closed")),
        }

        self.session.run(cancel, |conn| {
            conn.execute_batch("BEGIN IMMEDIATE;")?;
            Ok(())
        })?;
        self.session.state.set(UnitOfWorkState::InTransaction);
        info!("event=uow_begin module=repo status=ok");
        Ok(())
    }

    /// Flushes staged changes and returns the number of rows written.
    ///
    /// Inside an explicit transaction the rows stay uncommitted until
    /// `commit_transaction`; otherwise they are durable on return.
    pub fn commit(&mut self, cancel: &CancellationToken) -> RepoResult<usize> {
        match self.state() {
            UnitOfWorkState::Idle => {}
            UnitOfWorkState::InTransaction if self.is_rollback_only() => {
                return Err(RepoError::RollbackOnly);
            }
            UnitOfWorkState::InTransaction => {}
            UnitOfWorkState::Closed => return Err(RepoError::CallerMisuse("unit of work is closed")),
        }
        self.flush(cancel)
    }

    /// Flushes pending changes, then commits the open transaction.
    pub fn commit_transaction(&mut self, cancel: &CancellationToken) -> RepoResult<()> {
        self.require_transaction()?;
        if self.is_rollback_only() {
            return Err(RepoError::RollbackOnly);
        }

        let started_at = Instant::now();
        self.flush(cancel)?;
        let committed = self.session.run(cancel, |conn| {
            conn.execute_batch("COMMIT;")?;
            Ok(())
        });
        if let Err(err) = committed {
            self.session.poison();
            error!("event=uow_commit module=repo status=error error={err}");
            return Err(err);
        }

        self.session.state.set(UnitOfWorkState::Closed);
        info!(
            "event=uow_commit module=repo status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    /// Discards staged changes and rolls the open transaction back.
    ///
    /// The token is accepted for symmetry but never short-circuits the
    /// rollback.
    pub fn rollback_transaction(&mut self, _cancel: &CancellationToken) -> RepoResult<()> {
        self.require_transaction()?;

        let discarded = self.tracker.pending_count();
        self.tracker.clear();
        let result = if self.session.conn.is_autocommit() {
            Ok(())
        } else {
            self.session
                .conn
                .execute_batch("ROLLBACK;")
                .map_err(RepoError::from)
        };
        self.session.state.set(UnitOfWorkState::Closed);
        self.session.rollback_only.set(false);

        match &result {
            Ok(()) => info!("event=uow_rollback module=repo status=ok discarded={discarded}"),
            Err(err) => error!("event=uow_rollback module=repo status=error error={err}"),
        }
        result
    }

    fn require_transaction(&self) -> RepoResult<()> {
        match self.state() {
            UnitOfWorkState::InTransaction => Ok(()),
            UnitOfWorkState::Idle => Err(RepoError::CallerMisuse("no transaction has begun")),
            UnitOfWorkState::Closed => Err(RepoError::CallerMisuse("unit of work is closed")),
        }
    }

    /// Writes every pending entry inside a savepoint.
    ///
    /// Outside an explicit transaction the savepoint is itself the
    /// transaction, so releasing it makes the writes durable.
    fn flush(&mut self, cancel: &CancellationToken) -> RepoResult<usize> {
        if !self.tracker.has_pending() {
            return self.session.run(cancel, |_| Ok(0));
        }

        let started_at = Instant::now();
        let opened = self.session.run(cancel, |conn| {
            conn.execute_batch("SAVEPOINT uow_flush;")?;
            Ok(())
        });
        if let Err(err) = opened {
            return Err(self.flush_failed(err));
        }

        let tracker = &self.tracker;
        let written = self.session.run(cancel, |conn| {
            let flushed = write_entries(conn, tracker)?;
            conn.execute_batch("RELEASE uow_flush;")?;
            Ok(flushed)
        });

        match written {
            Ok(flushed) => {
                let rows = flushed.len();
                self.tracker.accept(flushed);
                debug!(
                    "event=uow_flush module=repo status=ok rows={rows} duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(rows)
            }
            Err(err) => {
                self.session.undo_flush();
                Err(self.flush_failed(err))
            }
        }
    }

    fn flush_failed(&self, err: RepoError) -> RepoError {
        self.session.poison();
        warn!("event=uow_flush module=repo status=error error={err}");
        err
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        if self.state() != UnitOfWorkState::InTransaction || self.session.conn.is_autocommit() {
            return;
        }
        match self.session.conn.execute_batch("ROLLBACK;") {
            Ok(()) => warn!("event=uow_drop module=repo status=rolled_back"),
            Err(err) => error!("event=uow_drop module=repo status=error error={err}"),
        }
    }
}

fn write_entries(conn: &Connection, tracker: &ChangeTracker) -> RepoResult<Vec<Flushed>> {
    let now = clock::next_timestamp();
    let mut flushed = Vec::with_capacity(tracker.pending_count());

    for (index, entry) in tracker.pending() {
        let mut entity = entry.entity.clone();
        match entry.state {
            EntryState::Added => {
                *entity.audit_mut() = Audit {
                    created_at: now,
                    updated_at: now,
                };
                let id = sql::insert(conn, &entity)?;
                entity.set_id(id);
                flushed.push(Flushed::Persisted(index, entity));
            }
            EntryState::Modified => {
                entity.audit_mut().updated_at = now;
                let created_at = sql::update(conn, &entity)?.ok_or(RepoError::NotFound {
                    kind: entity.kind(),
                    id: entity.id(),
                })?;
                entity.audit_mut().created_at = created_at;
                flushed.push(Flushed::Persisted(index, entity));
            }
            EntryState::Deleted => {
                if sql::delete(conn, &entity)? == 0 {
                    return Err(RepoError::NotFound {
                        kind: entity.kind(),
                        id: entity.id(),
                    });
                }
                flushed.push(Flushed::Removed(index));
            }
            EntryState::Unchanged => {}
        }
    }

    Ok(flushed)
}
