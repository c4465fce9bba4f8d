//! Request dispatch: validation first, then the handler.
//!
//! # Invariants
//! - A request that fails validation never reaches the unit of work.
//! - `in_transaction` leaves no open transaction behind on any error path.

use crate::repo::{RepoError, UnitOfWork, UnitOfWorkState};
use crate::service::error::{AppError, AppResult};
use crate::storage::FileStorage;
use crate::validation::Validate;
use log::{debug, error, warn};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Collaborators available to every handler.
#[derive(Clone, Copy)]
pub struct HandlerContext<'a> {
    pub cancel: &'a CancellationToken,
    pub files: &'a dyn FileStorage,
}

impl<'a> HandlerContext<'a> {
    pub fn new(cancel: &'a CancellationToken, files: &'a dyn FileStorage) -> Self {
        Self { cancel, files }
    }
}

/// A command or query with its response type.
pub trait Request: Validate {
    type Response;

    /// Stable handler name used in logs.
    const NAME: &'static str;

    fn handle(self, uow: &mut UnitOfWork, ctx: &HandlerContext<'_>) -> AppResult<Self::Response>;
}

/// Validates `request` and runs its handler against `uow`.
pub fn dispatch<R: Request>(
    request: R,
    uow: &mut UnitOfWork,
    ctx: &HandlerContext<'_>,
) -> AppResult<R::Response> {
    let errors = request.validate();
    if !errors.is_empty() {
        warn!(
            "event=dispatch module=service handler={} status=invalid fields={}",
            R::NAME,
            errors.len()
        );
        return Err(AppError::Validation(errors));
    }

    let started_at = Instant::now();
    let result = request.handle(uow, ctx);
    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => debug!(
            "event=dispatch module=service handler={} status=ok duration_ms={duration_ms}",
            R::NAME
        ),
        Err(err) => warn!(
            "event=dispatch module=service handler={} status=error code={} duration_ms={duration_ms}",
            R::NAME,
            err.code()
        ),
    }
    result
}

/// Runs `body` inside an explicit transaction.
///
/// Commits when `body` succeeds; otherwise rolls back and returns the
/// original error. Repository failures are reported under `code`.
pub(crate) fn in_transaction<T>(
    uow: &mut UnitOfWork,
    cancel: &CancellationToken,
    code: &'static str,
    action: &str,
    body: impl FnOnce(&mut UnitOfWork) -> AppResult<T>,
) -> AppResult<T> {
    let fail = |err: RepoError| AppError::from_repo(code, action, err);

    uow.begin_transaction(cancel).map_err(fail)?;
    let outcome = body(uow).and_then(|value| {
        uow.commit_transaction(cancel).map_err(fail)?;
        Ok(value)
    });

    if outcome.is_err() && uow.state() == UnitOfWorkState::InTransaction {
        if let Err(err) = uow.rollback_transaction(cancel) {
            error!("event=transaction_rollback module=service status=error code={code} error={err}");
        }
    }
    outcome
}
