//! Units of work
//!
//! Each unit of work owns exactly one forked scope and disposes it on every
//! exit path. Cancellation and deadlines ride alongside the scope and never
//! affect its lifecycle: a cancelled unit still disposes normally.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ScopeError, ScopeResult};
use crate::Scope;

/// Fork a scope from `parent`, seed it, run `handler` against it and dispose
/// it afterwards, including when `handler` panics.
pub fn run_unit<R>(
    parent: &Scope,
    seed: impl FnOnce(&Scope),
    handler: impl FnOnce(&Scope) -> R,
) -> R {
    let unit = parent.fork();
    seed(&unit);
    handler(&unit)
}

/// A forked scope paired with a cancellation token and optional deadline
#[derive(Debug)]
pub struct UnitOfWork {
    scope: Scope,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl UnitOfWork {
    /// Fork a fresh unit from `parent`
    pub fn begin(parent: &Scope) -> Self {
        Self {
            scope: parent.fork(),
            cancel: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Expire the unit `timeout` from now. A timeout too large to represent
    /// leaves the unit without a deadline.
    pub fn with_deadline(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    /// Tie the unit to an externally owned token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Background sub-unit: child scope, child token, same deadline
    pub fn fork(&self) -> UnitOfWork {
        UnitOfWork {
            scope: self.scope.fork(),
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    /// The unit's own scope
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Token observed by [`UnitOfWork::run`]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Instant after which the unit counts as cancelled
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel this unit and every unit forked from it
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancelled explicitly or past the deadline
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.remaining() == Some(Duration::ZERO)
    }

    /// Time left before the deadline, if one is set
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Drive `work` until it completes, the unit is cancelled or the
    /// deadline passes.
    pub async fn run<F: Future>(&self, work: F) -> ScopeResult<F::Output> {
        let deadline = self.deadline;
        let expiry = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            output = work => Ok(output),
            _ = self.cancel.cancelled() => {
                debug!(scope_id = self.scope.id(), "unit of work cancelled");
                Err(ScopeError::Cancelled)
            }
            _ = expiry => {
                debug!(scope_id = self.scope.id(), "unit of work deadline exceeded");
                Err(ScopeError::DeadlineExceeded)
            }
        }
    }

    /// Dispose the unit's scope
    pub fn finish(self) {
        drop(self);
    }
}
