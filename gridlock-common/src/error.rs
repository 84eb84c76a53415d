//! The `GridlockError` hierarchy.
//!
//! Error *kinds*, not accident: every variant here maps one-to-one onto a
//! distinct failure condition the core needs to distinguish. Recoverable kinds
//! (`ClaimExceeded`, `Insufficient`, `Unsafe`, `LockBusy`, `QueueFull`) are
//! expected outcomes the core counts and continues past; only `FatalInit`
//! is meant to reach a process exit path.

use thiserror::Error;

use crate::ids::LaneId;

/// Errors raised by the gridlock core and its callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridlockError {
    /// Banker request asked for more than the lane's remaining `need`.
    #[error("lane {lane}: claim exceeds declared need")]
    ClaimExceeded { lane: LaneId },

    /// Banker request asked for more than is currently `available`.
    #[error("lane {lane}: requested quadrants not available")]
    Insufficient { lane: LaneId },

    /// Tentative allocation failed the Dijkstra-Habermann safety test and
    /// was rolled back.
    #[error("lane {lane}: request would leave the system in an unsafe state")]
    Unsafe { lane: LaneId },

    /// A try-acquire path found the resource contended.
    #[error("lock busy")]
    LockBusy,

    /// Enqueue attempted against a full bounded queue.
    #[error("lane {lane}: queue is full, vehicle dropped")]
    QueueFull { lane: LaneId },

    /// `acquire_with_timeout` exceeded its deadline.
    #[error("acquire timed out after {elapsed_secs:.3}s")]
    Timeout { elapsed_secs: f64 },

    /// The validator detected an invariant violation in derived metrics.
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    /// Initialization failed; this is the only kind that should ever
    /// propagate to a process exit path.
    #[error("initialization failed: {reason}")]
    FatalInit { reason: String },
}

/// Convenience alias used throughout the workspace.
pub type GridlockResult<T> = Result<T, GridlockError>;

impl GridlockError {
    /// True for kinds the core expects and counts rather than treating as
    /// exceptional — used by callers deciding whether to log at `warn!` or
    /// `error!`.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, GridlockError::FatalInit { .. })
    }
}
