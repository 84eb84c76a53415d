//! The pluggable scheduling policy seam.
//!
//! Policies never touch a [`crate::lane::Lane`] directly — [`SchedulerCore`]
//! (`crate::scheduler::core`) takes one [`LaneSnapshot`] per lane under the
//! lane locks, releases them, and hands the policy a plain array to reason
//! over. This is the same "snapshot under lock, read without it" discipline
//! the execution-history ring also follows.

use std::time::Duration;

use gridlock_common::ids::{LaneId, NUM_LANES};

use crate::lane::LaneSnapshot;

/// A scheduling policy selects the next lane to run and may carry its own
/// internal bookkeeping (MLFQ levels, PRR rotation cursors, ...).
pub trait SchedulingPolicy: Send {
    /// Human-readable name, used in logs and the `--algorithm` flag.
    fn name(&self) -> &'static str;

    /// Choose the next lane to grant RUNNING, or `None` if no lane is a
    /// candidate. `current` is the lane presently RUNNING, if any.
    fn select(&mut self, lanes: &[LaneSnapshot; NUM_LANES], current: Option<LaneId>) -> Option<LaneId>;

    /// Time quantum to use for the lane just selected. Most policies use a
    /// single configured quantum; MLFQ varies it by level.
    fn quantum_for(&self, lane: LaneId) -> Duration;

    /// Notified once a lane's time slice has fully completed, so policies
    /// with level/consecutive-quantum bookkeeping (MLFQ) can update it.
    fn on_slice_complete(&mut self, _lane: LaneId) {}
}

/// Lanes eligible for scheduling: READY or RUNNING, never BLOCKED.
pub(crate) fn is_candidate(snapshot: &LaneSnapshot) -> bool {
    use crate::lane::state::LaneState;
    matches!(snapshot.state, LaneState::Ready | LaneState::Running)
}
