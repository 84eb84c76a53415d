//! Lane state machine.
//!
//! ```text
//! WAITING → READY      on enqueue (queue becomes non-empty)
//! READY   → RUNNING    on scheduler grant (context switch in)
//! RUNNING → READY      on time-slice end, queue non-empty
//! RUNNING → WAITING    on time-slice end, queue empty
//! any     → BLOCKED    on failed banker safety check (deferred retry)
//! BLOCKED → READY      on deadlock-resolution signal
//! ```

/// A lane's position in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneState {
    Waiting,
    Ready,
    Running,
    Blocked,
}

/// Event driving a lane state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneEvent {
    /// Queue transitioned from empty to non-empty.
    Enqueued,
    /// Scheduler granted this lane the RUNNING role.
    Granted,
    /// Time slice ended, queue still has vehicles.
    SliceEndNonEmpty,
    /// Time slice ended, queue is empty.
    SliceEndEmpty,
    /// Banker safety test rejected this lane's request.
    SafetyRejected,
    /// Deadlock-resolution signal released a blocked lane.
    Unblocked,
}

/// Result of a transition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    Ok(LaneState),
    Rejected(&'static str),
}

/// Pure transition table. Holds no lock of its own — the enclosing
/// [`crate::lane::Lane`] guards this behind a mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneStateMachine {
    state: LaneState,
}

impl LaneStateMachine {
    pub const fn new() -> Self {
        Self {
            state: LaneState::Waiting,
        }
    }

    #[inline]
    pub const fn state(&self) -> LaneState {
        self.state
    }

    pub fn handle_event(&mut self, event: LaneEvent) -> TransitionResult {
        use LaneEvent::*;
        use LaneState::*;

        let next = match (self.state, event) {
            (Waiting, Enqueued) => Ready,
            (Ready, Granted) => Running,
            (Running, SliceEndNonEmpty) => Ready,
            (Running, SliceEndEmpty) => Waiting,
            // SafetyRejected can hit a lane from either WAITING or READY,
            // deferring it for retry.
            (Waiting, SafetyRejected) | (Ready, SafetyRejected) => Blocked,
            (Blocked, Unblocked) => Ready,
            _ => return TransitionResult::Rejected(invalid_reason(self.state, event)),
        };

        self.state = next;
        TransitionResult::Ok(next)
    }

    /// True once the queue is non-empty and the lane may be scheduled.
    pub const fn is_schedulable(&self) -> bool {
        matches!(self.state, LaneState::Ready | LaneState::Running)
    }
}

impl Default for LaneStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid_reason(state: LaneState, event: LaneEvent) -> &'static str {
    use LaneEvent::*;
    use LaneState::*;
    match (state, event) {
        (Running, SafetyRejected) => "a RUNNING lane already holds its allocation",
        (Blocked, Enqueued) | (Blocked, Granted) => "BLOCKED lane must be unblocked first",
        (Waiting, Granted) | (Ready, Enqueued) => "lane not in the expected pre-state",
        _ => "invalid transition for current state",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LaneEvent::*;
    use LaneState::*;

    #[test]
    fn initial_state_is_waiting() {
        assert_eq!(LaneStateMachine::new().state(), Waiting);
    }

    #[test]
    fn full_service_cycle_queue_drains() {
        let mut sm = LaneStateMachine::new();
        assert_eq!(sm.handle_event(Enqueued), TransitionResult::Ok(Ready));
        assert_eq!(sm.handle_event(Granted), TransitionResult::Ok(Running));
        assert_eq!(sm.handle_event(SliceEndEmpty), TransitionResult::Ok(Waiting));
    }

    #[test]
    fn full_service_cycle_queue_remains() {
        let mut sm = LaneStateMachine::new();
        sm.handle_event(Enqueued);
        sm.handle_event(Granted);
        assert_eq!(
            sm.handle_event(SliceEndNonEmpty),
            TransitionResult::Ok(Ready)
        );
    }

    #[test]
    fn safety_rejection_from_ready_blocks() {
        let mut sm = LaneStateMachine::new();
        sm.handle_event(Enqueued);
        assert_eq!(sm.handle_event(SafetyRejected), TransitionResult::Ok(Blocked));
    }

    #[test]
    fn blocked_unblocks_to_ready() {
        let mut sm = LaneStateMachine::new();
        sm.handle_event(Enqueued);
        sm.handle_event(SafetyRejected);
        assert_eq!(sm.handle_event(Unblocked), TransitionResult::Ok(Ready));
    }

    #[test]
    fn running_rejects_safety_rejected() {
        let mut sm = LaneStateMachine::new();
        sm.handle_event(Enqueued);
        sm.handle_event(Granted);
        assert!(matches!(
            sm.handle_event(SafetyRejected),
            TransitionResult::Rejected(_)
        ));
    }

    #[test]
    fn waiting_rejects_granted() {
        let mut sm = LaneStateMachine::new();
        assert!(matches!(sm.handle_event(Granted), TransitionResult::Rejected(_)));
    }

    #[test]
    fn is_schedulable_reflects_ready_and_running() {
        let mut sm = LaneStateMachine::new();
        assert!(!sm.is_schedulable());
        sm.handle_event(Enqueued);
        assert!(sm.is_schedulable());
        sm.handle_event(Granted);
        assert!(sm.is_schedulable());
    }
}
