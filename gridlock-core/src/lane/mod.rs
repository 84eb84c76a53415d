//! Lane: per-lane state, queue, priority, and timing, guarded by a single
//! lock with a condition variable for deadlock-resolution and shutdown
//! signalling.
//!
//! Lock order: `lane_lock[i]` is rank 5, the lowest in the chain — a thread
//! already holding `banker_lock` or `intersection_lock` may acquire a
//! lane's lock, never the reverse.

pub mod state;

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use gridlock_common::ids::LaneId;
use gridlock_common::quadrant::QuadrantMask;
use gridlock_common::vehicle::{EMERGENCY_PRIORITY, VehicleId};

use crate::queue::VehicleQueue;
use state::{LaneEvent, LaneState, LaneStateMachine, TransitionResult};

/// Default priority for a non-emergency lane; lower is more urgent.
pub const DEFAULT_PRIORITY: i32 = 5;

/// Mutable lane fields, guarded by [`Lane::inner`].
#[derive(Debug)]
pub struct LaneInner {
    machine: LaneStateMachine,
    queue: VehicleQueue,
    priority: i32,
    saved_priority: Option<i32>,
    last_arrival: Instant,
    last_service: Instant,
    total_vehicles_served: u64,
    requested_quadrants: QuadrantMask,
    allocated_quadrants: QuadrantMask,
}

/// A read-only, lock-free copy of a lane's state for UI/metrics consumers —
/// snapshot under the lock, then read without it.
#[derive(Debug, Clone, Copy)]
pub struct LaneSnapshot {
    pub id: LaneId,
    pub state: LaneState,
    pub queue_len: usize,
    pub queue_capacity: usize,
    pub priority: i32,
    pub waiting_time: Duration,
    pub total_vehicles_served: u64,
    pub allocated_quadrants: QuadrantMask,
}

/// One of the four fixed intersection approaches.
#[derive(Debug)]
pub struct Lane {
    pub id: LaneId,
    inner: Mutex<LaneInner>,
    condvar: Condvar,
}

impl Lane {
    pub fn new(id: LaneId, queue_capacity: usize) -> Self {
        let now = Instant::now();
        Self {
            id,
            inner: Mutex::new(LaneInner {
                machine: LaneStateMachine::new(),
                queue: VehicleQueue::new(queue_capacity),
                priority: DEFAULT_PRIORITY,
                saved_priority: None,
                last_arrival: now,
                last_service: now,
                total_vehicles_served: 0,
                requested_quadrants: QuadrantMask::EMPTY,
                allocated_quadrants: QuadrantMask::EMPTY,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Enqueue a vehicle. Transitions WAITING → READY if the queue was
    /// empty. Returns `false` (and the queue counts an overflow) if full.
    pub fn enqueue(&self, vehicle: VehicleId) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let was_empty = inner.queue.is_empty();
        let accepted = inner.queue.enqueue(vehicle);
        if accepted {
            inner.last_arrival = Instant::now();
            if was_empty && inner.machine.state() == LaneState::Waiting {
                inner.machine.handle_event(LaneEvent::Enqueued);
            }
        }
        drop(inner);
        self.condvar.notify_all();
        accepted
    }

    /// Dequeue the oldest vehicle and credit the lane's service counter.
    pub fn dequeue(&self) -> Option<VehicleId> {
        let mut inner = self.inner.lock().unwrap();
        let vehicle = inner.queue.dequeue();
        if vehicle.is_some() {
            inner.total_vehicles_served += 1;
        }
        vehicle
    }

    /// Grant this lane the RUNNING role (scheduler context-switch-in).
    /// Resets the waiting-time clock.
    pub fn grant(&self) -> TransitionResult {
        let mut inner = self.inner.lock().unwrap();
        let result = inner.machine.handle_event(LaneEvent::Granted);
        if matches!(result, TransitionResult::Ok(_)) {
            inner.last_service = Instant::now();
        }
        result
    }

    /// End the current time slice, transitioning RUNNING → READY or WAITING
    /// depending on whether the queue drained.
    pub fn end_time_slice(&self) -> TransitionResult {
        let mut inner = self.inner.lock().unwrap();
        let event = if inner.queue.is_empty() {
            LaneEvent::SliceEndEmpty
        } else {
            LaneEvent::SliceEndNonEmpty
        };
        inner.machine.handle_event(event)
    }

    /// Mark this lane BLOCKED after a failed banker safety check.
    pub fn mark_blocked(&self) -> TransitionResult {
        let mut inner = self.inner.lock().unwrap();
        inner.machine.handle_event(LaneEvent::SafetyRejected)
    }

    /// Release a BLOCKED lane back to READY and wake anyone waiting on it.
    pub fn unblock(&self) -> TransitionResult {
        let mut inner = self.inner.lock().unwrap();
        let result = inner.machine.handle_event(LaneEvent::Unblocked);
        drop(inner);
        self.condvar.notify_all();
        result
    }

    /// Current state.
    pub fn state(&self) -> LaneState {
        self.inner.lock().unwrap().machine.state()
    }

    /// Current queue length.
    pub fn queue_len(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().queue.is_empty()
    }

    /// Elapsed time since this lane was last granted service.
    pub fn waiting_time(&self) -> Duration {
        self.inner.lock().unwrap().last_service.elapsed()
    }

    /// Timestamp of the most recent arrival, for SJF tie-breaking.
    pub fn last_arrival(&self) -> Instant {
        self.inner.lock().unwrap().last_arrival
    }

    /// Current priority (lower = more urgent).
    pub fn priority(&self) -> i32 {
        self.inner.lock().unwrap().priority
    }

    /// Set the priority directly.
    pub fn set_priority(&self, priority: i32) {
        self.inner.lock().unwrap().priority = priority;
    }

    /// Elevate this lane to emergency priority, stashing the prior value so
    /// [`Lane::restore_priority`] can undo it on clearance.
    pub fn elevate_to_emergency(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.saved_priority.is_none() {
            inner.saved_priority = Some(inner.priority);
        }
        inner.priority = EMERGENCY_PRIORITY;
    }

    /// Undo [`Lane::elevate_to_emergency`], restoring the prior priority.
    pub fn restore_priority(&self) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(saved) = inner.saved_priority.take() {
            inner.priority = saved;
        }
    }

    /// Record the quadrants this lane currently requests/holds. Called by
    /// the lock manager, never inferred by the lane itself.
    pub fn set_requested_quadrants(&self, mask: QuadrantMask) {
        self.inner.lock().unwrap().requested_quadrants = mask;
    }

    pub fn set_allocated_quadrants(&self, mask: QuadrantMask) {
        self.inner.lock().unwrap().allocated_quadrants = mask;
    }

    pub fn requested_quadrants(&self) -> QuadrantMask {
        self.inner.lock().unwrap().requested_quadrants
    }

    pub fn allocated_quadrants(&self) -> QuadrantMask {
        self.inner.lock().unwrap().allocated_quadrants
    }

    pub fn total_vehicles_served(&self) -> u64 {
        self.inner.lock().unwrap().total_vehicles_served
    }

    /// Wait until woken by an enqueue, unblock, or shutdown broadcast, or
    /// until `timeout` elapses. Used by deadlock-resolution retry loops.
    pub fn wait_timeout(&self, timeout: Duration) {
        let inner = self.inner.lock().unwrap();
        let _ = self.condvar.wait_timeout(inner, timeout).unwrap();
    }

    /// Broadcast-wake anyone waiting on this lane's condition variable
    /// (shutdown or deadlock-resolution signalling).
    pub fn broadcast(&self) {
        self.condvar.notify_all();
    }

    /// Snapshot all fields under one lock acquisition, for UI/metrics
    /// consumers that must not hold the lane lock while they work.
    pub fn snapshot(&self) -> LaneSnapshot {
        let inner = self.inner.lock().unwrap();
        LaneSnapshot {
            id: self.id,
            state: inner.machine.state(),
            queue_len: inner.queue.len(),
            queue_capacity: inner.queue.capacity(),
            priority: inner.priority,
            waiting_time: inner.last_service.elapsed(),
            total_vehicles_served: inner.total_vehicles_served,
            allocated_quadrants: inner.allocated_quadrants,
        }
    }

    pub fn queue_overflow_count(&self) -> u64 {
        self.inner.lock().unwrap().queue.overflow_count()
    }
}

/// The four lanes, indexable by [`LaneId`]. Owned by value inside
/// [`crate::simulation::System`] and shared across threads behind an `Arc`.
#[derive(Debug)]
pub struct Lanes {
    lanes: [Lane; gridlock_common::ids::NUM_LANES],
}

impl Lanes {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            lanes: LaneId::ALL.map(|id| Lane::new(id, queue_capacity)),
        }
    }

    pub fn get(&self, id: LaneId) -> &Lane {
        &self.lanes[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.iter()
    }

    /// One lock acquisition per lane, collected into a plain array so
    /// downstream readers (scheduler policies, metrics, UI) never touch a
    /// lane lock themselves.
    pub fn snapshot_all(&self) -> [LaneSnapshot; gridlock_common::ids::NUM_LANES] {
        let mut out = [self.lanes[0].snapshot(); gridlock_common::ids::NUM_LANES];
        for (i, lane) in self.lanes.iter().enumerate() {
            out[i] = lane.snapshot();
        }
        out
    }

    pub fn broadcast_all(&self) {
        for lane in &self.lanes {
            lane.broadcast();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_transitions_waiting_to_ready() {
        let lane = Lane::new(LaneId::North, 4);
        assert_eq!(lane.state(), LaneState::Waiting);
        assert!(lane.enqueue(VehicleId(1)));
        assert_eq!(lane.state(), LaneState::Ready);
    }

    #[test]
    fn full_cycle_drains_to_waiting() {
        let lane = Lane::new(LaneId::North, 4);
        lane.enqueue(VehicleId(1));
        assert!(matches!(lane.grant(), TransitionResult::Ok(LaneState::Running)));
        lane.dequeue();
        assert!(matches!(
            lane.end_time_slice(),
            TransitionResult::Ok(LaneState::Waiting)
        ));
    }

    #[test]
    fn full_cycle_stays_ready_when_nonempty() {
        let lane = Lane::new(LaneId::North, 4);
        lane.enqueue(VehicleId(1));
        lane.enqueue(VehicleId(2));
        lane.grant();
        lane.dequeue();
        assert!(matches!(
            lane.end_time_slice(),
            TransitionResult::Ok(LaneState::Ready)
        ));
    }

    #[test]
    fn overflow_rejected_and_counted() {
        let lane = Lane::new(LaneId::North, 1);
        assert!(lane.enqueue(VehicleId(1)));
        assert!(!lane.enqueue(VehicleId(2)));
        assert_eq!(lane.queue_overflow_count(), 1);
    }

    #[test]
    fn emergency_elevation_and_restore() {
        let lane = Lane::new(LaneId::East, 4);
        assert_eq!(lane.priority(), DEFAULT_PRIORITY);
        lane.elevate_to_emergency();
        assert_eq!(lane.priority(), EMERGENCY_PRIORITY);
        lane.restore_priority();
        assert_eq!(lane.priority(), DEFAULT_PRIORITY);
    }

    #[test]
    fn double_elevation_preserves_original_priority() {
        let lane = Lane::new(LaneId::East, 4);
        lane.set_priority(3);
        lane.elevate_to_emergency();
        lane.elevate_to_emergency();
        lane.restore_priority();
        assert_eq!(lane.priority(), 3);
    }

    #[test]
    fn blocked_then_unblocked() {
        let lane = Lane::new(LaneId::South, 4);
        lane.enqueue(VehicleId(1));
        assert!(matches!(lane.mark_blocked(), TransitionResult::Ok(LaneState::Blocked)));
        assert!(matches!(lane.unblock(), TransitionResult::Ok(LaneState::Ready)));
    }

    #[test]
    fn snapshot_reflects_state() {
        let lane = Lane::new(LaneId::West, 4);
        lane.enqueue(VehicleId(1));
        let snap = lane.snapshot();
        assert_eq!(snap.id, LaneId::West);
        assert_eq!(snap.queue_len, 1);
        assert_eq!(snap.state, LaneState::Ready);
    }
}
