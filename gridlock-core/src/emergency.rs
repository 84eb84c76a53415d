//! Emergency Subsystem: single active emergency vehicle, preemption of the
//! current intersection holder, and response-time tracking.
//!
//! A second emergency vehicle arriving mid-preemption is dropped with a
//! warning rather than queued (see `DESIGN.md`) — queuing would need its
//! own priority rules this system doesn't otherwise have a use for.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use gridlock_common::error::GridlockError;
use gridlock_common::ids::LaneId;
use gridlock_common::vehicle::EmergencyVehicle;

use crate::lane::Lanes;
use crate::lock_manager::LockManager;

#[derive(Debug, Clone, Copy)]
struct ActiveEmergency {
    lane: LaneId,
    declared_at: Instant,
    approach_time_secs: f64,
    crossing_duration_secs: f64,
}

/// Response-time record for the most recently cleared emergency, surfaced
/// in metrics snapshots and CSV export.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmergencyResponse {
    pub lane: LaneId,
    pub response_time: Duration,
}

#[derive(Debug, Default)]
struct EmergencyState {
    active: Option<ActiveEmergency>,
    last_response: Option<EmergencyResponse>,
    dropped_count: u64,
}

/// Coordinates emergency preemption on top of a [`LockManager`]. Holds its
/// own lock, acquired after `global_state_lock` and before `scheduler_lock`
/// is never required simultaneously — emergency declaration and clearance
/// each make one self-contained call into the lock manager.
pub struct EmergencySubsystem {
    state: Mutex<EmergencyState>,
}

impl EmergencySubsystem {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(EmergencyState::default()),
        }
    }

    /// Declare `vehicle` as the active emergency, preempting whatever lane
    /// currently holds the intersection. If an emergency is already active,
    /// this one is dropped and counted.
    pub fn declare(
        &self,
        lanes: &Lanes,
        lock_manager: &LockManager,
        vehicle: &EmergencyVehicle,
    ) -> Result<(), GridlockError> {
        let mut state = self.state.lock().unwrap();
        if state.active.is_some() {
            state.dropped_count += 1;
            return Err(GridlockError::InvalidState {
                reason: format!(
                    "emergency vehicle {} dropped: an emergency is already active",
                    vehicle.vehicle_id
                ),
            });
        }

        let lane_handle = lanes.get(vehicle.lane);
        lane_handle.elevate_to_emergency();
        lock_manager.acquire_emergency(lanes, vehicle.lane)?;

        state.active = Some(ActiveEmergency {
            lane: vehicle.lane,
            declared_at: Instant::now(),
            approach_time_secs: vehicle.approach_time_secs,
            crossing_duration_secs: vehicle.crossing_duration_secs,
        });
        Ok(())
    }

    /// Clear the active emergency: release the intersection, restore the
    /// lane's priority, and record the response time. The response time is
    /// the vehicle's own simulated `approach_time_secs`, not wall-clock
    /// time since declaration.
    pub fn clear(&self, lanes: &Lanes, lock_manager: &LockManager) -> Result<Option<EmergencyResponse>, GridlockError> {
        let mut state = self.state.lock().unwrap();
        let Some(active) = state.active.take() else {
            return Ok(None);
        };

        lock_manager.release(lanes, active.lane)?;
        lanes.get(active.lane).restore_priority();

        let response = EmergencyResponse {
            lane: active.lane,
            response_time: Duration::from_secs_f64(active.approach_time_secs),
        };
        state.last_response = Some(response);
        Ok(Some(response))
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().unwrap().active.is_some()
    }

    /// Whether the active emergency has occupied the intersection for at
    /// least its `crossing_duration_secs` and is due to be cleared. Callers
    /// driving the tick loop poll this each iteration and call
    /// [`EmergencySubsystem::clear`] when it's true.
    pub fn is_due_to_clear(&self) -> bool {
        match self.state.lock().unwrap().active {
            Some(active) => active.declared_at.elapsed() >= Duration::from_secs_f64(active.crossing_duration_secs),
            None => false,
        }
    }

    pub fn active_lane(&self) -> Option<LaneId> {
        self.state.lock().unwrap().active.map(|a| a.lane)
    }

    pub fn last_response(&self) -> Option<EmergencyResponse> {
        self.state.lock().unwrap().last_response
    }

    pub fn dropped_count(&self) -> u64 {
        self.state.lock().unwrap().dropped_count
    }
}

impl Default for EmergencySubsystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlock_common::config::Strategy;
    use gridlock_common::vehicle::{EmergencyKind, VehicleId};

    fn vehicle(lane: LaneId) -> EmergencyVehicle {
        EmergencyVehicle::new(EmergencyKind::Ambulance, lane, VehicleId(1), 0.0, 5.0)
    }

    #[test]
    fn declare_preempts_current_holder() {
        let lanes = Lanes::new(20);
        let lock_manager = LockManager::new(Strategy::Hybrid);
        let emergency = EmergencySubsystem::new();

        lock_manager
            .acquire(&lanes, LaneId::North, gridlock_common::quadrant::Movement::Straight)
            .unwrap();
        emergency.declare(&lanes, &lock_manager, &vehicle(LaneId::South)).unwrap();

        assert_eq!(lock_manager.intersection().holder(), Some(LaneId::South));
        assert!(emergency.is_active());
    }

    #[test]
    fn clear_restores_priority_and_releases() {
        let lanes = Lanes::new(20);
        let lock_manager = LockManager::new(Strategy::Hybrid);
        let emergency = EmergencySubsystem::new();

        emergency.declare(&lanes, &lock_manager, &vehicle(LaneId::East)).unwrap();
        let response = emergency.clear(&lanes, &lock_manager).unwrap().unwrap();

        assert_eq!(response.lane, LaneId::East);
        assert!(!emergency.is_active());
        assert_eq!(lanes.get(LaneId::East).priority(), crate::lane::DEFAULT_PRIORITY);
        assert!(lock_manager.intersection().is_vacant());
    }

    #[test]
    fn second_emergency_while_active_is_dropped() {
        let lanes = Lanes::new(20);
        let lock_manager = LockManager::new(Strategy::Hybrid);
        let emergency = EmergencySubsystem::new();

        emergency.declare(&lanes, &lock_manager, &vehicle(LaneId::North)).unwrap();
        let result = emergency.declare(&lanes, &lock_manager, &vehicle(LaneId::South));
        assert!(result.is_err());
        assert_eq!(emergency.dropped_count(), 1);
        assert_eq!(emergency.active_lane(), Some(LaneId::North));
    }

    #[test]
    fn response_time_is_the_vehicles_approach_time_not_wall_clock() {
        let lanes = Lanes::new(20);
        let lock_manager = LockManager::new(Strategy::Hybrid);
        let emergency = EmergencySubsystem::new();

        let vehicle = EmergencyVehicle::new(EmergencyKind::Fire, LaneId::West, VehicleId(7), 4.5, 2.0);
        emergency.declare(&lanes, &lock_manager, &vehicle).unwrap();
        let response = emergency.clear(&lanes, &lock_manager).unwrap().unwrap();

        assert_eq!(response.response_time, Duration::from_secs_f64(4.5));
    }

    #[test]
    fn due_to_clear_once_crossing_duration_elapses() {
        let lanes = Lanes::new(20);
        let lock_manager = LockManager::new(Strategy::Hybrid);
        let emergency = EmergencySubsystem::new();

        let vehicle = EmergencyVehicle::new(EmergencyKind::Police, LaneId::North, VehicleId(2), 1.0, 0.0);
        emergency.declare(&lanes, &lock_manager, &vehicle).unwrap();

        assert!(emergency.is_due_to_clear());
        emergency.clear(&lanes, &lock_manager).unwrap();
        assert!(!emergency.is_due_to_clear());
    }

    #[test]
    fn clear_with_no_active_emergency_is_a_no_op() {
        let lanes = Lanes::new(20);
        let lock_manager = LockManager::new(Strategy::Hybrid);
        let emergency = EmergencySubsystem::new();
        assert_eq!(emergency.clear(&lanes, &lock_manager).unwrap(), None);
    }
}
