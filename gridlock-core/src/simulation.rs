//! Simulation Loop: the `System` value that owns every subsystem by value
//! and drives one scheduling decision per tick.
//!
//! A single owning struct, not a web of `Arc`s pointing at each other —
//! `System` is the one thing wrapped in an `Arc`
//! so the vehicle generator and control threads in `gridlock-cli` can share
//! it, while everything it owns is accessed through `&self` methods that
//! take out exactly the locks they need, in rank order.

use std::time::{Duration, Instant};

use gridlock_common::config::{Algorithm, SimConfig};
use gridlock_common::error::GridlockError;
use gridlock_common::ids::LaneId;
use gridlock_common::quadrant::Movement;
use gridlock_common::vehicle::{EmergencyVehicle, VehicleId};
use tracing::{debug, info};

use crate::emergency::{EmergencyResponse, EmergencySubsystem};
use crate::lane::Lanes;
use crate::lock_manager::LockManager;
use crate::metrics::{MetricsEngine, MetricsSnapshot};
use crate::scheduler::{ExecutionRecord, SchedulerCore};

/// Everything one simulation run needs, owned by value.
pub struct System {
    pub lanes: Lanes,
    pub lock_manager: LockManager,
    pub scheduler: SchedulerCore,
    pub emergency: EmergencySubsystem,
    pub metrics: MetricsEngine,
    config: SimConfig,
    started_at: Instant,
}

/// A single direction-agnostic vehicle arrival. The movement is fixed per
/// a straight-heavy traffic mix (75% straight, 15% right, 10% left) —
/// callers that want a specific mix pass it in explicitly; the
/// default generator lives in `gridlock-cli`.
#[derive(Debug, Clone, Copy)]
pub struct Arrival {
    pub lane: LaneId,
    pub vehicle: VehicleId,
    pub movement: Movement,
}

impl System {
    pub fn new(config: SimConfig) -> Self {
        let expected_arrivals_per_min = 60.0 / ((config.arrival_min_secs + config.arrival_max_secs) / 2.0);
        Self {
            lanes: Lanes::new(config.queue_capacity),
            lock_manager: LockManager::new(config.strategy),
            scheduler: SchedulerCore::new(
                config.algorithm,
                Duration::from_secs(config.quantum_secs),
                config.context_switch,
                Duration::from_secs_f64(config.vehicle_cross_secs),
            ),
            emergency: EmergencySubsystem::new(),
            metrics: MetricsEngine::new(expected_arrivals_per_min),
            config,
            started_at: Instant::now(),
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed() >= Duration::from_secs(self.config.duration_secs)
    }

    /// Admit one vehicle arrival: enqueue it, and count an overflow in
    /// metrics if the lane was full.
    pub fn arrive(&self, arrival: Arrival) {
        let accepted = self.lanes.get(arrival.lane).enqueue(arrival.vehicle);
        if !accepted {
            self.metrics.record_overflow();
        }
    }

    /// Run one scheduling decision: pick the next lane, acquire its
    /// intersection claim through the lock manager, execute its time slice,
    /// then release. Returns `None` if no lane currently has traffic.
    ///
    /// A lane rejected as `Unsafe` is left BLOCKED by the lock manager and
    /// simply skipped this tick; the scheduler will reconsider it once
    /// [`System::retry_blocked_lanes`] or a release wakes it.
    pub fn tick(&self) -> Result<Option<ExecutionRecord>, GridlockError> {
        let Some((lane, quantum)) = self.scheduler.schedule_next_lane(&self.lanes) else {
            return Ok(None);
        };

        let movement = Movement::Straight;

        match self.lock_manager.acquire(&self.lanes, lane, movement) {
            Ok(()) => {}
            Err(GridlockError::Unsafe { .. }) => {
                debug!(%lane, "banker rejected request, lane deferred");
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        let wait = self.lanes.get(lane).waiting_time();
        let record = self.scheduler.execute_time_slice(&self.lanes, lane, quantum);
        self.metrics.record_service(lane, record.vehicles_processed, wait);
        self.lock_manager.release(&self.lanes, lane)?;

        Ok(Some(record))
    }

    /// Wake every BLOCKED lane so the scheduler reconsiders them on the
    /// next tick, as part of deadlock-resolution retry.
    pub fn retry_blocked_lanes(&self) {
        for lane in &[LaneId::North, LaneId::South, LaneId::East, LaneId::West] {
            let handle = self.lanes.get(*lane);
            if handle.state() == crate::lane::state::LaneState::Blocked {
                handle.unblock();
            }
        }
    }

    pub fn declare_emergency(&self, vehicle: &EmergencyVehicle) -> Result<(), GridlockError> {
        info!(lane = %vehicle.lane, kind = %vehicle.kind, "emergency vehicle declared");
        self.emergency.declare(&self.lanes, &self.lock_manager, vehicle)
    }

    pub fn clear_emergency(&self) -> Result<Option<EmergencyResponse>, GridlockError> {
        self.emergency.clear(&self.lanes, &self.lock_manager)
    }

    pub fn switch_algorithm(&self, algorithm: Algorithm) {
        info!(?algorithm, "switching scheduling algorithm");
        self.scheduler
            .switch_algorithm(algorithm, Duration::from_secs(self.config.quantum_secs));
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot(
            self.lock_manager.banker().deadlock_preventions(),
            self.scheduler.total_context_switches(),
        )
    }
}
