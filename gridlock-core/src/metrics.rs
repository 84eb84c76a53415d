//! Metrics Engine: throughput, average wait, utilization,
//! and Jain's fairness index, with validation and sanitization so a
//! transient bug in a feeding counter never reaches the UI or CSV export as
//! a nonsensical number.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use gridlock_common::ids::{LaneId, NUM_LANES};
use tracing::warn;

/// A point-in-time readout, computed from the running counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    pub total_vehicles_processed: u64,
    pub vehicles_per_minute: f64,
    pub avg_wait_time_secs: f64,
    pub utilization: f64,
    pub fairness_index: f64,
    pub context_switches: u64,
    pub deadlocks_prevented: u64,
    pub queue_overflows: u64,
    pub elapsed_secs: f64,
}

impl MetricsSnapshot {
    /// Utilization and fairness must lie in `[0, 1]`, and `elapsed_secs`
    /// must be non-negative.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.utilization) {
            return Err(format!("utilization {} out of [0, 1]", self.utilization));
        }
        if !(0.0..=1.0).contains(&self.fairness_index) {
            return Err(format!("fairness_index {} out of [0, 1]", self.fairness_index));
        }
        if self.elapsed_secs < 0.0 {
            return Err(format!("elapsed_secs {} is negative", self.elapsed_secs));
        }
        Ok(())
    }

    /// Clamp out-of-range fields in place. Never called on a value that
    /// passed [`MetricsSnapshot::validate`].
    pub fn sanitize(&mut self) {
        self.utilization = self.utilization.clamp(0.0, 1.0);
        self.fairness_index = self.fairness_index.clamp(0.0, 1.0);
        self.elapsed_secs = self.elapsed_secs.max(0.0);
    }
}

#[derive(Debug)]
struct MetricsInner {
    total_vehicles_processed: u64,
    per_lane_wait_sum_secs: [f64; NUM_LANES],
    per_lane_served: [u64; NUM_LANES],
    queue_overflows: u64,
    measurement_start: Instant,
}

impl MetricsInner {
    fn new(now: Instant) -> Self {
        Self {
            total_vehicles_processed: 0,
            per_lane_wait_sum_secs: [0.0; NUM_LANES],
            per_lane_served: [0; NUM_LANES],
            queue_overflows: 0,
            measurement_start: now,
        }
    }
}

/// Guards the running counters behind a single lock, at `global_state_lock`
/// rank — acquired first, held briefly, never nested under any other
/// subsystem lock.
pub struct MetricsEngine {
    inner: Mutex<MetricsInner>,
    /// Arrivals/minute the simulation was configured to generate, used to
    /// compute utilization as actual-vs-expected throughput.
    expected_arrivals_per_min: f64,
}

impl MetricsEngine {
    pub fn new(expected_arrivals_per_min: f64) -> Self {
        Self {
            inner: Mutex::new(MetricsInner::new(Instant::now())),
            expected_arrivals_per_min,
        }
    }

    /// Credit `vehicles` vehicles served by `lane`, each having waited
    /// `wait_per_vehicle` since the lane's last recorded arrival. Wait is
    /// measured against the lane-level arrival timestamp, not a per-vehicle
    /// one — there is no per-vehicle clock in the data model.
    pub fn record_service(&self, lane: LaneId, vehicles: u64, wait_per_vehicle: Duration) {
        if vehicles == 0 {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        inner.total_vehicles_processed += vehicles;
        inner.per_lane_served[lane.index()] += vehicles;
        inner.per_lane_wait_sum_secs[lane.index()] += wait_per_vehicle.as_secs_f64() * vehicles as f64;
    }

    pub fn record_overflow(&self) {
        self.inner.lock().unwrap().queue_overflows += 1;
    }

    /// Compute a snapshot, validating and sanitizing it before returning.
    /// An invalid snapshot is logged, never a hard failure.
    ///
    /// `context_switches` is supplied by the caller (the scheduler's own
    /// counter, the only place that knows whether the running lane actually
    /// changed) rather than tracked here, the same way `deadlocks_prevented`
    /// is sourced from the banker engine.
    pub fn snapshot(&self, deadlocks_prevented: u64, context_switches: u64) -> MetricsSnapshot {
        let inner = self.inner.lock().unwrap();
        let elapsed = inner.measurement_start.elapsed();
        let elapsed_secs = elapsed.as_secs_f64();
        let elapsed_minutes = (elapsed_secs / 60.0).max(1.0 / 60.0);

        let active_lanes: Vec<usize> = (0..NUM_LANES).filter(|&i| inner.per_lane_served[i] > 0).collect();

        let avg_wait_time_secs = if active_lanes.is_empty() {
            0.0
        } else {
            let sum: f64 = active_lanes
                .iter()
                .map(|&i| inner.per_lane_wait_sum_secs[i] / inner.per_lane_served[i] as f64)
                .sum();
            sum / active_lanes.len() as f64
        };

        let fairness_index = if active_lanes.is_empty() {
            1.0
        } else {
            let waits: Vec<f64> = active_lanes
                .iter()
                .map(|&i| inner.per_lane_wait_sum_secs[i] / inner.per_lane_served[i] as f64)
                .collect();
            let sum: f64 = waits.iter().sum();
            let sum_sq: f64 = waits.iter().map(|w| w * w).sum();
            if sum_sq == 0.0 {
                1.0
            } else {
                (sum * sum) / (waits.len() as f64 * sum_sq)
            }
        };

        let expected_total = self.expected_arrivals_per_min * elapsed_minutes;
        let utilization = if expected_total <= 0.0 {
            0.0
        } else {
            (inner.total_vehicles_processed as f64 / expected_total).min(1.0)
        };

        let mut snapshot = MetricsSnapshot {
            total_vehicles_processed: inner.total_vehicles_processed,
            vehicles_per_minute: inner.total_vehicles_processed as f64 / elapsed_minutes,
            avg_wait_time_secs,
            utilization,
            fairness_index,
            context_switches,
            deadlocks_prevented,
            queue_overflows: inner.queue_overflows,
            elapsed_secs,
        };

        if let Err(reason) = snapshot.validate() {
            warn!(reason, "metrics snapshot failed validation, sanitizing");
            snapshot.sanitize();
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_service_yields_zero_metrics_and_perfect_fairness() {
        let engine = MetricsEngine::new(20.0);
        let snap = engine.snapshot(0, 0);
        assert_eq!(snap.total_vehicles_processed, 0);
        assert_eq!(snap.fairness_index, 1.0);
        assert_eq!(snap.avg_wait_time_secs, 0.0);
    }

    #[test]
    fn single_lane_activity_is_perfectly_fair() {
        let engine = MetricsEngine::new(20.0);
        engine.record_service(LaneId::North, 5, Duration::from_secs(2));
        let snap = engine.snapshot(0, 0);
        assert_eq!(snap.fairness_index, 1.0);
        assert_eq!(snap.total_vehicles_processed, 5);
    }

    #[test]
    fn unequal_waits_reduce_fairness_below_one() {
        let engine = MetricsEngine::new(20.0);
        engine.record_service(LaneId::North, 10, Duration::from_secs(1));
        engine.record_service(LaneId::South, 10, Duration::from_secs(20));
        let snap = engine.snapshot(0, 0);
        assert!(snap.fairness_index < 1.0);
        assert!(snap.fairness_index > 0.0);
    }

    #[test]
    fn utilization_never_exceeds_one() {
        let engine = MetricsEngine::new(1.0);
        engine.record_service(LaneId::North, 1000, Duration::from_millis(1));
        let snap = engine.snapshot(0, 0);
        assert!(snap.utilization <= 1.0);
    }

    #[test]
    fn context_switches_and_overflows_accumulate() {
        let engine = MetricsEngine::new(20.0);
        engine.record_overflow();
        let snap = engine.snapshot(3, 2);
        assert_eq!(snap.context_switches, 2);
        assert_eq!(snap.queue_overflows, 1);
        assert_eq!(snap.deadlocks_prevented, 3);
    }

    #[test]
    fn invalid_snapshot_sanitizes_in_place() {
        let mut snap = MetricsSnapshot {
            total_vehicles_processed: 0,
            vehicles_per_minute: 0.0,
            avg_wait_time_secs: 0.0,
            utilization: 1.5,
            fairness_index: -0.2,
            context_switches: 0,
            deadlocks_prevented: 0,
            queue_overflows: 0,
            elapsed_secs: -1.0,
        };
        assert!(snap.validate().is_err());
        snap.sanitize();
        assert!(snap.validate().is_ok());
    }
}
