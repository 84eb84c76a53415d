//! Scheduler Core: wraps a [`SchedulingPolicy`] with context-switch
//! accounting and a fixed-capacity execution-history ring.
//!
//! Lock order rank 2: `scheduler_lock` is acquired before `banker_lock`,
//! `intersection_lock`, and any `lane_lock`, and after `global_state_lock`.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use gridlock_common::config::Algorithm;
use gridlock_common::ids::LaneId;

use super::mlfq::MlfqPolicy;
use super::policy::SchedulingPolicy;
use super::prr::PrrPolicy;
use super::sjf::SjfPolicy;
use crate::lane::Lanes;

/// Capacity of the execution-history ring.
pub const EXECUTION_HISTORY_CAPACITY: usize = 1000;

/// One completed (or in-flight) time slice, recorded for the terminal UI's
/// history view and for offline analysis.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionRecord {
    pub lane: LaneId,
    pub start: Instant,
    pub end: Instant,
    pub vehicles_processed: u64,
}

impl ExecutionRecord {
    pub fn duration(&self) -> Duration {
        self.end.saturating_duration_since(self.start)
    }
}

struct SchedulerState {
    policy: Box<dyn SchedulingPolicy>,
    current_lane: Option<LaneId>,
    total_context_switches: u64,
    history: VecDeque<ExecutionRecord>,
}

/// Owns the active policy and all scheduling bookkeeping behind a single
/// lock — consolidated rather than sharded per policy.
pub struct SchedulerCore {
    state: Mutex<SchedulerState>,
    context_switch_time: Duration,
    vehicle_cross_time: Duration,
}

fn policy_for(algorithm: Algorithm, quantum: Duration) -> Box<dyn SchedulingPolicy> {
    match algorithm {
        Algorithm::Sjf => Box::new(SjfPolicy::new(quantum)),
        Algorithm::Mlfq => Box::new(MlfqPolicy::new()),
        Algorithm::Prr => Box::new(PrrPolicy::new(quantum)),
    }
}

impl SchedulerCore {
    pub fn new(
        algorithm: Algorithm,
        quantum: Duration,
        context_switch_time: Duration,
        vehicle_cross_time: Duration,
    ) -> Self {
        Self {
            state: Mutex::new(SchedulerState {
                policy: policy_for(algorithm, quantum),
                current_lane: None,
                total_context_switches: 0,
                history: VecDeque::with_capacity(EXECUTION_HISTORY_CAPACITY),
            }),
            context_switch_time,
            vehicle_cross_time,
        }
    }

    /// Hot-swap the active policy (the CLI's `switch-algorithm` control
    /// event). The context-switch counter and history survive the swap;
    /// per-policy bookkeeping (MLFQ levels, PRR cursors) resets.
    pub fn switch_algorithm(&self, algorithm: Algorithm, quantum: Duration) {
        let mut state = self.state.lock().unwrap();
        state.policy = policy_for(algorithm, quantum);
        state.current_lane = None;
    }

    pub fn algorithm_name(&self) -> &'static str {
        self.state.lock().unwrap().policy.name()
    }

    pub fn current_lane(&self) -> Option<LaneId> {
        self.state.lock().unwrap().current_lane
    }

    pub fn total_context_switches(&self) -> u64 {
        self.state.lock().unwrap().total_context_switches
    }

    /// Ask the active policy which lane should run next, performing the
    /// context switch (outgoing `end_time_slice`, incoming `grant`) if the
    /// choice differs from the lane currently RUNNING.
    ///
    /// Returns the selected lane and the quantum it should run for, or
    /// `None` if no lane is eligible.
    pub fn schedule_next_lane(&self, lanes: &Lanes) -> Option<(LaneId, Duration)> {
        let snapshots = lanes.snapshot_all();
        let mut state = self.state.lock().unwrap();
        let current_lane = state.current_lane;
        let next = state.policy.select(&snapshots, current_lane)?;

        if state.current_lane != Some(next) {
            if let Some(outgoing) = state.current_lane {
                lanes.get(outgoing).end_time_slice();
                state.policy.on_slice_complete(outgoing);
            }
            lanes.get(next).grant();
            state.total_context_switches += 1;
            state.current_lane = Some(next);
            if !self.context_switch_time.is_zero() {
                std::thread::sleep(self.context_switch_time);
            }
        }

        let quantum = state.policy.quantum_for(next);
        Some((next, quantum))
    }

    /// Run one time slice for `lane`: dequeue up to as many vehicles as fit
    /// in `quantum` at the configured crossing time, then record the result
    /// in the execution history ring.
    ///
    /// Timestamps in the returned record are simulated crossing time, not a
    /// real-time sleep — this simulator makes no real-time timing guarantee.
    pub fn execute_time_slice(&self, lanes: &Lanes, lane: LaneId, quantum: Duration) -> ExecutionRecord {
        let start = Instant::now();
        let max_vehicles = ((quantum.as_secs_f64() / self.vehicle_cross_time.as_secs_f64()).floor() as u64).max(1);

        let mut vehicles_processed = 0u64;
        let handle = lanes.get(lane);
        while vehicles_processed < max_vehicles && !handle.is_empty() {
            handle.dequeue();
            vehicles_processed += 1;
        }

        let simulated_elapsed = self.vehicle_cross_time.mul_f64(vehicles_processed as f64);
        let record = ExecutionRecord {
            lane,
            start,
            end: start + simulated_elapsed,
            vehicles_processed,
        };

        let mut state = self.state.lock().unwrap();
        if state.history.len() == EXECUTION_HISTORY_CAPACITY {
            state.history.pop_front();
        }
        state.history.push_back(record);
        record
    }

    /// Copy of the execution history, oldest first. Bounded by
    /// [`EXECUTION_HISTORY_CAPACITY`].
    pub fn history(&self) -> Vec<ExecutionRecord> {
        self.state.lock().unwrap().history.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlock_common::vehicle::VehicleId;

    fn setup() -> (SchedulerCore, Lanes) {
        let core = SchedulerCore::new(
            Algorithm::Sjf,
            Duration::from_millis(30),
            Duration::ZERO,
            Duration::from_millis(10),
        );
        let lanes = Lanes::new(20);
        (core, lanes)
    }

    #[test]
    fn no_traffic_schedules_nothing() {
        let (core, lanes) = setup();
        assert!(core.schedule_next_lane(&lanes).is_none());
    }

    #[test]
    fn schedules_the_only_lane_with_traffic() {
        let (core, lanes) = setup();
        lanes.get(LaneId::North).enqueue(VehicleId(1));
        let (chosen, _quantum) = core.schedule_next_lane(&lanes).unwrap();
        assert_eq!(chosen, LaneId::North);
        assert_eq!(core.current_lane(), Some(LaneId::North));
    }

    #[test]
    fn switching_lanes_counts_a_context_switch() {
        let (core, lanes) = setup();
        lanes.get(LaneId::North).enqueue(VehicleId(1));
        lanes.get(LaneId::South).enqueue(VehicleId(2));
        lanes.get(LaneId::South).enqueue(VehicleId(3));
        core.schedule_next_lane(&lanes).unwrap();
        let before = core.total_context_switches();
        // South has a shorter queue only after North's single vehicle is
        // drained; force a switch by ending North's slice empty.
        lanes.get(LaneId::North).dequeue();
        lanes.get(LaneId::North).end_time_slice();
        let (chosen, _) = core.schedule_next_lane(&lanes).unwrap();
        assert_eq!(chosen, LaneId::South);
        assert!(core.total_context_switches() > before);
    }

    #[test]
    fn execute_time_slice_drains_bounded_by_quantum() {
        let (core, lanes) = setup();
        for i in 0..5 {
            lanes.get(LaneId::North).enqueue(VehicleId(i));
        }
        let record = core.execute_time_slice(&lanes, LaneId::North, Duration::from_millis(30));
        // 30ms quantum / 10ms cross time = 3 vehicles max.
        assert_eq!(record.vehicles_processed, 3);
        assert_eq!(lanes.get(LaneId::North).queue_len(), 2);
    }

    #[test]
    fn history_is_bounded_by_capacity() {
        let (core, lanes) = setup();
        lanes.get(LaneId::North).enqueue(VehicleId(1));
        for _ in 0..5 {
            core.execute_time_slice(&lanes, LaneId::North, Duration::from_millis(10));
        }
        assert_eq!(core.history().len(), 5);
    }

    #[test]
    fn switch_algorithm_resets_current_lane() {
        let (core, lanes) = setup();
        lanes.get(LaneId::North).enqueue(VehicleId(1));
        core.schedule_next_lane(&lanes).unwrap();
        assert!(core.current_lane().is_some());
        core.switch_algorithm(Algorithm::Prr, Duration::from_secs(3));
        assert_eq!(core.algorithm_name(), "prr");
        assert!(core.current_lane().is_none());
    }
}
