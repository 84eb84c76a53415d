//! Multilevel Feedback Queue: three priority levels with increasing quanta,
//! aging to prevent starvation, and demotion of lanes that monopolize their
//! level.
//!
//! All level/quantum-count bookkeeping lives in one struct behind the
//! scheduler's own lock rather than one lock per level — separate per-level
//! locks are a classic source of lock-order bugs this avoids entirely.

use std::time::{Duration, Instant};

use gridlock_common::ids::{LaneId, NUM_LANES};

use super::policy::{is_candidate, SchedulingPolicy};
use crate::lane::LaneSnapshot;

/// Three priority levels, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Medium,
    Low,
}

const LEVELS: [Level; 3] = [Level::High, Level::Medium, Level::Low];
const QUANTA_SECS: [u64; 3] = [2, 4, 6];
const PROMOTE_AFTER_WAIT: Duration = Duration::from_secs(10);
const AGE_AFTER_TIME_IN_LEVEL: Duration = Duration::from_secs(15);
const DEMOTE_AFTER_CONSECUTIVE_QUANTA: u32 = 5;

fn quantum_for_level(level: Level) -> Duration {
    Duration::from_secs(QUANTA_SECS[level as usize])
}

/// One step toward HIGH; already-HIGH lanes have nowhere higher to go.
fn promote_one(level: Level) -> Level {
    match level {
        Level::Low => Level::Medium,
        Level::Medium => Level::High,
        Level::High => Level::High,
    }
}

#[derive(Debug, Clone, Copy)]
struct LaneMlfqState {
    level: Level,
    entered_level_at: Instant,
    consecutive_quanta: u32,
}

impl LaneMlfqState {
    fn fresh(now: Instant) -> Self {
        Self {
            level: Level::Medium,
            entered_level_at: now,
            consecutive_quanta: 0,
        }
    }

    fn move_to(&mut self, level: Level, now: Instant) {
        self.level = level;
        self.entered_level_at = now;
        self.consecutive_quanta = 0;
    }
}

#[derive(Debug)]
pub struct MlfqPolicy {
    lanes: [LaneMlfqState; NUM_LANES],
}

impl MlfqPolicy {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            lanes: [LaneMlfqState::fresh(now); NUM_LANES],
        }
    }

    /// Apply aging and starvation-prevention promotions before every
    /// selection.
    fn apply_aging(&mut self, snapshots: &[LaneSnapshot; NUM_LANES]) {
        let now = Instant::now();
        for (i, lane_state) in self.lanes.iter_mut().enumerate() {
            let snap = &snapshots[i];
            if lane_state.level != Level::High {
                if snap.waiting_time > PROMOTE_AFTER_WAIT {
                    lane_state.move_to(promote_one(lane_state.level), now);
                    continue;
                }
                if now.duration_since(lane_state.entered_level_at) > AGE_AFTER_TIME_IN_LEVEL {
                    lane_state.move_to(Level::High, now);
                }
            }
        }
    }
}

impl Default for MlfqPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulingPolicy for MlfqPolicy {
    fn name(&self) -> &'static str {
        "mlfq"
    }

    fn select(&mut self, lanes: &[LaneSnapshot; NUM_LANES], _current: Option<LaneId>) -> Option<LaneId> {
        self.apply_aging(lanes);

        for level in LEVELS {
            let pick = lanes
                .iter()
                .enumerate()
                .filter(|(i, s)| self.lanes[*i].level == level && is_candidate(s) && s.queue_len > 0)
                .max_by_key(|(_, s)| s.waiting_time)
                .map(|(_, s)| s.id);
            if pick.is_some() {
                return pick;
            }
        }
        None
    }

    fn quantum_for(&self, lane: LaneId) -> Duration {
        quantum_for_level(self.lanes[lane.index()].level)
    }

    fn on_slice_complete(&mut self, lane: LaneId) {
        let now = Instant::now();
        let state = &mut self.lanes[lane.index()];
        state.consecutive_quanta += 1;
        if state.consecutive_quanta > DEMOTE_AFTER_CONSECUTIVE_QUANTA {
            let next = match state.level {
                Level::High => Level::Medium,
                Level::Medium => Level::Low,
                Level::Low => Level::Low,
            };
            state.move_to(next, now);
        }
    }
}
