//! Priority Round-Robin: three fixed classes (EMERGENCY, NORMAL, LOW), a
//! rotating cursor within each class, and a fairness override that promotes
//! a starved LOW lane for one decision.

use std::time::Duration;

use gridlock_common::ids::{LaneId, NUM_LANES};
use gridlock_common::vehicle::EMERGENCY_PRIORITY;

use super::policy::{is_candidate, SchedulingPolicy};
use crate::lane::LaneSnapshot;

const STARVATION_OVERRIDE: Duration = Duration::from_secs(30);

/// Lane classes, in scheduling priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Emergency,
    Normal,
    Low,
}

fn classify(snapshot: &LaneSnapshot) -> Class {
    if snapshot.priority <= EMERGENCY_PRIORITY {
        Class::Emergency
    } else if snapshot.queue_len > 3 {
        Class::Normal
    } else {
        Class::Low
    }
}

#[derive(Debug)]
pub struct PrrPolicy {
    quantum: Duration,
    /// Rotating cursor: index into `LaneId::ALL` to resume scanning from on
    /// the next selection, one per class.
    cursors: [usize; 3],
}

impl PrrPolicy {
    pub fn new(quantum: Duration) -> Self {
        Self {
            quantum,
            cursors: [0; 3],
        }
    }

    fn cursor_for(&mut self, class: Class) -> &mut usize {
        &mut self.cursors[class as usize]
    }
}

impl SchedulingPolicy for PrrPolicy {
    fn name(&self) -> &'static str {
        "prr"
    }

    fn select(&mut self, lanes: &[LaneSnapshot; NUM_LANES], _current: Option<LaneId>) -> Option<LaneId> {
        let effective_class = |snap: &LaneSnapshot| -> Class {
            let base = classify(snap);
            if base == Class::Low && snap.waiting_time > STARVATION_OVERRIDE {
                Class::Normal
            } else {
                base
            }
        };

        for class in [Class::Emergency, Class::Normal, Class::Low] {
            let candidates: Vec<usize> = (0..NUM_LANES)
                .filter(|&i| is_candidate(&lanes[i]) && lanes[i].queue_len > 0 && effective_class(&lanes[i]) == class)
                .collect();
            if candidates.is_empty() {
                continue;
            }
            let cursor = *self.cursor_for(class);
            let start = cursor % NUM_LANES;
            let chosen = candidates
                .iter()
                .find(|&&i| i >= start)
                .or_else(|| candidates.first())
                .copied()
                .unwrap();
            *self.cursor_for(class) = (chosen + 1) % NUM_LANES;
            return Some(lanes[chosen].id);
        }
        None
    }

    fn quantum_for(&self, _lane: LaneId) -> Duration {
        self.quantum
    }
}
