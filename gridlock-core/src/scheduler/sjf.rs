//! Shortest Job First: minimize `queue_length × cross time` among candidate
//! lanes, tying to the oldest arrival.

use std::time::Duration;

use gridlock_common::ids::{LaneId, NUM_LANES};

use super::policy::{is_candidate, SchedulingPolicy};
use crate::lane::LaneSnapshot;

#[derive(Debug)]
pub struct SjfPolicy {
    quantum: Duration,
}

impl SjfPolicy {
    pub fn new(quantum: Duration) -> Self {
        Self { quantum }
    }
}

impl SchedulingPolicy for SjfPolicy {
    fn name(&self) -> &'static str {
        "sjf"
    }

    fn select(&mut self, lanes: &[LaneSnapshot; NUM_LANES], _current: Option<LaneId>) -> Option<LaneId> {
        lanes
            .iter()
            .filter(|s| is_candidate(s) && s.queue_len > 0)
            .min_by(|a, b| {
                let job_a = a.queue_len as f64;
                let job_b = b.queue_len as f64;
                job_a
                    .partial_cmp(&job_b)
                    .unwrap()
                    .then_with(|| a.waiting_time.cmp(&b.waiting_time).reverse())
            })
            .map(|s| s.id)
    }

    fn quantum_for(&self, _lane: LaneId) -> Duration {
        self.quantum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lane::state::LaneState;
    use gridlock_common::quadrant::QuadrantMask;

    fn snap(id: LaneId, state: LaneState, queue_len: usize, waiting_secs: u64) -> LaneSnapshot {
        LaneSnapshot {
            id,
            state,
            queue_len,
            queue_capacity: 20,
            priority: 5,
            waiting_time: Duration::from_secs(waiting_secs),
            total_vehicles_served: 0,
            allocated_quadrants: QuadrantMask::EMPTY,
        }
    }

    #[test]
    fn picks_shortest_queue() {
        let mut policy = SjfPolicy::new(Duration::from_secs(3));
        let lanes = [
            snap(LaneId::North, LaneState::Ready, 5, 2),
            snap(LaneId::South, LaneState::Ready, 1, 2),
            snap(LaneId::East, LaneState::Waiting, 0, 2),
            snap(LaneId::West, LaneState::Ready, 3, 2),
        ];
        assert_eq!(policy.select(&lanes, None), Some(LaneId::South));
    }

    #[test]
    fn ties_break_on_oldest_arrival() {
        let mut policy = SjfPolicy::new(Duration::from_secs(3));
        let lanes = [
            snap(LaneId::North, LaneState::Ready, 2, 1),
            snap(LaneId::South, LaneState::Ready, 2, 9),
            snap(LaneId::East, LaneState::Waiting, 0, 0),
            snap(LaneId::West, LaneState::Waiting, 0, 0),
        ];
        assert_eq!(policy.select(&lanes, None), Some(LaneId::South));
    }

    #[test]
    fn no_candidates_returns_none() {
        let mut policy = SjfPolicy::new(Duration::from_secs(3));
        let lanes = [
            snap(LaneId::North, LaneState::Waiting, 0, 0),
            snap(LaneId::South, LaneState::Waiting, 0, 0),
            snap(LaneId::East, LaneState::Blocked, 4, 0),
            snap(LaneId::West, LaneState::Waiting, 0, 0),
        ];
        assert_eq!(policy.select(&lanes, None), None);
    }
}
