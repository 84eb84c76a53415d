//! Vehicle-ID and arrival generation. Two modes: a uniform-random
//! generator for normal runs, and a scripted replay of a fixed arrival
//! sequence for the deterministic scenarios.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use gridlock_common::config::ScenarioConfig;
use gridlock_common::ids::LaneId;
use gridlock_common::quadrant::Movement;
use gridlock_common::vehicle::VehicleId;
use rand::Rng;

static NEXT_VEHICLE_ID: AtomicU64 = AtomicU64::new(1);

/// Construct a fresh, process-unique vehicle id.
pub fn next_vehicle_id() -> VehicleId {
    VehicleId(NEXT_VEHICLE_ID.fetch_add(1, Ordering::Relaxed))
}

/// Pick a movement for a newly generated vehicle using the straight-heavy
/// traffic mix noted in `gridlock-core::simulation` (75% straight, 15%
/// right, 10% left; U-turns are not auto-generated).
pub fn random_movement(rng: &mut impl Rng) -> Movement {
    let roll: f64 = rng.gen_range(0.0..1.0);
    if roll < 0.75 {
        Movement::Straight
    } else if roll < 0.90 {
        Movement::Right
    } else {
        Movement::Left
    }
}

/// Draw the next inter-arrival delay uniformly from `[min, max]` seconds.
pub fn random_interval(rng: &mut impl Rng, min_secs: f64, max_secs: f64) -> Duration {
    let secs = if max_secs > min_secs {
        rng.gen_range(min_secs..max_secs)
    } else {
        min_secs
    };
    Duration::from_secs_f64(secs.max(0.0))
}

/// Pick a lane uniformly at random among the four approaches.
pub fn random_lane(rng: &mut impl Rng) -> LaneId {
    LaneId::ALL[rng.gen_range(0..LaneId::ALL.len())]
}

/// A scripted arrival replay cursor over a loaded [`ScenarioConfig`],
/// driven by elapsed simulation time rather than wall-clock sleeps so a
/// scenario reproduces identically regardless of scheduling jitter.
pub struct ScenarioCursor {
    arrivals: Vec<(Duration, LaneId)>,
    next: usize,
}

impl ScenarioCursor {
    pub fn new(scenario: &ScenarioConfig) -> Self {
        let mut arrivals: Vec<(Duration, LaneId)> = scenario
            .arrivals
            .iter()
            .map(|a| (Duration::from_secs_f64(a.at_secs), LaneId::from(a.lane)))
            .collect();
        arrivals.sort_by_key(|(t, _)| *t);
        Self { arrivals, next: 0 }
    }

    /// Return every lane whose scripted arrival time has passed `elapsed`
    /// and has not yet been returned, advancing the cursor past them.
    pub fn due(&mut self, elapsed: Duration) -> Vec<LaneId> {
        let mut out = Vec::new();
        while self.next < self.arrivals.len() && self.arrivals[self.next].0 <= elapsed {
            out.push(self.arrivals[self.next].1);
            self.next += 1;
        }
        out
    }

    pub fn is_exhausted(&self) -> bool {
        self.next >= self.arrivals.len()
    }
}
