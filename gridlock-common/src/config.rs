//! Configuration types and validation, following the load-then-validate
//! shape of `evo_control_unit::config`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GridlockError;
use crate::ids::LaneId;

/// Scheduling policy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Shortest Job First.
    Sjf,
    /// Multilevel Feedback Queue.
    Mlfq,
    /// Priority Round-Robin.
    Prr,
}

impl std::str::FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sjf" => Ok(Algorithm::Sjf),
            "mlfq" => Ok(Algorithm::Mlfq),
            "prr" => Ok(Algorithm::Prr),
            other => Err(format!("unknown algorithm '{other}' (expected sjf|mlfq|prr)")),
        }
    }
}

/// Lock/allocation strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Intersection lock only, no banker involvement.
    Fifo,
    /// Banker's algorithm gates every acquisition.
    Banker,
    /// Banker with emergency bypass and safe-state fallback (default).
    Hybrid,
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" => Ok(Strategy::Fifo),
            "banker" => Ok(Strategy::Banker),
            "hybrid" => Ok(Strategy::Hybrid),
            other => Err(format!(
                "unknown strategy '{other}' (expected fifo|banker|hybrid)"
            )),
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Hybrid
    }
}

/// Simulation-wide configuration, built from CLI flags by the `gridlock-cli`
/// crate. Mirrors `evo_control_unit::config::LoadedConfig`'s role as the
/// single validated bundle passed to every subsystem at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub duration_secs: u64,
    pub arrival_min_secs: f64,
    pub arrival_max_secs: f64,
    pub quantum_secs: u64,
    pub algorithm: Algorithm,
    pub strategy: Strategy,
    pub queue_capacity: usize,
    pub context_switch: Duration,
    /// Simulated seconds a single vehicle occupies the intersection while
    /// crossing. Drives how many vehicles a time slice can process; not a
    /// real-time sleep — this is a discrete simulator, not a control system.
    pub vehicle_cross_secs: f64,
    pub color: bool,
    pub debug: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            duration_secs: 200,
            arrival_min_secs: 1.0,
            arrival_max_secs: 3.0,
            quantum_secs: 3,
            algorithm: Algorithm::Sjf,
            strategy: Strategy::Hybrid,
            queue_capacity: 20,
            context_switch: Duration::from_millis(500),
            vehicle_cross_secs: 1.0,
            color: true,
            debug: false,
        }
    }
}

impl SimConfig {
    /// Validate parameter bounds, mirroring
    /// `evo_control_unit::config`'s `ValidationError` checks. The only
    /// error kind this can raise is `FatalInit` — configuration problems
    /// are caught before any thread starts.
    pub fn validate(&self) -> Result<(), GridlockError> {
        if self.duration_secs == 0 {
            return Err(GridlockError::FatalInit {
                reason: "duration must be greater than zero".into(),
            });
        }
        if self.arrival_min_secs <= 0.0 || self.arrival_max_secs <= 0.0 {
            return Err(GridlockError::FatalInit {
                reason: "arrival bounds must be positive".into(),
            });
        }
        if self.arrival_min_secs > self.arrival_max_secs {
            return Err(GridlockError::FatalInit {
                reason: "arrival-min must not exceed arrival-max".into(),
            });
        }
        if self.quantum_secs == 0 {
            return Err(GridlockError::FatalInit {
                reason: "quantum must be greater than zero".into(),
            });
        }
        if self.queue_capacity == 0 {
            return Err(GridlockError::FatalInit {
                reason: "queue capacity must be greater than zero".into(),
            });
        }
        if self.vehicle_cross_secs <= 0.0 {
            return Err(GridlockError::FatalInit {
                reason: "vehicle cross time must be positive".into(),
            });
        }
        Ok(())
    }
}

/// A single scripted arrival, used by deterministic fixed-seed scenario
/// replay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScriptedArrival {
    pub at_secs: f64,
    pub lane: ScenarioLane,
}

/// Serde-friendly mirror of [`LaneId`] for TOML scenario files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioLane {
    North,
    South,
    East,
    West,
}

impl From<ScenarioLane> for LaneId {
    fn from(s: ScenarioLane) -> LaneId {
        match s {
            ScenarioLane::North => LaneId::North,
            ScenarioLane::South => LaneId::South,
            ScenarioLane::East => LaneId::East,
            ScenarioLane::West => LaneId::West,
        }
    }
}

/// A deterministic scenario: a fixed arrival script plus the simulation
/// parameters it was authored against. Loaded from TOML so scenarios can be
/// checked into the repo as data rather than code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    pub arrivals: Vec<ScriptedArrival>,
}

impl ScenarioConfig {
    /// Parse a scenario from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<ScenarioConfig, GridlockError> {
        toml::from_str(s).map_err(|e| GridlockError::FatalInit {
            reason: format!("scenario parse error: {e}"),
        })
    }

    /// Load and parse a scenario file from disk.
    pub fn load(path: &Path) -> Result<ScenarioConfig, GridlockError> {
        let text = std::fs::read_to_string(path).map_err(|e| GridlockError::FatalInit {
            reason: format!("failed to read scenario {}: {e}", path.display()),
        })?;
        Self::from_toml_str(&text)
    }
}
