//! Gridlock Core
//!
//! The concurrent scheduler for a four-lane traffic intersection: per-lane
//! state machines, the banker's-algorithm safety core, the intersection
//! lock, three pluggable scheduling policies, the emergency-preemption
//! subsystem, and the metrics engine, all wired together by
//! [`simulation::System`].
//!
//! # Module Structure
//!
//! - [`queue`] — bounded per-lane vehicle FIFO.
//! - [`lane`] — lane state machine, lock, and snapshot.
//! - [`banker`] — the safety-critical allocation core.
//! - [`intersection`] — exclusive intersection occupancy.
//! - [`lock_manager`] — FIFO/Banker/Hybrid allocation strategies.
//! - [`scheduler`] — SJF/MLFQ/PRR policies and the scheduler core.
//! - [`emergency`] — single-active-emergency preemption.
//! - [`metrics`] — throughput, wait, utilization, fairness.
//! - [`simulation`] — the `System` orchestrator.
//! - [`locktrace`] — debug-mode lock-order verification for tests.

pub mod banker;
pub mod emergency;
pub mod intersection;
pub mod lane;
pub mod lock_manager;
pub mod locktrace;
pub mod metrics;
pub mod queue;
pub mod scheduler;
pub mod simulation;

pub use emergency::{EmergencyResponse, EmergencySubsystem};
pub use lock_manager::LockManager;
pub use metrics::{MetricsEngine, MetricsSnapshot};
pub use scheduler::{ExecutionRecord, SchedulerCore};
pub use simulation::{Arrival, System};
