//! Vehicle and emergency-vehicle identifiers.
//!
//! Vehicles are ephemeral: created by the external generator, flow through
//! exactly one lane queue, and are destroyed on dequeue. This module only
//! defines the identifier and emergency-vehicle record types; generation
//! itself is a free external collaborator.

use crate::ids::LaneId;

/// Opaque vehicle identifier. Construction is the generator's job; the core
/// only ever moves these by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VehicleId(pub u64);

impl std::fmt::Display for VehicleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "veh#{}", self.0)
    }
}

/// Emergency vehicle classes, in descending order of no particular priority
/// among themselves — all share `priority_level = 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyKind {
    Ambulance,
    Fire,
    Police,
}

impl std::fmt::Display for EmergencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EmergencyKind::Ambulance => "AMBULANCE",
            EmergencyKind::Fire => "FIRE",
            EmergencyKind::Police => "POLICE",
        };
        f.write_str(s)
    }
}

/// The fixed, reserved priority value for any emergency vehicle.
pub const EMERGENCY_PRIORITY: i32 = 1;

/// An emergency vehicle event, as handed to the core by the external
/// detection collaborator — detection itself is out of scope here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmergencyVehicle {
    pub kind: EmergencyKind,
    pub lane: LaneId,
    pub vehicle_id: VehicleId,
    /// Simulated latency from detection to crossing completion, used
    /// verbatim as the response-time metric.
    pub approach_time_secs: f64,
    /// How long the emergency vehicle occupies the intersection once it is
    /// granted the crossing.
    pub crossing_duration_secs: f64,
}

impl EmergencyVehicle {
    pub fn new(
        kind: EmergencyKind,
        lane: LaneId,
        vehicle_id: VehicleId,
        approach_time_secs: f64,
        crossing_duration_secs: f64,
    ) -> Self {
        Self {
            kind,
            lane,
            vehicle_id,
            approach_time_secs,
            crossing_duration_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_display() {
        assert_eq!(VehicleId(42).to_string(), "veh#42");
    }

    #[test]
    fn emergency_kind_display() {
        assert_eq!(EmergencyKind::Fire.to_string(), "FIRE");
    }

    #[test]
    fn emergency_vehicle_construction() {
        let ev = EmergencyVehicle::new(
            EmergencyKind::Ambulance,
            LaneId::East,
            VehicleId(7),
            4.0,
            6.0,
        );
        assert_eq!(ev.lane, LaneId::East);
        assert_eq!(ev.approach_time_secs, 4.0);
    }
}
