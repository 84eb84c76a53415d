//! CSV export: one row per snapshot, header as specified. Modeled on the
//! `csv::Writer` usage pattern other tooling in this codebase follows.

use std::path::Path;

use gridlock_common::error::GridlockError;
use gridlock_core::MetricsSnapshot;
use serde::Serialize;

/// One exported row, field order and names fixed for downstream tooling.
#[derive(Debug, Clone, Serialize)]
pub struct CsvRow {
    pub timestamp: f64,
    pub vehicles_per_minute: f64,
    pub avg_wait_time: f64,
    pub utilization: f64,
    pub fairness_index: f64,
    pub total_vehicles: u64,
    pub context_switches: u64,
    pub emergency_response_time: f64,
    pub deadlocks_prevented: u64,
    pub queue_overflows: u64,
    pub simulation_time: f64,
}

impl CsvRow {
    pub fn from_snapshot(snapshot: &MetricsSnapshot, emergency_response_time: f64, simulation_time: f64) -> Self {
        Self {
            timestamp: simulation_time,
            vehicles_per_minute: snapshot.vehicles_per_minute,
            avg_wait_time: snapshot.avg_wait_time_secs,
            utilization: snapshot.utilization,
            fairness_index: snapshot.fairness_index,
            total_vehicles: snapshot.total_vehicles_processed,
            context_switches: snapshot.context_switches,
            emergency_response_time,
            deadlocks_prevented: snapshot.deadlocks_prevented,
            queue_overflows: snapshot.queue_overflows,
            simulation_time,
        }
    }
}

/// Accumulates snapshot rows and flushes them to a CSV file on drop/close.
pub struct CsvExporter {
    writer: csv::Writer<std::fs::File>,
}

impl CsvExporter {
    pub fn create(path: &Path) -> Result<Self, GridlockError> {
        let writer = csv::Writer::from_path(path).map_err(|e| GridlockError::FatalInit {
            reason: format!("failed to open CSV export {}: {e}", path.display()),
        })?;
        Ok(Self { writer })
    }

    pub fn write_row(&mut self, row: &CsvRow) -> Result<(), GridlockError> {
        self.writer.serialize(row).map_err(|e| GridlockError::InvalidState {
            reason: format!("CSV write failed: {e}"),
        })
    }

    pub fn flush(&mut self) -> Result<(), GridlockError> {
        self.writer.flush().map_err(|e| GridlockError::InvalidState {
            reason: format!("CSV flush failed: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlock_core::MetricsEngine;

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.csv");

        let engine = MetricsEngine::new(20.0);
        let snapshot = engine.snapshot(2, 0);
        let row = CsvRow::from_snapshot(&snapshot, 4.0, 10.0);

        {
            let mut exporter = CsvExporter::create(&path).unwrap();
            exporter.write_row(&row).unwrap();
            exporter.flush().unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("timestamp,vehicles_per_minute,avg_wait_time,utilization,fairness_index"));
        assert!(contents.contains("deadlocks_prevented"));
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
    }
}
