//! Gridlock CLI: the outer binary. Parses flags, wires up tracing, spawns
//! the vehicle generator and interactive-control threads, drives the
//! simulation tick loop, and exports CSV/terminal snapshots.
//!
//! Mirrors `evo_hal/src/main.rs`'s shape: a `run()` that returns
//! `Result<(), Box<dyn Error>>`, a `setup_tracing` helper keyed off
//! `--debug`, and a `ctrlc` handler flipping a shutdown flag that the main
//! loop polls every tick.

mod args;
mod control;
mod csv_export;
mod generator;
mod ui;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::EnvFilter;

use args::Args;
use control::ControlEvent;
use csv_export::{CsvExporter, CsvRow};
use gridlock_common::config::ScenarioConfig;
use gridlock_common::quadrant::Movement;
use gridlock_common::vehicle::{EmergencyKind, EmergencyVehicle};
use gridlock_core::{Arrival, System};

fn main() {
    if let Err(e) = run() {
        error!("gridlock startup failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    setup_tracing(args.debug);

    info!("gridlock starting (duration={}s)", args.duration);

    let update_interval = Duration::from_secs_f64(args.update_interval.max(0.05));
    let csv_out = args.csv_out.clone();
    let scenario_path = args.scenario.clone();
    let config = args.into_sim_config()?;

    let system = Arc::new(System::new(config));
    let shutdown = Arc::new(AtomicBool::new(false));

    let shutdown_for_handler = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("received shutdown signal");
        shutdown_for_handler.store(true, Ordering::SeqCst);
    })?;

    let scenario = match &scenario_path {
        Some(path) => Some(ScenarioConfig::load(path)?),
        None => None,
    };

    let controls = control::spawn_stdin_reader();

    let mut exporter = match &csv_out {
        Some(path) => Some(CsvExporter::create(path)?),
        None => None,
    };

    let result = drive_simulation(&system, &shutdown, scenario, update_interval, controls, exporter.as_mut());

    if let Some(exporter) = exporter.as_mut() {
        exporter.flush()?;
    }

    info!("gridlock shutdown complete");
    result
}

/// The simulation driver: one thread alternating arrival injection,
/// scheduler ticks, control-event handling, and periodic snapshots.
/// Distinct thread roles (generator/driver/UI) are free to consolidate so
/// long as observable contracts hold — this binary keeps the driver and UI
/// on the main thread and the generator's randomness source local to it,
/// with only stdin control reading on its own thread.
fn drive_simulation(
    system: &Arc<System>,
    shutdown: &Arc<AtomicBool>,
    mut scenario: Option<ScenarioConfig>,
    update_interval: Duration,
    controls: std::sync::mpsc::Receiver<ControlEvent>,
    mut exporter: Option<&mut CsvExporter>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut rng = rand::thread_rng();
    let mut scenario_cursor = scenario.take().map(|s| generator::ScenarioCursor::new(&s));
    let mut next_arrival_at = Duration::ZERO;
    let mut last_snapshot = Instant::now();
    let mut paused = false;
    let mut last_response_time = 0.0;

    loop {
        if shutdown.load(Ordering::SeqCst) || system.is_finished() {
            break;
        }

        while let Ok(event) = controls.try_recv() {
            match event {
                ControlEvent::SwitchAlgorithm(algorithm) => system.switch_algorithm(algorithm),
                ControlEvent::PauseResume => paused = !paused,
                ControlEvent::Reset => warn!("reset requested; restart the process to fully reinitialize"),
                ControlEvent::TriggerEmergency(lane) => {
                    let vehicle = EmergencyVehicle::new(
                        EmergencyKind::Ambulance,
                        lane,
                        generator::next_vehicle_id(),
                        2.0,
                        4.0,
                    );
                    if let Err(e) = system.declare_emergency(&vehicle) {
                        warn!(%lane, "emergency declaration rejected: {e}");
                    }
                }
                ControlEvent::Quit => {
                    shutdown.store(true, Ordering::SeqCst);
                }
            }
        }

        if paused {
            std::thread::sleep(Duration::from_millis(50));
            continue;
        }

        // An active emergency clears itself once it has occupied the
        // intersection for its crossing_duration_secs; nothing else calls
        // clear_emergency on its behalf.
        if system.emergency.is_due_to_clear() {
            match system.clear_emergency() {
                Ok(Some(response)) => {
                    info!(lane = %response.lane, "emergency cleared");
                }
                Ok(None) => {}
                Err(e) => warn!("failed to clear emergency: {e}"),
            }
        }

        let elapsed = system.elapsed();
        if let Some(cursor) = scenario_cursor.as_mut() {
            for lane in cursor.due(elapsed) {
                system.arrive(Arrival {
                    lane,
                    vehicle: generator::next_vehicle_id(),
                    movement: Movement::Straight,
                });
            }
        } else if elapsed >= next_arrival_at {
            let lane = generator::random_lane(&mut rng);
            let movement = generator::random_movement(&mut rng);
            system.arrive(Arrival {
                lane,
                vehicle: generator::next_vehicle_id(),
                movement,
            });
            next_arrival_at = elapsed + generator::random_interval(&mut rng, config_arrival_min(system), config_arrival_max(system));
        }

        match system.tick() {
            Ok(_) => {}
            Err(e) => debug!("tick error: {e}"),
        }

        if let Some(response) = system.emergency.last_response() {
            last_response_time = response.response_time.as_secs_f64();
        }

        if last_snapshot.elapsed() >= update_interval {
            last_snapshot = Instant::now();
            let lanes: Vec<_> = system.lanes.iter().map(|l| l.snapshot()).collect();
            let metrics = system.metrics_snapshot();
            let rendered = ui::render_snapshot(
                &lanes,
                &metrics,
                system.scheduler.algorithm_name(),
                strategy_label(system),
                system.config().color,
            );
            print!("{rendered}");

            if let Some(exporter) = exporter.as_deref_mut() {
                let row = CsvRow::from_snapshot(&metrics, last_response_time, elapsed.as_secs_f64());
                exporter.write_row(&row)?;
            }
        }
    }

    Ok(())
}

fn config_arrival_min(system: &System) -> f64 {
    system.config().arrival_min_secs
}

fn config_arrival_max(system: &System) -> f64 {
    system.config().arrival_max_secs
}

fn strategy_label(system: &System) -> &'static str {
    match system.lock_manager.strategy() {
        gridlock_common::config::Strategy::Fifo => "fifo",
        gridlock_common::config::Strategy::Banker => "banker",
        gridlock_common::config::Strategy::Hybrid => "hybrid",
    }
}

fn setup_tracing(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
