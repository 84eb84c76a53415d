//! Terminal snapshot printer. Plain-text, ANSI-colored when enabled,
//! reading only the lock-free [`gridlock_core::lane::LaneSnapshot`] and
//! [`gridlock_core::MetricsSnapshot`] values the core already hands out
//! under the "snapshot under lock, then print lock-free" discipline.

use gridlock_core::lane::LaneSnapshot;
use gridlock_core::lane::state::LaneState;
use gridlock_core::MetricsSnapshot;

const RESET: &str = "\x1b[0m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

fn state_label(state: LaneState) -> &'static str {
    match state {
        LaneState::Waiting => "WAITING",
        LaneState::Ready => "READY",
        LaneState::Running => "RUNNING",
        LaneState::Blocked => "BLOCKED",
    }
}

fn state_color(state: LaneState) -> &'static str {
    match state {
        LaneState::Waiting => "",
        LaneState::Ready => YELLOW,
        LaneState::Running => GREEN,
        LaneState::Blocked => RED,
    }
}

fn colorize(color: bool, code: &str, text: &str) -> String {
    if color && !code.is_empty() {
        format!("{code}{text}{RESET}")
    } else {
        text.to_string()
    }
}

/// Render one plain-text snapshot line per lane plus a metrics summary
/// line, keeping to an "abstract snapshot" framing — the core exposes
/// data, never a rendered view.
pub fn render_snapshot(
    lanes: &[LaneSnapshot],
    metrics: &MetricsSnapshot,
    algorithm: &str,
    strategy_label: &str,
    color: bool,
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "--- gridlock [{algorithm}/{strategy_label}] t={:.1}s ---\n",
        metrics.elapsed_secs
    ));
    for lane in lanes {
        let label = state_label(lane.state);
        let rendered = colorize(color, state_color(lane.state), label);
        out.push_str(&format!(
            "  {} {:<8} queue={:>2}/{:<2} served={:<4} wait={:.1}s\n",
            lane.id,
            rendered,
            lane.queue_len,
            lane.queue_capacity,
            lane.total_vehicles_served,
            lane.waiting_time.as_secs_f64(),
        ));
    }
    out.push_str(&format!(
        "  {} throughput={:.2}/min wait={:.2}s util={:.2} fairness={:.2} switches={} deadlocks_prevented={} overflows={}\n",
        colorize(color, CYAN, "metrics"),
        metrics.vehicles_per_minute,
        metrics.avg_wait_time_secs,
        metrics.utilization,
        metrics.fairness_index,
        metrics.context_switches,
        metrics.deadlocks_prevented,
        metrics.queue_overflows,
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlock_common::ids::LaneId;
    use gridlock_common::quadrant::QuadrantMask;
    use std::time::Duration;

    fn lane(id: LaneId, state: LaneState) -> LaneSnapshot {
        LaneSnapshot {
            id,
            state,
            queue_len: 2,
            queue_capacity: 20,
            priority: 5,
            waiting_time: Duration::from_secs(3),
            total_vehicles_served: 7,
            allocated_quadrants: QuadrantMask::EMPTY,
        }
    }

    #[test]
    fn render_includes_all_lanes_and_metrics() {
        let lanes = vec![
            lane(LaneId::North, LaneState::Running),
            lane(LaneId::South, LaneState::Waiting),
            lane(LaneId::East, LaneState::Ready),
            lane(LaneId::West, LaneState::Blocked),
        ];
        let metrics = gridlock_core::MetricsEngine::new(20.0).snapshot(1, 0);
        let rendered = render_snapshot(&lanes, &metrics, "sjf", "hybrid", false);
        assert!(rendered.contains("RUNNING"));
        assert!(rendered.contains("BLOCKED"));
        assert!(rendered.contains("metrics"));
        assert!(!rendered.contains("\x1b["));
    }

    #[test]
    fn color_mode_emits_ansi_codes() {
        let lanes = vec![lane(LaneId::North, LaneState::Running)];
        let metrics = gridlock_core::MetricsEngine::new(20.0).snapshot(0, 0);
        let rendered = render_snapshot(&lanes, &metrics, "mlfq", "banker", true);
        assert!(rendered.contains("\x1b["));
    }
}
