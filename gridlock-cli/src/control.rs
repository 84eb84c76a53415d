//! Interactive controls: a background thread that turns stdin keystrokes
//! into abstract [`ControlEvent`]s. This is deliberately a thin line-based
//! reader, not a raw-mode terminal UI.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use gridlock_common::config::Algorithm;
use gridlock_common::ids::LaneId;

/// One user-control event, decoupled from however it was typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    SwitchAlgorithm(Algorithm),
    PauseResume,
    TriggerEmergency(LaneId),
    Reset,
    Quit,
}

fn parse_line(line: &str) -> Option<ControlEvent> {
    let line = line.trim();
    match line {
        "1" => Some(ControlEvent::SwitchAlgorithm(Algorithm::Sjf)),
        "2" => Some(ControlEvent::SwitchAlgorithm(Algorithm::Mlfq)),
        "3" => Some(ControlEvent::SwitchAlgorithm(Algorithm::Prr)),
        "p" | "P" => Some(ControlEvent::PauseResume),
        "r" | "R" => Some(ControlEvent::Reset),
        "q" | "Q" => Some(ControlEvent::Quit),
        "e n" | "eN" | "en" => Some(ControlEvent::TriggerEmergency(LaneId::North)),
        "e s" | "eS" | "es" => Some(ControlEvent::TriggerEmergency(LaneId::South)),
        "e e" | "eE" | "ee" => Some(ControlEvent::TriggerEmergency(LaneId::East)),
        "e w" | "eW" | "ew" => Some(ControlEvent::TriggerEmergency(LaneId::West)),
        _ => None,
    }
}

/// Spawn a thread reading lines from stdin and forwarding parsed events.
/// The channel is dropped (closing the receiver) when stdin hits EOF.
pub fn spawn_stdin_reader() -> Receiver<ControlEvent> {
    let (tx, rx): (Sender<ControlEvent>, Receiver<ControlEvent>) = mpsc::channel();
    thread::spawn(move || {
        let mut line = String::new();
        loop {
            line.clear();
            match std::io::stdin().read_line(&mut line) {
                Ok(0) => break, // EOF
                Ok(_) => {
                    if let Some(event) = parse_line(&line) {
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_algorithm_switches() {
        assert_eq!(parse_line("1"), Some(ControlEvent::SwitchAlgorithm(Algorithm::Sjf)));
        assert_eq!(parse_line("2"), Some(ControlEvent::SwitchAlgorithm(Algorithm::Mlfq)));
        assert_eq!(parse_line("3"), Some(ControlEvent::SwitchAlgorithm(Algorithm::Prr)));
    }

    #[test]
    fn parses_pause_reset_quit() {
        assert_eq!(parse_line("p"), Some(ControlEvent::PauseResume));
        assert_eq!(parse_line("R"), Some(ControlEvent::Reset));
        assert_eq!(parse_line("q"), Some(ControlEvent::Quit));
    }

    #[test]
    fn parses_emergency_trigger() {
        assert_eq!(parse_line("en"), Some(ControlEvent::TriggerEmergency(LaneId::North)));
        assert_eq!(parse_line("ew"), Some(ControlEvent::TriggerEmergency(LaneId::West)));
    }

    #[test]
    fn unrecognized_line_is_ignored() {
        assert_eq!(parse_line("banana"), None);
    }

    #[test]
    fn whitespace_is_trimmed() {
        assert_eq!(parse_line("  q  \n"), Some(ControlEvent::Quit));
    }
}
