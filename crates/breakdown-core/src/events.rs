use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::SessionKind;

/// Every state change of the session clock produces an Event.
/// The presentation layer re-renders from them; history is recorded from
/// `PhaseRotated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    ClockStarted {
        kind: SessionKind,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    ClockPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    ClockResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    ClockStopped {
        kind: SessionKind,
        at: DateTime<Utc>,
    },
    Ticked {
        kind: SessionKind,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A phase ran out and the next one started automatically.
    PhaseRotated {
        completed: SessionKind,
        completed_secs: u64,
        next: SessionKind,
        next_secs: u64,
        completed_work_sessions: u32,
        at: DateTime<Utc>,
    },
    Configured {
        work_secs: u64,
        short_break_secs: u64,
        long_break_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        kind: SessionKind,
        running: bool,
        remaining_secs: u64,
        total_secs: u64,
        completed_work_sessions: u32,
        progress: f64,
        display: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Event::ClockStarted { at, .. }
            | Event::ClockPaused { at, .. }
            | Event::ClockResumed { at, .. }
            | Event::ClockStopped { at, .. }
            | Event::Ticked { at, .. }
            | Event::PhaseRotated { at, .. }
            | Event::Configured { at, .. }
            | Event::StateSnapshot { at, .. } => *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_snake_case_tag() {
        let ev = Event::ClockPaused {
            remaining_secs: 300,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "clock_paused");
        assert_eq!(json["remaining_secs"], 300);
    }
}
