//! Session clock state machine.
//!
//! The clock counts down in whole seconds. It does not keep time itself --
//! the owner calls `tick()` once per second while it runs (see
//! [`super::driver`]).
//!
//! ## Rotation
//!
//! ```text
//! Work -> ShortBreak -> Work -> ShortBreak -> Work -> ShortBreak -> Work -> LongBreak -> Work ...
//! ```
//!
//! Every fourth completed Work phase is followed by a LongBreak. Rotation
//! happens only when a phase runs out; the next phase starts immediately.
//!
//! ## Usage
//!
//! ```ignore
//! let mut clock = SessionClock::new(Durations::default());
//! clock.start();
//! // Once per second:
//! clock.tick();
//! ```

use chrono::Utc;
use serde::Serialize;

use super::phase::{Durations, SessionKind, WORK_SESSIONS_PER_CYCLE};
use crate::error::ClockError;
use crate::events::Event;

/// Countdown state for one timer view. Serialize-only: a clock is built
/// through [`SessionClock::new`] so its durations are always valid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionClock {
    kind: SessionKind,
    remaining_secs: u64,
    /// Duration the active phase started with.
    total_secs: u64,
    running: bool,
    completed_work_sessions: u32,
    durations: Durations,
}

impl SessionClock {
    /// Create an idle clock with a full Work phase loaded.
    pub fn new(durations: Durations) -> Self {
        Self {
            kind: SessionKind::Work,
            remaining_secs: durations.work_secs(),
            total_secs: durations.work_secs(),
            running: false,
            completed_work_sessions: 0,
            durations,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session_kind(&self) -> SessionKind {
        self.kind
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn completed_work_sessions(&self) -> u32 {
        self.completed_work_sessions
    }

    pub fn durations(&self) -> Durations {
        self.durations
    }

    /// Fraction of the current phase still remaining, in `[0, 1]`.
    ///
    /// Returns 0.0 after `stop()` (no phase loaded).
    pub fn progress(&self) -> f64 {
        if self.total_secs == 0 {
            return 0.0;
        }
        self.remaining_secs as f64 / self.total_secs as f64
    }

    /// Remaining time as `MM:SS`. Minutes widen past two digits rather
    /// than wrap, so a 120 minute phase shows `120:00`.
    pub fn display(&self) -> String {
        format_mm_ss(self.remaining_secs)
    }

    /// 1-based position within the current cycle of four work sessions.
    ///
    /// During a break this is the work session that just ended.
    pub fn cycle_position(&self) -> u32 {
        let done = self.completed_work_sessions;
        match self.kind {
            SessionKind::Work => done % WORK_SESSIONS_PER_CYCLE + 1,
            _ if done == 0 => 1,
            _ => (done - 1) % WORK_SESSIONS_PER_CYCLE + 1,
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            kind: self.kind,
            running: self.running,
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs,
            completed_work_sessions: self.completed_work_sessions,
            progress: self.progress(),
            display: self.display(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Replace the configured durations. The active phase keeps its
    /// current total; the new values apply from the next phase start.
    ///
    /// # Errors
    /// Returns [`ClockError::InvalidConfig`] and keeps the previous
    /// configuration if any value is zero.
    pub fn configure(
        &mut self,
        work: u64,
        short_break: u64,
        long_break: u64,
    ) -> Result<Event, ClockError> {
        self.durations = Durations::new(work, short_break, long_break)?;
        Ok(Event::Configured {
            work_secs: work,
            short_break_secs: short_break,
            long_break_secs: long_break,
            at: Utc::now(),
        })
    }

    /// Begin a fresh Work phase. No-op while running.
    pub fn start(&mut self) -> Option<Event> {
        if self.running {
            return None;
        }
        self.kind = SessionKind::Work;
        self.load_phase();
        self.running = true;
        Some(Event::ClockStarted {
            kind: self.kind,
            duration_secs: self.total_secs,
            at: Utc::now(),
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.running = false;
        Some(Event::ClockPaused {
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Continue a paused phase.
    ///
    /// # Errors
    /// Returns [`ClockError::NothingToResume`] when no time is left
    /// (after `stop()`). Already running is a plain no-op.
    pub fn resume(&mut self) -> Result<Option<Event>, ClockError> {
        if self.running {
            return Ok(None);
        }
        if self.remaining_secs == 0 {
            return Err(ClockError::NothingToResume);
        }
        self.running = true;
        Ok(Some(Event::ClockResumed {
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        }))
    }

    /// Halt and empty the clock. Kind and completed count are untouched.
    pub fn stop(&mut self) -> Option<Event> {
        self.running = false;
        self.remaining_secs = 0;
        self.total_secs = 0;
        Some(Event::ClockStopped {
            kind: self.kind,
            at: Utc::now(),
        })
    }

    /// Advance one second. No-op unless running.
    ///
    /// Returns `PhaseRotated` when this tick exhausted the phase,
    /// `Ticked` otherwise.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return Some(Event::Ticked {
                kind: self.kind,
                remaining_secs: self.remaining_secs,
                at: Utc::now(),
            });
        }
        self.running = false;
        Some(self.rotate())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn rotate(&mut self) -> Event {
        let completed = self.kind;
        let completed_secs = self.total_secs;
        self.kind = match completed {
            SessionKind::Work => {
                self.completed_work_sessions = self.completed_work_sessions.saturating_add(1);
                if self.completed_work_sessions % WORK_SESSIONS_PER_CYCLE == 0 {
                    SessionKind::LongBreak
                } else {
                    SessionKind::ShortBreak
                }
            }
            SessionKind::ShortBreak | SessionKind::LongBreak => SessionKind::Work,
        };
        self.load_phase();
        self.running = true;
        Event::PhaseRotated {
            completed,
            completed_secs,
            next: self.kind,
            next_secs: self.total_secs,
            completed_work_sessions: self.completed_work_sessions,
            at: Utc::now(),
        }
    }

    fn load_phase(&mut self) {
        self.total_secs = self.durations.for_kind(self.kind);
        self.remaining_secs = self.total_secs;
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new(Durations::default())
    }
}

/// Format seconds as zero-padded `MM:SS`; minutes are never truncated.
pub fn format_mm_ss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
