use serde::{Deserialize, Serialize};

use crate::error::ClockError;

/// Work phases completed before a long break replaces the short one.
pub const WORK_SESSIONS_PER_CYCLE: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionKind {
    pub fn label(&self) -> &'static str {
        match self {
            SessionKind::Work => "Work",
            SessionKind::ShortBreak => "Short Break",
            SessionKind::LongBreak => "Long Break",
        }
    }

    pub fn is_break(&self) -> bool {
        !matches!(self, SessionKind::Work)
    }

    /// Stable string used in the phase history table.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Work => "work",
            SessionKind::ShortBreak => "short_break",
            SessionKind::LongBreak => "long_break",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "work" => Some(SessionKind::Work),
            "short_break" => Some(SessionKind::ShortBreak),
            "long_break" => Some(SessionKind::LongBreak),
            _ => None,
        }
    }
}

/// Configured phase durations, in seconds. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDurations")]
pub struct Durations {
    work_secs: u64,
    short_break_secs: u64,
    long_break_secs: u64,
}

impl Durations {
    /// Validate and build a duration set.
    ///
    /// # Errors
    /// Returns [`ClockError::InvalidConfig`] if any value is zero.
    pub fn new(work: u64, short_break: u64, long_break: u64) -> Result<Self, ClockError> {
        if work == 0 || short_break == 0 || long_break == 0 {
            return Err(ClockError::InvalidConfig {
                work,
                short_break,
                long_break,
            });
        }
        Ok(Self {
            work_secs: work,
            short_break_secs: short_break,
            long_break_secs: long_break,
        })
    }

    /// Build from whole minutes, saturating on overflow.
    pub fn from_minutes(work: u64, short_break: u64, long_break: u64) -> Result<Self, ClockError> {
        Self::new(
            work.saturating_mul(60),
            short_break.saturating_mul(60),
            long_break.saturating_mul(60),
        )
    }

    pub fn work_secs(&self) -> u64 {
        self.work_secs
    }

    pub fn short_break_secs(&self) -> u64 {
        self.short_break_secs
    }

    pub fn long_break_secs(&self) -> u64 {
        self.long_break_secs
    }

    pub fn for_kind(&self, kind: SessionKind) -> u64 {
        match kind {
            SessionKind::Work => self.work_secs,
            SessionKind::ShortBreak => self.short_break_secs,
            SessionKind::LongBreak => self.long_break_secs,
        }
    }
}

#[derive(Deserialize)]
struct RawDurations {
    work_secs: u64,
    short_break_secs: u64,
    long_break_secs: u64,
}

impl TryFrom<RawDurations> for Durations {
    type Error = ClockError;

    fn try_from(raw: RawDurations) -> Result<Self, Self::Error> {
        Self::new(raw.work_secs, raw.short_break_secs, raw.long_break_secs)
    }
}

impl Default for Durations {
    /// 25 / 5 / 15 minutes.
    fn default() -> Self {
        Self {
            work_secs: 25 * 60,
            short_break_secs: 5 * 60,
            long_break_secs: 15 * 60,
        }
    }
}
