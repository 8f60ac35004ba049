mod driver;
mod engine;
mod phase;

pub use driver::{ClockDriver, ClockHandle, TICK_PERIOD};
pub use engine::{format_mm_ss, SessionClock};
pub use phase::{Durations, SessionKind, WORK_SESSIONS_PER_CYCLE};
