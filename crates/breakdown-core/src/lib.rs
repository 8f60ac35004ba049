//! # BreakDown Core Library
//!
//! This library provides the core logic for the BreakDown productivity
//! timer: a Pomodoro-style session clock, a personal task checklist and an
//! optional music-playback integration. All operations are exposed through
//! the `breakdown` CLI, which is a thin presentation layer over this crate.
//!
//! ## Architecture
//!
//! - **Session Clock**: A second-granularity state machine rotating between
//!   Work, ShortBreak and LongBreak; the caller drives `tick()`
//! - **Clock Driver**: A tokio task owning the clock and its single tick source
//! - **Storage**: SQLite phase history and task lists, TOML configuration
//! - **Tasks**: Per-user checklist with change notification
//! - **Playback**: Streaming-service client, token exchange via an external backend
//!
//! ## Key Components
//!
//! - [`SessionClock`]: Core countdown state machine
//! - [`ClockDriver`]: Owned 1 second scheduling for a clock
//! - [`Database`]: Phase history, tasks and key-value persistence
//! - [`Config`]: Application configuration management
//! - [`TaskList`]: A user's checklist over a [`TaskStore`]

pub mod error;
pub mod events;
pub mod identity;
pub mod playback;
pub mod storage;
pub mod tasks;
pub mod timer;

pub use error::{
    ClockError, ConfigError, CoreError, DatabaseError, PlaybackError, TaskError, ValidationError,
};
pub use events::Event;
pub use identity::UserId;
pub use storage::{Config, Database, PhaseRecord, Stats};
pub use tasks::{TaskChange, TaskList, TaskRecord, TaskStore};
pub use timer::{ClockDriver, ClockHandle, Durations, SessionClock, SessionKind};
