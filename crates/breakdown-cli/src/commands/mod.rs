pub mod config;
pub mod music;
pub mod stats;
pub mod task;
pub mod timer;
