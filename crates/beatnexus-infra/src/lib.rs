//! BeatNexus Infrastructure Library
//!
//! Tracing initialisation and the scheduled-task primitive used for periodic
//! work (progress polling, cooldown countdowns).

pub mod scheduler;
pub mod telemetry;

pub use scheduler::{ScheduledTask, TickControl};
pub use telemetry::init_telemetry;
