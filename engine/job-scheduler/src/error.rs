//! Error types for the scheduler

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Invalid time of day {hour:02}:{minute:02}")]
    InvalidTime { hour: u32, minute: u32 },

    #[error("Job {name} is already registered")]
    DuplicateJob { name: String },

    #[error("Job chain {name} has no steps")]
    EmptyChain { name: String },
}
