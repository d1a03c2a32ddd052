#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Daily recurrence driver.
//!
//! [`driver::RecurrenceDriver`] runs a [`driver::Job`] once immediately,
//! registers a [`schedule::DailySchedule`], and spawns a polling task that
//! fires the job whenever the schedule is due. Time is read through the
//! [`clock::Clock`] trait so cadence logic can be exercised with a
//! [`clock::ManualClock`]. Shutdown is cooperative via
//! [`shutdown::ShutdownToken`]: a job that has started always finishes.

pub mod clock;
pub mod driver;
pub mod schedule;
pub mod shutdown;

use thiserror::Error;

/// Errors that can occur in the recurrence driver.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The polling task panicked or was aborted.
    #[error("Polling task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
