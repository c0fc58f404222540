//! Background maintenance for UploadHub.
//!
//! This crate provides:
//! - An expiry reaper that moves overdue sessions to `expired` and
//!   reclaims chunk directories no active session owns
//! - A cron scheduler that runs the reaper periodically

pub mod reaper;
pub mod scheduler;

pub use reaper::{ExpiryReaper, SweepReport};
pub use scheduler::CronScheduler;
