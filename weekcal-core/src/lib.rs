//! Core types and pipeline for weekcal.
//!
//! This crate turns ICS text into a seven-day view:
//! - `ics` parses the document
//! - `recurrence` expands recurring events within a bounded window
//! - `normalize` merges both event sources in start order
//! - `week` groups the result by local calendar day
//! - `pipeline` runs the stages in sequence

pub mod error;
pub mod event;
pub mod ics;
pub mod normalize;
pub mod pipeline;
pub mod recurrence;
pub mod week;
pub mod window;

pub use error::{WeekcalError, WeekcalResult};
pub use event::*;
pub use pipeline::{ViewOptions, WeekReport, build_week, build_week_from_document};
pub use week::{DayBucket, WeekView, group_by_day};
