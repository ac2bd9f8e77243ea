//! ICS document parsing.
//!
//! This module turns iCalendar text (RFC 5545) into a [`CalendarDocument`].
//! Only reading is supported.
//!
//! [`CalendarDocument`]: crate::event::CalendarDocument

mod parse;
mod rrule;

pub use parse::{parse, parse_in};
pub use rrule::parse_rrule;
