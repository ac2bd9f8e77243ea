pub mod config;
pub mod search;
pub mod watch;
pub mod week;
