pub mod common;
pub mod config;
pub mod notify;
pub mod sync;
pub mod watch;
