//! idstore-configs
//!
//! Configuration types and loader for the idstore tables and bootstrap binary.

pub mod config;

pub use config::defaults;
pub use config::*;
