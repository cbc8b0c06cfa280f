//! Port traits the domain depends on.

pub mod account_port;
pub mod config_port;
pub mod data_port;
