//! Port traits between the domain and its adapters.

pub mod config_port;
pub mod criteria_source;
pub mod price_source;
