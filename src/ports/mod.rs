//! Port traits implemented by adapters.

pub mod config_port;
pub mod price_data_port;
