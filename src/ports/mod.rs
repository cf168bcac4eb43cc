//! Port traits between the simulation core and the outside world.

pub mod candle_port;
pub mod config_port;
pub mod report_port;
