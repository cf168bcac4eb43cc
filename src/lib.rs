//! rulesim: candle-by-candle backtester for declarative rule strategies.
//!
//! Hexagonal architecture: the rule interpreter and simulation loop in
//! [`domain`], port traits in [`ports`], concrete implementations in
//! [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
