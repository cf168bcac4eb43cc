//! Rule interpreter and simulation core.

pub mod error;
pub mod value;
pub mod fields;
pub mod expr;
pub mod scope;
pub mod scope_builder;
pub mod rule;
pub mod rule_eval;
pub mod action;
pub mod udf;
pub mod candle;
pub mod date_range;
pub mod strategy;
pub mod simulation;
pub mod presets;
pub mod config_validation;
