//! Strategies bundled with the binary.

use crate::domain::error::SimError;
use crate::domain::strategy::StrategyDefinition;

const BASE_STRATEGY: &str = include_str!("../../strategies/base_strategy.json");

/// Support/resistance trader: buys below support, sells above resistance,
/// and moves both levels around the close after every trade or after
/// `iddleInit` idle candles.
pub fn base_strategy() -> Result<StrategyDefinition, SimError> {
    StrategyDefinition::from_json_str(BASE_STRATEGY)
}
