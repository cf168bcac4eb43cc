//! Candle-by-candle simulation loop.
//!
//! Candle 0 seeds the scope and a `none` baseline operation. Every later
//! candle refreshes the candle fields, clears the per-candle outputs,
//! recomputes computed fields, evaluates the top-level rules first-match
//! style and records one [`Operation`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::action::execute_actions;
use crate::domain::candle::Candle;
use crate::domain::error::SimError;
use crate::domain::fields;
use crate::domain::rule_eval::evaluate_rule_group;
use crate::domain::scope::Scope;
use crate::domain::scope_builder::{build_scope, recompute_computed};
use crate::domain::strategy::StrategyDefinition;
use crate::domain::udf::bind_udfs;
use crate::domain::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OpType {
    Buy,
    Sell,
    Reset,
    None,
    /// A strategy-specific label written by a custom action.
    Other(String),
}

impl From<String> for OpType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "buy" => OpType::Buy,
            "sell" => OpType::Sell,
            "reset" => OpType::Reset,
            "none" | "" => OpType::None,
            _ => OpType::Other(s),
        }
    }
}

impl From<OpType> for String {
    fn from(op: OpType) -> Self {
        op.to_string()
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpType::Buy => write!(f, "buy"),
            OpType::Sell => write!(f, "sell"),
            OpType::Reset => write!(f, "reset"),
            OpType::None => write!(f, "none"),
            OpType::Other(s) => write!(f, "{}", s),
        }
    }
}

/// One ledger row per candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(rename = "opType")]
    pub op_type: OpType,
    #[serde(rename = "opTimestamp")]
    pub timestamp: i64,
    #[serde(rename = "opPrice")]
    pub price: f64,
    #[serde(rename = "opQty", skip_serializing_if = "Option::is_none")]
    pub qty: Option<f64>,
    #[serde(rename = "opDescr", skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,
    #[serde(rename = "opResistencia", skip_serializing_if = "Option::is_none")]
    pub resistance: Option<f64>,
    #[serde(rename = "opSuporte", skip_serializing_if = "Option::is_none")]
    pub support: Option<f64>,
}

impl Operation {
    pub fn is_trade(&self) -> bool {
        matches!(self.op_type, OpType::Buy | OpType::Sell)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    #[serde(rename = "initialUSDT")]
    pub initial_usdt: f64,
    #[serde(rename = "initialSOL")]
    pub initial_sol: f64,
    #[serde(rename = "finalUSDT")]
    pub final_usdt: f64,
    #[serde(rename = "finalSOL")]
    pub final_sol: f64,
    pub operations: Vec<Operation>,
    /// Terminal scope values, for reporting.
    #[serde(rename = "finalScope")]
    pub final_scope: BTreeMap<String, Value>,
}

impl SimulationResult {
    pub fn count(&self, op_type: &OpType) -> usize {
        self.operations.iter().filter(|op| &op.op_type == op_type).count()
    }
}

/// Validate `raw` as a strategy, then run it.
pub fn simulate_json(candles: &[Candle], raw: &serde_json::Value) -> Result<SimulationResult, SimError> {
    let strategy = StrategyDefinition::from_json_value(raw)?;
    run_simulation(candles, &strategy)
}

pub fn run_simulation(
    candles: &[Candle],
    strategy: &StrategyDefinition,
) -> Result<SimulationResult, SimError> {
    strategy.validate()?;
    let Some(first) = candles.first() else {
        return Err(SimError::NoCandles);
    };

    log::info!(
        "simulating {} rules over {} candles",
        strategy.rules.len(),
        candles.len()
    );

    let mut scope = build_scope(&strategy.vars);
    seed_levels(&mut scope, first.close);
    bind_udfs(&strategy.udfs, &mut scope);
    load_candle(&mut scope, first, 0);
    reset_outputs(&mut scope, first);

    let initial_usdt = balance(&scope, fields::BALANCE_USDT);
    let initial_sol = balance(&scope, fields::BALANCE_SOL);

    let mut operations = Vec::with_capacity(candles.len());
    operations.push(snapshot(&scope, first));

    for (i, pair) in candles.windows(2).enumerate() {
        let (prev, candle) = (&pair[0], &pair[1]);
        step(&mut scope, strategy, prev, candle, i + 1);
        operations.push(snapshot(&scope, candle));
    }

    let result = SimulationResult {
        initial_usdt,
        initial_sol,
        final_usdt: balance(&scope, fields::BALANCE_USDT),
        final_sol: balance(&scope, fields::BALANCE_SOL),
        operations,
        final_scope: scope.into_values(),
    };
    log::info!(
        "simulation finished: {} buys, {} sells, {} resets, USDT {:.4} -> {:.4}",
        result.count(&OpType::Buy),
        result.count(&OpType::Sell),
        result.count(&OpType::Reset),
        result.initial_usdt,
        result.final_usdt
    );
    Ok(result)
}

fn step(scope: &mut Scope, strategy: &StrategyDefinition, prev: &Candle, candle: &Candle, index: usize) {
    load_candle(scope, candle, index);
    scope.set(fields::PREV_TIME, prev.time);
    scope.set(fields::PREV_OPEN, prev.open);
    scope.set(fields::PREV_HIGH, prev.high);
    scope.set(fields::PREV_LOW, prev.low);
    scope.set(fields::PREV_CLOSE, prev.close);
    scope.set(fields::PREV_VOLUME, prev.volume);

    reset_outputs(scope, candle);
    recompute_computed(&strategy.vars, scope);
    scope.set(fields::CANDLE_OP, fields::CANDLE_IDLE);
    scope.set(fields::BREAK, false);

    for rule in &strategy.rules {
        if !evaluate_rule_group(&rule.condition, scope) {
            continue;
        }
        log::debug!("candle {}: rule '{}' matched", index, rule.descr);
        execute_actions(&rule.action, scope);

        if scope.value(fields::OP_DESCR).as_str() == Some("") {
            scope.set(fields::OP_DESCR, rule.descr.as_str());
        }
        if let Some(op_type) = &rule.op_type {
            if scope.value(fields::OP_TYPE).as_str() == Some("none") {
                scope.set(fields::OP_TYPE, op_type.as_str());
            }
        }

        if rule.stops_after_match() || scope.value(fields::BREAK).truthy() {
            break;
        }
    }

    if scope.value(fields::CANDLE_OP).as_str() == Some(fields::CANDLE_IDLE) {
        if let Some(count) = scope.number(fields::IDLE_COUNT) {
            scope.set(fields::IDLE_COUNT, count - 1.0);
        }
    }
}

fn load_candle(scope: &mut Scope, candle: &Candle, index: usize) {
    scope.set(fields::TIME, candle.time);
    scope.set(fields::OPEN, candle.open);
    scope.set(fields::HIGH, candle.high);
    scope.set(fields::LOW, candle.low);
    scope.set(fields::CLOSE, candle.close);
    scope.set(fields::VOLUME, candle.volume);
    scope.set(fields::INDEX, index as f64);
    scope.set(fields::TIMESTAMP, candle.time);
}

fn reset_outputs(scope: &mut Scope, candle: &Candle) {
    scope.set(fields::OP_TYPE, "none");
    scope.set(fields::OP_TIMESTAMP, candle.time);
    scope.set(fields::OP_PRICE, candle.close);
    scope.set(fields::OP_QTY, 0.0);
    scope.set(fields::OP_DESCR, "");
    scope.set(fields::OP_RESISTANCE, scope.value(fields::RESISTANCE));
    scope.set(fields::OP_SUPPORT, scope.value(fields::SUPPORT));
}

/// Support and resistance start one `delta` either side of the first close
/// unless the strategy gave them a non-zero value.
fn seed_levels(scope: &mut Scope, first_close: f64) {
    let Some(delta) = scope.number(fields::DELTA) else {
        return;
    };
    if !scope.value(fields::SUPPORT).truthy() {
        scope.set(fields::SUPPORT, first_close - delta);
    }
    if !scope.value(fields::RESISTANCE).truthy() {
        scope.set(fields::RESISTANCE, first_close + delta);
    }
}

fn balance(scope: &Scope, name: &str) -> f64 {
    scope.number(name).unwrap_or(0.0)
}

fn snapshot(scope: &Scope, candle: &Candle) -> Operation {
    let op_type = match scope.value(fields::OP_TYPE) {
        Value::Str(s) => OpType::from(s),
        _ => OpType::None,
    };
    let descr = scope
        .value(fields::OP_DESCR)
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Operation {
        op_type,
        timestamp: scope
            .number(fields::OP_TIMESTAMP)
            .map(|t| t as i64)
            .unwrap_or(candle.time),
        price: scope.number(fields::OP_PRICE).unwrap_or(candle.close),
        qty: scope.number(fields::OP_QTY),
        descr,
        resistance: scope.number(fields::OP_RESISTANCE),
        support: scope.number(fields::OP_SUPPORT),
    }
}
