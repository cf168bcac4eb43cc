//! Scope field names the engine itself reads or writes.
//!
//! Everything else in a scope belongs to the strategy file.

pub const TIME: &str = "time";
pub const OPEN: &str = "open";
pub const HIGH: &str = "high";
pub const LOW: &str = "low";
pub const CLOSE: &str = "close";
pub const VOLUME: &str = "volume";
pub const INDEX: &str = "index";
pub const TIMESTAMP: &str = "timestamp";

pub const PREV_TIME: &str = "prevTime";
pub const PREV_OPEN: &str = "prevOpen";
pub const PREV_HIGH: &str = "prevHigh";
pub const PREV_LOW: &str = "prevLow";
pub const PREV_CLOSE: &str = "prevClose";
pub const PREV_VOLUME: &str = "prevVolume";

pub const OP_TYPE: &str = "opType";
pub const OP_TIMESTAMP: &str = "opTimestamp";
pub const OP_PRICE: &str = "opPrice";
pub const OP_QTY: &str = "opQty";
pub const OP_DESCR: &str = "opDescr";
pub const OP_RESISTANCE: &str = "opResistencia";
pub const OP_SUPPORT: &str = "opSuporte";

pub const CANDLE_OP: &str = "candleOp";
pub const BREAK: &str = "break";
pub const RETURN_VALUE: &str = "returnValue";

pub const IDLE_COUNT: &str = "iddleCount";
pub const DELTA: &str = "delta";
pub const RESISTANCE: &str = "resistencia";
pub const SUPPORT: &str = "suporte";
pub const FEE_RATE: &str = "taxa";
pub const BALANCE_USDT: &str = "saldoUSDT";
pub const BALANCE_SOL: &str = "saldoSOL";

/// `candleOp` value meaning no buy/sell/reset happened on this candle.
pub const CANDLE_IDLE: &str = "I";

/// Prefix marking an action value as an expression to evaluate.
pub const EXPR_PREFIX: &str = "expr:";

/// Suffix marking a field as a function call.
pub const CALL_SUFFIX: &str = "()";

/// Strip the call suffix from `name()`, if present.
pub fn call_target(field: &str) -> Option<&str> {
    field.strip_suffix(CALL_SUFFIX)
}
