#![allow(dead_code)]

use rulesim::domain::candle::Candle;
use rulesim::domain::presets;
use rulesim::domain::strategy::StrategyDefinition;
use std::io::Write;

pub const QUARTER_MS: i64 = 15 * 60 * 1000;

/// Flat candle (open = high = low = close) at `index` quarters past epoch.
pub fn make_candle(index: i64, close: f64) -> Candle {
    Candle {
        time: index * QUARTER_MS,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1.0,
    }
}

pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| make_candle(i as i64 + 1, close))
        .collect()
}

pub fn base_strategy() -> StrategyDefinition {
    presets::base_strategy().unwrap()
}

pub fn candles_csv(candles: &[Candle]) -> String {
    let mut out = String::from("time,open,high,low,close,volume\n");
    for c in candles {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            c.time, c.open, c.high, c.low, c.close, c.volume
        ));
    }
    out
}

pub fn write_temp(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
