//! OHLCV candle representation.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Open time, epoch milliseconds.
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Render an epoch-ms timestamp as `YYYY-MM-DD HH:MM`, UTC.
pub fn format_time(time_ms: i64) -> String {
    DateTime::from_timestamp_millis(time_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| time_ms.to_string())
}

/// Merge consecutive candles of `base_minutes` into candles of
/// `interval_minutes`. Each group takes the first open and time, the extreme
/// high/low, the last close and the summed volume. A trailing group shorter
/// than the ratio is dropped.
pub fn aggregate_candles(candles: &[Candle], interval_minutes: u32, base_minutes: u32) -> Vec<Candle> {
    if base_minutes == 0 || interval_minutes < base_minutes {
        return candles.to_vec();
    }
    let group_size = (interval_minutes / base_minutes) as usize;
    if group_size <= 1 {
        return candles.to_vec();
    }

    candles
        .chunks_exact(group_size)
        .map(|group| {
            let first = &group[0];
            let last = &group[group.len() - 1];
            Candle {
                time: first.time,
                open: first.open,
                high: group.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max),
                low: group.iter().map(|c| c.low).fold(f64::INFINITY, f64::min),
                close: last.close,
                volume: group.iter().map(|c| c.volume).sum(),
            }
        })
        .collect()
}

/// Candles must be strictly ascending by time. Returns the first offending index.
pub fn check_ascending(candles: &[Candle]) -> Result<(), usize> {
    match candles.windows(2).position(|w| w[1].time <= w[0].time) {
        Some(i) => Err(i + 1),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn candle(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
        Candle {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    const QUARTER: i64 = 15 * 60 * 1000;

    #[test]
    fn aggregate_four_quarters_into_hour() {
        let candles = vec![
            candle(0, 10.0, 11.0, 9.5, 10.5, 1.0),
            candle(QUARTER, 10.5, 12.0, 10.0, 11.5, 2.0),
            candle(2 * QUARTER, 11.5, 11.8, 8.0, 9.0, 3.0),
            candle(3 * QUARTER, 9.0, 10.0, 8.5, 9.8, 4.0),
        ];
        let hourly = aggregate_candles(&candles, 60, 15);
        assert_eq!(hourly.len(), 1);
        let h = hourly[0];
        assert_eq!(h.time, 0);
        assert_relative_eq!(h.open, 10.0);
        assert_relative_eq!(h.high, 12.0);
        assert_relative_eq!(h.low, 8.0);
        assert_relative_eq!(h.close, 9.8);
        assert_relative_eq!(h.volume, 10.0);
    }

    #[test]
    fn aggregate_drops_incomplete_tail() {
        let candles: Vec<Candle> = (0..7)
            .map(|i| candle(i * QUARTER, 1.0, 2.0, 0.5, 1.5, 1.0))
            .collect();
        let hourly = aggregate_candles(&candles, 60, 15);
        assert_eq!(hourly.len(), 1);
    }

    #[test]
    fn aggregate_same_interval_is_identity() {
        let candles = vec![candle(0, 1.0, 2.0, 0.5, 1.5, 1.0)];
        assert_eq!(aggregate_candles(&candles, 15, 15), candles);
        assert_eq!(aggregate_candles(&candles, 5, 15), candles);
        assert_eq!(aggregate_candles(&candles, 60, 0), candles);
    }

    #[test]
    fn ascending_check() {
        let ok = vec![candle(1, 1.0, 1.0, 1.0, 1.0, 0.0), candle(2, 1.0, 1.0, 1.0, 1.0, 0.0)];
        assert_eq!(check_ascending(&ok), Ok(()));
        let bad = vec![
            candle(1, 1.0, 1.0, 1.0, 1.0, 0.0),
            candle(3, 1.0, 1.0, 1.0, 1.0, 0.0),
            candle(3, 1.0, 1.0, 1.0, 1.0, 0.0),
        ];
        assert_eq!(check_ascending(&bad), Err(2));
    }

    #[test]
    fn format_epoch_millis() {
        assert_eq!(format_time(0), "1970-01-01 00:00");
        assert_eq!(format_time(1_700_000_000_000), "2023-11-14 22:13");
    }
}
