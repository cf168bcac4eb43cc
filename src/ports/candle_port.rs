//! Candle source port trait.

use crate::domain::candle::Candle;
use crate::domain::error::SimError;

pub trait CandlePort {
    /// Candles with open time in `[from, to]` (epoch ms, either bound
    /// optional), ascending by time.
    fn fetch_candles(&self, from: Option<i64>, to: Option<i64>) -> Result<Vec<Candle>, SimError>;

    /// Every candle the source holds.
    fn fetch_all(&self) -> Result<Vec<Candle>, SimError> {
        self.fetch_candles(None, None)
    }
}
