//! CSV candle source and CSV operation ledger.

use crate::domain::candle::{self, Candle};
use crate::domain::error::SimError;
use crate::domain::simulation::SimulationResult;
use crate::ports::candle_port::CandlePort;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads `time,open,high,low,close,volume` rows, `time` in epoch milliseconds.
pub struct CsvCandleAdapter {
    path: PathBuf,
}

impl CsvCandleAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

fn column<T: std::str::FromStr>(record: &csv::StringRecord, index: usize, name: &str) -> Result<T, SimError>
where
    T::Err: std::fmt::Display,
{
    record
        .get(index)
        .ok_or_else(|| SimError::CandleData {
            reason: format!("missing {} column", name),
        })?
        .trim()
        .parse()
        .map_err(|e| SimError::CandleData {
            reason: format!("invalid {} value: {}", name, e),
        })
}

impl CandlePort for CsvCandleAdapter {
    fn fetch_candles(&self, from: Option<i64>, to: Option<i64>) -> Result<Vec<Candle>, SimError> {
        let content = fs::read_to_string(&self.path).map_err(|e| SimError::CandleData {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut candles = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| SimError::CandleData {
                reason: format!("CSV parse error: {}", e),
            })?;

            let time: i64 = column(&record, 0, "time")?;
            if from.is_some_and(|f| time < f) || to.is_some_and(|t| time > t) {
                continue;
            }

            candles.push(Candle {
                time,
                open: column(&record, 1, "open")?,
                high: column(&record, 2, "high")?,
                low: column(&record, 3, "low")?,
                close: column(&record, 4, "close")?,
                volume: column(&record, 5, "volume")?,
            });
        }

        candles.sort_by_key(|c| c.time);
        if let Err(index) = candle::check_ascending(&candles) {
            return Err(SimError::CandleData {
                reason: format!("duplicate candle time {}", candles[index].time),
            });
        }
        log::debug!("loaded {} candles from {}", candles.len(), self.path.display());
        Ok(candles)
    }
}

/// Writes one row per operation:
/// `op_type,timestamp,datetime,price,qty,descr,resistencia,suporte`.
pub struct CsvLedgerAdapter;

impl ReportPort for CsvLedgerAdapter {
    fn write(&self, result: &SimulationResult, output_path: &Path) -> Result<(), SimError> {
        let mut wtr = csv::Writer::from_path(output_path)?;
        wtr.write_record([
            "op_type",
            "timestamp",
            "datetime",
            "price",
            "qty",
            "descr",
            "resistencia",
            "suporte",
        ])?;

        let optional = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();
        for op in &result.operations {
            wtr.write_record([
                op.op_type.to_string(),
                op.timestamp.to_string(),
                candle::format_time(op.timestamp),
                op.price.to_string(),
                optional(op.qty),
                op.descr.clone().unwrap_or_default(),
                optional(op.resistance),
                optional(op.support),
            ])?;
        }
        wtr.flush()?;
        log::info!(
            "wrote {} operations to {}",
            result.operations.len(),
            output_path.display()
        );
        Ok(())
    }
}
