//! Report generation port trait.

use std::path::Path;

use crate::domain::error::SimError;
use crate::domain::simulation::{OpType, SimulationResult};

/// Port for writing the operation ledger of a run.
pub trait ReportPort {
    fn write(&self, result: &SimulationResult, output_path: &Path) -> Result<(), SimError>;

    /// Only operations that moved a balance or a level; `none` rows are dropped.
    fn write_trades(&self, result: &SimulationResult, output_path: &Path) -> Result<(), SimError> {
        let trades = SimulationResult {
            operations: result
                .operations
                .iter()
                .filter(|op| op.op_type != OpType::None)
                .cloned()
                .collect(),
            ..result.clone()
        };
        self.write(&trades, output_path)
    }
}
