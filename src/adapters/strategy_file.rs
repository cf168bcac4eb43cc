//! Strategy JSON files.

use crate::domain::error::SimError;
use crate::domain::strategy::StrategyDefinition;
use std::fs;
use std::path::Path;

pub fn load_strategy<P: AsRef<Path>>(path: P) -> Result<StrategyDefinition, SimError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let strategy = StrategyDefinition::from_json_str(&text)?;
    log::debug!(
        "loaded strategy {} ({} vars, {} rules, {} udfs)",
        path.display(),
        strategy.vars.len(),
        strategy.rules.len(),
        strategy.udfs.len()
    );
    Ok(strategy)
}

pub fn save_strategy<P: AsRef<Path>>(strategy: &StrategyDefinition, path: P) -> Result<(), SimError> {
    let text = serde_json::to_string_pretty(strategy)?;
    fs::write(path, text + "\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::presets;
    use tempfile::TempDir;

    #[test]
    fn save_then_load_keeps_strategy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("base.json");
        let strategy = presets::base_strategy().unwrap();
        save_strategy(&strategy, &path).unwrap();
        assert_eq!(load_strategy(&path).unwrap(), strategy);
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_strategy("/nonexistent/strategy.json"),
            Err(SimError::Io(_))
        ));
    }

    #[test]
    fn malformed_json_is_json_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ vars: ").unwrap();
        assert!(matches!(load_strategy(&path), Err(SimError::Json(_))));
    }

    #[test]
    fn wrong_shape_is_invalid_strategy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shape.json");
        fs::write(&path, r#"{ "rules": [] }"#).unwrap();
        assert!(matches!(
            load_strategy(&path),
            Err(SimError::InvalidStrategy { .. })
        ));
    }
}
