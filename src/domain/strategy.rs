//! Strategy definition: variable declarations, ordered rules and UDFs.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::error::SimError;
use crate::domain::fields;
use crate::domain::rule::RuleGroup;
use crate::domain::udf::Udf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarKind {
    #[default]
    State,
    Candle,
    Computed,
    Function,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: VarKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,
    #[serde(rename = "sideEffect", default)]
    pub side_effect: bool,
}

impl VariableDeclaration {
    pub fn state(name: &str, value: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            kind: VarKind::State,
            value: Some(value),
            expr: None,
            descr: None,
            side_effect: false,
        }
    }

    pub fn candle(name: &str) -> Self {
        Self {
            kind: VarKind::Candle,
            ..Self::state(name, serde_json::json!(0))
        }
    }

    pub fn computed(name: &str, expr: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: VarKind::Computed,
            value: None,
            expr: Some(expr.to_string()),
            descr: None,
            side_effect: false,
        }
    }

    pub fn function(name: &str, side_effect: bool) -> Self {
        Self {
            name: name.to_string(),
            kind: VarKind::Function,
            value: None,
            expr: None,
            descr: None,
            side_effect,
        }
    }

    /// Expression to recompute every candle. A computed field's literal
    /// `value` only seeds the initial scope.
    pub fn recompute_expr(&self) -> Option<&str> {
        match self.kind {
            VarKind::Computed => self.expr.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEntry {
    #[serde(default)]
    pub descr: String,
    /// Operation kind the rule is meant to produce; informational.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub op_type: Option<String>,
    pub condition: RuleGroup,
    pub action: RuleGroup,
    /// `Some(false)` keeps evaluating later rules after this one matches.
    #[serde(rename = "break", default, skip_serializing_if = "Option::is_none")]
    pub break_after: Option<bool>,
}

impl RuleEntry {
    pub fn stops_after_match(&self) -> bool {
        self.break_after != Some(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyDefinition {
    pub vars: Vec<VariableDeclaration>,
    pub rules: Vec<RuleEntry>,
    #[serde(default)]
    pub udfs: Vec<Udf>,
}

impl StrategyDefinition {
    /// Check the raw shape, then deserialise and validate.
    pub fn from_json_value(value: &serde_json::Value) -> Result<Self, SimError> {
        let Some(obj) = value.as_object() else {
            return Err(invalid("strategy must be a JSON object"));
        };
        if !obj.get("vars").is_some_and(|v| v.is_array()) {
            return Err(invalid("field 'vars' is required and must be a list"));
        }
        if !obj.get("rules").is_some_and(|v| v.is_array()) {
            return Err(invalid("field 'rules' is required and must be a list"));
        }
        if obj.get("udfs").is_some_and(|v| !v.is_array()) {
            return Err(invalid("field 'udfs' must be a list"));
        }

        let strategy: StrategyDefinition =
            serde_json::from_value(value.clone()).map_err(|e| invalid(&e.to_string()))?;
        strategy.validate()?;
        Ok(strategy)
    }

    pub fn from_json_str(text: &str) -> Result<Self, SimError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        Self::from_json_value(&value)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        let mut seen = HashSet::new();
        for var in &self.vars {
            if var.name.trim().is_empty() {
                return Err(invalid("variable with empty name"));
            }
            if !seen.insert(var.name.as_str()) {
                return Err(invalid(&format!("duplicate variable '{}'", var.name)));
            }
            if var.kind == VarKind::Function && fields::call_target(&var.name).is_none() {
                return Err(invalid(&format!(
                    "function '{}' must be declared with a trailing ()",
                    var.name
                )));
            }
            if var.kind == VarKind::Computed && var.value.is_none() && var.expr.is_none() {
                return Err(invalid(&format!(
                    "computed variable '{}' needs a value or an expr",
                    var.name
                )));
            }
        }

        let mut udf_names = HashSet::new();
        for udf in &self.udfs {
            if udf.name.trim().is_empty() {
                return Err(invalid("udf with empty name"));
            }
            if !udf_names.insert(udf.name.as_str()) {
                return Err(invalid(&format!("duplicate udf '{}'", udf.name)));
            }
        }

        for rule in &self.rules {
            for leaf in rule.condition.leaves() {
                if let Some(name) = fields::call_target(&leaf.field) {
                    if self.function_has_side_effects(name) {
                        log::warn!(
                            "rule '{}' uses side-effecting {}() in its condition",
                            rule.descr,
                            name
                        );
                    }
                }
            }
        }
        Ok(())
    }

    fn function_has_side_effects(&self, name: &str) -> bool {
        let declared = self.vars.iter().find(|v| {
            v.kind == VarKind::Function && fields::call_target(&v.name) == Some(name)
        });
        match declared {
            Some(v) => v.side_effect,
            None => self.udfs.iter().any(|u| u.name == name),
        }
    }

    pub fn udf(&self, name: &str) -> Option<&Udf> {
        self.udfs.iter().find(|u| u.name == name)
    }

    /// Replace the initial value of `name`, declaring it as state when the
    /// strategy does not have it yet.
    pub fn set_initial_value(&mut self, name: &str, value: serde_json::Value) {
        match self.vars.iter_mut().find(|v| v.name == name) {
            Some(var) => var.value = Some(value),
            None => self.vars.push(VariableDeclaration::state(name, value)),
        }
    }
}

fn invalid(reason: &str) -> SimError {
    SimError::InvalidStrategy {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> serde_json::Value {
        json!({
            "vars": [
                { "name": "saldoUSDT", "value": 100, "type": "state" },
                { "name": "close", "value": 0, "type": "candle" },
                { "name": "valorOp", "expr": "close * qty", "type": "computed" },
                { "name": "buy()", "type": "function", "sideEffect": true }
            ],
            "rules": [
                {
                    "descr": "always",
                    "condition": { "combinator": "and", "rules": [] },
                    "action": { "combinator": "and", "rules": [] },
                    "break": false
                }
            ]
        })
    }

    #[test]
    fn parses_minimal_strategy() {
        let s = StrategyDefinition::from_json_value(&minimal()).unwrap();
        assert_eq!(s.vars.len(), 4);
        assert_eq!(s.vars[1].kind, VarKind::Candle);
        assert_eq!(s.vars[2].recompute_expr(), Some("close * qty"));
        assert!(s.vars[3].side_effect);
        assert!(s.udfs.is_empty());
        assert!(!s.rules[0].stops_after_match());
    }

    #[test]
    fn missing_type_defaults_to_state() {
        let mut value = minimal();
        value["vars"] = json!([{ "name": "delta", "value": 1 }]);
        let s = StrategyDefinition::from_json_value(&value).unwrap();
        assert_eq!(s.vars[0].kind, VarKind::State);
    }

    #[test]
    fn break_defaults_to_stop() {
        let mut value = minimal();
        value["rules"][0].as_object_mut().unwrap().remove("break");
        let s = StrategyDefinition::from_json_value(&value).unwrap();
        assert!(s.rules[0].stops_after_match());
    }

    #[test]
    fn missing_vars_is_invalid() {
        let err = StrategyDefinition::from_json_value(&json!({ "rules": [] })).unwrap_err();
        assert!(matches!(err, SimError::InvalidStrategy { .. }));
        assert!(err.to_string().contains("vars"));
    }

    #[test]
    fn non_list_rules_is_invalid() {
        let err =
            StrategyDefinition::from_json_value(&json!({ "vars": [], "rules": {} })).unwrap_err();
        assert!(err.to_string().contains("rules"));
    }

    #[test]
    fn non_object_is_invalid() {
        assert!(StrategyDefinition::from_json_value(&json!([1, 2])).is_err());
        assert!(StrategyDefinition::from_json_str("not json").is_err());
    }

    #[test]
    fn malformed_rule_is_invalid() {
        let err = StrategyDefinition::from_json_value(&json!({
            "vars": [],
            "rules": [ { "descr": "no condition" } ]
        }))
        .unwrap_err();
        assert!(matches!(err, SimError::InvalidStrategy { .. }));
    }

    #[test]
    fn duplicate_variable_is_invalid() {
        let mut value = minimal();
        value["vars"] = json!([{ "name": "a", "value": 1 }, { "name": "a", "value": 2 }]);
        let err = StrategyDefinition::from_json_value(&value).unwrap_err();
        assert!(err.to_string().contains("duplicate variable 'a'"));
    }

    #[test]
    fn function_without_parens_is_invalid() {
        let mut value = minimal();
        value["vars"] = json!([{ "name": "buy", "type": "function" }]);
        assert!(StrategyDefinition::from_json_value(&value).is_err());
    }

    #[test]
    fn computed_without_value_or_expr_is_invalid() {
        let mut value = minimal();
        value["vars"] = json!([{ "name": "x", "type": "computed" }]);
        assert!(StrategyDefinition::from_json_value(&value).is_err());
    }

    #[test]
    fn duplicate_udf_is_invalid() {
        let mut value = minimal();
        value["udfs"] = json!([
            { "name": "reset", "blocks": [] },
            { "name": "reset", "blocks": [] }
        ]);
        assert!(StrategyDefinition::from_json_value(&value).is_err());
    }

    #[test]
    fn only_computed_fields_recompute() {
        let mut var = VariableDeclaration::computed("x", "1 + 1");
        var.value = Some(json!(5));
        assert_eq!(var.recompute_expr(), Some("1 + 1"));
        var.expr = None;
        assert_eq!(var.recompute_expr(), None);
        assert_eq!(VariableDeclaration::state("y", json!(1)).recompute_expr(), None);
    }

    #[test]
    fn set_initial_value_overrides_or_declares() {
        let mut s = StrategyDefinition::from_json_value(&minimal()).unwrap();
        s.set_initial_value("saldoUSDT", json!(250));
        s.set_initial_value("taxa", json!(0.002));
        assert_eq!(s.vars[0].value, Some(json!(250)));
        let taxa = s.vars.last().unwrap();
        assert_eq!(taxa.name, "taxa");
        assert_eq!(taxa.kind, VarKind::State);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn udf_lookup() {
        let mut value = minimal();
        value["udfs"] = json!([{ "name": "reset", "blocks": [] }]);
        let s = StrategyDefinition::from_json_value(&value).unwrap();
        assert!(s.udf("reset").is_some());
        assert!(s.udf("buy").is_none());
        assert!(s.function_has_side_effects("reset"));
        assert!(s.function_has_side_effects("buy"));
    }
}
