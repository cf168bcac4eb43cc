//! Initial scope construction from variable declarations.

use crate::domain::expr;
use crate::domain::scope::Scope;
use crate::domain::strategy::{VarKind, VariableDeclaration};
use crate::domain::value::Value;

/// Build a scope in declaration order. A computed field may reference fields
/// declared before it, never after. Function declarations are skipped; their
/// callables are bound separately.
pub fn build_scope(vars: &[VariableDeclaration]) -> Scope {
    let mut scope = Scope::new();
    for var in vars {
        match var.kind {
            VarKind::State | VarKind::Candle => {
                let value = var.value.as_ref().map(Value::from).unwrap_or(Value::Null);
                scope.set(&var.name, value);
            }
            VarKind::Computed => {
                let value = match (&var.value, &var.expr) {
                    (Some(literal), _) => Value::from(literal),
                    (None, Some(source)) => eval_computed(&var.name, source, &scope),
                    (None, None) => Value::Null,
                };
                scope.set(&var.name, value);
            }
            VarKind::Function => {}
        }
    }
    scope
}

/// Re-evaluate every computed expression against the current scope, in
/// declaration order.
pub fn recompute_computed(vars: &[VariableDeclaration], scope: &mut Scope) {
    for var in vars {
        if let Some(source) = var.recompute_expr() {
            let value = eval_computed(&var.name, source, scope);
            scope.set(&var.name, value);
        }
    }
}

fn eval_computed(name: &str, source: &str, scope: &Scope) -> Value {
    match expr::evaluate_expression(source, scope) {
        Some(value) => value,
        None => {
            log::warn!("computed field '{}' could not be evaluated, using null", name);
            Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn copies_state_and_candle_values() {
        let vars = vec![
            VariableDeclaration::state("saldoUSDT", json!(100)),
            VariableDeclaration::state("lastOp", json!("V")),
            VariableDeclaration::candle("close"),
        ];
        let scope = build_scope(&vars);
        assert_eq!(scope.number("saldoUSDT"), Some(100.0));
        assert_eq!(scope.value("lastOp"), Value::from("V"));
        assert_eq!(scope.number("close"), Some(0.0));
    }

    #[test]
    fn computed_uses_earlier_fields() {
        let vars = vec![
            VariableDeclaration::state("close", json!(10)),
            VariableDeclaration::state("qty", json!(2)),
            VariableDeclaration::computed("valorOp", "close * qty"),
            VariableDeclaration::computed("double", "valorOp * 2"),
        ];
        let scope = build_scope(&vars);
        assert_eq!(scope.number("valorOp"), Some(20.0));
        assert_eq!(scope.number("double"), Some(40.0));
    }

    #[test]
    fn computed_forward_reference_is_null() {
        let vars = vec![
            VariableDeclaration::computed("early", "late + 1"),
            VariableDeclaration::state("late", json!(1)),
        ];
        let scope = build_scope(&vars);
        assert_eq!(scope.value("early"), Value::Null);
        assert_eq!(scope.number("late"), Some(1.0));
    }

    #[test]
    fn computed_literal_value_wins() {
        let mut var = VariableDeclaration::computed("x", "nothing_here");
        var.value = Some(json!(3));
        let scope = build_scope(&[var]);
        assert_eq!(scope.number("x"), Some(3.0));
    }

    #[test]
    fn functions_are_not_values() {
        let vars = vec![VariableDeclaration::function("buy()", true)];
        let scope = build_scope(&vars);
        assert!(!scope.contains("buy()"));
        assert!(!scope.contains("buy"));
    }

    #[test]
    fn state_without_value_is_null() {
        let mut var = VariableDeclaration::state("x", json!(1));
        var.value = None;
        let scope = build_scope(&[var]);
        assert_eq!(scope.value("x"), Value::Null);
    }

    #[test]
    fn recompute_follows_scope_changes() {
        let vars = vec![
            VariableDeclaration::candle("close"),
            VariableDeclaration::state("qty", json!(2)),
            VariableDeclaration::computed("valorOp", "close * qty"),
        ];
        let mut scope = build_scope(&vars);
        assert_eq!(scope.number("valorOp"), Some(0.0));
        scope.set("close", 30.0);
        recompute_computed(&vars, &mut scope);
        assert_eq!(scope.number("valorOp"), Some(60.0));
    }
}
