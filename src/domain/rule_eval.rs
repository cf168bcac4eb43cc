//! Rule evaluation engine.
//!
//! Evaluates a [`RuleGroup`] against a [`Scope`] without mutating it.
//!
//! # Evaluation Semantics
//!
//! - Placeholder nodes are vacuously `true`
//! - Leaves compare `scope[field]` with the literal `value`, or with
//!   `scope[value]` when `valueSource` is `"field"`
//! - `=`/`==` loose equality, `!=` loose inequality, `> >= < <=` ordering;
//!   unknown, missing or non-string operators are `false`
//! - `AND`: Short-circuits on first `false`, otherwise `true`
//! - `OR`: Short-circuits on first `true`, otherwise `false`

use std::cmp::Ordering;

use crate::domain::fields;
use crate::domain::rule::{Combinator, Rule, RuleGroup, RuleNode, ValueSource};
use crate::domain::scope::Scope;
use crate::domain::value::Value;

pub fn evaluate_rule_group(group: &RuleGroup, scope: &Scope) -> bool {
    let is_and = group.combinator == Combinator::And;

    for node in &group.rules {
        let result = match node {
            RuleNode::Placeholder(_) => true,
            RuleNode::Group(inner) => evaluate_rule_group(inner, scope),
            RuleNode::Leaf(rule) => evaluate_rule(rule, scope),
        };

        if is_and && !result {
            return false;
        }
        if !is_and && result {
            return true;
        }
    }

    is_and
}

pub fn evaluate_rule(rule: &Rule, scope: &Scope) -> bool {
    let Some(operator) = rule.operator() else {
        return false;
    };
    let left = resolve_field(&rule.field, scope);
    let right = resolve_right(rule, scope);
    compare(operator, &left, &right)
}

/// Read a field for a condition. `name()` goes through a pure query callable;
/// the names `true`/`false` fall back to the boolean literals.
pub fn resolve_field(field: &str, scope: &Scope) -> Value {
    if let Some(name) = fields::call_target(field) {
        if scope.callable(name).is_none() {
            log::warn!("condition reads {}() but no such function is registered", name);
            return Value::Undefined;
        }
        return scope.query(name).unwrap_or_default();
    }
    match scope.get(field) {
        Some(v) => v.clone(),
        None => match field {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::Undefined,
        },
    }
}

/// Right-hand side of a leaf: the literal, or the named field's value.
pub fn resolve_right(rule: &Rule, scope: &Scope) -> Value {
    match (rule.value_source, &rule.value) {
        (ValueSource::Field, serde_json::Value::String(name)) => resolve_field(name, scope),
        (ValueSource::Field, _) => Value::Undefined,
        (ValueSource::Value, literal) => Value::from(literal),
    }
}

pub fn compare(operator: &str, left: &Value, right: &Value) -> bool {
    match operator {
        "=" | "==" => left.loose_eq(right),
        "!=" => !left.loose_eq(right),
        ">" => left.loose_cmp(right) == Some(Ordering::Greater),
        ">=" => matches!(
            left.loose_cmp(right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        "<" => left.loose_cmp(right) == Some(Ordering::Less),
        "<=" => matches!(
            left.loose_cmp(right),
            Some(Ordering::Less | Ordering::Equal)
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::scope::Callable;
    use serde_json::json;

    fn group(value: serde_json::Value) -> RuleGroup {
        serde_json::from_value(value).unwrap()
    }

    fn sample_scope() -> Scope {
        let mut scope = Scope::new();
        scope.set("index", 2.0);
        scope.set("close", 10.0);
        scope.set("suporte", 11.0);
        scope.set("saldoUSDT", 100.0);
        scope.set("valorOp", 50.0);
        scope.set("lastOp", "V");
        scope
    }

    fn explode(_: &Scope) -> Value {
        panic!("must not be evaluated");
    }

    fn always_seven(_: &Scope) -> Value {
        Value::Number(7.0)
    }

    #[test]
    fn evaluate_and_all_true() {
        let mut scope = Scope::new();
        scope.set("a", 5.0);
        scope.set("b", 10.0);
        let g = group(json!({
            "combinator": "and",
            "rules": [
                { "field": "a", "operator": ">=", "valueSource": "value", "value": 5 },
                { "field": "b", "operator": "<", "valueSource": "value", "value": 20 }
            ]
        }));
        assert!(evaluate_rule_group(&g, &scope));
    }

    #[test]
    fn evaluate_buy_condition_nested() {
        let g = group(json!({
            "combinator": "or",
            "rules": [
                { "field": "index", "operator": "=", "valueSource": "value", "value": 1 },
                {
                    "combinator": "and",
                    "rules": [
                        { "field": "close", "operator": "<=", "valueSource": "field", "value": "suporte" },
                        { "field": "saldoUSDT", "operator": ">=", "valueSource": "field", "value": "valorOp" },
                        { "field": "lastOp", "operator": "==", "valueSource": "value", "value": "V" }
                    ]
                }
            ]
        }));
        assert!(evaluate_rule_group(&g, &sample_scope()));

        let mut scope = sample_scope();
        scope.set("lastOp", "C");
        assert!(!evaluate_rule_group(&g, &scope));
    }

    #[test]
    fn empty_groups_return_identity() {
        let scope = Scope::new();
        assert!(evaluate_rule_group(&RuleGroup::and(vec![]), &scope));
        assert!(!evaluate_rule_group(&RuleGroup::or(vec![]), &scope));
    }

    #[test]
    fn evaluate_and_short_circuit() {
        let mut scope = sample_scope();
        scope.register("boom", Callable::Query(explode));
        let g = group(json!({
            "combinator": "and",
            "rules": [
                { "field": "close", "operator": ">", "value": 100 },
                { "combinator": "and", "rules": [ { "field": "boom()", "operator": "=", "value": 1 } ] }
            ]
        }));
        assert!(!evaluate_rule_group(&g, &scope));
    }

    #[test]
    fn evaluate_or_short_circuit() {
        let mut scope = sample_scope();
        scope.register("boom", Callable::Query(explode));
        let g = group(json!({
            "combinator": "or",
            "rules": [
                { "field": "close", "operator": "=", "value": 10 },
                { "field": "boom()", "operator": "=", "value": 1 }
            ]
        }));
        assert!(evaluate_rule_group(&g, &scope));
    }

    #[test]
    fn placeholders_are_vacuously_true() {
        let scope = Scope::new();
        let g = group(json!({ "combinator": "and", "rules": ["and", null] }));
        assert!(evaluate_rule_group(&g, &scope));
        let g = group(json!({ "combinator": "or", "rules": ["or"] }));
        assert!(evaluate_rule_group(&g, &scope));
    }

    #[test]
    fn unknown_or_missing_operator_is_false() {
        let scope = sample_scope();
        let g = group(json!({ "combinator": "and", "rules": [ { "field": "close", "operator": "between", "value": 10 } ] }));
        assert!(!evaluate_rule_group(&g, &scope));
        let g = group(json!({ "combinator": "or", "rules": [ { "field": "close", "value": 10 } ] }));
        assert!(!evaluate_rule_group(&g, &scope));
    }

    #[test]
    fn malformed_leaves_are_false() {
        let scope = sample_scope();
        let g = group(json!({ "combinator": "and", "rules": [ { "field": "close", "operator": 5, "value": 10 } ] }));
        assert!(!evaluate_rule_group(&g, &scope));
        let g = group(json!({ "combinator": "and", "rules": [ { "combinator": "or" } ] }));
        assert!(!evaluate_rule_group(&g, &scope));
        let g = group(json!({ "combinator": "and", "rules": [ { "value": 10 } ] }));
        assert!(!evaluate_rule_group(&g, &scope));
    }

    #[test]
    fn unregistered_call_leaf_is_undefined() {
        let scope = sample_scope();
        assert_eq!(resolve_field("ghost()", &scope), Value::Undefined);
        assert!(!evaluate_rule(&Rule::new("ghost()", "=", json!(1)), &scope));
    }

    #[test]
    fn loose_equality_across_kinds() {
        let mut scope = Scope::new();
        scope.set("n", 1.0);
        scope.set("flag", true);
        assert!(evaluate_rule(&Rule::new("n", "=", json!("1")), &scope));
        assert!(evaluate_rule(&Rule::new("flag", "==", json!(1)), &scope));
        assert!(evaluate_rule(&Rule::new("n", "!=", json!("2")), &scope));
        assert!(!evaluate_rule(&Rule::new("missing", "=", json!(0)), &scope));
        assert!(evaluate_rule(&Rule::new("missing", "=", json!(null)), &scope));
    }

    #[test]
    fn ordering_operators() {
        let scope = sample_scope();
        assert!(evaluate_rule(&Rule::new("close", ">", json!(9)), &scope));
        assert!(evaluate_rule(&Rule::new("close", ">=", json!(10)), &scope));
        assert!(evaluate_rule(&Rule::new("close", "<", json!(11)), &scope));
        assert!(evaluate_rule(&Rule::new("close", "<=", json!("10")), &scope));
        assert!(!evaluate_rule(&Rule::new("close", ">", json!("abc")), &scope));
        assert!(!evaluate_rule(&Rule::new("missing", "<=", json!(0)), &scope));
        assert!(evaluate_rule(&Rule::new("lastOp", "<", json!("W")), &scope));
    }

    #[test]
    fn field_value_source() {
        let scope = sample_scope();
        assert!(evaluate_rule(&Rule::with_field("close", "<", "suporte"), &scope));
        assert!(!evaluate_rule(&Rule::with_field("close", "<", "nowhere"), &scope));
    }

    #[test]
    fn true_literal_field() {
        let scope = Scope::new();
        assert!(evaluate_rule(&Rule::new("true", "=", json!(true)), &scope));
        assert!(!evaluate_rule(&Rule::new("false", "=", json!(true)), &scope));
    }

    #[test]
    fn query_callable_in_condition() {
        let mut scope = Scope::new();
        scope.register("seven", Callable::Query(always_seven));
        assert!(evaluate_rule(&Rule::new("seven()", "=", json!(7)), &scope));
        assert!(!evaluate_rule(&Rule::new("eight()", "=", json!(7)), &scope));
    }

    #[test]
    fn evaluation_does_not_mutate_scope() {
        let scope = sample_scope();
        let before = scope.values().clone();
        let g = group(json!({ "combinator": "or", "rules": [ { "field": "newField", "operator": "=", "value": 1 } ] }));
        evaluate_rule_group(&g, &scope);
        assert_eq!(scope.values(), &before);
    }
}
