//! Action execution.
//!
//! An action group is a flat list of leaves applied to the scope in order.
//! Each leaf is either a call (`field` = `"name()"`) or an assignment whose
//! value is a literal, another field (`valueSource: "field"`), or an
//! `"expr: ..."` string evaluated against the current scope.

use crate::domain::expr;
use crate::domain::fields;
use crate::domain::rule::{Rule, RuleGroup, RuleNode, ValueSource};
use crate::domain::scope::Scope;
use crate::domain::value::Value;

pub fn execute_actions(actions: &RuleGroup, scope: &mut Scope) {
    for node in &actions.rules {
        match node {
            RuleNode::Leaf(rule) => execute_action(rule, scope),
            RuleNode::Group(_) => log::debug!("skipping nested group in action list"),
            RuleNode::Placeholder(_) => {}
        }
    }
}

pub fn execute_action(rule: &Rule, scope: &mut Scope) {
    if let Some(name) = fields::call_target(&rule.field) {
        if scope.invoke(name).is_none() {
            log::warn!("action calls {}() but no such function is registered", name);
        }
        return;
    }

    let value = resolve_action_value(rule, scope);
    scope.set(&rule.field, value);
}

/// The value an assignment leaf stores.
pub fn resolve_action_value(rule: &Rule, scope: &Scope) -> Value {
    let value = match (rule.value_source, &rule.value) {
        (ValueSource::Field, serde_json::Value::String(name)) => scope.value(name),
        (ValueSource::Field, _) => Value::Undefined,
        (ValueSource::Value, literal) => Value::from(literal),
    };

    match value {
        Value::Str(s) if s.starts_with(fields::EXPR_PREFIX) => {
            let source = s[fields::EXPR_PREFIX.len()..].trim();
            expr::evaluate_expression(source, scope).unwrap_or(Value::Null)
        }
        other => other,
    }
}
