//! Rule tree data structures.
//!
//! A [`RuleGroup`] combines child nodes with AND/OR. Children are decided
//! once at deserialisation time into [`RuleNode`] variants:
//!
//! - `Group`: an object with a `combinator` and a `rules` array
//! - `Leaf`: any other object, however malformed; a leaf without a string
//!   `operator` is false as a condition
//! - `Placeholder`: a non-object (e.g. inline combinator strings written by
//!   visual editors); vacuously true as a condition, skipped as an action

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::domain::fields;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Combinator {
    And,
    Or,
}

/// Only the exact string `"and"` is AND; every other combinator acts as OR.
impl From<String> for Combinator {
    fn from(s: String) -> Self {
        if s == "and" { Combinator::And } else { Combinator::Or }
    }
}

impl From<Combinator> for String {
    fn from(c: Combinator) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::And => write!(f, "and"),
            Combinator::Or => write!(f, "or"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValueSource {
    #[default]
    Value,
    Field,
}

impl From<String> for ValueSource {
    fn from(s: String) -> Self {
        if s == "field" { ValueSource::Field } else { ValueSource::Value }
    }
}

impl From<ValueSource> for String {
    fn from(v: ValueSource) -> Self {
        match v {
            ValueSource::Value => "value".to_string(),
            ValueSource::Field => "field".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub field: String,
    /// Kept as written; only a string names an operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<serde_json::Value>,
    #[serde(default, rename = "valueSource")]
    pub value_source: ValueSource,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl Rule {
    pub fn new(field: &str, operator: &str, value: serde_json::Value) -> Self {
        Self {
            field: field.to_string(),
            operator: Some(serde_json::Value::String(operator.to_string())),
            value_source: ValueSource::Value,
            value,
        }
    }

    /// Comparison or assignment whose right-hand side names another field.
    pub fn with_field(field: &str, operator: &str, other: &str) -> Self {
        Self {
            value_source: ValueSource::Field,
            ..Self::new(field, operator, serde_json::Value::String(other.to_string()))
        }
    }

    /// The operator, when it is a string.
    pub fn operator(&self) -> Option<&str> {
        self.operator.as_ref().and_then(|op| op.as_str())
    }

    fn from_json_map(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        let field = match map.get("field") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let value_source = match map.get("valueSource").and_then(|v| v.as_str()) {
            Some(source) => ValueSource::from(source.to_string()),
            None => ValueSource::Value,
        };
        Self {
            field,
            operator: map.get("operator").cloned(),
            value_source,
            value: map.get("value").cloned().unwrap_or_default(),
        }
    }

    /// Action leaf invoking `name()`.
    pub fn call(name: &str) -> Self {
        Self::new(
            &format!("{}()", name),
            "=",
            serde_json::Value::String(String::new()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RuleNode {
    Group(RuleGroup),
    Leaf(Rule),
    Placeholder(serde_json::Value),
}

impl RuleNode {
    pub fn from_json(raw: serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Object(map) => match map.get("rules") {
                Some(serde_json::Value::Array(children)) if map.contains_key("combinator") => {
                    let combinator = map
                        .get("combinator")
                        .and_then(|c| c.as_str())
                        .unwrap_or_default()
                        .to_string();
                    RuleNode::Group(RuleGroup {
                        combinator: combinator.into(),
                        rules: children.iter().cloned().map(RuleNode::from_json).collect(),
                    })
                }
                _ => RuleNode::Leaf(Rule::from_json_map(&map)),
            },
            other => RuleNode::Placeholder(other),
        }
    }
}

impl<'de> Deserialize<'de> for RuleNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(RuleNode::from_json)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub combinator: Combinator,
    #[serde(default)]
    pub rules: Vec<RuleNode>,
}

impl RuleGroup {
    pub fn and(rules: Vec<RuleNode>) -> Self {
        Self {
            combinator: Combinator::And,
            rules,
        }
    }

    pub fn or(rules: Vec<RuleNode>) -> Self {
        Self {
            combinator: Combinator::Or,
            rules,
        }
    }

    /// Visit every leaf, depth first.
    pub fn leaves(&self) -> Vec<&Rule> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }
}

fn collect_leaves<'a>(group: &'a RuleGroup, out: &mut Vec<&'a Rule>) {
    for node in &group.rules {
        match node {
            RuleNode::Group(g) => collect_leaves(g, out),
            RuleNode::Leaf(r) => out.push(r),
            RuleNode::Placeholder(_) => {}
        }
    }
}

impl From<Rule> for RuleNode {
    fn from(rule: Rule) -> Self {
        RuleNode::Leaf(rule)
    }
}

impl From<RuleGroup> for RuleNode {
    fn from(group: RuleGroup) -> Self {
        RuleNode::Group(group)
    }
}

fn fmt_literal(value: &serde_json::Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        serde_json::Value::String(s) => write!(f, "\"{}\"", s),
        other => write!(f, "{}", other),
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if fields::call_target(&self.field).is_some() {
            return write!(f, "{}", self.field);
        }
        match &self.operator {
            Some(serde_json::Value::String(op)) => write!(f, "{} {} ", self.field, op)?,
            Some(other) => write!(f, "{} {} ", self.field, other)?,
            None => write!(f, "{} ? ", self.field)?,
        }
        match (self.value_source, &self.value) {
            (ValueSource::Field, serde_json::Value::String(name)) => write!(f, "{}", name),
            (_, value) => fmt_literal(value, f),
        }
    }
}

impl fmt::Display for RuleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleNode::Group(g) => write!(f, "{}", g),
            RuleNode::Leaf(r) => write!(f, "{}", r),
            RuleNode::Placeholder(v) => fmt_literal(v, f),
        }
    }
}

/// `(a = 1 or (b <= c and d == "V"))`
impl fmt::Display for RuleGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, node) in self.rules.iter().enumerate() {
            if i > 0 {
                write!(f, " {} ", self.combinator)?;
            }
            write!(f, "{}", node)?;
        }
        write!(f, ")")
    }
}

pub fn rule_group_to_string(group: &RuleGroup) -> String {
    group.to_string()
}
