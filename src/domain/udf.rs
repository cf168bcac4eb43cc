//! User-defined functions.
//!
//! A UDF is an ordered list of {condition, actions} blocks. Blocks are
//! independent: every block whose condition holds runs, regardless of what
//! earlier blocks did. Results travel through the `returnValue` scope field.

use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::domain::action::execute_actions;
use crate::domain::fields;
use crate::domain::rule::RuleGroup;
use crate::domain::rule_eval::evaluate_rule_group;
use crate::domain::scope::{Callable, Scope};
use crate::domain::value::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UdfBlock {
    #[serde(default)]
    pub descr: String,
    pub condition: RuleGroup,
    pub actions: RuleGroup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Udf {
    pub name: String,
    #[serde(default)]
    pub descr: String,
    #[serde(default)]
    pub blocks: Vec<UdfBlock>,
}

/// Run every block whose condition holds. Returns how many blocks ran.
pub fn run_udf(blocks: &[UdfBlock], scope: &mut Scope) -> usize {
    let mut executed = 0;
    for block in blocks {
        if evaluate_rule_group(&block.condition, scope) {
            log::trace!("udf block '{}' matched", block.descr);
            execute_actions(&block.actions, scope);
            executed += 1;
        }
    }
    executed
}

/// Invoke `udf` with the zero-argument call contract: clear `returnValue`,
/// run the blocks, hand back whatever the blocks left in `returnValue`.
pub fn call_udf(udf: &Udf, scope: &mut Scope) -> Value {
    scope.set(fields::RETURN_VALUE, Value::Undefined);
    run_udf(&udf.blocks, scope);
    scope.value(fields::RETURN_VALUE)
}

/// Register each UDF as a callable under its name. Later definitions with
/// the same name replace earlier ones.
pub fn bind_udfs(udfs: &[Udf], scope: &mut Scope) {
    for udf in udfs {
        if scope.callable(&udf.name).is_some() {
            log::warn!("udf '{}' replaces an existing function", udf.name);
        }
        scope.register(&udf.name, Callable::Udf(Rc::new(udf.clone())));
    }
}
