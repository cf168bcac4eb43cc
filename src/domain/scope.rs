//! The mutable environment one simulation run evaluates against.
//!
//! A scope holds two namespaces: plain values, and callables registered by
//! name. Callables receive the scope explicitly when invoked, so a UDF can
//! mutate the very scope it is registered in without capturing it.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::domain::udf::{self, Udf};
use crate::domain::value::Value;

/// Nested call limit for callables invoking callables.
pub const MAX_CALL_DEPTH: usize = 64;

/// Pure query usable from conditions.
pub type QueryFn = fn(&Scope) -> Value;

/// Side-effecting host function usable from actions.
pub type ActionFn = fn(&mut Scope) -> Value;

#[derive(Debug, Clone)]
pub enum Callable {
    Udf(Rc<Udf>),
    Action(ActionFn),
    Query(QueryFn),
}

#[derive(Debug, Clone, Default)]
pub struct Scope {
    values: BTreeMap<String, Value>,
    callables: HashMap<String, Callable>,
    call_depth: usize,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Value of `name`, `Undefined` when absent.
    pub fn value(&self, name: &str) -> Value {
        self.values.get(name).cloned().unwrap_or_default()
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.values.get(name).and_then(Value::as_f64)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.values.get_mut(name) {
            Some(slot) => *slot = value,
            None => {
                self.values.insert(name.to_string(), value);
            }
        }
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn into_values(self) -> BTreeMap<String, Value> {
        self.values
    }

    pub fn register(&mut self, name: &str, callable: Callable) {
        self.callables.insert(name.to_string(), callable);
    }

    pub fn callable(&self, name: &str) -> Option<&Callable> {
        self.callables.get(name)
    }

    /// Invoke a registered callable. `None` when nothing is registered under
    /// `name`; `Some(Undefined)` when the call depth limit refuses the call.
    pub fn invoke(&mut self, name: &str) -> Option<Value> {
        let callable = self.callables.get(name)?.clone();
        if self.call_depth >= MAX_CALL_DEPTH {
            log::error!("call depth limit {MAX_CALL_DEPTH} reached, refusing {name}()");
            return Some(Value::Undefined);
        }

        self.call_depth += 1;
        let result = match callable {
            Callable::Udf(def) => udf::call_udf(&def, self),
            Callable::Action(f) => f(self),
            Callable::Query(f) => f(self),
        };
        self.call_depth -= 1;
        Some(result)
    }

    /// Read-only invocation for conditions: only pure queries run.
    pub fn query(&self, name: &str) -> Option<Value> {
        match self.callables.get(name)? {
            Callable::Query(f) => Some(f(self)),
            _ => {
                log::warn!("{name}() has side effects and cannot be used in a condition");
                None
            }
        }
    }
}
