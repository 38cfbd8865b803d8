//! Common test components for integration tests.

#![allow(dead_code)]

use skein_core::prelude::*;

/// Adds a fixed amount to its "value" input.
pub struct AddValue {
    add: i64,
    value_default: i64,
}

impl AddValue {
    pub fn new(add: i64) -> Self {
        Self {
            add,
            value_default: 0,
        }
    }

    pub fn with_value_default(mut self, default: i64) -> Self {
        self.value_default = default;
        self
    }
}

impl Component for AddValue {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new()
            .with_description("Adds a fixed amount to a number")
            .with_inputs(vec![
                InputSocket::new("value", "Number").with_default(Value::int(self.value_default))
            ])
            .with_outputs(vec![OutputSocket::new("sum", "Number")])
    }

    fn run(&self, inputs: ValueMap) -> ComponentResult {
        let value = inputs
            .get("value")
            .and_then(Value::as_i64)
            .ok_or("missing 'value' input")?;
        let mut out = ValueMap::new();
        out.insert("sum".to_string(), Value::int(value + self.add));
        Ok(out)
    }
}

/// Doubles its "sum" input.
pub struct Double;

impl Component for Double {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new()
            .with_inputs(vec![InputSocket::new("sum", "Number")])
            .with_outputs(vec![OutputSocket::new("doubled", "Number")])
    }

    fn run(&self, inputs: ValueMap) -> ComponentResult {
        let sum = inputs
            .get("sum")
            .and_then(Value::as_i64)
            .ok_or("missing 'sum' input")?;
        let mut out = ValueMap::new();
        out.insert("doubled".to_string(), Value::int(sum * 2));
        Ok(out)
    }
}

/// Collects variadic contributions into a list, preserving arrival order.
pub struct Collect {
    greedy: bool,
}

impl Collect {
    pub fn new() -> Self {
        Self { greedy: false }
    }

    pub fn greedy() -> Self {
        Self { greedy: true }
    }
}

impl Component for Collect {
    fn info(&self) -> ComponentInfo {
        let mut socket = InputSocket::new("values", "Any").variadic();
        if self.greedy {
            socket = socket.greedy();
        }
        ComponentInfo::new()
            .with_inputs(vec![socket])
            .with_outputs(vec![OutputSocket::new("all", "Any")])
    }

    fn run(&self, inputs: ValueMap) -> ComponentResult {
        let items = inputs
            .get("values")
            .and_then(Value::elements)
            .unwrap_or_default();
        let mut out = ValueMap::new();
        out.insert("all".to_string(), Value::array(items));
        Ok(out)
    }
}

/// Sums variadic numeric contributions.
pub struct Sum;

impl Component for Sum {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new()
            .with_inputs(vec![InputSocket::new("values", "Number").variadic()])
            .with_outputs(vec![OutputSocket::new("total", "Number")])
    }

    fn run(&self, inputs: ValueMap) -> ComponentResult {
        let total: i64 = inputs
            .get("values")
            .and_then(Value::elements)
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_i64)
            .sum();
        let mut out = ValueMap::new();
        out.insert("total".to_string(), Value::int(total));
        Ok(out)
    }
}

/// Forwards "value" on "below" while it is under the limit, on "above"
/// otherwise. The conditional outputs make it a loop exit condition.
pub struct Threshold {
    limit: i64,
}

impl Threshold {
    pub fn new(limit: i64) -> Self {
        Self { limit }
    }
}

impl Component for Threshold {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new()
            .with_inputs(vec![InputSocket::new("value", "Number")])
            .with_outputs(vec![
                OutputSocket::new("below", "Number"),
                OutputSocket::new("above", "Number"),
            ])
    }

    fn run(&self, inputs: ValueMap) -> ComponentResult {
        let value = inputs
            .get("value")
            .and_then(Value::as_i64)
            .ok_or("missing 'value' input")?;
        let mut out = ValueMap::new();
        if value < self.limit {
            out.insert("below".to_string(), Value::int(value));
        } else {
            out.insert("above".to_string(), Value::int(value));
        }
        Ok(out)
    }
}

/// Routes "value" to "even" or "odd" by parity.
pub struct Parity;

impl Component for Parity {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new()
            .with_inputs(vec![InputSocket::new("value", "Number")])
            .with_outputs(vec![
                OutputSocket::new("even", "Number"),
                OutputSocket::new("odd", "Number"),
            ])
    }

    fn run(&self, inputs: ValueMap) -> ComponentResult {
        let value = inputs
            .get("value")
            .and_then(Value::as_i64)
            .ok_or("missing 'value' input")?;
        let socket = if value % 2 == 0 { "even" } else { "odd" };
        let mut out = ValueMap::new();
        out.insert(socket.to_string(), Value::int(value));
        Ok(out)
    }
}

/// Pairs two mandatory inputs into a list.
pub struct Join2;

impl Component for Join2 {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new()
            .with_inputs(vec![
                InputSocket::new("first", "Any"),
                InputSocket::new("second", "Any"),
            ])
            .with_outputs(vec![OutputSocket::new("pair", "Any")])
    }

    fn run(&self, inputs: ValueMap) -> ComponentResult {
        let first = inputs.get("first").cloned().ok_or("missing 'first' input")?;
        let second = inputs
            .get("second")
            .cloned()
            .ok_or("missing 'second' input")?;
        let mut out = ValueMap::new();
        out.insert("pair".to_string(), Value::array(vec![first, second]));
        Ok(out)
    }
}

/// Forwards its "value" input unchanged. Connected to itself it loops
/// forever, which is what the max-runs guard tests need.
pub struct Echo;

impl Component for Echo {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new()
            .with_inputs(vec![
                InputSocket::new("value", "Number").with_default(Value::int(0))
            ])
            .with_outputs(vec![OutputSocket::new("value", "Number")])
    }

    fn run(&self, inputs: ValueMap) -> ComponentResult {
        let value = inputs
            .get("value")
            .cloned()
            .ok_or("missing 'value' input")?;
        let mut out = ValueMap::new();
        out.insert("value".to_string(), value);
        Ok(out)
    }
}

/// Always fails at run time.
pub struct FailOnRun;

impl Component for FailOnRun {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new()
            .with_inputs(vec![
                InputSocket::new("value", "Any").with_default(Value::null())
            ])
            .with_outputs(vec![OutputSocket::new("out", "Any")])
    }

    fn run(&self, _inputs: ValueMap) -> ComponentResult {
        Err("intentional failure".into())
    }
}

/// Only runs after `warm_up` has been called.
pub struct Warmable {
    warmed: bool,
}

impl Warmable {
    pub fn new() -> Self {
        Self { warmed: false }
    }
}

impl Component for Warmable {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new()
            .with_inputs(vec![
                InputSocket::new("value", "Any").with_default(Value::null())
            ])
            .with_outputs(vec![OutputSocket::new("ready", "Any")])
    }

    fn run(&self, _inputs: ValueMap) -> ComponentResult {
        if !self.warmed {
            return Err("component was not warmed up".into());
        }
        let mut out = ValueMap::new();
        out.insert("ready".to_string(), Value::bool(true));
        Ok(out)
    }

    fn warm_up(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.warmed = true;
        Ok(())
    }
}

/// Always fails to warm up.
pub struct FailingWarm;

impl Component for FailingWarm {
    fn info(&self) -> ComponentInfo {
        ComponentInfo::new().with_outputs(vec![OutputSocket::new("out", "Any")])
    }

    fn run(&self, _inputs: ValueMap) -> ComponentResult {
        Ok(ValueMap::new())
    }

    fn warm_up(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err("no model file".into())
    }
}

/// Build the per-component input map `{component: {socket: value}}`.
pub fn component_inputs(
    component: &str,
    socket: &str,
    value: Value,
) -> std::collections::BTreeMap<String, ValueMap> {
    let mut inputs = ValueMap::new();
    inputs.insert(socket.to_string(), value);
    [(component.to_string(), inputs)].into()
}
