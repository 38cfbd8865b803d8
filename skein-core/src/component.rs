//! Component trait and related types.

use crate::socket::{InputSocket, OutputSocket};
use crate::value::Value;
use std::collections::BTreeMap;

/// Named values exchanged with a component, keyed by socket name.
///
/// A `BTreeMap` keeps iteration and serialization order deterministic, which
/// the engine relies on for reproducible runs.
pub type ValueMap = BTreeMap<String, Value>;

/// Result of a single component execution.
///
/// Components report their own failures with any error type; the engine
/// wraps them into [`crate::SkeinError::ComponentRun`] together with the name
/// of the offending component.
pub type ComponentResult = std::result::Result<ValueMap, Box<dyn std::error::Error + Send + Sync>>;

/// Metadata about a component: its declared sockets and description.
#[derive(Debug, Clone, Default)]
pub struct ComponentInfo {
    /// Description of what the component does.
    pub description: String,
    /// Declared input sockets.
    pub inputs: Vec<InputSocket>,
    /// Declared output sockets.
    pub outputs: Vec<OutputSocket>,
}

impl ComponentInfo {
    /// Create empty component info.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Set the declared input sockets.
    #[must_use]
    pub fn with_inputs(mut self, inputs: Vec<InputSocket>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Set the declared output sockets.
    #[must_use]
    pub fn with_outputs(mut self, outputs: Vec<OutputSocket>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Get a declared input socket by name.
    #[must_use]
    pub fn get_input(&self, name: &str) -> Option<&InputSocket> {
        self.inputs.iter().find(|s| s.name == name)
    }

    /// Get a declared output socket by name.
    #[must_use]
    pub fn get_output(&self, name: &str) -> Option<&OutputSocket> {
        self.outputs.iter().find(|s| s.name == name)
    }
}

/// The core trait for all skein components.
///
/// A component is a named unit of computation with declared input and output
/// sockets. The engine invokes `run` with the inputs accumulated for this
/// visit and routes the returned outputs to connected receivers.
///
/// Invocation is a plain blocking call: the engine never spawns tasks, and
/// any concurrency inside a component is its private concern.
///
/// # Example
///
/// ```
/// use skein_core::prelude::*;
///
/// struct Double;
///
/// impl Component for Double {
///     fn info(&self) -> ComponentInfo {
///         ComponentInfo::new()
///             .with_description("Doubles a number")
///             .with_inputs(vec![InputSocket::new("sum", "Number")])
///             .with_outputs(vec![OutputSocket::new("doubled", "Number")])
///     }
///
///     fn run(&self, inputs: ValueMap) -> ComponentResult {
///         let sum = inputs
///             .get("sum")
///             .and_then(Value::as_i64)
///             .ok_or("missing 'sum' input")?;
///         let mut out = ValueMap::new();
///         out.insert("doubled".to_string(), Value::int(sum * 2));
///         Ok(out)
///     }
/// }
/// ```
pub trait Component: Send + Sync {
    /// Get metadata about this component: description and declared sockets.
    fn info(&self) -> ComponentInfo;

    /// Execute the component with the inputs collected for this visit.
    ///
    /// Returns a mapping from output socket name to produced value. Sockets
    /// may be omitted (conditional outputs); keys with no registered
    /// receiver surface as this component's contribution to the final
    /// pipeline output.
    fn run(&self, inputs: ValueMap) -> ComponentResult;

    /// Acquire lazy resources once, before the first run of the graph.
    ///
    /// Must be idempotent. The engine assumes warm-up has already completed
    /// by the time `run` executes.
    fn warm_up(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_info_builder() {
        let info = ComponentInfo::new()
            .with_description("Joins branches")
            .with_inputs(vec![InputSocket::new("values", "Any").variadic()])
            .with_outputs(vec![OutputSocket::new("merged", "Any")]);

        assert_eq!(info.description, "Joins branches");
        assert!(info.get_input("values").unwrap().is_variadic);
        assert!(info.get_output("merged").is_some());
        assert!(info.get_input("missing").is_none());
    }
}
