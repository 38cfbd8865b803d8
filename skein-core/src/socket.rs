//! Input and output socket declarations.
//!
//! Components declare their sockets through [`crate::ComponentInfo`]; the
//! engine fills in the sender/receiver relationships when connections are
//! made. Socket types are advisory names checked at connect time, with
//! `"Any"` compatible with everything.

use crate::types::ComponentId;
use crate::value::Value;

/// Check whether two declared socket types are compatible.
///
/// Type names are compared literally; `"Any"` on either side matches
/// everything. This is an advisory check applied at graph-build time, not
/// enforced while the pipeline runs.
#[must_use]
pub fn types_compatible(sender: &str, receiver: &str) -> bool {
    sender == "Any" || receiver == "Any" || sender == receiver
}

/// A declared input socket on a component.
#[derive(Debug, Clone)]
pub struct InputSocket {
    /// Socket name (e.g., "value", "documents").
    pub name: String,
    /// Declared type name for the data (e.g., "Number", "Any").
    pub type_name: String,
    /// Default value used when no input arrives. A socket without a default
    /// is mandatory.
    pub default: Option<Value>,
    /// Whether the socket accumulates contributions from multiple senders
    /// into a list.
    pub is_variadic: bool,
    /// Whether a variadic socket defers its consumer until no ordinary
    /// component can make progress. Greedy variadic sockets run their
    /// consumer as soon as any contribution arrives.
    pub is_lazy: bool,
    /// Components connected into this socket. Filled in by the graph;
    /// empty means the socket is fed externally or by its default.
    pub senders: Vec<ComponentId>,
}

impl InputSocket {
    /// Declare a new input socket.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            default: None,
            is_variadic: false,
            is_lazy: false,
            senders: Vec::new(),
        }
    }

    /// Mark the socket as variadic. Variadic sockets are lazy by default.
    #[must_use]
    pub fn variadic(mut self) -> Self {
        self.is_variadic = true;
        self.is_lazy = true;
        self
    }

    /// Mark a variadic socket as greedy: its consumer is scheduled to run
    /// as soon as a contribution arrives instead of waiting for more.
    #[must_use]
    pub fn greedy(mut self) -> Self {
        self.is_lazy = false;
        self
    }

    /// Set a default value, making the socket optional.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// A socket is mandatory when it carries no default value.
    #[must_use]
    pub fn is_mandatory(&self) -> bool {
        self.default.is_none()
    }
}

/// A declared output socket on a component.
#[derive(Debug, Clone)]
pub struct OutputSocket {
    /// Socket name (e.g., "sum", "documents").
    pub name: String,
    /// Declared type name for the data.
    pub type_name: String,
    /// `(component, input socket)` pairs this output feeds, in connection
    /// order. Filled in by the graph; fan-out to several receivers is a
    /// normal case.
    pub receivers: Vec<(ComponentId, String)>,
}

impl OutputSocket {
    /// Declare a new output socket.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            receivers: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_creation() {
        let input = InputSocket::new("value", "Number");
        assert_eq!(input.name, "value");
        assert!(input.is_mandatory());
        assert!(!input.is_variadic);
        assert!(input.senders.is_empty());

        let output = OutputSocket::new("sum", "Number");
        assert_eq!(output.name, "sum");
        assert!(output.receivers.is_empty());
    }

    #[test]
    fn variadic_is_lazy_by_default() {
        let socket = InputSocket::new("values", "Number").variadic();
        assert!(socket.is_variadic);
        assert!(socket.is_lazy);

        let greedy = InputSocket::new("values", "Number").variadic().greedy();
        assert!(greedy.is_variadic);
        assert!(!greedy.is_lazy);
    }

    #[test]
    fn default_makes_socket_optional() {
        let socket = InputSocket::new("add", "Number").with_default(Value::int(1));
        assert!(!socket.is_mandatory());
        assert_eq!(socket.default.unwrap().as_i64(), Some(1));
    }

    #[test]
    fn type_compatibility() {
        assert!(types_compatible("Number", "Number"));
        assert!(types_compatible("Any", "Number"));
        assert!(types_compatible("Number", "Any"));
        assert!(!types_compatible("Number", "String"));
    }
}
