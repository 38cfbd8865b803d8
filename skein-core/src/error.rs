//! Error types for skein.
//!
//! This module provides strongly-typed errors with actionable context.
//! All errors name the offending component and, for execution errors, carry
//! a miniature trace of the components whose outputs had already been
//! produced, to aid debugging of cyclic pipelines.

use thiserror::Error;

/// The main error type for skein operations.
#[derive(Error, Debug)]
pub enum SkeinError {
    // =========================================================================
    // Graph configuration errors (E101-E199)
    // =========================================================================
    /// A component with the same name is already registered.
    #[error("E101: component '{name}' is already registered in the pipeline")]
    DuplicateComponent {
        /// The name that was registered twice.
        name: String,
    },

    /// A connection between two sockets could not be made.
    #[error("E102: cannot connect '{sender}' to '{receiver}': {cause}")]
    Connection {
        /// The sending end, as `component.socket`.
        sender: String,
        /// The receiving end, as `component.socket`.
        receiver: String,
        /// Reason the connection is invalid.
        cause: String,
    },

    /// A cycle has no removable connection, so no execution order exists.
    #[error("E103: cycle involving components {components:?} has no breakable connection")]
    UnbreakableCycle {
        /// The components forming the cycle.
        components: Vec<String>,
    },

    /// A component failed while warming up.
    #[error("E104: warm-up failed for component '{component}': {cause}")]
    WarmUp {
        /// The component that failed to warm up.
        component: String,
        /// Reason for the failure.
        cause: String,
    },

    // =========================================================================
    // Input validation errors (E201-E299)
    // =========================================================================
    /// Input data references a component that does not exist.
    #[error("E201: component '{name}' not found in the pipeline")]
    UnknownComponent {
        /// The name that was not found.
        name: String,
    },

    /// Input data references an input socket that does not exist.
    #[error("E202: component '{component}' has no input socket named '{socket}'")]
    UnknownInput {
        /// The component the input was addressed to.
        component: String,
        /// The socket name that was not found.
        socket: String,
    },

    /// A mandatory unconnected input socket received no external value.
    #[error("E203: missing mandatory input '{socket}' for component '{component}'")]
    MissingInput {
        /// The component with the unsatisfied socket.
        component: String,
        /// The socket that received no value.
        socket: String,
    },

    // =========================================================================
    // Execution errors (E301-E399)
    // =========================================================================
    /// A component broke its contract while running.
    #[error("E301: component '{component}' failed: {cause} (outputs produced so far: {produced:?})")]
    ComponentRun {
        /// The component that failed.
        component: String,
        /// The failure reported by the component.
        cause: String,
        /// Components whose final outputs were already collected.
        produced: Vec<String>,
    },

    /// A component exceeded its per-run visit cap.
    #[error(
        "E302: maximum run count {max_runs} reached for component '{component}' \
         (outputs produced so far: {produced:?})"
    )]
    MaxRunsExceeded {
        /// The component that ran too many times.
        component: String,
        /// The configured cap.
        max_runs: u32,
        /// Components whose final outputs were already collected.
        produced: Vec<String>,
    },
}

impl SkeinError {
    /// Get the error code (e.g., "E101").
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateComponent { .. } => "E101",
            Self::Connection { .. } => "E102",
            Self::UnbreakableCycle { .. } => "E103",
            Self::WarmUp { .. } => "E104",
            Self::UnknownComponent { .. } => "E201",
            Self::UnknownInput { .. } => "E202",
            Self::MissingInput { .. } => "E203",
            Self::ComponentRun { .. } => "E301",
            Self::MaxRunsExceeded { .. } => "E302",
        }
    }

    /// Check if this error is a configuration or validation error.
    ///
    /// Configuration errors are raised before any component runs.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateComponent { .. }
                | Self::Connection { .. }
                | Self::UnbreakableCycle { .. }
                | Self::WarmUp { .. }
                | Self::UnknownComponent { .. }
                | Self::UnknownInput { .. }
                | Self::MissingInput { .. }
        )
    }

    /// Check if this error occurred while components were executing.
    #[must_use]
    pub fn is_execution_error(&self) -> bool {
        matches!(
            self,
            Self::ComponentRun { .. } | Self::MaxRunsExceeded { .. }
        )
    }
}

/// Result type alias using `SkeinError`.
pub type Result<T> = std::result::Result<T, SkeinError>;
