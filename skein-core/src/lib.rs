//! Skein Core Library
//!
//! This crate provides the foundational types and traits for the skein
//! component-graph execution engine.
//!
//! # Overview
//!
//! Skein executes directed graphs of named processing units ("components")
//! with typed input/output sockets, including graphs with feedback loops.
//! This crate holds the contracts shared between the engine and component
//! authors:
//!
//! - **Types**: strongly-typed component identifiers
//! - **Value**: the dynamic data type moved between sockets
//! - **Sockets**: input/output socket declarations and type compatibility
//! - **Component**: the single trait every processing unit implements
//! - **Errors**: the crate-wide error taxonomy
//!
//! # Example
//!
//! ```
//! use skein_core::prelude::*;
//!
//! struct AddOne;
//!
//! impl Component for AddOne {
//!     fn info(&self) -> ComponentInfo {
//!         ComponentInfo::new()
//!             .with_inputs(vec![InputSocket::new("value", "Number")])
//!             .with_outputs(vec![OutputSocket::new("sum", "Number")])
//!     }
//!
//!     fn run(&self, inputs: ValueMap) -> ComponentResult {
//!         let value = inputs
//!             .get("value")
//!             .and_then(Value::as_i64)
//!             .ok_or("missing 'value' input")?;
//!         let mut out = ValueMap::new();
//!         out.insert("sum".to_string(), Value::int(value + 1));
//!         Ok(out)
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod component;
pub mod error;
pub mod prelude;
pub mod socket;
pub mod types;
pub mod value;

// Re-export key types at crate root for convenience
pub use component::{Component, ComponentInfo, ComponentResult, ValueMap};
pub use error::{Result, SkeinError};
pub use socket::{types_compatible, InputSocket, OutputSocket};
pub use types::ComponentId;
pub use value::Value;
