//! Skein Engine
//!
//! Execution engine for directed graphs of components with typed
//! input/output sockets. Given a graph, the engine determines a valid run
//! order, feeds each component its accumulated inputs, propagates outputs to
//! connected receivers, and returns the outputs of leaf components.
//!
//! Non-trivial topologies are supported: branching, merging, optional and
//! defaulted inputs, variadic (many-sender) inputs, and feedback loops.
//! Cycles are broken for the initial topological ordering and then executed
//! to convergence by an inner subgraph runner.
//!
//! Execution is single-threaded, synchronous, and deterministic: for a fixed
//! graph and fixed inputs, repeated runs produce identical outputs.
//!
//! # Example
//!
//! ```
//! use skein_core::prelude::*;
//! use skein_engine::Pipeline;
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
//!         Ok([("sum".to_string(), Value::int(value + 1))].into())
//!     }
//! }
//!
//! struct Double;
//!
//! impl Component for Double {
//!     fn info(&self) -> ComponentInfo {
//!         ComponentInfo::new()
//!             .with_inputs(vec![InputSocket::new("sum", "Number")])
//!             .with_outputs(vec![OutputSocket::new("doubled", "Number")])
//!     }
//!
//!     fn run(&self, inputs: ValueMap) -> ComponentResult {
//!         let sum = inputs
//!             .get("sum")
//!             .and_then(Value::as_i64)
//!             .ok_or("missing 'sum' input")?;
//!         Ok([("doubled".to_string(), Value::int(sum * 2))].into())
//!     }
//! }
//!
//! # fn main() -> skein_core::Result<()> {
//! let mut pipeline = Pipeline::new();
//! pipeline.add_component("add_one", Box::new(AddOne))?;
//! pipeline.add_component("double", Box::new(Double))?;
//! pipeline.connect("add_one.sum", "double.sum")?;
//!
//! let mut inputs = ValueMap::new();
//! inputs.insert("value".to_string(), Value::int(3));
//! let outputs = pipeline.run([("add_one".to_string(), inputs)].into())?;
//!
//! assert_eq!(
//!     outputs["double"]["doubled"],
//!     Value::int(8),
//! );
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cycles;
pub mod graph;
pub mod runner;
mod schedule;
mod state;
mod subgraph;

// Re-export key types at crate root for convenience
pub use cycles::{break_cycles, CycleAnalysis};
pub use graph::{ComponentNode, Connection, PipelineGraph};
pub use runner::{Pipeline, PipelineOutputs};
