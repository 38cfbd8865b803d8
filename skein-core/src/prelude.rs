//! Prelude for convenient imports.
//!
//! This module re-exports the most commonly used types and traits.
//!
//! # Example
//!
//! ```
//! use skein_core::prelude::*;
//! ```

// Core types
pub use crate::types::ComponentId;

// Error handling
pub use crate::error::{Result, SkeinError};

// Values
pub use crate::value::Value;

// Sockets
pub use crate::socket::{types_compatible, InputSocket, OutputSocket};

// Component contract
pub use crate::component::{Component, ComponentInfo, ComponentResult, ValueMap};
