//! Strongly-typed identifiers for skein entities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a component within a pipeline graph.
///
/// Component ids are assigned at registration time and index directly into
/// the graph's component arena. They remain stable for the lifetime of the
/// graph, so run-scoped state (pending inputs, visit counters) can be kept
/// in plain vectors indexed by id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ComponentId(u32);

impl ComponentId {
    /// Create a new component ID from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Get the ID as an arena index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component_{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_id_roundtrip() {
        let id = ComponentId::new(7);
        assert_eq!(id.as_u32(), 7);
        assert_eq!(id.index(), 7);
        assert_eq!(format!("{}", id), "component_7");
    }

    #[test]
    fn component_id_ordering() {
        assert!(ComponentId::new(1) < ComponentId::new(2));
        assert_eq!(ComponentId::new(3), ComponentId::new(3));
    }
}
