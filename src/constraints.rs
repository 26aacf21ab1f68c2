//! Named geometric constraints consulted by the placement engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Point2;

/// Declarative placement constraint; immutable once registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    /// Restrict sampled positions to a polygon.
    Workspace { polygon: Vec<Point2> },
    /// Rest objects exactly on a reference plane. Only the +Z normal
    /// `[0, 0, 1]` is supported; the engine rejects anything else.
    Tangent {
        origin: [f64; 3],
        normal: [f64; 3],
    },
}

/// Mapping from constraint name to definition. Lookup of an
/// unregistered name is a hard error, never a silent default.
#[derive(Debug, Default)]
pub struct ConstraintRegistry {
    entries: HashMap<String, Constraint>,
}

impl ConstraintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        constraint: Constraint,
    ) {
        self.entries.insert(name.into(), constraint);
    }

    pub fn lookup(&self, name: &str) -> Result<&Constraint> {
        self.entries.get(name).ok_or_else(|| {
            Error::config(format!("unknown constraint reference '{name}'"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_is_an_error() {
        let registry = ConstraintRegistry::new();
        let err = registry.lookup("nope").unwrap_err();
        assert!(err.to_string().contains("unknown constraint reference"));
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = ConstraintRegistry::new();
        registry.register(
            "tangent_to_ground_plane",
            Constraint::Tangent {
                origin: [0.0, 0.0, 0.0],
                normal: [0.0, 0.0, 1.0],
            },
        );
        match registry.lookup("tangent_to_ground_plane").unwrap() {
            Constraint::Tangent { normal, .. } => {
                assert_eq!(*normal, [0.0, 0.0, 1.0]);
            }
            _ => panic!("expected tangent constraint"),
        }
    }
}
