//! Asset catalog and mesh library registries.
//!
//! Both are explicit constructed objects handed to the components
//! that need them; their lifecycle is tied to one generation session.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::AssetDescriptor;

/// Mapping from asset tag to its generative description, in
/// registration order.
#[derive(Debug, Default)]
pub struct AssetCatalog {
    entries: Vec<AssetDescriptor>,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, replacing an existing one with the same
    /// tag in place.
    pub fn register(&mut self, descriptor: AssetDescriptor) {
        if let Some(slot) = self
            .entries
            .iter_mut()
            .find(|d| d.tag == descriptor.tag)
        {
            *slot = descriptor;
        } else {
            self.entries.push(descriptor);
        }
    }

    pub fn lookup(&self, tag: &str) -> Result<&AssetDescriptor> {
        self.entries.iter().find(|d| d.tag == tag).ok_or_else(|| {
            Error::config(format!("unknown asset reference '{tag}'"))
        })
    }

    /// Tags in registration order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|d| d.tag.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A named mesh resource: file path plus uniform scale. Mesh content
/// is never validated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshRef {
    pub path: String,
    pub scale: f64,
}

/// Named registry of loaded mesh descriptions.
#[derive(Debug, Default)]
pub struct MeshLibrary {
    entries: HashMap<String, MeshRef>,
}

impl MeshLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: storing under an existing name overwrites.
    pub fn store(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
        scale: f64,
    ) {
        self.entries.insert(
            name.into(),
            MeshRef {
                path: path.into(),
                scale,
            },
        );
    }

    pub fn get(&self, name: &str) -> Result<&MeshRef> {
        self.entries.get(name).ok_or_else(|| {
            Error::config(format!("unknown mesh reference '{name}'"))
        })
    }
}
