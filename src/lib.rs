//! Procedural room synthesis and collision-free object placement.
//!
//! Synthesizes an enclosed 2D floor boundary (merged random
//! rectangles or the outer boundary of a triangulated point set),
//! extrudes it into wall solids, computes the interior free space,
//! and fills it with primitive objects under workspace, tangency,
//! and clearance constraints. The result is a scene graph ready for
//! an exporter or viewer; deterministic for a fixed seed.

pub mod boundary;
pub mod catalog;
pub mod constraints;
pub mod error;
pub mod freespace;
pub mod generate;
pub mod geometry;
pub mod grid;
pub mod placement;
pub mod prng;
pub mod types;
pub mod walls;

pub use error::{Error, Result};
pub use generate::generate;
pub use types::{Scene, WorldParams};

/// Run the full pipeline on a JSON parameter string and return the
/// generated scene as JSON.
pub fn generate_json(params_json: &str) -> Result<String> {
    let params: WorldParams = serde_json::from_str(params_json)
        .map_err(|e| {
            Error::config(format!("invalid parameter JSON: {e}"))
        })?;
    let scene = generate::generate(&params)?;
    serde_json::to_string(&scene).map_err(|e| {
        Error::config(format!("failed to serialize scene: {e}"))
    })
}
