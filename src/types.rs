//! Data types for parameters, shapes, placement requests, and the
//! scene graph.
//!
//! Every struct here derives Serialize + Deserialize so parameter
//! files and generated scenes round-trip through JSON. Positions are
//! meters, angles radians, +Z up.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::boundary::{BoundarySpec, SynthesisRanges};
use crate::error::{Error, Result};
use crate::geometry::{disc, rect_corners, Footprint, Point2};
use crate::prng::Pcg32;

// -- Pose ----------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub z: f64,
    #[serde(default)]
    pub roll: f64,
    #[serde(default)]
    pub pitch: f64,
    #[serde(default)]
    pub yaw: f64,
}

impl Pose {
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Pose {
            x,
            y,
            z,
            ..Pose::default()
        }
    }
}

// -- Shapes --------------------------------------------------------

const FOOTPRINT_DISC_SIDES: usize = 16;
const ANGLE_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Box { size: [f64; 3] },
    Cylinder { radius: f64, length: f64 },
    Sphere { radius: f64 },
    Mesh { uri: String, scale: f64 },
}

impl Shape {
    /// Distance from the shape origin to its lowest point for the
    /// given roll/pitch. Yaw does not affect height. Used to rest the
    /// shape exactly on a horizontal plane.
    pub fn support_down(&self, roll: f64, pitch: f64) -> f64 {
        // Third row of Rz(yaw)*Ry(pitch)*Rx(roll).
        let (sr, cr) = roll.sin_cos();
        let (sp, cp) = pitch.sin_cos();
        let r3 = [-sp, cp * sr, cp * cr];
        match self {
            Shape::Box { size } => {
                size[0] / 2.0 * r3[0].abs()
                    + size[1] / 2.0 * r3[1].abs()
                    + size[2] / 2.0 * r3[2].abs()
            }
            Shape::Cylinder { radius, length } => {
                let axis_z = (cp * cr).abs();
                length / 2.0 * axis_z
                    + radius * (1.0 - axis_z * axis_z).max(0.0).sqrt()
            }
            Shape::Sphere { radius } => *radius,
            Shape::Mesh { .. } => 0.0,
        }
    }

    /// Projected 2D collision footprint at the given pose. Exact
    /// oriented rectangle for an upright box, disc for upright
    /// cylinders and spheres; a conservative bounding disc when the
    /// shape is tilted.
    pub fn footprint_points(&self, pose: &Pose) -> Vec<Point2> {
        let upright =
            pose.roll.abs() < ANGLE_EPS && pose.pitch.abs() < ANGLE_EPS;
        match self {
            Shape::Box { size } if upright => rect_corners(
                pose.x,
                pose.y,
                size[0] / 2.0,
                size[1] / 2.0,
                pose.yaw,
            )
            .to_vec(),
            Shape::Box { size } => {
                let r = 0.5
                    * (size[0] * size[0]
                        + size[1] * size[1]
                        + size[2] * size[2])
                        .sqrt();
                disc(pose.x, pose.y, r, FOOTPRINT_DISC_SIDES)
            }
            Shape::Cylinder { radius, .. } if upright => {
                disc(pose.x, pose.y, *radius, FOOTPRINT_DISC_SIDES)
            }
            Shape::Cylinder { radius, length } => {
                let r = (radius * radius + length * length / 4.0).sqrt();
                disc(pose.x, pose.y, r, FOOTPRINT_DISC_SIDES)
            }
            Shape::Sphere { radius } => {
                disc(pose.x, pose.y, *radius, FOOTPRINT_DISC_SIDES)
            }
            Shape::Mesh { .. } => Vec::new(),
        }
    }
}

// -- Generative sampling rules -------------------------------------

/// Closed-form size sampling rule, evaluated by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleRule {
    Fixed(f64),
    Uniform { min: f64, max: f64 },
}

impl SampleRule {
    pub fn sample(&self, rng: &mut Pcg32) -> f64 {
        match *self {
            SampleRule::Fixed(v) => v,
            SampleRule::Uniform { min, max } => rng.next_range(min, max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeRule {
    Box { size: [SampleRule; 3] },
    Cylinder { radius: SampleRule, length: SampleRule },
    Sphere { radius: SampleRule },
}

impl ShapeRule {
    /// Draw one concrete shape from the rule.
    pub fn instantiate(&self, rng: &mut Pcg32) -> Shape {
        match self {
            ShapeRule::Box { size } => Shape::Box {
                size: [
                    size[0].sample(rng),
                    size[1].sample(rng),
                    size[2].sample(rng),
                ],
            },
            ShapeRule::Cylinder { radius, length } => Shape::Cylinder {
                radius: radius.sample(rng),
                length: length.sample(rng),
            },
            ShapeRule::Sphere { radius } => Shape::Sphere {
                radius: radius.sample(rng),
            },
        }
    }
}

/// Generative description of one asset archetype.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub tag: String,
    pub rule: ShapeRule,
    /// Requested instance count for this tag.
    #[serde(default)]
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

// -- Placement policies / request ----------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dof {
    X,
    Y,
    Roll,
    Pitch,
    Yaw,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum PolicyRule {
    /// Sample uniformly within the named workspace polygon.
    Workspace { workspace: String },
    /// Uniform over [min, max]; `mean` is kept as a label only.
    Uniform {
        #[serde(default)]
        mean: f64,
        min: f64,
        max: f64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementPolicy {
    pub dofs: Vec<Dof>,
    #[serde(flatten)]
    pub rule: PolicyRule,
}

/// Binds a named constraint to one asset tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConstraint {
    pub tag: String,
    pub constraint: String,
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementRequest {
    /// Asset tags in placement order.
    pub tags: Vec<String>,
    /// Hard cap on accepted instances per tag.
    pub max_count: HashMap<String, u32>,
    pub policies: Vec<PlacementPolicy>,
    #[serde(default)]
    pub constraints: Vec<LocalConstraint>,
    #[serde(default = "default_true")]
    pub no_collision: bool,
    /// Minimum footprint-to-footprint clearance in meters; 0 permits
    /// contact but never overlap.
    #[serde(default)]
    pub min_distance: f64,
    /// Retry budget per object instance.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl PlacementRequest {
    /// First policy whose degrees of freedom include `dof`.
    pub fn policy_for(&self, dof: Dof) -> Option<&PlacementPolicy> {
        self.policies.iter().find(|p| p.dofs.contains(&dof))
    }
}

// -- Placement result / scene graph --------------------------------

/// One accepted object pose. Immutable once accepted; lives as long
/// as the scene built from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub id: String,
    pub tag: String,
    pub pose: Pose,
    pub shape: Shape,
    pub footprint: Footprint,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solid {
    /// Pose relative to the owning model frame.
    #[serde(default)]
    pub pose: Pose,
    pub shape: Shape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    #[serde(default)]
    pub pose: Pose,
    pub solids: Vec<Solid>,
}

/// Ordered collection of named top-level objects; the one mutable
/// aggregate the engines write into.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    #[serde(default)]
    pub models: Vec<Model>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Scene {
            name: name.into(),
            models: Vec::new(),
        }
    }

    /// Add a model, replacing an existing one of the same name in
    /// place so insertion order is preserved.
    pub fn add_model(&mut self, model: Model) {
        if let Some(slot) =
            self.models.iter_mut().find(|m| m.name == model.name)
        {
            *slot = model;
        } else {
            self.models.push(model);
        }
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.iter().find(|m| m.name == name)
    }
}

// -- World parameters ----------------------------------------------

fn default_wall_thickness() -> f64 {
    0.1
}

fn default_wall_height() -> f64 {
    2.0
}

fn default_room_range() -> f64 {
    50.0
}

fn default_resolution() -> f64 {
    crate::freespace::DEFAULT_RESOLUTION
}

fn default_world_name() -> String {
    "pcg_sample".to_string()
}

/// Validated parameter struct consumed by the pipeline. A CLI or
/// config layer deserializes this from JSON and calls `validate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldParams {
    pub seed: u64,
    /// Rectangle-merge boundary mode; mutually exclusive with
    /// `n_points`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_rectangles: Option<u32>,
    /// Triangulation boundary mode; mutually exclusive with
    /// `n_rectangles`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n_points: Option<u32>,
    #[serde(default = "default_wall_thickness")]
    pub wall_thickness: f64,
    #[serde(default = "default_wall_height")]
    pub wall_height: f64,
    #[serde(default = "default_room_range")]
    pub x_room_range: f64,
    #[serde(default = "default_room_range")]
    pub y_room_range: f64,
    #[serde(default)]
    pub n_boxes: u32,
    #[serde(default)]
    pub n_cylinders: u32,
    #[serde(default)]
    pub n_spheres: u32,
    #[serde(default)]
    pub random_roll: bool,
    #[serde(default)]
    pub random_pitch: bool,
    #[serde(default)]
    pub min_distance: f64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_resolution")]
    pub free_space_resolution: f64,
    #[serde(default = "default_world_name")]
    pub world_name: String,
    #[serde(default = "default_true")]
    pub attach_models: bool,
}

impl WorldParams {
    /// Reject invalid or contradictory parameters before any geometry
    /// work begins.
    pub fn validate(&self) -> Result<()> {
        match (self.n_rectangles, self.n_points) {
            (Some(_), Some(_)) => {
                return Err(Error::config(
                    "both n_rectangles and n_points given; pick one \
                     boundary mode",
                ));
            }
            (None, None) => {
                return Err(Error::config(
                    "one of n_rectangles or n_points is required",
                ));
            }
            _ => {}
        }
        if self.wall_thickness <= 0.0 {
            return Err(Error::config(format!(
                "wall thickness must be positive, got {}",
                self.wall_thickness
            )));
        }
        if self.wall_height <= 0.0 {
            return Err(Error::config(format!(
                "wall height must be positive, got {}",
                self.wall_height
            )));
        }
        if self.x_room_range <= 0.0 || self.y_room_range <= 0.0 {
            return Err(Error::config(
                "room ranges must be positive",
            ));
        }
        if self.free_space_resolution <= 0.0 {
            return Err(Error::config(
                "free space resolution must be positive",
            ));
        }
        if self.max_attempts == 0 {
            return Err(Error::config(
                "placement retry budget must be at least 1",
            ));
        }
        Ok(())
    }

    /// The active boundary mode; validated at construction.
    pub fn boundary_spec(&self) -> Result<BoundarySpec> {
        match (self.n_rectangles, self.n_points) {
            (Some(count), None) => BoundarySpec::rectangles(count),
            (None, Some(points)) => BoundarySpec::triangulation(points),
            _ => Err(Error::config(
                "exactly one of n_rectangles or n_points is required",
            )),
        }
    }

    /// Rectangle/point sampling ranges derived from the room ranges.
    pub fn synthesis_ranges(&self) -> SynthesisRanges {
        SynthesisRanges {
            x_center: (-self.x_room_range / 2.0, self.x_room_range / 2.0),
            y_center: (-self.y_room_range / 2.0, self.y_room_range / 2.0),
            delta_x: (self.x_room_range / 2.0, self.x_room_range),
            delta_y: (self.y_room_range / 2.0, self.y_room_range),
        }
    }
}

// -- Tests ---------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_round_trip() {
        let json = r#"{
            "seed": 42,
            "n_rectangles": 10,
            "n_boxes": 5,
            "n_spheres": 2
        }"#;
        let params: WorldParams =
            serde_json::from_str(json).expect("deserialize");
        assert_eq!(params.seed, 42);
        assert_eq!(params.n_rectangles, Some(10));
        assert_eq!(params.wall_thickness, 0.1);
        assert_eq!(params.wall_height, 2.0);
        assert_eq!(params.x_room_range, 50.0);
        assert_eq!(params.world_name, "pcg_sample");
        assert!(params.attach_models);
        params.validate().expect("valid");

        let out = serde_json::to_string(&params).expect("serialize");
        let _: WorldParams =
            serde_json::from_str(&out).expect("re-deserialize");
    }

    #[test]
    fn both_modes_rejected() {
        let params: WorldParams = serde_json::from_str(
            r#"{"seed": 1, "n_rectangles": 3, "n_points": 10}"#,
        )
        .expect("deserialize");
        assert!(params.validate().is_err());
    }

    #[test]
    fn neither_mode_rejected() {
        let params: WorldParams =
            serde_json::from_str(r#"{"seed": 1}"#).expect("deserialize");
        assert!(params.validate().is_err());
    }

    #[test]
    fn non_positive_thickness_rejected() {
        let params: WorldParams = serde_json::from_str(
            r#"{"seed": 1, "n_rectangles": 3, "wall_thickness": 0.0}"#,
        )
        .expect("deserialize");
        assert!(params.validate().is_err());
    }

    #[test]
    fn policy_rule_schema() {
        let policy: PlacementPolicy = serde_json::from_str(
            r#"{"dofs": ["x", "y"], "tag": "workspace",
                "workspace": "room_workspace"}"#,
        )
        .expect("deserialize");
        assert_eq!(policy.dofs, vec![Dof::X, Dof::Y]);
        match policy.rule {
            PolicyRule::Workspace { ref workspace } => {
                assert_eq!(workspace, "room_workspace");
            }
            _ => panic!("expected workspace rule"),
        }

        let uniform: PlacementPolicy = serde_json::from_str(
            r#"{"dofs": ["yaw"], "tag": "uniform",
                "mean": 0.0, "min": -3.14, "max": 3.14}"#,
        )
        .expect("deserialize");
        assert!(matches!(uniform.rule, PolicyRule::Uniform { .. }));
    }

    #[test]
    fn scene_add_model_replaces_in_place() {
        let mut scene = Scene::new("test");
        scene.add_model(Model {
            name: "a".to_string(),
            pose: Pose::default(),
            solids: vec![],
        });
        scene.add_model(Model {
            name: "b".to_string(),
            pose: Pose::default(),
            solids: vec![],
        });
        scene.add_model(Model {
            name: "a".to_string(),
            pose: Pose::translation(1.0, 0.0, 0.0),
            solids: vec![],
        });
        assert_eq!(scene.models.len(), 2);
        assert_eq!(scene.models[0].name, "a");
        assert_eq!(scene.models[0].pose.x, 1.0);
    }

    #[test]
    fn upright_box_support_is_half_height() {
        let shape = Shape::Box {
            size: [1.0, 2.0, 3.0],
        };
        assert!((shape.support_down(0.0, 0.0) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn rolled_box_support_uses_depth() {
        let shape = Shape::Box {
            size: [1.0, 2.0, 3.0],
        };
        let support =
            shape.support_down(std::f64::consts::FRAC_PI_2, 0.0);
        assert!((support - 1.0).abs() < 1e-9);
    }

    #[test]
    fn sphere_support_is_radius() {
        let shape = Shape::Sphere { radius: 0.4 };
        assert!((shape.support_down(1.0, 2.0) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn tilted_cylinder_support() {
        let shape = Shape::Cylinder {
            radius: 0.5,
            length: 2.0,
        };
        // Lying flat on its side: the radius carries the height.
        let flat = shape.support_down(0.0, std::f64::consts::FRAC_PI_2);
        assert!((flat - 0.5).abs() < 1e-9);
        // Upright: half the length.
        let up = shape.support_down(0.0, 0.0);
        assert!((up - 1.0).abs() < 1e-12);
    }

    #[test]
    fn sample_rule_bounds() {
        let mut rng = Pcg32::new(3, 1);
        let rule = SampleRule::Uniform { min: 0.1, max: 1.0 };
        for _ in 0..100 {
            let v = rule.sample(&mut rng);
            assert!((0.1..1.0).contains(&v));
        }
        assert_eq!(SampleRule::Fixed(0.7).sample(&mut rng), 0.7);
    }
}
