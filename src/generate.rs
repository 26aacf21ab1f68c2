//! World generation pipeline.
//!
//! Runs the full sequence: boundary synthesis, wall extrusion, free
//! space computation, constraint/asset registration, then the
//! placement engine. Everything is synchronous and single-threaded;
//! the scene being built is exclusively owned by this session.

use std::collections::{HashMap, HashSet};

use crate::boundary;
use crate::catalog::{AssetCatalog, MeshLibrary};
use crate::constraints::{Constraint, ConstraintRegistry};
use crate::error::{Error, Result};
use crate::freespace;
use crate::geometry::{bounds, polygon_area, Footprint, Point2};
use crate::placement::{EngineContext, EngineRunner, PlacementEngine};
use crate::prng::Pcg32;
use crate::types::{
    AssetDescriptor, Dof, LocalConstraint, Model, PlacementPolicy,
    PlacementRequest, PolicyRule, Pose, SampleRule, Scene, Shape,
    ShapeRule, Solid, WorldParams,
};
use crate::walls;

const GROUND_PLANE: &str = "ground_plane";
const GROUND_PLANE_MESH: &str = "media/ground_plane.dae";
const WORKSPACE_CONSTRAINT: &str = "room_workspace";
const TANGENT_CONSTRAINT: &str = "tangent_to_ground_plane";
const ENGINE_NAME: &str = "random_pose";

fn wall_model(
    name: &str,
    segments: &[walls::WallSegment],
    height: f64,
) -> Model {
    let solids = segments
        .iter()
        .map(|s| Solid {
            pose: s.pose(),
            shape: Shape::Box {
                size: [s.length() + s.thickness, s.thickness, height],
            },
            color: None,
        })
        .collect();
    Model {
        name: name.to_string(),
        // Prisms are centered vertically on the model frame.
        pose: Pose::translation(0.0, 0.0, height / 2.0),
        solids,
    }
}

fn register_assets(params: &WorldParams, assets: &mut AssetCatalog) {
    let rule = SampleRule::Uniform { min: 0.1, max: 1.0 };
    if params.n_boxes > 0 {
        assets.register(AssetDescriptor {
            tag: "box".to_string(),
            rule: ShapeRule::Box { size: [rule; 3] },
            count: params.n_boxes,
            color: Some("xkcd".to_string()),
        });
    }
    if params.n_cylinders > 0 {
        assets.register(AssetDescriptor {
            tag: "cylinder".to_string(),
            rule: ShapeRule::Cylinder {
                radius: rule,
                length: rule,
            },
            count: params.n_cylinders,
            color: Some("xkcd".to_string()),
        });
    }
    if params.n_spheres > 0 {
        assets.register(AssetDescriptor {
            tag: "sphere".to_string(),
            rule: ShapeRule::Sphere { radius: rule },
            count: params.n_spheres,
            color: Some("xkcd".to_string()),
        });
    }
}

/// Generate a complete scene from validated parameters.
pub fn generate(params: &WorldParams) -> Result<Scene> {
    params.validate()?;
    let spec = params.boundary_spec()?;
    let ranges = params.synthesis_ranges();
    let mut rng = Pcg32::new(params.seed, 1);

    let polygon = boundary::synthesize(&spec, &ranges, &mut rng)?;
    tracing::info!(
        vertices = polygon.len(),
        area = polygon_area(&polygon),
        "boundary synthesized"
    );

    let mut scene = Scene::new(&params.world_name);
    let walls_name = format!("{}_walls", params.world_name);
    let segments = walls::extrude(
        &polygon,
        params.wall_thickness,
        params.wall_height,
    );
    scene.add_model(wall_model(&walls_name, &segments, params.wall_height));

    let mut meshes = MeshLibrary::new();
    meshes.store(GROUND_PLANE, GROUND_PLANE_MESH, 1.0);
    let ground = meshes.get(GROUND_PLANE)?;
    scene.add_model(Model {
        name: GROUND_PLANE.to_string(),
        pose: Pose::default(),
        solids: vec![Solid {
            pose: Pose::default(),
            shape: Shape::Mesh {
                uri: ground.path.clone(),
                scale: ground.scale,
            },
            color: None,
        }],
    });

    // Free space: room interior minus the wall strips. The ground
    // plane footprint is in the obstacle set but ignored by name.
    let room_footprint = Footprint::new(walls_name.clone(), polygon.clone());
    let mut obstacles: Vec<Footprint> = segments
        .iter()
        .map(|s| s.footprint(&walls_name))
        .collect();
    let (lo, hi) = bounds(&polygon);
    obstacles.push(Footprint::new(
        GROUND_PLANE,
        vec![
            Point2::new(lo.x, lo.y),
            Point2::new(hi.x, lo.y),
            Point2::new(hi.x, hi.y),
            Point2::new(lo.x, hi.y),
        ],
    ));
    let ignore: HashSet<String> =
        [GROUND_PLANE.to_string()].into_iter().collect();
    let free = freespace::free_space(
        &[room_footprint],
        &obstacles,
        &ignore,
        params.free_space_resolution,
    );
    let room = free.first().cloned().ok_or_else(|| {
        Error::geometry("no free space left inside the walls")
    })?;
    tracing::info!(
        polygons = free.len(),
        area = polygon_area(&room),
        "free space computed"
    );

    let mut constraints = ConstraintRegistry::new();
    constraints.register(
        WORKSPACE_CONSTRAINT,
        Constraint::Workspace { polygon: room },
    );
    constraints.register(
        TANGENT_CONSTRAINT,
        Constraint::Tangent {
            origin: [0.0, 0.0, 0.0],
            normal: [0.0, 0.0, 1.0],
        },
    );

    let mut assets = AssetCatalog::new();
    register_assets(params, &mut assets);
    if assets.is_empty() {
        tracing::info!("no assets requested; scene holds walls only");
        return Ok(scene);
    }

    let tags: Vec<String> = assets.tags().map(String::from).collect();
    let mut max_count = HashMap::new();
    for tag in &tags {
        max_count.insert(tag.clone(), assets.lookup(tag)?.count);
    }
    let mut orientation_dofs = vec![Dof::Yaw];
    if params.random_roll {
        orientation_dofs.push(Dof::Roll);
    }
    if params.random_pitch {
        orientation_dofs.push(Dof::Pitch);
    }
    let request = PlacementRequest {
        tags: tags.clone(),
        max_count,
        policies: vec![
            PlacementPolicy {
                dofs: vec![Dof::X, Dof::Y],
                rule: PolicyRule::Workspace {
                    workspace: WORKSPACE_CONSTRAINT.to_string(),
                },
            },
            PlacementPolicy {
                dofs: orientation_dofs,
                rule: PolicyRule::Uniform {
                    mean: 0.0,
                    min: -std::f64::consts::PI,
                    max: std::f64::consts::PI,
                },
            },
        ],
        constraints: tags
            .iter()
            .map(|t| LocalConstraint {
                tag: t.clone(),
                constraint: TANGENT_CONSTRAINT.to_string(),
            })
            .collect(),
        no_collision: true,
        min_distance: params.min_distance,
        max_attempts: params.max_attempts,
    };

    let mut runner = EngineRunner::new();
    runner.register(Box::new(PlacementEngine::new(ENGINE_NAME, request)));
    let mut ctx = EngineContext {
        free_space: &free,
        constraints: &constraints,
        assets: &assets,
        rng: &mut rng,
    };
    let placements =
        runner.run_engines(&mut ctx, &mut scene, params.attach_models)?;
    tracing::info!(
        placements = placements.len(),
        models = scene.models.len(),
        "world generated"
    );
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params(seed: u64) -> WorldParams {
        serde_json::from_str(&format!(
            r#"{{
                "seed": {seed},
                "n_rectangles": 1,
                "x_room_range": 10.0,
                "y_room_range": 10.0,
                "n_boxes": 2
            }}"#
        ))
        .expect("params")
    }

    #[test]
    fn walls_and_ground_and_boxes() {
        let scene = generate(&small_params(21)).unwrap();
        let walls = scene.model("pcg_sample_walls").expect("walls model");
        assert_eq!(walls.solids.len(), 4);
        assert!((walls.pose.z - 1.0).abs() < 1e-12);
        assert!(scene.model("ground_plane").is_some());
        assert!(scene.model("box_0").is_some());
        assert!(scene.model("box_1").is_some());
    }

    #[test]
    fn detached_mode_skips_attachment() {
        let mut params = small_params(21);
        params.attach_models = false;
        let scene = generate(&params).unwrap();
        assert!(scene.model("box_0").is_none());
        // Walls and ground plane are part of the world regardless.
        assert!(scene.model("pcg_sample_walls").is_some());
    }

    #[test]
    fn invalid_params_fail_before_geometry() {
        let mut params = small_params(1);
        params.n_points = Some(10);
        assert!(matches!(
            generate(&params).unwrap_err(),
            Error::Config(_)
        ));
    }
}
