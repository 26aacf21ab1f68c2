//! Constraint-driven, collision-free random placement.
//!
//! The placement engine draws candidate poses for each requested
//! object instance, rejecting candidates that violate the workspace,
//! tangency, or clearance rules, until the instance is accepted or
//! its retry budget runs out. Instances are placed strictly one at a
//! time, so the collision test set only grows.

use crate::catalog::AssetCatalog;
use crate::constraints::{Constraint, ConstraintRegistry};
use crate::error::{Error, Result};
use crate::geometry::{
    bounds, convex_overlap, point_in_polygon, polygon_distance, Footprint,
    Point2,
};
use crate::prng::Pcg32;
use crate::types::{
    Dof, Model, Placement, PlacementPolicy, PlacementRequest, PolicyRule,
    Pose, Scene, Solid,
};

/// Rejection-sampling budget for one point draw inside a polygon.
const POINT_SAMPLE_TRIES: u32 = 100;

/// Everything an engine needs for one placement session.
pub struct EngineContext<'a> {
    pub free_space: &'a [Vec<Point2>],
    pub constraints: &'a ConstraintRegistry,
    pub assets: &'a AssetCatalog,
    pub rng: &'a mut Pcg32,
}

/// Capability interface for placement strategies; new strategies plug
/// into the runner without touching it.
pub trait Engine {
    fn name(&self) -> &str;
    fn attempt(&self, ctx: &mut EngineContext<'_>)
        -> Result<Vec<Placement>>;
}

/// Random-pose placement with collision and clearance rejection.
pub struct PlacementEngine {
    name: String,
    request: PlacementRequest,
}

impl PlacementEngine {
    pub fn new(name: impl Into<String>, request: PlacementRequest) -> Self {
        PlacementEngine {
            name: name.into(),
            request,
        }
    }
}

fn polygons_equal(a: &[Point2], b: &[Point2]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(p, q)| p.x == q.x && p.y == q.y)
}

fn sample_in_polygon(rng: &mut Pcg32, polygon: &[Point2]) -> Option<Point2> {
    let (lo, hi) = bounds(polygon);
    for _ in 0..POINT_SAMPLE_TRIES {
        let p = Point2::new(
            rng.next_range(lo.x, hi.x),
            rng.next_range(lo.y, hi.y),
        );
        if point_in_polygon(p, polygon) {
            return Some(p);
        }
    }
    None
}

fn sample_dof(policy: &PlacementPolicy, rng: &mut Pcg32) -> f64 {
    match policy.rule {
        PolicyRule::Uniform { min, max, .. } => rng.next_range(min, max),
        // A workspace rule carries no scalar distribution.
        PolicyRule::Workspace { .. } => 0.0,
    }
}

fn collides(
    candidate: &[Point2],
    accepted: &[Placement],
    min_distance: f64,
) -> bool {
    for placed in accepted {
        if convex_overlap(candidate, &placed.footprint.points) {
            return true;
        }
        if min_distance > 0.0
            && polygon_distance(candidate, &placed.footprint.points)
                < min_distance
        {
            return true;
        }
    }
    false
}

impl Engine for PlacementEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn attempt(
        &self,
        ctx: &mut EngineContext<'_>,
    ) -> Result<Vec<Placement>> {
        let request = &self.request;
        let assets = ctx.assets;
        let constraints = ctx.constraints;
        let free_space = ctx.free_space;

        let pos_policy = request.policy_for(Dof::X).ok_or_else(|| {
            Error::config("placement request has no position policy")
        })?;
        let workspace: Option<Vec<Point2>> = match &pos_policy.rule {
            PolicyRule::Workspace { workspace } => {
                let polygon = match constraints.lookup(workspace)? {
                    Constraint::Workspace { polygon } => polygon,
                    _ => {
                        return Err(Error::config(format!(
                            "constraint '{workspace}' is not a workspace"
                        )));
                    }
                };
                if !free_space.iter().any(|fs| polygons_equal(fs, polygon))
                {
                    return Err(Error::config(format!(
                        "workspace '{workspace}' does not match any \
                         free-space polygon"
                    )));
                }
                Some(polygon.clone())
            }
            PolicyRule::Uniform { .. } => None,
        };
        let ori_policy = request.policy_for(Dof::Yaw);

        let mut accepted: Vec<Placement> = Vec::new();
        for tag in &request.tags {
            let descriptor = assets.lookup(tag)?;
            let max = request.max_count.get(tag).copied().unwrap_or(0);

            // Local constraint bindings for this tag.
            let mut tangent: Option<[f64; 3]> = None;
            let mut bound_workspaces: Vec<Vec<Point2>> = Vec::new();
            for binding in
                request.constraints.iter().filter(|b| &b.tag == tag)
            {
                match constraints.lookup(&binding.constraint)? {
                    Constraint::Tangent { origin, normal } => {
                        // Z resolution assumes a +Z reference plane.
                        if *normal != [0.0, 0.0, 1.0] {
                            return Err(Error::config(format!(
                                "tangent constraint '{}' requires the \
                                 [0, 0, 1] normal, got {normal:?}",
                                binding.constraint
                            )));
                        }
                        tangent = Some(*origin);
                    }
                    Constraint::Workspace { polygon } => {
                        bound_workspaces.push(polygon.clone());
                    }
                }
            }

            for instance in 0..max {
                // Generative parameters are drawn once per instance
                // and reused across retries.
                let shape = descriptor.rule.instantiate(ctx.rng);
                let mut attempts = 0u32;
                let placement = loop {
                    if attempts >= request.max_attempts {
                        return Err(Error::Placement {
                            tag: tag.clone(),
                            instance,
                            attempts,
                        });
                    }
                    attempts += 1;

                    let position = match &workspace {
                        Some(polygon) => {
                            match sample_in_polygon(ctx.rng, polygon) {
                                Some(p) => p,
                                None => continue,
                            }
                        }
                        None => match pos_policy.rule {
                            PolicyRule::Uniform { min, max, .. } => {
                                Point2::new(
                                    ctx.rng.next_range(min, max),
                                    ctx.rng.next_range(min, max),
                                )
                            }
                            PolicyRule::Workspace { .. } => unreachable!(
                                "workspace rule resolved above"
                            ),
                        },
                    };
                    if bound_workspaces
                        .iter()
                        .any(|w| !point_in_polygon(position, w))
                    {
                        continue;
                    }

                    let (mut roll, mut pitch, mut yaw) = (0.0, 0.0, 0.0);
                    if let Some(policy) = ori_policy {
                        yaw = sample_dof(policy, ctx.rng);
                        if policy.dofs.contains(&Dof::Roll) {
                            roll = sample_dof(policy, ctx.rng);
                        }
                        if policy.dofs.contains(&Dof::Pitch) {
                            pitch = sample_dof(policy, ctx.rng);
                        }
                    }

                    // Tangency: rest the lowest point exactly on the
                    // reference plane.
                    let z = match tangent {
                        Some(origin) => {
                            origin[2] + shape.support_down(roll, pitch)
                        }
                        None => 0.0,
                    };
                    let pose = Pose {
                        x: position.x,
                        y: position.y,
                        z,
                        roll,
                        pitch,
                        yaw,
                    };

                    let footprint = shape.footprint_points(&pose);
                    if request.no_collision
                        && collides(
                            &footprint,
                            &accepted,
                            request.min_distance,
                        )
                    {
                        tracing::trace!(
                            tag = %tag,
                            instance,
                            attempts,
                            "candidate rejected by clearance test"
                        );
                        continue;
                    }

                    let id = format!("{tag}_{instance}");
                    break Placement {
                        footprint: Footprint::new(id.clone(), footprint),
                        id,
                        tag: tag.clone(),
                        pose,
                        shape: shape.clone(),
                    };
                };
                tracing::debug!(
                    id = %placement.id,
                    attempts,
                    "placement accepted"
                );
                accepted.push(placement);
            }
        }
        Ok(accepted)
    }
}

/// Invokes registered engines in order and commits their placements
/// into the scene.
#[derive(Default)]
pub struct EngineRunner {
    engines: Vec<Box<dyn Engine>>,
}

impl EngineRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, engine: Box<dyn Engine>) {
        self.engines.push(engine);
    }

    /// Run every engine. When `attach_models` is set, each accepted
    /// placement becomes a first-class named model in the scene;
    /// otherwise placements are only returned. Placement ids are
    /// `{tag}_{instance}`, so two engines sharing a tag would collide;
    /// that is reported as a configuration error instead of silently
    /// replacing the earlier model.
    pub fn run_engines(
        &self,
        ctx: &mut EngineContext<'_>,
        scene: &mut Scene,
        attach_models: bool,
    ) -> Result<Vec<Placement>> {
        let mut all: Vec<Placement> = Vec::new();
        for engine in &self.engines {
            tracing::info!(engine = engine.name(), "running engine");
            let placements = engine.attempt(ctx)?;
            if let Some(dup) = placements
                .iter()
                .find(|p| all.iter().any(|q| q.id == p.id))
            {
                return Err(Error::config(format!(
                    "engine '{}' produced duplicate placement id '{}'",
                    engine.name(),
                    dup.id
                )));
            }
            tracing::info!(
                engine = engine.name(),
                accepted = placements.len(),
                "engine finished"
            );
            if attach_models {
                for p in &placements {
                    let color = ctx
                        .assets
                        .lookup(&p.tag)
                        .ok()
                        .and_then(|d| d.color.clone());
                    scene.add_model(Model {
                        name: p.id.clone(),
                        pose: p.pose,
                        solids: vec![Solid {
                            pose: Pose::default(),
                            shape: p.shape.clone(),
                            color,
                        }],
                    });
                }
            }
            all.extend(placements);
        }
        Ok(all)
    }
}
