//! Physics world backed by rapier2d.
//!
//! The engine works in pixels with +y pointing down, so gravity defaults to
//! `(0, 981)`. Bodies are plain rapier bodies carrying one cuboid collider;
//! this module only owns the sets and the fixed-step bookkeeping.

use glam::Vec2;
use rapier2d::prelude::*;

use crate::config::PhysicsConfig;

pub use rapier2d::prelude::RigidBodyHandle;

/// Mass properties for a dynamic box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicBody {
    pub mass: f32,
    /// Moment of inertia around the centre.
    pub inertia: f32,
    pub fixed_rotation: bool,
}

impl Default for DynamicBody {
    fn default() -> Self {
        Self {
            mass: 3.0,
            inertia: 100.0,
            fixed_rotation: false,
        }
    }
}

pub struct PhysicsWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    max_substeps: u32,
    accumulator: f32,
}

impl PhysicsWorld {
    pub fn new(config: &PhysicsConfig) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.timestep;
        integration_parameters.length_unit = config.length_unit;

        Self {
            gravity: to_vector(config.gravity()),
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            max_substeps: config.max_substeps.max(1),
            accumulator: 0.0,
        }
    }

    pub fn timestep(&self) -> f32 {
        self.integration_parameters.dt
    }

    pub fn gravity(&self) -> Vec2 {
        to_vec2(&self.gravity)
    }

    pub fn add_static_box(&mut self, center: Vec2, size: Vec2) -> RigidBodyHandle {
        let body = RigidBodyBuilder::fixed().translation(to_vector(center)).build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::cuboid(size.x / 2.0, size.y / 2.0).build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    pub fn add_dynamic_box(&mut self, center: Vec2, size: Vec2, props: DynamicBody) -> RigidBodyHandle {
        let mut builder = RigidBodyBuilder::dynamic()
            .translation(to_vector(center))
            .additional_mass_properties(MassProperties::new(point![0.0, 0.0], props.mass, props.inertia));
        if props.fixed_rotation {
            builder = builder.lock_rotations();
        }
        let handle = self.bodies.insert(builder.build());
        // Zero density so the mass comes only from `props`.
        let collider = ColliderBuilder::cuboid(size.x / 2.0, size.y / 2.0)
            .density(0.0)
            .build();
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    pub fn remove(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.contains(handle)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Runs one fixed timestep.
    pub fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Consumes `dt` seconds of frame time in fixed steps and returns how many
    /// steps ran. Time beyond `max_substeps` steps is discarded.
    pub fn advance(&mut self, dt: f32) -> u32 {
        let step = self.integration_parameters.dt;
        self.accumulator += dt.max(0.0);
        let mut steps = 0;
        while self.accumulator >= step && steps < self.max_substeps {
            self.step();
            self.accumulator -= step;
            steps += 1;
        }
        if steps == self.max_substeps && self.accumulator >= step {
            log::debug!("physics fell behind, dropping {:.3}s", self.accumulator);
            self.accumulator = 0.0;
        }
        steps
    }

    pub fn position(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(handle).map(|b| to_vec2(b.translation()))
    }

    pub fn velocity(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(handle).map(|b| to_vec2(b.linvel()))
    }

    pub fn set_position(&mut self, handle: RigidBodyHandle, position: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_translation(to_vector(position), true);
        }
    }

    pub fn set_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(to_vector(velocity), true);
        }
    }

    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.apply_impulse(to_vector(impulse), true);
        }
    }

    /// True when the body has an active contact with something beneath it,
    /// judged by the contact normal rather than the body's speed.
    pub fn is_grounded(&self, handle: RigidBodyHandle) -> bool {
        let Some(body) = self.bodies.get(handle) else {
            return false;
        };
        body.colliders().iter().any(|&collider| {
            self.narrow_phase
                .contact_pairs_with(collider)
                .filter(|pair| pair.has_any_active_contact)
                .any(|pair| {
                    pair.manifolds.iter().any(|manifold| {
                        if manifold.data.solver_contacts.is_empty() {
                            return false;
                        }
                        // Normals point out of `collider1`; +y is down.
                        let down = if pair.collider1 == collider {
                            manifold.data.normal.y
                        } else {
                            -manifold.data.normal.y
                        };
                        down > GROUND_NORMAL_MIN
                    })
                })
        })
    }
}

/// Contacts whose normal is within roughly 45 degrees of straight down count
/// as standing on something.
const GROUND_NORMAL_MIN: f32 = 0.7;

fn to_vector(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

fn to_vec2(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}
