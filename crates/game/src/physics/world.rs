use glam::{Quat, Vec3};
use rapier3d::parry::query::RayCast;
use rapier3d::prelude::*;

use super::{BodyKinematics, BodyProperties, BodyShape, FixedTimestep, WorldConfig};

fn vector(v: Vec3) -> Vector {
    Vector::new(v.x, v.y, v.z)
}

fn rotation(q: Quat) -> Rotation {
    Rotation::from_xyzw(q.x, q.y, q.z, q.w).normalize()
}

fn shape_collider(shape: &BodyShape) -> ColliderBuilder {
    match *shape {
        BodyShape::Box { half_extents } => {
            ColliderBuilder::cuboid(half_extents[0], half_extents[1], half_extents[2])
        }
        BodyShape::Sphere { radius } => ColliderBuilder::ball(radius),
        BodyShape::Cylinder { radius, height } => ColliderBuilder::cylinder(height / 2.0, radius),
    }
}

pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    gravity: Vector,
    timestep: FixedTimestep,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    pub const TICK_RATE: Real = 1.0 / 60.0;

    pub fn new() -> Self {
        Self::with_config(&WorldConfig::default())
    }

    pub fn with_config(config: &WorldConfig) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = Self::TICK_RATE;
        integration_parameters.min_ccd_dt = Self::TICK_RATE / 100.0;

        let mut world = Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters,
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity: Vector::new(0.0, -config.gravity, 0.0),
            timestep: FixedTimestep::new(Self::TICK_RATE, config.max_substeps),
        };

        if let Some(y) = config.ground_height {
            world.add_ground(y, config.ground_half_size);
        }

        world
    }

    /// Advances the simulation by a wall-clock delta in fixed sub-steps.
    /// Returns the number of sub-steps taken.
    pub fn step(&mut self, delta: f32) -> u32 {
        self.timestep.accumulate(delta);
        let substeps = self.timestep.drain();
        for _ in 0..substeps {
            self.step_fixed();
        }
        substeps
    }

    pub fn step_fixed(&mut self) {
        self.pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
    }

    pub fn add_ground(&mut self, y: Real, half_size: Real) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_size, 0.1, half_size)
            .translation(Vector::new(0.0, y - 0.1, 0.0))
            .build();
        self.colliders.insert(collider)
    }

    pub fn insert_body(
        &mut self,
        properties: &BodyProperties,
        position: Vec3,
        orientation: Quat,
    ) -> RigidBodyHandle {
        let builder = if properties.is_static() {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic().ccd_enabled(true)
        };
        let handle = self.bodies.insert(builder.translation(vector(position)).build());

        let mut collider = shape_collider(&properties.shape)
            .friction(properties.friction)
            .restitution(properties.restitution);
        if !properties.is_static() {
            collider = collider.mass(properties.mass);
        }
        self.colliders
            .insert_with_parent(collider.build(), handle, &mut self.bodies);

        if let Some(body) = self.bodies.get_mut(handle) {
            let pose = Pose::from_parts(vector(position), rotation(orientation));
            body.set_position(pose, true);
            body.recompute_mass_properties_from_colliders(&self.colliders);
        }
        self.bodies
            .propagate_modified_body_positions_to_colliders(&mut self.colliders);

        handle
    }

    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
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
        self.bodies.get(handle).is_some()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_dynamic(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).is_some_and(|b| b.is_dynamic())
    }

    pub fn is_sleeping(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).is_some_and(|b| b.is_sleeping())
    }

    pub fn body_mass(&self, handle: RigidBodyHandle) -> Option<Real> {
        self.bodies.get(handle).map(|b| b.mass())
    }

    /// Overrides the mass of every collider on the body, splitting it evenly.
    pub fn set_body_mass(&mut self, handle: RigidBodyHandle, mass: Real) {
        let Some(body) = self.bodies.get_mut(handle) else {
            return;
        };
        if !body.is_dynamic() {
            return;
        }

        let collider_handles: Vec<_> = body.colliders().to_vec();
        if collider_handles.is_empty() {
            return;
        }
        let share = mass / collider_handles.len() as Real;
        for collider_handle in collider_handles {
            if let Some(collider) = self.colliders.get_mut(collider_handle) {
                collider.set_mass(share);
            }
        }

        body.recompute_mass_properties_from_colliders(&self.colliders);
        body.wake_up(true);
    }

    pub fn gravity_scale(&self, handle: RigidBodyHandle) -> Option<Real> {
        self.bodies.get(handle).map(|b| b.gravity_scale())
    }

    pub fn set_gravity_scale(&mut self, handle: RigidBodyHandle, scale: Real) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_gravity_scale(scale, true);
        }
    }

    pub fn kinematics(&self, handle: RigidBodyHandle) -> Option<BodyKinematics> {
        self.bodies.get(handle).map(|b| {
            let t = b.translation();
            let r = b.rotation();
            let v = b.linvel();
            let w = b.angvel();
            BodyKinematics {
                position: Vec3::new(t.x, t.y, t.z),
                orientation: Quat::from_xyzw(r.x, r.y, r.z, r.w),
                linear_velocity: Vec3::new(v.x, v.y, v.z),
                angular_velocity: Vec3::new(w.x, w.y, w.z),
            }
        })
    }

    pub fn body_position(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|b| {
            let t = b.translation();
            Vec3::new(t.x, t.y, t.z)
        })
    }

    pub fn body_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|b| {
            let v = b.linvel();
            Vec3::new(v.x, v.y, v.z)
        })
    }

    pub fn set_body_pose(&mut self, handle: RigidBodyHandle, position: Vec3, orientation: Quat) {
        if let Some(body) = self.bodies.get_mut(handle) {
            let pose = Pose::from_parts(vector(position), rotation(orientation));
            body.set_position(pose, true);
        }
        self.bodies
            .propagate_modified_body_positions_to_colliders(&mut self.colliders);
    }

    pub fn set_body_velocities(
        &mut self,
        handle: RigidBodyHandle,
        linear: Vec3,
        angular: Vec3,
    ) {
        if let Some(body) = self.bodies.get_mut(handle) {
            if !body.is_dynamic() {
                return;
            }
            body.set_linvel(vector(linear), true);
            body.set_angvel(vector(angular), true);
        }
    }

    pub fn overwrite_kinematics(&mut self, handle: RigidBodyHandle, state: &BodyKinematics) {
        self.set_body_pose(handle, state.position, state.orientation);
        self.set_body_velocities(handle, state.linear_velocity, state.angular_velocity);
    }

    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.apply_impulse(vector(impulse), true);
        }
    }

    pub fn set_control_force(&mut self, handle: RigidBodyHandle, force: Vec3, torque: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.reset_forces(false);
            body.reset_torques(false);
            body.add_force(vector(force), true);
            body.add_torque(vector(torque), true);
        }
    }

    pub fn clear_forces(&mut self, handle: RigidBodyHandle) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.reset_forces(true);
            body.reset_torques(true);
        }
    }

    /// Closest dynamic body along the ray. `direction` must be normalized.
    pub fn raycast_dynamic(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: Real,
    ) -> Option<(RigidBodyHandle, Real)> {
        let ray = Ray::new(vector(origin), vector(direction));

        // Scans colliders directly: the broad phase only learns about new or
        // teleported bodies on the next step.
        self.colliders
            .iter()
            .filter_map(|(_, collider)| {
                let parent = collider.parent()?;
                if !self.is_dynamic(parent) {
                    return None;
                }
                let toi = collider
                    .shape()
                    .cast_ray(collider.position(), &ray, max_distance, true)?;
                Some((parent, toi))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}
