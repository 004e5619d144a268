use glam::{Quat, Vec3};
use rapier3d::dynamics::RigidBodyHandle;

use crate::ids::BodyId;
use crate::ownership::Holder;
use crate::physics::{BodyProperties, BodyShape, Transform};

#[derive(Debug, Clone)]
pub struct RenderProxy {
    pub id: BodyId,
    pub shape: BodyShape,
    pub color: u32,
    pub metallic: bool,
    pub position: Vec3,
    pub orientation: Quat,
    /// Cosmetic only, e.g. to tint the beam of a remote holder.
    pub held_by: Option<Holder>,
}

impl RenderProxy {
    pub(super) fn new(id: BodyId, properties: &BodyProperties, transform: Transform) -> Self {
        Self {
            id,
            shape: properties.shape,
            color: properties.color,
            metallic: properties.metallic,
            position: transform.position,
            orientation: transform.orientation,
            held_by: None,
        }
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.orientation)
    }
}

#[derive(Debug, Clone)]
pub struct PhysicsBody {
    pub id: BodyId,
    pub properties: BodyProperties,
    pub(super) handle: RigidBodyHandle,
    pub(super) proxy: RenderProxy,
}

impl PhysicsBody {
    pub fn handle(&self) -> RigidBodyHandle {
        self.handle
    }

    pub fn proxy(&self) -> &RenderProxy {
        &self.proxy
    }

    pub fn is_static(&self) -> bool {
        self.properties.is_static()
    }
}
