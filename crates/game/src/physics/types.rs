use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
#[rkyv(derive(Debug))]
pub enum BodyShape {
    Box { half_extents: [f32; 3] },
    Sphere { radius: f32 },
    Cylinder { radius: f32, height: f32 },
}

impl BodyShape {
    pub fn cube(half_size: f32) -> Self {
        Self::Box {
            half_extents: [half_size; 3],
        }
    }

    pub fn is_valid(&self) -> bool {
        match *self {
            Self::Box { half_extents } => half_extents.iter().all(|e| e.is_finite() && *e > 0.0),
            Self::Sphere { radius } => radius.is_finite() && radius > 0.0,
            Self::Cylinder { radius, height } => {
                radius.is_finite() && radius > 0.0 && height.is_finite() && height > 0.0
            }
        }
    }
}

#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[serde(rename_all = "camelCase")]
#[rkyv(derive(Debug))]
pub struct BodyProperties {
    pub shape: BodyShape,
    /// Zero marks a static body.
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    pub color: u32,
    pub metallic: bool,
}

impl BodyProperties {
    pub const DEFAULT_FRICTION: f32 = 0.5;
    pub const DEFAULT_RESTITUTION: f32 = 0.3;
    pub const DEFAULT_COLOR: u32 = 0x8899aa;

    pub fn new(shape: BodyShape, mass: f32) -> Self {
        Self {
            shape,
            mass,
            friction: Self::DEFAULT_FRICTION,
            restitution: Self::DEFAULT_RESTITUTION,
            color: Self::DEFAULT_COLOR,
            metallic: false,
        }
    }

    pub fn dynamic_box(half_extents: Vec3, mass: f32) -> Self {
        Self::new(
            BodyShape::Box {
                half_extents: half_extents.to_array(),
            },
            mass,
        )
    }

    pub fn static_box(half_extents: Vec3) -> Self {
        Self::dynamic_box(half_extents, 0.0)
    }

    pub fn sphere(radius: f32, mass: f32) -> Self {
        Self::new(BodyShape::Sphere { radius }, mass)
    }

    pub fn cylinder(radius: f32, height: f32, mass: f32) -> Self {
        Self::new(BodyShape::Cylinder { radius, height }, mass)
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn with_metallic(mut self, metallic: bool) -> Self {
        self.metallic = metallic;
        self
    }

    pub fn with_surface(mut self, friction: f32, restitution: f32) -> Self {
        self.friction = friction;
        self.restitution = restitution;
        self
    }

    pub fn is_static(&self) -> bool {
        self.mass <= 0.0
    }

    /// Clamps values a remote peer may have sent out of range.
    pub fn sanitized(mut self) -> Self {
        if !self.mass.is_finite() || self.mass < 0.0 {
            self.mass = 0.0;
        }
        if !self.friction.is_finite() || self.friction < 0.0 {
            self.friction = Self::DEFAULT_FRICTION;
        }
        if !self.restitution.is_finite() || self.restitution < 0.0 {
            self.restitution = Self::DEFAULT_RESTITUTION;
        }
        if !self.shape.is_valid() {
            self.shape = BodyShape::cube(0.5);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }

    /// Unit orientation, falling back to identity for a degenerate quaternion.
    pub fn normalized(self) -> Self {
        let orientation = if self.orientation.length_squared() > 1e-6 {
            self.orientation.normalize()
        } else {
            Quat::IDENTITY
        };
        Self::new(self.position, orientation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyKinematics {
    pub position: Vec3,
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl BodyKinematics {
    pub fn transform(&self) -> Transform {
        Transform::new(self.position, self.orientation)
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.orientation.is_finite()
            && self.linear_velocity.is_finite()
            && self.angular_velocity.is_finite()
    }
}
