// Combat colliders
//
// A collider is a closed set of shapes plus combat metadata. World-space bounds
// are always derived on demand from the owning body, the shape and the offset,
// so a moved body can never leave a stale AABB behind.

use super::body::body_position;
use super::collision::{CollisionLayer, LayerMask};
use glam::Vec2;
use parry2d::math::{Isometry, Vector};
use parry2d::query;
use parry2d::shape::{Ball, Cuboid, Shape};
use rapier2d::prelude::{RigidBodyHandle, RigidBodySet};

/// Axis-aligned bounding box in world space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extents(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Inclusive overlap test (touching edges count)
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }
}

/// What a collider is used for in combat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionType {
    /// Can be hit
    Hurtbox,
    /// Can hit others
    Hitbox,
    /// Physical body-to-body separation
    Pushbox,
    /// Grab range
    Throwbox,
    Projectile,
    /// Stage geometry
    Environmental,
}

/// Collider geometry in the collider's local space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Box { center: Vec2, width: f32, height: f32 },
    Circle { center: Vec2, radius: f32 },
}

impl ColliderShape {
    pub fn center(&self) -> Vec2 {
        match *self {
            ColliderShape::Box { center, .. } | ColliderShape::Circle { center, .. } => center,
        }
    }

    pub fn set_center(&mut self, new_center: Vec2) {
        match self {
            ColliderShape::Box { center, .. } | ColliderShape::Circle { center, .. } => {
                *center = new_center
            }
        }
    }

    /// Half extents of the shape's bounding box
    pub fn half_extents(&self) -> Vec2 {
        match *self {
            ColliderShape::Box { width, height, .. } => Vec2::new(width * 0.5, height * 0.5),
            ColliderShape::Circle { radius, .. } => Vec2::splat(radius),
        }
    }
}

/// Attack payload carried by hitboxes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HitProperties {
    pub damage: f32,
    /// Frames the defender cannot act after being hit
    pub hitstun: u32,
    /// Frames the defender cannot act after blocking
    pub blockstun: u32,
    pub knockback: Vec2,
    /// Higher priority wins clashes
    pub priority: i32,
}

/// A combat collider
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    pub shape: ColliderShape,
    pub kind: CollisionType,
    /// `None` means the collider sits on no layer and passes no mask
    pub layer: Option<CollisionLayer>,
    pub layer_mask: LayerMask,
    pub active: bool,
    pub trigger: bool,
    pub offset: Vec2,
    /// Non-owning back reference to the body this collider follows
    pub body: Option<RigidBodyHandle>,
    pub hit: HitProperties,
}

impl Collider {
    fn with_shape(shape: ColliderShape) -> Self {
        Self {
            shape,
            kind: CollisionType::Pushbox,
            layer: None,
            layer_mask: LayerMask::ALL,
            active: true,
            trigger: false,
            offset: Vec2::ZERO,
            body: None,
            hit: HitProperties::default(),
        }
    }

    /// Box collider centered at `center` (local space)
    pub fn new_box(center: Vec2, width: f32, height: f32) -> Self {
        Self::with_shape(ColliderShape::Box {
            center,
            width,
            height,
        })
    }

    /// Circle collider centered at `center` (local space)
    pub fn new_circle(center: Vec2, radius: f32) -> Self {
        Self::with_shape(ColliderShape::Circle { center, radius })
    }

    pub fn with_kind(mut self, kind: CollisionType) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_layer(mut self, layer: CollisionLayer) -> Self {
        self.layer = Some(layer);
        self
    }

    pub fn with_mask(mut self, mask: LayerMask) -> Self {
        self.layer_mask = mask;
        self
    }

    pub fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_body(mut self, body: RigidBodyHandle) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Resize a box collider. Circles are left untouched and report `false`.
    pub fn set_size(&mut self, new_width: f32, new_height: f32) -> bool {
        match &mut self.shape {
            ColliderShape::Box { width, height, .. } => {
                *width = new_width;
                *height = new_height;
                true
            }
            ColliderShape::Circle { .. } => false,
        }
    }

    /// Whether this collider's mask accepts `layer`
    pub fn can_collide_with(&self, layer: Option<CollisionLayer>) -> bool {
        layer.map_or(false, |layer| self.layer_mask.contains(layer))
    }

    /// World-space center: body position + local center + offset
    pub fn world_center(&self, bodies: &RigidBodySet) -> Vec2 {
        let origin = self
            .body
            .and_then(|handle| body_position(bodies, handle))
            .unwrap_or(Vec2::ZERO);

        origin + self.shape.center() + self.offset
    }

    /// World-space bounds, recomputed on every call
    pub fn aabb(&self, bodies: &RigidBodySet) -> Aabb {
        Aabb::from_center_half_extents(self.world_center(bodies), self.shape.half_extents())
    }

    /// Point containment in world space
    pub fn contains(&self, point: Vec2, bodies: &RigidBodySet) -> bool {
        match self.shape {
            ColliderShape::Box { .. } => self.aabb(bodies).contains_point(point),
            ColliderShape::Circle { radius, .. } => {
                point.distance_squared(self.world_center(bodies)) <= radius * radius
            }
        }
    }

    /// Exact shape-vs-shape overlap test (narrow phase)
    pub fn overlaps(&self, other: &Collider, bodies: &RigidBodySet) -> bool {
        let a = self.aabb(bodies);
        let b = other.aabb(bodies);
        if !a.intersects(&b) {
            return false;
        }

        let center_a = self.world_center(bodies);
        let center_b = other.world_center(bodies);
        let pos_a = Isometry::translation(center_a.x, center_a.y);
        let pos_b = Isometry::translation(center_b.x, center_b.y);

        let shape_a = NarrowShape::from(&self.shape);
        let shape_b = NarrowShape::from(&other.shape);

        query::intersection_test(&pos_a, shape_a.as_shape(), &pos_b, shape_b.as_shape())
            .unwrap_or(true)
    }
}

/// Stack-allocated parry shape for one narrow-phase query
enum NarrowShape {
    Cuboid(Cuboid),
    Ball(Ball),
}

impl NarrowShape {
    fn as_shape(&self) -> &dyn Shape {
        match self {
            NarrowShape::Cuboid(cuboid) => cuboid,
            NarrowShape::Ball(ball) => ball,
        }
    }
}

impl From<&ColliderShape> for NarrowShape {
    fn from(shape: &ColliderShape) -> Self {
        match *shape {
            ColliderShape::Box { width, height, .. } => NarrowShape::Cuboid(Cuboid::new(
                Vector::new(width * 0.5, height * 0.5),
            )),
            ColliderShape::Circle { radius, .. } => NarrowShape::Ball(Ball::new(radius)),
        }
    }
}
