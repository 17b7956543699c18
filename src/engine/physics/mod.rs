// Combat physics: colliders, broad phase and contact tracking
//
// Rigid bodies are stored in rapier2d's `RigidBodySet` and owned by whoever
// moves characters around. Colliders only keep a handle back to their body.

pub mod body;
mod collider;
mod collision;
mod spatial_grid;

pub use collider::{Aabb, Collider, ColliderShape, CollisionType, HitProperties};
pub use collision::{CollisionEvent, CollisionLayer, ContactTracker, LayerMask};
pub use spatial_grid::{CellKey, SpatialGrid};

// Re-export the rapier types callers need to own bodies
pub use rapier2d::prelude::{RigidBody, RigidBodyHandle, RigidBodySet};

/// Physics setup errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PhysicsError {
    #[error("Invalid spatial grid: {0}")]
    InvalidGrid(String),
}
