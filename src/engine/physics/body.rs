// Rigid body helpers for fighters
//
// Fighters are kinematic: movement and knockback are applied by game code,
// rapier only stores the transform.

use glam::Vec2;
use rapier2d::prelude::*;

/// World position of a body, or `None` for a stale handle
pub fn body_position(bodies: &RigidBodySet, handle: RigidBodyHandle) -> Option<Vec2> {
    bodies.get(handle).map(|body| {
        let translation = body.translation();
        Vec2::new(translation.x, translation.y)
    })
}

/// Teleport a body to a new world position
pub fn set_body_position(bodies: &mut RigidBodySet, handle: RigidBodyHandle, position: Vec2) -> bool {
    match bodies.get_mut(handle) {
        Some(body) => {
            body.set_translation(vector![position.x, position.y], true);
            true
        }
        None => false,
    }
}

/// Push a body by `offset`, clamped to the stage's horizontal bounds and floor
pub fn displace_body(
    bodies: &mut RigidBodySet,
    handle: RigidBodyHandle,
    offset: Vec2,
    stage_min: Vec2,
    stage_max: Vec2,
) -> Option<Vec2> {
    let current = body_position(bodies, handle)?;
    let target = (current + offset).clamp(stage_min, stage_max);
    set_body_position(bodies, handle, target);
    Some(target)
}

/// Remove a body. Fighters attach no rapier colliders, so the scratch
/// island and joint sets only satisfy rapier's signature.
pub fn remove_body(bodies: &mut RigidBodySet, handle: RigidBodyHandle) -> bool {
    bodies
        .remove(
            handle,
            &mut IslandManager::new(),
            &mut ColliderSet::new(),
            &mut ImpulseJointSet::new(),
            &mut MultibodyJointSet::new(),
            true,
        )
        .is_some()
}

/// Common rigid body configurations
pub mod presets {
    use super::*;

    /// Fighter body: kinematic, rotation locked, never sleeps
    pub fn fighter_body(x: Real, y: Real) -> RigidBody {
        RigidBodyBuilder::kinematic_position_based()
            .translation(vector![x, y])
            .lock_rotations()
            .can_sleep(false)
            .build()
    }

    /// Static stage geometry body
    pub fn stage_body(x: Real, y: Real) -> RigidBody {
        RigidBodyBuilder::fixed().translation(vector![x, y]).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fighter_preset() {
        let body = presets::fighter_body(10.0, 20.0);
        assert_eq!(body.body_type(), RigidBodyType::KinematicPositionBased);
        assert_eq!(body.translation().x, 10.0);
        assert_eq!(body.translation().y, 20.0);
    }

    #[test]
    fn test_body_position_lookup() {
        let mut bodies = RigidBodySet::new();
        let handle = bodies.insert(presets::fighter_body(-50.0, 0.0));
        assert_eq!(body_position(&bodies, handle), Some(Vec2::new(-50.0, 0.0)));
    }

    #[test]
    fn test_set_body_position() {
        let mut bodies = RigidBodySet::new();
        let handle = bodies.insert(presets::stage_body(0.0, 0.0));
        assert!(set_body_position(&mut bodies, handle, Vec2::new(3.0, 4.0)));
        assert_eq!(body_position(&bodies, handle), Some(Vec2::new(3.0, 4.0)));
    }

    #[test]
    fn test_displace_body_clamps_to_stage() {
        let mut bodies = RigidBodySet::new();
        let handle = bodies.insert(presets::fighter_body(390.0, 0.0));
        let moved = displace_body(
            &mut bodies,
            handle,
            Vec2::new(25.0, -10.0),
            Vec2::new(-400.0, 0.0),
            Vec2::new(400.0, 600.0),
        );
        assert_eq!(moved, Some(Vec2::new(400.0, 0.0)));
    }

    #[test]
    fn test_remove_body() {
        let mut bodies = RigidBodySet::new();
        let handle = bodies.insert(presets::fighter_body(0.0, 0.0));
        assert!(remove_body(&mut bodies, handle));
        assert!(!remove_body(&mut bodies, handle));
        assert_eq!(body_position(&bodies, handle), None);
    }
}
