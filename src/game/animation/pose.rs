// Joint transforms and SoA pose buffers

use super::{AnimationError, Skeleton};
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};

/// Local joint transform (translation, rotation, scale)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Interpolate towards `other`; rotation takes the shortest arc
    pub fn interpolate(&self, other: &Transform, t: f32) -> Transform {
        Transform {
            translation: self.translation.lerp(other.translation, t),
            rotation: self.rotation.slerp(other.rotation, t),
            scale: self.scale.lerp(other.scale, t),
        }
    }

    pub(crate) fn to_record(self) -> TransformRecord {
        TransformRecord {
            translation: self.translation.to_array(),
            rotation: self.rotation.to_array(),
            scale: self.scale.to_array(),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// On-disk transform layout
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub(crate) struct TransformRecord {
    pub translation: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl From<TransformRecord> for Transform {
    fn from(record: TransformRecord) -> Self {
        Transform {
            translation: Vec3::from_array(record.translation),
            rotation: Quat::from_array(record.rotation).normalize(),
            scale: Vec3::from_array(record.scale),
        }
    }
}

/// Structure-of-arrays pose, one entry per joint
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pose {
    pub translations: Vec<Vec3>,
    pub rotations: Vec<Quat>,
    pub scales: Vec<Vec3>,
}

impl Pose {
    /// Identity pose for `joint_count` joints
    pub fn with_joints(joint_count: usize) -> Self {
        Self {
            translations: vec![Vec3::ZERO; joint_count],
            rotations: vec![Quat::IDENTITY; joint_count],
            scales: vec![Vec3::ONE; joint_count],
        }
    }

    /// Bind pose of a skeleton
    pub fn rest(skeleton: &Skeleton) -> Self {
        let mut pose = Self::with_joints(0);
        for transform in skeleton.rest_pose() {
            pose.push(*transform);
        }
        pose
    }

    pub fn len(&self) -> usize {
        self.translations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }

    /// Resize to `joint_count` joints, filling new entries with identity
    pub fn resize(&mut self, joint_count: usize) {
        self.translations.resize(joint_count, Vec3::ZERO);
        self.rotations.resize(joint_count, Quat::IDENTITY);
        self.scales.resize(joint_count, Vec3::ONE);
    }

    pub fn get(&self, joint: usize) -> Option<Transform> {
        Some(Transform {
            translation: *self.translations.get(joint)?,
            rotation: *self.rotations.get(joint)?,
            scale: *self.scales.get(joint)?,
        })
    }

    pub fn set(&mut self, joint: usize, transform: Transform) {
        self.translations[joint] = transform.translation;
        self.rotations[joint] = transform.rotation;
        self.scales[joint] = transform.scale;
    }

    fn push(&mut self, transform: Transform) {
        self.translations.push(transform.translation);
        self.rotations.push(transform.rotation);
        self.scales.push(transform.scale);
    }
}

/// Convert a local-space pose into one model-space matrix per joint.
///
/// Parents are evaluated before their children regardless of joint order.
pub fn local_to_model(
    skeleton: &Skeleton,
    pose: &Pose,
    out: &mut Vec<Mat4>,
) -> Result<(), AnimationError> {
    let joints = skeleton.num_joints();
    if pose.len() != joints {
        return Err(AnimationError::TrackCountMismatch {
            tracks: pose.len(),
            joints,
        });
    }

    out.clear();
    out.resize(joints, Mat4::IDENTITY);

    for &joint in skeleton.evaluation_order() {
        let local = Mat4::from_scale_rotation_translation(
            pose.scales[joint],
            pose.rotations[joint],
            pose.translations[joint],
        );
        out[joint] = match skeleton.parent(joint) {
            Some(parent) => out[parent] * local,
            None => local,
        };
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::animation::Joint;
    use approx::assert_relative_eq;

    fn chain() -> Skeleton {
        // Child listed before its parent on purpose
        Skeleton::new(
            vec![
                Joint::new("hand", Some(2)),
                Joint::new("root", None),
                Joint::new("arm", Some(1)),
            ],
            vec![
                Transform::from_translation(Vec3::new(0.0, 2.0, 0.0)),
                Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)),
                Transform::from_translation(Vec3::new(0.0, 5.0, 0.0)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_transform_record_layout() {
        assert_eq!(std::mem::size_of::<TransformRecord>(), 40);
    }

    #[test]
    fn test_rest_pose_matches_skeleton() {
        let skeleton = chain();
        let pose = Pose::rest(&skeleton);
        assert_eq!(pose.len(), 3);
        assert_eq!(pose.translations[1], Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_local_to_model_accumulates_parents() {
        let skeleton = chain();
        let pose = Pose::rest(&skeleton);
        let mut matrices = Vec::new();
        local_to_model(&skeleton, &pose, &mut matrices).unwrap();

        let hand = matrices[0].w_axis.truncate();
        assert_relative_eq!(hand.x, 10.0);
        assert_relative_eq!(hand.y, 7.0);
    }

    #[test]
    fn test_local_to_model_applies_parent_rotation() {
        let skeleton = chain();
        let mut pose = Pose::rest(&skeleton);
        pose.rotations[1] = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let mut matrices = Vec::new();
        local_to_model(&skeleton, &pose, &mut matrices).unwrap();

        // Arm points along +y in root space, rotated onto -x
        let hand = matrices[0].w_axis.truncate();
        assert_relative_eq!(hand.x, 3.0, epsilon = 1e-5);
        assert_relative_eq!(hand.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_local_to_model_rejects_wrong_size() {
        let skeleton = chain();
        let pose = Pose::with_joints(2);
        let mut matrices = Vec::new();
        assert!(matches!(
            local_to_model(&skeleton, &pose, &mut matrices),
            Err(AnimationError::TrackCountMismatch {
                tracks: 2,
                joints: 3
            })
        ));
    }

    #[test]
    fn test_interpolate_midpoint() {
        let a = Transform::IDENTITY;
        let b = Transform {
            translation: Vec3::new(2.0, 0.0, 0.0),
            rotation: Quat::from_rotation_z(1.0),
            scale: Vec3::splat(3.0),
        };
        let mid = a.interpolate(&b, 0.5);
        assert_relative_eq!(mid.translation.x, 1.0);
        assert_relative_eq!(mid.scale.y, 2.0);
        assert_relative_eq!(mid.rotation.angle_between(Quat::IDENTITY), 0.5, epsilon = 1e-5);
    }
}
