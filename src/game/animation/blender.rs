// Weighted pose blending

use super::clip::{AnimationClip, ClipId, ClipLibrary};
use super::pose::{Pose, Transform};
use super::{AnimationError, Skeleton};
use crate::core::math;
use glam::{Quat, Vec3};

/// Below this accumulated weight the bind pose fills in the remainder
const BIND_POSE_THRESHOLD: f32 = 0.1;

/// One weighted input of a blend
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationLayer {
    pub clip: ClipId,
    /// Layer weight in `[0, 1]`
    pub weight: f32,
    /// Optional per-joint multipliers; empty means every joint at 1.0
    pub joint_weights: Vec<f32>,
}

impl AnimationLayer {
    pub fn new(clip: ClipId, weight: f32) -> Self {
        Self {
            clip,
            weight: math::clamp(weight, 0.0, 1.0),
            joint_weights: Vec::new(),
        }
    }
}

struct BlendInput<'a> {
    pose: &'a Pose,
    weight: f32,
    joint_weights: &'a [f32],
}

/// Mixes any number of clip samples into one pose
#[derive(Debug, Default)]
pub struct AnimationBlender {
    joint_count: usize,
    layers: Vec<AnimationLayer>,
    scratch: Vec<Pose>,
}

impl AnimationBlender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size internal buffers for `skeleton`. Must be called before blending.
    pub fn initialize(&mut self, skeleton: &Skeleton) {
        self.joint_count = skeleton.num_joints();
        for buffer in &mut self.scratch {
            buffer.resize(self.joint_count);
        }
        log::debug!("Blender initialized for {} joints", self.joint_count);
    }

    pub fn is_initialized(&self) -> bool {
        self.joint_count > 0
    }

    /// Append a layer and return its index. Ids not in `clips` are rejected.
    pub fn add_layer(
        &mut self,
        clips: &ClipLibrary,
        clip: ClipId,
        weight: f32,
    ) -> Result<usize, AnimationError> {
        if !clips.contains(clip) {
            log::warn!("Cannot add unknown clip {:?} as a blend layer", clip);
            return Err(AnimationError::UnknownClip(format!("{:?}", clip)));
        }

        self.layers.push(AnimationLayer::new(clip, weight));
        Ok(self.layers.len() - 1)
    }

    pub fn clear_layers(&mut self) {
        self.layers.clear();
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer(&self, index: usize) -> Option<&AnimationLayer> {
        self.layers.get(index)
    }

    /// Set a layer's weight, clamped to `[0, 1]`
    pub fn set_layer_weight(&mut self, index: usize, weight: f32) -> Result<(), AnimationError> {
        let count = self.layers.len();
        let layer = self
            .layers
            .get_mut(index)
            .ok_or(AnimationError::LayerIndexOutOfBounds { index, count })?;
        layer.weight = math::clamp(weight, 0.0, 1.0);
        Ok(())
    }

    /// Weight of a layer, zero when the index is out of range
    pub fn layer_weight(&self, index: usize) -> f32 {
        self.layers.get(index).map_or(0.0, |layer| layer.weight)
    }

    /// Install a per-joint mask. An empty vector removes the mask.
    pub fn set_layer_joint_weights(
        &mut self,
        index: usize,
        joint_weights: Vec<f32>,
    ) -> Result<(), AnimationError> {
        let count = self.layers.len();
        if index >= count {
            return Err(AnimationError::LayerIndexOutOfBounds { index, count });
        }
        if !joint_weights.is_empty() && joint_weights.len() != self.joint_count {
            return Err(AnimationError::JointWeightCount {
                got: joint_weights.len(),
                expected: self.joint_count,
            });
        }

        self.layers[index].joint_weights = joint_weights;
        Ok(())
    }

    /// Blend every layer into `out`.
    ///
    /// A single layer is sampled directly. With several layers, any layer whose
    /// clip is invalid or fails to sample is dropped from this blend; the call
    /// only fails when none survive.
    pub fn blend(
        &mut self,
        clips: &ClipLibrary,
        skeleton: &Skeleton,
        out: &mut Pose,
    ) -> Result<(), AnimationError> {
        if !self.is_initialized() {
            return Err(AnimationError::NotInitialized);
        }
        if self.layers.is_empty() {
            return Err(AnimationError::NoLayers);
        }

        if self.layers.len() == 1 {
            let clip = clips
                .get(self.layers[0].clip)
                .filter(|clip| clip.is_valid())
                .ok_or(AnimationError::NoValidLayers)?;
            return clip.sample(skeleton, out);
        }

        if self.scratch.len() < self.layers.len() {
            let joints = self.joint_count;
            self.scratch
                .resize_with(self.layers.len(), || Pose::with_joints(joints));
        }

        let mut sampled = vec![false; self.layers.len()];
        for (index, layer) in self.layers.iter().enumerate() {
            let Some(clip) = clips.get(layer.clip).filter(|clip| clip.is_valid()) else {
                continue;
            };
            match clip.sample(skeleton, &mut self.scratch[index]) {
                Ok(()) => sampled[index] = true,
                Err(err) => log::warn!("Dropping blend layer {}: {}", index, err),
            }
        }

        let inputs: Vec<BlendInput> = self
            .layers
            .iter()
            .zip(&self.scratch)
            .zip(&sampled)
            .filter(|(_, ok)| **ok)
            .map(|((layer, pose), _)| BlendInput {
                pose,
                weight: layer.weight,
                joint_weights: &layer.joint_weights,
            })
            .collect();

        if inputs.is_empty() {
            return Err(AnimationError::NoValidLayers);
        }

        blend_poses(skeleton, &inputs, out);
        Ok(())
    }

    /// Cross-fade two clips with weights `(1 - factor, factor)`, factor clamped to `[0, 1]`
    pub fn blend_two(
        skeleton: &Skeleton,
        clip_a: &AnimationClip,
        clip_b: &AnimationClip,
        factor: f32,
        out: &mut Pose,
    ) -> Result<(), AnimationError> {
        for clip in [clip_a, clip_b] {
            if !clip.is_valid() {
                return Err(AnimationError::InvalidClip(clip.name().to_string()));
            }
        }

        let factor = math::clamp(factor, 0.0, 1.0);
        let mut pose_a = Pose::default();
        let mut pose_b = Pose::default();
        clip_a.sample(skeleton, &mut pose_a)?;
        clip_b.sample(skeleton, &mut pose_b)?;

        let inputs = [
            BlendInput {
                pose: &pose_a,
                weight: 1.0 - factor,
                joint_weights: &[],
            },
            BlendInput {
                pose: &pose_b,
                weight: factor,
                joint_weights: &[],
            },
        ];
        blend_poses(skeleton, &inputs, out);
        Ok(())
    }
}

/// Running weighted sum for one joint
struct JointAccumulator {
    total: f32,
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
    reference: Option<Quat>,
}

impl JointAccumulator {
    fn new() -> Self {
        Self {
            total: 0.0,
            translation: Vec3::ZERO,
            rotation: Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
            scale: Vec3::ZERO,
            reference: None,
        }
    }

    fn add(&mut self, transform: Transform, weight: f32) {
        // Keep every rotation in the same hemisphere as the first one
        let rotation = match self.reference {
            Some(first) if first.dot(transform.rotation) < 0.0 => -transform.rotation,
            Some(_) => transform.rotation,
            None => {
                self.reference = Some(transform.rotation);
                transform.rotation
            }
        };

        self.translation += transform.translation * weight;
        self.scale += transform.scale * weight;
        self.rotation = self.rotation + rotation * weight;
        self.total += weight;
    }

    fn finish(&self) -> Transform {
        Transform {
            translation: self.translation / self.total,
            rotation: self.rotation.normalize(),
            scale: self.scale / self.total,
        }
    }
}

/// Normalized weighted average per joint, topped up with the bind pose when
/// the accumulated weight is too small
fn blend_poses(skeleton: &Skeleton, inputs: &[BlendInput], out: &mut Pose) {
    let joints = skeleton.num_joints();
    out.resize(joints);

    for joint in 0..joints {
        let mut acc = JointAccumulator::new();

        for input in inputs {
            let mask = input.joint_weights.get(joint).copied().unwrap_or(1.0);
            let weight = input.weight * mask;
            if weight <= 0.0 {
                continue;
            }
            if let Some(transform) = input.pose.get(joint) {
                acc.add(transform, weight);
            }
        }

        if acc.total < BIND_POSE_THRESHOLD {
            acc.add(skeleton.rest_pose()[joint], BIND_POSE_THRESHOLD - acc.total);
        }

        out.set(joint, acc.finish());
    }
}
