// Skeletal animation
//
// Data flows leaf first:
// - Skeleton: immutable joint hierarchy plus bind pose
// - AnimationClip: keyframe data plus a playback cursor
// - AnimationBlender: weighted mix of several clips into one pose
// - AnimationController: named states with timed cross-fades
// - CharacterAnimator: per-character facade producing model-space matrices

mod animator;
mod blender;
mod clip;
mod controller;
mod pose;
mod skeleton;

pub use animator::CharacterAnimator;
pub use blender::{AnimationBlender, AnimationLayer};
pub use clip::{AnimationClip, AnimationData, ClipId, ClipLibrary, Keyframe};
pub use controller::{
    AnimationController, AnimationState, AnimationTransition, DEFAULT_TRANSITION_DURATION,
};
pub use pose::{local_to_model, Pose, Transform};
pub use skeleton::{Joint, Skeleton};

use crate::engine::assets::AssetError;

/// Animation pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum AnimationError {
    #[error("Animator used before a skeleton was loaded")]
    NotInitialized,

    #[error("Invalid skeleton: {0}")]
    InvalidSkeleton(String),

    #[error("Invalid animation clip: {0}")]
    InvalidClip(String),

    #[error("Animation has {tracks} tracks but skeleton has {joints} joints")]
    TrackCountMismatch { tracks: usize, joints: usize },

    #[error("Unknown animation clip: {0}")]
    UnknownClip(String),

    #[error("Unknown animation state: {0}")]
    UnknownState(String),

    #[error("Animation '{0}' is already loaded")]
    DuplicateAnimation(String),

    #[error("Transition {from} -> {to} is already registered")]
    DuplicateTransition { from: String, to: String },

    #[error("Blender has no layers")]
    NoLayers,

    #[error("No blend layer could be sampled")]
    NoValidLayers,

    #[error("Layer index {index} out of bounds ({count} layers)")]
    LayerIndexOutOfBounds { index: usize, count: usize },

    #[error("Joint weight mask has {got} entries, expected {expected}")]
    JointWeightCount { got: usize, expected: usize },

    #[error(transparent)]
    Asset(#[from] AssetError),
}
