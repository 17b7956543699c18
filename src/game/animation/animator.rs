// Per-character animation facade

use super::clip::{AnimationClip, AnimationData, ClipId, ClipLibrary};
use super::controller::AnimationController;
use super::pose::{local_to_model, Pose};
use super::{AnimationError, Skeleton};
use glam::{Mat4, Vec3};
use std::path::Path;
use std::sync::Arc;

/// Binds a skeleton, its clips and a state machine together and keeps a
/// model-space matrix per joint up to date.
#[derive(Debug, Default)]
pub struct CharacterAnimator {
    skeleton: Option<Arc<Skeleton>>,
    clips: ClipLibrary,
    controller: AnimationController,
    local_pose: Pose,
    model_matrices: Vec<Mat4>,
}

impl CharacterAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Animator over an already loaded skeleton
    pub fn from_skeleton(skeleton: Arc<Skeleton>) -> Self {
        let mut animator = Self::new();
        animator.bind_skeleton(skeleton);
        animator
    }

    /// Load the skeleton at `path` and prepare pose buffers
    pub fn initialize<P: AsRef<Path>>(&mut self, skeleton_path: P) -> Result<(), AnimationError> {
        let skeleton = Skeleton::load(skeleton_path)?;
        self.bind_skeleton(Arc::new(skeleton));
        Ok(())
    }

    fn bind_skeleton(&mut self, skeleton: Arc<Skeleton>) {
        self.controller.initialize(skeleton.clone());
        self.local_pose = Pose::rest(&skeleton);
        // Rest pose always matches the skeleton, so this cannot fail
        if let Err(err) = local_to_model(&skeleton, &self.local_pose, &mut self.model_matrices) {
            log::warn!("Rest pose conversion failed: {}", err);
        }

        log::info!("Animator initialized with {} joints", skeleton.num_joints());
        self.skeleton = Some(skeleton);
    }

    pub fn is_initialized(&self) -> bool {
        self.skeleton.is_some()
    }

    fn require_initialized(&self) -> Result<(), AnimationError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(AnimationError::NotInitialized)
        }
    }

    /// Load an animation archive under `name`
    pub fn load_animation<P: AsRef<Path>>(
        &mut self,
        name: &str,
        path: P,
    ) -> Result<ClipId, AnimationError> {
        self.require_initialized()?;
        if self.clips.find(name).is_some() {
            return Err(AnimationError::DuplicateAnimation(name.to_string()));
        }

        let mut clip = AnimationClip::from_file(path)?;
        clip.set_name(name);
        self.clips.insert(clip)
    }

    /// Register in-memory animation data under `name`
    pub fn add_animation(
        &mut self,
        name: &str,
        data: Arc<AnimationData>,
    ) -> Result<ClipId, AnimationError> {
        self.require_initialized()?;
        self.clips.insert(AnimationClip::from_data(name, data))
    }

    /// Expose a loaded animation as a controller state
    pub fn register_animation_state(
        &mut self,
        state: &str,
        animation: &str,
        looping: bool,
        speed: f32,
    ) -> Result<(), AnimationError> {
        self.require_initialized()?;
        let clip = self
            .clips
            .find(animation)
            .ok_or_else(|| AnimationError::UnknownClip(animation.to_string()))?;
        self.controller
            .register_state(&mut self.clips, state, clip, looping, speed)
    }

    pub fn register_state_transition(
        &mut self,
        from: &str,
        to: &str,
        duration: f32,
        interruptible: bool,
    ) -> Result<(), AnimationError> {
        self.require_initialized()?;
        self.controller
            .register_transition(from, to, duration, interruptible)
    }

    pub fn set_default_state(&mut self, state: &str) -> Result<(), AnimationError> {
        self.require_initialized()?;
        self.controller.set_default_state(&mut self.clips, state)
    }

    /// Request a state change; `false` if the controller ignored it
    pub fn play_state(&mut self, state: &str, force_restart: bool) -> bool {
        if !self.is_initialized() {
            log::warn!("play_state('{}') before initialization", state);
            return false;
        }
        self.controller
            .transition_to(&mut self.clips, state, force_restart)
    }

    pub fn current_state(&self) -> Option<&str> {
        self.controller.current_state()
    }

    pub fn is_transitioning(&self) -> bool {
        self.controller.is_transitioning()
    }

    /// Advance playback and refresh the local pose and model matrices
    pub fn update(&mut self, dt: f32) -> Result<(), AnimationError> {
        let skeleton = self.skeleton.clone().ok_or(AnimationError::NotInitialized)?;

        self.controller.update(&mut self.clips, dt);
        self.controller.output(&self.clips, &mut self.local_pose)?;
        local_to_model(&skeleton, &self.local_pose, &mut self.model_matrices)
    }

    /// Cancel transitions and restart the default state
    pub fn reset(&mut self) {
        if self.is_initialized() {
            self.controller.reset(&mut self.clips);
        }
    }

    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.skeleton.as_ref()?.find_joint(name)
    }

    /// Model-space matrix of a bone
    pub fn bone_transform(&self, bone: usize) -> Option<&Mat4> {
        self.model_matrices.get(bone)
    }

    /// Model-space position of a bone (translation column)
    pub fn bone_position(&self, bone: usize) -> Option<Vec3> {
        self.bone_transform(bone).map(|matrix| matrix.w_axis.truncate())
    }

    /// Names of every loaded animation, in load order
    pub fn loaded_animations(&self) -> Vec<&str> {
        self.clips.names()
    }

    /// Clip currently driving the pose
    pub fn current_clip(&self) -> Option<&AnimationClip> {
        self.controller
            .current_clip()
            .and_then(|id| self.clips.get(id))
    }

    /// Frame index of the current clip at `frame_rate` frames per second
    pub fn current_frame(&self, frame_rate: f32) -> u32 {
        self.current_clip()
            .map_or(0, |clip| (clip.playback_time() * frame_rate).floor().max(0.0) as u32)
    }

    pub fn skeleton(&self) -> Option<&Arc<Skeleton>> {
        self.skeleton.as_ref()
    }

    pub fn local_pose(&self) -> &Pose {
        &self.local_pose
    }

    pub fn model_matrices(&self) -> &[Mat4] {
        &self.model_matrices
    }

    pub fn clips(&self) -> &ClipLibrary {
        &self.clips
    }

    pub fn controller(&self) -> &AnimationController {
        &self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::animation::{Joint, Keyframe, Transform};
    use approx::assert_relative_eq;

    fn rig() -> Arc<Skeleton> {
        Arc::new(
            Skeleton::new(
                vec![Joint::new("pelvis", None), Joint::new("fist", Some(0))],
                vec![
                    Transform::from_translation(Vec3::new(0.0, 40.0, 0.0)),
                    Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)),
                ],
            )
            .unwrap(),
        )
    }

    fn punch() -> Arc<AnimationData> {
        let pelvis = vec![Keyframe::new(
            0.0,
            Transform::from_translation(Vec3::new(0.0, 40.0, 0.0)),
        )];
        let fist = vec![
            Keyframe::new(0.0, Transform::from_translation(Vec3::new(10.0, 0.0, 0.0))),
            Keyframe::new(0.5, Transform::from_translation(Vec3::new(30.0, 0.0, 0.0))),
        ];
        Arc::new(AnimationData::new(0.5, vec![pelvis, fist]).unwrap())
    }

    fn stand() -> Arc<AnimationData> {
        let pelvis = vec![Keyframe::new(
            0.0,
            Transform::from_translation(Vec3::new(0.0, 40.0, 0.0)),
        )];
        let fist = vec![Keyframe::new(
            0.0,
            Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)),
        )];
        Arc::new(AnimationData::new(1.0, vec![pelvis, fist]).unwrap())
    }

    fn animator() -> CharacterAnimator {
        let mut animator = CharacterAnimator::from_skeleton(rig());
        animator.add_animation("stand", stand()).unwrap();
        animator.add_animation("punch", punch()).unwrap();
        animator
            .register_animation_state("idle", "stand", true, 1.0)
            .unwrap();
        animator
            .register_animation_state("jab", "punch", false, 1.0)
            .unwrap();
        animator.register_state_transition("idle", "jab", 0.0, false).unwrap();
        animator.set_default_state("idle").unwrap();
        animator
    }

    #[test]
    fn test_uninitialized_animator_fails_fast() {
        let mut animator = CharacterAnimator::new();
        assert!(matches!(
            animator.add_animation("stand", stand()),
            Err(AnimationError::NotInitialized)
        ));
        assert!(matches!(animator.update(0.016), Err(AnimationError::NotInitialized)));
        assert!(!animator.play_state("idle", false));
        assert_eq!(animator.find_bone("pelvis"), None);
    }

    #[test]
    fn test_duplicate_animation_rejected() {
        let mut animator = animator();
        assert!(matches!(
            animator.add_animation("punch", punch()),
            Err(AnimationError::DuplicateAnimation(_))
        ));
        assert_eq!(animator.loaded_animations(), vec!["stand", "punch"]);
    }

    #[test]
    fn test_rest_pose_bone_positions_before_update() {
        let animator = animator();
        let fist = animator.find_bone("fist").unwrap();
        let position = animator.bone_position(fist).unwrap();
        assert_relative_eq!(position.x, 10.0);
        assert_relative_eq!(position.y, 40.0);
        assert!(animator.bone_position(7).is_none());
    }

    #[test]
    fn test_update_moves_bones() {
        let mut animator = animator();
        assert!(animator.play_state("jab", false));
        // Zero-length transition completes on the first update
        animator.update(0.25).unwrap();
        assert_eq!(animator.current_state(), Some("jab"));

        animator.update(0.25).unwrap();
        let fist = animator.find_bone("fist").unwrap();
        let position = animator.bone_position(fist).unwrap();
        assert_relative_eq!(position.x, 30.0, epsilon = 1e-4);
        assert_relative_eq!(position.y, 40.0, epsilon = 1e-4);
    }

    #[test]
    fn test_current_frame() {
        let mut animator = animator();
        animator.play_state("jab", false);
        animator.update(0.0).unwrap();
        animator.update(0.1).unwrap();
        assert_eq!(animator.current_frame(60.0), 6);
    }

    #[test]
    fn test_unknown_animation_state() {
        let mut animator = animator();
        assert!(matches!(
            animator.register_animation_state("kick", "roundhouse", false, 1.0),
            Err(AnimationError::UnknownClip(_))
        ));
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut animator = animator();
        animator.play_state("jab", false);
        animator.update(0.1).unwrap();
        animator.reset();
        assert_eq!(animator.current_state(), Some("idle"));
        assert!(!animator.is_transitioning());
    }

    #[test]
    fn test_load_animation_from_disk() {
        let skeleton_path = std::env::temp_dir().join("arena_combat_animator_rig.skel");
        let anim_path = std::env::temp_dir().join("arena_combat_animator_punch.anim");
        std::fs::write(&skeleton_path, rig().to_archive_bytes()).unwrap();
        std::fs::write(&anim_path, punch().to_archive_bytes()).unwrap();

        let mut animator = CharacterAnimator::new();
        assert!(matches!(
            animator.load_animation("jab", &anim_path),
            Err(AnimationError::NotInitialized)
        ));

        animator.initialize(&skeleton_path).unwrap();
        let id = animator.load_animation("jab", &anim_path).unwrap();
        assert_eq!(animator.clips().get(id).unwrap().name(), "jab");
        assert!(animator.load_animation("jab", &anim_path).is_err());

        std::fs::remove_file(&skeleton_path).ok();
        std::fs::remove_file(&anim_path).ok();
    }
}
