// Animation state machine with cross-fade transitions

use super::blender::AnimationBlender;
use super::clip::{ClipId, ClipLibrary};
use super::pose::Pose;
use super::{AnimationError, Skeleton};
use std::collections::HashMap;
use std::sync::Arc;

/// Blend time used when no transition is registered for a pair of states
pub const DEFAULT_TRANSITION_DURATION: f32 = 0.3;

/// A named state playing one clip
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    pub name: String,
    pub clip: ClipId,
    pub looping: bool,
    pub speed: f32,
}

/// Directed edge between two states
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTransition {
    pub from: String,
    pub to: String,
    /// Cross-fade length in seconds
    pub duration: f32,
    /// Whether another transition may cut this one short
    pub interruptible: bool,
}

/// In-flight cross-fade
#[derive(Debug, Clone)]
struct ActiveTransition {
    target: String,
    elapsed: f32,
    duration: f32,
    interruptible: bool,
}

/// Drives clips through named states.
///
/// Clips live in a [`ClipLibrary`] owned by the caller; every method that
/// touches playback takes the library explicitly.
#[derive(Debug, Default)]
pub struct AnimationController {
    skeleton: Option<Arc<Skeleton>>,
    states: HashMap<String, AnimationState>,
    state_order: Vec<String>,
    transitions: Vec<AnimationTransition>,
    current: Option<String>,
    default_state: Option<String>,
    transition: Option<ActiveTransition>,
}

impl AnimationController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self, skeleton: Arc<Skeleton>) {
        log::debug!(
            "Animation controller bound to skeleton with {} joints",
            skeleton.num_joints()
        );
        self.skeleton = Some(skeleton);
    }

    pub fn is_initialized(&self) -> bool {
        self.skeleton.is_some()
    }

    /// Register (or replace) a state and configure its clip's looping and speed
    pub fn register_state(
        &mut self,
        clips: &mut ClipLibrary,
        name: &str,
        clip: ClipId,
        looping: bool,
        speed: f32,
    ) -> Result<(), AnimationError> {
        let animation = clips.get_mut(clip).ok_or_else(|| {
            log::warn!("Cannot register state '{}' with an unknown clip", name);
            AnimationError::UnknownClip(format!("{:?}", clip))
        })?;
        animation.set_looping(looping);
        animation.set_playback_speed(speed);

        let state = AnimationState {
            name: name.to_string(),
            clip,
            looping,
            speed,
        };
        if self.states.insert(name.to_string(), state).is_none() {
            self.state_order.push(name.to_string());
        }

        log::info!(
            "Registered animation state '{}' (loop: {}, speed: {})",
            name,
            looping,
            speed
        );
        Ok(())
    }

    /// Register a transition between two known states. A second transition
    /// for the same pair is rejected.
    pub fn register_transition(
        &mut self,
        from: &str,
        to: &str,
        duration: f32,
        interruptible: bool,
    ) -> Result<(), AnimationError> {
        for name in [from, to] {
            if !self.states.contains_key(name) {
                log::warn!("Transition {} -> {} names unknown state '{}'", from, to, name);
                return Err(AnimationError::UnknownState(name.to_string()));
            }
        }
        if self.find_transition(from, to).is_some() {
            return Err(AnimationError::DuplicateTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        self.transitions.push(AnimationTransition {
            from: from.to_string(),
            to: to.to_string(),
            duration,
            interruptible,
        });
        log::info!("Registered transition {} -> {} ({}s)", from, to, duration);
        Ok(())
    }

    /// Choose the state `reset` returns to. If nothing is playing yet the
    /// state becomes current and its clip starts.
    pub fn set_default_state(
        &mut self,
        clips: &mut ClipLibrary,
        name: &str,
    ) -> Result<(), AnimationError> {
        let clip = self
            .clip_of(name)
            .ok_or_else(|| AnimationError::UnknownState(name.to_string()))?;

        self.default_state = Some(name.to_string());
        if self.current.is_none() {
            self.current = Some(name.to_string());
            if let Some(clip) = clips.get_mut(clip) {
                clip.play();
            }
        }

        log::info!("Default animation state set to '{}'", name);
        Ok(())
    }

    /// Request a change of state. Returns `false` when the request is ignored.
    ///
    /// Uses the registered transition's duration when one exists (refusing to
    /// cut short a non-interruptible cross-fade), otherwise the default blend.
    pub fn transition_to(&mut self, clips: &mut ClipLibrary, name: &str, force: bool) -> bool {
        let Some(target_clip) = self.clip_of(name) else {
            log::warn!("Cannot transition to unknown state '{}'", name);
            return false;
        };

        let Some(current) = self.current.clone() else {
            // Nothing playing yet: switch without blending
            self.current = Some(name.to_string());
            restart(clips, target_clip);
            return true;
        };

        if current == name && !force {
            return false;
        }
        if self
            .transition
            .as_ref()
            .map_or(false, |active| active.target == name)
        {
            return false;
        }

        let (duration, interruptible) = match self.find_transition(&current, name) {
            Some(transition) => {
                if self
                    .transition
                    .as_ref()
                    .map_or(false, |active| !active.interruptible)
                {
                    log::debug!("Transition into '{}' is not interruptible", current);
                    return false;
                }
                (transition.duration, transition.interruptible)
            }
            None => (DEFAULT_TRANSITION_DURATION, true),
        };

        self.transition = Some(ActiveTransition {
            target: name.to_string(),
            elapsed: 0.0,
            duration,
            interruptible,
        });
        restart(clips, target_clip);

        log::debug!("Transitioning {} -> {} ({}s)", current, name, duration);
        true
    }

    /// Advance the current clip and any cross-fade in progress
    pub fn update(&mut self, clips: &mut ClipLibrary, dt: f32) {
        let Some(current_clip) = self.current.as_deref().and_then(|name| self.clip_of(name)) else {
            return;
        };
        if let Some(clip) = clips.get_mut(current_clip) {
            clip.update(dt);
        }

        let Some(active) = self.transition.as_mut() else {
            return;
        };
        let Some(target_clip) = self.states.get(&active.target).map(|state| state.clip) else {
            log::warn!("Transition target '{}' vanished, cancelling", active.target);
            self.transition = None;
            return;
        };

        // A forced re-entry shares one clip, which already advanced above
        if target_clip != current_clip {
            if let Some(clip) = clips.get_mut(target_clip) {
                clip.update(dt);
            }
        }
        active.elapsed += dt;

        if active.elapsed >= active.duration {
            let target = active.target.clone();
            self.transition = None;
            if current_clip != target_clip {
                if let Some(clip) = clips.get_mut(current_clip) {
                    clip.pause();
                }
            }
            log::debug!("Transition complete, now in '{}'", target);
            self.current = Some(target);
        }
    }

    /// Local-space pose for this tick, cross-fading while a transition runs
    pub fn output(&mut self, clips: &ClipLibrary, out: &mut Pose) -> Result<(), AnimationError> {
        let skeleton = self.skeleton.clone().ok_or(AnimationError::NotInitialized)?;

        let current_name = self
            .current
            .as_deref()
            .ok_or_else(|| AnimationError::UnknownState("<none>".to_string()))?;
        let current = self
            .clip_of(current_name)
            .and_then(|id| clips.get(id))
            .ok_or_else(|| AnimationError::UnknownState(current_name.to_string()))?;

        let Some(active) = self.transition.as_ref() else {
            return current.sample(&skeleton, out);
        };

        let target = self
            .clip_of(&active.target)
            .and_then(|id| clips.get(id))
            .filter(|clip| clip.is_valid());
        match target {
            Some(target) => {
                AnimationBlender::blend_two(&skeleton, current, target, self.transition_progress(), out)
            }
            None => {
                log::warn!("Transition target '{}' unusable, cancelling", active.target);
                self.transition = None;
                current.sample(&skeleton, out)
            }
        }
    }

    /// Cancel any transition and restart the default state from time zero
    pub fn reset(&mut self, clips: &mut ClipLibrary) {
        self.transition = None;

        if let Some(default) = self.default_state.clone() {
            if let Some(clip) = self.clip_of(&default) {
                restart(clips, clip);
            }
            self.current = Some(default);
        }
    }

    /// Cross-fade progress in `[0, 1]`; 1.0 when idle
    pub fn transition_progress(&self) -> f32 {
        match &self.transition {
            Some(active) if active.duration > 0.0 => (active.elapsed / active.duration).min(1.0),
            _ => 1.0,
        }
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    pub fn current_state(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn target_state(&self) -> Option<&str> {
        self.transition.as_ref().map(|active| active.target.as_str())
    }

    pub fn default_state(&self) -> Option<&str> {
        self.default_state.as_deref()
    }

    /// Clip of the current state
    pub fn current_clip(&self) -> Option<ClipId> {
        self.current.as_deref().and_then(|name| self.clip_of(name))
    }

    pub fn state(&self, name: &str) -> Option<&AnimationState> {
        self.states.get(name)
    }

    pub fn has_state(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// State names in registration order
    pub fn state_names(&self) -> Vec<&str> {
        self.state_order.iter().map(String::as_str).collect()
    }

    pub fn find_transition(&self, from: &str, to: &str) -> Option<&AnimationTransition> {
        self.transitions
            .iter()
            .find(|transition| transition.from == from && transition.to == to)
    }

    fn clip_of(&self, state: &str) -> Option<ClipId> {
        self.states.get(state).map(|state| state.clip)
    }
}

fn restart(clips: &mut ClipLibrary, id: ClipId) {
    if let Some(clip) = clips.get_mut(id) {
        clip.reset();
        clip.play();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::animation::{AnimationClip, AnimationData, Joint, Keyframe, Transform};
    use approx::assert_relative_eq;
    use glam::Vec3;

    fn skeleton() -> Arc<Skeleton> {
        Arc::new(Skeleton::new(vec![Joint::new("root", None)], vec![Transform::IDENTITY]).unwrap())
    }

    fn held(name: &str, x: f32) -> AnimationClip {
        let key = Keyframe::new(0.0, Transform::from_translation(Vec3::new(x, 0.0, 0.0)));
        AnimationClip::from_data(name, Arc::new(AnimationData::new(1.0, vec![vec![key]]).unwrap()))
    }

    fn setup() -> (AnimationController, ClipLibrary) {
        let mut clips = ClipLibrary::new();
        let idle = clips.insert(held("idle", 0.0)).unwrap();
        let walk = clips.insert(held("walk", 10.0)).unwrap();
        let jab = clips.insert(held("jab", 20.0)).unwrap();

        let mut controller = AnimationController::new();
        controller.initialize(skeleton());
        controller.register_state(&mut clips, "idle", idle, true, 1.0).unwrap();
        controller.register_state(&mut clips, "walk", walk, true, 1.0).unwrap();
        controller.register_state(&mut clips, "jab", jab, false, 2.0).unwrap();
        controller.set_default_state(&mut clips, "idle").unwrap();
        (controller, clips)
    }

    #[test]
    fn test_register_state_configures_clip() {
        let (controller, clips) = setup();
        let jab = clips.get(controller.state("jab").unwrap().clip).unwrap();
        assert!(!jab.is_looping());
        assert_eq!(jab.playback_speed(), 2.0);
        assert_eq!(controller.state_names(), vec!["idle", "walk", "jab"]);
    }

    #[test]
    fn test_default_state_becomes_current() {
        let (controller, clips) = setup();
        assert_eq!(controller.current_state(), Some("idle"));
        let idle = controller.current_clip().unwrap();
        assert!(clips.get(idle).unwrap().is_playing());
        assert!(!controller.is_transitioning());
        assert_eq!(controller.transition_progress(), 1.0);
    }

    #[test]
    fn test_transition_to_rules() {
        let (mut controller, mut clips) = setup();
        assert!(!controller.transition_to(&mut clips, "crouch", false));
        assert!(!controller.transition_to(&mut clips, "idle", false));

        assert!(controller.transition_to(&mut clips, "walk", false));
        assert_eq!(controller.target_state(), Some("walk"));
        // Same target again is ignored
        assert!(!controller.transition_to(&mut clips, "walk", false));
    }

    #[test]
    fn test_forced_reentry_restarts_clip() {
        let (mut controller, mut clips) = setup();
        controller.update(&mut clips, 0.4);
        assert!(controller.transition_to(&mut clips, "idle", true));

        let idle = controller.current_clip().unwrap();
        assert_eq!(clips.get(idle).unwrap().playback_time(), 0.0);

        controller.update(&mut clips, 0.5);
        assert!(!controller.is_transitioning());
        assert!(clips.get(idle).unwrap().is_playing());
    }

    #[test]
    fn test_forced_reentry_advances_clip_once() {
        let (mut controller, mut clips) = setup();
        controller.update(&mut clips, 0.4);
        assert!(controller.transition_to(&mut clips, "idle", true));

        controller.update(&mut clips, 0.1);
        assert!(controller.is_transitioning());
        let idle = controller.current_clip().unwrap();
        assert_relative_eq!(clips.get(idle).unwrap().playback_time(), 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_fallback_duration() {
        let (mut controller, mut clips) = setup();
        controller.transition_to(&mut clips, "walk", false);
        controller.update(&mut clips, 0.15);
        assert_relative_eq!(controller.transition_progress(), 0.5, epsilon = 1e-5);
    }

    #[test]
    fn test_registered_duration_and_completion() {
        let (mut controller, mut clips) = setup();
        controller.register_transition("idle", "jab", 0.1, true).unwrap();
        controller.transition_to(&mut clips, "jab", false);

        controller.update(&mut clips, 0.05);
        assert_relative_eq!(controller.transition_progress(), 0.5, epsilon = 1e-5);

        controller.update(&mut clips, 0.05);
        assert_eq!(controller.current_state(), Some("jab"));
        assert!(!controller.is_transitioning());

        let idle = controller.state("idle").unwrap().clip;
        assert!(!clips.get(idle).unwrap().is_playing());
    }

    #[test]
    fn test_non_interruptible_transition() {
        let (mut controller, mut clips) = setup();
        controller.register_transition("idle", "jab", 0.2, false).unwrap();
        controller.register_transition("idle", "walk", 0.2, true).unwrap();

        assert!(controller.transition_to(&mut clips, "jab", false));
        assert!(!controller.transition_to(&mut clips, "walk", false));
        assert_eq!(controller.target_state(), Some("jab"));
    }

    #[test]
    fn test_interruptible_transition_is_replaced() {
        let (mut controller, mut clips) = setup();
        controller.register_transition("idle", "walk", 0.2, true).unwrap();
        controller.register_transition("idle", "jab", 0.2, true).unwrap();

        controller.transition_to(&mut clips, "walk", false);
        controller.update(&mut clips, 0.1);
        assert!(controller.transition_to(&mut clips, "jab", false));
        assert_eq!(controller.target_state(), Some("jab"));
        assert_eq!(controller.transition_progress(), 0.0);
    }

    #[test]
    fn test_output_blends_during_transition() {
        let (mut controller, mut clips) = setup();
        controller.register_transition("idle", "walk", 0.2, true).unwrap();
        controller.transition_to(&mut clips, "walk", false);
        controller.update(&mut clips, 0.1);

        let mut pose = Pose::default();
        controller.output(&clips, &mut pose).unwrap();
        assert_relative_eq!(pose.translations[0].x, 5.0, epsilon = 1e-4);

        controller.update(&mut clips, 0.1);
        controller.output(&clips, &mut pose).unwrap();
        assert_relative_eq!(pose.translations[0].x, 10.0);
    }

    #[test]
    fn test_output_requires_skeleton() {
        let mut clips = ClipLibrary::new();
        let idle = clips.insert(held("idle", 0.0)).unwrap();
        let mut controller = AnimationController::new();
        controller.register_state(&mut clips, "idle", idle, true, 1.0).unwrap();
        controller.set_default_state(&mut clips, "idle").unwrap();

        let mut pose = Pose::default();
        assert!(matches!(
            controller.output(&clips, &mut pose),
            Err(AnimationError::NotInitialized)
        ));
    }

    #[test]
    fn test_reset_returns_to_default() {
        let (mut controller, mut clips) = setup();
        controller.transition_to(&mut clips, "walk", false);
        controller.update(&mut clips, 1.0);
        assert_eq!(controller.current_state(), Some("walk"));

        controller.transition_to(&mut clips, "jab", false);
        controller.reset(&mut clips);
        assert_eq!(controller.current_state(), Some("idle"));
        assert!(!controller.is_transitioning());
        let idle = controller.current_clip().unwrap();
        assert_eq!(clips.get(idle).unwrap().playback_time(), 0.0);
        assert!(clips.get(idle).unwrap().is_playing());
    }

    #[test]
    fn test_register_transition_errors() {
        let (mut controller, _) = setup();
        assert!(matches!(
            controller.register_transition("idle", "fly", 0.1, true),
            Err(AnimationError::UnknownState(_))
        ));
        controller.register_transition("idle", "walk", 0.1, true).unwrap();
        assert!(matches!(
            controller.register_transition("idle", "walk", 0.5, false),
            Err(AnimationError::DuplicateTransition { .. })
        ));
        assert_eq!(controller.find_transition("idle", "walk").unwrap().duration, 0.1);
    }

    #[test]
    fn test_no_default_state_snaps() {
        let mut clips = ClipLibrary::new();
        let walk = clips.insert(held("walk", 10.0)).unwrap();
        let mut controller = AnimationController::new();
        controller.initialize(skeleton());
        controller.register_state(&mut clips, "walk", walk, true, 1.0).unwrap();

        assert_eq!(controller.current_state(), None);
        assert!(controller.transition_to(&mut clips, "walk", false));
        assert_eq!(controller.current_state(), Some("walk"));
        assert!(!controller.is_transitioning());
    }
}
