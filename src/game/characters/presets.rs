// Procedural training fighter
//
// A tiny rig with hand-keyed clips and matching frame data, enough to run a
// sparring session without any asset files.

use crate::engine::physics::HitProperties;
use crate::game::animation::{
    AnimationData, AnimationError, CharacterAnimator, Joint, Keyframe, Skeleton, Transform,
};
use crate::game::combat::AttackType;
use crate::game::config::ArenaConfig;
use glam::{Quat, Vec2, Vec3};
use std::sync::Arc;

use super::character::FighterBlueprint;
use super::hitbox::{BodyArchetype, FrameData, HitboxData, HurtboxData};
use super::stats::FighterStats;

pub const IDLE: &str = "idle";
pub const JAB: &str = "jab";
pub const BLOCK: &str = "block";
pub const HIT: &str = "hit";

/// First and last frame with the jab hitbox out
pub const JAB_ACTIVE_START: usize = 6;
pub const JAB_ACTIVE_END: usize = 9;
pub const JAB_DAMAGE: f32 = 60.0;

const IDLE_DURATION: f32 = 1.0;
const JAB_DURATION: f32 = 0.5;
const BLOCK_DURATION: f32 = 0.5;
const HIT_DURATION: f32 = 0.4;

const JOINTS: [(&str, Option<usize>, [f32; 3]); 6] = [
    ("pelvis", None, [0.0, 40.0, 0.0]),
    ("torso", Some(0), [0.0, 20.0, 0.0]),
    ("head", Some(1), [0.0, 25.0, 0.0]),
    ("arm_r", Some(1), [10.0, 15.0, 0.0]),
    ("fist_r", Some(3), [15.0, 0.0, 0.0]),
    ("leg_l", Some(0), [-8.0, -20.0, 0.0]),
];

fn rest_transform(joint: usize) -> Transform {
    Transform::from_translation(Vec3::from_array(JOINTS[joint].2))
}

pub fn training_skeleton() -> Result<Skeleton, AnimationError> {
    let joints = JOINTS
        .iter()
        .map(|&(name, parent, _)| Joint::new(name, parent))
        .collect();
    let rest_pose = (0..JOINTS.len()).map(rest_transform).collect();
    Skeleton::new(joints, rest_pose)
}

/// One track per joint holding the rest pose, with `keys` overriding joints
fn clip(
    duration: f32,
    keys: &[(usize, Vec<Keyframe>)],
) -> Result<Arc<AnimationData>, AnimationError> {
    let tracks = (0..JOINTS.len())
        .map(|joint| {
            keys.iter()
                .find(|(keyed, _)| *keyed == joint)
                .map(|(_, frames)| frames.clone())
                .unwrap_or_else(|| vec![Keyframe::new(0.0, rest_transform(joint))])
        })
        .collect();
    AnimationData::new(duration, tracks).map(Arc::new)
}

fn offset_key(time: f32, joint: usize, offset: Vec3) -> Keyframe {
    let mut transform = rest_transform(joint);
    transform.translation += offset;
    Keyframe::new(time, transform)
}

fn idle_clip() -> Result<Arc<AnimationData>, AnimationError> {
    let bob = vec![
        offset_key(0.0, 0, Vec3::ZERO),
        offset_key(0.5, 0, Vec3::new(0.0, -2.0, 0.0)),
        offset_key(1.0, 0, Vec3::ZERO),
    ];
    clip(IDLE_DURATION, &[(0, bob)])
}

fn jab_clip() -> Result<Arc<AnimationData>, AnimationError> {
    let punch = vec![
        offset_key(0.0, 4, Vec3::ZERO),
        offset_key(0.1, 4, Vec3::new(20.0, 0.0, 0.0)),
        offset_key(0.15, 4, Vec3::new(20.0, 0.0, 0.0)),
        offset_key(0.5, 4, Vec3::ZERO),
    ];
    clip(JAB_DURATION, &[(4, punch)])
}

fn block_clip() -> Result<Arc<AnimationData>, AnimationError> {
    let mut guard = rest_transform(3);
    guard.rotation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
    clip(BLOCK_DURATION, &[(3, vec![Keyframe::new(0.0, guard)])])
}

fn hit_clip() -> Result<Arc<AnimationData>, AnimationError> {
    let recoil = vec![
        Keyframe::new(0.0, rest_transform(1)),
        Keyframe::new(0.1, {
            let mut lean = rest_transform(1);
            lean.rotation = Quat::from_rotation_z(0.4);
            lean
        }),
        Keyframe::new(0.4, rest_transform(1)),
    ];
    clip(HIT_DURATION, &[(1, recoil)])
}

/// Animator with idle, jab, block and hit states
pub fn training_animator() -> Result<CharacterAnimator, AnimationError> {
    let mut animator = CharacterAnimator::from_skeleton(Arc::new(training_skeleton()?));

    animator.add_animation("stand", idle_clip()?)?;
    animator.add_animation("straight", jab_clip()?)?;
    animator.add_animation("guard", block_clip()?)?;
    animator.add_animation("recoil", hit_clip()?)?;

    animator.register_animation_state(IDLE, "stand", true, 1.0)?;
    animator.register_animation_state(JAB, "straight", false, 1.0)?;
    animator.register_animation_state(BLOCK, "guard", true, 1.0)?;
    animator.register_animation_state(HIT, "recoil", true, 1.0)?;

    // Combat states switch on the tick they change
    for from in [IDLE, JAB, BLOCK, HIT] {
        for to in [IDLE, JAB, BLOCK, HIT] {
            if from != to {
                animator.register_state_transition(from, to, 0.0, true)?;
            }
        }
    }

    animator.set_default_state(IDLE)?;
    Ok(animator)
}

/// Enough frames to cover `duration`, including the final one
fn frames_for(duration: f32, frame: impl Fn(usize) -> FrameData) -> Vec<FrameData> {
    let rate = ArenaConfig::DEFAULT.animation_frame_rate;
    let count = (duration * rate).round() as usize + 1;
    (0..count).map(frame).collect()
}

fn jab_frames(archetype: BodyArchetype) -> Vec<FrameData> {
    let hit = HitProperties {
        damage: JAB_DAMAGE,
        hitstun: 0,
        blockstun: AttackType::Light.blockstun(),
        knockback: Vec2::new(6.0, 0.0),
        priority: AttackType::Light.priority(),
    };

    frames_for(JAB_DURATION, |index| {
        let mut frame = archetype.idle_frame();
        // Extended arm is hittable from just before the jab comes out
        if (JAB_ACTIVE_START - 2..=JAB_ACTIVE_END + 4).contains(&index) {
            frame.hurtboxes[3] = HurtboxData::new(Vec2::new(30.0, 45.0), Vec2::new(30.0, 15.0));
        }
        if (JAB_ACTIVE_START..=JAB_ACTIVE_END).contains(&index) {
            frame.hitboxes[0] = HitboxData {
                position: Vec2::new(50.0, 45.0),
                size: Vec2::new(40.0, 20.0),
                hit,
                active: true,
            };
        }
        frame
    })
}

/// Frame data for every state of the training animator
pub fn training_frame_data(archetype: BodyArchetype) -> Vec<(String, Vec<FrameData>)> {
    let idle = |_: usize| archetype.idle_frame();
    let guard = |_: usize| {
        let mut frame = archetype.idle_frame();
        frame.pushbox_offset = Vec2::new(-5.0, 0.0);
        frame
    };

    vec![
        (IDLE.to_string(), frames_for(IDLE_DURATION, idle)),
        (JAB.to_string(), jab_frames(archetype)),
        (BLOCK.to_string(), frames_for(BLOCK_DURATION, guard)),
        (HIT.to_string(), frames_for(HIT_DURATION, idle)),
    ]
}

/// A medium-bodied fighter with base stats and the training move set
pub fn training_dummy(name: &str) -> Result<FighterBlueprint, AnimationError> {
    let archetype = BodyArchetype::Medium;
    Ok(FighterBlueprint {
        name: name.to_string(),
        stats: FighterStats::standard(),
        archetype,
        animator: training_animator()?,
        frame_data: training_frame_data(archetype),
    })
}
