// Fighter entity and roster

use crate::engine::physics::{body, body::presets, CollisionLayer, RigidBodyHandle, RigidBodySet};
use crate::game::animation::{AnimationError, CharacterAnimator};
use glam::Vec2;

use super::hitbox::{BodyArchetype, Facing, FrameData, FrameLookup, HitboxManager};
use super::state::{CombatState, CombatStateMachine};
use super::stats::FighterStats;

/// Unique identifier for a fighter
pub type FighterId = u32;

/// Everything needed to put a fighter in the arena
#[derive(Debug)]
pub struct FighterBlueprint {
    pub name: String,
    pub stats: FighterStats,
    pub archetype: BodyArchetype,
    /// Animator with its states registered and a default state set
    pub animator: CharacterAnimator,
    /// Frame data tables keyed by animation state name
    pub frame_data: Vec<(String, Vec<FrameData>)>,
}

/// A fighter taking part in a match
#[derive(Debug)]
pub struct Fighter {
    /// Unique identifier
    pub id: FighterId,
    /// Display name
    pub name: String,
    /// Slot in the match (0-3), also picks the collision layer
    pub player_index: usize,

    /// Kinematic body every combat box follows
    pub body: RigidBodyHandle,

    pub stats: FighterStats,
    pub animator: CharacterAnimator,
    pub hitboxes: HitboxManager,
    pub combat: CombatStateMachine,

    pub health: f32,
    pub facing: Facing,
    /// Hits taken in the current combo; cleared when hitstun ends
    pub combo_count: u32,

    /// Attack to play while `Attacking`
    current_attack: Option<String>,
    /// Bumped every time the animator enters a new state
    animation_serial: u64,
}

impl Fighter {
    /// Create a fighter and insert its body into `bodies`
    pub fn new(
        id: FighterId,
        player_index: usize,
        layer: CollisionLayer,
        blueprint: FighterBlueprint,
        bodies: &mut RigidBodySet,
        spawn: Vec2,
    ) -> Self {
        let body = bodies.insert(presets::fighter_body(spawn.x, spawn.y));

        let mut hitboxes = HitboxManager::new(layer);
        hitboxes.initialize(&blueprint.name, blueprint.archetype);
        hitboxes.set_rigid_body(body);
        for (animation, frames) in blueprint.frame_data {
            hitboxes.load_animation_data(&animation, frames);
        }

        log::info!(
            "Fighter '{}' spawned as player {} at ({}, {})",
            blueprint.name,
            player_index + 1,
            spawn.x,
            spawn.y
        );

        Self {
            id,
            name: blueprint.name,
            player_index,
            body,
            health: blueprint.stats.max_health,
            stats: blueprint.stats,
            animator: blueprint.animator,
            hitboxes,
            combat: CombatStateMachine::new(),
            facing: Facing::Right,
            combo_count: 0,
            current_attack: None,
            animation_serial: 0,
        }
    }

    /// Start an attack animation; `false` if the fighter cannot act or
    /// has no such animation
    pub fn start_attack(&mut self, animation: &str) -> bool {
        if !self.animator.controller().has_state(animation) {
            log::warn!("'{}' has no attack animation '{}'", self.name, animation);
            return false;
        }
        if !self.combat.start_attack() {
            return false;
        }

        self.current_attack = Some(animation.to_string());
        self.enter_animation(animation, true);
        true
    }

    /// Hold or release block
    pub fn set_blocking(&mut self, blocking: bool) {
        self.combat.set_defending(blocking);
    }

    /// Advance stun counters by one tick
    pub fn tick_state(&mut self) {
        if self.combat.update() == Some(CombatState::HitStun) {
            self.combo_count = 0;
        }
    }

    /// Keep the animator in step with the combat state, then advance it
    pub fn update_animation(&mut self, dt: f32) -> Result<(), AnimationError> {
        if self.combat.state() == CombatState::Attacking && self.attack_finished() {
            self.combat.finish_attack();
            self.current_attack = None;
        }

        let desired = match (self.combat.state(), &self.current_attack) {
            (CombatState::Attacking, Some(attack)) => attack.clone(),
            (state, _) => state.animation_state().to_string(),
        };
        if self.animator.current_state() != Some(desired.as_str())
            && self.animator.controller().has_state(&desired)
        {
            self.enter_animation(&desired, false);
        }

        self.animator.update(dt)
    }

    fn attack_finished(&self) -> bool {
        let Some(attack) = self.current_attack.as_deref() else {
            return true;
        };
        if self.animator.current_state() != Some(attack) || self.animator.is_transitioning() {
            return false;
        }
        self.animator
            .current_clip()
            .map_or(true, |clip| !clip.is_playing())
    }

    fn enter_animation(&mut self, state: &str, force: bool) {
        if self.animator.play_state(state, force) {
            self.animation_serial += 1;
            log::debug!("'{}' enters '{}'", self.name, state);
        }
    }

    /// Identifies the current attack instance for hit bookkeeping
    pub fn animation_serial(&self) -> u64 {
        self.animation_serial
    }

    /// Frame of the animation currently driving the boxes
    pub fn animation_frame(&self, frame_rate: f32) -> u32 {
        self.animator.current_frame(frame_rate)
    }

    /// Move combat boxes to the current animation frame
    pub fn update_boxes(&mut self, frame_rate: f32) -> FrameLookup {
        let frame = self.animation_frame(frame_rate);
        match self.animator.current_state() {
            Some(state) => self.hitboxes.update_boxes(state, frame, self.facing),
            None => FrameLookup::Missing,
        }
    }

    /// In the startup frames of an attack, before its first active frame
    pub fn in_attack_startup(&self, frame_rate: f32) -> bool {
        if self.combat.state() != CombatState::Attacking {
            return false;
        }
        let Some(state) = self.animator.current_state() else {
            return false;
        };
        self.hitboxes
            .first_active_frame(state)
            .map_or(false, |active| (self.animation_frame(frame_rate) as usize) < active)
    }

    /// Apply a landed hit. Returns `true` if it knocked the fighter out.
    pub fn take_hit(&mut self, damage: f32, hitstun: u32, blockstun: u32, blocked: bool) -> bool {
        self.health = (self.health - damage).max(0.0);

        if self.health <= 0.0 {
            self.combat.knock_out();
            self.current_attack = None;
            log::info!("'{}' knocked out", self.name);
            return true;
        }

        if blocked {
            self.combat.apply_block_stun(blockstun);
        } else {
            self.combo_count += 1;
            self.combat.apply_hit_stun(hitstun);
        }
        self.current_attack = None;
        false
    }

    /// Turn to face a world x position
    pub fn face_towards(&mut self, target_x: f32, bodies: &RigidBodySet) {
        if let Some(position) = self.position(bodies) {
            let delta = target_x - position.x;
            if delta.abs() > f32::EPSILON {
                self.facing = Facing::from_sign(delta);
            }
        }
    }

    pub fn position(&self, bodies: &RigidBodySet) -> Option<Vec2> {
        body::body_position(bodies, self.body)
    }

    /// Teleport without touching combat state
    pub fn set_position(&self, bodies: &mut RigidBodySet, position: Vec2) -> bool {
        body::set_body_position(bodies, self.body, position)
    }

    /// Full health, neutral state, back at `spawn`
    pub fn reset_round(&mut self, bodies: &mut RigidBodySet, spawn: Vec2) {
        self.set_position(bodies, spawn);
        self.health = self.stats.max_health;
        self.combo_count = 0;
        self.current_attack = None;
        self.combat.revive();
        self.hitboxes.set_invulnerable(false);
        self.animator.reset();
    }

    pub fn is_alive(&self) -> bool {
        self.combat.state() != CombatState::KnockedOut
    }

    pub fn state(&self) -> CombatState {
        self.combat.state()
    }
}

/// Manages all fighters in a match
#[derive(Debug, Default)]
pub struct FighterRoster {
    fighters: Vec<Fighter>,
    next_id: FighterId,
}

impl FighterRoster {
    pub fn new() -> Self {
        Self {
            fighters: Vec::new(),
            next_id: 0,
        }
    }

    /// Spawn a fighter on the next free player layer.
    /// Returns `None` once every player slot is taken.
    pub fn spawn(
        &mut self,
        blueprint: FighterBlueprint,
        bodies: &mut RigidBodySet,
        position: Vec2,
    ) -> Option<FighterId> {
        let player_index = (0..4).find(|index| {
            !self
                .fighters
                .iter()
                .any(|fighter| fighter.player_index == *index)
        })?;
        let layer = CollisionLayer::player(player_index)?;

        let id = self.next_id;
        self.next_id += 1;

        let fighter = Fighter::new(id, player_index, layer, blueprint, bodies, position);
        self.fighters.push(fighter);
        Some(id)
    }

    pub fn get(&self, id: FighterId) -> Option<&Fighter> {
        self.fighters.iter().find(|f| f.id == id)
    }

    pub fn get_mut(&mut self, id: FighterId) -> Option<&mut Fighter> {
        self.fighters.iter_mut().find(|f| f.id == id)
    }

    /// Index of a fighter in roster order
    pub fn index_of(&self, id: FighterId) -> Option<usize> {
        self.fighters.iter().position(|f| f.id == id)
    }

    pub fn all(&self) -> &[Fighter] {
        &self.fighters
    }

    pub fn all_mut(&mut self) -> &mut [Fighter] {
        &mut self.fighters
    }

    /// Remove a fighter and its body
    pub fn remove(&mut self, id: FighterId, bodies: &mut RigidBodySet) -> Option<Fighter> {
        let index = self.index_of(id)?;
        let fighter = self.fighters.remove(index);
        body::remove_body(bodies, fighter.body);
        Some(fighter)
    }

    pub fn len(&self) -> usize {
        self.fighters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fighters.is_empty()
    }

    pub fn alive_count(&self) -> usize {
        self.fighters.iter().filter(|f| f.is_alive()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::characters::presets::{self, JAB};
    use crate::game::config::ArenaConfig;
    use approx::assert_relative_eq;

    const RATE: f32 = ArenaConfig::DEFAULT.animation_frame_rate;
    const DT: f32 = 1.0 / 60.0;

    fn spawn_one() -> (FighterRoster, RigidBodySet, FighterId) {
        let mut bodies = RigidBodySet::new();
        let mut roster = FighterRoster::new();
        let blueprint = presets::training_dummy("Ryo").unwrap();
        let id = roster
            .spawn(blueprint, &mut bodies, Vec2::new(-40.0, 0.0))
            .unwrap();
        (roster, bodies, id)
    }

    #[test]
    fn test_spawn_assigns_layers() {
        let mut bodies = RigidBodySet::new();
        let mut roster = FighterRoster::new();
        for i in 0..4 {
            let blueprint = presets::training_dummy(&format!("p{}", i)).unwrap();
            assert!(roster.spawn(blueprint, &mut bodies, Vec2::ZERO).is_some());
        }
        let extra = presets::training_dummy("extra").unwrap();
        assert!(roster.spawn(extra, &mut bodies, Vec2::ZERO).is_none());

        assert_eq!(roster.len(), 4);
        assert_eq!(roster.all()[2].hitboxes.layer(), CollisionLayer::Player3);
    }

    #[test]
    fn test_new_fighter_defaults() {
        let (roster, bodies, id) = spawn_one();
        let fighter = roster.get(id).unwrap();
        assert_relative_eq!(fighter.health, fighter.stats.max_health);
        assert_eq!(fighter.state(), CombatState::Idle);
        assert_eq!(fighter.animator.current_state(), Some("idle"));
        assert_eq!(fighter.position(&bodies), Some(Vec2::new(-40.0, 0.0)));
        assert_eq!(fighter.hitboxes.active_hurtboxes().count(), 3);
    }

    #[test]
    fn test_attack_runs_to_completion() {
        let (mut roster, _bodies, id) = spawn_one();
        let fighter = roster.get_mut(id).unwrap();

        let serial = fighter.animation_serial();
        assert!(fighter.start_attack(JAB));
        assert!(!fighter.start_attack(JAB));
        assert_eq!(fighter.animation_serial(), serial + 1);

        let mut saw_hitbox = false;
        for _ in 0..60 {
            fighter.tick_state();
            fighter.update_animation(DT).unwrap();
            fighter.update_boxes(RATE);
            saw_hitbox |= fighter.hitboxes.active_hitboxes().count() > 0;
        }

        assert!(saw_hitbox);
        assert_eq!(fighter.state(), CombatState::Idle);
        assert_eq!(fighter.animator.current_state(), Some("idle"));
        assert_eq!(fighter.hitboxes.active_hitboxes().count(), 0);
    }

    #[test]
    fn test_attack_startup_window() {
        let (mut roster, _bodies, id) = spawn_one();
        let fighter = roster.get_mut(id).unwrap();
        assert!(!fighter.in_attack_startup(RATE));

        fighter.start_attack(JAB);
        fighter.update_animation(DT).unwrap();
        assert!(fighter.in_attack_startup(RATE));

        for _ in 0..presets::JAB_ACTIVE_START {
            fighter.update_animation(DT).unwrap();
        }
        assert!(!fighter.in_attack_startup(RATE));
    }

    #[test]
    fn test_unknown_attack_rejected() {
        let (mut roster, _bodies, id) = spawn_one();
        let fighter = roster.get_mut(id).unwrap();
        assert!(!fighter.start_attack("shoryuken"));
        assert_eq!(fighter.state(), CombatState::Idle);
    }

    #[test]
    fn test_take_hit_and_combo_reset() {
        let (mut roster, _bodies, id) = spawn_one();
        let fighter = roster.get_mut(id).unwrap();

        assert!(!fighter.take_hit(100.0, 2, 0, false));
        assert!(!fighter.take_hit(100.0, 2, 0, false));
        assert_eq!(fighter.combo_count, 2);
        assert_relative_eq!(fighter.health, 800.0);

        fighter.tick_state();
        fighter.tick_state();
        assert_eq!(fighter.state(), CombatState::Idle);
        assert_eq!(fighter.combo_count, 0);
    }

    #[test]
    fn test_blocked_hit_keeps_combo() {
        let (mut roster, _bodies, id) = spawn_one();
        let fighter = roster.get_mut(id).unwrap();
        fighter.set_blocking(true);

        fighter.take_hit(10.0, 0, 11, true);
        assert_eq!(fighter.state(), CombatState::BlockStun);
        assert_eq!(fighter.combo_count, 0);
    }

    #[test]
    fn test_knockout_and_reset() {
        let (mut roster, mut bodies, id) = spawn_one();
        let fighter = roster.get_mut(id).unwrap();

        assert!(fighter.take_hit(5000.0, 20, 0, false));
        assert!(!fighter.is_alive());
        assert_eq!(roster.alive_count(), 0);

        let fighter = roster.get_mut(id).unwrap();
        fighter.reset_round(&mut bodies, Vec2::new(10.0, 0.0));
        assert!(fighter.is_alive());
        assert_relative_eq!(fighter.health, 1000.0);
        assert_eq!(fighter.position(&bodies), Some(Vec2::new(10.0, 0.0)));
    }

    #[test]
    fn test_facing_and_mirrored_boxes() {
        let (mut roster, bodies, id) = spawn_one();
        let fighter = roster.get_mut(id).unwrap();

        fighter.face_towards(-200.0, &bodies);
        assert_eq!(fighter.facing, Facing::Left);
        fighter.face_towards(-40.0, &bodies);
        assert_eq!(fighter.facing, Facing::Left);
        fighter.face_towards(100.0, &bodies);
        assert_eq!(fighter.facing, Facing::Right);
    }

    #[test]
    fn test_remove_fighter() {
        let (mut roster, mut bodies, id) = spawn_one();
        assert!(roster.remove(id, &mut bodies).is_some());
        assert!(roster.is_empty());
        assert_eq!(bodies.len(), 0);
        assert!(roster.remove(id, &mut bodies).is_none());
    }
}
