// Per-character combat boxes driven by authored frame data
//
// Every fighter owns a fixed set of colliders bound to its rigid body:
// hurtboxes (where it can be hit), hitboxes (where it hits), one pushbox
// (body collision) and one throwbox. Frame data tables say where each box
// sits on each frame of each animation.

use crate::engine::physics::{
    Collider, CollisionLayer, CollisionType, HitProperties, LayerMask, RigidBodyHandle,
};
use glam::Vec2;
use std::collections::HashMap;

pub const MAX_HURTBOXES: usize = 5;
pub const MAX_HITBOXES: usize = 3;

/// Pushbox sits this far above the body origin
pub const PUSHBOX_BASE_Y: f32 = 30.0;
pub const PUSHBOX_SIZE: Vec2 = Vec2::new(30.0, 80.0);
pub const THROWBOX_OFFSET: Vec2 = Vec2::new(25.0, 30.0);
pub const THROWBOX_SIZE: Vec2 = Vec2::new(50.0, 60.0);

/// Which way a fighter faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Facing {
    #[default]
    Right,
    Left,
}

impl Facing {
    /// +1 for right, -1 for left
    pub fn sign(self) -> f32 {
        match self {
            Facing::Right => 1.0,
            Facing::Left => -1.0,
        }
    }

    /// Facing for a direction value; zero keeps facing right
    pub fn from_sign(value: f32) -> Self {
        if value < 0.0 {
            Facing::Left
        } else {
            Facing::Right
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Facing::Right => Facing::Left,
            Facing::Left => Facing::Right,
        }
    }
}

/// One hitbox entry of a frame (authored facing right)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HitboxData {
    pub position: Vec2,
    pub size: Vec2,
    pub hit: HitProperties,
    pub active: bool,
}

/// One hurtbox entry of a frame (authored facing right)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HurtboxData {
    pub position: Vec2,
    pub size: Vec2,
    pub active: bool,
    pub invulnerable: bool,
}

impl HurtboxData {
    pub fn new(position: Vec2, size: Vec2) -> Self {
        Self {
            position,
            size,
            active: true,
            invulnerable: false,
        }
    }
}

/// Box layout for a single animation frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameData {
    pub hitboxes: [HitboxData; MAX_HITBOXES],
    pub hurtboxes: [HurtboxData; MAX_HURTBOXES],
    pub throwbox_active: bool,
    /// Pushbox displacement from its base position
    pub pushbox_offset: Vec2,
}

impl FrameData {
    /// Whether any hitbox is live on this frame
    pub fn has_active_hitbox(&self) -> bool {
        self.hitboxes.iter().any(|hitbox| hitbox.active)
    }
}

/// Standard body sizes for the idle hurtbox layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BodyArchetype {
    Small,
    #[default]
    Medium,
    Large,
}

impl BodyArchetype {
    /// Head, body and legs hurtboxes as (center, size)
    pub fn idle_hurtboxes(self) -> [(Vec2, Vec2); 3] {
        match self {
            BodyArchetype::Small => [
                (Vec2::new(0.0, 50.0), Vec2::new(35.0, 30.0)),
                (Vec2::new(0.0, 25.0), Vec2::new(40.0, 40.0)),
                (Vec2::new(0.0, 0.0), Vec2::new(35.0, 30.0)),
            ],
            BodyArchetype::Medium => [
                (Vec2::new(0.0, 60.0), Vec2::new(40.0, 35.0)),
                (Vec2::new(0.0, 30.0), Vec2::new(50.0, 50.0)),
                (Vec2::new(0.0, 0.0), Vec2::new(40.0, 35.0)),
            ],
            BodyArchetype::Large => [
                (Vec2::new(0.0, 75.0), Vec2::new(50.0, 40.0)),
                (Vec2::new(0.0, 40.0), Vec2::new(60.0, 60.0)),
                (Vec2::new(0.0, 0.0), Vec2::new(50.0, 40.0)),
            ],
        }
    }

    /// A neutral frame: idle hurtboxes, no hitboxes, no throw
    pub fn idle_frame(self) -> FrameData {
        let mut frame = FrameData::default();
        for (slot, (position, size)) in self.idle_hurtboxes().into_iter().enumerate() {
            frame.hurtboxes[slot] = HurtboxData::new(position, size);
        }
        frame
    }
}

/// Addresses one box of a manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoxSlot {
    Hurtbox(usize),
    Hitbox(usize),
    Pushbox,
    Throwbox,
}

/// Outcome of a frame data lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLookup {
    /// Boxes were moved to the authored layout
    Applied,
    /// No data for that frame; boxes kept their previous layout
    Missing,
}

/// Owns a fighter's combat boxes and its frame data tables
#[derive(Debug, Clone)]
pub struct HitboxManager {
    character_name: String,
    layer: CollisionLayer,
    hurtboxes: [Collider; MAX_HURTBOXES],
    hitboxes: [Collider; MAX_HITBOXES],
    pushbox: Collider,
    throwbox: Collider,
    invulnerable: bool,
    frame_data: HashMap<String, Vec<FrameData>>,
}

impl HitboxManager {
    /// Empty manager on `layer`. Hitboxes and throwbox start inactive.
    pub fn new(layer: CollisionLayer) -> Self {
        let opponents = LayerMask::opponents_of(layer);

        let hurtbox = Collider::new_box(Vec2::ZERO, 0.0, 0.0)
            .with_kind(CollisionType::Hurtbox)
            .with_layer(layer)
            .with_active(false);
        let hitbox = Collider::new_box(Vec2::ZERO, 0.0, 0.0)
            .with_kind(CollisionType::Hitbox)
            .with_layer(layer)
            .with_mask(opponents)
            .with_active(false);
        let pushbox = Collider::new_box(
            Vec2::new(0.0, PUSHBOX_BASE_Y),
            PUSHBOX_SIZE.x,
            PUSHBOX_SIZE.y,
        )
        .with_kind(CollisionType::Pushbox)
        .with_layer(layer)
        .with_mask(LayerMask::ALL_PLAYERS.without(layer));
        let throwbox = Collider::new_box(THROWBOX_OFFSET, THROWBOX_SIZE.x, THROWBOX_SIZE.y)
            .with_kind(CollisionType::Throwbox)
            .with_layer(layer)
            .with_mask(opponents)
            .with_active(false);

        Self {
            character_name: String::new(),
            layer,
            hurtboxes: std::array::from_fn(|_| hurtbox.clone()),
            hitboxes: std::array::from_fn(|_| hitbox.clone()),
            pushbox,
            throwbox,
            invulnerable: false,
            frame_data: HashMap::new(),
        }
    }

    /// Reset every box to the idle layout of `archetype`
    pub fn initialize(&mut self, character_name: &str, archetype: BodyArchetype) {
        self.character_name = character_name.to_string();
        self.invulnerable = false;

        for hitbox in &mut self.hitboxes {
            hitbox.active = false;
        }
        self.throwbox.active = false;
        self.throwbox.shape.set_center(THROWBOX_OFFSET);
        self.pushbox.shape.set_center(Vec2::new(0.0, PUSHBOX_BASE_Y));
        self.pushbox.active = true;

        let idle = archetype.idle_hurtboxes();
        for (slot, hurtbox) in self.hurtboxes.iter_mut().enumerate() {
            match idle.get(slot) {
                Some(&(position, size)) => {
                    hurtbox.shape.set_center(position);
                    hurtbox.set_size(size.x, size.y);
                    hurtbox.active = true;
                }
                None => hurtbox.active = false,
            }
        }

        log::debug!(
            "Hitboxes initialized for '{}' ({:?})",
            character_name,
            archetype
        );
    }

    /// Move boxes to the frame data of `animation` at `frame`.
    ///
    /// Without authored data the boxes are left exactly as they were.
    pub fn update_boxes(&mut self, animation: &str, frame: u32, facing: Facing) -> FrameLookup {
        let data = self
            .frame_data
            .get(animation)
            .and_then(|frames| frames.get(frame as usize))
            .copied();

        match data {
            Some(data) => {
                self.apply_frame_data(&data, facing);
                FrameLookup::Applied
            }
            None => FrameLookup::Missing,
        }
    }

    /// Apply one frame's layout, mirrored by `facing`
    pub fn apply_frame_data(&mut self, data: &FrameData, facing: Facing) {
        let sign = facing.sign();
        let mirror = |position: Vec2| Vec2::new(position.x * sign, position.y);

        for (hurtbox, entry) in self.hurtboxes.iter_mut().zip(&data.hurtboxes) {
            hurtbox.active = entry.active && !self.invulnerable && !entry.invulnerable;
            hurtbox.shape.set_center(mirror(entry.position));
            hurtbox.set_size(entry.size.x, entry.size.y);
        }

        for (hitbox, entry) in self.hitboxes.iter_mut().zip(&data.hitboxes) {
            hitbox.active = entry.active;
            hitbox.shape.set_center(mirror(entry.position));
            hitbox.set_size(entry.size.x, entry.size.y);
            hitbox.hit = HitProperties {
                knockback: Vec2::new(entry.hit.knockback.x * sign, entry.hit.knockback.y),
                ..entry.hit
            };
        }

        self.throwbox.active = data.throwbox_active;
        self.throwbox.shape.set_center(mirror(THROWBOX_OFFSET));

        self.pushbox.shape.set_center(Vec2::new(
            data.pushbox_offset.x * sign,
            data.pushbox_offset.y + PUSHBOX_BASE_Y,
        ));
    }

    /// Manager-wide invulnerability. Turning it on drops every hurtbox now;
    /// turning it off lets the next frame data bring them back.
    pub fn set_invulnerable(&mut self, invulnerable: bool) {
        self.invulnerable = invulnerable;
        if invulnerable {
            for hurtbox in &mut self.hurtboxes {
                hurtbox.active = false;
            }
        }
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable
    }

    /// Toggle one hitbox by hand; `false` if `index` is out of range
    pub fn enable_hitbox(&mut self, index: usize, enable: bool) -> bool {
        match self.hitboxes.get_mut(index) {
            Some(hitbox) => {
                hitbox.active = enable;
                true
            }
            None => {
                log::warn!(
                    "Hitbox index {} out of range for '{}'",
                    index,
                    self.character_name
                );
                false
            }
        }
    }

    /// Layers the hitboxes and throwbox may connect with, e.g. to leave
    /// teammates out. Defaults to every other player.
    pub fn set_target_mask(&mut self, mask: LayerMask) {
        for hitbox in &mut self.hitboxes {
            hitbox.layer_mask = mask;
        }
        self.throwbox.layer_mask = mask;
    }

    pub fn enable_throwbox(&mut self, enable: bool) {
        self.throwbox.active = enable;
    }

    /// Attach every box to `body`
    pub fn set_rigid_body(&mut self, body: RigidBodyHandle) {
        for collider in self
            .hurtboxes
            .iter_mut()
            .chain(self.hitboxes.iter_mut())
            .chain([&mut self.pushbox, &mut self.throwbox])
        {
            collider.body = Some(body);
        }
    }

    /// Store frame data for `animation`, replacing any previous table
    pub fn load_animation_data(&mut self, animation: &str, frames: Vec<FrameData>) {
        if self
            .frame_data
            .insert(animation.to_string(), frames)
            .is_some()
        {
            log::debug!(
                "Replaced frame data '{}' for '{}'",
                animation,
                self.character_name
            );
        }
    }

    pub fn has_animation_data(&self, animation: &str) -> bool {
        self.frame_data.contains_key(animation)
    }

    pub fn frame_count(&self, animation: &str) -> usize {
        self.frame_data.get(animation).map_or(0, Vec::len)
    }

    /// First frame of `animation` with a live hitbox
    pub fn first_active_frame(&self, animation: &str) -> Option<usize> {
        self.frame_data
            .get(animation)?
            .iter()
            .position(FrameData::has_active_hitbox)
    }

    pub fn character_name(&self) -> &str {
        &self.character_name
    }

    pub fn layer(&self) -> CollisionLayer {
        self.layer
    }

    pub fn hurtboxes(&self) -> &[Collider] {
        &self.hurtboxes
    }

    pub fn hitboxes(&self) -> &[Collider] {
        &self.hitboxes
    }

    pub fn pushbox(&self) -> &Collider {
        &self.pushbox
    }

    pub fn throwbox(&self) -> &Collider {
        &self.throwbox
    }

    pub fn active_hitboxes(&self) -> impl Iterator<Item = (usize, &Collider)> {
        self.hitboxes
            .iter()
            .enumerate()
            .filter(|(_, hitbox)| hitbox.active)
    }

    pub fn active_hurtboxes(&self) -> impl Iterator<Item = (usize, &Collider)> {
        self.hurtboxes
            .iter()
            .enumerate()
            .filter(|(_, hurtbox)| hurtbox.active)
    }

    pub fn collider(&self, slot: BoxSlot) -> Option<&Collider> {
        match slot {
            BoxSlot::Hurtbox(index) => self.hurtboxes.get(index),
            BoxSlot::Hitbox(index) => self.hitboxes.get(index),
            BoxSlot::Pushbox => Some(&self.pushbox),
            BoxSlot::Throwbox => Some(&self.throwbox),
        }
    }

    /// Every active box in slot order: hurtboxes, hitboxes, pushbox, throwbox
    pub fn active_colliders(&self) -> Vec<(BoxSlot, &Collider)> {
        let hurtboxes = self
            .hurtboxes
            .iter()
            .enumerate()
            .map(|(i, collider)| (BoxSlot::Hurtbox(i), collider));
        let hitboxes = self
            .hitboxes
            .iter()
            .enumerate()
            .map(|(i, collider)| (BoxSlot::Hitbox(i), collider));

        hurtboxes
            .chain(hitboxes)
            .chain([
                (BoxSlot::Pushbox, &self.pushbox),
                (BoxSlot::Throwbox, &self.throwbox),
            ])
            .filter(|(_, collider)| collider.active)
            .collect()
    }
}
