// Fighter system
//
// This module contains everything related to fighters:
// - Fighter data structure and roster
// - Fighter stats
// - Combat state machine (stun, knockdown, KO)
// - Frame data driven hitboxes
// - A procedural training fighter

pub mod character;
pub mod hitbox;
pub mod presets;
pub mod state;
pub mod stats;

// Re-export commonly used types
pub use character::{Fighter, FighterBlueprint, FighterId, FighterRoster};
pub use hitbox::{
    BodyArchetype, BoxSlot, Facing, FrameData, FrameLookup, HitboxData, HitboxManager,
    HurtboxData, MAX_HITBOXES, MAX_HURTBOXES,
};
pub use state::{CombatState, CombatStateMachine};
pub use stats::{FighterStats, BASE_STATS};
