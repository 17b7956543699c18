// Combat resolution
//
// - damage: stateless damage, hitstun and knockback formulas
// - hit: broad/narrow phase hit detection between fighters

pub mod damage;
pub mod hit;

pub use damage::{
    calculate_damage, calculate_hitstun, calculate_knockback, element_multiplier, state_modifier,
    AttackData, AttackProperties, AttackType, DefenseData, Element,
};
pub use hit::{populate_grid, resolve_hits, ColliderRef, HitRegistry, HitResult};
