// Damage, hitstun and knockback formulas
//
// Every step multiplies the running result, so the order below is part of the
// contract: changing it changes rounding and therefore replays.

use crate::game::characters::CombatState;

pub const COMBO_SCALING: f32 = 0.9;
pub const COUNTER_MULTIPLIER: f32 = 1.5;
pub const CRITICAL_MULTIPLIER: f32 = 2.0;
pub const PIERCING_MULTIPLIER: f32 = 1.25;
pub const MIN_DAMAGE: f32 = 1.0;

pub const BASE_HITSTUN: u32 = 12;
pub const MIN_HITSTUN: u32 = 10;
pub const MAX_HITSTUN: u32 = 60;

pub const BASE_KNOCKBACK: f32 = 5.0;
pub const MAX_KNOCKBACK: f32 = 30.0;

/// Elemental affinity of an attack or a defender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Element {
    #[default]
    Neutral,
    Fire,
    Ice,
    Lightning,
    Earth,
    Wind,
    Light,
    Dark,
    /// Neutral against everything
    Void,
}

impl Element {
    /// The element this one is strong against in the five-element cycle
    fn beats(self) -> Option<Element> {
        match self {
            Element::Fire => Some(Element::Ice),
            Element::Ice => Some(Element::Lightning),
            Element::Lightning => Some(Element::Earth),
            Element::Earth => Some(Element::Wind),
            Element::Wind => Some(Element::Fire),
            _ => None,
        }
    }
}

/// Bit flags modifying how an attack resolves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AttackProperties(pub u32);

impl AttackProperties {
    pub const NONE: AttackProperties = AttackProperties(0);
    /// Bonus damage through defense
    pub const PIERCING: AttackProperties = AttackProperties(1 << 0);
    /// Cannot be blocked
    pub const UNBLOCKABLE: AttackProperties = AttackProperties(1 << 1);

    pub fn contains(self, other: AttackProperties) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub fn with(self, other: AttackProperties) -> Self {
        AttackProperties(self.0 | other.0)
    }
}

/// Attack strength class, used to author priority and blockstun
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttackType {
    Light,
    Medium,
    Heavy,
    Special,
    Ultimate,
}

impl AttackType {
    /// Clash priority; higher wins
    pub fn priority(self) -> i32 {
        match self {
            AttackType::Light => 1,
            AttackType::Medium => 2,
            AttackType::Heavy => 3,
            AttackType::Special => 4,
            AttackType::Ultimate => 5,
        }
    }

    /// Frames a blocking defender is held
    pub fn blockstun(self) -> u32 {
        match self {
            AttackType::Light => 11,
            AttackType::Medium => 16,
            AttackType::Heavy => 22,
            AttackType::Special => 18,
            AttackType::Ultimate => 25,
        }
    }
}

/// Attacker side of one damage calculation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackData {
    pub base_damage: f32,
    pub power_modifier: f32,
    /// Hits already landed in the current combo
    pub combo_count: u32,
    pub element: Element,
    pub properties: AttackProperties,
    pub is_counter: bool,
    pub is_critical: bool,
}

impl AttackData {
    pub fn new(base_damage: f32) -> Self {
        Self {
            base_damage,
            power_modifier: 1.0,
            combo_count: 0,
            element: Element::Neutral,
            properties: AttackProperties::NONE,
            is_counter: false,
            is_critical: false,
        }
    }
}

/// Defender side of one damage calculation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefenseData {
    pub defense_power: f32,
    pub defense_modifier: f32,
    pub element: Element,
    pub state: CombatState,
    /// Fraction of damage removed at the end, in `[0, 1]`
    pub damage_reduction: f32,
}

impl DefenseData {
    pub fn new(defense_power: f32) -> Self {
        Self {
            defense_power,
            defense_modifier: 1.0,
            element: Element::Neutral,
            state: CombatState::Idle,
            damage_reduction: 0.0,
        }
    }
}

/// Final damage of one hit, never below [`MIN_DAMAGE`]
pub fn calculate_damage(attack: &AttackData, defense: &DefenseData) -> f32 {
    let mut damage = attack.base_damage * attack.power_modifier;

    let defense_value = defense.defense_power * defense.defense_modifier;
    damage *= 100.0 / (100.0 + defense_value);

    damage *= element_multiplier(attack.element, defense.element);
    damage *= COMBO_SCALING.powi(attack.combo_count as i32);

    if attack.is_counter {
        damage *= COUNTER_MULTIPLIER;
    }
    if attack.is_critical {
        damage *= CRITICAL_MULTIPLIER;
    }

    damage *= state_modifier(defense.state);

    if attack.properties.contains(AttackProperties::PIERCING) {
        damage *= PIERCING_MULTIPLIER;
    }

    damage *= 1.0 - defense.damage_reduction;
    damage.max(MIN_DAMAGE)
}

/// Element effectiveness: 1.5 strong, 0.5 weak, 1.0 otherwise
pub fn element_multiplier(attack: Element, defense: Element) -> f32 {
    match (attack, defense) {
        (Element::Light, Element::Dark) | (Element::Dark, Element::Light) => 1.5,
        _ if attack.beats() == Some(defense) => 1.5,
        _ if defense.beats() == Some(attack) => 0.5,
        _ => 1.0,
    }
}

/// Damage scale applied for the defender's current state
pub fn state_modifier(state: CombatState) -> f32 {
    match state {
        CombatState::Defending => 0.3,
        CombatState::HitStun => 1.1,
        CombatState::KnockedDown => 0.8,
        CombatState::GettingUp => 0.5,
        _ => 1.0,
    }
}

/// Hitstun frames for a hit of `damage`
pub fn calculate_hitstun(damage: f32, is_counter: bool) -> u32 {
    let mut hitstun = (damage / 10.0).max(0.0) as u32 + BASE_HITSTUN;
    if is_counter {
        hitstun = (hitstun as f32 * COUNTER_MULTIPLIER) as u32;
    }
    hitstun.clamp(MIN_HITSTUN, MAX_HITSTUN)
}

/// Knockback distance for a hit of `damage` against a defender of `weight`
pub fn calculate_knockback(damage: f32, weight: f32) -> f32 {
    let weight_factor = 100.0 / weight;
    (BASE_KNOCKBACK + damage * 0.1 * weight_factor).min(MAX_KNOCKBACK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference_hit() -> (AttackData, DefenseData) {
        (AttackData::new(100.0), DefenseData::new(50.0))
    }

    #[test]
    fn test_reference_scenario() {
        let (attack, defense) = reference_hit();
        let damage = calculate_damage(&attack, &defense);

        assert_relative_eq!(damage, 66.666_67, epsilon = 1e-3);
        assert_eq!(calculate_hitstun(damage, false), 18);
        assert_relative_eq!(calculate_knockback(damage, 100.0), 11.666_667, epsilon = 1e-3);
    }

    #[test]
    fn test_counter_hit_stacks() {
        let (mut attack, defense) = reference_hit();
        attack.is_counter = true;
        let damage = calculate_damage(&attack, &defense);

        assert_relative_eq!(damage, 100.0, epsilon = 1e-3);
        assert_eq!(calculate_hitstun(damage, true), 33);
    }

    #[test]
    fn test_element_chart() {
        assert_eq!(element_multiplier(Element::Fire, Element::Ice), 1.5);
        assert_eq!(element_multiplier(Element::Wind, Element::Fire), 1.5);
        assert_eq!(element_multiplier(Element::Ice, Element::Fire), 0.5);
        assert_eq!(element_multiplier(Element::Fire, Element::Wind), 0.5);
        assert_eq!(element_multiplier(Element::Light, Element::Dark), 1.5);
        assert_eq!(element_multiplier(Element::Dark, Element::Light), 1.5);
        assert_eq!(element_multiplier(Element::Fire, Element::Earth), 1.0);
        assert_eq!(element_multiplier(Element::Void, Element::Fire), 1.0);
        assert_eq!(element_multiplier(Element::Fire, Element::Fire), 1.0);
    }

    #[test]
    fn test_combo_decay() {
        let (mut attack, defense) = reference_hit();
        let first = calculate_damage(&attack, &defense);
        attack.combo_count = 2;
        let third = calculate_damage(&attack, &defense);
        assert_relative_eq!(third, first * 0.81, epsilon = 1e-3);
    }

    #[test]
    fn test_state_modifiers() {
        assert_eq!(state_modifier(CombatState::Defending), 0.3);
        assert_eq!(state_modifier(CombatState::HitStun), 1.1);
        assert_eq!(state_modifier(CombatState::KnockedDown), 0.8);
        assert_eq!(state_modifier(CombatState::GettingUp), 0.5);
        assert_eq!(state_modifier(CombatState::Attacking), 1.0);
    }

    #[test]
    fn test_blocked_piercing_critical() {
        let (mut attack, mut defense) = reference_hit();
        attack.is_critical = true;
        attack.properties = AttackProperties::PIERCING;
        defense.state = CombatState::Defending;

        // 66.667 x 2 x 0.3 x 1.25
        let damage = calculate_damage(&attack, &defense);
        assert_relative_eq!(damage, 50.0, epsilon = 1e-3);
    }

    #[test]
    fn test_damage_floor() {
        let (attack, mut defense) = reference_hit();
        defense.damage_reduction = 1.0;
        assert_eq!(calculate_damage(&attack, &defense), MIN_DAMAGE);

        let weak = AttackData::new(0.5);
        assert_eq!(calculate_damage(&weak, &DefenseData::new(0.0)), MIN_DAMAGE);
    }

    #[test]
    fn test_hitstun_clamped() {
        assert_eq!(calculate_hitstun(1.0, false), 12);
        assert_eq!(calculate_hitstun(900.0, false), MAX_HITSTUN);
        assert_eq!(calculate_hitstun(400.0, true), MAX_HITSTUN);
    }

    #[test]
    fn test_knockback_capped_and_weighted() {
        assert_eq!(calculate_knockback(1000.0, 100.0), MAX_KNOCKBACK);
        assert!(calculate_knockback(50.0, 50.0) > calculate_knockback(50.0, 150.0));
    }

    #[test]
    fn test_attack_properties() {
        let props = AttackProperties::PIERCING.with(AttackProperties::UNBLOCKABLE);
        assert!(props.contains(AttackProperties::PIERCING));
        assert!(props.contains(AttackProperties::UNBLOCKABLE));
        assert!(!AttackProperties::NONE.contains(AttackProperties::PIERCING));
        assert!(!AttackProperties::NONE.contains(AttackProperties::NONE));
    }

    #[test]
    fn test_attack_type_tables() {
        assert!(AttackType::Heavy.priority() > AttackType::Light.priority());
        assert_eq!(AttackType::Light.blockstun(), 11);
        assert_eq!(AttackType::Ultimate.blockstun(), 25);
    }
}
