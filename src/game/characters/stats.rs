// Fighter stats - every fighter starts from the same base numbers
// Differentiation comes from frame data and move lists, not base stats

use crate::game::combat::Element;

/// Fixed fighter stats consumed by the damage formulas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FighterStats {
    /// Health at round start
    pub max_health: f32,
    /// Multiplier applied to every hitbox's base damage
    pub attack_power: f32,
    /// Defense value fed into the soft defense curve
    pub defense: f32,
    /// Heavier fighters are knocked back less (100 = standard)
    pub weight: f32,
    pub element: Element,
}

/// The one stat line used by every fighter
pub const BASE_STATS: FighterStats = FighterStats {
    max_health: 1000.0,
    attack_power: 1.0,
    defense: 100.0,
    weight: 100.0,
    element: Element::Neutral,
};

impl Default for FighterStats {
    fn default() -> Self {
        BASE_STATS
    }
}

impl FighterStats {
    pub fn standard() -> Self {
        BASE_STATS
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.element = element;
        self
    }
}
