// Arena tunables

use glam::Vec2;

/// Static configuration of one arena
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaConfig {
    /// Simulation ticks per second
    pub tick_rate: f32,
    /// Rate used to turn clip time into frame data indices
    pub animation_frame_rate: f32,
    /// Fixed steps allowed per real frame before time is dropped
    pub max_steps_per_frame: u32,

    pub stage_left: f32,
    pub stage_right: f32,
    pub ground: f32,
    pub ceiling: f32,
    /// Extra room around the stage covered by the broad phase
    pub grid_padding: f32,
    pub grid_cell_size: f32,
}

impl ArenaConfig {
    pub const DEFAULT: ArenaConfig = ArenaConfig {
        tick_rate: 60.0,
        animation_frame_rate: 60.0,
        max_steps_per_frame: 5,
        stage_left: -400.0,
        stage_right: 400.0,
        ground: 0.0,
        ceiling: 600.0,
        grid_padding: 100.0,
        grid_cell_size: 50.0,
    };

    /// Seconds per tick
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.tick_rate
    }

    /// Lower-left corner fighters are kept inside
    pub fn stage_min(&self) -> Vec2 {
        Vec2::new(self.stage_left, self.ground)
    }

    pub fn stage_max(&self) -> Vec2 {
        Vec2::new(self.stage_right, self.ceiling)
    }

    pub fn grid_min(&self) -> Vec2 {
        self.stage_min() - Vec2::splat(self.grid_padding)
    }

    pub fn grid_max(&self) -> Vec2 {
        self.stage_max() + Vec2::splat(self.grid_padding)
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config() {
        let config = ArenaConfig::default();
        assert_relative_eq!(config.fixed_dt(), 1.0 / 60.0);
        assert_eq!(config.stage_min(), Vec2::new(-400.0, 0.0));
        assert_eq!(config.stage_max(), Vec2::new(400.0, 600.0));
    }

    #[test]
    fn test_grid_is_padded() {
        let config = ArenaConfig::DEFAULT;
        assert_eq!(config.grid_min(), Vec2::new(-500.0, -100.0));
        assert_eq!(config.grid_max(), Vec2::new(500.0, 700.0));
    }
}
