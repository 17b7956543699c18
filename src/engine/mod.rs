// Engine modules: assets, physics, fixed timestep

pub mod assets;
pub mod game_loop;
pub mod physics;
