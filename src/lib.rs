//! Combat simulation core for a 2D arena fighter.
//!
//! - `engine`: asset archives, combat colliders, broad phase grid, fixed timestep
//! - `game`: skeletal animation, fighters with frame data hitboxes, damage and
//!   hit resolution, and the [`Arena`](game::Arena) that ticks a match
//!
//! The simulation is single threaded and frame stepped. Given the same inputs
//! every tick produces the same hits.

pub mod core;
pub mod engine;
pub mod game;
