// Game layer: animation, fighters, combat and the arena tying them together

pub mod animation;
pub mod arena;
pub mod characters;
pub mod combat;
pub mod config;

pub use arena::{Arena, ArenaError, FrameDataGap, TickReport};
pub use config::ArenaConfig;
