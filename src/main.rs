use anyhow::{Context, Result};
use arena_combat::engine::game_loop::FixedTimestep;
use arena_combat::game::characters::presets::{self, JAB};
use arena_combat::game::{Arena, ArenaConfig};
use glam::Vec2;
use log::info;
use std::time::Duration;

/// Length of the sparring session in simulated frames
const SESSION_FRAMES: u32 = 600;

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting sparring session...");

    let config = ArenaConfig::DEFAULT;
    let mut arena = Arena::new(config)?;
    let p1 = arena.spawn(presets::training_dummy("Kaede")?, Vec2::new(-40.0, 0.0))?;
    let p2 = arena.spawn(presets::training_dummy("Bruno")?, Vec2::new(40.0, 0.0))?;

    let mut timestep = FixedTimestep::from_config(&config);
    // Uneven frame pacing, the timestep smooths it into fixed ticks
    let frame_times = [16u64, 17, 16, 20, 13];

    let mut hits = 0;
    let mut tick: u64 = 0;
    'session: for frame in 0..SESSION_FRAMES {
        let frame_time = Duration::from_millis(frame_times[frame as usize % frame_times.len()]);

        for _ in 0..timestep.advance(frame_time) {
            match tick % 90 {
                0 => {
                    arena.attack(p1, JAB)?;
                }
                30 => arena.set_blocking(p2, true)?,
                45 => {
                    arena.attack(p1, JAB)?;
                }
                70 => {
                    arena.set_blocking(p2, false)?;
                    arena.attack(p2, JAB)?;
                }
                _ => {}
            }

            let report = arena
                .tick(timestep.step_secs())
                .with_context(|| format!("tick {} failed", tick))?;
            tick += 1;

            for hit in report.landed() {
                hits += 1;
                info!(
                    "[{:>4}] fighter {} -> fighter {}: {:.1} damage, {} hitstun, {} blockstun{}{}{}",
                    report.frame,
                    hit.attacker,
                    hit.defender,
                    hit.damage,
                    hit.hitstun,
                    hit.blockstun,
                    if hit.blocked { " [blocked]" } else { "" },
                    if hit.is_counter { " [counter]" } else { "" },
                    if hit.is_trade_hit { " [trade]" } else { "" },
                );
            }

            if arena.is_decided() {
                info!("Round decided at frame {}", report.frame);
                break 'session;
            }
        }
    }

    for id in [p1, p2] {
        let fighter = arena.fighter(id)?;
        info!(
            "{}: {:.1} / {:.1} health, {:?}",
            fighter.name, fighter.health, fighter.stats.max_health, fighter.state()
        );
    }
    info!(
        "Session over: {} ticks, {} hits, {} ticks dropped",
        timestep.tick_count(),
        hits,
        timestep.dropped_ticks()
    );

    Ok(())
}
