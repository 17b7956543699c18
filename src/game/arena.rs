// Arena simulation context
//
// Owns everything one match needs: rigid bodies, fighters, the broad phase
// grid and hit bookkeeping. Nothing lives in globals, so several arenas can
// run side by side.

use crate::engine::physics::{
    body, CollisionEvent, ContactTracker, PhysicsError, RigidBodySet, SpatialGrid,
};
use crate::game::animation::AnimationError;
use crate::game::characters::{
    BoxSlot, Fighter, FighterBlueprint, FighterId, FighterRoster, FrameLookup,
};
use crate::game::combat::{populate_grid, resolve_hits, ColliderRef, HitRegistry, HitResult};
use crate::game::config::ArenaConfig;
use glam::Vec2;
use thiserror::Error;

/// Arena setup and simulation errors
#[derive(Debug, Error)]
pub enum ArenaError {
    #[error(transparent)]
    Physics(#[from] PhysicsError),

    #[error("Fighter {id} animation failed: {source}")]
    Animation {
        id: FighterId,
        #[source]
        source: AnimationError,
    },

    #[error("Every player slot is taken")]
    RosterFull,

    #[error("Unknown fighter {0}")]
    UnknownFighter(FighterId),
}

/// A fighter's boxes could not be placed because no frame data exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDataGap {
    pub fighter: FighterId,
    pub animation: String,
    pub frame: u32,
}

/// Everything that happened during one tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub frame: u64,
    /// Hits in resolution order, clash losers included with `hit == false`
    pub hits: Vec<HitResult>,
    /// Pushbox contact changes between fighters
    pub contacts: Vec<CollisionEvent<ColliderRef>>,
    pub frame_data_gaps: Vec<FrameDataGap>,
}

impl TickReport {
    /// Hits that actually landed
    pub fn landed(&self) -> impl Iterator<Item = &HitResult> {
        self.hits.iter().filter(|hit| hit.hit)
    }
}

/// One match worth of simulation state
pub struct Arena {
    config: ArenaConfig,
    bodies: RigidBodySet,
    roster: FighterRoster,
    grid: SpatialGrid<ColliderRef>,
    contacts: ContactTracker<ColliderRef>,
    registry: HitRegistry,
    frame: u64,
}

// RigidBodySet has no Debug impl, so it is skipped here
impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("config", &self.config)
            .field("roster", &self.roster)
            .field("grid", &self.grid)
            .field("contacts", &self.contacts)
            .field("registry", &self.registry)
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

impl Arena {
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        let grid = SpatialGrid::new(config.grid_min(), config.grid_max(), config.grid_cell_size)?;

        log::info!(
            "Arena created: stage {:?}..{:?}, {} grid cells",
            config.stage_min(),
            config.stage_max(),
            grid.cell_count()
        );

        Ok(Self {
            config,
            bodies: RigidBodySet::new(),
            roster: FighterRoster::new(),
            grid,
            contacts: ContactTracker::new(),
            registry: HitRegistry::new(),
            frame: 0,
        })
    }

    /// Put a fighter on the stage at `position` (clamped to the stage)
    pub fn spawn(&mut self, blueprint: FighterBlueprint, position: Vec2) -> Result<FighterId, ArenaError> {
        let position = position.clamp(self.config.stage_min(), self.config.stage_max());
        let id = self
            .roster
            .spawn(blueprint, &mut self.bodies, position)
            .ok_or(ArenaError::RosterFull)?;
        self.update_facing();
        Ok(id)
    }

    pub fn remove(&mut self, id: FighterId) -> Option<Fighter> {
        self.registry.forget_fighter(id);
        self.roster.remove(id, &mut self.bodies)
    }

    /// Start an attack animation for `id`
    pub fn attack(&mut self, id: FighterId, animation: &str) -> Result<bool, ArenaError> {
        Ok(self.fighter_mut(id)?.start_attack(animation))
    }

    pub fn set_blocking(&mut self, id: FighterId, blocking: bool) -> Result<(), ArenaError> {
        self.fighter_mut(id)?.set_blocking(blocking);
        Ok(())
    }

    /// Advance the simulation by one tick of `dt` seconds.
    ///
    /// Order: combat timers, animation, facing, boxes, grid rebuild, body
    /// contacts, hit resolution, then hit application.
    pub fn tick(&mut self, dt: f32) -> Result<TickReport, ArenaError> {
        self.frame += 1;
        let frame_rate = self.config.animation_frame_rate;
        let mut report = TickReport {
            frame: self.frame,
            ..TickReport::default()
        };

        for fighter in self.roster.all_mut() {
            fighter.tick_state();
            fighter
                .update_animation(dt)
                .map_err(|source| ArenaError::Animation {
                    id: fighter.id,
                    source,
                })?;
        }

        self.update_facing();

        for fighter in self.roster.all_mut() {
            if fighter.update_boxes(frame_rate) == FrameLookup::Missing {
                let gap = FrameDataGap {
                    fighter: fighter.id,
                    animation: fighter.animator.current_state().unwrap_or_default().to_string(),
                    frame: fighter.animation_frame(frame_rate),
                };
                log::debug!(
                    "No frame data for '{}' frame {} (fighter {})",
                    gap.animation,
                    gap.frame,
                    gap.fighter
                );
                report.frame_data_gaps.push(gap);
            }
        }

        populate_grid(&mut self.grid, self.roster.all(), &self.bodies);

        let pairs = self.pushbox_pairs();
        report.contacts = self.contacts.update(&pairs).to_vec();

        report.hits = resolve_hits(
            self.roster.all(),
            &self.grid,
            &self.bodies,
            &self.registry,
            frame_rate,
        );
        for hit in &report.hits {
            self.apply_hit(hit);
        }

        Ok(report)
    }

    /// Fighters that are free to act turn towards the nearest opponent
    fn update_facing(&mut self) {
        let positions: Vec<(FighterId, Option<Vec2>, bool)> = self
            .roster
            .all()
            .iter()
            .map(|f| (f.id, f.position(&self.bodies), f.is_alive()))
            .collect();

        for fighter in self.roster.all_mut() {
            if !fighter.state().can_act() {
                continue;
            }
            let Some(own) = fighter.position(&self.bodies) else {
                continue;
            };
            let nearest = positions
                .iter()
                .filter(|(id, _, alive)| *id != fighter.id && *alive)
                .filter_map(|(_, position, _)| *position)
                .min_by(|a, b| a.distance_squared(own).total_cmp(&b.distance_squared(own)));
            if let Some(target) = nearest {
                fighter.face_towards(target.x, &self.bodies);
            }
        }
    }

    /// Overlapping pushboxes of different fighters, found through the grid
    fn pushbox_pairs(&self) -> Vec<(ColliderRef, ColliderRef)> {
        let mut pairs = Vec::new();

        for fighter in self.roster.all() {
            let pushbox = fighter.hitboxes.pushbox();
            if !pushbox.active {
                continue;
            }
            let own = ColliderRef::new(fighter.id, BoxSlot::Pushbox);

            for other in self.grid.colliders_in_aabb(&pushbox.aabb(&self.bodies)) {
                if other.slot != BoxSlot::Pushbox || other.owner <= fighter.id {
                    continue;
                }
                let Some(other_box) = self
                    .roster
                    .get(other.owner)
                    .map(|f| f.hitboxes.pushbox())
                else {
                    continue;
                };
                if pushbox.can_collide_with(other_box.layer) && pushbox.overlaps(other_box, &self.bodies) {
                    pairs.push((own, other));
                }
            }
        }

        pairs
    }

    fn apply_hit(&mut self, hit: &HitResult) {
        self.registry
            .register(hit.attacker, hit.attack_serial, hit.defender);
        if !hit.hit {
            return;
        }

        let (stage_min, stage_max) = (self.config.stage_min(), self.config.stage_max());
        let Some(defender) = self.roster.get_mut(hit.defender) else {
            return;
        };

        log::debug!(
            "Fighter {} hits fighter {} for {:.1}{}{}",
            hit.attacker,
            hit.defender,
            hit.damage,
            if hit.is_counter { " (counter)" } else { "" },
            if hit.blocked { " (blocked)" } else { "" }
        );

        defender.take_hit(hit.damage, hit.hitstun, hit.blockstun, hit.blocked);
        body::displace_body(&mut self.bodies, defender.body, hit.knockback, stage_min, stage_max);
    }

    /// Reset every fighter for a new round at the given spawn points
    pub fn reset_round(&mut self, spawns: &[(FighterId, Vec2)]) {
        for &(id, spawn) in spawns {
            if let Some(fighter) = self.roster.get_mut(id) {
                fighter.reset_round(&mut self.bodies, spawn);
            }
        }
        self.registry.clear();
        self.contacts.clear();
        log::info!("Round reset at frame {}", self.frame);
    }

    pub fn fighter(&self, id: FighterId) -> Result<&Fighter, ArenaError> {
        self.roster.get(id).ok_or(ArenaError::UnknownFighter(id))
    }

    pub fn fighter_mut(&mut self, id: FighterId) -> Result<&mut Fighter, ArenaError> {
        self.roster.get_mut(id).ok_or(ArenaError::UnknownFighter(id))
    }

    pub fn fighter_position(&self, id: FighterId) -> Option<Vec2> {
        self.roster.get(id)?.position(&self.bodies)
    }

    /// Teleport a fighter, clamped to the stage
    pub fn set_fighter_position(&mut self, id: FighterId, position: Vec2) -> Result<(), ArenaError> {
        let position = position.clamp(self.config.stage_min(), self.config.stage_max());
        let fighter = self.roster.get(id).ok_or(ArenaError::UnknownFighter(id))?;
        fighter.set_position(&mut self.bodies, position);
        Ok(())
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    pub fn roster(&self) -> &FighterRoster {
        &self.roster
    }

    pub fn bodies(&self) -> &RigidBodySet {
        &self.bodies
    }

    pub fn grid(&self) -> &SpatialGrid<ColliderRef> {
        &self.grid
    }

    pub fn registry(&self) -> &HitRegistry {
        &self.registry
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Round is over once at most one fighter is standing
    pub fn is_decided(&self) -> bool {
        self.roster.len() > 1 && self.roster.alive_count() <= 1
    }
}
