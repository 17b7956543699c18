// Hit detection between fighters
//
// Per tick: every active box goes into the spatial grid, then each attacker's
// hitboxes query the grid for opposing hurtboxes. Candidates are visited in
// roster order, then hitbox slot order, then grid order, so the same inputs
// always resolve to the same hits.

use super::damage::{
    calculate_damage, calculate_hitstun, calculate_knockback, AttackData, DefenseData,
};
use crate::engine::physics::{HitProperties, RigidBodySet, SpatialGrid};
use crate::game::characters::{BoxSlot, CombatState, Fighter, FighterId};
use glam::Vec2;
use std::collections::{HashMap, HashSet};

/// Blocked hits push the defender back at this fraction of the knockback
const BLOCK_PUSHBACK: f32 = 0.5;

/// Non-owning reference to one box of one fighter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderRef {
    pub owner: FighterId,
    pub slot: BoxSlot,
}

impl ColliderRef {
    pub fn new(owner: FighterId, slot: BoxSlot) -> Self {
        Self { owner, slot }
    }
}

/// Outcome of one hitbox touching one hurtbox
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    /// `false` when the hit lost a clash and must not be applied
    pub hit: bool,
    pub damage: f32,
    pub hitstun: u32,
    pub blockstun: u32,
    /// Displacement to apply to the defender
    pub knockback: Vec2,
    pub hitbox: ColliderRef,
    pub hurtbox: ColliderRef,
    pub attacker: FighterId,
    pub defender: FighterId,
    pub is_counter: bool,
    pub is_trade_hit: bool,
    pub blocked: bool,
    /// Attack instance that produced the hit
    pub attack_serial: u64,
}

/// Remembers which attack instance already hit which defender
#[derive(Debug, Default)]
pub struct HitRegistry {
    landed: HashMap<(FighterId, FighterId), u64>,
}

impl HitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_hit(&self, attacker: FighterId, attack_serial: u64, defender: FighterId) -> bool {
        self.landed.get(&(attacker, defender)) == Some(&attack_serial)
    }

    /// Record a hit. Returns `false` if this attack already hit `defender`.
    pub fn register(&mut self, attacker: FighterId, attack_serial: u64, defender: FighterId) -> bool {
        self.landed.insert((attacker, defender), attack_serial) != Some(attack_serial)
    }

    /// Drop every entry involving `fighter`
    pub fn forget_fighter(&mut self, fighter: FighterId) {
        self.landed
            .retain(|&(attacker, defender), _| attacker != fighter && defender != fighter);
    }

    pub fn clear(&mut self) {
        self.landed.clear();
    }

    pub fn len(&self) -> usize {
        self.landed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landed.is_empty()
    }
}

/// Rebuild `grid` from every active box of every fighter
pub fn populate_grid(grid: &mut SpatialGrid<ColliderRef>, fighters: &[Fighter], bodies: &RigidBodySet) {
    grid.clear();
    for fighter in fighters {
        for (slot, collider) in fighter.hitboxes.active_colliders() {
            grid.insert(ColliderRef::new(fighter.id, slot), collider, bodies);
        }
    }
}

/// Hitbox/hurtbox overlap that survived broad and narrow phase
#[derive(Debug, Clone, Copy)]
struct Contact {
    attacker: usize,
    defender: usize,
    hitbox: ColliderRef,
    hurtbox: ColliderRef,
    hit: HitProperties,
}

fn find_contacts(
    fighters: &[Fighter],
    grid: &SpatialGrid<ColliderRef>,
    bodies: &RigidBodySet,
    registry: &HitRegistry,
) -> Vec<Contact> {
    let mut contacts = Vec::new();
    let mut pairs: HashSet<(usize, usize)> = HashSet::new();

    for (attacker_index, attacker) in fighters.iter().enumerate() {
        if !attacker.is_alive() {
            continue;
        }

        for (slot, hitbox) in attacker.hitboxes.active_hitboxes() {
            let area = hitbox.aabb(bodies);

            for candidate in grid.colliders_in_aabb(&area) {
                if candidate.owner == attacker.id || !matches!(candidate.slot, BoxSlot::Hurtbox(_)) {
                    continue;
                }
                let Some(defender_index) = fighters.iter().position(|f| f.id == candidate.owner)
                else {
                    continue;
                };
                if pairs.contains(&(attacker_index, defender_index)) {
                    continue;
                }

                let defender = &fighters[defender_index];
                if !defender.is_alive()
                    || registry.has_hit(attacker.id, attacker.animation_serial(), defender.id)
                {
                    continue;
                }
                let Some(hurtbox) = defender.hitboxes.collider(candidate.slot) else {
                    continue;
                };
                if !hurtbox.active
                    || !hitbox.can_collide_with(hurtbox.layer)
                    || !hitbox.overlaps(hurtbox, bodies)
                {
                    continue;
                }

                pairs.insert((attacker_index, defender_index));
                contacts.push(Contact {
                    attacker: attacker_index,
                    defender: defender_index,
                    hitbox: ColliderRef::new(attacker.id, BoxSlot::Hitbox(slot)),
                    hurtbox: candidate,
                    hit: hitbox.hit,
                });
            }
        }
    }

    contacts
}

/// Settle fighters hitting each other on the same tick.
/// Returns (landed, trade) flags per contact.
fn resolve_clashes(contacts: &[Contact]) -> Vec<(bool, bool)> {
    let mut outcome = vec![(true, false); contacts.len()];

    for (i, a) in contacts.iter().enumerate() {
        for (j, b) in contacts.iter().enumerate().skip(i + 1) {
            if a.attacker != b.defender || a.defender != b.attacker {
                continue;
            }
            match a.hit.priority.cmp(&b.hit.priority) {
                std::cmp::Ordering::Greater => outcome[j].0 = false,
                std::cmp::Ordering::Less => outcome[i].0 = false,
                std::cmp::Ordering::Equal => {
                    outcome[i].1 = true;
                    outcome[j].1 = true;
                }
            }
        }
    }

    outcome
}

fn build_result(fighters: &[Fighter], contact: &Contact, trade: bool, frame_rate: f32) -> HitResult {
    let attacker = &fighters[contact.attacker];
    let defender = &fighters[contact.defender];

    let blocked = defender.state().is_blocking();
    let is_counter = !blocked && defender.in_attack_startup(frame_rate);

    let attack = AttackData {
        power_modifier: attacker.stats.attack_power,
        combo_count: defender.combo_count,
        element: attacker.stats.element,
        is_counter,
        ..AttackData::new(contact.hit.damage)
    };
    let defense = DefenseData {
        element: defender.stats.element,
        state: if blocked {
            CombatState::Defending
        } else {
            defender.state()
        },
        ..DefenseData::new(defender.stats.defense)
    };
    let damage = calculate_damage(&attack, &defense);

    let direction = contact
        .hit
        .knockback
        .try_normalize()
        .unwrap_or(Vec2::new(attacker.facing.sign(), 0.0));
    let mut magnitude = calculate_knockback(damage, defender.stats.weight);
    if blocked {
        magnitude *= BLOCK_PUSHBACK;
    }

    HitResult {
        hit: true,
        damage,
        hitstun: if blocked {
            0
        } else {
            calculate_hitstun(damage, is_counter).max(contact.hit.hitstun)
        },
        blockstun: if blocked { contact.hit.blockstun } else { 0 },
        knockback: direction * magnitude,
        hitbox: contact.hitbox,
        hurtbox: contact.hurtbox,
        attacker: attacker.id,
        defender: defender.id,
        is_counter,
        is_trade_hit: trade,
        blocked,
        attack_serial: attacker.animation_serial(),
    }
}

/// Resolve every hit landing this tick.
///
/// `grid` must already hold this tick's boxes (see [`populate_grid`]).
/// Hits that lost a clash come back with `hit == false`.
pub fn resolve_hits(
    fighters: &[Fighter],
    grid: &SpatialGrid<ColliderRef>,
    bodies: &RigidBodySet,
    registry: &HitRegistry,
    frame_rate: f32,
) -> Vec<HitResult> {
    let contacts = find_contacts(fighters, grid, bodies, registry);
    let outcome = resolve_clashes(&contacts);

    contacts
        .iter()
        .zip(outcome)
        .map(|(contact, (landed, trade))| {
            let mut result = build_result(fighters, contact, trade, frame_rate);
            if !landed {
                log::debug!(
                    "Fighter {} lost a clash against fighter {}",
                    result.attacker,
                    result.defender
                );
                result = HitResult {
                    hit: false,
                    damage: 0.0,
                    hitstun: 0,
                    blockstun: 0,
                    knockback: Vec2::ZERO,
                    is_counter: false,
                    is_trade_hit: false,
                    ..result
                };
            }
            result
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::characters::presets::{self, JAB};
    use crate::engine::physics::LayerMask;
    use crate::game::characters::{Facing, FighterRoster, FrameData};
    use approx::assert_relative_eq;

    const RATE: f32 = 60.0;

    struct Bout {
        roster: FighterRoster,
        bodies: RigidBodySet,
        grid: SpatialGrid<ColliderRef>,
        p1: FighterId,
        p2: FighterId,
    }

    fn bout() -> Bout {
        let mut bodies = RigidBodySet::new();
        let mut roster = FighterRoster::new();
        let p1 = roster
            .spawn(presets::training_dummy("p1").unwrap(), &mut bodies, Vec2::new(-40.0, 0.0))
            .unwrap();
        let p2 = roster
            .spawn(presets::training_dummy("p2").unwrap(), &mut bodies, Vec2::new(40.0, 0.0))
            .unwrap();
        roster.get_mut(p2).unwrap().facing = Facing::Left;

        let grid = SpatialGrid::new(Vec2::new(-500.0, -100.0), Vec2::new(500.0, 700.0), 50.0).unwrap();
        Bout {
            roster,
            bodies,
            grid,
            p1,
            p2,
        }
    }

    fn active_jab() -> FrameData {
        let frames = presets::training_frame_data(crate::game::characters::BodyArchetype::Medium);
        let jab = &frames.iter().find(|(name, _)| name == JAB).unwrap().1;
        jab[presets::JAB_ACTIVE_START]
    }

    fn throw_jab(roster: &mut FighterRoster, id: FighterId, frame: &FrameData) {
        let fighter = roster.get_mut(id).unwrap();
        let facing = fighter.facing;
        fighter.hitboxes.apply_frame_data(frame, facing);
    }

    fn resolve(bout: &mut Bout, registry: &HitRegistry) -> Vec<HitResult> {
        populate_grid(&mut bout.grid, bout.roster.all(), &bout.bodies);
        resolve_hits(bout.roster.all(), &bout.grid, &bout.bodies, registry, RATE)
    }

    #[test]
    fn test_clean_hit() {
        let mut bout = bout();
        throw_jab(&mut bout.roster, bout.p1, &active_jab());

        let hits = resolve(&mut bout, &HitRegistry::new());
        assert_eq!(hits.len(), 1);

        let hit = hits[0];
        assert!(hit.hit);
        assert_eq!(hit.attacker, bout.p1);
        assert_eq!(hit.defender, bout.p2);
        assert_eq!(hit.hitbox, ColliderRef::new(bout.p1, BoxSlot::Hitbox(0)));
        assert_eq!(hit.hurtbox.owner, bout.p2);
        assert!(matches!(hit.hurtbox.slot, BoxSlot::Hurtbox(_)));

        // 60 x 100 / (100 + 100)
        assert_relative_eq!(hit.damage, 30.0, epsilon = 1e-4);
        assert_eq!(hit.hitstun, 15);
        assert_eq!(hit.blockstun, 0);
        assert_relative_eq!(hit.knockback.x, 8.0, epsilon = 1e-4);
        assert_relative_eq!(hit.knockback.y, 0.0);
        assert!(!hit.is_counter && !hit.is_trade_hit && !hit.blocked);
    }

    #[test]
    fn test_out_of_range_misses() {
        let mut bout = bout();
        let p2 = bout.roster.get(bout.p2).unwrap();
        p2.set_position(&mut bout.bodies, Vec2::new(200.0, 0.0));
        throw_jab(&mut bout.roster, bout.p1, &active_jab());

        assert!(resolve(&mut bout, &HitRegistry::new()).is_empty());
    }

    #[test]
    fn test_hitbox_mask_filters_defender_layer() {
        let mut bout = bout();
        let p2_layer = bout.roster.get(bout.p2).unwrap().hitboxes.layer();
        {
            let p1 = bout.roster.get_mut(bout.p1).unwrap();
            let mask = LayerMask::ALL_PLAYERS
                .without(p1.hitboxes.layer())
                .without(p2_layer);
            p1.hitboxes.set_target_mask(mask);
        }
        throw_jab(&mut bout.roster, bout.p1, &active_jab());

        assert!(resolve(&mut bout, &HitRegistry::new()).is_empty());
    }

    #[test]
    fn test_registry_prevents_rehit() {
        let mut bout = bout();
        throw_jab(&mut bout.roster, bout.p1, &active_jab());

        let mut registry = HitRegistry::new();
        let serial = bout.roster.get(bout.p1).unwrap().animation_serial();
        assert!(registry.register(bout.p1, serial, bout.p2));
        assert!(!registry.register(bout.p1, serial, bout.p2));

        assert!(resolve(&mut bout, &registry).is_empty());

        registry.forget_fighter(bout.p2);
        assert!(registry.is_empty());
        assert_eq!(resolve(&mut bout, &registry).len(), 1);
    }

    #[test]
    fn test_equal_priority_trades() {
        let mut bout = bout();
        let jab = active_jab();
        throw_jab(&mut bout.roster, bout.p1, &jab);
        throw_jab(&mut bout.roster, bout.p2, &jab);

        let hits = resolve(&mut bout, &HitRegistry::new());
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|hit| hit.hit && hit.is_trade_hit));
        assert_eq!(hits[0].attacker, bout.p1);
        assert_eq!(hits[1].attacker, bout.p2);
    }

    #[test]
    fn test_higher_priority_wins_clash() {
        let mut bout = bout();
        let jab = active_jab();
        let mut heavy = jab;
        heavy.hitboxes[0].hit.priority = 3;
        throw_jab(&mut bout.roster, bout.p1, &jab);
        throw_jab(&mut bout.roster, bout.p2, &heavy);

        let hits = resolve(&mut bout, &HitRegistry::new());
        assert_eq!(hits.len(), 2);

        let lost = hits.iter().find(|hit| hit.attacker == bout.p1).unwrap();
        let won = hits.iter().find(|hit| hit.attacker == bout.p2).unwrap();
        assert!(!lost.hit);
        assert_eq!(lost.damage, 0.0);
        assert!(won.hit);
        assert!(!won.is_trade_hit);
        assert_relative_eq!(won.knockback.x, -8.0, epsilon = 1e-4);
    }

    #[test]
    fn test_blocked_hit() {
        let mut bout = bout();
        bout.roster.get_mut(bout.p2).unwrap().set_blocking(true);
        throw_jab(&mut bout.roster, bout.p1, &active_jab());

        let hits = resolve(&mut bout, &HitRegistry::new());
        let hit = hits[0];
        assert!(hit.blocked);
        assert_relative_eq!(hit.damage, 9.0, epsilon = 1e-4);
        assert_eq!(hit.hitstun, 0);
        assert_eq!(hit.blockstun, 11);
        assert!(!hit.is_counter);
    }

    #[test]
    fn test_counter_hit_during_startup() {
        let mut bout = bout();
        {
            let p2 = bout.roster.get_mut(bout.p2).unwrap();
            assert!(p2.start_attack(JAB));
            p2.update_animation(1.0 / 60.0).unwrap();
            assert!(p2.in_attack_startup(RATE));
        }
        throw_jab(&mut bout.roster, bout.p1, &active_jab());

        let hits = resolve(&mut bout, &HitRegistry::new());
        let hit = hits[0];
        assert!(hit.is_counter);
        assert_relative_eq!(hit.damage, 45.0, epsilon = 1e-4);
        assert_eq!(hit.hitstun, 24);
    }

    #[test]
    fn test_combo_scaling_applies() {
        let mut bout = bout();
        bout.roster.get_mut(bout.p2).unwrap().combo_count = 1;
        throw_jab(&mut bout.roster, bout.p1, &active_jab());

        let hits = resolve(&mut bout, &HitRegistry::new());
        assert_relative_eq!(hits[0].damage, 27.0, epsilon = 1e-4);
    }

    #[test]
    fn test_knocked_out_fighters_ignored() {
        let mut bout = bout();
        bout.roster.get_mut(bout.p2).unwrap().combat.knock_out();
        throw_jab(&mut bout.roster, bout.p1, &active_jab());

        assert!(resolve(&mut bout, &HitRegistry::new()).is_empty());
    }
}
