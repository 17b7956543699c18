use std::collections::HashSet;
use std::hash::Hash;

/// Collision layers for filtering what colliders can interact with each other
///
/// Each fighter slot gets its own layer so a hitbox can target every player
/// except its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionLayer {
    Player1 = 1 << 0,
    Player2 = 1 << 1,
    Player3 = 1 << 2,
    Player4 = 1 << 3,
    Projectile1 = 1 << 4,
    Projectile2 = 1 << 5,
    Projectile3 = 1 << 6,
    Projectile4 = 1 << 7,
    Environment = 1 << 8,
    Trigger = 1 << 9,
    Item = 1 << 10,
    Platform = 1 << 11,
}

impl CollisionLayer {
    /// Layer for the fighter in roster slot `index` (0..4)
    pub fn player(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Player1),
            1 => Some(Self::Player2),
            2 => Some(Self::Player3),
            3 => Some(Self::Player4),
            _ => None,
        }
    }

    /// Projectile layer owned by the fighter in roster slot `index`
    pub fn projectile(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Projectile1),
            1 => Some(Self::Projectile2),
            2 => Some(Self::Projectile3),
            3 => Some(Self::Projectile4),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        self as u32
    }
}

/// Bitmask of layers a collider is allowed to interact with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(0xFFFF);
    pub const ALL_PLAYERS: LayerMask = LayerMask(0b1111);
    pub const ALL_PROJECTILES: LayerMask = LayerMask(0b1111_0000);
    pub const SOLID_OBJECTS: LayerMask = LayerMask(
        0b1111 | CollisionLayer::Environment as u32 | CollisionLayer::Platform as u32,
    );

    pub fn contains(self, layer: CollisionLayer) -> bool {
        self.0 & layer.bits() != 0
    }

    pub fn with(self, layer: CollisionLayer) -> Self {
        LayerMask(self.0 | layer.bits())
    }

    pub fn without(self, layer: CollisionLayer) -> Self {
        LayerMask(self.0 & !layer.bits())
    }

    /// Every player layer except `layer`: the usual mask for a fighter's attacks
    pub fn opponents_of(layer: CollisionLayer) -> Self {
        Self::ALL_PLAYERS.without(layer)
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

/// Contact event between two colliders, reported once per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionEvent<K> {
    /// The pair started overlapping this tick
    Started(K, K),
    /// The pair was already overlapping last tick
    Ongoing(K, K),
    /// The pair stopped overlapping this tick
    Stopped(K, K),
}

/// Turns per-tick overlap sets into enter/stay/exit events.
///
/// Events come out in a stable order: started and ongoing pairs in the order
/// they were reported this tick, then stopped pairs in last tick's order.
#[derive(Debug)]
pub struct ContactTracker<K> {
    previous: Vec<(K, K)>,
    events: Vec<CollisionEvent<K>>,
}

impl<K: Copy + Eq + Hash> ContactTracker<K> {
    pub fn new() -> Self {
        Self {
            previous: Vec::new(),
            events: Vec::with_capacity(32),
        }
    }

    /// Feed this tick's overlapping pairs and return the resulting events
    pub fn update(&mut self, pairs: &[(K, K)]) -> &[CollisionEvent<K>] {
        self.events.clear();

        let previous: HashSet<(K, K)> = self.previous.iter().copied().collect();
        let mut current: HashSet<(K, K)> = HashSet::with_capacity(pairs.len());
        let mut ordered = Vec::with_capacity(pairs.len());

        for &(a, b) in pairs {
            if !current.insert((a, b)) {
                continue;
            }
            ordered.push((a, b));

            if previous.contains(&(a, b)) {
                self.events.push(CollisionEvent::Ongoing(a, b));
            } else {
                self.events.push(CollisionEvent::Started(a, b));
            }
        }

        for &(a, b) in &self.previous {
            if !current.contains(&(a, b)) {
                self.events.push(CollisionEvent::Stopped(a, b));
            }
        }

        self.previous = ordered;
        &self.events
    }

    /// Forget all tracked contacts without emitting events
    pub fn clear(&mut self) {
        self.previous.clear();
        self.events.clear();
    }

    /// Number of pairs overlapping as of the last update
    pub fn active_contacts(&self) -> usize {
        self.previous.len()
    }
}

impl<K: Copy + Eq + Hash> Default for ContactTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}
