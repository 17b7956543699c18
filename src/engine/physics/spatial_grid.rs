// Uniform-grid broad phase
//
// Only occupied cells are stored. Each collider is registered in every cell
// its bounds overlap, so queries have to deduplicate.

use super::collider::{Aabb, Collider};
use super::PhysicsError;
use glam::Vec2;
use rapier2d::prelude::RigidBodySet;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Integer cell coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub x: i32,
    pub y: i32,
}

impl CellKey {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Sparse spatial hash over a fixed world rectangle.
///
/// `H` is whatever handle the caller uses to identify colliders.
#[derive(Debug)]
pub struct SpatialGrid<H> {
    world_min: Vec2,
    world_max: Vec2,
    cell_size: f32,
    grid_width: i32,
    grid_height: i32,
    cells: HashMap<CellKey, Vec<H>>,
    /// Bounds each handle had when it was inserted
    entries: HashMap<H, Aabb>,
}

impl<H: Copy + Eq + Hash> SpatialGrid<H> {
    /// Create a grid covering `world_min..world_max` with square cells
    pub fn new(world_min: Vec2, world_max: Vec2, cell_size: f32) -> Result<Self, PhysicsError> {
        if !(cell_size > 0.0) || !cell_size.is_finite() {
            return Err(PhysicsError::InvalidGrid(format!(
                "cell size must be positive, got {}",
                cell_size
            )));
        }
        if world_max.x <= world_min.x || world_max.y <= world_min.y {
            return Err(PhysicsError::InvalidGrid(format!(
                "empty world bounds {:?}..{:?}",
                world_min, world_max
            )));
        }

        let extent = world_max - world_min;
        let grid_width = (extent.x / cell_size).ceil() as i32;
        let grid_height = (extent.y / cell_size).ceil() as i32;

        log::debug!(
            "Spatial grid {}x{} cells of {} units",
            grid_width,
            grid_height,
            cell_size
        );

        Ok(Self {
            world_min,
            world_max,
            cell_size,
            grid_width,
            grid_height,
            cells: HashMap::new(),
            entries: HashMap::new(),
        })
    }

    pub fn world_bounds(&self) -> Aabb {
        Aabb::new(self.world_min, self.world_max)
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Grid dimensions in cells
    pub fn dimensions(&self) -> (i32, i32) {
        (self.grid_width, self.grid_height)
    }

    /// Total cells covering the world
    pub fn cell_count(&self) -> usize {
        (self.grid_width as usize) * (self.grid_height as usize)
    }

    /// Cells currently holding at least one collider
    pub fn active_cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Registered colliders
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, handle: H) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Cell holding `position`, clamped onto the grid
    pub fn cell_key(&self, position: Vec2) -> CellKey {
        let local = (position - self.world_min) / self.cell_size;
        CellKey::new(
            (local.x.floor() as i32).clamp(0, self.grid_width - 1),
            (local.y.floor() as i32).clamp(0, self.grid_height - 1),
        )
    }

    /// Register a collider under every cell its current bounds overlap.
    ///
    /// Inactive colliders are skipped. Re-inserting a handle replaces its
    /// previous registration.
    pub fn insert(&mut self, handle: H, collider: &Collider, bodies: &RigidBodySet) -> bool {
        if !collider.active {
            return false;
        }

        if self.entries.contains_key(&handle) {
            self.remove(handle);
        }

        let bounds = collider.aabb(bodies);
        for key in self.keys_for(&bounds) {
            self.cells.entry(key).or_default().push(handle);
        }
        self.entries.insert(handle, bounds);
        true
    }

    /// Remove a collider from every cell it was inserted into. Cells left
    /// empty are dropped.
    pub fn remove(&mut self, handle: H) -> bool {
        let Some(bounds) = self.entries.remove(&handle) else {
            return false;
        };

        for key in self.keys_for(&bounds) {
            if let Some(bucket) = self.cells.get_mut(&key) {
                bucket.retain(|h| *h != handle);
                if bucket.is_empty() {
                    self.cells.remove(&key);
                }
            }
        }
        true
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.entries.clear();
    }

    /// Every distinct collider registered in a cell overlapping `area`.
    ///
    /// This is a broad-phase answer; callers run the exact test themselves.
    /// Results come back in row-major cell order, first occurrence wins.
    pub fn colliders_in_aabb(&self, area: &Aabb) -> Vec<H> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();

        for key in self.keys_for(area) {
            if let Some(bucket) = self.cells.get(&key) {
                for &handle in bucket {
                    if seen.insert(handle) {
                        result.push(handle);
                    }
                }
            }
        }
        result
    }

    /// Colliders whose inserted bounds' center lies within `radius` of `center`
    pub fn colliders_in_radius(&self, center: Vec2, radius: f32) -> Vec<H> {
        let area = Aabb::from_center_half_extents(center, Vec2::splat(radius));
        let radius_sq = radius * radius;

        self.colliders_in_aabb(&area)
            .into_iter()
            .filter(|handle| {
                self.entries
                    .get(handle)
                    .map_or(false, |bounds| bounds.center().distance_squared(center) <= radius_sq)
            })
            .collect()
    }

    /// Occupied cells with their bounds, sorted by cell key
    pub fn active_cells(&self) -> Vec<(CellKey, Aabb)> {
        let mut keys: Vec<CellKey> = self.cells.keys().copied().collect();
        keys.sort_by_key(|key| (key.y, key.x));

        keys.into_iter()
            .map(|key| {
                let min = self.world_min + Vec2::new(key.x as f32, key.y as f32) * self.cell_size;
                (key, Aabb::new(min, min + Vec2::splat(self.cell_size)))
            })
            .collect()
    }

    fn keys_for(&self, bounds: &Aabb) -> Vec<CellKey> {
        let min = self.cell_key(bounds.min);
        let max = self.cell_key(bounds.max);
        // Inverted bounds cover no cells
        if max.x < min.x || max.y < min.y {
            return Vec::new();
        }

        let mut keys = Vec::with_capacity(((max.x - min.x + 1) * (max.y - min.y + 1)) as usize);
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                keys.push(CellKey::new(x, y));
            }
        }
        keys
    }
}
