//! Uniform spatial grid over a bounded 3-D box.
//!
//! Agents are bucketed by `floor((p - min) / cell_size)` on each axis.
//! Coordinates outside the box are clamped into the boundary cells, so an
//! agent that drifts out of the domain is still found by queries near the
//! boundary. Clamping never moves two cells further apart than they really
//! are, which keeps the ring-based query free of false negatives.

use std::collections::HashMap;

use glam::{DVec3, IVec3};

use crate::{
    config::{GridConfig, ensure_positive},
    error::{Result, SimError},
    types::AgentId,
};

/// Upper bound on the number of buckets a grid may allocate.
pub const MAX_GRID_CELLS: usize = 1 << 21;

/// Cells per axis and total bucket count for `cfg`.
///
/// The count is checked in floating point before any integer conversion,
/// so absurd cell sizes fail as configuration errors instead of
/// overflowing.
pub(crate) fn grid_dims(cfg: &GridConfig) -> Result<(IVec3, usize)> {
    ensure_positive("grid.cell_size", cfg.cell_size)?;
    let extent = cfg.max - cfg.min;
    if !extent.is_finite() || extent.min_element() <= 0.0 {
        return Err(SimError::configuration(
            "grid.max must exceed grid.min on every axis",
        ));
    }

    let cells = (extent / cfg.cell_size).ceil().max(DVec3::ONE);
    let total = cells.x * cells.y * cells.z;
    if !(total <= MAX_GRID_CELLS as f64) {
        return Err(SimError::configuration(format!(
            "grid.cell_size {} gives {total:.3e} cells, more than the limit of {MAX_GRID_CELLS}",
            cfg.cell_size
        )));
    }
    let dims = cells.as_ivec3();
    Ok((dims, total as usize))
}

#[derive(Debug, Clone)]
struct Entry {
    cell: usize,
    position: DVec3,
}

/// Bucketed index mapping agents to grid cells and back.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    min: DVec3,
    cell_size: f64,
    dims: IVec3,
    buckets: Vec<Vec<AgentId>>,
    entries: HashMap<AgentId, Entry>,
}

impl SpatialGrid {
    /// Builds an empty grid covering `cfg.min..cfg.max`.
    ///
    /// ### Errors
    /// `Configuration` if the cell size is not positive, the box is empty,
    /// or the box holds more than [`MAX_GRID_CELLS`] cells.
    pub fn new(cfg: &GridConfig) -> Result<Self> {
        let (dims, count) = grid_dims(cfg)?;
        Ok(Self {
            min: cfg.min,
            cell_size: cfg.cell_size,
            dims,
            buckets: vec![Vec::new(); count],
            entries: HashMap::new(),
        })
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Last position recorded for `id`.
    pub fn position(&self, id: AgentId) -> Option<DVec3> {
        self.entries.get(&id).map(|e| e.position)
    }

    /// Integer cell coordinates for `p`, clamped into the grid.
    fn coords(&self, p: DVec3) -> IVec3 {
        let raw = ((p - self.min) / self.cell_size).floor();
        // NaN lands in cell 0 instead of poisoning the index.
        let raw = DVec3::select(raw.cmpeq(raw), raw, DVec3::ZERO);
        let hi = (self.dims - IVec3::ONE).as_dvec3();
        raw.clamp(DVec3::ZERO, hi).as_ivec3()
    }

    #[inline]
    fn flat(&self, c: IVec3) -> usize {
        let (nx, ny) = (self.dims.x as usize, self.dims.y as usize);
        c.x as usize + nx * (c.y as usize + ny * c.z as usize)
    }

    /// Adds `id` at `position`; an existing entry is moved instead.
    pub fn insert(&mut self, id: AgentId, position: DVec3) {
        if self.entries.contains_key(&id) {
            self.update(id, position);
            return;
        }
        let cell = self.flat(self.coords(position));
        self.buckets[cell].push(id);
        self.entries.insert(id, Entry { cell, position });
    }

    /// Moves `id` to `position`; the bucket changes only when the cell does.
    ///
    /// Returns `false` if `id` is not in the grid.
    pub fn update(&mut self, id: AgentId, position: DVec3) -> bool {
        let new_cell = self.flat(self.coords(position));
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };
        entry.position = position;
        if entry.cell != new_cell {
            let old_cell = entry.cell;
            entry.cell = new_cell;
            self.buckets[old_cell].retain(|a| *a != id);
            self.buckets[new_cell].push(id);
        }
        true
    }

    /// Removes `id`, returning whether it was present.
    pub fn remove(&mut self, id: AgentId) -> bool {
        match self.entries.remove(&id) {
            Some(entry) => {
                self.buckets[entry.cell].retain(|a| *a != id);
                true
            }
            None => false,
        }
    }

    /// Candidate agents that may lie within `radius` of `position`.
    ///
    /// The result is a superset of the exact neighbor set; callers filter
    /// by real distance. No ordering is promised.
    pub fn neighbors(&self, position: DVec3, radius: f64) -> Vec<AgentId> {
        let mut out = Vec::new();
        self.neighbors_into(position, radius, &mut out);
        out
    }

    /// Same as [`SpatialGrid::neighbors`], appending into a reusable buffer.
    pub fn neighbors_into(&self, position: DVec3, radius: f64, out: &mut Vec<AgentId>) {
        let center = self.coords(position);
        let rings = (radius.max(0.0) / self.cell_size).ceil();
        // Rings past the grid extent add nothing.
        let rings = rings.min(self.dims.max_element() as f64) as i32;
        let lo = (center - IVec3::splat(rings)).max(IVec3::ZERO);
        let hi = (center + IVec3::splat(rings)).min(self.dims - IVec3::ONE);

        for z in lo.z..=hi.z {
            for y in lo.y..=hi.y {
                for x in lo.x..=hi.x {
                    out.extend_from_slice(&self.buckets[self.flat(IVec3::new(x, y, z))]);
                }
            }
        }
    }
}
