//! Occlusion-aware sound attenuation.
//!
//! Sound travels through air cells only. From the listener's cell we expand a
//! shortest-path field over the six face neighbours of every air cell, with
//! vertical steps costing more than horizontal ones, and attenuate each sound
//! by the path length to its origin rather than the straight-line distance.
//! A sound whose origin cannot be reached through air is not heard at all.

use crate::protocol::{SoundEvent, SoundKind};
use crate::voxel::{GridDims, VoxelGrid};
use glam::{IVec3, Vec3};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Sentinel cost for cells sound cannot reach.
pub const UNREACHABLE: u32 = u32::MAX;

/// Path costs are kept in tenths of a cell so the expansion stays integral.
pub const HORIZONTAL_STEP_COST: u32 = 10;
pub const VERTICAL_STEP_COST: u32 = 15;
const COST_PER_CELL: f32 = 10.0;

/// Path length, in cells, over which gain drops by a factor of e.
pub const SOUND_FALLOFF: f32 = 8.0;

/// Gains below this are treated as silence.
pub const MIN_AUDIBLE_GAIN: f32 = 0.01;

const NEIGHBORS_6: [(IVec3, u32); 6] = [
    (IVec3::new(1, 0, 0), HORIZONTAL_STEP_COST),
    (IVec3::new(-1, 0, 0), HORIZONTAL_STEP_COST),
    (IVec3::new(0, 0, 1), HORIZONTAL_STEP_COST),
    (IVec3::new(0, 0, -1), HORIZONTAL_STEP_COST),
    (IVec3::new(0, 1, 0), VERTICAL_STEP_COST),
    (IVec3::new(0, -1, 0), VERTICAL_STEP_COST),
];

impl SoundKind {
    /// Gain of this sound heard from its own cell.
    pub fn base_loudness(self) -> f32 {
        match self {
            SoundKind::Gunshot => 1.0,
            SoundKind::Footstep => 0.5,
        }
    }
}

/// Gain multiplier for a sound of `kind` heard `distance` cells away along
/// the shortest air path. Always within `[0, 1]`.
pub fn gain_at_distance(kind: SoundKind, distance: f32) -> f32 {
    if !distance.is_finite() {
        return 0.0;
    }
    let gain = kind.base_loudness() * (-distance.max(0.0) / SOUND_FALLOFF).exp();
    gain.clamp(0.0, 1.0)
}

/// Path cost from one listener cell to every cell of a grid.
#[derive(Debug, Clone)]
pub struct DistanceField {
    dims: GridDims,
    origin: IVec3,
    costs: Vec<u32>,
}

impl DistanceField {
    /// Expands the field from `origin`. A solid or out-of-bounds origin
    /// yields a field where nothing is reachable.
    pub fn compute(grid: &VoxelGrid, origin: IVec3) -> Self {
        let dims = grid.dims();
        let mut costs = vec![UNREACHABLE; dims.cell_count()];

        let start = match dims.index(origin) {
            Some(index) if !grid.is_solid(origin) => index,
            _ => {
                return Self {
                    dims,
                    origin,
                    costs,
                }
            }
        };

        costs[start] = 0;
        let mut frontier = BinaryHeap::new();
        frontier.push(Reverse((0u32, start)));

        while let Some(Reverse((cost, index))) = frontier.pop() {
            if cost > costs[index] {
                continue;
            }
            let cell = dims.cell(index);

            for (offset, step) in NEIGHBORS_6 {
                let next = cell + offset;
                let Some(next_index) = dims.index(next) else {
                    continue;
                };
                if grid.is_solid(next) {
                    continue;
                }
                let next_cost = cost + step;
                if next_cost < costs[next_index] {
                    costs[next_index] = next_cost;
                    frontier.push(Reverse((next_cost, next_index)));
                }
            }
        }

        Self {
            dims,
            origin,
            costs,
        }
    }

    /// Expands the field from the cell containing `listener`.
    pub fn from_listener(grid: &VoxelGrid, listener: Vec3) -> Self {
        Self::compute(grid, VoxelGrid::cell_of(listener))
    }

    pub fn origin(&self) -> IVec3 {
        self.origin
    }

    /// Raw path cost to `cell`, or `None` when sound cannot get there.
    pub fn cost(&self, cell: IVec3) -> Option<u32> {
        self.dims
            .index(cell)
            .map(|i| self.costs[i])
            .filter(|&c| c != UNREACHABLE)
    }

    /// Path length to `cell` in cells.
    pub fn distance(&self, cell: IVec3) -> Option<f32> {
        self.cost(cell).map(|c| c as f32 / COST_PER_CELL)
    }

    pub fn distance_to(&self, position: Vec3) -> Option<f32> {
        self.distance(VoxelGrid::cell_of(position))
    }

    pub fn reachable_count(&self) -> usize {
        self.costs.iter().filter(|&&c| c != UNREACHABLE).count()
    }

    /// Gain for `event` as heard by this field's listener, or `None` when the
    /// sound is occluded or too faint to play.
    pub fn gain_for(&self, event: &SoundEvent) -> Option<f32> {
        let distance = self.distance_to(event.position)?;
        let gain = gain_at_distance(event.kind, distance);
        (gain >= MIN_AUDIBLE_GAIN).then_some(gain)
    }
}
