//! Projectile flight and swept collision.
//!
//! A projectile covers several cells per tick, so sampling its end position
//! alone would let it pass through thin walls and fast-moving bodies. Each
//! tick the whole path segment is walked cell by cell and cut where it first
//! enters solid ground, and players are tested against the cut segment.

use crate::entity::{Player, Projectile};
use crate::pool::SlotPool;
use glam::{IVec3, Vec3};
use log::info;
use shared::{VoxelGrid, PLAYER_RADIUS, PROJECTILE_RADIUS, PROJECTILE_SPEED};
use std::time::Instant;

/// A projectile that struck a player this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub shooter: u32,
    pub victim: u32,
    pub position: Vec3,
}

/// True when the segment from `start` to `end` passes strictly closer than
/// `radius` to `center`.
pub fn segment_hits_sphere(start: Vec3, end: Vec3, center: Vec3, radius: f32) -> bool {
    let segment = end - start;
    let to_center = center - start;

    let length_sq = segment.length_squared();
    if length_sq == 0.0 {
        return to_center.length() < radius;
    }

    let t = (to_center.dot(segment) / length_sq).clamp(0.0, 1.0);
    let closest = start + segment * t;
    closest.distance(center) < radius
}

/// Fraction along `start..end` at which the segment first enters a solid or
/// out-of-bounds cell, or `None` if the whole segment stays in air.
///
/// Starting inside a solid cell answers `Some(0.0)`.
pub fn first_blocked_fraction(grid: &VoxelGrid, start: Vec3, end: Vec3) -> Option<f32> {
    let delta = end - start;
    let mut cell = VoxelGrid::cell_of(start);
    if grid.is_solid(cell) {
        return Some(0.0);
    }

    let mut step = IVec3::ZERO;
    let mut t_max = Vec3::splat(f32::INFINITY);
    let mut t_delta = Vec3::splat(f32::INFINITY);

    for axis in 0..3 {
        if delta[axis] > 0.0 {
            step[axis] = 1;
            t_max[axis] = ((cell[axis] + 1) as f32 - start[axis]) / delta[axis];
            t_delta[axis] = 1.0 / delta[axis];
        } else if delta[axis] < 0.0 {
            step[axis] = -1;
            t_max[axis] = (start[axis] - cell[axis] as f32) / -delta[axis];
            t_delta[axis] = 1.0 / -delta[axis];
        }
    }

    loop {
        let axis = if t_max.x <= t_max.y && t_max.x <= t_max.z {
            0
        } else if t_max.y <= t_max.z {
            1
        } else {
            2
        };

        let t = t_max[axis];
        if t > 1.0 {
            return None;
        }

        cell[axis] += step[axis];
        t_max[axis] += t_delta[axis];

        if grid.is_solid(cell) {
            return Some(t);
        }
    }
}

/// Moves every projectile by one tick. Projectiles that hit a player or
/// enter solid ground are freed; struck players are killed.
pub fn advance_projectiles(
    projectiles: &mut SlotPool<Projectile>,
    players: &mut SlotPool<Player>,
    grid: &VoxelGrid,
    dt: f32,
    now: Instant,
) -> Vec<Hit> {
    let mut hits = Vec::new();
    let reach = PROJECTILE_SPEED * dt;
    let hit_radius = PLAYER_RADIUS + PROJECTILE_RADIUS;

    for index in 0..projectiles.capacity() {
        let Some(projectile) = projectiles.get_mut(index) else {
            continue;
        };

        let start = projectile.position;
        let mut end = start + projectile.direction * reach;
        let blocked = first_blocked_fraction(grid, start, end);
        if let Some(t) = blocked {
            end = start + (end - start) * t;
        }
        projectile.position = end;
        let shooter = projectile.owner_id;

        let victim = players.values_mut().find(|p| {
            p.alive && p.id != shooter && segment_hits_sphere(start, end, p.position, hit_radius)
        });

        if let Some(victim) = victim {
            victim.kill(now);
            info!("Player {} was hit by player {}", victim.id, shooter);
            hits.push(Hit {
                shooter,
                victim: victim.id,
                position: end,
            });
            projectiles.remove(index);
        } else if blocked.is_some() {
            projectiles.remove(index);
        }
    }

    hits
}
