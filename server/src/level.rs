//! Procedural level generation.
//!
//! The level starts as a solid block. Every floor gets a handful of randomly
//! placed rooms that do not overlap on the x/z plane, consecutive rooms are
//! joined by L-shaped tunnels, and floors are linked to each other by ramps
//! that walk a straight line between two room centers. The result is best
//! effort: a floor that cannot fit all of its rooms is reported, never fatal.

use crate::config::{FloorSpec, LevelConfig};
use glam::{IVec3, Vec3};
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{Voxel, VoxelGrid, FALLBACK_SPAWN, PLAYER_HEIGHT};

/// Rectangular block of air carved during generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Room {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub width: i32,
    pub height: i32,
    pub length: i32,
}

impl Room {
    /// Overlap on the x/z plane only; floors never share a room.
    pub fn intersects(&self, other: &Room) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.z < other.z + other.length
            && self.z + self.length > other.z
    }

    pub fn center(&self) -> IVec3 {
        IVec3::new(self.x + self.width / 2, self.y, self.z + self.length / 2)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloorReport {
    pub y: i32,
    pub rooms_placed: usize,
    pub rooms_wanted: usize,
}

/// What the generator actually managed to build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub floors: Vec<FloorReport>,
    pub ramps_built: usize,
    pub spawn_points: usize,
}

impl GenerationReport {
    pub fn is_complete(&self) -> bool {
        self.floors.iter().all(|f| f.rooms_placed >= f.rooms_wanted)
    }

    pub fn rooms_placed(&self) -> usize {
        self.floors.iter().map(|f| f.rooms_placed).sum()
    }
}

/// A generated world together with the places players may appear.
#[derive(Debug, Clone)]
pub struct Level {
    pub grid: VoxelGrid,
    /// Cell centers of floor cells, one cell above solid ground.
    pub spawn_points: Vec<Vec3>,
    pub report: GenerationReport,
}

impl Level {
    /// Wraps an existing grid; every air cell resting on solid ground becomes
    /// a spawn point.
    pub fn from_grid(grid: VoxelGrid) -> Self {
        let spawn_points = grid
            .iter()
            .filter(|&(cell, voxel)| !voxel.is_solid() && grid.is_solid(cell - IVec3::Y))
            .map(|(cell, _)| cell_center(cell))
            .collect::<Vec<_>>();
        let report = GenerationReport {
            spawn_points: spawn_points.len(),
            ..GenerationReport::default()
        };
        Self {
            grid,
            spawn_points,
            report,
        }
    }

    /// Body-center position for a fresh player: a random spawn point lifted by
    /// half the player height, or the fallback when there are none.
    pub fn pick_spawn<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        match self.spawn_points.choose(rng) {
            Some(point) => *point + Vec3::new(0.0, PLAYER_HEIGHT / 2.0, 0.0),
            None => FALLBACK_SPAWN,
        }
    }
}

fn cell_center(cell: IVec3) -> Vec3 {
    cell.as_vec3() + Vec3::splat(0.5)
}

/// Builds a level from `config`.
pub fn generate<R: Rng + ?Sized>(config: &LevelConfig, rng: &mut R) -> Level {
    let mut grid = VoxelGrid::solid(config.dims);
    let mut spawn_points = Vec::new();
    let mut report = GenerationReport::default();
    let mut floors: Vec<Vec<Room>> = Vec::with_capacity(config.floors.len());

    for floor in &config.floors {
        let rooms = place_rooms(&mut grid, config, floor, rng, &mut spawn_points);
        if rooms.len() < floor.min_rooms {
            warn!(
                "Floor at y={} got {} of {} rooms after {} attempts",
                floor.y,
                rooms.len(),
                floor.min_rooms,
                config.max_attempts
            );
        }

        for pair in rooms.windows(2) {
            connect_rooms(&mut grid, &pair[0], &pair[1]);
        }

        report.floors.push(FloorReport {
            y: floor.y,
            rooms_placed: rooms.len(),
            rooms_wanted: floor.min_rooms,
        });
        floors.push(rooms);
    }

    for pair in floors.windows(2) {
        let (lower, upper) = (&pair[0], &pair[1]);
        if lower.is_empty() || upper.is_empty() {
            warn!("Skipping ramps next to an empty floor, level may be unconnected");
            continue;
        }
        for _ in 0..config.ramps {
            let (Some(start), Some(end)) = (lower.choose(rng), upper.choose(rng)) else {
                continue;
            };
            build_ramp(&mut grid, start.center(), end.center(), config.ramp_width);
            report.ramps_built += 1;
        }
    }

    grid.seal_border();

    // Ramps fill columns solid, so some recorded floor cells are gone.
    spawn_points.retain(|&point| {
        let cell = VoxelGrid::cell_of(point);
        grid.is_air(cell) && grid.is_solid(cell - IVec3::Y)
    });
    report.spawn_points = spawn_points.len();

    info!(
        "Generated {}x{}x{} level: {} rooms on {} floors, {} ramps, {} spawn points",
        config.dims.width,
        config.dims.height,
        config.dims.length,
        report.rooms_placed(),
        report.floors.len(),
        report.ramps_built,
        report.spawn_points
    );

    Level {
        grid,
        spawn_points,
        report,
    }
}

fn place_rooms<R: Rng + ?Sized>(
    grid: &mut VoxelGrid,
    config: &LevelConfig,
    floor: &FloorSpec,
    rng: &mut R,
    spawn_points: &mut Vec<Vec3>,
) -> Vec<Room> {
    let mut rooms: Vec<Room> = Vec::with_capacity(floor.min_rooms);
    if config.room_size.is_empty() {
        return rooms;
    }

    let width = config.dims.width as i32;
    let length = config.dims.length as i32;

    for _ in 0..config.max_attempts {
        if rooms.len() >= floor.min_rooms {
            break;
        }

        let w = rng.gen_range(config.room_size.clone());
        let l = rng.gen_range(config.room_size.clone());
        let (max_x, max_z) = (width - w - 1, length - l - 1);
        if max_x < 1 || max_z < 1 {
            continue;
        }

        let room = Room {
            x: rng.gen_range(1..=max_x),
            y: floor.y,
            z: rng.gen_range(1..=max_z),
            width: w,
            height: floor.room_height,
            length: l,
        };

        if rooms.iter().any(|other| room.intersects(other)) {
            continue;
        }

        carve_room(grid, &room, spawn_points);
        rooms.push(room);
    }

    rooms
}

fn carve_room(grid: &mut VoxelGrid, room: &Room, spawn_points: &mut Vec<Vec3>) {
    for x in room.x..room.x + room.width {
        for y in room.y..room.y + room.height {
            for z in room.z..room.z + room.length {
                let cell = IVec3::new(x, y, z);
                if grid.carve(cell) && y == room.y {
                    spawn_points.push(cell_center(cell));
                }
            }
        }
    }
}

/// Runs along x at the second room's z, then along z at the first room's x.
fn connect_rooms(grid: &mut VoxelGrid, first: &Room, second: &Room) {
    let (a, b) = (first.center(), second.center());
    let y = first.y;

    for x in a.x.min(b.x)..=a.x.max(b.x) {
        carve_tunnel_cell(grid, IVec3::new(x, y, b.z));
    }
    for z in a.z.min(b.z)..=a.z.max(b.z) {
        carve_tunnel_cell(grid, IVec3::new(a.x, y, z));
    }
}

fn carve_tunnel_cell(grid: &mut VoxelGrid, cell: IVec3) {
    grid.carve(cell);
    grid.carve(cell + IVec3::Y);
    grid.set(cell - IVec3::Y, Voxel::Solid);
}

/// Lays a solid slope from `start` to `end` in half-cell steps, `width`
/// cells wide along z, with two cells of headroom above it.
fn build_ramp(grid: &mut VoxelGrid, start: IVec3, end: IVec3, width: i32) {
    let (from, to) = (start.as_vec3(), end.as_vec3());
    let distance = from.distance(to);
    if distance == 0.0 {
        return;
    }
    let direction = (to - from) / distance;
    let samples = (distance / 0.5).ceil() as usize;

    for step in 0..samples {
        let point = from + direction * (step as f32 * 0.5);
        let sample = point.as_ivec3();

        for w in -width / 2..=width / 2 {
            let column = IVec3::new(sample.x, 0, sample.z + w);
            for y in 0..=sample.y {
                grid.set(column.with_y(y), Voxel::Solid);
            }
            grid.carve(column.with_y(sample.y + 1));
            grid.carve(column.with_y(sample.y + 2));
        }
    }
}
