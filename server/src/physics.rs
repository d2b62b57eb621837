//! Player movement against the voxel grid.
//!
//! Two movement models share this module. The grounded model steers on the
//! x/z plane with axis-separated wall tests, climbs single-cell steps, and
//! integrates gravity with head and foot resolution. The planar model keeps
//! every player on its own layer, tests walls one radius ahead of the body
//! and never leaves the ground.
//!
//! Each call advances exactly one player by one tick and reports where a
//! footstep was heard, if any.

use crate::config::PhysicsMode;
use crate::entity::Player;
use glam::{IVec3, Vec2, Vec3};
use shared::{
    MovementDirection, VoxelGrid, GRAVITY, JUMP_VELOCITY, MAX_STEP_HEIGHT, PLAYER_HEIGHT,
    PLAYER_RADIUS, PLAYER_SPEED, STEP_DISTANCE,
};

const HALF_HEIGHT: f32 = PLAYER_HEIGHT / 2.0;

/// Fraction of the half height used for the horizontal wall probe.
const HEAD_PROBE_FACTOR: f32 = 0.9;

/// Gap left between the head and a ceiling after a bump.
const CEILING_CLEARANCE: f32 = 0.01;

/// Smallest displacement that counts as moving.
const MOVE_EPSILON: f32 = 0.001;

/// Horizontal steering for `direction` relative to `view_dir`, on the x/z
/// plane. Not normalized; zero when there is no intent or no usable view.
pub fn movement_vector(direction: MovementDirection, view_dir: Vec3) -> Vec2 {
    let forward = Vec2::new(view_dir.x, view_dir.z).normalize_or_zero();
    let right = Vec2::new(-forward.y, forward.x);

    match direction {
        MovementDirection::Forward => forward,
        MovementDirection::Backwards => -forward,
        MovementDirection::Left => -right,
        MovementDirection::Right => right,
        MovementDirection::ForwardLeft => forward - right,
        MovementDirection::ForwardRight => forward + right,
        MovementDirection::BackwardsLeft => -(forward + right),
        MovementDirection::BackwardsRight => -(forward - right),
        MovementDirection::None => Vec2::ZERO,
    }
}

/// Starts a jump if the player is alive and standing on something.
pub fn try_jump(player: &mut Player, mode: PhysicsMode) -> bool {
    if mode == PhysicsMode::Planar || !player.alive || !player.grounded {
        return false;
    }
    player.velocity_y = JUMP_VELOCITY;
    player.grounded = false;
    true
}

/// Advances one player by `dt` seconds. Returns the footstep position when
/// the player has walked far enough since the last one.
pub fn step_player(
    player: &mut Player,
    grid: &VoxelGrid,
    mode: PhysicsMode,
    dt: f32,
) -> Option<Vec3> {
    if !player.alive {
        return None;
    }
    let initial = player.position;

    let steering = movement_vector(player.movement, player.view_dir);
    let delta = if steering.length_squared() > 0.0 {
        steering.normalize() * PLAYER_SPEED * dt
    } else {
        Vec2::ZERO
    };

    match mode {
        PhysicsMode::Grounded => {
            if delta != Vec2::ZERO {
                move_grounded(player, grid, delta);
            }
            apply_gravity(player, grid, dt);
        }
        PhysicsMode::Planar => {
            if delta != Vec2::ZERO {
                move_planar(player, grid, delta);
            }
            player.velocity_y = 0.0;
            player.grounded = true;
        }
    }

    footstep(player, initial)
}

fn head_probe_y(y: f32) -> i32 {
    (y + HALF_HEIGHT * HEAD_PROBE_FACTOR).floor() as i32
}

fn column(v: f32) -> i32 {
    v.floor() as i32
}

fn move_grounded(player: &mut Player, grid: &VoxelGrid, delta: Vec2) {
    let mut stepped = false;

    let next_x = player.position.x + delta.x;
    let target = IVec3::new(
        column(next_x),
        head_probe_y(player.position.y),
        column(player.position.z),
    );
    if grid.is_air(target) {
        player.position.x = next_x;
    } else if step_up(player, grid, target) {
        stepped = true;
        player.position.x = next_x;
    }

    let next_z = player.position.z + delta.y;
    let target = IVec3::new(
        column(player.position.x),
        head_probe_y(player.position.y),
        column(next_z),
    );
    if grid.is_air(target) || (!stepped && step_up(player, grid, target)) {
        player.position.z = next_z;
    }
}

/// Lifts a grounded player onto `target` when it is a single free-standing
/// step. Returns whether the lift happened.
fn step_up(player: &mut Player, grid: &VoxelGrid, target: IVec3) -> bool {
    if !player.grounded {
        return false;
    }

    let above_target = target + IVec3::Y;
    let above_player = IVec3::new(
        column(player.position.x),
        target.y + 1,
        column(player.position.z),
    );
    if !grid.is_air(above_target) || !grid.is_air(above_player) {
        return false;
    }

    let top = (target.y + 1) as f32;
    let feet = player.position.y - HALF_HEIGHT;
    if top - feet > MAX_STEP_HEIGHT {
        return false;
    }

    player.position.y = top + HALF_HEIGHT;
    player.velocity_y = 0.0;
    true
}

fn apply_gravity(player: &mut Player, grid: &VoxelGrid, dt: f32) {
    player.velocity_y += GRAVITY * dt;
    player.position.y += player.velocity_y * dt;

    let (x, z) = (column(player.position.x), column(player.position.z));

    let head = (player.position.y + HALF_HEIGHT).floor() as i32;
    if grid.is_solid(IVec3::new(x, head, z)) {
        player.velocity_y = 0.0;
        player.position.y = head as f32 - HALF_HEIGHT - CEILING_CLEARANCE;
    }

    let foot = (player.position.y - HALF_HEIGHT).floor() as i32;
    if grid.is_solid(IVec3::new(x, foot, z)) && player.velocity_y <= 0.0 {
        player.position.y = foot as f32 + 1.0 + HALF_HEIGHT;
        player.velocity_y = 0.0;
        player.grounded = true;
    } else {
        player.grounded = false;
    }
}

fn move_planar(player: &mut Player, grid: &VoxelGrid, delta: Vec2) {
    let layer = column(player.position.y);

    if delta.x != 0.0 {
        let next_x = player.position.x + delta.x;
        let probe = next_x + delta.x.signum() * PLAYER_RADIUS;
        if grid.is_air(IVec3::new(column(probe), layer, column(player.position.z))) {
            player.position.x = next_x;
        }
    }

    if delta.y != 0.0 {
        let next_z = player.position.z + delta.y;
        let probe = next_z + delta.y.signum() * PLAYER_RADIUS;
        if grid.is_air(IVec3::new(column(player.position.x), layer, column(probe))) {
            player.position.z = next_z;
        }
    }
}

fn footstep(player: &mut Player, initial: Vec3) -> Option<Vec3> {
    if initial.distance(player.position) <= MOVE_EPSILON || !player.grounded {
        return None;
    }

    let walked = Vec2::new(player.position.x, player.position.z)
        .distance(Vec2::new(player.step_origin.x, player.step_origin.z));
    if walked < STEP_DISTANCE {
        return None;
    }

    player.step_origin = player.position;
    Some(player.position)
}
