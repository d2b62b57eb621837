//! Data model shared by the arena server and its clients.
//!
//! Both ends agree on the game constants below, the voxel grid layout, the
//! datagram format and the sound propagation model. Keeping them in one crate
//! means a client can never disagree with the server about the size of a
//! cell or the byte order of a snapshot.

pub mod protocol;
pub mod sound;
pub mod voxel;

use std::time::Duration;

pub use protocol::{
    decode, encode, Action, CodecError, Datagram, MovementDirection, Packet, PlayerState,
    ProjectileState, Snapshot, SoundEvent, SoundKind,
};
pub use sound::{DistanceField, UNREACHABLE};
pub use voxel::{GridDims, GridError, Voxel, VoxelGrid};

pub const MAX_PLAYERS: usize = 10;
pub const MAX_PROJECTILES: usize = 100;

pub const MAP_WIDTH: usize = 40;
pub const MAP_HEIGHT: usize = 10;
pub const MAP_LENGTH: usize = 40;

pub const PLAYER_HEIGHT: f32 = 0.9;
pub const PLAYER_RADIUS: f32 = 0.3;
pub const PLAYER_SPEED: f32 = 3.5;
pub const PROJECTILE_SPEED: f32 = 100.0;
pub const PROJECTILE_RADIUS: f32 = 0.05;
pub const GRAVITY: f32 = -9.8;
pub const JUMP_VELOCITY: f32 = 5.0;
pub const MAX_STEP_HEIGHT: f32 = 1.1;
pub const STEP_DISTANCE: f32 = 2.0;
pub const EYE_HEIGHT_OFFSET: f32 = 0.2;

pub const FIRE_COOLDOWN: Duration = Duration::from_millis(200);
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(15);
pub const RESPAWN_DELAY: Duration = Duration::from_secs(3);
pub const TICK_INTERVAL: Duration = Duration::from_millis(33);
pub const POLL_TIMEOUT: Duration = Duration::from_millis(5);

/// Where a player appears when the level produced no spawn points.
pub const FALLBACK_SPAWN: glam::Vec3 = glam::Vec3::new(5.0, 1.5, 5.0);

/// Largest payload a single UDP datagram can carry over IPv4.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;
