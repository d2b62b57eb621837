//! Tunable server and level parameters.
//!
//! Game constants live in `shared`. What is collected here are the knobs of
//! the loop and the generator that a test or an alternative deployment may
//! want to change without touching the wire contract.

use shared::{
    GridDims, CLIENT_TIMEOUT, MAP_HEIGHT, MAP_LENGTH, MAP_WIDTH, MAX_PLAYERS, POLL_TIMEOUT,
    TICK_INTERVAL,
};
use std::ops::RangeInclusive;
use std::time::Duration;

/// Largest dt a single tick may integrate.
pub const MAX_TICK_DT: f32 = 0.1;

/// Which movement model the simulation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhysicsMode {
    /// Gravity, jumping and step-up over a multi-floor level.
    #[default]
    Grounded,
    /// A single layer with radius-nudged wall tests and no vertical motion.
    Planar,
}

/// One floor of rooms, carved at `y` with rooms `room_height` cells tall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloorSpec {
    pub y: i32,
    pub room_height: i32,
    pub min_rooms: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelConfig {
    pub dims: GridDims,
    pub floors: Vec<FloorSpec>,
    pub room_size: RangeInclusive<i32>,
    pub max_attempts: usize,
    pub ramps: usize,
    pub ramp_width: i32,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            dims: GridDims::new(MAP_WIDTH, MAP_HEIGHT, MAP_LENGTH),
            floors: vec![
                FloorSpec {
                    y: 1,
                    room_height: 4,
                    min_rooms: 5,
                },
                FloorSpec {
                    y: 6,
                    room_height: 4,
                    min_rooms: 5,
                },
            ],
            room_size: 6..=12,
            max_attempts: 100,
            ramps: 2,
            ramp_width: 3,
        }
    }
}

impl LevelConfig {
    /// One floor at `y == 1` and no ramps, used by the planar variant.
    pub fn single_floor() -> Self {
        Self {
            floors: vec![FloorSpec {
                y: 1,
                room_height: 4,
                min_rooms: 5,
            }],
            ramps: 0,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub tick_interval: Duration,
    pub poll_timeout: Duration,
    pub max_players: usize,
    pub client_timeout: Duration,
    pub physics: PhysicsMode,
    pub level: LevelConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_interval: TICK_INTERVAL,
            poll_timeout: POLL_TIMEOUT,
            max_players: MAX_PLAYERS,
            client_timeout: CLIENT_TIMEOUT,
            physics: PhysicsMode::Grounded,
            level: LevelConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn planar() -> Self {
        Self {
            physics: PhysicsMode::Planar,
            level: LevelConfig::single_floor(),
            ..Self::default()
        }
    }
}
