//! Simulation entities owned by the game state.

use glam::Vec3;
use shared::{MovementDirection, PlayerState, ProjectileState, RESPAWN_DELAY};
use std::time::Instant;

/// Server-side player. The network endpoint and activity clock live on the
/// session record in `client_manager`.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: u32,
    /// Body center.
    pub position: Vec3,
    pub view_dir: Vec3,
    pub movement: MovementDirection,
    pub alive: bool,
    pub grounded: bool,
    pub velocity_y: f32,
    pub last_fire: Option<Instant>,
    pub respawn_at: Option<Instant>,
    /// Where the last footstep was heard from.
    pub step_origin: Vec3,
}

impl Player {
    pub fn new(id: u32, position: Vec3) -> Self {
        Self {
            id,
            position,
            view_dir: Vec3::X,
            movement: MovementDirection::None,
            alive: true,
            grounded: false,
            velocity_y: 0.0,
            last_fire: None,
            respawn_at: None,
            step_origin: position,
        }
    }

    /// Marks the player dead and schedules the respawn.
    pub fn kill(&mut self, now: Instant) {
        self.alive = false;
        self.velocity_y = 0.0;
        self.respawn_at = Some(now + RESPAWN_DELAY);
    }

    pub fn respawn_due(&self, now: Instant) -> bool {
        !self.alive && self.respawn_at.map_or(false, |due| now >= due)
    }

    pub fn respawn(&mut self, position: Vec3) {
        self.alive = true;
        self.velocity_y = 0.0;
        self.respawn_at = None;
        self.position = position;
        self.step_origin = position;
    }

    pub fn to_state(&self) -> PlayerState {
        PlayerState {
            player_id: self.id,
            position: self.position,
            view_dir: self.view_dir,
            movement: self.movement,
            alive: self.alive,
            grounded: self.grounded,
        }
    }
}

/// A shot in flight. Occupying a pool slot means it is active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projectile {
    pub owner_id: u32,
    pub position: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Projectile {
    pub fn to_state(&self) -> ProjectileState {
        ProjectileState {
            active: true,
            owner_id: self.owner_id,
            position: self.position,
            direction: self.direction,
        }
    }
}
