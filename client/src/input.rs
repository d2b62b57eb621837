//! Action generation for the headless client

use crate::game::ClientGameState;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::Rng;
use shared::{Action, MovementDirection, FIRE_COOLDOWN};
use std::f32::consts::TAU;
use std::time::{Duration, Instant};

/// Produces the action to send for one client frame, or `None` to send
/// nothing this frame.
pub trait ActionSource {
    fn next_action(&mut self, state: &ClientGameState, now: Instant) -> Option<Action>;
}

const MOVEMENTS: [MovementDirection; 9] = [
    MovementDirection::Forward,
    MovementDirection::ForwardLeft,
    MovementDirection::Left,
    MovementDirection::BackwardsLeft,
    MovementDirection::Backwards,
    MovementDirection::BackwardsRight,
    MovementDirection::Right,
    MovementDirection::ForwardRight,
    MovementDirection::None,
];

/// Wanders around at random: holds a heading and a movement direction for a
/// second or two, turns a little every frame, jumps now and then and fires
/// in bursts no faster than the server accepts.
pub struct WanderBot {
    rng: StdRng,
    yaw: f32,
    turn_rate: f32,
    movement: MovementDirection,
    next_change: Option<Instant>,
    last_fire: Option<Instant>,
    last_frame: Option<Instant>,
}

impl WanderBot {
    pub fn new(rng: StdRng) -> Self {
        Self {
            rng,
            yaw: 0.0,
            turn_rate: 0.0,
            movement: MovementDirection::None,
            next_change: None,
            last_fire: None,
            last_frame: None,
        }
    }

    pub fn view_dir(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin())
    }

    fn change_course(&mut self, now: Instant) {
        self.movement = MOVEMENTS[self.rng.gen_range(0..MOVEMENTS.len())];
        self.yaw = self.rng.gen_range(0.0..TAU);
        self.turn_rate = self.rng.gen_range(-1.0..1.0);
        self.next_change = Some(now + Duration::from_millis(self.rng.gen_range(1000..2500)));
    }

    fn fire_ready(&self, now: Instant) -> bool {
        self.last_fire
            .map_or(true, |last| now.saturating_duration_since(last) >= FIRE_COOLDOWN)
    }
}

impl ActionSource for WanderBot {
    fn next_action(&mut self, state: &ClientGameState, now: Instant) -> Option<Action> {
        if state.local_player().map_or(false, |p| !p.alive) {
            return None;
        }

        if self.next_change.map_or(true, |at| now >= at) {
            self.change_course(now);
        }

        let dt = self
            .last_frame
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32());
        self.last_frame = Some(now);
        self.yaw = (self.yaw + self.turn_rate * dt).rem_euclid(TAU);

        let jumping = self.rng.gen_bool(0.02);
        let firing = self.fire_ready(now) && self.rng.gen_bool(0.1);
        if firing {
            self.last_fire = Some(now);
        }

        Some(Action {
            movement: self.movement,
            view_dir: self.view_dir(),
            firing,
            jumping,
        })
    }
}
