//! Authoritative simulation state.
//!
//! `GameState` owns the level, every player and every projectile in flight.
//! The tick scheduler feeds it decoded actions as they arrive and calls
//! [`GameState::step`] once per tick; everything it returns is something the
//! network layer has to tell the clients about.

use crate::config::PhysicsMode;
use crate::entity::{Player, Projectile};
use crate::level::Level;
use crate::physics::{step_player, try_jump};
use crate::pool::SlotPool;
use crate::projectile::{advance_projectiles, Hit};
use glam::Vec3;
use log::{debug, info};
use rand::rngs::StdRng;
use shared::{
    Action, Snapshot, SoundEvent, SoundKind, VoxelGrid, EYE_HEIGHT_OFFSET, FIRE_COOLDOWN,
    MAX_PROJECTILES,
};
use std::time::Instant;

/// Everything that happened during one tick besides state changes.
#[derive(Debug, Default)]
pub struct TickEvents {
    pub footsteps: Vec<SoundEvent>,
    pub hits: Vec<Hit>,
    pub respawned: Vec<u32>,
}

pub struct GameState {
    pub tick: u32,
    level: Level,
    mode: PhysicsMode,
    players: SlotPool<Player>,
    projectiles: SlotPool<Projectile>,
    rng: StdRng,
}

impl GameState {
    pub fn new(level: Level, mode: PhysicsMode, max_players: usize, rng: StdRng) -> Self {
        Self {
            tick: 0,
            level,
            mode,
            players: SlotPool::with_capacity(max_players),
            projectiles: SlotPool::with_capacity(MAX_PROJECTILES),
            rng,
        }
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.level.grid
    }

    pub fn mode(&self) -> PhysicsMode {
        self.mode
    }

    pub fn player(&self, id: u32) -> Option<&Player> {
        self.players.values().find(|p| p.id == id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    /// Places a new player at a random spawn point. Returns `None` when every
    /// player slot is taken.
    pub fn spawn_player(&mut self, id: u32) -> Option<Vec3> {
        let position = self.level.pick_spawn(&mut self.rng);
        self.players.insert(Player::new(id, position)).ok()?;
        info!(
            "Spawned player {} at ({:.1}, {:.1}, {:.1})",
            id, position.x, position.y, position.z
        );
        Some(position)
    }

    pub fn remove_player(&mut self, id: u32) -> bool {
        match self.players.position(|p| p.id == id) {
            Some(slot) => {
                self.players.remove(slot);
                info!("Removed player {}", id);
                true
            }
            None => false,
        }
    }

    /// Applies one client action. Returns the gunshot to broadcast when the
    /// action fired.
    pub fn apply_action(&mut self, id: u32, action: &Action, now: Instant) -> Option<SoundEvent> {
        let mode = self.mode;
        let player = self.players.values_mut().find(|p| p.id == id)?;

        player.movement = action.movement;
        if action.view_dir.is_finite() && action.view_dir.length_squared() > 0.0 {
            player.view_dir = action.view_dir.normalize();
        }

        if action.jumping {
            try_jump(player, mode);
        }

        if !action.firing || !player.alive {
            return None;
        }
        let ready = player
            .last_fire
            .map_or(true, |last| now.saturating_duration_since(last) >= FIRE_COOLDOWN);
        if !ready {
            return None;
        }
        player.last_fire = Some(now);

        let origin = player.position + Vec3::new(0.0, EYE_HEIGHT_OFFSET, 0.0);
        let projectile = Projectile {
            owner_id: id,
            position: origin,
            direction: player.view_dir,
        };
        if self.projectiles.insert(projectile).is_err() {
            debug!("Projectile pool full, shot from player {} dropped", id);
        }

        Some(SoundEvent {
            kind: SoundKind::Gunshot,
            position: origin,
        })
    }

    /// Advances the world by `dt` seconds.
    pub fn step(&mut self, now: Instant, dt: f32) -> TickEvents {
        let mut events = TickEvents::default();

        let due: Vec<usize> = self
            .players
            .iter()
            .filter(|(_, p)| p.respawn_due(now))
            .map(|(slot, _)| slot)
            .collect();
        for slot in due {
            let position = self.level.pick_spawn(&mut self.rng);
            if let Some(player) = self.players.get_mut(slot) {
                player.respawn(position);
                info!("Player {} respawned", player.id);
                events.respawned.push(player.id);
            }
        }

        for player in self.players.values_mut() {
            if let Some(position) = step_player(player, &self.level.grid, self.mode, dt) {
                events.footsteps.push(SoundEvent {
                    kind: SoundKind::Footstep,
                    position,
                });
            }
        }

        events.hits = advance_projectiles(
            &mut self.projectiles,
            &mut self.players,
            &self.level.grid,
            dt,
            now,
        );

        self.tick = self.tick.wrapping_add(1);
        events
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            players: self.players.values().map(Player::to_state).collect(),
            projectiles: self.projectiles.values().map(Projectile::to_state).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;
    use rand::SeedableRng;
    use shared::{GridDims, MovementDirection, FALLBACK_SPAWN, PLAYER_HEIGHT, RESPAWN_DELAY};
    use std::time::Duration;

    const DT: f32 = 1.0 / 30.0;

    fn arena() -> Level {
        let mut grid = VoxelGrid::solid(GridDims::new(16, 4, 16));
        for x in 1..15 {
            for z in 1..15 {
                grid.carve(IVec3::new(x, 1, z));
                grid.carve(IVec3::new(x, 2, z));
            }
        }
        Level::from_grid(grid)
    }

    fn game() -> GameState {
        GameState::new(arena(), PhysicsMode::Grounded, 4, StdRng::seed_from_u64(7))
    }

    fn fire() -> Action {
        Action {
            movement: MovementDirection::None,
            view_dir: Vec3::X,
            firing: true,
            jumping: false,
        }
    }

    #[test]
    fn test_spawn_lands_on_a_spawn_point() {
        let mut game = game();
        let position = game.spawn_player(1).unwrap();

        assert_eq!(position.y, 1.5 + PLAYER_HEIGHT / 2.0);
        assert_eq!(game.player_count(), 1);
        assert_eq!(game.player(1).map(|p| p.position), Some(position));
    }

    #[test]
    fn test_player_slots_are_bounded() {
        let mut game = game();
        for id in 1..=4 {
            assert!(game.spawn_player(id).is_some());
        }
        assert!(game.spawn_player(5).is_none());

        assert!(game.remove_player(2));
        assert!(!game.remove_player(2));
        assert!(game.spawn_player(6).is_some());
    }

    #[test]
    fn test_spawn_without_spawn_points_uses_fallback() {
        let level = Level::from_grid(VoxelGrid::solid(GridDims::new(8, 4, 8)));
        let mut game = GameState::new(level, PhysicsMode::Grounded, 2, StdRng::seed_from_u64(1));
        assert_eq!(game.spawn_player(1), Some(FALLBACK_SPAWN));
    }

    #[test]
    fn test_action_updates_intent_and_view() {
        let mut game = game();
        game.spawn_player(1);
        let action = Action {
            movement: MovementDirection::Left,
            view_dir: Vec3::new(0.0, 0.0, 2.0),
            firing: false,
            jumping: false,
        };

        assert!(game.apply_action(1, &action, Instant::now()).is_none());
        let player = game.player(1).unwrap();
        assert_eq!(player.movement, MovementDirection::Left);
        assert_eq!(player.view_dir, Vec3::Z);
    }

    #[test]
    fn test_degenerate_view_is_ignored() {
        let mut game = game();
        game.spawn_player(1);
        let now = Instant::now();

        for view_dir in [Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 1.0)] {
            let action = Action {
                view_dir,
                firing: false,
                ..fire()
            };
            game.apply_action(1, &action, now);
            assert_eq!(game.player(1).unwrap().view_dir, Vec3::X);
        }
    }

    #[test]
    fn test_unknown_player_action_is_ignored() {
        let mut game = game();
        assert!(game.apply_action(9, &fire(), Instant::now()).is_none());
        assert_eq!(game.projectile_count(), 0);
    }

    #[test]
    fn test_fire_cooldown() {
        let mut game = game();
        game.spawn_player(1);
        let now = Instant::now();

        assert!(game.apply_action(1, &fire(), now).is_some());
        assert!(game
            .apply_action(1, &fire(), now + Duration::from_millis(150))
            .is_none());
        assert_eq!(game.projectile_count(), 1);

        assert!(game.apply_action(1, &fire(), now + FIRE_COOLDOWN).is_some());
        assert_eq!(game.projectile_count(), 2);
    }

    #[test]
    fn test_gunshot_starts_at_eye_height() {
        let mut game = game();
        let position = game.spawn_player(1).unwrap();

        let sound = game.apply_action(1, &fire(), Instant::now()).unwrap();
        assert_eq!(sound.kind, SoundKind::Gunshot);
        assert_eq!(sound.position, position + Vec3::new(0.0, EYE_HEIGHT_OFFSET, 0.0));

        let snapshot = game.snapshot();
        assert_eq!(snapshot.projectiles.len(), 1);
        assert_eq!(snapshot.projectiles[0].owner_id, 1);
        assert_eq!(snapshot.projectiles[0].direction, Vec3::X);
    }

    #[test]
    fn test_full_projectile_pool_still_sounds() {
        let mut game = game();
        game.spawn_player(1);
        let start = Instant::now();

        for shot in 0..=MAX_PROJECTILES as u32 {
            let now = start + FIRE_COOLDOWN * shot;
            assert!(game.apply_action(1, &fire(), now).is_some());
        }
        assert_eq!(game.projectile_count(), MAX_PROJECTILES);
    }

    #[test]
    fn test_dead_player_cannot_fire_or_jump() {
        let mut game = game();
        game.spawn_player(1);
        let now = Instant::now();
        game.players.values_mut().for_each(|p| {
            p.grounded = true;
            p.kill(now);
        });

        let action = Action {
            jumping: true,
            ..fire()
        };
        assert!(game.apply_action(1, &action, now).is_none());
        assert_eq!(game.projectile_count(), 0);
        assert_eq!(game.player(1).unwrap().velocity_y, 0.0);
    }

    #[test]
    fn test_respawn_happens_only_after_deadline() {
        let mut game = game();
        game.spawn_player(1);
        let now = Instant::now();
        game.players.values_mut().for_each(|p| p.kill(now));

        let events = game.step(now + RESPAWN_DELAY - Duration::from_millis(10), DT);
        assert!(events.respawned.is_empty());
        assert!(!game.player(1).unwrap().alive);

        let events = game.step(now + RESPAWN_DELAY, DT);
        assert_eq!(events.respawned, vec![1]);
        let player = game.player(1).unwrap();
        assert!(player.alive);
        assert!(player.position.y > 1.0 && player.position.y < 2.0);
    }

    #[test]
    fn test_step_advances_tick_and_reports_footsteps() {
        let mut game = game();
        game.spawn_player(1);
        let walk = Action {
            movement: MovementDirection::Forward,
            view_dir: Vec3::Z,
            firing: false,
            jumping: false,
        };
        game.apply_action(1, &walk, Instant::now());

        // Park the player where a straight walk along z stays in the arena.
        game.players.values_mut().for_each(|p| {
            p.position = Vec3::new(7.5, 1.45, 2.5);
            p.step_origin = p.position;
        });

        let now = Instant::now();
        let mut footsteps = 0;
        for _ in 0..30 {
            footsteps += game.step(now, DT).footsteps.len();
        }
        assert_eq!(game.tick, 30);
        assert_eq!(footsteps, 1);
    }

    #[test]
    fn test_projectile_kills_victim_through_step() {
        let mut game = game();
        game.spawn_player(1);
        game.spawn_player(2);
        for p in game.players.values_mut() {
            p.position = Vec3::new(2.5 + p.id as f32 * 3.0, 1.45, 7.5);
        }
        let now = Instant::now();

        // Eye offset keeps the shot within the victim's hit radius.
        game.apply_action(1, &fire(), now);
        let events = game.step(now, DT);

        assert_eq!(events.hits.len(), 1);
        assert_eq!(events.hits[0].victim, 2);
        assert!(!game.player(2).unwrap().alive);
        assert_eq!(game.projectile_count(), 0);
    }
}
