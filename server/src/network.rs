//! Server network layer: UDP transport and the fixed-rate tick loop
//!
//! One task owns the socket, the session table and the simulation. Each pass
//! of the loop waits up to the poll timeout for the socket to become
//! readable, drains a bounded batch of pending datagrams without blocking,
//! and runs a tick once the tick interval has elapsed. Nothing else touches
//! the state, so there are no locks and no channels.

use crate::client_manager::{ClientManager, JoinOutcome};
use crate::config::{ServerConfig, MAX_TICK_DT};
use crate::game::GameState;
use crate::level::generate;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{decode, encode, Packet, MAX_DATAGRAM_SIZE};
use std::io;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::net::{ToSocketAddrs, UdpSocket};
use tokio::time::timeout;

/// Ticks between two status lines in the debug log.
const STATUS_INTERVAL_TICKS: u32 = 300;

/// Most datagrams handled per poll, so a flood cannot starve the tick.
const MAX_DRAIN: usize = 100;

/// Authoritative server coordinating transport, sessions and simulation
pub struct Server {
    socket: UdpSocket,
    clients: ClientManager,
    game_state: GameState,
    config: ServerConfig,
    last_tick: Instant,
}

impl Server {
    /// Binds the socket and generates a fresh level from entropy
    pub async fn bind<A: ToSocketAddrs>(addr: A, config: ServerConfig) -> io::Result<Self> {
        Self::bind_with_rng(addr, config, StdRng::from_entropy()).await
    }

    /// Like [`Server::bind`] with a caller-supplied generator, so a level can
    /// be reproduced from a seed
    pub async fn bind_with_rng<A: ToSocketAddrs>(
        addr: A,
        config: ServerConfig,
        mut rng: StdRng,
    ) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        let level = generate(&config.level, &mut rng);
        let game_state = GameState::new(level, config.physics, config.max_players, rng);

        Ok(Self {
            socket,
            clients: ClientManager::new(config.max_players),
            game_state,
            config,
            last_tick: Instant::now(),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Main server loop. Runs until the socket fails.
    pub async fn run(mut self) -> io::Result<()> {
        info!(
            "Server listening on {} ({:?} physics, {} ms ticks)",
            self.socket.local_addr()?,
            self.config.physics,
            self.config.tick_interval.as_millis()
        );

        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
        self.last_tick = Instant::now();

        loop {
            self.poll(&mut buffer).await?;

            let now = Instant::now();
            if now.duration_since(self.last_tick) >= self.config.tick_interval {
                self.tick(now).await;
            }
        }
    }

    /// Waits for readability up to the poll timeout, then drains pending
    /// datagrams, at most `MAX_DRAIN` of them. Returns how many were handled.
    async fn poll(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        match timeout(self.config.poll_timeout, self.socket.readable()).await {
            Err(_elapsed) => return Ok(0),
            Ok(result) => result?,
        }

        let mut handled = 0;
        while handled < MAX_DRAIN {
            match self.socket.try_recv_from(buffer) {
                Ok((len, addr)) => {
                    self.handle_datagram(&buffer[..len], addr).await;
                    handled += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    // ICMP errors from a vanished peer surface here; keep serving.
                    debug!("Receive failed: {}", e);
                    break;
                }
            }
        }
        Ok(handled)
    }

    /// Processes one inbound datagram
    async fn handle_datagram(&mut self, bytes: &[u8], addr: SocketAddr) {
        let datagram = match decode(bytes) {
            Ok(datagram) => datagram,
            Err(e) => {
                debug!("Dropping datagram from {}: {}", addr, e);
                return;
            }
        };
        let now = Instant::now();

        match datagram.packet {
            Packet::Join => match self.clients.join(addr, now) {
                JoinOutcome::Joined(player_id) => {
                    if self.game_state.spawn_player(player_id).is_none() {
                        warn!("No free player slot for {}, dropping session", player_id);
                        self.clients.remove_client(player_id);
                        return;
                    }
                    self.send(addr, &Packet::JoinAck { player_id }).await;
                    let map = Packet::MapData(self.game_state.grid().clone());
                    self.send(addr, &map).await;
                }
                JoinOutcome::AlreadyJoined(_) | JoinOutcome::Full => {}
            },

            Packet::Act(action) => match self.clients.touch(addr, now) {
                Some(player_id) => {
                    if let Some(gunshot) = self.game_state.apply_action(player_id, &action, now)
                    {
                        self.broadcast(&Packet::SoundEvent(gunshot)).await;
                    }
                }
                None => debug!("Action from unknown endpoint {} dropped", addr),
            },

            Packet::Leave => match self.clients.remove_by_addr(addr) {
                Some(player_id) => {
                    self.game_state.remove_player(player_id);
                }
                None => debug!("Leave from unknown endpoint {} dropped", addr),
            },

            other => debug!("Unexpected {:?} packet from {}", other.kind(), addr),
        }
    }

    /// Runs one simulation tick and broadcasts its results
    async fn tick(&mut self, now: Instant) {
        let mut dt = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;

        if dt > MAX_TICK_DT {
            warn!("Tick stalled for {:.0} ms, capping dt", dt * 1000.0);
            dt = MAX_TICK_DT;
        }

        for player_id in self.clients.expire(now, self.config.client_timeout) {
            self.game_state.remove_player(player_id);
        }

        let events = self.game_state.step(now, dt);
        for footstep in events.footsteps {
            self.broadcast(&Packet::SoundEvent(footstep)).await;
        }

        let snapshot = self.game_state.snapshot();
        self.broadcast(&Packet::State(snapshot)).await;

        if self.game_state.tick % STATUS_INTERVAL_TICKS == 0 && !self.clients.is_empty() {
            debug!(
                "Tick {}: {} players, {} projectiles, {:.1}Hz",
                self.game_state.tick,
                self.clients.len(),
                self.game_state.projectile_count(),
                1.0 / dt.max(f32::EPSILON)
            );
        }
    }

    async fn send(&self, addr: SocketAddr, packet: &Packet) {
        match encode(self.game_state.tick, packet) {
            Ok(bytes) => {
                if let Err(e) = self.socket.send_to(&bytes, addr).await {
                    error!("Failed to send packet to {}: {}", addr, e);
                }
            }
            Err(e) => error!("Failed to encode {:?} packet: {}", packet.kind(), e),
        }
    }

    async fn broadcast(&self, packet: &Packet) {
        if self.clients.is_empty() {
            return;
        }

        let bytes = match encode(self.game_state.tick, packet) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to encode {:?} packet: {}", packet.kind(), e);
                return;
            }
        };

        for addr in self.clients.addrs() {
            if let Err(e) = self.socket.send_to(&bytes, addr).await {
                error!("Failed to send to {}: {}", addr, e);
            }
        }
    }
}
