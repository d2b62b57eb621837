//! Client-side view of the arena.
//!
//! The client keeps whatever the server last told it: its own player id, the
//! level grid and the newest snapshot that decoded cleanly. Each accepted
//! snapshot also rebuilds the distance field from the local player's cell,
//! which is what sound events are attenuated against.

use glam::Vec3;
use log::{debug, info};
use shared::{
    decode, CodecError, Datagram, DistanceField, Packet, PlayerState, Snapshot, SoundEvent,
    SoundKind, VoxelGrid,
};

/// A sound that survived occlusion, ready for the audio layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudibleSound {
    pub kind: SoundKind,
    pub position: Vec3,
    pub gain: f32,
}

/// What a single inbound datagram changed.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Joined(u32),
    MapReceived,
    StateApplied(u32),
    /// A snapshot older than the cached one.
    StaleState(u32),
    Sound(AudibleSound),
    /// Packets with nothing to apply: inaudible sounds, duplicates and
    /// client-bound kinds echoed back.
    Ignored,
}

#[derive(Debug, Default)]
pub struct ClientGameState {
    player_id: Option<u32>,
    grid: Option<VoxelGrid>,
    snapshot: Snapshot,
    snapshot_tick: Option<u32>,
    field: Option<DistanceField>,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player_id(&self) -> Option<u32> {
        self.player_id
    }

    pub fn grid(&self) -> Option<&VoxelGrid> {
        self.grid.as_ref()
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn snapshot_tick(&self) -> Option<u32> {
        self.snapshot_tick
    }

    pub fn field(&self) -> Option<&DistanceField> {
        self.field.as_ref()
    }

    /// True once both the join ack and the map have arrived.
    pub fn is_ready(&self) -> bool {
        self.player_id.is_some() && self.grid.is_some()
    }

    pub fn local_player(&self) -> Option<&PlayerState> {
        let id = self.player_id?;
        self.snapshot.players.iter().find(|p| p.player_id == id)
    }

    /// Decodes and applies one datagram. A datagram that fails to decode
    /// leaves every cached value untouched.
    pub fn ingest(&mut self, bytes: &[u8]) -> Result<ClientEvent, CodecError> {
        let datagram = decode(bytes)?;
        Ok(self.apply(datagram))
    }

    pub fn apply(&mut self, datagram: Datagram) -> ClientEvent {
        match datagram.packet {
            Packet::JoinAck { player_id } => {
                if self.player_id.is_some() {
                    return ClientEvent::Ignored;
                }
                info!("Joined as player {}", player_id);
                self.player_id = Some(player_id);
                ClientEvent::Joined(player_id)
            }
            Packet::MapData(grid) => {
                let dims = grid.dims();
                info!(
                    "Received {}x{}x{} map",
                    dims.width, dims.height, dims.length
                );
                self.grid = Some(grid);
                self.rebuild_field();
                ClientEvent::MapReceived
            }
            Packet::State(snapshot) => self.apply_state(datagram.tick_id, snapshot),
            Packet::SoundEvent(event) => match self.audible(&event) {
                Some(sound) => ClientEvent::Sound(sound),
                None => ClientEvent::Ignored,
            },
            Packet::Join | Packet::Act(_) | Packet::Leave => ClientEvent::Ignored,
        }
    }

    fn apply_state(&mut self, tick: u32, snapshot: Snapshot) -> ClientEvent {
        if let Some(cached) = self.snapshot_tick {
            // Wrapping compare so a long-running server's tick overflow is
            // still read as newer.
            if (tick.wrapping_sub(cached) as i32) < 0 {
                debug!("Ignoring state for tick {}, have {}", tick, cached);
                return ClientEvent::StaleState(tick);
            }
        }

        self.snapshot = snapshot;
        self.snapshot_tick = Some(tick);
        self.rebuild_field();
        ClientEvent::StateApplied(tick)
    }

    fn rebuild_field(&mut self) {
        let listener = self.local_player().map(|p| p.position);
        self.field = match (&self.grid, listener) {
            (Some(grid), Some(position)) => Some(DistanceField::from_listener(grid, position)),
            _ => None,
        };
    }

    /// Attenuates `event` for the local listener. `None` when there is no
    /// listener yet, the source is walled off, or it is too faint.
    pub fn audible(&self, event: &SoundEvent) -> Option<AudibleSound> {
        let gain = self.field.as_ref()?.gain_for(event)?;
        Some(AudibleSound {
            kind: event.kind,
            position: event.position,
            gain,
        })
    }
}
