//! Datagram format spoken between the arena server and its clients.
//!
//! Every datagram starts with a packed five byte header, the packet kind
//! followed by the sender's tick id, and continues with a payload whose layout
//! depends on the kind. All integers and floats are little-endian with fixed
//! widths and no padding. Decoding validates everything: short reads, unknown
//! kinds, out-of-range enum bytes, oversized lists and trailing garbage are
//! errors, never undefined reads.

use crate::voxel::{GridDims, GridError, VoxelGrid};
use crate::{MAX_DATAGRAM_SIZE, MAX_PLAYERS, MAX_PROJECTILES};
use bincode::Options;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size of the packed `{ kind: u8, tick_id: u32 }` header.
pub const HEADER_LEN: usize = 5;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("datagram of {len} bytes is shorter than a header")]
    Truncated { len: usize },

    #[error("unknown packet kind {0}")]
    UnknownKind(u8),

    #[error("{len} unexpected bytes after an empty payload")]
    TrailingBytes { len: usize },

    #[error("{count} {what} exceed the limit of {max}")]
    TooMany {
        what: &'static str,
        count: usize,
        max: usize,
    },

    #[error("datagram of {len} bytes exceeds the transport limit")]
    Oversized { len: usize },

    #[error("grid of {0:?} cannot be described on the wire")]
    GridTooLarge(GridDims),

    #[error("bad map payload: {0}")]
    Grid(#[from] GridError),

    #[error("malformed payload: {0}")]
    Bincode(#[from] bincode::Error),
}

/// Raised while decoding a byte that must map onto a closed set of values.
#[derive(Debug, Error)]
#[error("invalid {what} value {value}")]
pub struct InvalidDiscriminant {
    what: &'static str,
    value: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketKind {
    Join = 0,
    JoinAck = 1,
    Act = 2,
    State = 3,
    MapData = 4,
    SoundEvent = 5,
    Leave = 6,
}

impl TryFrom<u8> for PacketKind {
    type Error = CodecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => PacketKind::Join,
            1 => PacketKind::JoinAck,
            2 => PacketKind::Act,
            3 => PacketKind::State,
            4 => PacketKind::MapData,
            5 => PacketKind::SoundEvent,
            6 => PacketKind::Leave,
            other => return Err(CodecError::UnknownKind(other)),
        })
    }
}

/// Nine-way movement intent, relative to where the player is looking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum MovementDirection {
    Forward = 0,
    ForwardLeft = 1,
    Left = 2,
    BackwardsLeft = 3,
    Backwards = 4,
    BackwardsRight = 5,
    Right = 6,
    ForwardRight = 7,
    #[default]
    None = 8,
}

impl TryFrom<u8> for MovementDirection {
    type Error = InvalidDiscriminant;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => MovementDirection::Forward,
            1 => MovementDirection::ForwardLeft,
            2 => MovementDirection::Left,
            3 => MovementDirection::BackwardsLeft,
            4 => MovementDirection::Backwards,
            5 => MovementDirection::BackwardsRight,
            6 => MovementDirection::Right,
            7 => MovementDirection::ForwardRight,
            8 => MovementDirection::None,
            other => {
                return Err(InvalidDiscriminant {
                    what: "movement direction",
                    value: other,
                })
            }
        })
    }
}

impl From<MovementDirection> for u8 {
    fn from(direction: MovementDirection) -> u8 {
        direction as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum SoundKind {
    Gunshot = 0,
    Footstep = 1,
}

impl TryFrom<u8> for SoundKind {
    type Error = InvalidDiscriminant;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SoundKind::Gunshot),
            1 => Ok(SoundKind::Footstep),
            other => Err(InvalidDiscriminant {
                what: "sound kind",
                value: other,
            }),
        }
    }
}

impl From<SoundKind> for u8 {
    fn from(kind: SoundKind) -> u8 {
        kind as u8
    }
}

/// Client intent for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub movement: MovementDirection,
    pub view_dir: Vec3,
    pub firing: bool,
    pub jumping: bool,
}

/// Replicated view of one player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub player_id: u32,
    pub position: Vec3,
    pub view_dir: Vec3,
    pub movement: MovementDirection,
    pub alive: bool,
    pub grounded: bool,
}

/// Replicated view of one projectile in flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileState {
    pub active: bool,
    pub owner_id: u32,
    pub position: Vec3,
    pub direction: Vec3,
}

/// Everything a client needs to draw one server tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub players: Vec<PlayerState>,
    pub projectiles: Vec<ProjectileState>,
}

impl Snapshot {
    fn check_bounds(&self) -> Result<(), CodecError> {
        check_count("players", self.players.len(), MAX_PLAYERS)?;
        check_count("projectiles", self.projectiles.len(), MAX_PROJECTILES)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoundEvent {
    pub kind: SoundKind,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Join,
    JoinAck { player_id: u32 },
    Act(Action),
    State(Snapshot),
    MapData(VoxelGrid),
    SoundEvent(SoundEvent),
    Leave,
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::Join => PacketKind::Join,
            Packet::JoinAck { .. } => PacketKind::JoinAck,
            Packet::Act(_) => PacketKind::Act,
            Packet::State(_) => PacketKind::State,
            Packet::MapData(_) => PacketKind::MapData,
            Packet::SoundEvent(_) => PacketKind::SoundEvent,
            Packet::Leave => PacketKind::Leave,
        }
    }
}

/// A decoded packet together with the tick id from its header.
#[derive(Debug, Clone, PartialEq)]
pub struct Datagram {
    pub tick_id: u32,
    pub packet: Packet,
}

#[derive(Serialize, Deserialize)]
struct Header {
    kind: u8,
    tick_id: u32,
}

#[derive(Serialize, Deserialize)]
struct MapPayload {
    width: u16,
    height: u16,
    length: u16,
    cells: Vec<u8>,
}

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(MAX_DATAGRAM_SIZE as u64)
        .reject_trailing_bytes()
}

fn check_count(what: &'static str, count: usize, max: usize) -> Result<(), CodecError> {
    if count > max {
        return Err(CodecError::TooMany { what, count, max });
    }
    Ok(())
}

fn map_payload(grid: &VoxelGrid) -> Result<MapPayload, CodecError> {
    let dims = grid.dims();
    let narrow = |n: usize| u16::try_from(n).map_err(|_| CodecError::GridTooLarge(dims));
    Ok(MapPayload {
        width: narrow(dims.width)?,
        height: narrow(dims.height)?,
        length: narrow(dims.length)?,
        cells: grid.to_bytes(),
    })
}

/// Encodes `packet` behind a header carrying `tick_id`.
pub fn encode(tick_id: u32, packet: &Packet) -> Result<Vec<u8>, CodecError> {
    let header = Header {
        kind: packet.kind() as u8,
        tick_id,
    };
    let mut bytes = wire_options().serialize(&header)?;

    match packet {
        Packet::Join | Packet::Leave => {}
        Packet::JoinAck { player_id } => wire_options().serialize_into(&mut bytes, player_id)?,
        Packet::Act(action) => wire_options().serialize_into(&mut bytes, action)?,
        Packet::State(snapshot) => {
            snapshot.check_bounds()?;
            wire_options().serialize_into(&mut bytes, snapshot)?;
        }
        Packet::MapData(grid) => wire_options().serialize_into(&mut bytes, &map_payload(grid)?)?,
        Packet::SoundEvent(event) => wire_options().serialize_into(&mut bytes, event)?,
    }

    if bytes.len() > MAX_DATAGRAM_SIZE {
        return Err(CodecError::Oversized { len: bytes.len() });
    }
    Ok(bytes)
}

/// Decodes one datagram, rejecting anything that is not exactly a valid packet.
pub fn decode(bytes: &[u8]) -> Result<Datagram, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::Truncated { len: bytes.len() });
    }
    let (head, body) = bytes.split_at(HEADER_LEN);
    let header: Header = wire_options().deserialize(head)?;

    let packet = match PacketKind::try_from(header.kind)? {
        PacketKind::Join => {
            expect_empty(body)?;
            Packet::Join
        }
        PacketKind::Leave => {
            expect_empty(body)?;
            Packet::Leave
        }
        PacketKind::JoinAck => Packet::JoinAck {
            player_id: wire_options().deserialize(body)?,
        },
        PacketKind::Act => Packet::Act(wire_options().deserialize(body)?),
        PacketKind::State => {
            let snapshot: Snapshot = wire_options().deserialize(body)?;
            snapshot.check_bounds()?;
            Packet::State(snapshot)
        }
        PacketKind::MapData => {
            let payload: MapPayload = wire_options().deserialize(body)?;
            let dims = GridDims::new(
                payload.width as usize,
                payload.height as usize,
                payload.length as usize,
            );
            Packet::MapData(VoxelGrid::from_bytes(dims, &payload.cells)?)
        }
        PacketKind::SoundEvent => Packet::SoundEvent(wire_options().deserialize(body)?),
    };

    Ok(Datagram {
        tick_id: header.tick_id,
        packet,
    })
}

fn expect_empty(body: &[u8]) -> Result<(), CodecError> {
    if body.is_empty() {
        Ok(())
    } else {
        Err(CodecError::TrailingBytes { len: body.len() })
    }
}
