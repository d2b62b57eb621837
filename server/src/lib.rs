//! # Arena Server Library
//!
//! This library provides the authoritative server for the voxel arena. It
//! generates the world, owns the only true copy of every player and
//! projectile, advances them on a fixed clock, and streams the results to
//! thin clients over UDP.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Clients only send intent: a movement direction, a view direction and two
//! one-shot flags. Movement, gravity, collisions, shots and deaths are all
//! decided here and replicated back as per-tick snapshots.
//!
//! ### Session Management
//! Every source address that joins gets exactly one player. Joins beyond the
//! player ceiling and duplicate joins are dropped without a reply; silent
//! sessions are reclaimed by timeout.
//!
//! ### Sound Events
//! Gunshots and footsteps are broadcast as positioned events. Clients decide
//! how loud they are from their own position through the voxel grid.
//!
//! ## Architecture Design
//!
//! ### Single-Threaded Poll Loop
//! One task owns the socket, the sessions and the simulation. It drains
//! pending datagrams, then runs a tick when one is due. There are no locks
//! and no background tasks touching game state.
//!
//! ### Bounded Storage
//! Players and projectiles live in fixed-capacity slot pools. A full
//! projectile pool drops the shot rather than growing.
//!
//! ## Module Organization
//!
//! - `config`: loop and generator parameters with their defaults
//! - `level`: procedural rooms, tunnels and ramps
//! - `client_manager`: endpoint to player sessions, joins and timeouts
//! - `entity`, `pool`: players, projectiles and their slot storage
//! - `physics`: grounded and planar movement against the grid
//! - `projectile`: swept projectile flight and hit detection
//! - `game`: the simulation state tying the engines together
//! - `network`: transport and the tick scheduler
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> std::io::Result<()> {
//!     let server = Server::bind("0.0.0.0:7777", ServerConfig::default()).await?;
//!     server.run().await
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod entity;
pub mod game;
pub mod level;
pub mod network;
pub mod physics;
pub mod pool;
pub mod projectile;
