//! # Arena Client Library
//!
//! A headless client for the voxel arena. It joins a server, caches the
//! level and the newest valid snapshot, sends one action per frame, and turns
//! positioned sound events into gains that an audio layer can play.
//!
//! ## Architecture Overview
//!
//! The server is authoritative, so the client predicts nothing. Everything it
//! knows comes from three kinds of datagram: the join ack with its player id,
//! the map, and a snapshot every tick. The one piece of real work done here
//! is sound occlusion: each snapshot rebuilds a path-distance field from the
//! local player's cell through the air of the level, and every sound event
//! is attenuated by how far sound has to travel around walls to reach the
//! listener.
//!
//! ## Module Organization
//!
//! ### Game Module (`game`)
//! Cached server state, stale and malformed snapshot rejection, and the
//! listener's distance field.
//!
//! ### Input Module (`input`)
//! The `ActionSource` seam and `WanderBot`, a random walker that exercises
//! every part of the protocol.
//!
//! ### Audio Module (`audio`)
//! The `AudioSink` seam where audible sounds leave the client.
//!
//! ### Network Module (`network`)
//! Join handshake with timeout, the receive/act loop and the leave on exit.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::audio::LoggingSink;
//! use client::input::WanderBot;
//! use client::network::Client;
//! use rand::SeedableRng;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bot = WanderBot::new(rand::rngs::StdRng::from_entropy());
//!     let mut client = Client::connect("127.0.0.1:7777".parse()?, bot, LoggingSink).await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod game;
pub mod input;
pub mod network;
