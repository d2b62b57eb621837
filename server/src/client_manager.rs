//! Session management for the arena server
//!
//! This module maps network endpoints to players and owns the session
//! lifecycle:
//! - Joining, with sequential player ids and a hard player ceiling
//! - Activity tracking, refreshed by every accepted action
//! - Explicit leaves and inactivity timeouts
//!
//! Sessions are keyed by the full source address, IP and port, so two
//! clients behind the same host are two sessions. A join from an endpoint
//! that already has a session changes nothing.

use log::{debug, info};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// One connected endpoint and the player it controls
#[derive(Debug, Clone)]
pub struct Session {
    /// Player id assigned when the session was created
    pub player_id: u32,
    /// Endpoint every reply is sent to
    pub addr: SocketAddr,
    /// Last time an action arrived from this endpoint
    pub last_seen: Instant,
}

impl Session {
    pub fn new(player_id: u32, addr: SocketAddr, now: Instant) -> Self {
        Self {
            player_id,
            addr,
            last_seen: now,
        }
    }

    /// Returns true if nothing has been heard from this endpoint for longer
    /// than `timeout`
    pub fn is_timed_out(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > timeout
    }
}

/// Result of a join request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new session was created for this player id
    Joined(u32),
    /// The endpoint already had a session; nothing changed
    AlreadyJoined(u32),
    /// The server is at its player ceiling
    Full,
}

/// Manages every active session
///
/// Player ids start at 1 and are never reused within a process, so a late
/// packet about a departed player can never be mistaken for a newcomer.
pub struct ClientManager {
    /// Active sessions indexed by their source address
    sessions: HashMap<SocketAddr, Session>,
    /// Next id handed out on a successful join
    next_player_id: u32,
    /// Maximum number of concurrent sessions
    max_clients: usize,
}

impl ClientManager {
    /// Creates an empty session table with the given ceiling
    pub fn new(max_clients: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            next_player_id: 1,
            max_clients,
        }
    }

    /// Handles a join request from `addr`
    ///
    /// Known endpoints get `AlreadyJoined` without any state change. Unknown
    /// endpoints get the next sequential id unless the table is full.
    pub fn join(&mut self, addr: SocketAddr, now: Instant) -> JoinOutcome {
        if let Some(session) = self.sessions.get(&addr) {
            debug!("Duplicate join from {} ignored", addr);
            return JoinOutcome::AlreadyJoined(session.player_id);
        }

        if self.sessions.len() >= self.max_clients {
            debug!("Join from {} refused, server full", addr);
            return JoinOutcome::Full;
        }

        let player_id = self.next_player_id;
        self.next_player_id += 1;

        self.sessions
            .insert(addr, Session::new(player_id, addr, now));
        info!("Player {} joined from {}", player_id, addr);

        JoinOutcome::Joined(player_id)
    }

    /// Finds the player id for a source address
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.sessions.get(&addr).map(|s| s.player_id)
    }

    /// Refreshes the activity clock of `addr` and returns its player id
    ///
    /// Returns None for unknown endpoints, whose packets are dropped.
    pub fn touch(&mut self, addr: SocketAddr, now: Instant) -> Option<u32> {
        let session = self.sessions.get_mut(&addr)?;
        session.last_seen = now;
        Some(session.player_id)
    }

    /// Ends the session of `addr`, returning the player id it controlled
    pub fn remove_by_addr(&mut self, addr: SocketAddr) -> Option<u32> {
        let session = self.sessions.remove(&addr)?;
        info!("Player {} left from {}", session.player_id, addr);
        Some(session.player_id)
    }

    /// Ends the session controlling `player_id`
    ///
    /// Returns true if a session was found and removed.
    pub fn remove_client(&mut self, player_id: u32) -> bool {
        let addr = self
            .sessions
            .values()
            .find(|s| s.player_id == player_id)
            .map(|s| s.addr);

        match addr {
            Some(addr) => self.remove_by_addr(addr).is_some(),
            None => false,
        }
    }

    /// Removes every session idle for longer than `timeout`
    ///
    /// Returns the player ids that were removed so the simulation can free
    /// their players.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> Vec<u32> {
        let expired: Vec<SocketAddr> = self
            .sessions
            .values()
            .filter(|s| s.is_timed_out(now, timeout))
            .map(|s| s.addr)
            .collect();

        let mut removed = Vec::with_capacity(expired.len());
        for addr in expired {
            if let Some(session) = self.sessions.remove(&addr) {
                info!("Player {} timed out", session.player_id);
                removed.push(session.player_id);
            }
        }
        removed
    }

    /// Every session endpoint, used for broadcasts
    pub fn addrs(&self) -> Vec<SocketAddr> {
        self.sessions.keys().copied().collect()
    }

    /// Returns the number of active sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no sessions are active
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
