//! Client transport: join handshake, the receive/act loop and leaving.

use crate::audio::AudioSink;
use crate::game::{ClientEvent, ClientGameState};
use crate::input::ActionSource;
use log::{debug, error, info};
use shared::{encode, CodecError, Packet, MAX_DATAGRAM_SIZE};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::{interval, timeout_at, MissedTickBehavior};

/// How long `connect` waits for the join ack and the map.
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval between two actions sent to the server.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("no join reply from {addr} within {waited:?}")]
    Timeout { addr: SocketAddr, waited: Duration },

    #[error("socket error: {0}")]
    Io(#[from] io::Error),

    #[error("could not encode join: {0}")]
    Codec(#[from] CodecError),
}

pub struct Client<A, S> {
    socket: UdpSocket,
    server_addr: SocketAddr,
    game_state: ClientGameState,
    actions: A,
    audio: S,
}

impl<A: ActionSource, S: AudioSink> Client<A, S> {
    /// Joins the server at `server_addr` and waits for the join ack and the
    /// map. The server drops refused joins silently, so a full server shows
    /// up as a timeout.
    pub async fn connect(
        server_addr: SocketAddr,
        actions: A,
        audio: S,
    ) -> Result<Self, ConnectError> {
        let local: SocketAddr = if server_addr.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local).await?;

        info!("Joining {}...", server_addr);
        socket
            .send_to(&encode(0, &Packet::Join)?, server_addr)
            .await?;

        let mut client = Self {
            socket,
            server_addr,
            game_state: ClientGameState::new(),
            actions,
            audio,
        };

        let deadline = tokio::time::Instant::now() + JOIN_TIMEOUT;
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

        while !client.game_state.is_ready() {
            let received = timeout_at(deadline, client.socket.recv_from(&mut buffer))
                .await
                .map_err(|_| ConnectError::Timeout {
                    addr: server_addr,
                    waited: JOIN_TIMEOUT,
                })?;
            let (len, from) = received?;
            client.handle_datagram(&buffer[..len], from);
        }

        Ok(client)
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    pub fn audio(&self) -> &S {
        &self.audio
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Runs until Ctrl-C, then tells the server we are leaving.
    pub async fn run(&mut self) -> io::Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Receives, acts and plays sounds until `shutdown` completes, then sends
    /// a leave.
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) -> io::Result<()> {
        let mut frames = interval(FRAME_INTERVAL);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, from)) => self.handle_datagram(&buffer[..len], from),
                        Err(e) => debug!("Receive failed: {}", e),
                    }
                },

                _ = frames.tick() => {
                    let action = self.actions.next_action(&self.game_state, Instant::now());
                    if let Some(action) = action {
                        self.send(&Packet::Act(action)).await?;
                    }
                },

                _ = &mut shutdown => {
                    info!("Leaving server");
                    break;
                }
            }
        }

        self.send(&Packet::Leave).await
    }

    fn handle_datagram(&mut self, bytes: &[u8], from: SocketAddr) {
        if from != self.server_addr {
            debug!("Ignoring datagram from {}", from);
            return;
        }

        match self.game_state.ingest(bytes) {
            Ok(ClientEvent::Sound(sound)) => self.audio.play(&sound),
            Ok(_) => {}
            Err(e) => debug!("Dropping datagram: {}", e),
        }
    }

    async fn send(&self, packet: &Packet) -> io::Result<()> {
        let tick = self.game_state.snapshot_tick().unwrap_or(0);
        let bytes =
            encode(tick, packet).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.socket.send_to(&bytes, self.server_addr).await?;
        Ok(())
    }
}
