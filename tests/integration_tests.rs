//! Integration tests for the arena server and client
//!
//! Every test starts a real server on a loopback port and talks to it over
//! UDP, either through the client library or through a bare socket speaking
//! the wire format directly.

use client::game::AudibleSound;
use client::input::WanderBot;
use client::network::Client;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use server::config::ServerConfig;
use server::network::Server;
use shared::{
    decode, encode, Action, Datagram, MovementDirection, Packet, SoundKind, MAP_HEIGHT,
    MAP_LENGTH, MAP_WIDTH, MAX_DATAGRAM_SIZE,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout, Instant};

const REPLY_TIMEOUT: Duration = Duration::from_secs(2);

async fn start_server(config: ServerConfig) -> SocketAddr {
    let server = Server::bind_with_rng("127.0.0.1:0", config, StdRng::seed_from_u64(7))
        .await
        .expect("Failed to bind server");
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn raw_socket() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test socket")
}

async fn send(socket: &UdpSocket, server: SocketAddr, packet: &Packet) {
    socket
        .send_to(&encode(0, packet).unwrap(), server)
        .await
        .unwrap();
}

/// Receives until `matches` accepts a datagram, or gives up after `wait`.
async fn recv_until<F>(socket: &UdpSocket, wait: Duration, mut matches: F) -> Option<Datagram>
where
    F: FnMut(&Datagram) -> bool,
{
    let deadline = Instant::now() + wait;
    let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        let (len, _) = tokio::time::timeout_at(deadline, socket.recv_from(&mut buffer))
            .await
            .ok()?
            .ok()?;
        if let Ok(datagram) = decode(&buffer[..len]) {
            if matches(&datagram) {
                return Some(datagram);
            }
        }
    }
}

/// Joins with a bare socket and returns the assigned player id.
async fn join(socket: &UdpSocket, server: SocketAddr) -> u32 {
    send(socket, server, &Packet::Join).await;
    let ack = recv_until(socket, REPLY_TIMEOUT, |d| {
        matches!(d.packet, Packet::JoinAck { .. })
    })
    .await
    .expect("No join ack");
    match ack.packet {
        Packet::JoinAck { player_id } => player_id,
        _ => unreachable!(),
    }
}

fn action(movement: MovementDirection, firing: bool) -> Action {
    Action {
        movement,
        view_dir: Vec3::X,
        firing,
        jumping: false,
    }
}

/// JOIN HANDSHAKE TESTS
mod join_tests {
    use super::*;

    #[tokio::test]
    async fn client_connect_receives_id_and_map() {
        let server = start_server(ServerConfig::default()).await;

        let bot = WanderBot::new(StdRng::seed_from_u64(1));
        let client = Client::connect(server, bot, Vec::<AudibleSound>::new())
            .await
            .expect("Failed to connect");

        let state = client.game_state();
        assert_eq!(state.player_id(), Some(1));
        let dims = state.grid().unwrap().dims();
        assert_eq!(
            (dims.width, dims.height, dims.length),
            (MAP_WIDTH, MAP_HEIGHT, MAP_LENGTH)
        );
    }

    #[tokio::test]
    async fn map_follows_join_ack() {
        let server = start_server(ServerConfig::default()).await;
        let socket = raw_socket().await;

        join(&socket, server).await;
        let map = recv_until(&socket, REPLY_TIMEOUT, |d| {
            matches!(d.packet, Packet::MapData(_))
        })
        .await;
        assert!(map.is_some());
    }

    #[tokio::test]
    async fn player_ids_are_distinct() {
        let server = start_server(ServerConfig::default()).await;
        let first = raw_socket().await;
        let second = raw_socket().await;

        let a = join(&first, server).await;
        let b = join(&second, server).await;
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn duplicate_join_gets_no_second_ack() {
        let server = start_server(ServerConfig::default()).await;
        let socket = raw_socket().await;

        join(&socket, server).await;
        send(&socket, server, &Packet::Join).await;

        let again = recv_until(&socket, Duration::from_millis(300), |d| {
            matches!(d.packet, Packet::JoinAck { .. })
        })
        .await;
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn full_server_drops_join() {
        let config = ServerConfig {
            max_players: 1,
            ..ServerConfig::default()
        };
        let server = start_server(config).await;
        let first = raw_socket().await;
        let second = raw_socket().await;

        join(&first, server).await;
        send(&second, server, &Packet::Join).await;

        let reply = recv_until(&second, Duration::from_millis(500), |_| true).await;
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn malformed_datagram_does_not_stop_server() {
        let server = start_server(ServerConfig::default()).await;
        let socket = raw_socket().await;

        socket.send_to(&[0xff, 1, 2], server).await.unwrap();
        socket.send_to(&[], server).await.unwrap();

        assert_eq!(join(&socket, server).await, 1);
    }
}

/// SIMULATION OVER THE WIRE
mod gameplay_tests {
    use super::*;

    #[tokio::test]
    async fn state_reflects_sent_action() {
        let server = start_server(ServerConfig::default()).await;
        let socket = raw_socket().await;
        let id = join(&socket, server).await;

        send(&socket, server, &Packet::Act(action(MovementDirection::Forward, false))).await;

        let state = recv_until(&socket, REPLY_TIMEOUT, |d| match &d.packet {
            Packet::State(snapshot) => snapshot
                .players
                .iter()
                .any(|p| p.player_id == id && p.movement == MovementDirection::Forward),
            _ => false,
        })
        .await;
        assert!(state.is_some());
    }

    #[tokio::test]
    async fn state_tick_ids_advance() {
        let server = start_server(ServerConfig::default()).await;
        let socket = raw_socket().await;
        join(&socket, server).await;

        let is_state = |d: &Datagram| matches!(d.packet, Packet::State(_));
        let first = recv_until(&socket, REPLY_TIMEOUT, is_state).await.unwrap();
        let second = recv_until(&socket, REPLY_TIMEOUT, is_state).await.unwrap();
        assert!(second.tick_id > first.tick_id);
    }

    #[tokio::test]
    async fn gunshot_reaches_other_players() {
        let server = start_server(ServerConfig::default()).await;
        let shooter = raw_socket().await;
        let listener = raw_socket().await;
        join(&shooter, server).await;
        join(&listener, server).await;

        send(&shooter, server, &Packet::Act(action(MovementDirection::None, true))).await;

        let gunshot = recv_until(&listener, REPLY_TIMEOUT, |d| {
            matches!(&d.packet, Packet::SoundEvent(e) if e.kind == SoundKind::Gunshot)
        })
        .await;
        assert!(gunshot.is_some());
    }

    #[tokio::test]
    async fn leave_removes_player_from_state() {
        let server = start_server(ServerConfig::default()).await;
        let leaver = raw_socket().await;
        let observer = raw_socket().await;
        let leaver_id = join(&leaver, server).await;
        join(&observer, server).await;

        send(&leaver, server, &Packet::Leave).await;

        let gone = recv_until(&observer, REPLY_TIMEOUT, |d| match &d.packet {
            Packet::State(snapshot) => snapshot.players.iter().all(|p| p.player_id != leaver_id),
            _ => false,
        })
        .await;
        assert!(gone.is_some());
    }

    #[tokio::test]
    async fn planar_players_are_always_grounded() {
        let server = start_server(ServerConfig::planar()).await;
        let socket = raw_socket().await;
        let id = join(&socket, server).await;

        let state = recv_until(&socket, REPLY_TIMEOUT, |d| matches!(d.packet, Packet::State(_)))
            .await
            .unwrap();
        match state.packet {
            Packet::State(snapshot) => {
                let player = snapshot.players.iter().find(|p| p.player_id == id).unwrap();
                assert!(player.grounded);
            }
            _ => unreachable!(),
        }
    }
}

/// CLIENT LOOP TESTS
mod client_tests {
    use super::*;

    #[tokio::test]
    async fn client_run_until_sends_leave() {
        let server = start_server(ServerConfig::default()).await;
        let observer = raw_socket().await;
        join(&observer, server).await;

        let bot = WanderBot::new(StdRng::seed_from_u64(3));
        let mut client = Client::connect(server, bot, Vec::<AudibleSound>::new())
            .await
            .expect("Failed to connect");
        let client_id = client.game_state().player_id().unwrap();

        client
            .run_until(sleep(Duration::from_millis(300)))
            .await
            .expect("Client loop failed");

        // Skip snapshots from before the client joined.
        let present = recv_until(&observer, REPLY_TIMEOUT, |d| match &d.packet {
            Packet::State(snapshot) => snapshot.players.iter().any(|p| p.player_id == client_id),
            _ => false,
        })
        .await;
        assert!(present.is_some());

        let gone = recv_until(&observer, REPLY_TIMEOUT, |d| match &d.packet {
            Packet::State(snapshot) => snapshot.players.iter().all(|p| p.player_id != client_id),
            _ => false,
        })
        .await;
        assert!(gone.is_some());
    }

    #[tokio::test]
    async fn running_client_tracks_snapshots() {
        let server = start_server(ServerConfig::default()).await;

        let bot = WanderBot::new(StdRng::seed_from_u64(4));
        let mut client = Client::connect(server, bot, Vec::<AudibleSound>::new())
            .await
            .expect("Failed to connect");

        let result = timeout(
            REPLY_TIMEOUT,
            client.run_until(sleep(Duration::from_millis(300))),
        )
        .await;
        assert!(matches!(result, Ok(Ok(()))));

        let state = client.game_state();
        assert!(state.snapshot_tick().is_some());
        assert!(state.local_player().is_some());
        assert!(state.field().is_some());
    }
}
