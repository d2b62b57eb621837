use clap::Parser;
use client::audio::LoggingSink;
use client::input::WanderBot;
use client::network::Client;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::{IpAddr, SocketAddr};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address
    server_ip: IpAddr,

    /// Server UDP port
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let server_addr = SocketAddr::new(args.server_ip, args.port);

    let bot = WanderBot::new(StdRng::from_entropy());
    let mut client = Client::connect(server_addr, bot, LoggingSink).await?;
    if let Some(id) = client.game_state().player_id() {
        info!("Playing as player {}, Ctrl-C to leave", id);
    }

    client.run().await?;

    Ok(())
}
