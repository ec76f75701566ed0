//! Minimal Twitch bot example.
//!
//! Demonstrates using the twirc SDK to build a bot that:
//! - Logs in with an OAuth token read from a file
//! - Joins a channel once the server welcomed us
//! - Greets the channel when it sees its own join
//! - Prints chat and `/me` messages with the sender's color
//! - Answers whispers
//!
//! Usage:
//!   cargo run --example test_bot -- --nick mybot --channel "#mychannel" --token-file token
//!
//! The token file holds a single line, the OAuth token (`oauth:...`).

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use signal_hook::consts::signal::{SIGINT, SIGQUIT, SIGTERM};
use twirc_sdk::{Client, Event, EventKind, DEFAULT_HOST, DEFAULT_PORT};

#[derive(Parser)]
#[command(name = "test-bot", about = "Minimal twirc test bot")]
struct Args {
    /// Server host
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Server port
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Bot nick (the Twitch account the token belongs to)
    #[arg(long)]
    nick: String,

    /// Channel to join
    #[arg(long)]
    channel: String,

    /// File holding the OAuth token
    #[arg(long, default_value = "token")]
    token_file: String,
}

/// State the callbacks share through the client's context slot.
struct Bot {
    channel: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let token = read_token(Path::new(&args.token_file))?;

    // Signals only raise this flag; the main loop checks it between ticks.
    let stop = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGQUIT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&stop))
            .with_context(|| format!("failed to register handler for signal {signal}"))?;
    }

    let mut client: Client<Bot> = Client::new();
    client.set_context(Bot {
        channel: args.channel.clone(),
    });

    client.on(EventKind::Connect, |_, _| println!("*** connected!"));
    client.on(EventKind::Welcome, |c, _| {
        println!("*** logged in!");
        let channel = c.context().map(|b| b.channel.clone()).unwrap_or_default();
        println!("*** joining {channel}");
        if let Err(e) = c.join(&channel) {
            eprintln!("*** join failed: {e}");
        }
    });
    client.on(EventKind::Join, |c, evt| {
        let Some(nick) = c.login().nick().map(str::to_string) else {
            return;
        };
        let channel = c.context().map(|b| b.channel.clone()).unwrap_or_default();
        if evt.is_from(&nick) && evt.channel.as_deref() == Some(channel.as_str()) {
            if let Err(e) = c.privmsg(&channel, "I'm alive!") {
                eprintln!("*** greeting failed: {e}");
            }
            if let Err(e) = c.action(&channel, "might be the coolest bot ever") {
                eprintln!("*** action failed: {e}");
            }
        }
    });
    client.on(EventKind::Privmsg, |_, evt| print_chat(evt, ": "));
    client.on(EventKind::Action, |_, evt| print_chat(evt, " * "));
    client.on(EventKind::Whisper, |c, evt| {
        let from = evt.origin.as_deref().unwrap_or_default();
        println!(
            "[{}] *** whisper from {from}: {}",
            chrono::Local::now().format("%H:%M:%S"),
            evt.message.as_deref().unwrap_or_default()
        );
        if let Err(e) = c.whisper(from, "Thanks, but I'm only a bot :-(") {
            eprintln!("*** whisper failed: {e}");
        }
    });
    client.on(EventKind::Disconnect, |_, _| println!("*** connection lost"));

    client
        .connect(&args.host, args.port, &args.nick, &token)
        .context("could not connect to Twitch IRC")?;
    eprintln!("Connection initiated...");

    while client.tick(Duration::from_secs(1)).is_alive() && !stop.load(Ordering::Relaxed) {}

    client.kill();
    eprintln!("Bye!");
    Ok(())
}

fn print_chat(evt: &Event, separator: &str) {
    // Chat lines usually carry the user's color; it is empty if never set.
    let color = evt.tag("color").filter(|c| !c.is_empty()).unwrap_or("default");
    println!(
        "[{}] [{color}] ({}) {}{separator}{}",
        chrono::Local::now().format("%H:%M:%S"),
        evt.channel.as_deref().unwrap_or_default(),
        evt.origin.as_deref().unwrap_or_default(),
        evt.message.as_deref().unwrap_or_default()
    );
}

/// First line of the token file, without the trailing newline.
fn read_token(path: &Path) -> Result<String> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("could not read token file {}", path.display()))?;
    let token = contents.lines().next().unwrap_or_default().trim().to_string();
    if token.is_empty() {
        anyhow::bail!("token file {} is empty", path.display());
    }
    Ok(token)
}
