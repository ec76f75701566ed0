//! Dump the chat of one Twitch channel to stdout.
//!
//! Connects anonymously, joins the channel once logged in and prints every
//! chat and `/me` line until interrupted or disconnected.

mod config;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::format::{Item, StrftimeItems};
use clap::Parser;
use signal_hook::consts::signal::{SIGINT, SIGQUIT, SIGTERM};
use tracing_subscriber::EnvFilter;
use twirc_sdk::{Client, Event, EventKind};

use config::DumpConfig;

const TICK_TIMEOUT: Duration = Duration::from_secs(1);

/// Callback state kept in the client's context slot.
struct Dump {
    channel: String,
    timestamp: Option<String>,
}

impl Dump {
    /// Timestamp followed by a space, or nothing when timestamps are off.
    fn prefix(&self) -> String {
        match &self.timestamp {
            Some(format) => format!("{} ", chrono::Local::now().format(format)),
            None => String::new(),
        }
    }
}

fn main() -> Result<()> {
    let config = DumpConfig::parse();

    let directive = if config.status {
        "twirc_dump=info"
    } else {
        "twirc_dump=warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .init();

    if let Some(ref format) = config.timestamp {
        validate_timestamp(format)?;
    }

    let stop = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGQUIT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&stop))
            .with_context(|| format!("failed to register handler for signal {signal}"))?;
    }

    tracing::info!("Initializing");
    let mut client: Client<Dump> = Client::new();
    client.set_context(Dump {
        channel: config.channel_name(),
        timestamp: config.timestamp.clone(),
    });
    register_handlers(&mut client);

    client
        .connect_anon(&config.host, config.port)
        .context("error connecting")?;

    while !stop.load(Ordering::Relaxed) && client.tick(TICK_TIMEOUT).is_alive() {}

    client.kill();
    Ok(())
}

fn register_handlers(client: &mut Client<Dump>) {
    client.on(EventKind::Connect, |_, _| tracing::info!("Connected"));
    client.on(EventKind::Welcome, |c, _| {
        tracing::info!("Authenticated");
        let Some(channel) = c.context().map(|d| d.channel.clone()) else {
            return;
        };
        if let Err(e) = c.join(&channel) {
            tracing::warn!(%channel, error = %e, "Failed to join");
        }
    });
    client.on(EventKind::Join, |c, evt| {
        if c.login().nick().is_some_and(|nick| evt.is_from(nick)) {
            tracing::info!(channel = ?evt.channel, "Joined");
        }
    });
    client.on(EventKind::Privmsg, |c, evt| {
        if let Some(dump) = c.context() {
            println!("{}", chat_line(&dump.prefix(), evt));
        }
    });
    client.on(EventKind::Action, |c, evt| {
        if let Some(dump) = c.context() {
            println!("{}", chat_line(&dump.prefix(), evt));
        }
    });
    client.on(EventKind::Notice, |_, evt| {
        tracing::info!(notice = ?evt.message, "Server notice");
    });
    client.on(EventKind::Disconnect, |_, _| tracing::info!("Disconnected"));
}

/// `nick: message` for chat, `* nick message` for actions.
fn chat_line(prefix: &str, evt: &Event) -> String {
    let nick = evt.origin.as_deref().unwrap_or_default();
    let message = evt.message.as_deref().unwrap_or_default();
    match evt.kind {
        EventKind::Action => format!("{prefix}* {nick} {message}"),
        _ => format!("{prefix}{nick}: {message}"),
    }
}

/// Reject strftime formats chrono cannot render, instead of failing on the
/// first chat line.
fn validate_timestamp(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        anyhow::bail!("invalid timestamp format: {format}");
    }
    Ok(())
}
