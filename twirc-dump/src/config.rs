use clap::Parser;
use twirc_sdk::{DEFAULT_HOST, DEFAULT_PORT};

/// Default `-t` format: `[12:34:56]`.
pub const DEFAULT_TIMESTAMP: &str = "[%H:%M:%S]";

/// Dump the chat of a Twitch channel to stdout.
#[derive(Parser, Debug, Clone)]
#[command(name = "twirc-dump", version, about)]
pub struct DumpConfig {
    /// Channel to join. A leading `#` is added when missing.
    #[arg(short = 'c', long)]
    pub channel: String,

    /// Prefix messages with a timestamp, optionally in a custom strftime
    /// format.
    #[arg(
        short = 't',
        long,
        value_name = "FORMAT",
        num_args = 0..=1,
        default_missing_value = DEFAULT_TIMESTAMP
    )]
    pub timestamp: Option<String>,

    /// Print status information (connected, joined, ...) to stderr.
    #[arg(short = 's', long)]
    pub status: bool,

    /// Chat server host.
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Chat server port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl DumpConfig {
    /// Channel name as Twitch expects it: lowercase, `#`-prefixed.
    pub fn channel_name(&self) -> String {
        let name = self.channel.trim().trim_start_matches('#').to_lowercase();
        format!("#{name}")
    }
}
