//! Twitch chat SDK
//!
//! An event-driven IRC client for Twitch chat. Register callbacks per
//! [`EventKind`], connect, then call [`Client::tick`] in your own loop; the
//! client reads from the connection, classifies each line and runs the
//! matching callback on your thread.
//!
//! # Modules
//!
//! - [`client`] — Client state, connect entry points, dispatch loop, commands
//! - [`callbacks`] — Per-kind callback table
//! - [`event`] — Event kinds and classification of IRC lines
//! - [`irc`] — IRC message parsing/formatting
//! - [`tags`] — IRCv3 tag store
//! - [`login`] — Login identity
//! - [`transport`] — Transport trait and the TCP implementation

pub mod callbacks;
pub mod client;
pub mod error;
pub mod event;
pub mod irc;
pub mod login;
pub mod tags;
pub mod transport;

pub use callbacks::{Callback, Callbacks};
pub use client::{Client, ConnectConfig, Status, Tick, DEFAULT_HOST, DEFAULT_PORT};
pub use error::{Error, Result};
pub use event::{Event, EventKind};
pub use login::Login;
pub use tags::TagStore;
pub use transport::{TcpTransport, Transport};
