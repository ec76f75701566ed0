//! Twitch chat client with a cooperative dispatch loop.
//!
//! This is the main entry point for SDK consumers. The client owns the
//! connection, sends the Twitch login, and turns received lines into
//! [`Event`]s. Nothing runs in the background: the application calls
//! [`Client::tick`] in its own loop, and registered callbacks run inside that
//! call on the caller's thread.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use twirc_sdk::{Client, EventKind, Tick};
//!
//! let mut client: Client = Client::new();
//! client.on(EventKind::Welcome, |c, _| {
//!     let _ = c.join("#mychannel");
//! });
//! client.on(EventKind::Privmsg, |_, evt| {
//!     println!("{}: {}", evt.origin.as_deref().unwrap_or("?"), evt.message.as_deref().unwrap_or(""));
//! });
//! client.connect_anon("irc.chat.twitch.tv", 6667)?;
//! while client.tick(Duration::from_secs(1)) != Tick::ConnectionLost {}
//! # Ok::<(), twirc_sdk::Error>(())
//! ```

use std::fmt;
use std::time::Duration;

use rand::Rng;

use crate::callbacks::Callbacks;
use crate::error::{Error, Result};
use crate::event::{action_text, Event, EventKind};
use crate::irc::Message;
use crate::login::Login;
use crate::transport::{TcpTransport, Transport};

pub const DEFAULT_HOST: &str = "irc.chat.twitch.tv";
pub const DEFAULT_PORT: u16 = 6667;

/// Capabilities requested on login: tags, Twitch commands, JOIN/PART.
const TWITCH_CAPS: &str = "twitch.tv/tags twitch.tv/commands twitch.tv/membership";

/// Channel Twitch routes `/w` whispers through.
const WHISPER_CHANNEL: &str = "#jtv";

/// Bytes read per tick.
const READ_BUFFER_SIZE: usize = 4096;

/// A partial line longer than this is dropped.
const MAX_PENDING_LINE: usize = 64 * 1024;

/// Configuration for connecting to Twitch chat.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    pub host: String,
    pub port: u16,
    /// Login nick. `None` connects anonymously as `justinfan<digits>`.
    pub nick: Option<String>,
    /// OAuth token, with or without the `oauth:` prefix.
    pub token: Option<String>,
    pub connect_timeout: Duration,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            nick: None,
            token: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Where the session is in the login sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Disconnected,
    Connecting,
    /// Transport is up; login not sent yet.
    Connected,
    /// Login sent, waiting for the server's welcome.
    Authenticating,
    /// Welcome received. Channels can be joined.
    Authenticated,
}

/// Outcome of one [`Client::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Tick {
    /// Input was received or events were dispatched.
    Continue,
    /// The timeout elapsed without input.
    Idle,
    /// The connection is gone. Stop ticking.
    ConnectionLost,
}

impl Tick {
    pub fn is_alive(self) -> bool {
        self != Tick::ConnectionLost
    }
}

/// A Twitch chat session.
///
/// `C` is the type of the context slot: application state that callbacks
/// reach through [`Client::context_mut`].
pub struct Client<C = ()> {
    status: Status,
    login: Login,
    context: Option<C>,
    callbacks: Callbacks<C>,
    transport: Option<Box<dyn Transport>>,
    /// Received bytes not yet terminated by a newline.
    pending: Vec<u8>,
    /// Input is skipped up to the next newline: the rest of an oversized line.
    discarding: bool,
    /// The `connect` event still has to be dispatched.
    connect_pending: bool,
}

impl<C> Client<C> {
    pub fn new() -> Self {
        Self {
            status: Status::Disconnected,
            login: Login::default(),
            context: None,
            callbacks: Callbacks::new(),
            transport: None,
            pending: Vec::new(),
            discarding: false,
            connect_pending: false,
        }
    }

    // ── State accessors ─────────────────────────────────────────────

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == Status::Authenticated
    }

    /// The live login record. Display name and user id appear once the
    /// server sent `GLOBALUSERSTATE`.
    pub fn login(&self) -> &Login {
        &self.login
    }

    /// Attach application state. Returns the previous value.
    pub fn set_context(&mut self, context: C) -> Option<C> {
        self.context.replace(context)
    }

    pub fn context(&self) -> Option<&C> {
        self.context.as_ref()
    }

    pub fn context_mut(&mut self) -> Option<&mut C> {
        self.context.as_mut()
    }

    pub fn take_context(&mut self) -> Option<C> {
        self.context.take()
    }

    pub fn callbacks(&self) -> &Callbacks<C> {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut Callbacks<C> {
        &mut self.callbacks
    }

    /// Register a handler for `kind`, replacing any previous one.
    pub fn on<F>(&mut self, kind: EventKind, handler: F)
    where
        F: FnMut(&mut Client<C>, &Event) + 'static,
    {
        self.callbacks.set(kind, handler);
    }

    // ── Connecting ──────────────────────────────────────────────────

    /// Connect and log in with `nick` and an OAuth `token`.
    pub fn connect(&mut self, host: &str, port: u16, nick: &str, token: &str) -> Result<()> {
        self.connect_with(&ConnectConfig {
            host: host.to_string(),
            port,
            nick: Some(nick.to_string()),
            token: Some(token.to_string()),
            ..Default::default()
        })
    }

    /// Connect without credentials. The session can read chat but not send.
    pub fn connect_anon(&mut self, host: &str, port: u16) -> Result<()> {
        self.connect_with(&ConnectConfig {
            host: host.to_string(),
            port,
            ..Default::default()
        })
    }

    /// Establish a TCP connection and send the login.
    ///
    /// Returns once the login is sent. Authentication completes later with
    /// the `welcome` event.
    pub fn connect_with(&mut self, config: &ConnectConfig) -> Result<()> {
        if self.transport.is_some() {
            return Err(Error::AlreadyConnected);
        }
        let nick = config.nick.clone().unwrap_or_else(anonymous_nick);
        let addr = format!("{}:{}", config.host, config.port);
        tracing::info!(%addr, %nick, "Connecting");

        self.status = Status::Connecting;
        let connected = TcpTransport::connect(&config.host, config.port, config.connect_timeout);
        let transport = match connected {
            Ok(transport) => transport,
            Err(source) => {
                self.status = Status::Disconnected;
                return Err(Error::Connect { addr, source });
            }
        };
        self.connect_transport(transport, &nick, config.token.as_deref())
    }

    /// Log in over an already established transport.
    pub fn connect_transport<T>(
        &mut self,
        transport: T,
        nick: &str,
        token: Option<&str>,
    ) -> Result<()>
    where
        T: Transport + 'static,
    {
        if self.transport.is_some() {
            return Err(Error::AlreadyConnected);
        }
        self.transport = Some(Box::new(transport));
        self.status = Status::Connected;
        self.login = Login::new(nick, token);
        self.pending.clear();

        if let Err(e) = self.send_login() {
            // Nothing was dispatched for this session yet, so close quietly.
            self.close_transport();
            return Err(e);
        }
        self.status = Status::Authenticating;
        self.connect_pending = true;
        Ok(())
    }

    fn send_login(&mut self) -> Result<()> {
        self.send(Message::new("CAP", vec!["REQ", TWITCH_CAPS]))?;
        if let Some(pass) = self.login.pass.clone() {
            self.send(Message::new("PASS", vec![pass.as_str()]))?;
        }
        let nick = self.login.nick.clone().unwrap_or_default();
        self.send(Message::new("NICK", vec![nick.as_str()]))
    }

    // ── Dispatch loop ───────────────────────────────────────────────

    /// Wait up to `timeout` for input and dispatch every complete line.
    ///
    /// Events are dispatched in the order their lines arrived; a callback
    /// finishes before the next event is built. Malformed lines are skipped.
    /// When the transport closes or fails, one `disconnect` event is
    /// dispatched and [`Tick::ConnectionLost`] is returned, now and on every
    /// later call until the client connects again.
    pub fn tick(&mut self, timeout: Duration) -> Tick {
        if self.callbacks.is_dispatching() {
            tracing::warn!("tick called from inside a callback, ignoring");
            return Tick::Idle;
        }
        if self.transport.is_none() {
            return Tick::ConnectionLost;
        }

        let mut dispatched = false;
        if std::mem::take(&mut self.connect_pending) {
            self.dispatch(Event::synthetic(EventKind::Connect));
            dispatched = true;
        }

        let mut buf = [0u8; READ_BUFFER_SIZE];
        let received = match self.transport.as_mut() {
            Some(transport) => transport.recv(&mut buf, timeout),
            None => return Tick::ConnectionLost,
        };
        let n = match received {
            Ok(None) if dispatched => return Tick::Continue,
            Ok(None) => return Tick::Idle,
            Ok(Some(0)) => return self.connection_lost("closed by peer"),
            Ok(Some(n)) => n,
            Err(e) => return self.connection_lost(&e.to_string()),
        };

        self.pending.extend_from_slice(&buf[..n]);
        if self.discarding {
            match self.pending.iter().position(|&b| b == b'\n') {
                Some(end) => {
                    self.pending.drain(..=end);
                    self.discarding = false;
                }
                None => self.pending.clear(),
            }
        }
        while let Some(line) = self.next_line() {
            self.process_line(&line);
            if self.transport.is_none() {
                return Tick::ConnectionLost;
            }
        }
        if self.pending.len() > MAX_PENDING_LINE {
            tracing::warn!(len = self.pending.len(), "Dropping oversized partial line");
            self.pending.clear();
            self.discarding = true;
        }
        Tick::Continue
    }

    /// Split the next newline-terminated line off the input buffer.
    fn next_line(&mut self) -> Option<Vec<u8>> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.pending.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(line)
    }

    fn process_line(&mut self, raw: &[u8]) {
        let Ok(line) = std::str::from_utf8(raw) else {
            tracing::debug!(len = raw.len(), "Skipping line with invalid UTF-8");
            return;
        };
        if line.is_empty() {
            return;
        }
        let Some(event) = Message::parse(line).and_then(Event::classify) else {
            tracing::debug!(%line, "Skipping malformed line");
            return;
        };

        self.apply(&event);
        if event.requires_welcome() && self.status != Status::Authenticated {
            tracing::debug!(kind = %event.kind, "Dropping event received before welcome");
            return;
        }
        self.dispatch(event);
    }

    /// State changes the client makes on its own, before callbacks see the
    /// event.
    fn apply(&mut self, event: &Event) {
        match event.kind {
            EventKind::Ping => {
                let token = event.message.clone().unwrap_or_default();
                if let Err(e) = self.pong(&token) {
                    tracing::warn!(error = %e, "Failed to answer PING");
                }
            }
            EventKind::Welcome => {
                self.status = Status::Authenticated;
                tracing::info!(nick = ?self.login.nick(), "Logged in");
            }
            EventKind::GlobalIdentity => {
                self.login
                    .update_identity(event.tag("display-name"), event.tag("user-id"));
            }
            EventKind::Reconnect => {
                tracing::info!("Server requested a reconnect");
            }
            _ => {}
        }
    }

    fn dispatch(&mut self, event: Event) {
        let kind = event.kind;
        let Some(mut handler) = self.callbacks.take(kind) else {
            tracing::trace!(%kind, "No handler registered");
            return;
        };
        tracing::debug!(%kind, "Dispatching");
        handler(self, &event);
        self.callbacks.restore(kind, handler);
    }

    fn connection_lost(&mut self, reason: &str) -> Tick {
        tracing::warn!(%reason, "Connection lost");
        self.shutdown();
        Tick::ConnectionLost
    }

    // ── Commands ────────────────────────────────────────────────────

    /// Join a channel (`#name`). Only meaningful after `welcome`.
    pub fn join(&mut self, channel: &str) -> Result<()> {
        self.send(Message::new("JOIN", vec![channel]))
    }

    pub fn part(&mut self, channel: &str) -> Result<()> {
        self.send(Message::new("PART", vec![channel]))
    }

    /// Send a chat message to a channel.
    pub fn privmsg(&mut self, channel: &str, text: &str) -> Result<()> {
        self.send(Message::new("PRIVMSG", vec![channel, text]))
    }

    /// Send a `/me` message to a channel.
    pub fn action(&mut self, channel: &str, text: &str) -> Result<()> {
        let text = action_text(text);
        self.send(Message::new("PRIVMSG", vec![channel, text.as_str()]))
    }

    /// Whisper `text` to `user`.
    pub fn whisper(&mut self, user: &str, text: &str) -> Result<()> {
        let command = format!("/w {user} {text}");
        self.send(Message::new("PRIVMSG", vec![WHISPER_CHANNEL, command.as_str()]))
    }

    pub fn pong(&mut self, token: &str) -> Result<()> {
        self.send(Message::new("PONG", vec![token]))
    }

    /// Send a preformatted line (without `\r\n`).
    pub fn send_raw(&mut self, line: &str) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
        let command = line.split(' ').next().unwrap_or_default();
        check_line(command, line)?;
        transport.send(line)?;
        Ok(())
    }

    fn send(&mut self, msg: Message) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(Error::NotConnected)?;
        let line = msg.to_string();
        check_line(&msg.command, &line)?;
        // Lines are not logged in full: PASS carries the token.
        tracing::trace!(command = %msg.command, "Sending");
        transport.send(&line)?;
        Ok(())
    }

    // ── Teardown ────────────────────────────────────────────────────

    /// Close the connection and dispatch `disconnect`. The client can be
    /// connected again afterwards.
    pub fn disconnect(&mut self) -> Result<()> {
        if self.transport.is_none() {
            return Err(Error::NotConnected);
        }
        tracing::info!("Disconnecting");
        self.shutdown();
        Ok(())
    }

    /// Disconnect if needed and release the client.
    pub fn kill(mut self) {
        let _ = self.disconnect();
    }

    fn shutdown(&mut self) {
        self.close_transport();
        self.dispatch(Event::synthetic(EventKind::Disconnect));
    }

    fn close_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close() {
                tracing::debug!(error = %e, "Error while closing transport");
            }
        }
        self.status = Status::Disconnected;
        self.connect_pending = false;
        self.pending.clear();
        self.discarding = false;
    }
}

impl<C> Default for Client<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Drop for Client<C> {
    fn drop(&mut self) {
        if self.transport.is_some() {
            self.shutdown();
        }
    }
}

impl<C> fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("status", &self.status)
            .field("login", &self.login.nick())
            .field("callbacks", &self.callbacks)
            .field("has_context", &self.context.is_some())
            .finish()
    }
}

/// Twitch accepts any `justinfan<digits>` nick without a password.
/// One call sends one command: CR, LF and NUL never reach the wire.
fn check_line(command: &str, line: &str) -> Result<()> {
    if line.contains(['\r', '\n', '\0']) {
        return Err(Error::InvalidLine(command.to_string()));
    }
    Ok(())
}

fn anonymous_nick() -> String {
    format!("justinfan{}", rand::thread_rng().gen_range(1000..100_000))
}
