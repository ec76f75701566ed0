//! Events dispatched by the client to registered callbacks.
//!
//! Every received line is classified into at most one [`Event`]. The
//! `connect` and `disconnect` events are synthesized by the client itself.

use std::fmt;

use crate::irc::Message;
use crate::tags::TagStore;

/// The closed set of event kinds a callback can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Transport established, login handshake sent. Not authenticated yet.
    Connect,
    /// `001`: the server accepted our login. Joining channels is valid now.
    Welcome,
    /// `GLOBALUSERSTATE`: identity tags (display name, user id) after login.
    GlobalIdentity,
    Join,
    Part,
    /// Channel chat.
    Privmsg,
    /// Channel chat sent with `/me`.
    Action,
    /// Direct message.
    Whisper,
    /// `PING` from the server. The client answers it before dispatching.
    Ping,
    Notice,
    RoomState,
    UserState,
    /// Subscriptions, raids and other channel announcements.
    UserNotice,
    /// Chat cleared, or a user timed out / banned.
    ClearChat,
    /// A single message was deleted.
    ClearMsg,
    HostTarget,
    /// `353` names reply.
    Names,
    /// `CAP * ACK`.
    CapAck,
    /// The server is about to restart; reconnect soon.
    Reconnect,
    /// `421` unknown command.
    InvalidCommand,
    /// Any other command. `params` carries everything.
    Other,
    /// Transport closed, locally or remotely.
    Disconnect,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Connect => "connect",
            EventKind::Welcome => "welcome",
            EventKind::GlobalIdentity => "global-identity",
            EventKind::Join => "join",
            EventKind::Part => "part",
            EventKind::Privmsg => "privmsg",
            EventKind::Action => "action",
            EventKind::Whisper => "whisper",
            EventKind::Ping => "ping",
            EventKind::Notice => "notice",
            EventKind::RoomState => "roomstate",
            EventKind::UserState => "userstate",
            EventKind::UserNotice => "usernotice",
            EventKind::ClearChat => "clearchat",
            EventKind::ClearMsg => "clearmsg",
            EventKind::HostTarget => "hosttarget",
            EventKind::Names => "names",
            EventKind::CapAck => "capack",
            EventKind::Reconnect => "reconnect",
            EventKind::InvalidCommand => "invalid-command",
            EventKind::Other => "other",
            EventKind::Disconnect => "disconnect",
        }
    }

    /// Kinds that only make sense on an authenticated session. They are
    /// never dispatched before `welcome`.
    pub fn requires_welcome(self) -> bool {
        matches!(
            self,
            EventKind::Join
                | EventKind::Part
                | EventKind::Privmsg
                | EventKind::Action
                | EventKind::Whisper
                | EventKind::RoomState
                | EventKind::UserState
                | EventKind::UserNotice
                | EventKind::ClearChat
                | EventKind::ClearMsg
                | EventKind::HostTarget
                | EventKind::Names
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One classified occurrence. Built fresh per dispatch; copy out whatever
/// you need to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    /// Raw IRC command (`PRIVMSG`, `001`, ...); `CONNECT`/`DISCONNECT` for
    /// synthesized events.
    pub command: String,
    /// Nick (or server name) the event originated from.
    pub origin: Option<String>,
    /// Channel the event applies to.
    pub channel: Option<String>,
    /// Secondary subject: whisper recipient, banned user, hosted channel.
    pub target: Option<String>,
    /// Message body or text.
    pub message: Option<String>,
    pub tags: TagStore,
    /// Raw positional parameters.
    pub params: Vec<String>,
}

const CTCP_ACTION_PREFIX: &str = "\u{1}ACTION ";

impl Event {
    /// An event with no fields populated.
    pub fn synthetic(kind: EventKind) -> Self {
        Self {
            kind,
            command: kind.as_str().to_ascii_uppercase(),
            origin: None,
            channel: None,
            target: None,
            message: None,
            tags: TagStore::new(),
            params: Vec::new(),
        }
    }

    /// Whether the event is held back until the server has welcomed us:
    /// chat and channel-scoped kinds, plus notices aimed at a channel.
    pub fn requires_welcome(&self) -> bool {
        self.kind.requires_welcome() || (self.kind == EventKind::Notice && self.channel.is_some())
    }

    /// Classify a parsed message.
    ///
    /// Returns `None` when the message lacks the parameters its command
    /// requires; such lines are skipped by the dispatch loop.
    pub fn classify(msg: Message) -> Option<Self> {
        let origin = msg.nick().map(str::to_string);
        let param = |i: usize| msg.params.get(i).cloned();
        if needs_origin(&msg.command) && origin.is_none() {
            return None;
        }
        let mut event = Self {
            kind: EventKind::Other,
            command: msg.command.clone(),
            origin,
            channel: None,
            target: None,
            message: None,
            tags: TagStore::new(),
            params: Vec::new(),
        };

        match msg.command.as_str() {
            "001" => {
                event.kind = EventKind::Welcome;
                event.target = param(0);
                event.message = param(1);
            }
            "GLOBALUSERSTATE" => event.kind = EventKind::GlobalIdentity,
            "JOIN" | "PART" => {
                event.kind = if msg.command == "JOIN" {
                    EventKind::Join
                } else {
                    EventKind::Part
                };
                event.channel = Some(param(0)?);
            }
            "PRIVMSG" => {
                let text = param(1)?;
                event.channel = param(0);
                match strip_action(&text) {
                    Some(body) => {
                        event.kind = EventKind::Action;
                        event.message = Some(body.to_string());
                    }
                    None => {
                        event.kind = EventKind::Privmsg;
                        event.message = Some(text);
                    }
                }
            }
            "WHISPER" => {
                event.kind = EventKind::Whisper;
                event.target = param(0);
                event.message = Some(param(1)?);
            }
            "PING" => {
                event.kind = EventKind::Ping;
                event.origin = None;
                event.message = param(0);
            }
            "NOTICE" => {
                event.kind = EventKind::Notice;
                event.channel = param(0).filter(|c| c.starts_with('#'));
                event.message = param(1);
            }
            "ROOMSTATE" | "USERSTATE" => {
                event.kind = if msg.command == "ROOMSTATE" {
                    EventKind::RoomState
                } else {
                    EventKind::UserState
                };
                event.channel = Some(param(0)?);
            }
            "USERNOTICE" => {
                event.kind = EventKind::UserNotice;
                event.channel = Some(param(0)?);
                event.message = param(1);
            }
            "CLEARCHAT" => {
                event.kind = EventKind::ClearChat;
                event.channel = Some(param(0)?);
                event.target = param(1);
            }
            "CLEARMSG" => {
                event.kind = EventKind::ClearMsg;
                event.channel = Some(param(0)?);
                event.message = param(1);
            }
            "HOSTTARGET" => {
                // HOSTTARGET #hosting :<hosted|-> [viewers]
                event.kind = EventKind::HostTarget;
                event.channel = Some(param(0)?);
                let hosting = param(1)?;
                let mut parts = hosting.splitn(2, ' ');
                event.target = parts
                    .next()
                    .filter(|t| *t != "-" && !t.is_empty())
                    .map(|t| format!("#{t}"));
                event.message = parts.next().map(str::to_string);
            }
            "353" => {
                // 353 <nick> = #channel :nick1 nick2
                event.kind = EventKind::Names;
                event.channel = Some(param(2)?);
                event.message = param(3);
            }
            "CAP" => {
                if msg.params.get(1).map(String::as_str) == Some("ACK") {
                    event.kind = EventKind::CapAck;
                    event.message = param(2);
                }
            }
            "RECONNECT" => event.kind = EventKind::Reconnect,
            "421" => {
                event.kind = EventKind::InvalidCommand;
                event.message = msg.params.last().cloned();
            }
            _ => {}
        }

        Some(event.with_raw(msg))
    }

    fn with_raw(mut self, msg: Message) -> Self {
        self.tags = msg.tags;
        self.params = msg.params;
        self
    }

    /// Whether the event was caused by `nick` (Twitch nicks are lowercase,
    /// the comparison ignores case anyway).
    pub fn is_from(&self, nick: &str) -> bool {
        self.origin
            .as_deref()
            .is_some_and(|o| o.eq_ignore_ascii_case(nick))
    }

    /// Shorthand for `self.tags.get(key)`.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key)
    }
}

/// User-originated commands are meaningless without a `nick!user@host` prefix.
fn needs_origin(command: &str) -> bool {
    matches!(command, "JOIN" | "PART" | "PRIVMSG" | "WHISPER")
}

/// Body of a CTCP ACTION (`\x01ACTION text\x01`), if the text is one.
fn strip_action(text: &str) -> Option<&str> {
    let body = text.strip_prefix(CTCP_ACTION_PREFIX)?;
    Some(body.strip_suffix('\u{1}').unwrap_or(body))
}

/// Wrap text in CTCP ACTION framing.
pub(crate) fn action_text(text: &str) -> String {
    format!("{CTCP_ACTION_PREFIX}{text}\u{1}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(line: &str) -> Option<Event> {
        Event::classify(Message::parse(line)?)
    }

    #[test]
    fn privmsg_fields() {
        let event = classify(
            "@color=#FF0000;display-name=alice :alice!alice@alice.tmi.twitch.tv PRIVMSG #test :hello",
        )
        .unwrap();
        assert_eq!(event.kind, EventKind::Privmsg);
        assert_eq!(event.origin.as_deref(), Some("alice"));
        assert_eq!(event.channel.as_deref(), Some("#test"));
        assert_eq!(event.message.as_deref(), Some("hello"));
        assert_eq!(event.tag("color"), Some("#FF0000"));
        assert_eq!(event.target, None);
        assert_eq!(event.params, vec!["#test", "hello"]);
    }

    #[test]
    fn action_framing_is_stripped() {
        let event = classify(":bob!bob@bob.tmi.twitch.tv PRIVMSG #test :\u{1}ACTION waves\u{1}").unwrap();
        assert_eq!(event.kind, EventKind::Action);
        assert_eq!(event.message.as_deref(), Some("waves"));

        assert_eq!(strip_action(&action_text("dances")), Some("dances"));
        assert_eq!(strip_action("ACTION nope"), None);
    }

    #[test]
    fn whisper_fields() {
        let event = classify(
            "@user-id=42 :carol!carol@carol.tmi.twitch.tv WHISPER bot :psst",
        )
        .unwrap();
        assert_eq!(event.kind, EventKind::Whisper);
        assert_eq!(event.origin.as_deref(), Some("carol"));
        assert_eq!(event.target.as_deref(), Some("bot"));
        assert_eq!(event.message.as_deref(), Some("psst"));
        assert_eq!(event.channel, None);
    }

    #[test]
    fn join_and_part() {
        let join = classify(":bot!bot@bot.tmi.twitch.tv JOIN #foo").unwrap();
        assert_eq!(join.kind, EventKind::Join);
        assert_eq!(join.channel.as_deref(), Some("#foo"));
        assert!(join.is_from("bot"));
        assert!(join.is_from("BOT"));
        assert!(!join.is_from("alice"));
        assert_eq!(join.message, None);

        let part = classify(":bot!bot@bot.tmi.twitch.tv PART #foo").unwrap();
        assert_eq!(part.kind, EventKind::Part);
    }

    #[test]
    fn welcome_and_identity() {
        let welcome = classify(":tmi.twitch.tv 001 bot :Welcome, GLHF!").unwrap();
        assert_eq!(welcome.kind, EventKind::Welcome);
        assert_eq!(welcome.target.as_deref(), Some("bot"));

        let gus = classify("@display-name=Bot;user-id=1234 :tmi.twitch.tv GLOBALUSERSTATE").unwrap();
        assert_eq!(gus.kind, EventKind::GlobalIdentity);
        assert_eq!(gus.tag("user-id"), Some("1234"));
    }

    #[test]
    fn hosttarget_splits_target_and_viewers() {
        let event = classify(":tmi.twitch.tv HOSTTARGET #abc :xyz 10").unwrap();
        assert_eq!(event.channel.as_deref(), Some("#abc"));
        assert_eq!(event.target.as_deref(), Some("#xyz"));
        assert_eq!(event.message.as_deref(), Some("10"));

        let stop = classify(":tmi.twitch.tv HOSTTARGET #abc :- 0").unwrap();
        assert_eq!(stop.target, None);
    }

    #[test]
    fn twitch_channel_commands() {
        let ban = classify("@ban-duration=60 :tmi.twitch.tv CLEARCHAT #chan :spammer").unwrap();
        assert_eq!(ban.kind, EventKind::ClearChat);
        assert_eq!(ban.target.as_deref(), Some("spammer"));

        let clear = classify(":tmi.twitch.tv CLEARCHAT #chan").unwrap();
        assert_eq!(clear.target, None);

        let names = classify(":bot.tmi.twitch.tv 353 bot = #chan :bot alice").unwrap();
        assert_eq!(names.kind, EventKind::Names);
        assert_eq!(names.channel.as_deref(), Some("#chan"));
        assert_eq!(names.message.as_deref(), Some("bot alice"));

        let notice = classify(":tmi.twitch.tv NOTICE * :Login authentication failed").unwrap();
        assert_eq!(notice.kind, EventKind::Notice);
        assert_eq!(notice.channel, None);
        assert_eq!(notice.message.as_deref(), Some("Login authentication failed"));
        assert!(!notice.requires_welcome());

        let notice = classify(":tmi.twitch.tv NOTICE #chan :This room is now in slow mode.").unwrap();
        assert_eq!(notice.channel.as_deref(), Some("#chan"));
        assert!(notice.requires_welcome());
    }

    #[test]
    fn cap_ack_and_others() {
        let ack = classify(":tmi.twitch.tv CAP * ACK :twitch.tv/tags twitch.tv/commands").unwrap();
        assert_eq!(ack.kind, EventKind::CapAck);
        assert_eq!(ack.message.as_deref(), Some("twitch.tv/tags twitch.tv/commands"));

        let nak = classify(":tmi.twitch.tv CAP * NAK :twitch.tv/foo").unwrap();
        assert_eq!(nak.kind, EventKind::Other);

        let motd = classify(":tmi.twitch.tv 372 bot :You are in a maze").unwrap();
        assert_eq!(motd.kind, EventKind::Other);
        assert_eq!(motd.params, vec!["bot", "You are in a maze"]);

        let unknown = classify(":tmi.twitch.tv 421 bot WHO :Unknown command").unwrap();
        assert_eq!(unknown.kind, EventKind::InvalidCommand);
        assert_eq!(unknown.message.as_deref(), Some("Unknown command"));
    }

    #[test]
    fn missing_params_are_rejected() {
        assert!(classify(":alice!a@a PRIVMSG #test").is_none());
        assert!(classify("PRIVMSG #test :no origin").is_none());
        assert!(classify(":alice!a@a JOIN").is_none());
        assert!(classify(":alice!a@a WHISPER bot").is_none());
        assert!(classify(":tmi.twitch.tv ROOMSTATE").is_none());
    }

    #[test]
    fn synthetic_events_are_empty() {
        let event = Event::synthetic(EventKind::Disconnect);
        assert_eq!(event.command, "DISCONNECT");
        assert!(event.origin.is_none() && event.channel.is_none() && event.message.is_none());
        assert!(event.tags.is_empty() && event.params.is_empty());
    }

    #[test]
    fn only_session_kinds_require_welcome() {
        assert!(EventKind::Join.requires_welcome());
        assert!(EventKind::Whisper.requires_welcome());
        assert!(!EventKind::Welcome.requires_welcome());
        assert!(!EventKind::Ping.requires_welcome());
        assert!(!EventKind::Notice.requires_welcome());
        assert_eq!(EventKind::GlobalIdentity.to_string(), "global-identity");
    }
}
