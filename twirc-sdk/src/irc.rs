//! IRC message types.
//! This is a minimal parser/formatter for Twitch IRC protocol lines.
//!
//! Supports IRCv3 message tags: `@key=value;key2=value2 :prefix COMMAND params`

use std::fmt;

use crate::tags::TagStore;

/// A parsed IRC message with optional IRCv3 tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub tags: TagStore,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl Message {
    /// Parse a raw IRC line, including optional message tags.
    ///
    /// Returns `None` for empty lines and lines that stop before the command.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() {
            return None;
        }

        let mut rest = line;

        // Parse tags: @key=value;key2=value2
        let tags = if let Some(tagged) = rest.strip_prefix('@') {
            let end = tagged.find(' ')?;
            let tags = TagStore::parse(&tagged[..end]);
            rest = tagged[end..].trim_start_matches(' ');
            tags
        } else {
            TagStore::new()
        };

        // Parse prefix: :tmi.twitch.tv or :nick!user@host
        let prefix = if let Some(prefixed) = rest.strip_prefix(':') {
            let end = prefixed.find(' ')?;
            let pfx = prefixed[..end].to_string();
            rest = prefixed[end..].trim_start_matches(' ');
            Some(pfx)
        } else {
            None
        };

        let mut params = Vec::new();
        let command;

        if let Some(space) = rest.find(' ') {
            command = rest[..space].to_ascii_uppercase();
            rest = &rest[space + 1..];

            while !rest.is_empty() {
                if let Some(trailing) = rest.strip_prefix(':') {
                    params.push(trailing.to_string());
                    break;
                }
                if let Some(space) = rest.find(' ') {
                    if space > 0 {
                        params.push(rest[..space].to_string());
                    }
                    rest = &rest[space + 1..];
                } else {
                    params.push(rest.to_string());
                    break;
                }
            }
        } else {
            command = rest.to_ascii_uppercase();
        }

        if command.is_empty() {
            return None;
        }

        Some(Message {
            tags,
            prefix,
            command,
            params,
        })
    }

    pub fn new(command: &str, params: Vec<&str>) -> Self {
        Self {
            tags: TagStore::new(),
            prefix: None,
            command: command.to_string(),
            params: params.into_iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Nick part of a `nick!user@host` prefix, or the whole prefix for
    /// server prefixes.
    pub fn nick(&self) -> Option<&str> {
        self.prefix
            .as_deref()
            .and_then(|p| p.split('!').next())
            .filter(|n| !n.is_empty())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.tags.is_empty() {
            write!(f, "@{} ", self.tags)?;
        }
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{prefix} ")?;
        }
        write!(f, "{}", self.command)?;
        for (i, param) in self.params.iter().enumerate() {
            if i == self.params.len() - 1
                && (param.contains(' ') || param.starts_with(':') || param.is_empty())
            {
                write!(f, " :{param}")?;
            } else {
                write!(f, " {param}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple() {
        let msg = Message::parse("PING :tmi.twitch.tv").unwrap();
        assert!(msg.tags.is_empty());
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.params, vec!["tmi.twitch.tv"]);
    }

    #[test]
    fn parse_twitch_privmsg() {
        let msg = Message::parse(
            "@badge-info=;color=#FF0000;display-name=Alice :alice!alice@alice.tmi.twitch.tv PRIVMSG #test :hello there\r\n",
        )
        .unwrap();
        assert_eq!(msg.tags.get("color"), Some("#FF0000"));
        assert_eq!(msg.tags.get("badge-info"), Some(""));
        assert_eq!(msg.prefix.as_deref(), Some("alice!alice@alice.tmi.twitch.tv"));
        assert_eq!(msg.nick(), Some("alice"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#test", "hello there"]);
    }

    #[test]
    fn parse_with_prefix_no_tags() {
        let msg = Message::parse(":tmi.twitch.tv 001 bot :Welcome, GLHF!").unwrap();
        assert!(msg.tags.is_empty());
        assert_eq!(msg.nick(), Some("tmi.twitch.tv"));
        assert_eq!(msg.command, "001");
        assert_eq!(msg.params, vec!["bot", "Welcome, GLHF!"]);
    }

    #[test]
    fn parse_command_only() {
        let msg = Message::parse(":tmi.twitch.tv RECONNECT").unwrap();
        assert_eq!(msg.command, "RECONNECT");
        assert!(msg.params.is_empty());
    }

    #[test]
    fn parse_lowercase_command_is_normalized() {
        let msg = Message::parse("privmsg #a :b").unwrap();
        assert_eq!(msg.command, "PRIVMSG");
    }

    #[test]
    fn parse_collapses_repeated_spaces() {
        let msg = Message::parse(":a!a@a  JOIN  #chan").unwrap();
        assert_eq!(msg.command, "JOIN");
        assert_eq!(msg.params, vec!["#chan"]);
    }

    #[test]
    fn parse_rejects_truncated_lines() {
        assert!(Message::parse("").is_none());
        assert!(Message::parse("\r\n").is_none());
        assert!(Message::parse("@color=#fff").is_none());
        assert!(Message::parse(":prefix-only").is_none());
        assert!(Message::parse("@a=b :prefix").is_none());
    }

    #[test]
    fn format_command() {
        let msg = Message::new("PRIVMSG", vec!["#chan", "check this out"]);
        assert_eq!(msg.to_string(), "PRIVMSG #chan :check this out");

        let msg = Message::new("JOIN", vec!["#chan"]);
        assert_eq!(msg.to_string(), "JOIN #chan");
    }

    #[test]
    fn format_with_tags() {
        let mut msg = Message::new("PRIVMSG", vec!["#chan", "reply text"]);
        msg.tags.insert("reply-parent-msg-id", "b34ccfc7");
        assert_eq!(
            msg.to_string(),
            "@reply-parent-msg-id=b34ccfc7 PRIVMSG #chan :reply text"
        );
    }
}
