//! IRCv3 message tags.
//!
//! Twitch attaches a tag string to most messages (`@badges=...;color=#FF0000`).
//! [`TagStore`] keeps the pairs in wire order and tells an absent tag apart
//! from one that is present with an empty value.

use std::fmt;

/// One `key=value` pair. Valueless tags (`@key`) have an empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Ordered tag map attached to a single message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagStore {
    tags: Vec<Tag>,
}

impl TagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an IRCv3 tag string without the leading `@`: `key=value;key2=value2`
    pub fn parse(raw: &str) -> Self {
        let mut store = Self::new();
        for pair in raw.split(';') {
            if pair.is_empty() {
                continue;
            }
            match pair.split_once('=') {
                Some((key, value)) => store.insert(key, &unescape_tag_value(value)),
                None => store.insert(pair, ""),
            };
        }
        store
    }

    /// Look up a tag value.
    ///
    /// `None` means the tag is not present at all; `Some("")` means it was
    /// sent with an empty value (Twitch does this for e.g. `color=` when the
    /// user never picked a color).
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or overwrite a tag, keeping the original position on overwrite.
    /// Returns the previous value, if any.
    pub fn insert(&mut self, key: &str, value: &str) -> Option<String> {
        if let Some(existing) = self.tags.iter_mut().find(|t| t.key == key) {
            return Some(std::mem::replace(&mut existing.value, value.to_string()));
        }
        self.tags.push(Tag {
            key: key.to_string(),
            value: value.to_string(),
        });
        None
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterate `(key, value)` pairs in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|t| (t.key.as_str(), t.value.as_str()))
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for TagStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut store = Self::new();
        for (key, value) in iter {
            store.insert(key.as_ref(), value.as_ref());
        }
        store
    }
}

/// Formats as a wire tag string without the leading `@`.
impl fmt::Display for TagStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                write!(f, ";")?;
            }
            if tag.value.is_empty() {
                write!(f, "{}", tag.key)?;
            } else {
                write!(f, "{}={}", tag.key, escape_tag_value(&tag.value))?;
            }
        }
        Ok(())
    }
}

/// Unescape IRCv3 tag values.
/// `\:` → `;`, `\s` → space, `\\` → `\`, `\r` → CR, `\n` → LF
fn unescape_tag_value(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(':') => result.push(';'),
                Some('s') => result.push(' '),
                Some('\\') => result.push('\\'),
                Some('r') => result.push('\r'),
                Some('n') => result.push('\n'),
                // Unknown escapes drop the backslash
                Some(other) => result.push(other),
                None => {}
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// Escape a value for IRCv3 tag encoding.
fn escape_tag_value(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            ';' => result.push_str("\\:"),
            ' ' => result.push_str("\\s"),
            '\\' => result.push_str("\\\\"),
            '\r' => result.push_str("\\r"),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}
