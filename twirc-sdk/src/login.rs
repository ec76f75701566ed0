//! Login identity of a session.

/// Who we are logged in as.
///
/// `nick` and `pass` are set when connecting. `display_name` and `user_id`
/// stay `None` until the server sends `GLOBALUSERSTATE` after login, so
/// handlers should always read them through [`crate::Client::login`] instead
/// of caching them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Login {
    pub(crate) nick: Option<String>,
    pub(crate) pass: Option<String>,
    pub(crate) display_name: Option<String>,
    pub(crate) user_id: Option<String>,
}

impl Login {
    pub(crate) fn new(nick: &str, pass: Option<&str>) -> Self {
        Self {
            nick: Some(nick.to_string()),
            pass: pass.map(normalize_token),
            display_name: None,
            user_id: None,
        }
    }

    /// Requested nick.
    pub fn nick(&self) -> Option<&str> {
        self.nick.as_deref()
    }

    /// OAuth credential sent as `PASS`, always prefixed with `oauth:`.
    pub fn pass(&self) -> Option<&str> {
        self.pass.as_deref()
    }

    /// Display name from `GLOBALUSERSTATE`.
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Numeric Twitch user id from `GLOBALUSERSTATE`.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Read-only session without credentials.
    pub fn is_anonymous(&self) -> bool {
        self.pass.is_none()
    }

    /// Fill in identity fields from `GLOBALUSERSTATE` tags. Empty tag values
    /// leave the field untouched.
    pub(crate) fn update_identity(&mut self, display_name: Option<&str>, user_id: Option<&str>) {
        if let Some(name) = display_name.filter(|v| !v.is_empty()) {
            self.display_name = Some(name.to_string());
        }
        if let Some(id) = user_id.filter(|v| !v.is_empty()) {
            self.user_id = Some(id.to_string());
        }
    }
}

/// Twitch expects `oauth:<token>`; token files and the Twitch CLI often
/// hand out the bare token.
fn normalize_token(token: &str) -> String {
    let token = token.trim();
    if token.starts_with("oauth:") {
        token.to_string()
    } else {
        format!("oauth:{token}")
    }
}
