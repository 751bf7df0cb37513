//! Remote session token and the tab-scoped storage that carries it.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Lifecycle of the widget's remote session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Widget never opened in this mount.
    Closed,
    /// Waiting for the remote service to issue a token.
    Creating,
    /// Chatting; a token may be missing if creation failed (degraded).
    Open,
    /// Inactivity window elapsed. Terminal for the token.
    Expired,
}

/// Opaque token issued by the chat backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A live session and its activity clock.
#[derive(Debug, Clone)]
pub struct SessionContext {
    token: SessionToken,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    last_activity: Instant,
}

impl SessionContext {
    #[must_use]
    pub fn new(token: SessionToken, now: Instant) -> Self {
        let wall = Utc::now();
        Self {
            token,
            created_at: wall,
            last_activity_at: wall,
            last_activity: now,
        }
    }

    #[must_use]
    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    /// Record activity, pushing the expiry deadline forward.
    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
        self.last_activity_at = Utc::now();
    }

    #[must_use]
    pub fn expires_at(&self, timeout: Duration) -> Instant {
        self.last_activity + timeout
    }

    #[must_use]
    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now >= self.expires_at(timeout)
    }
}

/// Per-tab state that survives a remount of the widget.
///
/// Holds at most one session, so a tab can never carry two tokens.
#[derive(Debug, Default, Clone)]
pub struct TabStorage {
    session: Option<SessionContext>,
    lead_generated: bool,
}

impl TabStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn session(&self) -> Option<&SessionContext> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut SessionContext> {
        self.session.as_mut()
    }

    /// Store a freshly issued token, replacing any previous one.
    pub fn store_session(&mut self, context: SessionContext) {
        self.session = Some(context);
    }

    /// Forget the stored session, handing back what was there.
    pub fn clear_session(&mut self) -> Option<SessionContext> {
        self.session.take()
    }

    #[must_use]
    pub fn lead_generated(&self) -> bool {
        self.lead_generated
    }

    pub fn mark_lead_generated(&mut self) {
        self.lead_generated = true;
    }
}
