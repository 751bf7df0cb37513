//! Clients for the external services the site consumes.
//!
//! - [`ChatBackend`]: the remote conversational service behind the widget
//! - [`HttpChatBackend`]: `reqwest` implementation of it
//! - [`RemoteError`]: shared failure type
//!
//! The photo search client used by the gallery lives in [`crate::gallery`].

pub mod error;
pub mod http;

pub use error::RemoteError;
pub use http::HttpChatBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::widget::{LeadSubmission, SessionToken};

/// Conversational backend used by the widget.
#[async_trait]
pub trait ChatBackend: Send + Sync + std::fmt::Debug {
    /// Issue a new session token.
    async fn create_session(&self) -> Result<SessionToken, RemoteError>;

    /// Send user input and return the reply as an HTML fragment.
    async fn send_message(&self, session_id: &str, user_input: &str)
    -> Result<String, RemoteError>;

    /// Tell the backend a session is finished.
    async fn close_session(&self, session_id: &str) -> Result<(), RemoteError>;

    /// Attach contact details to a session.
    async fn submit_lead(&self, lead: &LeadSubmission) -> Result<(), RemoteError>;
}

/// Body of `GET /api/v1/session/create`.
#[derive(Debug, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: Option<String>,
}

/// Body of `POST /api/v1/chat/`.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub session_id: &'a str,
    pub user_input: &'a str,
}

/// Reply of `POST /api/v1/chat/`.
///
/// Deployments differ on the field name; `response_html` wins when both are
/// present.
#[derive(Debug, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub response_html: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
}

impl ChatResponse {
    /// The reply fragment under whichever name the backend used.
    #[must_use]
    pub fn into_html(self) -> Option<String> {
        self.response_html.or(self.response)
    }
}

/// Body of `POST /api/v1/session/close`.
#[derive(Debug, Serialize)]
pub struct CloseSessionRequest<'a> {
    pub session_id: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_field_names() {
        let html: ChatResponse = serde_json::from_str(r#"{"response_html":"<p>a</p>"}"#).unwrap();
        assert_eq!(html.into_html().as_deref(), Some("<p>a</p>"));

        let plain: ChatResponse = serde_json::from_str(r#"{"response":"<p>b</p>"}"#).unwrap();
        assert_eq!(plain.into_html().as_deref(), Some("<p>b</p>"));

        let both: ChatResponse =
            serde_json::from_str(r#"{"response_html":"first","response":"second"}"#).unwrap();
        assert_eq!(both.into_html().as_deref(), Some("first"));

        let neither: ChatResponse = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert_eq!(neither.into_html(), None);
    }
}
