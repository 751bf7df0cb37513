//! `reqwest` client for the remote chat backend.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::{
    ChatBackend, ChatRequest, ChatResponse, CloseSessionRequest, CreateSessionResponse,
    RemoteError,
};
use crate::config::ChatConfig;
use crate::widget::{LeadSubmission, SessionToken};

const API_KEY_HEADER: &str = "X-API-KEY";

const CREATE_SESSION_PATH: &str = "/api/v1/session/create";
const CHAT_PATH: &str = "/api/v1/chat/";
const CLOSE_SESSION_PATH: &str = "/api/v1/session/close";
const LEAD_PATH: &str = "/api/v1/user/update";

/// HTTP implementation of [`ChatBackend`].
#[derive(Clone)]
pub struct HttpChatBackend {
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl std::fmt::Debug for HttpChatBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpChatBackend")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpChatBackend {
    /// Build a client from configuration.
    pub fn new(config: &ChatConfig) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Self::with_client(&config.base_url, &config.api_key, http)
    }

    /// Build a client around an existing `reqwest::Client`.
    pub fn with_client(
        base_url: &str,
        api_key: impl Into<String>,
        http: reqwest::Client,
    ) -> Result<Self, RemoteError> {
        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            api_key: api_key.into(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, RemoteError> {
        Ok(self.base_url.join(path)?)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".into());
        Err(RemoteError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn create_session(&self) -> Result<SessionToken, RemoteError> {
        let response = self
            .http
            .get(self.url(CREATE_SESSION_PATH)?)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        let body: CreateSessionResponse = Self::check(response).await?.json().await?;

        body.session_id
            .filter(|id| !id.is_empty())
            .map(SessionToken::new)
            .ok_or(RemoteError::MissingField("session_id"))
    }

    async fn send_message(
        &self,
        session_id: &str,
        user_input: &str,
    ) -> Result<String, RemoteError> {
        let response = self
            .http
            .post(self.url(CHAT_PATH)?)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&ChatRequest {
                session_id,
                user_input,
            })
            .send()
            .await?;
        let body: ChatResponse = Self::check(response).await?.json().await?;

        body.into_html()
            .ok_or(RemoteError::MissingField("response_html"))
    }

    async fn close_session(&self, session_id: &str) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(self.url(CLOSE_SESSION_PATH)?)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&CloseSessionRequest { session_id })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn submit_lead(&self, lead: &LeadSubmission) -> Result<(), RemoteError> {
        let response = self
            .http
            .post(self.url(LEAD_PATH)?)
            .header(API_KEY_HEADER, &self.api_key)
            .json(lead)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
