use axum::{
    Form, Router,
    extract::{DefaultBodyLimit, FromRequestParts, Path, Query, Request, State},
    extract::rejection::FormRejection,
    http::{HeaderName, HeaderValue, StatusCode, request::Parts},
    middleware::Next,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::Datelike;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use tower_http::services::ServeDir;
use uuid::Uuid;
use tower_http::trace::TraceLayer;

use tracing::{debug, info, warn};

use crate::AppState;
use crate::config::AppConfig;
use crate::controller::WidgetController;
use crate::gallery::{self, UnsplashSource};
use crate::remote::HttpChatBackend;
use crate::tabs::{DEFAULT_TAB_IDLE_TIMEOUT, TabStore};
use crate::ui;
use crate::widget::{LeadDraft, LeadForm, MountOptions, SpeechResult, SpeechToggle, Widget, WidgetSettings};

/// Header carrying the per-tab id kept in `sessionStorage`.
pub const TAB_ID_HEADER: &str = "x-tab-id";

const MAX_TAB_ID_LEN: usize = 64;

/// Event the static script answers with the notification sound.
const NOTIFY_EVENT: &str = "chat-notify";

const BODY_LIMIT: usize = 64 * 1024;

/// How often idle tabs are swept.
const TAB_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    info!(
        name: "chat.config.loaded",
        base_url = %config.chat.base_url,
        "Chat backend configuration loaded"
    );
    if config.chat.api_key.is_empty() {
        warn!("CHAT_API_KEY is not set; the chat backend will likely reject requests");
    }
    if config.gallery.access_key.is_empty() {
        warn!("UNSPLASH_ACCESS_KEY is not set; the gallery will stay empty");
    }

    let backend = Arc::new(HttpChatBackend::new(&config.chat)?);
    let photos = Arc::new(UnsplashSource::new(
        &config.gallery,
        Duration::from_secs(config.chat.request_timeout_secs),
    )?);

    let tabs = TabStore::new(WidgetSettings::from(&config.widget));
    spawn_tab_sweeper(tabs.clone());

    let state = AppState {
        controller: WidgetController::new(tabs, backend),
        photos,
        config: config.clone(),
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the router: pages, widget fragments and static assets.
pub fn build_router(state: AppState) -> Router {
    // A year-long timeout keeps the layer stack identical when timeouts are off.
    let timeout_duration = if state.config.resilience.timeout_disabled {
        Duration::from_secs(365 * 24 * 60 * 60)
    } else {
        Duration::from_secs(state.config.resilience.request_timeout_secs)
    };

    Router::new()
        .route("/", get(landing_page))
        .route("/gallery", get(gallery_fragment))
        .route("/widget", get(widget_fragment))
        .route("/widget/mount", post(widget_mount))
        .route("/widget/open", post(widget_open))
        .route("/widget/hide", post(widget_hide))
        .route("/widget/send", post(widget_send))
        .route("/widget/suggestion/{id}", post(widget_suggestion))
        .route("/widget/speech", post(widget_speech))
        .route("/widget/speech/result", post(widget_speech_result))
        .route("/widget/speech/dismiss", post(widget_speech_dismiss))
        .route("/widget/resize", post(widget_resize))
        .route("/widget/size", post(widget_size))
        .route("/widget/pane", post(widget_pane))
        .route("/widget/lead", post(widget_lead))
        .nest_service("/static", ServeDir::new(&state.config.server.static_dir))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(timeout_duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .with_state(state)
}

/// Periodically drop tabs nobody has touched for a day.
fn spawn_tab_sweeper(tabs: TabStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TAB_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = tabs.cleanup_idle(DEFAULT_TAB_IDLE_TIMEOUT);
            if removed > 0 {
                info!(name: "tabs.swept", removed, remaining = tabs.len(), "Dropped idle tabs");
            }
        }
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Extractors and forms
// ─────────────────────────────────────────────────────────────────────────────

/// Tab identity from the `X-Tab-Id` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabId(pub String);

impl TabId {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let valid = !raw.is_empty()
            && raw.len() <= MAX_TAB_ID_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| Self(raw.to_string()))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for TabId {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(TAB_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(Self::parse)
            .ok_or_else(|| {
                (
                    StatusCode::BAD_REQUEST,
                    "Missing or invalid X-Tab-Id header".to_string(),
                )
            })
    }
}

/// Field values every widget request carries: the textarea and the lead form.
#[derive(Debug, Default, Deserialize)]
pub struct InputForm {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl InputForm {
    /// Accept requests without a form body (e.g. once the textarea is gone).
    fn from_body(body: Result<Form<Self>, FormRejection>) -> Self {
        body.map(|Form(form)| form).unwrap_or_default()
    }

    /// Copy what the user typed into the widget.
    fn apply(self, widget: &mut Widget) {
        if let Some(message) = self.message {
            widget.set_input(message);
        }
        widget.update_lead_draft(LeadDraft {
            name: self.name,
            email: self.email,
            phone: self.phone,
        });
    }
}

#[derive(Debug, Deserialize)]
pub struct MountForm {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub speech: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResizeForm {
    pub width: u32,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SpeechResultForm {
    pub transcript: String,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LeadSubmitForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Render the tab's widget, flagging fresh replies for the notification sound.
fn widget_response(state: &AppState, tab: &TabId) -> Response {
    let assistant_name = &state.config.widget.assistant_name;
    let (html, notify) = state.controller.update(&tab.0, |widget| {
        let notify = widget.take_notification();
        (
            ui::render_widget(widget, assistant_name, tokio::time::Instant::now()),
            notify,
        )
    });

    let mut response = Html(html).into_response();
    if notify {
        response
            .headers_mut()
            .insert(
                HeaderName::from_static("hx-trigger"),
                HeaderValue::from_static(NOTIFY_EVENT),
            );
    }
    response
}

// ─────────────────────────────────────────────────────────────────────────────
// Page Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET / - Landing page.
async fn landing_page(State(state): State<AppState>) -> impl IntoResponse {
    Html(ui::render_landing_page(
        state.config.gallery.per_page,
        chrono::Utc::now().year(),
        &Uuid::new_v4().to_string(),
    ))
}

/// GET /gallery - Gallery grid, replacing the skeleton.
async fn gallery_fragment(State(state): State<AppState>) -> impl IntoResponse {
    let gallery = gallery::load(state.photos.as_ref(), &state.config.gallery).await;
    Html(ui::render_gallery(&gallery))
}

// ─────────────────────────────────────────────────────────────────────────────
// Widget Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /widget - Current widget (used for polling while a reply is pending).
async fn widget_fragment(
    State(state): State<AppState>,
    tab: TabId,
    Query(input): Query<InputForm>,
) -> Response {
    state.controller.update(&tab.0, |widget| input.apply(widget));
    widget_response(&state, &tab)
}

/// POST /widget/mount - New page load for this tab.
async fn widget_mount(
    State(state): State<AppState>,
    tab: TabId,
    Form(form): Form<MountForm>,
) -> Response {
    state.controller.mount(
        &tab.0,
        MountOptions {
            viewport_width: form.width,
            speech_supported: form.speech,
        },
    );
    widget_response(&state, &tab)
}

/// POST /widget/open
async fn widget_open(
    State(state): State<AppState>,
    tab: TabId,
    body: Result<Form<InputForm>, FormRejection>,
) -> Response {
    let input = InputForm::from_body(body);
    state.controller.update(&tab.0, |widget| input.apply(widget));
    state.controller.open(&tab.0).await;
    widget_response(&state, &tab)
}

/// POST /widget/hide
async fn widget_hide(
    State(state): State<AppState>,
    tab: TabId,
    body: Result<Form<InputForm>, FormRejection>,
) -> Response {
    let input = InputForm::from_body(body);
    state.controller.update(&tab.0, |widget| {
        input.apply(widget);
        widget.hide();
    });
    widget_response(&state, &tab)
}

/// POST /widget/send - Append the message and start the exchange.
async fn widget_send(
    State(state): State<AppState>,
    tab: TabId,
    body: Result<Form<InputForm>, FormRejection>,
) -> Response {
    let mut input = InputForm::from_body(body);
    let message = input.message.take();
    state.controller.update(&tab.0, |widget| input.apply(widget));
    match state.controller.send(&tab.0, message) {
        Ok(_exchange) => debug!(tab_id = %tab.0, "Message sent"),
        Err(reason) => debug!(tab_id = %tab.0, ?reason, "Send rejected"),
    }
    widget_response(&state, &tab)
}

/// POST /widget/suggestion/{id}
async fn widget_suggestion(
    State(state): State<AppState>,
    tab: TabId,
    Path(id): Path<u32>,
    body: Result<Form<InputForm>, FormRejection>,
) -> Response {
    let input = InputForm::from_body(body);
    state.controller.update(&tab.0, |widget| {
        input.apply(widget);
        widget.take_suggestion(id);
    });
    widget_response(&state, &tab)
}

/// POST /widget/speech - Toggle speech input.
async fn widget_speech(
    State(state): State<AppState>,
    tab: TabId,
    body: Result<Form<InputForm>, FormRejection>,
) -> Response {
    let input = InputForm::from_body(body);
    let toggle = state.controller.update(&tab.0, |widget| {
        input.apply(widget);
        widget.toggle_speech()
    });
    if let SpeechToggle::Unsupported(policy) = toggle {
        debug!(tab_id = %tab.0, ?policy, "Speech input unsupported");
    }
    widget_response(&state, &tab)
}

/// POST /widget/speech/result - Recognition result from the browser.
async fn widget_speech_result(
    State(state): State<AppState>,
    tab: TabId,
    Form(form): Form<SpeechResultForm>,
) -> Response {
    let result = SpeechResult {
        transcript: form.transcript,
        is_final: form.is_final,
    };
    let input = InputForm {
        message: form.message,
        name: form.name,
        email: form.email,
        phone: form.phone,
    };
    state.controller.update(&tab.0, |widget| {
        input.apply(widget);
        widget.speech_result(&result);
    });
    widget_response(&state, &tab)
}

/// POST /widget/speech/dismiss
async fn widget_speech_dismiss(
    State(state): State<AppState>,
    tab: TabId,
    body: Result<Form<InputForm>, FormRejection>,
) -> Response {
    let input = InputForm::from_body(body);
    state.controller.update(&tab.0, |widget| {
        input.apply(widget);
        widget.dismiss_speech_notice();
    });
    widget_response(&state, &tab)
}

/// POST /widget/resize - Viewport width changed.
async fn widget_resize(
    State(state): State<AppState>,
    tab: TabId,
    Form(form): Form<ResizeForm>,
) -> Response {
    let input = InputForm {
        message: form.message,
        name: form.name,
        email: form.email,
        phone: form.phone,
    };
    state.controller.update(&tab.0, |widget| {
        input.apply(widget);
        widget.resize(form.width);
    });
    widget_response(&state, &tab)
}

/// POST /widget/size - Compact/expanded toggle.
async fn widget_size(
    State(state): State<AppState>,
    tab: TabId,
    body: Result<Form<InputForm>, FormRejection>,
) -> Response {
    let input = InputForm::from_body(body);
    state.controller.update(&tab.0, |widget| {
        input.apply(widget);
        widget.toggle_size();
    });
    widget_response(&state, &tab)
}

/// POST /widget/pane - Chat/form toggle on mobile.
async fn widget_pane(
    State(state): State<AppState>,
    tab: TabId,
    body: Result<Form<InputForm>, FormRejection>,
) -> Response {
    let input = InputForm::from_body(body);
    state.controller.update(&tab.0, |widget| {
        input.apply(widget);
        widget.toggle_pane();
    });
    widget_response(&state, &tab)
}

/// POST /widget/lead - Submit the lead form.
async fn widget_lead(
    State(state): State<AppState>,
    tab: TabId,
    Form(form): Form<LeadSubmitForm>,
) -> Response {
    if let Some(message) = form.message {
        state
            .controller
            .update(&tab.0, |widget| widget.set_input(message));
    }

    let lead = LeadForm {
        name: form.name,
        email: form.email,
        phone: form.phone,
    };
    if let Err(reason) = state.controller.submit_lead(&tab.0, lead).await {
        debug!(tab_id = %tab.0, ?reason, "Lead rejected");
    }
    widget_response(&state, &tab)
}
