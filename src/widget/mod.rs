//! Chat widget state machine.
//!
//! A [`Widget`] is one mount of the floating chat overlay in one browser tab.
//! It is purely synchronous: operations that need the remote service return a
//! pending request, and the caller feeds the outcome back in. Nothing here
//! awaits, so the widget can sit behind a plain mutex.
//!
//! # Session lifecycle
//!
//! ```text
//! Closed ──open──▶ Creating ──created──▶ Open ──inactivity──▶ Expired
//!                     │                   ▲
//!                     └──failed (degraded)┘
//! ```
//!
//! # Modules
//!
//! - [`messages`]: append-only history
//! - [`session`]: session token, activity clock and tab storage
//! - [`speech`]: speech-to-text capability
//! - [`lead`]: lead capture form
//! - [`layout`]: viewport-driven layout
//! - [`sanitize`]: allow-list sanitiser for assistant replies

pub mod layout;
pub mod lead;
pub mod messages;
pub mod sanitize;
pub mod session;
pub mod speech;

use std::time::Duration;

use tokio::time::Instant;

pub use layout::{Layout, Pane};
pub use lead::{BannerKind, LeadDraft, LeadForm, LeadPanel, LeadRejected, LeadSubmission};
pub use messages::{ChatMessage, MessageLog, Sender};
pub use session::{SessionContext, SessionPhase, SessionToken, TabStorage};
pub use speech::{
    BrowserSpeech, NoopSpeech, SpeechCapability, SpeechResult, SpeechToggle,
    UnsupportedSpeechPolicy,
};

use crate::config::WidgetConfig;

/// Shown in place of a reply when the backend cannot be reached.
pub const FALLBACK_REPLY: &str = "Sorry, unable to connect right now. Please try again!";

/// Quick replies offered with the greeting.
pub const DEFAULT_SUGGESTIONS: [&str; 4] = [
    "Digital Marketing",
    "Creative Solutions",
    "Print/Radio Advertising",
    "Web Design/Tech Solutions",
];

/// Width assumed until the browser reports one.
const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;

/// Timing and policy knobs for a widget.
#[derive(Debug, Clone)]
pub struct WidgetSettings {
    pub session_timeout: Duration,
    pub banner_window: Duration,
    pub mobile_breakpoint: u32,
    pub unsupported_speech: UnsupportedSpeechPolicy,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(15 * 60),
            banner_window: Duration::from_secs(3),
            mobile_breakpoint: 786,
            unsupported_speech: UnsupportedSpeechPolicy::default(),
        }
    }
}

impl From<&WidgetConfig> for WidgetSettings {
    fn from(config: &WidgetConfig) -> Self {
        Self {
            session_timeout: config.session_timeout(),
            banner_window: config.banner_window(),
            mobile_breakpoint: config.mobile_breakpoint,
            unsupported_speech: config.unsupported_speech,
        }
    }
}

/// What the browser told us when the widget mounted.
#[derive(Debug, Clone, Copy, Default)]
pub struct MountOptions {
    pub viewport_width: Option<u32>,
    pub speech_supported: bool,
}

/// A quick-reply chip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub id: u32,
    pub text: String,
}

/// Remote work requested by [`Widget::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenAction {
    /// No usable token: ask the backend for one.
    CreateSession,
    /// Stored token reused; arm the inactivity timer for this deadline.
    Resume { deadline: Instant },
    /// Stored token outlived the inactivity window while unmounted.
    Expired { token: SessionToken },
    /// Nothing to do besides showing the overlay.
    Shown,
}

/// A send accepted by the widget, waiting for the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingExchange {
    pub generation: u64,
    pub session_id: String,
    pub user_input: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejected {
    /// Input was empty after trimming.
    Empty,
    /// Session expired; the input surface is gone.
    Expired,
    /// No session phase that accepts input yet.
    NotOpen,
}

/// Backend outcome for a [`PendingExchange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Html(String),
    Failed,
}

/// Result of applying a [`Reply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// Reply appended; the inactivity timer should be re-armed if a deadline is given.
    Replied { deadline: Option<Instant> },
    /// Fallback message appended.
    Failed,
}

/// A lead submission accepted by the widget, waiting for the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLead {
    pub generation: u64,
    pub submission: LeadSubmission,
}

/// One mount of the chat overlay.
#[derive(Debug)]
pub struct Widget {
    generation: u64,
    storage: TabStorage,
    settings: WidgetSettings,
    visible: bool,
    phase: SessionPhase,
    messages: MessageLog,
    input: String,
    in_flight: u32,
    speech: Box<dyn SpeechCapability>,
    speech_notice: bool,
    suggestions: Vec<Suggestion>,
    layout: Layout,
    pane: Pane,
    lead: LeadPanel,
    notify: bool,
}

impl Widget {
    /// Mount a fresh widget over existing tab storage.
    #[must_use]
    pub fn mount(
        storage: TabStorage,
        settings: WidgetSettings,
        generation: u64,
        options: MountOptions,
    ) -> Self {
        let width = options.viewport_width.unwrap_or(DEFAULT_VIEWPORT_WIDTH);
        let layout = Layout::for_width(width, settings.mobile_breakpoint);
        let suggestions = DEFAULT_SUGGESTIONS
            .iter()
            .zip(1..)
            .map(|(text, id)| Suggestion {
                id,
                text: (*text).to_string(),
            })
            .collect();

        Self {
            generation,
            storage,
            settings,
            visible: false,
            phase: SessionPhase::Closed,
            messages: MessageLog::new(),
            input: String::new(),
            in_flight: 0,
            speech: speech::capability_for(options.speech_supported),
            speech_notice: false,
            suggestions,
            layout,
            pane: Pane::default(),
            lead: LeadPanel::new(),
            notify: false,
        }
    }

    /// Replace this mount with a fresh one over the same tab storage.
    ///
    /// Bumps the generation so late results for the old mount are dropped.
    pub fn remount(&mut self, options: MountOptions) {
        self.speech.stop();
        let storage = std::mem::take(&mut self.storage);
        let settings = self.settings.clone();
        *self = Self::mount(storage, settings, self.generation + 1, options);
    }

    /// Tear down this mount, handing back the tab storage.
    #[must_use]
    pub fn into_storage(mut self) -> TabStorage {
        self.speech.stop();
        self.storage
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Show the overlay, deciding whether a session must be created.
    pub fn open(&mut self, now: Instant) -> OpenAction {
        self.visible = true;

        match self.phase {
            SessionPhase::Creating | SessionPhase::Expired => OpenAction::Shown,
            SessionPhase::Open if self.storage.session().is_some() => OpenAction::Shown,
            SessionPhase::Closed | SessionPhase::Open => {
                let timeout = self.settings.session_timeout;
                match self.storage.session() {
                    Some(ctx) if ctx.is_expired(now, timeout) => {
                        let token = ctx.token().clone();
                        self.storage.clear_session();
                        self.phase = SessionPhase::Expired;
                        OpenAction::Expired { token }
                    }
                    Some(ctx) => {
                        self.phase = SessionPhase::Open;
                        OpenAction::Resume {
                            deadline: ctx.expires_at(timeout),
                        }
                    }
                    None => {
                        self.phase = SessionPhase::Creating;
                        OpenAction::CreateSession
                    }
                }
            }
        }
    }

    /// Hide the overlay. The session is left untouched.
    pub fn hide(&mut self) {
        self.visible = false;
    }

    /// Store a newly issued token. Returns the inactivity deadline to arm.
    pub fn session_created(
        &mut self,
        generation: u64,
        token: SessionToken,
        now: Instant,
    ) -> Option<Instant> {
        if generation != self.generation || self.phase != SessionPhase::Creating {
            return None;
        }
        let context = SessionContext::new(token, now);
        let deadline = context.expires_at(self.settings.session_timeout);
        self.storage.store_session(context);
        self.phase = SessionPhase::Open;
        Some(deadline)
    }

    /// Session creation failed: stay open without a token.
    pub fn session_failed(&mut self, generation: u64) {
        if generation == self.generation && self.phase == SessionPhase::Creating {
            self.phase = SessionPhase::Open;
        }
    }

    /// Expire the session if its inactivity window really elapsed.
    ///
    /// The token leaves tab storage, so the next mount starts a new session.
    /// Returns it so the caller can notify the backend.
    pub fn expire(&mut self, generation: u64, now: Instant) -> Option<SessionToken> {
        if generation != self.generation || self.phase != SessionPhase::Open {
            return None;
        }
        let ctx = self.storage.session()?;
        if !ctx.is_expired(now, self.settings.session_timeout) {
            return None;
        }
        let token = self.storage.clear_session()?.token().clone();
        self.phase = SessionPhase::Expired;
        self.speech.stop();
        Some(token)
    }

    /// Current inactivity deadline, if a live session exists.
    #[must_use]
    pub fn expiry_deadline(&self) -> Option<Instant> {
        if self.phase != SessionPhase::Open {
            return None;
        }
        self.storage
            .session()
            .map(|ctx| ctx.expires_at(self.settings.session_timeout))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Message exchange
    // ─────────────────────────────────────────────────────────────────────

    /// Replace the input buffer with what the user typed.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Put a quick reply into the input buffer and retire it.
    pub fn take_suggestion(&mut self, id: u32) -> bool {
        let Some(index) = self.suggestions.iter().position(|s| s.id == id) else {
            return false;
        };
        let suggestion = self.suggestions.remove(index);
        self.input = suggestion.text;
        true
    }

    /// Optimistically append the user's message and hand back the request.
    pub fn begin_send(&mut self) -> Result<PendingExchange, SendRejected> {
        match self.phase {
            SessionPhase::Expired => return Err(SendRejected::Expired),
            SessionPhase::Closed | SessionPhase::Creating => return Err(SendRejected::NotOpen),
            SessionPhase::Open => {}
        }

        let text = self.input.trim();
        if text.is_empty() {
            return Err(SendRejected::Empty);
        }
        let user_input = text.to_string();

        self.messages.push(Sender::User, user_input.clone());
        self.input.clear();
        self.in_flight += 1;

        Ok(PendingExchange {
            generation: self.generation,
            session_id: self.session_id().to_string(),
            user_input,
        })
    }

    /// Apply the backend's answer to an earlier send.
    ///
    /// Returns `None` when the widget was remounted in the meantime.
    pub fn complete_send(
        &mut self,
        generation: u64,
        reply: Reply,
        now: Instant,
    ) -> Option<ExchangeOutcome> {
        if generation != self.generation {
            return None;
        }
        self.in_flight = self.in_flight.saturating_sub(1);
        self.notify = true;

        match reply {
            Reply::Html(html) => {
                self.messages
                    .push(Sender::Assistant, sanitize::sanitize_fragment(&html));
                let timeout = self.settings.session_timeout;
                let deadline = if self.phase == SessionPhase::Open {
                    self.storage.session_mut().map(|ctx| {
                        ctx.touch(now);
                        ctx.expires_at(timeout)
                    })
                } else {
                    None
                };
                Some(ExchangeOutcome::Replied { deadline })
            }
            Reply::Failed => {
                self.messages.push(Sender::Assistant, FALLBACK_REPLY);
                Some(ExchangeOutcome::Failed)
            }
        }
    }

    /// Whether a reply arrived since the last call. Clears the flag.
    pub fn take_notification(&mut self) -> bool {
        std::mem::take(&mut self.notify)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Speech input
    // ─────────────────────────────────────────────────────────────────────

    pub fn toggle_speech(&mut self) -> SpeechToggle {
        if !self.speech.is_supported() {
            let policy = self.settings.unsupported_speech;
            self.speech_notice = policy == UnsupportedSpeechPolicy::Alert;
            return SpeechToggle::Unsupported(policy);
        }
        if self.speech.is_listening() {
            self.speech.stop();
            SpeechToggle::Stopped
        } else {
            self.speech.start();
            SpeechToggle::Started
        }
    }

    /// Feed a recognition result. Only final results reach the input.
    pub fn speech_result(&mut self, result: &SpeechResult) -> bool {
        if !self.speech.is_listening() || !result.is_final {
            return false;
        }
        let transcript = result.transcript.trim();
        if transcript.is_empty() {
            return false;
        }
        if self.input.is_empty() {
            self.input = transcript.to_string();
        } else {
            self.input.push(' ');
            self.input.push_str(transcript);
        }
        true
    }

    /// Dismiss the unsupported-speech notice.
    pub fn dismiss_speech_notice(&mut self) {
        self.speech_notice = false;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Layout
    // ─────────────────────────────────────────────────────────────────────

    pub fn resize(&mut self, width: u32) {
        self.layout = Layout::for_width(width, self.settings.mobile_breakpoint);
    }

    pub fn toggle_size(&mut self) {
        self.layout = self.layout.toggled();
    }

    /// Switch between chat and form. Only meaningful on mobile.
    pub fn toggle_pane(&mut self) {
        if self.layout.is_mobile() {
            self.pane = self.pane.toggled();
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lead capture
    // ─────────────────────────────────────────────────────────────────────

    /// Remember partially typed contact details.
    pub fn update_lead_draft(&mut self, draft: LeadDraft) {
        if !self.storage.lead_generated() {
            self.lead.merge_draft(draft);
        }
    }

    pub fn begin_lead(&mut self, form: LeadForm) -> Result<PendingLead, LeadRejected> {
        if self.storage.lead_generated() {
            return Err(LeadRejected::AlreadyGenerated);
        }
        self.lead.merge_draft(LeadDraft {
            name: Some(form.name.clone()),
            email: Some(form.email.clone()),
            phone: Some(form.phone.clone()),
        });
        if self.lead.is_submitting() {
            return Err(LeadRejected::InFlight);
        }
        let missing = form.missing_fields();
        if !missing.is_empty() {
            return Err(LeadRejected::MissingFields(missing));
        }

        self.lead.set_submitting(true);
        Ok(PendingLead {
            generation: self.generation,
            submission: LeadSubmission {
                name: form.name.trim().to_string(),
                email: form.email.trim().to_string(),
                phone: form.phone.trim().to_string(),
                session_id: self.session_id().to_string(),
            },
        })
    }

    /// Record the backend's answer to a lead submission.
    pub fn complete_lead(&mut self, generation: u64, accepted: bool, now: Instant) -> bool {
        if generation != self.generation {
            return false;
        }
        self.lead.set_submitting(false);
        if accepted {
            self.storage.mark_lead_generated();
            self.lead.clear_draft();
            self.lead.show_banner(BannerKind::Success, now);
        } else {
            self.lead.show_banner(BannerKind::Error, now);
        }
        true
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read-only view
    // ─────────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn settings(&self) -> &WidgetSettings {
        &self.settings
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Token sent to the backend; empty in degraded mode.
    #[must_use]
    pub fn session_id(&self) -> &str {
        self.storage
            .session()
            .map_or("", |ctx| ctx.token().as_str())
    }

    #[must_use]
    pub fn storage(&self) -> &TabStorage {
        &self.storage
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        self.messages.as_slice()
    }

    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }

    #[must_use]
    pub fn shows_greeting(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn suggestions(&self) -> &[Suggestion] {
        &self.suggestions
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.speech.is_listening()
    }

    #[must_use]
    pub fn speech_supported(&self) -> bool {
        self.speech.is_supported()
    }

    #[must_use]
    pub fn speech_notice(&self) -> bool {
        self.speech_notice
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    #[must_use]
    pub fn pane(&self) -> Pane {
        self.pane
    }

    /// Whether the lead form is offered at all in this tab.
    #[must_use]
    pub fn lead_form_available(&self) -> bool {
        !self.storage.lead_generated()
    }

    #[must_use]
    pub fn lead_draft(&self) -> &LeadForm {
        self.lead.draft()
    }

    #[must_use]
    pub fn lead_submitting(&self) -> bool {
        self.lead.is_submitting()
    }

    #[must_use]
    pub fn lead_banner(&self, now: Instant) -> Option<BannerKind> {
        self.lead.banner(now, self.settings.banner_window)
    }
}
