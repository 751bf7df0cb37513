//! Drives widgets against the remote chat backend.
//!
//! The [`Widget`] state machine never awaits. This controller locks a tab,
//! asks the widget what to do, releases the lock, performs the remote call and
//! feeds the result back under the lock again. Inactivity timers are tokio
//! tasks owned by the tab entry.

use std::sync::{Arc, Weak};

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::remote::ChatBackend;
use crate::tabs::{Tab, TabHandle, TabStore, lock_tab};
use crate::widget::{
    ExchangeOutcome, LeadForm, LeadRejected, MountOptions, OpenAction, Reply, SendRejected,
    SessionToken, Widget,
};

/// Shared entry point for every widget operation.
#[derive(Debug, Clone)]
pub struct WidgetController {
    tabs: TabStore,
    backend: Arc<dyn ChatBackend>,
}

impl WidgetController {
    #[must_use]
    pub fn new(tabs: TabStore, backend: Arc<dyn ChatBackend>) -> Self {
        Self { tabs, backend }
    }

    #[must_use]
    pub fn tabs(&self) -> &TabStore {
        &self.tabs
    }

    /// Run `f` against the tab's widget under its lock.
    pub fn update<R>(&self, tab_id: &str, f: impl FnOnce(&mut Widget) -> R) -> R {
        let handle = self.tabs.get_or_create(tab_id);
        let mut tab = lock_tab(&handle);
        f(&mut tab.widget)
    }

    /// Read-only variant of [`Self::update`].
    pub fn view<R>(&self, tab_id: &str, f: impl FnOnce(&Widget) -> R) -> R {
        let handle = self.tabs.get_or_create(tab_id);
        let tab = lock_tab(&handle);
        f(&tab.widget)
    }

    /// Start a new mount for a page load, keeping only the tab storage.
    pub fn mount(&self, tab_id: &str, options: MountOptions) {
        let handle = self.tabs.get_or_create(tab_id);
        let mut tab = lock_tab(&handle);
        tab.cancel_expiry_timer();
        tab.widget.remount(options);
        debug!(tab_id, generation = tab.widget.generation(), "Widget mounted");
    }

    /// Show the overlay, creating or resuming the session as needed.
    pub async fn open(&self, tab_id: &str) {
        let handle = self.tabs.get_or_create(tab_id);

        let (action, generation) = {
            let mut tab = lock_tab(&handle);
            let action = tab.widget.open(Instant::now());
            let generation = tab.widget.generation();
            if let OpenAction::Resume { deadline } = action {
                debug!(tab_id, "Resuming stored session");
                self.arm_expiry(&handle, &mut tab, generation, deadline);
            }
            (action, generation)
        };

        match action {
            OpenAction::CreateSession => {
                if let Err(e) = self.spawn_create(&handle, generation).await {
                    warn!(name: "session.create.failed", tab_id, error = %e, "Session creation task failed");
                }
            }
            OpenAction::Expired { token } => {
                info!(name: "session.expired", tab_id, session_id = %token, "Stored session already expired");
                self.spawn_close(token);
            }
            OpenAction::Resume { .. } | OpenAction::Shown => {}
        }
    }

    /// Send the input buffer.
    ///
    /// The user's message is appended before this returns; the exchange
    /// itself runs in the background and the returned handle resolves once
    /// the reply has been applied (`None` if the widget was remounted).
    pub fn send(
        &self,
        tab_id: &str,
        input: Option<String>,
    ) -> Result<JoinHandle<Option<ExchangeOutcome>>, SendRejected> {
        let handle = self.tabs.get_or_create(tab_id);
        let pending = {
            let mut tab = lock_tab(&handle);
            if let Some(input) = input {
                tab.widget.set_input(input);
            }
            tab.widget.begin_send()?
        };

        let controller = self.clone();
        let weak = Arc::downgrade(&handle);
        let tab_id = tab_id.to_string();
        Ok(tokio::spawn(async move {
            let reply = match controller
                .backend
                .send_message(&pending.session_id, &pending.user_input)
                .await
            {
                Ok(html) => Reply::Html(html),
                Err(e) => {
                    warn!(name: "chat.exchange.failed", tab_id = %tab_id, error = %e, "Error sending message");
                    Reply::Failed
                }
            };

            let handle = weak.upgrade()?;
            let mut tab = lock_tab(&handle);
            let outcome = tab
                .widget
                .complete_send(pending.generation, reply, Instant::now());
            match outcome {
                Some(ExchangeOutcome::Replied {
                    deadline: Some(deadline),
                }) => controller.arm_expiry(&handle, &mut tab, pending.generation, deadline),
                None => debug!(tab_id = %tab_id, "Dropped reply for a previous mount"),
                _ => {}
            }
            outcome
        }))
    }

    /// Submit the lead form. Returns whether the backend accepted it.
    ///
    /// The submission runs in its own task, so the form leaves the
    /// submitting state even if the caller is dropped.
    pub async fn submit_lead(&self, tab_id: &str, form: LeadForm) -> Result<bool, LeadRejected> {
        let handle = self.tabs.get_or_create(tab_id);
        let pending = lock_tab(&handle).widget.begin_lead(form)?;

        let backend = Arc::clone(&self.backend);
        let weak = Arc::downgrade(&handle);
        let task_tab_id = tab_id.to_string();
        let submission = tokio::spawn(async move {
            let accepted = match backend.submit_lead(&pending.submission).await {
                Ok(()) => {
                    info!(name: "lead.submitted", tab_id = %task_tab_id, "Lead submitted");
                    true
                }
                Err(e) => {
                    warn!(name: "lead.submit.failed", tab_id = %task_tab_id, error = %e, "Error submitting lead");
                    false
                }
            };
            if let Some(handle) = weak.upgrade() {
                lock_tab(&handle)
                    .widget
                    .complete_lead(pending.generation, accepted, Instant::now());
            }
            accepted
        });

        Ok(submission.await.unwrap_or_else(|e| {
            warn!(name: "lead.submit.failed", tab_id, error = %e, "Lead submission task failed");
            false
        }))
    }

    /// Create a session for `generation` in a task that owns the outcome.
    ///
    /// Dropping the returned handle does not cancel the task, so the widget
    /// always leaves `Creating`.
    fn spawn_create(&self, handle: &TabHandle, generation: u64) -> JoinHandle<()> {
        let controller = self.clone();
        let weak = Arc::downgrade(handle);
        tokio::spawn(async move {
            let result = controller.backend.create_session().await;
            let Some(handle) = weak.upgrade() else {
                return;
            };
            let mut tab = lock_tab(&handle);
            match result {
                Ok(token) => {
                    info!(name: "session.created", tab_id = %tab.id(), session_id = %token, "Chat session created");
                    if let Some(deadline) =
                        tab.widget.session_created(generation, token, Instant::now())
                    {
                        controller.arm_expiry(&handle, &mut tab, generation, deadline);
                    }
                }
                Err(e) => {
                    warn!(name: "session.create.failed", tab_id = %tab.id(), error = %e, "Error creating session");
                    tab.widget.session_failed(generation);
                }
            }
        })
    }

    /// (Re)arm the tab's inactivity timer.
    fn arm_expiry(&self, handle: &TabHandle, tab: &mut Tab, generation: u64, deadline: Instant) {
        let weak: Weak<_> = Arc::downgrade(handle);
        let controller = self.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let Some(handle) = weak.upgrade() else {
                return;
            };
            let expired = {
                let mut tab = lock_tab(&handle);
                let token = tab.widget.expire(generation, Instant::now());
                token.map(|token| (tab.id().to_string(), token))
            };
            if let Some((tab_id, token)) = expired {
                info!(name: "session.expired", tab_id = %tab_id, session_id = %token, "Chat session expired");
                controller.spawn_close(token);
            }
        });
        tab.set_expiry_timer(timer.abort_handle());
    }

    /// Best-effort close notification, detached from the tab's timer.
    fn spawn_close(&self, token: SessionToken) {
        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            match backend.close_session(token.as_str()).await {
                Ok(()) => debug!(session_id = %token, "Session closed"),
                Err(e) => {
                    warn!(name: "session.close.failed", session_id = %token, error = %e, "Error closing session");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::remote::RemoteError;
    use crate::widget::{
        FALLBACK_REPLY, LeadSubmission, SessionPhase, Sender, WidgetSettings,
    };

    /// Records every call and answers from canned values.
    #[derive(Debug, Default)]
    struct FakeBackend {
        token: Option<&'static str>,
        reply: Option<&'static str>,
        /// Latency of session creation and lead submission.
        delay: Duration,
        calls: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        fn healthy() -> Self {
            Self {
                token: Some("abc123"),
                reply: Some("<p>Hi there</p>"),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        async fn lag(&self) {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        fn unavailable() -> RemoteError {
            RemoteError::Status {
                status: 503,
                body: "down".into(),
            }
        }
    }

    #[async_trait]
    impl ChatBackend for FakeBackend {
        async fn create_session(&self) -> Result<SessionToken, RemoteError> {
            self.record("create".into());
            self.lag().await;
            self.token
                .map(SessionToken::new)
                .ok_or_else(Self::unavailable)
        }

        async fn send_message(&self, session_id: &str, user_input: &str) -> Result<String, RemoteError> {
            self.record(format!("send:{session_id}:{user_input}"));
            self.reply.map(str::to_string).ok_or_else(Self::unavailable)
        }

        async fn close_session(&self, session_id: &str) -> Result<(), RemoteError> {
            self.record(format!("close:{session_id}"));
            Ok(())
        }

        async fn submit_lead(&self, lead: &LeadSubmission) -> Result<(), RemoteError> {
            self.record(format!("lead:{}:{}", lead.name, lead.session_id));
            self.lag().await;
            Ok(())
        }
    }

    fn controller(backend: &Arc<FakeBackend>) -> WidgetController {
        let backend: Arc<dyn ChatBackend> = Arc::clone(backend) as Arc<dyn ChatBackend>;
        WidgetController::new(TabStore::new(WidgetSettings::default()), backend)
    }

    /// Let detached tasks (timers, close notifications) run.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_send_reply_flow() {
        let backend = Arc::new(FakeBackend::healthy());
        let controller = controller(&backend);

        controller.open("tab").await;
        assert_eq!(controller.view("tab", |w| w.session_id().to_string()), "abc123");
        assert!(controller.view("tab", Widget::shows_greeting));

        let exchange = controller.send("tab", Some("Hello".into())).unwrap();
        // Optimistic: the user's message is there before the reply.
        controller.view("tab", |w| {
            assert_eq!(w.messages()[0].content, "Hello");
            assert!(w.is_loading());
        });

        let outcome = exchange.await.unwrap();
        assert!(matches!(outcome, Some(ExchangeOutcome::Replied { .. })));
        controller.view("tab", |w| {
            assert_eq!(w.messages()[1].content, "<p>Hi there</p>");
            assert_eq!(w.messages()[1].sender, Sender::Assistant);
            assert!(!w.is_loading());
        });
        assert_eq!(backend.calls(), ["create", "send:abc123:Hello"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_input_never_calls_backend() {
        let backend = Arc::new(FakeBackend::healthy());
        let controller = controller(&backend);
        controller.open("tab").await;

        let result = controller.send("tab", Some("   ".into()));
        assert!(matches!(result, Err(SendRejected::Empty)));
        settle().await;
        assert_eq!(backend.calls(), ["create"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactivity_expires_and_closes_session() {
        let backend = Arc::new(FakeBackend::healthy());
        let controller = controller(&backend);
        controller.open("tab").await;

        tokio::time::sleep(Duration::from_secs(15 * 60)).await;
        settle().await;

        assert_eq!(controller.view("tab", Widget::phase), SessionPhase::Expired);
        assert!(matches!(
            controller.send("tab", Some("anyone?".into())),
            Err(SendRejected::Expired)
        ));
        assert_eq!(backend.calls(), ["create", "close:abc123"]);

        // A page reload starts a fresh session instead of re-closing the old one.
        controller.mount("tab", MountOptions::default());
        controller.open("tab").await;
        settle().await;
        assert_eq!(controller.view("tab", Widget::phase), SessionPhase::Open);
        assert_eq!(backend.calls(), ["create", "close:abc123", "create"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_resets_the_timer() {
        let backend = Arc::new(FakeBackend::healthy());
        let controller = controller(&backend);
        controller.open("tab").await;

        tokio::time::sleep(Duration::from_secs(10 * 60)).await;
        controller
            .send("tab", Some("still here".into()))
            .unwrap()
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(10 * 60)).await;
        settle().await;
        assert_eq!(controller.view("tab", Widget::phase), SessionPhase::Open);

        tokio::time::sleep(Duration::from_secs(5 * 60)).await;
        settle().await;
        assert_eq!(controller.view("tab", Widget::phase), SessionPhase::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_creation_failure_degrades() {
        let backend = Arc::new(FakeBackend {
            token: None,
            reply: None,
            ..FakeBackend::default()
        });
        let controller = controller(&backend);
        controller.open("tab").await;

        assert_eq!(controller.view("tab", Widget::phase), SessionPhase::Open);
        controller
            .send("tab", Some("Hello".into()))
            .unwrap()
            .await
            .unwrap();

        let last = controller.view("tab", |w| w.messages().last().map(|m| m.content.clone()));
        assert_eq!(last.as_deref(), Some(FALLBACK_REPLY));
        assert_eq!(backend.calls(), ["create", "send::Hello"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remount_drops_late_reply_and_stops_timer() {
        let backend = Arc::new(FakeBackend::healthy());
        let controller = controller(&backend);
        controller.open("tab").await;

        let exchange = controller.send("tab", Some("Hello".into())).unwrap();
        controller.mount("tab", MountOptions::default());
        assert_eq!(exchange.await.unwrap(), None);
        assert!(controller.view("tab", |w| w.messages().is_empty()));

        // The old timer is gone; nothing expires until the widget reopens.
        tokio::time::sleep(Duration::from_secs(20 * 60)).await;
        settle().await;
        assert_eq!(controller.view("tab", Widget::phase), SessionPhase::Closed);

        // Reopening finds the stored token stale and notifies the backend.
        controller.open("tab").await;
        settle().await;
        assert_eq!(controller.view("tab", Widget::phase), SessionPhase::Expired);
        assert_eq!(
            backend.calls(),
            ["create", "send:abc123:Hello", "close:abc123"]
        );

        controller.mount("tab", MountOptions::default());
        controller.open("tab").await;
        settle().await;
        assert_eq!(controller.view("tab", Widget::phase), SessionPhase::Open);
        assert_eq!(
            backend.calls(),
            ["create", "send:abc123:Hello", "close:abc123", "create"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_open_still_settles() {
        let backend = Arc::new(FakeBackend {
            delay: Duration::from_secs(60),
            ..FakeBackend::healthy()
        });
        let controller = controller(&backend);

        // The request gives up before the backend answers.
        let abandoned = tokio::time::timeout(Duration::from_secs(30), controller.open("tab")).await;
        assert!(abandoned.is_err());
        assert_eq!(controller.view("tab", Widget::phase), SessionPhase::Creating);

        tokio::time::sleep(Duration::from_secs(31)).await;
        settle().await;
        assert_eq!(controller.view("tab", Widget::phase), SessionPhase::Open);
        assert_eq!(controller.view("tab", |w| w.session_id().to_string()), "abc123");
        assert!(controller.send("tab", Some("Hello".into())).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_failed_open_degrades() {
        let backend = Arc::new(FakeBackend {
            delay: Duration::from_secs(60),
            ..FakeBackend::default()
        });
        let controller = controller(&backend);

        let abandoned = tokio::time::timeout(Duration::from_secs(30), controller.open("tab")).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_secs(31)).await;
        settle().await;
        assert_eq!(controller.view("tab", Widget::phase), SessionPhase::Open);
        assert_eq!(controller.view("tab", |w| w.session_id().to_string()), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_lead_submission_still_settles() {
        let backend = Arc::new(FakeBackend {
            delay: Duration::from_secs(60),
            ..FakeBackend::healthy()
        });
        let controller = controller(&backend);
        controller.open("tab").await;

        let form = LeadForm {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: "555-0100".into(),
        };
        let abandoned = tokio::time::timeout(
            Duration::from_secs(30),
            controller.submit_lead("tab", form.clone()),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(controller.view("tab", Widget::lead_submitting));

        tokio::time::sleep(Duration::from_secs(31)).await;
        settle().await;
        controller.view("tab", |w| {
            assert!(!w.lead_submitting());
            assert!(!w.lead_form_available());
        });
        assert_eq!(
            controller.submit_lead("tab", form).await,
            Err(LeadRejected::AlreadyGenerated)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_lead_submission_marks_tab() {
        let backend = Arc::new(FakeBackend::healthy());
        let controller = controller(&backend);
        controller.open("tab").await;

        let form = LeadForm {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: "555-0100".into(),
        };
        assert_eq!(controller.submit_lead("tab", form.clone()).await, Ok(true));
        assert_eq!(
            controller.submit_lead("tab", form).await,
            Err(LeadRejected::AlreadyGenerated)
        );

        controller.mount("tab", MountOptions::default());
        assert!(!controller.view("tab", Widget::lead_form_available));
        assert_eq!(backend.calls(), ["create", "lead:Ada:abc123"]);
    }
}
