//! Lead capture form state.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Contact details typed into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LeadForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

impl LeadForm {
    /// Names of required fields that are blank.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }
}

/// Form fields as the browser last reported them.
///
/// Absent fields leave the stored draft alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LeadDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Body of `POST /api/v1/user/update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadSubmission {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub session_id: String,
}

/// Why a submission never left the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeadRejected {
    /// A lead was already captured in this tab.
    AlreadyGenerated,
    /// A submission is still in flight.
    InFlight,
    MissingFields(Vec<&'static str>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

/// Transient result notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub shown_at: Instant,
}

impl Banner {
    #[must_use]
    pub fn is_visible(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.shown_at) < window
    }
}

/// Form panel as rendered next to (or instead of) the chat.
#[derive(Debug, Default, Clone)]
pub struct LeadPanel {
    submitting: bool,
    banner: Option<Banner>,
    draft: LeadForm,
}

impl LeadPanel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// What has been typed so far, rendered back on every redraw.
    #[must_use]
    pub fn draft(&self) -> &LeadForm {
        &self.draft
    }

    pub(crate) fn merge_draft(&mut self, update: LeadDraft) {
        for (field, value) in [
            (&mut self.draft.name, update.name),
            (&mut self.draft.email, update.email),
            (&mut self.draft.phone, update.phone),
        ] {
            if let Some(value) = value {
                *field = value;
            }
        }
    }

    pub(crate) fn clear_draft(&mut self) {
        self.draft = LeadForm::default();
    }

    pub(crate) fn set_submitting(&mut self, submitting: bool) {
        self.submitting = submitting;
    }

    pub(crate) fn show_banner(&mut self, kind: BannerKind, now: Instant) {
        self.banner = Some(Banner {
            kind,
            shown_at: now,
        });
    }

    /// The banner, if it is still inside its display window.
    #[must_use]
    pub fn banner(&self, now: Instant, window: Duration) -> Option<BannerKind> {
        self.banner
            .filter(|b| b.is_visible(now, window))
            .map(|b| b.kind)
    }
}
