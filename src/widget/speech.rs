//! Speech-to-text capability.
//!
//! Recognition itself runs in the browser. The widget only decides when it
//! should be running and which results reach the input buffer; the rendered
//! fragment carries the listening flag and the static script follows it.

use std::fmt::Debug;

use serde::Deserialize;

/// Recognition engine as seen by the widget.
pub trait SpeechCapability: Send + Sync + Debug {
    /// Whether the environment can recognise speech at all.
    fn is_supported(&self) -> bool;

    /// Begin continuous recognition.
    fn start(&mut self);

    /// Stop recognition.
    fn stop(&mut self);

    fn is_listening(&self) -> bool;
}

/// Recognition backed by the browser's (possibly vendor-prefixed) API.
#[derive(Debug, Default)]
pub struct BrowserSpeech {
    listening: bool,
    starts: u32,
}

impl BrowserSpeech {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times recognition was started in this mount.
    #[must_use]
    pub fn starts(&self) -> u32 {
        self.starts
    }
}

impl SpeechCapability for BrowserSpeech {
    fn is_supported(&self) -> bool {
        true
    }

    fn start(&mut self) {
        if !self.listening {
            self.listening = true;
            self.starts += 1;
        }
    }

    fn stop(&mut self) {
        self.listening = false;
    }

    fn is_listening(&self) -> bool {
        self.listening
    }
}

/// Stand-in for environments without speech recognition.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSpeech;

impl SpeechCapability for NoopSpeech {
    fn is_supported(&self) -> bool {
        false
    }

    fn start(&mut self) {}

    fn stop(&mut self) {}

    fn is_listening(&self) -> bool {
        false
    }
}

/// Pick the capability for what the browser reported at mount.
#[must_use]
pub fn capability_for(supported: bool) -> Box<dyn SpeechCapability> {
    if supported {
        Box::new(BrowserSpeech::new())
    } else {
        Box::new(NoopSpeech)
    }
}

/// What to do when the user asks for speech input without support.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedSpeechPolicy {
    /// Show a notice explaining speech input is unavailable.
    Alert,
    /// Ignore the toggle.
    #[default]
    Silent,
}

/// One recognition result as reported by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpeechResult {
    pub transcript: String,
    #[serde(default)]
    pub is_final: bool,
}

/// Outcome of toggling speech input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechToggle {
    Started,
    Stopped,
    Unsupported(UnsupportedSpeechPolicy),
}
