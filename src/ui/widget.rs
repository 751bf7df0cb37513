//! Chat widget fragment.
//!
//! The whole widget is one element, `#chat-widget`, replaced wholesale on
//! every interaction. Attributes on the root are inherited by every control
//! inside it, so each request targets the root and carries the textarea.

use std::fmt::Write;

use tokio::time::Instant;

use crate::html::escape;
use crate::ui::icons;
use crate::widget::{BannerKind, Layout, Pane, Sender, SessionPhase, Widget};

const LAUNCHER_ICON: &str = "https://cdn-icons-png.flaticon.com/512/6873/6873405.png";

pub const EXPIRED_NOTICE: &str =
    "Your session has expired. Please refresh the page to start a new conversation.";

pub const SPEECH_UNSUPPORTED_NOTICE: &str =
    "Speech recognition is not supported in this browser.";

/// Delay before a loading widget asks for the reply again.
const POLL_DELAY_MS: u64 = 500;

fn layout_name(layout: Layout) -> &'static str {
    match layout {
        Layout::Mobile => "mobile",
        Layout::Compact => "compact",
        Layout::Expanded => "expanded",
    }
}

fn phase_name(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::Closed => "closed",
        SessionPhase::Creating => "creating",
        SessionPhase::Open => "open",
        SessionPhase::Expired => "expired",
    }
}

/// Render the widget as it stands at `now`.
pub fn render_widget(widget: &Widget, assistant_name: &str, now: Instant) -> String {
    let layout = widget.layout();
    let mut out = String::new();

    let _ = write!(
        out,
        r##"<div id="chat-widget" class="chat-widget" hx-target="this" hx-swap="outerHTML" hx-include="#chat-input, .lead-form input" data-visible="{visible}" data-phase="{phase}" data-layout="{layout}" data-pane="{pane}" data-listening="{listening}" data-speech="{speech}">"##,
        visible = widget.is_visible(),
        phase = phase_name(widget.phase()),
        layout = layout_name(layout),
        pane = match widget.pane() {
            Pane::Chat => "chat",
            Pane::Lead => "lead",
        },
        listening = widget.is_listening(),
        speech = widget.speech_supported(),
    );

    if !widget.is_visible() {
        let _ = write!(
            out,
            r#"<button type="button" class="chat-launcher" hx-post="/widget/open" aria-label="Open chat"><img src="{LAUNCHER_ICON}" alt="Chat Icon"><span class="chat-pulse"></span></button></div>"#
        );
        return out;
    }

    let _ = write!(
        out,
        r#"<button type="button" class="chat-launcher" hx-post="/widget/hide" aria-label="Close chat">{close}</button>
<div class="chat-backdrop" hx-post="/widget/hide"></div>
<div class="chat-panel chat-panel--{layout}" role="dialog" aria-label="{name}">"#,
        close = icons::CLOSE,
        layout = layout_name(layout),
        name = escape(assistant_name),
    );

    render_header(widget, assistant_name, &mut out);

    out.push_str(r#"<div class="chat-body">"#);
    let show_chat = !layout.is_mobile() || widget.pane() == Pane::Chat;
    let show_lead = widget.lead_form_available() && (!layout.is_mobile() || widget.pane() == Pane::Lead);
    if show_chat {
        render_chat_pane(widget, assistant_name, &mut out);
    }
    if show_lead {
        render_lead_pane(widget, &mut out);
    }
    out.push_str("</div>");

    if let Some(kind) = widget.lead_banner(now) {
        render_banner(kind, widget.settings().banner_window.as_millis(), &mut out);
    }

    out.push_str("</div></div>");
    out
}

fn render_header(widget: &Widget, assistant_name: &str, out: &mut String) {
    let _ = write!(
        out,
        r#"<div class="chat-header"><span class="chat-title">{}</span><div class="chat-header-actions">"#,
        escape(assistant_name)
    );
    if widget.layout().is_mobile() {
        if widget.lead_form_available() {
            let (icon, label) = match widget.pane() {
                Pane::Chat => (icons::USER, "Show contact form"),
                Pane::Lead => (icons::MESSAGE, "Show chat"),
            };
            let _ = write!(
                out,
                r#"<button type="button" class="chat-icon-button" hx-post="/widget/pane" aria-label="{label}">{icon}</button>"#
            );
        }
    } else {
        let _ = write!(
            out,
            r#"<button type="button" class="chat-icon-button" hx-post="/widget/size" aria-label="Toggle size">{}</button>"#,
            icons::SCAN
        );
    }
    out.push_str("</div></div>");
}

fn render_chat_pane(widget: &Widget, assistant_name: &str, out: &mut String) {
    out.push_str(r#"<section class="chat-pane">"#);

    if widget.phase() == SessionPhase::Creating {
        out.push_str(r#"<p class="chat-status">Connecting...</p>"#);
    }

    if widget.shows_greeting() {
        let _ = write!(
            out,
            r#"<div class="chat-greeting"><h2>Hi! I&#39;m {}! <br>A fully-homemade AI Assistant.</h2><p>What can I help you with today?</p><div class="chat-suggestions">"#,
            escape(assistant_name)
        );
        for suggestion in widget.suggestions() {
            let _ = write!(
                out,
                r#"<button type="button" class="chat-suggestion" hx-post="/widget/suggestion/{}">{}</button>"#,
                suggestion.id,
                escape(&suggestion.text)
            );
        }
        out.push_str("</div></div>");
    } else {
        out.push_str(r#"<div id="chat-messages" class="chat-messages" aria-live="polite">"#);
        for message in widget.messages() {
            match message.sender {
                Sender::User => {
                    let _ = write!(
                        out,
                        r#"<div class="chat-bubble chat-bubble--user" data-id="{}">{}</div>"#,
                        message.id,
                        escape(&message.content)
                    );
                }
                // Sanitised when it was appended.
                Sender::Assistant => {
                    let _ = write!(
                        out,
                        r#"<div class="chat-bubble chat-bubble--assistant" data-id="{}">{}</div>"#,
                        message.id, message.content
                    );
                }
            }
        }
        if widget.is_loading() {
            let _ = write!(
                out,
                r#"<div class="chat-loader" hx-get="/widget" hx-trigger="load delay:{POLL_DELAY_MS}ms"><span class="chat-dot"></span><span class="chat-dot"></span><span class="chat-dot"></span><span class="chat-typing">Processing...</span></div>"#
            );
        }
        out.push_str("</div>");
    }

    if widget.speech_notice() {
        let _ = write!(
            out,
            r#"<div class="chat-notice" role="alert">{SPEECH_UNSUPPORTED_NOTICE} <button type="button" hx-post="/widget/speech/dismiss">Dismiss</button></div>"#
        );
    }

    if widget.phase() == SessionPhase::Expired {
        let _ = write!(
            out,
            r#"<div class="chat-expired" role="status">{EXPIRED_NOTICE}</div>"#
        );
    } else {
        render_input(widget, out);
    }

    out.push_str("</section>");
}

fn render_input(widget: &Widget, out: &mut String) {
    let _ = write!(
        out,
        r#"<div class="chat-input-area" data-empty="{empty}"><textarea id="chat-input" name="message" rows="1" placeholder="*Message" hx-post="/widget/send" hx-trigger="chat-send">{input}</textarea>"#,
        empty = widget.input().is_empty(),
        input = escape(widget.input()),
    );
    if widget.is_listening() {
        let _ = write!(
            out,
            r#"<button type="button" class="chat-action" hx-post="/widget/speech" aria-label="Stop listening">{}</button>"#,
            icons::PAUSE
        );
    } else {
        let _ = write!(
            out,
            r#"<button type="button" class="chat-action chat-action--send" hx-post="/widget/send" aria-label="Send">{send}</button><button type="button" class="chat-action chat-action--mic" hx-post="/widget/speech" aria-label="Start voice input">{mic}</button>"#,
            send = icons::SEND,
            mic = icons::MIC,
        );
    }
    out.push_str("</div>");
}

fn render_lead_pane(widget: &Widget, out: &mut String) {
    let submitting = widget.lead_submitting();
    let draft = widget.lead_draft();
    let _ = write!(
        out,
        r#"<section class="lead-pane"><form class="lead-form" hx-post="/widget/lead">
<h3>Get in touch</h3>
<label>Name<input type="text" name="name" value="{name}" autocomplete="name" required></label>
<label>Email<input type="email" name="email" value="{email}" autocomplete="email" required></label>
<label>Phone<input type="tel" name="phone" value="{phone}" autocomplete="tel" required></label>
<button type="submit" class="btn btn-primary"{disabled}>{label}</button>
</form></section>"#,
        name = escape(&draft.name),
        email = escape(&draft.email),
        phone = escape(&draft.phone),
        disabled = if submitting { " disabled" } else { "" },
        label = if submitting { "Submitting..." } else { "Submit" },
    );
}

fn render_banner(kind: BannerKind, window_ms: u128, out: &mut String) {
    let (class, text) = match kind {
        BannerKind::Success => ("success", "Thank you! We will get in touch soon."),
        BannerKind::Error => ("error", "Something went wrong. Please try again later."),
    };
    let _ = write!(
        out,
        r#"<div class="lead-banner lead-banner--{class}" role="status" hx-get="/widget" hx-trigger="load delay:{window_ms}ms">{text}</div>"#
    );
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::widget::{
        LeadDraft, LeadForm, MountOptions, Reply, SessionToken, TabStorage, UnsupportedSpeechPolicy,
        WidgetSettings,
    };

    fn widget(width: u32) -> Widget {
        Widget::mount(
            TabStorage::new(),
            WidgetSettings::default(),
            1,
            MountOptions {
                viewport_width: Some(width),
                speech_supported: true,
            },
        )
    }

    fn opened(width: u32, now: Instant) -> Widget {
        let mut w = widget(width);
        w.open(now);
        w.session_created(1, SessionToken::new("abc123"), now);
        w
    }

    #[test]
    fn test_hidden_widget_is_only_a_launcher() {
        let html = render_widget(&widget(1280), "RitzBOT", Instant::now());
        assert!(html.contains(r#"hx-post="/widget/open""#));
        assert!(html.contains(r#"data-visible="false""#));
        assert!(!html.contains("chat-panel"));
    }

    #[test]
    fn test_greeting_with_suggestions() {
        let now = Instant::now();
        let html = render_widget(&opened(1280, now), "RitzBOT", now);
        assert!(html.contains("Hi! I&#39;m RitzBOT!"));
        assert!(html.contains(r#"hx-post="/widget/suggestion/1""#));
        assert!(html.contains("Web Design/Tech Solutions"));
        assert!(html.contains(r#"id="chat-input""#));
        assert!(html.contains(r#"hx-post="/widget/size""#));
    }

    #[test]
    fn test_messages_escape_user_text_only() {
        let now = Instant::now();
        let mut w = opened(1280, now);
        w.set_input("<b>Hello</b>");
        w.begin_send().unwrap();

        let html = render_widget(&w, "RitzBOT", now);
        assert!(html.contains("&lt;b&gt;Hello&lt;/b&gt;"));
        assert!(html.contains("Processing..."));
        assert!(html.contains(r#"hx-get="/widget""#));

        w.complete_send(1, Reply::Html("<p>Hi there</p>".into()), now);
        let html = render_widget(&w, "RitzBOT", now);
        assert!(html.contains(r#"chat-bubble--assistant" data-id="2"><p>Hi there</p></div>"#));
        assert!(!html.contains("Processing..."));
        assert!(!html.contains("chat-greeting"));
    }

    #[test]
    fn test_expired_replaces_input() {
        let now = Instant::now();
        let mut w = opened(1280, now);
        w.expire(1, now + Duration::from_secs(900));

        let html = render_widget(&w, "RitzBOT", now);
        assert!(html.contains(EXPIRED_NOTICE));
        assert!(!html.contains(r#"id="chat-input""#));
        assert!(html.contains(r#"data-phase="expired""#));
    }

    #[test]
    fn test_listening_shows_pause() {
        let now = Instant::now();
        let mut w = opened(1280, now);
        w.toggle_speech();

        let html = render_widget(&w, "RitzBOT", now);
        assert!(html.contains(r#"data-listening="true""#));
        assert!(html.contains("Stop listening"));
        assert!(!html.contains("Start voice input"));
    }

    #[test]
    fn test_speech_notice() {
        let now = Instant::now();
        let settings = WidgetSettings {
            unsupported_speech: UnsupportedSpeechPolicy::Alert,
            ..WidgetSettings::default()
        };
        let mut w = Widget::mount(TabStorage::new(), settings, 1, MountOptions::default());
        w.open(now);
        w.toggle_speech();

        let html = render_widget(&w, "RitzBOT", now);
        assert!(html.contains(SPEECH_UNSUPPORTED_NOTICE));
        assert!(html.contains(r#"data-speech="false""#));
    }

    #[test]
    fn test_mobile_panes() {
        let now = Instant::now();
        let mut w = opened(500, now);

        let html = render_widget(&w, "RitzBOT", now);
        assert!(html.contains(r#"data-layout="mobile""#));
        assert!(!html.contains(r#"hx-post="/widget/size""#));
        assert!(html.contains("chat-pane"));
        assert!(!html.contains("lead-pane"));

        w.toggle_pane();
        let html = render_widget(&w, "RitzBOT", now);
        assert!(!html.contains("chat-pane"));
        assert!(html.contains("lead-pane"));
    }

    #[test]
    fn test_lead_draft_survives_redraw() {
        let now = Instant::now();
        let mut w = opened(1280, now);
        w.set_input("Hello");
        w.begin_send().unwrap();
        w.update_lead_draft(LeadDraft {
            name: Some(r#"Ada "A" L"#.into()),
            email: Some("ada@".into()),
            phone: None,
        });

        // The loader's poll redraws the whole widget, form included.
        let html = render_widget(&w, "RitzBOT", now);
        assert!(html.contains(r#"hx-get="/widget""#));
        assert!(html.contains(r##"hx-include="#chat-input, .lead-form input""##));
        assert!(html.contains(r#"name="name" value="Ada &quot;A&quot; L""#));
        assert!(html.contains(r#"name="email" value="ada@""#));
        assert!(html.contains(r#"name="phone" value="""#));
    }

    #[test]
    fn test_lead_banner_and_hidden_form() {
        let now = Instant::now();
        let mut w = opened(1280, now);
        assert!(render_widget(&w, "RitzBOT", now).contains("lead-form"));

        w.begin_lead(LeadForm {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            phone: "555-0100".into(),
        })
        .unwrap();
        w.complete_lead(1, true, now);

        let html = render_widget(&w, "RitzBOT", now);
        assert!(!html.contains("lead-form"));
        assert!(html.contains("lead-banner--success"));
        assert!(html.contains("load delay:3000ms"));

        let later = render_widget(&w, "RitzBOT", now + Duration::from_secs(3));
        assert!(!later.contains("lead-banner"));
    }
}
