//! Inline SVG icons (Lucide paths).

/// Wrap path data in the shared `<svg>` element.
macro_rules! svg {
    ($class:literal, $body:literal) => {
        concat!(
            r#"<svg class=""#,
            $class,
            r#"" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round" aria-hidden="true">"#,
            $body,
            "</svg>"
        )
    };
}

pub const SEND: &str = svg!(
    "icon",
    r#"<line x1="22" y1="2" x2="11" y2="13"/><polygon points="22 2 15 22 11 13 2 9 22 2"/>"#
);

pub const MIC: &str = svg!(
    "icon",
    r#"<path d="M12 2a3 3 0 0 0-3 3v7a3 3 0 0 0 6 0V5a3 3 0 0 0-3-3Z"/><path d="M19 10v2a7 7 0 0 1-14 0v-2"/><line x1="12" x2="12" y1="19" y2="22"/>"#
);

pub const PAUSE: &str = svg!(
    "icon",
    r#"<rect x="14" y="4" width="4" height="16" rx="1"/><rect x="6" y="4" width="4" height="16" rx="1"/>"#
);

pub const CLOSE: &str = svg!("icon", r#"<path d="M18 6 6 18"/><path d="m6 6 12 12"/>"#);

/// Size toggle.
pub const SCAN: &str = svg!(
    "icon",
    r#"<path d="M3 7V5a2 2 0 0 1 2-2h2"/><path d="M17 3h2a2 2 0 0 1 2 2v2"/><path d="M21 17v2a2 2 0 0 1-2 2h-2"/><path d="M7 21H5a2 2 0 0 1-2-2v-2"/>"#
);

/// Pane toggle on mobile.
pub const USER: &str = svg!(
    "icon",
    r#"<path d="M19 21v-2a4 4 0 0 0-4-4H9a4 4 0 0 0-4 4v2"/><circle cx="12" cy="7" r="4"/>"#
);

pub const MESSAGE: &str = svg!(
    "icon",
    r#"<path d="M7.9 20A9 9 0 1 0 4 16.1L2 22Z"/>"#
);

pub const MENU: &str = svg!(
    "icon icon-lg",
    r#"<path d="M4 6h16M4 12h16M4 18h16"/>"#
);

pub const ARROW_DOWN: &str = svg!(
    "icon icon-lg",
    r#"<path d="M19 14l-7 7m0 0l-7-7m7 7V3"/>"#
);
