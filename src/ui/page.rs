//! Landing page: document shell, header, facts and footer.

use std::fmt::Write;

use crate::gallery::GalleryState;
use crate::html::escape;
use crate::ui::gallery::render_gallery;
use crate::ui::hero::{HeroScene, render_hero};
use crate::ui::icons;

/// Anchors in the header navigation.
const NAV_ITEMS: [&str; 5] = ["Home", "Galaxies", "Planets", "Stars", "About"];

/// Anchors in the footer quick links.
const FOOTER_LINKS: [&str; 4] = ["Home", "Gallery", "Facts", "About"];

const SOCIAL_PLATFORMS: [&str; 4] = ["facebook", "twitter", "instagram", "youtube"];

/// One card in the facts section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fact {
    pub title: &'static str,
    pub value: &'static str,
    pub description: &'static str,
}

pub const FACTS: [Fact; 3] = [
    Fact {
        title: "Age of the Universe",
        value: "13.8 Billion Years",
        description: "The universe began with the Big Bang and has been expanding ever since.",
    },
    Fact {
        title: "Number of Galaxies",
        value: "100-200 Billion",
        description: "Each containing billions of stars, planets, and other celestial objects.",
    },
    Fact {
        title: "Speed of Light",
        value: "299,792 km/s",
        description: "The ultimate speed limit of the universe, taking 8 minutes from Sun to Earth.",
    },
];

/// Generate the HTML shell for the site.
fn html_shell(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Explore the wonders of our cosmos through stunning imagery and interactive 3D experiences">
    <title>{title} - Universe Explorer</title>

    <script src="https://unpkg.com/htmx.org@2.0.8/dist/htmx.min.js"></script>
    <script type="importmap">{{"imports": {{"three": "https://unpkg.com/three@0.170.0/build/three.module.js"}}}}</script>
    <script type="module" src="/static/hero.js"></script>
    <script defer src="/static/widget.js"></script>
    <link rel="stylesheet" href="/static/app.css">
</head>
<body>
{content}
</body>
</html>"#
    )
}

fn render_header() -> String {
    let links = NAV_ITEMS.iter().fold(String::new(), |mut out, item| {
        let _ = write!(
            out,
            r##"<a href="#{anchor}" class="nav-link">{item}</a>"##,
            anchor = item.to_lowercase()
        );
        out
    });
    let menu = icons::MENU;

    format!(
        r##"<header class="site-header">
    <div class="container header-bar">
        <a href="#home" class="brand">Universe Explorer</a>
        <nav class="site-nav">{links}</nav>
        <button class="menu-toggle" type="button" aria-label="Toggle menu" aria-expanded="false" aria-controls="mobile-nav">{menu}</button>
    </div>
    <nav id="mobile-nav" class="mobile-nav" hidden>{links}</nav>
</header>"##
    )
}

fn render_facts() -> String {
    let cards = FACTS.iter().fold(String::new(), |mut out, fact| {
        let _ = write!(
            out,
            r#"<div class="fact-card"><h3>{}</h3><p class="fact-value">{}</p><p>{}</p></div>"#,
            fact.title, fact.value, fact.description
        );
        out
    });

    format!(
        r#"<section id="facts" class="facts">
    <div class="container">
        <h2 class="section-title">Astronomical Facts</h2>
        <p class="section-lead">The universe is full of incredible phenomena that continue to amaze scientists and enthusiasts alike.</p>
        <div class="facts-grid">{cards}</div>
    </div>
</section>"#
    )
}

fn render_footer(year: i32) -> String {
    let links = FOOTER_LINKS.iter().fold(String::new(), |mut out, item| {
        let _ = write!(
            out,
            r##"<li><a href="#{anchor}">{item}</a></li>"##,
            anchor = item.to_lowercase()
        );
        out
    });
    let social = SOCIAL_PLATFORMS.iter().fold(String::new(), |mut out, platform| {
        let initial = platform.chars().next().map(|c| c.to_ascii_uppercase()).unwrap_or_default();
        let _ = write!(
            out,
            r##"<a href="#" class="social-link"><span class="sr-only">{platform}</span>{initial}</a>"##
        );
        out
    });

    format!(
        r#"<footer id="about" class="site-footer">
    <div class="container footer-grid">
        <div class="footer-about">
            <h3>Universe Explorer</h3>
            <p>Exploring the wonders of our cosmos through stunning imagery and interactive 3D experiences.</p>
        </div>
        <div>
            <h4>Quick Links</h4>
            <ul>{links}</ul>
        </div>
        <div>
            <h4>Connect With Us</h4>
            <div class="social">{social}</div>
        </div>
    </div>
    <p class="copyright">&copy; {year} Universe Explorer. All rights reserved.</p>
</footer>"#
    )
}

/// Render the full landing page.
///
/// The gallery starts as a skeleton and the widget as an empty mount point;
/// both are filled in by HTMX once the page has loaded. `tab_seed` becomes the
/// tab id when the browser cannot generate one itself.
pub fn render_landing_page(gallery_tiles: u32, year: i32, tab_seed: &str) -> String {
    let content = format!(
        r#"<div id="chat-widget" class="chat-widget" data-visible="false" data-tab-seed="{seed}"></div>
{header}
<main>
{hero}
{gallery}
{facts}
</main>
{footer}"#,
        header = render_header(),
        hero = render_hero(&HeroScene::default()),
        gallery = render_gallery(&GalleryState::Loading {
            tiles: gallery_tiles
        }),
        facts = render_facts(),
        footer = render_footer(year),
        seed = escape(tab_seed),
    );
    html_shell("Home", &content)
}
