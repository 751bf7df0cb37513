//! "Cosmic Gallery" section.

use std::fmt::Write;

use crate::gallery::{GalleryImage, GalleryState};
use crate::html::escape;

/// Render the gallery section. The loading skeleton fetches the real grid.
pub fn render_gallery(state: &GalleryState) -> String {
    let grid = match state {
        GalleryState::Loading { tiles } => {
            let mut out = String::new();
            for _ in 0..*tiles {
                out.push_str(r#"<div class="gallery-tile gallery-tile--loading"></div>"#);
            }
            out
        }
        GalleryState::Ready(images) => images.iter().fold(String::new(), |mut out, image| {
            render_tile(image, &mut out);
            out
        }),
    };

    let loader = match state {
        GalleryState::Loading { .. } => {
            r#" hx-get="/gallery" hx-trigger="load" hx-swap="outerHTML""#
        }
        GalleryState::Ready(_) => "",
    };

    format!(
        r#"<section id="gallery" class="gallery"{loader}>
    <div class="container">
        <h2 class="section-title">Cosmic Gallery</h2>
        <div class="gallery-grid">{grid}</div>
    </div>
</section>"#
    )
}

fn render_tile(image: &GalleryImage, out: &mut String) {
    let _ = write!(
        out,
        r#"<figure class="gallery-tile"><img src="{src}" alt="{alt}" loading="lazy"><figcaption>Photo by {author}</figcaption></figure>"#,
        src = escape(&image.urls.small),
        alt = escape(image.alt_text()),
        author = escape(&image.user.name),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::{ImageUrls, Photographer};

    fn image(alt: Option<&str>) -> GalleryImage {
        GalleryImage {
            id: "a1".into(),
            urls: ImageUrls {
                regular: "https://img/r".into(),
                small: "https://img/s".into(),
            },
            alt_description: alt.map(str::to_string),
            user: Photographer {
                name: "Vera <R>".into(),
            },
        }
    }

    #[test]
    fn test_loading_skeleton_fetches_grid() {
        let html = render_gallery(&GalleryState::Loading { tiles: 9 });
        assert_eq!(html.matches("gallery-tile--loading").count(), 9);
        assert!(html.contains(r#"hx-get="/gallery""#));
    }

    #[test]
    fn test_ready_grid() {
        let html = render_gallery(&GalleryState::Ready(vec![image(None), image(Some("nebula"))]));
        assert!(!html.contains("hx-get"));
        assert!(html.contains(r#"src="https://img/s""#));
        assert!(html.contains(r#"alt="Space image""#));
        assert!(html.contains(r#"alt="nebula""#));
        assert!(html.contains("Photo by Vera &lt;R&gt;"));
    }

    #[test]
    fn test_failed_fetch_renders_empty_grid() {
        let html = render_gallery(&GalleryState::Ready(Vec::new()));
        assert!(html.contains(r#"<div class="gallery-grid"></div>"#));
    }
}
