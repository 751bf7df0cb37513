//! Hero section and the scene handed to the client-side renderer.

use serde::Serialize;

use crate::html::escape;
use crate::ui::icons;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Camera {
    pub position: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StarField {
    pub count: u32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Planet {
    pub color: &'static str,
    pub radius: f32,
    pub position: [f32; 3],
}

/// Everything the canvas needs to draw the rotating universe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroScene {
    pub camera: Camera,
    pub stars: StarField,
    pub planets: Vec<Planet>,
    pub auto_rotate_speed: f32,
}

impl Default for HeroScene {
    fn default() -> Self {
        Self {
            camera: Camera {
                position: [0.0, 0.0, 5.0],
            },
            stars: StarField {
                count: 5000,
                radius: 100.0,
            },
            planets: vec![
                Planet {
                    color: "white",
                    radius: 0.7,
                    position: [-2.0, 0.0, 0.0],
                },
                Planet {
                    color: "orange",
                    radius: 0.5,
                    position: [2.0, 0.0, 0.0],
                },
                Planet {
                    color: "lightblue",
                    radius: 0.3,
                    position: [0.0, 1.5, -1.0],
                },
            ],
            auto_rotate_speed: 0.5,
        }
    }
}

impl HeroScene {
    /// Scene as JSON, escaped for a `data-` attribute.
    #[must_use]
    pub fn to_attribute(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => escape(&json),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialise hero scene");
                String::new()
            }
        }
    }
}

pub fn render_hero(scene: &HeroScene) -> String {
    let scene = scene.to_attribute();
    let arrow = icons::ARROW_DOWN;
    format!(
        r##"<section id="home" class="hero">
    <canvas id="universe-scene" class="hero-canvas" data-scene="{scene}"></canvas>
    <div class="hero-content">
        <h1 class="hero-title">Explore the Universe</h1>
        <p class="hero-lead">Discover the wonders of our cosmos through stunning imagery and interactive 3D experiences</p>
        <a href="#gallery" class="btn btn-primary">Begin Journey</a>
    </div>
    <div class="hero-scroll">{arrow}</div>
</section>"##
    )
}
