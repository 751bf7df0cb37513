//! Server-rendered HTML.
//!
//! Pages and fragments are plain strings assembled with `format!`; HTMX swaps
//! the fragments in place.
//!
//! # Structure
//!
//! - [`page`]: document shell and landing page sections
//! - [`hero`]: 3D scene description for the hero canvas
//! - [`gallery`]: photo grid fragment
//! - [`widget`]: chat widget fragment
//! - [`icons`]: inline SVG icons

pub mod gallery;
pub mod hero;
pub mod icons;
pub mod page;
pub mod widget;

pub use gallery::render_gallery;
pub use page::render_landing_page;
pub use widget::render_widget;
