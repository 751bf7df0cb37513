//! Universe Explorer
//!
//! A server-rendered marketing site about astronomy with an embedded chat
//! assistant. Pages are HTML-first and progressively enhanced with HTMX.
//!
//! # Architecture
//!
//! - **Server**: Axum router serving pages, fragments and static assets
//! - **Widget**: synchronous chat widget state machine, one per browser tab
//! - **Controller**: async glue between widgets and the remote chat backend
//! - **Remote**: `reqwest` clients for the chat backend and the photo search API
//!
//! # Modules
//!
//! - [`config`]: layered configuration
//! - [`controller`]: widget operations that touch the network
//! - [`gallery`]: photo search client and gallery state
//! - [`remote`]: chat backend trait and HTTP client
//! - [`server`]: router and handlers
//! - [`tabs`]: per-tab widget storage
//! - [`ui`]: HTML rendering
//! - [`widget`]: chat widget state machine

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod controller;
pub mod gallery;
pub mod html;
pub mod remote;
pub mod server;
pub mod tabs;
pub mod telemetry;
pub mod ui;
pub mod widget;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::controller::WidgetController;
use crate::gallery::PhotoSource;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Widget operations and the tab store behind them.
    pub controller: WidgetController,
    /// Gallery image source.
    pub photos: Arc<dyn PhotoSource>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}
