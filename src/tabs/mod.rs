//! Per-tab widget storage.
//!
//! Every browser tab gets an entry keyed by the id the static script keeps in
//! `sessionStorage`. The entry owns the tab's [`Widget`] (and through it the
//! tab storage with the session token) plus the handle of its inactivity
//! timer.
//!
//! # Example
//!
//! ```rust
//! use universe_explorer::tabs::TabStore;
//! use universe_explorer::widget::WidgetSettings;
//!
//! let store = TabStore::new(WidgetSettings::default());
//! let tab = store.get_or_create("tab-1");
//! assert_eq!(store.len(), 1);
//! assert!(tab.lock().unwrap().widget.shows_greeting());
//! ```

mod store;

pub use store::{DEFAULT_TAB_IDLE_TIMEOUT, Tab, TabHandle, TabStore, lock_tab};
