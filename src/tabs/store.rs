//! Tab entries and the thread-safe store holding them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tokio::task::AbortHandle;
use tokio::time::Instant;

use crate::widget::{MountOptions, TabStorage, Widget, WidgetSettings};

/// Tabs untouched for this long are dropped by [`TabStore::cleanup_idle`].
pub const DEFAULT_TAB_IDLE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on live tabs; the least recently seen one makes room.
pub const DEFAULT_MAX_TABS: usize = 10_000;

/// One browser tab.
#[derive(Debug)]
pub struct Tab {
    id: String,
    /// The current mount of the chat widget.
    pub widget: Widget,
    expiry_timer: Option<AbortHandle>,
    last_seen: Instant,
}

impl Tab {
    fn new(id: String, settings: WidgetSettings) -> Self {
        Self {
            id,
            widget: Widget::mount(TabStorage::new(), settings, 1, MountOptions::default()),
            expiry_timer: None,
            last_seen: Instant::now(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replace the inactivity timer, aborting the previous one.
    pub fn set_expiry_timer(&mut self, timer: AbortHandle) {
        self.cancel_expiry_timer();
        self.expiry_timer = Some(timer);
    }

    pub fn cancel_expiry_timer(&mut self) {
        if let Some(timer) = self.expiry_timer.take() {
            timer.abort();
        }
    }

    #[must_use]
    pub fn has_expiry_timer(&self) -> bool {
        self.expiry_timer.is_some()
    }

    fn touch(&mut self) {
        self.last_seen = Instant::now();
    }
}

impl Drop for Tab {
    fn drop(&mut self) {
        self.cancel_expiry_timer();
    }
}

/// Shared handle to a tab.
pub type TabHandle = Arc<Mutex<Tab>>;

/// Lock a tab, recovering the data if a previous holder panicked.
pub fn lock_tab(handle: &TabHandle) -> MutexGuard<'_, Tab> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Thread-safe store for tabs.
#[derive(Debug, Clone)]
pub struct TabStore {
    inner: Arc<TabStoreInner>,
}

#[derive(Debug)]
struct TabStoreInner {
    tabs: RwLock<HashMap<String, TabHandle>>,
    settings: WidgetSettings,
    max_tabs: usize,
}

impl TabStore {
    /// Create an empty store; new widgets use `settings`.
    #[must_use]
    pub fn new(settings: WidgetSettings) -> Self {
        Self::with_max_tabs(settings, DEFAULT_MAX_TABS)
    }

    /// Create an empty store holding at most `max_tabs` tabs.
    #[must_use]
    pub fn with_max_tabs(settings: WidgetSettings, max_tabs: usize) -> Self {
        Self {
            inner: Arc::new(TabStoreInner {
                tabs: RwLock::new(HashMap::new()),
                settings,
                max_tabs: max_tabs.max(1),
            }),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &WidgetSettings {
        &self.inner.settings
    }

    /// Get a tab by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<TabHandle> {
        let guard = self
            .inner
            .tabs
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let handle = guard.get(id).cloned()?;
        drop(guard);
        lock_tab(&handle).touch();
        Some(handle)
    }

    /// Get a tab by id, creating it if it doesn't exist.
    #[must_use]
    pub fn get_or_create(&self, id: &str) -> TabHandle {
        if let Some(handle) = self.get(id) {
            return handle;
        }

        let mut guard = self
            .inner
            .tabs
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !guard.contains_key(id) && guard.len() >= self.inner.max_tabs {
            let oldest = guard
                .iter()
                .min_by_key(|(_, handle)| lock_tab(handle).last_seen)
                .map(|(oldest, _)| oldest.clone());
            if let Some(evicted) = oldest.and_then(|oldest| guard.remove(&oldest)) {
                let mut tab = lock_tab(&evicted);
                tab.cancel_expiry_timer();
                tracing::debug!(tab_id = %tab.id(), "Evicted least recently seen tab");
            }
        }

        // Another request may have raced us here.
        let handle = guard.entry(id.to_string()).or_insert_with(|| {
            tracing::debug!(tab_id = %id, "Created tab");
            Arc::new(Mutex::new(Tab::new(id.to_string(), self.inner.settings.clone())))
        });
        Arc::clone(handle)
    }

    /// Remove a tab by id, stopping its timer.
    pub fn remove(&self, id: &str) -> Option<TabHandle> {
        let removed = self
            .inner
            .tabs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        if let Some(handle) = &removed {
            lock_tab(handle).cancel_expiry_timer();
        }
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .tabs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop tabs that have not been seen for `max_idle`.
    ///
    /// Returns the number of tabs removed.
    pub fn cleanup_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut guard = self
            .inner
            .tabs
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = guard.len();
        guard.retain(|_, handle| now.saturating_duration_since(lock_tab(handle).last_seen) < max_idle);
        before - guard.len()
    }

    /// List all tab ids.
    #[must_use]
    pub fn list_ids(&self) -> Vec<String> {
        self.inner
            .tabs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_store() {
        let store = TabStore::new(WidgetSettings::default());
        assert!(store.is_empty());

        let first = store.get_or_create("tab-1");
        let again = store.get_or_create("tab-1");
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(store.len(), 1);
        assert_eq!(lock_tab(&first).id(), "tab-1");

        store.get_or_create("tab-2");
        let mut ids = store.list_ids();
        ids.sort();
        assert_eq!(ids, ["tab-1", "tab-2"]);

        assert!(store.remove("tab-1").is_some());
        assert!(store.get("tab-1").is_none());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_idle() {
        let store = TabStore::new(WidgetSettings::default());
        store.get_or_create("old");
        tokio::time::advance(Duration::from_secs(120)).await;
        store.get_or_create("fresh");

        assert_eq!(store.cleanup_idle(Duration::from_secs(60)), 1);
        assert!(store.get("old").is_none());
        assert!(store.get("fresh").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_store_evicts_least_recent() {
        let store = TabStore::with_max_tabs(WidgetSettings::default(), 2);
        store.get_or_create("a");
        tokio::time::advance(Duration::from_secs(1)).await;
        store.get_or_create("b");
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.get("a").is_some());
        tokio::time::advance(Duration::from_secs(1)).await;

        store.get_or_create("c");
        assert_eq!(store.len(), 2);
        assert!(store.get("b").is_none());
        assert!(store.get("a").is_some());
        assert!(store.get("c").is_some());

        // Existing tabs never evict anything.
        store.get_or_create("a");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_aborts_timer() {
        let store = TabStore::new(WidgetSettings::default());
        let handle = store.get_or_create("tab");
        let task = tokio::spawn(std::future::pending::<()>());
        lock_tab(&handle).set_expiry_timer(task.abort_handle());
        assert!(lock_tab(&handle).has_expiry_timer());

        store.remove("tab");
        let err = task.await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
