use std::{
    ffi::OsString,
    fs,
    panic::{AssertUnwindSafe, catch_unwind},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock, Weak},
};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::Value;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::config::types::{ConfigDocument, DEFAULT_CONFIG_PATH};

const RELOAD_SIGNAL_CAPACITY: usize = 16;

/// Receives `(new, old)` after the store accepted a changed document.
pub trait ConfigSubscriber: Send + Sync {
    fn on_config_changed(&self, new: &Arc<ConfigDocument>, old: Option<&Arc<ConfigDocument>>);
}

impl<F> ConfigSubscriber for F
where
    F: Fn(&Arc<ConfigDocument>, Option<&Arc<ConfigDocument>>) + Send + Sync,
{
    fn on_config_changed(&self, new: &Arc<ConfigDocument>, old: Option<&Arc<ConfigDocument>>) {
        self(new, old)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    Applied { notified: usize },
    Unchanged,
    KeptPrevious,
}

struct ActiveWatcher {
    _watcher: RecommendedWatcher,
    cancel: CancellationToken,
    _reconciler: JoinHandle<()>,
}

#[derive(Default)]
struct WatchState {
    subscribers: Vec<Arc<dyn ConfigSubscriber>>,
    active: Option<ActiveWatcher>,
}

/// Cached configuration file with change fan-out.
///
/// The cache only ever holds a fully parsed document and is replaced as a whole,
/// so readers see either the previous or the next document. Failed reads and
/// parses are logged and leave the cache untouched.
pub struct ConfigStore {
    path: PathBuf,
    file_watching: bool,
    cache: RwLock<Option<Arc<ConfigDocument>>>,
    watch: Mutex<WatchState>,
    reconcile_lock: tokio::sync::Mutex<()>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self::build(path.into(), true))
    }

    pub fn with_default_path() -> Arc<Self> {
        Self::new(DEFAULT_CONFIG_PATH)
    }

    /// Store whose `watch` only registers subscribers; changes are applied by
    /// calling [`ConfigStore::reconcile`] explicitly.
    pub fn without_file_watching(path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self::build(path.into(), false))
    }

    fn build(path: PathBuf, file_watching: bool) -> Self {
        Self {
            path,
            file_watching,
            cache: RwLock::new(None),
            watch: Mutex::new(WatchState::default()),
            reconcile_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.read().expect("lock poisoned").is_some()
    }

    pub fn cached(&self) -> Option<Arc<ConfigDocument>> {
        self.cache.read().expect("lock poisoned").clone()
    }

    /// Reads and parses the file, replacing the cache on success.
    pub fn load(&self) -> Option<Arc<ConfigDocument>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(
                    target: "config",
                    path = %self.path.display(),
                    error = %err,
                    "config_file_unreadable"
                );
                return None;
            }
        };

        let document = Arc::new(parse_document(&self.path, &content)?);
        self.replace_cache(Arc::clone(&document));
        tracing::info!(
            target: "config",
            path = %self.path.display(),
            fingerprint = %document.fingerprint,
            "config_loaded"
        );
        Some(document)
    }

    pub fn get(&self) -> Option<Arc<ConfigDocument>> {
        if let Some(cached) = self.cached() {
            return Some(cached);
        }
        self.load()
    }

    /// Forces a fresh disk read regardless of the cache.
    pub fn reload(&self) -> Option<Arc<ConfigDocument>> {
        self.load()
    }

    pub fn subscriber_count(&self) -> usize {
        self.watch.lock().expect("lock poisoned").subscribers.len()
    }

    pub fn is_watching(&self) -> bool {
        self.watch.lock().expect("lock poisoned").active.is_some()
    }

    /// Registers `subscriber`; the first registration also starts the file watcher.
    pub fn watch(self: &Arc<Self>, subscriber: Arc<dyn ConfigSubscriber>) {
        let mut state = self.watch.lock().expect("lock poisoned");
        state.subscribers.push(subscriber);
        if state.active.is_some() || !self.file_watching {
            return;
        }

        match self.start_watcher() {
            Ok(active) => {
                tracing::info!(
                    target: "config",
                    path = %self.path.display(),
                    "config_watch_started"
                );
                state.active = Some(active);
            }
            Err(reason) => {
                tracing::warn!(
                    target: "config",
                    path = %self.path.display(),
                    reason = %reason,
                    "config_watch_unavailable"
                );
            }
        }
    }

    /// Stops the watcher and forgets every subscriber.
    pub fn unwatch(&self) {
        let mut state = self.watch.lock().expect("lock poisoned");
        if let Some(active) = state.active.take() {
            active.cancel.cancel();
            tracing::info!(target: "config", path = %self.path.display(), "config_watch_stopped");
        }
        state.subscribers.clear();
    }

    /// Applies one "file changed" signal: reload, swap, notify.
    ///
    /// Calls are serialized, so a second signal starts only after the previous
    /// one finished notifying every subscriber.
    pub async fn reconcile(&self) -> ReloadOutcome {
        let _guard = self.reconcile_lock.lock().await;
        let previous = self.cached();

        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(
                    target: "config",
                    path = %self.path.display(),
                    error = %err,
                    "config_reload_failed_keeping_previous"
                );
                return ReloadOutcome::KeptPrevious;
            }
        };

        let Some(document) = parse_document(&self.path, &content) else {
            tracing::warn!(
                target: "config",
                path = %self.path.display(),
                "config_reload_failed_keeping_previous"
            );
            return ReloadOutcome::KeptPrevious;
        };

        if previous
            .as_ref()
            .is_some_and(|previous| previous.fingerprint == document.fingerprint)
        {
            tracing::debug!(target: "config", path = %self.path.display(), "config_unchanged");
            return ReloadOutcome::Unchanged;
        }

        let document = Arc::new(document);
        self.replace_cache(Arc::clone(&document));
        tracing::info!(
            target: "config",
            path = %self.path.display(),
            fingerprint = %document.fingerprint,
            "config_reloaded"
        );

        let notified = self.notify_subscribers(&document, previous.as_ref());
        ReloadOutcome::Applied { notified }
    }

    fn replace_cache(&self, document: Arc<ConfigDocument>) {
        *self.cache.write().expect("lock poisoned") = Some(document);
    }

    fn notify_subscribers(
        &self,
        document: &Arc<ConfigDocument>,
        previous: Option<&Arc<ConfigDocument>>,
    ) -> usize {
        let subscribers = self
            .watch
            .lock()
            .expect("lock poisoned")
            .subscribers
            .clone();

        let mut delivered = 0;
        for (index, subscriber) in subscribers.iter().enumerate() {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                subscriber.on_config_changed(document, previous)
            }));
            match outcome {
                Ok(()) => delivered += 1,
                Err(_) => tracing::error!(
                    target: "config",
                    subscriber = index,
                    "config_subscriber_panicked"
                ),
            }
        }
        delivered
    }

    fn start_watcher(self: &Arc<Self>) -> Result<ActiveWatcher, String> {
        if !self.path.exists() {
            return Err("config file does not exist; subscriber registered without watching".to_string());
        }
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| "no async runtime; subscriber registered without watching".to_string())?;

        let file_name = self
            .path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| "config path has no file name".to_string())?;
        let watch_dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (signal_tx, mut signal_rx) = mpsc::channel::<()>(RELOAD_SIGNAL_CAPACITY);
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| {
                let Ok(event) = result else {
                    return;
                };
                if matches!(event.kind, EventKind::Access(_)) {
                    return;
                }
                let touches_config = event
                    .paths
                    .iter()
                    .any(|path| path.file_name() == Some(file_name.as_os_str()));
                if touches_config {
                    // A full queue already guarantees another reload.
                    signal_tx.try_send(()).ok();
                }
            },
            notify::Config::default(),
        )
        .map_err(|err| format!("failed to create file watcher: {err}"))?;
        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|err| format!("failed to watch {}: {err}", watch_dir.display()))?;

        let cancel = CancellationToken::new();
        let reconciler_cancel = cancel.clone();
        let store: Weak<ConfigStore> = Arc::downgrade(self);
        let reconciler = runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = reconciler_cancel.cancelled() => break,
                    signal = signal_rx.recv() => {
                        if signal.is_none() {
                            break;
                        }
                        let Some(store) = store.upgrade() else {
                            break;
                        };
                        let outcome = store.reconcile().await;
                        tracing::debug!(target: "config", outcome = ?outcome, "config_change_reconciled");
                    }
                }
            }
        });

        Ok(ActiveWatcher {
            _watcher: watcher,
            cancel,
            _reconciler: reconciler,
        })
    }
}

impl Drop for ConfigStore {
    fn drop(&mut self) {
        if let Ok(state) = self.watch.get_mut()
            && let Some(active) = state.active.take()
        {
            active.cancel.cancel();
        }
    }
}

/// Parses by extension: `.yaml`/`.yml` as YAML, everything else as JSON5.
pub fn parse_document(path: &Path, content: &str) -> Option<ConfigDocument> {
    let is_yaml = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| matches!(extension, "yaml" | "yml"));

    let parsed: Result<Value, String> = if is_yaml {
        serde_yaml::from_str(content).map_err(|err| err.to_string())
    } else {
        json5::from_str(content).map_err(|err| err.to_string())
    };

    let value = match parsed {
        Ok(value) if value.is_object() => value,
        Ok(_) => {
            tracing::warn!(
                target: "config",
                path = %path.display(),
                "config_root_not_a_mapping"
            );
            return None;
        }
        Err(err) => {
            tracing::warn!(
                target: "config",
                path = %path.display(),
                error = %err,
                "config_parse_failed"
            );
            return None;
        }
    };

    Some(ConfigDocument {
        value,
        path: path.to_path_buf(),
        fingerprint: fingerprint(content),
        loaded_at: OffsetDateTime::now_utc(),
    })
}

fn fingerprint(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}
