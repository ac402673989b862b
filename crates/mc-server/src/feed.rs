//! Change feed: tells subscribers when any stored document's version moves.
//!
//! Polling only runs while someone is listening. The first `subscribe()`
//! starts the poller; dropping the last [`Subscription`] stops it.

use mc_core::{Store, Version};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentChanged {
    pub key: String,
    pub version: Version,
}

#[derive(Clone)]
pub struct ChangeFeed {
    inner: Arc<FeedInner>,
}

struct FeedInner {
    store: Store,
    interval: Duration,
    tx: broadcast::Sender<DocumentChanged>,
    poller: Mutex<Poller>,
}

#[derive(Default)]
struct Poller {
    listeners: usize,
    task: Option<JoinHandle<()>>,
}

impl ChangeFeed {
    pub fn new(store: Store, interval: Duration) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(FeedInner {
                store,
                interval,
                tx,
                poller: Mutex::new(Poller::default()),
            }),
        }
    }

    /// Register a listener. Must be called inside a Tokio runtime.
    pub fn subscribe(&self) -> Subscription {
        let mut poller = self.inner.lock_poller();
        poller.listeners += 1;
        if poller.task.is_none() {
            tracing::debug!("first listener, starting change feed poller");
            poller.task = Some(tokio::spawn(poll(
                self.inner.store.clone(),
                self.inner.interval,
                self.inner.tx.clone(),
            )));
        }
        Subscription {
            rx: self.inner.tx.subscribe(),
            feed: self.inner.clone(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock_poller().listeners
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock_poller().task.is_some()
    }
}

impl FeedInner {
    fn lock_poller(&self) -> std::sync::MutexGuard<'_, Poller> {
        self.poller.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A live registration with the feed. Dropping it unregisters.
pub struct Subscription {
    rx: broadcast::Receiver<DocumentChanged>,
    feed: Arc<FeedInner>,
}

impl Subscription {
    /// Next change, or `None` once the feed is gone.
    pub async fn recv(&mut self) -> Option<DocumentChanged> {
        loop {
            match self.rx.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "change feed subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut poller = self.feed.lock_poller();
        poller.listeners = poller.listeners.saturating_sub(1);
        if poller.listeners == 0 {
            if let Some(task) = poller.task.take() {
                tracing::debug!("last listener gone, stopping change feed poller");
                task.abort();
            }
        }
    }
}

async fn poll(store: Store, interval: Duration, tx: broadcast::Sender<DocumentChanged>) {
    let mut known = match snapshot(&store).await {
        Some(versions) => versions,
        None => BTreeMap::new(),
    };
    loop {
        tokio::time::sleep(interval).await;
        let Some(current) = snapshot(&store).await else {
            continue;
        };
        for (key, version) in &current {
            if known.get(key) != Some(version) {
                let _ = tx.send(DocumentChanged {
                    key: key.clone(),
                    version: version.clone(),
                });
            }
        }
        known = current;
    }
}

async fn snapshot(store: &Store) -> Option<BTreeMap<String, Version>> {
    let store = store.clone();
    let result = tokio::task::spawn_blocking(move || -> mc_core::Result<_> {
        let mut versions = BTreeMap::new();
        for key in store.keys()? {
            versions.insert(key.clone(), store.get_version(&key)?);
        }
        Ok(versions)
    })
    .await;
    match result {
        Ok(Ok(versions)) => Some(versions),
        Ok(Err(e)) => {
            tracing::warn!("change feed could not read versions: {e}");
            None
        }
        Err(e) => {
            tracing::warn!("change feed snapshot task failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn feed(dir: &TempDir) -> (Store, ChangeFeed) {
        let store = Store::open(dir.path().join("data")).unwrap();
        let feed = ChangeFeed::new(store.clone(), Duration::from_millis(20));
        (store, feed)
    }

    #[tokio::test]
    async fn poller_follows_listener_count() {
        let dir = TempDir::new().unwrap();
        let (_store, feed) = feed(&dir);
        assert!(!feed.is_running());

        let a = feed.subscribe();
        let b = feed.subscribe();
        assert_eq!(feed.listener_count(), 2);
        assert!(feed.is_running());

        drop(a);
        assert_eq!(feed.listener_count(), 1);
        assert!(feed.is_running());

        drop(b);
        assert_eq!(feed.listener_count(), 0);
        assert!(!feed.is_running());

        // Restarts on the next subscriber.
        let _c = feed.subscribe();
        assert!(feed.is_running());
    }

    #[tokio::test]
    async fn reports_written_documents() {
        let dir = TempDir::new().unwrap();
        let (store, feed) = feed(&dir);
        let mut sub = feed.subscribe();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let version = store.write("notes.json", &json!({"a": 1}), None).unwrap();
        let change = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("no change reported")
            .expect("feed closed");
        assert_eq!(change.key, "notes.json");
        assert_eq!(change.version, version);
    }
}
