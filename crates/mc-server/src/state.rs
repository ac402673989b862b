use crate::feed::ChangeFeed;
use mc_core::config::Config;
use mc_core::{RetryPolicy, Store};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub config: Arc<Config>,
    pub store: Store,
    pub feed: ChangeFeed,
}

impl AppState {
    /// Load the project config (defaults if uninitialized) and open its store.
    pub fn new(root: PathBuf) -> mc_core::Result<Self> {
        let config = Config::load_or_default(&root)?;
        let store = Store::open(config.data_dir(&root))?;
        let feed = ChangeFeed::new(store.clone(), config.feed.poll_interval());
        Ok(Self {
            root,
            config: Arc::new(config),
            store,
            feed,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.config.retry.policy()
    }
}
