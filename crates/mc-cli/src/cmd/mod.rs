pub mod activity;
pub mod config;
pub mod doc;
pub mod init;
pub mod serve;
pub mod task;

use anyhow::Context;
use mc_core::config::Config;
use mc_core::Store;
use std::path::Path;

/// Load the project config (defaults when uninitialized) and open its store.
pub fn open_store(root: &Path) -> anyhow::Result<(Config, Store)> {
    let config = Config::load_or_default(root).context("failed to load config")?;
    let data_dir = config.data_dir(root);
    let store = Store::open(&data_dir)
        .with_context(|| format!("failed to open data directory {}", data_dir.display()))?;
    Ok((config, store))
}
