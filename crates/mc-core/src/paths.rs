use crate::error::{McError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const MC_DIR: &str = ".mission-control";
pub const DATA_DIR: &str = ".mission-control/data";
pub const CONFIG_FILE: &str = ".mission-control/config.yaml";

/// Lock files and revision nonces live here, next to the documents.
pub const LOCKS_DIR: &str = ".locks";

pub const LOCK_EXT: &str = "lock";
pub const REV_EXT: &str = "rev";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn mc_dir(root: &Path) -> PathBuf {
    root.join(MC_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn default_data_dir(root: &Path) -> PathBuf {
    root.join(DATA_DIR)
}

pub fn document_path(data_dir: &Path, key: &str) -> PathBuf {
    data_dir.join(key)
}

pub fn locks_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(LOCKS_DIR)
}

pub fn lock_path(data_dir: &Path, key: &str) -> PathBuf {
    locks_dir(data_dir).join(format!("{key}.{LOCK_EXT}"))
}

pub fn rev_path(data_dir: &Path, key: &str) -> PathBuf {
    locks_dir(data_dir).join(format!("{key}.{REV_EXT}"))
}

// ---------------------------------------------------------------------------
// Key validation
// ---------------------------------------------------------------------------

static KEY_RE: OnceLock<Regex> = OnceLock::new();

fn key_re() -> &'static Regex {
    KEY_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_\-.]*\.json$").unwrap())
}

/// Keys are bare file names: no separators, no leading dot, `.json` suffix.
pub fn validate_key(key: &str) -> Result<()> {
    if key.len() > 128 || key.contains("..") || !key_re().is_match(key) {
        return Err(McError::InvalidKey(key.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
