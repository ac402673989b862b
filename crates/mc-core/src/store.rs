//! Versioned JSON document store.
//!
//! One pretty-printed JSON file per key under the data directory. Every
//! successful write rotates a revision nonce kept in `.locks/<key>.rev`; a
//! document's version is the hash of its bytes and that nonce.
//!
//! Writers serialize per key through an in-process mutex and an exclusive
//! advisory lock on `.locks/<key>.lock`, so the compare-and-write is atomic
//! across threads and processes. Readers hold a shared lock on the same file
//! only while reading the document and its nonce, so a version always pairs
//! bytes and nonce from the same write. No lock is held between a caller's
//! read and its conditional write.

use crate::documents::{self, Document};
use crate::error::{McError, Result};
use crate::retry::{self, RetryPolicy};
use crate::version::Version;
use crate::{io, merge, paths};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone)]
pub struct Store {
    data_dir: PathBuf,
    key_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl Store {
    /// Open (and create if needed) a store rooted at `data_dir`.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        io::ensure_dir(&paths::locks_dir(&data_dir))?;
        Ok(Self {
            data_dir,
            key_locks: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    // -----------------------------------------------------------------------
    // Versions and reads
    // -----------------------------------------------------------------------

    /// Current version of `key`, or [`Version::absent`] if nothing was written.
    pub fn get_version(&self, key: &str) -> Result<Version> {
        paths::validate_key(key)?;
        Ok(self
            .read_raw(key)?
            .map(|(_, v)| v)
            .unwrap_or_else(Version::absent))
    }

    /// Document at `key`, or the key's empty default when absent.
    pub fn read_value(&self, key: &str) -> Result<Value> {
        Ok(self.read_versioned(key)?.0)
    }

    /// Document and version taken from the same bytes.
    pub fn read_versioned(&self, key: &str) -> Result<(Value, Version)> {
        paths::validate_key(key)?;
        match self.read_raw(key)? {
            Some((bytes, version)) => Ok((parse(key, &bytes)?, version)),
            None => Ok((documents::empty_for_key(key), Version::absent())),
        }
    }

    /// Document at `key` as `T`, or `default` when absent.
    pub fn read<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        paths::validate_key(key)?;
        match self.read_raw(key)? {
            Some((bytes, _)) => parse(key, &bytes),
            None => Ok(default),
        }
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Store `value` under `key`.
    ///
    /// With `expected`, the write only happens if the stored version still
    /// equals it; otherwise [`McError::VersionConflict`] and nothing changes.
    /// `Some(&Version::absent())` means "create, but only if missing".
    /// `None` writes unconditionally.
    pub fn write<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        expected: Option<&Version>,
    ) -> Result<Version> {
        paths::validate_key(key)?;
        let mut bytes = serde_json::to_vec_pretty(value)?;
        bytes.push(b'\n');

        self.with_key_lock(key, || {
            let current = self.current_version(key)?;
            if let Some(expected) = expected {
                if *expected != current {
                    tracing::info!(key, %expected, actual = %current, "rejected stale write");
                    return Err(McError::VersionConflict {
                        key: key.to_string(),
                        expected: expected.to_string(),
                        actual: current.to_string(),
                    });
                }
            }

            let nonce = uuid::Uuid::new_v4().to_string();
            io::atomic_write(&paths::rev_path(&self.data_dir, key), nonce.as_bytes())?;
            io::atomic_write(&paths::document_path(&self.data_dir, key), &bytes)?;

            let version = Version::of(&bytes, nonce.as_bytes());
            tracing::debug!(key, %version, conditional = expected.is_some(), "document written");
            Ok(version)
        })
    }

    /// Like [`Store::write`] for raw JSON, but the value must keep the shape
    /// registered for `key` (objects or arrays for unregistered keys).
    pub fn write_checked(
        &self,
        key: &str,
        value: &Value,
        expected: Option<&Version>,
    ) -> Result<Version> {
        paths::validate_key(key)?;
        documents::validate_for_key(key, value)?;
        self.write(key, value, expected)
    }

    /// Deep-merge `patch` into the document at `key` and write it back.
    ///
    /// The write is always conditional: on the caller's `expected` version if
    /// given, else on the version this call read. Callers without a version
    /// should wrap this in [`retry::with_retry`].
    pub fn patch(
        &self,
        key: &str,
        patch: &Value,
        expected: Option<&Version>,
    ) -> Result<(Value, Version)> {
        let (current, read_version) = self.read_versioned(key)?;
        let guard = expected.unwrap_or(&read_version);
        if *guard != read_version {
            return Err(McError::VersionConflict {
                key: key.to_string(),
                expected: guard.to_string(),
                actual: read_version.to_string(),
            });
        }
        let merged = merge::merged(&current, patch);
        documents::validate_for_key(key, &merged)?;
        let version = self.write(key, &merged, Some(guard))?;
        Ok((merged, version))
    }

    /// Append `entry` to the array at `key`, keeping the newest `max_len`
    /// entries. A missing document starts a new array; any other stored
    /// shape is [`McError::NotAnArray`]. Unconditional: a racing append may
    /// be lost.
    pub fn append_trimmed<T: Serialize>(
        &self,
        key: &str,
        entry: &T,
        max_len: usize,
    ) -> Result<Version> {
        paths::validate_key(key)?;
        let mut items = match self.read_raw(key)? {
            None => Vec::new(),
            Some((bytes, _)) => match parse::<Value>(key, &bytes)? {
                Value::Array(items) => items,
                _ => return Err(McError::NotAnArray(key.to_string())),
            },
        };
        items.push(serde_json::to_value(entry)?);
        if items.len() > max_len {
            let excess = items.len() - max_len;
            items.drain(..excess);
        }
        self.write(key, &items, None)
    }

    // -----------------------------------------------------------------------
    // Typed documents
    // -----------------------------------------------------------------------

    pub fn load<D: Document>(&self) -> Result<D> {
        self.read(D::KEY, D::default())
    }

    pub fn load_versioned<D: Document>(&self) -> Result<(D, Version)> {
        paths::validate_key(D::KEY)?;
        match self.read_raw(D::KEY)? {
            Some((bytes, version)) => Ok((parse(D::KEY, &bytes)?, version)),
            None => Ok((D::default(), Version::absent())),
        }
    }

    pub fn save<D: Document>(&self, doc: &D, expected: Option<&Version>) -> Result<Version> {
        self.write(D::KEY, doc, expected)
    }

    /// Read-modify-write `D` under `policy`, retrying on conflict. `f` runs
    /// once per attempt against a freshly loaded document.
    pub fn update<D, R, F>(&self, policy: &RetryPolicy, mut f: F) -> Result<(R, Version)>
    where
        D: Document,
        F: FnMut(&mut D) -> Result<R>,
    {
        retry::with_retry(policy, || {
            let (mut doc, version) = self.load_versioned::<D>()?;
            let out = f(&mut doc)?;
            let new_version = self.save(&doc, Some(&version))?;
            Ok((out, new_version))
        })
    }

    // -----------------------------------------------------------------------
    // Listing
    // -----------------------------------------------------------------------

    /// Keys of all stored documents, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let entries = match std::fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if paths::validate_key(name).is_ok() {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Document bytes and version, read under a shared lock on the key.
    fn read_raw(&self, key: &str) -> Result<Option<(Vec<u8>, Version)>> {
        let lock_file = self.open_lock_file(key)?;
        FileExt::lock_shared(&lock_file)?;
        let result = self.read_raw_unlocked(key);
        FileExt::unlock(&lock_file)?;
        result
    }

    /// Caller must hold the key's lock.
    fn read_raw_unlocked(&self, key: &str) -> Result<Option<(Vec<u8>, Version)>> {
        let Some(bytes) = io::read_optional(&paths::document_path(&self.data_dir, key))? else {
            return Ok(None);
        };
        // Hand-placed documents have no nonce yet.
        let nonce = io::read_optional(&paths::rev_path(&self.data_dir, key))?.unwrap_or_default();
        let version = Version::of(&bytes, &nonce);
        Ok(Some((bytes, version)))
    }

    fn current_version(&self, key: &str) -> Result<Version> {
        Ok(self
            .read_raw_unlocked(key)?
            .map(|(_, v)| v)
            .unwrap_or_else(Version::absent))
    }

    fn open_lock_file(&self, key: &str) -> Result<std::fs::File> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(paths::lock_path(&self.data_dir, key))?;
        Ok(file)
    }

    fn with_key_lock<R>(&self, key: &str, f: impl FnOnce() -> Result<R>) -> Result<R> {
        let slot = {
            let mut locks = self.key_locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(key.to_string()).or_default().clone()
        };
        let _local = slot.lock().unwrap_or_else(PoisonError::into_inner);

        let lock_file = self.open_lock_file(key)?;
        FileExt::lock_exclusive(&lock_file)?;
        let result = f();
        FileExt::unlock(&lock_file)?;
        result
    }
}

fn parse<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|source| McError::Parse {
        key: key.to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
