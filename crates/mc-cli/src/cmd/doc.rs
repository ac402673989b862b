use crate::cmd::open_store;
use crate::output::print_json;
use anyhow::Context;
use mc_core::{with_retry, Version};
use serde_json::Value;
use std::io::Read;
use std::path::Path;

pub fn keys(root: &Path, json: bool) -> anyhow::Result<()> {
    let (_, store) = open_store(root)?;
    let keys = store.keys()?;

    if json {
        print_json(&serde_json::json!({ "keys": keys }))?;
    } else if keys.is_empty() {
        println!("No documents.");
    } else {
        for key in keys {
            println!("{key}");
        }
    }
    Ok(())
}

/// Print a document. In text mode the body goes to stdout and the version
/// to stderr, so the output can be piped straight back into `mc put`.
pub fn get(root: &Path, key: &str, json: bool) -> anyhow::Result<()> {
    let (_, store) = open_store(root)?;
    let (data, version) = store.read_versioned(key)?;

    if json {
        print_json(&serde_json::json!({ "key": key, "version": version, "data": data }))?;
    } else {
        print_json(&data)?;
        eprintln!("version: {version}");
    }
    Ok(())
}

pub fn version(root: &Path, key: &str, json: bool) -> anyhow::Result<()> {
    let (_, store) = open_store(root)?;
    let version = store.get_version(key)?;

    if json {
        print_json(&serde_json::json!({ "key": key, "version": version }))?;
    } else {
        println!("{version}");
    }
    Ok(())
}

pub fn put(
    root: &Path,
    key: &str,
    file: &Path,
    expect: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let (_, store) = open_store(root)?;
    let expected = expect.map(Version::from_token).transpose()?;

    let raw = if file == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?
    };
    let data: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;

    let version = store.write_checked(key, &data, expected.as_ref())?;

    if json {
        print_json(&serde_json::json!({ "key": key, "version": version }))?;
    } else {
        println!("Wrote {key} (version {version})");
    }
    Ok(())
}

/// Deep-merge `patch` into `key`. With `--expect` a stale version fails;
/// without it the patch is re-applied to fresh data on conflict.
pub fn patch(
    root: &Path,
    key: &str,
    patch: &str,
    expect: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let (config, store) = open_store(root)?;
    let expected = expect.map(Version::from_token).transpose()?;
    let patch: Value = serde_json::from_str(patch).context("patch is not valid JSON")?;

    let (data, version) = match expected {
        Some(expected) => store.patch(key, &patch, Some(&expected))?,
        None => with_retry(&config.retry.policy(), || store.patch(key, &patch, None))?,
    };

    if json {
        print_json(&serde_json::json!({ "key": key, "version": version, "data": data }))?;
    } else {
        println!("Patched {key} (version {version})");
    }
    Ok(())
}
