use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use mc_core::config::{Config, WarnLevel};
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show the effective configuration
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(root, json),
        ConfigSubcommand::Validate => validate(root, json),
    }
}

fn show(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load_or_default(root).context("failed to load config")?;
    let data_dir = config.data_dir(root);

    if json {
        let mut value = serde_json::to_value(&config)?;
        value["data_dir"] = serde_json::json!(data_dir);
        print_json(&value)?;
    } else {
        println!("project:        {}", config.project.name);
        println!("data dir:       {}", data_dir.display());
        println!(
            "retry:          {} retries, {}ms base delay",
            config.retry.max_retries, config.retry.base_delay_ms
        );
        println!("feed interval:  {}ms", config.feed.poll_interval_ms);
        println!("activity cap:   {} entries", config.activity.max_entries);
    }
    Ok(())
}

fn validate(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let warnings = config.validate();

    if json {
        print_json(&serde_json::json!({ "warnings": warnings }))?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config validation found errors");
    }
    Ok(())
}
