use crate::cmd::open_store;
use crate::output::{print_json, print_table};
use clap::Subcommand;
use mc_core::documents::{ActivityEntry, ActivityLog, Document};
use std::path::Path;

#[derive(Subcommand)]
pub enum ActivitySubcommand {
    /// Record an action in the activity log
    Add {
        actor: String,
        action: String,
        #[arg(long)]
        detail: Option<String>,
    },
    /// Show recent activity, newest first
    List {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

pub fn run(root: &Path, subcmd: ActivitySubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ActivitySubcommand::Add {
            actor,
            action,
            detail,
        } => add(root, actor, action, detail, json),
        ActivitySubcommand::List { limit } => list(root, limit, json),
    }
}

fn add(
    root: &Path,
    actor: String,
    action: String,
    detail: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    if actor.trim().is_empty() || action.trim().is_empty() {
        anyhow::bail!("actor and action must not be empty");
    }
    let (config, store) = open_store(root)?;
    let mut entry = ActivityEntry::new(actor, action);
    if let Some(detail) = detail {
        entry = entry.with_detail(detail);
    }
    let version = store.append_trimmed(ActivityLog::KEY, &entry, config.activity.max_entries)?;

    if json {
        print_json(&serde_json::json!({ "entry": entry, "version": version }))?;
    } else {
        println!("Logged: {} {}", entry.actor, entry.action);
    }
    Ok(())
}

fn list(root: &Path, limit: usize, json: bool) -> anyhow::Result<()> {
    let (_, store) = open_store(root)?;
    let log: ActivityLog = store.load()?;
    let entries: Vec<&ActivityEntry> = log.0.iter().rev().take(limit).collect();

    if json {
        print_json(&serde_json::json!({ "entries": entries }))?;
        return Ok(());
    }

    if entries.is_empty() {
        println!("No activity.");
        return Ok(());
    }
    let rows = entries
        .iter()
        .map(|e| {
            vec![
                e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                e.actor.clone(),
                e.action.clone(),
                e.detail.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["TIME", "ACTOR", "ACTION", "DETAIL"], rows);
    Ok(())
}
