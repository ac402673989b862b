use anyhow::Context;
use mc_core::{config::Config, io, paths, Store};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    let project_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mission-control".to_string());

    println!("Initializing Mission Control in: {}", root.display());

    let mc_dir = paths::mc_dir(root);
    io::ensure_dir(&mc_dir).with_context(|| format!("failed to create {}", mc_dir.display()))?;

    if Config::new(&project_name)
        .save_if_missing(root)
        .context("failed to write config.yaml")?
    {
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }
    let config = Config::load(root).context("failed to read config.yaml")?;

    // Opening the store creates the data and lock directories.
    let data_dir = config.data_dir(root);
    Store::open(&data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;
    println!("  data:    {}", data_dir.display());

    println!("\nMission Control initialized. Next: mc serve");
    Ok(())
}
