use crate::config::Config;
use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::Args;
use colored::Colorize;
use formsmith_workspace::{FileStorage, StorageProvider};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Storage directory (overrides config)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

pub fn list(args: ListArgs, cwd: &Path) -> Result<()> {
    let dir = match args.dir {
        Some(dir) => dir,
        None => Config::load(cwd)?.get_storage_dir(cwd),
    };

    let storage = FileStorage::new(&dir);
    let summaries = storage.list()?;

    if summaries.is_empty() {
        println!("{} No forms in {}", "⚠️".yellow(), dir.display());
        return Ok(());
    }

    println!("{}", format!("📋 {} forms in {}", summaries.len(), dir.display()).bright_blue().bold());
    for summary in summaries {
        let updated = Utc
            .timestamp_millis_opt(summary.updated_at)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| summary.updated_at.to_string());

        println!(
            "  {}  {}  {}",
            summary.form_id.dimmed(),
            updated,
            summary.form_name.bright_white()
        );
    }

    Ok(())
}
