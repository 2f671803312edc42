use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use formsmith_editor::{FieldRegistry, FormStore, SystemClock};
use formsmith_workspace::{
    envelope_from_store, FileStorage, ImportSession, ImportState, StorageProvider,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Field schema or saved form to import
    pub file: PathBuf,

    /// Output file (defaults to the configured storage directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Form name, overriding the one in the input
    #[arg(short, long)]
    pub name: Option<String>,
}

pub fn import(args: ImportArgs, cwd: &Path) -> Result<()> {
    let config = Config::load(cwd)?;
    let source = super::read_source(&args.file)?;
    let now = super::now_ms();

    let mut store = FormStore::with_clock(
        FieldRegistry::with_builtin_types(),
        &config.editor,
        Arc::new(SystemClock),
    );
    let mut session = ImportSession::new();

    match session.begin(&source, now) {
        ImportState::PendingConfirmation(candidate) => {
            for name in &candidate.duplicate_names {
                println!("  {} duplicate field name {}", "⚠".yellow(), name.bright_white());
            }
        }
        ImportState::Failed(err) => return Err(anyhow!("{}", err)),
        other => return Err(anyhow!("unexpected import state: {}", other.name())),
    }

    session.confirm(&mut store);
    if let Some(name) = args.name {
        store.set_form_name(name);
    }

    let envelope = envelope_from_store(&store, now);
    let json = envelope.to_json_pretty()?;

    match args.output {
        Some(path) => super::write_output(Some(&path), &json)?,
        None => {
            let storage = FileStorage::new(config.get_storage_dir(cwd));
            storage.save(&envelope.form_id, &envelope)?;
            println!(
                "  {} Saved {} as {}",
                "✓".green(),
                envelope.form_name.bright_white(),
                envelope.form_id
            );
        }
    }

    println!("{} Imported {} nodes", "✅".green(), envelope.nodes.len());
    Ok(())
}
