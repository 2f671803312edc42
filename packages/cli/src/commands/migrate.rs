use anyhow::Result;
use clap::Args;
use colored::Colorize;
use formsmith_workspace::{load_envelope, CURRENT_SCHEMA_VERSION};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Saved form to upgrade
    pub file: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn migrate(args: MigrateArgs, _cwd: &Path) -> Result<()> {
    let source = super::read_source(&args.file)?;
    let envelope = load_envelope(&source, super::now_ms())?;

    eprintln!(
        "{} {} is at schema version {}",
        "🔧".bright_blue(),
        args.file.display(),
        CURRENT_SCHEMA_VERSION
    );

    super::write_output(args.output.as_deref(), &envelope.to_json_pretty()?)
}
