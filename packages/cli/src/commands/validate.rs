use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use formsmith_workspace::{detect, ImportCandidate, ImportPayload, Loader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Saved form, field schema, or a directory of .json files
    pub path: PathBuf,
}

pub fn validate(args: ValidateArgs, _cwd: &Path) -> Result<()> {
    let files = if args.path.is_file() {
        vec![args.path.clone()]
    } else if args.path.is_dir() {
        find_json_files(&args.path)
    } else {
        return Err(anyhow!("Input path does not exist: {}", args.path.display()));
    };

    println!("{}", "🔍 Validating forms...".bright_blue().bold());

    if files.is_empty() {
        println!("{}", "⚠️  No .json files found".yellow());
        return Ok(());
    }

    let loader = Loader::new();
    let now = super::now_ms();
    let mut error_count = 0;

    for file in &files {
        let relative_path = file.strip_prefix(&args.path).unwrap_or(file);
        let outcome = super::read_source(file)
            .and_then(|source| detect(&loader, &source, now).map_err(anyhow::Error::from));

        match outcome {
            Ok(candidate) => {
                println!("  {} {} ({})", "✓".green(), relative_path.display(), describe(&candidate));
                for name in &candidate.duplicate_names {
                    println!("    {} duplicate field name {}", "⚠".yellow(), name.bright_white());
                }
            }
            Err(e) => {
                error_count += 1;
                eprintln!(
                    "  {} {} - {}",
                    "✗".red(),
                    relative_path.display(),
                    e.to_string().red()
                );
            }
        }
    }

    println!();
    if error_count == 0 {
        println!("{} {} files valid", "✅".green(), files.len());
        Ok(())
    } else {
        Err(anyhow!("{} of {} files failed validation", error_count, files.len()))
    }
}

fn describe(candidate: &ImportCandidate) -> String {
    match &candidate.payload {
        ImportPayload::Envelope(envelope) => format!("saved form, {} nodes", envelope.nodes.len()),
        ImportPayload::Schema { fields, .. } => format!("schema, {} top-level fields", fields.len()),
    }
}

fn find_json_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    files.sort();
    files
}
