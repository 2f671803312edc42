pub mod export;
pub mod import;
pub mod init;
pub mod list;
pub mod migrate;
pub mod validate;

pub use export::{export, ExportArgs};
pub use import::{import, ImportArgs};
pub use init::{init, InitArgs};
pub use list::{list, ListArgs};
pub use migrate::{migrate, MigrateArgs};
pub use validate::{validate, ValidateArgs};

use anyhow::{Context, Result};
use colored::Colorize;
use formsmith_editor::{Clock, Millis, SystemClock};
use std::fs;
use std::path::Path;

pub(crate) fn now_ms() -> Millis {
    SystemClock.now_ms()
}

pub(crate) fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))
}

/// Write to `out`, or to stdout when no path is given
pub(crate) fn write_output(out: Option<&Path>, content: &str) -> Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, content).with_context(|| format!("Cannot write {}", path.display()))?;
            eprintln!("  {} Wrote {}", "✓".green(), path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}
