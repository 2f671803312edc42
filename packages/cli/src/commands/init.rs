use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::Path;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory for saved forms
    #[arg(short, long, default_value = ".formsmith/forms")]
    pub storage_dir: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = cwd.join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Formsmith project...".bright_blue().bold());

    // Create storage directory if it doesn't exist
    let storage_dir = cwd.join(&args.storage_dir);
    if !storage_dir.exists() {
        fs::create_dir_all(&storage_dir)?;
        println!("  {} Created {}/", "✓".green(), args.storage_dir);
    }

    let config = Config {
        storage_dir: args.storage_dir.clone(),
        ..Config::default()
    };

    // Write config file
    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: formsmith import schema.json --name \"My form\"");
    println!("  2. Run: formsmith list");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_config() {
        let dir = tempfile::TempDir::new().unwrap();
        init(
            InitArgs {
                storage_dir: "forms".to_string(),
                force: false,
            },
            dir.path(),
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.storage_dir, "forms");
        assert!(dir.path().join("forms").is_dir());
    }

    #[test]
    fn test_init_keeps_existing_config_without_force() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{"storageDir": "mine"}"#).unwrap();

        init(
            InitArgs {
                storage_dir: "other".to_string(),
                force: false,
            },
            dir.path(),
        )
        .unwrap();

        assert_eq!(Config::load(dir.path()).unwrap().storage_dir, "mine");
    }
}
