use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Write a configuration file with the default settings")]
    Init {
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show the effective configuration")]
    Show,
}

pub async fn handle_config(
    cmd: ConfigCommand,
    path: &Path,
    format: OutputFormat,
    _verbose: bool,
) -> Result<()> {
    match cmd {
        ConfigCommand::Init { force } => handle_init(path, force, format),
        ConfigCommand::Show => handle_show(path, format),
    }
}

fn handle_init(path: &Path, force: bool, format: OutputFormat) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            path.display()
        );
    }

    Config::default()
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;

    let formatter = get_formatter(format);
    println!(
        "{}",
        formatter
            .format_message(&format!("Created config at: {}", path.display()))
            .trim_end()
    );
    Ok(())
}

fn handle_show(path: &Path, format: OutputFormat) -> Result<()> {
    let config = Config::load(path).with_context(|| format!("failed to load {}", path.display()))?;
    let formatter = get_formatter(format);

    if format == OutputFormat::Text {
        if path.exists() {
            println!("# Config file: {}", path.display());
        } else {
            println!("# Config file: {} (not found, using defaults)", path.display());
        }
    }
    println!("{}", formatter.format_config(&config).trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config/default.yaml");

        handle_init(&path, false, OutputFormat::Json).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.code_processing.chunking.chunk_size, 1500);
    }

    #[test]
    fn test_init_refuses_overwrite_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("codekb.toml");
        std::fs::write(&path, "[project]\nagent_name = \"Gaudi\"\n").unwrap();

        assert!(handle_init(&path, false, OutputFormat::Text).is_err());
        assert_eq!(Config::load(&path).unwrap().project.agent_name, "Gaudi");

        handle_init(&path, true, OutputFormat::Text).unwrap();
        assert_eq!(Config::load(&path).unwrap().project.agent_name, "Cortex");
    }
}
