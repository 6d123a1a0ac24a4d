//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use crate::OutputFormat;
use pspnet_core::{ConfigError, PspnetError, TrainingConfig};
use std::path::Path;

/// Handle a CLI subcommand.
pub fn handle_command(
    command: Commands,
    workspace: &Path,
    assignments: &[String],
) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, workspace, assignments),
    }
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    assignments: &[String],
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            match pspnet_core::write_default_config(workspace) {
                Ok(path) => println!("Created default configuration at: {}", path.display()),
                Err(PspnetError::Config(ConfigError::AlreadyExists { path })) => {
                    println!("Configuration file already exists at: {}", path.display())
                }
                Err(e) => return Err(anyhow::anyhow!("Failed to write config: {}", e)),
            }
            Ok(())
        }
        ConfigAction::Show { format } => {
            let config = resolve(workspace, assignments)?;
            println!("{}", render(&config, format)?);
            Ok(())
        }
        ConfigAction::Validate => {
            let config = resolve(workspace, assignments)?;
            if let Some(note) = missing_config_note(workspace) {
                println!("{}", note);
            }
            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration loaded with {} warning(s):", warnings.len());
                for warning in &warnings {
                    println!("  - {}", warning);
                }
            }
            Ok(())
        }
        ConfigAction::Paths => {
            let config = resolve(workspace, assignments)?;
            println!("images:       {}", config.dataset.image_path().display());
            println!("labels:       {}", config.dataset.label_path().display());
            println!("weights dir:  {}", config.hyperparameters.dir_base.display());
            println!("weights file: {}", config.hyperparameters.weights_path.display());
            Ok(())
        }
    }
}

/// Load the layered configuration and apply `--set` assignments on top.
fn resolve(workspace: &Path, assignments: &[String]) -> anyhow::Result<TrainingConfig> {
    let config = pspnet_core::load_config(Some(workspace), None)
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
    if assignments.is_empty() {
        return Ok(config);
    }
    tracing::debug!(count = assignments.len(), "Applying --set assignments");
    config
        .with_assignments(assignments)
        .map_err(|e| anyhow::anyhow!("Invalid --set value: {}", e))
}

/// Note for when neither the user nor the workspace config file exists.
fn missing_config_note(workspace: &Path) -> Option<String> {
    if pspnet_core::config_exists(Some(workspace)) {
        return None;
    }
    Some(format!(
        "No configuration file found, using defaults. Run `pspnet config init` to create {}",
        pspnet_core::config::workspace_config_path(workspace).display()
    ))
}

fn render(config: &TrainingConfig, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Toml => toml::to_string_pretty(config)?,
        OutputFormat::Json => serde_json::to_string_pretty(config)?,
    })
}
