//! Config subcommand handlers.

use std::path::Path;

use lyrisync_config::{ConfigError, init_settings, load_settings_from};

use crate::cli::ConfigCommand;
use crate::error::CliError;

pub fn handle(command: &ConfigCommand, path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommand::Path => {
            println!("{}", path.display());
        }

        ConfigCommand::Show => {
            let settings = load_settings_from(path)?;
            let rendered = toml::to_string_pretty(&settings).map_err(ConfigError::from)?;
            print!("{rendered}");
        }

        ConfigCommand::Check => {
            let settings = load_settings_from(path)?;
            settings.validate()?;
            let source = if path.exists() {
                path.display().to_string()
            } else {
                "built-in defaults".to_owned()
            };
            println!("Settings OK ({source})");
        }

        ConfigCommand::Init { force } => {
            init_settings(path, *force)?;
            println!("Wrote default settings to {}", path.display());
        }
    }
    Ok(())
}
