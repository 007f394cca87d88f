//! Config command - show effective configuration and file locations

use std::path::Path;

use cardsync_core::{Config, Secrets};
use clap::Args;

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Create a secrets file template with restrictive permissions
    #[arg(long)]
    pub init_secrets: bool,
}

impl ConfigArgs {
    /// Execute the config command
    pub fn execute(&self, config: &Config, config_path: Option<&Path>) -> anyhow::Result<()> {
        if self.init_secrets {
            let path = Secrets::create_template()?;
            println!("Created secrets template at {}", path.display());
            return Ok(());
        }

        println!("Cardsync Configuration");
        println!("======================");
        println!();
        println!("{}", config.to_toml()?);

        let config_path = config_path
            .map(Path::to_path_buf)
            .or_else(Config::default_config_path);
        if let Some(path) = config_path {
            println!("Config file: {}", path.display());
            if path.exists() {
                println!("  (exists)");
            } else {
                println!("  (not found - using defaults)");
            }
        }

        if let Some(path) = Secrets::default_secrets_path() {
            println!("Secrets file: {}", path.display());
            if !path.exists() {
                println!("  (not found - run `cardsync config --init-secrets`)");
            }
        }

        if let Some(path) = config.sync.state_db_path() {
            println!(
                "State cache: {}{}",
                path.display(),
                if config.sync.use_state { "" } else { " (disabled)" }
            );
        }

        let secrets = Secrets::load()?;
        println!();
        println!("Credentials:");
        for (name, present) in [
            ("GITHUB_TOKEN", secrets.github_token().is_some()),
            ("TRELLO_KEY", secrets.trello_key().is_some()),
            ("TRELLO_TOKEN", secrets.trello_token().is_some()),
        ] {
            println!("  {}: {}", name, if present { "set" } else { "missing" });
        }

        Ok(())
    }
}
