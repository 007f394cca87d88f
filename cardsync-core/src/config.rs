//! Configuration management for cardsync
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (CARDSYNC_*)
//! 3. Config file (~/.config/cardsync/config.toml)
//! 4. Default values

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, RelationshipActions, Result};

/// GitHub-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Login of the user whose issues are synced; resolved from the token when absent
    pub user: Option<String>,

    /// Restrict searches to one organization
    pub org: Option<String>,

    /// Base URL of the API
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            user: None,
            org: None,
            api_url: "https://api.github.com".to_string(),
        }
    }
}

/// Trello-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrelloConfig {
    /// Name of the board to sync onto
    pub board: String,

    /// Name of the card whose labels define the label map
    pub label_card: Option<String>,

    /// Explicit label name to ID map; takes precedence over the label card
    pub labels: HashMap<String, String>,

    /// Minimum interval between requests
    #[serde(with = "humantime_serde")]
    pub throttle: Duration,

    /// Longest description or comment the board accepts
    pub max_text_length: usize,

    /// Base URL of the API
    pub api_url: String,
}

impl Default for TrelloConfig {
    fn default() -> Self {
        Self {
            board: String::new(),
            label_card: None,
            labels: HashMap::new(),
            throttle: Duration::from_millis(100),
            max_text_length: 16384,
            api_url: "https://api.trello.com/1".to_string(),
        }
    }
}

/// Sync run settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Archive cards whose issues left the open set
    pub close: bool,

    /// Keep a local state cache between runs
    pub use_state: bool,

    /// Location of the state cache; defaults to ~/.cache/cardsync/state.db
    pub state_db: Option<PathBuf>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            close: true,
            use_state: true,
            state_db: None,
        }
    }
}

impl SyncSettings {
    /// Effective state cache path
    pub fn state_db_path(&self) -> Option<PathBuf> {
        self.state_db.clone().or_else(default_state_db_path)
    }
}

/// Default state cache location
pub fn default_state_db_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join("cardsync").join("state.db"))
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// GitHub configuration
    pub github: GitHubConfig,

    /// Trello configuration
    pub trello: TrelloConfig,

    /// Sync settings
    pub sync: SyncSettings,

    /// Lists and labels per relationship
    pub relationships: RelationshipActions,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to render config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/cardsync/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cardsync").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - CARDSYNC_BOARD: Trello board name
    /// - CARDSYNC_GITHUB_USER: GitHub login
    /// - CARDSYNC_GITHUB_ORG: GitHub organization
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(board) = std::env::var("CARDSYNC_BOARD") {
            self.trello.board = board;
        }

        if let Ok(user) = std::env::var("CARDSYNC_GITHUB_USER") {
            self.github.user = Some(user);
        }

        if let Ok(org) = std::env::var("CARDSYNC_GITHUB_ORG") {
            self.github.org = Some(org);
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, no_close: bool, no_state: bool, state_db: Option<PathBuf>) -> Self {
        if no_close {
            self.sync.close = false;
        }

        if no_state {
            self.sync.use_state = false;
        }

        if let Some(path) = state_db {
            self.sync.state_db = Some(path);
        }

        self
    }

    /// Load configuration from `path` (or the default location) with env overrides
    pub fn load_with_overrides(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };
        Ok(config.with_env_overrides())
    }

    /// Check the settings that are required before connecting anywhere
    pub fn validate(&self) -> Result<()> {
        if self.trello.board.trim().is_empty() {
            return Err(Error::Config("trello.board is not set".to_string()));
        }
        if self.trello.labels.is_empty() && self.trello.label_card.is_none() {
            return Err(Error::Config(
                "Set either trello.labels or trello.label_card to resolve label names".to_string(),
            ));
        }
        if self.relationships.is_empty() {
            return Err(Error::Config(
                "No relationships configured; add [relationships.assignee] or [relationships.mention]"
                    .to_string(),
            ));
        }
        if self.trello.max_text_length == 0 {
            return Err(Error::Config(
                "trello.max_text_length must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
