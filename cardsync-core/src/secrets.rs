//! Secrets management for cardsync
//!
//! Secrets are stored separately from configuration to avoid accidental sharing.
//! The secrets file is located at `~/.config/cardsync/secrets.toml` and must have
//! restrictive permissions (0600 on Unix).
//!
//! Loading priority:
//! 1. Environment variables (GITHUB_TOKEN, TRELLO_KEY, TRELLO_TOKEN)
//! 2. Secrets file (~/.config/cardsync/secrets.toml)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

/// Secrets structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Secrets {
    /// GitHub credentials
    pub github: GitHubSecrets,

    /// Trello credentials
    pub trello: TrelloSecrets,
}

/// GitHub-related secrets
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubSecrets {
    /// GitHub Personal Access Token
    pub token: Option<String>,
}

/// Trello-related secrets
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TrelloSecrets {
    /// API key
    pub key: Option<String>,

    /// API token
    pub token: Option<String>,
}

fn trimmed(value: &mut Option<String>) {
    if let Some(v) = value {
        *v = v.trim().to_string();
    }
}

fn pick(env_var: &str, from_file: &Option<String>) -> Option<String> {
    if let Ok(value) = std::env::var(env_var) {
        let value = value.trim().to_string();
        if !value.is_empty() {
            debug!(var = env_var, "Using credential from environment");
            return Some(value);
        }
    }

    from_file.as_ref().filter(|v| !v.is_empty()).cloned()
}

impl Secrets {
    /// Load secrets from the default location
    ///
    /// Returns default (empty) secrets if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_secrets_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load secrets from a specific file with permission checking
    pub fn load_from_file(path: &Path) -> Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let metadata = std::fs::metadata(path).map_err(Error::Io)?;
            let mode = metadata.permissions().mode();

            if mode & 0o077 != 0 {
                return Err(Error::Config(format!(
                    "Secrets file {} has insecure permissions {:o}. \
                     Please run: chmod 600 {}",
                    path.display(),
                    mode & 0o777,
                    path.display()
                )));
            }
        }

        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut secrets: Secrets = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse secrets: {}", e)))?;

        trimmed(&mut secrets.github.token);
        trimmed(&mut secrets.trello.key);
        trimmed(&mut secrets.trello.token);

        debug!(path = %path.display(), "Loaded secrets file");
        Ok(secrets)
    }

    /// Get the default secrets file path
    ///
    /// Returns `~/.config/cardsync/secrets.toml` on Unix
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cardsync").join("secrets.toml"))
    }

    /// GitHub token; GITHUB_TOKEN wins over the secrets file
    pub fn github_token(&self) -> Option<String> {
        pick("GITHUB_TOKEN", &self.github.token)
    }

    /// Trello API key; TRELLO_KEY wins over the secrets file
    pub fn trello_key(&self) -> Option<String> {
        pick("TRELLO_KEY", &self.trello.key)
    }

    /// Trello API token; TRELLO_TOKEN wins over the secrets file
    pub fn trello_token(&self) -> Option<String> {
        pick("TRELLO_TOKEN", &self.trello.token)
    }

    /// Require every credential, naming the missing ones
    pub fn require_all(&self) -> Result<(String, String, String)> {
        let github = self.github_token();
        let key = self.trello_key();
        let token = self.trello_token();

        match (github, key, token) {
            (Some(github), Some(key), Some(token)) => Ok((github, key, token)),
            (github, key, token) => {
                let missing: Vec<&str> = [
                    (github.is_none(), "GITHUB_TOKEN"),
                    (key.is_none(), "TRELLO_KEY"),
                    (token.is_none(), "TRELLO_TOKEN"),
                ]
                .into_iter()
                .filter_map(|(absent, name)| absent.then_some(name))
                .collect();
                Err(Error::Config(format!(
                    "Missing credentials: {} (set them in the environment or {})",
                    missing.join(", "),
                    Self::default_secrets_path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "secrets.toml".to_string())
                )))
            }
        }
    }

    /// Create a template secrets file at the default location
    pub fn create_template() -> Result<PathBuf> {
        let path = Self::default_secrets_path()
            .ok_or_else(|| Error::Config("Could not determine secrets path".to_string()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }

        if path.exists() {
            return Err(Error::Config(format!(
                "Secrets file already exists at {}",
                path.display()
            )));
        }

        let template = r#"# cardsync secrets
# Do not share or commit this file. It must be chmod 600.

[github]
# Personal Access Token with read access to issues
token = ""

[trello]
# From https://trello.com/app-key
key = ""
token = ""
"#;

        std::fs::write(&path, template).map_err(Error::Io)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&path, perms).map_err(Error::Io)?;
        }

        warn!(path = %path.display(), "Created secrets template - please edit and add your credentials");

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_secrets() {
        let secrets = Secrets::default();
        assert!(secrets.github.token.is_none());
        assert!(secrets.trello.key.is_none());
    }

    #[test]
    fn test_parse_secrets() {
        let toml = r#"
[github]
token = "ghp_xxxxxxxxxxxx"

[trello]
key = "abc"
token = "def"
"#;
        let secrets: Secrets = toml::from_str(toml).unwrap();
        assert_eq!(secrets.github.token.as_deref(), Some("ghp_xxxxxxxxxxxx"));
        assert_eq!(secrets.trello.key.as_deref(), Some("abc"));
        assert_eq!(secrets.trello.token.as_deref(), Some("def"));
    }

    #[cfg(unix)]
    #[test]
    fn test_insecure_permissions_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[github]\ntoken = \"test\"").unwrap();
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o644)).unwrap();

        let err = Secrets::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("insecure permissions"));
    }

    #[cfg(unix)]
    #[test]
    fn test_secure_permissions_accepted_and_trimmed() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[trello]\nkey = \"  k3y  \"\ntoken = \"t0k\"").unwrap();
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600)).unwrap();

        let secrets = Secrets::load_from_file(file.path()).unwrap();
        assert_eq!(secrets.trello.key.as_deref(), Some("k3y"));
        assert_eq!(secrets.trello.token.as_deref(), Some("t0k"));
    }

    #[test]
    fn test_empty_file_value_is_absent() {
        // An empty value in the file never counts as a credential
        assert_eq!(pick("CARDSYNC_TEST_UNSET_VARIABLE", &Some(String::new())), None);
        assert_eq!(
            pick("CARDSYNC_TEST_UNSET_VARIABLE", &Some("abc".to_string())),
            Some("abc".to_string())
        );
    }
}
