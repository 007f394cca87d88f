//! GitHub API client using octocrab and the GraphQL endpoint

use cardsync_core::config::GitHubConfig;
use octocrab::Octocrab;
use tracing::{debug, info};
use url::Url;

use crate::{Error, Result};

const USER_AGENT: &str = concat!("cardsync/", env!("CARGO_PKG_VERSION"));

/// GitHub API client scoped to one user and optionally one organization
pub struct GitHubClient {
    client: Octocrab,
    http: reqwest::Client,
    token: String,
    graphql_url: Url,
    user: String,
    org: Option<String>,
}

impl GitHubClient {
    /// Create a client for the configured user
    ///
    /// When no user is configured the login is resolved from the token.
    pub async fn connect(token: impl Into<String>, config: &GitHubConfig) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::Auth(
                "GitHub token not found. Set GITHUB_TOKEN environment variable \
                 or add token to ~/.config/cardsync/secrets.toml"
                    .to_string(),
            ));
        }

        let graphql_url = graphql_url(&config.api_url)?;

        let client = Octocrab::builder()
            .personal_token(token.clone())
            .base_uri(config.api_url.as_str())
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", config.api_url, e)))?
            .build()
            .map_err(|e| Error::Auth(format!("Failed to create GitHub client: {}", e)))?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;

        let user = match &config.user {
            Some(user) if !user.trim().is_empty() => user.trim().to_string(),
            _ => {
                debug!("Resolving GitHub login from token");
                client.current().user().await?.login
            }
        };

        info!(user = %user, org = ?config.org, "Created GitHub client");

        Ok(Self {
            client,
            http,
            token,
            graphql_url,
            user,
            org: config.org.clone().filter(|o| !o.trim().is_empty()),
        })
    }

    /// Login of the user whose issues are synced
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Organization searches are restricted to, if any
    pub fn org(&self) -> Option<&str> {
        self.org.as_deref()
    }

    /// Get the underlying octocrab client
    pub fn client(&self) -> &Octocrab {
        &self.client
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }

    pub(crate) fn graphql_endpoint(&self) -> &Url {
        &self.graphql_url
    }

    /// Test the connection by fetching the authenticated user
    pub async fn test_connection(&self) -> Result<String> {
        debug!("Testing GitHub connection");

        let login = self
            .client
            .current()
            .user()
            .await
            .map_err(|e| match e {
                octocrab::Error::GitHub { source, .. }
                    if source.message.contains("Bad credentials") =>
                {
                    Error::Auth("Invalid GitHub token".to_string())
                }
                other => Error::Api(other),
            })?
            .login;

        info!(login = %login, "GitHub connection successful");
        Ok(login)
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("user", &self.user)
            .field("org", &self.org)
            .field("graphql_url", &self.graphql_url.as_str())
            .finish_non_exhaustive()
    }
}

/// GraphQL endpoint for a REST API base URL
///
/// `https://api.github.com` maps to `https://api.github.com/graphql`;
/// Enterprise `https://host/api/v3` maps to `https://host/api/graphql`.
fn graphql_url(api_url: &str) -> Result<Url> {
    let base = Url::parse(api_url).map_err(|e| Error::InvalidUrl(format!("{}: {}", api_url, e)))?;
    if base.cannot_be_a_base() {
        return Err(Error::InvalidUrl(api_url.to_string()));
    }
    base.join("graphql")
        .map_err(|e| Error::InvalidUrl(format!("{}: {}", api_url, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_url_public() {
        let url = graphql_url("https://api.github.com").unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/graphql");
    }

    #[test]
    fn test_graphql_url_enterprise() {
        let url = graphql_url("https://github.example.com/api/v3").unwrap();
        assert_eq!(url.as_str(), "https://github.example.com/api/graphql");
    }

    #[test]
    fn test_graphql_url_invalid() {
        assert!(matches!(graphql_url("not a url"), Err(Error::InvalidUrl(_))));
        assert!(matches!(graphql_url("mailto:me@example.com"), Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_empty_token_rejected() {
        let err = GitHubClient::connect("  ", &GitHubConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(_)));
    }
}
