//! GitHub GraphQL API support

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::{Error, GitHubClient, Result};

/// GraphQL query response wrapper
#[derive(Debug, Deserialize)]
pub(crate) struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

/// GraphQL error
#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl<T> GraphQLResponse<T> {
    /// The data, or every error message joined
    pub(crate) fn into_data(self) -> Result<T> {
        if let Some(errors) = self.errors.filter(|e| !e.is_empty()) {
            if errors.iter().any(|e| e.kind.as_deref() == Some("RATE_LIMITED")) {
                return Err(Error::RateLimited(errors[0].message.clone()));
            }
            let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
            return Err(Error::GraphQl(messages.join(", ")));
        }

        self.data
            .ok_or_else(|| Error::GraphQl("response missing data".to_string()))
    }
}

impl GitHubClient {
    /// Execute a GraphQL query
    pub(crate) async fn graphql_query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: &serde_json::Value,
    ) -> Result<T> {
        let request_body = json!({
            "query": query,
            "variables": variables,
        });

        debug!(url = %self.graphql_endpoint(), "POST graphql");
        let response = self
            .http()
            .post(self.graphql_endpoint().clone())
            .bearer_auth(self.token())
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let remaining = response
                .headers()
                .get("x-ratelimit-remaining")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response".to_string());
            if remaining.as_deref() == Some("0") {
                return Err(Error::RateLimited(text));
            }
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(Error::Auth("Invalid GitHub token".to_string()));
            }
            return Err(Error::Other(format!(
                "GraphQL request failed with status {}: {}",
                status, text
            )));
        }

        let graphql_response: GraphQLResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::Parse(format!("Failed to parse GraphQL response: {}", e)))?;

        graphql_response.into_data()
    }
}
