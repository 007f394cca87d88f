//! Issue search and the [`IssueSource`] implementation

use async_trait::async_trait;
use cardsync_core::{Comment, Issue, IssueSource, Relationship};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::{GitHubClient, Result};

const PAGE_SIZE: u32 = 50;

const SEARCH_QUERY: &str = r#"
    query($query: String!, $first: Int!, $after: String) {
        search(query: $query, type: ISSUE, first: $first, after: $after) {
            pageInfo {
                hasNextPage
                endCursor
            }
            nodes {
                ... on Issue {
                    id
                    title
                    body
                    url
                    createdAt
                    repository {
                        name
                    }
                    comments(first: 100) {
                        nodes {
                            author {
                                login
                            }
                            body
                            url
                            createdAt
                        }
                    }
                }
            }
        }
    }
"#;

#[derive(Debug, Deserialize)]
struct SearchData {
    search: SearchConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchConnection {
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<Option<IssueNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

/// One search result; non-issue results arrive as an empty object
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct IssueNode {
    id: String,
    title: String,
    body: String,
    url: String,
    created_at: Option<DateTime<Utc>>,
    repository: Option<RepositoryNode>,
    comments: Option<CommentConnection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RepositoryNode {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommentConnection {
    nodes: Vec<CommentNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CommentNode {
    author: Option<Actor>,
    body: String,
    url: String,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Actor {
    login: String,
}

impl From<IssueNode> for Issue {
    fn from(node: IssueNode) -> Self {
        let mut comments = node.comments.map(|c| c.nodes).unwrap_or_default();
        // Stable, so equal timestamps keep the API's order
        comments.sort_by_key(|c| c.created_at);

        Issue {
            id: node.id,
            title: node.title,
            body: node.body,
            repository: node.repository.map(|r| r.name).unwrap_or_default(),
            url: node.url,
            created_at: node.created_at,
            comments: comments
                .into_iter()
                .map(|c| Comment {
                    author: c.author.map(|a| a.login).unwrap_or_default(),
                    body: c.body,
                    url: c.url,
                })
                .collect(),
        }
    }
}

/// Search string for open issues with the given relationship to `user`
pub fn search_query(relationship: Relationship, user: &str, org: Option<&str>) -> String {
    let mut query = match relationship {
        Relationship::Assignee => {
            format!("is:open is:issue archived:false assignee:{}", user)
        }
        Relationship::Mention => format!(
            "is:open is:issue archived:false mentions:{} -author:{}",
            user, user
        ),
    };
    if let Some(org) = org {
        query.push_str(&format!(" org:{}", org));
    }
    query
}

/// Search string for closed issues titled `title`
pub fn closed_query(title: &str, org: Option<&str>) -> String {
    let mut query = String::from("is:closed is:issue archived:false");
    if let Some(org) = org {
        query.push_str(&format!(" org:{}", org));
    }
    query.push_str(&format!(" \"{}\" in:title", title.replace('"', "")));
    query
}

impl GitHubClient {
    /// Run an issue search, following pages until `limit` results or the end
    pub async fn search_issues(&self, query: &str, limit: Option<usize>) -> Result<Vec<Issue>> {
        let mut issues = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let variables = json!({
                "query": query,
                "first": PAGE_SIZE,
                "after": after,
            });
            let data: SearchData = self.graphql_query(SEARCH_QUERY, &variables).await?;
            let page = data.search;
            debug!(
                query,
                results = page.nodes.len(),
                has_next = page.page_info.has_next_page,
                "Fetched search page"
            );

            issues.extend(page.nodes.into_iter().map(|n| Issue::from(n.unwrap_or_default())));

            if limit.is_some_and(|l| issues.len() >= l) {
                break;
            }
            match page.page_info.end_cursor {
                Some(cursor) if page.page_info.has_next_page => after = Some(cursor),
                _ => break,
            }
        }

        if let Some(limit) = limit {
            issues.truncate(limit);
        }
        Ok(issues)
    }
}

#[async_trait]
impl IssueSource for GitHubClient {
    async fn fetch(&self, relationship: Relationship) -> cardsync_core::Result<Vec<Issue>> {
        let query = search_query(relationship, self.user(), self.org());
        let issues = self.search_issues(&query, None).await?;
        info!(%relationship, count = issues.len(), "Fetched open issues");
        Ok(issues)
    }

    async fn is_closed(&self, title: &str, issue_id: &str) -> cardsync_core::Result<bool> {
        let query = closed_query(title, self.org());
        let issues = self
            .search_issues(&query, Some(PAGE_SIZE as usize))
            .await?;
        Ok(issues.iter().any(|issue| issue.id == issue_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assigned_query() {
        assert_eq!(
            search_query(Relationship::Assignee, "octocat", Some("acme")),
            "is:open is:issue archived:false assignee:octocat org:acme"
        );
    }

    #[test]
    fn test_mentioned_query_excludes_own_issues() {
        assert_eq!(
            search_query(Relationship::Mention, "octocat", None),
            "is:open is:issue archived:false mentions:octocat -author:octocat"
        );
    }

    #[test]
    fn test_closed_query_strips_quotes() {
        assert_eq!(
            closed_query("Fix \"foo\" bar", Some("acme")),
            "is:closed is:issue archived:false org:acme \"Fix foo bar\" in:title"
        );
    }

    #[test]
    fn test_node_conversion_sorts_comments() {
        let data: SearchData = serde_json::from_value(json!({
            "search": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "nodes": [{
                    "id": "I_1",
                    "title": "Bug X",
                    "body": "It broke",
                    "url": "https://github.com/acme/app/issues/1",
                    "createdAt": "2024-01-01T00:00:00Z",
                    "repository": { "name": "app" },
                    "comments": { "nodes": [
                        { "author": { "login": "b" }, "body": "second", "url": "u2",
                          "createdAt": "2024-01-03T00:00:00Z" },
                        { "author": null, "body": "first", "url": "u1",
                          "createdAt": "2024-01-02T00:00:00Z" }
                    ]}
                }]
            }
        }))
        .unwrap();

        let node = data.search.nodes.into_iter().next().unwrap().unwrap();
        let issue = Issue::from(node);
        assert_eq!(issue.repository, "app");
        assert_eq!(issue.card_name(), "**[github/app]** Bug X");
        let bodies: Vec<&str> = issue.comments.iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
        assert_eq!(issue.comments[0].author, "");
        assert_eq!(issue.comments[1].author, "b");
    }

    #[test]
    fn test_empty_node_is_hollow() {
        let data: SearchData = serde_json::from_value(json!({
            "search": {
                "pageInfo": { "hasNextPage": true, "endCursor": "abc" },
                "nodes": [{}, null]
            }
        }))
        .unwrap();

        assert!(data.search.page_info.has_next_page);
        let issues: Vec<Issue> = data
            .search
            .nodes
            .into_iter()
            .map(|n| Issue::from(n.unwrap_or_default()))
            .collect();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(Issue::is_hollow));
    }
}
