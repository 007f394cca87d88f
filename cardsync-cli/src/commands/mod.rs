//! CLI command implementations

pub mod check;
pub mod config;
pub mod sync;

pub use check::CheckArgs;
pub use config::ConfigArgs;
pub use sync::SyncArgs;

use anyhow::Context;
use cardsync_core::{BoardLayout, Config, Secrets};
use cardsync_github::GitHubClient;
use cardsync_trello::{TrelloBoard, TrelloClient};

/// Live connections to both services
pub struct Connections {
    pub github: GitHubClient,
    pub board: TrelloBoard,
    pub layout: BoardLayout,
}

/// Load credentials and connect to GitHub and the configured Trello board
pub async fn connect(config: &Config) -> anyhow::Result<Connections> {
    config.validate()?;

    let secrets = Secrets::load().context("Failed to load secrets")?;
    let (github_token, trello_key, trello_token) = secrets.require_all()?;

    let github = GitHubClient::connect(github_token, &config.github)
        .await
        .context("Failed to connect to GitHub")?;

    let client = TrelloClient::new(
        &config.trello.api_url,
        trello_key,
        trello_token,
        config.trello.throttle,
        config.trello.max_text_length,
    )?;
    let (board, layout) = TrelloBoard::connect(client, &config.trello)
        .await
        .with_context(|| format!("Failed to open Trello board \"{}\"", config.trello.board))?;

    Ok(Connections {
        github,
        board,
        layout,
    })
}
