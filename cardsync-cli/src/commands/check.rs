//! Check command - verify credentials, board and configuration

use cardsync_core::{Config, Relationship};
use clap::Args;

use super::connect;

/// Arguments for the check command
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Also list every list and label on the board
    #[arg(short, long)]
    pub all: bool,
}

impl CheckArgs {
    /// Execute the check command
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let conn = connect(&config).await?;
        let login = conn.github.test_connection().await?;

        println!("GitHub");
        println!("  token user: {}", login);
        println!("  syncing for: {}", conn.github.user());
        if let Some(org) = conn.github.org() {
            println!("  organization: {}", org);
        }
        println!();
        println!("Trello");
        println!("  board: {} ({})", conn.board.name(), conn.board.id());

        if self.all {
            println!("  lists: {}", conn.layout.list_names().join(", "));
            println!("  labels: {}", conn.layout.label_names().join(", "));
        }
        println!();

        for relationship in Relationship::ALL {
            match config.relationships.get(relationship) {
                Some(actions) => {
                    println!("Relationship {}", relationship.name());
                    println!("  create: {}", actions.create.lists.join(", "));
                    println!("  update: {}", actions.update_policy().lists.join(", "));
                    println!("  close:  {}", actions.close.lists.join(", "));
                }
                None => println!("Relationship {} (not configured)", relationship.name()),
            }
        }
        println!();

        conn.layout.validate(&config.relationships)?;
        println!("Configuration OK");
        Ok(())
    }
}
