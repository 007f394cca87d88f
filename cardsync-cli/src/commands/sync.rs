//! Sync command - mirror open issues onto the board

use std::path::PathBuf;

use anyhow::Context;
use cardsync_core::{
    BoardLayout, CardStore, Config, DryRunStore, IssueSource, RelationshipActions, SyncLedger,
    SyncOptions, SyncReport, Syncer,
};
use cardsync_db::Database;
use clap::Args;
use tracing::info;

use super::connect;

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Log the writes a sync would make without making them
    #[arg(long)]
    pub dry_run: bool,

    /// Skip archiving cards of issues that left the open set
    #[arg(long)]
    pub no_close: bool,

    /// Run without the local state cache
    #[arg(long)]
    pub no_state: bool,

    /// State cache location (overrides config)
    #[arg(long, value_name = "PATH")]
    pub state_db: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    /// Execute the sync command
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let mut config = config.with_cli_overrides(self.no_close, self.no_state, self.state_db.clone());
        if self.dry_run && config.sync.use_state {
            // Synthetic card IDs must not reach the state cache
            info!("Dry run: state cache disabled");
            config.sync.use_state = false;
        }

        let conn = connect(&config).await?;

        let db = if config.sync.use_state {
            let path = config
                .sync
                .state_db_path()
                .context("Could not determine state cache location")?;
            Some(
                Database::new(&path)
                    .await
                    .with_context(|| format!("Failed to open state cache {}", path.display()))?,
            )
        } else {
            None
        };
        let ledger = db.as_ref().map(Database::ledger);
        let ledger: Option<&dyn SyncLedger> = ledger.as_ref().map(|l| l as &dyn SyncLedger);

        let options = SyncOptions {
            close: config.sync.close,
            label_card_name: config.trello.label_card.clone(),
        };

        let report = if self.dry_run {
            let store = DryRunStore::new(conn.board);
            run(
                &conn.github,
                &store,
                &conn.layout,
                &config.relationships,
                ledger,
                options,
            )
            .await?
        } else {
            run(
                &conn.github,
                &conn.board,
                &conn.layout,
                &config.relationships,
                ledger,
                options,
            )
            .await?
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            if self.dry_run {
                println!("Dry run - no changes were made");
                println!();
            }
            println!("Sync Summary");
            println!("============");
            println!("{}", report);
        }

        Ok(())
    }
}

async fn run(
    source: &dyn IssueSource,
    store: &dyn CardStore,
    layout: &BoardLayout,
    actions: &RelationshipActions,
    ledger: Option<&dyn SyncLedger>,
    options: SyncOptions,
) -> cardsync_core::Result<SyncReport> {
    Syncer::new(source, store, layout, actions)?
        .with_ledger(ledger)
        .with_options(options)
        .sync()
        .await
}
