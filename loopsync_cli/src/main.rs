mod auth;
mod cli;
mod logging;

use clap::Parser;
use cli::Cli;
use loopsync_core::SyncEngine;
use loopsync_integrations::{EngageClient, LoopClient};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init();

    let cookies = auth::log_in_to_engage(
        &cli.webdriver_url,
        &cli.georgia_tech_username,
        &cli.georgia_tech_password,
    )
    .await?;

    let source = Arc::new(EngageClient::new(cookies));
    let sink = Arc::new(LoopClient::new(cli.server, cli.token));

    let report = SyncEngine::new(source, sink).run().await?;
    tracing::info!(
        requests = report.requests_synced,
        skipped_deleted = report.requests_skipped_deleted,
        uploaded = report.attachments_uploaded,
        already_present = report.attachments_already_present,
        "sync run complete"
    );

    Ok(())
}
