use std::sync::Arc;

use anyhow::Context as _;
use tokio_util::sync::CancellationToken;

use jirabot_core::{bootstrap::Bootstrap, config::BotConfig, context::JiraContextInit};
use jirabot_health::HealthServer;

mod standby;

use standby::StandbyBot;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Read first so a `.env` can also carry RUST_LOG.
    let raw = BotConfig::raw_from_env();
    jirabot_core::logging::init("jirabot").context("failed to initialize logging")?;

    let health = Arc::new(HealthServer::load_balancer());
    let bot = StandbyBot::new(health.clone(), CancellationToken::new());
    let app = Bootstrap::new(health, Arc::new(JiraContextInit), Arc::new(bot));

    if let Err(e) = app.run(&raw).await {
        std::process::exit(e.exit_code());
    }

    Ok(())
}
