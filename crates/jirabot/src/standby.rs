use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use jirabot_core::{context::Context, ports::BotMain, Result};
use jirabot_health::HealthServer;

/// Main entry that keeps the context alive until the process is told to stop.
pub struct StandbyBot {
    health: Arc<HealthServer>,
    stop: CancellationToken,
}

impl StandbyBot {
    pub fn new(health: Arc<HealthServer>, stop: CancellationToken) -> Self {
        Self { health, stop }
    }
}

#[async_trait]
impl BotMain for StandbyBot {
    async fn run(&self, ctx: Context) -> Result<()> {
        tracing::info!(
            username = %ctx.config.keybase.username,
            jira = %ctx.jira.base_url,
            projects = ?ctx.config.jira.projects,
            since = %ctx.initialized_at.to_rfc3339(),
            "jirabot running"
        );

        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    tracing::warn!(error = %e, "failed to listen for ctrl-c");
                }
                tracing::info!("shutdown requested");
            }
            _ = self.stop.cancelled() => {}
        }

        self.health.shutdown();
        Ok(())
    }
}
