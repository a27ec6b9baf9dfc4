use async_trait::async_trait;

use crate::{config::BotConfig, context::Context, Result};

/// Liveness endpoint polled by the load balancer.
#[async_trait]
pub trait HealthListener: Send + Sync {
    /// Open the listening socket and serve in the background.
    ///
    /// Returns once the socket is bound; serving never blocks the caller.
    async fn start(&self) -> Result<()>;
}

/// Turns a parsed config into the live resources the bot runs on.
#[async_trait]
pub trait ContextInitializer: Send + Sync {
    async fn init(&self, config: BotConfig) -> Result<Context>;
}

/// The bot's main entry. Owns the rest of the process lifetime once called.
#[async_trait]
pub trait BotMain: Send + Sync {
    async fn run(&self, ctx: Context) -> Result<()>;
}
