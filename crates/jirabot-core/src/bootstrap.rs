//! Process bootstrap.
//!
//! ```text
//! Loading ──(config absent)──▶ Failed
//!    │
//!    └──(config parsed)──▶ Starting ──(health bound, context ready)──▶ Running
//!                              │
//!                              └──(bind or init failure)──▶ Failed
//! ```
//!
//! Nothing is started before the config parses. The health listener is bound
//! before context initialization is spawned, and the two then run independently;
//! only the initialization result is joined into the bot's main entry.

use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    config::BotConfig,
    ports::{BotMain, ContextInitializer, HealthListener},
    Error, Result,
};

/// Message logged when the bot-config is unusable.
pub const INVALID_CONFIG_MESSAGE: &str = "invalid bot-config";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Failed,
    Starting,
    Running,
}

/// The application object: one health listener and one bot per process.
pub struct Bootstrap {
    health: Arc<dyn HealthListener>,
    initializer: Arc<dyn ContextInitializer>,
    bot: Arc<dyn BotMain>,
    phase: watch::Sender<Phase>,
}

impl Bootstrap {
    pub fn new(
        health: Arc<dyn HealthListener>,
        initializer: Arc<dyn ContextInitializer>,
        bot: Arc<dyn BotMain>,
    ) -> Self {
        let (phase, _) = watch::channel(Phase::Loading);
        Self {
            health,
            initializer,
            bot,
            phase,
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// Run the bootstrap sequence on a raw bot-config string.
    ///
    /// Returns when the bot's main entry returns, or with the error that put the
    /// process in `Failed`. Callers exit with [`Error::exit_code`] on error.
    pub async fn run(&self, raw: &str) -> Result<()> {
        self.enter(Phase::Loading);

        let Some(config) = BotConfig::parse(raw) else {
            tracing::error!(fatal = true, "{INVALID_CONFIG_MESSAGE}");
            self.enter(Phase::Failed);
            return Err(Error::Config(INVALID_CONFIG_MESSAGE.to_string()));
        };

        self.enter(Phase::Starting);

        if let Err(e) = self.health.start().await {
            return Err(self.fail("health-check listener failed to start", e));
        }

        let initializer = self.initializer.clone();
        let init = tokio::spawn(async move { initializer.init(config).await });

        let ctx = match init.await {
            Ok(Ok(ctx)) => ctx,
            Ok(Err(e)) => return Err(self.fail("context initialization failed", e)),
            Err(join) => {
                let e = Error::Init(format!("context initialization aborted: {join}"));
                return Err(self.fail("context initialization failed", e));
            }
        };

        self.enter(Phase::Running);
        self.bot.run(ctx).await.inspect_err(|e| {
            tracing::error!(error = %e, "bot stopped with an error");
        })
    }

    fn fail(&self, what: &str, e: Error) -> Error {
        tracing::error!(fatal = true, error = %e, "{what}");
        self.enter(Phase::Failed);
        e
    }

    fn enter(&self, phase: Phase) {
        tracing::info!(?phase, "bootstrap");
        self.phase.send_replace(phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sample_json;
    use crate::context::{self, Context};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<&'static str>>,
    }

    impl Recorder {
        fn push(&self, event: &'static str) {
            self.events.lock().unwrap().push(event);
        }

        fn events(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().clone()
        }
    }

    struct FakeHealth {
        rec: Arc<Recorder>,
        fail: bool,
    }

    #[async_trait]
    impl HealthListener for FakeHealth {
        async fn start(&self) -> Result<()> {
            self.rec.push("health");
            if self.fail {
                return Err(Error::Health("address in use".to_string()));
            }
            Ok(())
        }
    }

    enum InitBehavior {
        Real,
        Fail,
        Panic,
    }

    struct FakeInit {
        rec: Arc<Recorder>,
        behavior: InitBehavior,
    }

    #[async_trait]
    impl ContextInitializer for FakeInit {
        async fn init(&self, config: BotConfig) -> Result<Context> {
            self.rec.push("init");
            match self.behavior {
                InitBehavior::Real => context::init(config).await,
                InitBehavior::Fail => Err(Error::Init("jira unreachable".to_string())),
                InitBehavior::Panic => panic!("init blew up"),
            }
        }
    }

    struct FakeBot {
        rec: Arc<Recorder>,
        runs: AtomicUsize,
        username: Mutex<Option<String>>,
    }

    #[async_trait]
    impl BotMain for FakeBot {
        async fn run(&self, ctx: Context) -> Result<()> {
            self.rec.push("bot");
            self.runs.fetch_add(1, Ordering::SeqCst);
            *self.username.lock().unwrap() = Some(ctx.config.keybase.username.clone());
            Ok(())
        }
    }

    struct Harness {
        rec: Arc<Recorder>,
        bot: Arc<FakeBot>,
        app: Bootstrap,
    }

    fn harness(health_fails: bool, behavior: InitBehavior) -> Harness {
        let rec = Arc::new(Recorder::default());
        let bot = Arc::new(FakeBot {
            rec: rec.clone(),
            runs: AtomicUsize::new(0),
            username: Mutex::new(None),
        });
        let app = Bootstrap::new(
            Arc::new(FakeHealth {
                rec: rec.clone(),
                fail: health_fails,
            }),
            Arc::new(FakeInit {
                rec: rec.clone(),
                behavior,
            }),
            bot.clone(),
        );
        Harness { rec, bot, app }
    }

    #[tokio::test]
    async fn invalid_config_fails_before_starting_anything() {
        for raw in ["", "   ", "nope", r#"{"keybase":{}}"#] {
            let h = harness(false, InitBehavior::Real);
            let err = h.app.run(raw).await.unwrap_err();

            assert!(matches!(err, Error::Config(ref m) if m == INVALID_CONFIG_MESSAGE));
            assert_eq!(err.exit_code(), 1);
            assert_eq!(h.app.phase(), Phase::Failed);
            assert!(h.rec.events().is_empty(), "started something for {raw:?}");
        }
    }

    #[tokio::test]
    async fn unset_config_variable_exits_with_one_and_opens_nothing() {
        let h = harness(false, InitBehavior::Real);
        let raw = BotConfig::raw_from(None);
        let err = h.app.run(&raw).await.unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.exit_code(), 1);
        assert!(h.rec.events().is_empty());
        assert_eq!(h.bot.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn valid_config_starts_health_then_hands_context_to_bot_once() {
        let h = harness(false, InitBehavior::Real);
        h.app.run(&sample_json()).await.unwrap();

        assert_eq!(h.rec.events(), vec!["health", "init", "bot"]);
        assert_eq!(h.bot.runs.load(Ordering::SeqCst), 1);
        assert_eq!(h.bot.username.lock().unwrap().as_deref(), Some("jirabot"));
        assert_eq!(h.app.phase(), Phase::Running);
    }

    #[tokio::test]
    async fn health_bind_failure_is_fatal() {
        let h = harness(true, InitBehavior::Real);
        let err = h.app.run(&sample_json()).await.unwrap_err();

        assert!(matches!(err, Error::Health(_)));
        assert_eq!(h.rec.events(), vec!["health"]);
        assert_eq!(h.app.phase(), Phase::Failed);
    }

    #[tokio::test]
    async fn init_failure_is_fatal_and_bot_never_runs() {
        let h = harness(false, InitBehavior::Fail);
        let err = h.app.run(&sample_json()).await.unwrap_err();

        assert!(matches!(err, Error::Init(_)));
        assert_eq!(h.rec.events(), vec!["health", "init"]);
        assert_eq!(h.bot.runs.load(Ordering::SeqCst), 0);
        assert_eq!(h.app.phase(), Phase::Failed);
    }

    #[tokio::test]
    async fn init_panic_is_reported_as_init_error() {
        let h = harness(false, InitBehavior::Panic);
        let err = h.app.run(&sample_json()).await.unwrap_err();

        assert!(matches!(err, Error::Init(_)));
        assert_eq!(h.bot.runs.load(Ordering::SeqCst), 0);
        assert_eq!(h.app.phase(), Phase::Failed);
    }

    #[tokio::test]
    async fn subscribers_observe_final_phase() {
        let h = harness(false, InitBehavior::Real);
        let rx = h.app.subscribe();
        h.app.run(&sample_json()).await.unwrap();
        assert_eq!(*rx.borrow(), Phase::Running);
    }
}
