/// Core error type for the bot.
///
/// Adapter crates should map their specific errors into this type so bootstrap
/// can report every startup failure the same way.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("health-check error: {0}")]
    Health(String),

    #[error("context init error: {0}")]
    Init(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Process exit code for an error that aborts startup.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

pub type Result<T> = std::result::Result<T, Error>;
