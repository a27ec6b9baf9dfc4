//! Runtime context handed to the bot's main entry.
//!
//! Built once from a parsed [`BotConfig`]; owns every live resource the bot needs.
//! Building it performs no network I/O, so failures here are configuration-shaped
//! (bad host, unencodable credentials) rather than connectivity problems.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Local};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION},
    Url,
};

use crate::{config::BotConfig, ports::ContextInitializer, Error, Result};

const JIRA_API_PATH: &str = "rest/api/2/";
const JIRA_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct Context {
    pub config: Arc<BotConfig>,
    pub jira: JiraHandle,
    pub initialized_at: DateTime<Local>,
}

/// Authenticated handle on the Jira REST API.
#[derive(Clone, Debug)]
pub struct JiraHandle {
    pub base_url: Url,
    pub http: reqwest::Client,
}

impl JiraHandle {
    /// Resolve an API-relative path (e.g. `issue/CORE-1`) against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Init(format!("invalid jira endpoint {path:?}: {e}")))
    }
}

/// Build the runtime context from a parsed config.
pub async fn init(config: BotConfig) -> Result<Context> {
    let base_url = jira_base_url(&config.jira.host)?;

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        AUTHORIZATION,
        basic_auth(&config.jira.email, &config.jira.api_token)?,
    );

    let http = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(JIRA_REQUEST_TIMEOUT)
        .user_agent(concat!("jirabot/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Init(format!("failed to build jira http client: {e}")))?;

    tracing::debug!(
        username = %config.keybase.username,
        jira = %base_url,
        "context initialized"
    );

    Ok(Context {
        config: Arc::new(config),
        jira: JiraHandle { base_url, http },
        initialized_at: Local::now(),
    })
}

/// Default initializer used by the binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct JiraContextInit;

#[async_trait]
impl ContextInitializer for JiraContextInit {
    async fn init(&self, config: BotConfig) -> Result<Context> {
        init(config).await
    }
}

fn jira_base_url(host: &str) -> Result<Url> {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return Err(Error::Init("jira host is empty".to_string()));
    }
    let root = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };

    Url::parse(&format!("{root}/{JIRA_API_PATH}"))
        .map_err(|e| Error::Init(format!("invalid jira host {host:?}: {e}")))
}

fn basic_auth(email: &str, token: &str) -> Result<HeaderValue> {
    let encoded = STANDARD.encode(format!("{email}:{token}"));
    let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
        .map_err(|e| Error::Init(format!("invalid jira credentials: {e}")))?;
    value.set_sensitive(true);
    Ok(value)
}
