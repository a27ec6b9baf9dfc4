use std::{env, fmt, fs, path::Path};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;

/// Environment variable holding the serialized bot-config.
pub const CONFIG_ENV: &str = "JIRABOT_CONFIG";

/// Typed bot-config.
///
/// Deployments ship it as base64-encoded JSON in `JIRABOT_CONFIG`; plain JSON is
/// accepted too, which is handier for local runs.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct BotConfig {
    pub keybase: KeybaseConfig,
    pub jira: JiraConfig,
}

#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct KeybaseConfig {
    pub username: String,
    pub paperkey: String,
}

#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JiraConfig {
    pub host: String,
    pub email: String,
    pub api_token: String,
    #[serde(default)]
    pub projects: Vec<String>,
}

impl fmt::Debug for KeybaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeybaseConfig")
            .field("username", &self.username)
            .field("paperkey", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraConfig")
            .field("host", &self.host)
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .field("projects", &self.projects)
            .finish()
    }
}

impl BotConfig {
    /// Parse a serialized bot-config.
    ///
    /// Returns `None` for empty input and for anything that does not decode into a
    /// complete config. Nothing partial is ever returned.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let json = decode_base64(raw).unwrap_or_else(|| raw.to_string());
        match serde_json::from_str::<BotConfig>(&json) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                tracing::debug!(error = %e, "bot-config did not parse");
                None
            }
        }
    }

    /// Read the raw bot-config from the environment (after `.env`, if any).
    pub fn raw_from_env() -> String {
        load_dotenv_if_present(Path::new(".env"));
        Self::raw_from(env::var(CONFIG_ENV).ok())
    }

    /// An unset (or non-unicode) variable reads as the empty string.
    pub fn raw_from(value: Option<String>) -> String {
        value.unwrap_or_default()
    }
}

fn decode_base64(raw: &str) -> Option<String> {
    let compact: String = raw.split_ascii_whitespace().collect();
    let bytes = STANDARD.decode(compact).ok()?;
    String::from_utf8(bytes).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in dotenv_assignments(&contents, |key| env::var_os(key).is_some()) {
        env::set_var(key, val);
    }
}

/// `KEY=value` pairs from a `.env` body, skipping keys `is_set` already knows.
fn dotenv_assignments(
    contents: &str,
    is_set: impl Fn(&str) -> bool,
) -> Vec<(String, String)> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim(), unquote(v.trim())))
        .filter(|(key, _)| !key.is_empty() && !is_set(*key))
        .map(|(key, val)| (key.to_string(), val.to_string()))
        .collect()
}

fn unquote(val: &str) -> &str {
    let quoted = val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')));
    if quoted {
        &val[1..val.len() - 1]
    } else {
        val
    }
}

#[cfg(test)]
pub(crate) fn sample_json() -> String {
    serde_json::json!({
        "keybase": { "username": "jirabot", "paperkey": "foo bar baz" },
        "jira": {
            "host": "example.atlassian.net",
            "email": "bot@example.com",
            "apiToken": "secret-token",
            "projects": ["CORE", "OPS"]
        }
    })
    .to_string()
}
