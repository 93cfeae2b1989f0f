use std::{env, path::PathBuf, time::Duration};

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub path: String,
}

impl StoreConfig {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            owner: owner.into(),
            repo: repo.into(),
            branch: "main".to_string(),
            path: "journal-data.json".to_string(),
        }
    }

    pub fn repo_url(&self) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_base.trim_end_matches('/'),
            self.owner,
            self.repo
        )
    }

    pub fn contents_url(&self) -> String {
        format!("{}/contents/{}", self.repo_url(), self.path.trim_start_matches('/'))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub credential_path: PathBuf,
    pub seed_token: Option<String>,
    pub login: String,
    pub password: String,
    pub cache_ttl: Duration,
    pub retry_backoff: Duration,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let store = StoreConfig {
            api_base: optional("JOURNAL_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            owner: required("JOURNAL_OWNER")?,
            repo: required("JOURNAL_REPO")?,
            branch: optional("JOURNAL_BRANCH").unwrap_or_else(|| "main".to_string()),
            path: optional("JOURNAL_FILE").unwrap_or_else(|| "journal-data.json".to_string()),
        };

        Ok(Self {
            store,
            credential_path: optional("JOURNAL_CREDENTIAL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/credentials.json")),
            seed_token: optional("JOURNAL_TOKEN"),
            login: required("JOURNAL_LOGIN")?,
            password: required("JOURNAL_PASSWORD")?,
            cache_ttl: Duration::from_secs(parsed("JOURNAL_CACHE_SECS", 300)?),
            retry_backoff: Duration::from_millis(parsed("JOURNAL_RETRY_BACKOFF_MS", 1000)?),
            port: parsed("PORT", 8080)?,
        })
    }
}

fn optional(name: &'static str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
