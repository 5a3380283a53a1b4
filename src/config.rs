use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the REST backend
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// SQLite URL of the local favorites snapshot
    #[serde(default = "default_snapshot_url")]
    pub snapshot_url: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
}

fn default_api_url() -> String {
    "http://localhost:3001".to_string()
}

fn default_snapshot_url() -> String {
    "sqlite:newsdesk.db?mode=rwc".to_string()
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_categories() -> Vec<String> {
    [
        "technology",
        "sports",
        "entertainment",
        "health",
        "politics",
        "invention",
        "general",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            snapshot_url: default_snapshot_url(),
            listen_addr: default_listen_addr(),
            categories: default_categories(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `NEWSDESK_API_URL` and `DATABASE_URL` overrides.
    pub fn with_env_overrides(mut self) -> anyhow::Result<Self> {
        if let Ok(api_url) = std::env::var("NEWSDESK_API_URL") {
            self.api_url = api_url;
        }
        if let Ok(snapshot_url) = std::env::var("DATABASE_URL") {
            self.snapshot_url = snapshot_url;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> anyhow::Result<()> {
        reqwest::Url::parse(&self.api_url)
            .map_err(|e| anyhow::anyhow!("Invalid api_url '{}': {}", self.api_url, e))?;
        Ok(())
    }
}
