use std::path::PathBuf;

use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

pub const DEFAULT_API_URL: &str = "https://strengthgymbackend.onrender.com";

/// Configuration for the portal
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the membership backend
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Where the session token and role are persisted
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    /// Where tracing output goes; the terminal belongs to the UI
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Config {
    /// Load configuration from `GYM_`-prefixed environment variables
    ///
    /// This function will:
    /// 1. Load variables from .env file if it exists
    /// 2. Deserialize environment variables into Config struct
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::prefixed("GYM_").from_env::<Config>()?;

        Ok(config.normalized())
    }

    fn from_iter<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::prefixed("GYM_").from_iter::<_, Config>(vars)?;
        Ok(config.normalized())
    }

    fn normalized(mut self) -> Self {
        let trimmed = self.api_url.trim_end_matches('/').len();
        self.api_url.truncate(trimmed);
        self
    }

    /// Get a direct reference to the API base URL
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Apply command-line overrides on top of the environment
    pub fn with_overrides(
        mut self,
        api_url: Option<String>,
        session_file: Option<PathBuf>,
        log_file: Option<PathBuf>,
    ) -> Self {
        if let Some(url) = api_url {
            self.api_url = url;
        }
        if session_file.is_some() {
            self.session_file = session_file;
        }
        if log_file.is_some() {
            self.log_file = log_file;
        }
        self.normalized()
    }

    pub fn session_path(&self) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(|| app_dir().join("session.json"))
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| app_dir().join("portal.log"))
    }
}

fn app_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("strength-gym")
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}
