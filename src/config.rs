use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;

use crate::models::UserModel;
use crate::services::repository::{PollConfig, RepositoryConfig, ServerVersion, TimeoutPolicy};

#[derive(Clone, Debug)]
pub struct Config {
    pub server_url: String,
    pub api_path: String,
    pub discovery_path: String,
    pub admin_user: String,
    pub admin_password: String,
    pub timeout_seconds: u64,
    pub server_version: Option<ServerVersion>,
    pub creation_poll_attempts: u32,
    pub retry_count_seconds: u32,
    pub poll_interval_ms: u64,
    pub strict_polling: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            api_path: "alfresco/api/-default-/public/alfresco/versions/1/".to_string(),
            discovery_path: "alfresco/api/discovery".to_string(),
            admin_user: "admin".to_string(),
            admin_password: "admin".to_string(),
            timeout_seconds: 30,
            server_version: None,
            creation_poll_attempts: 15,
            retry_count_seconds: 15,
            poll_interval_ms: 1000,
            strict_polling: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Config::default();

        let server_version = match env::var("DATAPREP_SERVER_VERSION") {
            Ok(raw) => Some(
                raw.parse::<ServerVersion>()
                    .map_err(|e| anyhow!("Invalid DATAPREP_SERVER_VERSION '{}': {}", raw, e))?,
            ),
            Err(_) => None,
        };

        let config = Config {
            server_url: env::var("DATAPREP_SERVER_URL").unwrap_or(defaults.server_url),
            api_path: env::var("DATAPREP_API_PATH").unwrap_or(defaults.api_path),
            discovery_path: env::var("DATAPREP_DISCOVERY_PATH").unwrap_or(defaults.discovery_path),
            admin_user: env::var("DATAPREP_ADMIN_USER").unwrap_or(defaults.admin_user),
            admin_password: env::var("DATAPREP_ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            timeout_seconds: env::var("DATAPREP_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_seconds),
            server_version,
            creation_poll_attempts: env::var("DATAPREP_CREATION_POLL_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.creation_poll_attempts),
            retry_count_seconds: env::var("DATAPREP_RETRY_COUNT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.retry_count_seconds),
            poll_interval_ms: env::var("DATAPREP_POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.poll_interval_ms),
            strict_polling: env::var("DATAPREP_STRICT_POLLING")
                .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.strict_polling),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_url.is_empty() {
            return Err(anyhow!("Server URL cannot be empty"));
        }

        let parsed = url::Url::parse(&self.server_url)
            .map_err(|e| anyhow!("Server URL '{}' is not valid: {}", self.server_url, e))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(anyhow!("Server URL must start with http:// or https://"));
        }

        if self.admin_user.is_empty() {
            return Err(anyhow!("Admin user cannot be empty"));
        }

        if self.creation_poll_attempts == 0 || self.retry_count_seconds == 0 {
            return Err(anyhow!("Poll budgets must allow at least one attempt"));
        }

        Ok(())
    }

    pub fn admin(&self) -> UserModel {
        UserModel::new(self.admin_user.clone(), self.admin_password.clone())
    }

    pub fn repository_config(&self) -> RepositoryConfig {
        RepositoryConfig {
            server_url: self.server_url.clone(),
            api_path: self.api_path.clone(),
            discovery_path: self.discovery_path.clone(),
            timeout_seconds: self.timeout_seconds,
            server_version: self.server_version,
        }
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            creation_attempts: self.creation_poll_attempts,
            deletion_attempts: self.retry_count_seconds,
            interval: Duration::from_millis(self.poll_interval_ms),
            on_timeout: if self.strict_polling {
                TimeoutPolicy::Fail
            } else {
                TimeoutPolicy::BestEffort
            },
        }
    }
}
