use std::time::Duration;

use super::protocol::ServerVersion;

/// Repository server configuration
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    pub server_url: String,
    pub api_path: String,
    pub discovery_path: String,
    pub timeout_seconds: u64,
    pub server_version: Option<ServerVersion>, // skips discovery when set
}

/// What a poller does when the awaited state never shows up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// Give up waiting and let the caller carry on
    BestEffort,
    /// Surface `PollTimedOut` to the caller
    Fail,
}

/// Existence polling configuration
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub creation_attempts: u32,
    pub deletion_attempts: u32,
    pub interval: Duration,
    pub on_timeout: TimeoutPolicy,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            creation_attempts: 15,
            deletion_attempts: 15,
            interval: Duration::from_secs(1),
            on_timeout: TimeoutPolicy::BestEffort,
        }
    }
}

impl RepositoryConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            api_path: "alfresco/api/-default-/public/alfresco/versions/1/".to_string(),
            discovery_path: "alfresco/api/discovery".to_string(),
            timeout_seconds: 30,
            server_version: None,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server_url.is_empty() {
            return Err(anyhow::anyhow!("Server URL cannot be empty"));
        }

        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(anyhow::anyhow!("Server URL must start with http:// or https://"));
        }

        Ok(())
    }

    /// Root of the resource API, always ending in `/`
    /// e.g. "http://host:8080/alfresco/api/-default-/public/alfresco/versions/1/"
    pub fn api_root(&self) -> String {
        let base = self.server_url.trim_end_matches('/');
        let api = self.api_path.trim_matches('/');
        if api.is_empty() {
            format!("{}/", base)
        } else {
            format!("{}/{}/", base, api)
        }
    }

    pub fn discovery_url(&self) -> String {
        format!(
            "{}/{}",
            self.server_url.trim_end_matches('/'),
            self.discovery_path.trim_start_matches('/')
        )
    }

    /// Gets the timeout duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
