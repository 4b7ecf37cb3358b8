use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::errors::{DataPrepError, Result};
use crate::models::UserModel;
use super::config::RepositoryConfig;
use super::protocol::ServerVersion;

/// Body of an outgoing request
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Bytes { content: Vec<u8>, content_type: String },
}

/// Status and raw body of a completed request
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// `error.briefSummary` from the server's error payload, or the raw body
    pub fn error_summary(&self) -> String {
        serde_json::from_str::<Value>(&self.body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/briefSummary")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| {
                let text = self.body.trim();
                if text.is_empty() {
                    self.status.to_string()
                } else {
                    text.to_string()
                }
            })
    }
}

/// Authenticated HTTP access to the repository server.
///
/// The server version is detected once and cached for the lifetime of the
/// connection; share the connection through an `Arc` to cache it per run.
pub struct RepositoryConnection {
    client: Client,
    config: RepositoryConfig,
    version: OnceCell<ServerVersion>,
}

impl RepositoryConnection {
    pub fn new(config: RepositoryConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| DataPrepError::configuration(e.to_string()))?;
        let client = Client::builder().timeout(config.timeout()).build()?;

        let version = match config.server_version {
            Some(v) => OnceCell::new_with(Some(v)),
            None => OnceCell::new(),
        };

        Ok(Self {
            client,
            config,
            version,
        })
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Resource API URL for `tail`, e.g. `nodes/<id>/children`
    pub fn api_url(&self, tail: &str) -> String {
        format!("{}{}", self.config.api_root(), tail.trim_start_matches('/'))
    }

    /// Issues one authenticated request. Transport failures come back as
    /// `DataPrepError::Http`; any HTTP status is returned to the caller.
    pub async fn execute(
        &self,
        user: &UserModel,
        method: Method,
        url: &str,
        body: RequestBody,
    ) -> Result<ApiResponse> {
        debug!("{}: '{}'", method, url);

        let mut request = self
            .client
            .request(method, url)
            .basic_auth(&user.username, Some(&user.password));

        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(&value),
            RequestBody::Bytes { content, content_type } => request
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(content),
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(ApiResponse { status, body })
    }

    /// Version of the server, fetched from discovery on first use
    pub async fn server_version(&self, user: &UserModel) -> Result<ServerVersion> {
        let version = self
            .version
            .get_or_try_init(|| self.fetch_server_version(user))
            .await?;
        Ok(*version)
    }

    async fn fetch_server_version(&self, user: &UserModel) -> Result<ServerVersion> {
        let url = self.config.discovery_url();
        info!("🔍 Detecting repository version from: {}", url);

        let response = self.execute(user, Method::GET, &url, RequestBody::Empty).await?;
        if response.status != StatusCode::OK {
            return Err(DataPrepError::unexpected(format!(
                "version discovery returned {}: {}",
                response.status,
                response.error_summary()
            )));
        }

        let payload: Value = response.json()?;
        let version = parse_discovery_version(&payload)?;
        info!("✅ Repository version is {}", version);
        Ok(version)
    }
}

fn version_part(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Reads `entry.repository.version.{major,minor}`; numbers may be strings
pub fn parse_discovery_version(payload: &Value) -> Result<ServerVersion> {
    let version = payload
        .pointer("/entry/repository/version")
        .ok_or_else(|| DataPrepError::unexpected("discovery response has no entry.repository.version"))?;

    let major = version_part(version.get("major"))
        .ok_or_else(|| DataPrepError::unexpected("discovery response has no major version"))?;
    let minor = version_part(version.get("minor")).unwrap_or(0);

    Ok(ServerVersion::new(major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_discovery_version_with_string_parts() {
        let payload = json!({
            "entry": {"repository": {"version": {"major": "5", "minor": "2", "patch": "0"}}}
        });
        assert_eq!(parse_discovery_version(&payload).unwrap(), ServerVersion::new(5, 2));
    }

    #[test]
    fn test_parse_discovery_version_with_numbers() {
        let payload = json!({"entry": {"repository": {"version": {"major": 7, "minor": 4}}}});
        assert_eq!(parse_discovery_version(&payload).unwrap(), ServerVersion::new(7, 4));
    }

    #[test]
    fn test_parse_discovery_version_missing() {
        assert!(parse_discovery_version(&json!({"entry": {}})).is_err());
    }

    #[test]
    fn test_error_summary_prefers_brief_summary() {
        let response = ApiResponse {
            status: StatusCode::CONFLICT,
            body: json!({"error": {"briefSummary": "Duplicate child name", "statusCode": 409}}).to_string(),
        };
        assert_eq!(response.error_summary(), "Duplicate child name");
    }

    #[test]
    fn test_error_summary_falls_back_to_body_then_status() {
        let response = ApiResponse {
            status: StatusCode::BAD_GATEWAY,
            body: "upstream down".to_string(),
        };
        assert_eq!(response.error_summary(), "upstream down");

        let response = ApiResponse {
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        };
        assert_eq!(response.error_summary(), "502 Bad Gateway");
    }

    #[test]
    fn test_api_url() {
        let connection = RepositoryConnection::new(RepositoryConfig::new("http://repo.example.com")).unwrap();
        assert_eq!(
            connection.api_url("nodes/abc/children"),
            "http://repo.example.com/alfresco/api/-default-/public/alfresco/versions/1/nodes/abc/children"
        );
    }

    #[test]
    fn test_invalid_config_is_a_configuration_error() {
        let err = RepositoryConnection::new(RepositoryConfig::new("repo.example.com")).err().unwrap();
        assert!(err.is_configuration());
    }
}
