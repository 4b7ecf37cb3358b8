use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Server version as reported by discovery, compared on (major, minor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
}

impl ServerVersion {
    /// First release that ships the resource API
    pub const RESOURCE_API_MIN: ServerVersion = ServerVersion { major: 5, minor: 2 };

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ServerVersion {
    type Err = String;

    /// Accepts "5", "5.2" and longer forms such as "5.2.0 (r1234)"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let numeric = s.trim().split_whitespace().next().unwrap_or("");
        let mut parts = numeric.split('.');

        let major = parts
            .next()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| format!("empty version string '{}'", s))?
            .parse::<u32>()
            .map_err(|e| format!("invalid major version in '{}': {}", s, e))?;
        let minor = match parts.next() {
            Some(p) => p
                .parse::<u32>()
                .map_err(|e| format!("invalid minor version in '{}': {}", s, e))?,
            None => 0,
        };

        Ok(Self { major, minor })
    }
}

/// Which backend protocol a session talks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Document-management binding of servers older than 5.2
    Legacy,
    /// JSON/HTTP resource API of 5.2 and later
    ResourceApi,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Legacy => write!(f, "legacy"),
            Protocol::ResourceApi => write!(f, "resource-api"),
        }
    }
}

/// Resource API from 5.2 on, legacy binding before
pub fn select_strategy(version: ServerVersion) -> Protocol {
    if version >= ServerVersion::RESOURCE_API_MIN {
        Protocol::ResourceApi
    } else {
        Protocol::Legacy
    }
}
