use serde::{Deserialize, Serialize};

/// Credentials of the actor a session runs as
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserModel {
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub domain: Option<String>,
}

impl UserModel {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            domain: None,
        }
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

impl std::fmt::Display for UserModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.domain {
            Some(domain) => write!(f, "{}@{}", self.username, domain),
            None => write!(f, "{}", self.username),
        }
    }
}

/// A collaboration site; its document library is the usual working space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteModel {
    pub id: String,
    pub title: Option<String>,
}

impl SiteModel {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), title: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_display() {
        let user = UserModel::new("alice", "secret");
        assert_eq!(user.to_string(), "alice");

        let user = user.with_domain("example.com");
        assert_eq!(user.to_string(), "alice@example.com");
    }

    #[test]
    fn test_password_is_not_serialized() {
        let user = UserModel::new("alice", "secret");
        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("alice"));
        assert!(!json.contains("secret"));
    }
}
