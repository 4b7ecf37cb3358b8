use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::errors::{DataPrepError, Result};
use crate::models::{FileHandle, FolderHandle, ResourceHandle, UserModel};
use super::connection::{ApiResponse, RepositoryConnection, RequestBody};
use super::paths;
use super::protocol::Protocol;
use super::session::LastResource;
use super::strategy::{ContentStrategy, CreationTarget};

pub const ROOT_NODE_ALIAS: &str = "-root-";
pub const FOLDER_NODE_TYPE: &str = "cm:folder";
pub const CONTENT_NODE_TYPE: &str = "cm:content";
pub const DEFAULT_FILE_CONTENT: &str = "This is a test file";

/// Text types are sent as UTF-8; anything else goes out as raw bytes
fn upload_content_type(mime: &str) -> String {
    if mime.starts_with("text/") {
        format!("{};charset=UTF-8", mime)
    } else {
        mime.to_string()
    }
}

/// `entry.id` and `entry.name` of a node response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEntry {
    pub id: String,
    pub name: String,
    pub version_label: Option<String>,
}

impl NodeEntry {
    pub fn from_response(response: &ApiResponse) -> Result<Self> {
        let payload: Value = response.json()?;
        let entry = payload
            .get("entry")
            .ok_or_else(|| DataPrepError::unexpected("node response has no entry"))?;

        let id = entry
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| DataPrepError::unexpected("node response has no entry.id"))?;
        let name = entry.get("name").and_then(Value::as_str).unwrap_or_default();
        let version_label = entry
            .pointer("/properties/cm:versionLabel")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            version_label,
        })
    }
}

/// Content operations over the JSON/HTTP resource API
pub struct ResourceApiStrategy {
    connection: Arc<RepositoryConnection>,
}

impl ResourceApiStrategy {
    pub fn new(connection: Arc<RepositoryConnection>) -> Self {
        Self { connection }
    }

    fn node_body(resource: &ResourceHandle, node_type: &str, target: CreationTarget<'_>) -> Value {
        let mut body = Map::new();
        body.insert("name".to_string(), json!(resource.name));
        body.insert("nodeType".to_string(), json!(node_type));

        if target.space_node_ref.is_none() {
            let relative = paths::relative_to_root(target.space);
            if !relative.is_empty() {
                body.insert("relativePath".to_string(), json!(relative));
            }
        }

        let mut properties = Map::new();
        if let Some(title) = &resource.title {
            properties.insert("cm:title".to_string(), json!(title));
        }
        if let Some(description) = &resource.description {
            properties.insert("cm:description".to_string(), json!(description));
        }
        if !properties.is_empty() {
            body.insert("properties".to_string(), Value::Object(properties));
        }

        Value::Object(body)
    }

    /// POST nodes/<parent>/children; 201 is the only success
    async fn create_node(
        &self,
        user: &UserModel,
        target: CreationTarget<'_>,
        resource: &mut ResourceHandle,
        node_type: &str,
    ) -> Result<NodeEntry> {
        let parent = target.space_node_ref.unwrap_or(ROOT_NODE_ALIAS);
        let url = self.connection.api_url(&format!("nodes/{}/children", parent));
        let body = Self::node_body(resource, node_type, target);

        info!("POST: '{}'", url);
        let response = self
            .connection
            .execute(user, Method::POST, &url, RequestBody::Json(body))
            .await?;

        if response.status != StatusCode::CREATED {
            return Err(DataPrepError::CreationFailed {
                resource: format!("{} '{}'", node_type, resource.name),
                status: response.status.as_u16(),
                summary: response.error_summary(),
            });
        }

        let entry = NodeEntry::from_response(&response)?;
        if !entry.name.is_empty() {
            resource.name = entry.name.clone();
        }
        resource.assign_node_ref(entry.id.clone())?;
        let location = target.child_path(&resource.name);
        resource.set_location(location);
        Ok(entry)
    }

    /// PUT nodes/<id>/content?majorVersion=true
    async fn upload_content(&self, user: &UserModel, file: &mut FileHandle, node_id: &str) -> Result<()> {
        if file.content.is_empty() {
            file.content = DEFAULT_FILE_CONTENT.as_bytes().to_vec();
        }

        let url = self
            .connection
            .api_url(&format!("nodes/{}/content?majorVersion=true", node_id));
        let body = RequestBody::Bytes {
            content: file.content.clone(),
            content_type: upload_content_type(&file.file_type.mime_type()),
        };

        info!("PUT: '{}'", url);
        let response = self.connection.execute(user, Method::PUT, &url, body).await?;
        if response.status != StatusCode::OK {
            // the node exists from here on
            return Err(DataPrepError::UpdateFailed {
                resource: format!("content of '{}' (node '{}')", file.resource.protocol_path(), node_id),
                status: response.status.as_u16(),
                summary: response.error_summary(),
            });
        }

        let label = NodeEntry::from_response(&response)
            .ok()
            .and_then(|entry| entry.version_label)
            .unwrap_or_else(|| "1.0".to_string());
        file.resource.version_label = Some(label);
        Ok(())
    }

    async fn resolve_node_id(&self, user: &UserModel, resource: &LastResource) -> Result<String> {
        if let Some(id) = &resource.node_ref {
            return Ok(id.clone());
        }
        self.node_ref_by_path(user, &resource.path)
            .await?
            .ok_or_else(|| DataPrepError::DeletionFailed {
                resource: format!("'{}'", resource.path),
                status: StatusCode::NOT_FOUND.as_u16(),
                summary: "no node at this path".to_string(),
            })
    }
}

#[async_trait]
impl ContentStrategy for ResourceApiStrategy {
    fn protocol(&self) -> Protocol {
        Protocol::ResourceApi
    }

    async fn create_folder(
        &self,
        user: &UserModel,
        target: CreationTarget<'_>,
        folder: &mut FolderHandle,
    ) -> Result<()> {
        let entry = self
            .create_node(user, target, &mut folder.resource, FOLDER_NODE_TYPE)
            .await?;
        info!("✅ Created folder '{}' with id '{}'", folder.resource.protocol_path(), entry.id);
        Ok(())
    }

    async fn create_content(
        &self,
        user: &UserModel,
        target: CreationTarget<'_>,
        file: &mut FileHandle,
    ) -> Result<()> {
        let entry = self
            .create_node(user, target, &mut file.resource, CONTENT_NODE_TYPE)
            .await?;
        self.upload_content(user, file, &entry.id).await?;
        info!("✅ Created file '{}' with id '{}'", file.resource.protocol_path(), entry.id);
        Ok(())
    }

    async fn delete(&self, user: &UserModel, resource: &LastResource) -> Result<()> {
        let node_id = self.resolve_node_id(user, resource).await?;
        let url = self.connection.api_url(&format!("nodes/{}", node_id));

        info!("DELETE: '{}'", url);
        let response = self
            .connection
            .execute(user, Method::DELETE, &url, RequestBody::Empty)
            .await?;

        if response.status != StatusCode::NO_CONTENT {
            return Err(DataPrepError::DeletionFailed {
                resource: format!("'{}'", resource.path),
                status: response.status.as_u16(),
                summary: response.error_summary(),
            });
        }

        info!("Successful deleted content with id '{}'", node_id);
        Ok(())
    }

    async fn delete_tree(&self, user: &UserModel, resource: &LastResource) -> Result<()> {
        // deleting a folder node removes its children as well
        self.delete(user, resource).await
    }

    async fn node_ref_by_path(&self, user: &UserModel, path: &str) -> Result<Option<String>> {
        let relative = paths::relative_to_root(path);
        let url = self.connection.api_url(&format!(
            "nodes/{}?relativePath={}",
            ROOT_NODE_ALIAS,
            urlencoding::encode(&relative)
        ));

        let response = self
            .connection
            .execute(user, Method::GET, &url, RequestBody::Empty)
            .await?;

        match response.status {
            StatusCode::OK => Ok(Some(NodeEntry::from_response(&response)?.id)),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(DataPrepError::unexpected(format!(
                "lookup of '{}' returned {}: {}",
                path,
                status,
                response.error_summary()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SiteModel;
    use crate::services::repository::session::SessionContext;

    #[test]
    fn test_node_body_uses_relative_path_without_space_node() {
        let session = SessionContext::new().using_site(&SiteModel::new("test"));
        let folder = FolderHandle::new("F1").with_title("Title").with_description("Desc");

        let body = ResourceApiStrategy::node_body(
            &folder.resource,
            FOLDER_NODE_TYPE,
            CreationTarget::from_session(&session),
        );

        assert_eq!(body["name"], "F1");
        assert_eq!(body["nodeType"], "cm:folder");
        assert_eq!(body["relativePath"], "Sites/test/documentLibrary");
        assert_eq!(body["properties"]["cm:title"], "Title");
        assert_eq!(body["properties"]["cm:description"], "Desc");
    }

    #[test]
    fn test_node_body_without_relative_path_under_known_node() {
        let target = CreationTarget {
            space: "/Sites/test/documentLibrary/F1/",
            space_node_ref: Some("folder-id"),
        };
        let file = FileHandle::new("a.txt");

        let body = ResourceApiStrategy::node_body(&file.resource, CONTENT_NODE_TYPE, target);
        assert!(body.get("relativePath").is_none());
        assert!(body.get("properties").is_none());
        assert_eq!(body["nodeType"], "cm:content");
    }

    #[test]
    fn test_upload_content_type() {
        assert_eq!(upload_content_type("text/plain"), "text/plain;charset=UTF-8");
        assert_eq!(upload_content_type("application/pdf"), "application/pdf");
    }

    #[test]
    fn test_node_entry_requires_id() {
        let response = ApiResponse {
            status: StatusCode::CREATED,
            body: json!({"entry": {"name": "F1"}}).to_string(),
        };
        assert!(NodeEntry::from_response(&response).is_err());

        let response = ApiResponse {
            status: StatusCode::CREATED,
            body: json!({"entry": {"id": "abc", "name": "F1", "properties": {"cm:versionLabel": "1.0"}}}).to_string(),
        };
        let entry = NodeEntry::from_response(&response).unwrap();
        assert_eq!(entry.id, "abc");
        assert_eq!(entry.version_label.as_deref(), Some("1.0"));
    }
}
