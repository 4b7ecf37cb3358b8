use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::errors::Result;
use crate::models::{DocumentType, FileHandle, FolderHandle, ResourceHandle, ResourceKind, UserModel};
use super::protocol::Protocol;
use super::session::LastResource;
use super::strategy::{ContentStrategy, CreationTarget};

pub const TITLE_PROPERTY: &str = "cm:title";
pub const DESCRIPTION_PROPERTY: &str = "cm:description";

/// A document as the legacy binding reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyDocument {
    pub id: String,
    pub name: String,
    pub path: String,
    pub version_label: String,
    pub content_length: u64,
}

/// An aspect to apply, with the properties it brings along
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Aspect {
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

impl Aspect {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }
}

/// Path-keyed client of the document-management binding used by servers
/// older than 5.2.
///
/// Every call carries the acting user's credentials. Transient lock
/// contention is reported as `DataPrepError::StorageConflict`; anything else
/// as `DataPrepError::Binding`.
#[async_trait]
pub trait LegacyBinding: Send + Sync {
    /// Creates `name` under `parent_path` and returns its node identifier
    async fn create_folder(&self, user: &UserModel, parent_path: &str, name: &str) -> Result<String>;

    /// Creates a document with `content` in one call and returns its node identifier
    async fn create_document(
        &self,
        user: &UserModel,
        parent_path: &str,
        document_type: DocumentType,
        name: &str,
        content: &[u8],
    ) -> Result<String>;

    async fn set_properties(
        &self,
        user: &UserModel,
        path: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<()>;

    async fn delete_by_path(&self, user: &UserModel, path: &str) -> Result<()>;

    async fn delete_tree_by_path(&self, user: &UserModel, path: &str) -> Result<()>;

    /// Node identifier at `path`, `None` when nothing is there
    async fn get_node_ref_by_path(&self, user: &UserModel, path: &str) -> Result<Option<String>>;

    async fn rename(&self, user: &UserModel, path: &str, new_name: &str) -> Result<()>;

    async fn check_out(&self, user: &UserModel, path: &str) -> Result<()>;

    async fn cancel_check_out(&self, user: &UserModel, path: &str) -> Result<()>;

    async fn check_in(
        &self,
        user: &UserModel,
        path: &str,
        content: &str,
        major_version: bool,
        comment: &str,
    ) -> Result<()>;

    async fn set_inherit_permissions(&self, user: &UserModel, path: &str, inherit: bool) -> Result<()>;

    async fn update_document_content(&self, user: &UserModel, path: &str, content: &str) -> Result<()>;

    async fn get_document(&self, user: &UserModel, path: &str) -> Result<LegacyDocument>;

    async fn add_tag(&self, user: &UserModel, path: &str, tag: &str) -> Result<()>;

    /// Tag names on `path`, as the server stores them (lower case)
    async fn tags(&self, user: &UserModel, path: &str) -> Result<Vec<String>>;

    async fn add_aspects(&self, user: &UserModel, path: &str, aspect_names: &[String]) -> Result<()>;

    /// Marks `name` in the document library of `site_id` as a favorite of `user`
    async fn add_favorite(&self, user: &UserModel, site_id: &str, name: &str, kind: ResourceKind) -> Result<()>;

    async fn site_exists(&self, user: &UserModel, site_id: &str) -> Result<bool>;

    async fn delete_site(&self, user: &UserModel, site_id: &str) -> Result<()>;

    /// Purges everything `user` has deleted
    async fn empty_trashcan(&self, user: &UserModel) -> Result<()>;
}

/// Content operations through a [`LegacyBinding`]. Binding errors are
/// passed through untouched, apart from the single retry on a storage
/// conflict while creating a document.
pub struct LegacyStrategy {
    binding: Arc<dyn LegacyBinding>,
}

impl LegacyStrategy {
    pub fn new(binding: Arc<dyn LegacyBinding>) -> Self {
        Self { binding }
    }

    pub fn binding(&self) -> &Arc<dyn LegacyBinding> {
        &self.binding
    }

    async fn apply_properties(&self, user: &UserModel, resource: &ResourceHandle) -> Result<()> {
        let mut properties = BTreeMap::new();
        if let Some(title) = &resource.title {
            properties.insert(TITLE_PROPERTY.to_string(), title.clone());
        }
        if let Some(description) = &resource.description {
            properties.insert(DESCRIPTION_PROPERTY.to_string(), description.clone());
        }
        if properties.is_empty() {
            return Ok(());
        }
        self.binding
            .set_properties(user, resource.legacy_path(), &properties)
            .await
    }
}

#[async_trait]
impl ContentStrategy for LegacyStrategy {
    fn protocol(&self) -> Protocol {
        Protocol::Legacy
    }

    async fn create_folder(
        &self,
        user: &UserModel,
        target: CreationTarget<'_>,
        folder: &mut FolderHandle,
    ) -> Result<()> {
        let parent = target.parent_path();
        let node_ref = self
            .binding
            .create_folder(user, &parent, &folder.resource.name)
            .await?;

        folder.resource.assign_node_ref(node_ref)?;
        let location = target.child_path(&folder.resource.name);
        folder.resource.set_location(location);
        self.apply_properties(user, &folder.resource).await?;

        info!("✅ Created folder '{}'", folder.resource.legacy_path());
        Ok(())
    }

    async fn create_content(
        &self,
        user: &UserModel,
        target: CreationTarget<'_>,
        file: &mut FileHandle,
    ) -> Result<()> {
        let parent = target.parent_path();
        let name = file.full_name();
        let document_type = file.file_type.document_type();

        let first = self
            .binding
            .create_document(user, &parent, document_type, &name, &file.content)
            .await;
        let node_ref = match first {
            Err(e) if e.is_storage_conflict() => {
                warn!("⚠️ Storage conflict creating '{}' in '{}', retrying once: {}", name, parent, e);
                self.binding
                    .create_document(user, &parent, document_type, &name, &file.content)
                    .await?
            }
            other => other?,
        };

        file.resource.name = name;
        file.resource.assign_node_ref(node_ref)?;
        let location = target.child_path(&file.resource.name);
        file.resource.set_location(location);
        self.apply_properties(user, &file.resource).await?;

        info!("✅ Created file '{}'", file.resource.legacy_path());
        Ok(())
    }

    async fn delete(&self, user: &UserModel, resource: &LastResource) -> Result<()> {
        self.binding.delete_by_path(user, &resource.path).await
    }

    async fn delete_tree(&self, user: &UserModel, resource: &LastResource) -> Result<()> {
        self.binding.delete_tree_by_path(user, &resource.path).await
    }

    async fn node_ref_by_path(&self, user: &UserModel, path: &str) -> Result<Option<String>> {
        self.binding.get_node_ref_by_path(user, path).await
    }
}
