use serde::{Deserialize, Serialize};

use crate::errors::{DataPrepError, Result};
use crate::services::repository::paths;
use super::file_type::FileType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Folder,
    File,
}

/// One repository object as seen by a test.
///
/// The node identifier stays empty until the server confirms creation and
/// never changes afterwards; renames and moves only touch the two paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandle {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: ResourceKind,
    pub content_type: Option<String>,
    pub version_label: Option<String>,
    node_ref: Option<String>,
    legacy_path: String,
    protocol_path: String,
}

impl ResourceHandle {
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            kind,
            content_type: None,
            version_label: None,
            node_ref: None,
            legacy_path: String::new(),
            protocol_path: String::new(),
        }
    }

    pub fn node_ref(&self) -> Option<&str> {
        self.node_ref.as_deref()
    }

    /// Node identifier without a `;1.0` style version suffix
    pub fn node_ref_without_version(&self) -> Option<&str> {
        self.node_ref
            .as_deref()
            .map(|id| id.split(';').next().unwrap_or(id))
    }

    /// Records the server-assigned identifier. Setting it again to the same
    /// value is a no-op; a different value is rejected.
    pub fn assign_node_ref(&mut self, node_ref: impl Into<String>) -> Result<()> {
        let node_ref = node_ref.into();
        if node_ref.is_empty() {
            return Err(DataPrepError::unexpected(format!(
                "server returned an empty node identifier for '{}'",
                self.name
            )));
        }
        match &self.node_ref {
            None => {
                self.node_ref = Some(node_ref);
                Ok(())
            }
            Some(existing) if *existing == node_ref => Ok(()),
            Some(existing) => Err(DataPrepError::configuration(format!(
                "node identifier of '{}' is already '{}', refusing to change it to '{}'",
                self.name, existing, node_ref
            ))),
        }
    }

    /// Path as addressed by the legacy binding
    pub fn legacy_path(&self) -> &str {
        &self.legacy_path
    }

    /// Path as addressed by the resource API
    pub fn protocol_path(&self) -> &str {
        &self.protocol_path
    }

    /// Moves the handle to `path` under both addressing schemes
    pub fn set_location(&mut self, path: impl Into<String>) {
        let path = path.into();
        self.protocol_path = path.clone();
        self.legacy_path = path;
    }

    pub fn set_legacy_path(&mut self, path: impl Into<String>) {
        self.legacy_path = path.into();
    }

    pub fn set_protocol_path(&mut self, path: impl Into<String>) {
        self.protocol_path = path.into();
    }
}

/// Anything that wraps a [`ResourceHandle`]
pub trait AsResource {
    fn resource(&self) -> &ResourceHandle;
}

impl AsResource for ResourceHandle {
    fn resource(&self) -> &ResourceHandle {
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderHandle {
    pub resource: ResourceHandle,
}

impl FolderHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            resource: ResourceHandle::new(name, ResourceKind::Folder),
        }
    }

    pub fn random() -> Self {
        Self::new(super::random_name("Folder"))
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.resource.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.resource.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.resource.name
    }
}

impl AsResource for FolderHandle {
    fn resource(&self) -> &ResourceHandle {
        &self.resource
    }
}

/// A document and the raw bytes it is created with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    pub resource: ResourceHandle,
    pub content: Vec<u8>,
    pub file_type: FileType,
}

impl FileHandle {
    /// New file whose type is inferred from `name`
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let file_type = FileType::from_name(&name);
        Self::with_type(name, file_type)
    }

    pub fn with_type(name: impl Into<String>, file_type: FileType) -> Self {
        let mut resource = ResourceHandle::new(name, ResourceKind::File);
        resource.content_type = Some(file_type.mime_type());
        Self {
            resource,
            content: Vec::new(),
            file_type,
        }
    }

    pub fn random(file_type: FileType) -> Self {
        Self::with_type(
            format!("{}.{}", super::random_name("file"), file_type.extension()),
            file_type,
        )
    }

    /// Text or binary content; `&str`, `String` and `Vec<u8>` all fit
    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = content.into();
        self
    }

    /// Content as text, when it is valid UTF-8
    pub fn content_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.resource.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.resource.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.resource.name
    }

    /// Name with the file type's extension appended when it has none
    pub fn full_name(&self) -> String {
        if self.resource.name.contains('.') {
            self.resource.name.clone()
        } else {
            format!("{}.{}", self.resource.name, self.file_type.extension())
        }
    }

    /// The handle a check-out produces: `doc.txt` becomes
    /// `doc (Working Copy).txt` at the same location. The working copy is a
    /// distinct node, so no identifier is carried over.
    pub fn working_copy(&self) -> FileHandle {
        let name = &self.resource.name;
        let working_name = match name.rsplit_once('.') {
            Some((stem, ext)) => format!("{} (Working Copy).{}", stem, ext),
            None => format!("{} (Working Copy)", name),
        };

        let mut copy = FileHandle::with_type(working_name.clone(), self.file_type);
        copy.content = self.content.clone();
        copy.resource
            .set_legacy_path(sibling_path(self.resource.legacy_path(), &working_name));
        copy.resource
            .set_protocol_path(sibling_path(self.resource.protocol_path(), &working_name));
        copy
    }
}

/// `path` with only its last segment replaced by `name`
fn sibling_path(path: &str, name: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    paths::remove_last_slash(&paths::build_path(&paths::get_parent_path(path), &[name]))
}

impl AsResource for FileHandle {
    fn resource(&self) -> &ResourceHandle {
        &self.resource
    }
}
