use async_trait::async_trait;

use crate::errors::Result;
use crate::models::{FileHandle, FolderHandle, UserModel};
use super::paths;
use super::protocol::Protocol;
use super::session::{LastResource, SessionContext};

/// Where new content lands: the session's space, plus the space folder's
/// node identifier when the session knows it
#[derive(Debug, Clone, Copy)]
pub struct CreationTarget<'a> {
    pub space: &'a str,
    pub space_node_ref: Option<&'a str>,
}

impl<'a> CreationTarget<'a> {
    pub fn from_session(session: &'a SessionContext) -> Self {
        Self {
            space: session.current_space(),
            space_node_ref: session.space_node_ref(),
        }
    }

    /// Location of a child called `name`, without a trailing slash
    pub fn child_path(&self, name: &str) -> String {
        paths::remove_last_slash(&paths::build_path(self.space, &[name]))
    }

    /// The space as a parent path for path-keyed calls
    pub fn parent_path(&self) -> String {
        let parent = paths::remove_last_slash(self.space);
        if parent.is_empty() {
            paths::root_path()
        } else {
            parent
        }
    }
}

/// Create/delete/lookup against one backend protocol.
///
/// Implementations fill the handle they are given: node identifier on
/// success, both paths, and whatever the server reports back.
#[async_trait]
pub trait ContentStrategy: Send + Sync {
    fn protocol(&self) -> Protocol;

    async fn create_folder(
        &self,
        user: &UserModel,
        target: CreationTarget<'_>,
        folder: &mut FolderHandle,
    ) -> Result<()>;

    async fn create_content(
        &self,
        user: &UserModel,
        target: CreationTarget<'_>,
        file: &mut FileHandle,
    ) -> Result<()>;

    /// Deletes one resource; folders go with their children
    async fn delete(&self, user: &UserModel, resource: &LastResource) -> Result<()>;

    /// Deletes a folder and everything under it
    async fn delete_tree(&self, user: &UserModel, resource: &LastResource) -> Result<()>;

    /// Node identifier at `path`, `None` when nothing is there
    async fn node_ref_by_path(&self, user: &UserModel, path: &str) -> Result<Option<String>>;
}
