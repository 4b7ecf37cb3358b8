use crate::errors::{DataPrepError, Result};
use crate::models::{AsResource, FolderHandle, ResourceHandle, ResourceKind, SiteModel, UserModel};
use super::paths;

/// The resource the next path-keyed operation acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastResource {
    pub path: String,
    pub node_ref: Option<String>,
    pub kind: Option<ResourceKind>,
}

impl LastResource {
    pub fn from_handle(handle: &ResourceHandle) -> Self {
        let path = if handle.legacy_path().is_empty() {
            handle.protocol_path()
        } else {
            handle.legacy_path()
        };
        Self {
            path: path.to_string(),
            node_ref: handle.node_ref().map(str::to_string),
            kind: Some(handle.kind),
        }
    }
}

/// State of one fluent chain: who acts, where relative creation lands, and
/// which resource was touched last.
///
/// One context per logical test. Builder steps consume and return the
/// context; operations borrow it mutably, so a context can never be driven
/// by two chains at once.
#[derive(Debug)]
pub struct SessionContext {
    current_user: Option<UserModel>,
    current_site: Option<SiteModel>,
    current_space: String,
    space_node_ref: Option<String>,
    unplaced_folder: Option<String>,
    last_resource: Option<LastResource>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    /// Fresh context anchored at the repository root
    pub fn new() -> Self {
        Self {
            current_user: None,
            current_site: None,
            current_space: paths::root_path(),
            space_node_ref: None,
            unplaced_folder: None,
            last_resource: None,
        }
    }

    /// Acts as `user` from now on; the last resource is forgotten
    pub fn using_user(mut self, user: UserModel) -> Self {
        self.current_user = Some(user);
        self.last_resource = None;
        self
    }

    /// Moves the space to the document library of `site`
    pub fn using_site(mut self, site: &SiteModel) -> Self {
        self.current_space = paths::site_document_library_path(&site.id, &[]);
        self.current_site = Some(site.clone());
        self.space_node_ref = None;
        self.unplaced_folder = None;
        self.last_resource = None;
        self
    }

    /// Moves the space to an arbitrary repository path
    pub fn using_space(mut self, path: impl Into<String>) -> Self {
        self.current_space = paths::convert_backslash_to_slash(&path.into());
        self.space_node_ref = None;
        self.unplaced_folder = None;
        self
    }

    /// Moves the space into `folder`, remembering its node identifier.
    ///
    /// A folder without a repository path leaves the session unanchored:
    /// the next creation fails with a configuration error until another
    /// `using_site`, `using_space` or `using_folder` places it again.
    pub fn using_folder(mut self, folder: &FolderHandle) -> Self {
        let location = LastResource::from_handle(&folder.resource);
        if location.path.is_empty() {
            self.unplaced_folder = Some(folder.name().to_string());
            self.space_node_ref = None;
            return self;
        }
        self.current_space = paths::build_path(&location.path, &[""]);
        self.space_node_ref = location.node_ref;
        self.unplaced_folder = None;
        self
    }

    /// Selects `handle` as the last resource; the space is left alone
    pub fn using_resource(mut self, handle: &impl AsResource) -> Self {
        self.last_resource = Some(LastResource::from_handle(handle.resource()));
        self
    }

    /// Selects a resource by path only; its identifier is looked up on demand
    pub fn set_last_resource(&mut self, path: impl Into<String>) {
        self.last_resource = Some(LastResource {
            path: paths::convert_backslash_to_slash(&path.into()),
            node_ref: None,
            kind: None,
        });
    }

    pub(crate) fn record_created(&mut self, handle: &ResourceHandle) {
        self.last_resource = Some(LastResource::from_handle(handle));
    }

    pub(crate) fn record_node_ref(&mut self, node_ref: &str) {
        if let Some(last) = self.last_resource.as_mut() {
            if last.node_ref.is_none() {
                last.node_ref = Some(node_ref.to_string());
            }
        }
    }

    /// After a rename: same node, new path
    pub(crate) fn relocate_last_resource(&mut self, path: String) {
        if let Some(last) = self.last_resource.as_mut() {
            last.path = path;
        }
    }

    pub fn last_resource(&self) -> Option<&LastResource> {
        self.last_resource.as_ref()
    }

    /// The last resource, or a configuration error when none was selected
    pub fn require_last_resource(&self) -> Result<&LastResource> {
        match &self.last_resource {
            Some(last) if !last.path.is_empty() => Ok(last),
            _ => Err(DataPrepError::configuration(
                "no last resource is set; call using_resource(..), set_last_resource(..) or create content first",
            )),
        }
    }

    pub fn current_space(&self) -> &str {
        &self.current_space
    }

    /// The space new content lands in, or a configuration error when the
    /// session was pointed at a folder that has no repository path
    pub fn require_space(&self) -> Result<&str> {
        match &self.unplaced_folder {
            Some(name) => Err(DataPrepError::configuration(format!(
                "folder '{}' has no repository path; create it before calling using_folder(..)",
                name
            ))),
            None => Ok(&self.current_space),
        }
    }

    pub fn space_node_ref(&self) -> Option<&str> {
        self.space_node_ref.as_deref()
    }

    pub fn current_user(&self) -> Option<&UserModel> {
        self.current_user.as_ref()
    }

    pub fn current_site(&self) -> Option<&SiteModel> {
        self.current_site.as_ref()
    }

    /// Back to a fresh context, keeping nothing
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
