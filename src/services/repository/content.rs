use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::errors::{DataPrepError, Result};
use crate::models::{DocumentType, FileHandle, FileType, FolderHandle, ResourceKind, SiteModel, UserModel};
use super::config::PollConfig;
use super::connection::RepositoryConnection;
use super::legacy::{Aspect, LegacyBinding, LegacyStrategy};
use super::paths;
use super::poller::{Awaited, ExistencePoller, PollOutcome};
use super::protocol::{select_strategy, Protocol};
use super::resource_api::{ResourceApiStrategy, DEFAULT_FILE_CONTENT};
use super::session::{LastResource, SessionContext};
use super::strategy::{ContentStrategy, CreationTarget};

/// Entry point for preparing repository content in tests.
///
/// Holds only what is shared by every session: the connection (and with it
/// the cached server version), the optional legacy binding, the fallback
/// admin user, and the polling budget. All per-chain state lives in the
/// [`SessionContext`] passed to each operation.
pub struct DataContent {
    connection: Arc<RepositoryConnection>,
    legacy: Option<Arc<dyn LegacyBinding>>,
    admin: UserModel,
    poller: ExistencePoller,
}

impl DataContent {
    pub fn new(connection: Arc<RepositoryConnection>, admin: UserModel, poll_config: PollConfig) -> Self {
        Self {
            connection,
            legacy: None,
            admin,
            poller: ExistencePoller::new(poll_config),
        }
    }

    /// Builds the connection from environment-derived configuration
    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        let connection = RepositoryConnection::new(config.repository_config())?;
        Ok(Self::new(Arc::new(connection), config.admin(), config.poll_config()))
    }

    /// Legacy binding for old servers and for the path-keyed operations
    /// the resource API does not cover
    pub fn with_legacy_binding(mut self, binding: Arc<dyn LegacyBinding>) -> Self {
        self.legacy = Some(binding);
        self
    }

    /// A fresh context for one logical test
    pub fn new_session(&self) -> SessionContext {
        SessionContext::new()
    }

    /// Shortcut for `session.using_user(admin)`
    pub fn using_admin(&self, session: SessionContext) -> SessionContext {
        session.using_user(self.admin.clone())
    }

    pub fn admin(&self) -> &UserModel {
        &self.admin
    }

    pub fn connection(&self) -> &Arc<RepositoryConnection> {
        &self.connection
    }

    pub fn poller(&self) -> &ExistencePoller {
        &self.poller
    }

    fn acting_user<'a>(&'a self, session: &'a SessionContext) -> &'a UserModel {
        session.current_user().unwrap_or(&self.admin)
    }

    fn legacy_binding(&self) -> Result<&Arc<dyn LegacyBinding>> {
        self.legacy.as_ref().ok_or_else(|| {
            DataPrepError::configuration("this operation needs a legacy binding; call with_legacy_binding(..)")
        })
    }

    /// Protocol for this server, from the cached version
    pub async fn protocol(&self, session: &SessionContext) -> Result<Protocol> {
        let version = self
            .connection
            .server_version(self.acting_user(session))
            .await?;
        Ok(select_strategy(version))
    }

    async fn strategy(&self, session: &SessionContext) -> Result<Box<dyn ContentStrategy>> {
        let strategy: Box<dyn ContentStrategy> = match self.protocol(session).await? {
            Protocol::ResourceApi => Box::new(ResourceApiStrategy::new(self.connection.clone())),
            Protocol::Legacy => Box::new(LegacyStrategy::new(self.legacy_binding()?.clone())),
        };
        Ok(strategy)
    }

    /// Creates folder `name` in the current space
    pub async fn create_folder(&self, session: &mut SessionContext, name: &str) -> Result<FolderHandle> {
        self.create_folder_with(session, FolderHandle::new(name)).await
    }

    /// Creates a folder with a random name in the current space
    pub async fn create_random_folder(&self, session: &mut SessionContext) -> Result<FolderHandle> {
        self.create_folder_with(session, FolderHandle::random()).await
    }

    /// Creates `folder` (name, title, description) in the current space
    pub async fn create_folder_with(
        &self,
        session: &mut SessionContext,
        mut folder: FolderHandle,
    ) -> Result<FolderHandle> {
        let space = session.require_space()?;
        info!("DATAPREP: Creating a new folder '{}' in {}", folder.name(), space);

        let strategy = self.strategy(session).await?;
        strategy
            .create_folder(self.acting_user(session), CreationTarget::from_session(session), &mut folder)
            .await?;

        session.record_created(&folder.resource);
        Ok(folder)
    }

    /// Creates `file` with its content in the current space
    pub async fn create_content(&self, session: &mut SessionContext, mut file: FileHandle) -> Result<FileHandle> {
        let space = session.require_space()?;
        info!("DATAPREP: Creating a new non-empty content '{}' in {}", file.name(), space);

        let created = self
            .create_file_in(session, CreationTarget::from_session(session), &mut file)
            .await;
        Self::finish_creation(session, file, created)
    }

    /// Runs the active strategy's file creation against `target`
    async fn create_file_in(
        &self,
        session: &SessionContext,
        target: CreationTarget<'_>,
        file: &mut FileHandle,
    ) -> Result<()> {
        let strategy = self.strategy(session).await?;
        strategy
            .create_content(self.acting_user(session), target, file)
            .await
    }

    /// A file whose node was created is the last resource, even when a
    /// later step of its creation failed
    fn finish_creation(session: &mut SessionContext, file: FileHandle, created: Result<()>) -> Result<FileHandle> {
        if created.is_ok() || file.resource.node_ref().is_some() {
            session.record_created(&file.resource);
        }
        created.map(|()| file)
    }

    /// Creates a randomly named, non-empty document of `document_type`
    pub async fn create_content_of_type(
        &self,
        session: &mut SessionContext,
        document_type: DocumentType,
    ) -> Result<FileHandle> {
        let file = FileHandle::random(FileType::from(document_type)).with_content(DEFAULT_FILE_CONTENT);
        self.create_content(session, file).await
    }

    /// Creates a document from a local file, named after it and carrying its
    /// bytes unchanged. It lands in the last resource when that is a folder,
    /// in the current space otherwise.
    pub async fn upload_document(&self, session: &mut SessionContext, local_path: &Path) -> Result<FileHandle> {
        let name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                DataPrepError::configuration(format!("'{}' has no usable file name", local_path.display()))
            })?;
        let content = tokio::fs::read(local_path).await?;
        let mut file = FileHandle::new(name).with_content(content);

        let parent = session
            .last_resource()
            .filter(|last| last.kind == Some(ResourceKind::Folder) && !last.path.is_empty())
            .cloned();
        let created = match &parent {
            Some(folder) => {
                info!("DATAPREP: Uploading '{}' to {}", local_path.display(), folder.path);
                let space = paths::build_path(&folder.path, &[""]);
                let target = CreationTarget {
                    space: &space,
                    space_node_ref: folder.node_ref.as_deref(),
                };
                self.create_file_in(session, target, &mut file).await
            }
            None => {
                let space = session.require_space()?;
                info!("DATAPREP: Uploading '{}' to {}", local_path.display(), space);
                self.create_file_in(session, CreationTarget::from_session(session), &mut file)
                    .await
            }
        };
        Self::finish_creation(session, file, created)
    }

    /// Deletes the last resource
    pub async fn delete_content(&self, session: &mut SessionContext) -> Result<()> {
        let last = session.require_last_resource()?.clone();
        info!(
            "DATAPREP: Deleting '{}' with id '{}'",
            last.path,
            last.node_ref.as_deref().unwrap_or_default()
        );

        let strategy = self.strategy(session).await?;
        strategy.delete(self.acting_user(session), &last).await
    }

    /// Deletes `folder` and everything below it
    pub async fn delete_tree(&self, session: &SessionContext, folder: &FolderHandle) -> Result<()> {
        let target = LastResource::from_handle(&folder.resource);
        if target.path.is_empty() {
            return Err(DataPrepError::configuration(format!(
                "folder '{}' has no repository path; create it first",
                folder.name()
            )));
        }
        info!("DATAPREP: Deleting tree '{}'", target.path);

        let strategy = self.strategy(session).await?;
        strategy.delete_tree(self.acting_user(session), &target).await
    }

    /// Renames the last resource in place and returns its new path
    pub async fn rename_content(&self, session: &mut SessionContext, new_name: &str) -> Result<String> {
        let path = session.require_last_resource()?.path.clone();
        info!(
            "DATAPREP: Rename content '{}' to '{}' in {}",
            paths::file_name(&path),
            new_name,
            session.current_space()
        );

        self.legacy_binding()?
            .rename(self.acting_user(session), &path, new_name)
            .await?;

        let new_path = paths::remove_last_slash(&paths::build_path(&paths::get_parent_path(&path), &[new_name]));
        session.relocate_last_resource(new_path.clone());
        Ok(new_path)
    }

    pub async fn check_out_document(&self, session: &mut SessionContext) -> Result<()> {
        let path = session.require_last_resource()?.path.clone();
        info!("DATAPREP: Check out document {}", path);
        self.legacy_binding()?
            .check_out(self.acting_user(session), &path)
            .await
    }

    pub async fn cancel_check_out(&self, session: &mut SessionContext) -> Result<()> {
        let path = session.require_last_resource()?.path.clone();
        info!("DATAPREP: Cancel check out on document {}", path);
        self.legacy_binding()?
            .cancel_check_out(self.acting_user(session), &path)
            .await
    }

    /// Checks the last resource back in with `content`; a major version
    /// goes from 1.x to 2.0
    pub async fn check_in(
        &self,
        session: &mut SessionContext,
        content: &str,
        major_version: bool,
        comment: &str,
    ) -> Result<()> {
        let path = session.require_last_resource()?.path.clone();
        info!("DATAPREP: Check in document {}", paths::file_name(&path));
        self.legacy_binding()?
            .check_in(self.acting_user(session), &path, content, major_version, comment)
            .await
    }

    pub async fn update_content(&self, session: &mut SessionContext, content: &str) -> Result<()> {
        let path = session.require_last_resource()?.path.clone();
        info!("DATAPREP: Update content for document from {}", path);
        self.legacy_binding()?
            .update_document_content(self.acting_user(session), &path, content)
            .await
    }

    pub async fn set_inherit_permissions(&self, session: &mut SessionContext, inherit: bool) -> Result<()> {
        let path = session.require_last_resource()?.path.clone();
        info!("DATAPREP: Set inherit permissions to {} for {}", inherit, path);
        self.legacy_binding()?
            .set_inherit_permissions(self.acting_user(session), &path, inherit)
            .await
    }

    /// Tags the last resource with `tag`
    pub async fn add_tag_to_content(&self, session: &mut SessionContext, tag: &str) -> Result<()> {
        info!("DATAPREP: Create '{}' tag", tag);
        let path = session.require_last_resource()?.path.clone();
        self.legacy_binding()?
            .add_tag(self.acting_user(session), &path, tag)
            .await
    }

    /// Tags are stored lower case, so `tag` matches regardless of its case
    pub async fn assert_content_has_tag(&self, session: &SessionContext, path: &str, tag: &str) -> Result<()> {
        info!("DATAPREP: Verify content {} has tag {}", path, tag);
        let path = paths::convert_backslash_to_slash(path);
        let tags = self
            .legacy_binding()?
            .tags(self.acting_user(session), &path)
            .await?;

        let wanted = tag.to_lowercase();
        if tags.iter().any(|t| *t == wanted) {
            Ok(())
        } else {
            Err(DataPrepError::assertion(format!(
                "content {} has no tag '{}' (tags: {:?})",
                path, tag, tags
            )))
        }
    }

    /// Applies `aspects` to the last resource, then the properties each one carries
    pub async fn add_aspect(&self, session: &mut SessionContext, aspects: &[Aspect]) -> Result<()> {
        let path = session.require_last_resource()?.path.clone();
        let binding = self.legacy_binding()?;
        let user = self.acting_user(session);

        let names: Vec<String> = aspects.iter().map(|a| a.name.clone()).collect();
        info!("DATAPREP: Adding aspects {:?} to {}", names, path);
        binding.add_aspects(user, &path, &names).await?;

        for aspect in aspects.iter().filter(|a| !a.properties.is_empty()) {
            info!("DATAPREP: Applying properties of aspect {}", aspect.name);
            binding.set_properties(user, &path, &aspect.properties).await?;
        }
        Ok(())
    }

    /// Adds `file` in the current site to the acting user's favorites
    pub async fn add_file_to_favorites(&self, session: &SessionContext, file: &FileHandle) -> Result<()> {
        let name = file.full_name();
        info!("DATAPREP: Add file {} to Favorites", name);
        self.add_favorite(session, &name, ResourceKind::File).await
    }

    /// Adds `folder` in the current site to the acting user's favorites
    pub async fn add_folder_to_favorites(&self, session: &SessionContext, folder: &FolderHandle) -> Result<()> {
        info!("DATAPREP: Add folder {} to Favorites", folder.name());
        self.add_favorite(session, folder.name(), ResourceKind::Folder).await
    }

    async fn add_favorite(&self, session: &SessionContext, name: &str, kind: ResourceKind) -> Result<()> {
        let site = session.current_site().ok_or_else(|| {
            DataPrepError::configuration("favorites are kept per site; call using_site(..) first")
        })?;
        self.legacy_binding()?
            .add_favorite(self.acting_user(session), &site.id, name, kind)
            .await
    }

    /// Deletes `site` as the acting user. A site the admin cannot see is
    /// left alone.
    pub async fn delete_site(&self, session: &SessionContext, site: &SiteModel) -> Result<()> {
        let binding = self.legacy_binding()?;
        if !binding.site_exists(&self.admin, &site.id).await? {
            info!("DATAPREP: Site {} does not exist, nothing to delete", site.id);
            return Ok(());
        }

        let user = self.acting_user(session);
        info!("DATAPREP: Deleting site {} with user {}", site.id, user.username);
        binding.delete_site(user, &site.id).await
    }

    pub async fn empty_user_trashcan(&self, user: &UserModel) -> Result<()> {
        info!("DATAPREP: Emptying the trashcan of {}", user.username);
        self.legacy_binding()?.empty_trashcan(user).await
    }

    /// Node identifier of the last resource, looked up by path. A hit is
    /// remembered on the session.
    pub async fn node_ref(&self, session: &mut SessionContext) -> Result<Option<String>> {
        let path = paths::convert_backslash_to_slash(&session.require_last_resource()?.path);
        let strategy = self.strategy(session).await?;
        let found = strategy
            .node_ref_by_path(self.acting_user(session), &path)
            .await?;

        if let Some(id) = &found {
            session.record_node_ref(id);
        }
        Ok(found)
    }

    async fn content_exists(&self, session: &SessionContext) -> Result<bool> {
        let path = paths::convert_backslash_to_slash(&session.require_last_resource()?.path);
        let strategy = self.strategy(session).await?;
        Ok(strategy
            .node_ref_by_path(self.acting_user(session), &path)
            .await?
            .is_some())
    }

    pub async fn assert_content_exists(&self, session: &SessionContext) -> Result<()> {
        let path = session.require_last_resource()?.path.clone();
        info!("DATAPREP: Check that content {} exists.", path);
        if self.content_exists(session).await? {
            Ok(())
        } else {
            Err(DataPrepError::assertion(format!("Content {{{}}} was NOT found in repository", path)))
        }
    }

    pub async fn assert_content_does_not_exist(&self, session: &SessionContext) -> Result<()> {
        let path = session.require_last_resource()?.path.clone();
        info!("DATAPREP: Check that content {} does not exist.", path);
        if self.content_exists(session).await? {
            Err(DataPrepError::assertion(format!("Content {{{}}} was found in repository", path)))
        } else {
            Ok(())
        }
    }

    pub async fn assert_content_version_is(&self, session: &SessionContext, expected: &str) -> Result<()> {
        let path = session.require_last_resource()?.path.clone();
        info!("DATAPREP: Asserting that the version of the '{}' content is {}", path, expected);

        let document = self
            .legacy_binding()?
            .get_document(self.acting_user(session), &path)
            .await?;
        if document.version_label == expected {
            Ok(())
        } else {
            Err(DataPrepError::assertion(format!(
                "version of '{}' is {}, expected {}",
                path, document.version_label, expected
            )))
        }
    }

    pub async fn assert_content_size_is(&self, session: &SessionContext, size_in_bytes: u64) -> Result<()> {
        let path = session.require_last_resource()?.path.clone();
        info!("DATAPREP: Asserting that the size of the '{}' content is {}", path, size_in_bytes);

        let document = self
            .legacy_binding()?
            .get_document(self.acting_user(session), &path)
            .await?;
        if document.content_length == size_in_bytes {
            Ok(())
        } else {
            Err(DataPrepError::assertion(format!(
                "The size of the content is not as expected: '{}' has {} bytes, expected {}",
                path, document.content_length, size_in_bytes
            )))
        }
    }

    /// Polls until something exists at `path`
    pub async fn wait_until_content_is_created(&self, session: &SessionContext, path: &str) -> Result<PollOutcome> {
        self.wait_for(session, path, Awaited::Created).await
    }

    /// Polls until nothing exists at `path`
    pub async fn wait_until_content_is_deleted(&self, session: &SessionContext, path: &str) -> Result<PollOutcome> {
        self.wait_for(session, path, Awaited::Deleted).await
    }

    async fn wait_for(&self, session: &SessionContext, path: &str, awaited: Awaited) -> Result<PollOutcome> {
        let strategy = self.strategy(session).await?;
        let strategy = strategy.as_ref();
        let user = self.acting_user(session);
        let path = paths::convert_backslash_to_slash(path);
        let lookup_path = path.as_str();

        self.poller
            .wait_for(&path, awaited, self.poller.budget_for(awaited), move || async move {
                Ok::<_, DataPrepError>(strategy.node_ref_by_path(user, lookup_path).await?.is_some())
            })
            .await
    }
}
