//! Test utilities for exercising the content engine without a live server
//!
//! `InMemoryBinding` stands in for the legacy document-management binding;
//! the JSON helpers build resource-API payloads for wiremock servers.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::errors::{DataPrepError, Result};
use crate::models::{DocumentType, ResourceKind, UserModel};
use crate::services::repository::legacy::{LegacyBinding, LegacyDocument};
use crate::services::repository::paths;

/// Discovery payload reporting `major.minor`
pub fn discovery_payload(major: u32, minor: u32) -> Value {
    json!({
        "entry": {
            "repository": {
                "edition": "Community",
                "version": {
                    "major": major.to_string(),
                    "minor": minor.to_string(),
                    "patch": "0",
                    "display": format!("{}.{}.0", major, minor)
                }
            }
        }
    })
}

/// Node entry as returned by create and lookup calls
pub fn node_entry(id: &str, name: &str) -> Value {
    json!({
        "entry": {
            "id": id,
            "name": name,
            "isFolder": !name.contains('.'),
            "properties": {}
        }
    })
}

/// Error payload carrying `brief_summary`
pub fn error_payload(status: u16, brief_summary: &str) -> Value {
    json!({
        "error": {
            "errorKey": "framework.exception.ApiDefault",
            "statusCode": status,
            "briefSummary": brief_summary
        }
    })
}

#[derive(Debug, Clone)]
struct StoredNode {
    id: String,
    kind: ResourceKind,
    content: Vec<u8>,
    major: u32,
    minor: u32,
    checked_out: bool,
    inherit_permissions: bool,
    properties: BTreeMap<String, String>,
    aspects: BTreeSet<String>,
    tags: Vec<String>,
}

impl StoredNode {
    fn folder() -> Self {
        Self::new(ResourceKind::Folder, Vec::new())
    }

    fn new(kind: ResourceKind, content: Vec<u8>) -> Self {
        Self {
            id: format!("workspace://SpacesStore/{}", uuid::Uuid::new_v4()),
            kind,
            content,
            major: 1,
            minor: 0,
            checked_out: false,
            inherit_permissions: true,
            properties: BTreeMap::new(),
            aspects: BTreeSet::new(),
            tags: Vec::new(),
        }
    }
}

fn key(path: &str) -> String {
    let path = paths::remove_last_slash(&paths::convert_backslash_to_slash(path));
    if path.is_empty() {
        paths::root_path()
    } else {
        path
    }
}

fn child_key(parent: &str, name: &str) -> String {
    key(&paths::build_path(&key(parent), &[name]))
}

fn working_copy_key(path: &str) -> String {
    let name = paths::file_name(path);
    let working = match name.rsplit_once('.') {
        Some((stem, ext)) => format!("{} (Working Copy).{}", stem, ext),
        None => format!("{} (Working Copy)", name),
    };
    child_key(&paths::get_parent_path(path), &working)
}

fn site_key(site_id: &str) -> String {
    child_key(paths::SITES_PATH, site_id)
}

fn is_under(candidate: &str, root: &str) -> bool {
    candidate == root || candidate.starts_with(&format!("{}/", root))
}

/// Legacy binding over an in-memory tree keyed by path
#[derive(Debug)]
pub struct InMemoryBinding {
    nodes: Mutex<BTreeMap<String, StoredNode>>,
    favorites: Mutex<BTreeSet<(String, String)>>,
    trashcans: Mutex<BTreeMap<String, Vec<String>>>,
    pending_conflicts: AtomicU32,
    create_document_calls: AtomicU32,
}

impl Default for InMemoryBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBinding {
    /// Empty repository holding only the root folder
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(paths::root_path(), StoredNode::folder());
        Self {
            nodes: Mutex::new(nodes),
            favorites: Mutex::new(BTreeSet::new()),
            trashcans: Mutex::new(BTreeMap::new()),
            pending_conflicts: AtomicU32::new(0),
            create_document_calls: AtomicU32::new(0),
        }
    }

    /// Repository with `/Sites/<site_id>/documentLibrary` in place
    pub fn with_site(site_id: &str) -> Self {
        let binding = Self::new();
        binding.add_folders(&paths::site_document_library_path(site_id, &[]));
        binding
    }

    /// Creates `path` and any missing ancestors as folders
    pub fn add_folders(&self, path: &str) {
        let Ok(mut nodes) = self.nodes() else { return };
        let mut current = paths::root_path();
        for segment in key(path).split('/').filter(|s| !s.is_empty()) {
            current = child_key(&current, segment);
            nodes.entry(current.clone()).or_insert_with(StoredNode::folder);
        }
    }

    /// The next `count` document creations fail with a storage conflict
    pub fn inject_storage_conflicts(&self, count: u32) {
        self.pending_conflicts.store(count, Ordering::SeqCst);
    }

    pub fn create_document_calls(&self) -> u32 {
        self.create_document_calls.load(Ordering::SeqCst)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes().map(|n| n.contains_key(&key(path))).unwrap_or(false)
    }

    /// Stored content as text; invalid UTF-8 is replaced
    pub fn content(&self, path: &str) -> Option<String> {
        self.read(path, |node| String::from_utf8_lossy(&node.content).into_owned())
    }

    pub fn content_bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.read(path, |node| node.content.clone())
    }

    pub fn has_aspect(&self, path: &str, aspect: &str) -> bool {
        self.read(path, |node| node.aspects.contains(aspect)).unwrap_or(false)
    }

    pub fn is_favorite(&self, username: &str, path: &str) -> bool {
        self.favorites
            .lock()
            .map(|f| f.contains(&(username.to_string(), key(path))))
            .unwrap_or(false)
    }

    /// Paths `username` deleted since the trashcan was last emptied
    pub fn trashcan(&self, username: &str) -> Vec<String> {
        self.trashcans
            .lock()
            .ok()
            .and_then(|t| t.get(username).cloned())
            .unwrap_or_default()
    }

    pub fn property(&self, path: &str, name: &str) -> Option<String> {
        self.read(path, |node| node.properties.get(name).cloned()).flatten()
    }

    pub fn is_checked_out(&self, path: &str) -> bool {
        self.read(path, |node| node.checked_out).unwrap_or(false)
    }

    pub fn inherits_permissions(&self, path: &str) -> Option<bool> {
        self.read(path, |node| node.inherit_permissions)
    }

    fn read<T>(&self, path: &str, f: impl FnOnce(&StoredNode) -> T) -> Option<T> {
        self.nodes().ok()?.get(&key(path)).map(f)
    }

    fn nodes(&self) -> Result<MutexGuard<'_, BTreeMap<String, StoredNode>>> {
        self.nodes
            .lock()
            .map_err(|_| DataPrepError::binding("in-memory repository lock poisoned"))
    }

    fn trash(&self, user: &UserModel, path: String) -> Result<()> {
        self.trashcans
            .lock()
            .map_err(|_| DataPrepError::binding("in-memory trashcan lock poisoned"))?
            .entry(user.username.clone())
            .or_default()
            .push(path);
        Ok(())
    }

    fn insert_child(&self, parent_path: &str, name: &str, node: StoredNode) -> Result<String> {
        let mut nodes = self.nodes()?;
        let parent = key(parent_path);
        match nodes.get(&parent) {
            Some(p) if p.kind == ResourceKind::Folder => {}
            Some(_) => return Err(DataPrepError::binding(format!("'{}' is not a folder", parent))),
            None => return Err(DataPrepError::binding(format!("Object not found: {}", parent))),
        }

        let path = child_key(&parent, name);
        if nodes.contains_key(&path) {
            return Err(DataPrepError::binding(format!("Content already exists: {}", path)));
        }

        let id = node.id.clone();
        nodes.insert(path, node);
        Ok(id)
    }

    fn with_node<T>(&self, path: &str, f: impl FnOnce(&mut StoredNode) -> Result<T>) -> Result<T> {
        let mut nodes = self.nodes()?;
        let path = key(path);
        let node = nodes
            .get_mut(&path)
            .ok_or_else(|| DataPrepError::binding(format!("Object not found: {}", path)))?;
        f(node)
    }
}

#[async_trait]
impl LegacyBinding for InMemoryBinding {
    async fn create_folder(&self, _user: &UserModel, parent_path: &str, name: &str) -> Result<String> {
        self.insert_child(parent_path, name, StoredNode::folder())
    }

    async fn create_document(
        &self,
        _user: &UserModel,
        parent_path: &str,
        _document_type: DocumentType,
        name: &str,
        content: &[u8],
    ) -> Result<String> {
        self.create_document_calls.fetch_add(1, Ordering::SeqCst);

        let pending = self.pending_conflicts.load(Ordering::SeqCst);
        if pending > 0 {
            self.pending_conflicts.store(pending - 1, Ordering::SeqCst);
            return Err(DataPrepError::StorageConflict {
                path: child_key(parent_path, name),
                details: "Transaction lock held by another writer".to_string(),
            });
        }

        self.insert_child(
            parent_path,
            name,
            StoredNode::new(ResourceKind::File, content.to_vec()),
        )
    }

    async fn set_properties(
        &self,
        _user: &UserModel,
        path: &str,
        properties: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.with_node(path, |node| {
            node.properties
                .extend(properties.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(())
        })
    }

    async fn delete_by_path(&self, user: &UserModel, path: &str) -> Result<()> {
        let path = key(path);
        {
            let mut nodes = self.nodes()?;
            if !nodes.contains_key(&path) {
                return Err(DataPrepError::binding(format!("Object not found: {}", path)));
            }
            let has_children = nodes.keys().any(|k| *k != path && is_under(k, &path));
            if has_children {
                return Err(DataPrepError::binding(format!("Folder is not empty: {}", path)));
            }
            nodes.remove(&path);
        }
        self.trash(user, path)
    }

    async fn delete_tree_by_path(&self, user: &UserModel, path: &str) -> Result<()> {
        let path = key(path);
        {
            let mut nodes = self.nodes()?;
            if !nodes.contains_key(&path) {
                return Err(DataPrepError::binding(format!("Object not found: {}", path)));
            }
            nodes.retain(|k, _| !is_under(k, &path));
        }
        self.trash(user, path)
    }

    async fn get_node_ref_by_path(&self, _user: &UserModel, path: &str) -> Result<Option<String>> {
        Ok(self.nodes()?.get(&key(path)).map(|node| node.id.clone()))
    }

    async fn rename(&self, _user: &UserModel, path: &str, new_name: &str) -> Result<()> {
        let mut nodes = self.nodes()?;
        let from = key(path);
        if !nodes.contains_key(&from) {
            return Err(DataPrepError::binding(format!("Object not found: {}", from)));
        }
        let to = child_key(&paths::get_parent_path(&from), new_name);
        if nodes.contains_key(&to) {
            return Err(DataPrepError::binding(format!("Content already exists: {}", to)));
        }

        let moved: Vec<String> = nodes.keys().filter(|k| is_under(k, &from)).cloned().collect();
        for old in moved {
            if let Some(node) = nodes.remove(&old) {
                let new = format!("{}{}", to, &old[from.len()..]);
                nodes.insert(new, node);
            }
        }
        Ok(())
    }

    async fn check_out(&self, _user: &UserModel, path: &str) -> Result<()> {
        let mut nodes = self.nodes()?;
        let path = key(path);
        let node = nodes
            .get_mut(&path)
            .ok_or_else(|| DataPrepError::binding(format!("Object not found: {}", path)))?;
        if node.kind != ResourceKind::File {
            return Err(DataPrepError::binding(format!("Only documents can be checked out: {}", path)));
        }
        if node.checked_out {
            return Err(DataPrepError::binding(format!("Document is already checked out: {}", path)));
        }
        node.checked_out = true;
        let copy = StoredNode::new(ResourceKind::File, node.content.clone());
        nodes.insert(working_copy_key(&path), copy);
        Ok(())
    }

    async fn cancel_check_out(&self, _user: &UserModel, path: &str) -> Result<()> {
        let mut nodes = self.nodes()?;
        let path = key(path);
        let node = nodes
            .get_mut(&path)
            .ok_or_else(|| DataPrepError::binding(format!("Object not found: {}", path)))?;
        if !node.checked_out {
            return Err(DataPrepError::binding(format!("Document is not checked out: {}", path)));
        }
        node.checked_out = false;
        nodes.remove(&working_copy_key(&path));
        Ok(())
    }

    async fn check_in(
        &self,
        _user: &UserModel,
        path: &str,
        content: &str,
        major_version: bool,
        _comment: &str,
    ) -> Result<()> {
        let mut nodes = self.nodes()?;
        let path = key(path);
        let node = nodes
            .get_mut(&path)
            .ok_or_else(|| DataPrepError::binding(format!("Object not found: {}", path)))?;
        if !node.checked_out {
            return Err(DataPrepError::binding(format!("Document is not checked out: {}", path)));
        }
        node.checked_out = false;
        node.content = content.as_bytes().to_vec();
        if major_version {
            node.major += 1;
            node.minor = 0;
        } else {
            node.minor += 1;
        }
        nodes.remove(&working_copy_key(&path));
        Ok(())
    }

    async fn set_inherit_permissions(&self, _user: &UserModel, path: &str, inherit: bool) -> Result<()> {
        self.with_node(path, |node| {
            node.inherit_permissions = inherit;
            Ok(())
        })
    }

    async fn update_document_content(&self, _user: &UserModel, path: &str, content: &str) -> Result<()> {
        self.with_node(path, |node| {
            if node.kind != ResourceKind::File {
                return Err(DataPrepError::binding("Only documents have content"));
            }
            node.content = content.as_bytes().to_vec();
            node.minor += 1;
            Ok(())
        })
    }

    async fn get_document(&self, _user: &UserModel, path: &str) -> Result<LegacyDocument> {
        let path = key(path);
        self.with_node(&path, |node| {
            if node.kind != ResourceKind::File {
                return Err(DataPrepError::binding(format!("Not a document: {}", path)));
            }
            Ok(LegacyDocument {
                id: node.id.clone(),
                name: paths::file_name(&path).to_string(),
                path: path.clone(),
                version_label: format!("{}.{}", node.major, node.minor),
                content_length: node.content.len() as u64,
            })
        })
    }

    async fn add_tag(&self, _user: &UserModel, path: &str, tag: &str) -> Result<()> {
        self.with_node(path, |node| {
            let tag = tag.to_lowercase();
            if !node.tags.contains(&tag) {
                node.tags.push(tag);
            }
            Ok(())
        })
    }

    async fn tags(&self, _user: &UserModel, path: &str) -> Result<Vec<String>> {
        self.with_node(path, |node| Ok(node.tags.clone()))
    }

    async fn add_aspects(&self, _user: &UserModel, path: &str, aspect_names: &[String]) -> Result<()> {
        self.with_node(path, |node| {
            node.aspects.extend(aspect_names.iter().cloned());
            Ok(())
        })
    }

    async fn add_favorite(&self, user: &UserModel, site_id: &str, name: &str, kind: ResourceKind) -> Result<()> {
        let path = key(&paths::site_document_library_path(site_id, &[name]));
        let found = self.read(&path, |node| node.kind);
        if found != Some(kind) {
            return Err(DataPrepError::binding(format!("Object not found: {}", path)));
        }
        self.favorites
            .lock()
            .map_err(|_| DataPrepError::binding("in-memory favorites lock poisoned"))?
            .insert((user.username.clone(), path));
        Ok(())
    }

    async fn site_exists(&self, _user: &UserModel, site_id: &str) -> Result<bool> {
        Ok(self.nodes()?.contains_key(&site_key(site_id)))
    }

    async fn delete_site(&self, user: &UserModel, site_id: &str) -> Result<()> {
        let site = site_key(site_id);
        {
            let mut nodes = self.nodes()?;
            if !nodes.contains_key(&site) {
                return Err(DataPrepError::binding(format!("Site not found: {}", site_id)));
            }
            nodes.retain(|k, _| !is_under(k, &site));
        }
        self.trash(user, site)
    }

    async fn empty_trashcan(&self, user: &UserModel) -> Result<()> {
        self.trashcans
            .lock()
            .map_err(|_| DataPrepError::binding("in-memory trashcan lock poisoned"))?
            .remove(&user.username);
        Ok(())
    }
}
