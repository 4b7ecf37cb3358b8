use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{DocumentType, FileHandle, FileType, FolderHandle, SiteModel, UserModel};
use crate::services::repository::{
    Aspect, DataContent, PollConfig, PollOutcome, Protocol, RepositoryConfig, RepositoryConnection,
    ServerVersion, SessionContext, TimeoutPolicy,
};
use crate::test_utils::InMemoryBinding;

const LIBRARY: &str = "/Sites/test/documentLibrary";

/// DataContent pinned to a 5.1 server, so no discovery request is made
fn legacy_data_content() -> (Arc<InMemoryBinding>, DataContent) {
    let mut config = RepositoryConfig::new("http://127.0.0.1:9");
    config.server_version = Some(ServerVersion::new(5, 1));
    let connection = RepositoryConnection::new(config).expect("Failed to create test connection");

    let poll = PollConfig {
        creation_attempts: 2,
        deletion_attempts: 2,
        interval: Duration::ZERO,
        on_timeout: TimeoutPolicy::BestEffort,
    };

    let binding = Arc::new(InMemoryBinding::with_site("test"));
    let data = DataContent::new(Arc::new(connection), UserModel::new("admin", "admin"), poll)
        .with_legacy_binding(binding.clone());
    (binding, data)
}

fn site_session(data: &DataContent) -> SessionContext {
    data.using_admin(data.new_session()).using_site(&SiteModel::new("test"))
}

#[tokio::test]
async fn test_protocol_is_legacy() {
    let (_binding, data) = legacy_data_content();
    assert_eq!(data.protocol(&data.new_session()).await.unwrap(), Protocol::Legacy);
}

#[tokio::test]
async fn test_folder_lifecycle() {
    let (binding, data) = legacy_data_content();
    let mut session = site_session(&data);

    let folder = data.create_folder(&mut session, "F1").await.unwrap();
    assert_eq!(folder.resource.legacy_path(), "/Sites/test/documentLibrary/F1");
    assert!(folder.resource.node_ref().is_some());
    data.assert_content_exists(&session).await.unwrap();

    data.delete_content(&mut session).await.unwrap();
    data.assert_content_does_not_exist(&session).await.unwrap();
    assert!(!binding.contains("/Sites/test/documentLibrary/F1"));
}

#[tokio::test]
async fn test_binding_errors_pass_through_unchanged() {
    let (_binding, data) = legacy_data_content();
    let mut session = site_session(&data);

    data.create_folder(&mut session, "F1").await.unwrap();
    let err = data.create_folder(&mut session, "F1").await.unwrap_err();
    assert_eq!(err.error_code(), "BINDING_ERROR");
}

#[tokio::test]
async fn test_storage_conflict_is_retried_once() {
    let (binding, data) = legacy_data_content();
    binding.inject_storage_conflicts(1);
    let mut session = site_session(&data);

    let file = data
        .create_content(&mut session, FileHandle::new("retry.txt").with_content("data"))
        .await
        .unwrap();

    assert_eq!(binding.create_document_calls(), 2);
    assert_eq!(binding.content(file.resource.legacy_path()).as_deref(), Some("data"));
}

#[tokio::test]
async fn test_content_in_nested_folder() {
    let (binding, data) = legacy_data_content();
    let mut session = site_session(&data);

    let folder = data.create_folder(&mut session, "Parent").await.unwrap();
    let mut session = session.using_folder(&folder);
    let file = data
        .create_content(&mut session, FileHandle::with_type("child", FileType::Pdf))
        .await
        .unwrap();

    assert_eq!(file.name(), "child.pdf");
    assert_eq!(file.resource.legacy_path(), "/Sites/test/documentLibrary/Parent/child.pdf");
    assert!(binding.contains("/Sites/test/documentLibrary/Parent/child.pdf"));

    data.delete_tree(&session, &folder).await.unwrap();
    assert!(!binding.contains("/Sites/test/documentLibrary/Parent"));
    assert!(binding.contains(LIBRARY));
}

#[tokio::test]
async fn test_create_content_of_type() {
    let (binding, data) = legacy_data_content();
    let mut session = site_session(&data);

    let file = data
        .create_content_of_type(&mut session, DocumentType::MsWord)
        .await
        .unwrap();

    assert!(file.name().starts_with("file-"));
    assert!(file.name().ends_with(".doc"));
    assert_eq!(binding.content(file.resource.legacy_path()).as_deref(), Some("This is a test file"));
}

#[tokio::test]
async fn test_rename_moves_last_resource() {
    let (binding, data) = legacy_data_content();
    let mut session = site_session(&data);

    let file = data
        .create_content(&mut session, FileHandle::new("old.txt"))
        .await
        .unwrap();
    let new_path = data.rename_content(&mut session, "new.txt").await.unwrap();

    assert_eq!(new_path, "/Sites/test/documentLibrary/new.txt");
    assert!(!binding.contains("/Sites/test/documentLibrary/old.txt"));

    let last = session.last_resource().unwrap();
    assert_eq!(last.path, new_path);
    assert_eq!(last.node_ref.as_deref(), file.resource.node_ref());
    data.assert_content_exists(&session).await.unwrap();
}

#[tokio::test]
async fn test_check_out_check_in_versions() {
    let (binding, data) = legacy_data_content();
    let mut session = site_session(&data);

    let file = data
        .create_content(&mut session, FileHandle::new("doc.txt").with_content("first"))
        .await
        .unwrap();
    data.assert_content_version_is(&session, "1.0").await.unwrap();

    data.check_out_document(&mut session).await.unwrap();
    assert!(binding.is_checked_out(file.resource.legacy_path()));
    assert!(binding.contains(file.working_copy().resource.legacy_path()));

    data.check_in(&mut session, "second version", true, "major change").await.unwrap();
    data.assert_content_version_is(&session, "2.0").await.unwrap();
    data.assert_content_size_is(&session, "second version".len() as u64).await.unwrap();

    let err = data.assert_content_version_is(&session, "1.0").await.unwrap_err();
    assert!(err.is_assertion());
}

#[tokio::test]
async fn test_cancel_check_out_removes_working_copy() {
    let (binding, data) = legacy_data_content();
    let mut session = site_session(&data);

    let file = data
        .create_content(&mut session, FileHandle::new("draft.txt"))
        .await
        .unwrap();
    data.check_out_document(&mut session).await.unwrap();
    data.cancel_check_out(&mut session).await.unwrap();

    assert!(!binding.is_checked_out(file.resource.legacy_path()));
    assert!(!binding.contains(file.working_copy().resource.legacy_path()));
}

#[tokio::test]
async fn test_update_content_and_permissions() {
    let (binding, data) = legacy_data_content();
    let mut session = site_session(&data);

    let file = data
        .create_content(&mut session, FileHandle::new("notes.txt").with_content("a"))
        .await
        .unwrap();

    data.update_content(&mut session, "abcdef").await.unwrap();
    data.assert_content_size_is(&session, 6).await.unwrap();
    data.assert_content_version_is(&session, "1.1").await.unwrap();

    data.set_inherit_permissions(&mut session, false).await.unwrap();
    assert_eq!(binding.inherits_permissions(file.resource.legacy_path()), Some(false));
}

#[tokio::test]
async fn test_every_last_resource_operation_needs_a_selection() {
    let (_binding, data) = legacy_data_content();
    let mut session = site_session(&data);

    assert!(data.delete_content(&mut session).await.unwrap_err().is_configuration());
    assert!(data.rename_content(&mut session, "x").await.unwrap_err().is_configuration());
    assert!(data.check_out_document(&mut session).await.unwrap_err().is_configuration());
    assert!(data.cancel_check_out(&mut session).await.unwrap_err().is_configuration());
    assert!(data.check_in(&mut session, "c", false, "").await.unwrap_err().is_configuration());
    assert!(data.update_content(&mut session, "c").await.unwrap_err().is_configuration());
    assert!(data.set_inherit_permissions(&mut session, true).await.unwrap_err().is_configuration());
    assert!(data.assert_content_exists(&session).await.unwrap_err().is_configuration());
    assert!(data.assert_content_does_not_exist(&session).await.unwrap_err().is_configuration());
    assert!(data.assert_content_version_is(&session, "1.0").await.unwrap_err().is_configuration());
    assert!(data.assert_content_size_is(&session, 0).await.unwrap_err().is_configuration());
    assert!(data.node_ref(&mut session).await.unwrap_err().is_configuration());
    assert!(data.add_tag_to_content(&mut session, "t").await.unwrap_err().is_configuration());
    assert!(data.add_aspect(&mut session, &[Aspect::new("cm:titled")]).await.unwrap_err().is_configuration());
}

#[tokio::test]
async fn test_upload_document_from_disk() {
    let (binding, data) = legacy_data_content();
    let mut session = site_session(&data);

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("upload.txt");
    let mut handle = std::fs::File::create(&local).unwrap();
    write!(handle, "uploaded body").unwrap();

    let file = data.upload_document(&mut session, &local).await.unwrap();
    assert_eq!(file.name(), "upload.txt");
    assert_eq!(
        binding.content("/Sites/test/documentLibrary/upload.txt").as_deref(),
        Some("uploaded body")
    );
}

#[tokio::test]
async fn test_wait_until_content_is_created() {
    let (_binding, data) = legacy_data_content();
    let mut session = site_session(&data);

    let folder = data.create_folder(&mut session, "Ready").await.unwrap();
    let outcome = data
        .wait_until_content_is_created(&session, folder.resource.legacy_path())
        .await
        .unwrap();
    assert!(outcome.is_confirmed());

    let outcome = data
        .wait_until_content_is_created(&session, "/Sites/test/documentLibrary/Missing")
        .await
        .unwrap();
    assert_eq!(outcome, PollOutcome::TimedOut { attempts: 2 });
}

#[tokio::test]
async fn test_sessions_for_different_users_are_independent() {
    let (_binding, data) = legacy_data_content();

    let mut alice = data
        .new_session()
        .using_user(UserModel::new("alice", "pw"))
        .using_site(&SiteModel::new("test"));
    let mut bob = data
        .new_session()
        .using_user(UserModel::new("bob", "pw"))
        .using_site(&SiteModel::new("test"));

    data.create_folder(&mut alice, "AliceFolder").await.unwrap();
    data.create_folder(&mut bob, "BobFolder").await.unwrap();

    assert_eq!(alice.last_resource().unwrap().path, "/Sites/test/documentLibrary/AliceFolder");
    assert_eq!(bob.last_resource().unwrap().path, "/Sites/test/documentLibrary/BobFolder");
    assert_eq!(alice.current_user().unwrap().username, "alice");
    assert_eq!(bob.current_user().unwrap().username, "bob");
}

#[tokio::test]
async fn test_unplaced_folder_never_falls_back_to_root() {
    let (binding, data) = legacy_data_content();
    let mut session = site_session(&data).using_folder(&FolderHandle::new("F1"));

    let err = data.create_folder(&mut session, "Child").await.unwrap_err();
    assert!(err.is_configuration());
    assert!(!binding.contains("/Child"));
    assert!(!binding.contains("/Sites/test/documentLibrary/Child"));
}

#[tokio::test]
async fn test_upload_binary_document_into_last_folder() {
    let (binding, data) = legacy_data_content();
    let mut session = site_session(&data);
    data.create_folder(&mut session, "Scans").await.unwrap();

    let bytes: Vec<u8> = vec![0x25, 0x50, 0x44, 0x46, 0xff, 0xfe, 0x00, 0x81];
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("scan.pdf");
    std::fs::write(&local, &bytes).unwrap();

    let file = data.upload_document(&mut session, &local).await.unwrap();
    assert_eq!(file.resource.legacy_path(), "/Sites/test/documentLibrary/Scans/scan.pdf");
    assert_eq!(
        binding.content_bytes("/Sites/test/documentLibrary/Scans/scan.pdf"),
        Some(bytes.clone())
    );
    assert_eq!(session.last_resource().unwrap().path, file.resource.legacy_path());
    data.assert_content_size_is(&session, bytes.len() as u64).await.unwrap();
}

#[tokio::test]
async fn test_tags_are_matched_case_insensitively() {
    let (_binding, data) = legacy_data_content();
    let mut session = site_session(&data);
    let file = data
        .create_content(&mut session, FileHandle::new("tagged.txt"))
        .await
        .unwrap();

    data.add_tag_to_content(&mut session, "Quarterly").await.unwrap();
    data.assert_content_has_tag(&session, file.resource.legacy_path(), "QUARTERLY")
        .await
        .unwrap();

    let err = data
        .assert_content_has_tag(&session, file.resource.legacy_path(), "annual")
        .await
        .unwrap_err();
    assert!(err.is_assertion());
}

#[tokio::test]
async fn test_add_aspect_applies_names_then_properties() {
    let (binding, data) = legacy_data_content();
    let mut session = site_session(&data);
    let file = data
        .create_content(&mut session, FileHandle::new("aspected.txt"))
        .await
        .unwrap();

    let aspects = [
        Aspect::new("cm:titled"),
        Aspect::new("cm:author").with_property("cm:author", "Alice"),
    ];
    data.add_aspect(&mut session, &aspects).await.unwrap();

    let path = file.resource.legacy_path();
    assert!(binding.has_aspect(path, "cm:titled"));
    assert!(binding.has_aspect(path, "cm:author"));
    assert_eq!(binding.property(path, "cm:author"), Some("Alice".to_string()));
}

#[tokio::test]
async fn test_favorites_need_a_site() {
    let (binding, data) = legacy_data_content();
    let mut session = site_session(&data);
    let folder = data.create_folder(&mut session, "Fav").await.unwrap();
    let file = data
        .create_content(&mut session, FileHandle::with_type("fav", FileType::Html))
        .await
        .unwrap();

    data.add_folder_to_favorites(&session, &folder).await.unwrap();
    data.add_file_to_favorites(&session, &file).await.unwrap();
    assert!(binding.is_favorite("admin", "/Sites/test/documentLibrary/Fav"));
    assert!(binding.is_favorite("admin", "/Sites/test/documentLibrary/fav.html"));

    let no_site = data.using_admin(data.new_session());
    let err = data.add_folder_to_favorites(&no_site, &folder).await.unwrap_err();
    assert!(err.is_configuration());
}

#[tokio::test]
async fn test_delete_site_is_a_no_op_when_absent() {
    let (binding, data) = legacy_data_content();
    let session = site_session(&data);

    data.delete_site(&session, &SiteModel::new("test")).await.unwrap();
    assert!(!binding.contains("/Sites/test"));
    assert!(binding.contains("/Sites"));

    data.delete_site(&session, &SiteModel::new("test")).await.unwrap();
}

#[tokio::test]
async fn test_empty_user_trashcan() {
    let (binding, data) = legacy_data_content();
    let mut session = site_session(&data);
    data.create_folder(&mut session, "Gone").await.unwrap();
    data.delete_content(&mut session).await.unwrap();
    assert_eq!(binding.trashcan("admin"), vec!["/Sites/test/documentLibrary/Gone".to_string()]);

    data.empty_user_trashcan(data.admin()).await.unwrap();
    assert!(binding.trashcan("admin").is_empty());
}
