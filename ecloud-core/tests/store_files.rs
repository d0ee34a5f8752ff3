use std::path::PathBuf;

use ecloud_core::contract::{CloudId, MockRepositoryClient, PersistOutcome, RemoteError};
use ecloud_core::store::{store_files, FileEntry, StoreRequest};

const VERSION_URL: &str = "http://localhost:8080/mcs/records/CLOUD1/representations/txt/versions/v1";

fn cloud_id() -> CloudId {
    CloudId {
        id: "CLOUD1".to_string(),
        provider_id: "prov".to_string(),
        record_id: "rec".to_string(),
    }
}

fn status(operation: &'static str, status: u16) -> RemoteError {
    RemoteError::UnexpectedStatus {
        operation,
        status,
        body: String::new(),
    }
}

fn request(files: Vec<FileEntry>, data_set_id: Option<&str>) -> StoreRequest {
    StoreRequest {
        provider_id: "prov".to_string(),
        data_set_id: data_set_id.map(str::to_string),
        record_id: Some("rec".to_string()),
        files,
    }
}

fn path(p: &str) -> FileEntry {
    FileEntry::Path(PathBuf::from(p))
}

fn named(rep_name: &str, p: &str) -> FileEntry {
    FileEntry::Named {
        rep_name: rep_name.to_string(),
        path: PathBuf::from(p),
    }
}

#[tokio::test]
async fn files_with_same_extension_share_one_representation() {
    let mut client = MockRepositoryClient::new();
    client
        .expect_create_cloud_id()
        .times(1)
        .returning(|_| Ok(cloud_id()));
    client
        .expect_create_representation()
        .withf(|cloud_id: &str, name: &str, provider_id: &str| {
            cloud_id == "CLOUD1" && name == "txt" && provider_id == "prov"
        })
        .times(1)
        .returning(|_, _, _| Ok(VERSION_URL.to_string()));
    client
        .expect_add_file()
        .withf(|url: &str, _| url == VERSION_URL)
        .times(2)
        .returning(|_, file| Ok(format!("{VERSION_URL}/files/{}", file.file_name)));
    client
        .expect_persist_representation()
        .times(1)
        .returning(|url| Ok(PersistOutcome::Persisted(Some(url.to_string()))));
    client.expect_assign_representation().never();

    let report = store_files(&client, &request(vec![path("/d/a.txt"), path("/d/b.txt")], None))
        .await
        .expect("record should be stored");

    assert_eq!(report.cloud_id.id, "CLOUD1");
    assert_eq!(report.representations.len(), 1);
    let rep = &report.representations[0];
    assert_eq!(rep.name, "txt");
    assert!(rep.persisted);
    assert!(!rep.assigned);
    let names: Vec<_> = rep.files.iter().map(|f| f.file_name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
    assert!(report.skipped.is_empty());
}

#[tokio::test]
async fn named_representation_is_created_once_for_all_its_files() {
    let mut client = MockRepositoryClient::new();
    client
        .expect_create_cloud_id()
        .returning(|_| Ok(cloud_id()));
    client
        .expect_create_representation()
        .withf(|_, name: &str, _| name == "edm")
        .times(1)
        .returning(|_, _, _| Ok(VERSION_URL.to_string()));
    client
        .expect_add_file()
        .times(2)
        .returning(|_, _| Ok(format!("{VERSION_URL}/files/f")));
    client
        .expect_persist_representation()
        .times(1)
        .returning(|_| Ok(PersistOutcome::Persisted(None)));

    let report = store_files(
        &client,
        &request(vec![named("edm", "/d/x"), named("edm", "/d/y")], None),
    )
    .await
    .unwrap();

    assert_eq!(report.representations.len(), 1);
    assert_eq!(report.representations[0].files.len(), 2);
}

#[tokio::test]
async fn conflict_on_identifier_falls_back_to_lookup() {
    let mut client = MockRepositoryClient::new();
    client
        .expect_create_cloud_id()
        .times(1)
        .returning(|_| Err(status("create cloud id", 409)));
    client
        .expect_get_cloud_id()
        .withf(|key| key.provider_id == "prov" && key.record_id.as_deref() == Some("rec"))
        .times(1)
        .returning(|_| Ok(cloud_id()));
    client
        .expect_create_representation()
        .times(1)
        .returning(|_, _, _| Ok(VERSION_URL.to_string()));
    client
        .expect_add_file()
        .times(1)
        .returning(|_, _| Ok("loc".to_string()));
    client
        .expect_persist_representation()
        .times(1)
        .returning(|_| Ok(PersistOutcome::Persisted(None)));

    let report = store_files(&client, &request(vec![path("/d/a.txt")], None))
        .await
        .expect("a conflict is not a record failure");
    assert_eq!(report.cloud_id.id, "CLOUD1");
}

#[tokio::test]
async fn other_identifier_failures_abort_the_record() {
    let mut client = MockRepositoryClient::new();
    client
        .expect_create_cloud_id()
        .times(1)
        .returning(|_| Err(status("create cloud id", 500)));
    client.expect_get_cloud_id().never();
    client.expect_create_representation().never();
    client.expect_add_file().never();
    client.expect_persist_representation().never();

    let err = store_files(&client, &request(vec![path("/d/a.txt")], Some("ds")))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("500"), "{err}");
}

#[tokio::test]
async fn failed_representation_skips_only_its_files() {
    let mut client = MockRepositoryClient::new();
    client
        .expect_create_cloud_id()
        .returning(|_| Ok(cloud_id()));
    client
        .expect_create_representation()
        .withf(|_, name: &str, _| name == "xml")
        .times(1)
        .returning(|_, _, _| Err(status("create representation", 500)));
    client
        .expect_create_representation()
        .withf(|_, name: &str, _| name == "jpg")
        .times(1)
        .returning(|_, _, _| Ok("http://h/mcs/records/CLOUD1/representations/jpg/versions/v9".to_string()));
    client
        .expect_add_file()
        .withf(|_, file| file.file_name == "b.jpg")
        .times(1)
        .returning(|_, _| Ok("loc".to_string()));
    client
        .expect_persist_representation()
        .times(1)
        .returning(|_| Ok(PersistOutcome::Persisted(None)));

    let report = store_files(
        &client,
        &request(
            vec![path("/d/a.xml"), path("/d/b.jpg"), path("/d/c.xml")],
            None,
        ),
    )
    .await
    .unwrap();

    assert_eq!(report.representations.len(), 1);
    assert_eq!(report.representations[0].name, "jpg");
    assert_eq!(
        report.skipped,
        vec![PathBuf::from("/d/a.xml"), PathBuf::from("/d/c.xml")]
    );
}

#[tokio::test]
async fn already_persistent_representation_is_still_assigned() {
    let mut client = MockRepositoryClient::new();
    client
        .expect_create_cloud_id()
        .returning(|_| Ok(cloud_id()));
    client
        .expect_create_representation()
        .returning(|_, _, _| Ok(VERSION_URL.to_string()));
    client
        .expect_add_file()
        .returning(|_, _| Ok("loc".to_string()));
    client
        .expect_persist_representation()
        .times(1)
        .returning(|_| Ok(PersistOutcome::AlreadyPersistent));
    client
        .expect_assign_representation()
        .withf(|provider_id: &str, data_set_id: &str, assignment| {
            provider_id == "prov"
                && data_set_id == "ds"
                && assignment.cloud_id == "CLOUD1"
                && assignment.representation_name == "txt"
                && assignment.version.as_deref() == Some("v1")
        })
        .times(1)
        .returning(|_, _, _| Ok(()));

    let report = store_files(&client, &request(vec![path("/d/a.txt")], Some("ds")))
        .await
        .unwrap();
    let rep = &report.representations[0];
    assert!(rep.persisted);
    assert!(rep.assigned);
}

#[tokio::test]
async fn assignment_uses_version_of_persisted_url() {
    let mut client = MockRepositoryClient::new();
    client
        .expect_create_cloud_id()
        .returning(|_| Ok(cloud_id()));
    client
        .expect_create_representation()
        .returning(|_, _, _| Ok(VERSION_URL.to_string()));
    client
        .expect_add_file()
        .returning(|_, _| Ok("loc".to_string()));
    client.expect_persist_representation().returning(|_| {
        Ok(PersistOutcome::Persisted(Some(
            "http://localhost:8080/mcs/records/CLOUD1/representations/txt/versions/v2/".to_string(),
        )))
    });
    client
        .expect_assign_representation()
        .withf(|_, _, assignment| assignment.version.as_deref() == Some("v2"))
        .times(1)
        .returning(|_, _, _| Ok(()));

    store_files(&client, &request(vec![path("/d/a.txt")], Some("ds")))
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_upload_is_skipped_and_the_rest_continues() {
    let mut client = MockRepositoryClient::new();
    client
        .expect_create_cloud_id()
        .returning(|_| Ok(cloud_id()));
    client
        .expect_create_representation()
        .times(1)
        .returning(|_, _, _| Ok(VERSION_URL.to_string()));
    client
        .expect_add_file()
        .withf(|_, file| file.file_name == "a.txt")
        .times(1)
        .returning(|_, _| Err(status("add file", 400)));
    client
        .expect_add_file()
        .withf(|_, file| file.file_name == "b.txt")
        .times(1)
        .returning(|_, _| Ok("loc-b".to_string()));
    client
        .expect_persist_representation()
        .times(1)
        .returning(|_| Ok(PersistOutcome::Persisted(None)));

    let report = store_files(&client, &request(vec![path("/d/a.txt"), path("/d/b.txt")], None))
        .await
        .unwrap();
    assert_eq!(report.skipped, vec![PathBuf::from("/d/a.txt")]);
    assert_eq!(report.representations[0].files.len(), 1);
    assert_eq!(report.representations[0].files[0].location, "loc-b");
}

#[tokio::test]
async fn persist_failure_prevents_assignment() {
    let mut client = MockRepositoryClient::new();
    client
        .expect_create_cloud_id()
        .returning(|_| Ok(cloud_id()));
    client
        .expect_create_representation()
        .returning(|_, _, _| Ok(VERSION_URL.to_string()));
    client
        .expect_add_file()
        .returning(|_, _| Ok("loc".to_string()));
    client
        .expect_persist_representation()
        .times(1)
        .returning(|_| Err(status("persist representation", 500)));
    client.expect_assign_representation().never();

    let report = store_files(&client, &request(vec![path("/d/a.txt")], Some("ds")))
        .await
        .unwrap();
    assert!(!report.representations[0].persisted);
    assert!(!report.representations[0].assigned);
}

#[tokio::test]
async fn file_without_representation_name_is_skipped() {
    let mut client = MockRepositoryClient::new();
    client
        .expect_create_cloud_id()
        .returning(|_| Ok(cloud_id()));
    client.expect_create_representation().never();
    client.expect_add_file().never();
    client.expect_persist_representation().never();

    let report = store_files(&client, &request(vec![path("/d/README")], Some("ds")))
        .await
        .unwrap();
    assert!(report.representations.is_empty());
    assert_eq!(report.skipped, vec![PathBuf::from("/d/README")]);
}
