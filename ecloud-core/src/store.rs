//! Upload driver: turns a list of local files into one populated, persisted record.
//!
//! For one record the driver:
//!   - issues (or, on conflict, looks up) the record's cloud identifier
//!   - groups the files into representations, by explicit name or by extension
//!   - creates each representation once and uploads its files into the new version
//!   - persists every created representation and, when a dataset is given,
//!     assigns the persisted version into it
//!
//! # Error Handling
//! Failure is scoped to the narrowest unit. A failed file upload skips that
//! file; a failed representation skips every file of that representation; a
//! failed identifier request aborts the record and is returned to the caller.
//! Nothing is retried.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::contract::{
    Assignment, CloudId, FileUpload, PersistOutcome, RecordKey, RemoteError, RepositoryClient,
};

/// One file to store, optionally with the representation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEntry {
    /// Representation is derived from the file's extension.
    Path(PathBuf),
    Named { rep_name: String, path: PathBuf },
}

impl FileEntry {
    pub fn path(&self) -> &Path {
        match self {
            FileEntry::Path(path) => path,
            FileEntry::Named { path, .. } => path,
        }
    }
}

/// Everything needed to store one record.
#[derive(Debug, Clone)]
pub struct StoreRequest {
    pub provider_id: String,
    pub data_set_id: Option<String>,
    pub record_id: Option<String>,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone)]
pub struct StoreReport {
    pub cloud_id: CloudId,
    /// Created representations, in the order their first file appeared.
    pub representations: Vec<RepresentationReport>,
    /// Files that were not uploaded.
    pub skipped: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RepresentationReport {
    pub name: String,
    /// URL of the representation version the files went into.
    pub version_url: String,
    pub files: Vec<UploadedFile>,
    pub persisted: bool,
    pub assigned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_name: String,
    pub location: String,
}

/// Store `request.files` as one record.
pub async fn store_files<C>(client: &C, request: &StoreRequest) -> Result<StoreReport, RemoteError>
where
    C: RepositoryClient + ?Sized,
{
    let key = RecordKey {
        provider_id: request.provider_id.clone(),
        record_id: request.record_id.clone(),
    };
    let cloud_id = issue_cloud_id(client, &key).await?;
    info!(
        cloud_id = %cloud_id.id,
        provider_id = %cloud_id.provider_id,
        record_id = %cloud_id.record_id,
        files = request.files.len(),
        "[STORE] Storing record"
    );

    let mut representations: Vec<RepresentationReport> = Vec::new();
    let mut failed_names: Vec<String> = Vec::new();
    let mut skipped: Vec<PathBuf> = Vec::new();

    for entry in &request.files {
        let path = entry.path();
        let Some(name) = representation_name(entry) else {
            warn!(file = %path.display(), "[STORE] No representation name for file, skipping");
            skipped.push(path.to_path_buf());
            continue;
        };
        if failed_names.contains(&name) {
            debug!(file = %path.display(), representation = %name, "[STORE] Representation was not created, skipping file");
            skipped.push(path.to_path_buf());
            continue;
        }

        let index = match representations.iter().position(|r| r.name == name) {
            Some(index) => index,
            None => match client
                .create_representation(&cloud_id.id, &name, &request.provider_id)
                .await
            {
                Ok(version_url) => {
                    info!(representation = %name, cloud_id = %cloud_id.id, %version_url, "[STORE] Representation created");
                    representations.push(RepresentationReport {
                        name: name.clone(),
                        version_url,
                        files: Vec::new(),
                        persisted: false,
                        assigned: false,
                    });
                    representations.len() - 1
                }
                Err(e) => {
                    warn!(representation = %name, cloud_id = %cloud_id.id, error = %e, "[STORE] Problem with creating representation");
                    failed_names.push(name);
                    skipped.push(path.to_path_buf());
                    continue;
                }
            },
        };

        let upload = file_upload(path);
        let representation = &mut representations[index];
        match client.add_file(&representation.version_url, &upload).await {
            Ok(location) => {
                info!(
                    file = %path.display(),
                    file_name = %upload.file_name,
                    mime_type = upload.mime_type.as_deref().unwrap_or(""),
                    %location,
                    "[STORE] File added"
                );
                representation.files.push(UploadedFile {
                    file_name: upload.file_name,
                    location,
                });
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "[STORE] Problem with adding file");
                skipped.push(path.to_path_buf());
            }
        }
    }

    for representation in &mut representations {
        let persisted_url = match client
            .persist_representation(&representation.version_url)
            .await
        {
            Ok(PersistOutcome::Persisted(location)) => {
                info!(version_url = %representation.version_url, location = location.as_deref().unwrap_or(""), "[STORE] Representation version is now persistent");
                representation.persisted = true;
                location
            }
            Ok(PersistOutcome::AlreadyPersistent) => {
                info!(version_url = %representation.version_url, "[STORE] Representation version is already persistent");
                representation.persisted = true;
                None
            }
            Err(e) => {
                warn!(version_url = %representation.version_url, error = %e, "[STORE] Problem with persisting representation");
                None
            }
        };

        let Some(data_set_id) = request.data_set_id.as_deref() else {
            continue;
        };
        if !representation.persisted {
            continue;
        }
        let source_url = persisted_url
            .as_deref()
            .unwrap_or(&representation.version_url);
        let assignment = Assignment {
            cloud_id: cloud_id.id.clone(),
            representation_name: representation.name.clone(),
            version: version_from_url(source_url),
        };
        match client
            .assign_representation(&request.provider_id, data_set_id, &assignment)
            .await
        {
            Ok(()) => {
                info!(
                    representation = %representation.name,
                    cloud_id = %cloud_id.id,
                    data_set_id,
                    version = assignment.version.as_deref().unwrap_or("latest"),
                    "[STORE] Representation assigned to dataset"
                );
                representation.assigned = true;
            }
            Err(e) => {
                warn!(representation = %representation.name, data_set_id, error = %e, "[STORE] Problem with assigning representation to dataset");
            }
        }
    }

    Ok(StoreReport {
        cloud_id,
        representations,
        skipped,
    })
}

async fn issue_cloud_id<C>(client: &C, key: &RecordKey) -> Result<CloudId, RemoteError>
where
    C: RepositoryClient + ?Sized,
{
    match client.create_cloud_id(key).await {
        Ok(cloud_id) => {
            info!(cloud_id = %cloud_id.id, "[STORE] CloudId has been created");
            Ok(cloud_id)
        }
        Err(e) if e.is_conflict() => {
            info!(provider_id = %key.provider_id, record_id = key.record_id.as_deref().unwrap_or(""), "[STORE] Record already exists, loading its cloud id");
            client.get_cloud_id(key).await.map_err(|e| {
                warn!(error = %e, "[STORE] Problem with loading CloudId");
                e
            })
        }
        Err(e) => {
            warn!(provider_id = %key.provider_id, error = %e, "[STORE] Problem with creating CloudId");
            Err(e)
        }
    }
}

/// Representation a file belongs to: the explicit name, else its lower-cased extension.
pub fn representation_name(entry: &FileEntry) -> Option<String> {
    if let FileEntry::Named { rep_name, .. } = entry {
        if !rep_name.is_empty() {
            return Some(rep_name.clone());
        }
    }
    entry
        .path()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .filter(|ext| !ext.is_empty())
}

/// Version token of a representation-version URL: its last non-empty path segment.
pub fn version_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn file_upload(path: &Path) -> FileUpload {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    let mime_type = mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string());
    FileUpload {
        path: path.to_path_buf(),
        file_name,
        mime_type,
    }
}
