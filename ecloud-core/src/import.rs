//! Import pipeline: provider → dataset → records, driven by an [`ImportConfig`].
//!
//! # Responsibilities
//! - Resolve the provider (create it, possibly under a generated name, or reuse a configured one)
//! - Resolve the dataset the same way
//! - Store `filesAsOneRecord`, `files`, `folders` and `complexStore`, in that order,
//!   through [`store::store_files`]
//!
//! Provider and dataset creation failures are logged and do not stop the
//! import; neither does a failed record.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::ImportConfig;
use crate::contract::{NewDataSet, RepositoryClient};
use crate::store::{self, FileEntry, StoreReport, StoreRequest};

#[derive(Debug)]
pub struct ImportReport {
    pub provider_id: String,
    pub data_set_id: Option<String>,
    pub records: Vec<RecordOutcome>,
}

/// Result of storing one record.
#[derive(Debug)]
pub struct RecordOutcome {
    /// Record id requested from the identity service, if any.
    pub record_id: Option<String>,
    pub result: Result<StoreReport, String>,
}

impl ImportReport {
    pub fn stored(&self) -> usize {
        self.records.iter().filter(|r| r.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.records.len() - self.stored()
    }
}

/// Run the whole import described by `config`.
pub async fn run_import<C>(client: &C, config: &ImportConfig) -> ImportReport
where
    C: RepositoryClient + ?Sized,
{
    info!("[IMPORT] Starting data import");
    let provider_id = resolve_provider(client, config).await;
    let data_set_id = resolve_data_set(client, config, &provider_id).await;

    let mut records = Vec::new();

    if !config.files_as_one_record.is_empty() {
        let files = config
            .files_as_one_record
            .iter()
            .cloned()
            .map(FileEntry::Path)
            .collect();
        records.push(store(client, &provider_id, &data_set_id, None, files).await);
    }

    for file in &config.files {
        let files = vec![FileEntry::Path(file.clone())];
        records.push(store(client, &provider_id, &data_set_id, None, files).await);
    }

    for folder in &config.folders {
        let Some((record_id, files)) = folder_record(folder) else {
            continue;
        };
        records.push(store(client, &provider_id, &data_set_id, Some(record_id), files).await);
    }

    for record in &config.complex_store {
        let files = record
            .files
            .iter()
            .map(|f| FileEntry::Named {
                rep_name: f.rep_name.clone(),
                path: f.file.clone(),
            })
            .collect();
        records.push(
            store(
                client,
                &provider_id,
                &data_set_id,
                Some(record.rec_name.clone()).filter(|name| !name.is_empty()),
                files,
            )
            .await,
        );
    }

    let report = ImportReport {
        provider_id,
        data_set_id,
        records,
    };
    info!(
        provider_id = %report.provider_id,
        data_set_id = report.data_set_id.as_deref().unwrap_or(""),
        stored = report.stored(),
        failed = report.failed(),
        "[IMPORT] Data import finished"
    );
    report
}

async fn resolve_provider<C>(client: &C, config: &ImportConfig) -> String
where
    C: RepositoryClient + ?Sized,
{
    if !config.create_provider {
        // Presence is checked when the config is loaded.
        return config.provider_name().unwrap_or_default().to_string();
    }
    let provider_id = config
        .provider_name()
        .map(str::to_string)
        .unwrap_or_else(random_name);
    match client
        .create_provider(&provider_id, &config.provider_data())
        .await
    {
        Ok(()) => info!(%provider_id, "[IMPORT] Provider has been created"),
        Err(e) => warn!(%provider_id, error = %e, "[IMPORT] Problem with creating provider"),
    }
    provider_id
}

async fn resolve_data_set<C>(client: &C, config: &ImportConfig, provider_id: &str) -> Option<String>
where
    C: RepositoryClient + ?Sized,
{
    if !config.create_data_set {
        return config.data_set_id().map(str::to_string);
    }
    let data_set = NewDataSet {
        data_set_id: config
            .data_set_id()
            .map(str::to_string)
            .unwrap_or_else(random_name),
        description: config.data_set.as_ref().and_then(|d| d.description.clone()),
    };
    match client.create_data_set(provider_id, &data_set).await {
        Ok(()) => info!(data_set_id = %data_set.data_set_id, "[IMPORT] Dataset has been created"),
        Err(e) => {
            warn!(data_set_id = %data_set.data_set_id, error = %e, "[IMPORT] Problem with creating dataset")
        }
    }
    Some(data_set.data_set_id)
}

async fn store<C>(
    client: &C,
    provider_id: &str,
    data_set_id: &Option<String>,
    record_id: Option<String>,
    files: Vec<FileEntry>,
) -> RecordOutcome
where
    C: RepositoryClient + ?Sized,
{
    let request = StoreRequest {
        provider_id: provider_id.to_string(),
        data_set_id: data_set_id.clone(),
        record_id: record_id.clone(),
        files,
    };
    let result = store::store_files(client, &request)
        .await
        .map_err(|e| e.to_string());
    RecordOutcome { record_id, result }
}

/// Record name and sorted regular files of a folder; `None` when it is not a readable directory.
pub fn folder_record(folder: &Path) -> Option<(String, Vec<FileEntry>)> {
    if !folder.is_dir() {
        warn!(folder = %folder.display(), "[IMPORT] Not a directory, skipping");
        return None;
    }
    let record_id = folder
        .components()
        .next_back()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())?;
    let entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(folder = %folder.display(), error = %e, "[IMPORT] Cannot list directory, skipping");
            return None;
        }
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    Some((record_id, files.into_iter().map(FileEntry::Path).collect()))
}

const NAME_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const NAME_LENGTH: usize = 10;

/// Ten random characters from `A-Z0-9`, used for generated provider and dataset ids.
pub fn random_name() -> String {
    name_from_bytes(uuid::Uuid::new_v4().as_bytes())
}

fn name_from_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take(NAME_LENGTH)
        .map(|b| NAME_ALPHABET[usize::from(*b) % NAME_ALPHABET.len()] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_names_are_ten_upper_alphanumerics() {
        let name = random_name();
        assert_eq!(name.len(), 10);
        assert!(name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_ne!(name, random_name());
    }

    #[test]
    fn name_bytes_cover_the_whole_alphabet() {
        assert_eq!(name_from_bytes(&[0, 25, 26, 35, 36, 61, 255, 7, 8, 9]), "AZ09AZDHIJ");
        assert_eq!(name_from_bytes(&[1; 16]).len(), 10);
    }

    #[test]
    fn folder_record_lists_regular_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("Mona Lisa");
        std::fs::create_dir(&folder).unwrap();
        std::fs::write(folder.join("b.jpg"), b"b").unwrap();
        std::fs::write(folder.join("a.xml"), b"a").unwrap();
        std::fs::create_dir(folder.join("nested")).unwrap();

        let (record_id, files) = folder_record(&folder).unwrap();
        assert_eq!(record_id, "Mona Lisa");
        assert_eq!(
            files,
            vec![
                FileEntry::Path(folder.join("a.xml")),
                FileEntry::Path(folder.join("b.jpg")),
            ]
        );
    }

    #[test]
    fn folder_record_uses_base_name_with_trailing_slash() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("record");
        std::fs::create_dir(&folder).unwrap();
        let with_slash = PathBuf::from(format!("{}/", folder.display()));
        let (record_id, _) = folder_record(&with_slash).unwrap();
        assert_eq!(record_id, "record");
    }

    #[test]
    fn missing_folder_is_skipped() {
        assert!(folder_record(Path::new("/definitely/not/here")).is_none());
    }
}
