//! # contract: interfaces to the repository services and the processing stack
//!
//! This module defines the two seams of the crate and the plain data that
//! crosses them:
//!
//! - [`RepositoryClient`]: the identity (UIS) and content (MCS) REST calls the
//!   upload driver needs: providers, datasets, cloud identifiers,
//!   representations, files, persistence and dataset assignment.
//! - [`Provisioner`]: the auxiliary services touched by the deployment
//!   driver: search core, index mapping, topics, topologies and the task
//!   dispatch service.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall` so drivers can be exercised
//!   against deterministic mocks. The mocks are exported under the default
//!   `test-export-mocks` feature so dependent crates can use them too.
//!
//! ## Error Handling
//! - Every repository call maps an unexpected HTTP status into
//!   [`RemoteError::UnexpectedStatus`]; callers decide how wide the failure is.
//! - Provisioning steps report [`ProvisionError`]; none of them are fatal.

use std::path::PathBuf;

use async_trait::async_trait;
use mockall::automock;
use serde::Deserialize;

use crate::config::{ElasticsearchSection, SolrSection, Topology};
use crate::task::TaskMessage;

/// Cloud identifier issued by the identity service for a `(provider, record)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "CloudIdWire")]
pub struct CloudId {
    pub id: String,
    pub provider_id: String,
    pub record_id: String,
}

#[derive(Deserialize)]
struct CloudIdWire {
    id: String,
    #[serde(rename = "localId")]
    local_id: LocalIdWire,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocalIdWire {
    provider_id: String,
    #[serde(default)]
    record_id: String,
}

impl From<CloudIdWire> for CloudId {
    fn from(wire: CloudIdWire) -> Self {
        CloudId {
            id: wire.id,
            provider_id: wire.local_id.provider_id,
            record_id: wire.local_id.record_id,
        }
    }
}

/// Key used to issue or look up a cloud identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKey {
    pub provider_id: String,
    /// When absent the identity service generates one.
    pub record_id: Option<String>,
}

/// A dataset to create under a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDataSet {
    pub data_set_id: String,
    pub description: Option<String>,
}

/// A local file to upload into a representation version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub path: PathBuf,
    /// Name the file gets in the repository (the base name of `path`).
    pub file_name: String,
    pub mime_type: Option<String>,
}

/// Assignment of a persisted representation version into a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub cloud_id: String,
    pub representation_name: String,
    /// Latest persisted version is assigned when absent.
    pub version: Option<String>,
}

/// Result of a persist call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    /// Freshly persisted; carries the persisted version's URL when the service sent one.
    Persisted(Option<String>),
    /// The version was persistent before the call.
    AlreadyPersistent,
}

/// Failure of a single repository call.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("{operation} returned unexpected status {status}: {body}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("{operation} succeeded but sent no Location header")]
    MissingLocation { operation: &'static str },
    #[error("{operation} returned a body that could not be parsed: {source}")]
    MalformedBody {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{operation} could not be sent: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("cannot read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RemoteError {
    /// The identity service answers 409 when the record already has a cloud identifier.
    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteError::UnexpectedStatus { status: 409, .. })
    }
}

/// Client for the eCloud identity and content services.
///
/// Each method corresponds to one REST call and succeeds only on the status
/// code that call is documented to return.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Create a data provider. `data` is the provider's JSON description.
    async fn create_provider(&self, provider_id: &str, data: &str) -> Result<(), RemoteError>;

    /// Create a dataset owned by `provider_id`.
    async fn create_data_set(
        &self,
        provider_id: &str,
        data_set: &NewDataSet,
    ) -> Result<(), RemoteError>;

    /// Issue a new cloud identifier. A record that already has one yields a 409 error.
    async fn create_cloud_id(&self, key: &RecordKey) -> Result<CloudId, RemoteError>;

    /// Look up the cloud identifier of an existing record.
    async fn get_cloud_id(&self, key: &RecordKey) -> Result<CloudId, RemoteError>;

    /// Create a representation and return the URL of its new version.
    async fn create_representation(
        &self,
        cloud_id: &str,
        name: &str,
        provider_id: &str,
    ) -> Result<String, RemoteError>;

    /// Upload a file into the representation version at `version_url`, returning the file URL.
    async fn add_file(&self, version_url: &str, file: &FileUpload) -> Result<String, RemoteError>;

    /// Persist the representation version at `version_url`.
    async fn persist_representation(&self, version_url: &str)
        -> Result<PersistOutcome, RemoteError>;

    /// Assign a persisted representation version into a dataset.
    async fn assign_representation(
        &self,
        provider_id: &str,
        data_set_id: &str,
        assignment: &Assignment,
    ) -> Result<(), RemoteError>;
}

/// Failure of a single provisioning step.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("failed to launch {command}: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} exited with {code:?}")]
    ExitStatus { command: String, code: Option<i32> },
    #[error("{operation} returned unexpected status {status}: {body}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("{operation} could not be sent: {source}")]
    Transport {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("invalid task: {0}")]
    InvalidTask(String),
    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Credentials for the task dispatch service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

/// The auxiliary services prepared by the deployment driver.
///
/// Implementations shell out to the services' own command-line tools or call
/// their HTTP APIs; only success or failure is observed.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create the search core, install the schema and config templates and restart the engine.
    async fn create_search_core(&self, solr: &SolrSection) -> Result<(), ProvisionError>;

    /// PUT the index mapping to the search cluster.
    async fn put_index_mapping(&self, es: &ElasticsearchSection) -> Result<(), ProvisionError>;

    /// Create one message-queue topic.
    async fn create_topic(
        &self,
        kafka_home: &str,
        zookeeper: &str,
        topic: &str,
    ) -> Result<(), ProvisionError>;

    /// Submit one stream-processing topology.
    async fn submit_topology(
        &self,
        storm_home: &str,
        topology: &Topology,
    ) -> Result<(), ProvisionError>;

    /// Permit the task user on a topology of the dispatch service.
    async fn permit_topology(
        &self,
        dps_url: &str,
        topic: &str,
        credentials: &Credentials,
    ) -> Result<(), ProvisionError>;

    /// Submit a task to the dispatch service and return its location, if the service sent one.
    async fn submit_task(
        &self,
        dps_url: &str,
        topic: &str,
        message: &TaskMessage,
        credentials: &Credentials,
    ) -> Result<Option<String>, ProvisionError>;
}
