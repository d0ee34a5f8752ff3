//! Configuration for both tools: the import (upload) tool and the deployment tool.
//!
//! Both files are JSON with camelCase keys. They are parsed into explicit
//! structs and validated once, so a bad file is rejected before any network
//! activity. Empty strings and `null` are treated the same as an absent key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::task::TaskMessage;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("problem with reading config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("problem with config file structure: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration of the import tool.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportConfig {
    /// Server hosting the REST APIs, e.g. `http://localhost:8080/`.
    pub end_point: String,
    /// Path of the identity service under `end_point`.
    pub uis: String,
    /// Path of the content service under `end_point`.
    pub mcs: String,
    pub login: String,
    pub password: String,
    /// HTTP proxy as `host:port`.
    #[serde(default, deserialize_with = "non_empty")]
    pub proxy: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub create_provider: bool,
    #[serde(default)]
    pub provider: Option<ProviderSection>,
    #[serde(default, deserialize_with = "nullable")]
    pub create_data_set: bool,
    #[serde(default)]
    pub data_set: Option<DataSetSection>,
    /// All of these files go into one record.
    #[serde(default, deserialize_with = "nullable")]
    pub files_as_one_record: Vec<PathBuf>,
    /// Each of these files is its own record.
    #[serde(default, deserialize_with = "nullable")]
    pub files: Vec<PathBuf>,
    /// Each folder is one record named after the folder.
    #[serde(default, deserialize_with = "nullable")]
    pub folders: Vec<PathBuf>,
    #[serde(default, deserialize_with = "nullable")]
    pub complex_store: Vec<ComplexRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSection {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// Provider description: a JSON object, or a JSON document held in a string.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSetSection {
    #[serde(default, deserialize_with = "nullable")]
    pub data_set_id: String,
    #[serde(default, deserialize_with = "non_empty")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexRecord {
    pub rec_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub files: Vec<ComplexFile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplexFile {
    #[serde(default, deserialize_with = "nullable")]
    pub rep_name: String,
    pub file: PathBuf,
}

impl ImportConfig {
    /// Parse and validate an import configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ImportConfig = serde_json::from_str(json)?;
        config.validate()?;
        config.trace_loaded();
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require("endPoint", &self.end_point)?;
        require("uis", &self.uis)?;
        require("mcs", &self.mcs)?;
        if !self.create_provider && self.provider_name().is_none() {
            return Err(ConfigError::Invalid(
                "provider is not defined: set provider.name or createProvider".into(),
            ));
        }
        if let Some(proxy) = &self.proxy {
            validate_proxy(proxy)?;
        }
        if let Some(ProviderSection {
            data: Some(serde_json::Value::String(data)),
            ..
        }) = &self.provider
        {
            if data.trim().is_empty() {
                return Ok(());
            }
            serde_json::from_str::<serde_json::Value>(data).map_err(|e| {
                ConfigError::Invalid(format!("provider.data is not a JSON document: {e}"))
            })?;
        }
        Ok(())
    }

    /// Configured provider name, if non-empty.
    pub fn provider_name(&self) -> Option<&str> {
        self.provider
            .as_ref()
            .map(|p| p.name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Provider description as the JSON text sent to the identity service.
    pub fn provider_data(&self) -> String {
        match self.provider.as_ref().and_then(|p| p.data.as_ref()) {
            None | Some(serde_json::Value::Null) => "{}".to_string(),
            Some(serde_json::Value::String(raw)) if raw.trim().is_empty() => "{}".to_string(),
            Some(serde_json::Value::String(raw)) => raw.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Configured dataset id, if non-empty.
    pub fn data_set_id(&self) -> Option<&str> {
        self.data_set
            .as_ref()
            .map(|d| d.data_set_id.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn trace_loaded(&self) {
        info!(
            end_point = %self.end_point,
            uis = %self.uis,
            mcs = %self.mcs,
            create_provider = self.create_provider,
            create_data_set = self.create_data_set,
            files_as_one_record = self.files_as_one_record.len(),
            files = self.files.len(),
            folders = self.folders.len(),
            complex_store = self.complex_store.len(),
            "Loaded import configuration"
        );
    }
}

/// Configuration of the deployment tool.
///
/// Every step is optional: it runs only when all of its keys are set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployConfig {
    /// Import configuration to run after the services are prepared.
    #[serde(default, deserialize_with = "non_empty")]
    pub import_config_file: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub solr_home: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub core_name: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub elasticsearch_url: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub index_name: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub type_name: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub kafka_home: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub zookeeper: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub topics: Vec<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub storm_home: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub topologies: Vec<Topology>,
    /// Base URL of the task dispatch service.
    #[serde(default, deserialize_with = "non_empty")]
    pub dps: Option<String>,
    #[serde(default)]
    pub task: Option<TaskSection>,
    /// HTTP proxy as `host:port`, shared by every HTTP step.
    #[serde(default, deserialize_with = "non_empty")]
    pub proxy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolrSection {
    pub home: String,
    pub core_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElasticsearchSection {
    pub url: String,
    pub index_name: String,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaSection {
    pub home: String,
    pub zookeeper: String,
    pub topics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topology {
    #[serde(default, deserialize_with = "nullable")]
    pub jar: String,
    #[serde(default, deserialize_with = "nullable")]
    pub main_class: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "non_empty")]
    pub jvm_params: Option<String>,
}

impl Topology {
    pub fn is_complete(&self) -> bool {
        !self.jar.is_empty() && !self.main_class.is_empty() && !self.name.is_empty()
    }
}

/// The processing task submitted to the dispatch service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSection {
    #[serde(default, deserialize_with = "nullable")]
    pub topic: String,
    #[serde(default, deserialize_with = "nullable")]
    pub task_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub provider_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub dataset_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub file_url: String,
    #[serde(default, deserialize_with = "nullable")]
    pub indexer_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub index: String,
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub index_type: String,
    #[serde(default, deserialize_with = "flag")]
    pub extract_text: String,
    #[serde(default, deserialize_with = "flag")]
    pub index_data: String,
    #[serde(default, deserialize_with = "flag")]
    pub store_extracted: String,
    #[serde(default, deserialize_with = "nullable")]
    pub login: String,
    #[serde(default, deserialize_with = "nullable")]
    pub password: String,
}

impl DeployConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: DeployConfig = serde_json::from_str(json)?;
        config.validate()?;
        config.trace_loaded();
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(proxy) = &self.proxy {
            validate_proxy(proxy)?;
        }
        if self.dps.is_some() {
            if let Some(task) = &self.task {
                require("task.topic", &task.topic)?;
                TaskMessage::from_section(task)?;
            }
        }
        Ok(())
    }

    pub fn solr(&self) -> Option<SolrSection> {
        Some(SolrSection {
            home: self.solr_home.clone()?,
            core_name: self.core_name.clone()?,
        })
    }

    pub fn elasticsearch(&self) -> Option<ElasticsearchSection> {
        Some(ElasticsearchSection {
            url: self.elasticsearch_url.clone()?,
            index_name: self.index_name.clone()?,
            type_name: self.type_name.clone()?,
        })
    }

    pub fn kafka(&self) -> Option<KafkaSection> {
        if self.topics.is_empty() {
            return None;
        }
        Some(KafkaSection {
            home: self.kafka_home.clone()?,
            zookeeper: self.zookeeper.clone()?,
            topics: self.topics.clone(),
        })
    }

    /// Import configuration path, resolved against `base` when relative.
    pub fn import_config_path(&self, base: &Path) -> Option<PathBuf> {
        self.import_config_file.as_ref().map(|file| base.join(file))
    }

    pub fn trace_loaded(&self) {
        info!(
            solr = self.solr().is_some(),
            elasticsearch = self.elasticsearch().is_some(),
            topics = self.topics.len(),
            topologies = self.topologies.len(),
            task = self.dps.is_some() && self.task.is_some(),
            import = self.import_config_file.is_some(),
            "Loaded deployment configuration"
        );
        debug!(?self, "Deployment configuration (full debug)");
    }
}

fn require(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{key} must not be empty")));
    }
    Ok(())
}

fn validate_proxy(proxy: &str) -> Result<(), ConfigError> {
    match proxy.split_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => Ok(()),
        _ => Err(ConfigError::Invalid(format!(
            "proxy must be host:port, got {proxy:?}"
        ))),
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.filter(|s| !s.trim().is_empty()))
}

/// Accepts `true`, `"true"` and friends; the dispatch service wants strings.
fn flag<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }
    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => b.to_string(),
        Some(Flag::Text(s)) => s,
        None => String::new(),
    })
}
