//! Processing-task messages for the dispatch service (DPS).
//!
//! The service expects `{"inputData": {}, "parameters": {...}, "taskName": ...}`
//! with every parameter value a string. `INDEXER` is itself a JSON document
//! serialised into a string.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{ConfigError, TaskSection};

pub const NEW_DATASET: &str = "NewDataset";
pub const NEW_FILE: &str = "NewFile";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMessage {
    pub input_data: BTreeMap<String, Vec<String>>,
    pub parameters: BTreeMap<String, String>,
    pub task_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct Indexer<'a> {
    indexer_name: &'a str,
    index: &'a str,
    #[serde(rename = "TYPE")]
    index_type: &'a str,
}

/// What the task runs over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskTarget {
    DataSet {
        provider_id: String,
        dataset_id: String,
    },
    File {
        file_url: String,
    },
}

impl TaskMessage {
    /// Build the message described by the deployment config's `task` object.
    pub fn from_section(task: &TaskSection) -> Result<Self, ConfigError> {
        let target = match task.task_name.as_str() {
            NEW_DATASET => {
                if task.provider_id.is_empty() || task.dataset_id.is_empty() {
                    return Err(ConfigError::Invalid(
                        "task NewDataset needs providerId and datasetId".into(),
                    ));
                }
                TaskTarget::DataSet {
                    provider_id: task.provider_id.clone(),
                    dataset_id: task.dataset_id.clone(),
                }
            }
            NEW_FILE => {
                if task.file_url.is_empty() {
                    return Err(ConfigError::Invalid("task NewFile needs fileUrl".into()));
                }
                TaskTarget::File {
                    file_url: task.file_url.clone(),
                }
            }
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown task name {other:?}, expected {NEW_DATASET} or {NEW_FILE}"
                )))
            }
        };

        let indexer = serde_json::to_string(&Indexer {
            indexer_name: &task.indexer_name,
            index: &task.index,
            index_type: &task.index_type,
        })?;

        let mut parameters = BTreeMap::new();
        parameters.insert("INDEXER".to_string(), indexer);
        parameters.insert("EXTRACT_TEXT".to_string(), task.extract_text.clone());
        parameters.insert("INDEX_DATA".to_string(), task.index_data.clone());
        parameters.insert(
            "STORE_EXTRACTED_TEXT".to_string(),
            task.store_extracted.clone(),
        );
        let task_name = match target {
            TaskTarget::DataSet {
                provider_id,
                dataset_id,
            } => {
                parameters.insert("PROVIDER_ID".to_string(), provider_id);
                parameters.insert("DATASET_ID".to_string(), dataset_id);
                NEW_DATASET
            }
            TaskTarget::File { file_url } => {
                parameters.insert("FILE_URL".to_string(), file_url);
                NEW_FILE
            }
        };

        Ok(TaskMessage {
            input_data: BTreeMap::new(),
            parameters,
            task_name: task_name.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset_task() -> TaskSection {
        TaskSection {
            topic: "text_stripping".into(),
            task_name: "NewDataset".into(),
            provider_id: "ceffa".into(),
            dataset_id: "ceffa_dataset1".into(),
            indexer_name: "SOLR_INDEXER".into(),
            index: "solrCore".into(),
            extract_text: "true".into(),
            index_data: "true".into(),
            store_extracted: "false".into(),
            ..Default::default()
        }
    }

    #[test]
    fn dataset_task_carries_provider_and_dataset() {
        let message = TaskMessage::from_section(&dataset_task()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();

        assert_eq!(value["taskName"], "NewDataset");
        assert_eq!(value["inputData"], serde_json::json!({}));
        assert_eq!(value["parameters"]["PROVIDER_ID"], "ceffa");
        assert_eq!(value["parameters"]["DATASET_ID"], "ceffa_dataset1");
        assert_eq!(value["parameters"]["EXTRACT_TEXT"], "true");
        assert_eq!(value["parameters"]["STORE_EXTRACTED_TEXT"], "false");
        assert!(value["parameters"].get("FILE_URL").is_none());

        let indexer: serde_json::Value =
            serde_json::from_str(value["parameters"]["INDEXER"].as_str().unwrap()).unwrap();
        assert_eq!(
            indexer,
            serde_json::json!({"INDEXER_NAME": "SOLR_INDEXER", "INDEX": "solrCore", "TYPE": ""})
        );
    }

    #[test]
    fn file_task_carries_file_url() {
        let task = TaskSection {
            task_name: "NewFile".into(),
            file_url: "http://localhost/mcs/records/X/representations/pdf/versions/v1/files/f".into(),
            ..dataset_task()
        };
        let message = TaskMessage::from_section(&task).unwrap();
        assert_eq!(message.task_name, "NewFile");
        assert!(message.parameters["FILE_URL"].ends_with("/files/f"));
        assert!(!message.parameters.contains_key("PROVIDER_ID"));
    }

    #[test]
    fn quotes_in_values_are_escaped() {
        let task = TaskSection {
            index: "core \"main\"".into(),
            ..dataset_task()
        };
        let message = TaskMessage::from_section(&task).unwrap();
        let json = message.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let indexer: serde_json::Value =
            serde_json::from_str(value["parameters"]["INDEXER"].as_str().unwrap()).unwrap();
        assert_eq!(indexer["INDEX"], "core \"main\"");
    }

    #[test]
    fn missing_target_fields_are_rejected() {
        let task = TaskSection {
            dataset_id: String::new(),
            ..dataset_task()
        };
        assert!(TaskMessage::from_section(&task).is_err());

        let task = TaskSection {
            task_name: "NewFile".into(),
            ..dataset_task()
        };
        assert!(TaskMessage::from_section(&task).is_err());
    }
}
