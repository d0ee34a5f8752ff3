//! [`ServiceProvisioner`]: the real [`Provisioner`], driving the services'
//! own command-line tools and HTTP APIs.
//!
//! Commands inherit stdout/stderr, so their output shows up in the terminal
//! as they run. Only the exit status is inspected.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;

use ecloud_core::config::{ElasticsearchSection, SolrSection, Topology};
use ecloud_core::contract::{Credentials, ProvisionError, Provisioner};
use ecloud_core::task::TaskMessage;
use ecloud_core::templates::{
    elasticsearch_mapping, SOLR_CONFIG, SOLR_CONFIG_FILE, SOLR_SCHEMA, SOLR_SCHEMA_FILE,
};

use crate::http::{build_client, join_segments, with_scheme, RawResponse};

pub struct ServiceProvisioner {
    http: reqwest::Client,
}

impl ServiceProvisioner {
    /// `proxy` is `host:port`; requests to localhost bypass it.
    pub fn new(proxy: Option<&str>) -> Result<Self> {
        let http = build_client(proxy).context("cannot build HTTP client")?;
        Ok(ServiceProvisioner { http })
    }

    async fn send(
        &self,
        operation: &'static str,
        request: reqwest::RequestBuilder,
        accepted: &[u16],
    ) -> Result<RawResponse, ProvisionError> {
        let response = request
            .send()
            .await
            .map_err(|e| transport(operation, e))?;
        let raw = RawResponse::read(response)
            .await
            .map_err(|e| transport(operation, e))?;
        tracing::debug!(operation, status = raw.status, body = %raw.body, "Response received");
        if accepted.contains(&raw.status) {
            Ok(raw)
        } else {
            Err(ProvisionError::UnexpectedStatus {
                operation,
                status: raw.status,
                body: raw.body,
            })
        }
    }
}

fn transport(operation: &'static str, e: impl std::error::Error + Send + Sync + 'static) -> ProvisionError {
    ProvisionError::Transport {
        operation,
        source: Box::new(e),
    }
}

/// `<dps>/topologies/<topic>/<action>/`
fn topology_url(dps_url: &str, topic: &str, action: &str) -> Result<Url, ProvisionError> {
    let base = Url::parse(&with_scheme(dps_url)).map_err(|e| transport("parse dps URL", e))?;
    Ok(join_segments(&base, &["topologies", topic, action, ""]))
}

/// Run `program args..` to completion.
fn run_command(program: &Path, args: &[&str]) -> Result<(), ProvisionError> {
    let command = std::iter::once(program.display().to_string())
        .chain(args.iter().map(|a| a.to_string()))
        .collect::<Vec<_>>()
        .join(" ");
    tracing::info!(command = %command, "Running command");

    match Command::new(program).args(args).status() {
        Ok(status) if status.success() => {
            tracing::info!(command = %command, "Command succeeded");
            Ok(())
        }
        Ok(status) => {
            tracing::error!(command = %command, ?status, "Command failed");
            Err(ProvisionError::ExitStatus {
                command,
                code: status.code(),
            })
        }
        Err(source) => {
            tracing::error!(command = %command, error = %source, "Failed to launch command");
            Err(ProvisionError::Launch { command, source })
        }
    }
}

fn write_template(path: PathBuf, contents: &str) -> Result<(), ProvisionError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|source| ProvisionError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    fs::write(&path, contents).map_err(|source| ProvisionError::Io { path, source })
}

/// JVM parameters are passed as a single argument; surrounding quotes are dropped.
fn jvm_argument(params: &str) -> Option<&str> {
    let trimmed = params.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
        .trim();
    (!unquoted.is_empty()).then_some(unquoted)
}

#[async_trait]
impl Provisioner for ServiceProvisioner {
    async fn create_search_core(&self, solr: &SolrSection) -> Result<(), ProvisionError> {
        let home = Path::new(&solr.home);
        let solr_bin = home.join("bin").join("solr");

        // An existing core makes `create` fail; the templates are installed regardless.
        let created = run_command(&solr_bin, &["create", "-c", solr.core_name.as_str()]);
        if created.is_err() {
            tracing::warn!(core = %solr.core_name, "Cannot create a new Solr core");
        }

        let conf = home
            .join("server")
            .join("solr")
            .join(&solr.core_name)
            .join("conf");
        write_template(conf.join(SOLR_SCHEMA_FILE), SOLR_SCHEMA)?;
        write_template(conf.join(SOLR_CONFIG_FILE), SOLR_CONFIG)?;
        tracing::info!(conf = %conf.display(), "Solr templates installed");

        run_command(&solr_bin, &["restart"])?;
        created
    }

    async fn put_index_mapping(&self, es: &ElasticsearchSection) -> Result<(), ProvisionError> {
        const OP: &str = "put index mapping";
        let base = Url::parse(&with_scheme(&es.url)).map_err(|e| transport(OP, e))?;
        let url = join_segments(&base, &[es.index_name.as_str()]);
        let request = self.http.put(url).json(&elasticsearch_mapping(&es.type_name));
        self.send(OP, request, &[200]).await?;
        tracing::info!(index = %es.index_name, "Index mapping created");
        Ok(())
    }

    async fn create_topic(
        &self,
        kafka_home: &str,
        zookeeper: &str,
        topic: &str,
    ) -> Result<(), ProvisionError> {
        let script = Path::new(kafka_home).join("bin").join("kafka-topics.sh");
        run_command(
            &script,
            &[
                "--create",
                "--zookeeper",
                zookeeper,
                "--replication-factor",
                "1",
                "--partitions",
                "1",
                "--topic",
                topic,
            ],
        )
    }

    async fn submit_topology(
        &self,
        storm_home: &str,
        topology: &Topology,
    ) -> Result<(), ProvisionError> {
        let storm = Path::new(storm_home).join("bin").join("storm");
        let mut args = vec![
            "jar",
            topology.jar.as_str(),
            topology.main_class.as_str(),
            topology.name.as_str(),
            "1",
            "1",
        ];
        if let Some(jvm) = topology.jvm_params.as_deref().and_then(jvm_argument) {
            args.push(jvm);
        }
        run_command(&storm, &args)
    }

    async fn permit_topology(
        &self,
        dps_url: &str,
        topic: &str,
        credentials: &Credentials,
    ) -> Result<(), ProvisionError> {
        const OP: &str = "permit topology";
        let request = self
            .http
            .post(topology_url(dps_url, topic, "permit")?)
            .basic_auth(&credentials.login, Some(&credentials.password))
            .form(&[("username", credentials.login.as_str())]);
        self.send(OP, request, &[200]).await?;
        tracing::info!(topic, user = %credentials.login, "Topology permitted");
        Ok(())
    }

    async fn submit_task(
        &self,
        dps_url: &str,
        topic: &str,
        message: &TaskMessage,
        credentials: &Credentials,
    ) -> Result<Option<String>, ProvisionError> {
        const OP: &str = "submit task";
        let request = self
            .http
            .post(topology_url(dps_url, topic, "tasks")?)
            .basic_auth(&credentials.login, Some(&credentials.password))
            .json(message);
        let raw = self.send(OP, request, &[200, 201]).await?;
        tracing::info!(topic, location = ?raw.location, "Task submitted");
        Ok(raw.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jvm_params_lose_their_quotes() {
        assert_eq!(
            jvm_argument("\"-Dhttp.proxyHost=cache -Dhttp.proxyPort=80\""),
            Some("-Dhttp.proxyHost=cache -Dhttp.proxyPort=80")
        );
        assert_eq!(jvm_argument("-Xmx1g"), Some("-Xmx1g"));
        assert_eq!(jvm_argument(" \"\" "), None);
    }

    #[test]
    fn topology_urls_accept_hosts_without_scheme() {
        let url = topology_url("dps.example.org:8082/services", "text_stripping", "tasks").unwrap();
        assert_eq!(
            url.as_str(),
            "http://dps.example.org:8082/services/topologies/text_stripping/tasks/"
        );
    }

    #[test]
    fn missing_program_is_a_launch_error() {
        let err = run_command(Path::new("/definitely/not/here/solr"), &["restart"]).unwrap_err();
        assert!(matches!(err, ProvisionError::Launch { .. }));
    }
}
