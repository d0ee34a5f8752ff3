//! # Repository client
//!
//! [`EcloudClient`] implements the core [`RepositoryClient`] contract against
//! the live identity (UIS) and content (MCS) services with `reqwest`.
//!
//! - Both service roots are `<endPoint>/<service>` from the import config.
//! - Every request carries basic auth with the configured credentials and
//!   goes through the configured proxy, if any.
//! - Each call accepts exactly the status its endpoint documents; anything
//!   else becomes [`RemoteError::UnexpectedStatus`] with the response body.

use std::fs;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Url};

use ecloud_core::config::ImportConfig;
use ecloud_core::contract::{
    Assignment, CloudId, FileUpload, NewDataSet, PersistOutcome, RecordKey, RemoteError,
    RepositoryClient,
};

use crate::http::{build_client, join_segments, RawResponse};

pub struct EcloudClient {
    http: reqwest::Client,
    uis: Url,
    mcs: Url,
    login: String,
    password: String,
}

impl EcloudClient {
    /// Build a client from the connection settings of an import config.
    pub fn new(config: &ImportConfig) -> Result<Self> {
        let uis = service_url(&config.end_point, &config.uis)?;
        let mcs = service_url(&config.end_point, &config.mcs)?;
        let http = build_client(config.proxy.as_deref()).context("cannot build HTTP client")?;
        tracing::info!(
            uis = %uis,
            mcs = %mcs,
            proxy = config.proxy.as_deref().unwrap_or("none"),
            "Initialized eCloud client"
        );
        Ok(EcloudClient {
            http,
            uis,
            mcs,
            login: config.login.clone(),
            password: config.password.clone(),
        })
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<RawResponse, RemoteError> {
        let response = request
            .basic_auth(&self.login, Some(&self.password))
            .send()
            .await
            .map_err(|e| transport(operation, e))?;
        let raw = RawResponse::read(response)
            .await
            .map_err(|e| transport(operation, e))?;
        tracing::debug!(operation, status = raw.status, "Response received");
        Ok(raw)
    }

    fn cloud_ids_url(&self, key: &RecordKey) -> Url {
        let mut url = join_segments(&self.uis, &["cloudIds", ""]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("providerId", &key.provider_id);
            if let Some(record_id) = &key.record_id {
                query.append_pair("recordId", record_id);
            }
        }
        url
    }

    async fn cloud_id(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<CloudId, RemoteError> {
        let raw = expect_status(operation, self.send(operation, request).await?, &[200])?;
        serde_json::from_str(&raw.body)
            .map_err(|source| RemoteError::MalformedBody { operation, source })
    }
}

fn service_url(end_point: &str, service: &str) -> Result<Url> {
    let raw = format!(
        "{}/{}",
        end_point.trim_end_matches('/'),
        service.trim_matches('/')
    );
    Url::parse(&raw).with_context(|| format!("invalid service URL {raw}"))
}

/// `url` with `tail` appended as further path segments and a trailing slash.
fn below(url: &str, tail: &str) -> Result<Url, RemoteError> {
    let base = Url::parse(url).map_err(|e| RemoteError::Transport {
        operation: "parse version URL",
        source: Box::new(e),
    })?;
    Ok(join_segments(&base, &[tail, ""]))
}

fn transport(operation: &'static str, e: reqwest::Error) -> RemoteError {
    RemoteError::Transport {
        operation,
        source: Box::new(e),
    }
}

fn expect_status(
    operation: &'static str,
    raw: RawResponse,
    accepted: &[u16],
) -> Result<RawResponse, RemoteError> {
    if accepted.contains(&raw.status) {
        Ok(raw)
    } else {
        tracing::warn!(operation, status = raw.status, body = %raw.body, "Unexpected status");
        Err(RemoteError::UnexpectedStatus {
            operation,
            status: raw.status,
            body: raw.body,
        })
    }
}

fn location(operation: &'static str, raw: RawResponse) -> Result<String, RemoteError> {
    raw.location
        .ok_or(RemoteError::MissingLocation { operation })
}

#[async_trait]
impl RepositoryClient for EcloudClient {
    async fn create_provider(&self, provider_id: &str, data: &str) -> Result<(), RemoteError> {
        const OP: &str = "create provider";
        let mut url = join_segments(&self.uis, &["data-providers", ""]);
        url.query_pairs_mut().append_pair("providerId", provider_id);
        let request = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(data.to_string());
        expect_status(OP, self.send(OP, request).await?, &[200, 201])?;
        tracing::info!(provider_id, "Provider created");
        Ok(())
    }

    async fn create_data_set(
        &self,
        provider_id: &str,
        data_set: &NewDataSet,
    ) -> Result<(), RemoteError> {
        const OP: &str = "create data set";
        let url = join_segments(&self.mcs, &["data-providers", provider_id, "data-sets", ""]);
        let mut form = vec![("dataSetId", data_set.data_set_id.as_str())];
        if let Some(description) = &data_set.description {
            form.push(("description", description.as_str()));
        }
        let request = self.http.post(url).form(&form);
        expect_status(OP, self.send(OP, request).await?, &[201])?;
        tracing::info!(provider_id, data_set_id = %data_set.data_set_id, "Data set created");
        Ok(())
    }

    async fn create_cloud_id(&self, key: &RecordKey) -> Result<CloudId, RemoteError> {
        let request = self
            .http
            .post(self.cloud_ids_url(key))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        self.cloud_id("create cloud id", request).await
    }

    async fn get_cloud_id(&self, key: &RecordKey) -> Result<CloudId, RemoteError> {
        let request = self.http.get(self.cloud_ids_url(key));
        self.cloud_id("get cloud id", request).await
    }

    async fn create_representation(
        &self,
        cloud_id: &str,
        name: &str,
        provider_id: &str,
    ) -> Result<String, RemoteError> {
        const OP: &str = "create representation";
        let url = join_segments(&self.mcs, &["records", cloud_id, "representations", name, ""]);
        let request = self.http.post(url).form(&[("providerId", provider_id)]);
        let raw = expect_status(OP, self.send(OP, request).await?, &[201])?;
        location(OP, raw)
    }

    async fn add_file(&self, version_url: &str, file: &FileUpload) -> Result<String, RemoteError> {
        const OP: &str = "add file";
        let bytes = fs::read(&file.path).map_err(|source| RemoteError::File {
            path: file.path.clone(),
            source,
        })?;
        let mut form = Form::new()
            .part("data", Part::bytes(bytes).file_name(file.file_name.clone()))
            .text("fileName", file.file_name.clone());
        if let Some(mime_type) = &file.mime_type {
            form = form.text("mimeType", mime_type.clone());
        }
        let request = self.http.post(below(version_url, "files")?).multipart(form);
        let raw = expect_status(OP, self.send(OP, request).await?, &[201])?;
        location(OP, raw)
    }

    async fn persist_representation(
        &self,
        version_url: &str,
    ) -> Result<PersistOutcome, RemoteError> {
        const OP: &str = "persist representation";
        let request = self.http.post(below(version_url, "persist")?);
        // 405 is taken to mean the version is already persistent; the service
        // does not document this status, so the mapping is unconfirmed.
        let raw = expect_status(OP, self.send(OP, request).await?, &[201, 405])?;
        if raw.status == 405 {
            Ok(PersistOutcome::AlreadyPersistent)
        } else {
            Ok(PersistOutcome::Persisted(raw.location))
        }
    }

    async fn assign_representation(
        &self,
        provider_id: &str,
        data_set_id: &str,
        assignment: &Assignment,
    ) -> Result<(), RemoteError> {
        const OP: &str = "assign representation";
        let url = join_segments(
            &self.mcs,
            &["data-providers", provider_id, "data-sets", data_set_id, "assignments", ""],
        );
        let mut form = vec![
            ("cloudId", assignment.cloud_id.as_str()),
            ("representationName", assignment.representation_name.as_str()),
        ];
        if let Some(version) = &assignment.version {
            form.push(("version", version.as_str()));
        }
        let request = self.http.post(url).form(&form);
        expect_status(OP, self.send(OP, request).await?, &[204])?;
        Ok(())
    }
}
