#![doc = "ecloud-core: core logic library for the eCloud import and deployment tools."]

//! This crate contains the data model, configuration, and the upload and
//! deployment workflows. Transport (HTTP, process launching) lives behind the
//! traits in [`contract`] and is implemented by the CLI crate.
//!
//! # Usage
//! Drive [`import::run_import`] or [`deploy::prepare_all`] with a concrete
//! [`contract::RepositoryClient`] or [`contract::Provisioner`].

pub mod config;
pub mod contract;
pub mod deploy;
pub mod import;
pub mod store;
pub mod task;
pub mod templates;
