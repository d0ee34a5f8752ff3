//! Deployment driver: prepares the services the processing pipeline depends on.
//!
//! Steps run in a fixed order, each only when its configuration is present:
//!   1. search core (create, install templates, restart)
//!   2. search index mapping
//!   3. message-queue topics
//!   4. stream-processing topologies
//!   5. dispatch-service permission and task submission
//!
//! Every step is best-effort: a failure is logged and recorded in the
//! [`DeployReport`], and the next step still runs.

use tracing::{info, warn};

use crate::config::DeployConfig;
use crate::contract::{Credentials, ProvisionError, Provisioner};
use crate::task::TaskMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    SearchCore,
    IndexMapping,
    Topic(String),
    Topology(String),
    PermitTopology(String),
    SubmitTask(String),
}

#[derive(Debug, Default)]
pub struct DeployReport {
    /// Steps that ran, in order, with their failure if any.
    pub steps: Vec<(Step, Option<String>)>,
    /// Location of the submitted task, when the dispatch service returned one.
    pub task_location: Option<String>,
}

impl DeployReport {
    pub fn failures(&self) -> impl Iterator<Item = (&Step, &str)> {
        self.steps
            .iter()
            .filter_map(|(step, failure)| failure.as_deref().map(|f| (step, f)))
    }

    fn record(&mut self, step: Step, result: Result<(), ProvisionError>) {
        match result {
            Ok(()) => {
                info!(?step, "[DEPLOY] Step finished");
                self.steps.push((step, None));
            }
            Err(e) => {
                warn!(?step, error = %e, "[DEPLOY] Step failed");
                self.steps.push((step, Some(e.to_string())));
            }
        }
    }
}

/// Run every configured deployment step against `provisioner`.
pub async fn prepare_all<P>(provisioner: &P, config: &DeployConfig) -> DeployReport
where
    P: Provisioner + ?Sized,
{
    let mut report = DeployReport::default();

    if let Some(solr) = config.solr() {
        info!(home = %solr.home, core = %solr.core_name, "[DEPLOY] Solr configuration is started");
        let result = provisioner.create_search_core(&solr).await;
        report.record(Step::SearchCore, result);
    }

    if let Some(es) = config.elasticsearch() {
        info!(url = %es.url, index = %es.index_name, "[DEPLOY] Elasticsearch configuration is started");
        let result = provisioner.put_index_mapping(&es).await;
        report.record(Step::IndexMapping, result);
    }

    if let Some(kafka) = config.kafka() {
        info!(topics = kafka.topics.len(), "[DEPLOY] Creating topics");
        for topic in &kafka.topics {
            let result = provisioner
                .create_topic(&kafka.home, &kafka.zookeeper, topic)
                .await;
            report.record(Step::Topic(topic.clone()), result);
        }
    }

    if let Some(storm_home) = config.storm_home.as_deref() {
        for topology in &config.topologies {
            if !topology.is_complete() {
                warn!(name = %topology.name, "[DEPLOY] Topology needs jar, mainClass and name, skipping");
                continue;
            }
            info!(name = %topology.name, "[DEPLOY] Submitting topology");
            let result = provisioner.submit_topology(storm_home, topology).await;
            report.record(Step::Topology(topology.name.clone()), result);
        }
    }

    if let (Some(dps), Some(task)) = (config.dps.as_deref(), config.task.as_ref()) {
        let credentials = Credentials {
            login: task.login.clone(),
            password: task.password.clone(),
        };
        info!(dps, topic = %task.topic, "[DEPLOY] Processing of DPS task is started");
        let result = provisioner
            .permit_topology(dps, &task.topic, &credentials)
            .await;
        report.record(Step::PermitTopology(task.topic.clone()), result);

        // Validated at load time; a rejected task is reported like any other failed step.
        let submitted = match TaskMessage::from_section(task) {
            Ok(message) => {
                provisioner
                    .submit_task(dps, &task.topic, &message, &credentials)
                    .await
            }
            Err(e) => Err(ProvisionError::InvalidTask(e.to_string())),
        };
        match submitted {
            Ok(location) => {
                if let Some(location) = &location {
                    info!(%location, "[DEPLOY] Submitted task");
                }
                report.task_location = location;
                report.record(Step::SubmitTask(task.topic.clone()), Ok(()));
            }
            Err(e) => report.record(Step::SubmitTask(task.topic.clone()), Err(e)),
        }
    }

    report
}
