//! Scheduler configuration renderer.
//!
//! A stateless companion to the secrets manager: takes a typed scheduler
//! configuration plus the leader-election resource name and namespace, and
//! serializes a fixed-schema YAML document with deterministic key ordering
//! and defaulted leader-election fields.

use std::time::Duration;

use anyhow::anyhow;
use serde::{Serialize, Serializer};

use crate::errors::{Result, TrustplaneError};

const API_VERSION: &str = "kubescheduler.config.k8s.io/v1beta3";
const KIND: &str = "KubeSchedulerConfiguration";

const DEFAULT_LEASE_DURATION: Duration = Duration::from_secs(15);
const DEFAULT_RENEW_DEADLINE: Duration = Duration::from_secs(10);
const DEFAULT_RETRY_PERIOD: Duration = Duration::from_secs(2);
const DEFAULT_RESOURCE_LOCK: &str = "leases";

/// Client connection tuning, rendered verbatim.
#[derive(Debug, Clone, Default)]
pub struct ClientConnection {
    pub accept_content_types: String,
    pub burst: i32,
    pub content_type: String,
    pub kubeconfig: String,
    pub qps: i32,
}

/// Leader-election tuning; unset fields render as the documented defaults.
#[derive(Debug, Clone, Default)]
pub struct LeaderElection {
    pub leader_elect: Option<bool>,
    pub lease_duration: Option<Duration>,
    pub renew_deadline: Option<Duration>,
    pub resource_lock: Option<String>,
    pub retry_period: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct SchedulerProfile {
    pub scheduler_name: Option<String>,
}

/// Typed input to the renderer.
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfiguration {
    pub client_connection: ClientConnection,
    pub leader_election: LeaderElection,
    pub profiles: Vec<SchedulerProfile>,
}

/// Renders one scheduler configuration document. No state, no rotation,
/// no concurrency concerns.
#[derive(Debug, Clone)]
pub struct Configurator {
    resource_name: String,
    resource_namespace: String,
    configuration: SchedulerConfiguration,
}

impl Configurator {
    pub fn new(
        leader_election_resource_name: impl Into<String>,
        leader_election_namespace: impl Into<String>,
        configuration: SchedulerConfiguration,
    ) -> Result<Self> {
        let resource_name = leader_election_resource_name.into();
        let resource_namespace = leader_election_namespace.into();
        if resource_name.is_empty() {
            return Err(TrustplaneError::validation_field(
                "leader election resource name must not be empty",
                "leader_election_resource_name",
            ));
        }
        if resource_namespace.is_empty() {
            return Err(TrustplaneError::validation_field(
                "leader election namespace must not be empty",
                "leader_election_namespace",
            ));
        }
        Ok(Self { resource_name, resource_namespace, configuration })
    }

    /// Serialize the configuration document.
    pub fn config(&self) -> Result<String> {
        let leader_election = &self.configuration.leader_election;
        let client_connection = &self.configuration.client_connection;

        let document = RenderedConfiguration {
            api_version: API_VERSION,
            client_connection: RenderedClientConnection {
                accept_content_types: &client_connection.accept_content_types,
                burst: client_connection.burst,
                content_type: &client_connection.content_type,
                kubeconfig: &client_connection.kubeconfig,
                qps: client_connection.qps,
            },
            kind: KIND,
            leader_election: RenderedLeaderElection {
                leader_elect: leader_election.leader_elect.unwrap_or(true),
                lease_duration: Seconds(
                    leader_election.lease_duration.unwrap_or(DEFAULT_LEASE_DURATION),
                ),
                renew_deadline: Seconds(
                    leader_election.renew_deadline.unwrap_or(DEFAULT_RENEW_DEADLINE),
                ),
                resource_lock: leader_election
                    .resource_lock
                    .as_deref()
                    .unwrap_or(DEFAULT_RESOURCE_LOCK),
                resource_name: &self.resource_name,
                resource_namespace: &self.resource_namespace,
                retry_period: Seconds(
                    leader_election.retry_period.unwrap_or(DEFAULT_RETRY_PERIOD),
                ),
            },
            profiles: self
                .configuration
                .profiles
                .iter()
                .map(|p| RenderedProfile { scheduler_name: p.scheduler_name.as_deref() })
                .collect(),
        };

        serde_yaml::to_string(&document)
            .map_err(|e| TrustplaneError::crypto("scheduler config rendering failed", anyhow!(e)))
    }
}

/// Go-style duration scalar, e.g. `15s`.
struct Seconds(Duration);

impl Serialize for Seconds {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}s", self.0.as_secs()))
    }
}

// Field declaration order below is the document's key order.

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderedConfiguration<'a> {
    api_version: &'a str,
    client_connection: RenderedClientConnection<'a>,
    kind: &'a str,
    leader_election: RenderedLeaderElection<'a>,
    profiles: Vec<RenderedProfile<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderedClientConnection<'a> {
    accept_content_types: &'a str,
    burst: i32,
    content_type: &'a str,
    kubeconfig: &'a str,
    qps: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderedLeaderElection<'a> {
    leader_elect: bool,
    lease_duration: Seconds,
    renew_deadline: Seconds,
    resource_lock: &'a str,
    resource_name: &'a str,
    resource_namespace: &'a str,
    retry_period: Seconds,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderedProfile<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    scheduler_name: Option<&'a str>,
}
