//! Compact record shapes
//!
//! Raw cluster objects are verbose and full of fields an agent never needs.
//! These records carry the short form each surface returns; the conversions
//! tolerate absent optional blocks, which empty test fixtures and freshly
//! created objects both produce.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Container, ContainerState, Namespace, Pod, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::{Deserialize, Serialize};

fn created_at(metadata: &ObjectMeta) -> Option<String> {
    metadata
        .creation_timestamp
        .as_ref()
        .map(|time| time.0.to_rfc3339())
}

/// One pod in a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodRecord {
    pub name: String,
    pub namespace: String,
    pub status: Option<String>,
    pub created: Option<String>,
    pub ready_containers: usize,
    pub total_containers: usize,
    pub node: Option<String>,
    pub pod_ip: Option<String>,
}

impl From<&Pod> for PodRecord {
    fn from(pod: &Pod) -> Self {
        let spec = pod.spec.as_ref();
        let status = pod.status.as_ref();
        let container_statuses = status.and_then(|s| s.container_statuses.as_ref());
        Self {
            name: pod.metadata.name.clone().unwrap_or_default(),
            namespace: pod.metadata.namespace.clone().unwrap_or_default(),
            status: status.and_then(|s| s.phase.clone()),
            created: created_at(&pod.metadata),
            ready_containers: container_statuses
                .map(|statuses| statuses.iter().filter(|c| c.ready).count())
                .unwrap_or(0),
            total_containers: spec.map(|s| s.containers.len()).unwrap_or(0),
            node: spec.and_then(|s| s.node_name.clone()),
            pod_ip: status.and_then(|s| s.pod_ip.clone()),
        }
    }
}

/// One pod in a status query. `ready` is the kubectl-style `ready/total`
/// pair over reported container statuses, not declared containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodStatusRecord {
    pub name: String,
    pub namespace: String,
    pub phase: Option<String>,
    pub ready: String,
    pub restarts: i32,
    pub age: Option<String>,
    pub node: Option<String>,
    pub pod_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&Pod> for PodStatusRecord {
    fn from(pod: &Pod) -> Self {
        let spec = pod.spec.as_ref();
        let status = pod.status.as_ref();
        let phase = status.and_then(|s| s.phase.clone());
        let container_statuses = status.and_then(|s| s.container_statuses.as_ref());

        let (ready, restarts) = match container_statuses {
            Some(statuses) => {
                let ready_count = statuses.iter().filter(|c| c.ready).count();
                (
                    format!("{}/{}", ready_count, statuses.len()),
                    statuses.iter().map(|c| c.restart_count).sum(),
                )
            }
            None => ("0/0".to_string(), 0),
        };

        // Surface the first waiting reason for pods stuck outside Running
        let reason = if phase.as_deref() != Some("Running") {
            container_statuses.and_then(|statuses| {
                statuses
                    .iter()
                    .filter_map(|c| c.state.as_ref())
                    .filter_map(|state| state.waiting.as_ref())
                    .find_map(|waiting| waiting.reason.clone())
            })
        } else {
            None
        };

        Self {
            name: pod.metadata.name.clone().unwrap_or_default(),
            namespace: pod.metadata.namespace.clone().unwrap_or_default(),
            phase,
            ready,
            restarts,
            age: created_at(&pod.metadata),
            node: spec.and_then(|s| s.node_name.clone()),
            pod_ip: status.and_then(|s| s.pod_ip.clone()),
            reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePortRecord {
    pub port: i32,
    pub target_port: Option<IntOrString>,
    pub protocol: Option<String>,
}

/// One service in a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub name: String,
    pub namespace: String,
    #[serde(rename = "type")]
    pub service_type: Option<String>,
    pub cluster_ip: Option<String>,
    pub ports: Vec<ServicePortRecord>,
    pub selector: BTreeMap<String, String>,
    pub created: Option<String>,
}

impl From<&Service> for ServiceRecord {
    fn from(service: &Service) -> Self {
        let spec = service.spec.as_ref();
        Self {
            name: service.metadata.name.clone().unwrap_or_default(),
            namespace: service.metadata.namespace.clone().unwrap_or_default(),
            service_type: spec.and_then(|s| s.type_.clone()),
            cluster_ip: spec.and_then(|s| s.cluster_ip.clone()),
            ports: spec
                .and_then(|s| s.ports.as_ref())
                .map(|ports| {
                    ports
                        .iter()
                        .map(|p| ServicePortRecord {
                            port: p.port,
                            target_port: p.target_port.clone(),
                            protocol: p.protocol.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
            selector: spec.and_then(|s| s.selector.clone()).unwrap_or_default(),
            created: created_at(&service.metadata),
        }
    }
}

/// One deployment in a listing. Missing replica counters read as zero,
/// matching what a just-created deployment reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub name: String,
    pub namespace: String,
    pub ready_replicas: i32,
    pub replicas: i32,
    pub updated_replicas: i32,
    pub available_replicas: i32,
    pub selector: BTreeMap<String, String>,
    pub created: Option<String>,
}

impl From<&Deployment> for DeploymentRecord {
    fn from(deployment: &Deployment) -> Self {
        let spec = deployment.spec.as_ref();
        let status = deployment.status.as_ref();
        Self {
            name: deployment.metadata.name.clone().unwrap_or_default(),
            namespace: deployment.metadata.namespace.clone().unwrap_or_default(),
            ready_replicas: status.and_then(|s| s.ready_replicas).unwrap_or(0),
            replicas: spec.and_then(|s| s.replicas).unwrap_or(0),
            updated_replicas: status.and_then(|s| s.updated_replicas).unwrap_or(0),
            available_replicas: status.and_then(|s| s.available_replicas).unwrap_or(0),
            selector: spec
                .and_then(|s| s.selector.match_labels.clone())
                .unwrap_or_default(),
            created: created_at(&deployment.metadata),
        }
    }
}

/// One namespace in a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceRecord {
    pub name: String,
    pub status: Option<String>,
    pub created: Option<String>,
    pub labels: BTreeMap<String, String>,
}

impl From<&Namespace> for NamespaceRecord {
    fn from(namespace: &Namespace) -> Self {
        Self {
            name: namespace.metadata.name.clone().unwrap_or_default(),
            status: namespace
                .status
                .as_ref()
                .and_then(|s| s.phase.clone()),
            created: created_at(&namespace.metadata),
            labels: namespace.metadata.labels.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerPortRecord {
    #[serde(rename = "containerPort")]
    pub container_port: i32,
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerResources {
    pub requests: BTreeMap<String, String>,
    pub limits: BTreeMap<String, String>,
}

/// Declared container merged with its reported status, when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerDetail {
    pub name: String,
    pub image: Option<String>,
    pub ports: Vec<ContainerPortRecord>,
    pub resources: ContainerResources,
    pub ready: Option<bool>,
    pub restart_count: Option<i32>,
    pub state: Option<String>,
}

impl From<&Container> for ContainerDetail {
    fn from(container: &Container) -> Self {
        let resources = container.resources.as_ref();
        Self {
            name: container.name.clone(),
            image: container.image.clone(),
            ports: container
                .ports
                .as_ref()
                .map(|ports| {
                    ports
                        .iter()
                        .map(|p| ContainerPortRecord {
                            container_port: p.container_port,
                            protocol: p.protocol.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
            resources: ContainerResources {
                requests: quantity_map(resources.and_then(|r| r.requests.as_ref())),
                limits: quantity_map(resources.and_then(|r| r.limits.as_ref())),
            },
            ready: None,
            restart_count: None,
            state: None,
        }
    }
}

type QuantityMap = BTreeMap<String, k8s_openapi::apimachinery::pkg::api::resource::Quantity>;

fn quantity_map(quantities: Option<&QuantityMap>) -> BTreeMap<String, String> {
    quantities
        .map(|map| {
            map.iter()
                .map(|(key, quantity)| (key.clone(), quantity.0.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn container_state_summary(state: &ContainerState) -> String {
    if state.running.is_some() {
        "running".to_string()
    } else if let Some(waiting) = &state.waiting {
        match &waiting.reason {
            Some(reason) => format!("waiting ({reason})"),
            None => "waiting".to_string(),
        }
    } else if let Some(terminated) = &state.terminated {
        match &terminated.reason {
            Some(reason) => format!("terminated ({reason})"),
            None => format!("terminated (exit {})", terminated.exit_code),
        }
    } else {
        "unknown".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodConditionRecord {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub status: String,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub last_transition_time: Option<String>,
}

/// Full detail for one pod, as returned by describe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodDetail {
    pub name: String,
    pub namespace: String,
    pub status: Option<String>,
    pub created: Option<String>,
    pub node: Option<String>,
    pub pod_ip: Option<String>,
    pub host_ip: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub containers: Vec<ContainerDetail>,
    pub conditions: Vec<PodConditionRecord>,
}

impl From<&Pod> for PodDetail {
    fn from(pod: &Pod) -> Self {
        let spec = pod.spec.as_ref();
        let status = pod.status.as_ref();

        let mut containers: Vec<ContainerDetail> = spec
            .map(|s| s.containers.iter().map(ContainerDetail::from).collect())
            .unwrap_or_default();

        // Statuses pair with declared containers by position
        if let Some(statuses) = status.and_then(|s| s.container_statuses.as_ref()) {
            for (detail, container_status) in containers.iter_mut().zip(statuses) {
                detail.ready = Some(container_status.ready);
                detail.restart_count = Some(container_status.restart_count);
                detail.state = container_status
                    .state
                    .as_ref()
                    .map(container_state_summary);
            }
        }

        let conditions = status
            .and_then(|s| s.conditions.as_ref())
            .map(|conditions| {
                conditions
                    .iter()
                    .map(|condition| PodConditionRecord {
                        condition_type: condition.type_.clone(),
                        status: condition.status.clone(),
                        reason: condition.reason.clone(),
                        message: condition.message.clone(),
                        last_transition_time: condition
                            .last_transition_time
                            .as_ref()
                            .map(|time| time.0.to_rfc3339()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: pod.metadata.name.clone().unwrap_or_default(),
            namespace: pod.metadata.namespace.clone().unwrap_or_default(),
            status: status.and_then(|s| s.phase.clone()),
            created: created_at(&pod.metadata),
            node: spec.and_then(|s| s.node_name.clone()),
            pod_ip: status.and_then(|s| s.pod_ip.clone()),
            host_ip: status.and_then(|s| s.host_ip.clone()),
            labels: pod.metadata.labels.clone().unwrap_or_default(),
            annotations: pod.metadata.annotations.clone().unwrap_or_default(),
            containers,
            conditions,
        }
    }
}
