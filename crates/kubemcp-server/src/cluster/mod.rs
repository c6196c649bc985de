//! Cluster access
//!
//! `ClusterAccess` is the seam between the dispatch pipeline and the
//! Kubernetes API: the dispatcher only ever sees this trait, so tests run
//! against an in-memory implementation and the production path runs against
//! [`KubeClusterClient`].

mod records;

pub use records::{
    ContainerDetail, ContainerPortRecord, ContainerResources, DeploymentRecord, NamespaceRecord,
    PodConditionRecord, PodDetail, PodRecord, PodStatusRecord, ServicePortRecord, ServiceRecord,
};

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Pod, Service};
use kube::api::{ListParams, LogParams};
use kube::{Api, Client};
use thiserror::Error;

/// Selection criteria for pod listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub namespace: Option<String>,
    pub label_selector: Option<String>,
    pub field_selector: Option<String>,
}

/// Parameters for a log read. `tail_lines` is already capped by the
/// dispatcher before it gets here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub container: Option<String>,
    pub tail_lines: usize,
}

/// A cluster call that did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterError {
    #[error("{message}")]
    NotFound { message: String },
    #[error("{message}")]
    Forbidden { message: String },
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("{message}")]
    Other { message: String },
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) if response.code == 404 => Self::NotFound {
                message: response.message,
            },
            kube::Error::Api(response) if response.code == 403 => Self::Forbidden {
                message: response.message,
            },
            kube::Error::Api(response) => Self::Api {
                status: response.code,
                message: response.message,
            },
            other => Self::Other {
                message: other.to_string(),
            },
        }
    }
}

/// Read-only view of a connected cluster.
#[async_trait]
pub trait ClusterAccess: Send + Sync {
    /// Cheap liveness read; returns the server version string.
    async fn probe(&self) -> Result<String, ClusterError>;

    async fn list_pods(&self, filter: &ListFilter) -> Result<Vec<PodRecord>, ClusterError>;

    async fn list_services(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<ServiceRecord>, ClusterError>;

    async fn list_deployments(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<DeploymentRecord>, ClusterError>;

    async fn list_namespaces(&self) -> Result<Vec<NamespaceRecord>, ClusterError>;

    async fn describe_pod(&self, namespace: &str, name: &str) -> Result<PodDetail, ClusterError>;

    async fn pod_status(&self, filter: &ListFilter) -> Result<Vec<PodStatusRecord>, ClusterError>;

    async fn pod_logs(
        &self,
        namespace: &str,
        name: &str,
        query: &LogQuery,
    ) -> Result<String, ClusterError>;
}

/// Production accessor backed by a kube [`Client`].
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn pods(&self, namespace: Option<&str>) -> Api<Pod> {
        match namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }

    fn services(&self, namespace: Option<&str>) -> Api<Service> {
        match namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }

    fn deployments(&self, namespace: Option<&str>) -> Api<Deployment> {
        match namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }

    fn list_params(filter: &ListFilter) -> ListParams {
        let mut params = ListParams::default();
        if let Some(labels) = &filter.label_selector {
            params = params.labels(labels);
        }
        if let Some(fields) = &filter.field_selector {
            params = params.fields(fields);
        }
        params
    }
}

#[async_trait]
impl ClusterAccess for KubeClusterClient {
    async fn probe(&self) -> Result<String, ClusterError> {
        let info = self.client.apiserver_version().await?;
        Ok(info.git_version)
    }

    async fn list_pods(&self, filter: &ListFilter) -> Result<Vec<PodRecord>, ClusterError> {
        let params = Self::list_params(filter);
        let pods = self.pods(filter.namespace.as_deref()).list(&params).await?;
        Ok(pods.items.iter().map(PodRecord::from).collect())
    }

    async fn list_services(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<ServiceRecord>, ClusterError> {
        let services = self
            .services(namespace)
            .list(&ListParams::default())
            .await?;
        Ok(services.items.iter().map(ServiceRecord::from).collect())
    }

    async fn list_deployments(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<DeploymentRecord>, ClusterError> {
        let deployments = self
            .deployments(namespace)
            .list(&ListParams::default())
            .await?;
        Ok(deployments
            .items
            .iter()
            .map(DeploymentRecord::from)
            .collect())
    }

    async fn list_namespaces(&self) -> Result<Vec<NamespaceRecord>, ClusterError> {
        let api: Api<Namespace> = Api::all(self.client.clone());
        let namespaces = api.list(&ListParams::default()).await?;
        Ok(namespaces.items.iter().map(NamespaceRecord::from).collect())
    }

    async fn describe_pod(&self, namespace: &str, name: &str) -> Result<PodDetail, ClusterError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod = api.get(name).await?;
        Ok(PodDetail::from(&pod))
    }

    async fn pod_status(&self, filter: &ListFilter) -> Result<Vec<PodStatusRecord>, ClusterError> {
        let params = Self::list_params(filter);
        let pods = self.pods(filter.namespace.as_deref()).list(&params).await?;
        Ok(pods.items.iter().map(PodStatusRecord::from).collect())
    }

    async fn pod_logs(
        &self,
        namespace: &str,
        name: &str,
        query: &LogQuery,
    ) -> Result<String, ClusterError> {
        let params = LogParams {
            container: query.container.clone(),
            tail_lines: Some(query.tail_lines as i64),
            ..Default::default()
        };
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.logs(name, &params).await?)
    }
}
