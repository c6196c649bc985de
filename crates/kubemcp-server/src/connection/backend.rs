//! Kubernetes authentication strategies
//!
//! Applicability is judged from cheap local markers (environment, files,
//! config fields); the attempt itself builds a kube client with the
//! configured timeouts. The liveness probe stays in the manager.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kube::config::{
    AuthInfo, Cluster, Context, KubeConfigOptions, Kubeconfig, NamedAuthInfo, NamedCluster,
    NamedContext,
};
use kube::{Client, Config};
use tracing::debug;

use kubemcp_core::domain::config::EffectiveConfig;
use kubemcp_core::domain::connection::AuthStrategy;

use crate::cluster::{ClusterAccess, KubeClusterClient};

use super::ConnectBackend;

const SERVICE_HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";
const SERVICE_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
/// Entry name for the kubeconfig synthesized by the token strategy.
const TOKEN_CONTEXT: &str = "kubemcp-token";

#[derive(Debug, Default)]
pub struct KubeConnectBackend;

impl KubeConnectBackend {
    pub fn new() -> Self {
        Self
    }

    fn in_cluster_markers_present() -> bool {
        std::env::var_os(SERVICE_HOST_ENV).is_some()
            || std::path::Path::new(SERVICE_TOKEN_PATH).exists()
    }

    /// Explicit path wins; otherwise `~/.kube/config` when it exists.
    fn kubeconfig_path(config: &EffectiveConfig) -> Option<PathBuf> {
        if let Some(path) = &config.kubeconfig_path {
            return Some(path.clone());
        }
        dirs::home_dir()
            .map(|home| home.join(".kube").join("config"))
            .filter(|path| path.exists())
    }

    fn finish(mut config: Config, timeout: Duration) -> Result<Arc<dyn ClusterAccess>, String> {
        config.connect_timeout = Some(timeout);
        config.read_timeout = Some(timeout);
        let client = Client::try_from(config)
            .map_err(|err| format!("client construction failed: {err}"))?;
        Ok(Arc::new(KubeClusterClient::new(client)))
    }

    async fn attempt_in_cluster(
        &self,
        config: &EffectiveConfig,
    ) -> Result<Arc<dyn ClusterAccess>, String> {
        let cluster_config = Config::incluster()
            .map_err(|err| format!("in-cluster configuration unavailable: {err}"))?;
        Self::finish(cluster_config, config.timeout())
    }

    async fn attempt_kubeconfig(
        &self,
        config: &EffectiveConfig,
    ) -> Result<Arc<dyn ClusterAccess>, String> {
        let path = Self::kubeconfig_path(config).ok_or_else(|| "no kubeconfig found".to_string())?;
        debug!(path = %path.display(), context = ?config.context, "loading kubeconfig");
        let kubeconfig = Kubeconfig::read_from(&path)
            .map_err(|err| format!("kubeconfig {}: {err}", path.display()))?;
        let options = KubeConfigOptions {
            context: config.context.clone(),
            ..Default::default()
        };
        let cluster_config = Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .map_err(|err| format!("kubeconfig {}: {err}", path.display()))?;
        Self::finish(cluster_config, config.timeout())
    }

    async fn attempt_token(
        &self,
        config: &EffectiveConfig,
    ) -> Result<Arc<dyn ClusterAccess>, String> {
        let (api_server, token) = match (&config.api_server, &config.token) {
            (Some(api_server), Some(token)) => (api_server, token),
            _ => return Err("api_server and token are not both configured".to_string()),
        };
        let kubeconfig = token_kubeconfig(api_server, token);
        let cluster_config =
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|err| format!("api server {api_server}: {err}"))?;
        Self::finish(cluster_config, config.timeout())
    }
}

#[async_trait]
impl ConnectBackend for KubeConnectBackend {
    fn applicable(&self, strategy: AuthStrategy, config: &EffectiveConfig) -> Result<(), String> {
        match strategy {
            AuthStrategy::InCluster => {
                if Self::in_cluster_markers_present() {
                    Ok(())
                } else {
                    Err("no in-cluster service account detected".to_string())
                }
            }
            AuthStrategy::KubeconfigFile => {
                if Self::kubeconfig_path(config).is_some() {
                    Ok(())
                } else {
                    Err("no kubeconfig found".to_string())
                }
            }
            AuthStrategy::Token => {
                if config.api_server.is_some() && config.token.is_some() {
                    Ok(())
                } else {
                    Err("api_server and token are not both configured".to_string())
                }
            }
        }
    }

    async fn attempt(
        &self,
        strategy: AuthStrategy,
        config: &EffectiveConfig,
    ) -> Result<Arc<dyn ClusterAccess>, String> {
        match strategy {
            AuthStrategy::InCluster => self.attempt_in_cluster(config).await,
            AuthStrategy::KubeconfigFile => self.attempt_kubeconfig(config).await,
            AuthStrategy::Token => self.attempt_token(config).await,
        }
    }
}

/// In-memory kubeconfig for bearer-token access to a named API server.
fn token_kubeconfig(api_server: &str, token: &str) -> Kubeconfig {
    Kubeconfig {
        clusters: vec![NamedCluster {
            name: TOKEN_CONTEXT.to_string(),
            cluster: Some(Cluster {
                server: Some(api_server.to_string()),
                ..Default::default()
            }),
        }],
        auth_infos: vec![NamedAuthInfo {
            name: TOKEN_CONTEXT.to_string(),
            auth_info: Some(AuthInfo {
                token: Some(token.to_string().into()),
                ..Default::default()
            }),
        }],
        contexts: vec![NamedContext {
            name: TOKEN_CONTEXT.to_string(),
            context: Some(Context {
                cluster: TOKEN_CONTEXT.to_string(),
                user: TOKEN_CONTEXT.to_string(),
                ..Default::default()
            }),
        }],
        current_context: Some(TOKEN_CONTEXT.to_string()),
        ..Default::default()
    }
}
