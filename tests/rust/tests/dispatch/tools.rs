//! Tool calls: argument validation, log capping, error mapping.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

use kubemcp_core::domain::config::EffectiveConfig;
use kubemcp_core::domain::request::Operation;
use kubemcp_server::cluster::ClusterError;
use kubemcp_server::{ConnectionManager, RequestDispatcher};
use tests::{dispatcher_with, mocks, MockCluster, MockConnectBackend};

fn args(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

#[tokio::test]
async fn log_lines_are_capped_at_the_configured_maximum() {
    let cluster = Arc::new(MockCluster::new().with_log_lines(500));
    let config = EffectiveConfig {
        max_log_lines: 100,
        ..Default::default()
    };
    let dispatcher = dispatcher_with(config, Arc::clone(&cluster));

    let response = dispatcher
        .get_pod_logs(&args(&[("pod_name", json!("web-1")), ("lines", json!(500))]))
        .await
        .unwrap();

    assert_eq!(response.meta.count, 100);
    assert!(response.meta.truncated);
    assert_eq!(response.meta.limit_applied, 100);

    let wire = response.into_json();
    assert_eq!(wire["logs"].as_str().unwrap().lines().count(), 100);

    // the cap was applied before the fetch, not after
    let (_, _, query) = cluster.last_log_query().unwrap();
    assert_eq!(query.tail_lines, 100);
}

#[tokio::test]
async fn a_request_under_the_cap_is_not_flagged() {
    let cluster = Arc::new(MockCluster::new().with_log_lines(500));
    let dispatcher = dispatcher_with(EffectiveConfig::default(), cluster);

    let response = dispatcher
        .get_pod_logs(&args(&[("pod_name", json!("web-1")), ("lines", json!(50))]))
        .await
        .unwrap();
    assert_eq!(response.meta.count, 50);
    assert!(!response.meta.truncated);
}

#[tokio::test]
async fn logs_default_the_namespace_and_forward_the_container() {
    let cluster = Arc::new(MockCluster::new().with_log_lines(10));
    let config = EffectiveConfig {
        default_namespace: "apps".to_string(),
        ..Default::default()
    };
    let dispatcher = dispatcher_with(config, Arc::clone(&cluster));

    dispatcher
        .get_pod_logs(&args(&[
            ("pod_name", json!("web-1")),
            ("container", json!("sidecar")),
        ]))
        .await
        .unwrap();

    let (namespace, name, query) = cluster.last_log_query().unwrap();
    assert_eq!(namespace, "apps");
    assert_eq!(name, "web-1");
    assert_eq!(query.container.as_deref(), Some("sidecar"));
}

#[tokio::test]
async fn missing_and_invalid_arguments_never_reach_the_cluster() {
    let cluster = Arc::new(MockCluster::new());
    let dispatcher = dispatcher_with(EffectiveConfig::default(), Arc::clone(&cluster));

    let err = dispatcher.get_pod_logs(&args(&[])).await.unwrap_err();
    assert_eq!(err.code(), "invalid_argument");
    assert!(err.to_string().contains("pod_name"), "{err}");

    let err = dispatcher
        .get_pod_logs(&args(&[("pod_name", json!("web-1")), ("lines", json!(0))]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid_argument");

    let err = dispatcher.describe_pod(&args(&[])).await.unwrap_err();
    assert_eq!(err.code(), "invalid_argument");

    assert_eq!(cluster.calls(), 0);
}

#[tokio::test]
async fn a_disallowed_operation_never_reaches_the_connection_manager() {
    let backend = Arc::new(MockConnectBackend::new());
    let config = Arc::new(EffectiveConfig {
        allowed_operations: BTreeSet::from([Operation::List, Operation::Get]),
        ..Default::default()
    });
    let backend_handle = Arc::clone(&backend);
    let connection = Arc::new(ConnectionManager::new(Arc::clone(&config), backend_handle));
    let dispatcher = RequestDispatcher::new(config, connection);

    let err = dispatcher
        .get_pod_logs(&args(&[("pod_name", json!("web-1"))]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "operation_not_allowed");
    assert_eq!(backend.total_attempts(), 0);
}

#[tokio::test]
async fn describe_pod_maps_a_missing_pod_to_not_found() {
    let cluster = Arc::new(MockCluster::new());
    let dispatcher = dispatcher_with(EffectiveConfig::default(), cluster);

    let err = dispatcher
        .describe_pod(&args(&[("pod_name", json!("ghost"))]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "not_found");
}

#[tokio::test]
async fn describe_pod_returns_the_shaped_detail() {
    let cluster =
        Arc::new(MockCluster::new().with_pod_detail(mocks::pod_detail("web-1", "default")));
    let dispatcher = dispatcher_with(EffectiveConfig::default(), cluster);

    let response = dispatcher
        .describe_pod(&args(&[("pod_name", json!("web-1"))]))
        .await
        .unwrap();
    let wire = response.into_json();
    assert_eq!(wire["pod"]["name"], "web-1");
    assert_eq!(wire["pod"]["node"], "node-a");
    assert_eq!(wire["meta"]["count"], 1);
}

#[tokio::test]
async fn forbidden_maps_to_permission_denied_only_when_rbac_aware() {
    let forbidden = ClusterError::Forbidden {
        message: "pods is forbidden: RBAC".to_string(),
    };

    let cluster = Arc::new(MockCluster::new().with_failure(forbidden.clone()));
    let dispatcher = dispatcher_with(EffectiveConfig::default(), cluster);
    let err = dispatcher
        .get_pod_status(&args(&[("namespace", json!("default"))]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "permission_denied");

    let cluster = Arc::new(MockCluster::new().with_failure(forbidden));
    let config = EffectiveConfig {
        rbac_check: false,
        ..Default::default()
    };
    let err = dispatcher_with(config, cluster)
        .get_pod_status(&args(&[("namespace", json!("default"))]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "cluster_api_error");
}

#[tokio::test(start_paused = true)]
async fn a_slow_cluster_call_times_out() {
    let cluster = Arc::new(
        MockCluster::new()
            .with_pods(mocks::pods(1, "default"))
            .with_delay(Duration::from_secs(3600)),
    );
    let config = EffectiveConfig {
        timeout_seconds: 5,
        ..Default::default()
    };
    let dispatcher = dispatcher_with(config, cluster);

    let err = dispatcher
        .get_pod_status(&args(&[("namespace", json!("default"))]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "timeout");
    assert!(err.to_string().contains("5s"), "{err}");
}

#[tokio::test]
async fn pod_status_forwards_selectors_and_truncates_like_a_listing() {
    let cluster = Arc::new(MockCluster::new().with_statuses(vec![
        mocks::status_record("web-1", "default", "Running"),
        mocks::status_record("web-2", "default", "Pending"),
        mocks::status_record("web-3", "default", "Running"),
    ]));
    let config = EffectiveConfig {
        max_items_per_request: 2,
        ..Default::default()
    };
    let dispatcher = dispatcher_with(config, Arc::clone(&cluster));

    let response = dispatcher
        .get_pod_status(&args(&[
            ("namespace", json!("default")),
            ("label_selector", json!("app=web")),
            ("field_selector", json!("status.phase=Running")),
        ]))
        .await
        .unwrap();

    assert_eq!(response.meta.count, 2);
    assert!(response.meta.truncated);

    let filter = cluster.last_filter().unwrap();
    assert_eq!(filter.label_selector.as_deref(), Some("app=web"));
    assert_eq!(filter.field_selector.as_deref(), Some("status.phase=Running"));
}

#[tokio::test]
async fn pod_status_without_a_namespace_is_rejected_under_restriction() {
    let cluster = Arc::new(MockCluster::new());
    let config = EffectiveConfig {
        allowed_namespaces: vec!["prod".to_string()],
        ..Default::default()
    };
    let dispatcher = dispatcher_with(config, Arc::clone(&cluster));

    // no namespace argument means cluster-wide, which the restriction forbids
    let err = dispatcher.get_pod_status(&args(&[])).await.unwrap_err();
    assert_eq!(err.code(), "namespace_not_allowed");
    assert_eq!(cluster.calls(), 0);
}
