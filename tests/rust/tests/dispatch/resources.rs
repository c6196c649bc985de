//! Resource listings: namespace defaulting, truncation, redaction, URIs.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use kubemcp_core::domain::config::EffectiveConfig;
use kubemcp_core::domain::request::ResourceKind;
use kubemcp_server::mcp::uri;
use tests::{dispatcher_with, mocks, MockCluster};

#[tokio::test]
async fn listing_reports_count_and_applied_limit() {
    let cluster = Arc::new(MockCluster::new().with_pods(mocks::pods(3, "default")));
    let dispatcher = dispatcher_with(EffectiveConfig::default(), Arc::clone(&cluster));

    let response = dispatcher
        .read_listing(ResourceKind::Pods, Some("default".to_string()))
        .await
        .unwrap();

    assert_eq!(response.meta.count, 3);
    assert!(!response.meta.truncated);
    assert_eq!(response.meta.limit_applied, 1000);

    let wire = response.into_json();
    assert_eq!(wire["kind"], "pods");
    assert_eq!(wire["items"].as_array().unwrap().len(), 3);
    assert_eq!(wire["meta"]["truncated"], false);
}

#[tokio::test]
async fn truncation_is_exact_and_always_flagged() {
    let config = EffectiveConfig {
        max_items_per_request: 5,
        ..Default::default()
    };

    let over = Arc::new(MockCluster::new().with_pods(mocks::pods(7, "default")));
    let response = dispatcher_with(config.clone(), over)
        .read_listing(ResourceKind::Pods, Some("default".to_string()))
        .await
        .unwrap();
    assert_eq!(response.meta.count, 5);
    assert!(response.meta.truncated);
    assert_eq!(response.body["items"].as_array().unwrap().len(), 5);

    let at_limit = Arc::new(MockCluster::new().with_pods(mocks::pods(5, "default")));
    let response = dispatcher_with(config, at_limit)
        .read_listing(ResourceKind::Pods, Some("default".to_string()))
        .await
        .unwrap();
    assert_eq!(response.meta.count, 5);
    assert!(!response.meta.truncated);
}

#[tokio::test]
async fn missing_namespace_falls_back_to_the_configured_default() {
    let cluster = Arc::new(MockCluster::new().with_pods(mocks::pods(1, "apps")));
    let config = EffectiveConfig {
        default_namespace: "apps".to_string(),
        ..Default::default()
    };
    let dispatcher = dispatcher_with(config, Arc::clone(&cluster));

    dispatcher.read_listing(ResourceKind::Pods, None).await.unwrap();
    assert_eq!(
        cluster.last_filter().unwrap().namespace.as_deref(),
        Some("apps")
    );
}

#[tokio::test]
async fn restricted_namespaces_deny_before_any_cluster_call() {
    let cluster = Arc::new(MockCluster::new());
    let config = EffectiveConfig {
        allowed_namespaces: vec!["prod".to_string()],
        ..Default::default()
    };
    let dispatcher = dispatcher_with(config, Arc::clone(&cluster));

    // the default namespace is applied first, and "default" is not allowed
    let err = dispatcher
        .read_listing(ResourceKind::Pods, None)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "namespace_not_allowed");

    let err = dispatcher
        .read_listing(ResourceKind::Pods, Some("dev".to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "namespace_not_allowed");
    assert_eq!(cluster.calls(), 0);
}

#[tokio::test]
async fn namespaces_listing_is_cluster_scoped_and_redacted() {
    let cluster = Arc::new(MockCluster::new().with_namespaces(vec![
        mocks::namespace_record("prod", &[("team", "core"), ("vault-token", "abc")]),
        mocks::namespace_record("staging", &[]),
    ]));
    let dispatcher = dispatcher_with(EffectiveConfig::default(), Arc::clone(&cluster));

    let response = dispatcher
        .read_listing(ResourceKind::Namespaces, None)
        .await
        .unwrap();
    let text = response.into_json().to_string();
    assert!(!text.to_ascii_lowercase().contains("token"), "{text}");
    assert!(text.contains("\"team\":\"core\""), "{text}");
}

#[tokio::test]
async fn disabled_filtering_passes_fields_through() {
    let cluster = Arc::new(MockCluster::new().with_namespaces(vec![
        mocks::namespace_record("prod", &[("vault-token", "abc")]),
    ]));
    let config = EffectiveConfig {
        filter_sensitive_data: false,
        ..Default::default()
    };
    let dispatcher = dispatcher_with(config, cluster);

    let response = dispatcher
        .read_listing(ResourceKind::Namespaces, None)
        .await
        .unwrap();
    assert!(response.into_json().to_string().contains("vault-token"));
}

#[test]
fn resource_uris_drive_the_listing_namespace() {
    assert_eq!(
        uri::parse("k8s://pods?namespace=prod").unwrap(),
        (ResourceKind::Pods, Some("prod".to_string()))
    );
    assert_eq!(
        uri::parse("k8s://namespaces").unwrap(),
        (ResourceKind::Namespaces, None)
    );
    assert_eq!(
        uri::parse("k8s://configmaps").unwrap_err().code(),
        "invalid_argument"
    );
}
