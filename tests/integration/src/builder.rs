//! Builder validation through the public API.

use std::time::Duration;

use rally_client::{ClientError, ClusterClient};

#[tokio::test]
async fn build_without_seeds_fails() {
    let err = ClusterClient::builder()
        .user("app")
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Configuration(_)));
}

#[tokio::test]
async fn build_without_user_fails() {
    let err = ClusterClient::builder()
        .seeds("a:3306")
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Configuration(_)));
}

#[tokio::test]
async fn build_with_zero_discover_period_fails() {
    let err = ClusterClient::builder()
        .seeds("a:3306")
        .user("app")
        .discover_period(Duration::ZERO)
        .build()
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Configuration(_)));
}

#[tokio::test]
async fn test_mode_builds_without_a_server() {
    let client = ClusterClient::builder()
        .seeds("a:3306,b:3306,c:3306")
        .user("app")
        .database("orders")
        .test_mode(true)
        .build()
        .await
        .unwrap();

    assert_eq!(client.active_nodes().len(), 3);
    assert!(client.downed_nodes().is_empty());
}
