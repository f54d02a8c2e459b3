//! End-to-end key-value operations against a mock node


use test_helpers::{create_test_config, spawn_mock_node, wait_for_server};

use kvlink::{Cluster, KvError};

async fn connect_single_node() -> (test_helpers::MockNode, Cluster) {
    let node = spawn_mock_node().await;
    wait_for_server(&node.addr(), 20).await.unwrap();

    let config = create_test_config(&[node.port], 2, 5);
    let cluster = Cluster::connect(config).await.unwrap();
    (node, cluster)
}

#[tokio::test]
async fn test_upsert_then_get_round_trip() {
    let (_node, cluster) = connect_single_node().await;
    let bucket = cluster.bucket("app").await.unwrap();
    let collection = bucket.default_collection();

    let mutation = collection
        .upsert("user::1", br#"{"name":"ada"}"#)
        .await
        .unwrap();
    assert!(mutation.cas() > 0);

    let doc = collection.get("user::1").await.unwrap();
    assert_eq!(doc.value(), br#"{"name":"ada"}"#);

    cluster.graceful_shutdown().await;
}

#[tokio::test]
async fn test_get_missing_key_is_key_not_found() {
    let (_node, cluster) = connect_single_node().await;
    let collection = cluster.bucket("app").await.unwrap().default_collection();

    let err = collection.get("missing").await.unwrap_err();
    assert!(matches!(err, KvError::KeyNotFound { .. }));
    assert!(err.is_key_not_found());
}

#[tokio::test]
async fn test_exists_reports_presence() {
    let (_node, cluster) = connect_single_node().await;
    let collection = cluster.bucket("app").await.unwrap().default_collection();

    assert!(!collection.exists("doc").await.unwrap());

    collection.upsert("doc", b"payload").await.unwrap();
    assert!(collection.exists("doc").await.unwrap());
}

#[tokio::test]
async fn test_remove_deletes_document() {
    let (_node, cluster) = connect_single_node().await;
    let collection = cluster.bucket("app").await.unwrap().default_collection();

    collection.upsert("doc", b"payload").await.unwrap();
    collection.remove("doc").await.unwrap();

    assert!(!collection.exists("doc").await.unwrap());

    // Removing again reports the missing key
    let err = collection.remove("doc").await.unwrap_err();
    assert!(err.is_key_not_found());
}

#[tokio::test]
async fn test_upsert_with_flags_round_trip() {
    let (_node, cluster) = connect_single_node().await;
    let collection = cluster.bucket("app").await.unwrap().default_collection();

    collection
        .upsert_with_flags("doc", b"payload", 0x2000_0000, 120)
        .await
        .unwrap();

    let doc = collection.get("doc").await.unwrap();
    assert_eq!(doc.flags(), 0x2000_0000);
    assert_eq!(doc.value(), b"payload");
}

#[tokio::test]
async fn test_named_scope_and_collection() {
    let (_node, cluster) = connect_single_node().await;
    let bucket = cluster.bucket("app").await.unwrap();
    let collection = bucket
        .scope("inventory")
        .unwrap()
        .collection("hotels")
        .unwrap();

    assert_eq!(collection.bucket_name(), "app");
    assert_eq!(collection.scope_name(), "inventory");
    assert_eq!(collection.name(), "hotels");

    collection.upsert("hotel::9", b"{}").await.unwrap();
    assert!(collection.exists("hotel::9").await.unwrap());
}

#[tokio::test]
async fn test_query_returns_rows() {
    let (_node, cluster) = connect_single_node().await;

    let result = cluster.query("SELECT * FROM app").await.unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.rows()[0], b"echo:SELECT * FROM app".to_vec());
}

#[tokio::test]
async fn test_large_value_round_trip() {
    let (_node, cluster) = connect_single_node().await;
    let collection = cluster.bucket("app").await.unwrap().default_collection();

    // Larger than the builder retention cap; the operation must still work,
    // the oversized builder is simply not retained afterwards
    let payload = vec![0xabu8; 2 * 1024 * 1024];
    collection.upsert("big", &payload).await.unwrap();

    let doc = collection.get("big").await.unwrap();
    assert_eq!(doc.value().len(), payload.len());
    assert_eq!(doc.value(), &payload[..]);
}

#[tokio::test]
async fn test_unreachable_node_fails_with_connectivity_error() {
    // Point at a port nobody listens on; connect succeeds (prewarm logs the
    // failures) but operations report connectivity errors
    let config = create_test_config(&[1], 1, 2);
    let cluster = Cluster::connect(config).await.unwrap();
    let collection = cluster.bucket("app").await.unwrap().default_collection();

    let err = collection.get("doc").await.unwrap_err();
    assert!(
        err.is_connectivity() || matches!(err, KvError::Timeout { .. }),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn test_operations_spread_across_nodes() {
    let node_a = spawn_mock_node().await;
    let node_b = spawn_mock_node().await;
    wait_for_server(&node_a.addr(), 20).await.unwrap();
    wait_for_server(&node_b.addr(), 20).await.unwrap();

    let config = create_test_config(&[node_a.port, node_b.port], 1, 3);
    let cluster = Cluster::connect(config).await.unwrap();
    let collection = cluster.bucket("app").await.unwrap().default_collection();

    for i in 0..50 {
        let key = format!("doc::{}", i);
        collection.upsert(&key, b"x").await.unwrap();
    }

    // Every key must read back regardless of which node owns it
    for i in 0..50 {
        let key = format!("doc::{}", i);
        assert!(collection.exists(&key).await.unwrap(), "lost {key}");
    }

    let snapshot = cluster.metrics();
    assert!(snapshot.total_operations >= 100);
}

#[tokio::test]
async fn test_metrics_track_operations() {
    let (_node, cluster) = connect_single_node().await;
    let collection = cluster.bucket("app").await.unwrap().default_collection();

    collection.upsert("doc", b"payload").await.unwrap();
    collection.get("doc").await.unwrap();
    let _ = collection.get("missing").await;

    let snapshot = cluster.metrics();
    assert_eq!(snapshot.total_operations, 2);
    assert!(snapshot.total_bytes() > 0);
    assert!(
        snapshot
            .collection_ops
            .iter()
            .any(|(path, count)| path == "app._default._default" && *count == 2)
    );
}
