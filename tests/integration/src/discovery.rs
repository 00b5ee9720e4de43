//! End-to-end discovery flows through the public client API.

use std::sync::Arc;

use rally_client::ScriptedProber;

use crate::helpers::{ids, run_ticks, sorted, status, synced, test_client, RecordingListener};

#[tokio::test(start_paused = true)]
async fn single_seed_unfolds_into_whole_cluster() {
    let prober = Arc::new(ScriptedProber::new());
    let listener = Arc::new(RecordingListener::default());
    for node in ["a:3306", "b:3306", "c:3306"] {
        prober.set(node, synced(&["a:3306", "b:3306", "c:3306"]));
    }

    let client = test_client("a:3306", &prober, &listener)
        .build()
        .await
        .unwrap();

    assert_eq!(
        sorted(client.active_nodes()),
        ids(&["a:3306", "b:3306", "c:3306"])
    );
    assert!(client.downed_nodes().is_empty());
    assert_eq!(
        listener
            .events()
            .iter()
            .filter(|e| e.starts_with("activate"))
            .count(),
        3
    );
    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn node_failure_then_recovery_over_background_ticks() {
    let prober = Arc::new(ScriptedProber::new());
    let listener = Arc::new(RecordingListener::default());
    for node in ["a:3306", "b:3306"] {
        prober.set(node, synced(&["a:3306", "b:3306"]));
    }

    let client = test_client("a:3306", &prober, &listener)
        .build()
        .await
        .unwrap();

    prober.fail("b:3306");
    run_ticks(2).await;
    assert_eq!(client.active_nodes(), ids(&["a:3306"]));
    assert_eq!(client.downed_nodes(), ids(&["b:3306"]));

    prober.set("b:3306", synced(&["a:3306", "b:3306"]));
    run_ticks(2).await;
    assert_eq!(
        sorted(client.active_nodes()),
        ids(&["a:3306", "b:3306"])
    );
    assert!(client.downed_nodes().is_empty());

    let events = listener.events();
    assert!(events
        .iter()
        .any(|e| e.starts_with("down b:3306: failure in connection.")));
    assert_eq!(
        events.iter().filter(|e| *e == "activate b:3306").count(),
        2
    );
    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn ignored_donor_sits_out_until_synced_again() {
    let prober = Arc::new(ScriptedProber::new());
    let listener = Arc::new(RecordingListener::default());
    for node in ["a:3306", "b:3306"] {
        prober.set(node, synced(&["a:3306", "b:3306"]));
    }

    let client = test_client("a:3306", &prober, &listener)
        .ignore_donor(true)
        .build()
        .await
        .unwrap();

    // b starts serving a state transfer
    prober.set("b:3306", status("Primary", 2, &["a:3306", "b:3306"]));
    run_ticks(3).await;
    assert_eq!(client.active_nodes(), ids(&["a:3306"]));
    assert_eq!(client.downed_nodes(), ids(&["b:3306"]));

    // transfer finished
    prober.set("b:3306", synced(&["a:3306", "b:3306"]));
    run_ticks(2).await;
    assert_eq!(
        sorted(client.active_nodes()),
        ids(&["a:3306", "b:3306"])
    );
    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn donor_keeps_serving_when_ignore_donor_disabled() {
    let prober = Arc::new(ScriptedProber::new());
    let listener = Arc::new(RecordingListener::default());
    prober.set("a:3306", status("Primary", 2, &["a:3306"]));

    let client = test_client("a:3306", &prober, &listener)
        .ignore_donor(false)
        .build()
        .await
        .unwrap();

    assert_eq!(client.active_nodes(), ids(&["a:3306"]));
    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn vanished_member_is_removed_and_new_member_registered() {
    let prober = Arc::new(ScriptedProber::new());
    let listener = Arc::new(RecordingListener::default());
    for node in ["a:3306", "b:3306"] {
        prober.set(node, synced(&["a:3306", "b:3306"]));
    }

    let client = test_client("a:3306", &prober, &listener)
        .build()
        .await
        .unwrap();

    // b leaves the cluster (its own report drops it) while c joins
    prober.set("a:3306", synced(&["a:3306", "c:3306"]));
    prober.set("b:3306", synced(&["a:3306", "c:3306"]));
    prober.set("c:3306", synced(&["a:3306", "c:3306"]));
    run_ticks(2).await;

    assert_eq!(
        sorted(client.active_nodes()),
        ids(&["a:3306", "c:3306"])
    );
    assert!(client.downed_nodes().is_empty());
    assert!(listener.events().contains(&"remove b:3306".to_string()));
    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn shutdown_freezes_the_cluster_view() {
    let prober = Arc::new(ScriptedProber::new());
    let listener = Arc::new(RecordingListener::default());
    prober.set("a:3306", synced(&["a:3306"]));

    let client = test_client("a:3306", &prober, &listener)
        .build()
        .await
        .unwrap();
    assert_eq!(client.active_nodes(), ids(&["a:3306"]));

    client.shutdown();
    run_ticks(1).await;

    // scheduler is gone; a failing probe can no longer change the view
    prober.fail("a:3306");
    run_ticks(3).await;
    assert_eq!(client.active_nodes(), ids(&["a:3306"]));
}
