//! Election and retry behavior through the public client API.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use rally_client::{ClientError, ElectionPolicy, ScriptedProber};
use rally_status::NodeId;

use crate::helpers::{ids, test_client, RecordingListener};

/// Policy that always reports an empty set, counting invocations.
#[derive(Default)]
struct NeverChooses {
    calls: AtomicU32,
}

impl ElectionPolicy for NeverChooses {
    fn name(&self) -> &'static str {
        "never-chooses"
    }

    fn choose_node(&self, _active: &[NodeId]) -> Result<NodeId, ClientError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Err(ClientError::EmptyActiveSet)
    }
}

#[tokio::test(start_paused = true)]
async fn empty_cluster_exhausts_election_budget() {
    let prober = Arc::new(ScriptedProber::new());
    let listener = Arc::new(RecordingListener::default());
    prober.fail("a:3306");

    let client = test_client("a:3306", &prober, &listener)
        .retries_to_get_connection(3)
        .build()
        .await
        .unwrap();
    assert!(client.active_nodes().is_empty());
    assert_eq!(client.downed_nodes(), ids(&["a:3306"]));

    match client.get_connection().await {
        Err(ClientError::NoHostAvailable { attempts }) => assert_eq!(attempts, 3),
        other => panic!("expected NoHostAvailable, got {other:?}"),
    }
    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn policy_override_replaces_default_for_one_call() {
    let prober = Arc::new(ScriptedProber::new());
    let listener = Arc::new(RecordingListener::default());
    prober.set("a:3306", crate::helpers::synced(&["a:3306"]));

    let client = test_client("a:3306", &prober, &listener)
        .retries_to_get_connection(2)
        .build()
        .await
        .unwrap();
    assert_eq!(client.active_nodes(), ids(&["a:3306"]));

    // the failing override is absorbed per attempt, then exhausts,
    // even though the default policy could have chosen a node
    let policy = NeverChooses::default();
    match client.get_connection_with(None, Some(&policy)).await {
        Err(ClientError::NoHostAvailable { attempts }) => assert_eq!(attempts, 2),
        other => panic!("expected NoHostAvailable, got {other:?}"),
    }
    assert_eq!(policy.calls.load(Ordering::Relaxed), 2);
    client.shutdown();
}

#[tokio::test(start_paused = true)]
async fn failing_default_policy_is_absorbed_until_exhaustion() {
    let prober = Arc::new(ScriptedProber::new());
    let listener = Arc::new(RecordingListener::default());
    prober.set("a:3306", crate::helpers::synced(&["a:3306"]));

    let policy = Arc::new(NeverChooses::default());
    let client = test_client("a:3306", &prober, &listener)
        .retries_to_get_connection(4)
        .node_selection_policy(Arc::clone(&policy) as _)
        .build()
        .await
        .unwrap();

    match client.get_connection().await {
        Err(ClientError::NoHostAvailable { attempts }) => assert_eq!(attempts, 4),
        other => panic!("expected NoHostAvailable, got {other:?}"),
    }
    assert_eq!(policy.calls.load(Ordering::Relaxed), 4);
    client.shutdown();
}
