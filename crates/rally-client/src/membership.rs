//! Cluster membership state machine.
//!
//! The [`Membership`] manager owns the authoritative view of the
//! cluster: the map of every known node, the active list serving
//! traffic, and the downed list retried on each tick. The discovery
//! task is the sole writer of all three; the request path only ever
//! reads copy-on-write snapshots, so node election never takes a lock.
//!
//! # Discovery pass
//!
//! One tick runs in two phases. First every active node is re-probed
//! and demoted on failure; then every downed node is re-probed and
//! promoted when its replication state allows. Member ids first seen in
//! a peer's membership report are collected on a worklist and
//! registered before the tick ends, so a single seed unfolds into the
//! whole cluster within one pass.

use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use rally_status::NodeId;
use tracing::{debug, info, trace, warn};

use crate::config::{DbSettings, DiscoverSettings, PoolSettings};
use crate::error::ClientError;
use crate::listener::ClusterListener;
use crate::metrics;
use crate::node::NodeHandle;
use crate::probe::StatusProber;

/// Authoritative cluster view and the state transitions over it.
///
/// Between discovery iterations the collections satisfy:
/// every id in `active` or `downed` has a handle in `nodes`, the two
/// lists are disjoint, active handles dispense connections, and downed
/// handles are quiesced.
pub struct Membership {
    nodes: DashMap<NodeId, Arc<NodeHandle>>,
    active: ArcSwap<Vec<NodeId>>,
    downed: ArcSwap<Vec<NodeId>>,
    prober: Arc<dyn StatusProber>,
    listener: Arc<dyn ClusterListener>,
    db: DbSettings,
    pool_settings: PoolSettings,
    ignore_donor: bool,
}

impl Membership {
    pub fn new(
        db: DbSettings,
        pool_settings: PoolSettings,
        discover: DiscoverSettings,
        prober: Arc<dyn StatusProber>,
        listener: Arc<dyn ClusterListener>,
    ) -> Self {
        Self {
            nodes: DashMap::new(),
            active: ArcSwap::from_pointee(Vec::new()),
            downed: ArcSwap::from_pointee(Vec::new()),
            prober,
            listener,
            db,
            pool_settings,
            ignore_donor: discover.ignore_donor,
        }
    }

    /// Registers the operator-supplied seeds and runs the initial
    /// discovery over them, unfolding into any peers they report.
    pub async fn register_seeds(&self, seeds: &[NodeId]) {
        let mut found = Vec::new();
        for seed in seeds {
            if !self.is_known(seed) {
                self.register(seed, &mut found).await;
            }
        }
        self.drain_found(&mut found).await;
    }

    /// One discovery iteration: re-probe active nodes, retry downed
    /// nodes, then register anything new the probes surfaced.
    ///
    /// Never fails; every per-node error is absorbed into a `down`
    /// transition so a bad tick cannot kill the scheduler.
    pub async fn tick(&self) {
        debug!("discovering cluster");
        let mut found = Vec::new();

        for node in self.active.load_full().iter() {
            if let Err(e) = self.discover(node, &mut found).await {
                metrics::record_probe_failure();
                self.down(node, &format!("failure in connection. {e}"));
            }
        }

        for node in self.downed.load_full().iter() {
            match self.discover(node, &mut found).await {
                Ok(()) => self.reactivate_if_usable(node),
                Err(e) => {
                    metrics::record_probe_failure();
                    // re-probe of an already-downed node: bare error,
                    // no connection-failure prefix
                    self.down(node, &e.to_string());
                }
            }
        }

        self.drain_found(&mut found).await;

        let active = self.active.load_full();
        let downed = self.downed.load_full();
        metrics::record_membership_levels(active.len(), downed.len());
        debug!("active nodes: {active:?}, downed nodes: {downed:?}");
    }

    /// Frozen snapshot of the active list. Cheap: one atomic load.
    pub fn active_snapshot(&self) -> Arc<Vec<NodeId>> {
        self.active.load_full()
    }

    /// Frozen snapshot of the downed list.
    pub fn downed_snapshot(&self) -> Arc<Vec<NodeId>> {
        self.downed.load_full()
    }

    /// Looks up the handle for a node id, if it is still registered.
    pub fn handle(&self, node: &NodeId) -> Option<Arc<NodeHandle>> {
        self.nodes.get(node).map(|entry| Arc::clone(entry.value()))
    }

    /// All currently registered node ids, in no particular order.
    pub fn known_nodes(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn is_active(&self, node: &NodeId) -> bool {
        self.active.load().contains(node)
    }

    fn is_known(&self, node: &NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    /// Allocates a handle for `node` and runs an immediate discovery
    /// on it. A probe failure lands the node in the downed list.
    async fn register(&self, node: &NodeId, found: &mut Vec<NodeId>) {
        info!("registering cluster node {node}");
        let handle = match NodeHandle::connect(node.clone(), &self.db, &self.pool_settings) {
            Ok(handle) => Arc::new(handle),
            Err(e) => {
                // an id we cannot even build a URL for is unusable;
                // leave it unknown so a sane peer report can retry it
                warn!("cannot allocate a handle for {node}: {e}");
                return;
            }
        };
        self.nodes.insert(node.clone(), handle);

        if let Err(e) = self.discover(node, found).await {
            metrics::record_probe_failure();
            self.down(node, &format!("failure in connection. {e}"));
        }
    }

    /// Registers every id on the worklist, which may surface more ids;
    /// drains until the cluster view stops growing.
    async fn drain_found(&self, found: &mut Vec<NodeId>) {
        while let Some(member) = found.pop() {
            if !self.is_known(&member) {
                self.register(&member, found).await;
            }
        }
    }

    /// Probes one node and applies the classification rules.
    ///
    /// Returns `Err` only for probe transport failures; classification
    /// verdicts (non-primary, not ready) are committed internally as
    /// `down` transitions. New member ids from the node's report are
    /// pushed onto `found` for the caller to drain.
    async fn discover(&self, node: &NodeId, found: &mut Vec<NodeId>) -> Result<(), ClientError> {
        trace!("discovering {node}");
        let Some(handle) = self.handle(node) else {
            // removed earlier in this same tick
            return Ok(());
        };

        let status = handle.refresh_status(self.prober.as_ref()).await?;

        if !status.is_primary() {
            debug!("node {node} is outside the primary component");
            self.down(node, "non Primary");
            return Ok(());
        }

        if !status.is_synced() && (self.ignore_donor || !status.is_donor()) {
            // prefer the state name the server itself reported
            let state = status
                .state_comment()
                .map_or_else(|| status.state().to_string(), str::to_string);
            debug!("node {node} not ready: {state}");
            self.down(node, &format!("state not ready: {state}"));
            return Ok(());
        }

        for member in status.cluster_nodes() {
            if !self.is_known(member) && !found.contains(member) {
                info!("found new cluster node {member}");
                found.push(member.clone());
            }
        }

        if !status.knows(node) {
            self.remove(node).await;
        } else if !self.is_active(node) && !(status.is_donor() && self.ignore_donor) {
            info!("activating discovered node {node}");
            self.activate(node);
        }

        Ok(())
    }

    /// Downed-phase promotion: a node whose probe succeeded comes back
    /// when it is in the primary component and not an ignored donor.
    fn reactivate_if_usable(&self, node: &NodeId) {
        let Some(handle) = self.handle(node) else {
            return;
        };
        let Some(status) = handle.status() else {
            return;
        };
        if status.is_primary() && !(status.is_donor() && self.ignore_donor) {
            debug!("reactivating previously downed node {node}");
            self.activate(node);
        }
    }

    /// Moves `node` into the active list. No-op when already active.
    fn activate(&self, node: &NodeId) {
        let active = self.active.load_full();
        if active.contains(node) {
            return;
        }

        if let Some(handle) = self.handle(node) {
            handle.on_activate();
        }

        let mut next = active.as_ref().clone();
        next.push(node.clone());
        self.active.store(Arc::new(next));
        remove_from(&self.downed, node);

        metrics::record_activation();
        self.listener.on_activating_node(node);
    }

    /// Moves `node` into the downed list and quiesces its pool.
    /// No-op when the node is already down and not active.
    fn down(&self, node: &NodeId, cause: &str) {
        let active = self.active.load_full();
        let downed = self.downed.load_full();
        if downed.contains(node) && !active.contains(node) {
            return;
        }

        debug!("marking node {node} as down: {cause}");
        remove_from(&self.active, node);
        if !downed.contains(node) {
            let mut next = downed.as_ref().clone();
            next.push(node.clone());
            self.downed.store(Arc::new(next));
        }

        if let Some(handle) = self.handle(node) {
            handle.on_down();
        }

        metrics::record_down();
        self.listener.on_marking_node_as_down(node, cause);
    }

    /// Erases a vanished member: out of both lists, handle shut down,
    /// entry dropped from the node map.
    async fn remove(&self, node: &NodeId) {
        info!("removing vanished node {node}");
        remove_from(&self.active, node);
        remove_from(&self.downed, node);

        if let Some((_, handle)) = self.nodes.remove(node) {
            handle.shutdown().await;
        }

        metrics::record_removal();
        self.listener.on_removing_node(node);
    }
}

impl std::fmt::Debug for Membership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Membership")
            .field("known", &self.nodes.len())
            .field("active", &self.active.load_full())
            .field("downed", &self.downed.load_full())
            .finish_non_exhaustive()
    }
}

/// Copy-on-write removal from one of the membership lists.
fn remove_from(list: &ArcSwap<Vec<NodeId>>, node: &NodeId) {
    let current = list.load_full();
    if current.contains(node) {
        let next: Vec<NodeId> = current.iter().filter(|n| *n != node).cloned().collect();
        list.store(Arc::new(next));
    }
}
