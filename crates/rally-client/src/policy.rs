//! Node election policies.
//!
//! A policy maps the current active-node snapshot to one chosen node.
//! Policies never touch membership state; they may keep internal cursor
//! state (the round-robin index) but must stay deterministic relative
//! to the snapshot they are given.

use std::sync::atomic::{AtomicUsize, Ordering};

use rally_status::NodeId;
use rand::prelude::IndexedRandom;

use crate::error::ClientError;

/// Strategy choosing one node id from the active snapshot.
///
/// An empty snapshot is an error, not a panic: the facade's retry loop
/// absorbs it and tries again against a fresh snapshot.
pub trait ElectionPolicy: Send + Sync {
    /// Short policy name for logs.
    fn name(&self) -> &'static str;

    /// Chooses a node from `active`.
    fn choose_node(&self, active: &[NodeId]) -> Result<NodeId, ClientError>;
}

/// Rotates through the active set. The default policy.
///
/// The cursor is a shared atomic, so concurrent callers spread across
/// nodes instead of piling onto one.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ElectionPolicy for RoundRobin {
    fn name(&self) -> &'static str {
        "round-robin"
    }

    fn choose_node(&self, active: &[NodeId]) -> Result<NodeId, ClientError> {
        if active.is_empty() {
            return Err(ClientError::EmptyActiveSet);
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % active.len();
        Ok(active[index].clone())
    }
}

/// Picks a uniformly random active node.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPolicy;

impl ElectionPolicy for RandomPolicy {
    fn name(&self) -> &'static str {
        "random"
    }

    fn choose_node(&self, active: &[NodeId]) -> Result<NodeId, ClientError> {
        let mut rng = rand::rng();
        active
            .choose(&mut rng)
            .cloned()
            .ok_or(ClientError::EmptyActiveSet)
    }
}
