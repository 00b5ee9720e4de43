//! Metric recording helpers.
//!
//! Counters and gauges go through the `metrics` facade; the host
//! application installs whatever recorder it wants (prometheus or
//! otherwise). Nothing here panics when no recorder is installed.

use metrics::{counter, gauge};

pub(crate) fn record_activation() {
    counter!("rally_nodes_activated_total").increment(1);
}

pub(crate) fn record_down() {
    counter!("rally_nodes_downed_total").increment(1);
}

pub(crate) fn record_removal() {
    counter!("rally_nodes_removed_total").increment(1);
}

pub(crate) fn record_probe_failure() {
    counter!("rally_probe_failures_total").increment(1);
}

pub(crate) fn record_no_host_available() {
    counter!("rally_no_host_available_total").increment(1);
}

pub(crate) fn record_membership_levels(active: usize, downed: usize) {
    gauge!("rally_active_nodes").set(active as f64);
    gauge!("rally_downed_nodes").set(downed as f64);
}
