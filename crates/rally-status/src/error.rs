//! Error types for status parsing.

use thiserror::Error;

/// Errors that can occur when building a [`ClusterStatus`] from the
/// raw wsrep status variables reported by a node.
///
/// [`ClusterStatus`]: crate::ClusterStatus
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StatusError {
    /// A required wsrep status variable was absent from the result set.
    /// Usually means the server is not running the Galera provider at all.
    #[error("missing status variable '{0}'")]
    MissingVariable(&'static str),

    /// `wsrep_local_state` held something that is not an integer.
    #[error("unparseable wsrep_local_state value '{0}'")]
    InvalidLocalState(String),
}
