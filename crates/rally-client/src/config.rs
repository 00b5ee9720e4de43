//! Client configuration: settings structs and the builder.
//!
//! The builder collects every operator-facing knob, validates it once,
//! and splits it into the setting groups the rest of the crate consumes:
//! database/URL settings, per-node pool sizing, discovery cadence, and
//! the client-level election settings.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use log::LevelFilter;
use rally_status::{ConsistencyLevel, NodeId};
use sqlx::mysql::MySqlConnectOptions;
use sqlx::ConnectOptions;

use crate::error::ClientError;
use crate::listener::{ClusterListener, LoggingListener};
use crate::policy::{ElectionPolicy, RoundRobin};
use crate::probe::StatusProber;

/// Probe pool sizing, fixed so status traffic cannot starve the
/// application pool.
pub(crate) const INTERNAL_POOL_MAX: u32 = 8;
pub(crate) const INTERNAL_POOL_MIN_IDLE: u32 = 4;

/// Transaction isolation level applied to every pooled connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// The value for the `transaction_isolation` system variable.
    pub fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ-UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ-COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE-READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// How to reach a node: credentials plus the URL shape knobs.
///
/// A node URL is `<prefix><host:port><separator><database>`, MySQL-style
/// by default. The knobs exist for MariaDB-flavored schemes.
#[derive(Debug, Clone)]
pub struct DbSettings {
    pub database: Option<String>,
    pub user: String,
    pub password: Option<String>,
    pub url_prefix: String,
    pub url_separator: String,
    /// Level every executed statement is logged at. Off when unset.
    pub log_statements: Option<LevelFilter>,
    /// Level and latency threshold for slow-statement logging.
    pub log_slow_statements: Option<(LevelFilter, Duration)>,
}

impl DbSettings {
    /// Builds the sqlx connect options for one node.
    pub(crate) fn connect_options(&self, node: &NodeId) -> Result<MySqlConnectOptions, ClientError> {
        let mut url = format!("{}{}", self.url_prefix, node);
        if let Some(db) = &self.database {
            url.push_str(&self.url_separator);
            url.push_str(db);
        }

        let mut options = MySqlConnectOptions::from_str(&url).map_err(|e| {
            ClientError::Configuration(format!("cannot parse node url '{url}': {e}"))
        })?;
        options = options.username(&self.user);
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        if let Some(level) = self.log_statements {
            options = options.log_statements(level);
        }
        if let Some((level, threshold)) = self.log_slow_statements {
            options = options.log_slow_statements(level, threshold);
        }
        Ok(options)
    }
}

/// Per-node pool sizing, timeouts, and session defaults.
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections_per_host: u32,
    pub min_connections_idle_per_host: u32,
    /// TCP-level connect budget, bounds the dial portion of a probe.
    pub connect_timeout: Duration,
    /// Pool borrow budget for `get_connection`.
    pub connection_timeout: Duration,
    /// Per-statement read budget, bounds the query portion of a probe.
    pub read_timeout: Duration,
    /// Idle eviction threshold.
    pub idle_timeout: Duration,
    pub autocommit: bool,
    pub read_only: bool,
    pub isolation_level: IsolationLevel,
}

impl PoolSettings {
    /// Session statements run on every fresh connection.
    pub(crate) fn session_setup_sql(&self) -> Vec<String> {
        vec![
            format!("SET SESSION autocommit = {}", u8::from(self.autocommit)),
            format!(
                "SET SESSION transaction_isolation = '{}'",
                self.isolation_level.as_sql()
            ),
            format!(
                "SET SESSION transaction_read_only = {}",
                u8::from(self.read_only)
            ),
        ]
    }

    /// Derives the sizing for a node's internal probe pool: small,
    /// read-only, no autocommit, same timeouts.
    pub(crate) fn internal(&self) -> PoolSettings {
        PoolSettings {
            max_connections_per_host: INTERNAL_POOL_MAX,
            min_connections_idle_per_host: INTERNAL_POOL_MIN_IDLE,
            autocommit: false,
            read_only: true,
            ..self.clone()
        }
    }
}

/// Discovery loop cadence and the donor policy toggle.
#[derive(Debug, Clone, Copy)]
pub struct DiscoverSettings {
    /// Interval between discovery ticks.
    pub discover_period: Duration,
    /// When true, donor nodes are neither down-listed for being
    /// un-synced nor promoted to active; they sit out until they leave
    /// donor state.
    pub ignore_donor: bool,
}

/// Client-level settings: seeds, election budget, collaborators.
#[derive(Clone)]
pub struct ClientSettings {
    pub seeds: Vec<NodeId>,
    pub retries_to_get_connection: u32,
    pub default_consistency: Option<ConsistencyLevel>,
    pub listener: Arc<dyn ClusterListener>,
    pub default_policy: Arc<dyn ElectionPolicy>,
    /// Explicit prober override; wins over `test_mode`.
    pub prober: Option<Arc<dyn StatusProber>>,
    /// Suppresses the scheduler and substitutes a synthetic OK prober.
    pub test_mode: bool,
}

impl std::fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSettings")
            .field("seeds", &self.seeds)
            .field("retries_to_get_connection", &self.retries_to_get_connection)
            .field("default_consistency", &self.default_consistency)
            .field("default_policy", &self.default_policy.name())
            .field("test_mode", &self.test_mode)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ClusterClient`].
///
/// [`ClusterClient`]: crate::ClusterClient
///
/// ```rust,ignore
/// let client = ClusterClient::builder()
///     .seeds("db1:3306,db2:3306")
///     .database("orders")
///     .user("app")
///     .password("secret")
///     .discover_period(Duration::from_secs(2))
///     .build()
///     .await?;
/// ```
#[derive(Clone)]
pub struct ClusterClientBuilder {
    seeds: Vec<NodeId>,
    database: Option<String>,
    user: Option<String>,
    password: Option<String>,
    url_prefix: String,
    url_separator: String,
    max_connections_per_host: u32,
    min_connections_idle_per_host: u32,
    connect_timeout: Duration,
    connection_timeout: Duration,
    read_timeout: Duration,
    idle_timeout: Duration,
    discover_period: Duration,
    ignore_donor: bool,
    retries_to_get_connection: u32,
    autocommit: bool,
    read_only: bool,
    isolation_level: IsolationLevel,
    consistency_level: Option<ConsistencyLevel>,
    listener: Option<Arc<dyn ClusterListener>>,
    node_selection_policy: Option<Arc<dyn ElectionPolicy>>,
    status_prober: Option<Arc<dyn StatusProber>>,
    log_statements: Option<LevelFilter>,
    log_slow_statements: Option<(LevelFilter, Duration)>,
    test_mode: bool,
}

impl Default for ClusterClientBuilder {
    fn default() -> Self {
        Self {
            seeds: Vec::new(),
            database: None,
            user: None,
            password: None,
            url_prefix: "mysql://".to_string(),
            url_separator: "/".to_string(),
            max_connections_per_host: 10,
            min_connections_idle_per_host: 2,
            connect_timeout: Duration::from_secs(5),
            connection_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(600),
            discover_period: Duration::from_secs(2),
            ignore_donor: true,
            retries_to_get_connection: 3,
            autocommit: true,
            read_only: false,
            isolation_level: IsolationLevel::default(),
            consistency_level: None,
            listener: None,
            node_selection_policy: None,
            status_prober: None,
            log_statements: None,
            log_slow_statements: None,
            test_mode: false,
        }
    }
}

impl ClusterClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Comma-separated list of seed nodes, e.g. `"db1:3306,db2:3306"`.
    pub fn seeds(mut self, seeds: impl AsRef<str>) -> Self {
        self.seeds = seeds
            .as_ref()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(NodeId::from)
            .collect();
        self
    }

    /// Adds a single seed node.
    pub fn seed(mut self, seed: impl Into<NodeId>) -> Self {
        self.seeds.push(seed.into());
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// URL scheme prefix, `mysql://` unless overridden.
    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }

    /// Separator between `host:port` and the database name.
    pub fn url_separator(mut self, separator: impl Into<String>) -> Self {
        self.url_separator = separator.into();
        self
    }

    pub fn max_connections_per_host(mut self, max: u32) -> Self {
        self.max_connections_per_host = max;
        self
    }

    pub fn min_connections_idle_per_host(mut self, min: u32) -> Self {
        self.min_connections_idle_per_host = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn discover_period(mut self, period: Duration) -> Self {
        self.discover_period = period;
        self
    }

    pub fn ignore_donor(mut self, ignore: bool) -> Self {
        self.ignore_donor = ignore;
        self
    }

    pub fn retries_to_get_connection(mut self, retries: u32) -> Self {
        self.retries_to_get_connection = retries;
        self
    }

    pub fn autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }

    /// Default consistency directive for every `get_connection` call.
    pub fn consistency_level(mut self, level: ConsistencyLevel) -> Self {
        self.consistency_level = Some(level);
        self
    }

    /// Observer for node lifecycle transitions. Logging-only when unset.
    pub fn listener(mut self, listener: Arc<dyn ClusterListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Default election policy. Round-robin when unset.
    pub fn node_selection_policy(mut self, policy: Arc<dyn ElectionPolicy>) -> Self {
        self.node_selection_policy = Some(policy);
        self
    }

    /// Injects a custom status prober, replacing the SQL prober. Takes
    /// precedence over `test_mode`'s synthetic prober.
    pub fn status_prober(mut self, prober: Arc<dyn StatusProber>) -> Self {
        self.status_prober = Some(prober);
        self
    }

    /// Logs every statement executed through the node pools at `level`.
    pub fn log_statements(mut self, level: LevelFilter) -> Self {
        self.log_statements = Some(level);
        self
    }

    /// Logs statements slower than `threshold` at `level` on every
    /// node pool.
    pub fn log_slow_statements(mut self, level: LevelFilter, threshold: Duration) -> Self {
        self.log_slow_statements = Some((level, threshold));
        self
    }

    /// Suppresses the discovery scheduler and substitutes a prober that
    /// reports every node as primary and synced. Unit-test seam.
    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    /// Validates the settings and splits them into the groups the
    /// client consumes.
    pub(crate) fn into_settings(
        self,
    ) -> Result<(ClientSettings, DiscoverSettings, DbSettings, PoolSettings), ClientError> {
        if self.seeds.is_empty() {
            return Err(ClientError::Configuration(
                "at least one seed node is required".to_string(),
            ));
        }
        if self.max_connections_per_host == 0 {
            return Err(ClientError::Configuration(
                "max_connections_per_host must be at least 1".to_string(),
            ));
        }
        if self.min_connections_idle_per_host > self.max_connections_per_host {
            return Err(ClientError::Configuration(format!(
                "min_connections_idle_per_host ({}) exceeds max_connections_per_host ({})",
                self.min_connections_idle_per_host, self.max_connections_per_host
            )));
        }
        if self.discover_period.is_zero() {
            return Err(ClientError::Configuration(
                "discover_period must be non-zero".to_string(),
            ));
        }
        if self.retries_to_get_connection == 0 {
            return Err(ClientError::Configuration(
                "retries_to_get_connection must be at least 1".to_string(),
            ));
        }
        let user = self.user.ok_or_else(|| {
            ClientError::Configuration("a database user is required".to_string())
        })?;

        let client = ClientSettings {
            seeds: self.seeds,
            retries_to_get_connection: self.retries_to_get_connection,
            default_consistency: self.consistency_level,
            listener: self
                .listener
                .unwrap_or_else(|| Arc::new(LoggingListener)),
            default_policy: self
                .node_selection_policy
                .unwrap_or_else(|| Arc::new(RoundRobin::new())),
            prober: self.status_prober,
            test_mode: self.test_mode,
        };
        let discover = DiscoverSettings {
            discover_period: self.discover_period,
            ignore_donor: self.ignore_donor,
        };
        let db = DbSettings {
            database: self.database,
            user,
            password: self.password,
            url_prefix: self.url_prefix,
            url_separator: self.url_separator,
            log_statements: self.log_statements,
            log_slow_statements: self.log_slow_statements,
        };
        let pool = PoolSettings {
            max_connections_per_host: self.max_connections_per_host,
            min_connections_idle_per_host: self.min_connections_idle_per_host,
            connect_timeout: self.connect_timeout,
            connection_timeout: self.connection_timeout,
            read_timeout: self.read_timeout,
            idle_timeout: self.idle_timeout,
            autocommit: self.autocommit,
            read_only: self.read_only,
            isolation_level: self.isolation_level,
        };

        Ok((client, discover, db, pool))
    }
}
