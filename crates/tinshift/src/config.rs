//! Options controlling how mesh containers are located and opened.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable enabling network access (`ON`, `1`, `YES`, `TRUE`).
pub const NETWORK_ENV: &str = "TINSHIFT_NETWORK";
/// Environment variable holding the network timeout in seconds.
pub const NETWORK_TIMEOUT_ENV: &str = "TINSHIFT_NETWORK_TIMEOUT";

const DEFAULT_NETWORK_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`MeshStore::open`](crate::MeshStore::open).
///
/// Locations are resolved against the local filesystem first, then against
/// the registered in-memory resources, then over the network.
#[derive(Debug, Clone)]
pub struct OpenOptions {
    resources: HashMap<String, Arc<[u8]>>,
    network: bool,
    network_timeout: Duration,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            resources: HashMap::new(),
            network: false,
            network_timeout: DEFAULT_NETWORK_TIMEOUT,
        }
    }
}

impl OpenOptions {
    /// Default options: no resources, network disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Options initialised from [`NETWORK_ENV`] and [`NETWORK_TIMEOUT_ENV`].
    #[must_use]
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Ok(value) = std::env::var(NETWORK_ENV) {
            options.network = parse_switch(&value);
        }
        if let Some(secs) = std::env::var(NETWORK_TIMEOUT_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            options.network_timeout = Duration::from_secs(secs);
        }
        options
    }

    /// Register an in-memory container reachable under `name`.
    #[must_use]
    pub fn with_resource(mut self, name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        self.resources.insert(name.into(), bytes.into());
        self
    }

    /// Allow or forbid fetching `http://` and `https://` locations.
    #[must_use]
    pub fn with_network(mut self, enabled: bool) -> Self {
        self.network = enabled;
        self
    }

    /// Timeout applied to a whole network fetch.
    #[must_use]
    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = timeout;
        self
    }

    pub(crate) fn resource(&self, name: &str) -> Option<&Arc<[u8]>> {
        self.resources.get(name)
    }

    #[must_use]
    pub fn network_enabled(&self) -> bool {
        self.network
    }

    #[must_use]
    pub fn network_timeout(&self) -> Duration {
        self.network_timeout
    }
}

fn parse_switch(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_uppercase().as_str(),
        "ON" | "1" | "YES" | "TRUE"
    )
}
