use std::env;
use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_EVENT_CAPACITY: usize = 256;
const DEFAULT_DRAIN_TIMEOUT_SECS: usize = 300;

/// Runtime settings, read from `COAGENT_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub bind_addr: SocketAddr,
    /// Buffered events per subscriber before it starts lagging.
    pub event_capacity: usize,
    /// Ceiling on how long the drain loop waits for one turn to finish.
    pub drain_timeout: Duration,
    /// Stop draining after the first turn that ends in an engine error.
    pub drain_stop_on_error: bool,
    /// Start draining automatically when a turn ends with work queued.
    pub auto_drain: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            drain_timeout: Duration::from_secs(DEFAULT_DRAIN_TIMEOUT_SECS as u64),
            drain_stop_on_error: false,
            auto_drain: true,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind_addr = lookup("COAGENT_BIND_ADDR")
            .and_then(|value| match value.parse::<SocketAddr>() {
                Ok(addr) => Some(addr),
                Err(error) => {
                    tracing::warn!("ignoring COAGENT_BIND_ADDR={value}: {error}");
                    None
                }
            })
            .unwrap_or_else(default_bind_addr);

        Self {
            bind_addr,
            event_capacity: read_limit(&lookup, "COAGENT_EVENT_CAPACITY", DEFAULT_EVENT_CAPACITY),
            drain_timeout: Duration::from_secs(read_limit(
                &lookup,
                "COAGENT_DRAIN_TIMEOUT_SECS",
                DEFAULT_DRAIN_TIMEOUT_SECS,
            ) as u64),
            drain_stop_on_error: read_flag(&lookup, "COAGENT_DRAIN_STOP_ON_ERROR", false),
            auto_drain: read_flag(&lookup, "COAGENT_AUTO_DRAIN", true),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9847))
}

fn read_limit(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: usize) -> usize {
    lookup(name)
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn read_flag(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: bool) -> bool {
    match lookup(name).map(|value| value.trim().to_ascii_lowercase()) {
        Some(value) if matches!(value.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(value) if matches!(value.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
