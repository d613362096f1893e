//! Environment-driven service configuration.

use std::time::Duration;
use tracing::warn;

const DEFAULT_FRONTEND_PORT: u16 = 8080;
const DEFAULT_BACKEND_PORT: u16 = 8081;
const DEFAULT_LOADGEN_INTERVAL_MS: u64 = 1000;

/// Ports and timing for the demo chain.
///
/// Read from `FRONTEND_PORT`, `BACKEND_PORT` and `LOADGEN_INTERVAL_MS`;
/// unset or unparsable variables fall back to the defaults.
#[derive(Clone, Debug)]
pub struct Config {
    /// Port the frontend listens on.
    pub frontend_port: u16,
    /// Port the backend listens on.
    pub backend_port: u16,
    /// Delay between load generator requests.
    pub loadgen_interval: Duration,
}

impl Config {
    /// Read the configuration from the environment.
    pub fn from_env() -> Self {
        Config {
            frontend_port: env_parsed("FRONTEND_PORT", DEFAULT_FRONTEND_PORT),
            backend_port: env_parsed("BACKEND_PORT", DEFAULT_BACKEND_PORT),
            loadgen_interval: Duration::from_millis(env_parsed(
                "LOADGEN_INTERVAL_MS",
                DEFAULT_LOADGEN_INTERVAL_MS,
            )),
        }
    }

    /// URL of the frontend endpoint.
    pub fn frontend_url(&self) -> String {
        format!("http://127.0.0.1:{}/frontend", self.frontend_port)
    }

    /// URL of the backend endpoint.
    pub fn backend_url(&self) -> String {
        format!("http://127.0.0.1:{}/backend", self.backend_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            frontend_port: DEFAULT_FRONTEND_PORT,
            backend_port: DEFAULT_BACKEND_PORT,
            loadgen_interval: Duration::from_millis(DEFAULT_LOADGEN_INTERVAL_MS),
        }
    }
}

fn env_parsed<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, "unparsable value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_environment() {
        let config = Config::default();
        assert_eq!(config.frontend_port, 8080);
        assert_eq!(config.backend_port, 8081);
        assert_eq!(config.loadgen_interval, Duration::from_millis(1000));
        assert_eq!(config.backend_url(), "http://127.0.0.1:8081/backend");
    }
}
