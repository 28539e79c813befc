use anyhow::{Context, Result};
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::utils::CircuitBreakerConfig;

// ============================================================================
// Settings - read once at startup from the environment
// ============================================================================
//
// Every variable has a default so a bare `cargo run` works against local
// ScyllaDB / Redpanda / user-service containers. A value that is set but
// cannot be parsed stops startup with the variable name in the error.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub http_addr: SocketAddr,
    pub metrics_port: u16,
    pub scylla_nodes: Vec<String>,
    pub scylla_keyspace: String,
    pub user_service_base_url: String,
    pub user_service_timeout: Duration,
    pub kafka_brokers: String,
    pub payment_topic: String,
    pub payment_group_id: String,
    pub user_circuit_breaker: CircuitBreakerConfig,
}

impl Settings {
    /// Load `.env` if present, then read the process environment
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let env = Env { lookup };

        let user_circuit_breaker = CircuitBreakerConfig {
            window_size: env.parse("USER_CB_WINDOW_SIZE", 10)?,
            minimum_calls: env.parse("USER_CB_MIN_CALLS", 5)?,
            failure_rate_threshold: env.parse("USER_CB_FAILURE_RATE", 50.0)?,
            open_timeout: Duration::from_secs(env.parse("USER_CB_OPEN_SECS", 30)?),
            half_open_successes: env.parse("USER_CB_HALF_OPEN_SUCCESSES", 3)?,
        };

        Ok(Self {
            http_addr: env.parse("ORDER_HTTP_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            metrics_port: env.parse("ORDER_METRICS_PORT", 9090)?,
            scylla_nodes: env
                .string("SCYLLA_NODES", "127.0.0.1:9042")
                .split(',')
                .map(str::trim)
                .filter(|node| !node.is_empty())
                .map(String::from)
                .collect(),
            scylla_keyspace: env.string("SCYLLA_KEYSPACE", "orders_ks"),
            user_service_base_url: env.string("USER_SERVICE_BASE_URL", "http://localhost:8081/users"),
            user_service_timeout: Duration::from_millis(env.parse("USER_SERVICE_TIMEOUT_MS", 2000)?),
            kafka_brokers: env.string("KAFKA_BROKERS", "127.0.0.1:9092"),
            payment_topic: env.string("PAYMENT_TOPIC", "create-payment"),
            payment_group_id: env.string("PAYMENT_GROUP_ID", "order-service-group"),
            user_circuit_breaker,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Set and non-blank, trimmed
    fn get(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("{e}"))
                .with_context(|| format!("Invalid value for {name}: {raw:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[]).unwrap();

        assert_eq!(settings.http_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(settings.metrics_port, 9090);
        assert_eq!(settings.scylla_nodes, vec!["127.0.0.1:9042".to_string()]);
        assert_eq!(settings.scylla_keyspace, "orders_ks");
        assert_eq!(settings.user_service_timeout, Duration::from_millis(2000));
        assert_eq!(settings.payment_topic, "create-payment");
        assert_eq!(settings.payment_group_id, "order-service-group");
        assert_eq!(settings.user_circuit_breaker, CircuitBreakerConfig::default());
    }

    #[test]
    fn test_overrides() {
        let settings = settings(&[
            ("SCYLLA_NODES", "10.0.0.1:9042, 10.0.0.2:9042,"),
            ("USER_CB_OPEN_SECS", "5"),
            ("USER_CB_FAILURE_RATE", "25.5"),
            ("PAYMENT_TOPIC", "payments"),
        ])
        .unwrap();

        assert_eq!(settings.scylla_nodes, vec!["10.0.0.1:9042", "10.0.0.2:9042"]);
        assert_eq!(settings.user_circuit_breaker.open_timeout, Duration::from_secs(5));
        assert_eq!(settings.user_circuit_breaker.failure_rate_threshold, 25.5);
        assert_eq!(settings.payment_topic, "payments");
    }

    #[test]
    fn test_blank_value_falls_back_to_default() {
        let settings = settings(&[("ORDER_METRICS_PORT", "  ")]).unwrap();
        assert_eq!(settings.metrics_port, 9090);
    }

    #[test]
    fn test_unparsable_value_names_the_variable() {
        let err = settings(&[("USER_SERVICE_TIMEOUT_MS", "soon")]).unwrap_err();
        assert!(format!("{err:#}").contains("USER_SERVICE_TIMEOUT_MS"));
    }
}
