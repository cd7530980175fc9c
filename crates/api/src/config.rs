//! Application configuration loaded from environment variables.

use std::time::Duration;

use dispatch::{RelayConfig, TickSchedule};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string (default: unset, in-memory store)
/// - `ASSIGN_INTERVAL_MS`, `MOVE_INTERVAL_MS`, `RELAY_INTERVAL_MS`: tick
///   intervals (defaults: `1000`, `2000`, `3000`)
/// - `RELAY_BATCH_SIZE`: outbox rows per relay tick (default: `20`)
/// - `ORDER_STATUS_TOPIC`: topic for order status changes
///   (default: `"order.status.changed"`)
///
/// Unparseable numbers fall back to their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub schedule: TickSchedule,
    pub relay: RelayConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());
        let millis = |name: &str, default: Duration| {
            parsed(name)
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            schedule: TickSchedule {
                assign: millis("ASSIGN_INTERVAL_MS", defaults.schedule.assign),
                movement: millis("MOVE_INTERVAL_MS", defaults.schedule.movement),
                relay: millis("RELAY_INTERVAL_MS", defaults.schedule.relay),
            },
            relay: RelayConfig {
                batch_size: parsed("RELAY_BATCH_SIZE")
                    .filter(|n| *n > 0)
                    .and_then(|n| usize::try_from(n).ok())
                    .unwrap_or(defaults.relay.batch_size),
                topic: lookup("ORDER_STATUS_TOPIC")
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or(defaults.relay.topic),
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            schedule: TickSchedule::default(),
            relay: RelayConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert!(config.database_url.is_none());
        assert_eq!(config.schedule.assign, Duration::from_millis(1000));
        assert_eq!(config.schedule.movement, Duration::from_millis(2000));
        assert_eq!(config.schedule.relay, Duration::from_millis(3000));
        assert_eq!(config.relay.batch_size, 20);
        assert_eq!(config.relay.topic, "order.status.changed");
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = from_vars(&[]);
        assert_eq!(config.addr(), Config::default().addr());
        assert_eq!(config.schedule, TickSchedule::default());
        assert_eq!(config.relay, RelayConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = from_vars(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/delivery"),
            ("ASSIGN_INTERVAL_MS", "250"),
            ("MOVE_INTERVAL_MS", "500"),
            ("RELAY_INTERVAL_MS", "750"),
            ("RELAY_BATCH_SIZE", "5"),
            ("ORDER_STATUS_TOPIC", "orders"),
        ]);

        assert_eq!(config.addr(), "127.0.0.1:8080");
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/delivery")
        );
        assert_eq!(config.schedule.assign, Duration::from_millis(250));
        assert_eq!(config.schedule.movement, Duration::from_millis(500));
        assert_eq!(config.schedule.relay, Duration::from_millis(750));
        assert_eq!(config.relay.batch_size, 5);
        assert_eq!(config.relay.topic, "orders");
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = from_vars(&[
            ("PORT", "http"),
            ("ASSIGN_INTERVAL_MS", "soon"),
            ("MOVE_INTERVAL_MS", "0"),
            ("RELAY_BATCH_SIZE", "-3"),
            ("DATABASE_URL", "  "),
        ]);

        assert_eq!(config.port, 3000);
        assert_eq!(config.schedule, TickSchedule::default());
        assert_eq!(config.relay.batch_size, 20);
        assert!(config.database_url.is_none());
    }
}
