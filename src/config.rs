//! Gateway configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::time::Duration;

/// Rooms served when `CHAT_ROOMS` is not set.
pub const DEFAULT_ROOMS: &[&str] = &["sports", "travel"];

/// Top-level gateway configuration.
///
/// Loaded once at startup via [`GatewayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8086`).
    pub listen_addr: SocketAddr,

    /// Names of the rooms provisioned at startup.
    pub rooms: Vec<String>,

    /// Capacity of each session's outbound queue. A session whose queue is
    /// full when a broadcast arrives is treated as unreachable.
    pub outbound_queue_capacity: usize,

    /// Upper bound on a single WebSocket frame write.
    pub ws_write_timeout: Duration,
}

impl GatewayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:8086".to_string())
            .parse()?;

        let rooms = std::env::var("CHAT_ROOMS")
            .ok()
            .map(|raw| parse_rooms(&raw))
            .filter(|rooms| !rooms.is_empty())
            .unwrap_or_else(default_rooms);

        let outbound_queue_capacity = parse_env("OUTBOUND_QUEUE_CAPACITY", 256usize).max(1);
        let ws_write_timeout = Duration::from_millis(parse_env("WS_WRITE_TIMEOUT_MS", 5_000));

        Ok(Self {
            listen_addr,
            rooms,
            outbound_queue_capacity,
            ws_write_timeout,
        })
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8086)),
            rooms: default_rooms(),
            outbound_queue_capacity: 256,
            ws_write_timeout: Duration::from_secs(5),
        }
    }
}

fn default_rooms() -> Vec<String> {
    DEFAULT_ROOMS.iter().map(|s| (*s).to_string()).collect()
}

/// Splits a comma-separated room list, dropping blanks.
fn parse_rooms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
