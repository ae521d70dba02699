use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
/// Every knob has a default, so a bare environment boots a working core.
#[derive(Debug, Clone)]
pub struct Config {
    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Source feeds
    pub seismic_url: String,
    pub hydrology_url: String,
    pub gdacs_url: String,

    // Poll cadence (seconds). Clamped to `poll_floor` at registration to
    // respect third-party rate limits.
    pub seismic_poll: Duration,
    pub hydrology_poll: Duration,
    pub gdacs_poll: Duration,
    pub poll_floor: Duration,

    // Severity thresholds
    pub quake_min_magnitude: f64,
    /// Default station watermark; individual stations may override.
    pub flood_watermark_default: f64,

    // Fetch timeout applied to every outbound source request.
    pub fetch_timeout: Duration,

    // Push notification gateway (optional; noop when unset)
    pub push_gateway_url: Option<String>,
    pub push_gateway_key: Option<String>,

    // Hub liveness
    pub hub_ping_interval: Duration,
    pub hub_pong_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            web_host: env_or("WEB_HOST", "0.0.0.0"),
            web_port: parse_env("WEB_PORT", 3000),
            seismic_url: env_or("SEISMIC_URL", "https://seismonepal.gov.np/"),
            hydrology_url: env_or("HYDROLOGY_URL", "http://www.dhm.gov.np/"),
            gdacs_url: env_or("GDACS_URL", "https://www.gdacs.org/xml/rss.xml"),
            seismic_poll: Duration::from_secs(parse_env("SEISMIC_POLL_SECS", 600)),
            hydrology_poll: Duration::from_secs(parse_env("HYDROLOGY_POLL_SECS", 600)),
            gdacs_poll: Duration::from_secs(parse_env("GDACS_POLL_SECS", 300)),
            poll_floor: Duration::from_secs(parse_env("POLL_FLOOR_SECS", 300)),
            quake_min_magnitude: parse_env("QUAKE_MIN_MAGNITUDE", 4.0),
            flood_watermark_default: parse_env("FLOOD_WATERMARK_DEFAULT", 3.0),
            fetch_timeout: Duration::from_secs(parse_env("FETCH_TIMEOUT_SECS", 10)),
            push_gateway_url: env::var("PUSH_GATEWAY_URL").ok(),
            push_gateway_key: env::var("PUSH_GATEWAY_KEY").ok(),
            hub_ping_interval: Duration::from_secs(parse_env("HUB_PING_INTERVAL_SECS", 30)),
            hub_pong_timeout: Duration::from_secs(parse_env("HUB_PONG_TIMEOUT_SECS", 90)),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
