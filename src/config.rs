use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

pub const CONFIG_PATH: &str = "config.toml";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub endpoints: EndpointConfig,
    pub http: HttpConfig,
    pub gps: GpsConfig,
    pub ui: UiConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EndpointConfig {
    pub geolocation_url: String, // ipapi.co compatible JSON
    pub ipv4_echo_url: String,   // Must only be reachable over IPv4
    pub ipv6_echo_url: String,   // Must only be reachable over IPv6
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: Option<u64>, // None keeps the client default
    pub user_agent: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GpsSource {
    Gpsd,
    Fixed,
    None,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GpsConfig {
    pub source: GpsSource,
    pub gpsd_addr: String,
    pub timeout_ms: u64,
    pub high_accuracy: bool,
    pub fixed_lat: f64,      // Only used with source = "fixed"
    pub fixed_lon: f64,      // Only used with source = "fixed"
    pub fixed_accuracy: f64, // Metres
    pub allow: bool,         // Consent for the fixed source
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub default_view: String, // "Dashboard" or "Map"
    pub tick_rate_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            geolocation_url: "https://ipapi.co/json/".to_string(),
            ipv4_echo_url: "https://api.ipify.org?format=json".to_string(),
            ipv6_echo_url: "https://api6.ipify.org?format=json".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: None,
            user_agent: concat!("ipscope/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            source: GpsSource::Gpsd,
            gpsd_addr: "127.0.0.1:2947".to_string(),
            timeout_ms: 10_000,
            high_accuracy: true,
            fixed_lat: 37.7749,
            fixed_lon: -122.4194,
            fixed_accuracy: 25.0,
            allow: false,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            default_view: "Dashboard".to_string(),
            tick_rate_ms: 150,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

impl GpsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    /// Loads config.toml from the working directory.
    pub fn load() -> Self {
        Self::load_from(CONFIG_PATH)
    }

    /// Loads the config at `path`.
    /// If it doesn't exist, writes the defaults there. A file that fails to
    /// parse is left alone and the defaults are used for this run.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    return config;
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    return Config::default();
                }
            },
            Err(e) => info!("No config at {} ({}), writing defaults.", path.display(), e),
        }

        let default_config = Config::default();

        // Save default config to disk for the user to edit later
        match toml::to_string_pretty(&default_config) {
            Ok(toml_string) => {
                if fs::write(path, toml_string).is_err() {
                    warn!("Could not write default {} to disk.", path.display());
                }
            }
            Err(e) => warn!("Could not serialize default config: {}", e),
        }

        default_config
    }
}
