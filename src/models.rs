//! Records produced by the location acquisition paths.
//!
//! [`IpInfo`] comes out of the IP lookup (and the dual-stack pass layered on
//! top of it), [`GpsLocation`] out of a single position request, and
//! [`LocationPermission`] tracks the consent state that gates the latter.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Location estimated from the host's public IP address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpInfo {
    /// Primary address exactly as the provider reported it.
    pub ip: String,
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
    pub city: String,
    pub region: String,
    pub country: String,
    pub country_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timezone: String,
    pub isp: String,
    /// Empty when the provider has no postal code for the address.
    pub postal_code: String,
    pub continent_code: String,
}

/// Raw body of the geolocation provider (ipapi.co shape).
///
/// Every string is defaulted so a sparse answer for an unusual address still
/// yields a record; `error`/`reason` are set instead of the location when the
/// provider refuses the request (rate limit, reserved range) with a 200.
#[derive(Debug, Default, Deserialize)]
pub struct ProviderResponse {
    #[serde(default)]
    pub ip: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub city: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub region: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub country_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub country_code: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub continent_code: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub timezone: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub org: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub postal: String,
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// Dual-stack fields are filled in later by the resolver.
impl From<ProviderResponse> for IpInfo {
    fn from(raw: ProviderResponse) -> Self {
        Self {
            ip: raw.ip,
            ipv4: None,
            ipv6: None,
            city: raw.city,
            region: raw.region,
            country: raw.country_name,
            country_code: raw.country_code,
            latitude: raw.latitude,
            longitude: raw.longitude,
            timezone: raw.timezone,
            isp: raw.org,
            postal_code: raw.postal,
            continent_code: raw.continent_code,
        }
    }
}

/// Body of the family-specific echo services.
#[derive(Debug, Deserialize)]
pub struct EchoResponse {
    pub ip: String,
}

/// IP address family of an address string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Classifies an address by shape.
    ///
    /// Anything that parses as an address takes the parsed family, so an
    /// IPv4-mapped IPv6 address counts as V6. Otherwise a colon means V6 and
    /// a dot means V4. Returns `None` for strings that look like neither.
    pub fn classify(addr: &str) -> Option<Self> {
        let addr = addr.trim();
        match addr.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => Some(AddressFamily::V4),
            Ok(IpAddr::V6(_)) => Some(AddressFamily::V6),
            Err(_) if addr.contains(':') => Some(AddressFamily::V6),
            Err(_) if addr.contains('.') => Some(AddressFamily::V4),
            Err(_) => None,
        }
    }

    pub fn other(self) -> Self {
        match self {
            AddressFamily::V4 => AddressFamily::V6,
            AddressFamily::V6 => AddressFamily::V4,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => write!(f, "IPv4"),
            AddressFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// A single fix from the position sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsLocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in metres, never negative.
    pub accuracy: f64,
    pub altitude: Option<f64>,
    pub altitude_accuracy: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    /// Capture time, milliseconds since the Unix epoch.
    pub timestamp: i64,
}

/// Consent state gating GPS acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationPermission {
    /// Initial or unknown; the user has not decided yet.
    #[default]
    Prompt,
    /// A position request is in flight.
    Checking,
    Granted,
    Denied,
}

impl fmt::Display for LocationPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LocationPermission::Prompt => "prompt",
            LocationPermission::Checking => "checking",
            LocationPermission::Granted => "granted",
            LocationPermission::Denied => "denied",
        };
        f.write_str(s)
    }
}
