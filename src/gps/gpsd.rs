//! Position fixes from a gpsd daemon.
//!
//! Speaks the gpsd JSON protocol over TCP: enable watching, then read
//! newline-delimited reports until a usable `TPV` (time-position-velocity)
//! report arrives. gpsd only streams live reports, so every fix is fresh.

use super::{Coordinates, Position, PositionOptions, PositionSensor};
use crate::error::GpsError;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

const WATCH_COMMAND: &[u8] = b"?WATCH={\"enable\":true,\"json\":true};\n";

pub struct GpsdSensor {
    addr: String,
}

impl GpsdSensor {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "class")]
enum Report {
    #[serde(rename = "TPV")]
    Tpv(Tpv),
    #[serde(other)]
    Other,
}

/// Fields of a TPV report; gpsd omits whatever it does not know.
#[derive(Debug, Default, Deserialize)]
struct Tpv {
    #[serde(default)]
    mode: u8,
    time: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(rename = "altHAE")]
    alt_hae: Option<f64>,
    alt: Option<f64>,
    eph: Option<f64>,
    epx: Option<f64>,
    epy: Option<f64>,
    epv: Option<f64>,
    track: Option<f64>,
    speed: Option<f64>,
}

impl Tpv {
    /// 2 = 2D fix, 3 = 3D fix. High accuracy insists on a 3D fix.
    fn into_position(self, high_accuracy: bool) -> Option<Position> {
        let min_mode = if high_accuracy { 3 } else { 2 };
        if self.mode < min_mode {
            return None;
        }
        let (latitude, longitude) = (self.lat?, self.lon?);

        // No error estimate means no usable fix yet.
        let accuracy = self.eph.or_else(|| match (self.epx, self.epy) {
            (Some(x), Some(y)) => Some(x.max(y)),
            (x, y) => x.or(y),
        })?;

        let timestamp = self
            .time
            .as_deref()
            .and_then(|t| chrono::DateTime::parse_from_rfc3339(t).ok())
            .map(|t| t.timestamp_millis())
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

        Some(Position {
            coords: Coordinates {
                latitude,
                longitude,
                accuracy,
                altitude: self.alt_hae.or(self.alt),
                altitude_accuracy: self.epv,
                heading: self.track,
                speed: self.speed,
            },
            timestamp,
        })
    }
}

/// Parses one line of gpsd output, returning a position if it is a usable fix.
pub(crate) fn parse_report(line: &str, high_accuracy: bool) -> Option<Position> {
    match serde_json::from_str::<Report>(line) {
        Ok(Report::Tpv(tpv)) => tpv.into_position(high_accuracy),
        Ok(Report::Other) => None,
        Err(e) => {
            debug!("Skipping unparseable gpsd line: {}", e);
            None
        }
    }
}

fn unavailable(context: &str, e: impl std::fmt::Display) -> GpsError {
    GpsError::PositionUnavailable(format!("{}: {}", context, e))
}

#[async_trait]
impl PositionSensor for GpsdSensor {
    async fn current_position(&self, options: &PositionOptions) -> Result<Position, GpsError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|e| unavailable(&format!("gpsd at {}", self.addr), e))?;
        let (reader, mut writer) = stream.into_split();

        writer
            .write_all(WATCH_COMMAND)
            .await
            .map_err(|e| unavailable("gpsd watch", e))?;

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| unavailable("gpsd read", e))?
        {
            if let Some(position) = parse_report(&line, options.enable_high_accuracy) {
                return Ok(position);
            }
        }

        Err(GpsError::PositionUnavailable(
            "gpsd closed the connection".to_string(),
        ))
    }
}
