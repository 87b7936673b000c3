//! GPS acquisition and permission tracking.
//!
//! [`GpsAcquisition`] owns the [`LocationPermission`] state and is its only
//! writer. It drives one single-shot position request at a time against a
//! [`PositionSensor`] and mirrors out-of-band changes reported by a
//! [`PermissionSource`]. Readers observe the state through a
//! [`watch::Receiver`] from [`GpsAcquisition::subscribe`].

pub mod fixed;
pub mod gpsd;

use crate::config::{GpsConfig, GpsSource};
use crate::error::GpsError;
use crate::models::{GpsLocation, LocationPermission};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Options for a single position request.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the sensor may hand back; zero forces a fresh one.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_millis(10_000),
            maximum_age: Duration::ZERO,
        }
    }
}

/// Geographic coordinates as reported by a sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
    pub altitude: Option<f64>,
    pub altitude_accuracy: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
}

/// A raw sensor reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub coords: Coordinates,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl TryFrom<Position> for GpsLocation {
    type Error = GpsError;

    fn try_from(pos: Position) -> Result<Self, Self::Error> {
        let c = pos.coords;
        if !c.accuracy.is_finite() || c.accuracy < 0.0 {
            return Err(GpsError::PositionUnavailable(format!(
                "sensor reported accuracy {}",
                c.accuracy
            )));
        }
        Ok(GpsLocation {
            latitude: c.latitude,
            longitude: c.longitude,
            accuracy: c.accuracy,
            altitude: c.altitude,
            altitude_accuracy: c.altitude_accuracy,
            heading: c.heading,
            speed: c.speed,
            timestamp: pos.timestamp,
        })
    }
}

/// Something that can produce a single position fix.
#[async_trait]
pub trait PositionSensor: Send + Sync {
    /// Resolves with one fix or an error. May never resolve; the caller
    /// enforces [`PositionOptions::timeout`].
    async fn current_position(&self, options: &PositionOptions) -> Result<Position, GpsError>;
}

/// Platform permission facility.
#[async_trait]
pub trait PermissionSource: Send + Sync {
    /// Current state, without prompting the user.
    async fn query(&self) -> LocationPermission;

    /// Change notifications, if the facility supports them.
    fn subscribe(&self) -> Option<watch::Receiver<LocationPermission>>;
}

pub struct GpsAcquisition {
    sensor: Option<Arc<dyn PositionSensor>>,
    permissions: Option<Arc<dyn PermissionSource>>,
    options: PositionOptions,
    state: Arc<watch::Sender<LocationPermission>>,
    observing: AtomicBool,
}

impl GpsAcquisition {
    /// `sensor: None` means the platform has no geolocation capability.
    pub fn new(
        sensor: Option<Arc<dyn PositionSensor>>,
        permissions: Option<Arc<dyn PermissionSource>>,
        options: PositionOptions,
    ) -> Self {
        let (state, _) = watch::channel(LocationPermission::Prompt);
        Self {
            sensor,
            permissions,
            options,
            state: Arc::new(state),
            observing: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &GpsConfig) -> Self {
        let options = PositionOptions {
            enable_high_accuracy: config.high_accuracy,
            timeout: config.timeout(),
            maximum_age: Duration::ZERO,
        };

        match config.source {
            GpsSource::Gpsd => {
                let sensor = gpsd::GpsdSensor::new(&config.gpsd_addr);
                Self::new(Some(Arc::new(sensor)), None, options)
            }
            GpsSource::Fixed => {
                // Consent is decided up front in the config file.
                let initial = if config.allow {
                    LocationPermission::Granted
                } else {
                    LocationPermission::Denied
                };
                let permission = Arc::new(fixed::StaticPermission::new(initial));
                let sensor = fixed::FixedSensor::new(
                    config.fixed_lat,
                    config.fixed_lon,
                    config.fixed_accuracy,
                    Arc::clone(&permission),
                );
                Self::new(Some(Arc::new(sensor)), Some(permission), options)
            }
            GpsSource::None => Self::new(None, None, options),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.sensor.is_some()
    }

    pub fn options(&self) -> &PositionOptions {
        &self.options
    }

    pub fn permission(&self) -> LocationPermission {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LocationPermission> {
        self.state.subscribe()
    }

    /// Reads the current permission without prompting and starts mirroring
    /// later changes for the rest of the process. Subsequent calls only
    /// re-read the state.
    pub async fn check_permission(&self) -> LocationPermission {
        let Some(source) = &self.permissions else {
            return self.permission();
        };

        let current = source.query().await;
        self.state.send_replace(current);

        if !self.observing.swap(true, Ordering::SeqCst) {
            if let Some(mut rx) = source.subscribe() {
                let state = Arc::clone(&self.state);
                tokio::spawn(async move {
                    while rx.changed().await.is_ok() {
                        let next = *rx.borrow_and_update();
                        info!("Location permission changed externally to {}", next);
                        state.send_replace(next);
                    }
                });
            }
        }

        current
    }

    /// Issues one position request and settles the permission state.
    ///
    /// Moves to `Checking` while the request runs, then to `Granted` on a
    /// fix or `Denied` on any failure, the timeout included. Without a
    /// sensor the request is rejected with [`GpsError::Unsupported`] and the
    /// state is left untouched.
    pub async fn request_location(&self) -> Result<GpsLocation, GpsError> {
        let Some(sensor) = &self.sensor else {
            warn!("GPS requested but no position sensor is configured");
            return Err(GpsError::Unsupported);
        };

        self.state.send_replace(LocationPermission::Checking);

        let outcome =
            match tokio::time::timeout(self.options.timeout, sensor.current_position(&self.options))
                .await
            {
                Ok(Ok(position)) => GpsLocation::try_from(position),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(GpsError::Timeout),
            };

        match &outcome {
            Ok(loc) => {
                info!(
                    "GPS fix ({:.6}, {:.6}) ±{:.0} m",
                    loc.latitude, loc.longitude, loc.accuracy
                );
                self.state.send_replace(LocationPermission::Granted);
            }
            Err(e) => {
                warn!("GPS request failed: {}", e);
                self.state.send_replace(LocationPermission::Denied);
            }
        }
        outcome
    }
}
