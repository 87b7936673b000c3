//! A configured, fixed position.
//!
//! Useful for hosts with a known install location and no receiver. Consent
//! is modelled by [`StaticPermission`], which can be flipped at runtime.

use super::{Coordinates, PermissionSource, Position, PositionOptions, PositionSensor};
use crate::error::GpsError;
use crate::models::LocationPermission;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

pub struct StaticPermission {
    tx: watch::Sender<LocationPermission>,
}

impl StaticPermission {
    pub fn new(initial: LocationPermission) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn current(&self) -> LocationPermission {
        *self.tx.borrow()
    }

    /// Changes the permission and notifies subscribers.
    pub fn set(&self, permission: LocationPermission) {
        self.tx.send_replace(permission);
    }
}

#[async_trait]
impl PermissionSource for StaticPermission {
    async fn query(&self) -> LocationPermission {
        self.current()
    }

    fn subscribe(&self) -> Option<watch::Receiver<LocationPermission>> {
        Some(self.tx.subscribe())
    }
}

pub struct FixedSensor {
    latitude: f64,
    longitude: f64,
    accuracy: f64,
    permission: Arc<StaticPermission>,
}

impl FixedSensor {
    pub fn new(
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        permission: Arc<StaticPermission>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            permission,
        }
    }
}

#[async_trait]
impl PositionSensor for FixedSensor {
    async fn current_position(&self, _options: &PositionOptions) -> Result<Position, GpsError> {
        if self.permission.current() != LocationPermission::Granted {
            return Err(GpsError::PermissionDenied);
        }
        Ok(Position {
            coords: Coordinates {
                latitude: self.latitude,
                longitude: self.longitude,
                accuracy: self.accuracy,
                altitude: None,
                altitude_accuracy: None,
                heading: None,
                speed: None,
            },
            timestamp: chrono::Utc::now().timestamp_millis(),
        })
    }
}
