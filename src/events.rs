//! Event types and the main event loop driver.
//!
//! This module defines the [`Event`] enum (keyboard input, ticks, lookup and
//! GPS results, permission changes) and the [`EventHandler`], which runs a
//! background task that polls crossterm for key events and emits periodic
//! [`Event::Tick`]s. Acquisition tasks spawned by `main.rs` post their results
//! through [`EventHandler::tx`].

use crate::error::GpsError;
use crate::models::{GpsLocation, IpInfo, LocationPermission};
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::error;

/// Events processed by the application event loop.
#[derive(Debug)]
pub enum Event {
    /// Periodic tick used for UI refresh.
    Tick,
    /// User key press from the terminal.
    Input(KeyEvent),
    /// Outcome of an IP lookup, tagged with the refresh that started it.
    IpLookup {
        generation: u64,
        /// Display message on failure.
        result: Result<IpInfo, String>,
    },
    /// Outcome of a GPS request, tagged with the request that started it.
    Gps {
        generation: u64,
        result: Result<GpsLocation, GpsError>,
    },
    /// The permission state changed, either through a request or externally.
    Permission(LocationPermission),
}

/// Multiplexes terminal input and ticks into a single event stream.
///
/// The sender ([`tx`](EventHandler::tx)) can be cloned and handed to other
/// tasks, while the receiver is consumed by [`next`](EventHandler::next) in
/// the main loop.
pub struct EventHandler {
    pub tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Creates a new event handler and spawns the input/tick task.
    ///
    /// The task polls crossterm with a timeout of `tick_rate_ms`; key presses
    /// become [`Event::Input`] and each elapsed interval an [`Event::Tick`].
    /// It stops if the terminal can no longer be read.
    pub fn new(tick_rate_ms: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::spawn(async move {
            let tick_rate = Duration::from_millis(tick_rate_ms);
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::from_secs(0));
                match event::poll(timeout) {
                    Ok(true) => match event::read() {
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            event_tx.send(Event::Input(key)).ok();
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("Terminal read failed: {}", e);
                            break;
                        }
                    },
                    Ok(false) => {}
                    Err(e) => {
                        error!("Terminal poll failed: {}", e);
                        break;
                    }
                }
                if last_tick.elapsed() >= tick_rate {
                    if event_tx.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self { tx, rx }
    }

    /// Receives the next event from the channel.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
