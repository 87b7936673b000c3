//! Where does this host appear to be?
//!
//! Three sources are combined: an IP geolocation lookup ([`location::Locator`]),
//! best-effort detection of the other address family
//! ([`dual_stack::DualStackResolver`]) and a user-initiated GPS fix
//! ([`gps::GpsAcquisition`]). The remaining modules are the terminal front end.

pub mod api;
pub mod app;
pub mod config;
pub mod dual_stack;
pub mod error;
pub mod events;
pub mod gps;
pub mod location;
pub mod logging;
pub mod models;
pub mod ui;
