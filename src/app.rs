use crate::error::GpsError;
use crate::events::Event;
use crate::models::{GpsLocation, IpInfo, LocationPermission};
use crossterm::event::{KeyCode, KeyEvent};
use std::time::Instant;
use tracing::debug;

#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub enum ViewMode {
    #[default]
    Dashboard,
    Map,
}

impl ViewMode {
    /// Parses the `ui.default_view` setting, falling back to the dashboard.
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("map") {
            ViewMode::Map
        } else {
            ViewMode::Dashboard
        }
    }
}

/// Work the main loop has to start on behalf of the app.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Action {
    None,
    RefreshIp(u64),
    RequestGps(u64),
}

/// UI state. Each result slot is only written from the matching event.
///
/// Every refresh and GPS request gets a new generation number; results that
/// come back tagged with an older one were overtaken and are dropped.
#[derive(Default)]
pub struct App {
    pub view_mode: ViewMode,
    pub tick_count: usize,
    pub should_quit: bool,

    // IP lookup slot
    pub ip_info: Option<IpInfo>,
    pub ip_loading: bool,
    pub ip_error: Option<String>,
    pub last_update: Option<Instant>,

    // GPS slot
    pub gps_location: Option<GpsLocation>,
    pub permission: LocationPermission,
    pub gps_notice: Option<String>,
    gps_pending: bool,

    ip_generation: u64,
    gps_generation: u64,
}

impl App {
    pub fn new(view_mode: ViewMode) -> Self {
        Self {
            view_mode,
            ..Self::default()
        }
    }

    /// Marks a lookup as in flight and returns its generation.
    pub fn begin_refresh(&mut self) -> u64 {
        self.ip_generation += 1;
        self.ip_loading = true;
        self.ip_error = None;
        self.ip_generation
    }

    /// Marks a GPS request as in flight and returns its generation. Until its
    /// result comes back, further `g` presses are ignored.
    pub fn begin_gps_request(&mut self) -> u64 {
        self.gps_generation += 1;
        self.gps_pending = true;
        self.gps_notice = None;
        self.gps_generation
    }

    pub fn on_tick(&mut self) {
        self.tick_count = self.tick_count.wrapping_add(1);
    }

    /// Applies an event coming from a background task. Key input goes
    /// through [`App::handle_key`] instead.
    pub fn apply(&mut self, event: Event) {
        match event {
            Event::Tick => self.on_tick(),
            Event::IpLookup { generation, result } => self.on_ip_lookup(generation, result),
            Event::Gps { generation, result } => self.on_gps_result(generation, result),
            Event::Permission(p) => self.permission = p,
            Event::Input(_) => {}
        }
    }

    fn on_ip_lookup(&mut self, generation: u64, result: Result<IpInfo, String>) {
        if generation != self.ip_generation {
            debug!(
                "Dropping stale IP lookup result (generation {} < {})",
                generation, self.ip_generation
            );
            return;
        }

        self.ip_loading = false;
        match result {
            Ok(info) => {
                self.ip_info = Some(info);
                self.ip_error = None;
                self.last_update = Some(Instant::now());
            }
            Err(msg) => self.ip_error = Some(msg),
        }
    }

    fn on_gps_result(&mut self, generation: u64, result: Result<GpsLocation, GpsError>) {
        if generation != self.gps_generation {
            debug!("Dropping stale GPS result (generation {})", generation);
            return;
        }

        self.gps_pending = false;
        match result {
            Ok(location) => {
                self.gps_location = Some(location);
                self.gps_notice = None;
            }
            // Nothing was attempted, so the last fix is still valid.
            Err(GpsError::Unsupported) => {
                self.gps_notice = Some(GpsError::Unsupported.to_string());
            }
            Err(e) => {
                self.gps_location = None;
                self.gps_notice = Some(e.to_string());
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                Action::None
            }
            KeyCode::Char('r') => Action::RefreshIp(self.begin_refresh()),
            KeyCode::Char('g') => {
                // The mirrored permission lags behind the request task.
                if self.gps_pending || self.permission == LocationPermission::Checking {
                    return Action::None;
                }
                Action::RequestGps(self.begin_gps_request())
            }
            KeyCode::Char('1') => {
                self.view_mode = ViewMode::Dashboard;
                Action::None
            }
            KeyCode::Char('2') | KeyCode::Char('m') => {
                self.view_mode = ViewMode::Map;
                Action::None
            }
            KeyCode::Char('c') => {
                self.gps_notice = None;
                Action::None
            }
            _ => Action::None,
        }
    }
}
