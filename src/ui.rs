//! TUI rendering.
//!
//! This module draws the application state with `ratatui`: a loading screen
//! for the first lookup, the dashboard (addresses, IP-based location, GPS
//! panel) and a world map with both position estimates.

use crate::app::{App, ViewMode};
use crate::models::{GpsLocation, IpInfo, LocationPermission};
use ratatui::{
    prelude::*,
    widgets::{canvas::*, *}, // Map, MapResolution, Canvas, ...
};

use ratatui::text::Line;

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

/// Renders one frame based on current application state.
///
/// Until the first lookup finishes (successfully or not) the loading screen
/// is shown; afterwards the view selected by [`App::view_mode`].
pub fn render(f: &mut Frame, app: &App) {
    if app.ip_info.is_none() && app.ip_error.is_none() {
        render_loading_screen(f, app);
        return;
    }

    match app.view_mode {
        ViewMode::Dashboard => render_dashboard_view(f, app),
        ViewMode::Map => render_map_view(f, app),
    }
}

/// Dashboard: address header on top, IP-based and GPS panels side by side.
fn render_dashboard_view(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.size());

    match &app.ip_info {
        Some(info) => render_address_header(f, app, info, rows[0]),
        None => render_lookup_error(f, app, rows[0]),
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    if let Some(info) = &app.ip_info {
        render_ip_location(f, info, columns[0]);
    }
    render_gps_panel(f, app, columns[1]);

    render_help(f, rows[2]);
}

fn render_address_header(f: &mut Frame, app: &App, info: &IpInfo, area: Rect) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let missing = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::ITALIC);

    let family = |label: &'static str, value: Option<&str>, color: Color| {
        Line::from(vec![
            Span::styled(label, bold),
            match value {
                Some(addr) => Span::styled(addr.to_string(), Style::default().fg(color)),
                None => Span::styled("Not available", missing),
            },
        ])
    };

    let status = if app.ip_loading {
        Span::styled(
            format!(" refreshing {}", SPINNER[app.tick_count % SPINNER.len()]),
            Style::default().fg(Color::Yellow),
        )
    } else if let Some(err) = &app.ip_error {
        Span::styled(format!(" refresh failed: {}", err), Style::default().fg(Color::Red))
    } else if let Some(updated) = app.last_update {
        let seconds_ago = updated.elapsed().as_secs();
        Span::styled(
            format!(" updated {}s ago", seconds_ago),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        Span::raw("")
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("  PRIMARY IP: ", bold),
            Span::styled(
                info.ip.as_str(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            status,
        ]),
        Line::from(""),
        family("  IPv4: ", info.ipv4.as_deref(), Color::Blue),
        family("  IPv6: ", info.ipv6.as_deref(), Color::Magenta),
        Line::from(""),
        Line::from(Span::styled(
            format!("  {}", dual_stack_summary(info)),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let header = Paragraph::new(lines).block(
        Block::default()
            .title(" Your Address ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(header, area);
}

fn render_lookup_error(f: &mut Frame, app: &App, area: Rect) {
    let msg = app.ip_error.as_deref().unwrap_or("unknown error");
    let lines = vec![
        Line::from(Span::styled(
            "Error loading location information",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(msg, Style::default().fg(Color::DarkGray))),
        Line::from(""),
        Line::from(if app.ip_loading {
            "Retrying..."
        } else {
            "Press r to try again"
        }),
    ];

    let p = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

fn render_ip_location(f: &mut Frame, info: &IpInfo, area: Rect) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let postal = if info.postal_code.is_empty() {
        "N/A"
    } else {
        info.postal_code.as_str()
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("City:      ", bold),
            Span::raw(format!("{}, {}", info.city, info.region)),
        ]),
        Line::from(vec![
            Span::styled("Country:   ", bold),
            Span::raw(format!(
                "{} ({}) · {}",
                info.country, info.country_code, info.continent_code
            )),
        ]),
        Line::from(vec![Span::styled("Postal:    ", bold), Span::raw(postal)]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Lat/Lng:   ", bold),
            Span::raw(format!("{:.4}, {:.4}", info.latitude, info.longitude)),
        ]),
        Line::from(Span::styled(
            "           accuracy ~5-10 km",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Timezone:  ", bold),
            Span::raw(info.timezone.as_str()),
        ]),
        Line::from(vec![
            Span::styled("ISP:       ", bold),
            Span::raw(info.isp.as_str()),
        ]),
    ];

    let p = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title(" IP-Based Location ")
            .borders(Borders::ALL)
            .padding(Padding::new(2, 2, 1, 1)),
    );
    f.render_widget(p, area);
}

fn render_gps_panel(f: &mut Frame, app: &App, area: Rect) {
    let mut lines = match (&app.gps_location, app.permission) {
        (_, LocationPermission::Checking) => vec![
            Line::from(Span::styled(
                "Requesting position...",
                Style::default().fg(Color::Yellow),
            )),
            Line::from("Waiting for the sensor to report a fix"),
        ],
        (Some(loc), _) => gps_detail_lines(loc),
        (None, LocationPermission::Denied) => vec![
            Line::from(Span::styled(
                "Permission Denied",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from("GPS needs location permission or a working receiver."),
            Line::from(Span::styled(
                "IP-based location still works. Press g to try again.",
                Style::default().fg(Color::DarkGray),
            )),
        ],
        (None, _) => vec![
            Line::from(Span::styled(
                "Enable Precise Location",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from("Metre-level coordinates from the position sensor."),
            Line::from(Span::styled(
                "Press g to request a fix",
                Style::default().fg(Color::DarkGray),
            )),
        ],
    };

    if let Some(notice) = &app.gps_notice {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            notice.as_str(),
            Style::default().fg(Color::Red),
        )));
    }

    let status = if app.gps_location.is_some() {
        Span::styled(" Active ", Style::default().fg(Color::Green))
    } else {
        Span::styled(" Not Enabled ", Style::default().fg(Color::DarkGray))
    };

    let p = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title(Line::from(vec![Span::raw(" GPS-Based Location "), status]))
            .borders(Borders::ALL)
            .padding(Padding::new(2, 2, 1, 1)),
    );
    f.render_widget(p, area);
}

fn gps_detail_lines(loc: &GpsLocation) -> Vec<Line<'static>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    vec![
        Line::from(vec![
            Span::styled("Lat/Lng:   ", bold),
            Span::raw(format!("{:.6}, {:.6}", loc.latitude, loc.longitude)),
        ]),
        Line::from(Span::styled(
            format!("           accuracy ±{:.0} m", loc.accuracy),
            Style::default().fg(Color::Green),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Altitude:  ", bold),
            Span::raw(format_measure(loc.altitude, "m", 0, "N/A")),
        ]),
        Line::from(vec![
            Span::styled("Speed:     ", bold),
            Span::raw(format_measure(loc.speed, "m/s", 1, "Stationary")),
        ]),
        Line::from(vec![
            Span::styled("Heading:   ", bold),
            Span::raw(format_measure(loc.heading, "°", 0, "N/A")),
        ]),
        Line::from(vec![
            Span::styled("Captured:  ", bold),
            Span::raw(format_timestamp(loc.timestamp)),
        ]),
    ]
}

/// IP geolocation is only good to a city district.
const IP_ACCURACY_METRES: f64 = 7_000.0;
const METRES_PER_DEGREE: f64 = 111_320.0;

/// Converts a ground distance to degrees of latitude.
fn metres_to_degrees(metres: f64) -> f64 {
    metres / METRES_PER_DEGREE
}

/// A position with its accuracy ring, in canvas (degree) units.
#[derive(Debug, Clone, Copy)]
struct Ring {
    lon: f64,
    lat: f64,
    radius: f64,
}

/// Canvas x/y bounds: centred on the first ring, wide enough for every ring.
/// Without any position the whole world is shown.
fn map_bounds(rings: &[Ring]) -> ([f64; 2], [f64; 2]) {
    let Some(centre) = rings.first() else {
        return ([-180.0, 180.0], [-90.0, 90.0]);
    };

    let mut half_lat: f64 = 0.01;
    for ring in rings {
        half_lat = half_lat
            .max(ring.radius * 1.5)
            .max((ring.lat - centre.lat).abs() + ring.radius * 1.5)
            .max(((ring.lon - centre.lon).abs() + ring.radius * 1.5) / 2.0);
    }
    // Terminal cells are twice as tall as they are wide.
    let half_lon = (half_lat * 2.0).min(180.0);
    let half_lat = half_lat.min(90.0);

    (
        [centre.lon - half_lon, centre.lon + half_lon],
        [centre.lat - half_lat, centre.lat + half_lat],
    )
}

/// Map centred on the best position known, GPS over IP, with an accuracy
/// ring around each estimate.
fn render_map_view(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(f.size());

    let ip_ring = app.ip_info.as_ref().map(|i| Ring {
        lon: i.longitude,
        lat: i.latitude,
        radius: metres_to_degrees(IP_ACCURACY_METRES),
    });
    let gps_ring = app.gps_location.as_ref().map(|g| Ring {
        lon: g.longitude,
        lat: g.latitude,
        radius: metres_to_degrees(g.accuracy),
    });
    let rings: Vec<Ring> = gps_ring.into_iter().chain(ip_ring).collect();
    let (x_bounds, y_bounds) = map_bounds(&rings);

    let canvas = Canvas::default()
        .block(Block::bordered().title(" Location Map "))
        .marker(symbols::Marker::Braille)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(|ctx| {
            ctx.draw(&Map {
                color: Color::Rgb(60, 60, 60),
                resolution: MapResolution::High,
            });
            ctx.layer();

            if let Some(ring) = ip_ring {
                ctx.draw(&Circle {
                    x: ring.lon,
                    y: ring.lat,
                    radius: ring.radius,
                    color: Color::Cyan,
                });
                ctx.print(
                    ring.lon,
                    ring.lat,
                    Line::from(Span::styled(
                        " ◉ IP ",
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    )),
                );
            }
            if let Some(ring) = gps_ring {
                ctx.draw(&Circle {
                    x: ring.lon,
                    y: ring.lat,
                    radius: ring.radius,
                    color: Color::Green,
                });
                ctx.print(
                    ring.lon,
                    ring.lat,
                    Line::from(Span::styled(
                        " ⌖ GPS ",
                        Style::default().fg(Color::Black).bg(Color::Green),
                    )),
                );
            }
        });
    f.render_widget(canvas, rows[0]);

    let gps_legend = match &app.gps_location {
        Some(loc) => format!("   ⌖ GPS fix (±{:.0} m)", loc.accuracy),
        None => "   ⌖ GPS fix".to_string(),
    };
    let legend = Paragraph::new(Line::from(vec![
        Span::raw(" ◉ IP-based estimate (~7 km)"),
        Span::raw(gps_legend),
        Span::raw("   1 dashboard  r refresh  g GPS  q quit"),
    ]))
    .style(Style::default().fg(Color::DarkGray));
    f.render_widget(legend, rows[1]);
}

/// Shown until the first lookup resolves.
fn render_loading_screen(f: &mut Frame, app: &App) {
    let area = f.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(area.height.saturating_sub(3) / 2),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(area);

    let spinner = SPINNER[app.tick_count % SPINNER.len()];
    let msg = Paragraph::new(format!("{} Looking up your IP address...", spinner))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(Color::Cyan));
    f.render_widget(msg, chunks[1]);
}

fn render_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new(" r refresh IP   g request GPS   c clear notice   1/2 views   q quit")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    f.render_widget(help, area);
}

/// One-line description of which families were detected.
pub fn dual_stack_summary(info: &IpInfo) -> &'static str {
    match (&info.ipv4, &info.ipv6) {
        (Some(_), Some(_)) => "✓ Both IPv4 and IPv6 detected",
        (Some(_), None) => "Using IPv4 connection (IPv6 not available from your ISP)",
        (None, Some(_)) => "Using IPv6 connection (IPv4 not available from your ISP)",
        (None, None) => "Address family could not be determined",
    }
}

fn format_measure(value: Option<f64>, unit: &str, precision: usize, fallback: &str) -> String {
    match value {
        Some(v) if unit == "°" => format!("{:.*}{}", precision, v, unit),
        Some(v) => format!("{:.*} {}", precision, v, unit),
        None => fallback.to_string(),
    }
}

fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Event;
    use ratatui::backend::TestBackend;
    use std::time::{Duration, Instant};

    fn info(ipv4: Option<&str>, ipv6: Option<&str>) -> IpInfo {
        IpInfo {
            ip: ipv4.or(ipv6).unwrap_or("?").to_string(),
            ipv4: ipv4.map(str::to_string),
            ipv6: ipv6.map(str::to_string),
            city: "Osaka".to_string(),
            region: "Osaka".to_string(),
            country: "Japan".to_string(),
            country_code: "JP".to_string(),
            latitude: 34.69,
            longitude: 135.50,
            timezone: "Asia/Tokyo".to_string(),
            isp: "Example Broadband".to_string(),
            postal_code: "530-0001".to_string(),
            continent_code: "AS".to_string(),
        }
    }

    fn screen_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn summary_covers_each_combination() {
        let both = info(Some("203.0.113.5"), Some("2001:db8::1"));
        assert!(dual_stack_summary(&both).contains("Both"));
        let v4 = info(Some("203.0.113.5"), None);
        assert!(dual_stack_summary(&v4).starts_with("Using IPv4"));
        let v6 = info(None, Some("2001:db8::1"));
        assert!(dual_stack_summary(&v6).starts_with("Using IPv6"));
    }

    #[test]
    fn measures_fall_back_when_absent() {
        assert_eq!(format_measure(Some(12.345), "m/s", 1, "Stationary"), "12.3 m/s");
        assert_eq!(format_measure(None, "m/s", 1, "Stationary"), "Stationary");
        assert_eq!(format_measure(Some(271.6), "°", 0, "N/A"), "272°");
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
    }

    #[test]
    fn dashboard_shows_addresses_and_gps_prompt() {
        let mut app = App::new(ViewMode::Dashboard);
        let g = app.begin_refresh();
        app.apply(Event::IpLookup {
            generation: g,
            result: Ok(info(Some("203.0.113.5"), None)),
        });

        let text = screen_text(&app);
        assert!(text.contains("203.0.113.5"));
        assert!(text.contains("Not available"));
        assert!(text.contains("Press g to request a fix"));
        assert!(text.contains("updated 0s ago"));
    }

    #[test]
    fn refresh_status_replaces_update_age() {
        let mut app = App::new(ViewMode::Dashboard);
        let g = app.begin_refresh();
        app.apply(Event::IpLookup {
            generation: g,
            result: Ok(info(Some("203.0.113.5"), None)),
        });
        app.last_update = Some(Instant::now() - Duration::from_secs(42));
        assert!(screen_text(&app).contains("updated 42s ago"));

        app.begin_refresh();
        let text = screen_text(&app);
        assert!(text.contains("refreshing"));
        assert!(!text.contains("updated"));
    }

    #[test]
    fn map_bounds_fit_every_ring() {
        assert_eq!(map_bounds(&[]), ([-180.0, 180.0], [-90.0, 90.0]));

        let ip = Ring {
            lon: 135.50,
            lat: 34.69,
            radius: metres_to_degrees(IP_ACCURACY_METRES),
        };
        let (x, y) = map_bounds(&[ip]);
        assert!(y[0] < ip.lat - ip.radius && y[1] > ip.lat + ip.radius);
        assert!(x[0] < ip.lon - ip.radius && x[1] > ip.lon + ip.radius);
        // Close enough that a ~7 km ring spans several cells.
        assert!(y[1] - y[0] < 1.0);

        // A GPS fix in another city still leaves the IP ring on screen.
        let gps = Ring {
            lon: 135.20,
            lat: 34.69,
            radius: metres_to_degrees(15.0),
        };
        let (x, y) = map_bounds(&[gps, ip]);
        assert!(((x[0] + x[1]) / 2.0 - gps.lon).abs() < 1e-9);
        assert!(x[1] > ip.lon + ip.radius);
        assert!(y[1] > ip.lat + ip.radius);
    }

    #[test]
    fn metres_convert_to_degrees_of_latitude() {
        assert!((metres_to_degrees(111_320.0) - 1.0).abs() < 1e-12);
        assert!((metres_to_degrees(7_000.0) - 0.0629).abs() < 1e-3);
    }

    #[test]
    fn map_view_labels_both_estimates() {
        let mut app = App::new(ViewMode::Map);
        let g = app.begin_refresh();
        app.apply(Event::IpLookup {
            generation: g,
            result: Ok(info(Some("203.0.113.5"), None)),
        });
        let g = app.begin_gps_request();
        app.apply(Event::Gps {
            generation: g,
            result: Ok(GpsLocation {
                latitude: 34.70,
                longitude: 135.49,
                accuracy: 12.0,
                altitude: None,
                altitude_accuracy: None,
                heading: None,
                speed: None,
                timestamp: 0,
            }),
        });

        let text = screen_text(&app);
        assert!(text.contains("Location Map"));
        assert!(text.contains("IP"));
        assert!(text.contains("GPS"));
        assert!(text.contains("GPS fix (±12 m)"));
    }

    #[test]
    fn loading_then_error_screens() {
        let mut app = App::new(ViewMode::Dashboard);
        let g = app.begin_refresh();
        assert!(screen_text(&app).contains("Looking up your IP address"));

        app.apply(Event::IpLookup {
            generation: g,
            result: Err("geolocation provider returned HTTP 503 Service Unavailable".to_string()),
        });
        let text = screen_text(&app);
        assert!(text.contains("Error loading location information"));
        assert!(text.contains("Press r to try again"));
    }
}
