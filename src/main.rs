use color_eyre::Result;
use ipscope::{
    app::{Action, App, ViewMode},
    config::Config,
    events::{Event, EventHandler},
    gps::GpsAcquisition,
    location::Locator,
    logging, ui,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, sync::Arc};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Instrumentation and safety
    let _log_guard = logging::initialize_logging(logging::LOG_DIR);
    color_eyre::install()?;
    install_panic_hook();

    let config = Config::load();
    let locator = Arc::new(Locator::from_config(&config)?);
    let gps = Arc::new(GpsAcquisition::from_config(&config.gps));
    info!(
        "Starting with GPS source {:?} (supported: {})",
        config.gps.source,
        gps.is_supported()
    );

    // Ready terminal and state
    let mut terminal = setup_terminal()?;
    let mut app = App::new(ViewMode::from_name(&config.ui.default_view));
    let mut events = EventHandler::new(config.ui.tick_rate_ms);

    forward_permission_changes(&gps, events.tx.clone());
    let checker = Arc::clone(&gps);
    tokio::spawn(async move {
        let permission = checker.check_permission().await;
        debug!("Initial location permission: {}", permission);
    });

    // Initial lookup fires on load
    spawn_lookup(&locator, app.begin_refresh(), events.tx.clone());

    // Main loop
    while !app.should_quit {
        terminal.draw(|f| ui::render(f, &app))?;

        let Some(event) = events.next().await else {
            break;
        };
        match event {
            Event::Input(key) => match app.handle_key(key) {
                Action::RefreshIp(generation) => {
                    spawn_lookup(&locator, generation, events.tx.clone())
                }
                Action::RequestGps(generation) => {
                    spawn_gps_request(&gps, generation, events.tx.clone())
                }
                Action::None => {}
            },
            other => app.apply(other),
        }
    }

    restore_terminal(terminal)?;
    Ok(())
}

fn spawn_lookup(locator: &Arc<Locator>, generation: u64, tx: UnboundedSender<Event>) {
    let locator = Arc::clone(locator);
    tokio::spawn(async move {
        let result = locator.locate().await.map_err(|e| e.to_string());
        let _ = tx.send(Event::IpLookup { generation, result });
    });
}

fn spawn_gps_request(gps: &Arc<GpsAcquisition>, generation: u64, tx: UnboundedSender<Event>) {
    let gps = Arc::clone(gps);
    tokio::spawn(async move {
        let result = gps.request_location().await;
        let _ = tx.send(Event::Gps { generation, result });
    });
}

/// The acquisition component owns the permission state; the UI only mirrors it.
fn forward_permission_changes(gps: &GpsAcquisition, tx: UnboundedSender<Event>) {
    let mut rx = gps.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let permission = *rx.borrow_and_update();
            if tx.send(Event::Permission(permission)).is_err() {
                break;
            }
        }
    });
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(
        stdout,
        crossterm::terminal::EnterAlternateScreen,
        crossterm::cursor::Hide
    )?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    Ok(())
}

fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Give the terminal back before printing the panic
        crossterm::terminal::disable_raw_mode().ok();
        crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::cursor::Show
        )
        .ok();
        original_hook(panic_info);
    }));
}
