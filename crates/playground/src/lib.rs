//! codepad: a terminal code playground
//!
//! Provides a split-pane terminal interface with:
//! - an editor for PadScript with syntax highlighting and an end-of-buffer marker
//! - a console pane showing the captured output of the last run
//! - a draggable divider (double-click resets it to 50/50)

pub mod app;
pub mod config;
pub mod decorations;
pub mod editor;
pub mod frame;
pub mod gesture;
pub mod keys;
pub mod logging;
pub mod ratio;
pub mod sandbox;
pub mod ui;

use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend, layout::Rect};
use std::io::{self, stdout};
use std::time::Instant;

pub use app::App;
pub use config::{ConfigError, PlaygroundConfig};

/// Run the playground until the user quits
pub fn run(config: PlaygroundConfig) -> Result<(), String> {
    // Setup terminal
    enable_raw_mode().map_err(|e| format!("Failed to enable raw mode: {}", e))?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .map_err(|e| format!("Failed to enter alternate screen: {}", e))?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal =
        Terminal::new(backend).map_err(|e| format!("Failed to create terminal: {}", e))?;

    let result = run_app(&mut terminal, App::new(config));

    // Restore terminal
    let _ = disable_raw_mode();
    let _ = execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    );
    let _ = terminal.show_cursor();

    result.map_err(|e| format!("Application error: {}", e))
}

/// Internal run loop (specialized for CrosstermBackend)
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    mut app: App,
) -> io::Result<()> {
    use crossterm::event;

    let size = terminal.size()?;
    app.mount(Rect::new(0, 0, size.width, size.height));

    loop {
        app.on_frame(Instant::now());
        if app.take_redraw() {
            terminal.draw(|frame| app.render(frame))?;
        }

        if event::poll(app.time_until_next_frame(Instant::now()))? {
            let event = event::read()?;
            app.handle_event(event, Instant::now());
        }

        if app.should_quit {
            break;
        }
    }

    app.unmount();
    Ok(())
}
