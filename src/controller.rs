//! Application controller.
//!
//! This module orchestrates the main application loop:
//! - Terminal initialization and cleanup
//! - Event polling and handling
//! - Background session loading
//! - State updates and rendering

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::event::{apply_action, handle_event, poll_event, Action};
use crate::loader::{LoadMessage, SessionLoader};
use crate::model::AppState;
use crate::ui::{calculate_track_width, render};

/// The main application controller.
pub struct App {
    /// Terminal backend
    terminal: Terminal<CrosstermBackend<Stdout>>,
    /// Application state
    state: AppState,
    /// Session being loaded in the background, if any
    loader: Option<SessionLoader>,
    /// Event poll timeout
    tick_rate: Duration,
}

impl App {
    /// Creates a new application with the given state.
    pub fn new(state: AppState) -> Result<Self> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            state,
            loader: None,
            tick_rate: Duration::from_millis(50),
        })
    }

    /// Attaches a background loader whose result replaces the data.
    pub fn with_loader(mut self, loader: SessionLoader) -> Self {
        self.state.loading = Some("Loading session...".to_string());
        self.loader = Some(loader);
        self
    }

    /// Runs the main application loop.
    pub fn run(&mut self) -> Result<()> {
        // Initial viewport setup
        self.update_viewport_size()?;

        loop {
            self.poll_loader();

            // Render
            let state = &mut self.state;
            self.terminal.draw(|frame| {
                render(frame, state);
            })?;

            // A pass that hit stale data gets one immediate redraw
            if std::mem::take(&mut self.state.repaint_requested) {
                log::debug!("repaint requested after a failed render pass");
                continue;
            }

            // Handle events
            if let Some(event) = poll_event(self.tick_rate) {
                let action = handle_event(event, &self.state.mode, self.state.show_help);

                // Handle resize specially to update viewport
                if let Action::Resize(_, _) = action {
                    self.update_viewport_size()?;
                }

                if !apply_action(&mut self.state, action) {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Drains pending loader messages into the state.
    fn poll_loader(&mut self) {
        let Some(loader) = self.loader.as_mut() else {
            return;
        };
        while let Some(message) = loader.try_recv() {
            match message {
                LoadMessage::Progress(step) => self.state.loading = Some(step),
                LoadMessage::Loaded(store) => self.state.apply_loaded(store),
                LoadMessage::Failed(e) => {
                    self.state.loading = None;
                    self.state.status_message = Some(format!("Error: {}", e));
                }
            }
        }
        if loader.is_finished() {
            self.loader = None;
        }
    }

    /// Updates the viewport size based on terminal dimensions.
    fn update_viewport_size(&mut self) -> Result<()> {
        let size = self.terminal.size()?;
        self.state.update_window_width(calculate_track_width(size.width));
        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        // Restore terminal
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Runs the application on already loaded data.
pub fn run_app(state: AppState) -> Result<()> {
    let mut app = App::new(state)?;
    app.run()
}

/// Runs the application while `loader` reads the session in the background.
pub fn run_app_with_loading(state: AppState, loader: SessionLoader) -> Result<()> {
    let mut app = App::new(state)?.with_loader(loader);
    app.run()
}
