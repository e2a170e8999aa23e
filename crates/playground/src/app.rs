//! Playground Application
//!
//! Owns the editor buffer, the split ratio engine, the marker synchronizer
//! and the sandbox, and routes terminal events between them:
//!
//! - mouse presses, drags and releases on the divider drive the ratio
//! - content-changing edits schedule a marker recomputation
//! - the run binding executes the buffer in the sandbox
//!
//! Deferred work (ratio updates, marker moves, editor re-layout) happens in
//! [`App::on_frame`], at most once per frame interval.

use crate::config::PlaygroundConfig;
use crate::decorations::DecorationSync;
use crate::editor::{EditorBuffer, EditorSurface};
use crate::frame::FrameClock;
use crate::gesture::{Click, ClickTracker};
use crate::keys::{Action, action_for};
use crate::ratio::{LayoutEngine, Orientation, PointerCapture, PointerSample, SplitRatio};
use crate::sandbox::{OutputLog, RunOutcome, Sandbox};
use crate::ui::console_pane::ConsolePane;
use crate::ui::editor_pane::EditorPane;
use crate::ui::help::HelpOverlay;
use crate::ui::layout::{ComputedLayout, StatusContent};
use crossterm::event::{Event, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

pub const APP_NAME: &str = "codepad";

pub struct App {
    pub should_quit: bool,
    pub status_message: Option<String>,
    pub show_help: bool,
    config: PlaygroundConfig,
    buffer: EditorBuffer,
    ratio: LayoutEngine,
    marker: DecorationSync,
    sandbox: Sandbox,
    /// Set by the sandbox whenever a console entry lands in its log
    output_changed: Rc<Cell<bool>>,
    clicks: ClickTracker,
    clock: FrameClock,
    viewport: Rect,
    orientation: Orientation,
    layout: ComputedLayout,
    pointer_captured: bool,
    mounted: bool,
    needs_redraw: bool,
    frames: u64,
}

impl App {
    pub fn new(config: PlaygroundConfig) -> Self {
        let output_changed = Rc::new(Cell::new(false));
        let mut sandbox = Sandbox::new(config.run_options());
        let changed = Rc::clone(&output_changed);
        sandbox.set_update_hook(Rc::new(move |log: &OutputLog| {
            trace!(target: "codepad::console", entries = log.len(), "captured");
            changed.set(true);
        }));

        Self {
            should_quit: false,
            status_message: None,
            show_help: false,
            buffer: EditorBuffer::detached(config.tab_width),
            ratio: LayoutEngine::new(),
            marker: DecorationSync::new(),
            sandbox,
            output_changed,
            clicks: ClickTracker::new(config.double_click_window()),
            clock: FrameClock::new(config.frame_interval()),
            viewport: Rect::default(),
            orientation: Orientation::Horizontal,
            layout: ComputedLayout::default(),
            pointer_captured: false,
            mounted: false,
            needs_redraw: true,
            frames: 0,
            config,
        }
    }

    /// Attach the initial buffer, size the panes and place the marker
    pub fn mount(&mut self, viewport: Rect) {
        self.buffer.attach(&self.config.initial_code);
        self.on_viewport_resize(viewport);
        self.marker.on_mount(&mut self.buffer);
        self.mounted = true;
        info!(
            width = viewport.width,
            height = viewport.height,
            orientation = self.orientation.name(),
            "playground mounted"
        );
    }

    /// Cancel deferred work and let go of the pointer
    pub fn unmount(&mut self) {
        self.marker.cancel();
        if let Some(capture) = self.ratio.end_drag() {
            self.apply_capture(capture);
        }
        self.pointer_captured = false;
        self.mounted = false;
        debug!(frames = self.frames, runs = self.sandbox.runs(), "playground unmounted");
    }

    pub fn handle_event(&mut self, event: Event, now: Instant) {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse, now),
            Event::Resize(width, height) => {
                self.on_viewport_resize(Rect::new(0, 0, width, height));
            }
            _ => {}
        }
    }

    /// Handle a key event
    pub fn handle_key(&mut self, key: KeyEvent) {
        let Some(action) = action_for(key) else {
            return;
        };
        self.needs_redraw = true;

        match action {
            Action::Quit => self.should_quit = true,
            Action::Run => self.run_code(),
            Action::ToggleHelp => self.show_help = !self.show_help,
            Action::Dismiss => self.show_help = false,
            Action::Edit(command) => {
                if self.buffer.apply(command) {
                    self.status_message = None;
                    self.marker.on_buffer_changed();
                }
            }
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        let pointer = PointerSample::new(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if !self.layout.on_divider(mouse.column, mouse.row) {
                    self.clicks.reset();
                    return;
                }
                match self.clicks.on_press(pointer, MouseButton::Left, now) {
                    Click::Double => {
                        self.ratio.reset_to_midpoint();
                        self.apply_ratio();
                    }
                    Click::Single => {
                        let capture = self.ratio.begin_drag();
                        self.apply_capture(capture);
                    }
                }
                self.needs_redraw = true;
            }
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
                if self.pointer_captured {
                    self.ratio
                        .on_pointer_move(pointer, self.layout.container, self.orientation);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if self.pointer_captured
                    && let Some(capture) = self.ratio.end_drag()
                {
                    self.apply_capture(capture);
                    self.needs_redraw = true;
                }
            }
            _ => {}
        }
    }

    /// New terminal size. Orientation may flip; the ratio is kept.
    pub fn on_viewport_resize(&mut self, viewport: Rect) {
        self.viewport = viewport;
        let orientation = Orientation::for_viewport(viewport.width, self.config.breakpoint);
        if orientation != self.orientation {
            debug!(from = self.orientation.name(), to = orientation.name(), "orientation changed");
        }
        self.orientation = orientation;
        self.recompute_layout();
        self.buffer.request_layout();
        self.needs_redraw = true;
    }

    /// Run deferred work if a frame is due. Returns whether a frame ran.
    pub fn on_frame(&mut self, now: Instant) -> bool {
        if !self.clock.is_due(now) {
            return false;
        }
        self.clock.advance(now);
        self.frames += 1;

        if self.ratio.run_frame().is_some() {
            self.apply_ratio();
        }
        if self.marker.run_frame(&mut self.buffer).is_some() {
            self.needs_redraw = true;
        }
        if self.buffer.take_layout_request() {
            self.buffer
                .relayout(self.layout.editor.width, self.layout.editor.height);
            self.needs_redraw = true;
        }
        true
    }

    /// Execute the current buffer and report the outcome in the status bar
    pub fn run_code(&mut self) {
        let Some(snapshot) = self.buffer.snapshot() else {
            self.status_message = Some("Nothing to run".to_string());
            return;
        };

        let outcome = self.sandbox.run(&snapshot);
        self.status_message = Some(match outcome {
            RunOutcome::Completed { lines, elapsed } => {
                info!(lines, ?elapsed, "run completed");
                format!("Ran in {:.1?}, {} line(s) of output", elapsed, lines)
            }
            RunOutcome::Failed {
                message,
                position: Some((line, column)),
                ..
            } => {
                info!(%message, line, column, "run failed");
                format!("Error at {}:{}: {}", line, column, message)
            }
            RunOutcome::Failed { message, .. } => {
                info!(%message, "run failed");
                format!("Error: {}", message)
            }
        });
        self.needs_redraw = true;
    }

    /// Whether anything changed since the last call
    pub fn take_redraw(&mut self) -> bool {
        let output = self.output_changed.replace(false);
        std::mem::take(&mut self.needs_redraw) || output
    }

    /// How long the event loop may wait before calling [`App::on_frame`]
    pub fn time_until_next_frame(&self, now: Instant) -> Duration {
        self.clock.time_until_next(now)
    }

    pub fn ratio(&self) -> SplitRatio {
        self.ratio.ratio()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn layout(&self) -> &ComputedLayout {
        &self.layout
    }

    pub fn buffer(&self) -> &EditorBuffer {
        &self.buffer
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    pub fn marker(&self) -> &DecorationSync {
        &self.marker
    }

    pub fn is_dragging(&self) -> bool {
        self.ratio.is_dragging()
    }

    pub fn pointer_captured(&self) -> bool {
        self.pointer_captured
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    fn apply_capture(&mut self, capture: PointerCapture) {
        self.pointer_captured = capture == PointerCapture::Acquire;
        trace!(?capture, "pointer capture");
    }

    /// The ratio changed: resize the panes and re-layout the editor
    fn apply_ratio(&mut self) {
        self.recompute_layout();
        self.buffer.request_layout();
        self.needs_redraw = true;
    }

    fn recompute_layout(&mut self) {
        self.layout = ComputedLayout::compute(self.viewport, self.ratio.ratio(), self.orientation);
    }

    /// Render the UI
    pub fn render(&self, frame: &mut Frame) {
        let layout = &self.layout;

        let editor = EditorPane::new(&self.buffer).show_cursor(!self.show_help);
        frame.render_widget(&editor, layout.editor);

        self.render_divider(frame.buffer_mut(), layout.divider);

        if layout.console_visible() {
            let log = self.sandbox.log();
            let console = ConsolePane::new(&log, &self.config.placeholder);
            frame.render_widget(&console, layout.console);
        }

        self.render_status_bar(frame, layout.status);

        if self.show_help {
            frame.render_widget(&HelpOverlay, layout.container);
        }
    }

    fn render_divider(&self, buf: &mut Buffer, area: Rect) {
        let symbol = match self.orientation {
            Orientation::Horizontal => "│",
            Orientation::Vertical => "─",
        };
        let color = if self.is_dragging() {
            Color::Cyan
        } else {
            Color::DarkGray
        };
        for position in area.positions() {
            if let Some(cell) = buf.cell_mut(position) {
                cell.set_symbol(symbol).set_style(Style::default().fg(color));
            }
        }
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mut status = StatusContent::new()
            .name(APP_NAME)
            .orientation(self.orientation)
            .ratio(self.ratio())
            .state(self.sandbox.state().name());
        if let Some(msg) = &self.status_message {
            status = status.message(msg.as_str());
        }

        let style = Style::default().bg(Color::DarkGray).fg(Color::White);
        let paragraph = Paragraph::new(Line::from(Span::styled(status.format(area.width), style)));
        frame.render_widget(paragraph, area);
    }
}
