//! TUI rendering module.
//!
//! This module handles all visual rendering using ratatui:
//! - Track names on the left, tracks of the selected sequence on the right
//! - A ruler with genomic positions
//! - Region, numeric and sequence tracks painted from render plans
//! - Status bar with viewport and mode info
//! - Help overlay
//!
//! One terminal cell is one screen unit for the layout code, so the track
//! panel width is the window width of every viewport.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::color::Rgba;
use crate::model::{AppMode, AppState};
use crate::planner::{BasePlan, Bounds, ColumnPlan, RenderPlan};
use crate::view::TrackPlan;
use crate::viewport::Alignment;

/// Width reserved for track names (including border and padding).
const NAME_PANEL_WIDTH: u16 = 20;
/// Minimum width for the track panel.
const MIN_TRACK_PANEL_WIDTH: u16 = 10;
/// Height of the status bar.
const STATUS_BAR_HEIGHT: u16 = 1;
/// Spacing of ruler ticks, in cells.
const RULER_STEP: usize = 10;
/// Partial blocks used for numeric columns, in eighths.
const EIGHTHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

const HELP_TEXT: &str = "\
h/l or ←/→  scroll left/right
j/k or ↓/↑  next/previous sequence
+/-  zoom in/out, f  fit the whole sequence
0/$  go to the left/right end
L R T C  align left, right, on the TSS, centred
r  flip orientation, s  toggle scroll lock, e  expand/contract region tracks
:zoom 250%  :goto 1000-2000  :align tss  :seq <name>  :labels  :w (save settings)  :q
Press any key to close this help.";

fn to_color(color: Rgba) -> Color {
    Color::Rgb(color.r, color.g, color.b)
}

/// Character grid the plans are painted on.
struct Canvas {
    width: usize,
    height: usize,
    cells: Vec<(char, Style)>,
}

impl Canvas {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![(' ', Style::default()); width * height],
        }
    }

    fn set(&mut self, x: i64, y: i64, c: char, style: Style) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        self.cells[y as usize * self.width + x as usize] = (c, style);
    }

    /// Cells covered by `bounds`, at least one in each direction.
    fn cell_span(start: f64, size: f64) -> (i64, i64) {
        let first = start.floor() as i64;
        let last = ((start + size).ceil() as i64).max(first + 1);
        (first, last)
    }

    fn fill(&mut self, bounds: &Bounds, y_offset: i64, c: char, style: Style) {
        let (x0, x1) = Self::cell_span(bounds.x, bounds.width);
        let (y0, y1) = Self::cell_span(bounds.y, bounds.height);
        for y in y0..y1 {
            for x in x0..x1 {
                self.set(x, y + y_offset, c, style);
            }
        }
    }

    fn text(&mut self, x: i64, y: i64, text: &str, max_len: usize, style: Style) {
        for (i, c) in text.chars().take(max_len).enumerate() {
            self.set(x + i as i64, y, c, style);
        }
    }

    fn into_lines(self) -> Vec<Line<'static>> {
        self.cells
            .chunks(self.width.max(1))
            .take(self.height)
            .map(|row| {
                Line::from(
                    row.iter()
                        .map(|(c, style)| Span::styled(c.to_string(), *style))
                        .collect::<Vec<_>>(),
                )
            })
            .collect()
    }
}

fn paint_region(canvas: &mut Canvas, plan: &RenderPlan, y_offset: i64) {
    let fill = Style::default().fg(Color::Black).bg(to_color(plan.color));
    if !plan.color.is_transparent() {
        canvas.fill(&plan.bounds, y_offset, plan.direction.arrow(), fill);
    }

    if let Some(logo) = &plan.logo {
        let per_base = plan.bounds.width / logo.len().max(1) as f64;
        if per_base >= 1.0 {
            for (i, color) in logo.iter().enumerate() {
                let x = (plan.bounds.x + i as f64 * per_base).floor() as i64;
                canvas.set(x, plan.bounds.y.floor() as i64 + y_offset, '▀', fill.fg(to_color(*color)));
            }
        }
    }

    for child in &plan.children {
        let style = Style::default().fg(Color::Black).bg(to_color(child.color));
        canvas.fill(&child.bounds, y_offset, '■', style);
    }

    if let Some(border) = plan.border {
        let style = Style::default().fg(to_color(border)).bg(to_color(plan.color));
        let (x0, x1) = Canvas::cell_span(plan.bounds.x, plan.bounds.width);
        let y = plan.bounds.y.floor() as i64 + y_offset;
        canvas.set(x0, y, '[', style);
        canvas.set(x1 - 1, y, ']', style);
    }

    if let Some(label) = &plan.label {
        let (x0, x1) = Canvas::cell_span(plan.bounds.x, plan.bounds.width);
        let room = (x1 - x0 - 2).max(0) as usize;
        if room >= label.text.chars().count() {
            let style = fill.fg(to_color(label.color)).add_modifier(Modifier::BOLD);
            canvas.text(x0 + 1, plan.bounds.y.floor() as i64 + y_offset, &label.text, room, style);
        }
    }

    if let Some(overlay) = &plan.overlay {
        let style = Style::default().fg(to_color(overlay.color)).add_modifier(Modifier::BOLD);
        canvas.set(
            overlay.bounds.x.floor() as i64,
            overlay.bounds.y.floor() as i64 + y_offset,
            overlay.glyph,
            style,
        );
    }
}

fn paint_columns(canvas: &mut Canvas, columns: &[ColumnPlan], y_offset: i64, height: i64) {
    let style = Style::default().fg(Color::Cyan);
    for column in columns {
        let eighths = (column.height * 8.0).round() as i64;
        let x = column.x.floor() as i64;
        for row in 0..height {
            let filled = (eighths - row * 8).clamp(0, 8);
            if filled > 0 {
                canvas.set(x, y_offset + height - 1 - row, EIGHTHS[filled as usize - 1], style);
            }
        }
    }
}

fn paint_bases(canvas: &mut Canvas, bases: &[BasePlan], y_offset: i64) {
    for base in bases {
        let style = Style::default().fg(Color::Black).bg(to_color(base.color));
        let x0 = base.x.floor() as i64;
        let x1 = ((base.x + base.width).floor() as i64).max(x0 + 1);
        for x in x0..x1 {
            let c = if x == x0 { base.base } else { ' ' };
            canvas.set(x, y_offset, c, style);
        }
    }
}

/// Ruler line with a genomic position every [`RULER_STEP`] cells.
fn ruler(state: &mut AppState, sequence: &str, width: usize) -> Line<'static> {
    let Some(mapper) = state.view.mapper(sequence) else {
        return Line::default();
    };
    let mut text = vec![' '; width];
    for x in (0..width).step_by(RULER_STEP) {
        let (pos, _) = mapper.screen_to_genomic_range(x as f64);
        let label = format!("|{}", pos);
        if x + label.len() > width {
            break;
        }
        for (i, c) in label.chars().enumerate() {
            text[x + i] = c;
        }
    }
    Line::from(Span::styled(
        text.into_iter().collect::<String>(),
        Style::default().fg(Color::DarkGray),
    ))
}

/// Renders the complete UI.
pub fn render(frame: &mut Frame, state: &mut AppState) {
    let area = frame.area();

    // Main layout: content area + status bar
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(STATUS_BAR_HEIGHT)])
        .split(area);

    let content_area = main_layout[0];
    let status_area = main_layout[1];

    // Split content area: names panel (left) + track panel (right)
    let content_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(NAME_PANEL_WIDTH),
            Constraint::Min(MIN_TRACK_PANEL_WIDTH),
        ])
        .split(content_area);

    render_tracks(frame, state, content_layout[0], content_layout[1]);
    render_status_bar(frame, state, status_area);

    if state.show_help {
        render_help(frame, area);
    }
}

/// Renders the names panel and the tracks of the selected sequence.
fn render_tracks(frame: &mut Frame, state: &mut AppState, names_area: Rect, tracks_area: Rect) {
    let width = tracks_area.width.saturating_sub(2) as usize;
    let height = tracks_area.height.saturating_sub(2) as usize;
    let mut names: Vec<Line> = Vec::new();
    let mut lines: Vec<Line> = Vec::new();

    let title = match (state.loading.clone(), state.current_sequence()) {
        (Some(progress), _) => {
            lines.push(Line::from(progress));
            "Loading".to_string()
        }
        (None, None) => {
            lines.push(Line::from("No sequences"));
            "Tracks".to_string()
        }
        (None, Some(sequence)) => {
            names.push(Line::from(Span::styled(
                sequence.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines.push(ruler(state, &sequence, width));

            let tracks: Vec<String> = state
                .view
                .store()
                .tracks()
                .iter()
                .map(|t| t.name().to_string())
                .collect();
            let mut repaint = false;
            for track in tracks {
                let used = lines.len();
                if used >= height {
                    break;
                }
                let track_height = (state.view.track_height(&track, &sequence).ceil() as usize)
                    .min(height - used)
                    .max(1);
                let Some(clip) = state.view.clip_window(&sequence, 0.0, track_height as f64) else {
                    break;
                };

                let mut canvas = Canvas::new(width, track_height);
                match state.view.plan_track(&track, &sequence, &clip) {
                    Some(TrackPlan::Regions(output)) => {
                        repaint |= output.repaint_requested;
                        for plan in &output.plans {
                            paint_region(&mut canvas, plan, 0);
                        }
                    }
                    Some(TrackPlan::Numeric(columns)) => {
                        paint_columns(&mut canvas, &columns, 0, track_height as i64)
                    }
                    Some(TrackPlan::Bases(bases)) => paint_bases(&mut canvas, &bases, 0),
                    None => {}
                }

                let max_name_len = NAME_PANEL_WIDTH.saturating_sub(3) as usize;
                names.push(Line::from(Span::styled(
                    truncate_name(&track, max_name_len),
                    Style::default().fg(Color::White),
                )));
                names.extend((1..track_height).map(|_| Line::default()));
                lines.extend(canvas.into_lines());
            }
            state.repaint_requested |= repaint;

            let viewport = state.view.viewport(&sequence);
            match viewport {
                Some(v) => format!("{} [{}-{}] ({})", sequence, v.start, v.end, v.orientation),
                None => sequence,
            }
        }
    };

    let names_block = Block::default().borders(Borders::ALL).title("Tracks");
    frame.render_widget(Paragraph::new(names).block(names_block), names_area);

    let block = Block::default().borders(Borders::ALL).title(title);
    frame.render_widget(Paragraph::new(lines).block(block), tracks_area);
}

/// Shortens a track name to `max_len` characters with an ellipsis.
fn truncate_name(name: &str, max_len: usize) -> String {
    if name.chars().count() <= max_len {
        name.to_string()
    } else {
        let kept: String = name.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

/// Renders the status bar at the bottom.
fn render_status_bar(frame: &mut Frame, state: &mut AppState, area: Rect) {
    let (mode_str, command_str) = match &state.mode {
        AppMode::Normal => ("NORMAL", String::new()),
        AppMode::Command(cmd) => ("COMMAND", format!(":{}", cmd)),
    };

    let position_info = match state.current_sequence() {
        Some(sequence) => {
            let count = state.view.store().sequences().len();
            match state.view.viewport(&sequence) {
                Some(v) => format!(
                    "Seq {}/{} | {:.1}% | {}{} ",
                    state.current + 1,
                    count,
                    v.scale * 100.0,
                    alignment_tag(v.alignment),
                    if v.scroll_locked { " | locked" } else { "" }
                ),
                None => String::new(),
            }
        }
        None => String::new(),
    };

    // Show status message if present
    let message = state.status_message.as_deref().unwrap_or("");

    let left_content = if command_str.is_empty() {
        format!(" {} | {} ", mode_str, message)
    } else {
        format!(" {} | {} ", mode_str, command_str)
    };

    let left_len = left_content.chars().count();
    let status_line = Line::from(vec![
        Span::styled(left_content, Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::styled(
            " ".repeat((area.width as usize).saturating_sub(left_len + position_info.len())),
            Style::default().bg(Color::Cyan),
        ),
        Span::styled(
            position_info,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
    ]);

    frame.render_widget(Paragraph::new(status_line), area);
}

fn alignment_tag(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Left => "align left",
        Alignment::Right => "align right",
        Alignment::Tss => "align TSS",
        Alignment::None => "centred",
    }
}

/// Wraps the help text to the given width.
fn help_lines(width: usize) -> Vec<String> {
    HELP_TEXT
        .lines()
        .flat_map(|line| {
            textwrap::wrap(line, width.max(10))
                .into_iter()
                .map(|l| l.into_owned())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Renders the help overlay centred over `area`.
fn render_help(frame: &mut Frame, area: Rect) {
    let width = area.width.saturating_sub(8).clamp(20, 80);
    let lines = help_lines(width.saturating_sub(4) as usize);
    let height = (lines.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height,
    };

    let text: Vec<Line> = lines.into_iter().map(Line::from).collect();
    let block = Block::default().borders(Borders::ALL).title("Help");
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(text).block(block), popup);
}

/// Calculates the track panel width in cells for a terminal size.
pub fn calculate_track_width(terminal_width: u16) -> usize {
    // Names panel plus the two borders of the track panel
    terminal_width.saturating_sub(NAME_PANEL_WIDTH + 2).max(1) as usize
}
