//! Per-sequence viewport state machine.
//!
//! A [`ViewportModel`] owns the visible genomic range, the zoom scale and
//! the alignment anchor of one sequence. All zoom, pan and align operations
//! mutate it; a fresh [`CoordinateMapper`] is derived after each change.
//!
//! Invalid input never raises: inverted ranges are swapped, out-of-range
//! values are clamped and unparsable text is discarded.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::coords::CoordinateMapper;
use crate::model::{Orientation, Sequence};

/// Zoom cap: the zoom level may not exceed `window_width * MAX_ZOOM_FACTOR` percent.
pub const MAX_ZOOM_FACTOR: f64 = 100.0;

/// Zoom floor: the window shows at most `MAX_ZOOM_OUT_FACTOR` times the
/// sequence length.
pub const MAX_ZOOM_OUT_FACTOR: f64 = 10.0;

/// Viewport coordinates are clamped to `±MAX_COORDINATE`, which keeps span
/// arithmetic in range and exact as `f64`.
pub const MAX_COORDINATE: i64 = 1 << 52;

fn clamp_coordinate(pos: i64) -> i64 {
    pos.clamp(-MAX_COORDINATE, MAX_COORDINATE)
}

/// Largest span a viewport can have.
const MAX_SPAN: i64 = 2 * MAX_COORDINATE + 1;

/// Which reference point stays put across zoom and resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Left screen edge is pinned
    Left,
    /// Right screen edge is pinned
    Right,
    /// The TSS stays at the same screen offset
    Tss,
    /// The centre is pinned
    #[default]
    None,
}

/// Snapshot of a viewport.
///
/// `start <= end` always holds; orientation only changes the mapping direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub start: i64,
    pub end: i64,
    /// Pixels per base
    pub scale: f64,
    pub orientation: Orientation,
    pub alignment: Alignment,
    /// Keep the viewport inside the sequence bounds
    pub constrained: bool,
    /// Scroll together with the other locked viewports
    pub scroll_locked: bool,
}

/// A point that must stay fixed when the scale or the window width changes.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Anchor {
    Start(i64),
    End(i64),
    Screen { pos: i64, x: f64 },
    Center(f64),
}

/// Bounds of the sequence a viewport belongs to.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SequenceBounds {
    start: i64,
    end: i64,
    tss: Option<i64>,
}

/// Zoom/pan/alignment state of one sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportModel {
    state: ViewportState,
    window_width: f64,
    bounds: SequenceBounds,
}

impl ViewportModel {
    /// Creates a viewport showing the whole sequence.
    pub fn new(sequence: &Sequence, window_width: f64) -> Self {
        let mut model = Self {
            state: ViewportState {
                start: sequence.start,
                end: sequence.end,
                scale: 1.0,
                orientation: sequence.orientation,
                alignment: Alignment::None,
                constrained: true,
                scroll_locked: false,
            },
            window_width: window_width.max(1.0),
            bounds: SequenceBounds {
                start: clamp_coordinate(sequence.start.min(sequence.end)),
                end: clamp_coordinate(sequence.end.max(sequence.start)),
                tss: sequence.tss.map(clamp_coordinate),
            },
        };
        model.zoom_to_fit();
        model
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn window_width(&self) -> f64 {
        self.window_width
    }

    /// Derives the coordinate mapper for the current state.
    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(&self.state, self.window_width)
    }

    /// Current zoom level in percent (100% = one pixel per base).
    pub fn zoom_level(&self) -> f64 {
        self.state.scale * 100.0
    }

    /// Highest allowed zoom level in percent.
    pub fn max_zoom_level(&self) -> f64 {
        self.window_width * MAX_ZOOM_FACTOR
    }

    /// Lowest allowed zoom level in percent.
    pub fn min_zoom_level(&self) -> f64 {
        let length = (self.bounds.end - self.bounds.start + 1) as f64;
        self.window_width * 100.0 / (length * MAX_ZOOM_OUT_FACTOR)
    }

    pub fn set_constrained(&mut self, constrained: bool) {
        self.state.constrained = constrained;
        if constrained {
            self.keep_in_bounds();
        }
    }

    pub fn set_scroll_locked(&mut self, locked: bool) {
        self.state.scroll_locked = locked;
    }

    /// Number of bases the window shows at the current scale.
    fn span_for_scale(&self) -> i64 {
        (self.window_width / self.state.scale)
            .round()
            .clamp(1.0, MAX_SPAN as f64) as i64
    }

    fn current_span(&self) -> i64 {
        self.state.end - self.state.start + 1
    }

    fn place_from_start(&mut self, start: i64, span: i64) {
        let span = span.clamp(1, MAX_SPAN);
        let start = start.clamp(-MAX_COORDINATE, MAX_COORDINATE - span + 1);
        self.state.start = start;
        self.state.end = start + span - 1;
    }

    fn place_from_end(&mut self, end: i64, span: i64) {
        let span = span.clamp(1, MAX_SPAN);
        let end = end.clamp(-MAX_COORDINATE + span - 1, MAX_COORDINATE);
        self.state.end = end;
        self.state.start = end - span + 1;
    }

    /// Moves the range by `shift` bases, stopping at the coordinate limits.
    fn shift_by(&mut self, shift: i64) {
        let shift = shift.clamp(
            -MAX_COORDINATE - self.state.start,
            MAX_COORDINATE - self.state.end,
        );
        self.state.start += shift;
        self.state.end += shift;
    }

    fn place_center(&mut self, center: f64, span: i64) {
        let start = (center - (span - 1) as f64 / 2.0).round() as i64;
        self.place_from_start(start, span);
    }

    /// Clamps a directly assigned range into the sequence, preserving the
    /// span where possible.
    fn clamp_range(&self, start: i64, end: i64) -> (i64, i64) {
        let span = end - start + 1;
        let (lo, hi) = (self.bounds.start, self.bounds.end);
        if span >= hi - lo + 1 {
            (lo, hi)
        } else if start < lo {
            (lo, lo + span - 1)
        } else if end > hi {
            (hi - span + 1, hi)
        } else {
            (start, end)
        }
    }

    /// Shifts the viewport, without rescaling, so it stays inside the
    /// sequence, or covers all of it when it is wider.
    fn keep_in_bounds(&mut self) {
        if !self.state.constrained {
            return;
        }
        let (lo, hi) = (self.bounds.start, self.bounds.end);
        let span = self.current_span();
        let shift = if span >= hi - lo + 1 {
            if self.state.start > lo {
                lo - self.state.start
            } else if self.state.end < hi {
                hi - self.state.end
            } else {
                0
            }
        } else if self.state.start < lo {
            lo - self.state.start
        } else if self.state.end > hi {
            hi - self.state.end
        } else {
            0
        };
        self.shift_by(shift);
    }

    /// The point the current alignment pins, measured before a change.
    fn anchor(&self) -> Anchor {
        let center = (self.state.start + self.state.end) as f64 / 2.0;
        let orientation = self.state.orientation;
        match self.state.alignment {
            Alignment::Left => match orientation {
                Orientation::Direct => Anchor::Start(self.state.start),
                Orientation::Reverse => Anchor::End(self.state.end),
            },
            Alignment::Right => match orientation {
                Orientation::Direct => Anchor::End(self.state.end),
                Orientation::Reverse => Anchor::Start(self.state.start),
            },
            Alignment::Tss => match self.bounds.tss {
                Some(pos) => Anchor::Screen {
                    pos,
                    x: self.mapper().genomic_to_screen(pos),
                },
                None => Anchor::Center(center),
            },
            Alignment::None => Anchor::Center(center),
        }
    }

    /// Repositions the range for the current scale and window width.
    fn reapply(&mut self, anchor: Anchor) {
        let span = self.span_for_scale();
        match anchor {
            Anchor::Start(start) => self.place_from_start(start, span),
            Anchor::End(end) => self.place_from_end(end, span),
            Anchor::Screen { pos, x } => {
                let offset = (x / self.state.scale).round() as i64;
                match self.state.orientation {
                    Orientation::Direct => self.place_from_start(pos.saturating_sub(offset), span),
                    Orientation::Reverse => self.place_from_end(pos.saturating_add(offset), span),
                }
            }
            Anchor::Center(center) => self.place_center(center, span),
        }
        self.keep_in_bounds();
    }

    /// Shows exactly `start..=end`. Inverted input is swapped and
    /// coordinates beyond [`MAX_COORDINATE`] are clamped.
    pub fn set_viewport(&mut self, start: i64, end: i64) {
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        let (start, end) = (clamp_coordinate(start), clamp_coordinate(end));
        let (start, end) = if self.state.constrained {
            self.clamp_range(start, end)
        } else {
            (start, end)
        };
        self.state.start = start;
        self.state.end = end;
        self.state.scale = self.window_width / (end - start + 1) as f64;
    }

    /// Sets the zoom level in percent, kept between
    /// [`Self::min_zoom_level`] and [`Self::max_zoom_level`], then reapplies
    /// the alignment anchor.
    pub fn zoom_to_level(&mut self, percent: f64) {
        if !percent.is_finite() || percent <= 0.0 {
            log::debug!("zoom_to_level: ignoring invalid level {}", percent);
            return;
        }
        let percent = percent.max(self.min_zoom_level()).min(self.max_zoom_level());
        let anchor = self.anchor();
        self.state.scale = percent / 100.0;
        self.reapply(anchor);
    }

    /// Multiplies the zoom level by `step`.
    pub fn zoom_in(&mut self, step: f64) {
        self.zoom_to_level(self.zoom_level() * step);
    }

    /// Divides the zoom level by `step`.
    pub fn zoom_out(&mut self, step: f64) {
        self.zoom_to_level(self.zoom_level() / step);
    }

    /// Fits the whole sequence in the window.
    pub fn zoom_to_fit(&mut self) {
        self.state.start = self.bounds.start;
        self.state.end = self.bounds.end;
        self.state.scale = self.window_width / (self.bounds.end - self.bounds.start + 1) as f64;
    }

    /// Scrolls by a fraction of the window (`is_fraction`) or by a number of
    /// bases. Positive amounts move right on screen in either orientation.
    pub fn move_by(&mut self, amount: f64, is_fraction: bool) {
        if !amount.is_finite() {
            return;
        }
        let limit = MAX_SPAN as f64;
        let bases = if is_fraction {
            let raw = (self.window_width / self.state.scale * amount)
                .round()
                .clamp(-limit, limit) as i64;
            if raw == 0 && amount != 0.0 {
                amount.signum() as i64
            } else {
                raw
            }
        } else {
            amount.round().clamp(-limit, limit) as i64
        };
        let shift = match self.state.orientation {
            Orientation::Direct => bases,
            Orientation::Reverse => -bases,
        };
        self.shift_by(shift);
        self.keep_in_bounds();
    }

    /// Shows the end of the sequence that is drawn on the left.
    pub fn move_to_left_end(&mut self) {
        let span = self.current_span();
        match self.state.orientation {
            Orientation::Direct => self.place_from_start(self.bounds.start, span),
            Orientation::Reverse => self.place_from_end(self.bounds.end, span),
        }
        self.keep_in_bounds();
    }

    /// Shows the end of the sequence that is drawn on the right.
    pub fn move_to_right_end(&mut self) {
        let span = self.current_span();
        match self.state.orientation {
            Orientation::Direct => self.place_from_end(self.bounds.end, span),
            Orientation::Reverse => self.place_from_start(self.bounds.start, span),
        }
        self.keep_in_bounds();
    }

    pub fn align_left(&mut self) {
        self.state.alignment = Alignment::Left;
        self.move_to_left_end();
    }

    pub fn align_right(&mut self) {
        self.state.alignment = Alignment::Right;
        self.move_to_right_end();
    }

    /// Centres the TSS. Sequences without a TSS are centred instead.
    pub fn align_tss(&mut self) {
        self.state.alignment = Alignment::Tss;
        let span = self.current_span();
        match self.bounds.tss {
            Some(tss) => self.place_center(tss as f64, span),
            None => {
                log::debug!("align_tss: sequence has no TSS, centring instead");
                self.place_center(self.sequence_center(), span);
            }
        }
        self.keep_in_bounds();
    }

    /// Centres the sequence.
    pub fn align_none(&mut self) {
        self.state.alignment = Alignment::None;
        let span = self.current_span();
        self.place_center(self.sequence_center(), span);
        self.keep_in_bounds();
    }

    /// Applies an alignment by tag.
    pub fn align(&mut self, alignment: Alignment) {
        match alignment {
            Alignment::Left => self.align_left(),
            Alignment::Right => self.align_right(),
            Alignment::Tss => self.align_tss(),
            Alignment::None => self.align_none(),
        }
    }

    fn sequence_center(&self) -> f64 {
        (self.bounds.start + self.bounds.end) as f64 / 2.0
    }

    /// Recomputes the bounds for a new window width, keeping the scale and
    /// the alignment anchor.
    pub fn resize(&mut self, window_width: f64) {
        if !window_width.is_finite() {
            return;
        }
        let anchor = self.anchor();
        self.window_width = window_width.max(1.0);
        self.reapply(anchor);
    }

    /// Switches between direct and reverse display. The range is unchanged.
    pub fn flip_orientation(&mut self) {
        self.state.orientation = self.state.orientation.flipped();
    }

    /// Applies a range typed by the user, e.g. `1000-2000` or
    /// `chr1:1,000..2,000`. Returns false, leaving the state untouched, if
    /// the text cannot be parsed.
    pub fn apply_viewport_input(&mut self, input: &str) -> bool {
        match parse_range(input) {
            Some((start, end)) => {
                self.set_viewport(start, end);
                true
            }
            None => {
                log::debug!("apply_viewport_input: discarding {:?}", input);
                false
            }
        }
    }

    /// Applies a zoom level typed by the user, e.g. `250` or `250%`.
    pub fn apply_zoom_input(&mut self, input: &str) -> bool {
        match parse_zoom(input) {
            Some(level) => {
                self.zoom_to_level(level);
                true
            }
            None => {
                log::debug!("apply_zoom_input: discarding {:?}", input);
                false
            }
        }
    }
}

/// Parses `start-end` or `start..end`, with an optional `name:` prefix and
/// thousands separators.
pub fn parse_range(input: &str) -> Option<(i64, i64)> {
    let text: String = input.trim().chars().filter(|c| *c != ',' && *c != '_').collect();
    let text = match text.rsplit_once(':') {
        Some((_, coordinates)) => coordinates.to_string(),
        None => text,
    };
    let (start, end) = text
        .split_once("..")
        .or_else(|| text.split_once('-'))?;
    let start = start.trim().parse::<i64>().ok()?;
    let end = end.trim().parse::<i64>().ok()?;
    Some((start, end))
}

/// Parses a positive zoom percentage, with an optional `%` suffix.
pub fn parse_zoom(input: &str) -> Option<f64> {
    let text = input.trim();
    let text = text.strip_suffix('%').unwrap_or(text).trim();
    let level = text.parse::<f64>().ok()?;
    (level.is_finite() && level > 0.0).then_some(level)
}

/// Defaults applied to newly created viewports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportDefaults {
    pub alignment: Alignment,
    pub constrained: bool,
}

impl Default for ViewportDefaults {
    fn default() -> Self {
        Self {
            alignment: Alignment::None,
            constrained: true,
        }
    }
}

/// Lazily created viewports, one per sequence.
#[derive(Debug, Clone)]
pub struct ViewportRegistry {
    viewports: HashMap<String, ViewportModel>,
    window_width: f64,
    defaults: ViewportDefaults,
}

impl ViewportRegistry {
    pub fn new(window_width: f64, defaults: ViewportDefaults) -> Self {
        Self {
            viewports: HashMap::new(),
            window_width: window_width.max(1.0),
            defaults,
        }
    }

    pub fn window_width(&self) -> f64 {
        self.window_width
    }

    pub fn set_defaults(&mut self, defaults: ViewportDefaults) {
        self.defaults = defaults;
    }

    /// Returns the viewport of a sequence, creating it on first access.
    pub fn get_or_create(&mut self, sequence: &Sequence) -> &mut ViewportModel {
        let window_width = self.window_width;
        let defaults = self.defaults;
        self.viewports.entry(sequence.name.clone()).or_insert_with(|| {
            let mut model = ViewportModel::new(sequence, window_width);
            model.set_constrained(defaults.constrained);
            if defaults.alignment != Alignment::None {
                model.align(defaults.alignment);
            }
            log::debug!("created viewport for {}", sequence.name);
            model
        })
    }

    pub fn get(&self, name: &str) -> Option<&ViewportModel> {
        self.viewports.get(name)
    }

    /// Resizes every existing viewport.
    pub fn resize(&mut self, window_width: f64) {
        self.window_width = window_width.max(1.0);
        for model in self.viewports.values_mut() {
            model.resize(self.window_width);
        }
    }

    /// Scrolls a sequence. If its viewport is scroll-locked, every locked
    /// viewport scrolls with it.
    pub fn move_by(&mut self, sequence: &Sequence, amount: f64, is_fraction: bool) {
        let locked = self.get_or_create(sequence).state().scroll_locked;
        if locked {
            for model in self.viewports.values_mut().filter(|m| m.state().scroll_locked) {
                model.move_by(amount, is_fraction);
            }
        } else {
            self.get_or_create(sequence).move_by(amount, is_fraction);
        }
    }

    /// Drops viewports whose sequence is no longer present.
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.viewports.retain(|name, _| keep(name));
    }

    pub fn clear(&mut self) {
        self.viewports.clear();
    }
}
