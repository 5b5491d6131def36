//! Per-region render planning.
//!
//! The planner turns the regions of one (track, sequence) pair into a list
//! of [`RenderPlan`]s: screen bounds, draw direction, colours, label, logo,
//! overlay and nested children. Front ends only have to paint the plans.
//!
//! Regions are rejected as early as possible: first on their genomic span,
//! then (in expanded mode) on their row band, before any horizontal maths.

use crate::color::{base_color, Rgba};
use crate::coords::CoordinateMapper;
use crate::filter::{Filter, Overlay, RegionVisualizationFilter};
use crate::model::{NumericTrack, Orientation, Region, RegionId, RegionSource, Sequence, Strand};
use crate::packer::RowAssignment;
use crate::settings::Settings;

/// A screen rectangle, relative to the top-left corner of the track.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Direction a region is drawn in, relative to the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawDirection {
    Direct,
    Reverse,
    Indeterminate,
}

impl DrawDirection {
    /// `Direct` if the strand matches the display orientation, `Reverse` if
    /// it is the opposite, `Indeterminate` if the strand is unknown.
    pub fn of(strand: Strand, display: Orientation) -> Self {
        match strand.orientation() {
            Some(orientation) if orientation == display => DrawDirection::Direct,
            Some(_) => DrawDirection::Reverse,
            None => DrawDirection::Indeterminate,
        }
    }

    /// Arrow glyph pointing in the drawn direction.
    pub fn arrow(self) -> char {
        match self {
            DrawDirection::Direct => '>',
            DrawDirection::Reverse => '<',
            DrawDirection::Indeterminate => '=',
        }
    }
}

/// The visible part of a track: a genomic range and a vertical band.
///
/// Rebuilt for every paint, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipWindow {
    pub start: i64,
    pub end: i64,
    pub top: f64,
    pub bottom: f64,
}

impl ClipWindow {
    /// Clip window covering the screen columns `[left, right)` and the
    /// vertical band `[top, bottom)`.
    pub fn from_screen(mapper: &CoordinateMapper, left: f64, right: f64, top: f64, bottom: f64) -> Self {
        let (a_start, a_end) = mapper.screen_to_genomic_range(left);
        let (b_start, b_end) = mapper.screen_to_genomic_range((right - 1.0).max(left));
        Self {
            start: a_start.min(b_start),
            end: a_end.max(b_end),
            top,
            bottom,
        }
    }
}

/// How a region track is laid out vertically.
#[derive(Debug, Clone, Copy)]
pub enum LayoutMode<'a> {
    /// All regions share one band, split by score and strand
    Contracted,
    /// One row per packed region
    Expanded(&'a RowAssignment),
}

/// Everything the planner reads for one pass.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    pub track: &'a str,
    pub sequence: &'a Sequence,
    pub mapper: CoordinateMapper,
    pub settings: &'a Settings,
    pub filter: Option<&'a Filter>,
    pub layout: LayoutMode<'a>,
    /// Height of the track in contracted mode
    pub track_height: f64,
    /// Highest score of the track, used to scale score bars
    pub max_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub color: Rgba,
}

/// How to draw one region.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub id: RegionId,
    pub kind: String,
    pub bounds: Bounds,
    pub direction: DrawDirection,
    pub color: Rgba,
    pub border: Option<Rgba>,
    pub label: Option<Label>,
    /// One colour per residue
    pub logo: Option<Vec<Rgba>>,
    pub overlay: Option<Overlay>,
    pub children: Vec<RenderPlan>,
}

/// Result of planning one track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanOutput {
    pub plans: Vec<RenderPlan>,
    /// Some regions could not be read during this pass
    pub failed: bool,
    /// The caller should schedule one more paint
    pub repaint_requested: bool,
}

/// One screen column of a numeric track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnPlan {
    pub x: f64,
    /// Largest value over the bases under the column
    pub value: f64,
    pub height: f64,
}

/// One residue of a sequence track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BasePlan {
    pub x: f64,
    pub width: f64,
    pub base: char,
    pub color: Rgba,
}

/// Top and bottom of an expanded row.
pub fn row_bounds(row: usize, row_height: f64, row_spacing: f64, y_offset: f64) -> (f64, f64) {
    let top = y_offset + row as f64 * (row_height + row_spacing);
    (top, top + row_height)
}

/// Plans region tracks.
///
/// Holds the error flag of the previous pass so that a failing pass asks for
/// exactly one retry.
#[derive(Debug, Clone, Default)]
pub struct TrackRenderPlanner {
    failed_last_pass: bool,
}

impl TrackRenderPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plans every region of the context's track that intersects `clip`.
    ///
    /// A region that cannot be read is skipped. The first failing pass sets
    /// `repaint_requested`; consecutive failing passes do not.
    pub fn plan_regions<S>(&mut self, ctx: &PlanContext<'_>, source: &S, clip: &ClipWindow) -> PlanOutput
    where
        S: RegionSource + ?Sized,
    {
        let mut output = PlanOutput::default();

        for id in source.region_ids(ctx.track, &ctx.sequence.name) {
            let Some(region) = source.region(id) else {
                log::warn!("{}/{}: region {} vanished while planning", ctx.track, ctx.sequence.name, id);
                output.failed = true;
                continue;
            };
            if let Some(plan) = plan_region(ctx, region, clip) {
                output.plans.push(plan);
            }
        }

        output.repaint_requested = output.failed && !self.failed_last_pass;
        self.failed_last_pass = output.failed;
        output
    }
}

/// Vertical band of a region in contracted mode.
fn contracted_band(ctx: &PlanContext<'_>, region: &Region, direction: DrawDirection) -> (f64, f64) {
    let layout = &ctx.settings.layout;
    let display = &ctx.settings.display;
    let top = layout.top_margin as f64;
    let usable = (ctx.track_height - layout.margins() as f64).max(1.0);
    let half = usable / 2.0;
    let fraction = if ctx.max_score > 0.0 && region.score.is_finite() {
        (region.score / ctx.max_score).clamp(0.0, 1.0)
    } else {
        1.0
    };

    match (display.show_score, display.show_strand) {
        (true, true) => {
            let height = (half * fraction).max(1.0).min(half.max(1.0));
            match direction {
                DrawDirection::Direct => (top + half - height, height),
                DrawDirection::Reverse => (top + half, height),
                DrawDirection::Indeterminate => (top + half - height, 2.0 * height),
            }
        }
        (false, true) => match direction {
            DrawDirection::Direct => (top, half),
            DrawDirection::Reverse => (top + half, half),
            DrawDirection::Indeterminate => (top, usable),
        },
        (true, false) => {
            let height = (usable * fraction).max(1.0);
            if display.flip_score_bars {
                (top, height)
            } else {
                (top + usable - height, height)
            }
        }
        (false, false) => (top, usable),
    }
}

fn horizontal(mapper: &CoordinateMapper, region: &Region) -> (f64, f64) {
    let (left, right) = mapper.span_to_screen(region.start, region.end);
    (left, right - left)
}

fn logo_colors(ctx: &PlanContext<'_>, region: &Region) -> Option<Vec<Rgba>> {
    if !ctx.settings.display.show_logos {
        return None;
    }
    let residues = region.residues.as_ref()?;
    let span = usize::try_from(region.len()).ok()?;
    if residues.chars().count() != span {
        log::debug!(
            "{}: {} residues for a span of {}, logo suppressed",
            region.id,
            residues.chars().count(),
            span
        );
        return None;
    }
    let colors = ctx
        .filter
        .and_then(|f| f.dynamic_motif_logo_colors(region))
        .unwrap_or_else(|| residues.chars().map(base_color).collect());
    (colors.len() == span).then_some(colors)
}

fn plan_region(ctx: &PlanContext<'_>, region: &Region, clip: &ClipWindow) -> Option<RenderPlan> {
    if !region.overlaps(clip.start, clip.end) {
        return None;
    }

    let direction = DrawDirection::of(region.strand, ctx.mapper.orientation());
    let (y, height) = match ctx.layout {
        LayoutMode::Expanded(rows) => {
            let layout = &ctx.settings.layout;
            let (top, bottom) = row_bounds(
                rows.row(region.id)?,
                layout.region_height as f64,
                layout.row_spacing as f64,
                layout.top_margin as f64,
            );
            if bottom <= clip.top || top >= clip.bottom {
                return None;
            }
            (top, bottom - top)
        }
        LayoutMode::Contracted => contracted_band(ctx, region, direction),
    };

    if let Some(filter) = ctx.filter {
        if !filter.should_visualize_region(region) {
            return None;
        }
    }
    let color = ctx
        .filter
        .and_then(|f| f.dynamic_region_color(region))
        .unwrap_or_else(|| ctx.settings.color_for_type(&region.kind));
    let draws_overlay = ctx.filter.is_some_and(|f| f.draws_overlay(region));
    if color.is_transparent() && !draws_overlay {
        return None;
    }

    let (x, width) = horizontal(&ctx.mapper, region);
    let bounds = Bounds { x, y, width, height };

    let border = ctx
        .filter
        .and_then(|f| f.dynamic_region_border_color(region))
        .or(Some(ctx.settings.colors.border))
        .filter(|c| !c.is_transparent());

    let label = ctx.settings.display.show_labels.then(|| Label {
        text: region.kind.clone(),
        color: ctx
            .filter
            .and_then(|f| f.dynamic_region_label_color(region))
            .unwrap_or(ctx.settings.colors.label),
    });

    let overlay = if draws_overlay {
        ctx.filter.and_then(|f| f.draw_overlay(region, &bounds))
    } else {
        None
    };

    let children = region
        .children
        .iter()
        .filter_map(|child| plan_child(ctx, child, clip, &bounds, color, border))
        .collect();

    Some(RenderPlan {
        id: region.id,
        kind: region.kind.clone(),
        bounds,
        direction,
        color,
        border,
        label,
        logo: logo_colors(ctx, region),
        overlay,
        children,
    })
}

/// Children share the vertical band of their parent. Unless nested regions
/// are filtered independently they also take the parent's colours.
fn plan_child(
    ctx: &PlanContext<'_>,
    child: &Region,
    clip: &ClipWindow,
    parent: &Bounds,
    parent_color: Rgba,
    parent_border: Option<Rgba>,
) -> Option<RenderPlan> {
    if !child.overlaps(clip.start, clip.end) {
        return None;
    }

    let independent = ctx.settings.display.filter_nested_independently;
    let (color, border, draws_overlay) = match ctx.filter {
        Some(filter) if independent => {
            if !filter.should_visualize_region(child) {
                return None;
            }
            let color = filter
                .dynamic_region_color(child)
                .unwrap_or_else(|| ctx.settings.color_for_type(&child.kind));
            let border = filter.dynamic_region_border_color(child).or(parent_border);
            (color, border, filter.draws_overlay(child))
        }
        None if independent => (ctx.settings.color_for_type(&child.kind), parent_border, false),
        _ => (parent_color, parent_border, false),
    };
    if independent && color.is_transparent() && !draws_overlay {
        return None;
    }

    let (x, width) = horizontal(&ctx.mapper, child);
    let bounds = Bounds {
        x,
        y: parent.y,
        width,
        height: parent.height,
    };
    let overlay = if draws_overlay {
        ctx.filter.and_then(|f| f.draw_overlay(child, &bounds))
    } else {
        None
    };

    Some(RenderPlan {
        id: child.id,
        kind: child.kind.clone(),
        bounds,
        direction: DrawDirection::of(child.strand, ctx.mapper.orientation()),
        color,
        border,
        label: None,
        logo: logo_colors(ctx, child),
        overlay,
        children: child
            .children
            .iter()
            .filter_map(|grandchild| plan_child(ctx, grandchild, clip, &bounds, color, border))
            .collect(),
    })
}

/// Plans one column per screen pixel of a numeric track.
///
/// Each column shows the largest finite value over the bases it covers,
/// scaled to the track height against the value range of the sequence.
pub fn plan_numeric(ctx: &PlanContext<'_>, track: &NumericTrack, clip: &ClipWindow) -> Vec<ColumnPlan> {
    let sequence = ctx.sequence;
    let Some((low, high)) = track.value_range(&sequence.name) else {
        return Vec::new();
    };
    let low = low.min(0.0);
    let usable = (ctx.track_height - ctx.settings.layout.margins() as f64).max(1.0);
    let columns = ctx.mapper.window_width().floor().max(0.0) as i64;

    let mut plans = Vec::new();
    for column in 0..columns {
        let x = column as f64;
        let (start, end) = ctx.mapper.screen_to_genomic_range(x);
        let start = start.max(sequence.start).max(clip.start);
        let end = end.min(sequence.end).min(clip.end);
        if start > end {
            continue;
        }
        let value = (start..=end)
            .filter_map(|pos| track.value_at(&sequence.name, pos - sequence.start))
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))));
        let Some(value) = value else {
            continue;
        };
        let height = if high > low {
            (value - low) / (high - low) * usable
        } else {
            usable
        };
        plans.push(ColumnPlan {
            x,
            value,
            height: height.clamp(0.0, usable),
        });
    }
    plans
}

/// Complement of a nucleotide, keeping case.
fn complement(base: char) -> char {
    match base {
        'A' => 'T',
        'T' => 'A',
        'C' => 'G',
        'G' => 'C',
        'a' => 't',
        't' => 'a',
        'c' => 'g',
        'g' => 'c',
        'U' => 'A',
        'u' => 'a',
        other => other,
    }
}

/// Plans one glyph per visible base of a sequence track.
///
/// Nothing is planned when zoomed out below one pixel per base. In reverse
/// display the complement is shown.
pub fn plan_bases(ctx: &PlanContext<'_>, clip: &ClipWindow) -> Vec<BasePlan> {
    let sequence = ctx.sequence;
    let scale = ctx.mapper.scale();
    if scale < 1.0 || sequence.residues.is_none() {
        return Vec::new();
    }
    let reverse = ctx.mapper.orientation() == Orientation::Reverse;

    (clip.start.max(sequence.start)..=clip.end.min(sequence.end))
        .filter_map(|pos| {
            let base = sequence.residue_at(pos)?;
            let base = if reverse { complement(base) } else { base };
            Some(BasePlan {
                x: ctx.mapper.genomic_to_screen(pos),
                width: scale,
                base,
                color: base_color(base),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{HighlightFilter, ScoreThresholdFilter, TypeColorFilter};
    use crate::model::{DataStore, Dataset, RegionTrack};
    use crate::packer::RegionPacker;
    use crate::viewport::{Alignment, ViewportState};
    use std::collections::{HashMap, HashSet};

    fn mapper(orientation: Orientation) -> CoordinateMapper {
        let state = ViewportState {
            start: 0,
            end: 99,
            scale: 1.0,
            orientation,
            alignment: Alignment::None,
            constrained: true,
            scroll_locked: false,
        };
        CoordinateMapper::new(&state, 100.0)
    }

    fn sequence() -> Sequence {
        Sequence::new("seq1", 0, 99)
    }

    fn settings(show_score: bool, show_strand: bool) -> Settings {
        let mut settings = Settings::default();
        settings.display.show_score = show_score;
        settings.display.show_strand = show_strand;
        settings.layout.track_height = 8;
        settings
    }

    fn context<'a>(
        sequence: &'a Sequence,
        settings: &'a Settings,
        filter: Option<&'a Filter>,
        orientation: Orientation,
    ) -> PlanContext<'a> {
        PlanContext {
            track: "motifs",
            sequence,
            mapper: mapper(orientation),
            settings,
            filter,
            layout: LayoutMode::Contracted,
            track_height: settings.layout.track_height as f64,
            max_score: 10.0,
        }
    }

    fn clip() -> ClipWindow {
        ClipWindow {
            start: 0,
            end: 99,
            top: 0.0,
            bottom: 8.0,
        }
    }

    fn store(regions: Vec<Region>) -> DataStore {
        let mut store = DataStore::new();
        store.add_sequence(sequence());
        store.add_track(Dataset::Region(RegionTrack::new("motifs")));
        for region in regions {
            store.insert_region("motifs", "seq1", region);
        }
        store
    }

    #[test]
    fn test_direction() {
        let display = Orientation::Direct;
        assert_eq!(DrawDirection::of(Strand::Direct, display), DrawDirection::Direct);
        assert_eq!(DrawDirection::of(Strand::Reverse, display), DrawDirection::Reverse);
        assert_eq!(
            DrawDirection::of(Strand::Undetermined, display),
            DrawDirection::Indeterminate
        );
        assert_eq!(
            DrawDirection::of(Strand::Direct, Orientation::Reverse),
            DrawDirection::Reverse
        );
    }

    #[test]
    fn test_clip_rejection() {
        let seq = sequence();
        let settings = settings(false, false);
        let ctx = context(&seq, &settings, None, Orientation::Direct);
        let store = store(vec![Region::new(10, 20, "a"), Region::new(60, 70, "b")]);
        let clip = ClipWindow {
            start: 0,
            end: 40,
            ..clip()
        };
        let output = TrackRenderPlanner::new().plan_regions(&ctx, &store, &clip);
        assert_eq!(output.plans.len(), 1);
        assert_eq!(output.plans[0].kind, "a");
        assert_eq!(output.plans[0].bounds.x, 10.0);
        assert_eq!(output.plans[0].bounds.width, 11.0);
        assert!(!output.repaint_requested);
    }

    #[test]
    fn test_reverse_bounds() {
        let seq = sequence();
        let settings = settings(false, false);
        let ctx = context(&seq, &settings, None, Orientation::Reverse);
        let store = store(vec![Region::new(10, 20, "a").with_strand(Strand::Direct)]);
        let output = TrackRenderPlanner::new().plan_regions(&ctx, &store, &clip());
        let plan = &output.plans[0];
        assert_eq!(plan.bounds.x, 79.0);
        assert_eq!(plan.bounds.width, 11.0);
        assert_eq!(plan.direction, DrawDirection::Reverse);
    }

    #[test]
    fn test_expanded_row_rejection() {
        let seq = sequence();
        let settings = settings(false, false);
        let store = store(vec![
            Region::new(10, 50, "a"),
            Region::new(20, 60, "b"),
            Region::new(30, 70, "c"),
        ]);
        let ids = store.region_ids("motifs", "seq1");
        let rows = RegionPacker::new(0).pack(ids.iter().filter_map(|&id| store.region(id)), &seq);
        assert_eq!(rows.total_rows(), 3);

        let mut ctx = context(&seq, &settings, None, Orientation::Direct);
        ctx.layout = LayoutMode::Expanded(&rows);
        let clip = ClipWindow {
            top: 1.0,
            bottom: 2.0,
            ..clip()
        };
        let output = TrackRenderPlanner::new().plan_regions(&ctx, &store, &clip);
        assert_eq!(output.plans.len(), 1);
        assert_eq!(output.plans[0].kind, "b");
        assert_eq!(output.plans[0].bounds.y, 1.0);
        assert_eq!(output.plans[0].bounds.height, 1.0);
    }

    #[test]
    fn test_row_bounds() {
        assert_eq!(row_bounds(0, 10.0, 2.0, 5.0), (5.0, 15.0));
        assert_eq!(row_bounds(3, 10.0, 2.0, 5.0), (41.0, 51.0));
    }

    fn band(show_score: bool, show_strand: bool, strand: Strand, score: f64) -> (f64, f64) {
        let seq = sequence();
        let settings = settings(show_score, show_strand);
        let ctx = context(&seq, &settings, None, Orientation::Direct);
        let region = Region::new(10, 20, "a").with_strand(strand).with_score(score);
        let direction = DrawDirection::of(strand, Orientation::Direct);
        contracted_band(&ctx, &region, direction)
    }

    #[test]
    fn test_banding() {
        // Neither: full height
        assert_eq!(band(false, false, Strand::Direct, 5.0), (0.0, 8.0));
        // Strand only: fixed halves
        assert_eq!(band(false, true, Strand::Direct, 5.0), (0.0, 4.0));
        assert_eq!(band(false, true, Strand::Reverse, 5.0), (4.0, 4.0));
        assert_eq!(band(false, true, Strand::Undetermined, 5.0), (0.0, 8.0));
        // Score only: proportional, bottom anchored
        assert_eq!(band(true, false, Strand::Direct, 5.0), (4.0, 4.0));
        // Both: proportional within the half band
        assert_eq!(band(true, true, Strand::Direct, 5.0), (2.0, 2.0));
        assert_eq!(band(true, true, Strand::Reverse, 5.0), (4.0, 2.0));
        assert_eq!(band(true, true, Strand::Undetermined, 5.0), (2.0, 4.0));
        // Minimum height of one
        assert_eq!(band(true, true, Strand::Direct, 0.0), (3.0, 1.0));
    }

    #[test]
    fn test_flipped_score_bars() {
        let seq = sequence();
        let mut settings = settings(true, false);
        settings.display.flip_score_bars = true;
        let ctx = context(&seq, &settings, None, Orientation::Direct);
        let region = Region::new(10, 20, "a").with_score(5.0);
        assert_eq!(contracted_band(&ctx, &region, DrawDirection::Direct), (0.0, 4.0));
    }

    #[test]
    fn test_transparent_region_skipped() {
        let seq = sequence();
        let settings = settings(false, false);
        let store = store(vec![Region::new(10, 20, "hidden"), Region::new(30, 40, "shown")]);
        let transparent = || {
            Filter::single(TypeColorFilter {
                colors: HashMap::from([("hidden".to_string(), Rgba::TRANSPARENT)]),
            })
        };

        let filter = transparent();
        let ctx = context(&seq, &settings, Some(&filter), Orientation::Direct);
        let output = TrackRenderPlanner::new().plan_regions(&ctx, &store, &clip());
        assert_eq!(output.plans.len(), 1);
        assert_eq!(output.plans[0].kind, "shown");

        // Kept when a filter draws an overlay on it
        let filter = Filter::Group(vec![
            transparent(),
            Filter::single(HighlightFilter {
                kinds: HashSet::from(["hidden".to_string()]),
                color: Rgba::YELLOW,
            }),
        ]);
        let ctx = context(&seq, &settings, Some(&filter), Orientation::Direct);
        let output = TrackRenderPlanner::new().plan_regions(&ctx, &store, &clip());
        assert_eq!(output.plans.len(), 2);
        let hidden = &output.plans[0];
        assert!(hidden.color.is_transparent());
        assert_eq!(hidden.overlay.as_ref().map(|o| o.bounds), Some(hidden.bounds));
    }

    #[test]
    fn test_filter_hides_and_falls_back() {
        let seq = sequence();
        let settings = settings(false, false);
        let store = store(vec![
            Region::new(10, 20, "a").with_score(1.0),
            Region::new(30, 40, "b").with_score(9.0),
        ]);
        let filter = Filter::single(ScoreThresholdFilter { min_score: 5.0 });
        let ctx = context(&seq, &settings, Some(&filter), Orientation::Direct);
        let output = TrackRenderPlanner::new().plan_regions(&ctx, &store, &clip());
        assert_eq!(output.plans.len(), 1);
        assert_eq!(output.plans[0].color, settings.color_for_type("b"));
        assert_eq!(
            output.plans[0].label,
            Some(Label {
                text: "b".to_string(),
                color: settings.colors.label
            })
        );
    }

    #[test]
    fn test_nested_children() {
        let seq = sequence();
        let mut settings = settings(false, false);
        let store = store(vec![Region::new(10, 50, "module").with_children(vec![
            Region::new(12, 15, "m1"),
            Region::new(40, 45, "m2"),
            Region::new(90, 95, "outside"),
        ])]);
        let filter = Filter::single(TypeColorFilter {
            colors: HashMap::from([
                ("module".to_string(), Rgba::RED),
                ("m2".to_string(), Rgba::BLUE),
            ]),
        });
        let clip = ClipWindow {
            start: 0,
            end: 60,
            ..clip()
        };

        let ctx = context(&seq, &settings, Some(&filter), Orientation::Direct);
        let output = TrackRenderPlanner::new().plan_regions(&ctx, &store, &clip);
        let parent = &output.plans[0];
        assert_eq!(parent.children.len(), 2);
        for child in &parent.children {
            assert_eq!(child.color, Rgba::RED);
            assert_eq!(child.bounds.y, parent.bounds.y);
            assert_eq!(child.bounds.height, parent.bounds.height);
        }
        assert_eq!(parent.children[0].bounds.x, 12.0);
        assert_eq!(parent.children[0].bounds.width, 4.0);

        settings.display.filter_nested_independently = true;
        let ctx = context(&seq, &settings, Some(&filter), Orientation::Direct);
        let output = TrackRenderPlanner::new().plan_regions(&ctx, &store, &clip);
        let children = &output.plans[0].children;
        assert_eq!(children[0].color, settings.color_for_type("m1"));
        assert_eq!(children[1].color, Rgba::BLUE);
    }

    #[test]
    fn test_independent_children_without_filter() {
        let seq = sequence();
        let mut settings = settings(false, false);
        settings.colors.types.insert("module".to_string(), Rgba::RED);
        settings.colors.types.insert("m1".to_string(), Rgba::GREEN);
        let store = store(vec![
            Region::new(10, 50, "module").with_children(vec![Region::new(12, 15, "m1")]),
        ]);

        let ctx = context(&seq, &settings, None, Orientation::Direct);
        let output = TrackRenderPlanner::new().plan_regions(&ctx, &store, &clip());
        assert_eq!(output.plans[0].color, Rgba::RED);
        assert_eq!(output.plans[0].children[0].color, Rgba::RED);

        settings.display.filter_nested_independently = true;
        let ctx = context(&seq, &settings, None, Orientation::Direct);
        let output = TrackRenderPlanner::new().plan_regions(&ctx, &store, &clip());
        assert_eq!(output.plans[0].children[0].color, Rgba::GREEN);
    }

    /// Serves one id that no longer resolves.
    struct StaleSource {
        store: DataStore,
    }

    impl RegionSource for StaleSource {
        fn region_ids(&self, track: &str, sequence: &str) -> Vec<RegionId> {
            let mut ids = self.store.region_ids(track, sequence);
            ids.push(RegionId(999));
            ids
        }

        fn region(&self, id: RegionId) -> Option<&Region> {
            self.store.region(id)
        }
    }

    #[test]
    fn test_one_shot_retry() {
        let seq = sequence();
        let settings = settings(false, false);
        let ctx = context(&seq, &settings, None, Orientation::Direct);
        let stale = StaleSource {
            store: store(vec![Region::new(10, 20, "a")]),
        };
        let mut planner = TrackRenderPlanner::new();

        let first = planner.plan_regions(&ctx, &stale, &clip());
        assert_eq!(first.plans.len(), 1);
        assert!(first.failed);
        assert!(first.repaint_requested);

        let second = planner.plan_regions(&ctx, &stale, &clip());
        assert!(second.failed);
        assert!(!second.repaint_requested);

        // A clean pass re-arms the retry
        let clean = planner.plan_regions(&ctx, &stale.store, &clip());
        assert!(!clean.failed);
        let third = planner.plan_regions(&ctx, &stale, &clip());
        assert!(third.repaint_requested);
    }

    #[test]
    fn test_logo_requires_matching_length() {
        let seq = sequence();
        let settings = settings(false, false);
        let store = store(vec![
            Region::new(10, 13, "ok").with_residues("ACGT"),
            Region::new(20, 23, "short").with_residues("ACG"),
        ]);
        let ctx = context(&seq, &settings, None, Orientation::Direct);
        let output = TrackRenderPlanner::new().plan_regions(&ctx, &store, &clip());
        assert_eq!(output.plans.len(), 2);
        assert_eq!(
            output.plans[0].logo,
            Some(vec![Rgba::GREEN, Rgba::BLUE, Rgba::YELLOW, Rgba::RED])
        );
        assert_eq!(output.plans[1].logo, None);
    }

    #[test]
    fn test_plan_numeric() {
        let seq = sequence();
        let settings = settings(false, false);
        let mut track = NumericTrack::new("signal");
        let mut values = vec![0.0; 100];
        values[10] = 4.0;
        values[11] = 8.0;
        track.set_values("seq1", values);

        let ctx = context(&seq, &settings, None, Orientation::Direct);
        let columns = plan_numeric(&ctx, &track, &clip());
        assert!(!columns.is_empty());
        let peak = columns.iter().find(|c| c.value == 8.0).unwrap();
        assert_eq!(peak.height, 8.0);
        assert!(columns.iter().all(|c| c.height <= 8.0));
    }

    #[test]
    fn test_plan_bases() {
        let seq = Sequence::new("seq1", 0, 99).with_residues("ACGT".repeat(25));
        let settings = settings(false, false);
        let clip = ClipWindow {
            start: 0,
            end: 3,
            ..clip()
        };

        let ctx = context(&seq, &settings, None, Orientation::Direct);
        let bases: String = plan_bases(&ctx, &clip).iter().map(|b| b.base).collect();
        assert_eq!(bases, "ACGT");

        let ctx = context(&seq, &settings, None, Orientation::Reverse);
        let plans = plan_bases(&ctx, &clip);
        let bases: String = plans.iter().map(|b| b.base).collect();
        assert_eq!(bases, "TGCA");
        assert_eq!(plans[0].x, 99.0);
    }

    #[test]
    fn test_clip_from_screen() {
        let clip = ClipWindow::from_screen(&mapper(Orientation::Reverse), 0.0, 10.0, 0.0, 4.0);
        assert_eq!((clip.start, clip.end), (89, 99));
    }
}
