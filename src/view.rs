//! The track view facade.
//!
//! [`TrackView`] owns the data store, the viewports, the row cache, the
//! settings and the optional filter. Mutations only queue a
//! [`ChangeEvent`]; every query starts by draining the queue through
//! [`TrackView::ensure_fresh`], so cached layout is never served stale and
//! several changes between two paints cost one recomputation.

use std::collections::HashMap;

use crate::changes::{ChangeEvent, ChangeQueue};
use crate::coords::CoordinateMapper;
use crate::filter::{build_filters, Filter};
use crate::model::{
    DataStore, Dataset, DatasetVisitor, NumericTrack, Region, RegionId, RegionTrack, Sequence,
    SequenceTrack,
};
use crate::packer::{packed_height, RowCache};
use crate::planner::{
    plan_bases, plan_numeric, BasePlan, ClipWindow, ColumnPlan, LayoutMode, PlanContext, PlanOutput,
    TrackRenderPlanner,
};
use crate::settings::Settings;
use crate::viewport::{ViewportModel, ViewportRegistry, ViewportState};

/// Plan of one track, by dataset kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackPlan {
    Regions(PlanOutput),
    Numeric(Vec<ColumnPlan>),
    Bases(Vec<BasePlan>),
}

/// Dispatches planning on the dataset kind.
struct PlanVisitor<'a, 'b> {
    ctx: PlanContext<'a>,
    store: &'a DataStore,
    clip: &'b ClipWindow,
    planner: &'b mut TrackRenderPlanner,
}

impl DatasetVisitor for PlanVisitor<'_, '_> {
    type Output = TrackPlan;

    fn visit_sequence(&mut self, _track: &SequenceTrack) -> TrackPlan {
        TrackPlan::Bases(plan_bases(&self.ctx, self.clip))
    }

    fn visit_numeric(&mut self, track: &NumericTrack) -> TrackPlan {
        TrackPlan::Numeric(plan_numeric(&self.ctx, track, self.clip))
    }

    fn visit_region(&mut self, _track: &RegionTrack) -> TrackPlan {
        TrackPlan::Regions(self.planner.plan_regions(&self.ctx, self.store, self.clip))
    }
}

/// Layout and planning facade over a data store.
#[derive(Debug)]
pub struct TrackView {
    store: DataStore,
    settings: Settings,
    filter: Option<Filter>,
    viewports: ViewportRegistry,
    rows: RowCache,
    /// Highest region score per track, dropped when its regions change
    max_scores: HashMap<String, f64>,
    planners: HashMap<(String, String), TrackRenderPlanner>,
    changes: ChangeQueue,
    stale: bool,
}

impl TrackView {
    /// Creates a view. The filter is built from the settings' filter list.
    pub fn new(store: DataStore, mut settings: Settings, window_width: f64) -> Self {
        settings.validate();
        let filter = build_filters(&settings.filters);
        let viewports = ViewportRegistry::new(window_width, settings.viewport_defaults());
        Self {
            store,
            settings,
            filter,
            viewports,
            rows: RowCache::new(),
            max_scores: HashMap::new(),
            planners: HashMap::new(),
            changes: ChangeQueue::new(),
            stale: false,
        }
    }

    // === Change notification ===

    /// Queues a change, applied at the start of the next query.
    pub fn mark_dirty(&mut self, event: ChangeEvent) {
        self.changes.push(event);
    }

    /// Marks every cached layout stale.
    pub fn invalidate(&mut self) {
        self.stale = true;
    }

    /// Applies every pending change.
    pub fn ensure_fresh(&mut self) {
        if self.stale {
            self.stale = false;
            self.rows.invalidate_all();
            self.max_scores.clear();
            self.planners.clear();
        }
        if self.changes.is_empty() {
            return;
        }
        for event in self.changes.drain() {
            log::debug!("applying {:?}", event);
            match event {
                ChangeEvent::RegionsChanged { track } => {
                    self.rows.invalidate_track(&track);
                    self.max_scores.remove(&track);
                }
                ChangeEvent::TrackChanged { track } => {
                    self.rows.invalidate_track(&track);
                    self.max_scores.remove(&track);
                    self.planners.retain(|(owner, _), _| *owner != track);
                }
                ChangeEvent::SequencesChanged => {
                    let store = &self.store;
                    self.viewports.retain(|name| store.sequence(name).is_some());
                    self.rows.invalidate_all();
                    self.max_scores.clear();
                }
                ChangeEvent::SettingsChanged => {
                    self.viewports.set_defaults(self.settings.viewport_defaults());
                    self.rows.invalidate_all();
                }
                ChangeEvent::FilterChanged => {}
                ChangeEvent::Resized { width } => self.viewports.resize(width),
            }
        }
    }

    // === Data ===

    pub fn store(&self) -> &DataStore {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Replaces all data, dropping every viewport.
    pub fn replace_data(&mut self, store: DataStore) {
        log::info!(
            "replacing data: {} sequences, {} tracks, {} regions",
            store.sequences().len(),
            store.tracks().len(),
            store.region_count()
        );
        self.store = store;
        self.viewports.clear();
        self.invalidate();
    }

    pub fn add_sequence(&mut self, sequence: Sequence) {
        self.store.add_sequence(sequence);
        self.mark_dirty(ChangeEvent::SequencesChanged);
    }

    pub fn add_track(&mut self, dataset: Dataset) {
        let track = dataset.name().to_string();
        self.store.add_track(dataset);
        self.mark_dirty(ChangeEvent::TrackChanged { track });
    }

    pub fn insert_region(&mut self, track: &str, sequence: &str, region: Region) -> Option<RegionId> {
        let id = self.store.insert_region(track, sequence, region)?;
        self.mark_dirty(ChangeEvent::RegionsChanged {
            track: track.to_string(),
        });
        Some(id)
    }

    pub fn remove_region(&mut self, id: RegionId) -> Option<Region> {
        let track = self.store.owner(id).map(|(track, _)| track.to_string())?;
        let region = self.store.remove_region(id)?;
        self.mark_dirty(ChangeEvent::RegionsChanged { track });
        Some(region)
    }

    pub fn move_region(&mut self, id: RegionId, start: i64, end: i64) -> bool {
        let Some(track) = self.store.owner(id).map(|(track, _)| track.to_string()) else {
            return false;
        };
        if !self.store.move_region(id, start, end) {
            return false;
        }
        self.mark_dirty(ChangeEvent::RegionsChanged { track });
        true
    }

    /// Replaces the settings. The filter is rebuilt from the new filter list.
    pub fn update_settings(&mut self, mut settings: Settings) {
        settings.validate();
        if settings.filters != self.settings.filters {
            self.filter = build_filters(&settings.filters);
            self.mark_dirty(ChangeEvent::FilterChanged);
        }
        self.settings = settings;
        self.mark_dirty(ChangeEvent::SettingsChanged);
    }

    pub fn set_filter(&mut self, filter: Option<Filter>) {
        self.filter = filter;
        self.mark_dirty(ChangeEvent::FilterChanged);
    }

    pub fn set_expanded(&mut self, track: &str, expanded: bool) {
        self.settings.set_expanded(track, expanded);
        self.mark_dirty(ChangeEvent::SettingsChanged);
    }

    pub fn is_expanded(&self, track: &str) -> bool {
        self.settings.is_expanded(track)
    }

    pub fn resize(&mut self, width: f64) {
        self.mark_dirty(ChangeEvent::Resized { width });
    }

    // === Queries ===

    pub fn window_width(&mut self) -> f64 {
        self.ensure_fresh();
        self.viewports.window_width()
    }

    /// Current viewport of a sequence, creating it on first access.
    pub fn viewport(&mut self, sequence: &str) -> Option<ViewportState> {
        self.with_viewport(sequence, |model| model.state())
    }

    pub fn zoom_level(&mut self, sequence: &str) -> Option<f64> {
        self.with_viewport(sequence, |model| model.zoom_level())
    }

    pub fn mapper(&mut self, sequence: &str) -> Option<CoordinateMapper> {
        self.with_viewport(sequence, |model| model.mapper())
    }

    pub fn genomic_to_screen(&mut self, sequence: &str, pos: i64) -> Option<f64> {
        self.mapper(sequence).map(|mapper| mapper.genomic_to_screen(pos))
    }

    pub fn screen_to_genomic_range(&mut self, sequence: &str, x: f64) -> Option<(i64, i64)> {
        self.mapper(sequence).map(|mapper| mapper.screen_to_genomic_range(x))
    }

    /// Height of a track on a sequence. Expanded region tracks grow with
    /// their row count; unknown tracks have no height.
    pub fn track_height(&mut self, track: &str, sequence: &str) -> f64 {
        self.ensure_fresh();
        let (Some(dataset), Some(seq)) = (self.store.track(track), self.store.sequence(sequence)) else {
            return 0.0;
        };
        let layout = &self.settings.layout;
        match dataset {
            Dataset::Sequence(_) => (layout.region_height + layout.margins()) as f64,
            Dataset::Numeric(_) => self.settings.track_height(track) as f64,
            Dataset::Region(_) if self.settings.is_expanded(track) => {
                let packer = self.settings.packer();
                let rows = self.rows.get_or_pack(track, seq, &self.store, &packer);
                packed_height(
                    rows.total_rows(),
                    layout.region_height,
                    layout.row_spacing,
                    layout.margins(),
                ) as f64
            }
            Dataset::Region(_) => self.settings.track_height(track) as f64,
        }
    }

    /// Top and bottom of an expanded row.
    pub fn row_bounds(&mut self, row: usize, row_height: f64, y_offset: f64) -> (f64, f64) {
        self.ensure_fresh();
        crate::planner::row_bounds(row, row_height, self.settings.layout.row_spacing as f64, y_offset)
    }

    /// Clip window over the whole window width and the band `[top, bottom)`.
    pub fn clip_window(&mut self, sequence: &str, top: f64, bottom: f64) -> Option<ClipWindow> {
        let mapper = self.mapper(sequence)?;
        Some(ClipWindow::from_screen(&mapper, 0.0, mapper.window_width(), top, bottom))
    }

    /// Plans the visible regions of a region track.
    pub fn plan_visible_regions(&mut self, track: &str, sequence: &str, clip: &ClipWindow) -> PlanOutput {
        match self.plan_track(track, sequence, clip) {
            Some(TrackPlan::Regions(output)) => output,
            _ => PlanOutput::default(),
        }
    }

    /// Highest finite region score of a track, 0 when it has none.
    pub fn max_score(&mut self, track: &str) -> f64 {
        self.ensure_fresh();
        self.cached_max_score(track)
    }

    fn cached_max_score(&mut self, track: &str) -> f64 {
        let store = &self.store;
        *self
            .max_scores
            .entry(track.to_string())
            .or_insert_with(|| store.max_score(track).unwrap_or(0.0))
    }

    /// Plans any kind of track.
    pub fn plan_track(&mut self, track: &str, sequence: &str, clip: &ClipWindow) -> Option<TrackPlan> {
        self.ensure_fresh();
        let max_score = self.cached_max_score(track);
        let dataset = self.store.track(track)?;
        let seq = self.store.sequence(sequence)?;
        let mapper = self.viewports.get_or_create(seq).mapper();
        let packer = self.settings.packer();

        let layout = match dataset {
            Dataset::Region(_) if self.settings.is_expanded(track) => {
                LayoutMode::Expanded(self.rows.get_or_pack(track, seq, &self.store, &packer))
            }
            _ => LayoutMode::Contracted,
        };
        let ctx = PlanContext {
            track,
            sequence: seq,
            mapper,
            settings: &self.settings,
            filter: self.filter.as_ref(),
            layout,
            track_height: self.settings.track_height(track) as f64,
            max_score,
        };
        let planner = self
            .planners
            .entry((track.to_string(), sequence.to_string()))
            .or_default();

        let mut visitor = PlanVisitor {
            ctx,
            store: &self.store,
            clip,
            planner,
        };
        Some(dataset.accept(&mut visitor))
    }

    // === Viewport mutators ===

    fn with_viewport<R>(&mut self, sequence: &str, f: impl FnOnce(&mut ViewportModel) -> R) -> Option<R> {
        self.ensure_fresh();
        let seq = self.store.sequence(sequence)?;
        Some(f(self.viewports.get_or_create(seq)))
    }

    pub fn zoom_in(&mut self, sequence: &str) {
        let step = self.settings.viewport.zoom_step;
        self.with_viewport(sequence, |model| model.zoom_in(step));
    }

    pub fn zoom_out(&mut self, sequence: &str) {
        let step = self.settings.viewport.zoom_step;
        self.with_viewport(sequence, |model| model.zoom_out(step));
    }

    pub fn zoom_to_level(&mut self, sequence: &str, percent: f64) {
        self.with_viewport(sequence, |model| model.zoom_to_level(percent));
    }

    pub fn zoom_to_fit(&mut self, sequence: &str) {
        self.with_viewport(sequence, ViewportModel::zoom_to_fit);
    }

    /// Scrolls a sequence, together with every scroll-locked viewport if it
    /// is locked itself.
    pub fn move_by(&mut self, sequence: &str, amount: f64, is_fraction: bool) {
        self.ensure_fresh();
        if let Some(seq) = self.store.sequence(sequence) {
            self.viewports.move_by(seq, amount, is_fraction);
        }
    }

    pub fn move_left(&mut self, sequence: &str) {
        let fraction = self.settings.viewport.scroll_fraction;
        self.move_by(sequence, -fraction, true);
    }

    pub fn move_right(&mut self, sequence: &str) {
        let fraction = self.settings.viewport.scroll_fraction;
        self.move_by(sequence, fraction, true);
    }

    pub fn move_to_left_end(&mut self, sequence: &str) {
        self.with_viewport(sequence, ViewportModel::move_to_left_end);
    }

    pub fn move_to_right_end(&mut self, sequence: &str) {
        self.with_viewport(sequence, ViewportModel::move_to_right_end);
    }

    pub fn set_viewport(&mut self, sequence: &str, start: i64, end: i64) {
        self.with_viewport(sequence, |model| model.set_viewport(start, end));
    }

    pub fn align_left(&mut self, sequence: &str) {
        self.with_viewport(sequence, ViewportModel::align_left);
    }

    pub fn align_right(&mut self, sequence: &str) {
        self.with_viewport(sequence, ViewportModel::align_right);
    }

    pub fn align_tss(&mut self, sequence: &str) {
        self.with_viewport(sequence, ViewportModel::align_tss);
    }

    pub fn align_none(&mut self, sequence: &str) {
        self.with_viewport(sequence, ViewportModel::align_none);
    }

    pub fn flip_orientation(&mut self, sequence: &str) {
        self.with_viewport(sequence, ViewportModel::flip_orientation);
    }

    pub fn set_scroll_locked(&mut self, sequence: &str, locked: bool) {
        self.with_viewport(sequence, |model| model.set_scroll_locked(locked));
    }

    pub fn set_constrained(&mut self, sequence: &str, constrained: bool) {
        self.with_viewport(sequence, |model| model.set_constrained(constrained));
    }

    /// Applies a typed range such as `1000-2000`. Returns false if discarded.
    pub fn apply_viewport_input(&mut self, sequence: &str, input: &str) -> bool {
        self.with_viewport(sequence, |model| model.apply_viewport_input(input))
            .unwrap_or(false)
    }

    /// Applies a typed zoom level such as `250%`. Returns false if discarded.
    pub fn apply_zoom_input(&mut self, sequence: &str, input: &str) -> bool {
        self.with_viewport(sequence, |model| model.apply_zoom_input(input))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;
    use crate::filter::{FilterConfig, TypeColorFilter};
    use crate::model::{Orientation, Strand};
    use crate::viewport::Alignment;

    fn view() -> TrackView {
        let mut store = DataStore::new();
        store.add_sequence(Sequence::new("seq1", 1000, 1999).with_tss(1500));
        store.add_sequence(Sequence::new("seq2", 0, 999));
        store.add_track(Dataset::Region(RegionTrack::new("motifs")));
        TrackView::new(store, Settings::default(), 500.0)
    }

    #[test]
    fn test_lazy_viewport() {
        let mut view = view();
        let state = view.viewport("seq1").unwrap();
        assert_eq!((state.start, state.end), (1000, 1999));
        assert_eq!(state.scale, 0.5);
        assert_eq!(view.genomic_to_screen("seq1", 1500), Some(250.0));
        assert_eq!(view.screen_to_genomic_range("seq1", 250.0), Some((1500, 1502)));
        assert!(view.viewport("missing").is_none());
    }

    #[test]
    fn test_expanded_height_never_stale() {
        let mut view = view();
        view.set_expanded("motifs", true);
        assert_eq!(view.track_height("motifs", "seq1"), 1.0);

        view.insert_region("motifs", "seq1", Region::new(1100, 1150, "a"));
        view.insert_region("motifs", "seq1", Region::new(1120, 1160, "b"));
        assert_eq!(view.track_height("motifs", "seq1"), 2.0);

        let id = view.insert_region("motifs", "seq1", Region::new(1200, 1220, "c")).unwrap();
        assert_eq!(view.track_height("motifs", "seq1"), 2.0);
        assert!(view.move_region(id, 1130, 1140));
        assert_eq!(view.track_height("motifs", "seq1"), 3.0);
        assert!(view.remove_region(id).is_some());
        assert_eq!(view.track_height("motifs", "seq1"), 2.0);
    }

    #[test]
    fn test_contracted_height_from_settings() {
        let mut view = view();
        assert_eq!(view.track_height("motifs", "seq1"), 4.0);
        assert_eq!(view.track_height("nope", "seq1"), 0.0);
    }

    #[test]
    fn test_resize_is_applied_on_next_query() {
        let mut view = view();
        view.align_left("seq1");
        let before = view.viewport("seq1").unwrap();
        view.resize(1000.0);
        assert_eq!(view.window_width(), 1000.0);
        let after = view.viewport("seq1").unwrap();
        assert_eq!(after.start, before.start);
        assert_eq!(after.scale, before.scale);
    }

    #[test]
    fn test_max_score_follows_region_changes() {
        let mut view = view();
        assert_eq!(view.max_score("motifs"), 0.0);

        view.insert_region("motifs", "seq1", Region::new(1100, 1109, "a").with_score(2.0));
        assert_eq!(view.max_score("motifs"), 2.0);
        let high = view
            .insert_region("motifs", "seq2", Region::new(10, 19, "b").with_score(8.0))
            .unwrap();
        assert_eq!(view.max_score("motifs"), 8.0);

        view.remove_region(high);
        assert_eq!(view.max_score("motifs"), 2.0);
    }

    #[test]
    fn test_resize_burst_applies_last_width() {
        let mut view = view();
        assert!(view.viewport("seq1").is_some());
        view.resize(100.0);
        view.resize(200.0);
        view.resize(100.0);
        assert_eq!(view.window_width(), 100.0);
        assert_eq!(view.mapper("seq1").unwrap().window_width(), 100.0);
    }

    #[test]
    fn test_plan_visible_regions() {
        let mut view = view();
        view.insert_region("motifs", "seq1", Region::new(1100, 1109, "a").with_strand(Strand::Direct));
        view.insert_region("motifs", "seq1", Region::new(1900, 1909, "b"));
        view.set_viewport("seq1", 1000, 1499);

        let clip = view.clip_window("seq1", 0.0, 4.0).unwrap();
        assert_eq!((clip.start, clip.end), (1000, 1500));
        let output = view.plan_visible_regions("motifs", "seq1", &clip);
        assert_eq!(output.plans.len(), 1);
        assert_eq!(output.plans[0].bounds.x, 100.0);
        assert_eq!(output.plans[0].bounds.width, 10.0);
    }

    #[test]
    fn test_plan_track_dispatch() {
        let mut view = view();
        let mut signal = NumericTrack::new("signal");
        signal.set_values("seq2", (0..1000).map(|v| v as f64).collect());
        view.add_track(Dataset::Numeric(signal));
        view.add_track(Dataset::Sequence(SequenceTrack {
            name: "dna".to_string(),
        }));

        let clip = view.clip_window("seq2", 0.0, 4.0).unwrap();
        match view.plan_track("signal", "seq2", &clip) {
            Some(TrackPlan::Numeric(columns)) => assert_eq!(columns.len(), 500),
            other => panic!("unexpected plan {:?}", other),
        }
        // No residues and zoomed out: nothing to draw
        assert_eq!(
            view.plan_track("dna", "seq2", &clip),
            Some(TrackPlan::Bases(Vec::new()))
        );
        assert!(view.plan_track("missing", "seq2", &clip).is_none());
    }

    #[test]
    fn test_filter_updates() {
        let mut view = view();
        view.insert_region("motifs", "seq1", Region::new(1100, 1109, "a"));
        let clip = view.clip_window("seq1", 0.0, 4.0).unwrap();
        let default_color = view.settings().color_for_type("a");
        assert_eq!(view.plan_visible_regions("motifs", "seq1", &clip).plans[0].color, default_color);

        view.set_filter(Some(Filter::single(TypeColorFilter {
            colors: HashMap::from([("a".to_string(), Rgba::BLUE)]),
        })));
        assert_eq!(view.plan_visible_regions("motifs", "seq1", &clip).plans[0].color, Rgba::BLUE);

        let mut settings = view.settings().clone();
        settings.filters = vec![FilterConfig::ScoreThreshold { min_score: 1.0 }];
        view.update_settings(settings);
        assert!(view.plan_visible_regions("motifs", "seq1", &clip).plans.is_empty());
    }

    #[test]
    fn test_scroll_lock() {
        let mut view = view();
        view.zoom_to_level("seq1", 100.0);
        view.zoom_to_level("seq2", 100.0);
        view.set_scroll_locked("seq1", true);
        view.set_scroll_locked("seq2", true);
        view.align_left("seq1");
        view.align_left("seq2");
        let seq1 = view.viewport("seq1").unwrap().start;
        let seq2 = view.viewport("seq2").unwrap().start;

        view.move_by("seq1", 50.0, false);
        assert_eq!(view.viewport("seq1").unwrap().start, seq1 + 50);
        assert_eq!(view.viewport("seq2").unwrap().start, seq2 + 50);
    }

    #[test]
    fn test_settings_defaults_apply_to_new_viewports() {
        let mut view = view();
        let mut settings = view.settings().clone();
        settings.viewport.alignment = Alignment::Tss;
        view.update_settings(settings);
        let state = view.viewport("seq1").unwrap();
        assert_eq!(state.alignment, Alignment::Tss);
    }

    #[test]
    fn test_text_input() {
        let mut view = view();
        assert!(view.apply_viewport_input("seq1", "1200-1299"));
        let state = view.viewport("seq1").unwrap();
        assert_eq!((state.start, state.end), (1200, 1299));
        assert!(!view.apply_zoom_input("seq1", "abc"));
        assert_eq!(view.viewport("seq1").unwrap(), state);
        assert!(!view.apply_viewport_input("missing", "1-2"));
    }

    #[test]
    fn test_replace_data_drops_viewports() {
        let mut view = view();
        view.flip_orientation("seq1");
        assert_eq!(view.viewport("seq1").unwrap().orientation, Orientation::Reverse);
        let mut store = DataStore::new();
        store.add_sequence(Sequence::new("seq1", 1000, 1999));
        view.replace_data(store);
        assert_eq!(view.viewport("seq1").unwrap().orientation, Orientation::Direct);
    }
}
