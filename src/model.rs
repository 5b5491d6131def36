//! Data model for the track viewer.
//!
//! This module contains all data structures for representing:
//! - Sequences and annotated regions
//! - Datasets (sequence, numeric and region tracks)
//! - The in-memory data store the layout code reads from
//! - Application state for the terminal front end
//!
//! Regions are immutable once stored. Layout output such as row indices is
//! kept in side tables keyed by [`RegionId`], never on the region itself.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::settings::{default_settings_path, save_settings};
use crate::view::TrackView;
use crate::viewport::{parse_range, Alignment};

/// Display orientation of a sequence (and of its viewport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Direct,
    Reverse,
}

impl Orientation {
    /// Returns the opposite orientation.
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Direct => Orientation::Reverse,
            Orientation::Reverse => Orientation::Direct,
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Orientation::Direct => write!(f, "+"),
            Orientation::Reverse => write!(f, "-"),
        }
    }
}

/// Intrinsic orientation of an annotated region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strand {
    Direct,
    Reverse,
    #[default]
    Undetermined,
}

impl Strand {
    /// Returns the orientation, if the strand is known.
    pub fn orientation(self) -> Option<Orientation> {
        match self {
            Strand::Direct => Some(Orientation::Direct),
            Strand::Reverse => Some(Orientation::Reverse),
            Strand::Undetermined => None,
        }
    }
}

/// Stable identity of a region inside a [`DataStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(pub u64);

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A genomic sequence segment that tracks are aligned to.
///
/// Coordinates are genomic and inclusive: `start..=end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    /// Sequence name (unique within a store)
    pub name: String,
    /// First genomic position
    pub start: i64,
    /// Last genomic position
    pub end: i64,
    /// Strand the sequence was extracted from
    pub orientation: Orientation,
    /// Transcription start site, if known
    pub tss: Option<i64>,
    /// Transcription end site, if known
    pub tes: Option<i64>,
    /// Residues in direct orientation, one per position
    pub residues: Option<String>,
}

impl Sequence {
    /// Creates a direct-strand sequence. Inverted bounds are swapped.
    pub fn new(name: impl Into<String>, start: i64, end: i64) -> Self {
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        Self {
            name: name.into(),
            start,
            end,
            orientation: Orientation::Direct,
            tss: None,
            tes: None,
            residues: None,
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_tss(mut self, tss: i64) -> Self {
        self.tss = Some(tss);
        self
    }

    pub fn with_tes(mut self, tes: i64) -> Self {
        self.tes = Some(tes);
        self
    }

    pub fn with_residues(mut self, residues: impl Into<String>) -> Self {
        self.residues = Some(residues.into());
        self
    }

    /// Returns the number of positions covered.
    pub fn len(&self) -> i64 {
        self.end - self.start + 1
    }

    /// Always false: a sequence covers at least one position.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Checks if a genomic position lies inside the sequence.
    pub fn contains(&self, pos: i64) -> bool {
        pos >= self.start && pos <= self.end
    }

    /// Gets the residue at a genomic position.
    pub fn residue_at(&self, pos: i64) -> Option<char> {
        if !self.contains(pos) {
            return None;
        }
        let offset = usize::try_from(pos - self.start).ok()?;
        self.residues.as_ref()?.as_bytes().get(offset).map(|&b| b as char)
    }
}

/// An annotated interval on a sequence: a motif, a module, an exon...
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Identity assigned by the store
    pub id: RegionId,
    /// First genomic position
    pub start: i64,
    /// Last genomic position
    pub end: i64,
    /// Type label (motif name, feature kind)
    pub kind: String,
    pub score: f64,
    pub strand: Strand,
    /// Nested regions (module motifs, exons)
    pub children: Vec<Region>,
    /// Annotated residues, used to draw motif logos
    pub residues: Option<String>,
}

impl Region {
    /// Creates a region. Inverted bounds are swapped.
    pub fn new(start: i64, end: i64, kind: impl Into<String>) -> Self {
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        Self {
            id: RegionId(0),
            start,
            end,
            kind: kind.into(),
            score: 0.0,
            strand: Strand::Undetermined,
            children: Vec::new(),
            residues: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn with_strand(mut self, strand: Strand) -> Self {
        self.strand = strand;
        self
    }

    pub fn with_children(mut self, children: Vec<Region>) -> Self {
        self.children = children;
        self
    }

    pub fn with_residues(mut self, residues: impl Into<String>) -> Self {
        self.residues = Some(residues.into());
        self
    }

    /// Number of positions covered.
    pub fn len(&self) -> i64 {
        self.end - self.start + 1
    }

    /// Always false: a region covers at least one position.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Start relative to the first position of `sequence`.
    pub fn relative_start(&self, sequence: &Sequence) -> i64 {
        self.start - sequence.start
    }

    /// End relative to the first position of `sequence`.
    pub fn relative_end(&self, sequence: &Sequence) -> i64 {
        self.end - sequence.start
    }

    /// Checks if the region intersects the inclusive interval `[start, end]`.
    pub fn overlaps(&self, start: i64, end: i64) -> bool {
        self.end >= start && self.start <= end
    }
}

/// A track that displays the residues of each sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceTrack {
    pub name: String,
}

/// A track holding one numeric value per position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumericTrack {
    pub name: String,
    /// Values per sequence, indexed by relative position
    values: HashMap<String, Vec<f64>>,
}

impl NumericTrack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: HashMap::new(),
        }
    }

    /// Sets the values of a sequence.
    pub fn set_values(&mut self, sequence: impl Into<String>, values: Vec<f64>) {
        self.values.insert(sequence.into(), values);
    }

    /// Gets the value at a position relative to the sequence start.
    pub fn value_at(&self, sequence: &str, relative: i64) -> Option<f64> {
        let index = usize::try_from(relative).ok()?;
        self.values.get(sequence)?.get(index).copied()
    }

    /// Returns the (min, max) of the finite values of a sequence.
    pub fn value_range(&self, sequence: &str) -> Option<(f64, f64)> {
        let values = self.values.get(sequence)?;
        values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// A track holding annotated regions, grouped per sequence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionTrack {
    pub name: String,
    /// Region ids per sequence, in insertion order
    regions: HashMap<String, Vec<RegionId>>,
}

impl RegionTrack {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            regions: HashMap::new(),
        }
    }

    /// Region ids of one sequence, in insertion order.
    pub fn region_ids(&self, sequence: &str) -> &[RegionId] {
        self.regions.get(sequence).map(Vec::as_slice).unwrap_or(&[])
    }

    fn push(&mut self, sequence: &str, id: RegionId) {
        self.regions.entry(sequence.to_string()).or_default().push(id);
    }

    fn remove(&mut self, id: RegionId) -> bool {
        let mut removed = false;
        for ids in self.regions.values_mut() {
            let before = ids.len();
            ids.retain(|&other| other != id);
            removed |= ids.len() != before;
        }
        removed
    }
}

/// The kinds of data a track can show.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Sequence(SequenceTrack),
    Numeric(NumericTrack),
    Region(RegionTrack),
}

/// Visitor over the closed set of dataset kinds.
pub trait DatasetVisitor {
    type Output;

    fn visit_sequence(&mut self, track: &SequenceTrack) -> Self::Output;
    fn visit_numeric(&mut self, track: &NumericTrack) -> Self::Output;
    fn visit_region(&mut self, track: &RegionTrack) -> Self::Output;
}

impl Dataset {
    /// Returns the track name.
    pub fn name(&self) -> &str {
        match self {
            Dataset::Sequence(track) => &track.name,
            Dataset::Numeric(track) => &track.name,
            Dataset::Region(track) => &track.name,
        }
    }

    /// Dispatches to the matching visitor method.
    pub fn accept<V: DatasetVisitor>(&self, visitor: &mut V) -> V::Output {
        match self {
            Dataset::Sequence(track) => visitor.visit_sequence(track),
            Dataset::Numeric(track) => visitor.visit_numeric(track),
            Dataset::Region(track) => visitor.visit_region(track),
        }
    }
}

/// Read access to regions, as needed by the packer and the planner.
pub trait RegionSource {
    /// Snapshot of the region ids of a (track, sequence) pair.
    fn region_ids(&self, track: &str, sequence: &str) -> Vec<RegionId>;

    /// Looks up a region. May return `None` if the data changed since the
    /// ids were taken.
    fn region(&self, id: RegionId) -> Option<&Region>;
}

/// In-memory store of sequences, tracks and regions.
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    sequences: Vec<Sequence>,
    tracks: Vec<Dataset>,
    regions: HashMap<RegionId, Region>,
    /// Owning (track, sequence) of each top-level region
    owners: HashMap<RegionId, (String, String)>,
    next_id: u64,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sequence, replacing any sequence with the same name.
    pub fn add_sequence(&mut self, sequence: Sequence) {
        match self.sequences.iter_mut().find(|s| s.name == sequence.name) {
            Some(existing) => *existing = sequence,
            None => self.sequences.push(sequence),
        }
    }

    /// Adds a track, replacing any track with the same name.
    pub fn add_track(&mut self, dataset: Dataset) {
        match self.tracks.iter_mut().find(|t| t.name() == dataset.name()) {
            Some(existing) => *existing = dataset,
            None => self.tracks.push(dataset),
        }
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn sequence(&self, name: &str) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.name == name)
    }

    pub fn tracks(&self) -> &[Dataset] {
        &self.tracks
    }

    pub fn track(&self, name: &str) -> Option<&Dataset> {
        self.tracks.iter().find(|t| t.name() == name)
    }

    fn region_track_mut(&mut self, name: &str) -> Option<&mut RegionTrack> {
        self.tracks.iter_mut().find_map(|t| match t {
            Dataset::Region(track) if track.name == name => Some(track),
            _ => None,
        })
    }

    fn assign_ids(&mut self, region: &mut Region) {
        self.next_id += 1;
        region.id = RegionId(self.next_id);
        for child in &mut region.children {
            self.assign_ids(child);
        }
    }

    /// Inserts a region into a region track. The store assigns fresh ids to
    /// the region and its children.
    ///
    /// Returns `None` if the track is missing or not a region track, or the
    /// sequence is unknown.
    pub fn insert_region(&mut self, track: &str, sequence: &str, mut region: Region) -> Option<RegionId> {
        self.sequence(sequence)?;
        self.region_track_mut(track)?;
        self.assign_ids(&mut region);
        let id = region.id;
        self.region_track_mut(track)?.push(sequence, id);
        self.owners.insert(id, (track.to_string(), sequence.to_string()));
        self.regions.insert(id, region);
        Some(id)
    }

    /// Removes a region and returns it.
    pub fn remove_region(&mut self, id: RegionId) -> Option<Region> {
        let (track, _) = self.owners.remove(&id)?;
        if let Some(region_track) = self.region_track_mut(&track) {
            region_track.remove(id);
        }
        self.regions.remove(&id)
    }

    /// Moves a region to a new span, keeping its identity. Children move by
    /// the same offset.
    pub fn move_region(&mut self, id: RegionId, start: i64, end: i64) -> bool {
        let Some(region) = self.regions.get_mut(&id) else {
            return false;
        };
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        let delta = start - region.start;
        region.start = start;
        region.end = end;
        for child in &mut region.children {
            child.start += delta;
            child.end += delta;
        }
        true
    }

    /// Returns the (track, sequence) a region belongs to.
    pub fn owner(&self, id: RegionId) -> Option<(&str, &str)> {
        self.owners
            .get(&id)
            .map(|(track, sequence)| (track.as_str(), sequence.as_str()))
    }

    /// Highest score among the regions of a track on any sequence.
    pub fn max_score(&self, track: &str) -> Option<f64> {
        self.owners
            .iter()
            .filter(|(_, (owner, _))| owner == track)
            .filter_map(|(id, _)| self.regions.get(id))
            .map(|r| r.score)
            .filter(|s| s.is_finite())
            .fold(None, |acc: Option<f64>, s| Some(acc.map_or(s, |m| m.max(s))))
    }

    /// Total number of top-level regions.
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

impl RegionSource for DataStore {
    fn region_ids(&self, track: &str, sequence: &str) -> Vec<RegionId> {
        match self.track(track) {
            Some(Dataset::Region(region_track)) => region_track.region_ids(sequence).to_vec(),
            _ => Vec::new(),
        }
    }

    fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(&id)
    }
}

/// Current application mode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AppMode {
    /// Normal navigation mode
    #[default]
    Normal,
    /// Command input mode (after pressing ':')
    Command(String),
}

/// The complete application state.
#[derive(Debug)]
pub struct AppState {
    /// Layout and planning over the loaded data
    pub view: TrackView,
    /// Index of the selected sequence
    pub current: usize,
    /// Current application mode
    pub mode: AppMode,
    /// Whether the application should quit
    pub should_quit: bool,
    /// Status message to display
    pub status_message: Option<String>,
    /// Whether the help overlay is shown
    pub show_help: bool,
    /// Progress text while a session is loading
    pub loading: Option<String>,
    /// A planning pass asked for one more paint
    pub repaint_requested: bool,
    /// Where `:w` saves the settings
    pub settings_path: Option<PathBuf>,
    /// Sequence to select once a session is loaded
    pub initial_sequence: Option<String>,
}

impl AppState {
    /// Creates a new application state over a view.
    pub fn new(view: TrackView) -> Self {
        Self {
            view,
            current: 0,
            mode: AppMode::Normal,
            should_quit: false,
            status_message: None,
            show_help: false,
            loading: None,
            repaint_requested: false,
            settings_path: None,
            initial_sequence: None,
        }
    }

    /// Name of the selected sequence.
    pub fn current_sequence(&self) -> Option<String> {
        self.view
            .store()
            .sequences()
            .get(self.current)
            .map(|s| s.name.clone())
    }

    /// Names of the region tracks.
    fn region_tracks(&self) -> Vec<String> {
        self.view
            .store()
            .tracks()
            .iter()
            .filter(|t| matches!(t, Dataset::Region(_)))
            .map(|t| t.name().to_string())
            .collect()
    }

    /// Updates the window width from the terminal track area.
    pub fn update_window_width(&mut self, columns: usize) {
        self.view.resize(columns.max(1) as f64);
    }

    /// Replaces the data with a freshly loaded store.
    pub fn apply_loaded(&mut self, store: DataStore) {
        let sequences = store.sequences().len();
        let tracks = store.tracks().len();
        self.view.replace_data(store);
        self.current = 0;
        self.loading = None;
        self.status_message = Some(format!("Loaded {} sequences, {} tracks", sequences, tracks));
        if let Some(name) = self.initial_sequence.take() {
            if !self.select_sequence(&name) {
                self.status_message = Some(format!("Unknown sequence: {}", name));
            }
        }
    }

    /// Selects the previous sequence.
    pub fn select_previous(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    /// Selects the next sequence.
    pub fn select_next(&mut self) {
        if self.current + 1 < self.view.store().sequences().len() {
            self.current += 1;
        }
    }

    /// Selects a sequence by name.
    pub fn select_sequence(&mut self, name: &str) -> bool {
        match self.view.store().sequences().iter().position(|s| s.name == name) {
            Some(index) => {
                self.current = index;
                true
            }
            None => false,
        }
    }

    fn with_current(&mut self, f: impl FnOnce(&mut TrackView, &str)) {
        if let Some(name) = self.current_sequence() {
            f(&mut self.view, &name);
        }
    }

    pub fn move_left(&mut self) {
        self.with_current(|view, seq| view.move_left(seq));
    }

    pub fn move_right(&mut self) {
        self.with_current(|view, seq| view.move_right(seq));
    }

    pub fn zoom_in(&mut self) {
        self.with_current(|view, seq| view.zoom_in(seq));
    }

    pub fn zoom_out(&mut self) {
        self.with_current(|view, seq| view.zoom_out(seq));
    }

    pub fn zoom_to_fit(&mut self) {
        self.with_current(|view, seq| view.zoom_to_fit(seq));
    }

    pub fn goto_left_end(&mut self) {
        self.with_current(|view, seq| view.move_to_left_end(seq));
    }

    pub fn goto_right_end(&mut self) {
        self.with_current(|view, seq| view.move_to_right_end(seq));
    }

    pub fn flip_orientation(&mut self) {
        self.with_current(|view, seq| view.flip_orientation(seq));
    }

    pub fn align(&mut self, alignment: Alignment) {
        self.with_current(|view, seq| match alignment {
            Alignment::Left => view.align_left(seq),
            Alignment::Right => view.align_right(seq),
            Alignment::Tss => view.align_tss(seq),
            Alignment::None => view.align_none(seq),
        });
    }

    /// Toggles scroll lock on the selected sequence.
    pub fn toggle_scroll_lock(&mut self) {
        let Some(name) = self.current_sequence() else {
            return;
        };
        let locked = self.view.viewport(&name).is_some_and(|v| v.scroll_locked);
        self.view.set_scroll_locked(&name, !locked);
        self.status_message = Some(if locked {
            format!("{}: scroll unlocked", name)
        } else {
            format!("{}: scroll locked", name)
        });
    }

    /// Switches every region track between contracted and expanded layout.
    pub fn toggle_expanded(&mut self) {
        let tracks = self.region_tracks();
        let expanded = !tracks.iter().any(|t| self.view.is_expanded(t));
        for track in &tracks {
            self.view.set_expanded(track, expanded);
        }
        let label = if expanded { "Expanded" } else { "Contracted" };
        self.status_message = Some(label.to_string());
    }

    pub fn toggle_labels(&mut self) {
        let mut settings = self.view.settings().clone();
        settings.display.show_labels = !settings.display.show_labels;
        self.view.update_settings(settings);
    }

    /// Enters command mode.
    pub fn enter_command_mode(&mut self) {
        self.mode = AppMode::Command(String::new());
    }

    /// Adds a character to the command buffer.
    pub fn command_input(&mut self, c: char) {
        if let AppMode::Command(ref mut cmd) = self.mode {
            cmd.push(c);
        }
    }

    /// Removes the last character from the command buffer.
    pub fn command_backspace(&mut self) {
        if let AppMode::Command(ref mut cmd) = self.mode {
            cmd.pop();
        }
    }

    /// Cancels command mode.
    pub fn cancel_command(&mut self) {
        self.mode = AppMode::Normal;
    }

    /// Executes the command in the buffer.
    pub fn execute_command(&mut self) {
        if let AppMode::Command(cmd) = std::mem::take(&mut self.mode) {
            self.run_command(cmd.trim());
        }
    }

    fn run_command(&mut self, cmd: &str) {
        let (name, arg) = match cmd.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (cmd, ""),
        };

        match name {
            "" => {}
            "q" | "quit" => self.should_quit = true,
            "h" | "help" => self.show_help = true,
            "zoom" | "z" => {
                if let Some(seq) = self.current_sequence() {
                    self.view.apply_zoom_input(&seq, arg);
                }
            }
            "goto" | "g" => {
                if let Some(seq) = self.current_sequence() {
                    self.view.apply_viewport_input(&seq, arg);
                }
            }
            "fit" => self.zoom_to_fit(),
            "align" => match arg {
                "left" => self.align(Alignment::Left),
                "right" => self.align(Alignment::Right),
                "tss" => self.align(Alignment::Tss),
                "none" | "center" => self.align(Alignment::None),
                _ => self.status_message = Some(format!("Unknown alignment: {}", arg)),
            },
            "expand" | "contract" => {
                let expanded = name == "expand";
                for track in self.region_tracks() {
                    self.view.set_expanded(&track, expanded);
                }
            }
            "labels" => self.toggle_labels(),
            "lock" => self.toggle_scroll_lock(),
            "flip" => self.flip_orientation(),
            "seq" => {
                if !self.select_sequence(arg) {
                    self.status_message = Some(format!("Unknown sequence: {}", arg));
                }
            }
            "w" | "write" => self.save_settings(),
            // A bare range jumps there
            _ if parse_range(cmd).is_some() => {
                if let Some(seq) = self.current_sequence() {
                    self.view.apply_viewport_input(&seq, cmd);
                }
            }
            _ => self.status_message = Some(format!("Unknown command: {}", cmd)),
        }
    }

    fn save_settings(&mut self) {
        let path = self.settings_path.clone().unwrap_or_else(default_settings_path);
        self.status_message = Some(match save_settings(self.view.settings(), &path) {
            Ok(()) => format!("Settings saved to {}", path.display()),
            Err(e) => format!("Error: {:#}", e),
        });
    }

    /// Dismisses the help overlay.
    pub fn dismiss_help(&mut self) {
        self.show_help = false;
    }
}
