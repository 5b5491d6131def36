//! Viewer settings.
//!
//! Settings are stored as YAML. Every section has defaults, so a partial file
//! is valid. Out-of-range values are clamped by [`Settings::validate`] rather
//! than rejected.
//!
//! Default location: `<config dir>/trackview/settings.yaml`

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::{palette_color, Rgba};
use crate::filter::FilterConfig;
use crate::packer::RegionPacker;
use crate::viewport::{Alignment, ViewportDefaults};

/// Errors raised when reading a settings file.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Cannot read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Root settings structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub display: DisplaySettings,
    pub layout: LayoutSettings,
    pub viewport: ViewportSettings,
    pub colors: ColorSettings,
    /// Per-track overrides, keyed by track name
    pub tracks: HashMap<String, TrackSettings>,
    /// Dynamic filters, combined into one group
    pub filters: Vec<FilterConfig>,
}

/// Display toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Scale region height by score in contracted mode
    pub show_score: bool,
    /// Split contracted tracks into a direct and a reverse band
    pub show_strand: bool,
    pub show_labels: bool,
    pub show_logos: bool,
    /// Anchor score bars at the top instead of the bottom
    pub flip_score_bars: bool,
    /// Default layout mode of region tracks
    pub expanded: bool,
    /// Nested regions ask the filter for their own colour
    pub filter_nested_independently: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_score: true,
            show_strand: true,
            show_labels: true,
            show_logos: true,
            flip_score_bars: false,
            expanded: false,
            filter_nested_independently: false,
        }
    }
}

/// Track geometry, in cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Height of a contracted track
    pub track_height: i64,
    /// Height of one row in expanded mode
    pub region_height: i64,
    /// Gap between expanded rows
    pub row_spacing: i64,
    pub top_margin: i64,
    pub bottom_margin: i64,
    /// Minimum gap in bases between regions sharing a row
    pub packing_spacing: i64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            track_height: 4,
            region_height: 1,
            row_spacing: 0,
            top_margin: 0,
            bottom_margin: 0,
            packing_spacing: 1,
        }
    }
}

impl LayoutSettings {
    /// Clamp values to usable ranges.
    pub fn validate(&mut self) {
        self.track_height = self.track_height.clamp(1, 64);
        self.region_height = self.region_height.clamp(1, 16);
        self.row_spacing = self.row_spacing.clamp(0, 16);
        self.top_margin = self.top_margin.clamp(0, 16);
        self.bottom_margin = self.bottom_margin.clamp(0, 16);
        self.packing_spacing = self.packing_spacing.clamp(0, 10_000);
    }

    pub fn margins(&self) -> i64 {
        self.top_margin + self.bottom_margin
    }
}

/// Defaults for new viewports and navigation steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    pub alignment: Alignment,
    /// Keep viewports inside the sequence bounds
    pub constrained: bool,
    /// Zoom in/out multiplier
    pub zoom_step: f64,
    /// Fraction of the window scrolled by one move
    pub scroll_fraction: f64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            alignment: Alignment::None,
            constrained: true,
            zoom_step: 2.0,
            scroll_fraction: 0.25,
        }
    }
}

impl ViewportSettings {
    pub fn validate(&mut self) {
        let defaults = Self::default();
        if !self.zoom_step.is_finite() {
            self.zoom_step = defaults.zoom_step;
        }
        if !self.scroll_fraction.is_finite() {
            self.scroll_fraction = defaults.scroll_fraction;
        }
        self.zoom_step = self.zoom_step.clamp(1.1, 10.0);
        self.scroll_fraction = self.scroll_fraction.clamp(0.01, 1.0);
    }
}

/// Static colours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorSettings {
    /// Colour per region type
    pub types: HashMap<String, Rgba>,
    pub label: Rgba,
    pub border: Rgba,
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            types: HashMap::new(),
            label: Rgba::WHITE,
            border: Rgba::TRANSPARENT,
        }
    }
}

/// Per-track overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSettings {
    pub height: Option<i64>,
    pub expanded: Option<bool>,
}

impl Settings {
    /// Clamp every section to usable ranges.
    pub fn validate(&mut self) {
        self.layout.validate();
        self.viewport.validate();
        for track in self.tracks.values_mut() {
            if let Some(height) = track.height.as_mut() {
                *height = (*height).clamp(1, 64);
            }
        }
    }

    /// Contracted height of a track.
    pub fn track_height(&self, track: &str) -> i64 {
        self.tracks
            .get(track)
            .and_then(|t| t.height)
            .unwrap_or(self.layout.track_height)
    }

    pub fn is_expanded(&self, track: &str) -> bool {
        self.tracks
            .get(track)
            .and_then(|t| t.expanded)
            .unwrap_or(self.display.expanded)
    }

    /// Switches a track between contracted and expanded layout.
    pub fn set_expanded(&mut self, track: &str, expanded: bool) {
        self.tracks.entry(track.to_string()).or_default().expanded = Some(expanded);
    }

    /// Configured colour of a region type, or a stable palette colour.
    pub fn color_for_type(&self, kind: &str) -> Rgba {
        self.colors
            .types
            .get(kind)
            .copied()
            .unwrap_or_else(|| palette_color(kind))
    }

    pub fn viewport_defaults(&self) -> ViewportDefaults {
        ViewportDefaults {
            alignment: self.viewport.alignment,
            constrained: self.viewport.constrained,
        }
    }

    pub fn packer(&self) -> RegionPacker {
        RegionPacker::new(self.layout.packing_spacing)
    }
}

/// Get the default settings file path
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("trackview")
        .join("settings.yaml")
}

/// Reads and validates a settings file.
pub fn try_load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut settings: Settings =
        serde_yaml::from_str(&contents).map_err(|source| SettingsError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
    settings.validate();
    Ok(settings)
}

/// Load settings from a YAML file
///
/// A missing or invalid file yields the defaults.
pub fn load_settings(path: &Path) -> Settings {
    if !path.exists() {
        log::info!("load_settings: {:?} doesn't exist, using defaults", path);
        return Settings::default();
    }

    match try_load_settings(path) {
        Ok(settings) => {
            log::info!(
                "load_settings: loaded {:?} ({} track overrides, {} filters)",
                path,
                settings.tracks.len(),
                settings.filters.len()
            );
            settings
        }
        Err(e) => {
            log::warn!("load_settings: {}, using defaults", e);
            Settings::default()
        }
    }
}

/// Save settings to a YAML file
pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create settings directory: {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(settings).context("Failed to serialize settings to YAML")?;

    std::fs::write(path, yaml)
        .with_context(|| format!("Failed to write settings file: {:?}", path))?;

    log::info!("save_settings: saved {:?}", path);
    Ok(())
}
