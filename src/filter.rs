//! Dynamic region visualisation filters.
//!
//! A filter can hide regions, override their colours and draw overlays at
//! render time. Filters are optional; when none is installed, or a filter
//! has no opinion, the planner falls back to the static colours of the
//! settings.
//!
//! Filters compose through [`Filter::Group`]: a region is shown only if every
//! member agrees, the first member that returns a colour wins, and overlays
//! are drawn by the first member that draws one.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::Rgba;
use crate::model::Region;
use crate::planner::Bounds;

/// A mark drawn on top of a region.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub bounds: Bounds,
    pub color: Rgba,
    /// Glyph used by character-cell front ends
    pub glyph: char,
}

/// Capability set of a dynamic region visualisation filter.
///
/// Every method has a neutral default, so a filter only implements what it
/// changes.
pub trait RegionVisualizationFilter {
    /// Name shown in logs and status lines.
    fn name(&self) -> &str;

    fn should_visualize_region(&self, _region: &Region) -> bool {
        true
    }

    fn dynamic_region_color(&self, _region: &Region) -> Option<Rgba> {
        None
    }

    fn dynamic_region_border_color(&self, _region: &Region) -> Option<Rgba> {
        None
    }

    fn dynamic_region_label_color(&self, _region: &Region) -> Option<Rgba> {
        None
    }

    /// Per-residue colours of a motif logo.
    fn dynamic_motif_logo_colors(&self, _region: &Region) -> Option<Vec<Rgba>> {
        None
    }

    fn draws_overlay(&self, _region: &Region) -> bool {
        false
    }

    fn draw_overlay(&self, _region: &Region, _bounds: &Bounds) -> Option<Overlay> {
        None
    }
}

/// A single filter or a group of filters.
pub enum Filter {
    Single(Box<dyn RegionVisualizationFilter>),
    Group(Vec<Filter>),
}

impl Filter {
    pub fn single(filter: impl RegionVisualizationFilter + 'static) -> Self {
        Filter::Single(Box::new(filter))
    }

    /// Number of single filters, counting through nested groups.
    pub fn len(&self) -> usize {
        match self {
            Filter::Single(_) => 1,
            Filter::Group(members) => members.iter().map(Filter::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Single(filter) => write!(f, "Single({})", filter.name()),
            Filter::Group(members) => f.debug_tuple("Group").field(members).finish(),
        }
    }
}

impl RegionVisualizationFilter for Filter {
    fn name(&self) -> &str {
        match self {
            Filter::Single(filter) => filter.name(),
            Filter::Group(_) => "group",
        }
    }

    fn should_visualize_region(&self, region: &Region) -> bool {
        match self {
            Filter::Single(filter) => filter.should_visualize_region(region),
            Filter::Group(members) => members.iter().all(|m| m.should_visualize_region(region)),
        }
    }

    fn dynamic_region_color(&self, region: &Region) -> Option<Rgba> {
        match self {
            Filter::Single(filter) => filter.dynamic_region_color(region),
            Filter::Group(members) => members.iter().find_map(|m| m.dynamic_region_color(region)),
        }
    }

    fn dynamic_region_border_color(&self, region: &Region) -> Option<Rgba> {
        match self {
            Filter::Single(filter) => filter.dynamic_region_border_color(region),
            Filter::Group(members) => members
                .iter()
                .find_map(|m| m.dynamic_region_border_color(region)),
        }
    }

    fn dynamic_region_label_color(&self, region: &Region) -> Option<Rgba> {
        match self {
            Filter::Single(filter) => filter.dynamic_region_label_color(region),
            Filter::Group(members) => members
                .iter()
                .find_map(|m| m.dynamic_region_label_color(region)),
        }
    }

    fn dynamic_motif_logo_colors(&self, region: &Region) -> Option<Vec<Rgba>> {
        match self {
            Filter::Single(filter) => filter.dynamic_motif_logo_colors(region),
            Filter::Group(members) => members
                .iter()
                .find_map(|m| m.dynamic_motif_logo_colors(region)),
        }
    }

    fn draws_overlay(&self, region: &Region) -> bool {
        match self {
            Filter::Single(filter) => filter.draws_overlay(region),
            Filter::Group(members) => members.iter().any(|m| m.draws_overlay(region)),
        }
    }

    fn draw_overlay(&self, region: &Region, bounds: &Bounds) -> Option<Overlay> {
        match self {
            Filter::Single(filter) => filter.draw_overlay(region, bounds),
            Filter::Group(members) => members
                .iter()
                .filter(|m| m.draws_overlay(region))
                .find_map(|m| m.draw_overlay(region, bounds)),
        }
    }
}

/// Hides regions scoring below a threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreThresholdFilter {
    pub min_score: f64,
}

impl RegionVisualizationFilter for ScoreThresholdFilter {
    fn name(&self) -> &str {
        "score-threshold"
    }

    fn should_visualize_region(&self, region: &Region) -> bool {
        region.score >= self.min_score
    }
}

/// Recolours regions by type.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypeColorFilter {
    pub colors: HashMap<String, Rgba>,
}

impl RegionVisualizationFilter for TypeColorFilter {
    fn name(&self) -> &str {
        "type-color"
    }

    fn dynamic_region_color(&self, region: &Region) -> Option<Rgba> {
        self.colors.get(&region.kind).copied()
    }
}

/// Outlines regions of selected types and marks them with an overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightFilter {
    pub kinds: HashSet<String>,
    pub color: Rgba,
}

impl RegionVisualizationFilter for HighlightFilter {
    fn name(&self) -> &str {
        "highlight"
    }

    fn dynamic_region_border_color(&self, region: &Region) -> Option<Rgba> {
        self.kinds.contains(&region.kind).then_some(self.color)
    }

    fn dynamic_region_label_color(&self, region: &Region) -> Option<Rgba> {
        self.dynamic_region_border_color(region)
    }

    fn draws_overlay(&self, region: &Region) -> bool {
        self.kinds.contains(&region.kind)
    }

    fn draw_overlay(&self, region: &Region, bounds: &Bounds) -> Option<Overlay> {
        self.draws_overlay(region).then(|| Overlay {
            bounds: *bounds,
            color: self.color,
            glyph: '*',
        })
    }
}

/// Filter definitions as written in the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterConfig {
    ScoreThreshold { min_score: f64 },
    TypeColor { colors: HashMap<String, Rgba> },
    Highlight { kinds: Vec<String>, color: Rgba },
}

impl FilterConfig {
    pub fn build(&self) -> Filter {
        match self {
            FilterConfig::ScoreThreshold { min_score } => Filter::single(ScoreThresholdFilter {
                min_score: *min_score,
            }),
            FilterConfig::TypeColor { colors } => Filter::single(TypeColorFilter {
                colors: colors.clone(),
            }),
            FilterConfig::Highlight { kinds, color } => Filter::single(HighlightFilter {
                kinds: kinds.iter().cloned().collect(),
                color: *color,
            }),
        }
    }
}

/// Builds one group from a list of filter definitions, or `None` if empty.
pub fn build_filters(configs: &[FilterConfig]) -> Option<Filter> {
    if configs.is_empty() {
        return None;
    }
    Some(Filter::Group(configs.iter().map(FilterConfig::build).collect()))
}
