//! Row packing for expanded track layout.
//!
//! Overlapping regions are stacked into rows with a greedy single pass. The
//! regions are taken in the order given, without sorting, so the row count
//! depends on input order and is not guaranteed minimal.
//!
//! Row indices are returned as a side table keyed by [`RegionId`]; regions
//! themselves are never modified.

use std::collections::HashMap;

use crate::model::{Region, RegionId, RegionSource, Sequence};

/// Row index of each packed region, plus the row count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowAssignment {
    rows: HashMap<RegionId, usize>,
    total_rows: usize,
    valid: bool,
}

impl RowAssignment {
    /// Row of a region, if it was packed.
    pub fn row(&self, id: RegionId) -> Option<usize> {
        self.rows.get(&id).copied()
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    /// False once the region set has changed since packing.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Number of packed regions.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Greedy interval-to-row packer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionPacker {
    /// Minimum gap in bases between two regions on the same row
    spacing: i64,
}

impl RegionPacker {
    /// Creates a packer. A negative spacing is treated as zero.
    pub fn new(spacing: i64) -> Self {
        Self {
            spacing: spacing.max(0),
        }
    }

    pub fn spacing(&self) -> i64 {
        self.spacing
    }

    /// Assigns each region to the first row whose last region ends more than
    /// `spacing` bases before it starts, opening a new row otherwise.
    pub fn pack<'a, I>(&self, regions: I, sequence: &Sequence) -> RowAssignment
    where
        I: IntoIterator<Item = &'a Region>,
    {
        let mut last_end_per_row: Vec<i64> = Vec::new();
        let mut rows = HashMap::new();

        for region in regions {
            let start = region.relative_start(sequence);
            let end = region.relative_end(sequence);
            let row = match last_end_per_row
                .iter()
                .position(|&last_end| start > last_end + self.spacing)
            {
                Some(row) => {
                    last_end_per_row[row] = end;
                    row
                }
                None => {
                    last_end_per_row.push(end);
                    last_end_per_row.len() - 1
                }
            };
            rows.insert(region.id, row);
        }

        RowAssignment {
            rows,
            total_rows: last_end_per_row.len(),
            valid: true,
        }
    }
}

/// Pixel height of a packed track.
///
/// An empty track keeps the height of one row so it stays visible.
pub fn packed_height(total_rows: usize, row_height: i64, row_spacing: i64, margins: i64) -> i64 {
    let rows = total_rows.max(1) as i64;
    rows * row_height + (rows - 1) * row_spacing + margins
}

/// Cached row assignments per (track, sequence).
#[derive(Debug, Clone, Default)]
pub struct RowCache {
    entries: HashMap<(String, String), RowAssignment>,
}

impl RowCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a valid cached assignment without packing.
    pub fn get(&self, track: &str, sequence: &str) -> Option<&RowAssignment> {
        self.entries
            .get(&(track.to_string(), sequence.to_string()))
            .filter(|rows| rows.is_valid())
    }

    /// Returns the cached assignment, repacking it first if it is missing
    /// or invalid.
    pub fn get_or_pack<S>(
        &mut self,
        track: &str,
        sequence: &Sequence,
        source: &S,
        packer: &RegionPacker,
    ) -> &RowAssignment
    where
        S: RegionSource + ?Sized,
    {
        let entry = self
            .entries
            .entry((track.to_string(), sequence.name.clone()))
            .or_default();
        if !entry.is_valid() {
            let ids = source.region_ids(track, &sequence.name);
            let regions = ids.iter().filter_map(|&id| source.region(id));
            *entry = packer.pack(regions, sequence);
            log::debug!(
                "packed {}/{}: {} regions in {} rows",
                track,
                sequence.name,
                entry.len(),
                entry.total_rows()
            );
        }
        entry
    }

    /// Invalidates every sequence of a track.
    pub fn invalidate_track(&mut self, track: &str) {
        for ((owner, _), rows) in self.entries.iter_mut() {
            if owner == track {
                rows.invalidate();
            }
        }
    }

    /// Invalidates every track of a sequence.
    pub fn invalidate_sequence(&mut self, sequence: &str) {
        for ((_, owner), rows) in self.entries.iter_mut() {
            if owner == sequence {
                rows.invalidate();
            }
        }
    }

    pub fn invalidate_all(&mut self) {
        for rows in self.entries.values_mut() {
            rows.invalidate();
        }
    }
}
