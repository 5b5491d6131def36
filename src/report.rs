//! Plain-text layout report.
//!
//! Used by the CLI mode: plans every track of every sequence at the current
//! viewport and writes the result as text, one line per sequence, track and
//! planned region.

use std::io::{self, Write};

use crate::model::Dataset;
use crate::planner::RenderPlan;
use crate::view::{TrackPlan, TrackView};

fn write_plan<W: Write>(out: &mut W, plan: &RenderPlan, depth: usize) -> io::Result<()> {
    writeln!(
        out,
        "{:indent$}{} {} x={:.2} y={:.2} w={:.2} h={:.2} {} {}",
        "",
        plan.kind,
        plan.id,
        plan.bounds.x,
        plan.bounds.y,
        plan.bounds.width,
        plan.bounds.height,
        plan.direction.arrow(),
        plan.color,
        indent = depth * 2
    )?;
    for child in &plan.children {
        write_plan(out, child, depth + 1)?;
    }
    Ok(())
}

/// Writes the layout of every sequence and track to `out`.
pub fn write_layout_report<W: Write>(view: &mut TrackView, out: &mut W) -> io::Result<()> {
    let sequences: Vec<String> = view.store().sequences().iter().map(|s| s.name.clone()).collect();
    let tracks: Vec<(String, &'static str)> = view
        .store()
        .tracks()
        .iter()
        .map(|t| {
            let kind = match t {
                Dataset::Region(_) => "region",
                Dataset::Numeric(_) => "numeric",
                Dataset::Sequence(_) => "sequence",
            };
            (t.name().to_string(), kind)
        })
        .collect();

    for sequence in &sequences {
        let Some(viewport) = view.viewport(sequence) else {
            continue;
        };
        writeln!(
            out,
            "{} {}-{} ({}) scale={:.4}",
            sequence, viewport.start, viewport.end, viewport.orientation, viewport.scale
        )?;

        for (track, kind) in &tracks {
            let height = view.track_height(track, sequence);
            writeln!(out, "  {} [{}] height={:.1}", track, kind, height)?;
            let Some(clip) = view.clip_window(sequence, 0.0, height) else {
                continue;
            };
            match view.plan_track(track, sequence, &clip) {
                Some(TrackPlan::Regions(output)) => {
                    for plan in &output.plans {
                        write_plan(out, plan, 2)?;
                    }
                    if output.failed {
                        writeln!(out, "    (incomplete: stale regions skipped)")?;
                    }
                }
                Some(TrackPlan::Numeric(columns)) => {
                    writeln!(out, "    {} columns", columns.len())?;
                }
                Some(TrackPlan::Bases(bases)) => {
                    let text: String = bases.iter().map(|b| b.base).collect();
                    writeln!(out, "    {}", text)?;
                }
                None => {}
            }
        }
    }
    Ok(())
}
