use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::{OVERLAP_TOLERANCE, OverlapRemovalAlgorithm};
use crate::cancel::CancellationToken;
use crate::config::{OneWayDirection, OverlapRemovalParameters};
use crate::error::LayoutError;
use crate::geometry::{Rect, Vector};
use crate::ir::VertexId;

const COINCIDENT: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

/// Force-transfer scan: alternating horizontal and vertical passes push
/// overlapping neighbours apart along the line joining their centres.
/// A left-to-right sweep finishes the job if the passes run out of rounds.
#[derive(Debug, Clone, Default)]
pub struct FsaOverlapRemoval {
    parameters: OverlapRemovalParameters,
}

impl FsaOverlapRemoval {
    pub fn new(parameters: OverlapRemovalParameters) -> Self {
        Self { parameters }
    }
}

/// Force-transfer scan restricted to one axis.
#[derive(Debug, Clone, Default)]
pub struct OneWayFsaOverlapRemoval {
    parameters: OverlapRemovalParameters,
}

impl OneWayFsaOverlapRemoval {
    pub fn new(parameters: OverlapRemovalParameters) -> Self {
        Self { parameters }
    }
}

impl OverlapRemovalAlgorithm for FsaOverlapRemoval {
    fn compute(
        &mut self,
        rects: &mut BTreeMap<VertexId, Rect>,
        fixed: &BTreeSet<VertexId>,
        cancel: &CancellationToken,
    ) -> Result<(), LayoutError> {
        run(rects, fixed, cancel, &self.parameters, &[Axis::X, Axis::Y])
    }
}

impl OverlapRemovalAlgorithm for OneWayFsaOverlapRemoval {
    fn compute(
        &mut self,
        rects: &mut BTreeMap<VertexId, Rect>,
        fixed: &BTreeSet<VertexId>,
        cancel: &CancellationToken,
    ) -> Result<(), LayoutError> {
        let axis = match self.parameters.one_way_direction {
            OneWayDirection::Horizontal => Axis::X,
            OneWayDirection::Vertical => Axis::Y,
        };
        run(rects, fixed, cancel, &self.parameters, &[axis])
    }
}

fn run(
    rects: &mut BTreeMap<VertexId, Rect>,
    fixed: &BTreeSet<VertexId>,
    cancel: &CancellationToken,
    parameters: &OverlapRemovalParameters,
    axes: &[Axis],
) -> Result<(), LayoutError> {
    let hgap = parameters.horizontal_gap;
    let vgap = parameters.vertical_gap;
    if !(hgap >= 0.0 && vgap >= 0.0) {
        return Err(LayoutError::InvalidParameter(format!(
            "overlap gaps must be non-negative, got {hgap} and {vgap}"
        )));
    }
    let ids: Vec<VertexId> = rects.keys().copied().collect();
    let pinned: Vec<bool> = ids.iter().map(|id| fixed.contains(id)).collect();
    let mut work: Vec<Rect> = rects
        .values()
        .map(|r| r.inflate(hgap * 0.5, vgap * 0.5))
        .collect();
    let start = work.clone();

    let mut rounds = 0;
    while rounds < parameters.max_iterations && any_overlap(&work) {
        cancel.check()?;
        let mut moved = false;
        for axis in axes {
            moved |= scan(&mut work, &pinned, *axis);
        }
        rounds += 1;
        if !moved {
            break;
        }
    }

    cancel.check()?;
    let swept = any_overlap(&work);
    if swept {
        sweep(&mut work, &pinned, axes[0]);
    }

    let half_gap = Vector::new(hgap * 0.5, vgap * 0.5);
    for (slot, id) in ids.iter().enumerate() {
        if pinned[slot] || work[slot] == start[slot] {
            continue;
        }
        if let Some(rect) = rects.get_mut(id) {
            let corner = work[slot].top_left() + half_gap;
            rect.x = corner.x;
            rect.y = corner.y;
        }
    }
    debug!(rects = ids.len(), rounds, swept, "overlap removal finished");
    Ok(())
}

fn any_overlap(rects: &[Rect]) -> bool {
    (0..rects.len()).any(|i| {
        ((i + 1)..rects.len()).any(|j| rects[i].intersects_with_tolerance(&rects[j], OVERLAP_TOLERANCE))
    })
}

fn along(rect: &Rect, axis: Axis) -> f64 {
    match axis {
        Axis::X => rect.center().x,
        Axis::Y => rect.center().y,
    }
}

fn shift(rect: &mut Rect, axis: Axis, by: f64) {
    match axis {
        Axis::X => rect.x += by,
        Axis::Y => rect.y += by,
    }
}

/// Signed displacement for `b` that resolves its overlap with `a` along
/// `axis`. Zero when the overlap is better resolved on the other axis.
fn force(a: &Rect, b: &Rect, axis: Axis) -> f64 {
    let ca = a.center();
    let cb = b.center();
    let (d_main, d_cross, half_main, half_cross) = match axis {
        Axis::X => (
            cb.x - ca.x,
            cb.y - ca.y,
            (a.width + b.width) * 0.5,
            (a.height + b.height) * 0.5,
        ),
        Axis::Y => (
            cb.y - ca.y,
            cb.x - ca.x,
            (a.height + b.height) * 0.5,
            (a.width + b.width) * 0.5,
        ),
    };
    if d_main.abs() < COINCIDENT {
        // Stacked centres: only push when fully coincident.
        return if d_cross.abs() < COINCIDENT { half_main } else { 0.0 };
    }
    let slope = (d_cross / d_main).abs();
    let ratio = if half_main > 0.0 {
        half_cross / half_main
    } else {
        f64::INFINITY
    };
    let magnitude = if slope <= ratio {
        half_main - d_main.abs()
    } else {
        half_cross * (d_main / d_cross).abs() - d_main.abs()
    };
    magnitude.max(0.0) * d_main.signum()
}

/// One ordered pass along `axis`. Returns whether anything moved.
fn scan(rects: &mut [Rect], pinned: &[bool], axis: Axis) -> bool {
    let n = rects.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|a, b| {
        along(&rects[*a], axis)
            .total_cmp(&along(&rects[*b], axis))
            .then(a.cmp(b))
    });

    let mut moved = false;
    for oi in 0..n {
        let i = order[oi];
        for &j in &order[(oi + 1)..] {
            if !rects[i].intersects_with_tolerance(&rects[j], OVERLAP_TOLERANCE) {
                continue;
            }
            let push = force(&rects[i], &rects[j], axis);
            if push.abs() <= OVERLAP_TOLERANCE {
                continue;
            }
            if !pinned[j] {
                shift(&mut rects[j], axis, push);
            } else if !pinned[i] {
                shift(&mut rects[i], axis, -push);
            } else {
                continue;
            }
            moved = true;
        }
    }
    moved
}

/// Places fixed rectangles first, then every free one in order along
/// `axis`, pushing each past whatever it still overlaps. Always terminates
/// with no overlaps.
fn sweep(rects: &mut [Rect], pinned: &[bool], axis: Axis) {
    let mut placed: Vec<usize> = (0..rects.len()).filter(|i| pinned[*i]).collect();
    let mut free: Vec<usize> = (0..rects.len()).filter(|i| !pinned[*i]).collect();
    free.sort_by(|a, b| {
        along(&rects[*a], axis)
            .total_cmp(&along(&rects[*b], axis))
            .then(a.cmp(b))
    });

    for i in free {
        loop {
            let blocker = placed
                .iter()
                .filter(|p| rects[i].intersects_with_tolerance(&rects[**p], OVERLAP_TOLERANCE))
                .map(|p| match axis {
                    Axis::X => rects[*p].right(),
                    Axis::Y => rects[*p].bottom(),
                })
                .fold(f64::NEG_INFINITY, f64::max);
            if blocker == f64::NEG_INFINITY {
                break;
            }
            match axis {
                Axis::X => rects[i].x = blocker,
                Axis::Y => rects[i].y = blocker,
            }
        }
        placed.push(i);
    }
}
