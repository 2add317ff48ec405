mod fsa;

pub use fsa::{FsaOverlapRemoval, OneWayFsaOverlapRemoval};

use std::collections::{BTreeMap, BTreeSet};

use crate::cancel::CancellationToken;
use crate::config::{OverlapRemovalKind, OverlapRemovalParameters};
use crate::error::LayoutError;
use crate::geometry::{Rect, Size};
use crate::ir::{Graph, VertexId};
use crate::layout::{VertexPositions, VertexSizes};

/// Separation tolerance: rectangles overlapping by less than this count as
/// apart.
pub const OVERLAP_TOLERANCE: f64 = 1e-6;

/// Moves rectangles until no two padded rectangles overlap.
///
/// Rectangles listed in `fixed` never move. On cancellation the map is left
/// untouched.
pub trait OverlapRemovalAlgorithm: Send {
    fn compute(
        &mut self,
        rects: &mut BTreeMap<VertexId, Rect>,
        fixed: &BTreeSet<VertexId>,
        cancel: &CancellationToken,
    ) -> Result<(), LayoutError>;
}

/// `None` when `kind` disables overlap removal.
pub fn create_overlap_removal(
    kind: OverlapRemovalKind,
    parameters: OverlapRemovalParameters,
) -> Option<Box<dyn OverlapRemovalAlgorithm>> {
    match kind {
        OverlapRemovalKind::None => None,
        OverlapRemovalKind::Fsa => Some(Box::new(FsaOverlapRemoval::new(parameters))),
        OverlapRemovalKind::OneWayFsa => Some(Box::new(OneWayFsaOverlapRemoval::new(parameters))),
    }
}

/// Runs `algorithm` over the active vertices of `graph`, converting
/// positions and sizes to rectangles and back. Frozen vertices act as fixed
/// obstacles; vertices without a position are skipped.
pub fn remove_overlaps(
    algorithm: &mut dyn OverlapRemovalAlgorithm,
    graph: &Graph,
    positions: &mut VertexPositions,
    sizes: &VertexSizes,
    cancel: &CancellationToken,
) -> Result<(), LayoutError> {
    let mut rects = BTreeMap::new();
    let mut fixed = BTreeSet::new();
    for id in graph.active_vertices() {
        let Some(position) = positions.get(&id) else {
            continue;
        };
        let size = sizes.get(&id).copied().unwrap_or(Size::ZERO);
        rects.insert(id, Rect::from_position(*position, size));
        if graph.is_frozen(id) {
            fixed.insert(id);
        }
    }
    algorithm.compute(&mut rects, &fixed, cancel)?;
    for (id, rect) in rects {
        positions.insert(id, rect.top_left());
    }
    Ok(())
}

/// True when any two rectangles, grown by half the gaps on every side,
/// overlap.
pub fn has_overlaps(rects: &BTreeMap<VertexId, Rect>, horizontal_gap: f64, vertical_gap: f64) -> bool {
    let padded: Vec<Rect> = rects
        .values()
        .map(|r| r.inflate(horizontal_gap * 0.5, vertical_gap * 0.5))
        .collect();
    for i in 0..padded.len() {
        for j in (i + 1)..padded.len() {
            if padded[i].intersects_with_tolerance(&padded[j], OVERLAP_TOLERANCE) {
                return true;
            }
        }
    }
    false
}
