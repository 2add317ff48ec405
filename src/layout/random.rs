use std::collections::BTreeSet;

use rand::Rng;
use tracing::debug;

use super::{EdgeRoutes, LayoutAlgorithm, LayoutInput, VertexPositions, prepare, rng_from_seed};
use crate::config::{LayoutKind, RandomParameters};
use crate::error::LayoutError;
use crate::geometry::Point;
use crate::ir::VertexId;

/// Scatters free vertices uniformly so that every box stays inside
/// `bounds`. Sizes are optional; a missing size counts as a point. Frozen
/// vertices keep an existing position and are scattered otherwise.
#[derive(Debug, Clone, Default)]
pub struct RandomLayout {
    parameters: RandomParameters,
}

impl RandomLayout {
    pub fn new(parameters: RandomParameters) -> Self {
        Self { parameters }
    }
}

impl LayoutAlgorithm for RandomLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Random
    }

    fn compute(
        &mut self,
        input: &LayoutInput<'_>,
        positions: &mut VertexPositions,
    ) -> Result<EdgeRoutes, LayoutError> {
        let bounds = self.parameters.bounds;
        if bounds.is_empty() {
            return Err(LayoutError::InvalidParameter(
                "random layout bounds must not be empty".into(),
            ));
        }
        // Frozen vertices without a position are scattered like free ones.
        let unplaced: BTreeSet<VertexId> = input
            .graph
            .active_vertices()
            .into_iter()
            .filter(|id| !positions.contains_key(id))
            .collect();
        if !prepare(input, positions, false)? {
            return Ok(EdgeRoutes::new());
        }
        let mut rng = rng_from_seed(self.parameters.seed);
        let mut placed = 0usize;
        for id in input.graph.active_vertices() {
            input.cancel.check()?;
            if input.graph.is_frozen(id) && !unplaced.contains(&id) {
                continue;
            }
            let size = input.size_of(id);
            let span_x = (bounds.width - size.width).max(0.0);
            let span_y = (bounds.height - size.height).max(0.0);
            let x = bounds.x + rng.random::<f64>() * span_x;
            let y = bounds.y + rng.random::<f64>() * span_y;
            positions.insert(id, Point::new(x, y));
            placed += 1;
        }
        debug!(placed, "random layout finished");
        Ok(EdgeRoutes::new())
    }
}
