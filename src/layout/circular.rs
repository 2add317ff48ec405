use std::f64::consts::PI;

use tracing::debug;

use super::{EdgeRoutes, LayoutAlgorithm, LayoutInput, VertexPositions, prepare};
use crate::config::LayoutKind;
use crate::error::LayoutError;
use crate::geometry::{Point, Vector};

/// Places free vertices on one ring. Each box is treated as a circle of its
/// half-diagonal and gets an angular slot wide enough to keep neighbours
/// apart.
#[derive(Debug, Clone, Copy, Default)]
pub struct CircularLayout;

impl LayoutAlgorithm for CircularLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Circular
    }

    fn needs_vertex_sizes(&self) -> bool {
        true
    }

    fn compute(
        &mut self,
        input: &LayoutInput<'_>,
        positions: &mut VertexPositions,
    ) -> Result<EdgeRoutes, LayoutError> {
        if !prepare(input, positions, true)? {
            return Ok(EdgeRoutes::new());
        }
        let ids: Vec<_> = input
            .graph
            .active_vertices()
            .into_iter()
            .filter(|id| !input.graph.is_frozen(*id))
            .collect();
        if ids.is_empty() {
            return Ok(EdgeRoutes::new());
        }

        let halves: Vec<f64> = ids.iter().map(|id| input.size_of(*id).half_diagonal()).collect();
        let total: f64 = halves.iter().sum();
        let largest = halves.iter().copied().fold(0.0f64, f64::max);

        if total <= f64::EPSILON {
            // Point-sized vertices: even spacing on a unit ring.
            let step = 2.0 * PI / ids.len() as f64;
            for (idx, id) in ids.iter().enumerate() {
                let angle = step * idx as f64;
                positions.insert(*id, Point::new(1.0 + angle.cos(), 1.0 + angle.sin()));
            }
            return Ok(EdgeRoutes::new());
        }

        let mut radius = (total / PI).max(largest);
        input.cancel.check()?;
        let swept = sweep(&halves, radius, |_, _| {});
        radius = (radius * swept / (2.0 * PI)).max(radius);
        debug!(radius, vertices = ids.len(), "circular radius refined");

        input.cancel.check()?;
        let center = Point::new(radius, radius);
        let mut placed = Vec::with_capacity(ids.len());
        sweep(&halves, radius, |idx, angle| {
            let size = input.size_of(ids[idx]);
            let on_ring = center + Vector::new(angle.cos(), angle.sin()) * radius;
            placed.push((ids[idx], on_ring - Vector::from(size) * 0.5));
        });
        positions.extend(placed);
        Ok(EdgeRoutes::new())
    }
}

/// Walks the ring once, calling `place` with each vertex's centre angle, and
/// returns the total angle consumed.
fn sweep(halves: &[f64], radius: f64, mut place: impl FnMut(usize, f64)) -> f64 {
    let mut angle = 0.0;
    for (idx, half) in halves.iter().enumerate() {
        let step = (half / radius).min(1.0).asin();
        angle += step;
        place(idx, angle);
        angle += step;
    }
    angle
}
