use std::collections::VecDeque;

use rand::Rng;
use tracing::debug;

use super::types::ActiveSet;
use super::{EdgeRoutes, LayoutAlgorithm, LayoutInput, VertexPositions, prepare, rng_from_seed};
use crate::config::{IsomParameters, LayoutKind};
use crate::error::LayoutError;
use crate::geometry::Point;

/// Inverted self-organising map (Meyer). Each epoch draws a random stimulus,
/// finds the nearest vertex and drags its graph neighbourhood towards it.
#[derive(Debug, Clone, Default)]
pub struct IsomLayout {
    parameters: IsomParameters,
}

impl IsomLayout {
    pub fn new(parameters: IsomParameters) -> Self {
        Self { parameters }
    }
}

impl LayoutAlgorithm for IsomLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Isom
    }

    fn compute(
        &mut self,
        input: &LayoutInput<'_>,
        positions: &mut VertexPositions,
    ) -> Result<EdgeRoutes, LayoutError> {
        let p = &self.parameters;
        if p.width <= 0.0 || p.height <= 0.0 {
            return Err(LayoutError::InvalidParameter(
                "isom needs a positive width and height".into(),
            ));
        }
        if !prepare(input, positions, false)? {
            return Ok(EdgeRoutes::new());
        }
        let set = ActiveSet::new(input.graph);
        let neighbors = set.neighbors(input.graph);
        let mut rng = rng_from_seed(p.seed);
        let mut pos = set.gather(positions, |_| {
            Point::new(rng.random::<f64>() * p.width, rng.random::<f64>() * p.height)
        });

        let mut radius = p.initial_radius;
        let mut adaption = p.initial_adaption;
        let mut distance = vec![usize::MAX; set.len()];
        let mut queue = VecDeque::new();

        for epoch in 1..=p.max_epoch {
            set.checkpoint(input.cancel, &pos, positions)?;

            let stimulus = Point::new(rng.random::<f64>() * p.width, rng.random::<f64>() * p.height);
            let Some(winner) = closest(&pos, stimulus) else {
                break;
            };

            distance.fill(usize::MAX);
            distance[winner] = 0;
            queue.clear();
            queue.push_back(winner);
            while let Some(v) = queue.pop_front() {
                let d = distance[v];
                if !set.fixed[v] {
                    let factor = adaption / 2f64.powi(d as i32);
                    let delta = (stimulus - pos[v]) * factor;
                    pos[v] += delta;
                }
                if d < radius {
                    for &w in &neighbors[v] {
                        if distance[w] == usize::MAX {
                            distance[w] = d + 1;
                            queue.push_back(w);
                        }
                    }
                }
            }

            let progress = epoch as f64 / p.max_epoch as f64;
            adaption = (p.initial_adaption * (-p.cooling_factor * progress).exp()).max(p.min_adaption);
            if radius > p.min_radius && p.radius_constant_time > 0 && epoch % p.radius_constant_time == 0 {
                radius -= 1;
            }
        }

        set.commit(&pos, positions);
        debug!(vertices = set.len(), epochs = p.max_epoch, "isom finished");
        Ok(EdgeRoutes::new())
    }
}

fn closest(pos: &[Point], target: Point) -> Option<usize> {
    pos.iter()
        .enumerate()
        .map(|(idx, p)| (idx, (*p - target).length_squared()))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(idx, _)| idx)
}
