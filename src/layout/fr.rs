use rand::Rng;
use rand::rngs::StdRng;
use tracing::debug;

use super::types::ActiveSet;
use super::{EdgeRoutes, LayoutAlgorithm, LayoutInput, VertexPositions, prepare, rng_from_seed};
use crate::config::{BoundedFrParameters, CoolingFunction, FrParameters, LayoutKind};
use crate::error::LayoutError;
use crate::geometry::{Point, Vector};

const MIN_DISTANCE: f64 = 1e-4;

/// Fruchterman-Reingold on an unbounded plane, driven by an ideal edge
/// length.
#[derive(Debug, Clone, Default)]
pub struct FrLayout {
    parameters: FrParameters,
}

/// Fruchterman-Reingold confined to a `width` x `height` frame.
#[derive(Debug, Clone, Default)]
pub struct BoundedFrLayout {
    parameters: BoundedFrParameters,
}

impl FrLayout {
    pub fn new(parameters: FrParameters) -> Self {
        Self { parameters }
    }
}

impl BoundedFrLayout {
    pub fn new(parameters: BoundedFrParameters) -> Self {
        Self { parameters }
    }
}

#[derive(Debug, Clone, Copy)]
struct Schedule {
    k: f64,
    initial_temperature: f64,
    iterations: usize,
    attraction: f64,
    repulsion: f64,
    lambda: f64,
    cooling: CoolingFunction,
    frame: Option<(f64, f64)>,
}

impl Schedule {
    fn temperature(&self, current: f64, iteration: usize) -> f64 {
        match self.cooling {
            CoolingFunction::Linear => {
                self.initial_temperature * (1.0 - iteration as f64 / self.iterations.max(1) as f64)
            }
            CoolingFunction::Exponential => current * self.lambda,
        }
    }
}

impl LayoutAlgorithm for FrLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Fr
    }

    fn compute(
        &mut self,
        input: &LayoutInput<'_>,
        positions: &mut VertexPositions,
    ) -> Result<EdgeRoutes, LayoutError> {
        let p = &self.parameters;
        if p.ideal_edge_length <= 0.0 {
            return Err(LayoutError::InvalidParameter(
                "ideal edge length must be positive".into(),
            ));
        }
        let n = input.graph.active_vertices().len().max(1) as f64;
        let schedule = Schedule {
            k: p.ideal_edge_length,
            initial_temperature: (p.ideal_edge_length * p.ideal_edge_length * n).sqrt(),
            iterations: p.iteration_limit,
            attraction: p.attraction_multiplier,
            repulsion: p.repulsive_multiplier,
            lambda: p.lambda,
            cooling: p.cooling,
            frame: None,
        };
        run(&schedule, p.seed, input, positions)
    }
}

impl LayoutAlgorithm for BoundedFrLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::BoundedFr
    }

    fn compute(
        &mut self,
        input: &LayoutInput<'_>,
        positions: &mut VertexPositions,
    ) -> Result<EdgeRoutes, LayoutError> {
        let p = &self.parameters;
        if p.width <= 0.0 || p.height <= 0.0 {
            return Err(LayoutError::InvalidParameter(
                "bounded layout needs a positive width and height".into(),
            ));
        }
        let n = input.graph.active_vertices().len().max(1) as f64;
        let schedule = Schedule {
            k: (p.width * p.height / n).sqrt(),
            initial_temperature: p.width.min(p.height) / 10.0,
            iterations: p.iteration_limit,
            attraction: p.attraction_multiplier,
            repulsion: p.repulsive_multiplier,
            lambda: p.lambda,
            cooling: p.cooling,
            frame: Some((p.width, p.height)),
        };
        run(&schedule, p.seed, input, positions)
    }
}

fn run(
    schedule: &Schedule,
    seed: Option<u64>,
    input: &LayoutInput<'_>,
    positions: &mut VertexPositions,
) -> Result<EdgeRoutes, LayoutError> {
    if !prepare(input, positions, false)? {
        return Ok(EdgeRoutes::new());
    }
    let set = ActiveSet::new(input.graph);
    let edges = set.edges(input.graph);
    let mut rng = rng_from_seed(seed);

    let (span_x, span_y) = schedule.frame.unwrap_or_else(|| {
        let side = (set.len() as f64).sqrt() * schedule.k;
        (side, side)
    });
    let mut pos = set.gather(positions, |_| {
        Point::new(rng.random::<f64>() * span_x, rng.random::<f64>() * span_y)
    });

    let k2 = schedule.k * schedule.k;
    let mut temperature = schedule.initial_temperature;
    let mut displacement = vec![Vector::ZERO; set.len()];

    for iteration in 0..schedule.iterations {
        set.checkpoint(input.cancel, &pos, positions)?;
        displacement.fill(Vector::ZERO);

        for v in 0..set.len() {
            for u in 0..set.len() {
                if u == v {
                    continue;
                }
                let (direction, length) = separation(pos[v], pos[u], &mut rng);
                displacement[v] += direction * (k2 / length * schedule.repulsion);
            }
        }

        for edge in &edges {
            let (direction, length) = separation(pos[edge.source], pos[edge.target], &mut rng);
            let force = length * length / schedule.k * schedule.attraction * edge.weight;
            displacement[edge.source] -= direction * force;
            displacement[edge.target] += direction * force;
        }

        let mut next = pos.clone();
        for v in 0..set.len() {
            if set.fixed[v] {
                continue;
            }
            let d = displacement[v];
            let length = d.length();
            if length > 0.0 {
                next[v] += d * (length.min(temperature) / length);
            }
            if let Some((width, height)) = schedule.frame {
                next[v].x = next[v].x.clamp(0.0, width);
                next[v].y = next[v].y.clamp(0.0, height);
            }
        }
        pos = next;
        temperature = schedule.temperature(temperature, iteration + 1).max(0.0);
    }

    set.commit(&pos, positions);
    debug!(
        vertices = set.len(),
        iterations = schedule.iterations,
        "fruchterman-reingold finished"
    );
    Ok(EdgeRoutes::new())
}

/// Unit vector pointing from `b` to `a` plus the clamped distance.
/// Coincident points get a random direction.
fn separation(a: Point, b: Point, rng: &mut StdRng) -> (Vector, f64) {
    let delta = a - b;
    let length = delta.length();
    if length < MIN_DISTANCE {
        let angle = rng.random::<f64>() * std::f64::consts::TAU;
        return (Vector::new(angle.cos(), angle.sin()), MIN_DISTANCE);
    }
    (delta * (1.0 / length), length)
}
