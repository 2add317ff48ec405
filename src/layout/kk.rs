use std::collections::VecDeque;

use rand::Rng;
use tracing::debug;

use super::types::ActiveSet;
use super::{EdgeRoutes, LayoutAlgorithm, LayoutInput, VertexPositions, prepare, rng_from_seed};
use crate::config::{KkParameters, LayoutKind};
use crate::error::LayoutError;
use crate::geometry::{Point, Rect, Vector};

const MIN_DISTANCE: f64 = 1e-4;

/// Kamada-Kawai spring embedder. Springs connect every pair with a rest
/// length proportional to their graph distance; energy is minimised one
/// vertex at a time with Newton-Raphson steps.
#[derive(Debug, Clone, Default)]
pub struct KamadaKawaiLayout {
    parameters: KkParameters,
}

impl KamadaKawaiLayout {
    pub fn new(parameters: KkParameters) -> Self {
        Self { parameters }
    }
}

struct Springs {
    length: Vec<Vec<f64>>,
    strength: Vec<Vec<f64>>,
}

impl LayoutAlgorithm for KamadaKawaiLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::KamadaKawai
    }

    fn compute(
        &mut self,
        input: &LayoutInput<'_>,
        positions: &mut VertexPositions,
    ) -> Result<EdgeRoutes, LayoutError> {
        let p = &self.parameters;
        if p.width <= 0.0 || p.height <= 0.0 {
            return Err(LayoutError::InvalidParameter(
                "kamada-kawai needs a positive width and height".into(),
            ));
        }
        if !prepare(input, positions, false)? {
            return Ok(EdgeRoutes::new());
        }
        let set = ActiveSet::new(input.graph);
        let n = set.len();
        let mut rng = rng_from_seed(p.seed);
        let mut pos = set.gather(positions, |_| {
            Point::new(rng.random::<f64>() * p.width, rng.random::<f64>() * p.height)
        });
        if n < 2 {
            set.commit(&pos, positions);
            return Ok(EdgeRoutes::new());
        }

        let springs = self.springs(&set, input);
        let max_step = p.width.max(p.height);
        let mut iterations = 0;
        for _ in 0..p.max_iterations {
            set.checkpoint(input.cancel, &pos, positions)?;
            iterations += 1;
            let mut max_move = 0.0f64;
            for m in 0..n {
                if set.fixed[m] {
                    continue;
                }
                let mut step = newton_step(m, &pos, &springs);
                let length = step.length();
                if length > max_step {
                    step = step * (max_step / length);
                }
                pos[m] += step;
                max_move = max_move.max(step.length());
            }
            if p.exchange_vertices {
                exchange_pass(&set, &mut pos, &springs);
            }
            if max_move < p.epsilon {
                break;
            }
        }

        if set.free_count() == n {
            fit(&mut pos, p.width, p.height);
        }
        set.commit(&pos, positions);
        debug!(vertices = n, iterations, "kamada-kawai finished");
        Ok(EdgeRoutes::new())
    }
}

impl KamadaKawaiLayout {
    fn springs(&self, set: &ActiveSet, input: &LayoutInput<'_>) -> Springs {
        let p = &self.parameters;
        let n = set.len();
        let neighbors = set.neighbors(input.graph);
        let hops: Vec<Vec<Option<usize>>> = (0..n).map(|s| bfs(s, &neighbors)).collect();

        let max_hops = hops
            .iter()
            .flatten()
            .filter_map(|d| *d)
            .max()
            .unwrap_or(1)
            .max(1) as f64;
        let unreachable = max_hops * (1.0 + p.disconnected_multiplier);
        let edge_length = p.width.min(p.height) / max_hops * p.length_factor;

        let mut length = vec![vec![0.0; n]; n];
        let mut strength = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let d = hops[i][j].map(|d| d as f64).unwrap_or(unreachable);
                length[i][j] = edge_length * d;
                strength[i][j] = p.k / (d * d);
            }
        }
        Springs { length, strength }
    }
}

fn bfs(source: usize, neighbors: &[Vec<usize>]) -> Vec<Option<usize>> {
    let mut dist = vec![None; neighbors.len()];
    dist[source] = Some(0);
    let mut queue = VecDeque::from([source]);
    while let Some(v) = queue.pop_front() {
        let next = dist[v].unwrap_or(0) + 1;
        for &w in &neighbors[v] {
            if dist[w].is_none() {
                dist[w] = Some(next);
                queue.push_back(w);
            }
        }
    }
    dist
}

/// Newton-Raphson displacement for vertex `m` with every other vertex held.
fn newton_step(m: usize, pos: &[Point], springs: &Springs) -> Vector {
    let (mut gx, mut gy) = (0.0, 0.0);
    let (mut hxx, mut hxy, mut hyy) = (0.0, 0.0, 0.0);
    for i in 0..pos.len() {
        if i == m {
            continue;
        }
        let d = pos[m] - pos[i];
        let dist = d.length().max(MIN_DISTANCE);
        let k = springs.strength[m][i];
        let l = springs.length[m][i];
        let dist3 = dist * dist * dist;
        gx += k * (d.x - l * d.x / dist);
        gy += k * (d.y - l * d.y / dist);
        hxx += k * (1.0 - l * d.y * d.y / dist3);
        hxy += k * (l * d.x * d.y / dist3);
        hyy += k * (1.0 - l * d.x * d.x / dist3);
    }
    let det = hxx * hyy - hxy * hxy;
    if det.abs() < 1e-12 {
        return Vector::ZERO;
    }
    let dx = (-gx * hyy + gy * hxy) / det;
    let dy = (gx * hxy - gy * hxx) / det;
    let step = Vector::new(dx, dy);
    if step.x.is_finite() && step.y.is_finite() {
        step
    } else {
        Vector::ZERO
    }
}

fn energy_of(m: usize, at: Point, pos: &[Point], springs: &Springs, skip: usize) -> f64 {
    let mut energy = 0.0;
    for i in 0..pos.len() {
        if i == m || i == skip {
            continue;
        }
        let dist = at.distance(pos[i]);
        let diff = dist - springs.length[m][i];
        energy += 0.5 * springs.strength[m][i] * diff * diff;
    }
    energy
}

/// Swaps pairs of free vertices whenever that lowers the spring energy.
fn exchange_pass(set: &ActiveSet, pos: &mut [Point], springs: &Springs) {
    for i in 0..pos.len() {
        for j in (i + 1)..pos.len() {
            if set.fixed[i] || set.fixed[j] {
                continue;
            }
            let before = energy_of(i, pos[i], pos, springs, j) + energy_of(j, pos[j], pos, springs, i);
            let after = energy_of(i, pos[j], pos, springs, j) + energy_of(j, pos[i], pos, springs, i);
            if after < before {
                pos.swap(i, j);
            }
        }
    }
}

/// Translates the drawing to the origin and shrinks it into the frame.
fn fit(pos: &mut [Point], width: f64, height: f64) {
    let bounds = pos
        .iter()
        .fold(Rect::EMPTY, |acc, p| acc.union(&Rect::new(p.x, p.y, 0.0, 0.0)));
    if bounds.is_empty() {
        return;
    }
    let scale_x = if bounds.width > width { width / bounds.width } else { 1.0 };
    let scale_y = if bounds.height > height { height / bounds.height } else { 1.0 };
    let scale = scale_x.min(scale_y);
    for p in pos.iter_mut() {
        *p = Point::new((p.x - bounds.x) * scale, (p.y - bounds.y) * scale);
    }
}
