use rand::Rng;
use tracing::debug;

use super::quadtree::{QuadNode, QuadTree};
use super::types::{ActiveSet, SlotEdge};
use super::{EdgeRoutes, LayoutAlgorithm, LayoutInput, VertexPositions, prepare, rng_from_seed};
use crate::config::{LayoutKind, LinLogParameters};
use crate::error::LayoutError;
use crate::geometry::{Point, Vector};

/// Noack's LinLog energy model minimised with a Barnes-Hut approximation of
/// the repulsion term. Works in unit space and scales the result by
/// `scale`.
#[derive(Debug, Clone, Default)]
pub struct LinLogLayout {
    parameters: LinLogParameters,
}

impl LinLogLayout {
    pub fn new(parameters: LinLogParameters) -> Self {
        Self { parameters }
    }
}

struct Energy<'a> {
    attraction_exponent: f64,
    repulsion_exponent: f64,
    repulsion_factor: f64,
    gravitation_factor: f64,
    mass: Vec<f64>,
    adjacency: Vec<Vec<(usize, f64)>>,
    edges: &'a [SlotEdge],
}

impl LayoutAlgorithm for LinLogLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::LinLog
    }

    fn compute(
        &mut self,
        input: &LayoutInput<'_>,
        positions: &mut VertexPositions,
    ) -> Result<EdgeRoutes, LayoutError> {
        let p = &self.parameters;
        if p.scale <= 0.0 {
            return Err(LayoutError::InvalidParameter("lin-log scale must be positive".into()));
        }
        if !prepare(input, positions, false)? {
            return Ok(EdgeRoutes::new());
        }
        let set = ActiveSet::new(input.graph);
        let edges = set.edges(input.graph);
        let mut rng = rng_from_seed(p.seed);
        let scale = p.scale;
        let mut pos: Vec<Point> = set
            .gather(positions, |_| {
                Point::new(
                    (rng.random::<f64>() - 0.5) * scale,
                    (rng.random::<f64>() - 0.5) * scale,
                )
            })
            .into_iter()
            .map(|q| Point::new(q.x / scale, q.y / scale))
            .collect();

        let mut energy = Energy::new(p, set.len(), &edges);
        energy.calibrate(&pos, p.gravitation_multiplier);

        for iteration in 0..p.iteration_count {
            if input.cancel.is_cancelled() {
                set.commit(&unit_to_world(&pos, scale), positions);
                return Err(LayoutError::Cancelled);
            }
            let barycenter = energy.barycenter(&pos);
            let mut tree = QuadTree::build(&pos, &energy.mass);
            let mut moved = 0usize;
            for v in 0..set.len() {
                if set.fixed[v] {
                    continue;
                }
                if energy.relax(v, &mut pos, &mut tree, barycenter) {
                    moved += 1;
                }
            }
            debug!(iteration, moved, "lin-log iteration");
        }

        set.commit(&unit_to_world(&pos, scale), positions);
        Ok(EdgeRoutes::new())
    }
}

fn unit_to_world(pos: &[Point], scale: f64) -> Vec<Point> {
    pos.iter().map(|p| Point::new(p.x * scale, p.y * scale)).collect()
}

impl<'a> Energy<'a> {
    fn new(parameters: &LinLogParameters, n: usize, edges: &'a [SlotEdge]) -> Self {
        let mut adjacency = vec![Vec::new(); n];
        let mut mass = vec![0.0; n];
        for edge in edges {
            adjacency[edge.source].push((edge.target, edge.weight));
            adjacency[edge.target].push((edge.source, edge.weight));
            mass[edge.source] += edge.weight;
            mass[edge.target] += edge.weight;
        }
        for m in mass.iter_mut() {
            *m = m.max(1.0);
        }
        Self {
            attraction_exponent: parameters.attraction_exponent,
            repulsion_exponent: parameters.repulsive_exponent,
            repulsion_factor: 1.0,
            gravitation_factor: parameters.gravitation_multiplier,
            mass,
            adjacency,
            edges,
        }
    }

    /// Balances repulsion against the total edge weight so that the
    /// equilibrium edge length is independent of graph density.
    fn calibrate(&mut self, pos: &[Point], gravitation: f64) {
        let attraction_sum: f64 = self.edges.iter().map(|e| e.weight).sum();
        let mass_sum: f64 = self.mass.iter().sum();
        if attraction_sum <= 0.0 || mass_sum <= 0.0 {
            return;
        }
        let weighted: f64 = self
            .edges
            .iter()
            .map(|e| e.weight * pos[e.source].distance(pos[e.target]))
            .sum();
        let average = (weighted / attraction_sum).max(1e-6);
        let density = attraction_sum / mass_sum / mass_sum;
        let shape = average.powf(self.attraction_exponent - self.repulsion_exponent);
        self.repulsion_factor = density * shape;
        self.gravitation_factor = gravitation * density * mass_sum * shape;
    }

    fn barycenter(&self, pos: &[Point]) -> Point {
        let total: f64 = self.mass.iter().sum();
        let (x, y) = pos
            .iter()
            .zip(&self.mass)
            .fold((0.0, 0.0), |(x, y), (p, m)| (x + p.x * m, y + p.y * m));
        Point::new(x / total, y / total)
    }

    /// Potential with the `exponent`-family kernel (`ln` at zero).
    fn kernel(distance: f64, exponent: f64) -> f64 {
        if exponent == 0.0 {
            distance.ln()
        } else {
            distance.powf(exponent) / exponent
        }
    }

    fn energy(&self, v: usize, pos: &[Point], tree: &QuadTree, barycenter: Point) -> f64 {
        let at = pos[v];
        let mut total = -self.repulsion_factor * self.mass[v] * self.repulsion(v, pos, tree.root(), tree);
        for &(w, weight) in &self.adjacency[v] {
            let d = at.distance(pos[w]);
            if d > 0.0 {
                total += weight * Self::kernel(d, self.attraction_exponent);
            }
        }
        let d = at.distance(barycenter);
        if d > 0.0 {
            total += self.gravitation_factor * self.mass[v] * Self::kernel(d, self.attraction_exponent);
        }
        total
    }

    /// Sum of `mass * kernel(distance)` over the tree, excluding `v`.
    fn repulsion(&self, v: usize, pos: &[Point], node: &QuadNode, tree: &QuadTree) -> f64 {
        let Some((mass, center)) = self.without(v, node, pos) else {
            return 0.0;
        };
        let d = pos[v].distance(center);
        if let Some(children) = node.children
            && d < 2.0 * node.width()
        {
            return children
                .iter()
                .map(|&c| self.repulsion(v, pos, tree.node(c), tree))
                .sum();
        }
        if d <= 0.0 {
            return 0.0;
        }
        mass * Self::kernel(d, self.repulsion_exponent)
    }

    /// Mass and centre of `node` with `v` itself taken out when it lives
    /// there. Occupied leaves are summed directly since `v` may be mid line
    /// search.
    fn without(&self, v: usize, node: &QuadNode, pos: &[Point]) -> Option<(f64, Point)> {
        if node.mass <= 0.0 {
            return None;
        }
        if !node.occupants.contains(&v) {
            return Some((node.mass, node.center));
        }
        let (mut mass, mut x, mut y) = (0.0, 0.0, 0.0);
        for &o in node.occupants.iter().filter(|o| **o != v) {
            let m = self.mass[o];
            mass += m;
            x += pos[o].x * m;
            y += pos[o].y * m;
        }
        (mass > 0.0).then(|| (mass, Point::new(x / mass, y / mass)))
    }

    /// Gradient-over-curvature direction for `v`.
    fn direction(&self, v: usize, pos: &[Point], tree: &QuadTree, barycenter: Point) -> Vector {
        let at = pos[v];
        let mut dir = Vector::ZERO;
        let mut curvature = self.repulsion_direction(v, pos, tree.root(), tree, &mut dir);

        for &(w, weight) in &self.adjacency[v] {
            let delta = pos[w] - at;
            let d = delta.length();
            if d <= 0.0 {
                continue;
            }
            let tmp = weight * d.powf(self.attraction_exponent - 2.0);
            curvature += tmp * (self.attraction_exponent - 1.0).abs();
            dir += delta * tmp;
        }

        let delta = barycenter - at;
        let d = delta.length();
        if d > 0.0 {
            let tmp = self.gravitation_factor
                * self.mass[v]
                * d.powf(self.attraction_exponent - 2.0);
            curvature += tmp * (self.attraction_exponent - 1.0).abs();
            dir += delta * tmp;
        }

        if curvature <= 0.0 || !curvature.is_finite() {
            return Vector::ZERO;
        }
        let mut dir = dir * (1.0 / curvature);
        let limit = tree.root().width() / 8.0;
        let length = dir.length();
        if length > limit {
            dir = dir * (limit / length);
        }
        dir
    }

    fn repulsion_direction(
        &self,
        v: usize,
        pos: &[Point],
        node: &QuadNode,
        tree: &QuadTree,
        dir: &mut Vector,
    ) -> f64 {
        let Some((mass, center)) = self.without(v, node, pos) else {
            return 0.0;
        };
        let at = pos[v];
        let d = at.distance(center);
        if let Some(children) = node.children
            && d < 2.0 * node.width()
        {
            let mut curvature = 0.0;
            for child in children {
                curvature += self.repulsion_direction(v, pos, tree.node(child), tree, dir);
            }
            return curvature;
        }
        if d <= 0.0 {
            return 0.0;
        }
        let tmp = self.repulsion_factor * self.mass[v] * mass * d.powf(self.repulsion_exponent - 2.0);
        *dir -= (center - at) * tmp;
        tmp * (self.repulsion_exponent - 1.0).abs()
    }

    /// Line search along the Newton-like direction. Returns whether `v`
    /// moved.
    fn relax(&self, v: usize, pos: &mut [Point], tree: &mut QuadTree, barycenter: Point) -> bool {
        let origin = pos[v];
        let base = self.energy(v, pos, tree, barycenter);
        let dir = self.direction(v, pos, tree, barycenter);
        if dir == Vector::ZERO {
            return false;
        }

        let mut best_energy = base;
        let mut best_multiple = 0.0;
        let mut multiple = 32.0;
        while multiple >= 1.0 / 32.0 && best_multiple == 0.0 {
            pos[v] = origin + dir * multiple;
            let e = self.energy(v, pos, tree, barycenter);
            if e < best_energy {
                best_energy = e;
                best_multiple = multiple;
            }
            multiple /= 2.0;
        }
        let mut multiple = 64.0;
        while multiple <= 128.0 && best_multiple == multiple / 2.0 {
            pos[v] = origin + dir * multiple;
            let e = self.energy(v, pos, tree, barycenter);
            if e < best_energy {
                best_energy = e;
                best_multiple = multiple;
            }
            multiple *= 2.0;
        }

        pos[v] = origin + dir * best_multiple;
        if best_multiple > 0.0 {
            tree.move_vertex(v, origin, pos[v], self.mass[v]);
            true
        } else {
            false
        }
    }
}
