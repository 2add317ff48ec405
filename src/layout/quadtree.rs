//! Barnes-Hut quad-tree over vertex slots.
//!
//! Each node stores the total mass and centre of mass of the vertices below
//! it. A leaf holds one vertex and splits when a second arrives. Nodes at
//! [`MAX_DEPTH`] never split; they become buckets that aggregate every vertex
//! that reaches them, so coincident vertices are never lost.
//!
//! The tree is meant to be rebuilt once per solver iteration. Between
//! rebuilds, [`QuadTree::move_vertex`] shifts the centre of mass along the
//! moved vertex's ancestor chain in proportion to its share of each node's
//! mass. Cell bounds are not updated, which is the accepted approximation.

use crate::geometry::Point;

pub(crate) const MAX_DEPTH: usize = 20;

#[derive(Debug, Clone)]
pub(crate) struct QuadNode {
    pub(crate) mass: f64,
    pub(crate) center: Point,
    pub(crate) min: Point,
    pub(crate) max: Point,
    pub(crate) depth: usize,
    pub(crate) children: Option<[usize; 4]>,
    pub(crate) occupants: Vec<usize>,
    parent: Option<usize>,
}

impl QuadNode {
    fn new(min: Point, max: Point, depth: usize, parent: Option<usize>) -> Self {
        Self {
            mass: 0.0,
            center: min.midpoint(max),
            min,
            max,
            depth,
            children: None,
            occupants: Vec::new(),
            parent,
        }
    }

    /// Longest side of the cell.
    pub(crate) fn width(&self) -> f64 {
        (self.max.x - self.min.x).max(self.max.y - self.min.y)
    }

    fn quadrant(&self, p: Point) -> usize {
        let mid = self.min.midpoint(self.max);
        usize::from(p.x >= mid.x) + 2 * usize::from(p.y >= mid.y)
    }

    fn child_bounds(&self, quadrant: usize) -> (Point, Point) {
        let mid = self.min.midpoint(self.max);
        let (x0, x1) = if quadrant & 1 == 0 {
            (self.min.x, mid.x)
        } else {
            (mid.x, self.max.x)
        };
        let (y0, y1) = if quadrant & 2 == 0 {
            (self.min.y, mid.y)
        } else {
            (mid.y, self.max.y)
        };
        (Point::new(x0, y0), Point::new(x1, y1))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct QuadTree {
    nodes: Vec<QuadNode>,
    home: Vec<usize>,
}

impl QuadTree {
    /// Builds a tree over every slot with positive mass.
    pub(crate) fn build(pos: &[Point], mass: &[f64]) -> Self {
        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in pos {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        if pos.is_empty() {
            min = Point::ORIGIN;
            max = Point::ORIGIN;
        }
        // Square root cell with a little slack so points on the max edge fit.
        let side = (max.x - min.x).max(max.y - min.y).max(1.0) * 1.0001;
        let max = Point::new(min.x + side, min.y + side);

        let mut tree = Self {
            nodes: vec![QuadNode::new(min, max, 0, None)],
            home: vec![0; pos.len()],
        };
        for (v, p) in pos.iter().enumerate() {
            if mass[v] > 0.0 {
                tree.insert(v, *p, mass[v], pos);
            }
        }
        tree
    }

    pub(crate) fn root(&self) -> &QuadNode {
        &self.nodes[0]
    }

    pub(crate) fn node(&self, idx: usize) -> &QuadNode {
        &self.nodes[idx]
    }

    fn insert(&mut self, v: usize, p: Point, m: f64, pos: &[Point]) {
        let mut idx = 0;
        loop {
            let node = &mut self.nodes[idx];
            let total = node.mass + m;
            node.center = Point::new(
                (node.center.x * node.mass + p.x * m) / total,
                (node.center.y * node.mass + p.y * m) / total,
            );
            node.mass = total;

            if let Some(children) = node.children {
                idx = children[node.quadrant(p)];
                continue;
            }
            if node.occupants.is_empty() || node.depth >= MAX_DEPTH {
                node.occupants.push(v);
                self.home[v] = idx;
                return;
            }

            // Second vertex in a leaf: split and push the resident down.
            let resident = node.occupants.remove(0);
            let resident_mass = node.mass - m;
            let resident_pos = pos[resident];
            let children = self.split(idx);
            let target = children[self.nodes[idx].quadrant(resident_pos)];
            let child = &mut self.nodes[target];
            child.mass = resident_mass;
            child.center = resident_pos;
            child.occupants.push(resident);
            self.home[resident] = target;

            idx = children[self.nodes[idx].quadrant(p)];
        }
    }

    fn split(&mut self, idx: usize) -> [usize; 4] {
        let base = self.nodes.len();
        let depth = self.nodes[idx].depth + 1;
        for quadrant in 0..4 {
            let (min, max) = self.nodes[idx].child_bounds(quadrant);
            self.nodes.push(QuadNode::new(min, max, depth, Some(idx)));
        }
        let children = [base, base + 1, base + 2, base + 3];
        self.nodes[idx].children = Some(children);
        children
    }

    /// Shifts the centres of mass on `v`'s ancestor chain after it moved from
    /// `from` to `to`.
    pub(crate) fn move_vertex(&mut self, v: usize, from: Point, to: Point, mass: f64) {
        let delta = to - from;
        let mut cursor = self.home.get(v).copied();
        while let Some(idx) = cursor {
            let node = &mut self.nodes[idx];
            if node.mass > 0.0 {
                node.center += delta * (mass / node.mass);
            }
            cursor = node.parent;
        }
    }

    #[cfg(test)]
    fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.occupants.is_empty()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_aggregates_mass_and_center() {
        let pos = [Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(0.0, 10.0)];
        let tree = QuadTree::build(&pos, &[1.0, 1.0, 2.0]);
        let root = tree.root();
        assert_eq!(root.mass, 4.0);
        assert!((root.center.x - 2.5).abs() < 1e-9);
        assert!((root.center.y - 5.0).abs() < 1e-9);
        assert_eq!(tree.leaf_count(), 3);
    }

    #[test]
    fn coincident_points_end_in_one_bucket() {
        let pos = [Point::new(3.0, 3.0); 4];
        let tree = QuadTree::build(&pos, &[1.0; 4]);
        assert_eq!(tree.root().mass, 4.0);
        let bucket = tree.node(tree.home[0]);
        assert_eq!(bucket.depth, MAX_DEPTH);
        assert_eq!(bucket.occupants.len(), 4);
        assert_eq!(bucket.mass, 4.0);
    }

    #[test]
    fn moving_a_vertex_updates_ancestors_only() {
        let pos = [Point::new(0.0, 0.0), Point::new(10.0, 10.0)];
        let mut tree = QuadTree::build(&pos, &[1.0, 1.0]);
        let before_other = tree.node(tree.home[1]).center;
        tree.move_vertex(0, pos[0], Point::new(2.0, 0.0), 1.0);
        assert_eq!(tree.node(tree.home[0]).center, Point::new(2.0, 0.0));
        assert_eq!(tree.node(tree.home[1]).center, before_other);
        assert!((tree.root().center.x - 6.0).abs() < 1e-9);
        assert!((tree.root().center.y - 5.0).abs() < 1e-9);
    }
}
