use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use tracing::{debug, warn};

use super::{EdgeRoutingAlgorithm, RoutingInput, compress_path, self_loop};
use crate::config::{EdgeRoutingKind, HeuristicFormula, PathFinderParameters};
use crate::error::LayoutError;
use crate::geometry::{Point, Rect};
use crate::ir::{Edge, EdgeId, VertexId};
use crate::layout::{EdgeRoutes, bounding_box};

/// Integer cost multiplier so the heap can order fractional cell sizes.
const COST_SCALE: f64 = 1000.0;
const HEAVY_DIAGONAL_FACTOR: f64 = 1.75;
const TIE_BREAKER_WEIGHT: f64 = 0.001;
/// Orthogonal moves first, then diagonals.
const MOVES: [(i32, i32); 8] = [
    (0, -1),
    (1, 0),
    (0, 1),
    (-1, 0),
    (1, -1),
    (1, 1),
    (-1, 1),
    (-1, -1),
];
const NO_DIRECTION: u8 = 8;
const DIRECTION_STATES: usize = 9;

/// Uniform grid over the padded vertex area. Each cell lists the vertices
/// whose margin-inflated box overlaps it.
#[derive(Debug, Clone)]
struct RoutingGrid {
    origin: Point,
    cell_width: f64,
    cell_height: f64,
    cols: i32,
    rows: i32,
    cell_owners: Vec<Vec<VertexId>>,
}

impl RoutingGrid {
    /// `None` when there is nothing to cover or the grid would exceed
    /// `max_cells`.
    fn build(
        obstacles: &[(VertexId, Rect)],
        parameters: &PathFinderParameters,
    ) -> Result<Option<Self>, LayoutError> {
        let cell_width = parameters.horizontal_grid_size;
        let cell_height = parameters.vertical_grid_size;
        if !(cell_width > 0.0 && cell_height > 0.0 && cell_width.is_finite() && cell_height.is_finite()) {
            return Err(LayoutError::InvalidParameter(format!(
                "grid cells must be positive, got {cell_width}x{cell_height}"
            )));
        }
        let bounds = bounding_box(obstacles.iter().map(|(_, r)| r));
        if bounds.is_empty() {
            return Ok(None);
        }
        let area = bounds.inflate(parameters.side_offset, parameters.side_offset);
        let cols = ((area.width / cell_width).ceil() as i32).max(1);
        let rows = ((area.height / cell_height).ceil() as i32).max(1);
        let total = (cols as usize).saturating_mul(rows as usize);
        if total > parameters.max_cells {
            warn!(
                cols,
                rows,
                max_cells = parameters.max_cells,
                "routing grid too large, edges stay straight"
            );
            return Ok(None);
        }

        let mut grid = Self {
            origin: area.top_left(),
            cell_width,
            cell_height,
            cols,
            rows,
            cell_owners: vec![Vec::new(); total],
        };
        for (id, rect) in obstacles {
            let blocked = rect.inflate(parameters.margin, parameters.margin);
            let (x0, x1) = grid.span(blocked.left(), blocked.right(), Axis::X);
            let (y0, y1) = grid.span(blocked.top(), blocked.bottom(), Axis::Y);
            for iy in y0..=y1 {
                for ix in x0..=x1 {
                    let idx = grid.index(ix, iy);
                    grid.cell_owners[idx].push(*id);
                }
            }
        }
        Ok(Some(grid))
    }

    /// Inclusive cell range whose extent overlaps `lo..hi` along `axis`.
    fn span(&self, lo: f64, hi: f64, axis: Axis) -> (i32, i32) {
        let (origin, cell, count) = match axis {
            Axis::X => (self.origin.x, self.cell_width, self.cols),
            Axis::Y => (self.origin.y, self.cell_height, self.rows),
        };
        let start = (((lo - origin) / cell).floor() as i32).clamp(0, count - 1);
        let end = ((((hi - origin) / cell).ceil() as i32) - 1).clamp(start, count - 1);
        (start, end)
    }

    fn index(&self, ix: i32, iy: i32) -> usize {
        (iy * self.cols + ix) as usize
    }

    fn cell_for_point(&self, point: Point) -> Option<(i32, i32)> {
        let ix = ((point.x - self.origin.x) / self.cell_width).floor() as i32;
        let iy = ((point.y - self.origin.y) / self.cell_height).floor() as i32;
        if ix < 0 || iy < 0 || ix >= self.cols || iy >= self.rows {
            return None;
        }
        Some((ix, iy))
    }

    fn cell_center(&self, ix: i32, iy: i32) -> Point {
        Point::new(
            self.origin.x + (ix as f64 + 0.5) * self.cell_width,
            self.origin.y + (iy as f64 + 0.5) * self.cell_height,
        )
    }

    /// The edge's own endpoints never block it.
    fn blocked(&self, ix: i32, iy: i32, source: VertexId, target: VertexId) -> bool {
        self.cell_owners[self.index(ix, iy)]
            .iter()
            .any(|owner| *owner != source && *owner != target)
    }
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct GridState {
    x: i32,
    y: i32,
    dir: u8,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct GridEntry {
    est: u64,
    cost: u64,
    state: GridState,
}

impl Ord for GridEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .est
            .cmp(&self.est)
            .then_with(|| other.cost.cmp(&self.cost))
            .then_with(|| self.state.y.cmp(&other.state.y))
            .then_with(|| self.state.x.cmp(&other.state.x))
            .then_with(|| self.state.dir.cmp(&other.state.dir))
    }
}

impl PartialOrd for GridEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* edge router over a blocked-cell grid.
///
/// Batch [`EdgeRoutingAlgorithm::compute`] builds the grid once and keeps it
/// for every edge of the run; [`EdgeRoutingAlgorithm::compute_single`]
/// always builds a fresh one.
#[derive(Debug, Clone, Default)]
pub struct PathFinderRouter {
    parameters: PathFinderParameters,
    grid: Option<RoutingGrid>,
    grid_builds: usize,
}

impl PathFinderRouter {
    pub fn new(parameters: PathFinderParameters) -> Self {
        Self {
            parameters,
            grid: None,
            grid_builds: 0,
        }
    }

    /// Number of grids built over this router's lifetime.
    pub fn grid_build_count(&self) -> usize {
        self.grid_builds
    }

    fn build_grid(
        &mut self,
        obstacles: &[(VertexId, Rect)],
    ) -> Result<Option<RoutingGrid>, LayoutError> {
        let grid = RoutingGrid::build(obstacles, &self.parameters)?;
        self.grid_builds += 1;
        if let Some(grid) = &grid {
            debug!(cols = grid.cols, rows = grid.rows, "routing grid built");
        }
        Ok(grid)
    }
}

impl EdgeRoutingAlgorithm for PathFinderRouter {
    fn kind(&self) -> EdgeRoutingKind {
        EdgeRoutingKind::PathFinder
    }

    fn compute(&mut self, input: &RoutingInput<'_>) -> Result<EdgeRoutes, LayoutError> {
        let obstacles = input.obstacles()?;
        self.grid = self.build_grid(&obstacles)?;

        let mut routes = EdgeRoutes::new();
        let mut unrouted = 0usize;
        for (id, edge) in input.graph.active_edges() {
            input.cancel.check()?;
            match route_edge(edge, input, self.grid.as_ref(), &self.parameters)? {
                Some(points) => {
                    routes.insert(id, points);
                }
                None => unrouted += 1,
            }
        }
        debug!(routes = routes.len(), unrouted, "path-finder routing finished");
        Ok(routes)
    }

    fn compute_single(
        &mut self,
        edge: EdgeId,
        input: &RoutingInput<'_>,
    ) -> Result<Option<Vec<Point>>, LayoutError> {
        let record = input.active_edge(edge)?;
        let obstacles = input.obstacles()?;
        let grid = self.build_grid(&obstacles)?;
        route_edge(record, input, grid.as_ref(), &self.parameters)
    }
}

fn route_edge(
    edge: &Edge,
    input: &RoutingInput<'_>,
    grid: Option<&RoutingGrid>,
    parameters: &PathFinderParameters,
) -> Result<Option<Vec<Point>>, LayoutError> {
    if edge.is_self_loop() {
        let rect = input.rect_of(edge.source)?;
        return Ok(Some(self_loop(&rect, parameters.self_loop_size)));
    }
    let (source, target) = input.anchors(edge)?;
    let Some(grid) = grid else {
        return Ok(None);
    };
    let (Some(start), Some(end)) = (grid.cell_for_point(source), grid.cell_for_point(target))
    else {
        return Ok(None);
    };
    let Some(cells) = search(grid, start, end, edge.source, edge.target, parameters) else {
        return Ok(None);
    };

    let mut points = Vec::with_capacity(cells.len() + 2);
    points.push(source);
    points.extend(cells.iter().map(|(ix, iy)| grid.cell_center(*ix, *iy)));
    points.push(target);
    let points = compress_path(&points);
    Ok((points.len() >= 2).then_some(points))
}

fn scaled(value: f64) -> u64 {
    (value * COST_SCALE).round().max(0.0) as u64
}

fn heuristic(formula: HeuristicFormula, ax: f64, ay: f64) -> f64 {
    match formula {
        HeuristicFormula::Manhattan => ax + ay,
        HeuristicFormula::MaxDxDy => ax.max(ay),
        HeuristicFormula::DiagonalShortcut => {
            let (lo, hi) = (ax.min(ay), ax.max(ay));
            lo * std::f64::consts::SQRT_2 + (hi - lo)
        }
        HeuristicFormula::Euclidean => ax.hypot(ay),
        HeuristicFormula::EuclideanNoSqrt => ax * ax + ay * ay,
    }
}

/// Cells from `start` to `end`, both included. `None` when the target is
/// unreachable or the expansion budget runs out.
fn search(
    grid: &RoutingGrid,
    start: (i32, i32),
    end: (i32, i32),
    source: VertexId,
    target: VertexId,
    parameters: &PathFinderParameters,
) -> Option<Vec<(i32, i32)>> {
    if start == end {
        return Some(vec![start]);
    }
    let directions = if parameters.use_diagonals { 8 } else { 4 };
    let horizontal_step = scaled(grid.cell_width);
    let vertical_step = scaled(grid.cell_height);
    let mut diagonal = grid.cell_width.hypot(grid.cell_height);
    if parameters.use_heavy_diagonals {
        diagonal *= HEAVY_DIAGONAL_FACTOR;
    }
    let diagonal_step = scaled(diagonal);
    let turn_penalty = if parameters.punish_change_direction {
        scaled((grid.cell_width + grid.cell_height) * 0.5)
    } else {
        0
    };

    let estimate = |x: i32, y: i32| -> u64 {
        let ax = (x - end.0).unsigned_abs() as f64 * grid.cell_width;
        let ay = (y - end.1).unsigned_abs() as f64 * grid.cell_height;
        let mut h = heuristic(parameters.heuristic, ax, ay) * parameters.heuristic_multiplier;
        if parameters.use_tie_breaker {
            let (dx1, dy1) = ((x - end.0) as f64, (y - end.1) as f64);
            let (dx2, dy2) = ((start.0 - end.0) as f64, (start.1 - end.1) as f64);
            h += (dx1 * dy2 - dx2 * dy1).abs() * TIE_BREAKER_WEIGHT;
        }
        scaled(h)
    };

    let state_index =
        |s: &GridState| grid.index(s.x, s.y) * DIRECTION_STATES + s.dir as usize;
    // Only states the search touches are stored, so memory follows the
    // expansion budget rather than the grid size.
    let mut best_cost: HashMap<usize, u64> = HashMap::new();
    let mut prev: HashMap<usize, GridState> = HashMap::new();
    let mut heap = BinaryHeap::new();

    let origin = GridState {
        x: start.0,
        y: start.1,
        dir: NO_DIRECTION,
    };
    best_cost.insert(state_index(&origin), 0);
    heap.push(GridEntry {
        est: estimate(start.0, start.1),
        cost: 0,
        state: origin,
    });

    let mut expanded = 0usize;
    let mut found: Option<GridState> = None;
    while let Some(GridEntry { cost, state, .. }) = heap.pop() {
        if best_cost.get(&state_index(&state)) != Some(&cost) {
            continue;
        }
        if (state.x, state.y) == end {
            found = Some(state);
            break;
        }
        expanded += 1;
        if expanded > parameters.search_limit {
            warn!(
                limit = parameters.search_limit,
                "path search exhausted its node budget"
            );
            return None;
        }

        for (dir, (dx, dy)) in MOVES.iter().enumerate().take(directions) {
            let nx = state.x + dx;
            let ny = state.y + dy;
            if nx < 0 || ny < 0 || nx >= grid.cols || ny >= grid.rows {
                continue;
            }
            let open = |x: i32, y: i32| (x, y) == end || !grid.blocked(x, y, source, target);
            if !open(nx, ny) {
                continue;
            }
            let is_diagonal = *dx != 0 && *dy != 0;
            // No squeezing between two blocked corners.
            if is_diagonal && (!open(state.x + dx, state.y) || !open(state.x, state.y + dy)) {
                continue;
            }
            let mut next_cost = cost.saturating_add(match (is_diagonal, *dx != 0) {
                (true, _) => diagonal_step,
                (false, true) => horizontal_step,
                (false, false) => vertical_step,
            });
            if state.dir != NO_DIRECTION && state.dir != dir as u8 {
                next_cost = next_cost.saturating_add(turn_penalty);
            }
            let next = GridState {
                x: nx,
                y: ny,
                dir: dir as u8,
            };
            let next_idx = state_index(&next);
            if best_cost.get(&next_idx).is_some_and(|best| next_cost >= *best) {
                continue;
            }
            best_cost.insert(next_idx, next_cost);
            prev.insert(next_idx, state);
            heap.push(GridEntry {
                est: next_cost.saturating_add(estimate(nx, ny)),
                cost: next_cost,
                state: next,
            });
        }
    }

    let mut cursor = found?;
    let mut cells = vec![(cursor.x, cursor.y)];
    while let Some(before) = prev.get(&state_index(&cursor)) {
        cells.push((before.x, before.y));
        cursor = *before;
    }
    cells.reverse();
    Some(cells)
}
