mod circular;
mod compound;
mod fr;
mod isom;
mod kk;
mod linlog;
mod quadtree;
mod random;
mod ranking;
mod sugiyama;
mod tree;
pub(crate) mod types;

pub use circular::CircularLayout;
pub use compound::{CompoundGraph, CompoundLayout, CompoundResult};
pub use fr::{BoundedFrLayout, FrLayout};
pub use isom::IsomLayout;
pub use kk::KamadaKawaiLayout;
pub use linlog::LinLogLayout;
pub use random::RandomLayout;
pub use sugiyama::SugiyamaLayout;
pub use tree::TreeLayout;
pub use types::{
    EdgeRoutes, LayoutInput, VertexPositions, VertexSizes, bounding_box, vertex_rects,
};

use std::time::{SystemTime, UNIX_EPOCH};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::{LayoutDirection, LayoutKind, LayoutParameters};
use crate::error::LayoutError;
use crate::geometry::{Point, Rect};
use types::pin_frozen_vertices;

/// Strategy interface shared by every positioning algorithm.
///
/// `compute` fills `positions` with the top-left corner of every active
/// vertex. Only layered layouts return routes; everything else yields an
/// empty map.
pub trait LayoutAlgorithm: Send {
    fn kind(&self) -> LayoutKind;

    fn needs_vertex_sizes(&self) -> bool {
        false
    }

    fn compute(
        &mut self,
        input: &LayoutInput<'_>,
        positions: &mut VertexPositions,
    ) -> Result<EdgeRoutes, LayoutError>;
}

/// Builds the algorithm for `kind`. `None` parameters select the defaults.
pub fn create_layout_algorithm(
    kind: LayoutKind,
    parameters: Option<LayoutParameters>,
) -> Result<Box<dyn LayoutAlgorithm>, LayoutError> {
    let algorithm: Box<dyn LayoutAlgorithm> = match (kind, parameters) {
        (LayoutKind::Random, None) => Box::new(RandomLayout::default()),
        (LayoutKind::Random, Some(LayoutParameters::Random(p))) => Box::new(RandomLayout::new(p)),
        (LayoutKind::Circular, None) => Box::new(CircularLayout),
        (LayoutKind::Fr, None) => Box::new(FrLayout::default()),
        (LayoutKind::Fr, Some(LayoutParameters::Fr(p))) => Box::new(FrLayout::new(p)),
        (LayoutKind::BoundedFr, None) => Box::new(BoundedFrLayout::default()),
        (LayoutKind::BoundedFr, Some(LayoutParameters::BoundedFr(p))) => {
            Box::new(BoundedFrLayout::new(p))
        }
        (LayoutKind::KamadaKawai, None) => Box::new(KamadaKawaiLayout::default()),
        (LayoutKind::KamadaKawai, Some(LayoutParameters::KamadaKawai(p))) => {
            Box::new(KamadaKawaiLayout::new(p))
        }
        (LayoutKind::Isom, None) => Box::new(IsomLayout::default()),
        (LayoutKind::Isom, Some(LayoutParameters::Isom(p))) => Box::new(IsomLayout::new(p)),
        (LayoutKind::LinLog, None) => Box::new(LinLogLayout::default()),
        (LayoutKind::LinLog, Some(LayoutParameters::LinLog(p))) => Box::new(LinLogLayout::new(p)),
        (LayoutKind::EfficientSugiyama, None) => Box::new(SugiyamaLayout::default()),
        (LayoutKind::EfficientSugiyama, Some(LayoutParameters::Sugiyama(p))) => {
            Box::new(SugiyamaLayout::new(p))
        }
        (LayoutKind::Tree, None) => Box::new(TreeLayout::default()),
        (LayoutKind::Tree, Some(LayoutParameters::Tree(p))) => Box::new(TreeLayout::new(p)),
        (LayoutKind::Compound, _) => {
            return Err(LayoutError::InvalidParameter(
                "compound layouts need inner graphs; build them with CompoundLayout::new".into(),
            ));
        }
        (kind, Some(other)) => {
            return Err(LayoutError::ParameterMismatch {
                expected: kind.name(),
                found: other.name(),
            });
        }
    };
    Ok(algorithm)
}

/// One-shot helper: build the algorithm and run it.
pub fn compute_layout(
    kind: LayoutKind,
    parameters: Option<LayoutParameters>,
    input: &LayoutInput<'_>,
    positions: &mut VertexPositions,
) -> Result<EdgeRoutes, LayoutError> {
    let mut algorithm = create_layout_algorithm(kind, parameters)?;
    algorithm.compute(input, positions)
}

/// Shared preamble: validates sizes when required and pins frozen vertices.
/// Returns `false` when there is nothing to lay out.
pub(crate) fn prepare(
    input: &LayoutInput<'_>,
    positions: &mut VertexPositions,
    needs_sizes: bool,
) -> Result<bool, LayoutError> {
    let active = input.graph.active_vertices();
    if needs_sizes
        && let Some(missing) = active.iter().find(|id| !input.sizes.contains_key(id))
    {
        return Err(LayoutError::MissingVertexSize(*missing));
    }
    pin_frozen_vertices(input.graph, positions);
    Ok(!active.is_empty())
}

/// Seeded generator, or one keyed by the wall clock when no seed is given.
pub(crate) fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0);
            StdRng::seed_from_u64(nanos)
        }
    }
}

/// Maps a top-to-bottom layout onto `direction`. `bounds` is the extent of
/// the top-to-bottom drawing; rects are mirrored inside it and points follow.
pub(crate) fn orient(
    direction: LayoutDirection,
    bounds: Rect,
    rects: &mut [Rect],
    points: &mut [&mut Point],
) {
    match direction {
        LayoutDirection::TopToBottom => {}
        LayoutDirection::BottomToTop => {
            let flip = bounds.top() + bounds.bottom();
            for rect in rects.iter_mut() {
                rect.y = flip - rect.y - rect.height;
            }
            for point in points.iter_mut() {
                point.y = flip - point.y;
            }
        }
        LayoutDirection::LeftToRight | LayoutDirection::RightToLeft => {
            for rect in rects.iter_mut() {
                std::mem::swap(&mut rect.x, &mut rect.y);
                std::mem::swap(&mut rect.width, &mut rect.height);
            }
            for point in points.iter_mut() {
                std::mem::swap(&mut point.x, &mut point.y);
            }
            if direction == LayoutDirection::RightToLeft {
                let flip = bounds.top() + bounds.bottom();
                for rect in rects.iter_mut() {
                    rect.x = flip - rect.x - rect.width;
                }
                for point in points.iter_mut() {
                    point.x = flip - point.x;
                }
            }
        }
    }
}
