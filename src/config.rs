use crate::geometry::{Rect, Thickness};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutKind {
    Random,
    Circular,
    Fr,
    #[default]
    BoundedFr,
    KamadaKawai,
    Isom,
    LinLog,
    EfficientSugiyama,
    Tree,
    /// Nested graphs; built directly through `CompoundLayout`.
    Compound,
}

impl LayoutKind {
    pub fn name(self) -> &'static str {
        match self {
            LayoutKind::Random => "random",
            LayoutKind::Circular => "circular",
            LayoutKind::Fr => "fr",
            LayoutKind::BoundedFr => "bounded-fr",
            LayoutKind::KamadaKawai => "kamada-kawai",
            LayoutKind::Isom => "isom",
            LayoutKind::LinLog => "lin-log",
            LayoutKind::EfficientSugiyama => "efficient-sugiyama",
            LayoutKind::Tree => "tree",
            LayoutKind::Compound => "compound",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutDirection {
    #[default]
    TopToBottom,
    BottomToTop,
    LeftToRight,
    RightToLeft,
}

impl LayoutDirection {
    pub fn is_horizontal(self) -> bool {
        matches!(self, LayoutDirection::LeftToRight | LayoutDirection::RightToLeft)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CoolingFunction {
    Linear,
    #[default]
    Exponential,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpanningTreeGeneration {
    #[default]
    Bfs,
    Dfs,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RandomParameters {
    pub bounds: Rect,
    pub seed: Option<u64>,
}

impl Default for RandomParameters {
    fn default() -> Self {
        Self {
            bounds: Rect::new(0.0, 0.0, 2000.0, 2000.0),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FrParameters {
    pub ideal_edge_length: f64,
    pub iteration_limit: usize,
    pub attraction_multiplier: f64,
    pub repulsive_multiplier: f64,
    /// Per-iteration temperature factor for exponential cooling.
    pub lambda: f64,
    pub cooling: CoolingFunction,
    pub seed: Option<u64>,
}

impl Default for FrParameters {
    fn default() -> Self {
        Self {
            ideal_edge_length: 10.0,
            iteration_limit: 200,
            attraction_multiplier: 1.2,
            repulsive_multiplier: 0.6,
            lambda: 0.95,
            cooling: CoolingFunction::Exponential,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BoundedFrParameters {
    pub width: f64,
    pub height: f64,
    pub iteration_limit: usize,
    pub attraction_multiplier: f64,
    pub repulsive_multiplier: f64,
    pub lambda: f64,
    pub cooling: CoolingFunction,
    pub seed: Option<u64>,
}

impl Default for BoundedFrParameters {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 1000.0,
            iteration_limit: 200,
            attraction_multiplier: 1.2,
            repulsive_multiplier: 0.6,
            lambda: 0.95,
            cooling: CoolingFunction::Exponential,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KkParameters {
    pub width: f64,
    pub height: f64,
    pub max_iterations: usize,
    /// Spring strength constant.
    pub k: f64,
    pub length_factor: f64,
    /// Extra distance, relative to the graph diameter, assumed between
    /// vertices in different components.
    pub disconnected_multiplier: f64,
    pub exchange_vertices: bool,
    /// Stop once no vertex moves further than this in one iteration.
    pub epsilon: f64,
    pub seed: Option<u64>,
}

impl Default for KkParameters {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 300.0,
            max_iterations: 200,
            k: 1.0,
            length_factor: 1.0,
            disconnected_multiplier: 0.5,
            exchange_vertices: false,
            epsilon: 0.01,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IsomParameters {
    pub width: f64,
    pub height: f64,
    pub max_epoch: usize,
    /// Epochs between radius decrements.
    pub radius_constant_time: usize,
    pub initial_radius: usize,
    pub min_radius: usize,
    pub initial_adaption: f64,
    pub min_adaption: f64,
    pub cooling_factor: f64,
    pub seed: Option<u64>,
}

impl Default for IsomParameters {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 300.0,
            max_epoch: 2000,
            radius_constant_time: 100,
            initial_radius: 5,
            min_radius: 1,
            initial_adaption: 0.9,
            min_adaption: 0.0,
            cooling_factor: 2.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinLogParameters {
    pub iteration_count: usize,
    pub attraction_exponent: f64,
    pub repulsive_exponent: f64,
    pub gravitation_multiplier: f64,
    /// Factor from the unit-square working space to layout coordinates.
    pub scale: f64,
    pub seed: Option<u64>,
}

impl Default for LinLogParameters {
    fn default() -> Self {
        Self {
            iteration_count: 100,
            attraction_exponent: 1.0,
            repulsive_exponent: 0.0,
            gravitation_multiplier: 0.1,
            scale: 300.0,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SugiyamaParameters {
    pub layer_distance: f64,
    pub vertex_distance: f64,
    pub direction: LayoutDirection,
    /// Pull source vertices down next to their successors.
    pub minimize_edge_length: bool,
    pub crossing_sweeps: usize,
    pub alignment_passes: usize,
}

impl Default for SugiyamaParameters {
    fn default() -> Self {
        Self {
            layer_distance: 15.0,
            vertex_distance: 15.0,
            direction: LayoutDirection::TopToBottom,
            minimize_edge_length: true,
            crossing_sweeps: 8,
            alignment_passes: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TreeParameters {
    pub layer_gap: f64,
    pub vertex_gap: f64,
    pub direction: LayoutDirection,
    pub spanning_tree: SpanningTreeGeneration,
}

impl Default for TreeParameters {
    fn default() -> Self {
        Self {
            layer_gap: 10.0,
            vertex_gap: 10.0,
            direction: LayoutDirection::TopToBottom,
            spanning_tree: SpanningTreeGeneration::Bfs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompoundParameters {
    /// Space between a compound vertex's border and its inner graph.
    pub padding: Thickness,
}

impl Default for CompoundParameters {
    fn default() -> Self {
        Self {
            padding: Thickness::uniform(10.0),
        }
    }
}

/// Parameter object handed to the layout factory. The variant must match the
/// requested `LayoutKind`.
#[derive(Debug, Clone)]
pub enum LayoutParameters {
    Random(RandomParameters),
    Fr(FrParameters),
    BoundedFr(BoundedFrParameters),
    KamadaKawai(KkParameters),
    Isom(IsomParameters),
    LinLog(LinLogParameters),
    Sugiyama(SugiyamaParameters),
    Tree(TreeParameters),
}

impl LayoutParameters {
    pub fn name(&self) -> &'static str {
        match self {
            LayoutParameters::Random(_) => "random",
            LayoutParameters::Fr(_) => "fr",
            LayoutParameters::BoundedFr(_) => "bounded-fr",
            LayoutParameters::KamadaKawai(_) => "kamada-kawai",
            LayoutParameters::Isom(_) => "isom",
            LayoutParameters::LinLog(_) => "lin-log",
            LayoutParameters::Sugiyama(_) => "efficient-sugiyama",
            LayoutParameters::Tree(_) => "tree",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OverlapRemovalKind {
    None,
    #[default]
    Fsa,
    OneWayFsa,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OneWayDirection {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlapRemovalParameters {
    pub horizontal_gap: f64,
    pub vertical_gap: f64,
    /// Force-scan rounds before the separating sweep takes over.
    pub max_iterations: usize,
    pub one_way_direction: OneWayDirection,
}

impl Default for OverlapRemovalParameters {
    fn default() -> Self {
        Self {
            horizontal_gap: 10.0,
            vertical_gap: 10.0,
            max_iterations: 50,
            one_way_direction: OneWayDirection::Horizontal,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeRoutingKind {
    #[default]
    None,
    Simple,
    PathFinder,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HeuristicFormula {
    #[default]
    Manhattan,
    MaxDxDy,
    DiagonalShortcut,
    Euclidean,
    EuclideanNoSqrt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimpleRoutingParameters {
    /// Clearance kept between a detour point and the obstacle it avoids.
    pub side_step: f64,
    pub parallel_spacing: f64,
    pub self_loop_size: f64,
    pub max_iterations: usize,
}

impl Default for SimpleRoutingParameters {
    fn default() -> Self {
        Self {
            side_step: 10.0,
            parallel_spacing: 12.0,
            self_loop_size: 20.0,
            max_iterations: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PathFinderParameters {
    pub horizontal_grid_size: f64,
    pub vertical_grid_size: f64,
    /// Empty border added around the vertex bounds.
    pub side_offset: f64,
    /// Safety margin added around every vertex box.
    pub margin: f64,
    pub use_diagonals: bool,
    pub use_heavy_diagonals: bool,
    pub punish_change_direction: bool,
    pub heuristic: HeuristicFormula,
    /// Values above 1 trade path optimality for speed.
    pub heuristic_multiplier: f64,
    pub use_tie_breaker: bool,
    /// Maximum number of expanded search nodes per edge.
    pub search_limit: usize,
    pub max_cells: usize,
    pub self_loop_size: f64,
}

impl Default for PathFinderParameters {
    fn default() -> Self {
        Self {
            horizontal_grid_size: 10.0,
            vertical_grid_size: 10.0,
            side_offset: 40.0,
            margin: 4.0,
            use_diagonals: true,
            use_heavy_diagonals: false,
            punish_change_direction: false,
            heuristic: HeuristicFormula::Manhattan,
            heuristic_multiplier: 2.0,
            use_tie_breaker: false,
            search_limit: 50_000,
            max_cells: 400_000,
            self_loop_size: 20.0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum EdgeRoutingParameters {
    Simple(SimpleRoutingParameters),
    PathFinder(PathFinderParameters),
}

impl EdgeRoutingParameters {
    pub fn name(&self) -> &'static str {
        match self {
            EdgeRoutingParameters::Simple(_) => "simple",
            EdgeRoutingParameters::PathFinder(_) => "path-finder",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub kind: LayoutKind,
    pub random: RandomParameters,
    pub fr: FrParameters,
    pub bounded_fr: BoundedFrParameters,
    pub kamada_kawai: KkParameters,
    pub isom: IsomParameters,
    pub lin_log: LinLogParameters,
    pub sugiyama: SugiyamaParameters,
    pub tree: TreeParameters,
    pub compound: CompoundParameters,
}

impl LayoutConfig {
    /// Parameter object matching `kind`; `None` for parameterless kinds.
    pub fn parameters_for(&self, kind: LayoutKind) -> Option<LayoutParameters> {
        match kind {
            LayoutKind::Random => Some(LayoutParameters::Random(self.random.clone())),
            LayoutKind::Fr => Some(LayoutParameters::Fr(self.fr.clone())),
            LayoutKind::BoundedFr => Some(LayoutParameters::BoundedFr(self.bounded_fr.clone())),
            LayoutKind::KamadaKawai => {
                Some(LayoutParameters::KamadaKawai(self.kamada_kawai.clone()))
            }
            LayoutKind::Isom => Some(LayoutParameters::Isom(self.isom.clone())),
            LayoutKind::LinLog => Some(LayoutParameters::LinLog(self.lin_log.clone())),
            LayoutKind::EfficientSugiyama => {
                Some(LayoutParameters::Sugiyama(self.sugiyama.clone()))
            }
            LayoutKind::Tree => Some(LayoutParameters::Tree(self.tree.clone())),
            LayoutKind::Circular | LayoutKind::Compound => None,
        }
    }

    /// Applies `seed` to every randomized algorithm's parameters.
    pub fn set_seed(&mut self, seed: u64) {
        self.random.seed = Some(seed);
        self.fr.seed = Some(seed);
        self.bounded_fr.seed = Some(seed);
        self.kamada_kawai.seed = Some(seed);
        self.isom.seed = Some(seed);
        self.lin_log.seed = Some(seed);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OverlapConfig {
    pub kind: OverlapRemovalKind,
    pub parameters: OverlapRemovalParameters,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoutingConfig {
    pub kind: EdgeRoutingKind,
    pub simple: SimpleRoutingParameters,
    pub path_finder: PathFinderParameters,
}

impl RoutingConfig {
    pub fn parameters_for(&self, kind: EdgeRoutingKind) -> Option<EdgeRoutingParameters> {
        match kind {
            EdgeRoutingKind::None => None,
            EdgeRoutingKind::Simple => Some(EdgeRoutingParameters::Simple(self.simple.clone())),
            EdgeRoutingKind::PathFinder => Some(EdgeRoutingParameters::PathFinder(
                self.path_finder.clone(),
            )),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub overlap: OverlapConfig,
    pub routing: RoutingConfig,
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    layout: Option<LayoutConfig>,
    overlap_removal: Option<OverlapConfig>,
    edge_routing: Option<RoutingConfig>,
    seed: Option<u64>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;

    if let Some(layout) = parsed.layout {
        config.layout = layout;
    }
    if let Some(overlap) = parsed.overlap_removal {
        config.overlap = overlap;
    }
    if let Some(routing) = parsed.edge_routing {
        config.routing = routing;
    }
    if let Some(seed) = parsed.seed {
        config.seed = Some(seed);
        config.layout.set_seed(seed);
    }

    Ok(config)
}
