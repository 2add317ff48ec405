use crate::cancel::CancellationToken;
use crate::config::{EdgeRoutingKind, LayoutKind, OverlapRemovalKind, load_config};
use crate::engine::LayoutEngine;
use crate::layout_dump::{GraphDocument, LayoutDump, write_layout_dump};
use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gle", version, about = "Graph layout engine: positions, overlap removal and edge routes")]
pub struct Args {
    /// Input graph (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the layout dump. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Layout algorithm, overriding the config file
    #[arg(long = "layout", value_enum)]
    pub layout: Option<LayoutArg>,

    /// Overlap removal algorithm
    #[arg(long = "overlap", value_enum)]
    pub overlap: Option<OverlapArg>,

    /// Edge routing algorithm
    #[arg(long = "routing", value_enum)]
    pub routing: Option<RoutingArg>,

    /// Seed for the randomized algorithms
    #[arg(long = "seed")]
    pub seed: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum LayoutArg {
    Random,
    Circular,
    Fr,
    BoundedFr,
    KamadaKawai,
    Isom,
    LinLog,
    Sugiyama,
    Tree,
}

impl From<LayoutArg> for LayoutKind {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Random => LayoutKind::Random,
            LayoutArg::Circular => LayoutKind::Circular,
            LayoutArg::Fr => LayoutKind::Fr,
            LayoutArg::BoundedFr => LayoutKind::BoundedFr,
            LayoutArg::KamadaKawai => LayoutKind::KamadaKawai,
            LayoutArg::Isom => LayoutKind::Isom,
            LayoutArg::LinLog => LayoutKind::LinLog,
            LayoutArg::Sugiyama => LayoutKind::EfficientSugiyama,
            LayoutArg::Tree => LayoutKind::Tree,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OverlapArg {
    None,
    Fsa,
    OneWayFsa,
}

impl From<OverlapArg> for OverlapRemovalKind {
    fn from(arg: OverlapArg) -> Self {
        match arg {
            OverlapArg::None => OverlapRemovalKind::None,
            OverlapArg::Fsa => OverlapRemovalKind::Fsa,
            OverlapArg::OneWayFsa => OverlapRemovalKind::OneWayFsa,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum RoutingArg {
    None,
    Simple,
    PathFinder,
}

impl From<RoutingArg> for EdgeRoutingKind {
    fn from(arg: RoutingArg) -> Self {
        match arg {
            RoutingArg::None => EdgeRoutingKind::None,
            RoutingArg::Simple => EdgeRoutingKind::Simple,
            RoutingArg::PathFinder => EdgeRoutingKind::PathFinder,
        }
    }
}

pub fn run() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(layout) = args.layout {
        config.layout.kind = layout.into();
    }
    if let Some(overlap) = args.overlap {
        config.overlap.kind = overlap.into();
    }
    if let Some(routing) = args.routing {
        config.routing.kind = routing.into();
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if config.layout.kind == LayoutKind::Compound {
        bail!("compound layouts need nested graphs and cannot run from a flat graph file");
    }

    let input = read_input(args.input.as_deref())?;
    let loaded = GraphDocument::from_json(&input)?.build()?;
    let layout_name = config.layout.kind.name();
    info!(
        layout = layout_name,
        vertices = loaded.graph.vertex_count(),
        edges = loaded.graph.edge_count(),
        "running layout"
    );

    let engine = LayoutEngine::new(config);
    let mut positions = loaded.positions;
    let routes = engine.run(
        &loaded.graph,
        &loaded.sizes,
        &mut positions,
        &CancellationToken::new(),
    )?;
    let dump = LayoutDump::from_layout(layout_name, &loaded.graph, &positions, &loaded.sizes, &routes);
    write_layout_dump(args.output.as_deref(), &dump)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_kinds() {
        let args = Args::parse_from([
            "gle",
            "-i",
            "graph.json",
            "--layout",
            "kamada-kawai",
            "--overlap",
            "one-way-fsa",
            "--routing",
            "path-finder",
            "--seed",
            "42",
        ]);
        assert_eq!(args.input.as_deref(), Some(Path::new("graph.json")));
        assert_eq!(LayoutKind::from(args.layout.unwrap()), LayoutKind::KamadaKawai);
        assert_eq!(
            OverlapRemovalKind::from(args.overlap.unwrap()),
            OverlapRemovalKind::OneWayFsa
        );
        assert_eq!(
            EdgeRoutingKind::from(args.routing.unwrap()),
            EdgeRoutingKind::PathFinder
        );
        assert_eq!(args.seed, Some(42));
    }

    #[test]
    fn sugiyama_flag_maps_to_the_layered_layout() {
        let args = Args::parse_from(["gle", "--layout", "sugiyama"]);
        assert_eq!(
            LayoutKind::from(args.layout.unwrap()),
            LayoutKind::EfficientSugiyama
        );
    }
}
