//! Drift CLI library
//!
//! This module contains the core CLI logic for the Drift layout tool: load
//! a graph file, settle it, replay any requested expansions, and write the
//! final layout as SVG.

pub mod error_adapter;

mod args;
mod config;
mod error;
mod export;
mod graph;

pub use args::{Args, Expansion};
pub use error::{CliError, ConfigError, GraphFileError};

use std::fs;

use log::{debug, info};

use drift::{ChildSpec, RenderSink, Simulation};

use export::{SvgExporter, SvgSink};

/// Run the Drift CLI application
///
/// # Arguments
///
/// * `args` - Command-line arguments
///
/// # Errors
///
/// Returns `CliError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Graph file errors
/// - Layout errors (invalid snapshot, unknown expansion target)
/// - Export errors
pub fn run(args: &Args) -> Result<(), CliError> {
    info!(
        input_path = args.input,
        output_path = args.output;
        "Processing graph"
    );

    // Load configuration
    let mut app_config = config::load_config(args.config.as_ref())?;
    if let Some(seed) = args.seed {
        let simulation = app_config.simulation().clone().with_seed(seed);
        app_config = app_config.with_simulation(simulation);
    }

    // Read and parse the graph file
    let source = fs::read_to_string(&args.input)?;
    let data = graph::parse_graph(&source)?;

    let mut simulation = Simulation::new(app_config.simulation().clone())?;
    let result = simulation.reconcile(&data)?;
    info!(nodes = result.entered.len(), links = result.links_entered.len(); "Loaded graph");

    let exporter = SvgExporter::new(app_config.style().clone());
    let mut sink = SvgSink::new(exporter);

    settle(&mut simulation, &mut sink, args.ticks);
    for expansion in &args.expand {
        let children = vec![ChildSpec::new(); expansion.children];
        let ids = simulation.expand(expansion.node, &children)?;
        debug!(node = expansion.node.get(), children = ids.len(); "Replayed expansion");
        settle(&mut simulation, &mut sink, args.ticks);
    }

    // Radii are only known once every node exists
    sink.set_radii(
        simulation
            .store()
            .nodes()
            .filter_map(|node| node.radius().map(|radius| (node.id(), radius))),
    );
    if sink.frames() == 0 {
        sink.on_tick(&simulation.snapshot());
    }
    sink.save(&args.output)?;

    if let (Some(path), Some(snapshot)) = (&args.snapshot, sink.latest()) {
        let text = toml::to_string(snapshot)
            .map_err(|err| CliError::Export(format!("failed to serialize snapshot: {err}")))?;
        fs::write(path, text)?;
        info!(path = path.as_str(); "Snapshot written");
    }

    info!(
        frames = sink.frames(),
        ticks = simulation.ticks(),
        converged = simulation.is_converged();
        "Layout finished"
    );

    Ok(())
}

/// Ticks until converged or `max_ticks` ticks were spent, feeding every frame to `sink`.
fn settle(simulation: &mut Simulation, sink: &mut SvgSink, max_ticks: usize) {
    for _ in 0..max_ticks {
        if simulation.tick_into(sink).converged {
            break;
        }
    }
}
