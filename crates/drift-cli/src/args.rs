//! Command-line argument definitions for the Drift CLI.
//!
//! This module defines the [`Args`] structure parsed from the command line
//! using [`clap`]. Arguments control input/output paths, configuration file
//! selection, the tick budget, replayed expansions, and logging verbosity.

use std::str::FromStr;

use clap::Parser;

use drift::identifier::NodeId;

/// Command-line arguments for the Drift layout tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input graph file (TOML)
    #[arg(help = "Path to the input graph file")]
    pub input: String,

    /// Path to the output SVG file
    #[arg(short, long, default_value = "out.svg")]
    pub output: String,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Maximum number of ticks per settling phase
    #[arg(long, default_value_t = 1000)]
    pub ticks: usize,

    /// Overrides the configured random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Expands a node into N children once the layout settled, as `ID=N` (repeatable)
    #[arg(long, value_name = "ID=N")]
    pub expand: Vec<Expansion>,

    /// Writes the final snapshot as TOML to this path
    #[arg(long)]
    pub snapshot: Option<String>,
}

/// One `--expand` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expansion {
    pub node: NodeId,
    pub children: usize,
}

impl FromStr for Expansion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (node, children) = s
            .split_once('=')
            .ok_or_else(|| format!("expected ID=N, got '{s}'"))?;
        let node = node.trim().parse::<NodeId>().map_err(|err| err.to_string())?;
        let children = children
            .trim()
            .parse::<usize>()
            .map_err(|err| format!("invalid child count '{children}': {err}"))?;
        Ok(Self { node, children })
    }
}
