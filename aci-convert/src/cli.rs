use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "aci-convert")]
#[command(about = "Lower Cisco ACI fabric exports into per-device configurations")]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Convert one export into per-device configurations.
    Convert(ConvertArgs),
    /// Show the decoded object tree of one export.
    Inspect(InspectArgs),
    /// Summarize the semantic model built from one export.
    Model(ModelArgs),
    /// Print the layer-1 edges between fabric nodes.
    Topology(TopologyArgs),
}

#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// ACI export (JSON or XML).
    pub file: PathBuf,
    /// Companion document with explicit fabricLink records.
    #[arg(long)]
    pub links: Option<PathBuf>,
    /// Lowering settings TOML. Missing keys keep their defaults.
    #[arg(long)]
    pub settings: Option<PathBuf>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Write one JSON file per device plus topology.json into this directory.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Fail when any warning was recorded.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    pub file: PathBuf,
    #[arg(long, default_value_t = 3)]
    pub depth: usize,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct ModelArgs {
    pub file: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct TopologyArgs {
    pub file: PathBuf,
    /// Companion document with explicit fabricLink records.
    #[arg(long)]
    pub links: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
