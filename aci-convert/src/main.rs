use std::path::Path;

use aci_convert::diagnostics::Diagnostics;
use aci_convert::ingest::build_model;
use aci_convert::model::{AciModel, FabricLink};
use aci_convert::report::{model_summary, render_conversion, render_model, render_topology};
use aci_convert::resolve::{layer1_edges, load_fabric_links, Hostnames};
use aci_convert::settings::{default_settings, load_settings, LoweringSettings};
use anyhow::{bail, Context, Result};
use clap::Parser;
use mit_tree::MitNode;
use tracing_subscriber::EnvFilter;

mod cli;
mod output;

use cli::{Cli, Command, ConvertArgs, InspectArgs, ModelArgs, OutputFormat, TopologyArgs};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Convert(args) => run_convert(args),
        Command::Inspect(args) => run_inspect(args),
        Command::Model(args) => run_model(args),
        Command::Topology(args) => run_topology(args),
    }
}

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_convert(args: ConvertArgs) -> Result<()> {
    let root = decode(&args.file)?;
    let links = links(args.links.as_deref())?;
    let settings = settings(args.settings.as_deref())?;
    let result = aci_convert::convert_tree(&root, &source_name(&args.file), links, &settings);

    if let Some(dir) = &args.output_dir {
        output::write_device_files(dir, &result, &args.file)?;
    }

    match args.format {
        OutputFormat::Text => println!("{}", render_conversion(&result)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    if args.strict && !result.diagnostics.is_empty() {
        bail!(
            "strict mode failed: {} warnings recorded",
            result.diagnostics.len()
        );
    }
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let root = decode(&args.file)?;
    match args.format {
        OutputFormat::Text => print!("{}", mit_tree::render_tree(&root, args.depth)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&mit_tree::to_json_value(&root))?
        ),
    }
    Ok(())
}

fn run_model(args: ModelArgs) -> Result<()> {
    let (model, mut diagnostics) = load_model(&args.file, Vec::new())?;
    let hostnames = Hostnames::resolve(&model, &mut diagnostics);
    let summary = model_summary(&model, &hostnames, diagnostics);
    match args.format {
        OutputFormat::Text => println!("{}", render_model(&summary)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

fn run_topology(args: TopologyArgs) -> Result<()> {
    let links = links(args.links.as_deref())?;
    let (model, mut diagnostics) = load_model(&args.file, links)?;
    let hostnames = Hostnames::resolve(&model, &mut diagnostics);
    let edges = layer1_edges(&model, &hostnames, &default_settings().vpc_peer_link_name);
    match args.format {
        OutputFormat::Text => println!("{}", render_topology(&edges)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&edges)?),
    }
    Ok(())
}

fn decode(path: &Path) -> Result<MitNode> {
    mit_tree::decode_file(path).with_context(|| format!("failed to parse {}", path.display()))
}

fn load_model(path: &Path, links: Vec<FabricLink>) -> Result<(AciModel, Diagnostics)> {
    let root = decode(path)?;
    let mut diagnostics = Diagnostics::new();
    let model = build_model(&root, &source_name(path), &mut diagnostics).with_fabric_links(links);
    Ok((model, diagnostics))
}

fn links(path: Option<&Path>) -> Result<Vec<FabricLink>> {
    match path {
        Some(path) => Ok(load_fabric_links(path)?),
        None => Ok(Vec::new()),
    }
}

fn settings(path: Option<&Path>) -> Result<LoweringSettings> {
    match path {
        Some(path) => Ok(load_settings(path)?),
        None => Ok(default_settings()),
    }
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
