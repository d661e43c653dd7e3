use std::fs;
use std::path::{Path, PathBuf};

use aci_convert::device::ConversionResult;
use anyhow::{bail, Context, Result};
use serde::Serialize;

pub const TOPOLOGY_FILE: &str = "topology.json";

#[derive(Serialize)]
struct TopologyFile<'a> {
    fabric: &'a str,
    edges: Vec<&'a aci_convert::device::Layer1Edge>,
}

/// Write `{hostname}.json` per device and `topology.json` into `dir`.
///
/// Nothing is written if any target path is the input file.
pub fn write_device_files(dir: &Path, result: &ConversionResult, input: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let mut targets: Vec<PathBuf> = result
        .devices
        .keys()
        .map(|hostname| dir.join(format!("{hostname}.json")))
        .collect();
    targets.push(dir.join(TOPOLOGY_FILE));
    for target in &targets {
        ensure_not_input(target, input)?;
    }

    for (device, path) in result.devices.values().zip(&targets) {
        write_json(path, device)?;
    }
    let topology = TopologyFile {
        fabric: &result.fabric_hostname,
        edges: result.edges.iter().collect(),
    };
    write_json(&dir.join(TOPOLOGY_FILE), &topology)?;

    tracing::info!(files = targets.len(), dir = %dir.display(), "wrote device files");
    Ok(targets)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
}

fn ensure_not_input(output: &Path, input: &Path) -> Result<()> {
    let out_norm = normalize(output)
        .with_context(|| format!("failed to normalize output path {}", output.display()))?;
    let in_norm = normalize(input)
        .with_context(|| format!("failed to normalize input path {}", input.display()))?;
    if out_norm == in_norm {
        bail!(
            "refusing to overwrite source file: output {} matches input {}",
            output.display(),
            input.display()
        );
    }
    Ok(())
}

// Existing paths are canonicalized; anything else is joined onto the cwd.
fn normalize(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return path
            .canonicalize()
            .with_context(|| format!("canonicalize {}", path.display()));
    }
    let base = if path.is_absolute() {
        PathBuf::new()
    } else {
        std::env::current_dir().context("current_dir")?
    };
    Ok(base.join(path))
}
