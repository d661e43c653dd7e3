use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Numeric constants used while lowering. Every key is optional in the TOML
/// file; missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoweringSettings {
    pub interface_mtu: u32,
    pub ebgp_admin_distance: u32,
    pub ibgp_admin_distance: u32,
    pub local_bgp_weight: u32,
    pub static_route_admin_distance: u32,
    pub ospf_reference_bandwidth: f64,
    pub ospf_hello_interval: u32,
    pub ospf_dead_interval: u32,
    pub spine_fallback_ports: u32,
    pub leaf_uplink_ports: Vec<u32>,
    pub leaf_downstream_ports: u32,
    pub fabric_uplink_first_port: u32,
    pub spine_fabric_max_port: u32,
    pub vpc_peer_link_name: String,
}

impl Default for LoweringSettings {
    fn default() -> Self {
        Self {
            interface_mtu: 9000,
            ebgp_admin_distance: 20,
            ibgp_admin_distance: 200,
            local_bgp_weight: 0,
            static_route_admin_distance: 1,
            ospf_reference_bandwidth: 100.0,
            ospf_hello_interval: 10,
            ospf_dead_interval: 40,
            spine_fallback_ports: 32,
            leaf_uplink_ports: vec![53, 54],
            leaf_downstream_ports: 8,
            fabric_uplink_first_port: 53,
            spine_fabric_max_port: 59,
            vpc_peer_link_name: "port-channel1".to_string(),
        }
    }
}

/// Errors returned when loading a settings file.
#[derive(Debug, Error)]
pub enum SettingsLoadError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Load lowering settings from a TOML file.
///
/// # Errors
///
/// [`SettingsLoadError::Io`] if the file cannot be read and
/// [`SettingsLoadError::Parse`] if it is not valid settings TOML.
pub fn load_settings(path: &Path) -> Result<LoweringSettings, SettingsLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_settings(&raw, path.display().to_string())
}

/// Built-in settings from the embedded `settings/lowering.toml`.
pub fn default_settings() -> LoweringSettings {
    let embedded = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/settings/lowering.toml"
    ));
    parse_settings(embedded, "embedded settings".to_string()).unwrap_or_default()
}

fn parse_settings(raw: &str, path: String) -> Result<LoweringSettings, SettingsLoadError> {
    toml::from_str(raw).map_err(|source| SettingsLoadError::Parse { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn embedded_file_matches_hard_coded_defaults() {
        assert_eq!(default_settings(), LoweringSettings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "interface_mtu = 1500\nleaf_uplink_ports = [49, 50]").expect("write");
        let settings = load_settings(file.path()).expect("settings");
        assert_eq!(settings.interface_mtu, 1500);
        assert_eq!(settings.leaf_uplink_ports, vec![49, 50]);
        assert_eq!(settings.ebgp_admin_distance, 20);
    }

    #[test]
    fn unknown_key_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "mtu = 1500").expect("write");
        let err = load_settings(file.path()).expect_err("unknown key");
        assert!(matches!(err, SettingsLoadError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_settings(Path::new("/nonexistent/lowering.toml")).expect_err("missing");
        assert!(matches!(err, SettingsLoadError::Io { .. }));
    }
}
