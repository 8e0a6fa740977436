//! Configuration loading from TOML files
//!
//! Config file is selected via the --config command line argument; a
//! missing or invalid file falls back to built-in defaults (the demo
//! venue: six nodes, three monitored zones) with a warning.

use crate::domain::types::{NodeId, ZoneId};
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Unique site identifier (e.g., "mela-west", "arena")
    #[serde(default = "default_site_id")]
    pub id: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            id: default_site_id(),
        }
    }
}

fn default_site_id() -> String {
    "venue".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EstimationConfig {
    /// Minimum time between the starts of two estimation cycles (ms)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Subject count above which a zone is classified High
    #[serde(default = "default_crowd_threshold")]
    pub crowd_threshold: usize,
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            crowd_threshold: default_crowd_threshold(),
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
        }
    }
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_crowd_threshold() -> usize {
    10
}

fn default_frame_width() -> u32 {
    640
}

fn default_frame_height() -> u32 {
    480
}

#[derive(Debug, Clone, Deserialize)]
pub struct EgressConfig {
    /// File path for density egress (JSONL format)
    #[serde(default = "default_egress_file")]
    pub file: String,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self { file: default_egress_file() }
    }
}

fn default_egress_file() -> String {
    "densities.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_interval")]
    pub interval_secs: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { interval_secs: default_metrics_interval() }
    }
}

fn default_metrics_interval() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// Origin node for the periodic route report
    #[serde(default)]
    pub origin: u32,
    /// Destination node for the periodic route report
    #[serde(default = "default_route_destination")]
    pub destination: u32,
    #[serde(default = "default_route_report_interval")]
    pub report_interval_secs: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            origin: 0,
            destination: default_route_destination(),
            report_interval_secs: default_route_report_interval(),
        }
    }
}

fn default_route_destination() -> u32 {
    5
}

fn default_route_report_interval() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_graph_nodes")]
    pub nodes: Vec<u32>,
    /// Undirected edges as (node_a, node_b, base_distance) triples
    #[serde(default = "default_graph_edges")]
    pub edges: Vec<(u32, u32, f64)>,
    /// Node id (string key, TOML limitation) to monitored zone id
    #[serde(default = "default_graph_zones")]
    pub zones: HashMap<String, u32>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            nodes: default_graph_nodes(),
            edges: default_graph_edges(),
            zones: default_graph_zones(),
        }
    }
}

fn default_graph_nodes() -> Vec<u32> {
    vec![0, 1, 2, 3, 4, 5]
}

fn default_graph_edges() -> Vec<(u32, u32, f64)> {
    vec![
        (0, 1, 10.0),
        (0, 2, 5.0),
        (1, 3, 8.0),
        (1, 4, 15.0),
        (2, 3, 12.0),
        (3, 5, 7.0),
        (4, 5, 6.0),
    ]
}

fn default_graph_zones() -> HashMap<String, u32> {
    let mut zones = HashMap::new();
    zones.insert("1".to_string(), 0);
    zones.insert("2".to_string(), 1);
    zones.insert("4".to_string(), 2);
    zones
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    pub zone: u32,
    pub name: String,
    /// Source kind; only "synthetic" is built in, real camera decoders
    /// plug in as external frame sources
    #[serde(default = "default_camera_kind")]
    pub kind: String,
    /// Simulated crowd size for synthetic sources
    #[serde(default = "default_camera_subjects")]
    pub subjects: usize,
}

fn default_camera_kind() -> String {
    "synthetic".to_string()
}

fn default_camera_subjects() -> usize {
    10
}

fn default_cameras() -> Vec<CameraConfig> {
    vec![
        CameraConfig {
            zone: 0,
            name: "CAM_1".to_string(),
            kind: default_camera_kind(),
            subjects: 10,
        },
        CameraConfig {
            zone: 1,
            name: "CAM_2".to_string(),
            kind: default_camera_kind(),
            subjects: 25,
        },
        CameraConfig {
            zone: 2,
            name: "CAM_3".to_string(),
            kind: default_camera_kind(),
            subjects: 40,
        },
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub estimation: EstimationConfig,
    #[serde(default)]
    pub egress: EgressConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default = "default_cameras")]
    pub cameras: Vec<CameraConfig>,
}

/// One monitored camera feed, resolved to typed ids
#[derive(Debug, Clone)]
pub struct CameraSpec {
    pub zone: ZoneId,
    pub name: String,
    pub kind: String,
    pub subjects: usize,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    interval_ms: u64,
    crowd_threshold: usize,
    frame_width: u32,
    frame_height: u32,
    egress_file: String,
    metrics_interval_secs: u64,
    route_origin: NodeId,
    route_destination: NodeId,
    route_report_interval_secs: u64,
    graph_nodes: Vec<NodeId>,
    graph_edges: Vec<(NodeId, NodeId, f64)>,
    node_zones: Vec<(NodeId, ZoneId)>,
    cameras: Vec<CameraSpec>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_toml(
            TomlConfig {
                site: SiteConfig::default(),
                estimation: EstimationConfig::default(),
                egress: EgressConfig::default(),
                metrics: MetricsConfig::default(),
                routing: RoutingConfig::default(),
                graph: GraphConfig::default(),
                cameras: default_cameras(),
            },
            "default",
        )
    }
}

impl Config {
    fn from_toml(toml_config: TomlConfig, config_file: &str) -> Self {
        // Convert zone mapping from string keys to typed ids
        let mut node_zones: Vec<(NodeId, ZoneId)> = toml_config
            .graph
            .zones
            .iter()
            .filter_map(|(key, &zone)| {
                key.parse::<u32>().ok().map(|node| (NodeId(node), ZoneId(zone)))
            })
            .collect();
        node_zones.sort();

        Self {
            site_id: toml_config.site.id,
            interval_ms: toml_config.estimation.interval_ms,
            crowd_threshold: toml_config.estimation.crowd_threshold,
            frame_width: toml_config.estimation.frame_width,
            frame_height: toml_config.estimation.frame_height,
            egress_file: toml_config.egress.file,
            metrics_interval_secs: toml_config.metrics.interval_secs,
            route_origin: NodeId(toml_config.routing.origin),
            route_destination: NodeId(toml_config.routing.destination),
            route_report_interval_secs: toml_config.routing.report_interval_secs,
            graph_nodes: toml_config.graph.nodes.into_iter().map(NodeId).collect(),
            graph_edges: toml_config
                .graph
                .edges
                .into_iter()
                .map(|(a, b, d)| (NodeId(a), NodeId(b), d))
                .collect(),
            node_zones,
            cameras: toml_config
                .cameras
                .into_iter()
                .map(|c| CameraSpec {
                    zone: ZoneId(c.zone),
                    name: c.name,
                    kind: c.kind,
                    subjects: c.subjects,
                })
                .collect(),
            config_file: config_file.to_string(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self::from_toml(toml_config, &path.display().to_string()))
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn crowd_threshold(&self) -> usize {
        self.crowd_threshold
    }

    pub fn frame_width(&self) -> u32 {
        self.frame_width
    }

    pub fn frame_height(&self) -> u32 {
        self.frame_height
    }

    pub fn egress_file(&self) -> &str {
        &self.egress_file
    }

    pub fn metrics_interval_secs(&self) -> u64 {
        self.metrics_interval_secs
    }

    pub fn route_origin(&self) -> NodeId {
        self.route_origin
    }

    pub fn route_destination(&self) -> NodeId {
        self.route_destination
    }

    pub fn route_report_interval_secs(&self) -> u64 {
        self.route_report_interval_secs
    }

    pub fn graph_nodes(&self) -> &[NodeId] {
        &self.graph_nodes
    }

    pub fn graph_edges(&self) -> &[(NodeId, NodeId, f64)] {
        &self.graph_edges
    }

    pub fn node_zones(&self) -> &[(NodeId, ZoneId)] {
        &self.node_zones
    }

    pub fn cameras(&self) -> &[CameraSpec] {
        &self.cameras
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.site_id(), "venue");
        assert_eq!(config.interval_ms(), 1000);
        assert_eq!(config.crowd_threshold(), 10);
        assert_eq!(config.metrics_interval_secs(), 10);
        assert_eq!(config.route_origin(), NodeId(0));
        assert_eq!(config.route_destination(), NodeId(5));
        assert_eq!(config.graph_nodes().len(), 6);
        assert_eq!(config.graph_edges().len(), 7);
        assert_eq!(config.cameras().len(), 3);
    }

    #[test]
    fn test_default_zone_mapping() {
        let config = Config::default();
        assert_eq!(
            config.node_zones(),
            &[
                (NodeId(1), ZoneId(0)),
                (NodeId(2), ZoneId(1)),
                (NodeId(4), ZoneId(2)),
            ]
        );
    }

    #[test]
    fn test_default_cameras_sit_around_threshold() {
        // CAM_1 is at the threshold (Normal), the other two are above it
        let config = Config::default();
        let subjects: Vec<usize> = config.cameras().iter().map(|c| c.subjects).collect();
        assert_eq!(subjects, [10, 25, 40]);
    }

    #[test]
    fn test_egress_file_default() {
        let egress = EgressConfig::default();
        assert_eq!(egress.file, "densities.jsonl");
        assert!(!egress.file.is_empty());

        let config = Config::default();
        assert_eq!(config.egress_file(), "densities.jsonl");
    }
}
