use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use engine::{Rgba, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub(crate) const CONFIG_ENV_VAR: &str = "ISOCITY_CONFIG";
pub(crate) const DEFAULT_CONFIG_FILE_NAME: &str = "city.json";
const MAX_WANDERER_COUNT: usize = 64;
const DEFAULT_PROPERTY_VALUE: f64 = 100_000.0;

pub(crate) const DEFAULT_SKIN_COLOR: Rgba = Rgba::opaque(0xfd, 0xbf, 0x5f);
pub(crate) const DEFAULT_HAIR_COLOR: Rgba = Rgba::opaque(0x1a, 0x1a, 0x1a);
pub(crate) const DEFAULT_OUTFIT_COLOR: Rgba = Rgba::opaque(0x3f, 0x51, 0xb5);

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}{location}: {source}")]
    Parse {
        path: PathBuf,
        location: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct PointConfig {
    pub(crate) x: f32,
    pub(crate) y: f32,
}

impl PointConfig {
    pub(crate) const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub(crate) fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PropertyKind {
    House,
    Business,
    Farm,
    Shop,
    Factory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PropertySite {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) kind: PropertyKind,
    pub(crate) position: PointConfig,
    #[serde(default)]
    pub(crate) owned: bool,
    #[serde(default = "default_property_value")]
    pub(crate) value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct JobSite {
    pub(crate) name: String,
    /// Venue label such as `office` or `farm`; cosmetic only.
    #[serde(default)]
    pub(crate) venue: String,
    pub(crate) position: PointConfig,
}

/// Geographic rectangle the world maps onto linearly.
/// World `y = 0` is the northern edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct CityBounds {
    pub(crate) north: f64,
    pub(crate) south: f64,
    pub(crate) west: f64,
    pub(crate) east: f64,
}

impl Default for CityBounds {
    fn default() -> Self {
        Self {
            north: 14.6494,
            south: 14.5494,
            west: 120.9342,
            east: 121.0342,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct CosmeticsConfig {
    pub(crate) skin: String,
    pub(crate) hair: String,
    pub(crate) outfit: String,
}

impl Default for CosmeticsConfig {
    fn default() -> Self {
        Self {
            skin: "#fdbf5f".to_string(),
            hair: "#1a1a1a".to_string(),
            outfit: "#3f51b5".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AvatarColors {
    pub(crate) skin: Rgba,
    pub(crate) hair: Rgba,
    pub(crate) outfit: Rgba,
}

impl Default for AvatarColors {
    fn default() -> Self {
        Self {
            skin: DEFAULT_SKIN_COLOR,
            hair: DEFAULT_HAIR_COLOR,
            outfit: DEFAULT_OUTFIT_COLOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct SimConfig {
    pub(crate) map_width: f32,
    pub(crate) map_height: f32,
    pub(crate) grid_size: f32,
    pub(crate) tile_width: f32,
    pub(crate) iso_grid_width: u32,
    pub(crate) iso_grid_height: u32,
    pub(crate) start_position: PointConfig,
    pub(crate) city: String,
    pub(crate) city_bounds: CityBounds,
    pub(crate) cosmetics: CosmeticsConfig,
    pub(crate) job_sites: Vec<JobSite>,
    pub(crate) property_sites: Vec<PropertySite>,
    pub(crate) wanderer_count: usize,
    pub(crate) rng_seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            map_width: 300.0,
            map_height: 350.0,
            grid_size: 20.0,
            tile_width: 64.0,
            iso_grid_width: 20,
            iso_grid_height: 15,
            start_position: PointConfig::new(150.0, 175.0),
            city: "Manila".to_string(),
            city_bounds: CityBounds::default(),
            cosmetics: CosmeticsConfig::default(),
            job_sites: default_job_sites(),
            property_sites: default_property_sites(),
            wanderer_count: 5,
            rng_seed: None,
        }
    }
}

impl SimConfig {
    /// Replaces values the simulation cannot run with, logging each fix.
    pub(crate) fn sanitized(mut self) -> Self {
        let defaults = SimConfig::default();
        if !is_positive_finite(self.map_width) || !is_positive_finite(self.map_height) {
            warn!(
                map_width = self.map_width,
                map_height = self.map_height,
                "config_invalid_map_size_using_default"
            );
            self.map_width = defaults.map_width;
            self.map_height = defaults.map_height;
        }
        if !is_positive_finite(self.grid_size) {
            warn!(grid_size = self.grid_size, "config_invalid_grid_size_using_default");
            self.grid_size = defaults.grid_size;
        }
        if !is_positive_finite(self.tile_width) {
            warn!(tile_width = self.tile_width, "config_invalid_tile_width_using_default");
            self.tile_width = defaults.tile_width;
        }
        if self.iso_grid_width == 0 || self.iso_grid_height == 0 {
            warn!(
                iso_grid_width = self.iso_grid_width,
                iso_grid_height = self.iso_grid_height,
                "config_invalid_iso_grid_using_default"
            );
            self.iso_grid_width = defaults.iso_grid_width;
            self.iso_grid_height = defaults.iso_grid_height;
        }
        if self.wanderer_count > MAX_WANDERER_COUNT {
            warn!(
                wanderer_count = self.wanderer_count,
                max = MAX_WANDERER_COUNT,
                "config_wanderer_count_clamped"
            );
            self.wanderer_count = MAX_WANDERER_COUNT;
        }

        self.start_position = self.clamp_point(self.start_position);
        for site in &mut self.job_sites {
            site.position = clamp_point_to(site.position, self.map_width, self.map_height);
        }
        for site in &mut self.property_sites {
            site.position = clamp_point_to(site.position, self.map_width, self.map_height);
        }
        self
    }

    pub(crate) fn clamp_point(&self, point: PointConfig) -> PointConfig {
        clamp_point_to(point, self.map_width, self.map_height)
    }

    pub(crate) fn avatar_colors(&self) -> AvatarColors {
        AvatarColors {
            skin: resolve_color("skin", &self.cosmetics.skin, DEFAULT_SKIN_COLOR),
            hair: resolve_color("hair", &self.cosmetics.hair, DEFAULT_HAIR_COLOR),
            outfit: resolve_color("outfit", &self.cosmetics.outfit, DEFAULT_OUTFIT_COLOR),
        }
    }
}

fn is_positive_finite(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

fn clamp_point_to(point: PointConfig, width: f32, height: f32) -> PointConfig {
    let x = if point.x.is_finite() { point.x } else { 0.0 };
    let y = if point.y.is_finite() { point.y } else { 0.0 };
    PointConfig::new(x.clamp(0.0, width), y.clamp(0.0, height))
}

fn default_property_value() -> f64 {
    DEFAULT_PROPERTY_VALUE
}

fn resolve_color(slot: &'static str, raw: &str, fallback: Rgba) -> Rgba {
    match parse_hex_color(raw) {
        Some(color) => color,
        None => {
            warn!(slot, value = raw, "cosmetic_color_invalid_using_default");
            fallback
        }
    }
}

/// Parses `#rrggbb` or `#rgb`.
pub(crate) fn parse_hex_color(raw: &str) -> Option<Rgba> {
    let hex = raw.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Rgba::opaque(r, g, b))
        }
        3 => {
            let mut channels = [0u8; 3];
            for (slot, digit) in channels.iter_mut().zip(hex.chars()) {
                let value = digit.to_digit(16)? as u8;
                *slot = value * 17;
            }
            Some(Rgba::opaque(channels[0], channels[1], channels[2]))
        }
        _ => None,
    }
}

fn job_site(name: &str, venue: &str, x: f32, y: f32) -> JobSite {
    JobSite {
        name: name.to_string(),
        venue: venue.to_string(),
        position: PointConfig::new(x, y),
    }
}

fn default_job_sites() -> Vec<JobSite> {
    vec![
        job_site("Marketing Manager", "office", 50.0, 50.0),
        job_site("Fish Farmer", "farm", 150.0, 80.0),
        job_site("Gardener", "farm", 200.0, 120.0),
        job_site("Delivery Driver", "shop", 100.0, 150.0),
        job_site("Bartender", "bar", 75.0, 100.0),
        job_site("Freelance Developer", "office", 25.0, 200.0),
        job_site("Construction Worker", "site", 180.0, 200.0),
        job_site("Nurse", "hospital", 120.0, 180.0),
        job_site("Teacher", "school", 140.0, 220.0),
        job_site("Chef", "restaurant", 90.0, 120.0),
    ]
}

fn property_site(
    id: &str,
    name: &str,
    kind: PropertyKind,
    x: f32,
    y: f32,
    owned: bool,
    value: f64,
) -> PropertySite {
    PropertySite {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        position: PointConfig::new(x, y),
        owned,
        value,
    }
}

fn default_property_sites() -> Vec<PropertySite> {
    vec![
        property_site("prop-1", "Bayview House", PropertyKind::House, 60.0, 280.0, true, 250_000.0),
        property_site("prop-2", "Corner Office", PropertyKind::Business, 240.0, 40.0, false, 900_000.0),
        property_site("prop-3", "Rice Terraces", PropertyKind::Farm, 250.0, 300.0, false, 120_000.0),
        property_site("prop-4", "Sari-Sari Store", PropertyKind::Shop, 210.0, 250.0, false, 80_000.0),
        property_site("prop-5", "Bottling Plant", PropertyKind::Factory, 270.0, 170.0, false, 1_500_000.0),
    ]
}

pub(crate) fn parse_sim_config(raw: &str, path: &Path) -> Result<SimConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, SimConfig>(&mut deserializer) {
        Ok(config) => Ok(config.sanitized()),
        Err(error) => {
            let json_path = error.path().to_string();
            let location = if json_path.is_empty() || json_path == "." {
                String::new()
            } else {
                format!(" at {json_path}")
            };
            Err(ConfigError::Parse {
                path: path.to_path_buf(),
                location,
                source: error.into_inner(),
            })
        }
    }
}

pub(crate) fn load_sim_config_from_path(path: &Path) -> Result<SimConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_sim_config(&raw, path)
}

/// Resolves the config file: `ISOCITY_CONFIG`, then `city.json` in
/// `config_dir`, then built-in defaults. Never fails.
pub(crate) fn load_sim_config(config_dir: Option<&Path>) -> SimConfig {
    let explicit = match env::var(CONFIG_ENV_VAR) {
        Ok(value) if !value.trim().is_empty() => Some(PathBuf::from(value)),
        Ok(_) | Err(env::VarError::NotPresent) => None,
        Err(error) => {
            warn!(env_var = CONFIG_ENV_VAR, error = %error, "config_env_var_unreadable");
            None
        }
    };
    load_sim_config_with_override(explicit.as_deref(), config_dir)
}

pub(crate) fn load_sim_config_with_override(
    explicit: Option<&Path>,
    config_dir: Option<&Path>,
) -> SimConfig {
    let candidate = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => config_dir
            .map(|dir| dir.join(DEFAULT_CONFIG_FILE_NAME))
            .filter(|path| path.is_file()),
    };
    let Some(path) = candidate else {
        info!("config_defaults_in_use");
        return SimConfig::default();
    };

    match load_sim_config_from_path(&path) {
        Ok(config) => {
            info!(
                path = %path.display(),
                city = config.city.as_str(),
                job_sites = config.job_sites.len(),
                property_sites = config.property_sites.len(),
                "config_loaded"
            );
            config
        }
        Err(error) => {
            warn!(error = %error, "config_load_failed_using_defaults");
            SimConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join(DEFAULT_CONFIG_FILE_NAME);
        let mut file = fs::File::create(&path).expect("create config");
        file.write_all(body.as_bytes()).expect("write config");
        path
    }

    #[test]
    fn default_config_matches_reference_world() {
        let config = SimConfig::default();
        assert_eq!(config.map_width, 300.0);
        assert_eq!(config.map_height, 350.0);
        assert_eq!(config.grid_size, 20.0);
        assert_eq!(config.job_sites.len(), 10);
        assert_eq!(config.wanderer_count, 5);
    }

    #[test]
    fn partial_file_fills_missing_fields_with_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(&dir, r#"{ "city": "Cebu", "wanderer_count": 2 }"#);

        let config = load_sim_config_from_path(&path).expect("config");
        assert_eq!(config.city, "Cebu");
        assert_eq!(config.wanderer_count, 2);
        assert_eq!(config.map_width, 300.0);
        assert_eq!(config.job_sites.len(), 10);
    }

    #[test]
    fn parse_error_reports_json_path() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(
            &dir,
            r#"{ "property_sites": [ { "id": "a", "name": "A", "kind": "castle", "position": { "x": 1, "y": 2 } } ] }"#,
        );

        let error = load_sim_config_from_path(&path).expect_err("unknown kind must fail");
        let message = error.to_string();
        assert!(message.contains("property_sites[0].kind"), "{message}");
    }

    #[test]
    fn shipped_city_file_matches_built_in_defaults() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../config")
            .join(DEFAULT_CONFIG_FILE_NAME);
        let config = load_sim_config_from_path(&path).expect("shipped config");
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = TempDir::new().expect("tempdir");
        let error = load_sim_config_from_path(&dir.path().join("absent.json"))
            .expect_err("missing file");
        assert!(matches!(error, ConfigError::Read { .. }));
    }

    #[test]
    fn loader_falls_back_to_defaults_for_missing_or_broken_files() {
        let empty_dir = TempDir::new().expect("tempdir");
        assert_eq!(
            load_sim_config_with_override(None, Some(empty_dir.path())),
            SimConfig::default()
        );

        let broken_dir = TempDir::new().expect("tempdir");
        write_config(&broken_dir, "{ not json");
        assert_eq!(
            load_sim_config_with_override(None, Some(broken_dir.path())),
            SimConfig::default()
        );
    }

    #[test]
    fn explicit_path_takes_precedence_over_config_dir() {
        let dir_config = TempDir::new().expect("tempdir");
        write_config(&dir_config, r#"{ "city": "Davao" }"#);
        let explicit_dir = TempDir::new().expect("tempdir");
        let explicit = write_config(&explicit_dir, r#"{ "city": "Baguio" }"#);

        let config = load_sim_config_with_override(Some(&explicit), Some(dir_config.path()));
        assert_eq!(config.city, "Baguio");
    }

    #[test]
    fn sanitize_repairs_invalid_geometry_and_clamps_positions() {
        let config = SimConfig {
            map_width: -1.0,
            grid_size: f32::NAN,
            iso_grid_width: 0,
            start_position: PointConfig::new(9_999.0, -5.0),
            wanderer_count: 1_000,
            ..SimConfig::default()
        }
        .sanitized();

        assert_eq!(config.map_width, 300.0);
        assert_eq!(config.grid_size, 20.0);
        assert_eq!(config.iso_grid_width, 20);
        assert_eq!(config.start_position, PointConfig::new(300.0, 0.0));
        assert_eq!(config.wanderer_count, MAX_WANDERER_COUNT);
    }

    #[test]
    fn hex_colors_parse_long_and_short_forms() {
        assert_eq!(parse_hex_color("#ff8000"), Some(Rgba::opaque(255, 128, 0)));
        assert_eq!(parse_hex_color("#0f0"), Some(Rgba::opaque(0, 255, 0)));
        assert_eq!(parse_hex_color("ff8000"), None);
        assert_eq!(parse_hex_color("#ggg"), None);
        assert_eq!(parse_hex_color("#12345"), None);
    }

    #[test]
    fn invalid_cosmetics_fall_back_per_slot() {
        let config = SimConfig {
            cosmetics: CosmeticsConfig {
                skin: "salmon".to_string(),
                hair: "#222".to_string(),
                outfit: String::new(),
            },
            ..SimConfig::default()
        };
        let colors = config.avatar_colors();
        assert_eq!(colors.skin, DEFAULT_SKIN_COLOR);
        assert_eq!(colors.hair, Rgba::opaque(0x22, 0x22, 0x22));
        assert_eq!(colors.outfit, DEFAULT_OUTFIT_COLOR);
    }
}
