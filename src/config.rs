use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    geo::{check_coordinate, check_time, RiskZone},
    map::DEFAULT_ZOOM,
    risk::RiskThresholds,
};

fn default_identity_url() -> String {
    "http://127.0.0.1:5001".to_string()
}

fn default_latitude() -> f64 {
    35.5
}

fn default_longitude() -> f64 {
    -165.0
}

fn default_risk_zones() -> Vec<RiskZone> {
    vec![RiskZone::new(35.8, -165.5), RiskZone::new(35.2, -164.5)]
}

fn default_container() -> String {
    "mapContainer".to_string()
}

fn default_zoom() -> u8 {
    DEFAULT_ZOOM
}

fn default_tracker_seed() -> u64 {
    7
}

fn default_drift_deg() -> f64 {
    0.02
}

fn default_interval_secs() -> u64 {
    5
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub fisherman: FishermanConfig,
    #[serde(default = "default_risk_zones")]
    pub risk_zones: Vec<RiskZone>,
    #[serde(default)]
    pub risk: RiskThresholds,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            identity: IdentityConfig::default(),
            fisherman: FishermanConfig::default(),
            risk_zones: default_risk_zones(),
            risk: RiskThresholds::default(),
            map: MapConfig::default(),
            tracker: TrackerConfig::default(),
            web: WebConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_identity_url")]
    pub base_url: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: default_identity_url(),
        }
    }
}

/// Starting position. Hour and month fall back to the clock when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FishermanConfig {
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    #[serde(default = "default_longitude")]
    pub longitude: f64,
    #[serde(default)]
    pub hour: Option<u8>,
    #[serde(default)]
    pub month: Option<u8>,
}

impl Default for FishermanConfig {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            hour: None,
            month: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_container")]
    pub container: String,
    #[serde(default = "default_zoom")]
    pub zoom: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            container: default_container(),
            zoom: default_zoom(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_tracker_seed")]
    pub seed: u64,
    #[serde(default = "default_drift_deg")]
    pub drift_deg: f64,
    /// Zero disables the simulated feed.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            seed: default_tracker_seed(),
            drift_deg: default_drift_deg(),
            interval_secs: default_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    pub fn from_yaml_str(data: &str) -> Result<Self> {
        let config: AppConfig = if data.trim().is_empty() {
            AppConfig::default()
        } else {
            serde_yaml::from_str(data)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_coordinate(self.fisherman.latitude, self.fisherman.longitude)
            .context("fisherman start position")?;
        if let Some(hour) = self.fisherman.hour {
            check_time(hour, self.fisherman.month.unwrap_or(1)).context("fisherman hour")?;
        }
        if let Some(month) = self.fisherman.month {
            check_time(0, month).context("fisherman month")?;
        }
        for (index, zone) in self.risk_zones.iter().enumerate() {
            check_coordinate(zone.latitude, zone.longitude)
                .with_context(|| format!("risk zone #{}", index + 1))?;
        }
        self.risk.validate()?;
        anyhow::ensure!(
            self.tracker.drift_deg.is_finite() && self.tracker.drift_deg >= 0.0,
            "tracker drift must be a non-negative number of degrees"
        );
        Ok(())
    }
}

pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<AppConfig> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        AppConfig::from_yaml_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default(&self, file: impl AsRef<Path>) -> Result<AppConfig> {
        let path = self.base_dir.join(file.as_ref());
        if path.exists() {
            self.load(file)
        } else {
            Ok(AppConfig::default())
        }
    }
}
