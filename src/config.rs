//! Render configuration, optionally loaded from a YAML file.
//!
//! Every field is optional in the file; missing fields fall back to the
//! defaults, so a config containing only `seed: 7` is valid.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::synth::SynthParams;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub sample_rate: u32,
    pub seed: u64,
    pub ticks_per_quarter: u16,
    pub normalize_peak: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            seed: 42,
            ticks_per_quarter: 480,
            normalize_peak: 0.9,
        }
    }
}

/// File shape: all fields optional.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    sample_rate: Option<u32>,
    seed: Option<u64>,
    ticks_per_quarter: Option<u16>,
    normalize_peak: Option<f32>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_yaml::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config read failed: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse failed: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl RenderConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(text)?;
        Ok(Self::merge(raw))
    }

    fn merge(raw: RawConfig) -> Self {
        let defaults = Self::default();
        let normalize_peak = raw
            .normalize_peak
            .filter(|p| (0.0..=1.0).contains(p) && *p > 0.0)
            .unwrap_or(defaults.normalize_peak);
        Self {
            sample_rate: raw.sample_rate.filter(|r| *r > 0).unwrap_or(defaults.sample_rate),
            seed: raw.seed.unwrap_or(defaults.seed),
            ticks_per_quarter: raw
                .ticks_per_quarter
                .filter(|t| *t > 0)
                .unwrap_or(defaults.ticks_per_quarter),
            normalize_peak,
        }
    }

    pub fn synth_params(&self) -> SynthParams {
        SynthParams {
            sample_rate: self.sample_rate,
            seed: self.seed,
            normalize_peak: self.normalize_peak,
        }
    }
}
