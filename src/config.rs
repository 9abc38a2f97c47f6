//! Planner configuration
//!
//! Configuration is plain serde data with defaults, JSON loading, `LIGHTNING_PLANNER_*`
//! environment overrides and presets. Every loader validates before returning.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Prefix of environment variables that override configuration values
pub const ENV_PREFIX: &str = "LIGHTNING_PLANNER_";

/// Parameters of the access-path index cost model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostModelConfig {
    /// Cost of touching one index or table entry
    pub base_unit_cost: f64,
    /// Selectivity of a single equality-matched key column
    pub equality_selectivity: f64,
    /// Fraction of the remaining key range read for a range predicate without statistics
    pub default_range_fraction: f64,
    /// Cost of evaluating a join predicate once
    pub per_row_predicate_cost: f64,
    /// Extra cost per residual filter, scaled by the fraction of the index read
    pub residual_filter_cost: f64,
    /// Multiplier on the n·log2(n) penalty for sorting index output
    pub sort_penalty_factor: f64,
    /// Lower bound for every index cost
    pub min_cost_per_row: f64,
    /// Row-count reduction of a scan filter in the default metadata query
    pub default_filter_selectivity: f64,
}

impl Default for CostModelConfig {
    fn default() -> Self {
        Self {
            base_unit_cost: 1.0,
            equality_selectivity: 0.1,
            default_range_fraction: 0.25,
            per_row_predicate_cost: 1.0,
            residual_filter_cost: 0.0,
            sort_penalty_factor: 1.0,
            min_cost_per_row: 0.001,
            default_filter_selectivity: 0.1,
        }
    }
}

impl CostModelConfig {
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("base_unit_cost", self.base_unit_cost),
            ("per_row_predicate_cost", self.per_row_predicate_cost),
            ("residual_filter_cost", self.residual_filter_cost),
            ("sort_penalty_factor", self.sort_penalty_factor),
            ("min_cost_per_row", self.min_cost_per_row),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Configuration(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }

        let fractions = [
            ("equality_selectivity", self.equality_selectivity),
            ("default_range_fraction", self.default_range_fraction),
            ("default_filter_selectivity", self.default_filter_selectivity),
        ];
        for (name, value) in fractions {
            if !(value > 0.0 && value <= 1.0) {
                return Err(Error::Configuration(format!(
                    "{} must be in (0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Top-level planner configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub cost: CostModelConfig,
    /// Hand unsupported shapes to the fallback strategy instead of failing
    pub allow_fallback: bool,
    /// Worker threads for batch compilation, 0 uses the rayon default
    pub parallelism: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            cost: CostModelConfig::default(),
            allow_fallback: true,
            parallelism: 0,
        }
    }
}

/// Configuration presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPreset {
    /// Strict settings for development and tests: fallbacks surface as errors
    Development,
    /// Defaults used by the server
    Production,
    /// Prefer index plans aggressively (cheaper lookups, higher sort penalty)
    IndexHeavy,
}

impl ConfigPreset {
    pub fn to_config(self) -> PlannerConfig {
        match self {
            ConfigPreset::Development => PlannerConfig::development(),
            ConfigPreset::Production => PlannerConfig::production(),
            ConfigPreset::IndexHeavy => PlannerConfig {
                cost: CostModelConfig {
                    equality_selectivity: 0.05,
                    sort_penalty_factor: 2.0,
                    ..CostModelConfig::default()
                },
                ..PlannerConfig::default()
            },
        }
    }
}

impl PlannerConfig {
    pub fn development() -> Self {
        Self {
            allow_fallback: false,
            parallelism: 1,
            ..Self::default()
        }
    }

    pub fn production() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        self.cost.validate()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlannerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Applies `LIGHTNING_PLANNER_*` environment variables on top of `self`.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.apply_overrides(std::env::vars().filter(|(key, _)| key.starts_with(ENV_PREFIX)))
    }

    /// Applies `(KEY, value)` overrides, where keys may carry the environment prefix.
    pub fn apply_overrides<I, K, V>(mut self, overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in overrides {
            let key = key.as_ref();
            let name = key.strip_prefix(ENV_PREFIX).unwrap_or(key).to_ascii_lowercase();
            let value = value.as_ref().trim();
            match name.as_str() {
                "allow_fallback" => self.allow_fallback = parse_value(&name, value)?,
                "parallelism" => self.parallelism = parse_value(&name, value)?,
                "base_unit_cost" => self.cost.base_unit_cost = parse_value(&name, value)?,
                "equality_selectivity" => self.cost.equality_selectivity = parse_value(&name, value)?,
                "default_range_fraction" => self.cost.default_range_fraction = parse_value(&name, value)?,
                "per_row_predicate_cost" => self.cost.per_row_predicate_cost = parse_value(&name, value)?,
                "residual_filter_cost" => self.cost.residual_filter_cost = parse_value(&name, value)?,
                "sort_penalty_factor" => self.cost.sort_penalty_factor = parse_value(&name, value)?,
                "min_cost_per_row" => self.cost.min_cost_per_row = parse_value(&name, value)?,
                "default_filter_selectivity" => {
                    self.cost.default_filter_selectivity = parse_value(&name, value)?
                }
                _ => tracing::warn!(key = key, "Ignoring unknown planner setting"),
            }
        }
        self.validate()?;
        Ok(self)
    }
}

fn parse_value<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::Configuration(format!("invalid value for {}: {:?}", name, value)))
}
