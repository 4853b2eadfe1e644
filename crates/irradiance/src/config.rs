// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

use crate::chart::{ChartStyle, KNOWN_TEMPLATES};
use crate::error::{ConfigError, ConfigResult, SerialisationError};
use crate::metric::Metric;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Options the user picks in the dashboard sidebar.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DashboardOptions {
    pub metric: Metric,
    pub show_heatmaps: bool,
    pub show_summary: bool,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            metric: Metric::Ghi,
            show_heatmaps: false,
            show_summary: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SamplingConfig {
    /// Boxplots with more rows than this are downsampled to exactly this many.
    pub max_points: usize,
    pub seed: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            max_points: 5000,
            seed: 42,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    pub loader_capacity: usize,
    pub summary_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            loader_capacity: 8,
            summary_capacity: 64,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct DashboardConfig {
    pub options: DashboardOptions,
    pub sampling: SamplingConfig,
    pub cache: CacheConfig,
    pub style: ChartStyle,
}

impl DashboardConfig {
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: DashboardConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(config_path: &Path) -> ConfigResult<Self> {
        let content =
            fs::read_to_string(config_path).map_err(|source| ConfigError::ConfigFileError {
                path: config_path.display().to_string(),
                source,
            })?;
        Self::from_toml_str(&content)
    }

    pub fn default_config_path() -> PathBuf {
        PathBuf::from("config/dashboard.toml")
    }

    pub fn load_or_default() -> Self {
        Self::load_or_default_from(&Self::default_config_path())
    }

    /// Loads `config_path`, falling back to defaults when it is absent or invalid.
    /// A file that exists but cannot be used is reported with `warn!`.
    pub fn load_or_default_from(config_path: &Path) -> Self {
        match Self::load_from_file(config_path) {
            Ok(config) => config,
            Err(ConfigError::ConfigFileError { ref source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                debug!(path = %config_path.display(), "no dashboard config, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!(path = %config_path.display(), error = %e, "ignoring dashboard config, using defaults");
                Self::default()
            }
        }
    }

    pub fn to_toml_string(&self) -> Result<String, SerialisationError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.options.metric.is_selectable() {
            return Err(ConfigError::MetricNotSelectable {
                metric: self.options.metric.to_string(),
            });
        }
        let positive = [
            ("sampling.max_points", self.sampling.max_points),
            ("cache.loader_capacity", self.cache.loader_capacity),
            ("cache.summary_capacity", self.cache.summary_capacity),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                });
            }
        }
        if self.style.box_height == 0 || self.style.bar_height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "style.*_height".to_string(),
                value: "0".to_string(),
            });
        }
        if !KNOWN_TEMPLATES.contains(&self.style.template.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "style.template".to_string(),
                value: self.style.template.clone(),
            });
        }
        Ok(())
    }

    /// Smaller boxplot samples for batches with many years of minute data.
    pub fn for_large_uploads() -> Self {
        Self {
            sampling: SamplingConfig {
                max_points: 2000,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Everything switched on.
    pub fn for_exploration() -> Self {
        Self {
            options: DashboardOptions {
                show_heatmaps: true,
                show_summary: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
