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

use crate::metric::UnknownMetric;
use thiserror::Error;
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Data loading error: {0}")]
    Load(#[from] LoadError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] SerialisationError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("No files were uploaded")]
    NoFiles,
    #[error("Failed to read uploaded file '{file}': {source}")]
    Read {
        file: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Cannot derive a country name from file '{name}'")]
    InvalidFileName { name: String },
    #[error("Failed to parse CSV file '{file}': {source}")]
    Parse {
        file: String,
        #[source]
        source: polars::error::PolarsError,
    },
    #[error("Failed to tag rows of '{file}' with their country: {source}")]
    Tagging {
        file: String,
        #[source]
        source: polars::error::PolarsError,
    },
}
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    ConfigFileError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML configuration: {source}")]
    TomlParseError {
        #[from]
        source: toml::de::Error,
    },
    #[error("Invalid configuration: {field} = {value}")]
    InvalidValue { field: String, value: String },
    #[error("Metric {metric} cannot be selected for comparison (choose GHI, DNI or DHI)")]
    MetricNotSelectable { metric: String },
    #[error(transparent)]
    UnknownMetric(#[from] UnknownMetric),
}
#[derive(Error, Debug)]
pub enum SerialisationError {
    #[error("JSON serialisation failed: {source}")]
    JsonSerialisationError {
        #[from]
        source: serde_json::Error,
    },
    #[error("TOML serialisation failed: {source}")]
    TomlSerialisationError {
        #[from]
        source: toml::ser::Error,
    },
}
pub type Result<T> = std::result::Result<T, DashboardError>;
pub type LoadResult<T> = std::result::Result<T, LoadError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Serialisation(SerialisationError::JsonSerialisationError { source: err })
    }
}
impl DashboardError {
    pub fn category(&self) -> &'static str {
        match self {
            DashboardError::Load(_) => "Data",
            DashboardError::Config(_) => "Configuration",
            DashboardError::Serialisation(_) => "Serialisation",
            DashboardError::Io(_) => "I/O",
        }
    }
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            DashboardError::Load(LoadError::NoFiles) => vec![
                "Upload the cleaned country CSV files (e.g. benin_clean.csv, togo_clean.csv)"
                    .to_string(),
            ],
            DashboardError::Load(LoadError::Parse { .. }) => vec![
                "Check that the file is comma separated with a header row".to_string(),
                "Make sure every row has the same number of fields as the header".to_string(),
            ],
            DashboardError::Load(LoadError::Read { .. }) => vec![
                "Check that the path exists and is readable".to_string(),
            ],
            DashboardError::Load(LoadError::InvalidFileName { .. }) => vec![
                "Name files after the country they describe, e.g. togo_clean.csv".to_string(),
            ],
            DashboardError::Config(ConfigError::MetricNotSelectable { .. })
            | DashboardError::Config(ConfigError::UnknownMetric(_)) => {
                vec!["Pick one of GHI, DNI or DHI".to_string()]
            }
            DashboardError::Config(_) => {
                vec!["Compare your configuration with DashboardConfig::default()".to_string()]
            }
            _ => vec!["Check the error message for specific guidance".to_string()],
        }
    }
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::Load(LoadError::NoFiles) => {
                "Please upload your cleaned country CSV files to start analysis.".to_string()
            }
            DashboardError::Load(LoadError::Parse { file, .. }) => {
                format!("'{file}' could not be read as a CSV table.")
            }
            _ => self.to_string(),
        }
    }
    fn severity(&self) -> Severity {
        match self {
            DashboardError::Load(LoadError::NoFiles) => Severity::Info,
            DashboardError::Config(_) => Severity::Warning,
            _ => Severity::Error,
        }
    }
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Info,
    Warning,
    Error,
}
impl Severity {
    fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
    fn color_code(self) -> &'static str {
        match self {
            Severity::Info => "\x1b[36m",
            Severity::Warning => "\x1b[33m",
            Severity::Error => "\x1b[31m",
        }
    }
}
/// Formats errors for display by the dashboard shell.
pub struct ErrorReporter {
    pub show_suggestions: bool,
    pub colored_output: bool,
}
impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            show_suggestions: true,
            colored_output: true,
        }
    }
    pub fn plain() -> Self {
        Self {
            show_suggestions: true,
            colored_output: false,
        }
    }
    pub fn report(&self, error: &DashboardError) -> String {
        let severity = error.severity();
        let mut output = String::new();
        if self.colored_output {
            output.push_str(severity.color_code());
        }
        output.push_str(&format!(
            "[{}] {}: {}\n",
            severity.as_str(),
            error.category(),
            error.user_message()
        ));
        if self.colored_output {
            output.push_str("\x1b[0m");
        }
        if self.show_suggestions {
            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                output.push_str("\nSuggestions:\n");
                for suggestion in suggestions {
                    output.push_str(&format!("  • {suggestion}\n"));
                }
            }
        }
        output
    }
}
impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
