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

//! Measurement columns known to the dashboard.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A measurement column expected in an uploaded country file.
///
/// The column names are case sensitive and match the headers produced by the
/// station cleaning pipeline (`GHI`, `DNI`, `DHI`, `TModA`, `TModB`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "GHI")]
    Ghi,
    #[serde(rename = "DNI")]
    Dni,
    #[serde(rename = "DHI")]
    Dhi,
    #[serde(rename = "TModA")]
    TModA,
    #[serde(rename = "TModB")]
    TModB,
}

impl Metric {
    /// Metrics the user can pick for the comparative charts.
    pub const SELECTABLE: [Metric; 3] = [Metric::Ghi, Metric::Dni, Metric::Dhi];

    /// Candidate inputs of the per-country correlation heatmap, in display order.
    pub const CORRELATION_CANDIDATES: [Metric; 5] = [
        Metric::Ghi,
        Metric::Dni,
        Metric::Dhi,
        Metric::TModA,
        Metric::TModB,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            Metric::Ghi => "GHI",
            Metric::Dni => "DNI",
            Metric::Dhi => "DHI",
            Metric::TModA => "TModA",
            Metric::TModB => "TModB",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Metric::Ghi => "Global Horizontal Irradiance",
            Metric::Dni => "Direct Normal Irradiance",
            Metric::Dhi => "Diffuse Horizontal Irradiance",
            Metric::TModA => "Module temperature (sensor A)",
            Metric::TModB => "Module temperature (sensor B)",
        }
    }

    pub fn is_selectable(self) -> bool {
        Self::SELECTABLE.contains(&self)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric '{0}' (expected one of GHI, DNI, DHI, TModA, TModB)")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    /// Accepts the exact column name or any casing of it (`ghi`, `tmoda`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Metric::CORRELATION_CANDIDATES
            .into_iter()
            .find(|m| m.column_name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

/// Where a metric column was found across the uploaded countries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MetricAvailability {
    Everywhere,
    Partial { missing: Vec<String> },
    Nowhere,
}

impl MetricAvailability {
    pub fn is_available(&self) -> bool {
        !matches!(self, MetricAvailability::Nowhere)
    }

    pub(crate) fn from_missing(missing: Vec<String>, total: usize) -> Self {
        if missing.is_empty() {
            MetricAvailability::Everywhere
        } else if missing.len() == total {
            MetricAvailability::Nowhere
        } else {
            MetricAvailability::Partial { missing }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_any_casing() {
        assert_eq!("GHI".parse::<Metric>().unwrap(), Metric::Ghi);
        assert_eq!("dni".parse::<Metric>().unwrap(), Metric::Dni);
        assert_eq!(" TMODB ".parse::<Metric>().unwrap(), Metric::TModB);
        assert!("Tamb".parse::<Metric>().is_err());
    }

    #[test]
    fn only_irradiance_is_selectable() {
        assert!(Metric::Dhi.is_selectable());
        assert!(!Metric::TModA.is_selectable());
    }

    #[test]
    fn serde_uses_column_names() {
        let json = serde_json::to_string(&Metric::TModA).unwrap();
        assert_eq!(json, "\"TModA\"");
        let back: Metric = serde_json::from_str("\"GHI\"").unwrap();
        assert_eq!(back, Metric::Ghi);
    }

    #[test]
    fn availability_from_missing() {
        assert_eq!(
            MetricAvailability::from_missing(vec![], 3),
            MetricAvailability::Everywhere
        );
        assert_eq!(
            MetricAvailability::from_missing(vec!["Togo".into()], 1),
            MetricAvailability::Nowhere
        );
        assert!(MetricAvailability::from_missing(vec!["Togo".into()], 2).is_available());
    }
}
