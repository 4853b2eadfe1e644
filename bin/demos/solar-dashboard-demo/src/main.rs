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

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use irradiance::{
    DashboardConfig, DashboardError, DashboardOptions, DashboardView, ErrorReporter, Metric,
    SolarDashboard, UploadedFile,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Html,
    Json,
}

/// Cross-country solar energy comparison dashboard.
///
/// Upload cleaned datasets (e.g. benin_clean.csv, sierra_leone_clean.csv,
/// togo_clean.csv) to compare solar metrics across countries.
#[derive(Parser, Debug)]
#[command(name = "solar-dashboard", version)]
struct Cli {
    /// Cleaned country CSV files, one per country.
    files: Vec<PathBuf>,

    /// Metric to analyse: GHI, DNI or DHI.
    #[arg(long)]
    metric: Option<Metric>,

    /// Show a correlation heatmap per country.
    #[arg(long)]
    heatmaps: bool,

    /// Hide the summary statistics table.
    #[arg(long)]
    no_summary: bool,

    /// Dashboard configuration (TOML). Defaults to config/dashboard.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "dashboard")]
    out_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Html)]
    format: OutputFormat,

    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn load_config(&self) -> Result<DashboardConfig, DashboardError> {
        match &self.config {
            Some(path) => Ok(DashboardConfig::load_from_file(path)?),
            None => Ok(DashboardConfig::load_or_default()),
        }
    }

    /// Sidebar options: the config file's values with command-line flags on top.
    fn options(&self, config: &DashboardConfig) -> DashboardOptions {
        let mut options = config.options.clone();
        if let Some(metric) = self.metric {
            options.metric = metric;
        }
        if self.heatmaps {
            options.show_heatmaps = true;
        }
        if self.no_summary {
            options.show_summary = false;
        }
        options
    }
}

fn read_uploads(paths: &[PathBuf]) -> Result<Vec<UploadedFile>, DashboardError> {
    paths
        .iter()
        .map(|path| UploadedFile::from_path(path).map_err(DashboardError::from))
        .collect()
}

fn write_view(view: &DashboardView, out_dir: &Path, format: OutputFormat) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;
    let mut written = Vec::new();
    for (slug, chart) in view.charts() {
        let (path, content) = match format {
            OutputFormat::Html => (out_dir.join(format!("{slug}.html")), chart.to_html()),
            OutputFormat::Json => (
                out_dir.join(format!("{slug}.json")),
                serde_json::to_string_pretty(&chart.to_plotly())?,
            ),
        };
        fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    if let Some(summary) = &view.summary {
        let path = out_dir.join("summary.json");
        fs::write(&path, serde_json::to_string_pretty(&summary.to_json())?)
            .with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.load_config()?;
    let options = cli.options(&config);
    let dashboard = SolarDashboard::with_config(config)?;

    let uploads = read_uploads(&cli.files)?;
    let data = dashboard.load(&uploads)?;
    let view = dashboard.render(&data, &options)?;

    println!("{}\n", view.heading);
    for country in &view.replaced {
        warn!(%country, "an earlier upload for this country was replaced");
    }
    if let Some(notice) = &view.notice {
        println!("Note: {notice}\n");
    }
    if let Some(summary) = &view.summary {
        println!("Summary Statistics (Mean, Median, Std)\n{summary}");
    }
    for path in write_view(&view, &cli.out_dir, cli.format)? {
        println!("wrote {}", path.display());
    }
    let (loader, summary) = dashboard.cache_stats();
    info!(
        loader_hits = loader.hits,
        summary_hits = summary.hits,
        summary_misses = summary.misses,
        "cache usage"
    );
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let filter = if cli.debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug,polars=info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if cli.files.is_empty() {
        println!("Please upload your cleaned country CSV files to start analysis.");
        return;
    }
    if let Err(e) = run(&cli) {
        match e.downcast_ref::<DashboardError>() {
            Some(err) => eprint!("{}", ErrorReporter::new().report(err)),
            None => eprintln!("Error: {e:#}"),
        }
        std::process::exit(1);
    }
}
