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

//! Declarative chart specifications handed to Plotly.js for rendering.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Template names [`template_layout`] can expand.
pub const KNOWN_TEMPLATES: [&str; 2] = ["plotly_white", "plotly"];

const PLOTLY_COLORWAY: [&str; 10] = [
    "#636EFA", "#EF553B", "#00CC96", "#AB63FA", "#FFA15A", "#19D3F3", "#FF6692", "#B6E880",
    "#FF97FF", "#FECB52",
];

/// Expands a named theme into a Plotly.js template object.
///
/// Plotly.js only understands `{ "layout": {...} }` here; a bare name is
/// ignored by the browser library. Unknown names get an empty template.
pub fn template_layout(name: &str) -> Value {
    let (plot_bg, grid) = match name {
        "plotly_white" => ("white", "#EBF0F8"),
        "plotly" => ("#E5ECF6", "white"),
        _ => return json!({ "layout": {} }),
    };
    let axis = json!({
        "gridcolor": grid,
        "linecolor": grid,
        "zerolinecolor": grid,
        "zerolinewidth": 2,
        "ticks": "",
        "automargin": true,
        "title": { "standoff": 15 },
    });
    json!({
        "layout": {
            "paper_bgcolor": "white",
            "plot_bgcolor": plot_bg,
            "font": { "color": "#2a3f5f" },
            "hovermode": "closest",
            "colorway": PLOTLY_COLORWAY,
            "title": { "x": 0.05 },
            "xaxis": axis.clone(),
            "yaxis": axis,
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Box,
    Bar,
    Heatmap,
}

/// Fixed look shared by every chart of a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartStyle {
    pub template: String,
    pub box_height: u32,
    pub bar_height: u32,
    pub palette: Vec<String>,
    pub heatmap_colorscale: String,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            template: "plotly_white".to_string(),
            box_height: 500,
            bar_height: 400,
            palette: PLOTLY_COLORWAY.into_iter().map(String::from).collect(),
            heatmap_colorscale: "RdBu_r".to_string(),
        }
    }
}

impl ChartStyle {
    /// Colour of the `index`-th country; wraps around the palette.
    pub fn color(&self, index: usize) -> String {
        if self.palette.is_empty() {
            return "#636EFA".to_string();
        }
        self.palette[index % self.palette.len()].clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Box {
        name: String,
        color: String,
        y: Vec<Option<f64>>,
    },
    Bar {
        name: String,
        color: String,
        x: Vec<String>,
        y: Vec<Option<f64>>,
        text_format: String,
    },
    Heatmap {
        x: Vec<String>,
        y: Vec<String>,
        z: Vec<Vec<Option<f64>>>,
        colorscale: String,
        zmin: f64,
        zmax: f64,
        text_format: String,
    },
}

impl Trace {
    /// Number of plotted values (points, bars or cells).
    pub fn len(&self) -> usize {
        match self {
            Trace::Box { y, .. } | Trace::Bar { y, .. } => y.len(),
            Trace::Heatmap { z, .. } => z.iter().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn to_plotly(&self) -> Value {
        match self {
            Trace::Box { name, color, y } => json!({
                "type": "box",
                "name": name,
                "x": vec![name.as_str(); y.len()],
                "y": y,
                "boxpoints": "all",
                "marker": { "color": color },
                "legendgroup": name,
                "offsetgroup": name,
            }),
            Trace::Bar {
                name,
                color,
                x,
                y,
                text_format,
            } => json!({
                "type": "bar",
                "name": name,
                "x": x,
                "y": y,
                "texttemplate": text_format,
                "textposition": "auto",
                "marker": { "color": color },
                "legendgroup": name,
            }),
            Trace::Heatmap {
                x,
                y,
                z,
                colorscale,
                zmin,
                zmax,
                text_format,
            } => json!({
                "type": "heatmap",
                "x": x,
                "y": y,
                "z": z,
                "colorscale": colorscale,
                "zmin": zmin,
                "zmax": zmax,
                "zmid": 0.0,
                "texttemplate": text_format,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_title: String,
    pub y_title: String,
    /// Column the traces are split and coloured by, if any.
    pub color_by: Option<String>,
    pub template: String,
    pub height: Option<u32>,
    pub traces: Vec<Trace>,
}

impl ChartSpec {
    pub fn new(kind: ChartKind, title: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            x_title: String::new(),
            y_title: String::new(),
            color_by: None,
            template: template.into(),
            height: None,
            traces: Vec::new(),
        }
    }

    pub fn with_axes(mut self, x_title: impl Into<String>, y_title: impl Into<String>) -> Self {
        self.x_title = x_title.into();
        self.y_title = y_title.into();
        self
    }

    pub fn with_color_by(mut self, column: impl Into<String>) -> Self {
        self.color_by = Some(column.into());
        self
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn push_trace(&mut self, trace: Trace) {
        self.traces.push(trace);
    }

    /// Total plotted values across traces.
    pub fn point_count(&self) -> usize {
        self.traces.iter().map(Trace::len).sum()
    }

    /// Plotly figure JSON: `{ "data": [...], "layout": {...} }`.
    pub fn to_plotly(&self) -> Value {
        let data: Vec<Value> = self.traces.iter().map(Trace::to_plotly).collect();
        let mut layout = json!({
            "title": { "text": self.title },
            "template": template_layout(&self.template),
            "xaxis": { "title": { "text": self.x_title } },
            "yaxis": { "title": { "text": self.y_title } },
        });
        if let Some(height) = self.height {
            layout["height"] = json!(height);
        }
        if let Some(color_by) = &self.color_by {
            layout["legend"] = json!({ "title": { "text": color_by } });
        }
        if self.kind == ChartKind::Heatmap {
            layout["yaxis"]["autorange"] = json!("reversed");
        }
        json!({ "data": data, "layout": layout })
    }

    /// A standalone HTML page rendering this chart with Plotly.js.
    ///
    /// `<` in the embedded figure is written as `\u003c` so that names taken
    /// from uploaded files cannot close the inline script.
    pub fn to_html(&self) -> String {
        let figure = self.to_plotly().to_string().replace('<', "\\u003c");
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{cdn}"></script>
</head>
<body>
<div id="chart" style="width:100%;"></div>
<script>
const figure = {figure};
Plotly.newPlot("chart", figure.data, figure.layout, {{responsive: true}});
</script>
</body>
</html>
"#,
            title = escape_html(&self.title),
            cdn = PLOTLY_CDN,
            figure = figure,
        )
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
