//! Spline charts of graph-group values, rendered to SVG.

use serde_json::Value;

use crate::error::{ClientError, ClientResult};
use crate::format::{escape_html, parse_leading_float, sort_by_month, to_fixed};
use crate::response::{QueryResponse, ResponseBody, ServiceRow, GRAPH_GROUP_TYPE};

const PALETTE: [&str; 5] = ["#d70206", "#f05b4f", "#f4c63d", "#d17905", "#453d3f"];
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 90.0;
const Y_TICKS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub series: Vec<Series>,
}

fn numeric(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_leading_float(s),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn series(name: &str, services: &[ServiceRow]) -> Series {
    let mut rows: Vec<&ServiceRow> = services.iter().collect();
    sort_by_month(&mut rows, |row| row.key.as_str());
    Series {
        name: name.to_string(),
        points: rows
            .into_iter()
            .filter_map(|row| {
                numeric(&row.value).map(|value| ChartPoint {
                    label: row.name.clone(),
                    value,
                })
            })
            .collect(),
    }
}

impl Chart {
    /// One series per graph group in the response.
    ///
    /// Fails with [`ClientError::NotChartable`] when there is no graph group
    /// or none of its values is numeric.
    pub fn from_response(response: &QueryResponse) -> ClientResult<Self> {
        let series: Vec<Series> = match &response.body {
            ResponseBody::Groups(groups) => groups
                .iter()
                .filter(|g| g.is_graph())
                .map(|g| series(&g.name, &g.services))
                .collect(),
            ResponseBody::Services(services)
                if response.detail_str("group_type") == Some(GRAPH_GROUP_TYPE) =>
            {
                let name = response.detail_str("name").unwrap_or_default();
                vec![series(name, services)]
            }
            _ => Vec::new(),
        };

        let series: Vec<Series> = series.into_iter().filter(|s| !s.points.is_empty()).collect();
        if series.is_empty() {
            return Err(ClientError::NotChartable);
        }
        Ok(Self { series })
    }

    /// X axis labels: the point labels of the longest series.
    pub fn labels(&self) -> Vec<&str> {
        self.series
            .iter()
            .max_by_key(|s| s.points.len())
            .map(|s| s.points.iter().map(|p| p.label.as_str()).collect())
            .unwrap_or_default()
    }

    fn value_range(&self) -> (f64, f64) {
        let values = self.series.iter().flat_map(|s| s.points.iter().map(|p| p.value));
        let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        if min == max {
            (min - 1.0, max + 1.0)
        } else {
            (min, max)
        }
    }

    /// Render as a standalone SVG document.
    pub fn to_svg(&self, width: u32, height: u32) -> String {
        let (width, height) = (width as f64, height as f64);
        let plot_width = (width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0);
        let plot_height = (height - MARGIN_TOP - MARGIN_BOTTOM).max(1.0);
        let (min, max) = self.value_range();
        let labels = self.labels();
        let slots = labels.len().max(1);

        let x_at = |index: usize| {
            if slots == 1 {
                MARGIN_LEFT + plot_width / 2.0
            } else {
                MARGIN_LEFT + plot_width * index as f64 / (slots - 1) as f64
            }
        };
        let y_at = |value: f64| MARGIN_TOP + plot_height * (max - value) / (max - min);

        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" class=\"chart\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
            w = width,
            h = height
        );

        for tick in 0..=Y_TICKS {
            let value = min + (max - min) * tick as f64 / Y_TICKS as f64;
            let y = y_at(value);
            svg.push_str(&format!(
                "<line class=\"grid\" x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"#ddd\"/>",
                MARGIN_LEFT,
                y,
                MARGIN_LEFT + plot_width,
                y
            ));
            svg.push_str(&format!(
                "<text class=\"y-label\" x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"end\" font-size=\"11\">{}</text>",
                MARGIN_LEFT - 6.0,
                y + 4.0,
                to_fixed(value, 2)
            ));
        }

        let baseline = MARGIN_TOP + plot_height;
        for (index, label) in labels.iter().enumerate() {
            let x = x_at(index);
            svg.push_str(&format!(
                "<text class=\"x-label\" x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"end\" font-size=\"11\" transform=\"rotate(-45 {x:.2} {y:.2})\">{label}</text>",
                x = x,
                y = baseline + 14.0,
                label = escape_html(label)
            ));
        }

        for (index, series) in self.series.iter().enumerate() {
            let colour = PALETTE[index % PALETTE.len()];
            let points: Vec<(f64, f64)> = series
                .points
                .iter()
                .enumerate()
                .map(|(i, p)| (x_at(i), y_at(p.value)))
                .collect();
            svg.push_str(&format!(
                "<path class=\"series\" data-name=\"{}\" d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"3\"/>",
                escape_html(&series.name),
                spline_path(&points),
                colour
            ));
        }

        svg.push_str("</svg>");
        svg
    }
}

/// Cubic Bézier path through every point (Catmull-Rom with clamped ends).
pub fn spline_path(points: &[(f64, f64)]) -> String {
    let Some(&(x0, y0)) = points.first() else {
        return String::new();
    };
    let mut path = format!("M{:.2},{:.2}", x0, y0);
    if points.len() == 1 {
        return path;
    }

    for i in 0..points.len() - 1 {
        let p0 = points[i.saturating_sub(1)];
        let p1 = points[i];
        let p2 = points[i + 1];
        let p3 = points[(i + 2).min(points.len() - 1)];

        let c1 = (p1.0 + (p2.0 - p0.0) / 6.0, p1.1 + (p2.1 - p0.1) / 6.0);
        let c2 = (p2.0 - (p3.0 - p1.0) / 6.0, p2.1 - (p3.1 - p1.1) / 6.0);
        path.push_str(&format!(
            " C{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}",
            c1.0, c1.1, c2.0, c2.1, p2.0, p2.1
        ));
    }
    path
}
