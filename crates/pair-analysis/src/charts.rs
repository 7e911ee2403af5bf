//! Chart specifications for client-side rendering.
//!
//! Every chart is a Plotly-compatible figure (`data` traces plus `layout`)
//! built straight from the imputed table; nothing is rendered here.

use crate::error::Result;
use crate::series::{ImputedTable, Side};
use serde::{Deserialize, Serialize};

const FIRST_COLOR: &str = "#667eea";
const SECOND_COLOR: &str = "#764ba2";
const CHART_HEIGHT: u32 = 400;
const TEMPLATE: &str = "plotly_white";

/// The four charts of an analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSet {
    pub line_chart: ChartSpec,
    pub scatter_chart: ChartSpec,
    pub histogram: ChartSpec,
    pub correlation_heatmap: ChartSpec,
}

/// One figure: traces plus layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl ChartSpec {
    /// Figure as a JSON string, ready for `Plotly.newPlot`
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Scatter(ScatterTrace),
    Histogram(HistogramTrace),
    Heatmap(HeatmapTrace),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterTrace {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<f64>,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<LineStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramTrace {
    pub name: String,
    pub x: Vec<f64>,
    pub opacity: f64,
    pub marker: Marker,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapTrace {
    /// Correlations; `None` where undefined (constant column)
    pub z: Vec<Vec<Option<f64>>>,
    pub x: Vec<String>,
    pub y: Vec<String>,
    pub colorscale: String,
    pub zmid: f64,
    pub text: Vec<Vec<Option<f64>>>,
    pub texttemplate: String,
    pub textfont: Font,
    pub hoverongaps: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub title: Title,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub t: u32,
    pub b: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub title: Title,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    pub height: u32,
    pub template: String,
    pub margin: Margin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barmode: Option<String>,
}

impl Layout {
    fn new(title: &str, axes: Option<(&str, &str)>) -> Self {
        let axis = |text: &str| Axis {
            title: Title {
                text: text.to_string(),
            },
        };

        Self {
            title: Title {
                text: title.to_string(),
            },
            xaxis: axes.map(|(x, _)| axis(x)),
            yaxis: axes.map(|(_, y)| axis(y)),
            height: CHART_HEIGHT,
            template: TEMPLATE.to_string(),
            margin: Margin {
                l: 50,
                r: 50,
                t: 50,
                b: 50,
            },
            barmode: None,
        }
    }
}

/// Build all four charts
pub fn build_charts(table: &ImputedTable) -> ChartSet {
    ChartSet {
        line_chart: line_chart(table),
        scatter_chart: scatter_chart(table),
        histogram: histogram(table),
        correlation_heatmap: correlation_heatmap(table),
    }
}

fn color(side: Side) -> &'static str {
    match side {
        Side::First => FIRST_COLOR,
        Side::Second => SECOND_COLOR,
    }
}

fn date_axis(table: &ImputedTable) -> Vec<String> {
    table
        .dates()
        .iter()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect()
}

/// Both tickers as lines over the date axis
pub fn line_chart(table: &ImputedTable) -> ChartSpec {
    let x = date_axis(table);
    let data = Side::BOTH
        .iter()
        .map(|&side| {
            Trace::Scatter(ScatterTrace {
                name: table.symbol(side).to_string(),
                x: x.clone(),
                y: table.column(side).to_vec(),
                mode: "lines".to_string(),
                line: Some(LineStyle {
                    color: color(side).to_string(),
                }),
                marker: None,
            })
        })
        .collect();

    ChartSpec {
        data,
        layout: Layout::new("Stock Price Comparison", Some(("Date", "Price"))),
    }
}

/// Both tickers as markers over the date axis
pub fn scatter_chart(table: &ImputedTable) -> ChartSpec {
    let x = date_axis(table);
    let data = Side::BOTH
        .iter()
        .map(|&side| {
            Trace::Scatter(ScatterTrace {
                name: table.symbol(side).to_string(),
                x: x.clone(),
                y: table.column(side).to_vec(),
                mode: "markers".to_string(),
                line: None,
                marker: Some(Marker {
                    color: color(side).to_string(),
                    size: Some(6),
                }),
            })
        })
        .collect();

    ChartSpec {
        data,
        layout: Layout::new("Stock Price Scatter Plot", Some(("Date", "Price"))),
    }
}

/// Overlaid price distributions
pub fn histogram(table: &ImputedTable) -> ChartSpec {
    let data = Side::BOTH
        .iter()
        .map(|&side| {
            Trace::Histogram(HistogramTrace {
                name: table.symbol(side).to_string(),
                x: table.column(side).to_vec(),
                opacity: 0.7,
                marker: Marker {
                    color: color(side).to_string(),
                    size: None,
                },
            })
        })
        .collect();

    let mut layout = Layout::new("Price Distribution", Some(("Price", "Frequency")));
    layout.barmode = Some("overlay".to_string());

    ChartSpec { data, layout }
}

/// 2x2 Pearson correlation heatmap with the rounded values as cell text
pub fn correlation_heatmap(table: &ImputedTable) -> ChartSpec {
    let z = correlation_matrix(table);
    let text = z
        .iter()
        .map(|row| row.iter().map(|v| v.map(round3)).collect())
        .collect();
    let symbols: Vec<String> = Side::BOTH
        .iter()
        .map(|&side| table.symbol(side).to_string())
        .collect();

    ChartSpec {
        data: vec![Trace::Heatmap(HeatmapTrace {
            z,
            x: symbols.clone(),
            y: symbols,
            colorscale: "RdBu".to_string(),
            zmid: 0.0,
            text,
            texttemplate: "%{text}".to_string(),
            textfont: Font { size: 12 },
            hoverongaps: false,
        })],
        layout: Layout::new("Correlation Matrix", None),
    }
}

/// Pearson correlation matrix of the two columns
pub fn correlation_matrix(table: &ImputedTable) -> Vec<Vec<Option<f64>>> {
    Side::BOTH
        .iter()
        .map(|&row| {
            Side::BOTH
                .iter()
                .map(|&col| pearson(table.column(row), table.column(col)))
                .collect()
        })
        .collect()
}

/// Pearson correlation, `None` when either input has zero variance
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }

    let mean_x = x[..n].iter().sum::<f64>() / n as f64;
    let mean_y = y[..n].iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in x[..n].iter().zip(&y[..n]) {
        let (dx, dy) = (a - mean_x, b - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> ImputedTable {
        let dates = (1..=4)
            .map(|d| NaiveDate::from_ymd_opt(2024, 2, d).unwrap())
            .collect();
        ImputedTable::new("AAPL", "MSFT", dates, vec![1.0, 2.0, 3.0, 4.0], vec![8.0, 6.0, 4.0, 2.0])
            .unwrap()
    }

    #[test]
    fn test_pearson() {
        assert!((pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap() + 1.0).abs() < 1e-12);
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn test_heatmap_matrix() {
        let chart = correlation_heatmap(&sample());
        let Trace::Heatmap(trace) = &chart.data[0] else {
            panic!("Expected heatmap trace");
        };

        assert_eq!(trace.x, vec!["AAPL", "MSFT"]);
        assert_eq!(trace.z[0][0], Some(1.0));
        assert_eq!(trace.text[0][1], Some(-1.0));
        assert_eq!(trace.z[1][0], trace.z[0][1]);
        assert_eq!(chart.layout.title.text, "Correlation Matrix");
    }

    #[test]
    fn test_line_chart_uses_dates_and_colors() {
        let chart = line_chart(&sample());
        assert_eq!(chart.data.len(), 2);

        let Trace::Scatter(first) = &chart.data[0] else {
            panic!("Expected scatter trace");
        };
        assert_eq!(first.name, "AAPL");
        assert_eq!(first.mode, "lines");
        assert_eq!(first.x[0], "2024-02-01");
        assert_eq!(first.line.as_ref().unwrap().color, "#667eea");
    }

    #[test]
    fn test_chart_json_shape() {
        let charts = build_charts(&sample());
        let value: serde_json::Value = serde_json::from_str(&charts.histogram.to_json().unwrap()).unwrap();

        assert_eq!(value["data"][0]["type"], "histogram");
        assert_eq!(value["data"][1]["marker"]["color"], "#764ba2");
        assert_eq!(value["layout"]["barmode"], "overlay");
        assert_eq!(value["layout"]["height"], 400);

        let scatter = serde_json::to_value(&charts.scatter_chart).unwrap();
        assert_eq!(scatter["data"][0]["mode"], "markers");
        assert_eq!(scatter["data"][0]["marker"]["size"], 6);
        assert!(scatter["data"][0].get("line").is_none());
    }
}
