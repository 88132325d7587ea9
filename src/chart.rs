//! Chart payloads returned by `/chat` and their SVG rendering.
//!
//! The server describes charts in the Chart.js shape
//! (`{ type, title, data: { labels, datasets: [{ label, data }] } }`). The
//! client draws them with plotters into an SVG string that the chat view
//! embeds below the reply.

use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ChartError;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 360;

const BACKGROUND: RGBColor = RGBColor(22, 27, 34);
const TEXT: RGBColor = RGBColor(201, 209, 217);
const TICK: RGBColor = RGBColor(139, 148, 158);
const GRID: RGBColor = RGBColor(48, 54, 61);

const PALETTE: [RGBColor; 6] = [
    RGBColor(54, 162, 235),
    RGBColor(255, 99, 132),
    RGBColor(255, 206, 86),
    RGBColor(75, 192, 192),
    RGBColor(153, 102, 255),
    RGBColor(255, 159, 64),
];

type DrawResult = Result<(), Box<dyn std::error::Error>>;
type XyChart<'a, 'b> = ChartContext<'a, SVGBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ChartSpec {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub data: ChartData,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ChartData {
    #[serde(default)]
    pub labels: Vec<Value>,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub data: Vec<Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Scatter,
    Histogram,
}

impl ChartKind {
    pub fn parse(kind: &str) -> Result<Self, ChartError> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "bar" => Ok(Self::Bar),
            "line" => Ok(Self::Line),
            "pie" | "doughnut" => Ok(Self::Pie),
            "scatter" => Ok(Self::Scatter),
            "histogram" => Ok(Self::Histogram),
            other => Err(ChartError::UnsupportedType(other.to_string())),
        }
    }
}

/// One dataset flattened to plottable points.
#[derive(Clone, Debug, PartialEq)]
struct Series {
    label: String,
    points: Vec<(f64, f64)>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderedChart {
    pub title: String,
    pub svg: String,
}

impl ChartSpec {
    /// Interprets the `chart` field of a chat reply.
    ///
    /// Anything that is not an object (missing, `null`, `false`) and the
    /// explicit `{ "chart": false }` marker mean "no chart".
    pub fn from_value(value: &Value) -> Result<Option<Self>, ChartError> {
        let Some(obj) = value.as_object() else {
            return Ok(None);
        };
        if obj.get("chart") == Some(&Value::Bool(false)) {
            return Ok(None);
        }
        serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| ChartError::Invalid(e.to_string()))
    }

    fn label_strings(&self) -> Vec<String> {
        self.data
            .labels
            .iter()
            .map(|l| match l {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect()
    }

    fn series(&self, kind: ChartKind) -> Vec<Series> {
        self.data
            .datasets
            .iter()
            .map(|ds| {
                let points = ds
                    .data
                    .iter()
                    .enumerate()
                    .filter_map(|(i, v)| point(i, v, kind))
                    .collect();
                Series {
                    label: ds.label.clone(),
                    points,
                }
            })
            .collect()
    }
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn point(index: usize, v: &Value, kind: ChartKind) -> Option<(f64, f64)> {
    if let Some(obj) = v.as_object() {
        let y = obj.get("y").and_then(number)?;
        let x = match kind {
            ChartKind::Scatter => obj.get("x").and_then(number)?,
            _ => index as f64,
        };
        return Some((x, y));
    }
    number(v).map(|y| (index as f64, y))
}

pub fn render_svg(spec: &ChartSpec) -> Result<RenderedChart, ChartError> {
    let kind = ChartKind::parse(&spec.kind)?;
    let series = spec.series(kind);
    if series.iter().all(|s| s.points.is_empty()) {
        return Err(ChartError::Empty);
    }

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (WIDTH, HEIGHT)).into_drawing_area();
        draw(&root, kind, spec, &series).map_err(|e| ChartError::Draw(e.to_string()))?;
    }

    Ok(RenderedChart {
        title: spec.title.clone(),
        svg,
    })
}

fn draw(root: &DrawingArea<SVGBackend<'_>, Shift>, kind: ChartKind, spec: &ChartSpec, series: &[Series]) -> DrawResult {
    root.fill(&BACKGROUND)?;
    match kind {
        ChartKind::Bar => draw_bars(root, spec, series, 0.8)?,
        ChartKind::Histogram => draw_bars(root, spec, series, 1.0)?,
        ChartKind::Line => draw_lines(root, spec, series)?,
        ChartKind::Scatter => draw_scatter(root, spec, series)?,
        ChartKind::Pie => draw_pie(root, spec, &series[0])?,
    }
    root.present()?;
    Ok(())
}

fn value_range(series: &[Series], include_zero: bool) -> (f64, f64) {
    let ys = series.iter().flat_map(|s| s.points.iter().map(|p| p.1));
    let (mut lo, mut hi) = ys.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));
    if include_zero {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }
    if (hi - lo).abs() < f64::EPSILON {
        return (lo - 1.0, hi + 1.0);
    }
    let pad = (hi - lo) * 0.1;
    (if lo < 0.0 { lo - pad } else { lo }, hi + pad)
}

fn category_count(labels: &[String], series: &[Series]) -> usize {
    let longest = series.iter().map(|s| s.points.len()).max().unwrap_or(0);
    labels.len().max(longest).max(1)
}

fn category_label(labels: &[String], x: f64) -> String {
    if (x - x.round()).abs() > 1e-6 || x < 0.0 {
        return String::new();
    }
    labels.get(x.round() as usize).cloned().unwrap_or_default()
}

fn draw_legend<'a>(chart: &mut XyChart<'a, 'a>, series: &[Series]) -> DrawResult {
    if series.iter().all(|s| s.label.is_empty()) {
        return Ok(());
    }
    chart
        .configure_series_labels()
        .label_font(("sans-serif", 12).into_font().color(&TICK))
        .background_style(&BACKGROUND.mix(0.8))
        .border_style(&GRID)
        .draw()?;
    Ok(())
}

/// Grouped bars; `span` is the share of each category slot the group fills
/// (1.0 leaves no gap, which is how histograms are drawn).
fn draw_bars(root: &DrawingArea<SVGBackend<'_>, Shift>, spec: &ChartSpec, series: &[Series], span: f64) -> DrawResult {
    let labels = spec.label_strings();
    let n = category_count(&labels, series);
    let (y_min, y_max) = value_range(series, true);
    let x_fmt = |x: &f64| category_label(&labels, *x);

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 20).into_font().color(&TEXT))
        .margin(16)
        .x_label_area_size(36)
        .y_label_area_size(52)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), y_min..y_max)?;

    chart
        .configure_mesh()
        .x_labels(n)
        .x_label_formatter(&x_fmt)
        .disable_x_mesh()
        .label_style(("sans-serif", 12).into_font().color(&TICK))
        .axis_style(GRID)
        .bold_line_style(GRID)
        .light_line_style(GRID.mix(0.3))
        .draw()?;

    let width = span / series.len() as f64;
    for (idx, s) in series.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        let offset = -span / 2.0 + idx as f64 * width;
        let anno = chart.draw_series(s.points.iter().map(|&(x, y)| {
            let left = x + offset;
            Rectangle::new([(left, 0.0), (left + width, y)], color.filled())
        }))?;
        if !s.label.is_empty() {
            anno.label(s.label.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }
    }

    draw_legend(&mut chart, series)?;
    Ok(())
}

fn draw_lines(root: &DrawingArea<SVGBackend<'_>, Shift>, spec: &ChartSpec, series: &[Series]) -> DrawResult {
    let labels = spec.label_strings();
    let n = category_count(&labels, series);
    let (y_min, y_max) = value_range(series, false);
    let x_fmt = |x: &f64| category_label(&labels, *x);

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 20).into_font().color(&TEXT))
        .margin(16)
        .x_label_area_size(36)
        .y_label_area_size(52)
        .build_cartesian_2d(-0.25f64..(n as f64 - 0.75), y_min..y_max)?;

    chart
        .configure_mesh()
        .x_labels(n)
        .x_label_formatter(&x_fmt)
        .label_style(("sans-serif", 12).into_font().color(&TICK))
        .axis_style(GRID)
        .bold_line_style(GRID)
        .light_line_style(GRID.mix(0.3))
        .draw()?;

    for (idx, s) in series.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        let anno = chart.draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))?;
        if !s.label.is_empty() {
            anno.label(s.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 12, y)], color.stroke_width(2)));
        }
        chart.draw_series(s.points.iter().map(|&p| Circle::new(p, 3, color.filled())))?;
    }

    draw_legend(&mut chart, series)?;
    Ok(())
}

fn draw_scatter(root: &DrawingArea<SVGBackend<'_>, Shift>, spec: &ChartSpec, series: &[Series]) -> DrawResult {
    let xs = series.iter().flat_map(|s| s.points.iter().map(|p| p.0));
    let (x_lo, x_hi) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));
    let x_pad = ((x_hi - x_lo) * 0.05).max(0.5);
    let (y_min, y_max) = value_range(series, false);

    let mut chart = ChartBuilder::on(root)
        .caption(&spec.title, ("sans-serif", 20).into_font().color(&TEXT))
        .margin(16)
        .x_label_area_size(36)
        .y_label_area_size(52)
        .build_cartesian_2d((x_lo - x_pad)..(x_hi + x_pad), y_min..y_max)?;

    chart
        .configure_mesh()
        .label_style(("sans-serif", 12).into_font().color(&TICK))
        .axis_style(GRID)
        .bold_line_style(GRID)
        .light_line_style(GRID.mix(0.3))
        .draw()?;

    for (idx, s) in series.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        let anno = chart.draw_series(s.points.iter().map(|&p| Circle::new(p, 4, color.filled())))?;
        if !s.label.is_empty() {
            anno.label(s.label.as_str())
                .legend(move |(x, y)| Circle::new((x + 5, y), 4, color.filled()));
        }
    }

    draw_legend(&mut chart, series)?;
    Ok(())
}

/// Pie of the first dataset. Negative slices are dropped.
fn draw_pie(root: &DrawingArea<SVGBackend<'_>, Shift>, spec: &ChartSpec, series: &Series) -> DrawResult {
    let labels = spec.label_strings();
    let slices: Vec<(String, f64)> = series
        .points
        .iter()
        .filter(|p| p.1 > 0.0)
        .map(|&(x, y)| (category_label(&labels, x), y))
        .collect();
    let total: f64 = slices.iter().map(|s| s.1).sum();
    if total <= 0.0 {
        return Err(Box::new(ChartError::Empty));
    }

    let area = if spec.title.is_empty() {
        root.clone()
    } else {
        root.titled(&spec.title, ("sans-serif", 20).into_font().color(&TEXT))?
    };
    let (w, h) = area.dim_in_pixel();
    let center = (w as f64 / 2.0, h as f64 / 2.0);
    let radius = (w.min(h) as f64 / 2.0) * 0.75;

    let mut start = -std::f64::consts::FRAC_PI_2;
    for (idx, (label, value)) in slices.iter().enumerate() {
        let sweep = value / total * std::f64::consts::TAU;
        let steps = ((sweep / 0.05).ceil() as usize).max(2);
        let mut outline = vec![(center.0 as i32, center.1 as i32)];
        outline.extend((0..=steps).map(|i| {
            let a = start + sweep * i as f64 / steps as f64;
            ((center.0 + radius * a.cos()) as i32, (center.1 + radius * a.sin()) as i32)
        }));
        let color = PALETTE[idx % PALETTE.len()];
        area.draw(&Polygon::new(outline, color.filled()))?;

        let mid = start + sweep / 2.0;
        let text_at = (
            (center.0 + radius * 1.15 * mid.cos()) as i32 - 20,
            (center.1 + radius * 1.15 * mid.sin()) as i32,
        );
        let text = format!("{} ({:.0}%)", label, value / total * 100.0);
        area.draw(&Text::new(text, text_at, ("sans-serif", 12).into_font().color(&TICK)))?;

        start += sweep;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sales_chart(kind: &str) -> ChartSpec {
        ChartSpec::from_value(&json!({
            "type": kind,
            "title": "Sales by Product",
            "data": {
                "labels": ["Widget A", "Widget B", "Widget C"],
                "datasets": [{"label": "Sales", "data": [100, 200, 150]}]
            }
        }))
        .unwrap()
        .unwrap()
    }

    #[test]
    fn test_absent_chart_markers() {
        assert_eq!(ChartSpec::from_value(&Value::Null).unwrap(), None);
        assert_eq!(ChartSpec::from_value(&json!(false)).unwrap(), None);
        assert_eq!(ChartSpec::from_value(&json!({"chart": false})).unwrap(), None);
    }

    #[test]
    fn test_invalid_shape_is_error() {
        let err = ChartSpec::from_value(&json!({"type": "bar", "title": 12})).unwrap_err();
        assert!(matches!(err, ChartError::Invalid(_)));
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!(ChartKind::parse("Bar").unwrap(), ChartKind::Bar);
        assert_eq!(ChartKind::parse("doughnut").unwrap(), ChartKind::Pie);
        assert!(matches!(ChartKind::parse("radar"), Err(ChartError::UnsupportedType(k)) if k == "radar"));
    }

    #[test]
    fn test_scatter_points_use_xy_objects() {
        let spec = ChartSpec::from_value(&json!({
            "type": "scatter",
            "data": {"datasets": [{"label": "r", "data": [{"x": 1.5, "y": 2}, {"x": "3", "y": 4}, "junk"]}]}
        }))
        .unwrap()
        .unwrap();
        let series = spec.series(ChartKind::Scatter);
        assert_eq!(series[0].points, vec![(1.5, 2.0), (3.0, 4.0)]);
    }

    #[test]
    fn test_every_kind_renders_svg() {
        for kind in ["bar", "line", "pie", "histogram"] {
            let rendered = render_svg(&sales_chart(kind)).unwrap();
            assert!(rendered.svg.contains("<svg"), "{kind}");
            assert!(rendered.svg.contains("Sales by Product"), "{kind}");
            assert_eq!(rendered.title, "Sales by Product");
        }

        let scatter = ChartSpec::from_value(&json!({
            "type": "scatter",
            "title": "Revenue vs Expenses",
            "data": {"datasets": [{"label": "Q1", "data": [{"x": 1000, "y": 800}, {"x": 1200, "y": 900}]}]}
        }))
        .unwrap()
        .unwrap();
        assert!(render_svg(&scatter).unwrap().svg.contains("<circle"));
    }

    #[test]
    fn test_empty_and_unsupported_are_errors() {
        let mut spec = sales_chart("bar");
        spec.data.datasets.clear();
        assert!(matches!(render_svg(&spec), Err(ChartError::Empty)));

        let spec = sales_chart("radar");
        assert!(matches!(render_svg(&spec), Err(ChartError::UnsupportedType(_))));
    }
}
