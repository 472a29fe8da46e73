//! Terminal report and JSON chart output for `analyze`.

use analytics::{AnalyticsError, ChartRenderer, RenderedChart, ReportGenerator};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};
use core_types::{AnalyticsResult, ChartConfiguration, DataSeries, Severity};
use serde_json::{Value, json};

/// Writes the result as a set of terminal tables: series summary, points and insights.
pub struct TableReport {
    /// Series longer than this only show their summary row.
    pub max_points: usize,
}

impl Default for TableReport {
    fn default() -> Self {
        Self { max_points: 24 }
    }
}

impl ReportGenerator for TableReport {
    fn generate(&self, result: &AnalyticsResult, chart: Option<&RenderedChart>) -> Result<String, AnalyticsError> {
        let mut out = String::new();
        out.push_str(&format!("{}\n", result.query_description));
        out.push_str(&format!(
            "{} records analyzed in {} ms (result {})\n\n",
            result.total_records_analyzed,
            result.execution_time.as_millis(),
            result.id
        ));

        if result.series.is_empty() {
            out.push_str("No series produced.\n");
        } else {
            out.push_str(&summary_table(&result.series).to_string());
            out.push('\n');
        }

        for series in result.series.iter().filter(|s| !s.is_empty() && s.len() <= self.max_points) {
            out.push_str(&format!("\n{}\n", series.name));
            out.push_str(&points_table(series).to_string());
            out.push('\n');
        }

        if !result.insights.is_empty() {
            let mut table = new_table();
            table.set_header(vec!["Severity", "Type", "Title", "Description"]);
            for insight in &result.insights {
                table.add_row(vec![
                    Cell::new(insight.severity).fg(severity_color(insight.severity)),
                    Cell::new(format!("{:?}", insight.insight_type)),
                    Cell::new(&insight.title),
                    Cell::new(&insight.description),
                ]);
            }
            out.push_str("\nInsights\n");
            out.push_str(&table.to_string());
            out.push('\n');
        }

        if let Some(chart) = chart {
            out.push_str(&format!("\nChart: {} ({} bytes)\n", chart.media_type, chart.bytes.len()));
        }
        Ok(out)
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn number(value: f64) -> Cell {
    Cell::new(format!("{:.2}", value)).set_alignment(CellAlignment::Right)
}

fn summary_table(series: &[DataSeries]) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Series", "Points", "Sum", "Average", "Min", "Max", "Median", "Std Dev"]);
    for s in series {
        let stats = s.statistics();
        table.add_row(vec![
            Cell::new(&s.name),
            Cell::new(stats.count).set_alignment(CellAlignment::Right),
            number(stats.sum),
            number(stats.average),
            number(stats.min),
            number(stats.max),
            number(stats.median),
            number(stats.std_dev),
        ]);
    }
    table
}

fn points_table(series: &DataSeries) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Label", "Value"]);
    for point in &series.points {
        table.add_row(vec![Cell::new(&point.label), number(point.value)]);
    }
    table
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Cyan,
        Severity::Positive => Color::Green,
        Severity::Warning => Color::Yellow,
        Severity::Critical => Color::Red,
    }
}

/// Renders a chart as a self-contained JSON document that a front end can plot.
pub struct JsonChartRenderer;

impl ChartRenderer for JsonChartRenderer {
    fn render(&self, config: &ChartConfiguration, result: &AnalyticsResult) -> Result<RenderedChart, AnalyticsError> {
        let selected = config.select(result);
        if selected.is_empty() {
            return Err(AnalyticsError::Render(format!("no series to draw for '{}'", config.title)));
        }

        let palette = config.style.palette();
        let series: Vec<Value> = selected
            .iter()
            .enumerate()
            .map(|(i, s)| {
                json!({
                    "name": s.name,
                    "type": s.series_type,
                    "color": config.style.series_color(i),
                    "points": s.points,
                })
            })
            .collect();

        let document = json!({
            "title": config.title,
            "x_axis_label": config.x_axis_label,
            "y_axis_label": config.y_axis_label,
            "style": config.style,
            "background": palette.background,
            "foreground": palette.foreground,
            "grid": if config.show_grid { Value::from(palette.grid) } else { Value::Null },
            "show_legend": config.show_legend,
            "series": series,
            "insights": result.insights,
        });

        Ok(RenderedChart::new("application/json", serde_json::to_vec_pretty(&document)?))
    }
}
