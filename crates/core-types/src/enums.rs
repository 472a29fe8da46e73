use crate::error::CoreError;
use crate::statistics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a series should be drawn by a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SeriesType {
    #[default]
    Line,
    Bar,
    Area,
    Candlestick,
    Scatter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsightType {
    Trend,
    Anomaly,
    Correlation,
    Seasonality,
    Threshold,
    Pattern,
    Recommendation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Critical,
    Positive,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
            Severity::Positive => "positive",
        };
        f.write_str(s)
    }
}

/// A scalar transform applied in place to every point of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    /// Returns the function implementing this operation as `f(value, operand)`.
    pub fn function(self) -> fn(f64, f64) -> f64 {
        match self {
            Operation::Add => add,
            Operation::Subtract => subtract,
            Operation::Multiply => multiply,
            Operation::Divide => divide_or_keep,
        }
    }
}

fn add(value: f64, operand: f64) -> f64 {
    value + operand
}

fn subtract(value: f64, operand: f64) -> f64 {
    value - operand
}

fn multiply(value: f64, operand: f64) -> f64 {
    value * operand
}

// Division by zero leaves the value untouched.
fn divide_or_keep(value: f64, operand: f64) -> f64 {
    if operand == 0.0 { value } else { value / operand }
}

/// A reduction applied to the values of one group-by bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Aggregation {
    #[default]
    None,
    Count,
    Sum,
    Average,
    Min,
    Max,
    Median,
    StdDev,
}

impl Aggregation {
    /// Reduces `values` to a single number.
    ///
    /// `None` keeps the first value; `Count` is the number of values. An empty
    /// slice reduces to `0.0` for every variant.
    pub fn apply(self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            Aggregation::None => values[0],
            Aggregation::Count => values.len() as f64,
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Average => statistics::mean(values),
            Aggregation::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Median => statistics::median(values),
            Aggregation::StdDev => statistics::population_std_dev(values),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for Aggregation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Aggregation::None),
            "count" => Ok(Aggregation::Count),
            "sum" => Ok(Aggregation::Sum),
            "average" | "avg" | "mean" => Ok(Aggregation::Average),
            "min" => Ok(Aggregation::Min),
            "max" => Ok(Aggregation::Max),
            "median" => Ok(Aggregation::Median),
            "stddev" | "std_dev" => Ok(Aggregation::StdDev),
            _ => Err(CoreError::UnknownVariant("aggregation", s.to_string())),
        }
    }
}

/// Semantic type of a catalog field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Date,
    Boolean,
    Dropdown,
}

impl FieldType {
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldType::Number | FieldType::Boolean)
    }
}

impl FromStr for FieldType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(FieldType::Text),
            "number" => Ok(FieldType::Number),
            "date" => Ok(FieldType::Date),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            "dropdown" => Ok(FieldType::Dropdown),
            _ => Err(CoreError::UnknownVariant("field type", s.to_string())),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
}

/// The operator joining a filter rule to everything evaluated before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Logic {
    #[default]
    And,
    Or,
}

/// Visual theme handed to a chart renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChartStyle {
    #[default]
    Professional,
    StockMarket,
    Scientific,
    Modern,
    Dark,
}

/// Colors a renderer should use for a given `ChartStyle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub background: &'static str,
    pub foreground: &'static str,
    pub grid: &'static str,
    pub series: &'static [&'static str],
}

const PROFESSIONAL: Palette = Palette {
    background: "#ffffff",
    foreground: "#212529",
    grid: "#dee2e6",
    series: &["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd"],
};

const STOCK_MARKET: Palette = Palette {
    background: "#131722",
    foreground: "#d1d4dc",
    grid: "#2a2e39",
    series: &["#26a69a", "#ef5350", "#2962ff", "#ff9800", "#ab47bc"],
};

const SCIENTIFIC: Palette = Palette {
    background: "#ffffff",
    foreground: "#000000",
    grid: "#cccccc",
    series: &["#000000", "#e41a1c", "#377eb8", "#4daf4a", "#984ea3"],
};

const MODERN: Palette = Palette {
    background: "#f8f9fa",
    foreground: "#343a40",
    grid: "#e9ecef",
    series: &["#6f42c1", "#20c997", "#fd7e14", "#0dcaf0", "#d63384"],
};

const DARK: Palette = Palette {
    background: "#1e1e1e",
    foreground: "#e0e0e0",
    grid: "#3c3c3c",
    series: &["#4fc3f7", "#ffb74d", "#81c784", "#e57373", "#ba68c8"],
};

impl ChartStyle {
    pub fn palette(self) -> &'static Palette {
        match self {
            ChartStyle::Professional => &PROFESSIONAL,
            ChartStyle::StockMarket => &STOCK_MARKET,
            ChartStyle::Scientific => &SCIENTIFIC,
            ChartStyle::Modern => &MODERN,
            ChartStyle::Dark => &DARK,
        }
    }

    /// Color for the `index`-th series, cycling through the palette.
    pub fn series_color(self, index: usize) -> &'static str {
        let colors = self.palette().series;
        colors[index % colors.len()]
    }
}

impl FromStr for ChartStyle {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "professional" => Ok(ChartStyle::Professional),
            "stockmarket" => Ok(ChartStyle::StockMarket),
            "scientific" => Ok(ChartStyle::Scientific),
            "modern" => Ok(ChartStyle::Modern),
            "dark" => Ok(ChartStyle::Dark),
            _ => Err(CoreError::UnknownVariant("chart style", s.to_string())),
        }
    }
}
