//! # Technical Indicators
//!
//! Pure functions deriving new series (or scalar fits) from an existing
//! `DataSeries`: simple and exponential moving averages, the relative strength
//! index and an ordinary least-squares trend line.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** depends only on `core-types`.
//! - **Never fails:** an empty or too-short input, or a zero period, degrades to
//!   an empty series (or `None` for the trend fit). Inputs are never mutated.

pub mod moving_average;
pub mod rsi;
pub mod trend;

pub use moving_average::{exponential_moving_average, moving_average};
pub use rsi::{DEFAULT_RSI_PERIOD, relative_strength_index};
pub use trend::{
    DEFAULT_TREND_EPSILON, TrendDirection, TrendLine, linear_trend, linear_trend_by_time,
    trend_line_series,
};

use core_types::DataSeries;
use serde::{Deserialize, Serialize};

/// A derived series a caller can request declaratively.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum IndicatorKind {
    MovingAverage(usize),
    Ema(usize),
    Rsi(usize),
    TrendLine,
}

impl IndicatorKind {
    pub fn apply(&self, series: &DataSeries) -> DataSeries {
        match *self {
            IndicatorKind::MovingAverage(period) => moving_average(series, period),
            IndicatorKind::Ema(period) => exponential_moving_average(series, period),
            IndicatorKind::Rsi(period) => relative_strength_index(series, period),
            IndicatorKind::TrendLine => trend_line_series(series, DEFAULT_TREND_EPSILON),
        }
    }

    /// Applies every indicator to every series, in that nesting order.
    pub fn derive_all(kinds: &[IndicatorKind], series: &[DataSeries]) -> Vec<DataSeries> {
        series
            .iter()
            .flat_map(|s| kinds.iter().map(move |kind| kind.apply(s)))
            .filter(|derived| !derived.is_empty())
            .collect()
    }
}
