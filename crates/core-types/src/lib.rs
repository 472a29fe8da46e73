//! # Core Types
//!
//! Layer 0 of the analytics workspace. Every other crate speaks in terms of the
//! structs defined here: series of labelled observations, their descriptive
//! statistics, the insights derived from them and the declarative query that
//! produced them.
//!
//! This crate has no knowledge of storage, rendering or configuration files.

pub mod enums;
pub mod error;
pub mod query;
pub mod series;
pub mod statistics;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{
    Aggregation, ChartStyle, FieldType, FilterOperator, InsightType, Logic, Operation, Palette,
    SeriesType, Severity,
};
pub use error::CoreError;
pub use query::{FieldKind, FieldSelection, FilterRule, QueryConfiguration};
pub use series::{DataPoint, DataSeries};
pub use statistics::DataStatistics;
pub use structs::{AnalyticsResult, ChartConfiguration, Insight};
