//! # Analytics Insight Engine
//!
//! Turns the series of an `AnalyticsResult` into qualitative findings: trends,
//! anomalies, threshold crossings and correlations between series.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** a pure logic crate with no knowledge of storage. It
//!   depends on `core-types`, `indicators` and `configuration`.
//! - **Rule Agnostic Engine:** every detector implements `InsightRule`, so the
//!   `InsightEngine` runs any rule set without knowing its internals.
//! - **Silent degradation:** a rule that cannot evaluate a series (too few
//!   points, zero variance) skips it instead of failing.
//!
//! ## Public API
//!
//! - `InsightEngine`: runs a rule set over a result.
//! - `InsightRule` and the concrete rules (`TrendRule`, `AnomalyRule`, ...).
//! - `ChartRenderer` / `ReportGenerator`: the contracts for the opaque
//!   rendering and reporting collaborators.

pub mod engine;
pub mod error;
pub mod report;
pub mod rules;

pub use engine::InsightEngine;
pub use error::AnalyticsError;
pub use report::{ChartRenderer, RenderedChart, ReportGenerator};
pub use rules::{AnalyzedSeries, AnomalyRule, CorrelationRule, InsightRule, ThresholdRule, TrendRule};
