use super::{AnalyzedSeries, InsightRule, fmt_num};
use core_types::{Insight, InsightType, Severity};
use indicators::{TrendDirection, linear_trend};

/// Reports series with a clear linear trend.
///
/// Fires when `|slope| > epsilon` and the fit's R² exceeds `min_r_squared`.
/// Rising trends are `Positive`, falling trends are `Warning`.
#[derive(Debug, Clone)]
pub struct TrendRule {
    pub epsilon: f64,
    pub min_r_squared: f64,
}

impl TrendRule {
    pub fn new(epsilon: f64, min_r_squared: f64) -> Self {
        Self {
            epsilon,
            min_r_squared,
        }
    }
}

impl Default for TrendRule {
    fn default() -> Self {
        Self::new(indicators::DEFAULT_TREND_EPSILON, 0.5)
    }
}

impl InsightRule for TrendRule {
    fn name(&self) -> &'static str {
        "trend"
    }

    fn evaluate(&self, series: &[AnalyzedSeries<'_>]) -> Vec<Insight> {
        let mut insights = Vec::new();

        for analyzed in series {
            let s = analyzed.series;
            let Some(line) = linear_trend(s, self.epsilon) else {
                tracing::debug!(series = %s.name, "Trend rule skipped: fewer than 2 points");
                continue;
            };

            if line.slope.abs() <= self.epsilon || line.r_squared <= self.min_r_squared {
                continue;
            }

            let (severity, verb) = match line.direction {
                TrendDirection::Increasing => (Severity::Positive, "rising"),
                TrendDirection::Decreasing => (Severity::Warning, "falling"),
                TrendDirection::Stable => continue,
            };

            let first = s.points.first().map(|p| p.value).unwrap_or_default();
            let last = s.points.last().map(|p| p.value).unwrap_or_default();

            insights.push(
                Insight::new(
                    InsightType::Trend,
                    severity,
                    format!("{} is {}", s.name, verb),
                    format!(
                        "{} moved from {} to {} over {} points ({} per point, R² {:.2}).",
                        s.name,
                        fmt_num(first),
                        fmt_num(last),
                        s.len(),
                        fmt_num(line.slope),
                        line.r_squared
                    ),
                )
                .about(s.name.clone())
                .with_data("direction", line.direction.as_str())
                .with_data("slope", line.slope)
                .with_data("intercept", line.intercept)
                .with_data("r_squared", line.r_squared)
                .with_data("confidence", line.r_squared),
            );
        }

        insights
    }
}
