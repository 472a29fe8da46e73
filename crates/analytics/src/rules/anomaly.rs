use super::{AnalyzedSeries, InsightRule, fmt_num};
use core_types::{Insight, InsightType, Severity};
use serde_json::json;

/// Flags points further than `k` standard deviations from the series mean.
///
/// One insight per affected series summarises the count and the most extreme
/// outlier. The insight is `Critical` when that outlier reaches `critical_k`.
#[derive(Debug, Clone)]
pub struct AnomalyRule {
    pub k: f64,
    pub critical_k: f64,
}

impl AnomalyRule {
    pub fn new(k: f64, critical_k: f64) -> Self {
        Self { k, critical_k }
    }
}

impl Default for AnomalyRule {
    fn default() -> Self {
        Self::new(2.0, 3.0)
    }
}

impl InsightRule for AnomalyRule {
    fn name(&self) -> &'static str {
        "anomaly"
    }

    fn evaluate(&self, series: &[AnalyzedSeries<'_>]) -> Vec<Insight> {
        let mut insights = Vec::new();

        for analyzed in series {
            let s = analyzed.series;
            let stats = &analyzed.stats;
            if stats.count < 2 || stats.std_dev == 0.0 {
                tracing::debug!(series = %s.name, "Anomaly rule skipped: no spread to measure");
                continue;
            }

            // (index, z-score) of every point beyond k standard deviations.
            let flagged: Vec<(usize, f64)> = s
                .points
                .iter()
                .enumerate()
                .map(|(i, p)| (i, (p.value - stats.average).abs() / stats.std_dev))
                .filter(|(_, z)| *z > self.k)
                .collect();

            let Some(&(extreme_idx, extreme_z)) =
                flagged.iter().max_by(|a, b| a.1.total_cmp(&b.1))
            else {
                continue;
            };
            let extreme = &s.points[extreme_idx];

            let severity = if extreme_z >= self.critical_k {
                Severity::Critical
            } else {
                Severity::Warning
            };
            let labels: Vec<&str> = flagged.iter().map(|(i, _)| s.points[*i].label.as_str()).collect();

            insights.push(
                Insight::new(
                    InsightType::Anomaly,
                    severity,
                    format!("{} unusual value(s) in {}", flagged.len(), s.name),
                    format!(
                        "{} at '{}' is {:.1} standard deviations from the mean of {}.",
                        fmt_num(extreme.value),
                        extreme.label,
                        extreme_z,
                        fmt_num(stats.average)
                    ),
                )
                .about(s.name.clone())
                .with_data("count", flagged.len())
                .with_data("labels", json!(labels))
                .with_data("extreme_label", extreme.label.clone())
                .with_data("extreme_value", extreme.value)
                .with_data("extreme_z_score", extreme_z)
                .with_data("mean", stats.average)
                .with_data("std_dev", stats.std_dev),
            );
        }

        insights
    }
}
