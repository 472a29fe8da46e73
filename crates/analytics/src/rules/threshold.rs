use super::{AnalyzedSeries, InsightRule, fmt_num};
use configuration::{ThresholdDirection, ThresholdSetting};
use core_types::{Insight, InsightType};

/// Reports series whose points cross caller-supplied thresholds.
///
/// Inactive (emits nothing) when no thresholds are configured.
#[derive(Debug, Clone, Default)]
pub struct ThresholdRule {
    pub thresholds: Vec<ThresholdSetting>,
}

impl ThresholdRule {
    pub fn new(thresholds: Vec<ThresholdSetting>) -> Self {
        Self { thresholds }
    }
}

impl InsightRule for ThresholdRule {
    fn name(&self) -> &'static str {
        "threshold"
    }

    fn evaluate(&self, series: &[AnalyzedSeries<'_>]) -> Vec<Insight> {
        let mut insights = Vec::new();

        for analyzed in series {
            let s = analyzed.series;
            let applicable = self
                .thresholds
                .iter()
                .filter(|t| t.series.as_deref().is_none_or(|name| name == s.name));

            for threshold in applicable {
                let crosses = |value: f64| match threshold.direction {
                    ThresholdDirection::Above => value > threshold.value,
                    ThresholdDirection::Below => value < threshold.value,
                };
                let crossing: Vec<_> = s.points.iter().filter(|p| crosses(p.value)).collect();
                let Some(first) = crossing.first() else {
                    continue;
                };

                let relation = match threshold.direction {
                    ThresholdDirection::Above => "above",
                    ThresholdDirection::Below => "below",
                };

                insights.push(
                    Insight::new(
                        InsightType::Threshold,
                        threshold.severity,
                        format!("{} went {} {}", s.name, relation, fmt_num(threshold.value)),
                        format!(
                            "{} of {} points are {} {}, first at '{}' ({}).",
                            crossing.len(),
                            s.len(),
                            relation,
                            fmt_num(threshold.value),
                            first.label,
                            fmt_num(first.value)
                        ),
                    )
                    .about(s.name.clone())
                    .with_data("threshold", threshold.value)
                    .with_data("direction", relation)
                    .with_data("count", crossing.len())
                    .with_data("first_label", first.label.clone())
                    .with_data("first_value", first.value),
                );
            }
        }

        insights
    }
}
