use super::{AnalyzedSeries, InsightRule};
use core_types::{Insight, InsightType, Severity};

const MIN_POINTS: usize = 3;

/// Reports strongly correlated pairs of equally long series (Pearson r).
#[derive(Debug, Clone)]
pub struct CorrelationRule {
    pub min_abs_r: f64,
}

impl CorrelationRule {
    pub fn new(min_abs_r: f64) -> Self {
        Self { min_abs_r }
    }
}

impl Default for CorrelationRule {
    fn default() -> Self {
        Self::new(0.7)
    }
}

impl InsightRule for CorrelationRule {
    fn name(&self) -> &'static str {
        "correlation"
    }

    fn evaluate(&self, series: &[AnalyzedSeries<'_>]) -> Vec<Insight> {
        let mut insights = Vec::new();

        for (i, a) in series.iter().enumerate() {
            for b in &series[i + 1..] {
                if a.series.len() != b.series.len() || a.series.len() < MIN_POINTS {
                    continue;
                }
                let Some(r) = pearson(a, b) else {
                    continue;
                };
                if r.abs() < self.min_abs_r {
                    continue;
                }

                let kind = if r > 0.0 { "move together" } else { "move in opposite directions" };
                insights.push(
                    Insight::new(
                        InsightType::Correlation,
                        Severity::Info,
                        format!("{} and {} {}", a.series.name, b.series.name, kind),
                        format!(
                            "Pearson correlation of {:.2} across {} points.",
                            r,
                            a.series.len()
                        ),
                    )
                    .about(a.series.name.clone())
                    .about(b.series.name.clone())
                    .with_data("r", r)
                    .with_data("points", a.series.len()),
                );
            }
        }

        insights
    }
}

fn pearson(a: &AnalyzedSeries<'_>, b: &AnalyzedSeries<'_>) -> Option<f64> {
    if a.stats.std_dev == 0.0 || b.stats.std_dev == 0.0 {
        return None;
    }
    let n = a.series.len() as f64;
    let covariance = a
        .series
        .points
        .iter()
        .zip(&b.series.points)
        .map(|(pa, pb)| (pa.value - a.stats.average) * (pb.value - b.stats.average))
        .sum::<f64>()
        / n;
    Some(covariance / (a.stats.std_dev * b.stats.std_dev))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::DataSeries;

    #[test]
    fn linked_series_are_reported() {
        let leads = DataSeries::from_pairs("Leads", [("a", 10.0), ("b", 20.0), ("c", 30.0), ("d", 45.0)]);
        let deals = DataSeries::from_pairs("Deals", [("a", 1.0), ("b", 2.0), ("c", 3.5), ("d", 4.0)]);
        let churn = DataSeries::from_pairs("Churn", [("a", 9.0), ("b", 7.0), ("c", 4.0), ("d", 1.0)]);

        let input = [
            AnalyzedSeries::new(&leads),
            AnalyzedSeries::new(&deals),
            AnalyzedSeries::new(&churn),
        ];
        let insights = CorrelationRule::default().evaluate(&input);
        assert_eq!(insights.len(), 3);
        assert_eq!(insights[0].series, vec!["Leads".to_string(), "Deals".to_string()]);
        assert!(insights[0].data["r"].as_f64().unwrap() > 0.9);
        assert!(insights[1].data["r"].as_f64().unwrap() < -0.9);
    }

    #[test]
    fn mismatched_or_flat_series_are_skipped() {
        let short = DataSeries::from_pairs("Short", [("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        let long = DataSeries::from_pairs("Long", [("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0)]);
        let flat = DataSeries::from_pairs("Flat", [("a", 5.0), ("b", 5.0), ("c", 5.0)]);

        let input = [
            AnalyzedSeries::new(&short),
            AnalyzedSeries::new(&long),
            AnalyzedSeries::new(&flat),
        ];
        assert!(CorrelationRule::default().evaluate(&input).is_empty());
    }
}
