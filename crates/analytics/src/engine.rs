use crate::rules::{AnalyzedSeries, AnomalyRule, CorrelationRule, InsightRule, ThresholdRule, TrendRule};
use configuration::InsightSettings;
use core_types::{AnalyticsResult, Insight};

/// Runs a set of insight rules over the series of an `AnalyticsResult`.
///
/// Statistics are computed once per series and shared by every rule. Rules run
/// in registration order; the output is each rule's insights concatenated, so
/// ordering is stable within a rule but carries no meaning across rules.
pub struct InsightEngine {
    rules: Vec<Box<dyn InsightRule>>,
}

impl InsightEngine {
    pub fn new(rules: Vec<Box<dyn InsightRule>>) -> Self {
        Self { rules }
    }

    /// Builds the standard rule set from configuration.
    ///
    /// The threshold rule is only registered when thresholds are configured and
    /// the correlation rule only when enabled.
    pub fn from_settings(settings: &InsightSettings) -> Self {
        let mut rules: Vec<Box<dyn InsightRule>> = vec![
            Box::new(TrendRule::new(settings.trend_epsilon, settings.min_r_squared)),
            Box::new(AnomalyRule::new(settings.anomaly_k, settings.critical_k)),
        ];
        if !settings.thresholds.is_empty() {
            rules.push(Box::new(ThresholdRule::new(settings.thresholds.clone())));
        }
        if settings.enable_correlation {
            rules.push(Box::new(CorrelationRule::new(settings.correlation_threshold)));
        }
        Self::new(rules)
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Evaluates every rule against every series of `result`.
    pub fn generate(&self, result: &AnalyticsResult) -> Vec<Insight> {
        let analyzed: Vec<AnalyzedSeries<'_>> = result.series.iter().map(AnalyzedSeries::new).collect();

        let mut insights = Vec::new();
        for rule in &self.rules {
            let found = rule.evaluate(&analyzed);
            tracing::debug!(rule = rule.name(), count = found.len(), "Insight rule evaluated");
            insights.extend(found);
        }
        insights
    }

    /// Appends the generated insights to `result.insights`.
    pub fn enrich(&self, result: &mut AnalyticsResult) {
        let insights = self.generate(result);
        tracing::info!(
            result_id = %result.id,
            insights = insights.len(),
            "Generated insights"
        );
        result.insights.extend(insights);
    }
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::from_settings(&InsightSettings::default())
    }
}
