use crate::error::ConfigError;
use core_types::Severity;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section is optional in `analytics.toml`; omitted sections fall back to
/// their `Default` implementation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub query: QuerySettings,
    pub insights: InsightSettings,
    pub indicators: IndicatorSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Rejects values that would make the insight rules meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let insights = &self.insights;
        if insights.anomaly_k <= 0.0 {
            return Err(ConfigError::ValidationError(
                "insights.anomaly_k must be greater than 0".to_string(),
            ));
        }
        if insights.critical_k < insights.anomaly_k {
            return Err(ConfigError::ValidationError(
                "insights.critical_k must not be smaller than insights.anomaly_k".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&insights.min_r_squared) {
            return Err(ConfigError::ValidationError(
                "insights.min_r_squared must be between 0 and 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&insights.correlation_threshold) {
            return Err(ConfigError::ValidationError(
                "insights.correlation_threshold must be between 0 and 1".to_string(),
            ));
        }
        if insights.trend_epsilon < 0.0 {
            return Err(ConfigError::ValidationError(
                "insights.trend_epsilon cannot be negative".to_string(),
            ));
        }
        if self.query.default_limit == 0 {
            return Err(ConfigError::ValidationError(
                "query.default_limit must be at least 1".to_string(),
            ));
        }
        if self.indicators.rsi_period == 0 {
            return Err(ConfigError::ValidationError(
                "indicators.rsi_period cannot be zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Connection parameters for the SQLite record store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Used when the `DATABASE_URL` environment variable is unset.
    pub url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
            acquire_timeout_secs: 5,
        }
    }
}

/// Parameters for the query executor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    /// Row cap applied when a query does not set its own limit.
    pub default_limit: usize,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            default_limit: 10_000,
        }
    }
}

/// Parameters for the insight rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InsightSettings {
    /// Slopes within +/- this value count as flat.
    pub trend_epsilon: f64,
    /// Minimum goodness of fit before a trend is reported.
    pub min_r_squared: f64,
    /// Points further than `anomaly_k` standard deviations from the mean are anomalies.
    pub anomaly_k: f64,
    /// An anomaly this many standard deviations out is critical.
    pub critical_k: f64,
    /// Minimum absolute Pearson coefficient before a correlation is reported.
    pub correlation_threshold: f64,
    pub enable_correlation: bool,
    pub thresholds: Vec<ThresholdSetting>,
}

impl Default for InsightSettings {
    fn default() -> Self {
        Self {
            trend_epsilon: 1e-9,
            min_r_squared: 0.5,
            anomaly_k: 2.0,
            critical_k: 3.0,
            correlation_threshold: 0.7,
            enable_correlation: true,
            thresholds: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ThresholdDirection {
    #[default]
    Above,
    Below,
}

/// A value a series should be checked against.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ThresholdSetting {
    /// Restricts the threshold to one series name; applies to all series when unset.
    #[serde(default)]
    pub series: Option<String>,
    pub value: f64,
    #[serde(default)]
    pub direction: ThresholdDirection,
    #[serde(default = "default_threshold_severity")]
    pub severity: Severity,
}

fn default_threshold_severity() -> Severity {
    Severity::Warning
}

impl ThresholdSetting {
    pub fn new(value: f64, direction: ThresholdDirection) -> Self {
        Self {
            series: None,
            value,
            direction,
            severity: default_threshold_severity(),
        }
    }
}

/// Default periods for derived indicator series.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub moving_average_period: usize,
    pub ema_period: usize,
    pub rsi_period: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            moving_average_period: 3,
            ema_period: 5,
            rsi_period: 14,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default `EnvFilter` directive; `RUST_LOG` wins when set.
    pub level: String,
    /// Also write a daily rolling log file into this directory.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "analytics.log".to_string(),
        }
    }
}
