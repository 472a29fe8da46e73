use crate::error::ConfigError;
use core_types::QueryConfiguration;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    DatabaseSettings, IndicatorSettings, InsightSettings, LoggingSettings, QuerySettings, Settings,
    ThresholdDirection, ThresholdSetting,
};

/// Environment variables with this prefix override file settings,
/// e.g. `ANALYTICS__INSIGHTS__ANOMALY_K=2.5`.
pub const ENV_PREFIX: &str = "ANALYTICS";

/// Loads the application settings from an optional `analytics.toml` in the
/// working directory, layered under `ANALYTICS__*` environment variables.
pub fn load_settings() -> Result<Settings, ConfigError> {
    build_settings(config::File::with_name("analytics").required(false))
}

/// Loads the application settings from an explicit file, which must exist.
pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    build_settings(config::File::from(path).required(true))
}

fn build_settings<S>(file: S) -> Result<Settings, ConfigError>
where
    S: config::Source + Send + Sync + 'static,
{
    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    settings.validate()?;
    tracing::debug!(?settings, "Loaded settings");
    Ok(settings)
}

/// Reads a saved query definition (TOML, JSON or any format `config` knows by extension).
pub fn load_query(path: &Path) -> Result<QueryConfiguration, ConfigError> {
    let query = config::Config::builder()
        .add_source(config::File::from(path))
        .build()?
        .try_deserialize::<QueryConfiguration>()?;

    if query.selected_fields.is_empty() {
        tracing::warn!(path = %path.display(), "Query definition selects no fields");
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{Aggregation, FilterOperator, Logic};
    use std::io::Write;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.insights.anomaly_k, 2.0);
        assert_eq!(settings.indicators.rsi_period, 14);
        assert_eq!(settings.query.default_limit, 10_000);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let file = write_temp(
            ".toml",
            r#"
            [insights]
            anomaly_k = 2.5

            [[insights.thresholds]]
            series = "Revenue"
            value = 1000.0
            direction = "Below"
            "#,
        );
        let settings = load_settings_from(file.path()).unwrap();
        assert_eq!(settings.insights.anomaly_k, 2.5);
        assert_eq!(settings.insights.critical_k, 3.0);
        assert_eq!(settings.insights.thresholds.len(), 1);
        assert_eq!(settings.insights.thresholds[0].direction, ThresholdDirection::Below);
        assert_eq!(settings.insights.thresholds[0].severity, core_types::Severity::Warning);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut settings = Settings::default();
        settings.insights.min_r_squared = 1.5;
        assert!(matches!(settings.validate(), Err(ConfigError::ValidationError(_))));

        let mut settings = Settings::default();
        settings.insights.critical_k = 1.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn query_definition_round_trips_from_toml() {
        let file = write_temp(
            ".toml",
            r#"
            aggregation = "Sum"
            limit = 500

            [[selected_fields]]
            name = "revenue"
            display_name = "Revenue"
            field_type = "Number"

            [group_by_field]
            name = "month"
            kind = { storage = "custom", json_path = "$.month" }

            [[filters]]
            field = { name = "status" }
            operator = "Equals"
            value = "Won"

            [[filters]]
            field = { name = "status" }
            operator = "Equals"
            value = "Open"
            logic = "Or"
            "#,
        );
        let query = load_query(file.path()).unwrap();
        assert_eq!(query.selected_fields.len(), 1);
        assert_eq!(query.aggregation, Aggregation::Sum);
        assert_eq!(query.limit, Some(500));
        assert!(query.group_by_field.as_ref().unwrap().is_custom());
        assert_eq!(query.filters.len(), 2);
        assert_eq!(query.filters[0].operator, FilterOperator::Equals);
        assert_eq!(query.filters[1].logic, Logic::Or);
    }
}
