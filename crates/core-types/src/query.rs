use crate::enums::{Aggregation, FieldType, FilterOperator, Logic};
use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Where a field's value lives on a record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "storage", rename_all = "snake_case")]
pub enum FieldKind {
    /// A real column of the record store.
    #[default]
    Native,
    /// A dynamically typed value inside the record's custom-field JSON document.
    Custom {
        #[serde(default)]
        json_path: String,
    },
}

/// A field chosen for a query, as offered by the field catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSelection {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub field_type: FieldType,
}

impl FieldSelection {
    pub fn native(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            display_name: String::new(),
            kind: FieldKind::Native,
            field_type,
        }
    }

    pub fn custom(name: impl Into<String>, field_type: FieldType) -> Self {
        let name = name.into();
        Self {
            kind: FieldKind::Custom {
                json_path: format!("$.{}", name),
            },
            name,
            display_name: String::new(),
            field_type,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.kind, FieldKind::Custom { .. })
    }

    /// Human readable name, falling back to the raw field name.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    /// Normalised JSON path for custom fields, `None` for native columns.
    /// Array indexes are written as `[n]`, so `metrics.scores.1` and
    /// `$.metrics.scores[1]` both become `$.metrics.scores[1]`.
    pub fn json_path(&self) -> Option<String> {
        let segments = self.custom_segments()?;
        let mut path = String::from("$");
        for segment in &segments {
            if segment.parse::<usize>().is_ok() {
                path.push_str(&format!("[{}]", segment));
            } else {
                path.push('.');
                path.push_str(segment);
            }
        }
        Some(path)
    }

    /// The path segments after `$`, used for in-memory lookups.
    pub fn json_path_segments(&self) -> Vec<String> {
        self.custom_segments().unwrap_or_default()
    }

    fn custom_segments(&self) -> Option<Vec<String>> {
        let FieldKind::Custom { json_path } = &self.kind else {
            return None;
        };
        let split = |body: &str| -> Vec<String> {
            body.split(['.', '[', ']'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        };
        let segments = split(json_path.trim().trim_start_matches('$'));
        Some(if segments.is_empty() { split(&self.name) } else { segments })
    }

    /// Two selections address the same stored value.
    pub fn same_field(&self, other: &FieldSelection) -> bool {
        self.name == other.name && self.json_path() == other.json_path()
    }
}

/// One condition of a query's filter chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    pub field: FieldSelection,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Value,
    /// Joins this rule to the accumulated result of all earlier rules.
    /// Ignored on the first rule.
    #[serde(default)]
    pub logic: Logic,
}

impl FilterRule {
    pub fn new(field: FieldSelection, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
            logic: Logic::And,
        }
    }

    pub fn or(mut self) -> Self {
        self.logic = Logic::Or;
        self
    }
}

/// A declarative description of what to fetch and how to fold it into series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfiguration {
    pub selected_fields: Vec<FieldSelection>,
    pub filters: Vec<FilterRule>,
    pub group_by_field: Option<FieldSelection>,
    pub aggregation: Aggregation,
    pub date_range_field: Option<FieldSelection>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub order_by: Option<FieldSelection>,
    pub order_descending: bool,
}

impl QueryConfiguration {
    pub fn new(selected_fields: Vec<FieldSelection>) -> Self {
        Self {
            selected_fields,
            ..Self::default()
        }
    }

    pub fn group_by(mut self, field: FieldSelection, aggregation: Aggregation) -> Self {
        self.group_by_field = Some(field);
        self.aggregation = aggregation;
        self
    }

    pub fn filter(mut self, rule: FilterRule) -> Self {
        self.filters.push(rule);
        self
    }

    pub fn date_range(
        mut self,
        field: FieldSelection,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.date_range_field = Some(field);
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn order_by(mut self, field: FieldSelection, descending: bool) -> Self {
        self.order_by = Some(field);
        self.order_descending = descending;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Checks the parts of a query that do not depend on the record store.
    /// An empty field selection is left to the executor.
    pub fn validate(&self) -> Result<(), CoreError> {
        let named = self
            .selected_fields
            .iter()
            .chain(self.filters.iter().map(|f| &f.field))
            .chain(self.group_by_field.iter())
            .chain(self.order_by.iter())
            .chain(self.date_range_field.iter());
        for field in named {
            if field.name.trim().is_empty() {
                return Err(CoreError::InvalidInput("field".into(), "name must not be empty".into()));
            }
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(CoreError::InvalidInput(
                    "date range".into(),
                    format!("start {} is after end {}", start, end),
                ));
            }
        }
        if (self.start_date.is_some() || self.end_date.is_some()) && self.date_range_field.is_none() {
            return Err(CoreError::InvalidInput(
                "date range".into(),
                "start_date/end_date need a date_range_field".into(),
            ));
        }
        if self.limit == Some(0) {
            return Err(CoreError::InvalidInput("limit".into(), "must be at least 1".into()));
        }
        Ok(())
    }

    /// A one-line summary stored on the result as its query description.
    pub fn describe(&self) -> String {
        let fields = self
            .selected_fields
            .iter()
            .map(FieldSelection::label)
            .collect::<Vec<_>>()
            .join(", ");

        let mut text = match &self.group_by_field {
            Some(group) if self.aggregation != Aggregation::None => {
                format!("{} of {} by {}", self.aggregation, fields, group.label())
            }
            Some(group) => format!("{} by {}", fields, group.label()),
            None => fields,
        };

        let mut qualifiers = Vec::new();
        if !self.filters.is_empty() {
            qualifiers.push(format!("{} filter(s)", self.filters.len()));
        }
        if let Some(field) = &self.date_range_field {
            let start = self.start_date.map(|d| d.date_naive().to_string());
            let end = self.end_date.map(|d| d.date_naive().to_string());
            qualifiers.push(format!(
                "{} from {} to {}",
                field.label(),
                start.as_deref().unwrap_or("start"),
                end.as_deref().unwrap_or("now")
            ));
        }
        if let Some(limit) = self.limit {
            qualifiers.push(format!("limit {}", limit));
        }
        if !qualifiers.is_empty() {
            text.push_str(&format!(" ({})", qualifiers.join(", ")));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_paths_are_normalised() {
        let plain = FieldSelection::custom("industry", FieldType::Text);
        assert_eq!(plain.json_path().as_deref(), Some("$.industry"));

        let mut nested = FieldSelection::custom("score", FieldType::Number);
        nested.kind = FieldKind::Custom {
            json_path: "metrics.score".to_string(),
        };
        assert_eq!(nested.json_path().as_deref(), Some("$.metrics.score"));
        assert_eq!(nested.json_path_segments(), vec!["metrics", "score"]);

        nested.kind = FieldKind::Custom {
            json_path: "metrics.scores.1".to_string(),
        };
        assert_eq!(nested.json_path().as_deref(), Some("$.metrics.scores[1]"));
        nested.kind = FieldKind::Custom {
            json_path: "$.metrics.scores[1]".to_string(),
        };
        assert_eq!(nested.json_path_segments(), vec!["metrics", "scores", "1"]);

        let native = FieldSelection::native("revenue", FieldType::Number);
        assert!(native.json_path().is_none());
        assert!(native.json_path_segments().is_empty());
    }

    #[test]
    fn describe_mentions_grouping_and_limit() {
        let query = QueryConfiguration::new(vec![
            FieldSelection::native("revenue", FieldType::Number).with_display_name("Revenue"),
        ])
        .group_by(FieldSelection::native("month", FieldType::Text).with_display_name("Month"), Aggregation::Sum)
        .limit(50);

        assert_eq!(query.describe(), "Sum of Revenue by Month (limit 50)");
    }

    #[test]
    fn validate_rejects_inverted_ranges_and_zero_limits() {
        use chrono::TimeZone;
        let revenue = FieldSelection::native("revenue", FieldType::Number);
        let created = FieldSelection::native("created_at", FieldType::Date);
        let jan = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let feb = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();

        let ok = QueryConfiguration::new(vec![revenue.clone()]).date_range(created.clone(), Some(jan), Some(feb));
        assert!(ok.validate().is_ok());

        let inverted = QueryConfiguration::new(vec![revenue.clone()]).date_range(created, Some(feb), Some(jan));
        assert!(matches!(inverted.validate(), Err(CoreError::InvalidInput(..))));

        let mut unanchored = QueryConfiguration::new(vec![revenue.clone()]);
        unanchored.start_date = Some(jan);
        assert!(unanchored.validate().is_err());

        assert!(QueryConfiguration::new(vec![revenue]).limit(0).validate().is_err());
        assert!(QueryConfiguration::new(vec![FieldSelection::native(" ", FieldType::Text)]).validate().is_err());
    }

    #[test]
    fn field_kind_defaults_to_native_when_deserialized() {
        let field: FieldSelection =
            serde_json::from_str(r#"{"name":"revenue","field_type":"Number"}"#).unwrap();
        assert_eq!(field.kind, FieldKind::Native);

        let custom: FieldSelection = serde_json::from_str(
            r#"{"name":"industry","kind":{"storage":"custom","json_path":"$.industry"}}"#,
        )
        .unwrap();
        assert!(custom.is_custom());
    }
}
