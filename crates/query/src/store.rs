use crate::error::QueryError;
use crate::filter::FilterPredicate;
use async_trait::async_trait;
use core_types::{FieldKind, FieldSelection, QueryConfiguration};
use serde_json::{Map, Value};

/// One row of the record store: native columns plus a custom-field document.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: i64,
    pub columns: Map<String, Value>,
    pub custom_fields: Value,
}

impl Record {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            columns: Map::new(),
            custom_fields: Value::Object(Map::new()),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(name.into(), value.into());
        self
    }

    pub fn with_custom(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        if !self.custom_fields.is_object() {
            self.custom_fields = Value::Object(Map::new());
        }
        if let Value::Object(map) = &mut self.custom_fields {
            map.insert(name.into(), value.into());
        }
        self
    }

    /// Reads a field: native fields from `columns`, custom fields by walking
    /// their JSON path through `custom_fields`. Missing values are `Null`.
    pub fn value_of(&self, field: &FieldSelection) -> Value {
        match field.kind {
            FieldKind::Native => {
                if field.name == "id" && !self.columns.contains_key("id") {
                    return Value::from(self.id);
                }
                self.columns.get(&field.name).cloned().unwrap_or(Value::Null)
            }
            FieldKind::Custom { .. } => {
                let mut current = &self.custom_fields;
                for segment in field.json_path_segments() {
                    let next = match current {
                        Value::Object(map) => map.get(&segment),
                        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                        _ => None,
                    };
                    match next {
                        Some(value) => current = value,
                        None => return Value::Null,
                    }
                }
                current.clone()
            }
        }
    }
}

/// Everything a store needs to return the rows of one query.
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    pub predicate: FilterPredicate,
    pub order_by: Option<FieldSelection>,
    pub descending: bool,
    pub limit: Option<usize>,
}

/// The source of raw records.
///
/// Implementations must apply the predicate, then the ordering, then the
/// limit. Faults of the underlying storage are reported as
/// `QueryError::QueryExecutionFailure`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Record>, QueryError>;

    fn resolve_field_value(&self, record: &Record, field: &FieldSelection) -> Value {
        record.value_of(field)
    }
}

/// Lists the fields a user can pick from, native columns and custom fields alike.
#[async_trait]
pub trait FieldCatalog: Send + Sync {
    async fn available_fields(&self) -> Result<Vec<FieldSelection>, QueryError>;

    /// Looks a field up by name or display name (case-insensitive).
    async fn find_field(&self, name: &str) -> Result<FieldSelection, QueryError> {
        self.available_fields()
            .await?
            .into_iter()
            .find(|f| f.name.eq_ignore_ascii_case(name) || f.display_name.eq_ignore_ascii_case(name))
            .ok_or_else(|| QueryError::InvalidField(name.to_string()))
    }

    /// Replaces every field of `query` with its catalog entry, so storage
    /// kind and type come from the catalog rather than the query text.
    ///
    /// A display name given in the query is kept. A field the query marks as
    /// custom keeps its own JSON path when that path differs from the
    /// default one, and is accepted without a catalog entry.
    async fn resolve_query(&self, query: &QueryConfiguration) -> Result<QueryConfiguration, QueryError> {
        let catalog = self.available_fields().await?;
        let resolve = |field: &FieldSelection| resolve_field(&catalog, field);

        let mut resolved = query.clone();
        resolved.selected_fields = query.selected_fields.iter().map(resolve).collect::<Result<_, _>>()?;
        for rule in &mut resolved.filters {
            rule.field = resolve(&rule.field)?;
        }
        resolved.group_by_field = query.group_by_field.as_ref().map(resolve).transpose()?;
        resolved.order_by = query.order_by.as_ref().map(resolve).transpose()?;
        resolved.date_range_field = query.date_range_field.as_ref().map(resolve).transpose()?;
        Ok(resolved)
    }
}

fn resolve_field(catalog: &[FieldSelection], field: &FieldSelection) -> Result<FieldSelection, QueryError> {
    let entry = catalog
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case(&field.name) || f.display_name.eq_ignore_ascii_case(&field.name));

    let Some(entry) = entry else {
        return if field.is_custom() {
            Ok(field.clone())
        } else {
            Err(QueryError::InvalidField(field.name.clone()))
        };
    };

    let mut resolved = entry.clone();
    if field.is_custom() && field.json_path() != FieldSelection::custom(&field.name, field.field_type).json_path() {
        resolved.kind = field.kind.clone();
    }
    if !field.display_name.is_empty() {
        resolved.display_name = field.display_name.clone();
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::FieldType;
    use serde_json::json;

    #[test]
    fn resolves_native_and_nested_custom_values() {
        let record = Record {
            id: 7,
            columns: Map::new(),
            custom_fields: json!({ "industry": "Retail", "metrics": { "scores": [3, 9] } }),
        }
        .with_column("revenue", 1200.0);

        let revenue = FieldSelection::native("revenue", FieldType::Number);
        assert_eq!(record.value_of(&revenue), json!(1200.0));

        let id = FieldSelection::native("id", FieldType::Number);
        assert_eq!(record.value_of(&id), json!(7));

        let industry = FieldSelection::custom("industry", FieldType::Text);
        assert_eq!(record.value_of(&industry), json!("Retail"));

        let mut score = FieldSelection::custom("score", FieldType::Number);
        score.kind = FieldKind::Custom {
            json_path: "$.metrics.scores.1".to_string(),
        };
        assert_eq!(record.value_of(&score), json!(9));

        let missing = FieldSelection::custom("region", FieldType::Text);
        assert_eq!(record.value_of(&missing), Value::Null);
    }

    #[test]
    fn fields_resolve_against_the_catalog() {
        let catalog = vec![
            FieldSelection::native("revenue", FieldType::Number).with_display_name("Revenue"),
            FieldSelection::custom("lead_score", FieldType::Number).with_display_name("Lead Score"),
        ];

        // Written without a kind, the name still finds the custom field.
        let bare = FieldSelection::native("lead_score", FieldType::Text);
        let resolved = resolve_field(&catalog, &bare).unwrap();
        assert!(resolved.is_custom());
        assert_eq!(resolved.field_type, FieldType::Number);
        assert_eq!(resolved.label(), "Lead Score");

        let by_label = FieldSelection::native("revenue", FieldType::Text).with_display_name("Income");
        let resolved = resolve_field(&catalog, &by_label).unwrap();
        assert!(!resolved.is_custom());
        assert_eq!(resolved.label(), "Income");

        let mut nested = FieldSelection::custom("lead_score", FieldType::Number);
        nested.kind = FieldKind::Custom {
            json_path: "$.lead_score.history.0".to_string(),
        };
        let resolved = resolve_field(&catalog, &nested).unwrap();
        assert_eq!(resolved.json_path().as_deref(), Some("$.lead_score.history[0]"));

        let unknown = FieldSelection::native("salary", FieldType::Number);
        assert!(matches!(resolve_field(&catalog, &unknown), Err(QueryError::InvalidField(name)) if name == "salary"));

        let undeclared = FieldSelection::custom("region", FieldType::Text);
        assert_eq!(resolve_field(&catalog, &undeclared).unwrap(), undeclared);
    }
}
