use crate::error::QueryError;
use crate::store::{FetchRequest, FieldCatalog, Record, RecordStore};
use crate::value;
use async_trait::async_trait;
use core_types::{FieldSelection, FieldType};
use std::sync::RwLock;

/// A record store held entirely in memory.
///
/// Applies the filter predicate, the ordering and the limit itself, so it
/// behaves like the SQL store for everything the executor relies on.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<Record>>,
    fields: Vec<FieldSelection>,
}

impl MemoryRecordStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records: RwLock::new(records),
            fields: Vec::new(),
        }
    }

    /// Declares the fields returned by `available_fields`.
    pub fn with_fields(mut self, fields: Vec<FieldSelection>) -> Self {
        self.fields = fields;
        self
    }

    pub fn insert(&self, record: Record) -> Result<(), QueryError> {
        self.records
            .write()
            .map_err(|_| QueryError::QueryExecutionFailure("record store lock poisoned".to_string()))?
            .push(record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Record>, QueryError> {
        let records = self
            .records
            .read()
            .map_err(|_| QueryError::QueryExecutionFailure("record store lock poisoned".to_string()))?;

        let mut matched: Vec<Record> = records
            .iter()
            .filter(|record| request.predicate.matches(|field| self.resolve_field_value(record, field)))
            .cloned()
            .collect();

        if let Some(field) = &request.order_by {
            // `sort_by` is stable, so ties keep insertion order.
            matched.sort_by(|a, b| {
                let ord = value::compare(&self.resolve_field_value(a, field), &self.resolve_field_value(b, field));
                if request.descending { ord.reverse() } else { ord }
            });
        }
        if let Some(limit) = request.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}

#[async_trait]
impl FieldCatalog for MemoryRecordStore {
    async fn available_fields(&self) -> Result<Vec<FieldSelection>, QueryError> {
        if !self.fields.is_empty() {
            return Ok(self.fields.clone());
        }

        // Without declared fields, infer them from the first record.
        let records = self
            .records
            .read()
            .map_err(|_| QueryError::QueryExecutionFailure("record store lock poisoned".to_string()))?;
        let Some(first) = records.first() else {
            return Ok(Vec::new());
        };

        let mut fields: Vec<FieldSelection> = first
            .columns
            .iter()
            .map(|(name, v)| FieldSelection::native(name.clone(), infer_type(v)))
            .collect();
        if let Some(custom) = first.custom_fields.as_object() {
            fields.extend(
                custom
                    .iter()
                    .map(|(name, v)| FieldSelection::custom(name.clone(), infer_type(v))),
            );
        }
        Ok(fields)
    }
}

fn infer_type(v: &serde_json::Value) -> FieldType {
    match v {
        serde_json::Value::Number(_) => FieldType::Number,
        serde_json::Value::Bool(_) => FieldType::Boolean,
        other if value::as_datetime(other).is_some() => FieldType::Date,
        _ => FieldType::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterPredicate;
    use core_types::{FilterOperator, FilterRule};

    fn store() -> MemoryRecordStore {
        MemoryRecordStore::new(vec![
            Record::new(1).with_column("revenue", 300.0).with_column("status", "Won"),
            Record::new(2).with_column("revenue", 100.0).with_column("status", "Lost"),
            Record::new(3).with_column("revenue", 200.0).with_column("status", "Won"),
        ])
    }

    #[tokio::test]
    async fn fetch_filters_then_sorts_then_limits() {
        let revenue = FieldSelection::native("revenue", FieldType::Number);
        let request = FetchRequest {
            predicate: FilterPredicate {
                rules: vec![FilterRule::new(
                    FieldSelection::native("status", FieldType::Text),
                    FilterOperator::Equals,
                    "won",
                )],
                date_range: None,
            },
            order_by: Some(revenue),
            descending: false,
            limit: Some(1),
        };

        let rows = store().fetch(&request).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 3);
    }

    #[tokio::test]
    async fn catalog_is_inferred_from_first_record() {
        let store = MemoryRecordStore::new(vec![
            Record::new(1)
                .with_column("revenue", 10.0)
                .with_column("created_at", "2024-01-05")
                .with_custom("industry", "Retail"),
        ]);
        let fields = store.available_fields().await.unwrap();
        let find = |name: &str| fields.iter().find(|f| f.name == name).unwrap();

        assert_eq!(find("revenue").field_type, FieldType::Number);
        assert_eq!(find("created_at").field_type, FieldType::Date);
        assert!(find("industry").is_custom());
        assert!(matches!(store.find_field("REVENUE").await, Ok(f) if f.name == "revenue"));
        assert!(matches!(store.find_field("region").await, Err(QueryError::InvalidField(_))));
    }
}
