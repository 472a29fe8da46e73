use crate::error::QueryError;
use crate::filter::FilterPredicate;
use crate::store::{FetchRequest, Record, RecordStore};
use crate::value;
use configuration::QuerySettings;
use core_types::{
    Aggregation, AnalyticsResult, ChartStyle, DataPoint, DataSeries, FieldSelection, QueryConfiguration,
    SeriesType,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// A shared "stop" switch checked between the steps of a query.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }

    fn check(&self) -> Result<(), QueryError> {
        if self.is_cancelled() {
            Err(QueryError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Clears the executor's in-flight flag when dropped, on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, QueryError> {
        flag.compare_exchange(false, true, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| QueryError::QueryInProgress)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, AtomicOrdering::Release);
    }
}

/// Turns a `QueryConfiguration` into an `AnalyticsResult` holding one series
/// per selected field.
///
/// The executor runs at most one query at a time; a concurrent call is
/// rejected rather than queued.
pub struct QueryExecutor<S: RecordStore> {
    store: S,
    settings: QuerySettings,
    in_flight: AtomicBool,
}

impl<S: RecordStore> QueryExecutor<S> {
    pub fn new(store: S, settings: QuerySettings) -> Self {
        Self {
            store,
            settings,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(AtomicOrdering::Acquire)
    }

    pub async fn execute(&self, query: &QueryConfiguration) -> Result<AnalyticsResult, QueryError> {
        self.execute_with_cancel(query, &CancellationFlag::new()).await
    }

    pub async fn execute_with_cancel(
        &self,
        query: &QueryConfiguration,
        cancel: &CancellationFlag,
    ) -> Result<AnalyticsResult, QueryError> {
        if query.selected_fields.is_empty() {
            return Err(QueryError::NoFieldsSelected);
        }
        query.validate()?;
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let description = query.describe();
        info!(query = %description, "Executing analytics query");

        cancel.check()?;
        let request = FetchRequest {
            predicate: FilterPredicate::from_query(query),
            order_by: query.order_by.clone(),
            descending: query.order_descending,
            limit: Some(query.limit.unwrap_or(self.settings.default_limit)),
        };

        let started = Instant::now();
        let records = self.store.fetch(&request).await.map_err(|e| match e {
            QueryError::QueryExecutionFailure(_) | QueryError::Cancelled => e,
            other => QueryError::QueryExecutionFailure(other.to_string()),
        })?;
        debug!(records = records.len(), "Fetched records");

        cancel.check()?;
        let series = match &query.group_by_field {
            Some(group_field) => self.grouped_series(query, group_field, &records, cancel)?,
            None => self.record_series(query, &records, cancel)?,
        };

        let mut result = AnalyticsResult::new(description);
        result.series = series;
        result.total_records_analyzed = records.len();
        result.execution_time = started.elapsed();

        info!(
            records = result.total_records_analyzed,
            series = result.series.len(),
            points = result.total_points(),
            elapsed_ms = result.execution_time.as_millis() as u64,
            "Query complete"
        );
        Ok(result)
    }

    fn grouped_series(
        &self,
        query: &QueryConfiguration,
        group_field: &FieldSelection,
        records: &[Record],
        cancel: &CancellationFlag,
    ) -> Result<Vec<DataSeries>, QueryError> {
        // Buckets keep first-appearance order; the index map only speeds up lookups.
        let mut buckets: Vec<(String, serde_json::Value, Vec<&Record>)> = Vec::new();
        let mut index = std::collections::HashMap::new();
        for record in records {
            let raw = self.store.resolve_field_value(record, group_field);
            let key = value::as_key(&raw);
            let slot = *index.entry(key.clone()).or_insert_with(|| {
                buckets.push((key, raw, Vec::new()));
                buckets.len() - 1
            });
            buckets[slot].2.push(record);
        }

        if query.order_by.as_ref().is_some_and(|o| o.same_field(group_field)) {
            buckets.sort_by(|a, b| {
                let ord = value::compare(&a.1, &b.1);
                if query.order_descending { ord.reverse() } else { ord }
            });
        }

        let names = series_names(&query.selected_fields);
        let mut out = Vec::with_capacity(query.selected_fields.len());
        for (i, field) in query.selected_fields.iter().enumerate() {
            cancel.check()?;
            let mut series = self
                .new_series(&names[i], field, i)
                .with_type(SeriesType::Bar);
            series
                .metadata
                .insert("aggregation".to_string(), query.aggregation.to_string().into());
            series
                .metadata
                .insert("group_by".to_string(), group_field.label().into());

            for (key, _, members) in &buckets {
                let raw: Vec<serde_json::Value> = members
                    .iter()
                    .map(|r| self.store.resolve_field_value(r, field))
                    .collect();
                let numbers: Vec<f64> = raw.iter().filter_map(value::as_number).collect();

                let reduced = match query.aggregation {
                    Aggregation::Count => raw.iter().filter(|v| !v.is_null()).count() as f64,
                    _ if numbers.is_empty() => {
                        debug!(field = %field.name, bucket = %key, "Bucket has no numeric values, skipping");
                        continue;
                    }
                    aggregation => aggregation.apply(&numbers),
                };
                series.push(
                    DataPoint::new(key.clone(), reduced).with_metadata("records", members.len() as u64),
                );
            }
            out.push(series);
        }
        Ok(out)
    }

    fn record_series(
        &self,
        query: &QueryConfiguration,
        records: &[Record],
        cancel: &CancellationFlag,
    ) -> Result<Vec<DataSeries>, QueryError> {
        let names = series_names(&query.selected_fields);
        let mut out = Vec::with_capacity(query.selected_fields.len());
        for (i, field) in query.selected_fields.iter().enumerate() {
            cancel.check()?;
            let mut series = self.new_series(&names[i], field, i);
            let mut skipped = 0usize;

            for record in records {
                let Some(number) = value::as_number(&self.store.resolve_field_value(record, field)) else {
                    skipped += 1;
                    continue;
                };
                let date = query
                    .date_range_field
                    .as_ref()
                    .map(|f| self.store.resolve_field_value(record, f));

                let label = query
                    .order_by
                    .as_ref()
                    .map(|f| self.store.resolve_field_value(record, f))
                    .and_then(|v| value::as_text(&v).filter(|t| !t.trim().is_empty()))
                    .or_else(|| date.as_ref().and_then(value::as_text).filter(|t| !t.trim().is_empty()))
                    .unwrap_or_else(|| record.id.to_string());

                let mut point = DataPoint::new(label, number).with_metadata("record_id", record.id);
                if let Some(timestamp) = date.as_ref().and_then(value::as_datetime) {
                    point = point.with_timestamp(timestamp);
                }
                series.push(point);
            }

            if skipped > 0 {
                debug!(field = %field.name, skipped, "Excluded non-numeric values");
            }
            if series.is_empty() && !records.is_empty() {
                warn!(field = %field.name, "No numeric values found for field");
            }
            out.push(series);
        }
        Ok(out)
    }

    fn new_series(&self, name: &str, field: &FieldSelection, index: usize) -> DataSeries {
        let mut series = DataSeries::new(name).with_source_field(field.name.clone());
        series.color = ChartStyle::default().series_color(index).to_string();
        series
    }
}

/// Series are looked up by name, so every selected field needs a distinct one.
/// A shared label gets the field's storage location appended, and a field
/// selected twice gets its position.
fn series_names(fields: &[FieldSelection]) -> Vec<String> {
    let qualified: Vec<String> = fields
        .iter()
        .map(|field| {
            if fields.iter().filter(|f| f.label() == field.label()).count() < 2 {
                return field.label().to_string();
            }
            let source = field.json_path().unwrap_or_else(|| field.name.clone());
            format!("{} ({})", field.label(), source)
        })
        .collect();

    qualified
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if qualified.iter().filter(|n| *n == name).count() < 2 {
                name.clone()
            } else {
                format!("{} #{}", name, i + 1)
            }
        })
        .collect()
}
