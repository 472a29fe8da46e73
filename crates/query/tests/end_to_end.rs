use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use configuration::QuerySettings;
use core_types::{
    Aggregation, FieldKind, FieldSelection, FieldType, FilterOperator, FilterRule, QueryConfiguration, SeriesType,
};
use query::{
    CancellationFlag, FetchRequest, FieldCatalog, MemoryRecordStore, QueryError, QueryExecutor, Record, RecordStore,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Notify;

fn revenue() -> FieldSelection {
    FieldSelection::native("revenue", FieldType::Number).with_display_name("Revenue")
}

fn month() -> FieldSelection {
    FieldSelection::native("month", FieldType::Text).with_display_name("Month")
}

fn status() -> FieldSelection {
    FieldSelection::native("status", FieldType::Dropdown)
}

fn created_at() -> FieldSelection {
    FieldSelection::native("created_at", FieldType::Date)
}

fn deals() -> Vec<Record> {
    vec![
        Record::new(1)
            .with_column("month", "Jan")
            .with_column("revenue", 100.0)
            .with_column("status", "Won")
            .with_column("created_at", "2024-01-05")
            .with_custom("industry", "Retail")
            .with_custom("score", 7),
        Record::new(2)
            .with_column("month", "Jan")
            .with_column("revenue", 50.0)
            .with_column("status", "Lost")
            .with_column("created_at", "2024-01-20")
            .with_custom("industry", "Finance")
            .with_custom("score", "3"),
        Record::new(3)
            .with_column("month", "Feb")
            .with_column("revenue", 80.0)
            .with_column("status", "Won")
            .with_column("created_at", "2024-02-11")
            .with_custom("industry", "Retail"),
    ]
}

fn executor() -> QueryExecutor<MemoryRecordStore> {
    QueryExecutor::new(MemoryRecordStore::new(deals()), QuerySettings::default())
}

fn pairs(result: &core_types::AnalyticsResult, index: usize) -> Vec<(String, f64)> {
    result.series[index]
        .points
        .iter()
        .map(|p| (p.label.clone(), p.value))
        .collect()
}

#[tokio::test]
async fn grouped_sum_by_month() {
    let query = QueryConfiguration::new(vec![revenue()]).group_by(month(), Aggregation::Sum);
    let result = executor().execute(&query).await.unwrap();

    assert_eq!(result.series.len(), 1);
    assert_eq!(result.series[0].name, "Revenue");
    assert_eq!(result.series[0].series_type, SeriesType::Bar);
    assert_eq!(
        pairs(&result, 0),
        vec![("Jan".to_string(), 150.0), ("Feb".to_string(), 80.0)]
    );
    assert_eq!(result.total_records_analyzed, 3);
    assert_eq!(result.query_description, "Sum of Revenue by Month");
}

#[tokio::test]
async fn grouped_buckets_sort_when_ordered_by_group_field() {
    let query = QueryConfiguration::new(vec![revenue()])
        .group_by(month(), Aggregation::Average)
        .order_by(month(), false);
    let result = executor().execute(&query).await.unwrap();

    assert_eq!(
        pairs(&result, 0),
        vec![("Feb".to_string(), 80.0), ("Jan".to_string(), 75.0)]
    );
}

#[tokio::test]
async fn count_counts_non_null_values_per_bucket() {
    let industry = FieldSelection::custom("industry", FieldType::Text);
    let score = FieldSelection::custom("score", FieldType::Number);
    let query = QueryConfiguration::new(vec![industry.clone(), score]).group_by(industry, Aggregation::Count);
    let result = executor().execute(&query).await.unwrap();

    assert_eq!(
        pairs(&result, 0),
        vec![("Retail".to_string(), 2.0), ("Finance".to_string(), 1.0)]
    );
    assert_eq!(
        pairs(&result, 1),
        vec![("Retail".to_string(), 1.0), ("Finance".to_string(), 1.0)]
    );
}

#[tokio::test]
async fn ungrouped_series_have_one_point_per_record() {
    let query = QueryConfiguration::new(vec![revenue()]).order_by(created_at(), true);
    let result = executor().execute(&query).await.unwrap();

    assert_eq!(
        pairs(&result, 0),
        vec![
            ("2024-02-11".to_string(), 80.0),
            ("2024-01-20".to_string(), 50.0),
            ("2024-01-05".to_string(), 100.0),
        ]
    );
    assert_eq!(result.series[0].series_type, SeriesType::Line);
}

#[tokio::test]
async fn custom_fields_parse_best_effort() {
    let score = FieldSelection::custom("score", FieldType::Number);
    let result = executor()
        .execute(&QueryConfiguration::new(vec![score]))
        .await
        .unwrap();

    // Record 3 has no score and is excluded; record 2 stores it as a string.
    assert_eq!(
        pairs(&result, 0),
        vec![("1".to_string(), 7.0), ("2".to_string(), 3.0)]
    );
}

#[tokio::test]
async fn nested_custom_paths_are_resolved() {
    let store = MemoryRecordStore::new(vec![Record {
        id: 9,
        columns: Default::default(),
        custom_fields: json!({ "metrics": { "nps": 42 } }),
    }]);
    let mut nps = FieldSelection::custom("nps", FieldType::Number);
    nps.kind = FieldKind::Custom {
        json_path: "$.metrics.nps".to_string(),
    };

    let result = QueryExecutor::new(store, QuerySettings::default())
        .execute(&QueryConfiguration::new(vec![nps]))
        .await
        .unwrap();
    assert_eq!(result.series[0].values(), vec![42.0]);
}

#[tokio::test]
async fn or_chain_and_date_range_filter_records() {
    let query = QueryConfiguration::new(vec![revenue()])
        .filter(FilterRule::new(status(), FilterOperator::Equals, "Lost"))
        .filter(FilterRule::new(status(), FilterOperator::Equals, "Won").or())
        .date_range(
            created_at(),
            Some(Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap()),
        );
    let result = executor().execute(&query).await.unwrap();

    assert_eq!(result.total_records_analyzed, 2);
    assert_eq!(result.series[0].values(), vec![50.0, 80.0]);
    let first = &result.series[0].points[0];
    assert_eq!(first.label, "2024-01-20");
    assert_eq!(first.timestamp, Some(Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap()));
}

#[tokio::test]
async fn limit_applies_after_ordering() {
    let query = QueryConfiguration::new(vec![revenue()])
        .order_by(revenue(), true)
        .limit(2);
    let result = executor().execute(&query).await.unwrap();
    assert_eq!(result.series[0].values(), vec![100.0, 80.0]);
}

#[tokio::test]
async fn default_limit_caps_unbounded_queries() {
    let executor = QueryExecutor::new(
        MemoryRecordStore::new(deals()),
        QuerySettings { default_limit: 1 },
    );
    let result = executor.execute(&QueryConfiguration::new(vec![revenue()])).await.unwrap();
    assert_eq!(result.total_records_analyzed, 1);
}

#[tokio::test]
async fn empty_selection_is_rejected() {
    let err = executor().execute(&QueryConfiguration::default()).await.unwrap_err();
    assert!(matches!(err, QueryError::NoFieldsSelected));
}

struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    async fn fetch(&self, _request: &FetchRequest) -> Result<Vec<Record>, QueryError> {
        Err(QueryError::InvalidField("no such column: revenue".to_string()))
    }
}

#[tokio::test]
async fn store_faults_surface_as_execution_failures() {
    let executor = QueryExecutor::new(FailingStore, QuerySettings::default());
    let query = QueryConfiguration::new(vec![revenue()]);

    let err = executor.execute(&query).await.unwrap_err();
    assert!(matches!(err, QueryError::QueryExecutionFailure(ref msg) if msg.contains("no such column")));

    // The in-flight flag is released on the error path.
    assert!(!executor.is_running());
    assert!(matches!(
        executor.execute(&query).await,
        Err(QueryError::QueryExecutionFailure(_))
    ));
}

struct BlockingStore {
    started: Arc<Notify>,
    release: Arc<Notify>,
    inner: MemoryRecordStore,
}

#[async_trait]
impl RecordStore for BlockingStore {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Record>, QueryError> {
        self.started.notify_one();
        self.release.notified().await;
        self.inner.fetch(request).await
    }
}

#[tokio::test]
async fn concurrent_execution_is_rejected() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let executor = Arc::new(QueryExecutor::new(
        BlockingStore {
            started: started.clone(),
            release: release.clone(),
            inner: MemoryRecordStore::new(deals()),
        },
        QuerySettings::default(),
    ));
    let query = QueryConfiguration::new(vec![revenue()]);

    let first = {
        let executor = executor.clone();
        let query = query.clone();
        tokio::spawn(async move { executor.execute(&query).await })
    };
    started.notified().await;
    assert!(executor.is_running());

    let second = executor.execute(&query).await;
    assert!(matches!(second, Err(QueryError::QueryInProgress)));

    release.notify_one();
    let result = first.await.unwrap().unwrap();
    assert_eq!(result.total_records_analyzed, 3);
    assert!(!executor.is_running());
}

struct CancellingStore {
    flag: CancellationFlag,
    inner: MemoryRecordStore,
}

#[async_trait]
impl RecordStore for CancellingStore {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Record>, QueryError> {
        self.flag.cancel();
        self.inner.fetch(request).await
    }
}

#[tokio::test]
async fn cancellation_stops_between_steps() {
    let query = QueryConfiguration::new(vec![revenue()]);

    let flag = CancellationFlag::new();
    flag.cancel();
    let err = executor().execute_with_cancel(&query, &flag).await.unwrap_err();
    assert!(matches!(err, QueryError::Cancelled));

    let flag = CancellationFlag::new();
    let executor = QueryExecutor::new(
        CancellingStore {
            flag: flag.clone(),
            inner: MemoryRecordStore::new(deals()),
        },
        QuerySettings::default(),
    );
    let err = executor.execute_with_cancel(&query, &flag).await.unwrap_err();
    assert!(matches!(err, QueryError::Cancelled));
    assert!(!executor.is_running());
}

#[tokio::test]
async fn inverted_date_range_is_rejected_before_fetching() {
    let created = FieldSelection::native("created_at", FieldType::Date);
    let query = QueryConfiguration::new(vec![revenue()]).date_range(
        created,
        Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
        Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
    );

    let err = executor().execute(&query).await.unwrap_err();
    assert!(matches!(err, QueryError::InvalidQuery(_)));
    assert!(err.to_string().contains("date range"));
}

#[tokio::test]
async fn shared_labels_produce_distinct_series_names() {
    let custom_revenue = FieldSelection::custom("revenue", FieldType::Number).with_display_name("Revenue");
    let query = QueryConfiguration::new(vec![revenue(), custom_revenue, revenue()]);

    let result = executor().execute(&query).await.unwrap();
    let names: Vec<_> = result.series.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Revenue (revenue) #1", "Revenue ($.revenue)", "Revenue (revenue) #3"]);

    let single = executor().execute(&QueryConfiguration::new(vec![revenue()])).await.unwrap();
    assert_eq!(single.series[0].name, "Revenue");
}

#[tokio::test]
async fn queries_resolve_field_names_through_the_catalog() {
    let store = MemoryRecordStore::new(deals());
    // `industry` lives in the custom-field document, but the query names it bare.
    let query = QueryConfiguration::new(vec![FieldSelection::native("revenue", FieldType::Text)])
        .group_by(FieldSelection::native("industry", FieldType::Text), Aggregation::Sum);

    let resolved = store.resolve_query(&query).await.unwrap();
    assert!(resolved.group_by_field.as_ref().unwrap().is_custom());
    assert_eq!(resolved.selected_fields[0].field_type, FieldType::Number);

    let executor = QueryExecutor::new(store, QuerySettings::default());
    let result = executor.execute(&resolved).await.unwrap();
    assert_eq!(
        pairs(&result, 0),
        vec![("Retail".to_string(), 180.0), ("Finance".to_string(), 50.0)]
    );

    let unknown = QueryConfiguration::new(vec![FieldSelection::native("lead_score", FieldType::Number)]);
    let err = executor.store().resolve_query(&unknown).await.unwrap_err();
    assert!(matches!(err, QueryError::InvalidField(ref name) if name == "lead_score"));
}
