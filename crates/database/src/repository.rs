use crate::DbError;
use crate::sql::{self, NATIVE_COLUMNS, SqlArg};
use async_trait::async_trait;
use core_types::{FieldSelection, FieldType};
use query::{FetchRequest, FieldCatalog, QueryError, Record, RecordStore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use std::str::FromStr;

/// The `DbRepository` provides a high-level, application-specific interface
/// to the database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: SqlitePool,
}

/// A record as accepted by `insert_record`, and by the `import` command as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewRecord {
    pub name: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub revenue: Option<f64>,
    pub deal_value: Option<f64>,
    pub created_at: Option<String>,
    pub custom_fields: Map<String, Value>,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Inserts a single record and returns its new id.
    pub async fn insert_record(&self, record: &NewRecord) -> Result<i64, DbError> {
        let mut tx = self.pool.begin().await?;
        let id = insert_in(&mut tx, record).await?;
        tx.commit().await?;
        Ok(id)
    }

    /// Inserts a batch of records in one transaction; either all or none are stored.
    pub async fn insert_records(&self, records: &[NewRecord]) -> Result<u64, DbError> {
        let mut tx: Transaction<Sqlite> = self.pool.begin().await?;
        for record in records {
            insert_in(&mut tx, record).await?;
        }
        tx.commit().await?;
        tracing::info!(count = records.len(), "Imported records");
        Ok(records.len() as u64)
    }

    /// Registers (or redefines) a custom field so the catalog offers it.
    pub async fn define_custom_field(
        &self,
        name: &str,
        display_name: &str,
        field_type: FieldType,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO custom_field_definitions (name, display_name, field_type)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET display_name = excluded.display_name, field_type = excluded.field_type
            "#,
        )
        .bind(name)
        .bind(display_name)
        .bind(field_type.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn record_count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Runs a compiled fetch and maps the rows into `Record`s.
    pub async fn fetch_records(&self, request: &FetchRequest) -> Result<Vec<Record>, DbError> {
        let compiled = sql::compile(request)?;
        tracing::debug!(sql = %compiled.sql, args = compiled.args.len(), "Fetching records");

        let mut query = sqlx::query(&compiled.sql);
        for arg in &compiled.args {
            query = match arg {
                SqlArg::Text(text) => query.bind(text.clone()),
                SqlArg::Real(number) => query.bind(*number),
                SqlArg::Int(number) => query.bind(*number),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(map_record).collect()
    }

    pub async fn custom_field_definitions(&self) -> Result<Vec<FieldSelection>, DbError> {
        let rows = sqlx::query(
            "SELECT name, display_name, field_type FROM custom_field_definitions ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let fields = rows
            .into_iter()
            .map(|row| {
                let name: String = row.get("name");
                let display_name: String = row.get("display_name");
                let raw_type: String = row.get("field_type");
                let field_type = FieldType::from_str(&raw_type).unwrap_or_else(|_| {
                    tracing::warn!(field = %name, field_type = %raw_type, "Unknown custom field type, treating as text");
                    FieldType::Text
                });
                FieldSelection::custom(name, field_type).with_display_name(display_name)
            })
            .collect();
        Ok(fields)
    }
}

async fn insert_in(tx: &mut Transaction<'_, Sqlite>, record: &NewRecord) -> Result<i64, DbError> {
    let custom_fields = serde_json::to_string(&record.custom_fields)?;
    let result = sqlx::query(
        r#"
        INSERT INTO records (name, company, email, status, source, revenue, deal_value, created_at, custom_fields)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.name)
    .bind(&record.company)
    .bind(&record.email)
    .bind(&record.status)
    .bind(&record.source)
    .bind(record.revenue)
    .bind(record.deal_value)
    .bind(&record.created_at)
    .bind(custom_fields)
    .execute(&mut **tx)
    .await?;
    Ok(result.last_insert_rowid())
}

fn map_record(row: &SqliteRow) -> Result<Record, DbError> {
    let mut columns = Map::new();
    for (name, _, field_type) in NATIVE_COLUMNS {
        let value = match (*name, field_type) {
            ("id", _) => Value::from(row.try_get::<i64, _>("id")?),
            (_, FieldType::Number) => row
                .try_get::<Option<f64>, _>(*name)?
                .map(Value::from)
                .unwrap_or(Value::Null),
            _ => row
                .try_get::<Option<String>, _>(*name)?
                .map(Value::from)
                .unwrap_or(Value::Null),
        };
        columns.insert(name.to_string(), value);
    }

    let id: i64 = row.try_get("id")?;
    let raw: Option<String> = row.try_get("custom_fields")?;
    let custom_fields = match raw.as_deref() {
        None | Some("") => Value::Object(Map::new()),
        Some(text) => serde_json::from_str(text).unwrap_or_else(|e| {
            tracing::warn!(record = id, error = %e, "Unreadable custom_fields document, ignoring");
            Value::Object(Map::new())
        }),
    };

    Ok(Record { id, columns, custom_fields })
}

#[async_trait]
impl RecordStore for DbRepository {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Record>, QueryError> {
        self.fetch_records(request).await.map_err(|e| match e {
            DbError::UnknownColumn(column) => QueryError::InvalidField(column),
            other => QueryError::QueryExecutionFailure(other.to_string()),
        })
    }
}

#[async_trait]
impl FieldCatalog for DbRepository {
    async fn available_fields(&self) -> Result<Vec<FieldSelection>, QueryError> {
        let mut fields: Vec<FieldSelection> = NATIVE_COLUMNS
            .iter()
            .map(|(name, display, field_type)| FieldSelection::native(*name, *field_type).with_display_name(*display))
            .collect();
        let custom = self
            .custom_field_definitions()
            .await
            .map_err(|e| QueryError::QueryExecutionFailure(e.to_string()))?;
        fields.extend(custom);
        Ok(fields)
    }
}
