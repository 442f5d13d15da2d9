//! SQLite database client implementation.
//!
//! Used for local catalogs and for exercising the full pipeline in tests
//! against an in-memory database.

use crate::binder::BoundQuery;
use crate::config::ConnectionConfig;
use crate::db::{ColumnInfo, DatabaseClient, PlaceholderStyle, ResultSet, Row, Value};
use crate::error::{CatalogError, Result};
use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as SqlxColumn, Executor, Row as SqlxRow, Sqlite, TypeInfo, ValueRef};
use tracing::debug;

/// SQLite database client.
#[derive(Debug)]
pub struct SqliteClient {
    pool: SqlitePool,
}

impl SqliteClient {
    /// Opens the database named by the connection URL.
    ///
    /// An in-memory database lives only as long as its connection, so those
    /// get a single connection that is never recycled.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let in_memory = config.url.contains(":memory:") || config.url.contains("mode=memory");
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options.connect(&config.url).await.map_err(|e| {
            CatalogError::connection(format!("Cannot open {}: {e}", config.display_string()))
        })?;
        debug!("Opened SQLite database {}", config.display_string());
        Ok(Self { pool })
    }

    /// Opens a fresh in-memory database.
    pub async fn in_memory() -> Result<Self> {
        Self::connect(&ConnectionConfig::from_url("sqlite::memory:")?).await
    }

    /// Runs a multi-statement script, e.g. to create and seed tables.
    pub async fn execute_script(&self, sql: &str) -> Result<()> {
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| CatalogError::query(format_query_error(e)))?;
        Ok(())
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Question
    }

    async fn execute_query(&self, query: &BoundQuery) -> Result<ResultSet> {
        let statement = query
            .values
            .iter()
            .fold(sqlx::query(&query.text), bind_value);

        let result = statement
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CatalogError::query(format_query_error(e)))?;

        let columns: Vec<ColumnInfo> = match result.first() {
            Some(first_row) => first_row
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            None => match (&self.pool).describe(&query.text).await {
                Ok(described) => described
                    .columns()
                    .iter()
                    .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                    .collect(),
                Err(e) => {
                    debug!("Could not describe empty result: {e}");
                    Vec::new()
                }
            },
        };

        let rows = result.iter().map(convert_row).collect::<Result<Vec<Row>>>()?;
        Ok(ResultSet::with_data(columns, rows))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

fn bind_value<'q>(
    statement: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => statement.bind(None::<String>),
        Value::Bool(b) => statement.bind(*b),
        Value::Int(i) => statement.bind(*i),
        Value::Float(f) => statement.bind(*f),
        Value::String(s) => statement.bind(s.clone()),
        Value::Date(d) => statement.bind(*d),
        Value::Timestamp(ts) => statement.bind(*ts),
        Value::TimestampTz(ts) => statement.bind(*ts),
        Value::Numeric(n) => statement.bind(n.clone()),
        Value::Bytes(b) => statement.bind(b.clone()),
    }
}

fn convert_row(row: &SqliteRow) -> Result<Row> {
    (0..row.columns().len())
        .map(|i| convert_value(row, i))
        .collect()
}

/// Decodes by the value's storage class; SQLite column types are only advisory.
fn convert_value(row: &SqliteRow, index: usize) -> Result<Value> {
    let raw = row.try_get_raw(index).map_err(|e| decode_error(row, index, e))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let storage = raw.type_info().name().to_uppercase();

    let decoded = match storage.as_str() {
        "INTEGER" | "INT8" | "BIGINT" => row.try_get_unchecked::<i64, _>(index).map(Value::Int),
        "BOOLEAN" => row.try_get_unchecked::<bool, _>(index).map(Value::Bool),
        "REAL" | "FLOAT" | "DOUBLE" => row.try_get_unchecked::<f64, _>(index).map(Value::Float),
        "BLOB" => row.try_get_unchecked::<Vec<u8>, _>(index).map(Value::Bytes),
        _ => row.try_get_unchecked::<String, _>(index).map(Value::String),
    };
    decoded.map_err(|e| decode_error(row, index, e))
}

fn decode_error(row: &SqliteRow, index: usize, error: sqlx::Error) -> CatalogError {
    let column = row.columns().get(index).map_or("?", |col| col.name());
    CatalogError::query(format!("Cannot decode column '{column}': {error}"))
}

fn format_query_error(error: sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}
