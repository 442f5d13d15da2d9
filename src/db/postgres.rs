//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using sqlx.

use crate::binder::BoundQuery;
use crate::config::ConnectionConfig;
use crate::db::{ColumnInfo, DatabaseClient, PlaceholderStyle, ResultSet, Row, Value};
use crate::error::{CatalogError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow, PgValueFormat, PgValueRef};
use sqlx::query::Query;
use sqlx::{Column as SqlxColumn, Executor, Postgres, Row as SqlxRow, TypeInfo, ValueRef};
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum number of connection retry attempts.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts (doubles each retry).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// PostgreSQL database client.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Connects with bounded exponential backoff on transient failures.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let mut last_error = None;
        let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 1..=MAX_RETRY_ATTEMPTS {
            debug!("Connection attempt {} of {}", attempt, MAX_RETRY_ATTEMPTS);

            let result = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(10))
                .connect(&config.url)
                .await;

            match result {
                Ok(pool) => {
                    debug!("Successfully connected to database");
                    return Ok(Self { pool });
                }
                Err(e) => {
                    let is_transient = is_transient_error(&e);
                    last_error = Some(e);

                    if !is_transient {
                        break;
                    }
                    if attempt < MAX_RETRY_ATTEMPTS {
                        warn!(
                            "Connection attempt {} failed (transient error), retrying in {:?}",
                            attempt, delay
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2; // Exponential backoff
                    }
                }
            }
        }

        Err(match last_error {
            Some(e) => map_connection_error(e, config),
            None => CatalogError::connection("no connection attempt was made"),
        })
    }

    async fn fetch_column_metadata(&self, sql: &str) -> Vec<ColumnInfo> {
        match (&self.pool).describe(sql).await {
            Ok(described) => described
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            Err(e) => {
                debug!("Could not describe empty result: {e}");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    fn placeholder_style(&self) -> PlaceholderStyle {
        PlaceholderStyle::Dollar
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

        // Column metadata comes from the first row; an empty result needs a describe round trip
        let columns: Vec<ColumnInfo> = match result.first() {
            Some(first_row) => first_row
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            None => self.fetch_column_metadata(&query.text).await,
        };

        let rows = result.iter().map(convert_row).collect::<Result<Vec<Row>>>()?;
        Ok(ResultSet::with_data(columns, rows))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Attaches one bound value to a statement.
fn bind_value<'q>(
    statement: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => statement.bind(None::<String>),
        Value::Bool(b) => statement.bind(*b),
        Value::Int(i) => statement.bind(*i),
        Value::Float(f) => statement.bind(*f),
        Value::String(s) => statement.bind(s.clone()),
        Value::Date(d) => statement.bind(*d),
        Value::Timestamp(ts) => statement.bind(*ts),
        Value::TimestampTz(ts) => statement.bind(*ts),
        // Only read back from rows; the binder turns numeric input into floats
        Value::Numeric(n) => statement.bind(n.clone()),
        Value::Bytes(b) => statement.bind(b.clone()),
    }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Result<Row> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| convert_value(row, i, col.name(), col.type_info().name()))
        .collect()
}

/// Converts a single column value from a PgRow to our Value type.
///
/// A value that cannot be decoded fails the query rather than turning into NULL.
fn convert_value(row: &PgRow, index: usize, column: &str, type_name: &str) -> Result<Value> {
    let raw = row
        .try_get_raw(index)
        .map_err(|e| decode_error(column, type_name, e))?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let decoded = match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => row.try_get::<bool, _>(index).map(Value::Bool),
        "INT2" | "SMALLINT" => row.try_get::<i16, _>(index).map(|v| Value::Int(v.into())),
        "INT4" | "INT" | "INTEGER" => row.try_get::<i32, _>(index).map(|v| Value::Int(v.into())),
        "INT8" | "BIGINT" => row.try_get::<i64, _>(index).map(Value::Int),
        "FLOAT4" | "REAL" => row.try_get::<f32, _>(index).map(|v| Value::Float(v.into())),
        "FLOAT8" | "DOUBLE PRECISION" => row.try_get::<f64, _>(index).map(Value::Float),
        "NUMERIC" | "DECIMAL" => {
            return numeric_value(&raw)
                .ok_or_else(|| decode_error(column, type_name, "malformed NUMERIC value"));
        }
        "DATE" => row.try_get::<NaiveDate, _>(index).map(Value::Date),
        "TIMESTAMP" => row.try_get::<NaiveDateTime, _>(index).map(Value::Timestamp),
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(index)
            .map(Value::TimestampTz),
        "JSON" | "JSONB" => row
            .try_get::<serde_json::Value, _>(index)
            .map(|v| Value::String(v.to_string())),
        "BYTEA" => row.try_get::<Vec<u8>, _>(index).map(Value::Bytes),

        // Text-like types; anything else has to be cast in the template
        _ => row.try_get::<String, _>(index).map(Value::String),
    };

    decoded.map_err(|e| decode_error(column, type_name, e))
}

fn decode_error(column: &str, type_name: &str, error: impl std::fmt::Display) -> CatalogError {
    CatalogError::query(format!(
        "Cannot decode column '{column}' of type {type_name}: {error}. \
         Cast it to a supported type (e.g. ::text) in the template"
    ))
}

fn numeric_value(raw: &PgValueRef<'_>) -> Option<Value> {
    let text = match raw.format() {
        PgValueFormat::Text => raw.as_str().ok()?.to_string(),
        PgValueFormat::Binary => numeric_text(raw.as_bytes().ok()?)?,
    };
    Some(Value::Numeric(text))
}

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Renders the binary NUMERIC wire format as decimal text.
///
/// Layout: ndigits, weight, sign, dscale (all 16-bit big-endian), then
/// `ndigits` base-10000 digits. The first digit is worth `10000^weight`.
fn numeric_text(bytes: &[u8]) -> Option<String> {
    let word = |i: usize| -> Option<i16> {
        bytes
            .get(i * 2..i * 2 + 2)
            .map(|b| i16::from_be_bytes([b[0], b[1]]))
    };

    let ndigits = usize::try_from(word(0)?).ok()?;
    let weight = i32::from(word(1)?);
    let sign = word(2)? as u16;
    let dscale = usize::from(word(3)? as u16);
    if bytes.len() < 8 + ndigits * 2 {
        return None;
    }

    match sign {
        NUMERIC_NAN => return Some("NaN".to_string()),
        NUMERIC_PINF => return Some("Infinity".to_string()),
        NUMERIC_NINF => return Some("-Infinity".to_string()),
        _ => {}
    }

    let digit = |i: i32| -> i16 {
        match usize::try_from(i) {
            Ok(i) if i < ndigits => word(4 + i).unwrap_or(0),
            _ => 0,
        }
    };

    let mut text = String::new();
    if sign == NUMERIC_NEG {
        text.push('-');
    }

    if weight < 0 {
        text.push('0');
    } else {
        text.push_str(&digit(0).to_string());
        for i in 1..=weight {
            text.push_str(&format!("{:04}", digit(i)));
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut i = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", digit(i)));
            i += 1;
        }
        fraction.truncate(dscale);
        text.push('.');
        text.push_str(&fraction);
    }

    Some(text)
}

/// Determines if an error is transient and worth retrying.
fn is_transient_error(error: &sqlx::Error) -> bool {
    if matches!(error, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) {
        return true;
    }

    let error_str = error.to_string().to_lowercase();
    error_str.contains("connection refused")
        || error_str.contains("timed out")
        || error_str.contains("temporarily unavailable")
        || error_str.contains("connection reset")
        || error_str.contains("broken pipe")
}

/// Maps sqlx connection errors to user-facing messages without leaking the password.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> CatalogError {
    let target = config.display_string();
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        CatalogError::connection(format!(
            "Cannot connect to {target}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        CatalogError::connection(format!("Authentication failed for {target}."))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        CatalogError::connection(format!("Database in {target} does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        CatalogError::connection(format!(
            "Connection to {target} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        CatalogError::connection(error.to_string())
    }
}

/// Formats a query error, keeping the server message and any detail or hint.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from("ERROR: ");
    result.push_str(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
        if let Some(table) = pg_error.table() {
            result.push_str("\n  TABLE: ");
            result.push_str(table);
        }
        if let Some(column) = pg_error.column() {
            result.push_str("\n  COLUMN: ");
            result.push_str(column);
        }
    }

    result
}
