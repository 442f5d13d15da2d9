//! PostgreSQL integration tests.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL environment variable to run them.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use query_catalog::adapter::ExecutionAdapter;
use query_catalog::config::ConnectionConfig;
use query_catalog::db::{self, PlaceholderStyle};
use query_catalog::{
    CatalogError, CatalogRunner, ParamDecl, ParamType, ParameterBinding, QueryTemplate,
    TemplateStore, Value,
};

/// Helper to get test database URL from environment.
fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| url.starts_with("postgres"))
}

fn store() -> Arc<TemplateStore> {
    let echo = QueryTemplate::new(
        "echo",
        "SELECT CAST({{n}} AS BIGINT) AS n, CAST({{label}} AS TEXT) AS label, \
         CAST({{day}} AS DATE) AS day, CAST({{n}} AS BIGINT) * 2 AS doubled",
        vec![
            ParamDecl::new("n", ParamType::Int),
            ParamDecl::new("label", ParamType::String),
            ParamDecl::new("day", ParamType::Date),
        ],
    )
    .unwrap();
    let sleepy = QueryTemplate::new(
        "sleepy",
        "SELECT 1 AS done FROM pg_sleep({{seconds}})",
        vec![ParamDecl::new("seconds", ParamType::Float)],
    )
    .unwrap();
    let typed = QueryTemplate::new(
        "typed_columns",
        "SELECT AVG(n) AS avg_n, \
         CAST('2019-03-01 10:00:00' AS TIMESTAMP) AS at_local, \
         CAST('2019-03-01 10:00:00+00' AS TIMESTAMPTZ) AS at_utc, \
         CAST(12000.50 AS NUMERIC) AS mrr, \
         CAST(-0.05 AS NUMERIC(10, 4)) AS delta, \
         CAST('{\"plan\": \"pro\"}' AS JSONB) AS meta \
         FROM (VALUES (1), (2)) AS g(n)",
        vec![],
    )
    .unwrap();
    let uuid = QueryTemplate::new(
        "uuid_column",
        "SELECT CAST('a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11' AS UUID) AS id",
        vec![],
    )
    .unwrap();
    Arc::new(TemplateStore::from_templates(vec![echo, sleepy, typed, uuid]).unwrap())
}

/// Helper to create a test runner.
async fn get_test_runner() -> Option<CatalogRunner> {
    let url = get_test_database_url()?;
    let config = ConnectionConfig::from_url(&url).ok()?;
    let client = db::connect(&config).await.ok()?;
    Some(CatalogRunner::new(store(), ExecutionAdapter::new(client)))
}

fn binding(pairs: &[(&str, Value)]) -> ParameterBinding {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn test_postgres_round_trip_of_bound_values() {
    let Some(runner) = get_test_runner().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let hostile = "x'); DROP TABLE users; --";
    let result = runner
        .run(
            "echo",
            &binding(&[
                ("n", Value::Int(21)),
                ("label", Value::from(hostile)),
                ("day", Value::from("2019-06-01")),
            ]),
            Duration::from_secs(10),
        )
        .await
        .unwrap();

    assert_eq!(result.column_names(), vec!["n", "label", "day", "doubled"]);
    assert_eq!(
        result.rows[0],
        vec![
            Value::Int(21),
            Value::from(hostile),
            Value::Date(NaiveDate::from_ymd_opt(2019, 6, 1).unwrap()),
            Value::Int(42),
        ]
    );

    runner.close().await.unwrap();
}

#[tokio::test]
async fn test_postgres_timeout() {
    let Some(runner) = get_test_runner().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let started = Instant::now();
    let err = runner
        .run(
            "sleepy",
            &binding(&[("seconds", Value::Float(10.0))]),
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::BackendTimeout(_)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_postgres_uses_dollar_markers() {
    let Some(url) = get_test_database_url() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let config = ConnectionConfig::from_url(&url).unwrap();
    assert_eq!(
        config.backend().unwrap().placeholder_style(),
        PlaceholderStyle::Dollar
    );
}

#[tokio::test]
async fn test_postgres_decodes_numeric_and_timestamps() {
    let Some(runner) = get_test_runner().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let result = runner
        .run("typed_columns", &ParameterBinding::new(), Duration::from_secs(10))
        .await
        .unwrap();
    let row = &result.rows[0];

    match &row[0] {
        Value::Numeric(avg) => assert!(avg.starts_with("1.5"), "unexpected avg {avg}"),
        other => panic!("Expected Numeric, got {other:?}"),
    }
    let at = NaiveDate::from_ymd_opt(2019, 3, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    assert_eq!(row[1], Value::Timestamp(at));
    assert_eq!(row[2], Value::TimestampTz(at.and_utc()));
    assert_eq!(row[3], Value::Numeric("12000.50".to_string()));
    assert_eq!(row[4], Value::Numeric("-0.0500".to_string()));
    assert_eq!(row[5], Value::from(r#"{"plan":"pro"}"#));

    runner.close().await.unwrap();
}

#[tokio::test]
async fn test_postgres_undecodable_column_is_query_error() {
    let Some(runner) = get_test_runner().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let err = runner
        .run("uuid_column", &ParameterBinding::new(), Duration::from_secs(10))
        .await
        .unwrap_err();

    assert!(
        matches!(err, CatalogError::BackendQuery(ref msg) if msg.contains("Cannot decode column 'id'")),
        "unexpected error {err:?}"
    );
}
