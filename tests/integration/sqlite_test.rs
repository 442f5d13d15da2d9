//! End-to-end tests against a seeded in-memory SQLite database.

use std::time::Duration;

use super::{seeded_sqlite, yelp_store};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use query_catalog::adapter::ExecutionAdapter;
use query_catalog::db::{DatabaseClient, SqliteClient};
use query_catalog::{BoundQuery, CatalogError, CatalogRunner, ParameterBinding, Value};

const TIMEOUT: Duration = Duration::from_secs(5);

async fn runner() -> CatalogRunner {
    let client = seeded_sqlite().await;
    CatalogRunner::new(yelp_store(), ExecutionAdapter::new(Box::new(client)))
}

fn binding(pairs: &[(&str, Value)]) -> ParameterBinding {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[tokio::test]
async fn test_top_reviewers() {
    let runner = runner().await;

    let result = runner
        .run(
            "top_reviewers",
            &binding(&[("min_review_count", Value::Int(50))]),
            TIMEOUT,
        )
        .await
        .unwrap();

    assert_eq!(result.column_names(), vec!["user_id", "name", "review_count"]);
    assert_eq!(
        result.rows,
        vec![
            vec![Value::from("u1"), Value::from("Alice"), Value::Int(812)],
            vec![Value::from("u2"), Value::from("Bob"), Value::Int(97)],
            vec![Value::from("u3"), Value::from("Carmen"), Value::Int(55)],
        ]
    );
    runner.close().await.unwrap();
}

#[tokio::test]
async fn test_defaults_and_limit() {
    let runner = runner().await;

    let result = runner
        .run(
            "top_reviewers",
            &binding(&[("min_review_count", Value::Int(0)), ("limit", Value::from("2"))]),
            TIMEOUT,
        )
        .await
        .unwrap();
    assert_eq!(result.row_count(), 2);
}

#[tokio::test]
async fn test_businesses_in_city_filters_closed() {
    let runner = runner().await;

    let result = runner
        .run(
            "businesses_in_city",
            &binding(&[("city", Value::from("Phoenix"))]),
            TIMEOUT,
        )
        .await
        .unwrap();

    let ids: Vec<Value> = result.rows.iter().map(|row| row[0].clone()).collect();
    assert_eq!(ids, vec![Value::from("b1"), Value::from("b2")]);
    assert_eq!(result.rows[0][2], Value::Float(4.5));
}

#[tokio::test]
async fn test_businesses_by_state() {
    let runner = runner().await;

    let result = runner
        .run("businesses_by_state", &binding(&[("state", Value::from("AZ"))]), TIMEOUT)
        .await
        .unwrap();

    assert_eq!(result.column_names(), vec!["city", "businesses", "avg_stars"]);
    assert_eq!(result.rows[0][0], Value::from("Phoenix"));
    assert_eq!(result.rows[0][1], Value::Int(3));
    assert_eq!(result.rows[1][0], Value::from("Tempe"));
}

#[tokio::test]
async fn test_reviews_since_binds_date() {
    let runner = runner().await;

    let result = runner
        .run(
            "reviews_since",
            &binding(&[("since", Value::from("2018-01-01"))]),
            TIMEOUT,
        )
        .await
        .unwrap();

    let total: i64 = result
        .rows
        .iter()
        .map(|row| match row[1] {
            Value::Int(n) => n,
            ref other => panic!("Expected Int count, got {other:?}"),
        })
        .sum();
    assert_eq!(total, 3);
}

#[tokio::test]
async fn test_join_template() {
    let runner = runner().await;

    let result = runner
        .run(
            "business_reviews",
            &binding(&[("business_id", Value::from("b1")), ("limit", Value::Int(2))]),
            TIMEOUT,
        )
        .await
        .unwrap();

    assert_eq!(
        result.column_names(),
        vec!["review_id", "reviewer", "stars", "useful", "date"]
    );
    assert_eq!(result.rows[0][0], Value::from("r1"));
    assert_eq!(result.rows[0][1], Value::from("Alice"));
    assert_eq!(result.row_count(), 2);
}

#[tokio::test]
async fn test_mrr_by_plan_range() {
    let runner = runner().await;

    let result = runner
        .run(
            "mrr_by_plan",
            &binding(&[
                ("plan", Value::from("pro")),
                (
                    "start_month",
                    Value::Date(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()),
                ),
                ("end_month", Value::from("2023-02-01")),
            ]),
            TIMEOUT,
        )
        .await
        .unwrap();

    assert_eq!(result.row_count(), 2);
    assert_eq!(result.rows[1][1], Value::Float(12500.0));
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let runner = runner().await;

    let result = runner
        .run(
            "businesses_in_city",
            &binding(&[("city", Value::from("Nowhere"))]),
            TIMEOUT,
        )
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(
        result.column_names(),
        vec!["business_id", "name", "stars", "review_count"]
    );
}

#[tokio::test]
async fn test_hostile_value_matches_nothing_and_drops_nothing() {
    let runner = runner().await;
    let hostile = "Phoenix'; DROP TABLE business; --";

    let result = runner
        .run("businesses_in_city", &binding(&[("city", Value::from(hostile))]), TIMEOUT)
        .await
        .unwrap();
    assert!(result.is_empty());

    let still_there = runner
        .run("businesses_in_city", &binding(&[("city", Value::from("Phoenix"))]), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(still_there.row_count(), 2);
}

#[tokio::test]
async fn test_missing_table_is_backend_error() {
    let client = SqliteClient::in_memory().await.unwrap();
    let runner = CatalogRunner::new(yelp_store(), ExecutionAdapter::new(Box::new(client)));

    let err = runner
        .run("top_reviewers", &ParameterBinding::new(), TIMEOUT)
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::BackendQuery(ref msg) if msg.contains("users")));
}

#[tokio::test]
async fn test_row_cap_truncates() {
    let client = seeded_sqlite().await;
    let runner = CatalogRunner::new(
        yelp_store(),
        ExecutionAdapter::new(Box::new(client)).with_max_rows(1),
    );

    let result = runner
        .run(
            "top_reviewers",
            &binding(&[("min_review_count", Value::Int(0))]),
            TIMEOUT,
        )
        .await
        .unwrap();

    assert_eq!(result.row_count(), 1);
    assert_eq!(result.total_rows, 4);
    assert_eq!(
        result.truncation_warning().as_deref(),
        Some("Result truncated: showing 1 of 4 rows")
    );
}

#[tokio::test]
async fn test_client_executes_bound_query_directly() {
    let client = seeded_sqlite().await;

    let result = client
        .execute_query(&BoundQuery {
            text: "SELECT name FROM users WHERE review_count BETWEEN ? AND ? ORDER BY name"
                .to_string(),
            values: vec![Value::Int(50), Value::Int(100)],
        })
        .await
        .unwrap();

    assert_eq!(
        result.rows,
        vec![vec![Value::from("Bob")], vec![Value::from("Carmen")]]
    );
    client.close().await.unwrap();
}
