//! Integration tests for the query catalog.
//!
//! Shared fixtures: the bundled Yelp catalog and a small seeded SQLite copy
//! of its tables.

pub mod catalog_test;
pub mod postgres_test;
pub mod sqlite_test;

use std::path::PathBuf;
use std::sync::Arc;

use query_catalog::db::SqliteClient;
use query_catalog::TemplateStore;

/// Path to the catalog shipped with the crate.
pub fn yelp_catalog_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("catalogs/yelp.toml")
}

/// Loads the bundled catalog into a shared store.
pub fn yelp_store() -> Arc<TemplateStore> {
    Arc::new(TemplateStore::load_files(&[yelp_catalog_path()]).expect("bundled catalog loads"))
}

const SEED: &str = r#"
CREATE TABLE business (
    business_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    address TEXT,
    city TEXT NOT NULL,
    state TEXT NOT NULL,
    stars REAL NOT NULL,
    review_count INTEGER NOT NULL,
    is_open INTEGER NOT NULL
);

CREATE TABLE users (
    user_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    review_count INTEGER NOT NULL
);

CREATE TABLE review (
    review_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users (user_id),
    business_id TEXT NOT NULL REFERENCES business (business_id),
    stars INTEGER NOT NULL,
    useful INTEGER NOT NULL,
    date TEXT NOT NULL
);

CREATE TABLE saas_metrics (
    plan TEXT NOT NULL,
    month TEXT NOT NULL,
    mrr REAL NOT NULL,
    active_customers INTEGER NOT NULL
);

INSERT INTO business VALUES
    ('b1', 'Desert Diner', '1 Main St', 'Phoenix', 'AZ', 4.5, 120, 1),
    ('b2', 'Cactus Cafe', '2 Main St', 'Phoenix', 'AZ', 3.5, 40, 1),
    ('b3', 'Closed Grill', '3 Main St', 'Phoenix', 'AZ', 5.0, 10, 0),
    ('b4', 'Strip Steakhouse', '4 Blvd', 'Las Vegas', 'NV', 4.0, 300, 1),
    ('b5', 'Tempe Tacos', '5 Mill Ave', 'Tempe', 'AZ', 4.0, 75, 1);

INSERT INTO users VALUES
    ('u1', 'Alice', 812),
    ('u2', 'Bob', 97),
    ('u3', 'Carmen', 55),
    ('u4', 'Dev', 12);

INSERT INTO review VALUES
    ('r1', 'u1', 'b1', 5, 10, '2019-03-01'),
    ('r2', 'u2', 'b1', 4, 3, '2017-06-15'),
    ('r3', 'u3', 'b2', 3, 7, '2018-11-20'),
    ('r4', 'u1', 'b4', 4, 1, '2020-01-05'),
    ('r5', 'u4', 'b1', 2, 0, '2016-02-29');

INSERT INTO saas_metrics VALUES
    ('pro', '2023-01-01', 12000.0, 40),
    ('pro', '2023-02-01', 12500.0, 42),
    ('pro', '2023-03-01', 13100.0, 44),
    ('basic', '2023-01-01', 3000.0, 100);
"#;

/// Opens an in-memory SQLite database seeded with the Yelp tables.
pub async fn seeded_sqlite() -> SqliteClient {
    let client = SqliteClient::in_memory().await.expect("in-memory sqlite opens");
    client.execute_script(SEED).await.expect("seed script runs");
    client
}
