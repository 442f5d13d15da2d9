//! Catalog loading integration tests.
//!
//! Loads the bundled catalog from disk and checks what the store exposes.

use super::{yelp_catalog_path, yelp_store};
use pretty_assertions::assert_eq;
use query_catalog::catalog::loader;
use query_catalog::db::PlaceholderStyle;
use query_catalog::{CatalogError, ParamType, TemplateStore, Value};
use std::io::Write;

#[test]
fn test_bundled_catalog_loads() {
    let store = yelp_store();

    assert_eq!(
        store.names(),
        vec![
            "business_reviews",
            "businesses_by_state",
            "businesses_in_city",
            "mrr_by_plan",
            "reviews_since",
            "top_reviewers",
        ]
    );
    assert!(store.iter().all(|t| t.description().is_some()));
}

#[test]
fn test_bundled_template_params() {
    let store = yelp_store();

    let top = store.get("top_reviewers").unwrap();
    assert_eq!(top.placeholders(), vec!["min_review_count", "limit"]);
    assert_eq!(top.param("min_review_count").unwrap().default, Some(Value::Int(50)));

    let city = store.get("businesses_in_city").unwrap();
    assert!(city.param("city").unwrap().is_required());
    assert_eq!(city.param("min_stars").unwrap().param_type, ParamType::Float);

    let mrr = store.get("mrr_by_plan").unwrap();
    assert_eq!(
        mrr.param("plan").unwrap().param_type.to_string(),
        "enum(basic|pro|enterprise)"
    );
}

#[test]
fn test_bundled_templates_render_for_both_backends() {
    let store = yelp_store();
    let mrr = store.get("mrr_by_plan").unwrap();

    let dollar = mrr.render(PlaceholderStyle::Dollar);
    assert!(dollar.text.contains("m.plan = $1"));
    assert!(dollar.text.contains("m.month <= $3"));

    let question = mrr.render(PlaceholderStyle::Question);
    assert!(!question.text.contains('$'));
    assert_eq!(question.slots, vec!["plan", "start_month", "end_month"]);
}

#[test]
fn test_duplicate_across_files_is_rejected() {
    let mut extra = tempfile::NamedTempFile::new().unwrap();
    extra
        .write_all(
            br#"
[[templates]]
name = "top_reviewers"
sql = "SELECT user_id FROM users"
"#,
        )
        .unwrap();

    let err = TemplateStore::load_files(&[yelp_catalog_path(), extra.path().to_path_buf()])
        .unwrap_err();
    assert!(matches!(err, CatalogError::DuplicateTemplate(ref name) if name == "top_reviewers"));
}

#[test]
fn test_writing_template_is_rejected_on_load() {
    let err = loader::parse_catalog(
        r#"
[[templates]]
name = "purge_reviews"
sql = "DELETE FROM review WHERE stars < {{min_stars}}"

[[templates.params]]
name = "min_stars"
type = "int"
"#,
        "inline",
    )
    .unwrap_err();

    assert!(matches!(
        err,
        CatalogError::InvalidTemplate { ref template, .. } if template == "purge_reviews"
    ));
}

#[test]
fn test_undeclared_placeholder_is_rejected_on_load() {
    let err = loader::parse_catalog(
        r#"
[[templates]]
name = "by_city"
sql = "SELECT name FROM business WHERE city = {{city}}"
"#,
        "inline",
    )
    .unwrap_err();

    assert!(matches!(
        err,
        CatalogError::InvalidTemplate { ref reason, .. } if reason.contains("city")
    ));
}
