//! Query catalog - named, parameterized SQL templates with safe binding and execution.
//!
//! A run goes through four parts, each in its own module:
//! [`catalog::TemplateStore`] looks the template up, [`binder::ParameterBinder`]
//! validates and binds values, [`adapter::ExecutionAdapter`] executes against a
//! [`db::DatabaseClient`], and [`runner::CatalogRunner`] ties them together.

pub mod adapter;
pub mod binder;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod output;
pub mod runner;
pub mod safety;

pub use binder::{BoundQuery, ParameterBinding};
pub use catalog::{ParamDecl, ParamType, QueryTemplate, TemplateStore};
pub use db::{ResultSet, Value};
pub use error::{CatalogError, Result};
pub use runner::{CatalogRunner, RetryPolicy};
