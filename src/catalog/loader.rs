//! Catalog file loading.
//!
//! Catalog files are TOML documents holding a `[[templates]]` array; each
//! template declares its parameters in a nested `[[templates.params]]` array.

use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use super::{ParamDecl, ParamType, QueryTemplate};
use crate::db::Value;
use crate::error::{CatalogError, Result};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    templates: Vec<TemplateDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateDef {
    name: String,
    #[serde(default)]
    description: Option<String>,
    sql: String,
    #[serde(default)]
    params: Vec<ParamDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParamDef {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    variants: Option<Vec<String>>,
    #[serde(default)]
    default: Option<toml::Value>,
}

/// Reads and validates every template in a catalog file.
pub fn load_file(path: &Path) -> Result<Vec<QueryTemplate>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CatalogError::config(format!("Failed to read catalog {}: {e}", path.display()))
    })?;

    let templates = parse_catalog(&content, &path.display().to_string())?;
    info!(
        "Loaded {} template(s) from {}",
        templates.len(),
        path.display()
    );
    Ok(templates)
}

/// Parses catalog TOML. `origin` names the source in error messages.
pub fn parse_catalog(content: &str, origin: &str) -> Result<Vec<QueryTemplate>> {
    let file: CatalogFile = toml::from_str(content).map_err(|e| {
        CatalogError::config(format!("Catalog error in {origin}:\n  {e}"))
    })?;

    file.templates.into_iter().map(build_template).collect()
}

fn build_template(def: TemplateDef) -> Result<QueryTemplate> {
    let params = def
        .params
        .into_iter()
        .map(|param| build_param(&def.name, param))
        .collect::<Result<Vec<_>>>()?;

    let template = QueryTemplate::new(def.name, def.sql, params)?;
    Ok(match def.description {
        Some(description) => template.with_description(description.trim()),
        None => template,
    })
}

fn build_param(template: &str, def: ParamDef) -> Result<ParamDecl> {
    let param_type = ParamType::parse(&def.kind, def.variants).map_err(|reason| {
        CatalogError::invalid_template(template, format!("parameter '{}': {reason}", def.name))
    })?;

    let mut decl = ParamDecl::new(def.name, param_type);
    if let Some(raw) = def.default {
        let value = toml_to_value(&raw).ok_or_else(|| {
            CatalogError::invalid_template(
                template,
                format!(
                    "default for '{}' must be a scalar, got {}",
                    decl.name,
                    raw.type_str()
                ),
            )
        })?;
        decl = decl.with_default(value);
    }
    Ok(decl)
}

/// Converts a TOML scalar. Bare TOML dates (`2019-01-01`) become dates.
fn toml_to_value(raw: &toml::Value) -> Option<Value> {
    match raw {
        toml::Value::String(s) => Some(Value::String(s.clone())),
        toml::Value::Integer(i) => Some(Value::Int(*i)),
        toml::Value::Float(f) => Some(Value::Float(*f)),
        toml::Value::Boolean(b) => Some(Value::Bool(*b)),
        toml::Value::Datetime(dt) if dt.time.is_none() && dt.offset.is_none() => {
            NaiveDate::parse_from_str(&dt.to_string(), "%Y-%m-%d")
                .ok()
                .map(Value::Date)
        }
        _ => None,
    }
}
