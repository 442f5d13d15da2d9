//! Parameter binding.
//!
//! Turns a template plus caller values into a [`BoundQuery`]: the query text
//! carries only native markers and the values travel separately, so a value
//! can change what the query reads but never the query's structure.

use std::collections::BTreeMap;

use tracing::debug;

use crate::catalog::QueryTemplate;
use crate::db::{PlaceholderStyle, Value};
use crate::error::{CatalogError, Result};

/// Caller-supplied values for one invocation, keyed by parameter name.
pub type ParameterBinding = BTreeMap<String, Value>;

/// A query ready for a backend's parameterized execution.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    /// Query text with native markers only.
    pub text: String,
    /// One value per marker slot, in slot order.
    pub values: Vec<Value>,
}

/// Validates values against a template and binds them.
#[derive(Debug, Clone, Copy)]
pub struct ParameterBinder {
    style: PlaceholderStyle,
}

impl ParameterBinder {
    /// Creates a binder producing markers in the given style.
    pub fn new(style: PlaceholderStyle) -> Self {
        Self { style }
    }

    /// Binds `values` to `template`.
    ///
    /// Checks run in a fixed order: missing parameters, then undeclared
    /// keys, then type coercion in declaration order.
    pub fn bind(&self, template: &QueryTemplate, values: &ParameterBinding) -> Result<BoundQuery> {
        if let Some(missing) = template
            .params()
            .iter()
            .find(|p| p.is_required() && !values.contains_key(&p.name))
        {
            return Err(CatalogError::MissingParameter {
                template: template.name().to_string(),
                parameter: missing.name.clone(),
            });
        }

        if let Some(unknown) = values.keys().find(|k| template.param(k).is_none()) {
            return Err(CatalogError::UnknownParameter {
                template: template.name().to_string(),
                parameter: unknown.clone(),
            });
        }

        let mut resolved: BTreeMap<&str, Value> = BTreeMap::new();
        for param in template.params() {
            let value = match values.get(&param.name) {
                Some(supplied) => {
                    param
                        .param_type
                        .coerce(supplied)
                        .ok_or_else(|| CatalogError::TypeMismatch {
                            parameter: param.name.clone(),
                            expected: param.param_type.to_string(),
                            actual: describe(supplied),
                        })?
                }
                // Defaults were coerced when the template was built
                None => match &param.default {
                    Some(default) => default.clone(),
                    None => continue,
                },
            };
            resolved.insert(param.name.as_str(), value);
        }

        let rendered = template.render(self.style);
        let values = rendered
            .slots
            .iter()
            .map(|slot| {
                resolved.get(slot.as_str()).cloned().ok_or_else(|| {
                    CatalogError::invalid_template(
                        template.name(),
                        format!("placeholder '{slot}' has no value"),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            template = template.name(),
            slots = values.len(),
            "Bound query parameters"
        );

        Ok(BoundQuery {
            text: rendered.text,
            values,
        })
    }
}

/// Describes a rejected value without echoing long text back.
fn describe(value: &Value) -> String {
    match value {
        Value::String(s) if s.chars().count() <= 32 => format!("string '{s}'"),
        other => other.kind().to_string(),
    }
}
