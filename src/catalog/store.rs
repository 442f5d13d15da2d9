//! In-memory template store.
//!
//! Populated once at startup through `&mut self`, then shared read-only
//! (typically behind an `Arc`) by every runner.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use super::loader;
use super::QueryTemplate;
use crate::error::{CatalogError, Result};

/// Holds the fixed set of named templates.
#[derive(Debug, Default)]
pub struct TemplateStore {
    templates: BTreeMap<String, QueryTemplate>,
}

impl TemplateStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from templates, failing on the first duplicate name.
    pub fn from_templates(templates: impl IntoIterator<Item = QueryTemplate>) -> Result<Self> {
        let mut store = Self::new();
        for template in templates {
            store.register(template)?;
        }
        Ok(store)
    }

    /// Builds a store from one or more catalog files.
    pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut store = Self::new();
        for path in paths {
            for template in loader::load_file(path.as_ref())? {
                store.register(template)?;
            }
        }
        Ok(store)
    }

    /// Adds a template. Names are unique across the store.
    pub fn register(&mut self, template: QueryTemplate) -> Result<()> {
        if self.templates.contains_key(template.name()) {
            return Err(CatalogError::DuplicateTemplate(template.name().to_string()));
        }
        debug!(template = template.name(), "Registered template");
        self.templates.insert(template.name().to_string(), template);
        Ok(())
    }

    /// Looks up a template by name.
    pub fn get(&self, name: &str) -> Result<&QueryTemplate> {
        self.templates
            .get(name)
            .ok_or_else(|| CatalogError::UnknownTemplate(name.to_string()))
    }

    /// Template names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.templates.keys().map(String::as_str).collect()
    }

    /// Iterates templates in name order.
    pub fn iter(&self) -> impl Iterator<Item = &QueryTemplate> {
        self.templates.values()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
