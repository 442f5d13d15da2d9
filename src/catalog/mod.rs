//! Query catalog: templates, the store that holds them, and catalog files.

pub mod loader;
mod store;
mod template;

pub use store::TemplateStore;
pub use template::{ParamDecl, ParamType, QueryTemplate, RenderedSql};
