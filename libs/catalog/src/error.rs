//! Catalog error types.

use thiserror::Error;

use crate::Template;

/// Errors raised while resolving templates and positions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The birth year falls outside every template's range.
    #[error("unsupported birth year: {year}")]
    UnsupportedBirthYear { year: i32 },

    /// The position label matched no canonical key or alias.
    #[error("invalid position '{input}' for template {template}")]
    InvalidPosition { input: String, template: Template },
}
