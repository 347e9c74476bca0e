//! Markdown documentation for OpenAPI v3 documents.
//!
//! The pipeline runs in one direction: [`loader`] produces an
//! [`OpenApiDocument`], [`schema`] and [`endpoints`] read it, [`interface`]
//! renders schema declarations and [`markdown`] assembles the pages.
//! [`generator::generate`] drives all of it in memory before anything is
//! written.

pub mod diagnostics;
pub mod document;
pub mod endpoints;
pub mod error;
pub mod generator;
pub mod interface;
pub mod loader;
pub mod markdown;
pub mod schema;

pub use diagnostics::{Diagnostics, Warning};
pub use document::OpenApiDocument;
pub use error::{Error, LoadError, SchemaError, SchemaShapeError};
pub use generator::{generate, GeneratedDocs, GeneratorOptions};
pub use loader::{load, LoadOptions, Source};
