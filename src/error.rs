use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors. Load and shape errors happen before any output is written.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Shape(#[from] SchemaShapeError),
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The document could not be read, fetched or parsed.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{origin} is not valid JSON: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{origin} is not valid YAML: {source}")]
    Yaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// The document parsed but does not have the shape of an OpenAPI v3 document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaShapeError {
    #[error("document root is not a JSON object (found {0})")]
    NotAnObject(&'static str),
    #[error("document is missing required key `{0}`")]
    MissingKey(&'static str),
    #[error("`{key}` must be a JSON object (found {found})")]
    WrongType {
        key: &'static str,
        found: &'static str,
    },
    #[error("unsupported document version `{0}`, only OpenAPI 3.x is supported")]
    UnsupportedVersion(String),
}

/// A single schema could not be translated. Never fatal: the offending node
/// renders as `any` and a warning is collected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("unsupported $ref `{0}` (only #/components/schemas/* is resolved)")]
    UnsupportedRef(String),
    #[error("schema is not a JSON object (found {0})")]
    NotAnObject(&'static str),
}
