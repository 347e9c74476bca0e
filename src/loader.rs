use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;

use crate::document::OpenApiDocument;
use crate::error::{Error, LoadError};

/// Where the document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    File(PathBuf),
}

impl Source {
    /// `http://` and `https://` sources are fetched, anything else is read
    /// from disk.
    pub fn parse(source: &str) -> Self {
        let lower = source.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Source::Url(source.to_owned())
        } else {
            Source::File(PathBuf::from(source))
        }
    }

    fn is_yaml(&self) -> bool {
        let path = match self {
            Source::Url(url) => {
                let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
                Path::new(&url[..end]).to_owned()
            }
            Source::File(path) => path.clone(),
        };
        path.extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| {
                extension.eq_ignore_ascii_case("yaml") || extension.eq_ignore_ascii_case("yml")
            })
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Url(url) => f.write_str(url),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Timeout of the single HTTP request.
    pub timeout: Duration,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            timeout: Duration::from_secs(30),
        }
    }
}

/// Reads or fetches `source` once, parses it and validates its shape.
pub fn load(source: &Source, options: &LoadOptions) -> Result<OpenApiDocument, Error> {
    let text = fetch(source, options)?;
    parse_document(source, &text)
}

/// Raw text of the document. No retries.
pub fn fetch(source: &Source, options: &LoadOptions) -> Result<String, LoadError> {
    match source {
        Source::File(path) => {
            tracing::debug!("reading {}", path.display());
            std::fs::read_to_string(path).map_err(|source| LoadError::Read {
                path: path.clone(),
                source,
            })
        }
        Source::Url(url) => {
            tracing::debug!("fetching {url} (timeout {:?})", options.timeout);
            let request_error = |source| LoadError::Request {
                url: url.clone(),
                source,
            };
            let client = reqwest::blocking::Client::builder()
                .timeout(options.timeout)
                .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(request_error)?;
            let response = client.get(url).send().map_err(request_error)?;
            let status = response.status();
            if status != reqwest::StatusCode::OK {
                return Err(LoadError::Status {
                    url: url.clone(),
                    status: status.as_u16(),
                });
            }
            response.text().map_err(request_error)
        }
    }
}

/// Parses the text as JSON whatever the content type, or as YAML when the
/// source name ends in `.yaml`/`.yml`, then validates the document shape.
pub fn parse_document(source: &Source, text: &str) -> Result<OpenApiDocument, Error> {
    let value: Value = if source.is_yaml() {
        serde_yaml::from_str(text).map_err(|err| LoadError::Yaml {
            origin: source.to_string(),
            source: err,
        })?
    } else {
        serde_json::from_str(text).map_err(|err| LoadError::Json {
            origin: source.to_string(),
            source: err,
        })?
    };
    Ok(OpenApiDocument::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::error::SchemaShapeError;

    const MINIMAL: &str = r#"{"openapi": "3.0.0", "paths": {}, "components": {"schemas": {}}}"#;

    #[test]
    fn classifies_sources() {
        assert_eq!(
            Source::parse("http://localhost:8000/openapi.json"),
            Source::Url("http://localhost:8000/openapi.json".to_owned())
        );
        assert_eq!(
            Source::parse("HTTPS://example.com/api"),
            Source::Url("HTTPS://example.com/api".to_owned())
        );
        assert_eq!(
            Source::parse("./openapi.json"),
            Source::File(PathBuf::from("./openapi.json"))
        );
    }

    #[test]
    fn yaml_is_chosen_by_extension() {
        assert!(Source::parse("spec.yaml").is_yaml());
        assert!(Source::parse("https://example.com/spec.YML?v=2").is_yaml());
        assert!(!Source::parse("spec.json").is_yaml());
        assert!(!Source::parse("https://example.com/openapi").is_yaml());
    }

    #[test]
    fn loads_a_local_file() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let source = Source::File(file.path().to_owned());
        let document = load(&source, &LoadOptions::default()).unwrap();
        assert_eq!(document.openapi.as_deref(), Some("3.0.0"));
    }

    #[test]
    fn loads_yaml_files() {
        let source = Source::parse("openapi.yaml");
        let document = parse_document(
            &source,
            "openapi: 3.1.0\npaths: {}\ncomponents:\n  schemas:\n    Pet:\n      type: object\n",
        )
        .unwrap();
        assert!(document.schemas.contains_key("Pet"));
    }

    #[test]
    fn missing_files_are_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let source = Source::File(dir.path().join("missing.json"));
        let err = load(&source, &LoadOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Load(LoadError::Read { .. })), "{err:?}");
    }

    #[test]
    fn invalid_json_names_the_source() {
        let source = Source::parse("broken.json");
        let err = parse_document(&source, "{ not json").unwrap_err();
        assert!(matches!(err, Error::Load(LoadError::Json { .. })), "{err:?}");
        assert!(err.to_string().starts_with("broken.json is not valid JSON"));
    }

    #[test]
    fn shape_is_validated_after_parsing() {
        let source = Source::parse("spec.json");
        let err = parse_document(&source, r#"{"paths": {}}"#).unwrap_err();
        assert!(matches!(
            err,
            Error::Shape(SchemaShapeError::MissingKey("components"))
        ));
    }
}
