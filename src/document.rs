use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::SchemaShapeError;

/// `info` section of the document. Every field is optional here since only
/// the index page uses it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A tag declared in the top-level `tags` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Root of a loaded OpenAPI v3 document. Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenApiDocument {
    pub openapi: Option<String>,
    pub info: ApiInfo,
    pub tags: Vec<TagInfo>,
    pub paths: Map<String, Value>,
    pub components: Map<String, Value>,
    pub schemas: Map<String, Value>,
}

impl OpenApiDocument {
    /// Validates the top-level shape and splits the document into its parts.
    pub fn from_value(value: Value) -> Result<Self, SchemaShapeError> {
        let mut root = match value {
            Value::Object(root) => root,
            other => return Err(SchemaShapeError::NotAnObject(value_kind(&other))),
        };

        if let Some(swagger) = root.get("swagger") {
            return Err(SchemaShapeError::UnsupportedVersion(display_scalar(swagger)));
        }
        let openapi = match root.get("openapi") {
            Some(Value::String(version)) if version.starts_with("3.") => Some(version.clone()),
            Some(other) => return Err(SchemaShapeError::UnsupportedVersion(display_scalar(other))),
            None => None,
        };

        let paths = take_object(&mut root, "paths", "paths")?;
        let mut components = take_object(&mut root, "components", "components")?;
        let schemas = take_object(&mut components, "schemas", "components.schemas")?;

        let info = match root.remove("info") {
            Some(info) => serde_json::from_value(info).unwrap_or_else(|err| {
                tracing::warn!("ignoring malformed `info`: {err}");
                ApiInfo::default()
            }),
            None => ApiInfo::default(),
        };

        let tags = match root.remove("tags") {
            Some(Value::Array(tags)) => tags
                .into_iter()
                .filter_map(|tag| match serde_json::from_value::<TagInfo>(tag) {
                    Ok(tag) => Some(tag),
                    Err(err) => {
                        tracing::warn!("ignoring malformed tag declaration: {err}");
                        None
                    }
                })
                .collect(),
            Some(_) => {
                tracing::warn!("ignoring `tags`: expected an array");
                Vec::new()
            }
            None => Vec::new(),
        };

        Ok(OpenApiDocument {
            openapi,
            info,
            tags,
            paths,
            components,
            schemas,
        })
    }

    /// Description of a tag declared in the top-level `tags` list.
    pub fn tag_description(&self, tag: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|declared| declared.name == tag)
            .and_then(|declared| declared.description.as_deref())
    }

    /// Resolves a local `#/components/<section>/<name>` reference.
    pub fn resolve_component(&self, section: &str, reference: &str) -> Option<&Value> {
        let name = reference
            .strip_prefix("#/components/")?
            .strip_prefix(section)?
            .strip_prefix('/')?;
        if name.contains('/') {
            return None;
        }
        self.components
            .get(section)?
            .as_object()?
            .get(&unescape_pointer(name))
    }
}

fn take_object(
    map: &mut Map<String, Value>,
    key: &str,
    display_key: &'static str,
) -> Result<Map<String, Value>, SchemaShapeError> {
    match map.remove(key) {
        Some(Value::Object(object)) => Ok(object),
        Some(other) => Err(SchemaShapeError::WrongType {
            key: display_key,
            found: value_kind(&other),
        }),
        None => Err(SchemaShapeError::MissingKey(display_key)),
    }
}

fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Decodes the `~1` and `~0` escapes of a JSON pointer segment.
pub(crate) fn unescape_pointer(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn splits_a_minimal_document() {
        let document = OpenApiDocument::from_value(json!({
            "openapi": "3.0.3",
            "info": { "title": "Pets", "version": "1.2.0" },
            "tags": [{ "name": "pets", "description": "Everything about pets" }],
            "paths": { "/pets": {} },
            "components": { "schemas": { "Pet": { "type": "object" } } }
        }))
        .unwrap();

        assert_eq!(document.openapi.as_deref(), Some("3.0.3"));
        assert_eq!(document.info.title.as_deref(), Some("Pets"));
        assert_eq!(document.tag_description("pets"), Some("Everything about pets"));
        assert_eq!(document.tag_description("owners"), None);
        assert!(document.paths.contains_key("/pets"));
        assert!(document.schemas.contains_key("Pet"));
    }

    #[test]
    fn rejects_missing_and_mistyped_keys() {
        assert_eq!(
            OpenApiDocument::from_value(json!({ "components": { "schemas": {} } })),
            Err(SchemaShapeError::MissingKey("paths"))
        );
        assert_eq!(
            OpenApiDocument::from_value(json!({ "paths": {} })),
            Err(SchemaShapeError::MissingKey("components"))
        );
        assert_eq!(
            OpenApiDocument::from_value(json!({ "paths": {}, "components": {} })),
            Err(SchemaShapeError::MissingKey("components.schemas"))
        );
        assert_eq!(
            OpenApiDocument::from_value(json!({ "paths": [], "components": { "schemas": {} } })),
            Err(SchemaShapeError::WrongType {
                key: "paths",
                found: "array"
            })
        );
        assert_eq!(
            OpenApiDocument::from_value(json!([1, 2])),
            Err(SchemaShapeError::NotAnObject("array"))
        );
    }

    #[test]
    fn rejects_non_v3_documents() {
        assert_eq!(
            OpenApiDocument::from_value(json!({ "swagger": "2.0", "paths": {} })),
            Err(SchemaShapeError::UnsupportedVersion("2.0".to_owned()))
        );
        assert_eq!(
            OpenApiDocument::from_value(json!({
                "openapi": "4.0.0",
                "paths": {},
                "components": { "schemas": {} }
            })),
            Err(SchemaShapeError::UnsupportedVersion("4.0.0".to_owned()))
        );
    }

    #[test]
    fn malformed_info_is_not_fatal() {
        let document = OpenApiDocument::from_value(json!({
            "info": { "title": 42 },
            "tags": "pets",
            "paths": {},
            "components": { "schemas": {} }
        }))
        .unwrap();
        assert_eq!(document.info, ApiInfo::default());
        assert!(document.tags.is_empty());
    }

    #[test]
    fn resolves_local_components() {
        let document = OpenApiDocument::from_value(json!({
            "paths": {},
            "components": {
                "schemas": {},
                "requestBodies": { "a/b": { "description": "escaped" } }
            }
        }))
        .unwrap();

        let body = document.resolve_component("requestBodies", "#/components/requestBodies/a~1b");
        assert_eq!(body, Some(&json!({ "description": "escaped" })));
        assert_eq!(
            document.resolve_component("responses", "#/components/requestBodies/a~1b"),
            None
        );
        assert_eq!(
            document.resolve_component("requestBodies", "other.json#/components/requestBodies/x"),
            None
        );
    }
}
