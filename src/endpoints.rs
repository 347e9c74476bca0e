use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

use crate::diagnostics::Diagnostics;
use crate::document::OpenApiDocument;
use crate::schema::{SchemaModel, SchemaNode};

/// Group of operations without any tag.
pub const UNTAGGED: &str = "untagged";

const JSON_MEDIA_TYPE: &str = "application/json";

/// One method of one path.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// Upper case, e.g. `GET`.
    pub method: String,
    pub path: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub deprecated: bool,
    /// Schema of the `application/json` request body.
    pub request_body: Option<SchemaNode>,
    /// Status code to `application/json` response schema, in document order.
    pub responses: IndexMap<String, Option<SchemaNode>>,
}

impl Operation {
    /// The grouping key: the first declared tag.
    pub fn tag(&self) -> &str {
        self.tags.first().map(String::as_str).unwrap_or(UNTAGGED)
    }

    /// First `2xx` response that documents a JSON body.
    pub fn success_response(&self) -> Option<(&str, &SchemaNode)> {
        self.responses
            .iter()
            .filter(|(status, _)| is_success_status(status))
            .find_map(|(status, schema)| schema.as_ref().map(|schema| (status.as_str(), schema)))
    }

    /// Summary, falling back to the description.
    pub fn display_text(&self) -> Option<&str> {
        [&self.summary, &self.description]
            .into_iter()
            .flatten()
            .map(|text| text.trim())
            .find(|text| !text.is_empty())
    }

    /// Request body first, then every response schema.
    pub fn schema_nodes(&self) -> impl Iterator<Item = &SchemaNode> {
        self.request_body
            .iter()
            .chain(self.responses.values().flatten())
    }
}

/// Operations sharing a first tag.
#[derive(Debug, Clone, PartialEq)]
pub struct TagGroup {
    pub name: String,
    pub description: Option<String>,
    pub operations: Vec<Operation>,
    /// Schemas reachable from the operations, in first-referenced order.
    pub references: IndexSet<String>,
}

/// Walks `paths` and groups every operation by its first tag. Tags keep the
/// order in which they are first seen, operations keep document order.
pub fn group_operations(
    document: &OpenApiDocument,
    schemas: &SchemaModel,
    diagnostics: &mut Diagnostics,
) -> Vec<TagGroup> {
    let mut groups: IndexMap<String, TagGroup> = IndexMap::new();

    for operation in collect_operations(document, diagnostics) {
        let name = operation.tag().to_owned();
        let group = groups.entry(name).or_insert_with_key(|name| TagGroup {
            name: name.clone(),
            description: document.tag_description(name).map(str::to_owned),
            operations: Vec::new(),
            references: IndexSet::new(),
        });
        for node in operation.schema_nodes() {
            collect_references(node, schemas, &mut group.references);
        }
        group.operations.push(operation);
    }

    groups.into_values().collect()
}

/// Every operation of the document, in path order.
pub fn collect_operations(document: &OpenApiDocument, diagnostics: &mut Diagnostics) -> Vec<Operation> {
    let mut operations = vec![];

    for (path, path_item) in document.paths.iter() {
        let Some(path_item) = path_item.as_object() else {
            diagnostics.warn(path.as_str(), "path item is not an object, skipped");
            continue;
        };
        if path_item.contains_key("$ref") {
            diagnostics.warn(path.as_str(), "path item references are not supported, skipped");
            continue;
        }

        for (method, operation) in MethodsIterator::new(path_item) {
            let context = format!("{} {}", method.to_uppercase(), path);
            match operation.as_object() {
                Some(operation) => {
                    let operation = build_operation(document, method, path, operation, &context, diagnostics);
                    tracing::trace!(operation_id = ?operation.operation_id, "collected {context}");
                    operations.push(operation);
                }
                None => diagnostics.warn(context, "operation is not an object, skipped"),
            }
        }
    }

    tracing::debug!("collected {} operations", operations.len());
    operations
}

fn build_operation(
    document: &OpenApiDocument,
    method: &str,
    path: &str,
    operation: &Map<String, Value>,
    context: &str,
    diagnostics: &mut Diagnostics,
) -> Operation {
    let text = |key: &str| operation.get(key).and_then(Value::as_str).map(str::to_owned);

    let tags = operation
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| tags.iter().filter_map(Value::as_str).map(str::to_owned).collect())
        .unwrap_or_default();

    let request_body = operation.get("requestBody").and_then(|body| {
        let body = resolve(document, "requestBodies", body, &format!("{context} request body"), diagnostics)?;
        json_schema(body)
    });

    let responses = operation
        .get("responses")
        .and_then(Value::as_object)
        .map(|responses| {
            responses
                .iter()
                .map(|(status, response)| {
                    let schema = resolve(
                        document,
                        "responses",
                        response,
                        &format!("{context} response {status}"),
                        diagnostics,
                    )
                    .and_then(json_schema);
                    (status.clone(), schema)
                })
                .collect()
        })
        .unwrap_or_default();

    Operation {
        method: method.to_uppercase(),
        path: path.to_owned(),
        operation_id: text("operationId"),
        summary: text("summary"),
        description: text("description"),
        tags,
        deprecated: operation.get("deprecated").and_then(Value::as_bool) == Some(true),
        request_body,
        responses,
    }
}

/// Follows a local `#/components/<section>/*` reference of a request body or
/// response object.
fn resolve<'a>(
    document: &'a OpenApiDocument,
    section: &str,
    value: &'a Value,
    context: &str,
    diagnostics: &mut Diagnostics,
) -> Option<&'a Value> {
    let Some(reference) = value.get("$ref") else {
        return Some(value);
    };
    let resolved = reference
        .as_str()
        .and_then(|reference| document.resolve_component(section, reference));
    if resolved.is_none() {
        diagnostics.warn(context, format!("cannot resolve {reference}, ignored"));
    }
    resolved
}

/// Schema of the `application/json` entry of a `content` map. Other media
/// types are ignored.
fn json_schema(body: &Value) -> Option<SchemaNode> {
    body.get("content")?
        .as_object()?
        .iter()
        .find(|(media_type, _)| is_json_media_type(media_type))
        .and_then(|(_, media)| media.get("schema"))
        .map(SchemaNode::build)
}

fn is_json_media_type(media_type: &str) -> bool {
    media_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(JSON_MEDIA_TYPE))
}

fn is_success_status(status: &str) -> bool {
    let mut chars = status.chars();
    status.len() == 3
        && chars.next() == Some('2')
        && chars.all(|c| c.is_ascii_digit() || c == 'X' || c == 'x')
}

/// Adds every schema reachable from `node` to `seen`, depth first, in the
/// order they are first referenced. Names missing from `components.schemas`
/// are skipped; already seen names are not walked again.
pub fn collect_references(node: &SchemaNode, schemas: &SchemaModel, seen: &mut IndexSet<String>) {
    for name in node.direct_references() {
        if let Some(target) = schemas.get(name) {
            if seen.insert(name.to_owned()) {
                collect_references(target, schemas, seen);
            }
        }
    }
}

struct MethodsIterator<'a> {
    path_item: &'a Map<String, Value>,
    step: usize,
}

const METHODS: [&str; 8] = ["get", "post", "put", "patch", "delete", "options", "head", "trace"];

impl<'a> MethodsIterator<'a> {
    fn new(path_item: &'a Map<String, Value>) -> Self {
        MethodsIterator { path_item, step: 0 }
    }
}

impl<'a> Iterator for MethodsIterator<'a> {
    type Item = (&'static str, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&method) = METHODS.get(self.step) {
            self.step = self.step.saturating_add(1);
            if let Some(operation) = self.path_item.get(method) {
                return Some((method, operation));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn document(value: Value) -> OpenApiDocument {
        OpenApiDocument::from_value(value).unwrap()
    }

    fn petstore() -> OpenApiDocument {
        document(json!({
            "openapi": "3.0.0",
            "tags": [{ "name": "pets", "description": "Pet operations" }],
            "paths": {
                "/pets": {
                    "post": {
                        "tags": ["pets", "store"],
                        "summary": "Create a pet",
                        "requestBody": {
                            "content": {
                                "application/xml": { "schema": { "$ref": "#/components/schemas/Xml" } },
                                "application/json": { "schema": { "$ref": "#/components/schemas/NewPet" } }
                            }
                        },
                        "responses": {
                            "201": { "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } } } },
                            "400": { "$ref": "#/components/responses/Problem" }
                        }
                    },
                    "get": {
                        "tags": ["pets"],
                        "summary": "List pets",
                        "responses": {
                            "200": {
                                "content": {
                                    "application/json; charset=utf-8": {
                                        "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Pet" } }
                                    }
                                }
                            }
                        }
                    }
                },
                "/health": {
                    "get": { "responses": { "204": { "description": "ok" } } }
                },
                "/owners": {
                    "get": { "tags": ["owners"], "responses": {} }
                }
            },
            "components": {
                "responses": {
                    "Problem": { "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Problem" } } } }
                },
                "schemas": {
                    "Pet": {
                        "type": "object",
                        "properties": {
                            "owner": { "$ref": "#/components/schemas/Owner" },
                            "children": { "type": "array", "items": { "$ref": "#/components/schemas/Pet" } }
                        }
                    },
                    "Owner": { "type": "object", "properties": { "pets": { "type": "array", "items": { "$ref": "#/components/schemas/Pet" } } } },
                    "NewPet": { "type": "object", "properties": { "name": { "type": "string" } } },
                    "Problem": { "type": "object", "properties": { "detail": { "type": "string" } } },
                    "Xml": { "type": "string" }
                }
            }
        }))
    }

    #[test]
    fn groups_by_first_tag_in_discovery_order() {
        let document = petstore();
        let schemas = SchemaModel::build(&document.schemas);
        let groups = group_operations(&document, &schemas, &mut Diagnostics::new());

        let names: Vec<&str> = groups.iter().map(|group| group.name.as_str()).collect();
        assert_eq!(names, ["pets", UNTAGGED, "owners"]);

        let pets = &groups[0];
        assert_eq!(pets.description.as_deref(), Some("Pet operations"));
        let operations: Vec<(&str, &str)> = pets
            .operations
            .iter()
            .map(|operation| (operation.method.as_str(), operation.path.as_str()))
            .collect();
        assert_eq!(operations, [("GET", "/pets"), ("POST", "/pets")]);
    }

    #[test]
    fn only_json_request_bodies_are_read() {
        let document = petstore();
        let operations = collect_operations(&document, &mut Diagnostics::new());
        let create = &operations[1];
        assert_eq!(create.method, "POST");
        assert_eq!(create.request_body, Some(SchemaNode::Reference("NewPet".to_owned())));
    }

    #[test]
    fn success_response_skips_error_statuses() {
        let document = petstore();
        let operations = collect_operations(&document, &mut Diagnostics::new());

        let (status, schema) = operations[1].success_response().unwrap();
        assert_eq!(status, "201");
        assert_eq!(schema, &SchemaNode::Reference("Pet".to_owned()));
        assert_eq!(
            operations[1].responses["400"],
            Some(SchemaNode::Reference("Problem".to_owned()))
        );

        let health = &operations[2];
        assert_eq!(health.path, "/health");
        assert_eq!(health.success_response(), None);
    }

    #[test]
    fn references_are_transitive_and_cycle_safe() {
        let document = petstore();
        let schemas = SchemaModel::build(&document.schemas);
        let groups = group_operations(&document, &schemas, &mut Diagnostics::new());

        let references: Vec<&str> = groups[0].references.iter().map(String::as_str).collect();
        assert_eq!(references, ["Pet", "Owner", "NewPet", "Problem"]);
        assert!(groups[1].references.is_empty());
    }

    #[test]
    fn missing_references_are_not_collected() {
        let schemas = SchemaModel::build(
            json!({ "A": { "type": "object", "properties": { "b": { "$ref": "#/components/schemas/Gone" } } } })
                .as_object()
                .unwrap(),
        );
        let mut seen = IndexSet::new();
        collect_references(&SchemaNode::Reference("A".to_owned()), &schemas, &mut seen);
        assert_eq!(seen.into_iter().collect::<Vec<_>>(), ["A"]);
    }

    #[test]
    fn unresolvable_component_references_warn() {
        let document = document(json!({
            "paths": {
                "/x": {
                    "get": { "responses": { "200": { "$ref": "#/components/responses/Missing" } } },
                    "put": "nonsense"
                },
                "/y": { "$ref": "#/components/pathItems/Y" }
            },
            "components": { "schemas": {} }
        }));
        let mut diagnostics = Diagnostics::new();
        let operations = collect_operations(&document, &mut diagnostics);

        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].responses["200"], None);
        let contexts: Vec<&str> = diagnostics.iter().map(|warning| warning.context.as_str()).collect();
        assert_eq!(contexts, ["GET /x response 200", "PUT /x", "/y"]);
    }

    #[test]
    fn display_text_prefers_summary() {
        let document = document(json!({
            "paths": {
                "/a": { "get": { "summary": "  ", "description": "Fallback" } },
                "/b": { "get": { "summary": "Short", "description": "Long" } }
            },
            "components": { "schemas": {} }
        }));
        let operations = collect_operations(&document, &mut Diagnostics::new());
        assert_eq!(operations[0].display_text(), Some("Fallback"));
        assert_eq!(operations[1].display_text(), Some("Short"));
    }

    #[test]
    fn operation_ids_are_kept() {
        let document = document(json!({
            "paths": {
                "/pets": { "get": { "operationId": "listPets" }, "post": {} }
            },
            "components": { "schemas": {} }
        }));
        let operations = collect_operations(&document, &mut Diagnostics::new());
        let ids: Vec<Option<&str>> = operations
            .iter()
            .map(|operation| operation.operation_id.as_deref())
            .collect();
        assert_eq!(ids, [Some("listPets"), None]);
    }

    #[test]
    fn success_status_patterns() {
        assert!(is_success_status("200"));
        assert!(is_success_status("2XX"));
        assert!(!is_success_status("default"));
        assert!(!is_success_status("404"));
        assert!(!is_success_status("20"));
    }
}
