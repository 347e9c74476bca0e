//! Typed model of `components.schemas`.
//!
//! Every schema is translated once, by explicit recursion over the JSON value,
//! into a [`SchemaNode`]. Translation never fails as a whole: a node that
//! cannot be understood becomes [`SchemaNode::Invalid`] and the rest of the
//! schema is kept.

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

use crate::document::{unescape_pointer, value_kind};
use crate::error::SchemaError;

pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Object(ObjectSchema),
    Array(Box<SchemaNode>),
    /// Object with no declared properties but typed `additionalProperties`.
    Map(Box<SchemaNode>),
    Primitive(Primitive),
    Enum(Vec<Value>),
    Reference(String),
    AllOf(Vec<SchemaNode>),
    /// `oneOf` and `anyOf`.
    OneOf(Vec<SchemaNode>),
    Nullable(Box<SchemaNode>),
    Invalid(SchemaError),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    pub properties: IndexMap<String, Property>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub node: SchemaNode,
    pub required: bool,
    pub description: Option<String>,
    /// Human readable validation notes (`max length: 50`, `email`, ...).
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveKind {
    String,
    Number,
    Integer,
    Boolean,
    Null,
    /// Deliberately open, e.g. `additionalProperties: true`.
    Any,
    /// Absent (`None`) or unrecognised type. Renders as `any` with a warning.
    Unknown(Option<String>),
}

impl Primitive {
    pub fn new(kind: PrimitiveKind) -> Self {
        Primitive { kind, format: None }
    }
}

impl SchemaNode {
    /// Translates one JSON Schema value.
    pub fn build(value: &Value) -> SchemaNode {
        let schema = match value {
            Value::Object(schema) => schema,
            Value::Bool(true) => return SchemaNode::Primitive(Primitive::new(PrimitiveKind::Any)),
            other => return SchemaNode::Invalid(SchemaError::NotAnObject(value_kind(other))),
        };

        if let Some(reference) = schema.get("$ref") {
            return match reference.as_str().map(schema_ref_name) {
                Some(Ok(name)) => SchemaNode::Reference(name),
                Some(Err(err)) => SchemaNode::Invalid(err),
                None => SchemaNode::Invalid(SchemaError::UnsupportedRef(reference.to_string())),
            };
        }

        let (declared, nullable) = declared_type(schema);
        match build_shape(schema, declared) {
            // a nullable enum lists `null` among its values at most once
            SchemaNode::Enum(mut values) if nullable => {
                if !values.contains(&Value::Null) {
                    values.push(Value::Null);
                }
                SchemaNode::Enum(values)
            }
            node if nullable => SchemaNode::Nullable(Box::new(node)),
            node => node,
        }
    }

    /// Names of every schema referenced inside this node. References are not
    /// followed.
    pub fn direct_references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.push_references(&mut names);
        names
    }

    fn push_references<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            SchemaNode::Reference(name) => names.push(name),
            SchemaNode::Object(object) => object
                .properties
                .values()
                .for_each(|property| property.node.push_references(names)),
            SchemaNode::Array(inner) | SchemaNode::Map(inner) | SchemaNode::Nullable(inner) => {
                inner.push_references(names)
            }
            SchemaNode::AllOf(members) | SchemaNode::OneOf(members) => {
                members.iter().for_each(|member| member.push_references(names))
            }
            SchemaNode::Primitive(_) | SchemaNode::Enum(_) | SchemaNode::Invalid(_) => {}
        }
    }
}

/// Extracts `X` from `#/components/schemas/X`.
pub fn schema_ref_name(reference: &str) -> Result<String, SchemaError> {
    match reference.strip_prefix(SCHEMA_REF_PREFIX) {
        Some(name) if !name.is_empty() && !name.contains('/') => Ok(unescape_pointer(name)),
        _ => Err(SchemaError::UnsupportedRef(reference.to_owned())),
    }
}

/// Returns the declared type (ignoring `"null"`) and whether the schema is nullable.
fn declared_type(schema: &Map<String, Value>) -> (Option<&str>, bool) {
    let nullable_flag = schema.get("nullable").and_then(Value::as_bool) == Some(true);
    match schema.get("type") {
        Some(Value::String(declared)) => (Some(declared.as_str()), nullable_flag),
        Some(Value::Array(types)) => {
            let names: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
            let non_null: Vec<&str> = names.iter().copied().filter(|t| *t != "null").collect();
            match non_null.first() {
                Some(first) => (Some(*first), nullable_flag || non_null.len() < names.len()),
                None if !names.is_empty() => (Some("null"), false),
                None => (None, nullable_flag),
            }
        }
        _ => (None, nullable_flag),
    }
}

fn build_shape(schema: &Map<String, Value>, declared: Option<&str>) -> SchemaNode {
    if let Some(values) = schema.get("enum").and_then(Value::as_array) {
        return SchemaNode::Enum(values.clone());
    }
    if let Some(value) = schema.get("const") {
        return SchemaNode::Enum(vec![value.clone()]);
    }

    if let Some(members) = schema.get("allOf").and_then(Value::as_array) {
        let mut members: Vec<SchemaNode> = members.iter().map(SchemaNode::build).collect();
        if schema.get("properties").is_some_and(Value::is_object) {
            members.push(SchemaNode::Object(build_object(schema)));
        }
        return SchemaNode::AllOf(members);
    }
    for key in ["oneOf", "anyOf"] {
        if let Some(members) = schema.get(key).and_then(Value::as_array) {
            return SchemaNode::OneOf(members.iter().map(SchemaNode::build).collect());
        }
    }

    let declared = declared.or_else(|| {
        if schema.contains_key("properties") {
            Some("object")
        } else if schema.contains_key("items") {
            Some("array")
        } else {
            None
        }
    });

    let kind = match declared {
        Some("object") => return build_object_or_map(schema),
        Some("array") => {
            let item = schema
                .get("items")
                .map(SchemaNode::build)
                .unwrap_or(SchemaNode::Primitive(Primitive::new(PrimitiveKind::Any)));
            return SchemaNode::Array(Box::new(item));
        }
        Some("string") => PrimitiveKind::String,
        Some("number") => PrimitiveKind::Number,
        Some("integer") => PrimitiveKind::Integer,
        Some("boolean") => PrimitiveKind::Boolean,
        Some("null") => PrimitiveKind::Null,
        other => PrimitiveKind::Unknown(other.map(str::to_owned)),
    };
    SchemaNode::Primitive(Primitive {
        kind,
        format: schema.get("format").and_then(Value::as_str).map(str::to_owned),
    })
}

fn build_object_or_map(schema: &Map<String, Value>) -> SchemaNode {
    if !schema.contains_key("properties") {
        match schema.get("additionalProperties") {
            Some(Value::Bool(true)) => {
                return SchemaNode::Map(Box::new(SchemaNode::Primitive(Primitive::new(
                    PrimitiveKind::Any,
                ))))
            }
            Some(value @ Value::Object(_)) => {
                return SchemaNode::Map(Box::new(SchemaNode::build(value)))
            }
            // anything else is treated as a closed object
            _ => {}
        }
    }
    SchemaNode::Object(build_object(schema))
}

fn build_object(schema: &Map<String, Value>) -> ObjectSchema {
    let required: IndexSet<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| {
            properties
                .iter()
                .map(|(name, value)| {
                    let property = Property::build(value, required.contains(name.as_str()));
                    (name.clone(), property)
                })
                .collect()
        })
        .unwrap_or_default();

    ObjectSchema { properties }
}

impl Property {
    fn build(value: &Value, required: bool) -> Property {
        let description = value
            .get("description")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|description| !description.is_empty())
            .map(str::to_owned);
        let constraints = value.as_object().map(constraints).unwrap_or_default();
        Property {
            node: SchemaNode::build(value),
            required,
            description,
            constraints,
        }
    }
}

fn constraints(schema: &Map<String, Value>) -> Vec<String> {
    let mut notes = Vec::new();
    for (key, label) in [
        ("minLength", "min length"),
        ("maxLength", "max length"),
        ("minimum", "min"),
        ("maximum", "max"),
    ] {
        if let Some(value) = schema.get(key) {
            notes.push(format!("{label}: {value}"));
        }
    }
    if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
        notes.push(format!("pattern: {pattern}"));
    }
    if let Some(format) = schema.get("format").and_then(Value::as_str) {
        notes.push(format.to_owned());
    }
    if let Some(default) = schema.get("default") {
        notes.push(format!("default: {default}"));
    }
    notes
}

/// All schemas of `components.schemas`, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaModel {
    schemas: IndexMap<String, SchemaNode>,
}

impl SchemaModel {
    pub fn build(raw: &Map<String, Value>) -> Self {
        let schemas = raw
            .iter()
            .map(|(name, value)| (name.clone(), SchemaNode::build(value)))
            .collect();
        SchemaModel { schemas }
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.schemas.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
