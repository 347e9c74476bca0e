//! TypeScript-style declarations for schemas.

use heck::ToUpperCamelCase;
use itertools::Itertools;
use serde_json::Value;

use crate::diagnostics::Diagnostics;
use crate::schema::{ObjectSchema, PrimitiveKind, Property, SchemaModel, SchemaNode};

/// Renders schema nodes as TypeScript types and named schemas as declarations.
#[derive(Debug, Clone, Copy)]
pub struct InterfaceGenerator<'a> {
    schemas: &'a SchemaModel,
    prefix: &'a str,
}

impl<'a> InterfaceGenerator<'a> {
    pub fn new(schemas: &'a SchemaModel, prefix: &'a str) -> Self {
        InterfaceGenerator { schemas, prefix }
    }

    pub fn interface_name(&self, schema_name: &str) -> String {
        format!("{}{}", self.prefix, schema_name.to_upper_camel_case())
    }

    /// Renders `node` as a type expression. Every substitution by `any` is
    /// described in `notes`; the caller decides where the notes are reported.
    pub fn render_type(&self, node: &SchemaNode, notes: &mut Vec<String>) -> String {
        match node {
            SchemaNode::Primitive(primitive) => match &primitive.kind {
                PrimitiveKind::String => "string".to_owned(),
                PrimitiveKind::Number | PrimitiveKind::Integer => "number".to_owned(),
                PrimitiveKind::Boolean => "boolean".to_owned(),
                PrimitiveKind::Null => "null".to_owned(),
                PrimitiveKind::Any => "any".to_owned(),
                PrimitiveKind::Unknown(declared) => {
                    notes.push(match declared {
                        Some(declared) => format!("unknown type `{declared}` rendered as any"),
                        None => "missing type rendered as any".to_owned(),
                    });
                    "any".to_owned()
                }
            },
            SchemaNode::Array(item) => {
                let rendered = self.render_type(item, notes);
                if is_union(item) {
                    format!("({rendered})[]")
                } else {
                    format!("{rendered}[]")
                }
            }
            SchemaNode::Map(value) => format!("Record<string, {}>", self.render_type(value, notes)),
            SchemaNode::Enum(values) if values.is_empty() => "never".to_owned(),
            SchemaNode::Enum(values) => values.iter().map(literal).join(" | "),
            SchemaNode::Reference(name) => {
                if self.schemas.contains(name) {
                    self.interface_name(name)
                } else {
                    notes.push(format!("unresolved reference `{name}` rendered as any"));
                    "any".to_owned()
                }
            }
            SchemaNode::Object(object) if object.properties.is_empty() => "object".to_owned(),
            SchemaNode::Object(object) => {
                let fields = object
                    .properties
                    .iter()
                    .map(|(name, property)| {
                        format!(
                            "{}{}: {}",
                            property_key(name),
                            optional_marker(property),
                            self.render_type(&property.node, notes)
                        )
                    })
                    .join("; ");
                format!("{{ {fields} }}")
            }
            SchemaNode::AllOf(members) => members
                .iter()
                .map(|member| {
                    let rendered = self.render_type(member, notes);
                    if is_union(member) {
                        format!("({rendered})")
                    } else {
                        rendered
                    }
                })
                .join(" & "),
            SchemaNode::OneOf(members) if members.is_empty() => "never".to_owned(),
            SchemaNode::OneOf(members) => members
                .iter()
                .map(|member| self.render_type(member, notes))
                .join(" | "),
            SchemaNode::Nullable(inner) => format!("{} | null", self.render_type(inner, notes)),
            SchemaNode::Invalid(err) => {
                notes.push(format!("{err}, rendered as any"));
                "any".to_owned()
            }
        }
    }

    /// Declaration block for the schema called `name`.
    ///
    /// Objects become `interface` declarations, an `allOf` of references and
    /// objects becomes an `interface ... extends`, anything else a `type`
    /// alias. A schema that cannot be rendered at all produces a comment
    /// noting the omission.
    pub fn declaration(&self, name: &str, diagnostics: &mut Diagnostics) -> String {
        let interface_name = self.interface_name(name);
        let Some(node) = self.schemas.get(name) else {
            diagnostics.warn(name, "schema is not defined, declaration omitted");
            return format!("// {interface_name} omitted: schema `{name}` is not defined");
        };

        match node {
            SchemaNode::Invalid(err) => {
                diagnostics.warn(name, format!("{err}, declaration omitted"));
                format!("// {interface_name} omitted: {err}")
            }
            SchemaNode::Object(object) => {
                self.interface(name, &interface_name, &[], &[object], diagnostics)
            }
            SchemaNode::AllOf(members) if self.is_extendable(members) => {
                let parents: Vec<String> = members
                    .iter()
                    .filter_map(|member| match member {
                        SchemaNode::Reference(parent) => Some(self.interface_name(parent)),
                        _ => None,
                    })
                    .collect();
                let objects: Vec<&ObjectSchema> = members
                    .iter()
                    .filter_map(|member| match member {
                        SchemaNode::Object(object) => Some(object),
                        _ => None,
                    })
                    .collect();
                self.interface(name, &interface_name, &parents, &objects, diagnostics)
            }
            other => {
                let mut notes = Vec::new();
                let rendered = self.render_type(other, &mut notes);
                report(diagnostics, name, &notes);
                format!(
                    "type {interface_name} = {rendered};{}",
                    line_comment(None, &[], &notes)
                )
            }
        }
    }

    fn is_extendable(&self, members: &[SchemaNode]) -> bool {
        !members.is_empty()
            && members.iter().all(|member| match member {
                SchemaNode::Reference(parent) => self.schemas.contains(parent),
                SchemaNode::Object(_) => true,
                _ => false,
            })
    }

    fn interface(
        &self,
        name: &str,
        interface_name: &str,
        parents: &[String],
        objects: &[&ObjectSchema],
        diagnostics: &mut Diagnostics,
    ) -> String {
        let header = if parents.is_empty() {
            format!("interface {interface_name}")
        } else {
            format!("interface {interface_name} extends {}", parents.join(", "))
        };

        let lines: Vec<String> = objects
            .iter()
            .flat_map(|object| object.properties.iter())
            .map(|(property_name, property)| {
                let mut notes = Vec::new();
                let rendered = self.render_type(&property.node, &mut notes);
                report(diagnostics, &format!("{name}.{property_name}"), &notes);
                format!(
                    "  {}{}: {};{}",
                    property_key(property_name),
                    optional_marker(property),
                    rendered,
                    line_comment(property.description.as_deref(), &property.constraints, &notes)
                )
            })
            .collect();

        if lines.is_empty() {
            format!("{header} {{}}")
        } else {
            format!("{header} {{\n{}\n}}", lines.join("\n"))
        }
    }
}

fn report(diagnostics: &mut Diagnostics, context: &str, notes: &[String]) {
    for note in notes {
        diagnostics.warn(context, note.as_str());
    }
}

fn optional_marker(property: &Property) -> &'static str {
    if property.required {
        ""
    } else {
        "?"
    }
}

/// ` // description (constraints) [notes]`, or nothing when all parts are empty.
fn line_comment(description: Option<&str>, constraints: &[String], notes: &[String]) -> String {
    let mut parts = Vec::new();
    if let Some(description) = description {
        parts.push(description.split_whitespace().join(" "));
    }
    if !constraints.is_empty() {
        parts.push(format!("({})", constraints.join(", ")));
    }
    if !notes.is_empty() {
        parts.push(format!("[{}]", notes.join("; ")));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" // {}", parts.join(" "))
    }
}

fn is_union(node: &SchemaNode) -> bool {
    match node {
        SchemaNode::Enum(values) => values.len() > 1,
        SchemaNode::OneOf(members) => members.len() > 1,
        SchemaNode::AllOf(members) => members.len() > 1,
        SchemaNode::Nullable(_) => true,
        _ => false,
    }
}

fn literal(value: &Value) -> String {
    // serde_json renders strings quoted and escaped, scalars bare
    value.to_string()
}

fn property_key(name: &str) -> String {
    let mut chars = name.chars();
    let is_identifier = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_identifier {
        name.to_owned()
    } else {
        Value::String(name.to_owned()).to_string()
    }
}
