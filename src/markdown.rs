//! Markdown pages: one per tag plus `index.md`.

use heck::{ToKebabCase, ToTitleCase};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;

use crate::diagnostics::Diagnostics;
use crate::document::ApiInfo;
use crate::endpoints::{Operation, TagGroup};
use crate::interface::InterfaceGenerator;
use crate::schema::SchemaNode;

pub const INDEX_FILE: &str = "index.md";

const WRAP_WIDTH: usize = 80;

/// Renders tag pages. Declarations are rendered once per run and reused by
/// every page that references them, so each schema warns at most once.
pub struct MarkdownRenderer<'a> {
    interfaces: InterfaceGenerator<'a>,
    declarations: IndexMap<String, String>,
}

impl<'a> MarkdownRenderer<'a> {
    pub fn new(interfaces: InterfaceGenerator<'a>) -> Self {
        MarkdownRenderer {
            interfaces,
            declarations: IndexMap::new(),
        }
    }

    pub fn render_tag(&mut self, group: &TagGroup, diagnostics: &mut Diagnostics) -> String {
        let mut lines = vec![format!("# {} API", group.name.to_title_case()), String::new()];

        if let Some(description) = group.description.as_deref() {
            lines.push(textwrap::fill(description.trim(), WRAP_WIDTH));
            lines.push(String::new());
        }

        lines.extend([
            "---".to_owned(),
            String::new(),
            "## API Endpoints".to_owned(),
            String::new(),
            "| Method | Endpoint | Description | Request Body | Response |".to_owned(),
            "|--------|----------|-------------|--------------|----------|".to_owned(),
        ]);
        for operation in &group.operations {
            lines.push(self.endpoint_row(operation, diagnostics));
        }
        lines.push(String::new());

        if !group.references.is_empty() {
            lines.extend([
                "---".to_owned(),
                String::new(),
                "## TypeScript Interfaces".to_owned(),
                String::new(),
            ]);
            for name in &group.references {
                lines.push(format!("### {name}"));
                lines.push(String::new());
                lines.push("```typescript".to_owned());
                lines.push(self.declaration(name, diagnostics).to_owned());
                lines.push("```".to_owned());
                lines.push(String::new());
            }
        }

        finish(lines)
    }

    fn endpoint_row(&self, operation: &Operation, diagnostics: &mut Diagnostics) -> String {
        let context = format!("{} {}", operation.method, operation.path);

        let mut description = operation
            .display_text()
            .map(escape_cell)
            .unwrap_or_else(|| "-".to_owned());
        if operation.deprecated {
            description.push_str(" *(deprecated)*");
        }

        let request = self.type_cell(
            operation.request_body.as_ref(),
            &format!("{context} request body"),
            diagnostics,
        );
        let response = self.type_cell(
            operation.success_response().map(|(_, schema)| schema),
            &format!("{context} response"),
            diagnostics,
        );

        format!(
            "| {} | {} | {} | {} | {} |",
            operation.method,
            code_cell(&operation.path),
            description,
            request,
            response
        )
    }

    fn type_cell(&self, node: Option<&SchemaNode>, context: &str, diagnostics: &mut Diagnostics) -> String {
        let Some(node) = node else {
            return "-".to_owned();
        };
        let mut notes = Vec::new();
        let rendered = self.interfaces.render_type(node, &mut notes);
        for note in notes {
            diagnostics.warn(context, note);
        }
        code_cell(&rendered)
    }

    fn declaration(&mut self, name: &str, diagnostics: &mut Diagnostics) -> &str {
        if !self.declarations.contains_key(name) {
            let declaration = self.interfaces.declaration(name, diagnostics);
            self.declarations.insert(name.to_owned(), declaration);
        }
        self.declarations.get(name).map(String::as_str).unwrap_or_default()
    }
}

/// The landing page linking every tag page in discovery order.
pub fn render_index(info: &ApiInfo, groups: &[TagGroup], filenames: &[String]) -> String {
    let title = info
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or("API Documentation");
    let mut lines = vec![format!("# {title}"), String::new()];

    if let Some(version) = info.version.as_deref().filter(|version| !version.is_empty()) {
        lines.push(format!("**Version:** {version}"));
        lines.push(String::new());
    }
    if let Some(description) = info.description.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        lines.push(textwrap::fill(description, WRAP_WIDTH));
        lines.push(String::new());
    }

    lines.extend([
        "---".to_owned(),
        String::new(),
        "## API Documentation".to_owned(),
        String::new(),
        "| Tag | Description | Endpoints |".to_owned(),
        "|-----|-------------|-----------|".to_owned(),
    ]);
    for (group, filename) in groups.iter().zip(filenames) {
        let description = group
            .description
            .as_deref()
            .map(escape_cell)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "-".to_owned());
        lines.push(format!(
            "| [{}](./{}) | {} | {} |",
            escape_link_text(&group.name),
            filename,
            description,
            group.operations.len()
        ));
    }

    let total: usize = groups.iter().map(|group| group.operations.len()).sum();
    lines.extend([
        String::new(),
        "---".to_owned(),
        String::new(),
        format!("*Total: {} endpoints across {} tags*", total, groups.len()),
    ]);

    finish(lines)
}

/// `<slug>.md` for every group, in group order. Slugs are kebab case; empty
/// slugs become `tag`, `index` is reserved and collisions get a numeric suffix.
pub fn assign_filenames(groups: &[TagGroup]) -> Vec<String> {
    let mut taken: IndexSet<String> = IndexSet::from(["index".to_owned()]);
    groups
        .iter()
        .map(|group| {
            let slug = match group.name.to_kebab_case() {
                slug if slug.is_empty() => "tag".to_owned(),
                slug => slug,
            };
            let unique = (1..)
                .map(|n| if n == 1 { slug.clone() } else { format!("{slug}-{n}") })
                .find(|candidate| !taken.contains(candidate))
                .unwrap_or_default();
            taken.insert(unique.clone());
            format!("{unique}.md")
        })
        .collect()
}

fn escape_cell(text: &str) -> String {
    text.split_whitespace().join(" ").replace('|', "\\|")
}

/// Inline code span for a table cell. The fence is one backtick longer than
/// the longest run inside the text, so literals holding backticks stay intact.
fn code_cell(text: &str) -> String {
    let text = escape_cell(text);
    let longest_run = text
        .split(|c: char| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run + 1);
    if text.starts_with('`') || text.ends_with('`') {
        format!("{fence} {text} {fence}")
    } else {
        format!("{fence}{text}{fence}")
    }
}

fn escape_link_text(text: &str) -> String {
    escape_cell(text).replace('[', "\\[").replace(']', "\\]")
}

fn finish(lines: Vec<String>) -> String {
    let mut content = lines.join("\n");
    while content.ends_with('\n') {
        content.pop();
    }
    content.push('\n');
    content
}
