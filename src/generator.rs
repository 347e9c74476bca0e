use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use itertools::Itertools;

use crate::diagnostics::Diagnostics;
use crate::document::OpenApiDocument;
use crate::endpoints::group_operations;
use crate::error::Error;
use crate::interface::InterfaceGenerator;
use crate::markdown::{assign_filenames, render_index, MarkdownRenderer, INDEX_FILE};
use crate::schema::SchemaModel;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Prepended to every interface name.
    pub prefix: String,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            prefix: "I".to_owned(),
        }
    }
}

/// Every output file, rendered in memory.
#[derive(Debug)]
pub struct GeneratedDocs {
    /// File name to content. Tag pages in discovery order, `index.md` last.
    pub files: IndexMap<String, String>,
    pub diagnostics: Diagnostics,
    pub operation_count: usize,
    pub schema_count: usize,
}

/// Renders the documentation for `document`. Nothing here touches the disk
/// and nothing here fails: per-schema problems end up in the diagnostics.
pub fn generate(document: &OpenApiDocument, options: &GeneratorOptions) -> GeneratedDocs {
    let mut diagnostics = Diagnostics::new();
    let schemas = SchemaModel::build(&document.schemas);
    tracing::info!("found {} schemas", schemas.len());
    let interfaces = InterfaceGenerator::new(&schemas, &options.prefix);
    warn_name_collisions(&interfaces, &schemas, &mut diagnostics);

    let groups = group_operations(document, &schemas, &mut diagnostics);
    let operation_count = groups.iter().map(|group| group.operations.len()).sum();
    tracing::info!("found {} endpoints in {} tags", operation_count, groups.len());

    let filenames = assign_filenames(&groups);
    let mut renderer = MarkdownRenderer::new(interfaces);
    let mut files: IndexMap<String, String> = IndexMap::new();

    for (group, filename) in groups.iter().zip(&filenames) {
        tracing::debug!(tag = %group.name, "rendering {filename}");
        files.insert(filename.clone(), renderer.render_tag(group, &mut diagnostics));
    }
    files.insert(
        INDEX_FILE.to_owned(),
        render_index(&document.info, &groups, &filenames),
    );

    GeneratedDocs {
        files,
        diagnostics,
        operation_count,
        schema_count: schemas.len(),
    }
}

/// Schemas whose names differ only in case or separators (`user`/`User`,
/// `order-item`/`order_item`) end up declaring the same interface.
fn warn_name_collisions(interfaces: &InterfaceGenerator, schemas: &SchemaModel, diagnostics: &mut Diagnostics) {
    let mut by_interface: IndexMap<String, Vec<&str>> = IndexMap::new();
    for (name, _) in schemas.iter() {
        by_interface.entry(interfaces.interface_name(name)).or_default().push(name);
    }
    for (interface_name, names) in by_interface.iter().filter(|(_, names)| names.len() > 1) {
        diagnostics.warn(
            names[0],
            format!(
                "schemas {} all map to interface `{interface_name}`",
                names.iter().map(|name| format!("`{name}`")).join(", ")
            ),
        );
    }
}

impl GeneratedDocs {
    /// Creates `out_dir` (with parents) and writes every file, overwriting
    /// previous output.
    pub fn write_to(&self, out_dir: &Path) -> Result<Vec<PathBuf>, Error> {
        std::fs::create_dir_all(out_dir).map_err(|source| Error::Write {
            path: out_dir.to_owned(),
            source,
        })?;

        let mut written = Vec::with_capacity(self.files.len());
        for (file, content) in self.files.iter() {
            let path = out_dir.join(file);
            std::fs::write(&path, content).map_err(|source| Error::Write {
                path: path.clone(),
                source,
            })?;
            tracing::info!("created {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}
