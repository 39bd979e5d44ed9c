//! Loading a service template and everything it imports.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::error::{ParseError, ParserError};
use crate::schema::{Data, Entity};
use crate::template::{build_topology, Topology};
use crate::tosca::{parse_service_template, TYPE_SECTIONS};
use crate::yaml::load_str;

/// Parsed service template with the type sections of every imported
/// document merged into its root
#[derive(Debug, Clone)]
pub struct ServiceAst {
    root: Entity,
    documents: Vec<PathBuf>,
}

impl ServiceAst {
    /// Root entity of the merged service template
    pub fn root(&self) -> &Entity {
        &self.root
    }

    /// Every document that was loaded, entrypoint first
    pub fn documents(&self) -> &[PathBuf] {
        &self.documents
    }

    /// Build the topology for the given inputs
    pub fn get_template(&self, inputs: &IndexMap<String, Json>) -> Result<Topology, ParserError> {
        debug!(inputs = inputs.len(), "Building topology");
        Ok(build_topology(&self.root, inputs)?)
    }
}

/// Load `entrypoint` (relative to `workdir`) and its imports
pub fn load(workdir: &Path, entrypoint: &Path) -> Result<ServiceAst, ParserError> {
    let workdir = workdir
        .canonicalize()
        .map_err(|source| ParserError::io(workdir, source))?;
    let mut loader = Loader {
        workdir,
        seen: HashSet::new(),
        documents: Vec::new(),
        sections: IndexMap::new(),
    };

    let entry_path = loader.workdir.join(entrypoint);
    let root = loader.load_document(&entry_path)?;
    for section in TYPE_SECTIONS {
        let own = root.get(section).and_then(Data::as_map).cloned().unwrap_or_default();
        loader.sections.insert(*section, own);
    }
    loader.load_imports(&root, &entry_path)?;

    let Loader { documents, sections, .. } = loader;
    let root = sections.into_iter().fold(root, |root, (section, entries)| {
        if entries.is_empty() {
            root
        } else {
            root.with_attr(section, Data::Map(entries))
        }
    });

    debug!(documents = documents.len(), "Service template loaded");
    Ok(ServiceAst { root, documents })
}

struct Loader {
    workdir: PathBuf,
    seen: HashSet<PathBuf>,
    documents: Vec<PathBuf>,
    sections: IndexMap<&'static str, IndexMap<String, Data>>,
}

impl Loader {
    fn load_document(&mut self, path: &Path) -> Result<Entity, ParserError> {
        let path = path.canonicalize().map_err(|source| ParserError::io(path, source))?;
        let text = fs::read_to_string(&path).map_err(|source| ParserError::io(&path, source))?;
        let shown = path
            .strip_prefix(&self.workdir)
            .unwrap_or(&path)
            .display()
            .to_string();

        debug!(document = %shown, "Loading document");
        let node = load_str(&text, &shown)?;
        let entity = parse_service_template(&node)?;

        self.seen.insert(path.clone());
        self.documents.push(path);
        Ok(entity)
    }

    /// Depth-first over `imports`; every document is loaded at most once
    fn load_imports(&mut self, document: &Entity, document_path: &Path) -> Result<(), ParserError> {
        let base = document_path.parent().unwrap_or(&self.workdir).to_path_buf();

        for import in document.list("imports").iter().filter_map(Data::as_entity) {
            if import.contains("repository") {
                return Err(ParseError::new("Imports from repositories are not supported.", import.loc()).into());
            }
            let Some(file) = import.str("file") else {
                continue;
            };

            let path = base.join(file);
            let canonical = path.canonicalize().map_err(|source| ParserError::io(&path, source))?;
            if self.seen.contains(&canonical) {
                debug!(import = file, "Document already loaded");
                continue;
            }

            let imported = self.load_document(&canonical)?;
            if imported.contains("topology_template") {
                warn!(import = file, "Ignoring topology_template of imported document");
            }
            self.merge_types(&imported)?;
            self.load_imports(&imported, &canonical)?;
        }
        Ok(())
    }

    fn merge_types(&mut self, imported: &Entity) -> Result<(), ParserError> {
        for section in TYPE_SECTIONS {
            let Some(entries) = imported.get(section).and_then(Data::as_map) else {
                continue;
            };
            let merged = self.sections.entry(*section).or_default();
            for (name, data) in entries {
                if merged.contains_key(name) {
                    let loc = data.as_entity().map_or(imported.loc(), Entity::loc);
                    return Err(ParseError::new(
                        format!("Duplicate {} definition: '{}'.", section, name),
                        loc,
                    )
                    .into());
                }
                merged.insert(name.clone(), data.clone());
            }
        }
        Ok(())
    }
}
