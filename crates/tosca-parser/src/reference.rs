//! Deferred named pointers between constructs and their resolution.
//!
//! References are created while parsing and only looked up once template
//! building asks for them, so a construct may point at something defined
//! later in the document (or in an imported one).

use indexmap::IndexMap;

use crate::error::{ParseError, ParseResult};
use crate::schema::{Data, Entity, Section};
use crate::yaml::Location;

/// Where a reference may point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Exactly this section
    Single(Section),
    /// Exactly one of these sections
    Xor(&'static [Section]),
}

/// A name to be looked up in one or more sections of the service template
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    name: String,
    target: Target,
    loc: Location,
}

/// Successful resolution: the matching entity and the section it lives in
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    pub section: Section,
    pub entity: &'a Entity,
}

impl Reference {
    pub fn new(name: &str, target: Target, loc: &Location) -> Self {
        Reference {
            name: name.to_string(),
            target,
            loc: loc.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn loc(&self) -> &Location {
        &self.loc
    }

    /// Shorthand for [`resolve`]
    pub fn resolve<'a>(&self, root: &'a Entity) -> ParseResult<&'a Entity> {
        resolve(self, root)
    }
}

/// Resolve a reference against the root of the service template
pub fn resolve<'a>(reference: &Reference, root: &'a Entity) -> ParseResult<&'a Entity> {
    resolve_in(reference, root).map(|resolved| resolved.entity)
}

/// Resolve a reference and report which section satisfied it
pub fn resolve_in<'a>(reference: &Reference, root: &'a Entity) -> ParseResult<Resolved<'a>> {
    match reference.target {
        Target::Single(section) => lookup(root, section, &reference.name)
            .map(|entity| Resolved { section, entity })
            .ok_or_else(|| {
                ParseError::new(
                    format!(
                        "Invalid reference: '{}' is not defined in {}.",
                        reference.name,
                        section_path(section)
                    ),
                    &reference.loc,
                )
            }),
        Target::Xor(sections) => {
            let matches: Vec<Resolved<'a>> = sections
                .iter()
                .copied()
                .filter_map(|section| {
                    lookup(root, section, &reference.name).map(|entity| Resolved {
                        section,
                        entity,
                    })
                })
                .collect();

            let candidates = sections
                .iter()
                .copied()
                .map(section_path)
                .collect::<Vec<_>>()
                .join(", ");

            match matches.as_slice() {
                [resolved] => Ok(*resolved),
                [] => Err(ParseError::new(
                    format!(
                        "Invalid reference: '{}' is not defined in any of: {}.",
                        reference.name, candidates
                    ),
                    &reference.loc,
                )),
                _ => Err(ParseError::new(
                    format!(
                        "Ambiguous reference: '{}' is defined in more than one of: {}.",
                        reference.name, candidates
                    ),
                    &reference.loc,
                )),
            }
        }
    }
}

/// Find `name` inside the container the section path leads to
pub fn lookup<'a>(root: &'a Entity, section: Section, name: &str) -> Option<&'a Entity> {
    container(root, section)?.get(name).and_then(Data::as_entity)
}

/// Walk the section path from the root down to a name → entity mapping
pub fn container<'a>(root: &'a Entity, section: Section) -> Option<&'a IndexMap<String, Data>> {
    let (last, parents) = section.split_last()?;
    let mut current = root;
    for key in parents {
        current = current.entity(key)?;
    }
    current.get(last)?.as_map()
}

pub fn section_path(section: Section) -> String {
    section.join("/")
}
