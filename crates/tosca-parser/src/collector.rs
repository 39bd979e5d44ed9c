//! Type-hierarchy walks and definition collection.
//!
//! Types inherit from their `derived_from` parent. Collecting a section walks
//! the chain from the root-most ancestor down so more derived definitions
//! overwrite inherited ones in place; template-level assignments are then
//! merged with [`merge_assignments`], which moves replaced names to the end.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::{ParseError, ParseResult};
use crate::reference::Reference;
use crate::schema::{Data, Entity};

/// One type in an inheritance chain
#[derive(Debug, Clone, Copy)]
pub struct TypeLink<'a> {
    pub name: &'a str,
    pub entity: &'a Entity,
}

/// Resolved inheritance chain, most derived type first
#[derive(Debug, Clone)]
pub struct TypeChain<'a> {
    links: Vec<TypeLink<'a>>,
}

impl<'a> TypeChain<'a> {
    /// Resolve `reference` and follow `derived_from` until the chain ends
    pub fn resolve(reference: &'a Reference, root: &'a Entity) -> ParseResult<TypeChain<'a>> {
        let mut links: Vec<TypeLink<'a>> = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(reference);

        while let Some(current) = next {
            if !seen.insert(current.name()) {
                let path = links
                    .iter()
                    .map(|link| link.name)
                    .chain(std::iter::once(current.name()))
                    .collect::<Vec<_>>()
                    .join(" -> ");
                return Err(ParseError::new(
                    format!("Cyclic type hierarchy: {}.", path),
                    current.loc(),
                ));
            }

            let entity = current.resolve(root)?;
            links.push(TypeLink {
                name: current.name(),
                entity,
            });
            next = entity.reference("derived_from");
        }

        Ok(TypeChain { links })
    }

    /// Type names, most derived first
    pub fn names(&self) -> Vec<String> {
        self.links.iter().map(|link| link.name.to_string()).collect()
    }

    pub fn most_derived(&self) -> Option<TypeLink<'a>> {
        self.links.first().copied()
    }

    /// Definitions of `section` across the chain; more derived types
    /// overwrite ancestors without moving the entry.
    pub fn collect(&self, section: &str) -> IndexMap<String, &'a Data> {
        let mut definitions = IndexMap::new();
        for link in self.links.iter().rev() {
            for (name, data) in entries(link.entity, section) {
                definitions.insert(name, data);
            }
        }
        definitions
    }
}

/// Named entries of an attribute that is either a map or a list of
/// single-key maps (requirements, policies)
pub fn entries<'a>(entity: &'a Entity, section: &str) -> Vec<(String, &'a Data)> {
    match entity.get(section) {
        Some(Data::Map(map)) => map.iter().map(|(name, data)| (name.clone(), data)).collect(),
        Some(Data::List(items)) => items
            .iter()
            .filter_map(Data::as_map)
            .flat_map(|map| map.iter().map(|(name, data)| (name.clone(), data)))
            .collect(),
        _ => Vec::new(),
    }
}

/// Explicit assignments replace inherited entries in full: the inherited
/// entry is removed first, then the explicit one is appended.
pub fn merge_assignments<V>(
    definitions: &mut IndexMap<String, V>,
    assignments: impl IntoIterator<Item = (String, V)>,
) {
    for (name, value) in assignments {
        definitions.shift_remove(&name);
        definitions.insert(name, value);
    }
}
