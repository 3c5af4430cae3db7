use std::fmt::{Debug, Formatter};

use crate::ast::ModuleTree;
use crate::import_map::ImportMap;

/// A module dependency edge: one import/re-export specifier occurrence.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub source: String,
    pub resolve_type: ResolveType,
    pub order: usize,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ResolveType {
    Import,
    ExportNamed,
    ExportAll,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct ModuleId {
    pub id: String,
}

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

pub struct Module {
    pub id: ModuleId,
    pub is_entry: bool,
    pub tree: ModuleTree,
    pub import_map: ImportMap,
}

impl Module {
    pub fn new(id: ModuleId, is_entry: bool, tree: ModuleTree) -> Self {
        Self {
            id,
            is_entry,
            tree,
            import_map: ImportMap::default(),
        }
    }
}

impl Debug for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Module id={}", self.id)
    }
}
