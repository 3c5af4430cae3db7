//! Central indexed store for declarations, external imports and the
//! per-module export tables. Pure bookkeeping: unknown keys return empty
//! results, repeated registrations merge instead of overwriting.

use indexmap::{IndexMap, IndexSet};

use crate::ast::NodeId;
use crate::module::ModuleId;

pub type DeclarationId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    NotExported,
    Named,
    DefaultOnly,
    Equals,
    NamedAndDefault,
}

impl ExportKind {
    pub fn is_exported(self) -> bool {
        self != ExportKind::NotExported
    }

    pub fn is_default(self) -> bool {
        matches!(self, ExportKind::DefaultOnly | ExportKind::NamedAndDefault)
    }

    /// Upgrade with a named export. `Equals` is terminal.
    pub fn merge_named(self) -> ExportKind {
        match self {
            ExportKind::NotExported => ExportKind::Named,
            ExportKind::DefaultOnly => ExportKind::NamedAndDefault,
            other => other,
        }
    }

    /// Upgrade with a default export. `Equals` is terminal.
    pub fn merge_default(self) -> ExportKind {
        match self {
            ExportKind::NotExported => ExportKind::DefaultOnly,
            ExportKind::Named => ExportKind::NamedAndDefault,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExportInfo {
    pub kind: ExportKind,
    /// Whether the declaration carried an export modifier in its own module,
    /// regardless of what the bundle surface ends up exporting.
    pub was_originally_exported: bool,
}

impl ExportInfo {
    pub fn not_exported(was_originally_exported: bool) -> Self {
        Self {
            kind: ExportKind::NotExported,
            was_originally_exported,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportAliasInfo {
    pub source_module: ModuleId,
    pub original_name: String,
    /// Dotted form when the alias denotes a member access on a
    /// namespace-like import.
    pub qualified_name: Option<String>,
}

#[derive(Debug)]
pub struct Declaration {
    pub id: DeclarationId,
    pub name: String,
    /// Written only by the name normalizer.
    pub normalized_name: String,
    pub source_module: ModuleId,
    pub node: NodeId,
    pub export_info: ExportInfo,
    pub dependencies: IndexSet<DeclarationId>,
    /// moduleName → import specifier strings requested from it.
    pub external_dependencies: IndexMap<String, IndexSet<String>>,
    /// Local namespace-alias names referenced.
    pub namespace_dependencies: IndexSet<String>,
    /// localName → resolution, for renamed or qualified references.
    pub import_aliases: IndexMap<String, ImportAliasInfo>,
    /// Key linking declarations chained through re-export merging.
    pub merge_group: Option<String>,
    pub force_include: bool,
    pub is_type_only: bool,
    /// Present when this declaration is one binding of a shared multi-binding
    /// statement; the key is the owning statement node.
    pub statement_group: Option<(ModuleId, NodeId)>,
}

#[derive(Debug, Clone)]
pub struct ExternalImport {
    pub module_name: String,
    /// Specifier string as it appears in the import list (`name` or
    /// `orig as alias` for synthesized renames).
    pub specifier: String,
    pub original_name: String,
    pub normalized_name: String,
    pub is_type_only: bool,
    pub is_default_import: bool,
    pub is_namespace_import: bool,
    /// `import X = require(...)` form; emitted before ES-style imports.
    pub is_equals_import: bool,
    pub types_library_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    Local {
        module: ModuleId,
        original_name: String,
    },
    External {
        module: String,
        name: String,
        /// Pass-through `export ... from` rather than a terminal export of an
        /// imported binding.
        export_from: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedNameInfo {
    pub exported_name: String,
    pub target: ExportTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceTarget {
    Local(ModuleId),
    External {
        module: String,
        name: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceExportInfo {
    pub alias: String,
    pub target: NamespaceTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StarTarget {
    Local(ModuleId),
    External(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarExportInfo {
    pub target: StarTarget,
    pub is_type_only: bool,
}

#[derive(Default)]
pub struct Registry {
    declarations: Vec<Declaration>,
    by_module_name: IndexMap<(ModuleId, String), Vec<DeclarationId>>,
    by_module: IndexMap<ModuleId, Vec<DeclarationId>>,
    external_imports: IndexMap<(String, String), ExternalImport>,
    exported_names: IndexMap<ModuleId, Vec<ExportedNameInfo>>,
    namespace_exports: IndexMap<ModuleId, Vec<NamespaceExportInfo>>,
    star_exports: IndexMap<ModuleId, Vec<StarExportInfo>>,
    /// Inlined library name → module hosting its `declare module "..."` block.
    ambient_hosts: IndexMap<String, ModuleId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_declaration(
        &mut self,
        name: String,
        source_module: ModuleId,
        node: NodeId,
        export_info: ExportInfo,
    ) -> DeclarationId {
        let id = self.declarations.len();
        self.declarations.push(Declaration {
            id,
            normalized_name: name.clone(),
            name: name.clone(),
            source_module: source_module.clone(),
            node,
            export_info,
            dependencies: IndexSet::new(),
            external_dependencies: IndexMap::new(),
            namespace_dependencies: IndexSet::new(),
            import_aliases: IndexMap::new(),
            merge_group: None,
            force_include: false,
            is_type_only: false,
            statement_group: None,
        });
        self.by_module_name
            .entry((source_module.clone(), name))
            .or_default()
            .push(id);
        self.by_module.entry(source_module).or_default().push(id);
        id
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = DeclarationId> {
        0..self.declarations.len()
    }

    pub fn declaration(&self, id: DeclarationId) -> &Declaration {
        &self.declarations[id]
    }

    pub fn declaration_mut(&mut self, id: DeclarationId) -> &mut Declaration {
        &mut self.declarations[id]
    }

    /// All declarations registered under (module, name); multiple ids are
    /// legitimate (declaration merging).
    pub fn lookup(&self, module: &ModuleId, name: &str) -> &[DeclarationId] {
        self.by_module_name
            .get(&(module.clone(), name.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn declarations_in_module(&self, module: &ModuleId) -> &[DeclarationId] {
        self.by_module
            .get(module)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Idempotent; an existing entry is kept, with missing optional fields
    /// filled in from the new registration.
    pub fn register_external_import(&mut self, import: ExternalImport) {
        let key = (import.module_name.clone(), import.specifier.clone());
        match self.external_imports.get_mut(&key) {
            Some(existing) => {
                if existing.types_library_name.is_none() {
                    existing.types_library_name = import.types_library_name;
                }
                // A value-position use wins over type-only.
                if !import.is_type_only {
                    existing.is_type_only = false;
                }
            }
            None => {
                self.external_imports.insert(key, import);
            }
        }
    }

    pub fn external_import(&self, module: &str, specifier: &str) -> Option<&ExternalImport> {
        self.external_imports
            .get(&(module.to_string(), specifier.to_string()))
    }

    pub fn external_import_mut(
        &mut self,
        module: &str,
        specifier: &str,
    ) -> Option<&mut ExternalImport> {
        self.external_imports
            .get_mut(&(module.to_string(), specifier.to_string()))
    }

    pub fn external_imports(&self) -> impl Iterator<Item = &ExternalImport> {
        self.external_imports.values()
    }

    pub fn external_imports_mut(&mut self) -> impl Iterator<Item = &mut ExternalImport> {
        self.external_imports.values_mut()
    }

    pub fn add_exported_name(&mut self, module: &ModuleId, info: ExportedNameInfo) {
        let list = self.exported_names.entry(module.clone()).or_default();
        if !list.iter().any(|e| e.exported_name == info.exported_name) {
            list.push(info);
        }
    }

    pub fn exported_names(&self, module: &ModuleId) -> &[ExportedNameInfo] {
        self.exported_names
            .get(module)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn add_namespace_export(&mut self, module: &ModuleId, info: NamespaceExportInfo) {
        let list = self.namespace_exports.entry(module.clone()).or_default();
        if !list.iter().any(|e| e.alias == info.alias) {
            list.push(info);
        }
    }

    pub fn namespace_exports(&self, module: &ModuleId) -> &[NamespaceExportInfo] {
        self.namespace_exports
            .get(module)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn add_star_export(&mut self, module: &ModuleId, info: StarExportInfo) {
        let list = self.star_exports.entry(module.clone()).or_default();
        if !list.iter().any(|e| e.target == info.target) {
            list.push(info);
        }
    }

    pub fn star_exports(&self, module: &ModuleId) -> &[StarExportInfo] {
        self.star_exports
            .get(module)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First host wins when several files carry a block for the same library.
    pub fn register_ambient_host(&mut self, module_name: String, host: ModuleId) {
        self.ambient_hosts.entry(module_name).or_insert(host);
    }

    pub fn ambient_host(&self, module_name: &str) -> Option<&ModuleId> {
        self.ambient_hosts.get(module_name)
    }
}
