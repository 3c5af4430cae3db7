//! Per-module import tables: localName → resolution, plus the namespace
//! alias table consulted by the dependency analyzer.

use indexmap::IndexMap;
use tracing::debug;

use crate::ast::{ImportSpecifierInfo, ModuleBlockName, NodeKind};
use crate::config::BundleOptions;
use crate::host::CompilerHost;
use crate::module::ModuleId;
use crate::module_graph::ModuleGraph;
use crate::registry::{ExternalImport, Registry};
use crate::resolve::{resolve_specifier, ResolvedModule};

/// The name a default import stands for until the export resolver
/// substitutes the module's actual default-export name.
pub const DEFAULT_TOKEN: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    Local(ModuleId),
    External(String),
}

#[derive(Debug, Clone)]
pub struct ImportBinding {
    pub original_name: String,
    pub source: ImportSource,
    pub is_type_only: bool,
}

#[derive(Debug, Default)]
pub struct ImportMap {
    bindings: IndexMap<String, ImportBinding>,
    namespace_aliases: IndexMap<String, ImportSource>,
    /// Local names in appearance order, for the normalizer's ordering keys.
    name_order: Vec<String>,
    /// Imported modules in appearance order.
    module_order: Vec<ImportSource>,
}

impl ImportMap {
    pub fn get(&self, local: &str) -> Option<&ImportBinding> {
        self.bindings.get(local)
    }

    pub fn namespace_target(&self, alias: &str) -> Option<&ImportSource> {
        self.namespace_aliases.get(alias)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (&String, &ImportBinding)> {
        self.bindings.iter()
    }

    pub fn namespace_aliases(&self) -> impl Iterator<Item = (&String, &ImportSource)> {
        self.namespace_aliases.iter()
    }

    /// First position at which `name` is imported, if at all.
    pub fn name_position(&self, name: &str) -> Option<usize> {
        self.name_order.iter().position(|n| n == name)
    }

    /// First position at which `module` is imported, if at all.
    pub fn module_position(&self, module: &ImportSource) -> Option<usize> {
        self.module_order.iter().position(|m| m == module)
    }

    fn record(&mut self, local: &str, source: &ImportSource) {
        if !self.name_order.iter().any(|n| n == local) {
            self.name_order.push(local.to_string());
        }
        if !self.module_order.contains(source) {
            self.module_order.push(source.clone());
        }
    }
}

fn types_library_of(module_name: &str) -> Option<String> {
    module_name.strip_prefix("@types/").map(str::to_string)
}

fn external_import(module_name: &str, specifier: &str, normalized: &str) -> ExternalImport {
    ExternalImport {
        module_name: module_name.to_string(),
        specifier: specifier.to_string(),
        original_name: specifier.to_string(),
        normalized_name: normalized.to_string(),
        is_type_only: false,
        is_default_import: false,
        is_namespace_import: false,
        is_equals_import: false,
        types_library_name: types_library_of(module_name),
    }
}

/// Builds every module's import map and registers external imports as they
/// are discovered.
pub fn build_import_maps(
    graph: &mut ModuleGraph,
    registry: &mut Registry,
    host: &dyn CompilerHost,
    options: &BundleOptions,
    root: &str,
) {
    // An inlined library may exist only as a `declare module "..."` block in
    // some loaded file; imports of it must bind to that host, not stay
    // external.
    for module_id in graph.module_ids() {
        let module = graph
            .get_module(&module_id)
            .expect("module disappeared from the graph");
        for &item in &module.tree.items {
            if let NodeKind::ModuleBlock {
                name: ModuleBlockName::Quoted(name),
                ..
            } = module.tree.node(item).kind()
            {
                if options.is_inlined_library(name) {
                    registry.register_ambient_host(name.clone(), module_id.clone());
                }
            }
        }
    }

    for module_id in graph.module_ids() {
        let mut map = ImportMap::default();
        let mut externals: Vec<ExternalImport> = Vec::new();

        {
            let module = graph
                .get_module(&module_id)
                .expect("module disappeared from the graph");
            for &item in &module.tree.items {
                match module.tree.node(item).kind().clone() {
                    NodeKind::Import {
                        source,
                        specifiers,
                        is_type_only,
                    } => {
                        let import_source =
                            classify(host, graph, registry, &module_id, &source, options, root);
                        for specifier in specifiers {
                            bind_specifier(
                                &mut map,
                                &mut externals,
                                &import_source,
                                &source,
                                specifier,
                                is_type_only,
                            );
                        }
                    }
                    NodeKind::ImportEquals { local, source } => {
                        let import_source =
                            classify(host, graph, registry, &module_id, &source, options, root);
                        map.record(&local, &import_source);
                        map.bindings.insert(
                            local.clone(),
                            ImportBinding {
                                original_name: DEFAULT_TOKEN.to_string(),
                                source: import_source.clone(),
                                is_type_only: false,
                            },
                        );
                        if let ImportSource::External(module_name) = &import_source {
                            externals.push(ExternalImport {
                                original_name: local.clone(),
                                is_equals_import: true,
                                ..external_import(module_name, &local, &local)
                            });
                        }
                    }
                    _ => {}
                }
            }
        }

        for import in externals {
            registry.register_external_import(import);
        }
        graph
            .get_module_mut(&module_id)
            .expect("module disappeared from the graph")
            .import_map = map;
    }
}

fn classify(
    host: &dyn CompilerHost,
    graph: &ModuleGraph,
    registry: &Registry,
    from: &ModuleId,
    specifier: &str,
    options: &BundleOptions,
    root: &str,
) -> ImportSource {
    match resolve_specifier(host, &from.id, specifier, options, root) {
        ResolvedModule::Local(path) => {
            let id = ModuleId::new(path);
            if graph.has_module(&id) {
                ImportSource::Local(id)
            } else {
                debug!("resolved module {} was never loaded; treated as external", id);
                ImportSource::External(specifier.to_string())
            }
        }
        ResolvedModule::External => match registry.ambient_host(specifier) {
            Some(host_module) => ImportSource::Local(host_module.clone()),
            None => ImportSource::External(specifier.to_string()),
        },
    }
}

fn bind_specifier(
    map: &mut ImportMap,
    externals: &mut Vec<ExternalImport>,
    import_source: &ImportSource,
    source_text: &str,
    specifier: ImportSpecifierInfo,
    is_type_only: bool,
) {
    match specifier {
        ImportSpecifierInfo::Named { local, imported } => {
            let original = imported.unwrap_or_else(|| local.clone());
            map.record(&local, import_source);
            map.bindings.insert(
                local.clone(),
                ImportBinding {
                    original_name: original.clone(),
                    source: import_source.clone(),
                    is_type_only,
                },
            );
            if matches!(import_source, ImportSource::External(_)) {
                externals.push(ExternalImport {
                    normalized_name: local,
                    is_type_only,
                    ..external_import(source_text, &original, &original)
                });
            }
        }
        ImportSpecifierInfo::Default(local) => {
            map.record(&local, import_source);
            map.bindings.insert(
                local.clone(),
                ImportBinding {
                    original_name: DEFAULT_TOKEN.to_string(),
                    source: import_source.clone(),
                    is_type_only,
                },
            );
            if matches!(import_source, ImportSource::External(_)) {
                externals.push(ExternalImport {
                    original_name: local.clone(),
                    normalized_name: local.clone(),
                    is_default_import: true,
                    is_type_only,
                    ..external_import(source_text, DEFAULT_TOKEN, &local)
                });
            }
        }
        ImportSpecifierInfo::Namespace(alias) => {
            map.record(&alias, import_source);
            map.namespace_aliases.insert(alias.clone(), import_source.clone());
            if matches!(import_source, ImportSource::External(_)) {
                externals.push(ExternalImport {
                    original_name: alias.clone(),
                    normalized_name: alias.clone(),
                    is_namespace_import: true,
                    is_type_only,
                    ..external_import(source_text, "*", &alias)
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use crate::module::Module;
    use crate::parse::parse_module;

    fn graph_with(files: Vec<(&str, &str)>) -> (ModuleGraph, MemoryHost) {
        let mut graph = ModuleGraph::new();
        let mut map = std::collections::HashMap::new();
        for (i, (path, source)) in files.iter().enumerate() {
            map.insert(path.to_string(), source.to_string());
            let tree = parse_module(source).unwrap();
            graph.add_module(Module::new(ModuleId::new(*path), i == 0, tree));
        }
        (graph, MemoryHost::new(map))
    }

    #[test]
    fn builds_bindings_and_registers_externals() {
        let (mut graph, host) = graph_with(vec![
            (
                "/src/entry.d.ts",
                "import { A, B as C } from './dep';\n\
                 import type { T } from 'pkg';\n\
                 import D, * as NS from 'pkg';\n\
                 export interface X {}\n",
            ),
            ("/src/dep.d.ts", "export interface A {}\nexport interface B {}\n"),
        ]);
        let mut registry = Registry::new();
        let options = BundleOptions::default();
        build_import_maps(&mut graph, &mut registry, &host, &options, "/src");

        let entry = graph.get_module(&ModuleId::new("/src/entry.d.ts")).unwrap();
        let dep = ImportSource::Local(ModuleId::new("/src/dep.d.ts"));
        let a = entry.import_map.get("A").unwrap();
        assert_eq!(a.original_name, "A");
        assert_eq!(a.source, dep);
        let c = entry.import_map.get("C").unwrap();
        assert_eq!(c.original_name, "B");
        let d = entry.import_map.get("D").unwrap();
        assert_eq!(d.original_name, DEFAULT_TOKEN);
        assert_eq!(
            entry.import_map.namespace_target("NS"),
            Some(&ImportSource::External("pkg".to_string()))
        );
        assert_eq!(entry.import_map.name_position("A"), Some(0));
        assert_eq!(entry.import_map.name_position("C"), Some(1));

        assert!(registry.external_import("pkg", "T").is_some());
        assert!(registry.external_import("pkg", DEFAULT_TOKEN).is_some());
        assert!(registry.external_import("pkg", "*").is_some());
        assert!(registry.external_import("pkg", "A").is_none());
    }

    #[test]
    fn equals_import_is_default_shaped() {
        let (mut graph, host) =
            graph_with(vec![("/src/entry.d.ts", "import R = require('cjs');\n")]);
        let mut registry = Registry::new();
        let options = BundleOptions::default();
        build_import_maps(&mut graph, &mut registry, &host, &options, "/src");
        let entry = graph.get_module(&ModuleId::new("/src/entry.d.ts")).unwrap();
        assert_eq!(
            entry.import_map.get("R").unwrap().original_name,
            DEFAULT_TOKEN
        );
        let external = registry.external_import("cjs", "R").unwrap();
        assert!(external.is_equals_import);
    }

    #[test]
    fn inlined_ambient_module_import_binds_to_host_file() {
        let (mut graph, host) = graph_with(vec![
            ("/src/entry.d.ts", "import { Inner } from 'lib';\n"),
            (
                "/src/ambient.d.ts",
                "declare module \"lib\" { export interface Inner {} }\n",
            ),
        ]);
        let mut registry = Registry::new();
        let options = BundleOptions {
            inlined_libraries: vec!["lib".into()],
            ..Default::default()
        };
        build_import_maps(&mut graph, &mut registry, &host, &options, "/src");

        let entry = graph.get_module(&ModuleId::new("/src/entry.d.ts")).unwrap();
        let inner = entry.import_map.get("Inner").unwrap();
        assert_eq!(
            inner.source,
            ImportSource::Local(ModuleId::new("/src/ambient.d.ts"))
        );
        assert!(registry.external_import("lib", "Inner").is_none());
    }

    #[test]
    fn types_library_detection() {
        let mut registry = Registry::new();
        registry.register_external_import(external_import("@types/node", "Buffer", "Buffer"));
        assert_eq!(
            registry
                .external_import("@types/node", "Buffer")
                .unwrap()
                .types_library_name
                .as_deref(),
            Some("node")
        );
    }
}
