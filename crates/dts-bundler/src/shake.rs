//! Reachability over the declaration graph: seeds from the export surface
//! and forced inclusions, follows dependency edges, and records which
//! external imports the retained set actually uses.

use std::collections::HashSet;

use indexmap::IndexSet;

use crate::config::BundleOptions;
use crate::export_resolver::{resolve_declarations, resolve_default_export_name};
use crate::import_map::DEFAULT_TOKEN;
use crate::module::ModuleId;
use crate::module_graph::ModuleGraph;
use crate::registry::{DeclarationId, ExportTarget, NamespaceTarget, Registry, StarTarget};

pub struct ShakeResult {
    pub reachable: IndexSet<DeclarationId>,
    /// (moduleName, specifier) pairs of external imports in use.
    pub used_externals: IndexSet<(String, String)>,
}

pub fn shake(
    graph: &ModuleGraph,
    registry: &Registry,
    options: &BundleOptions,
) -> ShakeResult {
    let mut shaker = Shaker {
        registry,
        options,
        reachable: IndexSet::new(),
        used_externals: IndexSet::new(),
    };

    for id in registry.ids().collect::<Vec<_>>() {
        let decl = registry.declaration(id);
        if decl.export_info.kind.is_exported() || decl.force_include {
            shaker.mark(id);
        }
    }

    if let Some(entry) = graph.entry() {
        for info in registry.exported_names(entry) {
            let (module, original_name) = match &info.target {
                ExportTarget::Local {
                    module,
                    original_name,
                } => (module.clone(), original_name.clone()),
                ExportTarget::External { .. } => continue,
            };
            let resolved = if original_name == DEFAULT_TOKEN {
                resolve_default_export_name(graph, registry, &module, &mut HashSet::new())
            } else {
                Some((module, original_name))
            };
            if let Some((decl_module, decl_name)) = resolved {
                for id in resolve_declarations(
                    graph,
                    registry,
                    &decl_module,
                    &decl_name,
                    &mut HashSet::new(),
                ) {
                    shaker.mark(id);
                }
            }
        }

        // Deepest namespace aggregations first, so nested blocks are fully
        // accounted for before the ones that wrap them.
        let mut targets = Vec::new();
        collect_namespace_targets(registry, entry, 1, &mut HashSet::new(), &mut targets);
        targets.sort_by(|a, b| b.0.cmp(&a.0));
        for (_, module) in targets {
            shaker.mark_module_surface(&module, &mut HashSet::new());
        }
    }

    ShakeResult {
        reachable: shaker.reachable,
        used_externals: shaker.used_externals,
    }
}

struct Shaker<'a> {
    registry: &'a Registry,
    options: &'a BundleOptions,
    reachable: IndexSet<DeclarationId>,
    used_externals: IndexSet<(String, String)>,
}

impl Shaker<'_> {
    fn mark(&mut self, id: DeclarationId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if !self.reachable.insert(id) {
                continue;
            }
            let decl = self.registry.declaration(id);
            for (module, specifiers) in &decl.external_dependencies {
                for specifier in specifiers {
                    self.used_externals
                        .insert((module.clone(), specifier.clone()));
                }
            }
            if self.options.export_referenced_types {
                stack.extend(decl.dependencies.iter().copied());
            }
        }
    }

    /// Everything a namespace re-export of `module` exposes: its
    /// originally-exported declarations, through its star-export chain.
    fn mark_module_surface(&mut self, module: &ModuleId, visited: &mut HashSet<ModuleId>) {
        if !visited.insert(module.clone()) {
            return;
        }
        for &id in self.registry.declarations_in_module(module) {
            if self
                .registry
                .declaration(id)
                .export_info
                .was_originally_exported
            {
                self.mark(id);
            }
        }
        for star in self.registry.star_exports(module) {
            if let StarTarget::Local(target) = &star.target {
                self.mark_module_surface(&target.clone(), visited);
            }
        }
    }
}

fn collect_namespace_targets(
    registry: &Registry,
    module: &ModuleId,
    depth: usize,
    visited: &mut HashSet<ModuleId>,
    out: &mut Vec<(usize, ModuleId)>,
) {
    if !visited.insert(module.clone()) {
        return;
    }
    for info in registry.namespace_exports(module) {
        if let NamespaceTarget::Local(target) = &info.target {
            out.push((depth, target.clone()));
            collect_namespace_targets(registry, target, depth + 1, visited, out);
        }
    }
}
