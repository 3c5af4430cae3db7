//! Resolves the export surface of every module: namespace re-exports, named
//! export tables, export assignments, the entry's re-export indirections and
//! star-export propagation, in that order.

use std::collections::HashSet;

use tracing::debug;

use crate::ast::NodeKind;
use crate::import_map::{ImportSource, DEFAULT_TOKEN};
use crate::module::ModuleId;
use crate::module_graph::ModuleGraph;
use crate::registry::{
    DeclarationId, ExportKind, ExportTarget, ExportedNameInfo, NamespaceExportInfo,
    NamespaceTarget, Registry, StarExportInfo, StarTarget,
};

pub fn resolve_exports(graph: &ModuleGraph, registry: &mut Registry) {
    resolve_namespace_exports(graph, registry);
    resolve_file_exports(graph, registry);
    resolve_export_assignments(graph, registry);
    resolve_entry_reexports(graph, registry);
    propagate_star_exports(graph, registry);
}

/// Pass 1: `export * as N from '...'` becomes a namespace export entry.
fn resolve_namespace_exports(graph: &ModuleGraph, registry: &mut Registry) {
    for module_id in graph.module_ids() {
        let module = graph
            .get_module(&module_id)
            .expect("module disappeared from the graph");
        let mut found = Vec::new();
        for &item in &module.tree.items {
            if let NodeKind::ExportStar {
                source,
                alias: Some(alias),
                ..
            } = module.tree.node(item).kind()
            {
                let target = match graph.dependency_target(&module_id, source) {
                    Some(dep) => NamespaceTarget::Local(dep.clone()),
                    None => NamespaceTarget::External {
                        module: source.clone(),
                        name: None,
                    },
                };
                found.push(NamespaceExportInfo {
                    alias: alias.clone(),
                    target,
                });
            }
        }
        for info in found {
            registry.add_namespace_export(&module_id, info);
        }
    }
}

/// Pass 2: per-module named export and star export tables.
fn resolve_file_exports(graph: &ModuleGraph, registry: &mut Registry) {
    for module_id in graph.module_ids() {
        let module = graph
            .get_module(&module_id)
            .expect("module disappeared from the graph");
        let mut names = Vec::new();
        let mut namespaces = Vec::new();
        let mut stars = Vec::new();

        for &item in &module.tree.items {
            let node = module.tree.node(item);
            match node.kind() {
                NodeKind::Interface
                | NodeKind::Class
                | NodeKind::Function
                | NodeKind::Enum { .. }
                | NodeKind::TypeAlias
                | NodeKind::ModuleBlock { .. } => {
                    if node.is_exported && !node.has_default_modifier {
                        if let Some(name) = &node.name {
                            names.push(own_export(&module_id, name));
                        }
                    }
                }
                NodeKind::VariableStatement { bindings, .. } => {
                    for &binding in bindings {
                        let bound = module.tree.node(binding);
                        if bound.is_exported {
                            if let Some(name) = &bound.name {
                                names.push(own_export(&module_id, name));
                            }
                        }
                    }
                }
                NodeKind::ExportNamed {
                    specifiers,
                    source: Some(source),
                    ..
                } => match graph.dependency_target(&module_id, source) {
                    Some(dep) => {
                        for spec in specifiers {
                            names.push(ExportedNameInfo {
                                exported_name: spec.exported_name().to_string(),
                                target: ExportTarget::Local {
                                    module: dep.clone(),
                                    original_name: spec.local.clone(),
                                },
                            });
                        }
                    }
                    None => {
                        for spec in specifiers {
                            names.push(ExportedNameInfo {
                                exported_name: spec.exported_name().to_string(),
                                target: ExportTarget::External {
                                    module: source.clone(),
                                    name: spec.local.clone(),
                                    export_from: true,
                                },
                            });
                        }
                    }
                },
                NodeKind::ExportNamed {
                    specifiers,
                    source: None,
                    ..
                } => {
                    for spec in specifiers {
                        let exported = spec.exported_name().to_string();
                        if let Some(binding) = module.import_map.get(&spec.local) {
                            let target = match &binding.source {
                                ImportSource::Local(dep) => ExportTarget::Local {
                                    module: dep.clone(),
                                    original_name: binding.original_name.clone(),
                                },
                                ImportSource::External(ext) => ExportTarget::External {
                                    module: ext.clone(),
                                    name: binding.original_name.clone(),
                                    export_from: false,
                                },
                            };
                            names.push(ExportedNameInfo {
                                exported_name: exported,
                                target,
                            });
                        } else if let Some(source) =
                            module.import_map.namespace_target(&spec.local)
                        {
                            // Exporting a namespace import re-exports the
                            // whole module under the alias.
                            let target = match source {
                                ImportSource::Local(dep) => NamespaceTarget::Local(dep.clone()),
                                ImportSource::External(ext) => NamespaceTarget::External {
                                    module: ext.clone(),
                                    name: Some(spec.local.clone()),
                                },
                            };
                            namespaces.push(NamespaceExportInfo {
                                alias: exported,
                                target,
                            });
                        } else {
                            names.push(ExportedNameInfo {
                                exported_name: exported,
                                target: ExportTarget::Local {
                                    module: module_id.clone(),
                                    original_name: spec.local.clone(),
                                },
                            });
                        }
                    }
                }
                NodeKind::ExportStar {
                    source,
                    alias: None,
                    is_type_only,
                } => {
                    let target = match graph.dependency_target(&module_id, source) {
                        Some(dep) => StarTarget::Local(dep.clone()),
                        None => StarTarget::External(source.clone()),
                    };
                    stars.push(StarExportInfo {
                        target,
                        is_type_only: *is_type_only,
                    });
                }
                _ => {}
            }
        }

        for info in names {
            registry.add_exported_name(&module_id, info);
        }
        for info in namespaces {
            registry.add_namespace_export(&module_id, info);
        }
        for info in stars {
            registry.add_star_export(&module_id, info);
        }
    }
}

fn own_export(module_id: &ModuleId, name: &str) -> ExportedNameInfo {
    ExportedNameInfo {
        exported_name: name.to_string(),
        target: ExportTarget::Local {
            module: module_id.clone(),
            original_name: name.to_string(),
        },
    }
}

/// Pass 3: `export = X` and `export default <identifier>` in the entry mark
/// the targeted declarations.
fn resolve_export_assignments(graph: &ModuleGraph, registry: &mut Registry) {
    let entry = match graph.entry() {
        Some(entry) => entry.clone(),
        None => return,
    };
    let module = graph
        .get_module(&entry)
        .expect("entry disappeared from the graph");
    let mut assignments = Vec::new();
    for &item in &module.tree.items {
        if let NodeKind::ExportAssignment { is_equals, ident } = module.tree.node(item).kind() {
            match ident {
                Some(name) => assignments.push((*is_equals, name.clone())),
                None => debug!("{}: export assignment targets a non-identifier", entry),
            }
        }
    }
    for (is_equals, name) in assignments {
        if is_equals {
            for id in registry.lookup(&entry, &name).to_vec() {
                registry.declaration_mut(id).export_info.kind = ExportKind::Equals;
            }
            continue;
        }
        // `export default X;` — X may be a local name or an imported binding.
        let target = match module.import_map.get(&name) {
            Some(binding) => match &binding.source {
                ImportSource::Local(dep) => {
                    if binding.original_name == DEFAULT_TOKEN {
                        resolve_default_export_name(graph, registry, dep, &mut HashSet::new())
                    } else {
                        Some((dep.clone(), binding.original_name.clone()))
                    }
                }
                ImportSource::External(_) => None,
            },
            None => Some((entry.clone(), name.clone())),
        };
        if let Some((module, name)) = target {
            for id in resolve_declarations(graph, registry, &module, &name, &mut HashSet::new()) {
                let info = &mut registry.declaration_mut(id).export_info;
                info.kind = info.kind.merge_default();
            }
        }
    }
}

/// Pass 4: resolve every entry export through default and alias indirection
/// to its ultimate declarations, upgrade their kinds, and tag merge chains.
fn resolve_entry_reexports(graph: &ModuleGraph, registry: &mut Registry) {
    let entry = match graph.entry() {
        Some(entry) => entry.clone(),
        None => return,
    };
    for info in registry.exported_names(&entry).to_vec() {
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
        let Some((decl_module, decl_name)) = resolved else {
            debug!("{}: unresolvable export '{}'", entry, info.exported_name);
            continue;
        };
        let ids = resolve_declarations(graph, registry, &decl_module, &decl_name, &mut HashSet::new());
        if info.exported_name == DEFAULT_TOKEN {
            for &id in &ids {
                let export = &mut registry.declaration_mut(id).export_info;
                export.kind = export.kind.merge_default();
            }
        } else if info.exported_name == decl_name {
            // A genuine rename keeps the declaration unpromoted; the alias
            // alone reaches the export list.
            for &id in &ids {
                let export = &mut registry.declaration_mut(id).export_info;
                export.kind = export.kind.merge_named();
            }
        }
        walk_merge_chain(
            graph,
            registry,
            &entry,
            &info.exported_name,
            &mut HashSet::new(),
            None,
        );
    }
}

/// Pass 5: `export * from` chains starting at the entry promote every
/// originally-exported, non-default declaration of the starred modules.
fn propagate_star_exports(graph: &ModuleGraph, registry: &mut Registry) {
    let entry = match graph.entry() {
        Some(entry) => entry.clone(),
        None => return,
    };
    let mut visited = HashSet::new();
    visited.insert(entry.clone());
    propagate_from(graph, registry, &entry, &mut visited);
}

fn propagate_from(
    graph: &ModuleGraph,
    registry: &mut Registry,
    module: &ModuleId,
    visited: &mut HashSet<ModuleId>,
) {
    for star in registry.star_exports(module).to_vec() {
        let StarTarget::Local(target) = &star.target else {
            continue;
        };
        if !visited.insert(target.clone()) {
            continue;
        }
        let tree = &graph
            .get_module(target)
            .expect("module disappeared from the graph")
            .tree;
        for id in registry.declarations_in_module(target).to_vec() {
            let node = tree.node(registry.declaration(id).node);
            if node.has_default_modifier {
                continue;
            }
            let export = &mut registry.declaration_mut(id).export_info;
            if export.was_originally_exported && export.kind != ExportKind::Equals {
                export.kind = export.kind.merge_named();
            }
        }
        propagate_from(graph, registry, target, visited);
    }
}

/// The (module, name) a module's default export ultimately denotes.
pub fn resolve_default_export_name(
    graph: &ModuleGraph,
    registry: &Registry,
    module: &ModuleId,
    visited: &mut HashSet<ModuleId>,
) -> Option<(ModuleId, String)> {
    if !visited.insert(module.clone()) {
        return None;
    }
    let tree_module = graph.get_module(module)?;
    for &id in registry.declarations_in_module(module) {
        let decl = registry.declaration(id);
        if decl.export_info.kind.is_default()
            || tree_module.tree.node(decl.node).has_default_modifier
        {
            return Some((module.clone(), decl.name.clone()));
        }
    }
    for &item in &tree_module.tree.items {
        if let NodeKind::ExportAssignment {
            is_equals: false,
            ident: Some(name),
        } = tree_module.tree.node(item).kind()
        {
            return match tree_module.import_map.get(name) {
                Some(binding) => match &binding.source {
                    ImportSource::Local(dep) => {
                        if binding.original_name == DEFAULT_TOKEN {
                            resolve_default_export_name(graph, registry, dep, visited)
                        } else {
                            Some((dep.clone(), binding.original_name.clone()))
                        }
                    }
                    ImportSource::External(_) => None,
                },
                None => Some((module.clone(), name.clone())),
            };
        }
    }
    for info in registry.exported_names(module) {
        if info.exported_name != DEFAULT_TOKEN {
            continue;
        }
        if let ExportTarget::Local {
            module: dep,
            original_name,
        } = &info.target
        {
            if original_name == DEFAULT_TOKEN && dep != module {
                return resolve_default_export_name(graph, registry, dep, visited);
            }
            return Some((dep.clone(), original_name.clone()));
        }
    }
    None
}

/// Declarations reachable for `name` in `module`, following named re-exports
/// and star-export chains.
pub fn resolve_declarations(
    graph: &ModuleGraph,
    registry: &Registry,
    module: &ModuleId,
    name: &str,
    visited: &mut HashSet<(ModuleId, String)>,
) -> Vec<DeclarationId> {
    if !visited.insert((module.clone(), name.to_string())) {
        return Vec::new();
    }
    let direct = registry.lookup(module, name);
    if !direct.is_empty() {
        return direct.to_vec();
    }
    if let Some((dep, original)) = find_reexport(graph, module, name) {
        let found = resolve_declarations(graph, registry, &dep, &original, visited);
        if !found.is_empty() {
            return found;
        }
    }
    for star in registry.star_exports(module) {
        if let StarTarget::Local(target) = &star.target {
            let found = resolve_declarations(graph, registry, target, name, visited);
            if !found.is_empty() {
                return found;
            }
        }
    }
    Vec::new()
}

/// Where `name`, exported by `module`, is re-exported from: the source module
/// and the name it carries there. Reads the syntax directly so that a local
/// declaration sharing the name does not shadow the re-export.
fn find_reexport(
    graph: &ModuleGraph,
    module: &ModuleId,
    name: &str,
) -> Option<(ModuleId, String)> {
    let tree_module = graph.get_module(module)?;
    for &item in &tree_module.tree.items {
        if let NodeKind::ExportNamed {
            specifiers, source, ..
        } = tree_module.tree.node(item).kind()
        {
            for spec in specifiers {
                if spec.exported_name() != name {
                    continue;
                }
                match source {
                    Some(source) => {
                        if let Some(dep) = graph.dependency_target(module, source) {
                            return Some((dep.clone(), spec.local.clone()));
                        }
                    }
                    None => {
                        if let Some(binding) = tree_module.import_map.get(&spec.local) {
                            if let ImportSource::Local(dep) = &binding.source {
                                return Some((dep.clone(), binding.original_name.clone()));
                            }
                        }
                    }
                }
            }
        }
    }
    None
}

/// Follows a re-export chain; once a module both declares `name` and
/// re-exports it, every declaration along the rest of the chain joins one
/// merge group and the aggregating declarations depend on the contributors.
fn walk_merge_chain(
    graph: &ModuleGraph,
    registry: &mut Registry,
    module: &ModuleId,
    name: &str,
    visited: &mut HashSet<(ModuleId, String)>,
    active: Option<String>,
) -> Vec<DeclarationId> {
    if !visited.insert((module.clone(), name.to_string())) {
        return Vec::new();
    }
    let local = registry.lookup(module, name).to_vec();
    let next = find_reexport(graph, module, name);
    let merging_here = !local.is_empty() && next.is_some();
    let group = if merging_here {
        Some(active.unwrap_or_else(|| format!("{}:{}", module, name)))
    } else {
        active
    };
    if let Some(group) = &group {
        for &id in &local {
            registry.declaration_mut(id).merge_group = Some(group.clone());
        }
    }
    let mut contributors = Vec::new();
    if let Some((dep, original)) = next {
        if group.is_some() || local.is_empty() {
            contributors = walk_merge_chain(graph, registry, &dep, &original, visited, group);
        }
    }
    if merging_here {
        for &aggregator in &local {
            for &contributor in &contributors {
                registry
                    .declaration_mut(aggregator)
                    .dependencies
                    .insert(contributor);
            }
        }
    }
    let mut all = local;
    all.extend(contributors);
    all
}
