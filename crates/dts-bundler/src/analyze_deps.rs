//! Reference resolution: turns every identifier a declaration mentions into
//! declaration-level dependency edges, external import usages or namespace
//! usages.

use std::collections::HashSet;

use tracing::debug;

use crate::export_resolver::{resolve_declarations, resolve_default_export_name};
use crate::import_map::{ImportSource, DEFAULT_TOKEN};
use crate::module_graph::ModuleGraph;
use crate::registry::{DeclarationId, ImportAliasInfo, Registry};

#[derive(Default)]
struct Update {
    dependencies: Vec<DeclarationId>,
    externals: Vec<(String, String)>,
    namespaces: Vec<String>,
    aliases: Vec<(String, ImportAliasInfo)>,
}

pub fn analyze_dependencies(graph: &ModuleGraph, registry: &mut Registry) {
    let ids: Vec<DeclarationId> = registry.ids().collect();
    let mut updates = Vec::with_capacity(ids.len());
    for id in ids {
        updates.push((id, analyze_one(graph, registry, id)));
    }
    for (id, update) in updates {
        let decl = registry.declaration_mut(id);
        for dep in update.dependencies {
            if dep != id {
                decl.dependencies.insert(dep);
            }
        }
        for (module, specifier) in update.externals {
            decl.external_dependencies
                .entry(module)
                .or_default()
                .insert(specifier);
        }
        for alias in update.namespaces {
            decl.namespace_dependencies.insert(alias);
        }
        for (local, info) in update.aliases {
            decl.import_aliases.entry(local).or_insert(info);
        }
    }
}

fn analyze_one(graph: &ModuleGraph, registry: &Registry, id: DeclarationId) -> Update {
    let decl = registry.declaration(id);
    let module = graph
        .get_module(&decl.source_module)
        .expect("module disappeared from the graph");
    let node = module.tree.node(decl.node);
    let mut update = Update::default();

    for name in node.references() {
        if let Some(source) = module.import_map.namespace_target(name) {
            update.namespaces.push(name.to_string());
            match source {
                ImportSource::External(module_name) => {
                    update.externals.push((module_name.clone(), "*".to_string()));
                }
                ImportSource::Local(dep_module) => {
                    // Member accesses below narrow the dependency; without
                    // any, the whole target module stays reachable.
                    if !node.member_accesses.iter().any(|a| a.root == *name) {
                        for &member_id in registry.declarations_in_module(dep_module) {
                            if registry
                                .declaration(member_id)
                                .export_info
                                .was_originally_exported
                            {
                                update.dependencies.push(member_id);
                            }
                        }
                    }
                }
            }
            continue;
        }
        if let Some(binding) = module.import_map.get(name) {
            match &binding.source {
                ImportSource::Local(dep_module) => {
                    let resolved = if binding.original_name == DEFAULT_TOKEN {
                        resolve_default_export_name(
                            graph,
                            registry,
                            dep_module,
                            &mut HashSet::new(),
                        )
                    } else {
                        Some((dep_module.clone(), binding.original_name.clone()))
                    };
                    let Some((target_module, target_name)) = resolved else {
                        debug!(
                            "{}: default import '{}' has no resolvable target",
                            decl.source_module, name
                        );
                        continue;
                    };
                    let targets = resolve_declarations(
                        graph,
                        registry,
                        &target_module,
                        &target_name,
                        &mut HashSet::new(),
                    );
                    if targets.is_empty() {
                        debug!(
                            "{}: '{}' resolves to no declaration in {}",
                            decl.source_module, name, target_module
                        );
                        continue;
                    }
                    let canonical = registry.declaration(targets[0]);
                    update.aliases.push((
                        name.to_string(),
                        ImportAliasInfo {
                            source_module: canonical.source_module.clone(),
                            original_name: canonical.name.clone(),
                            qualified_name: None,
                        },
                    ));
                    update.dependencies.extend(targets);
                }
                ImportSource::External(module_name) => {
                    let specifier = if binding.original_name == DEFAULT_TOKEN {
                        DEFAULT_TOKEN.to_string()
                    } else {
                        binding.original_name.clone()
                    };
                    update.externals.push((module_name.clone(), specifier));
                }
            }
            continue;
        }
        for &target in registry.lookup(&decl.source_module, name) {
            // Augmentation blocks merge by identity; an edge into one is
            // spurious unless it anchors an `export =`.
            let candidate = registry.declaration(target);
            if module.tree.is_module_augmentation(candidate.node)
                && candidate.export_info.kind != crate::registry::ExportKind::Equals
            {
                continue;
            }
            update.dependencies.push(target);
        }
        // Anything else is assumed ambient (lib types, globals).
    }

    for access in &node.member_accesses {
        let Some(source) = module.import_map.namespace_target(&access.root) else {
            continue;
        };
        update.namespaces.push(access.root.clone());
        match source {
            ImportSource::Local(dep_module) => {
                let narrowed = resolve_declarations(
                    graph,
                    registry,
                    dep_module,
                    &access.member,
                    &mut HashSet::new(),
                );
                if narrowed.is_empty() {
                    // Unknown member: keep the whole module reachable.
                    for &member_id in registry.declarations_in_module(dep_module) {
                        if registry
                            .declaration(member_id)
                            .export_info
                            .was_originally_exported
                        {
                            update.dependencies.push(member_id);
                        }
                    }
                } else {
                    let canonical = registry.declaration(narrowed[0]);
                    update.aliases.push((
                        access.full.clone(),
                        ImportAliasInfo {
                            source_module: canonical.source_module.clone(),
                            original_name: canonical.name.clone(),
                            qualified_name: Some(access.full.clone()),
                        },
                    ));
                    update.dependencies.extend(narrowed);
                }
            }
            ImportSource::External(module_name) => {
                update.externals.push((module_name.clone(), "*".to_string()));
            }
        }
    }

    update
}
