//! Deterministic collision resolution: colliding declaration groups get `$N`
//! suffixes, colliding external imports get `_N` suffixes, and two residual
//! passes clean up cross-category clashes.

use indexmap::{IndexMap, IndexSet};

use crate::import_map::ImportSource;
use crate::module::ModuleId;
use crate::module_graph::ModuleGraph;
use crate::registry::{DeclarationId, ExportKind, ExportTarget, Registry};

type OrderKey = (u8, u8, usize, usize, usize);

pub fn normalize_names(graph: &ModuleGraph, registry: &mut Registry) {
    rename_colliding_declarations(graph, registry);
    rename_colliding_externals(registry);
    rename_protected_collisions(graph, registry);
    rename_externals_shadowing_declarations(registry);
}

/// Same-name declaration groups that are not legitimate merges get split by
/// module; the best-ranked module keeps the bare name.
fn rename_colliding_declarations(graph: &ModuleGraph, registry: &mut Registry) {
    let mut groups: IndexMap<String, Vec<DeclarationId>> = IndexMap::new();
    for id in registry.ids().collect::<Vec<_>>() {
        groups
            .entry(registry.declaration(id).normalized_name.clone())
            .or_default()
            .push(id);
    }
    for (name, members) in groups {
        if members.len() < 2 {
            continue;
        }
        if members.iter().all(|&id| is_mergeable(graph, registry, id)) {
            continue;
        }
        let mut by_module: IndexMap<ModuleId, Vec<DeclarationId>> = IndexMap::new();
        for &id in &members {
            by_module
                .entry(registry.declaration(id).source_module.clone())
                .or_default()
                .push(id);
        }
        let mut ranked: Vec<(OrderKey, ModuleId)> = by_module
            .iter()
            .map(|(module, ids)| (module_key(graph, registry, &name, module, ids), module.clone()))
            .collect();
        ranked.sort_by(|a, b| a.0.cmp(&b.0));
        for (suffix, (_, module)) in ranked.iter().enumerate().skip(1) {
            let renamed = format!("{}${}", name, suffix);
            for &id in &by_module[module] {
                registry.declaration_mut(id).normalized_name = renamed.clone();
            }
        }
    }
}

fn is_mergeable(graph: &ModuleGraph, registry: &Registry, id: DeclarationId) -> bool {
    let decl = registry.declaration(id);
    graph
        .get_module(&decl.source_module)
        .map(|module| module.tree.is_mergeable(decl.node))
        .unwrap_or(false)
}

/// Ordering key of one module's share of a colliding name. Lower sorts
/// first and keeps the bare name.
fn module_key(
    graph: &ModuleGraph,
    registry: &Registry,
    name: &str,
    module: &ModuleId,
    members: &[DeclarationId],
) -> OrderKey {
    let exported = members
        .iter()
        .any(|&id| registry.declaration(id).export_info.kind.is_exported());
    let equals = members
        .iter()
        .any(|&id| registry.declaration(id).export_info.kind == ExportKind::Equals);
    let (name_position, module_position) = graph
        .entry()
        .and_then(|entry| graph.get_module(entry))
        .map(|entry| {
            let source = ImportSource::Local(module.clone());
            let name_position = match entry.import_map.get(name) {
                Some(binding) if binding.source == source => {
                    entry.import_map.name_position(name).unwrap_or(usize::MAX)
                }
                _ => usize::MAX,
            };
            let module_position = entry
                .import_map
                .module_position(&source)
                .unwrap_or(usize::MAX);
            (name_position, module_position)
        })
        .unwrap_or((usize::MAX, usize::MAX));
    (
        if exported { 0 } else { 1 },
        if equals { 1 } else { 0 },
        name_position,
        module_position,
        graph.discovery_index(module),
    )
}

/// External imports sharing a bare name are disambiguated with `_N` suffixes,
/// in registration order.
fn rename_colliding_externals(registry: &mut Registry) {
    let mut seen: IndexSet<String> = IndexSet::new();
    for import in registry.external_imports_mut() {
        let base = import.normalized_name.clone();
        if seen.insert(base.clone()) {
            continue;
        }
        let mut counter = 1;
        let mut candidate = format!("{}_{}", base, counter);
        while !seen.insert(candidate.clone()) {
            counter += 1;
            candidate = format!("{}_{}", base, counter);
        }
        import.normalized_name = candidate;
    }
}

/// Names the entry re-exports straight from an external module are
/// protected: no inlined declaration may occupy them.
fn rename_protected_collisions(graph: &ModuleGraph, registry: &mut Registry) {
    let entry = match graph.entry() {
        Some(entry) => entry.clone(),
        None => return,
    };
    let protected: IndexSet<String> = registry
        .exported_names(&entry)
        .iter()
        .filter(|info| {
            matches!(
                info.target,
                ExportTarget::External {
                    export_from: true,
                    ..
                }
            )
        })
        .map(|info| info.exported_name.clone())
        .collect();
    if protected.is_empty() {
        return;
    }
    let mut used = used_names(registry);
    used.extend(protected.iter().cloned());
    let ids: Vec<DeclarationId> = registry.ids().collect();
    let mut renames: IndexMap<String, String> = IndexMap::new();
    for id in ids {
        let current = registry.declaration(id).normalized_name.clone();
        if !protected.contains(&current) {
            continue;
        }
        let renamed = renames
            .entry(current.clone())
            .or_insert_with(|| probe(&current, &mut used))
            .clone();
        registry.declaration_mut(id).normalized_name = renamed;
    }
}

/// An external-import local name must not shadow a final declaration name.
fn rename_externals_shadowing_declarations(registry: &mut Registry) {
    let declaration_names: IndexSet<String> = registry
        .ids()
        .collect::<Vec<_>>()
        .into_iter()
        .map(|id| registry.declaration(id).normalized_name.clone())
        .collect();
    let mut used = used_names(registry);
    for import in registry.external_imports_mut() {
        if declaration_names.contains(&import.normalized_name) {
            import.normalized_name = probe(&import.normalized_name, &mut used);
        }
    }
}

fn used_names(registry: &Registry) -> IndexSet<String> {
    let mut used: IndexSet<String> = IndexSet::new();
    for id in registry.ids().collect::<Vec<_>>() {
        used.insert(registry.declaration(id).normalized_name.clone());
    }
    for import in registry.external_imports() {
        used.insert(import.normalized_name.clone());
    }
    used
}

/// Smallest `base$N` not yet used; reserves it.
fn probe(base: &str, used: &mut IndexSet<String>) -> String {
    let mut counter = 1;
    loop {
        let candidate = format!("{}${}", base, counter);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build_module_graph;
    use crate::collector::collect_declarations;
    use crate::config::BundleOptions;
    use crate::export_resolver::resolve_exports;
    use crate::host::MemoryHost;
    use crate::import_map::build_import_maps;
    use maplit::hashmap;

    fn normalize(files: std::collections::HashMap<String, String>) -> (ModuleGraph, Registry) {
        let host = MemoryHost::new(files);
        let options = BundleOptions::default();
        let (mut graph, root) =
            build_module_graph(&host, "/src/entry.d.ts", &options).unwrap();
        let mut registry = Registry::new();
        build_import_maps(&mut graph, &mut registry, &host, &options, &root);
        collect_declarations(&graph, &mut registry, &options);
        resolve_exports(&graph, &mut registry);
        normalize_names(&graph, &mut registry);
        (graph, registry)
    }

    fn normalized(registry: &Registry, module: &str, name: &str) -> String {
        registry
            .declaration(registry.lookup(&ModuleId::new(module), name)[0])
            .normalized_name
            .clone()
    }

    #[test]
    fn colliding_classes_get_dollar_suffixes() {
        let (_, registry) = normalize(hashmap! {
            "/src/entry.d.ts".to_string() =>
                "export { Foo } from './a';\nexport { Foo as FooB } from './b';\n".to_string(),
            "/src/a.d.ts".to_string() => "export declare class Foo {}\n".to_string(),
            "/src/b.d.ts".to_string() => "export declare class Foo {}\n".to_string(),
        });
        assert_eq!(normalized(&registry, "/src/a.d.ts", "Foo"), "Foo");
        assert_eq!(normalized(&registry, "/src/b.d.ts", "Foo"), "Foo$1");
    }

    #[test]
    fn interface_merging_is_exempt() {
        let (_, registry) = normalize(hashmap! {
            "/src/entry.d.ts".to_string() =>
                "export interface Config { a: string; }\nexport { Config } from './base';\n"
                    .to_string(),
            "/src/base.d.ts".to_string() =>
                "export interface Config { b: string; }\n".to_string(),
        });
        assert_eq!(normalized(&registry, "/src/entry.d.ts", "Config"), "Config");
        assert_eq!(normalized(&registry, "/src/base.d.ts", "Config"), "Config");
    }

    #[test]
    fn exported_group_outranks_private_one() {
        let (_, registry) = normalize(hashmap! {
            "/src/entry.d.ts".to_string() => "export { Foo } from './b';\n".to_string(),
            // /src/b.d.ts is discovered first through the re-export, but a
            // later module's private Foo must still lose the bare name.
            "/src/b.d.ts".to_string() =>
                "import './c';\nexport declare class Foo {}\n".to_string(),
            "/src/c.d.ts".to_string() =>
                "declare class Foo {}\nexport interface Holder { foo: Foo; }\n".to_string(),
        });
        assert_eq!(normalized(&registry, "/src/b.d.ts", "Foo"), "Foo");
        assert_eq!(normalized(&registry, "/src/c.d.ts", "Foo"), "Foo$1");
    }

    #[test]
    fn colliding_external_imports_get_underscore_suffixes() {
        let (_, registry) = normalize(hashmap! {
            "/src/entry.d.ts".to_string() =>
                "import { Stream } from 'node:stream';\n\
                 import { Dep } from './dep';\n\
                 export interface Both { a: Stream; b: Dep; }\n".to_string(),
            "/src/dep.d.ts".to_string() =>
                "import { Stream } from 'web-streams';\n\
                 export interface Dep { s: Stream; }\n".to_string(),
        });
        let first = registry.external_import("node:stream", "Stream").unwrap();
        assert_eq!(first.normalized_name, "Stream");
        let second = registry.external_import("web-streams", "Stream").unwrap();
        assert_eq!(second.normalized_name, "Stream_1");
    }

    #[test]
    fn external_shadowing_declaration_is_renamed() {
        let (_, registry) = normalize(hashmap! {
            "/src/entry.d.ts".to_string() =>
                "import { Foo } from 'pkg';\n\
                 export declare class Foo {}\n".to_string(),
        });
        assert_eq!(normalized(&registry, "/src/entry.d.ts", "Foo"), "Foo");
        let external = registry.external_import("pkg", "Foo").unwrap();
        assert_eq!(external.normalized_name, "Foo$1");
    }
}
