//! Module discovery: walks import/re-export edges from the entry and loads
//! every locally-resolvable module into the graph, in deterministic
//! discovery order.

use std::collections::VecDeque;
use std::path::Path;

use anyhow::Result;
use tracing::debug;

use crate::ast::NodeKind;
use crate::config::BundleOptions;
use crate::error::BundleError;
use crate::host::CompilerHost;
use crate::module::{Dependency, Module, ModuleId, ResolveType};
use crate::module_graph::ModuleGraph;
use crate::parse::parse_module;
use crate::resolve::{dirname, resolve_specifier, ResolvedModule};

pub fn build_module_graph(
    host: &dyn CompilerHost,
    entry: &str,
    options: &BundleOptions,
) -> Result<(ModuleGraph, String)> {
    if !host.file_exists(Path::new(entry)) {
        return Err(BundleError::EntryNotFound(entry.into()).into());
    }
    let root = dirname(entry);
    let mut graph = ModuleGraph::new();
    let mut queue: VecDeque<ModuleId> = VecDeque::new();

    let entry_id = ModuleId::new(entry);
    load_module(host, &entry_id, true, &mut graph)?;
    queue.push_back(entry_id);

    while let Some(module_id) = queue.pop_front() {
        let specifiers = module_specifiers(&graph, &module_id);
        for (order, (specifier, resolve_type)) in specifiers.into_iter().enumerate() {
            match resolve_specifier(host, &module_id.id, &specifier, options, &root) {
                ResolvedModule::Local(path) => {
                    let dep_id = ModuleId::new(path);
                    if !graph.has_module(&dep_id) {
                        load_module(host, &dep_id, false, &mut graph)?;
                        queue.push_back(dep_id.clone());
                    }
                    graph.add_dependency(
                        &module_id,
                        &dep_id,
                        Dependency {
                            source: specifier,
                            resolve_type,
                            order,
                        },
                    );
                }
                ResolvedModule::External => {
                    debug!("{}: '{}' stays external", module_id, specifier);
                }
            }
        }
    }

    Ok((graph, root))
}

fn load_module(
    host: &dyn CompilerHost,
    module_id: &ModuleId,
    is_entry: bool,
    graph: &mut ModuleGraph,
) -> Result<()> {
    debug!("load {}", module_id);
    let source = host.read_file(Path::new(&module_id.id))?;
    let tree = parse_module(&source)?;
    graph.add_module(Module::new(module_id.clone(), is_entry, tree));
    Ok(())
}

/// Import/re-export specifiers of a module's top-level items, in source
/// order.
fn module_specifiers(graph: &ModuleGraph, module_id: &ModuleId) -> Vec<(String, ResolveType)> {
    let module = match graph.get_module(module_id) {
        Some(m) => m,
        None => return Vec::new(),
    };
    let mut specifiers = Vec::new();
    for &item in &module.tree.items {
        match module.tree.node(item).kind() {
            NodeKind::Import { source, .. } => {
                specifiers.push((source.clone(), ResolveType::Import));
            }
            NodeKind::ImportEquals { source, .. } => {
                specifiers.push((source.clone(), ResolveType::Import));
            }
            NodeKind::ExportNamed {
                source: Some(source),
                ..
            } => {
                specifiers.push((source.clone(), ResolveType::ExportNamed));
            }
            NodeKind::ExportStar { source, .. } => {
                specifiers.push((source.clone(), ResolveType::ExportAll));
            }
            _ => {}
        }
    }
    specifiers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use maplit::hashmap;

    #[test]
    fn missing_entry_is_fatal() {
        let host = MemoryHost::default();
        let result = build_module_graph(&host, "/src/missing.d.ts", &BundleOptions::default());
        let error = result.err().unwrap();
        assert!(error.downcast_ref::<BundleError>().is_some());
    }

    #[test]
    fn discovers_transitive_modules_in_order() {
        let host = MemoryHost::new(hashmap! {
            "/src/entry.d.ts".to_string() =>
                "import { B } from './b';\nexport * from './c';\nexport interface A { b: B }\n".to_string(),
            "/src/b.d.ts".to_string() => "export interface B {}\n".to_string(),
            "/src/c.d.ts".to_string() => "export interface C {}\n".to_string(),
        });
        let (graph, root) =
            build_module_graph(&host, "/src/entry.d.ts", &BundleOptions::default()).unwrap();
        assert_eq!(root, "/src");
        assert_eq!(
            graph.module_ids(),
            vec![
                ModuleId::new("/src/entry.d.ts"),
                ModuleId::new("/src/b.d.ts"),
                ModuleId::new("/src/c.d.ts"),
            ]
        );
        assert!(graph.get_module(&ModuleId::new("/src/entry.d.ts")).unwrap().is_entry);
    }

    #[test]
    fn import_cycles_terminate() {
        let host = MemoryHost::new(hashmap! {
            "/src/a.d.ts".to_string() =>
                "import { B } from './b';\nexport interface A { b: B }\n".to_string(),
            "/src/b.d.ts".to_string() =>
                "import { A } from './a';\nexport interface B { a: A }\n".to_string(),
        });
        let (graph, _) =
            build_module_graph(&host, "/src/a.d.ts", &BundleOptions::default()).unwrap();
        assert_eq!(graph.module_ids().len(), 2);
    }
}
