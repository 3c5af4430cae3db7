//! Turns top-level module items into registered declarations with their
//! initial export classification.

use tracing::debug;

use crate::ast::{ModuleBlockName, ModuleTree, NodeId, NodeKind, SyntaxNode};
use crate::config::BundleOptions;
use crate::module::ModuleId;
use crate::module_graph::ModuleGraph;
use crate::registry::{ExportInfo, ExportKind, Registry};

pub fn collect_declarations(
    graph: &ModuleGraph,
    registry: &mut Registry,
    options: &BundleOptions,
) {
    for module_id in graph.module_ids() {
        let module = graph
            .get_module(&module_id)
            .expect("module disappeared from the graph");
        for &item in &module.tree.items {
            collect_item(
                &module.tree,
                item,
                &module_id,
                module.is_entry,
                registry,
                options,
                Ambient::None,
            );
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Ambient {
    None,
    /// Inside a `declare module "..."` block for an inlined library.
    InlinedModule,
}

fn collect_item(
    tree: &ModuleTree,
    item: NodeId,
    module_id: &ModuleId,
    is_entry: bool,
    registry: &mut Registry,
    options: &BundleOptions,
    ambient: Ambient,
) {
    let node = tree.node(item);
    match node.kind().clone() {
        NodeKind::Interface
        | NodeKind::Class
        | NodeKind::Function
        | NodeKind::Enum { .. }
        | NodeKind::TypeAlias => {
            let name = declaration_name(node, module_id, registry);
            let info = classify(node, is_entry, ambient);
            let id = registry.add_declaration(name, module_id.clone(), item, info);
            let decl = registry.declaration_mut(id);
            decl.force_include = ambient == Ambient::InlinedModule;
            decl.is_type_only = matches!(node.kind(), NodeKind::Interface | NodeKind::TypeAlias);
        }
        NodeKind::VariableStatement { bindings, .. } => {
            for binding in bindings {
                let child = tree.node(binding);
                let name = declaration_name(child, module_id, registry);
                let info = classify(child, is_entry, ambient);
                let id = registry.add_declaration(name, module_id.clone(), binding, info);
                let decl = registry.declaration_mut(id);
                decl.force_include = ambient == Ambient::InlinedModule;
                decl.statement_group = Some((module_id.clone(), item));
            }
        }
        NodeKind::ModuleBlock { name, items } => match name {
            ModuleBlockName::Quoted(module_name) => {
                if options.is_inlined_library(&module_name) {
                    // The ambient module is scheduled for inlining: every
                    // contained item joins the import surface, recursively.
                    for child in items {
                        collect_item(
                            tree,
                            child,
                            module_id,
                            is_entry,
                            registry,
                            options,
                            Ambient::InlinedModule,
                        );
                    }
                } else if options.inline_declare_externals {
                    let id = registry.add_declaration(
                        module_name,
                        module_id.clone(),
                        item,
                        ExportInfo::not_exported(node.is_exported),
                    );
                    registry.declaration_mut(id).force_include = true;
                } else {
                    debug!(
                        "{}: skipping ambient module '{}' (not inlined)",
                        module_id, module_name
                    );
                }
            }
            ModuleBlockName::Ident(ident) => {
                // Identifier-named augmentation: a normal declaration.
                let info = classify(node, is_entry, ambient);
                let id = registry.add_declaration(ident, module_id.clone(), item, info);
                registry.declaration_mut(id).force_include = ambient == Ambient::InlinedModule;
            }
            ModuleBlockName::Global => {
                let id = registry.add_declaration(
                    "global".to_string(),
                    module_id.clone(),
                    item,
                    ExportInfo::not_exported(false),
                );
                // Retained in output only when global inlining is on.
                registry.declaration_mut(id).force_include = options.inline_declare_globals;
            }
        },
        _ => {}
    }
}

fn classify(node: &SyntaxNode, is_entry: bool, ambient: Ambient) -> ExportInfo {
    if node.has_default_modifier {
        return ExportInfo {
            kind: if is_entry {
                ExportKind::DefaultOnly
            } else {
                ExportKind::NotExported
            },
            was_originally_exported: true,
        };
    }
    if node.is_exported && (is_entry || ambient == Ambient::InlinedModule) {
        return ExportInfo {
            kind: ExportKind::Named,
            was_originally_exported: true,
        };
    }
    ExportInfo::not_exported(node.is_exported)
}

/// The declared name, or a synthesized `_default`/`_default$N` name for an
/// anonymous default-exported entity.
fn declaration_name(node: &SyntaxNode, module_id: &ModuleId, registry: &Registry) -> String {
    if let Some(name) = &node.name {
        if !name.is_empty() {
            return name.clone();
        }
    }
    let mut candidate = "_default".to_string();
    let mut counter = 0;
    while !registry.lookup(module_id, &candidate).is_empty() {
        counter += 1;
        candidate = format!("_default${}", counter);
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Module;
    use crate::parse::parse_module;

    fn collect(source: &str, is_entry: bool, options: &BundleOptions) -> Registry {
        let mut graph = ModuleGraph::new();
        let tree = parse_module(source).unwrap();
        graph.add_module(Module::new(ModuleId::new("/m.d.ts"), is_entry, tree));
        let mut registry = Registry::new();
        collect_declarations(&graph, &mut registry, options);
        registry
    }

    #[test]
    fn entry_exports_are_named() {
        let registry = collect(
            "export interface A {}\ninterface B {}\nexport default class C {}\n",
            true,
            &BundleOptions::default(),
        );
        let m = ModuleId::new("/m.d.ts");
        let a = registry.declaration(registry.lookup(&m, "A")[0]);
        assert_eq!(a.export_info.kind, ExportKind::Named);
        let b = registry.declaration(registry.lookup(&m, "B")[0]);
        assert_eq!(b.export_info.kind, ExportKind::NotExported);
        assert!(!b.export_info.was_originally_exported);
        let c = registry.declaration(registry.lookup(&m, "C")[0]);
        assert_eq!(c.export_info.kind, ExportKind::DefaultOnly);
    }

    #[test]
    fn non_entry_exports_track_original_flag() {
        let registry = collect(
            "export interface A {}\ninterface B {}\n",
            false,
            &BundleOptions::default(),
        );
        let m = ModuleId::new("/m.d.ts");
        let a = registry.declaration(registry.lookup(&m, "A")[0]);
        assert_eq!(a.export_info.kind, ExportKind::NotExported);
        assert!(a.export_info.was_originally_exported);
    }

    #[test]
    fn variable_statement_splits_into_grouped_declarations() {
        let registry = collect(
            "export declare const a: number, b: string;\n",
            true,
            &BundleOptions::default(),
        );
        let m = ModuleId::new("/m.d.ts");
        let a = registry.declaration(registry.lookup(&m, "a")[0]);
        let b = registry.declaration(registry.lookup(&m, "b")[0]);
        assert_eq!(a.statement_group, b.statement_group);
        assert!(a.statement_group.is_some());
        assert_eq!(a.export_info.kind, ExportKind::Named);
    }

    #[test]
    fn inlined_ambient_module_items_are_force_included() {
        let options = BundleOptions {
            inlined_libraries: vec!["lib".into()],
            ..Default::default()
        };
        let registry = collect(
            "declare module \"lib\" { export interface Inner {} interface Hidden {} }\n",
            false,
            &options,
        );
        let m = ModuleId::new("/m.d.ts");
        let inner = registry.declaration(registry.lookup(&m, "Inner")[0]);
        assert!(inner.force_include);
        assert_eq!(inner.export_info.kind, ExportKind::Named);
        let hidden = registry.declaration(registry.lookup(&m, "Hidden")[0]);
        assert!(hidden.force_include);
        assert_eq!(hidden.export_info.kind, ExportKind::NotExported);
    }

    #[test]
    fn ambient_module_kept_opaque_only_when_enabled() {
        let source = "declare module \"ext\" { export interface X {} }\n";
        let registry = collect(source, false, &BundleOptions::default());
        assert!(registry.is_empty());

        let options = BundleOptions {
            inline_declare_externals: true,
            ..Default::default()
        };
        let registry = collect(source, false, &options);
        let m = ModuleId::new("/m.d.ts");
        let block = registry.declaration(registry.lookup(&m, "ext")[0]);
        assert!(block.force_include);
    }

    #[test]
    fn global_block_follows_inline_option() {
        let source = "declare global { interface Window {} }\n";
        let registry = collect(source, true, &BundleOptions::default());
        let m = ModuleId::new("/m.d.ts");
        assert!(!registry.declaration(registry.lookup(&m, "global")[0]).force_include);

        let options = BundleOptions {
            inline_declare_globals: true,
            ..Default::default()
        };
        let registry = collect(source, true, &options);
        assert!(registry.declaration(registry.lookup(&m, "global")[0]).force_include);
    }

    #[test]
    fn anonymous_default_gets_synthesized_name() {
        let registry = collect("export default class {}\n", true, &BundleOptions::default());
        let m = ModuleId::new("/m.d.ts");
        let decl = registry.declaration(registry.lookup(&m, "_default")[0]);
        assert_eq!(decl.export_info.kind, ExportKind::DefaultOnly);
    }
}
