//! Text assembly: renders the retained declarations and the surrounding
//! import/export scaffolding into the final bundle, section by section.

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};

use crate::ast::{NodeKind, SyntaxNode};
use crate::config::BundleOptions;
use crate::export_resolver::{resolve_declarations, resolve_default_export_name};
use crate::import_map::{ImportSource, DEFAULT_TOKEN};
use crate::module::ModuleId;
use crate::module_graph::ModuleGraph;
use crate::order::Statement;
use crate::printer::{render, RenameMap};
use crate::registry::{
    ExportKind, ExportTarget, ExternalImport, NamespaceTarget, Registry, StarTarget,
};
use crate::shake::ShakeResult;

pub fn generate(
    graph: &ModuleGraph,
    registry: &Registry,
    options: &BundleOptions,
    shaken: &ShakeResult,
    statements: &[Statement],
) -> String {
    let generator = Generator {
        graph,
        registry,
        options,
        shaken,
        statements,
    };
    generator.run()
}

struct Generator<'a> {
    graph: &'a ModuleGraph,
    registry: &'a Registry,
    options: &'a BundleOptions,
    shaken: &'a ShakeResult,
    statements: &'a [Statement],
}

impl Generator<'_> {
    fn run(&self) -> String {
        let mut sections: Vec<String> = Vec::new();
        let push = |sections: &mut Vec<String>, section: String| {
            if !section.is_empty() {
                sections.push(section);
            }
        };

        if !self.options.no_banner {
            sections.push(format!(
                "// Generated by dts-bundler v{}",
                env!("CARGO_PKG_VERSION")
            ));
        }
        push(&mut sections, self.reference_directives());
        push(&mut sections, self.external_imports());
        push(&mut sections, self.passthrough_reexports());
        push(&mut sections, self.declarations());
        push(&mut sections, self.export_equals());
        push(&mut sections, self.star_reexports());
        let (namespace_blocks, namespace_aliases) = self.namespace_blocks();
        push(&mut sections, namespace_blocks);
        push(&mut sections, self.named_export_list(namespace_aliases));
        push(&mut sections, self.default_export());
        push(&mut sections, self.umd_namespace());
        if self.entry_has_empty_export() {
            sections.push("export {};".to_string());
        }

        let mut out = sections.join("\n\n");
        out.push('\n');
        out
    }

    fn entry(&self) -> Option<&ModuleId> {
        self.graph.entry()
    }

    fn entry_items(&self) -> Vec<&SyntaxNode> {
        match self.entry().and_then(|id| self.graph.get_module(id)) {
            Some(module) => module
                .tree
                .items
                .iter()
                .map(|&item| module.tree.node(item))
                .collect(),
            None => Vec::new(),
        }
    }

    fn reference_directives(&self) -> String {
        let mut values: IndexSet<String> = IndexSet::new();
        for node in self.entry_items() {
            if let NodeKind::ReferenceDirective { kind, value } = node.kind() {
                if kind == "types" && self.options.allows_types_library(value) {
                    values.insert(value.clone());
                }
            }
        }
        for import in self.used_imports() {
            if let Some(library) = &import.types_library_name {
                if self.options.allows_types_library(library) {
                    values.insert(library.clone());
                }
            }
        }
        values
            .iter()
            .map(|value| format!("/// <reference types=\"{}\" />", value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn is_used(&self, import: &ExternalImport) -> bool {
        let key = (import.module_name.clone(), import.specifier.clone());
        if self.shaken.used_externals.contains(&key) {
            return true;
        }
        import.is_equals_import
            && self
                .shaken
                .used_externals
                .contains(&(import.module_name.clone(), DEFAULT_TOKEN.to_string()))
    }

    fn used_imports(&self) -> Vec<&ExternalImport> {
        self.registry
            .external_imports()
            .filter(|import| self.is_used(import))
            .collect()
    }

    /// One consolidated import per external module; CommonJS-style lines
    /// lead.
    fn external_imports(&self) -> String {
        let mut equals_lines: Vec<String> = Vec::new();
        let mut grouped: IndexMap<String, Vec<&ExternalImport>> = IndexMap::new();
        for import in self.used_imports() {
            if import.is_equals_import {
                equals_lines.push(format!(
                    "import {} = require('{}');",
                    import.normalized_name, import.module_name
                ));
            } else {
                grouped
                    .entry(import.module_name.clone())
                    .or_default()
                    .push(import);
            }
        }

        let mut lines = equals_lines;
        for (module_name, imports) in grouped {
            let default = imports
                .iter()
                .find(|i| i.is_default_import)
                .map(|i| i.normalized_name.clone());
            let namespace = imports
                .iter()
                .find(|i| i.is_namespace_import)
                .map(|i| i.normalized_name.clone());
            let named: Vec<String> = imports
                .iter()
                .filter(|i| !i.is_default_import && !i.is_namespace_import)
                .map(|i| import_specifier(i))
                .collect();
            let all_type_only = imports.iter().all(|i| i.is_type_only);

            let mut clauses: Vec<String> = Vec::new();
            if let Some(default) = &default {
                clauses.push(default.clone());
            }
            if !named.is_empty() {
                clauses.push(format!("{{ {} }}", named.join(", ")));
            }
            if !clauses.is_empty() {
                let keyword = if all_type_only && default.is_none() {
                    "import type"
                } else {
                    "import"
                };
                lines.push(format!(
                    "{} {} from '{}';",
                    keyword,
                    clauses.join(", "),
                    module_name
                ));
            }
            if let Some(namespace) = namespace {
                lines.push(format!(
                    "import * as {} from '{}';",
                    namespace, module_name
                ));
            }
        }
        lines.join("\n")
    }

    /// `export { ... } from 'external';` lines for names the entry forwards
    /// without inlining.
    fn passthrough_reexports(&self) -> String {
        let Some(entry) = self.entry() else {
            return String::new();
        };
        let mut grouped: IndexMap<String, Vec<String>> = IndexMap::new();
        for info in self.registry.exported_names(entry) {
            if let ExportTarget::External {
                module,
                name,
                export_from: true,
            } = &info.target
            {
                let item = if name == &info.exported_name {
                    name.clone()
                } else {
                    format!("{} as {}", name, info.exported_name)
                };
                grouped.entry(module.clone()).or_default().push(item);
            }
        }
        grouped
            .into_iter()
            .map(|(module, items)| format!("export {{ {} }} from '{}';", items.join(", "), module))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn declarations(&self) -> String {
        self.statements
            .iter()
            .map(|statement| self.render_statement(statement))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_statement(&self, statement: &Statement) -> String {
        let first = self.registry.declaration(statement[0]);
        let module = self
            .graph
            .get_module(&first.source_module)
            .expect("module disappeared from the graph");
        let node = module.tree.node(first.node);
        let renames = self.rename_map(statement);

        if let NodeKind::VariableBinding { kind } = node.kind() {
            let bindings: Vec<String> = statement
                .iter()
                .map(|&id| {
                    let member = self.registry.declaration(id);
                    let text = render(module.tree.node(member.node), &renames, false);
                    let prefix = format!("{} ", kind);
                    text.strip_prefix(&prefix)
                        .unwrap_or(&text)
                        .trim_end_matches(';')
                        .to_string()
                })
                .collect();
            let mut out = String::new();
            if let Some(comment) = statement_comment(module, first.node) {
                out.push_str(&comment);
                out.push('\n');
            }
            out.push_str(&format!("declare {} {};", kind, bindings.join(", ")));
            return out;
        }

        let mut text = render(node, &renames, false);
        if module.tree.is_const_enum(first.node) && self.options.respect_preserve_const_enum {
            if let Some(stripped) = text.strip_prefix("const ") {
                text = stripped.to_string();
            }
        }
        let needs_declare = matches!(
            node.kind(),
            NodeKind::Class | NodeKind::Function | NodeKind::Enum { .. } | NodeKind::ModuleBlock { .. }
        );
        let mut out = String::new();
        if let Some(comment) = &node.leading_comment {
            out.push_str(comment);
            out.push('\n');
        }
        if needs_declare {
            out.push_str("declare ");
        }
        out.push_str(&text);
        out
    }

    /// Rename map for one statement: module-local renames, external binding
    /// renames, then the member declarations' recorded aliases.
    fn rename_map(&self, statement: &Statement) -> RenameMap {
        let first = self.registry.declaration(statement[0]);
        let module = self
            .graph
            .get_module(&first.source_module)
            .expect("module disappeared from the graph");
        let mut map = RenameMap::default();

        for &id in self.registry.declarations_in_module(&first.source_module) {
            let decl = self.registry.declaration(id);
            if decl.name != decl.normalized_name {
                map.identifiers
                    .insert(decl.name.clone(), decl.normalized_name.clone());
            }
        }
        for (local, binding) in module.import_map.bindings() {
            if let ImportSource::External(module_name) = &binding.source {
                if let Some(import) = self
                    .registry
                    .external_import(module_name, &binding.original_name)
                    .or_else(|| self.registry.external_import(module_name, local))
                {
                    if import.normalized_name != *local {
                        map.identifiers
                            .insert(local.clone(), import.normalized_name.clone());
                    }
                }
            }
        }
        for (alias, source) in module.import_map.namespace_aliases() {
            if let ImportSource::External(module_name) = source {
                if let Some(import) = self.registry.external_import(module_name, "*") {
                    if import.normalized_name != *alias {
                        map.identifiers
                            .insert(alias.clone(), import.normalized_name.clone());
                    }
                }
            }
        }
        for &id in statement {
            for (local, info) in &self.registry.declaration(id).import_aliases {
                let targets = self
                    .registry
                    .lookup(&info.source_module, &info.original_name);
                let Some(&target) = targets.first() else {
                    continue;
                };
                let final_name = self.registry.declaration(target).normalized_name.clone();
                match &info.qualified_name {
                    Some(qualified) => {
                        map.qualified.insert(qualified.clone(), final_name);
                    }
                    None => {
                        if *local != final_name {
                            map.identifiers.insert(local.clone(), final_name);
                        }
                    }
                }
            }
        }
        map
    }

    fn export_equals(&self) -> String {
        for statement in self.statements {
            for &id in statement {
                let decl = self.registry.declaration(id);
                if decl.export_info.kind == ExportKind::Equals {
                    return format!("export = {};", decl.normalized_name);
                }
            }
        }
        String::new()
    }

    fn star_reexports(&self) -> String {
        let Some(entry) = self.entry() else {
            return String::new();
        };
        let mut lines: Vec<String> = Vec::new();
        for star in self.registry.star_exports(entry) {
            if let StarTarget::External(module) = &star.target {
                lines.push(format!("export * from '{}';", module));
            }
        }
        for info in self.registry.namespace_exports(entry) {
            if let NamespaceTarget::External { module, name } = &info.target {
                match name {
                    // Re-exported namespace import: the import line already
                    // binds the alias, the export list picks it up.
                    Some(_) => {}
                    None => lines.push(format!("export * as {} from '{}';", info.alias, module)),
                }
            }
        }
        lines.join("\n")
    }

    /// Synthesized `declare namespace` blocks for local namespace
    /// re-exports, plus the aliases that must join the export list.
    fn namespace_blocks(&self) -> (String, Vec<String>) {
        let Some(entry) = self.entry() else {
            return (String::new(), Vec::new());
        };
        let mut blocks: Vec<String> = Vec::new();
        let mut aliases: Vec<String> = Vec::new();
        for info in self.registry.namespace_exports(entry) {
            let target = match &info.target {
                NamespaceTarget::Local(target) => target,
                NamespaceTarget::External { name: Some(alias), .. } => {
                    aliases.push(alias.clone());
                    continue;
                }
                NamespaceTarget::External { .. } => continue,
            };
            let mut surface: IndexMap<String, String> = IndexMap::new();
            self.module_surface(target, &mut HashSet::new(), &mut surface);
            let items: Vec<String> = surface
                .into_iter()
                .map(|(exported, final_name)| export_item(&final_name, &exported))
                .collect();
            blocks.push(format!(
                "declare namespace {} {{\n\texport {{ {} }};\n}}",
                info.alias,
                items.join(", ")
            ));
            aliases.push(info.alias.clone());
        }
        (blocks.join("\n"), aliases)
    }

    /// exportedName → final name of everything a module surfaces, through
    /// its star-export chain.
    fn module_surface(
        &self,
        module: &ModuleId,
        visited: &mut HashSet<ModuleId>,
        out: &mut IndexMap<String, String>,
    ) {
        if !visited.insert(module.clone()) {
            return;
        }
        for &id in self.registry.declarations_in_module(module) {
            let decl = self.registry.declaration(id);
            if decl.export_info.was_originally_exported
                && self.shaken.reachable.contains(&id)
            {
                out.entry(decl.name.clone())
                    .or_insert_with(|| decl.normalized_name.clone());
            }
        }
        for star in self.registry.star_exports(module) {
            if let StarTarget::Local(target) = &star.target {
                self.module_surface(target, visited, out);
            }
        }
    }

    fn named_export_list(&self, namespace_aliases: Vec<String>) -> String {
        let mut items: IndexMap<String, String> = IndexMap::new();

        // Promoted declarations, in output order.
        for statement in self.statements {
            for &id in statement {
                let decl = self.registry.declaration(id);
                if matches!(
                    decl.export_info.kind,
                    ExportKind::Named | ExportKind::NamedAndDefault
                ) {
                    items
                        .entry(decl.name.clone())
                        .or_insert_with(|| decl.normalized_name.clone());
                }
            }
        }

        // Renamed re-exports and exports of external bindings.
        if let Some(entry) = self.entry() {
            for info in self.registry.exported_names(entry) {
                if info.exported_name == DEFAULT_TOKEN {
                    continue;
                }
                match &info.target {
                    ExportTarget::Local {
                        module,
                        original_name,
                    } => {
                        let resolved = if original_name == DEFAULT_TOKEN {
                            resolve_default_export_name(
                                self.graph,
                                self.registry,
                                module,
                                &mut HashSet::new(),
                            )
                        } else {
                            Some((module.clone(), original_name.clone()))
                        };
                        let Some((decl_module, decl_name)) = resolved else {
                            continue;
                        };
                        let ids = resolve_declarations(
                            self.graph,
                            self.registry,
                            &decl_module,
                            &decl_name,
                            &mut HashSet::new(),
                        );
                        let Some(&id) = ids.first() else {
                            continue;
                        };
                        let final_name =
                            self.registry.declaration(id).normalized_name.clone();
                        items.entry(info.exported_name.clone()).or_insert(final_name);
                    }
                    ExportTarget::External {
                        module,
                        name,
                        export_from: false,
                    } => {
                        let final_name = self
                            .registry
                            .external_import(module, name)
                            .map(|import| import.normalized_name.clone())
                            .unwrap_or_else(|| name.clone());
                        items.entry(info.exported_name.clone()).or_insert(final_name);
                    }
                    ExportTarget::External { .. } => {}
                }
            }
        }

        for alias in namespace_aliases {
            items.entry(alias.clone()).or_insert(alias);
        }

        if items.is_empty() {
            return String::new();
        }
        let rendered: Vec<String> = items
            .iter()
            .map(|(exported, final_name)| export_item(final_name, exported))
            .collect();
        if rendered.len() <= 3 {
            format!("export {{ {} }};", rendered.join(", "))
        } else {
            let mut out = String::from("export {\n");
            for item in rendered {
                out.push('\t');
                out.push_str(&item);
                out.push_str(",\n");
            }
            out.push_str("};");
            out
        }
    }

    fn default_export(&self) -> String {
        for statement in self.statements {
            for &id in statement {
                let decl = self.registry.declaration(id);
                if decl.export_info.kind.is_default() {
                    return format!("export default {};", decl.normalized_name);
                }
            }
        }
        String::new()
    }

    fn umd_namespace(&self) -> String {
        for node in self.entry_items() {
            if let NodeKind::UmdNamespace { name } = node.kind() {
                return format!("export as namespace {};", name);
            }
        }
        match &self.options.umd_module_name {
            Some(name) => format!("export as namespace {};", name),
            None => String::new(),
        }
    }

    fn entry_has_empty_export(&self) -> bool {
        match self.entry().and_then(|id| self.graph.get_module(id)) {
            Some(module) => module
                .tree
                .items
                .iter()
                .any(|&item| module.tree.is_empty_export(item)),
            None => false,
        }
    }
}

fn import_specifier(import: &ExternalImport) -> String {
    if import.original_name == import.normalized_name {
        import.original_name.clone()
    } else {
        format!("{} as {}", import.original_name, import.normalized_name)
    }
}

fn export_item(final_name: &str, exported: &str) -> String {
    if final_name == exported {
        exported.to_string()
    } else {
        format!("{} as {}", final_name, exported)
    }
}

fn statement_comment(
    module: &crate::module::Module,
    binding_node: crate::ast::NodeId,
) -> Option<String> {
    // The shared statement's comment lives on the parent node; bindings
    // reference it through their statement group.
    module
        .tree
        .items
        .iter()
        .find_map(|&item| match module.tree.node(item).kind() {
            NodeKind::VariableStatement { bindings, .. }
                if bindings.contains(&binding_node) =>
            {
                module.tree.node(item).leading_comment.clone()
            }
            _ => None,
        })
}
