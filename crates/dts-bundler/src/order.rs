//! Final statement ordering: cycle-breaking topological sort over the
//! reachable set, with private declarations leading and multi-binding
//! variable statements regrouped.

use std::collections::HashMap;
use std::collections::HashSet;

use indexmap::IndexSet;

use crate::ast::NodeId;
use crate::config::BundleOptions;
use crate::module::ModuleId;
use crate::registry::{DeclarationId, Registry};

/// One output statement; more than one id only for combined variable
/// bindings.
pub type Statement = Vec<DeclarationId>;

pub fn order_declarations(
    registry: &Registry,
    reachable: &IndexSet<DeclarationId>,
    options: &BundleOptions,
) -> Vec<Statement> {
    // Registration order is source order; the stable pre-pass floats private
    // support types ahead of the exported ones that use them.
    let mut seeds: Vec<DeclarationId> = registry
        .ids()
        .filter(|id| reachable.contains(id))
        .collect();
    if options.sort_nodes {
        seeds.sort_by(|&a, &b| {
            registry
                .declaration(a)
                .normalized_name
                .cmp(&registry.declaration(b).normalized_name)
                .then(a.cmp(&b))
        });
    }
    let (private, exported): (Vec<_>, Vec<_>) = seeds
        .into_iter()
        .partition(|&id| !registry.declaration(id).export_info.kind.is_exported());

    let mut sorter = Sorter {
        registry,
        reachable,
        colors: HashMap::new(),
        output: Vec::new(),
    };
    for id in private.into_iter().chain(exported) {
        sorter.visit(id);
    }

    regroup(registry, sorter.output)
}

#[derive(Clone, Copy, PartialEq)]
enum Color {
    Visiting,
    Visited,
}

struct Sorter<'a> {
    registry: &'a Registry,
    reachable: &'a IndexSet<DeclarationId>,
    colors: HashMap<DeclarationId, Color>,
    output: Vec<DeclarationId>,
}

impl Sorter<'_> {
    fn visit(&mut self, id: DeclarationId) {
        // A node already on the visiting path closes a cycle; treating it as
        // satisfied breaks the cycle instead of erroring.
        if self.colors.contains_key(&id) {
            return;
        }
        self.colors.insert(id, Color::Visiting);
        for &dep in &self.registry.declaration(id).dependencies {
            if self.reachable.contains(&dep) {
                self.visit(dep);
            }
        }
        self.colors.insert(id, Color::Visited);
        self.output.push(id);
    }
}

/// Bindings that shared one variable statement are fused back together, at
/// the position of the first member; mixed export-ness splits the statement
/// in two (private bindings first).
fn regroup(registry: &Registry, order: Vec<DeclarationId>) -> Vec<Statement> {
    let mut statements = Vec::new();
    let mut emitted: HashSet<(ModuleId, NodeId)> = HashSet::new();
    for (position, &id) in order.iter().enumerate() {
        let group = match &registry.declaration(id).statement_group {
            None => {
                statements.push(vec![id]);
                continue;
            }
            Some(group) => group.clone(),
        };
        if !emitted.insert(group.clone()) {
            continue;
        }
        let mut members: Vec<DeclarationId> = order[position..]
            .iter()
            .copied()
            .filter(|&other| {
                registry.declaration(other).statement_group.as_ref() == Some(&group)
            })
            .collect();
        members.sort_unstable();
        let (private, exported): (Vec<_>, Vec<_>) = members
            .into_iter()
            .partition(|&m| !registry.declaration(m).export_info.kind.is_exported());
        if private.is_empty() || exported.is_empty() {
            statements.push(if private.is_empty() { exported } else { private });
        } else {
            statements.push(private);
            statements.push(exported);
        }
    }
    statements
}
