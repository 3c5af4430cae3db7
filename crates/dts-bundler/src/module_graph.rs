use std::collections::HashMap;
use std::fmt;

use petgraph::graph::{DefaultIx, NodeIndex};
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::IntoEdgeReferences;
use petgraph::prelude::EdgeRef;

use crate::module::{Dependency, Module, ModuleId};

/// Module-level graph. Discovery order is recorded explicitly: every
/// downstream pass iterates modules in that order so identical inputs yield
/// identical output bytes.
pub struct ModuleGraph {
    id_index_map: HashMap<ModuleId, NodeIndex<DefaultIx>>,
    pub graph: StableDiGraph<Module, Dependency>,
    discovery_order: Vec<ModuleId>,
    entry: Option<ModuleId>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self {
            id_index_map: HashMap::new(),
            graph: StableDiGraph::new(),
            discovery_order: Vec::new(),
            entry: None,
        }
    }

    pub fn add_module(&mut self, module: Module) {
        let id = module.id.clone();
        let is_entry = module.is_entry;
        let idx = self.graph.add_node(module);
        self.id_index_map.insert(id.clone(), idx);
        if is_entry {
            self.entry = Some(id.clone());
        }
        self.discovery_order.push(id);
    }

    pub fn entry(&self) -> Option<&ModuleId> {
        self.entry.as_ref()
    }

    pub fn has_module(&self, module_id: &ModuleId) -> bool {
        self.id_index_map.contains_key(module_id)
    }

    pub fn get_module(&self, module_id: &ModuleId) -> Option<&Module> {
        self.id_index_map
            .get(module_id)
            .and_then(|i| self.graph.node_weight(*i))
    }

    pub fn get_module_mut(&mut self, module_id: &ModuleId) -> Option<&mut Module> {
        self.id_index_map
            .get(module_id)
            .and_then(|i| self.graph.node_weight_mut(*i))
    }

    /// Module ids in discovery order.
    pub fn module_ids(&self) -> Vec<ModuleId> {
        self.discovery_order.clone()
    }

    /// The position of a module in discovery order; unknown modules sort
    /// last.
    pub fn discovery_index(&self, module_id: &ModuleId) -> usize {
        self.discovery_order
            .iter()
            .position(|id| id == module_id)
            .unwrap_or(usize::MAX)
    }

    /// Target of the dependency edge whose specifier string is `specifier`.
    pub fn dependency_target(&self, from: &ModuleId, specifier: &str) -> Option<&ModuleId> {
        let idx = *self.id_index_map.get(from)?;
        self.graph
            .edges(idx)
            .find(|edge| edge.weight().source == specifier)
            .map(|edge| &self.graph[edge.target()].id)
    }

    pub fn add_dependency(&mut self, from: &ModuleId, to: &ModuleId, edge: Dependency) {
        let from = *self
            .id_index_map
            .get(from)
            .unwrap_or_else(|| panic!("module {:?} not found in the module graph", from));
        let to = *self
            .id_index_map
            .get(to)
            .unwrap_or_else(|| panic!("module {:?} not found in the module graph", to));
        self.graph.update_edge(from, to, edge);
    }
}

impl fmt::Display for ModuleGraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut nodes = self
            .graph
            .node_weights()
            .map(|node| node.id.id.as_str())
            .collect::<Vec<_>>();
        let mut references = self
            .graph
            .edge_references()
            .map(|edge| {
                let source = &self.graph[edge.source()].id;
                let target = &self.graph[edge.target()].id;
                format!("{} -> {}", source, target)
            })
            .collect::<Vec<_>>();
        nodes.sort();
        references.sort();
        write!(f, "graph\n nodes:{:?} \n references:{:?}", &nodes, &references)
    }
}

impl Default for ModuleGraph {
    fn default() -> Self {
        Self::new()
    }
}
