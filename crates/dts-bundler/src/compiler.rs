//! Pipeline orchestrator. Pass order is load-bearing: each stage reads
//! registry state the previous ones wrote.

use anyhow::Result;
use tracing::{debug, info};

use crate::analyze_deps::analyze_dependencies;
use crate::build::build_module_graph;
use crate::collector::collect_declarations;
use crate::config::BundleOptions;
use crate::export_resolver::resolve_exports;
use crate::generate::generate;
use crate::host::CompilerHost;
use crate::import_map::build_import_maps;
use crate::normalize::normalize_names;
use crate::order::order_declarations;
use crate::registry::Registry;
use crate::shake::shake;

pub struct Compiler<'a> {
    host: &'a dyn CompilerHost,
    options: BundleOptions,
}

impl<'a> Compiler<'a> {
    pub fn new(host: &'a dyn CompilerHost, options: BundleOptions) -> Self {
        Self { host, options }
    }

    pub fn compile(&self, entry: &str) -> Result<String> {
        let (mut graph, root) = build_module_graph(self.host, entry, &self.options)?;
        info!("loaded {} modules from {}", graph.module_ids().len(), root);

        let mut registry = Registry::new();
        build_import_maps(&mut graph, &mut registry, self.host, &self.options, &root);
        collect_declarations(&graph, &mut registry, &self.options);
        resolve_exports(&graph, &mut registry);
        analyze_dependencies(&graph, &mut registry);
        normalize_names(&graph, &mut registry);

        let shaken = shake(&graph, &registry, &self.options);
        debug!(
            "retained {} of {} declarations",
            shaken.reachable.len(),
            registry.len()
        );
        let statements = order_declarations(&registry, &shaken.reachable, &self.options);
        Ok(generate(&graph, &registry, &self.options, &shaken, &statements))
    }
}
