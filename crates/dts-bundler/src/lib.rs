//! Bundles a TypeScript declaration entry point and the local modules it
//! reaches into one flat `.d.ts` file: inlines reachable modules, resolves
//! the re-export graph, drops unreachable declarations and renames
//! collisions deterministically.

use anyhow::Result;

pub mod analyze_deps;
pub mod ast;
pub mod build;
pub mod cli;
pub mod collector;
pub mod compiler;
pub mod config;
pub mod error;
pub mod export_resolver;
pub mod generate;
pub mod host;
pub mod import_map;
pub mod logger;
pub mod module;
pub mod module_graph;
pub mod normalize;
pub mod order;
pub mod parse;
pub mod printer;
pub mod registry;
pub mod resolve;
pub mod shake;

pub use compiler::Compiler;
pub use config::BundleOptions;
pub use error::BundleError;

/// Bundle `entry` and everything it reaches into one declaration file.
/// Fails if the entry path does not exist.
pub fn bundle(
    entry: &str,
    inlined_libraries: Vec<String>,
    mut options: BundleOptions,
) -> Result<String> {
    for library in inlined_libraries {
        if !options.inlined_libraries.contains(&library) {
            options.inlined_libraries.push(library);
        }
    }
    let host = host::FsHost;
    Compiler::new(&host, options).compile(entry)
}
