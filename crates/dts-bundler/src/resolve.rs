//! Module specifier resolution, driven through the [`CompilerHost`] so it
//! works identically against the filesystem and in-memory sources.

use std::path::Path;

use tracing::debug;

use crate::config::BundleOptions;
use crate::host::CompilerHost;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedModule {
    /// Resolved to a local file that will be inlined.
    Local(String),
    /// Stays an import of the original specifier.
    External,
}

const CANDIDATE_SUFFIXES: &[&str] = &["", ".d.ts", ".ts"];
const INDEX_CANDIDATES: &[&str] = &["/index.d.ts", "/index.ts"];

pub fn resolve_specifier(
    host: &dyn CompilerHost,
    from_module: &str,
    specifier: &str,
    options: &BundleOptions,
    root: &str,
) -> ResolvedModule {
    if specifier.starts_with('.') {
        let base = dirname(from_module);
        let joined = normalize_path(&format!("{}/{}", base, specifier));
        match probe(host, &joined) {
            Some(path) => ResolvedModule::Local(path),
            None => {
                debug!(
                    "unresolvable relative import '{}' from {}; not inlined",
                    specifier, from_module
                );
                ResolvedModule::External
            }
        }
    } else if options.is_inlined_library(specifier) {
        let joined = normalize_path(&format!("{}/node_modules/{}", root, specifier));
        match probe(host, &joined) {
            Some(path) => ResolvedModule::Local(path),
            None => {
                debug!(
                    "inlined library '{}' not found under {}/node_modules; kept external",
                    specifier, root
                );
                ResolvedModule::External
            }
        }
    } else {
        ResolvedModule::External
    }
}

fn probe(host: &dyn CompilerHost, base: &str) -> Option<String> {
    for suffix in CANDIDATE_SUFFIXES {
        let candidate = format!("{}{}", base, suffix);
        if host.file_exists(Path::new(&candidate)) {
            return Some(candidate);
        }
    }
    for suffix in INDEX_CANDIDATES {
        let candidate = format!("{}{}", base, suffix);
        if host.file_exists(Path::new(&candidate)) {
            return Some(candidate);
        }
    }
    None
}

pub fn dirname(path: &str) -> String {
    match path.rfind('/') {
        Some(i) => path[..i].to_string(),
        None => ".".to_string(),
    }
}

/// Lexical `.`/`..` normalization; never touches the filesystem.
pub fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;
    use maplit::hashmap;

    fn host() -> MemoryHost {
        MemoryHost::new(hashmap! {
            "/src/types.d.ts".to_string() => String::new(),
            "/src/lib/local.d.ts".to_string() => String::new(),
            "/src/lib/index.d.ts".to_string() => String::new(),
            "/src/node_modules/inlined/index.d.ts".to_string() => String::new(),
        })
    }

    #[test]
    fn normalizes_dot_segments() {
        assert_eq!(normalize_path("/src/./lib/../types"), "/src/types");
        assert_eq!(normalize_path("a/b/../c"), "a/c");
        assert_eq!(normalize_path("../x"), "../x");
    }

    #[test]
    fn resolves_relative_with_extensions() {
        let options = BundleOptions::default();
        assert_eq!(
            resolve_specifier(&host(), "/src/types.d.ts", "./lib/local", &options, "/src"),
            ResolvedModule::Local("/src/lib/local.d.ts".to_string())
        );
        assert_eq!(
            resolve_specifier(&host(), "/src/types.d.ts", "./lib", &options, "/src"),
            ResolvedModule::Local("/src/lib/index.d.ts".to_string())
        );
    }

    #[test]
    fn unresolvable_relative_degrades_to_external() {
        let options = BundleOptions::default();
        assert_eq!(
            resolve_specifier(&host(), "/src/types.d.ts", "./missing", &options, "/src"),
            ResolvedModule::External
        );
    }

    #[test]
    fn package_imports_stay_external_unless_inlined() {
        let mut options = BundleOptions::default();
        assert_eq!(
            resolve_specifier(&host(), "/src/types.d.ts", "inlined", &options, "/src"),
            ResolvedModule::External
        );
        options.inlined_libraries.push("inlined".to_string());
        assert_eq!(
            resolve_specifier(&host(), "/src/types.d.ts", "inlined", &options, "/src"),
            ResolvedModule::Local("/src/node_modules/inlined/index.d.ts".to_string())
        );
    }
}
