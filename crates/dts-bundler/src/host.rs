use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Result;

use crate::error::BundleError;

/// File access the bundler needs from its environment. Keeping it behind a
/// trait lets tests drive whole bundles from in-memory sources.
pub trait CompilerHost {
    fn file_exists(&self, path: &Path) -> bool;
    fn read_file(&self, path: &Path) -> Result<String>;
}

/// Real-filesystem host used by the CLI.
#[derive(Default)]
pub struct FsHost;

impl CompilerHost for FsHost {
    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| {
            BundleError::ReadError {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
            .into()
        })
    }
}

/// In-memory host: path → source text.
#[derive(Default)]
pub struct MemoryHost {
    files: HashMap<String, String>,
}

impl MemoryHost {
    pub fn new(files: HashMap<String, String>) -> Self {
        Self { files }
    }
}

impl CompilerHost for MemoryHost {
    fn file_exists(&self, path: &Path) -> bool {
        self.files.contains_key(&path.to_string_lossy().to_string())
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        let key = path.to_string_lossy().to_string();
        self.files.get(&key).cloned().ok_or_else(|| {
            BundleError::ReadError {
                path: path.to_path_buf(),
                message: "no such in-memory file".to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::hashmap;

    #[test]
    fn memory_host_lookup() {
        let host = MemoryHost::new(hashmap! {
            "/src/a.d.ts".to_string() => "export interface A {}".to_string(),
        });
        assert!(host.file_exists(Path::new("/src/a.d.ts")));
        assert!(!host.file_exists(Path::new("/src/b.d.ts")));
        assert_eq!(
            host.read_file(Path::new("/src/a.d.ts")).unwrap(),
            "export interface A {}"
        );
        assert!(host.read_file(Path::new("/src/b.d.ts")).is_err());
    }
}
