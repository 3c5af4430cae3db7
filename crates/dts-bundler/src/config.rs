use serde::Deserialize;

fn default_true() -> bool {
    true
}

/// Bundling options. Field names follow the JSON config surface
/// (camelCase), hence the serde renames.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BundleOptions {
    /// Package names whose declarations are inlined into the bundle instead
    /// of being imported.
    pub inlined_libraries: Vec<String>,
    /// Allow-list for `/// <reference types="..." />` directives; `None`
    /// allows every types library the bundle references.
    pub allowed_types_libraries: Option<Vec<String>>,
    /// Inline `declare global` blocks from inlined modules.
    pub inline_declare_globals: bool,
    /// Inline `declare module "..."` blocks for non-inlined externals.
    pub inline_declare_externals: bool,
    /// Follow dependency edges when shaking, pulling referenced types into
    /// the output. Disabling keeps only the explicit public surface.
    #[serde(default = "default_true")]
    pub export_referenced_types: bool,
    pub no_banner: bool,
    /// Stable by-name sort of the output declarations instead of dependency
    /// order.
    pub sort_nodes: bool,
    /// Emit `export as namespace <name>;`.
    pub umd_module_name: Option<String>,
    /// Strip the `const` modifier from emitted `const enum` declarations.
    pub respect_preserve_const_enum: bool,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            inlined_libraries: Vec::new(),
            allowed_types_libraries: None,
            inline_declare_globals: false,
            inline_declare_externals: false,
            export_referenced_types: true,
            no_banner: false,
            sort_nodes: false,
            umd_module_name: None,
            respect_preserve_const_enum: false,
        }
    }
}

impl BundleOptions {
    pub fn is_inlined_library(&self, name: &str) -> bool {
        self.inlined_libraries.iter().any(|lib| {
            lib == name || name.strip_prefix(lib.as_str()).is_some_and(|r| r.starts_with('/'))
        })
    }

    pub fn allows_types_library(&self, name: &str) -> bool {
        match &self.allowed_types_libraries {
            Some(allowed) => allowed.iter().any(|lib| lib == name),
            None => true,
        }
    }
}
