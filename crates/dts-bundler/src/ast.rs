use std::fmt;

/// Handle into a [`ModuleTree`] node arena.
pub type NodeId = usize;

/// How a `declare module` / `namespace` block is named.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleBlockName {
    /// `declare module "foo"` — an ambient external module.
    Quoted(String),
    /// `declare module Foo` / `namespace Foo` — an identifier-named block
    /// (augmentation or plain namespace).
    Ident(String),
    /// `declare global`.
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSpecifierInfo {
    /// `import * as foo from 'foo'`
    Namespace(String),
    /// `import { foo, bar as baz } from 'foo'`
    Named {
        local: String,
        imported: Option<String>,
    },
    /// `import foo from 'foo'`
    Default(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpecifierInfo {
    pub local: String,
    pub exported: Option<String>,
}

impl ExportSpecifierInfo {
    pub fn exported_name(&self) -> &str {
        self.exported.as_deref().unwrap_or(&self.local)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Const,
    Let,
    Var,
}

impl fmt::Display for VarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarKind::Const => write!(f, "const"),
            VarKind::Let => write!(f, "let"),
            VarKind::Var => write!(f, "var"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Interface,
    Class,
    Function,
    Enum {
        is_const: bool,
    },
    TypeAlias,
    /// A whole `const a: A, b: B;` statement. Bindings are child nodes, one
    /// per bound name.
    VariableStatement {
        kind: VarKind,
        bindings: Vec<NodeId>,
    },
    /// One bound name of a variable statement, carrying a synthesized
    /// single-name slice of the original statement.
    VariableBinding {
        kind: VarKind,
    },
    /// `declare module ...` / `namespace ...` / `declare global`. For quoted
    /// names the contained items are parsed into `items`; identifier-named
    /// blocks stay opaque (empty `items`).
    ModuleBlock {
        name: ModuleBlockName,
        items: Vec<NodeId>,
    },
    Import {
        source: String,
        specifiers: Vec<ImportSpecifierInfo>,
        is_type_only: bool,
    },
    /// `import X = require('m');`
    ImportEquals {
        local: String,
        source: String,
    },
    /// `export { a, b as c }` with or without a `from` clause; an empty
    /// specifier list is the `export {}` marker.
    ExportNamed {
        specifiers: Vec<ExportSpecifierInfo>,
        source: Option<String>,
        is_type_only: bool,
    },
    /// `export * from 'm'` / `export * as N from 'm'`
    ExportStar {
        source: String,
        alias: Option<String>,
        is_type_only: bool,
    },
    /// `export = X;` or `export default <expr>;` where the expression is not
    /// itself a declaration. `ident` is `None` for non-identifier targets.
    ExportAssignment {
        is_equals: bool,
        ident: Option<String>,
    },
    /// `export as namespace Name;`
    UmdNamespace {
        name: String,
    },
    /// `/// <reference types="..." />` and friends.
    ReferenceDirective {
        kind: String,
        value: String,
    },
    /// Anything the parser recognized but the bundler ignores.
    Other,
}

/// One identifier occurrence inside a node's text, addressable for renaming.
/// `text` may be a dotted qualified name (`NS.Foo`) for member chains.
#[derive(Debug, Clone)]
pub struct IdentOccurrence {
    pub offset: usize,
    pub len: usize,
    pub text: String,
}

/// A member access rooted at a plain identifier (`NS.Foo` → root `NS`,
/// member `Foo`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAccess {
    pub root: String,
    pub member: String,
    pub full: String,
}

#[derive(Debug, Clone, Default)]
pub struct SyntaxNode {
    pub kind: Option<NodeKind>,
    pub name: Option<String>,
    /// Raw text starting at the declaration keyword; leading modifiers
    /// (`export`, `default`, `declare`) are stripped and tracked below.
    pub text: String,
    pub leading_comment: Option<String>,
    pub is_exported: bool,
    pub has_default_modifier: bool,
    pub is_declare: bool,
    /// Identifiers referenced in type position.
    pub type_refs: Vec<String>,
    /// Identifiers referenced in value position (class heritage, `typeof`).
    pub value_refs: Vec<String>,
    pub member_accesses: Vec<MemberAccess>,
    pub idents: Vec<IdentOccurrence>,
}

impl SyntaxNode {
    pub fn kind(&self) -> &NodeKind {
        self.kind.as_ref().unwrap_or(&NodeKind::Other)
    }

    /// Type- then value-position references, in source order, deduplicated.
    pub fn references(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for name in self.type_refs.iter().chain(self.value_refs.iter()) {
            if !seen.contains(&name.as_str()) {
                seen.push(name.as_str());
            }
        }
        seen
    }
}

/// The externally-produced syntax tree of one module: a node arena plus the
/// ordered top-level item list. The bundler core only consumes the capability
/// accessors below, never the parser internals.
#[derive(Debug, Default)]
pub struct ModuleTree {
    nodes: Vec<SyntaxNode>,
    pub items: Vec<NodeId>,
}

impl ModuleTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: SyntaxNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut SyntaxNode {
        &mut self.nodes[id]
    }

    pub fn is_variable_statement(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind(), NodeKind::VariableStatement { .. })
    }

    /// Identifier-named `declare module Foo { ... }` block.
    pub fn is_module_augmentation(&self, id: NodeId) -> bool {
        matches!(
            self.node(id).kind(),
            NodeKind::ModuleBlock {
                name: ModuleBlockName::Ident(_),
                ..
            }
        )
    }

    pub fn is_const_enum(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind(), NodeKind::Enum { is_const: true })
    }

    /// `export {}` with no specifiers and no source.
    pub fn is_empty_export(&self, id: NodeId) -> bool {
        matches!(
            self.node(id).kind(),
            NodeKind::ExportNamed { specifiers, source: None, .. } if specifiers.is_empty()
        )
    }

    /// True for entities that may legitimately share a name through
    /// declaration merging.
    pub fn is_mergeable(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind(), NodeKind::Interface)
            || self.is_module_augmentation(id)
    }
}
