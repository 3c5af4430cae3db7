//! Declaration-file parser producing the bundler's syntax model.
//!
//! This is the in-crate stand-in for the semantic analyzer's parse-module
//! operation. It understands the declaration-only subset: no executable
//! statements, no expression grammar beyond single-identifier export targets.

use anyhow::Result;

use crate::ast::{
    ExportSpecifierInfo, IdentOccurrence, ImportSpecifierInfo, MemberAccess, ModuleBlockName,
    ModuleTree, NodeId, NodeKind, SyntaxNode, VarKind,
};

pub fn parse_module(source: &str) -> Result<ModuleTree> {
    let mut tree = ModuleTree::new();
    let items = parse_items(&mut tree, source)?;
    tree.items = items;
    Ok(tree)
}

fn parse_items(tree: &mut ModuleTree, source: &str) -> Result<Vec<NodeId>> {
    let mut parser = Parser::new(source);
    let mut items = Vec::new();
    while let Some(id) = parser.parse_item(tree)? {
        items.push(id);
    }
    Ok(items)
}

const KEYWORDS: &[&str] = &[
    "abstract", "any", "as", "asserts", "async", "bigint", "boolean", "class", "const", "declare",
    "default", "delete", "enum", "export", "extends", "false", "from", "function", "global", "if",
    "implements", "import", "in", "infer", "instanceof", "interface", "is", "keyof", "let",
    "module", "namespace", "never", "new", "null", "number", "object", "out", "override",
    "private", "protected", "public", "readonly", "require", "return", "satisfies", "static",
    "string", "symbol", "this", "true", "type", "typeof", "undefined", "unique", "unknown", "var",
    "void", "while",
];

fn is_keyword(word: &str) -> bool {
    KEYWORDS.binary_search(&word).is_ok()
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

fn is_ident_part(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

struct Parser<'a> {
    src: &'a str,
    b: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            b: src.as_bytes(),
            pos: 0,
        }
    }

    fn eof(&self) -> bool {
        self.pos >= self.b.len()
    }

    fn peek(&self) -> Option<u8> {
        self.b.get(self.pos).copied()
    }

    /// Skips whitespace and comments, returning the last doc comment block
    /// seen, and stopping *before* a triple-slash directive line.
    fn skip_trivia(&mut self) -> Option<String> {
        let mut doc = None;
        loop {
            while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
                self.pos += 1;
            }
            if self.b[self.pos..].starts_with(b"///") {
                return doc;
            }
            if self.b[self.pos..].starts_with(b"//") {
                while self.peek().is_some_and(|c| c != b'\n') {
                    self.pos += 1;
                }
                continue;
            }
            if self.b[self.pos..].starts_with(b"/*") {
                let start = self.pos;
                self.pos += 2;
                while self.pos < self.b.len() && !self.b[self.pos..].starts_with(b"*/") {
                    self.pos += 1;
                }
                self.pos = (self.pos + 2).min(self.b.len());
                if self.src[start..].starts_with("/**") {
                    doc = Some(self.src[start..self.pos].to_string());
                }
                continue;
            }
            return doc;
        }
    }

    fn read_word(&mut self) -> Option<String> {
        if !self.peek().is_some_and(is_ident_start) {
            return None;
        }
        let start = self.pos;
        while self.peek().is_some_and(is_ident_part) {
            self.pos += 1;
        }
        Some(self.src[start..self.pos].to_string())
    }

    fn peek_word(&self) -> Option<String> {
        let mut p = self.pos;
        while p < self.b.len() && self.b[p].is_ascii_whitespace() {
            p += 1;
        }
        if p >= self.b.len() || !is_ident_start(self.b[p]) {
            return None;
        }
        let start = p;
        while p < self.b.len() && is_ident_part(self.b[p]) {
            p += 1;
        }
        Some(self.src[start..p].to_string())
    }

    fn peek_sig_char(&self) -> Option<u8> {
        let mut p = self.pos;
        while p < self.b.len() && self.b[p].is_ascii_whitespace() {
            p += 1;
        }
        self.b.get(p).copied()
    }

    fn eat_char(&mut self, c: u8) -> bool {
        self.skip_trivia();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, w: &str) -> bool {
        if self.peek_word().as_deref() == Some(w) {
            self.skip_trivia();
            self.read_word();
            true
        } else {
            false
        }
    }

    fn read_string_literal(&mut self) -> Option<String> {
        self.skip_trivia();
        let quote = self.peek()?;
        if quote != b'"' && quote != b'\'' {
            return None;
        }
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != quote) {
            self.pos += 1;
        }
        let value = self.src[start..self.pos].to_string();
        self.pos += 1; // closing quote
        Some(value)
    }

    /// Scans forward from `self.pos` to the end of a `;`-terminated
    /// statement, honoring brace/paren/bracket nesting and skipping strings
    /// and comments. Leaves `self.pos` just past the terminator.
    fn consume_statement(&mut self) -> usize {
        let mut depth = 0i32;
        while self.pos < self.b.len() {
            match self.b[self.pos] {
                b'{' | b'(' | b'[' => depth += 1,
                b'}' | b')' | b']' => depth -= 1,
                b';' if depth <= 0 => {
                    self.pos += 1;
                    return self.pos;
                }
                b'"' | b'\'' | b'`' => {
                    let quote = self.b[self.pos];
                    self.pos += 1;
                    while self.pos < self.b.len() && self.b[self.pos] != quote {
                        self.pos += 1;
                    }
                }
                b'/' if self.b[self.pos..].starts_with(b"//") => {
                    while self.pos < self.b.len() && self.b[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                    continue;
                }
                b'/' if self.b[self.pos..].starts_with(b"/*") => {
                    self.pos += 2;
                    while self.pos < self.b.len() && !self.b[self.pos..].starts_with(b"*/") {
                        self.pos += 1;
                    }
                    self.pos = (self.pos + 2).min(self.b.len());
                    continue;
                }
                _ => {}
            }
            self.pos += 1;
        }
        self.pos
    }

    /// Consumes a brace-bodied item: scans to the first `{` at depth zero,
    /// then past its matching `}`.
    fn consume_block(&mut self) -> usize {
        while self.pos < self.b.len() && self.b[self.pos] != b'{' {
            if self.b[self.pos] == b';' {
                self.pos += 1;
                return self.pos;
            }
            self.pos += 1;
        }
        let mut depth = 0i32;
        while self.pos < self.b.len() {
            match self.b[self.pos] {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return self.pos;
                    }
                }
                b'"' | b'\'' | b'`' => {
                    let quote = self.b[self.pos];
                    self.pos += 1;
                    while self.pos < self.b.len() && self.b[self.pos] != quote {
                        self.pos += 1;
                    }
                }
                b'/' if self.b[self.pos..].starts_with(b"//") => {
                    while self.pos < self.b.len() && self.b[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                    continue;
                }
                b'/' if self.b[self.pos..].starts_with(b"/*") => {
                    self.pos += 2;
                    while self.pos < self.b.len() && !self.b[self.pos..].starts_with(b"*/") {
                        self.pos += 1;
                    }
                    self.pos = (self.pos + 2).min(self.b.len());
                    continue;
                }
                _ => {}
            }
            self.pos += 1;
        }
        self.pos
    }

    fn parse_item(&mut self, tree: &mut ModuleTree) -> Result<Option<NodeId>> {
        let doc = self.skip_trivia();
        if self.eof() {
            return Ok(None);
        }
        if self.b[self.pos..].starts_with(b"///") {
            return Ok(Some(self.parse_reference_directive(tree)));
        }

        let mut is_exported = false;
        let mut has_default = false;
        let mut is_declare = false;
        // `abstract`/`async` stay part of the declaration text.
        let mut kept_modifier_start: Option<usize> = None;

        loop {
            let word = self.peek_word();
            match word.as_deref() {
                Some("export") => {
                    self.skip_trivia();
                    self.read_word();
                    match self.peek_sig_char() {
                        Some(b'{') => return self.parse_export_named(tree, false).map(Some),
                        Some(b'*') => return self.parse_export_star(tree, false).map(Some),
                        Some(b'=') => return self.parse_export_assignment(tree, true).map(Some),
                        _ => {}
                    }
                    match self.peek_word().as_deref() {
                        Some("as") => return self.parse_umd_namespace(tree).map(Some),
                        Some("type") => {
                            // `export type {` is a type-only export list;
                            // `export type X = ...` is a type alias.
                            let save_type = self.pos;
                            self.skip_trivia();
                            self.read_word();
                            if self.peek_sig_char() == Some(b'{') {
                                return self.parse_export_named(tree, true).map(Some);
                            }
                            if self.peek_sig_char() == Some(b'*') {
                                return self.parse_export_star(tree, true).map(Some);
                            }
                            self.pos = save_type;
                        }
                        Some("default") => {
                            self.skip_trivia();
                            self.read_word();
                            has_default = true;
                            match self.peek_word().as_deref() {
                                Some(
                                    "class" | "function" | "interface" | "enum" | "abstract"
                                    | "async",
                                ) => {}
                                _ => {
                                    return self.parse_export_assignment(tree, false).map(Some);
                                }
                            }
                        }
                        _ => {}
                    }
                    is_exported = true;
                }
                Some("declare") => {
                    self.skip_trivia();
                    self.read_word();
                    is_declare = true;
                }
                Some("abstract" | "async") => {
                    self.skip_trivia();
                    kept_modifier_start.get_or_insert(self.pos);
                    self.read_word();
                }
                Some("import") => {
                    self.skip_trivia();
                    self.read_word();
                    return self.parse_import(tree).map(Some);
                }
                _ => break,
            }
        }

        let start = kept_modifier_start.unwrap_or_else(|| {
            self.skip_trivia();
            self.pos
        });
        let keyword = match self.peek_word() {
            Some(w) => w,
            None => {
                // Stray punctuation; skip one statement to make progress.
                self.consume_statement();
                return Ok(Some(tree.alloc(SyntaxNode {
                    kind: Some(NodeKind::Other),
                    ..Default::default()
                })));
            }
        };

        let node = match keyword.as_str() {
            "interface" => self.parse_named_block(start, NodeKind::Interface)?,
            "class" => self.parse_named_block(start, NodeKind::Class)?,
            "enum" => self.parse_named_block(start, NodeKind::Enum { is_const: false })?,
            "const" if self.second_word_is("enum") => {
                self.skip_trivia();
                self.read_word(); // const
                self.parse_named_block(start, NodeKind::Enum { is_const: true })?
            }
            "function" => self.parse_function(start)?,
            "type" => self.parse_type_alias(start)?,
            "const" | "let" | "var" => {
                return self
                    .parse_variable_statement(tree, start, &keyword, is_exported, is_declare, doc)
                    .map(Some);
            }
            "namespace" | "module" | "global" => {
                return self
                    .parse_module_block(tree, start, is_exported, is_declare, doc)
                    .map(Some);
            }
            _ => {
                self.consume_statement();
                SyntaxNode {
                    kind: Some(NodeKind::Other),
                    text: self.src[start..self.pos].to_string(),
                    ..Default::default()
                }
            }
        };

        let mut node = node;
        node.is_exported = is_exported;
        node.has_default_modifier = has_default;
        node.is_declare = is_declare;
        node.leading_comment = doc;
        Ok(Some(tree.alloc(node)))
    }

    fn second_word_is(&self, expected: &str) -> bool {
        let mut p = Parser::new(&self.src[self.pos..]);
        p.skip_trivia();
        p.read_word();
        p.peek_word().as_deref() == Some(expected)
    }

    fn parse_reference_directive(&mut self, tree: &mut ModuleTree) -> NodeId {
        let line_start = self.pos;
        while self.peek().is_some_and(|c| c != b'\n') {
            self.pos += 1;
        }
        let line = &self.src[line_start..self.pos];
        let kind = ["types", "path", "lib"]
            .iter()
            .find(|k| line.contains(&format!("{}=", k)))
            .copied()
            .unwrap_or("types");
        let value = line
            .split('"')
            .nth(1)
            .or_else(|| line.split('\'').nth(1))
            .unwrap_or("")
            .to_string();
        tree.alloc(SyntaxNode {
            kind: Some(NodeKind::ReferenceDirective {
                kind: kind.to_string(),
                value,
            }),
            text: line.to_string(),
            ..Default::default()
        })
    }

    fn parse_named_block(&mut self, start: usize, kind: NodeKind) -> Result<SyntaxNode> {
        self.skip_trivia();
        self.read_word(); // keyword
        self.skip_trivia();
        let name = self.read_word();
        let end = self.consume_block();
        let text = self.src[start..end].to_string();
        let mut node = SyntaxNode {
            name: name.clone(),
            ..scan_references(&text, &kind, name.as_deref())
        };
        node.kind = Some(kind);
        Ok(node)
    }

    fn parse_function(&mut self, start: usize) -> Result<SyntaxNode> {
        self.skip_trivia();
        self.read_word(); // function
        self.skip_trivia();
        let name = self.read_word();
        let end = self.consume_statement();
        let text = self.src[start..end].to_string();
        let kind = NodeKind::Function;
        let mut node = SyntaxNode {
            name: name.clone(),
            ..scan_references(&text, &kind, name.as_deref())
        };
        node.kind = Some(kind);
        Ok(node)
    }

    fn parse_type_alias(&mut self, start: usize) -> Result<SyntaxNode> {
        self.skip_trivia();
        self.read_word(); // type
        self.skip_trivia();
        let name = self.read_word();
        let end = self.consume_statement();
        let text = self.src[start..end].to_string();
        let kind = NodeKind::TypeAlias;
        let mut node = SyntaxNode {
            name: name.clone(),
            ..scan_references(&text, &kind, name.as_deref())
        };
        node.kind = Some(kind);
        Ok(node)
    }

    fn parse_variable_statement(
        &mut self,
        tree: &mut ModuleTree,
        start: usize,
        keyword: &str,
        is_exported: bool,
        is_declare: bool,
        doc: Option<String>,
    ) -> Result<NodeId> {
        let var_kind = match keyword {
            "let" => VarKind::Let,
            "var" => VarKind::Var,
            _ => VarKind::Const,
        };
        self.skip_trivia();
        self.read_word(); // const/let/var

        let mut bindings = Vec::new();
        loop {
            self.skip_trivia();
            let names = self.parse_binding_names();
            if names.is_empty() {
                break;
            }
            self.skip_trivia();
            if self.eat_char(b'?') {
                self.skip_trivia();
            }
            let type_text = if self.eat_char(b':') {
                let t_start = self.pos;
                let t_end = self.scan_until_binding_end();
                Some(self.src[t_start..t_end].trim().to_string())
            } else {
                None
            };
            // Skip a (non-declaration-legal) initializer if present.
            if self.peek_sig_char() == Some(b'=') {
                self.eat_char(b'=');
                self.scan_until_binding_end();
            }
            for name in names {
                let text = match &type_text {
                    Some(t) => format!("{} {}: {};", var_kind, name, t),
                    None => format!("{} {};", var_kind, name),
                };
                let kind = NodeKind::VariableBinding { kind: var_kind };
                let mut child = scan_references(&text, &kind, Some(&name));
                child.kind = Some(kind);
                child.name = Some(name);
                child.is_exported = is_exported;
                child.is_declare = is_declare;
                child.leading_comment = doc.clone();
                bindings.push(tree.alloc(child));
            }
            if !self.eat_char(b',') {
                break;
            }
        }
        self.eat_char(b';');
        let end = self.pos;
        Ok(tree.alloc(SyntaxNode {
            kind: Some(NodeKind::VariableStatement {
                kind: var_kind,
                bindings,
            }),
            text: self.src[start..end].to_string(),
            is_exported,
            is_declare,
            leading_comment: doc,
            ..Default::default()
        }))
    }

    /// A plain binding name, or every bound name of a destructuring pattern.
    fn parse_binding_names(&mut self) -> Vec<String> {
        match self.peek() {
            Some(b'{') | Some(b'[') => {
                let open = self.b[self.pos];
                let close = if open == b'{' { b'}' } else { b']' };
                self.pos += 1;
                let mut names = Vec::new();
                let mut depth = 1;
                while self.pos < self.b.len() && depth > 0 {
                    let c = self.b[self.pos];
                    if c == open {
                        depth += 1;
                        self.pos += 1;
                    } else if c == close {
                        depth -= 1;
                        self.pos += 1;
                    } else if is_ident_start(c) {
                        let w = self.read_word().unwrap();
                        names.push(w);
                    } else {
                        self.pos += 1;
                    }
                }
                names
            }
            Some(c) if is_ident_start(c) => self.read_word().into_iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Scans to the `,` or `;` ending the current binding, at depth zero.
    fn scan_until_binding_end(&mut self) -> usize {
        let mut depth = 0i32;
        let mut angle = 0i32;
        while self.pos < self.b.len() {
            match self.b[self.pos] {
                b'{' | b'(' | b'[' => depth += 1,
                b'}' | b')' | b']' => depth -= 1,
                b'<' => angle += 1,
                b'>' => angle = (angle - 1).max(0),
                b',' if depth <= 0 && angle <= 0 => return self.pos,
                b';' if depth <= 0 => return self.pos,
                b'"' | b'\'' | b'`' => {
                    let quote = self.b[self.pos];
                    self.pos += 1;
                    while self.pos < self.b.len() && self.b[self.pos] != quote {
                        self.pos += 1;
                    }
                }
                b'=' if self.b.get(self.pos + 1) == Some(&b'>') => {
                    self.pos += 1; // arrow, not an angle close
                }
                _ => {}
            }
            self.pos += 1;
        }
        self.pos
    }

    fn parse_module_block(
        &mut self,
        tree: &mut ModuleTree,
        start: usize,
        is_exported: bool,
        is_declare: bool,
        doc: Option<String>,
    ) -> Result<NodeId> {
        self.skip_trivia();
        let keyword = self.read_word().unwrap_or_default();
        let name = if keyword == "global" {
            ModuleBlockName::Global
        } else {
            self.skip_trivia();
            match self.peek() {
                Some(b'"') | Some(b'\'') => {
                    ModuleBlockName::Quoted(self.read_string_literal().unwrap_or_default())
                }
                _ => {
                    let mut name = self.read_word().unwrap_or_default();
                    // `namespace A.B` — keep the dotted form.
                    while self.peek() == Some(b'.') {
                        self.pos += 1;
                        name.push('.');
                        name.push_str(&self.read_word().unwrap_or_default());
                    }
                    ModuleBlockName::Ident(name)
                }
            }
        };

        // Locate the block body before consuming it, so quoted modules can
        // parse their contained items recursively.
        let body_open = self.src[self.pos..].find('{').map(|i| self.pos + i);
        let end = self.consume_block();
        let text = self.src[start..end].to_string();

        let items = match (&name, body_open) {
            (ModuleBlockName::Quoted(_), Some(open)) if open < end => {
                let inner = &self.src[open + 1..end.saturating_sub(1)];
                parse_items(tree, inner)?
            }
            _ => Vec::new(),
        };

        let display_name = match &name {
            ModuleBlockName::Quoted(n) | ModuleBlockName::Ident(n) => Some(n.clone()),
            ModuleBlockName::Global => None,
        };
        let kind = NodeKind::ModuleBlock {
            name: name.clone(),
            items,
        };
        let mut node = match &name {
            // Identifier-named blocks and global augmentations stay opaque;
            // their references are scanned over the whole block body.
            ModuleBlockName::Ident(n) => scan_references(&text, &kind, Some(n.as_str())),
            ModuleBlockName::Global => scan_references(&text, &kind, None),
            ModuleBlockName::Quoted(_) => SyntaxNode {
                text,
                ..Default::default()
            },
        };
        node.kind = Some(kind);
        node.name = display_name;
        node.is_exported = is_exported;
        node.is_declare = is_declare;
        node.leading_comment = doc;
        Ok(tree.alloc(node))
    }

    fn parse_import(&mut self, tree: &mut ModuleTree) -> Result<NodeId> {
        self.skip_trivia();
        // `import 'm';`
        if matches!(self.peek(), Some(b'"') | Some(b'\'')) {
            let source = self.read_string_literal().unwrap_or_default();
            self.eat_char(b';');
            return Ok(tree.alloc(SyntaxNode {
                kind: Some(NodeKind::Import {
                    source,
                    specifiers: vec![],
                    is_type_only: false,
                }),
                ..Default::default()
            }));
        }

        let mut is_type_only = false;
        if self.peek_word().as_deref() == Some("type") {
            // `import type X ...` vs a default import named `type` is an
            // ambiguity the declaration subset does not need to support.
            self.skip_trivia();
            self.read_word();
            is_type_only = true;
        }

        let mut specifiers = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                Some(b'*') => {
                    self.pos += 1;
                    self.eat_word("as");
                    self.skip_trivia();
                    let alias = self.read_word().unwrap_or_default();
                    specifiers.push(ImportSpecifierInfo::Namespace(alias));
                }
                Some(b'{') => {
                    self.pos += 1;
                    loop {
                        self.skip_trivia();
                        if self.eat_char(b'}') {
                            break;
                        }
                        self.eat_word("type");
                        self.skip_trivia();
                        let imported = match self.read_word() {
                            Some(w) => w,
                            None => {
                                self.eat_char(b'}');
                                break;
                            }
                        };
                        let local = if self.eat_word("as") {
                            self.skip_trivia();
                            self.read_word().unwrap_or_else(|| imported.clone())
                        } else {
                            imported.clone()
                        };
                        let renamed = local != imported;
                        specifiers.push(ImportSpecifierInfo::Named {
                            local,
                            imported: renamed.then_some(imported),
                        });
                        if !self.eat_char(b',') {
                            self.eat_char(b'}');
                            break;
                        }
                    }
                }
                Some(c) if is_ident_start(c) => {
                    let local = self.read_word().unwrap();
                    // `import X = require('m');`
                    if self.peek_sig_char() == Some(b'=') {
                        self.eat_char(b'=');
                        self.eat_word("require");
                        self.eat_char(b'(');
                        let source = self.read_string_literal().unwrap_or_default();
                        self.eat_char(b')');
                        self.eat_char(b';');
                        return Ok(tree.alloc(SyntaxNode {
                            kind: Some(NodeKind::ImportEquals { local, source }),
                            ..Default::default()
                        }));
                    }
                    specifiers.push(ImportSpecifierInfo::Default(local));
                }
                _ => break,
            }
            if !self.eat_char(b',') {
                break;
            }
        }

        self.eat_word("from");
        let source = self.read_string_literal().unwrap_or_default();
        self.eat_char(b';');
        Ok(tree.alloc(SyntaxNode {
            kind: Some(NodeKind::Import {
                source,
                specifiers,
                is_type_only,
            }),
            ..Default::default()
        }))
    }

    fn parse_export_named(&mut self, tree: &mut ModuleTree, is_type_only: bool) -> Result<NodeId> {
        self.eat_char(b'{');
        let mut specifiers = Vec::new();
        loop {
            self.skip_trivia();
            if self.eat_char(b'}') {
                break;
            }
            self.eat_word("type");
            self.skip_trivia();
            let local = match self.read_word() {
                Some(w) => w,
                None => {
                    self.eat_char(b'}');
                    break;
                }
            };
            let exported = if self.eat_word("as") {
                self.skip_trivia();
                self.read_word()
            } else {
                None
            };
            let exported = exported.filter(|e| *e != local);
            specifiers.push(ExportSpecifierInfo { local, exported });
            if !self.eat_char(b',') {
                self.eat_char(b'}');
                break;
            }
        }
        let source = if self.eat_word("from") {
            self.read_string_literal()
        } else {
            None
        };
        self.eat_char(b';');
        Ok(tree.alloc(SyntaxNode {
            kind: Some(NodeKind::ExportNamed {
                specifiers,
                source,
                is_type_only,
            }),
            ..Default::default()
        }))
    }

    fn parse_export_star(&mut self, tree: &mut ModuleTree, is_type_only: bool) -> Result<NodeId> {
        self.eat_char(b'*');
        let alias = if self.eat_word("as") {
            self.skip_trivia();
            self.read_word()
        } else {
            None
        };
        self.eat_word("from");
        let source = self.read_string_literal().unwrap_or_default();
        self.eat_char(b';');
        Ok(tree.alloc(SyntaxNode {
            kind: Some(NodeKind::ExportStar {
                source,
                alias,
                is_type_only,
            }),
            ..Default::default()
        }))
    }

    fn parse_export_assignment(&mut self, tree: &mut ModuleTree, is_equals: bool) -> Result<NodeId> {
        if is_equals {
            self.eat_char(b'=');
        }
        self.skip_trivia();
        let start = self.pos;
        let end = self.consume_statement();
        let expr = self.src[start..end].trim_end_matches(';').trim();
        let ident = (expr.bytes().all(is_ident_part) && expr.bytes().next().is_some_and(is_ident_start))
            .then(|| expr.to_string());
        Ok(tree.alloc(SyntaxNode {
            kind: Some(NodeKind::ExportAssignment { is_equals, ident }),
            text: expr.to_string(),
            ..Default::default()
        }))
    }

    fn parse_umd_namespace(&mut self, tree: &mut ModuleTree) -> Result<NodeId> {
        self.eat_word("as");
        self.eat_word("namespace");
        self.skip_trivia();
        let name = self.read_word().unwrap_or_default();
        self.eat_char(b';');
        Ok(tree.alloc(SyntaxNode {
            kind: Some(NodeKind::UmdNamespace { name }),
            ..Default::default()
        }))
    }
}

/// Reference/occurrence extraction over one declaration's text.
///
/// Heuristics tuned for the declaration subset: property, parameter, method
/// and enum-member names are not references; header-level type parameters are
/// excluded; `typeof` chains and class heritage land in value position.
fn scan_references(text: &str, kind: &NodeKind, own_name: Option<&str>) -> SyntaxNode {
    let b = text.as_bytes();
    let mut node = SyntaxNode {
        text: text.to_string(),
        ..Default::default()
    };
    let mut excluded: Vec<String> = Vec::new();

    let is_class = matches!(kind, NodeKind::Class);
    let is_enum = matches!(kind, NodeKind::Enum { .. });

    let mut pos = 0usize;
    let mut prev_sig: u8 = 0; // last significant non-ident byte
    let mut prev_word: Option<String> = None;
    let mut value_next = false; // after `typeof`
    let mut heritage_value = false; // class `extends` clause
    let mut brace_depth = 0i32;
    let mut seen_own_name = own_name.is_none();

    while pos < b.len() {
        let c = b[pos];
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }
        if b[pos..].starts_with(b"//") {
            while pos < b.len() && b[pos] != b'\n' {
                pos += 1;
            }
            continue;
        }
        if b[pos..].starts_with(b"/*") {
            pos += 2;
            while pos < b.len() && !b[pos..].starts_with(b"*/") {
                pos += 1;
            }
            pos = (pos + 2).min(b.len());
            continue;
        }
        if c == b'"' || c == b'\'' || c == b'`' {
            pos += 1;
            while pos < b.len() && b[pos] != c {
                pos += 1;
            }
            pos += 1;
            prev_sig = b'"';
            continue;
        }
        if !is_ident_start(c) {
            match c {
                b'{' => {
                    brace_depth += 1;
                    heritage_value = false;
                }
                b'}' => brace_depth -= 1,
                _ => {}
            }
            prev_sig = c;
            pos += 1;
            continue;
        }

        // Identifier chain starting here.
        let start = pos;
        while pos < b.len() && is_ident_part(b[pos]) {
            pos += 1;
        }
        let word = &text[start..pos];

        if is_keyword(word) {
            match word {
                "typeof" => value_next = true,
                "extends" if is_class && brace_depth == 0 => heritage_value = true,
                "implements" => heritage_value = false,
                _ => {}
            }
            prev_word = Some(word.to_string());
            prev_sig = 0;
            continue;
        }

        // The declared name itself: record the occurrence, no reference.
        if !seen_own_name && Some(word) == own_name {
            seen_own_name = true;
            node.idents.push(IdentOccurrence {
                offset: start,
                len: word.len(),
                text: word.to_string(),
            });
            // A `<...>` directly after the name declares type parameters.
            if b.get(pos) == Some(&b'<') {
                let mut p = pos + 1;
                let mut depth = 1i32;
                let mut at_param_start = true;
                while p < b.len() && depth > 0 {
                    let ch = b[p];
                    if ch == b'<' {
                        depth += 1;
                    } else if ch == b'>' {
                        depth -= 1;
                    } else if depth == 1 && at_param_start && is_ident_start(ch) {
                        let s = p;
                        while p < b.len() && is_ident_part(b[p]) {
                            p += 1;
                        }
                        excluded.push(text[s..p].to_string());
                        at_param_start = false;
                        continue;
                    } else if ch == b',' && depth == 1 {
                        at_param_start = true;
                    } else if !ch.is_ascii_whitespace() {
                        at_param_start = false;
                    }
                    p += 1;
                }
            }
            prev_sig = 0;
            prev_word = Some(word.to_string());
            continue;
        }

        // Member continuation with no open chain (e.g. `import("m").Foo`).
        if prev_sig == b'.' {
            prev_sig = 0;
            continue;
        }

        // Property / parameter / member-name heuristics.
        let mut look = pos;
        while look < b.len() && b[look].is_ascii_whitespace() {
            look += 1;
        }
        let mut next_sig = b.get(look).copied().unwrap_or(0);
        if next_sig == b'?' {
            let mut l2 = look + 1;
            while l2 < b.len() && b[l2].is_ascii_whitespace() {
                l2 += 1;
            }
            next_sig = b.get(l2).copied().unwrap_or(0);
        }

        let in_name_position = if is_enum && brace_depth > 0 {
            // Enum member names; only initializer references count.
            prev_sig != b'=' && !value_next
        } else {
            let prop_prev = matches!(prev_sig, b'{' | b',' | b';' | b'(')
                || matches!(prev_word.as_deref(), Some("readonly" | "new" | "in" | "out"));
            let member_prev = matches!(prev_sig, b'{' | b';');
            (prop_prev && (next_sig == b':' || b.get(look) == Some(&b'?')))
                || (member_prev && (next_sig == b'(' || next_sig == b'<'))
        };

        if in_name_position || excluded.iter().any(|e| e == word) {
            value_next = false;
            prev_sig = 0;
            prev_word = Some(word.to_string());
            continue;
        }

        // Follow a dotted chain.
        let root = word.to_string();
        let mut full = root.clone();
        let mut first_member: Option<String> = None;
        let mut chain_end = pos;
        loop {
            let mut p = chain_end;
            while p < b.len() && b[p].is_ascii_whitespace() {
                p += 1;
            }
            if b.get(p) != Some(&b'.') {
                break;
            }
            p += 1;
            while p < b.len() && b[p].is_ascii_whitespace() {
                p += 1;
            }
            if !b.get(p).copied().is_some_and(is_ident_start) {
                break;
            }
            let s = p;
            while p < b.len() && is_ident_part(b[p]) {
                p += 1;
            }
            let member = text[s..p].to_string();
            if first_member.is_none() {
                first_member = Some(member.clone());
            }
            full.push('.');
            full.push_str(&member);
            chain_end = p;
        }

        let is_value = value_next || heritage_value;
        if is_value {
            node.value_refs.push(root.clone());
        } else {
            node.type_refs.push(root.clone());
        }
        if let Some(member) = first_member {
            node.member_accesses.push(MemberAccess {
                root: root.clone(),
                member,
                full: full.clone(),
            });
        }
        node.idents.push(IdentOccurrence {
            offset: start,
            len: chain_end - start,
            text: full,
        });

        pos = chain_end;
        value_next = false;
        prev_sig = 0;
        prev_word = None;
    }

    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ModuleBlockName;

    fn parse(source: &str) -> ModuleTree {
        parse_module(source).unwrap()
    }

    #[test]
    fn splits_top_level_items() {
        let tree = parse(
            "export interface Foo { id: string }\n\
             declare class Bar {}\n\
             export type Baz = Foo;\n",
        );
        assert_eq!(tree.items.len(), 3);
        let foo = tree.node(tree.items[0]);
        assert_eq!(foo.name.as_deref(), Some("Foo"));
        assert!(foo.is_exported);
        assert!(matches!(foo.kind(), NodeKind::Interface));
        let bar = tree.node(tree.items[1]);
        assert!(bar.is_declare);
        assert!(!bar.is_exported);
        let baz = tree.node(tree.items[2]);
        assert!(matches!(baz.kind(), NodeKind::TypeAlias));
        assert_eq!(baz.type_refs, vec!["Foo".to_string()]);
    }

    #[test]
    fn property_names_are_not_references() {
        let tree = parse("interface Foo { id: string; other: Bar; fn(x: Baz): Qux; }");
        let foo = tree.node(tree.items[0]);
        assert_eq!(
            foo.type_refs,
            vec!["Bar".to_string(), "Baz".to_string(), "Qux".to_string()]
        );
    }

    #[test]
    fn type_parameters_are_excluded() {
        let tree = parse("interface Box<T, U extends Lower> { value: T; alt: U; real: Other; }");
        let b = tree.node(tree.items[0]);
        assert_eq!(b.type_refs, vec!["Lower".to_string(), "Other".to_string()]);
    }

    #[test]
    fn class_heritage_is_value_position() {
        let tree = parse("declare class Child extends Base implements Iface { x: Prop; }");
        let c = tree.node(tree.items[0]);
        assert_eq!(c.value_refs, vec!["Base".to_string()]);
        assert!(c.type_refs.contains(&"Iface".to_string()));
        assert!(c.type_refs.contains(&"Prop".to_string()));
    }

    #[test]
    fn typeof_is_value_position() {
        let tree = parse("type T = typeof marker;");
        let t = tree.node(tree.items[0]);
        assert_eq!(t.value_refs, vec!["marker".to_string()]);
    }

    #[test]
    fn member_access_chain() {
        let tree = parse("type T = NS.Foo.Bar;");
        let t = tree.node(tree.items[0]);
        assert_eq!(t.type_refs, vec!["NS".to_string()]);
        assert_eq!(
            t.member_accesses,
            vec![MemberAccess {
                root: "NS".into(),
                member: "Foo".into(),
                full: "NS.Foo.Bar".into(),
            }]
        );
    }

    #[test]
    fn import_forms() {
        let tree = parse(
            "import { a, b as c } from './x';\n\
             import type { T } from './y';\n\
             import D, * as NS from 'pkg';\n\
             import R = require('cjs');\n",
        );
        match tree.node(tree.items[0]).kind() {
            NodeKind::Import {
                source, specifiers, ..
            } => {
                assert_eq!(source, "./x");
                assert_eq!(
                    specifiers,
                    &vec![
                        ImportSpecifierInfo::Named {
                            local: "a".into(),
                            imported: None
                        },
                        ImportSpecifierInfo::Named {
                            local: "c".into(),
                            imported: Some("b".into())
                        },
                    ]
                );
            }
            other => panic!("unexpected: {:?}", other),
        }
        match tree.node(tree.items[1]).kind() {
            NodeKind::Import { is_type_only, .. } => assert!(is_type_only),
            other => panic!("unexpected: {:?}", other),
        }
        match tree.node(tree.items[2]).kind() {
            NodeKind::Import { specifiers, .. } => {
                assert_eq!(
                    specifiers,
                    &vec![
                        ImportSpecifierInfo::Default("D".into()),
                        ImportSpecifierInfo::Namespace("NS".into()),
                    ]
                );
            }
            other => panic!("unexpected: {:?}", other),
        }
        match tree.node(tree.items[3]).kind() {
            NodeKind::ImportEquals { local, source } => {
                assert_eq!(local, "R");
                assert_eq!(source, "cjs");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn export_forms() {
        let tree = parse(
            "export { a, b as c } from './x';\n\
             export * from './y';\n\
             export * as NS from './z';\n\
             export = Entry;\n\
             export default Entry;\n\
             export as namespace Umd;\n\
             export {};\n",
        );
        match tree.node(tree.items[0]).kind() {
            NodeKind::ExportNamed {
                specifiers, source, ..
            } => {
                assert_eq!(source.as_deref(), Some("./x"));
                assert_eq!(specifiers.len(), 2);
                assert_eq!(specifiers[1].exported.as_deref(), Some("c"));
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            tree.node(tree.items[1]).kind(),
            NodeKind::ExportStar { alias: None, .. }
        ));
        match tree.node(tree.items[2]).kind() {
            NodeKind::ExportStar { alias, .. } => assert_eq!(alias.as_deref(), Some("NS")),
            other => panic!("unexpected: {:?}", other),
        }
        match tree.node(tree.items[3]).kind() {
            NodeKind::ExportAssignment { is_equals, ident } => {
                assert!(is_equals);
                assert_eq!(ident.as_deref(), Some("Entry"));
            }
            other => panic!("unexpected: {:?}", other),
        }
        match tree.node(tree.items[4]).kind() {
            NodeKind::ExportAssignment { is_equals, ident } => {
                assert!(!is_equals);
                assert_eq!(ident.as_deref(), Some("Entry"));
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(
            tree.node(tree.items[5]).kind(),
            NodeKind::UmdNamespace { .. }
        ));
        assert!(tree.is_empty_export(tree.items[6]));
    }

    #[test]
    fn export_default_class_is_a_declaration() {
        let tree = parse("export default class Widget { render(): Out; }");
        let w = tree.node(tree.items[0]);
        assert!(matches!(w.kind(), NodeKind::Class));
        assert!(w.has_default_modifier);
        assert_eq!(w.name.as_deref(), Some("Widget"));
    }

    #[test]
    fn variable_statement_splits_bindings() {
        let tree = parse("export declare const a: A, b: B;");
        let stmt = tree.node(tree.items[0]);
        match stmt.kind() {
            NodeKind::VariableStatement { kind, bindings } => {
                assert_eq!(*kind, VarKind::Const);
                assert_eq!(bindings.len(), 2);
                let a = tree.node(bindings[0]);
                assert_eq!(a.name.as_deref(), Some("a"));
                assert_eq!(a.text, "const a: A;");
                assert_eq!(a.type_refs, vec!["A".to_string()]);
                assert!(a.is_exported);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn destructuring_expands_per_name() {
        let tree = parse("declare const { x, y }: Pair;");
        match tree.node(tree.items[0]).kind() {
            NodeKind::VariableStatement { bindings, .. } => {
                assert_eq!(bindings.len(), 2);
                assert_eq!(tree.node(bindings[0]).name.as_deref(), Some("x"));
                assert_eq!(tree.node(bindings[1]).name.as_deref(), Some("y"));
                assert_eq!(tree.node(bindings[1]).type_refs, vec!["Pair".to_string()]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn quoted_module_parses_children() {
        let tree = parse("declare module \"lib\" { export interface Inner { x: Dep } }");
        match tree.node(tree.items[0]).kind().clone() {
            NodeKind::ModuleBlock { name, items } => {
                assert_eq!(name, ModuleBlockName::Quoted("lib".into()));
                assert_eq!(items.len(), 1);
                let inner = tree.node(items[0]);
                assert_eq!(inner.name.as_deref(), Some("Inner"));
                assert!(inner.is_exported);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn global_block_is_opaque() {
        let tree = parse("declare global { interface Window { helper: Helper } }");
        let g = tree.node(tree.items[0]);
        assert!(matches!(
            g.kind(),
            NodeKind::ModuleBlock {
                name: ModuleBlockName::Global,
                ..
            }
        ));
        assert!(g.type_refs.contains(&"Helper".to_string()));
    }

    #[test]
    fn doc_comment_attaches_to_item() {
        let tree = parse("/** Docs for Foo */\nexport interface Foo {}\n");
        let foo = tree.node(tree.items[0]);
        assert_eq!(foo.leading_comment.as_deref(), Some("/** Docs for Foo */"));
    }

    #[test]
    fn reference_directive() {
        let tree = parse("/// <reference types=\"node\" />\nexport interface X {}\n");
        match tree.node(tree.items[0]).kind() {
            NodeKind::ReferenceDirective { kind, value } => {
                assert_eq!(kind, "types");
                assert_eq!(value, "node");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn const_enum() {
        let tree = parse("export const enum Flags { A = 1, B = 2 }");
        let f = tree.node(tree.items[0]);
        assert!(matches!(f.kind(), NodeKind::Enum { is_const: true }));
        assert_eq!(f.name.as_deref(), Some("Flags"));
        assert!(f.type_refs.is_empty());
    }
}
