//! Occurrence-splicing renderer: re-emits a declaration's source text with
//! identifier and qualified-name renames applied.

use std::collections::HashMap;

use crate::ast::SyntaxNode;

#[derive(Debug, Default)]
pub struct RenameMap {
    /// bare identifier → final name
    pub identifiers: HashMap<String, String>,
    /// dotted qualified name → final name
    pub qualified: HashMap<String, String>,
}

pub fn render(node: &SyntaxNode, renames: &RenameMap, keep_comment: bool) -> String {
    let mut out = String::with_capacity(node.text.len());
    if keep_comment {
        if let Some(comment) = &node.leading_comment {
            out.push_str(comment);
            out.push('\n');
        }
    }
    let mut cursor = 0;
    for occurrence in &node.idents {
        if occurrence.offset < cursor {
            continue;
        }
        let replacement = if occurrence.text.contains('.') {
            qualified_replacement(&occurrence.text, renames)
        } else {
            renames
                .identifiers
                .get(&occurrence.text)
                .map(|name| (occurrence.text.len(), name.clone()))
        };
        if let Some((replaced_len, name)) = replacement {
            out.push_str(&node.text[cursor..occurrence.offset]);
            out.push_str(&name);
            cursor = occurrence.offset + replaced_len;
        }
    }
    out.push_str(&node.text[cursor..]);
    out
}

/// Longest rename applying to a dotted chain: the whole chain, then dotted
/// prefixes, then the bare root.
fn qualified_replacement(text: &str, renames: &RenameMap) -> Option<(usize, String)> {
    if let Some(name) = renames.qualified.get(text) {
        return Some((text.len(), name.clone()));
    }
    let mut end = text.len();
    while let Some(dot) = text[..end].rfind('.') {
        let prefix = &text[..dot];
        let found = if prefix.contains('.') {
            renames.qualified.get(prefix)
        } else {
            renames.identifiers.get(prefix)
        };
        if let Some(name) = found {
            return Some((dot, name.clone()));
        }
        end = dot;
    }
    None
}
