//! Syntax-tree normalizer
//!
//! Parses the submission and rewrites it through byte-range edits, so the
//! output is still valid code: comments and docstrings are spliced out and
//! identifiers are renamed to `var_k` / `func_k` / `class_k` slots in
//! declaration order, with builtin names preserved. Fails closed: any parse
//! failure logs a warning and returns the input untouched.

use std::ops::Range;
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;
use tracing::warn;
use tree_sitter::{Node, Tree};

use super::{NormalizationStrategy, Normalizer};
use crate::parsing::{Language, ParserPool};

static PYTHON_BUILTINS: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    [
        "print", "len", "range", "int", "float", "str", "bool", "list", "dict", "set", "tuple",
        "frozenset", "bytes", "bytearray", "sum", "min", "max", "abs", "round", "sorted",
        "reversed", "enumerate", "zip", "map", "filter", "any", "all", "open", "input",
        "isinstance", "issubclass", "type", "super", "object", "hasattr", "getattr", "setattr",
        "repr", "hash", "id", "iter", "next", "divmod", "pow", "ord", "chr", "format", "vars",
        "Exception", "BaseException", "ValueError", "TypeError", "KeyError", "IndexError",
        "AttributeError", "RuntimeError", "StopIteration", "ZeroDivisionError", "OSError",
        "NotImplementedError", "__name__", "__main__", "__init__", "__str__", "__repr__",
        "__len__", "__eq__", "__hash__", "__enter__", "__exit__", "__iter__", "__next__",
    ]
    .into_iter()
    .collect()
});

/// Tree-sitter based normalizer. Shares the process parser pool; all slot
/// state is local to a single call.
pub struct TreeNormalizer {
    language: Language,
    pool: Arc<ParserPool>,
}

impl TreeNormalizer {
    pub fn new(language: Language, pool: Arc<ParserPool>) -> Self {
        Self { language, pool }
    }

    fn parse_clean(&self, code: &str) -> Option<Tree> {
        let tree = self.pool.parse(self.language, code)?;
        if tree.root_node().has_error() {
            return None;
        }
        Some(tree)
    }

    fn is_preserved(&self, name: &str) -> bool {
        match self.language {
            Language::Python => PYTHON_BUILTINS.contains(name),
            _ => false,
        }
    }
}

impl Normalizer for TreeNormalizer {
    fn normalize(&self, code: &str) -> String {
        let stripped = self.remove_comments(code);
        let renamed = self.normalize_identifiers(&stripped);
        let canonical = self.canonicalize_structures(&renamed);
        indent_preserving_whitespace(&canonical)
    }

    /// Splice out comment nodes and leading docstring statements
    fn remove_comments(&self, code: &str) -> String {
        let tree = match self.parse_clean(code) {
            Some(t) => t,
            None => {
                warn!(language = self.language.name(), "unparseable input, keeping comments");
                return code.to_string();
            }
        };

        let mut ranges: Vec<Range<usize>> = Vec::new();
        collect_removable_ranges(tree.root_node(), self.language, &mut ranges);
        apply_edits(code, ranges.into_iter().map(|r| (r, String::new())).collect())
    }

    /// Rename identifiers to positional slots via byte-range edits
    fn normalize_identifiers(&self, code: &str) -> String {
        let tree = match self.parse_clean(code) {
            Some(t) => t,
            None => {
                warn!(language = self.language.name(), "unparseable input, keeping identifiers");
                return code.to_string();
            }
        };

        let mut slots = SlotAssigner::default();
        let mut edits: Vec<(Range<usize>, String)> = Vec::new();
        let mut stack = vec![tree.root_node()];
        while let Some(node) = stack.pop() {
            for i in (0..node.child_count()).rev() {
                if let Some(child) = node.child(i) {
                    stack.push(child);
                }
            }
            if node.kind() != "identifier" {
                continue;
            }
            if is_attribute_name(&node) {
                continue;
            }
            let name = match code.get(node.byte_range()) {
                Some(n) => n,
                None => continue,
            };
            if self.is_preserved(name) {
                continue;
            }
            let replacement = slots.slot_for(name, identifier_role(&node));
            edits.push((node.byte_range(), replacement));
        }

        apply_edits(code, edits)
    }

    fn canonicalize_structures(&self, code: &str) -> String {
        // Control-structure rewriting (for/while equivalence and the like)
        // is not performed; the structural engine compares trees directly.
        code.to_string()
    }

    fn strategy(&self) -> NormalizationStrategy {
        NormalizationStrategy::Tree
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum IdentifierRole {
    Variable,
    Function,
    Class,
}

/// First categorization of a name wins; later occurrences reuse its slot.
#[derive(Default)]
struct SlotAssigner {
    map: AHashMap<String, String>,
    var_count: usize,
    func_count: usize,
    class_count: usize,
}

impl SlotAssigner {
    fn slot_for(&mut self, name: &str, role: IdentifierRole) -> String {
        if let Some(existing) = self.map.get(name) {
            return existing.clone();
        }
        let slot = match role {
            IdentifierRole::Variable => {
                self.var_count += 1;
                format!("var_{}", self.var_count)
            }
            IdentifierRole::Function => {
                self.func_count += 1;
                format!("func_{}", self.func_count)
            }
            IdentifierRole::Class => {
                self.class_count += 1;
                format!("class_{}", self.class_count)
            }
        };
        self.map.insert(name.to_string(), slot.clone());
        slot
    }
}

fn identifier_role(node: &Node) -> IdentifierRole {
    let parent = match node.parent() {
        Some(p) => p,
        None => return IdentifierRole::Variable,
    };
    let is_name_field = parent
        .child_by_field_name("name")
        .map(|n| n.id() == node.id())
        .unwrap_or(false);
    if !is_name_field {
        return IdentifierRole::Variable;
    }
    match parent.kind() {
        "function_definition" => IdentifierRole::Function,
        "class_definition" => IdentifierRole::Class,
        _ => IdentifierRole::Variable,
    }
}

/// Attribute names and keyword-argument names stay as written; only plain
/// name references are slot-renamed.
fn is_attribute_name(node: &Node) -> bool {
    let parent = match node.parent() {
        Some(p) => p,
        None => return false,
    };
    match parent.kind() {
        "attribute" => parent
            .child_by_field_name("attribute")
            .map(|n| n.id() == node.id())
            .unwrap_or(false),
        "keyword_argument" => parent
            .child_by_field_name("name")
            .map(|n| n.id() == node.id())
            .unwrap_or(false),
        _ => false,
    }
}

fn collect_removable_ranges(root: Node, language: Language, ranges: &mut Vec<Range<usize>>) {
    let comment_kinds = language.comment_kinds();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if comment_kinds.contains(&node.kind()) {
            ranges.push(node.byte_range());
            continue;
        }
        if language == Language::Python && is_docstring(&node) {
            ranges.push(node.byte_range());
            continue;
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
}

/// A string expression statement sitting first in a module, function body,
/// or class body.
fn is_docstring(node: &Node) -> bool {
    if node.kind() != "expression_statement" || node.named_child_count() != 1 {
        return false;
    }
    let only_child = match node.named_child(0) {
        Some(c) => c,
        None => return false,
    };
    if only_child.kind() != "string" {
        return false;
    }
    let parent = match node.parent() {
        Some(p) => p,
        None => return false,
    };
    let first_stmt = match parent.named_child(0) {
        Some(f) => f,
        None => return false,
    };
    if first_stmt.id() != node.id() {
        return false;
    }
    match parent.kind() {
        "module" => true,
        "block" => parent
            .parent()
            .map(|gp| matches!(gp.kind(), "function_definition" | "class_definition"))
            .unwrap_or(false),
        _ => false,
    }
}

/// Apply byte-range replacements back to front so earlier ranges stay valid
fn apply_edits(code: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut out = code.to_string();
    let mut last_start = usize::MAX;
    for (range, replacement) in edits {
        // Overlapping or out-of-bounds edits are skipped rather than corrupting the output
        if range.end > out.len() || range.end > last_start {
            continue;
        }
        last_start = range.start;
        out.replace_range(range, &replacement);
    }
    out
}

/// Whitespace cleanup that keeps leading indentation intact (the output must
/// stay parseable), collapses interior runs, and squeezes blank lines.
fn indent_preserving_whitespace(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut blank_run = 0usize;
    for line in code.lines() {
        let indent_len = line.len() - line.trim_start().len();
        let (indent, rest) = line.split_at(indent_len);
        let mut collapsed = String::with_capacity(rest.len());
        let mut in_gap = false;
        for ch in rest.chars() {
            if ch == ' ' || ch == '\t' {
                in_gap = true;
            } else {
                if in_gap && !collapsed.is_empty() {
                    collapsed.push(' ');
                }
                in_gap = false;
                collapsed.push(ch);
            }
        }
        if collapsed.is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
            out.push('\n');
        } else {
            blank_run = 0;
            out.push_str(indent);
            out.push_str(&collapsed);
            out.push('\n');
        }
    }
    let trimmed: String = out.trim_end().to_string();
    trimmed.trim_start_matches('\n').to_string()
}
