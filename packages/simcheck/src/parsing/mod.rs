//! Language selection and shared tree-sitter parsing
//!
//! Maps batch languages to tree-sitter grammars and provides a construct-once
//! parser pool that is shared (read-only from the caller's view) across all
//! pair computations. Parsing never panics and never raises out of a pair:
//! an unsupported language or a failed parse degrades to `None`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tree_sitter::{Node, Parser, Tree};

/// Supported languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Java,
    #[serde(alias = "c++")]
    Cpp,
    C,
}

impl Language {
    /// All supported languages
    pub const ALL: [Language; 4] = [Language::Python, Language::Java, Language::Cpp, Language::C];

    /// Language name as used in configuration and results
    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::C => "c",
        }
    }

    /// Parse a language name (`"c++"` is accepted as an alias for cpp)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "python" => Some(Language::Python),
            "java" => Some(Language::Java),
            "cpp" | "c++" => Some(Language::Cpp),
            "c" => Some(Language::C),
            _ => None,
        }
    }

    /// Language from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "py" | "pyi" => Some(Language::Python),
            "java" => Some(Language::Java),
            "cpp" | "cc" | "cxx" | "hpp" | "hh" => Some(Language::Cpp),
            "c" | "h" => Some(Language::C),
            _ => None,
        }
    }

    /// Heuristic language detection from a filename and/or code patterns.
    ///
    /// Extension wins when present; otherwise the language whose patterns
    /// score highest is returned, or `None` when nothing matches.
    pub fn detect(code: &str, filename: Option<&str>) -> Option<Self> {
        if let Some(name) = filename {
            if let Some(ext) = name.rsplit('.').next() {
                if let Some(lang) = Language::from_extension(ext) {
                    return Some(lang);
                }
            }
        }

        let lower = code.to_lowercase();
        let score = |patterns: &[&str]| patterns.iter().filter(|p| lower.contains(*p)).count();

        let python = score(&["def ", "import ", "class ", "elif "]);
        let cpp = score(&["#include", "std::", "cout", "template<"]);
        let java = score(&["public class", "public static void main", "system.out"]);

        let best = python.max(cpp).max(java);
        if best == 0 {
            return None;
        }
        if python == best {
            Some(Language::Python)
        } else if cpp == best {
            Some(Language::Cpp)
        } else {
            Some(Language::Java)
        }
    }

    /// The tree-sitter grammar for this language
    pub fn grammar(&self) -> tree_sitter::Language {
        match self {
            Language::Python => tree_sitter_python::language(),
            Language::Java => tree_sitter_java::language(),
            Language::Cpp => tree_sitter_cpp::language(),
            Language::C => tree_sitter_c::language(),
        }
    }

    /// Whether a tree-sitter node kind is a control-flow construct
    pub fn is_control_flow_kind(&self, kind: &str) -> bool {
        match self {
            Language::Python => matches!(
                kind,
                "if_statement"
                    | "for_statement"
                    | "while_statement"
                    | "with_statement"
                    | "try_statement"
                    | "match_statement"
            ),
            Language::Java => matches!(
                kind,
                "if_statement"
                    | "for_statement"
                    | "enhanced_for_statement"
                    | "while_statement"
                    | "do_statement"
                    | "switch_expression"
                    | "try_statement"
            ),
            Language::Cpp | Language::C => matches!(
                kind,
                "if_statement"
                    | "for_statement"
                    | "while_statement"
                    | "do_statement"
                    | "switch_statement"
                    | "try_statement"
            ),
        }
    }

    /// Extract the callee name from a call-site node, if `node` is one.
    ///
    /// Method calls yield the method name only (`obj.method()` → `method`),
    /// matching the original call-set semantics of plain-name calls.
    pub fn call_name<'a>(&self, node: &Node, source: &'a str) -> Option<&'a str> {
        let text = |n: &Node| source.get(n.byte_range());
        match self {
            Language::Python => {
                if node.kind() != "call" {
                    return None;
                }
                let func = node.child_by_field_name("function")?;
                match func.kind() {
                    "identifier" => text(&func),
                    "attribute" => func
                        .child_by_field_name("attribute")
                        .and_then(|n| text(&n)),
                    _ => None,
                }
            }
            Language::Java => {
                if node.kind() != "method_invocation" {
                    return None;
                }
                node.child_by_field_name("name").and_then(|n| text(&n))
            }
            Language::Cpp | Language::C => {
                if node.kind() != "call_expression" {
                    return None;
                }
                let func = node.child_by_field_name("function")?;
                match func.kind() {
                    "identifier" => text(&func),
                    "field_expression" => {
                        func.child_by_field_name("field").and_then(|n| text(&n))
                    }
                    "qualified_identifier" => {
                        func.child_by_field_name("name").and_then(|n| text(&n))
                    }
                    _ => None,
                }
            }
        }
    }

    /// Node kind used for line comments in this grammar
    pub fn comment_kinds(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["comment"],
            Language::Java => &["line_comment", "block_comment"],
            Language::Cpp | Language::C => &["comment"],
        }
    }
}

/// Shared, construct-once pool of tree-sitter parsers.
///
/// `Parser` is not `Sync`, so each language's parser sits behind a `Mutex`;
/// grammars are loaded exactly once at pool construction and a language whose
/// grammar fails to load simply drops out of the pool (parses degrade to
/// `None` rather than erroring).
pub struct ParserPool {
    parsers: HashMap<Language, Mutex<Parser>>,
}

impl ParserPool {
    /// Build a pool covering every supported language whose grammar loads
    pub fn new() -> Self {
        let mut parsers = HashMap::new();
        for lang in Language::ALL {
            let mut parser = Parser::new();
            match parser.set_language(&lang.grammar()) {
                Ok(()) => {
                    parsers.insert(lang, Mutex::new(parser));
                }
                Err(e) => {
                    warn!(language = lang.name(), error = %e, "failed to load grammar");
                }
            }
        }
        Self { parsers }
    }

    /// Process-wide shared pool
    pub fn shared() -> Arc<ParserPool> {
        static POOL: Lazy<Arc<ParserPool>> = Lazy::new(|| Arc::new(ParserPool::new()));
        Arc::clone(&POOL)
    }

    /// Whether this pool has a parser for `language`
    pub fn supports(&self, language: Language) -> bool {
        self.parsers.contains_key(&language)
    }

    /// Parse `code`, returning `None` on unsupported language or parser
    /// failure. A returned tree may still contain ERROR nodes; callers decide
    /// how strictly to treat those.
    pub fn parse(&self, language: Language, code: &str) -> Option<Tree> {
        let parser = match self.parsers.get(&language) {
            Some(p) => p,
            None => {
                warn!(language = language.name(), "no parser for language");
                return None;
            }
        };
        let mut parser = match parser.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let tree = parser.parse(code, None);
        if tree.is_none() {
            debug!(language = language.name(), "tree-sitter returned no tree");
        }
        tree
    }
}

impl Default for ParserPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect the kind labels of all named nodes, depth-first pre-order,
/// excluding comment and ERROR nodes.
pub fn node_kind_fingerprint(tree: &Tree, language: Language) -> Vec<String> {
    let mut kinds = Vec::new();
    let root = tree.root_node();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() {
            continue;
        }
        if node.is_named() && !language.comment_kinds().contains(&node.kind()) {
            kinds.push(node.kind().to_string());
        }
        for i in (0..node.child_count()).rev() {
            if let Some(child) = node.child(i) {
                stack.push(child);
            }
        }
    }
    kinds
}
