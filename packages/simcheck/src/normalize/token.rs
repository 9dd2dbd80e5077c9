//! Universal token-stream normalizer
//!
//! Language-agnostic pipeline: decode escapes that entered through tabular
//! storage, strip every recognized comment syntax in one pass, collapse
//! whitespace, then tokenize left to right and relabel. Keywords stay as
//! lowercase keywords, type names become `TYPE`, numeric literals become
//! `NUM`, and each remaining identifier gets a `VARk` slot in order of first
//! appearance. Canonical labels pass through unchanged, so re-normalizing an
//! output is a fixed point.

use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;

use super::{NormalizationStrategy, Normalizer};

static KEYWORDS: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    [
        "if", "else", "for", "while", "return", "break", "continue", "def", "import", "from",
        "class", "lambda", "elif", "in", "is", "not", "and", "or", "try", "except", "finally",
        "with", "as", "pass", "raise", "assert", "yield", "del", "global", "nonlocal", "public",
        "private", "protected", "static", "void", "const", "virtual", "override", "new", "delete",
        "this", "super", "extends", "implements", "interface", "package", "throws", "catch",
        "switch", "case", "default", "do", "goto", "sizeof", "typedef", "struct", "union", "enum",
        "namespace", "using", "template",
    ]
    .into_iter()
    .collect()
});

static TYPES: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    [
        "int", "float", "double", "char", "bool", "void", "string", "str", "long", "short",
        "unsigned", "signed", "byte", "list", "dict", "set", "tuple", "array", "vector", "map",
    ]
    .into_iter()
    .collect()
});

const MULTI_CHAR_OPS: [&str; 13] = [
    "==", "!=", "<=", ">=", "+=", "-=", "*=", "/=", "%=", "&&", "||", "<<", ">>",
];

const SINGLE_CHAR_PUNCT: &str = "%+-*/<>=(){}[]:;,.";

/// Token-stream normalizer. Stateless; each `normalize` call carries its own
/// identifier slot map, never shared across runs.
#[derive(Debug, Default)]
pub struct TokenNormalizer;

impl TokenNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Tokenize normalized code into the labeled token list
    pub fn tokens(&self, code: &str) -> Vec<String> {
        let code = decode_literal_escapes(code);
        let code = self.remove_comments(&code);
        let code = collapse_whitespace(&code);

        let raw = scan_tokens(&code);
        let mut slots: AHashMap<String, String> = AHashMap::new();
        raw.iter()
            .map(|token| classify_token(token, &mut slots))
            .filter(|t| !t.is_empty())
            .collect()
    }
}

impl Normalizer for TokenNormalizer {
    fn normalize(&self, code: &str) -> String {
        self.tokens(code).join(" ")
    }

    fn remove_comments(&self, code: &str) -> String {
        strip_comments(code)
    }

    // Identifier relabeling and canonicalization happen inside the token
    // scan; the staged entry points are identity here.
    fn normalize_identifiers(&self, code: &str) -> String {
        code.to_string()
    }

    fn canonicalize_structures(&self, code: &str) -> String {
        code.to_string()
    }

    fn strategy(&self) -> NormalizationStrategy {
        NormalizationStrategy::Token
    }
}

/// Decode literal `\n`, `\t` and friends that survive CSV-style storage.
/// Unknown escapes are kept verbatim; this never fails.
pub(crate) fn decode_literal_escapes(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    let mut chars = code.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.peek() {
            Some('n') => {
                chars.next();
                out.push('\n');
            }
            Some('t') => {
                chars.next();
                out.push('\t');
            }
            Some('r') => {
                chars.next();
                out.push('\r');
            }
            Some('\\') => {
                chars.next();
                out.push('\\');
            }
            _ => out.push('\\'),
        }
    }
    out
}

/// Strip `#`, `//`, and `/* */` comments in a single left-to-right scan.
fn strip_comments(code: &str) -> String {
    let bytes = code.as_bytes();
    let mut out = String::with_capacity(code.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'*' => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            _ => {
                // Code is valid UTF-8; copy the whole char
                let ch = code[i..].chars().next().unwrap_or('\u{FFFD}');
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    out
}

fn collapse_whitespace(code: &str) -> String {
    static GAP: Lazy<regex::Regex> = Lazy::new(|| regex::Regex::new(r"[ \t]+").unwrap());
    static BLANKS: Lazy<regex::Regex> = Lazy::new(|| regex::Regex::new(r"\n\s*\n+").unwrap());
    let code = GAP.replace_all(code, " ");
    BLANKS.replace_all(&code, "\n").into_owned()
}

/// One left-to-right scan over identifiers, numeric literals, multi-char
/// operators, and single-char punctuation. Anything unrecognized is dropped.
fn scan_tokens(code: &str) -> Vec<String> {
    let chars: Vec<char> = code.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        if ch.is_ascii_alphabetic() || ch == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
            continue;
        }
        if ch.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            if i < chars.len() && chars[i] == '.' {
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            tokens.push(chars[start..i].iter().collect());
            continue;
        }
        if i + 1 < chars.len() {
            let pair: String = chars[i..i + 2].iter().collect();
            if MULTI_CHAR_OPS.contains(&pair.as_str()) {
                tokens.push(pair);
                i += 2;
                continue;
            }
        }
        if SINGLE_CHAR_PUNCT.contains(ch) {
            tokens.push(ch.to_string());
        }
        i += 1;
    }
    tokens
}

fn is_numeric_literal(token: &str) -> bool {
    let mut chars = token.chars();
    let mut saw_digit = false;
    let mut saw_dot = false;
    for ch in chars.by_ref() {
        if ch.is_ascii_digit() {
            saw_digit = true;
        } else if ch == '.' && !saw_dot && saw_digit {
            saw_dot = true;
        } else {
            return false;
        }
    }
    saw_digit
}

fn is_slot_label(token: &str) -> bool {
    token
        .strip_prefix("VAR")
        .map(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

fn classify_token(token: &str, slots: &mut AHashMap<String, String>) -> String {
    // Canonical labels are already normalized; leaving them untouched keeps
    // normalization idempotent.
    if token == "TYPE" || token == "NUM" || is_slot_label(token) {
        return token.to_string();
    }

    let lower = token.to_lowercase();
    if KEYWORDS.contains(lower.as_str()) {
        return lower;
    }
    if TYPES.contains(lower.as_str()) {
        return "TYPE".to_string();
    }
    if is_numeric_literal(token) {
        return "NUM".to_string();
    }

    let first = token.chars().next().unwrap_or(' ');
    if first.is_ascii_alphabetic() || first == '_' {
        let next_slot = slots.len();
        return slots
            .entry(token.to_string())
            .or_insert_with(|| format!("VAR{next_slot}"))
            .clone();
    }

    token.to_string()
}
