//! Regex-heuristic normalizer
//!
//! Keyword-preserving identifier rewriting for the curly-brace languages.
//! No parsing happens here, so it cannot fail on broken input; the tradeoff
//! is heuristic identifier classification (Java names starting with an
//! uppercase letter are treated as class names).

use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{normalize_whitespace, NormalizationStrategy, Normalizer};
use crate::parsing::Language;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[a-zA-Z_][a-zA-Z0-9_]*\b").unwrap());
static BLOCK_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());
static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)//.*?$").unwrap());

static CPP_KEYWORDS: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    [
        "alignas", "alignof", "and", "and_eq", "asm", "auto", "bitand", "bitor", "bool", "break",
        "case", "catch", "char", "char8_t", "char16_t", "char32_t", "class", "compl", "concept",
        "const", "consteval", "constexpr", "constinit", "const_cast", "continue", "co_await",
        "co_return", "co_yield", "decltype", "default", "delete", "do", "double", "dynamic_cast",
        "else", "enum", "explicit", "export", "extern", "false", "float", "for", "friend", "goto",
        "if", "inline", "int", "long", "mutable", "namespace", "new", "noexcept", "not", "not_eq",
        "nullptr", "operator", "or", "or_eq", "private", "protected", "public", "register",
        "reinterpret_cast", "requires", "return", "short", "signed", "sizeof", "static",
        "static_assert", "static_cast", "struct", "switch", "template", "this", "thread_local",
        "throw", "true", "try", "typedef", "typeid", "typename", "union", "unsigned", "using",
        "virtual", "void", "volatile", "wchar_t", "while", "xor", "xor_eq",
        // Common stdlib names kept readable
        "cout", "cin", "endl", "string", "vector", "map", "set", "pair", "queue", "stack",
        "iostream", "algorithm", "printf", "scanf", "malloc", "free", "size_t", "main",
    ]
    .into_iter()
    .collect()
});

static JAVA_KEYWORDS: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    [
        "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class",
        "const", "continue", "default", "do", "double", "else", "enum", "extends", "final",
        "finally", "float", "for", "goto", "if", "implements", "import", "instanceof", "int",
        "interface", "long", "native", "new", "package", "private", "protected", "public",
        "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this",
        "throw", "throws", "transient", "try", "void", "volatile", "while", "true", "false",
        "null", "main",
    ]
    .into_iter()
    .collect()
});

static JAVA_STDLIB: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    [
        "System", "String", "Integer", "Double", "ArrayList", "HashMap", "List", "Map", "Set",
        "Collection", "Arrays", "Math", "Object", "Scanner", "StringBuilder", "Exception",
    ]
    .into_iter()
    .collect()
});

/// Regex-based normalizer for Java, C++ and C
pub struct RegexNormalizer {
    language: Language,
}

impl RegexNormalizer {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    fn is_preserved(&self, name: &str) -> bool {
        match self.language {
            Language::Java => JAVA_KEYWORDS.contains(name) || JAVA_STDLIB.contains(name),
            Language::Cpp | Language::C => {
                CPP_KEYWORDS.contains(name) || name.starts_with("std")
            }
            Language::Python => CPP_KEYWORDS.contains(name),
        }
    }
}

impl Normalizer for RegexNormalizer {
    fn normalize(&self, code: &str) -> String {
        let code = self.remove_comments(code);
        let code = normalize_whitespace(&code);
        let code = self.normalize_identifiers(&code);
        self.canonicalize_structures(&code)
    }

    fn remove_comments(&self, code: &str) -> String {
        let code = BLOCK_COMMENT.replace_all(code, "");
        LINE_COMMENT.replace_all(&code, "").into_owned()
    }

    fn normalize_identifiers(&self, code: &str) -> String {
        let mut map: AHashMap<String, String> = AHashMap::new();
        let mut var_count = 0usize;
        let mut class_count = 0usize;

        IDENTIFIER
            .replace_all(code, |caps: &Captures| {
                let name = &caps[0];
                if self.is_preserved(name) {
                    return name.to_string();
                }
                if let Some(existing) = map.get(name) {
                    return existing.clone();
                }
                let uppercase_class = self.language == Language::Java
                    && name.chars().next().is_some_and(|c| c.is_ascii_uppercase());
                let slot = if uppercase_class {
                    class_count += 1;
                    format!("Class_{class_count}")
                } else {
                    var_count += 1;
                    format!("var_{var_count}")
                };
                map.insert(name.to_string(), slot.clone());
                slot
            })
            .into_owned()
    }

    fn canonicalize_structures(&self, code: &str) -> String {
        // Control-structure rewriting is intentionally left alone
        code.to_string()
    }

    fn strategy(&self) -> NormalizationStrategy {
        NormalizationStrategy::Regex
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cpp_rename_invariant() {
        let n = RegexNormalizer::new(Language::Cpp);
        let a = n.normalize("int add(int a, int b) { return a + b; }");
        let b = n.normalize("int add(int x, int y) { return x + y; }");
        assert_eq!(a, b);
    }

    #[test]
    fn test_cpp_keywords_and_std_preserved() {
        let n = RegexNormalizer::new(Language::Cpp);
        let out = n.normalize("std::cout << total << std::endl;");
        assert!(out.contains("std::cout"));
        assert!(out.contains("var_1"));
        assert!(!out.contains("total"));
    }

    #[test]
    fn test_java_class_heuristic() {
        let n = RegexNormalizer::new(Language::Java);
        let out = n.normalize("public class Solution { int counter; }");
        assert_eq!(out, "public class Class_1 { int var_1; }");
    }

    #[test]
    fn test_java_stdlib_preserved() {
        let n = RegexNormalizer::new(Language::Java);
        let out = n.normalize("System.out.println(value);");
        assert!(out.starts_with("System."));
        assert!(!out.contains("value"));
    }

    #[test]
    fn test_comments_removed() {
        let n = RegexNormalizer::new(Language::Cpp);
        let out = n.normalize("int x = 1; // trailing\n/* block */ int y = 2;");
        assert!(!out.contains("trailing"));
        assert!(!out.contains("block"));
    }

    #[test]
    fn test_broken_input_never_panics() {
        let n = RegexNormalizer::new(Language::C);
        let out = n.normalize("int main( { return 0;; /* unclosed");
        assert!(out.contains("return"));
    }
}
