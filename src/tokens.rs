//! Collision-free identifier assignment for named schemas and API groups.

use std::collections::{HashMap, HashSet};

/// TypeScript reserved words that generated identifiers must avoid.
const RESERVED_WORDS: &[&str] = &[
    "break",
    "case",
    "catch",
    "class",
    "const",
    "continue",
    "debugger",
    "default",
    "delete",
    "do",
    "else",
    "enum",
    "export",
    "extends",
    "false",
    "finally",
    "for",
    "function",
    "if",
    "import",
    "in",
    "instanceof",
    "new",
    "null",
    "return",
    "super",
    "switch",
    "this",
    "throw",
    "true",
    "try",
    "typeof",
    "var",
    "void",
    "while",
    "with",
    "yield",
    "let",
    "static",
    "implements",
    "interface",
    "package",
    "private",
    "protected",
    "public",
    "await",
    "async",
];

/// Identifiers claimed by the embedded client runtime prelude.
const RUNTIME_IDENTIFIERS: &[&str] = &[
    "Client",
    "ApiRequest",
    "ClientMiddleware",
    "RequestHandler",
    "ResponseError",
];

/// Assigns stable, unique, keyword-safe identifiers to raw names.
///
/// Re-resolving a raw name always returns the identifier it was first given;
/// distinct raw names never collide with each other or with the seeded
/// reserved set. Scoped to one generation run.
#[derive(Debug)]
pub struct TokenRegistry {
    assigned: HashMap<String, String>,
    reserved: HashSet<String>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        let reserved = RESERVED_WORDS
            .iter()
            .chain(RUNTIME_IDENTIFIERS)
            .map(|word| (*word).to_string())
            .collect();
        Self {
            assigned: HashMap::new(),
            reserved,
        }
    }

    /// Resolve a raw name to its unique identifier. Never fails.
    pub fn resolve(&mut self, raw: &str) -> String {
        if let Some(existing) = self.assigned.get(raw) {
            return existing.clone();
        }

        let candidate = strip_identifier(raw);
        let unique = if self.reserved.contains(&candidate) {
            let mut suffix = 1usize;
            loop {
                let suffixed = format!("{candidate}_{suffix}");
                if !self.reserved.contains(&suffixed) {
                    break suffixed;
                }
                suffix += 1;
            }
        } else {
            candidate
        };

        self.reserved.insert(unique.clone());
        self.assigned.insert(raw.to_string(), unique.clone());
        unique
    }
}

/// Check whether an identifier is a TypeScript keyword.
pub(crate) fn is_reserved_word(word: &str) -> bool {
    RESERVED_WORDS.contains(&word)
}

/// Title-case word boundaries and drop everything outside `[A-Za-z0-9_]`.
///
/// A boundary is the start of the string or any run of stripped characters;
/// existing interior capitalization is preserved. Results starting with a
/// digit get a leading underscore; an empty result falls back to `Unnamed`.
pub fn strip_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut boundary = true;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if boundary && c.is_ascii_alphabetic() {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
            boundary = false;
        } else {
            boundary = true;
        }
    }

    if out.is_empty() {
        return "Unnamed".to_string();
    }
    if out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Lower the first letter (method base names are camelCase forms of tokens).
pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

/// Convert a name to snake_case for placeholder equivalence checks.
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_identifier() {
        assert_eq!(strip_identifier("pet"), "Pet");
        assert_eq!(strip_identifier("pet store"), "PetStore");
        assert_eq!(strip_identifier("pet-store.v2"), "PetStoreV2");
        assert_eq!(strip_identifier("petStore"), "PetStore");
        assert_eq!(strip_identifier("foo_bar"), "Foo_bar");
        assert_eq!(strip_identifier("123abc"), "_123abc");
        assert_eq!(strip_identifier("!!!"), "Unnamed");
        assert_eq!(strip_identifier(""), "Unnamed");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut registry = TokenRegistry::new();
        let first = registry.resolve("pet store");
        let second = registry.resolve("pet store");
        assert_eq!(first, "PetStore");
        assert_eq!(first, second);
    }

    #[test]
    fn test_distinct_raw_names_never_collide() {
        let mut registry = TokenRegistry::new();
        let a = registry.resolve("pet-store");
        let b = registry.resolve("pet store");
        let c = registry.resolve("PetStore");
        assert_eq!(a, "PetStore");
        assert_eq!(b, "PetStore_1");
        assert_eq!(c, "PetStore_2");
        // Re-resolving keeps the original assignments.
        assert_eq!(registry.resolve("pet store"), "PetStore_1");
    }

    #[test]
    fn test_runtime_identifiers_are_reserved() {
        let mut registry = TokenRegistry::new();
        assert_eq!(registry.resolve("client"), "Client_1");
        assert_eq!(registry.resolve("Api request"), "ApiRequest_1");
    }

    #[test]
    fn test_lower_first() {
        assert_eq!(lower_first("GetPet"), "getPet");
        assert_eq!(lower_first(""), "");
        assert_eq!(lower_first("a"), "a");
    }

    #[test]
    fn test_to_snake_case() {
        assert_eq!(to_snake_case("petId"), "pet_id");
        assert_eq!(to_snake_case("pet_id"), "pet_id");
        assert_eq!(to_snake_case("PetId"), "pet_id");
    }
}
