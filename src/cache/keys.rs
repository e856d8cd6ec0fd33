//! Store key layout for one cache instance.
//!
//! Every key lives under `{key_prefix}:{cache_name}:` followed by a kind
//! discriminator:
//!
//! | kind      | key                      | type   |
//! |-----------|--------------------------|--------|
//! | entry     | `{prefix}entry:{id}`     | string |
//! | tag       | `{prefix}tag:{name}`     | set    |
//! | entry tags| `{prefix}tags:{id}`      | set    |
//! | entry list| `{prefix}entries`        | list   |

use std::sync::LazyLock;

use regex::Regex;

use crate::cache::CacheError;

static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_%\-&]{1,250}$").expect("valid identifier regex"));

/// Reject identifiers and tag names that fall outside the accepted alphabet.
pub fn validate_identifier(kind: &'static str, value: &str) -> Result<(), CacheError> {
    if IDENTIFIER_PATTERN.is_match(value) {
        Ok(())
    } else {
        Err(CacheError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

/// Deterministic mapping from identifiers to store keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespace {
    prefix: String,
}

impl KeyNamespace {
    pub fn new(key_prefix: &str, cache_name: &str) -> Self {
        Self {
            prefix: format!("{}:{}:", key_prefix, cache_name),
        }
    }

    /// The prefix shared by every key of this instance, including the trailing `:`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn entry_key(&self, identifier: &str) -> String {
        format!("{}entry:{}", self.prefix, identifier)
    }

    pub fn tag_key(&self, tag: &str) -> String {
        format!("{}tag:{}", self.prefix, tag)
    }

    pub fn entry_tags_key(&self, identifier: &str) -> String {
        format!("{}tags:{}", self.prefix, identifier)
    }

    pub fn entry_list_key(&self) -> String {
        format!("{}entries", self.prefix)
    }

    /// Glob pattern matching every key of this instance.
    ///
    /// Glob metacharacters in the prefix are escaped so a prefix such as
    /// `app[1]` never matches keys of another instance.
    pub fn flush_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.prefix.len() + 1);
        for c in self.prefix.chars() {
            if matches!(c, '*' | '?' | '[' | ']' | '\\') {
                pattern.push('\\');
            }
            pattern.push(c);
        }
        pattern.push('*');
        pattern
    }
}
