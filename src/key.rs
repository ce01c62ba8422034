//! Structural query identities
//!
//! A [`QueryKey`] is an ordered list of JSON values, e.g. `["clients", {"search": "x"}]`.
//! Two keys are equal iff they are deeply equal. The key must encode every parameter
//! that affects the result set (filters, sort, search text), otherwise a cached page
//! sequence for a different result set will be served.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::errors::{PaginationError, PaginationResult};

/// Ordered, structurally comparable identity of one paginated query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<Value>);

impl QueryKey {
    /// Create a key with a single leading scope, e.g. `"clients"`
    pub fn new(scope: impl Into<String>) -> Self {
        Self(vec![Value::String(scope.into())])
    }

    /// Create a key from raw parts
    pub fn from_parts(parts: Vec<Value>) -> Self {
        Self(parts)
    }

    /// Append a part to the key
    pub fn with(mut self, part: impl Into<Value>) -> Self {
        self.0.push(part.into());
        self
    }

    /// Append any serializable value (typically a filter struct) to the key
    pub fn try_with<S: Serialize>(mut self, part: &S) -> PaginationResult<Self> {
        let value = serde_json::to_value(part).map_err(|err| {
            PaginationError::Configuration(format!("query key part is not serializable: {err}"))
        })?;
        self.0.push(value);
        Ok(self)
    }

    pub fn parts(&self) -> &[Value] {
        &self.0
    }

    /// Canonical string form with object keys sorted.
    ///
    /// Deeply equal keys always produce the same string, so this is used as the
    /// cache key in the page store.
    pub fn cache_key(&self) -> String {
        let mut out = String::new();
        write_canonical(&Value::Array(self.0.clone()), &mut out);
        out
    }
}

impl Eq for QueryKey {}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cache_key().hash(state);
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

impl From<&str> for QueryKey {
    fn from(scope: &str) -> Self {
        Self::new(scope)
    }
}

impl From<Vec<Value>> for QueryKey {
    fn from(parts: Vec<Value>) -> Self {
        Self(parts)
    }
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (name, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deeply_equal_keys_share_a_cache_key() {
        let a = QueryKey::new("clients").with(json!({"search": "x", "sort": "name"}));
        let b = QueryKey::new("clients").with(json!({"sort": "name", "search": "x"}));
        assert_eq!(a, b);
        assert_eq!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), r#"["clients",{"search":"x","sort":"name"}]"#);
    }

    #[test]
    fn filters_change_identity() {
        let plain = QueryKey::new("clients");
        let filtered = QueryKey::new("clients").with(json!({"search": "x"}));
        assert_ne!(plain, filtered);
        assert_ne!(plain.cache_key(), filtered.cache_key());
    }

    #[test]
    fn serializable_parts_are_accepted() {
        #[derive(Serialize)]
        struct Filter {
            category: u32,
        }

        let key = QueryKey::new("products")
            .try_with(&Filter { category: 7 })
            .unwrap();
        assert_eq!(key.parts()[1], json!({"category": 7}));
    }
}
