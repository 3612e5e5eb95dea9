use std::collections::BTreeMap;

/// Named query parameters for the columnar store.
///
/// The store substitutes `{name:String}` placeholders server-side, so
/// values in this map never enter the generated SQL text. Keys are kept
/// sorted for deterministic output in tests and logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMap {
    inner: BTreeMap<String, String>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn merge(&mut self, other: ParamMap) {
        self.inner.extend(other.inner);
    }
}

impl<const N: usize> From<[(&str, &str); N]> for ParamMap {
    fn from(pairs: [(&str, &str); N]) -> Self {
        let mut map = Self::new();
        for (k, v) in pairs {
            map.insert(k, v);
        }
        map
    }
}

/// Render the placeholder for a named String parameter.
pub fn placeholder(name: &str) -> String {
    format!("{{{name}:String}}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_renders_clickhouse_syntax() {
        assert_eq!(placeholder("qf_0_0"), "{qf_0_0:String}");
    }

    #[test]
    fn iteration_order_is_sorted() {
        let map = ParamMap::from([("b", "2"), ("a", "1")]);
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
