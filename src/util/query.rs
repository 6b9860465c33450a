use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

/// Raw query string parameters.
///
/// Blank values are treated as absent, so `?cuisine=&q=` filters nothing.
#[derive(Debug, Default)]
pub struct QueryParams {
    map: HashMap<String, String>,
}

impl<'de> Deserialize<'de> for QueryParams {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = HashMap::<String, String>::deserialize(deserializer)?;
        Ok(QueryParams { map })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        QueryParams { map }
    }
}

impl QueryParams {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.map
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Parse an integer parameter, falling back to `default` when the
    /// value is absent or not a number.
    pub fn get_i64_or(&self, key: &str, default: i64) -> i64 {
        self.get(key)
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(default)
    }
}
