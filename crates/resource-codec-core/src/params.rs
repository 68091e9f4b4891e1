//! Ordered parameter multimap — the flat wire representation shared by the
//! encoder, the href builder and the decoder.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::error::CodecError;

/// Ordered mapping from wire name to one or more string values.
///
/// Keys keep their first-insertion order and every key holds a non-empty list
/// of values in insertion order. Equality compares key sets and per-key value
/// lists; the relative order of distinct keys is not significant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterMultiMap {
    entries: IndexMap<String, Vec<String>>,
}

impl ParameterMultiMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` under `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    /// Append every value under `name`. No key is created for an empty iterator.
    pub fn extend_values<I, S>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values = values.into_iter().map(Into::into).peekable();
        if values.peek().is_none() {
            return;
        }
        match self.entries.get_mut(name) {
            Some(existing) => existing.extend(values),
            None => {
                self.entries.insert(name.to_string(), values.collect());
            }
        }
    }

    /// Append all entries of `other`, preserving their relative order.
    pub fn merge(&mut self, other: ParameterMultiMap) {
        for (name, values) in other.entries {
            self.entries.entry(name).or_default().extend(values);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// All values recorded under `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> Option<&[String]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// The value under `name` when at most one is present.
    ///
    /// Returns `Ok(None)` when the key is absent and
    /// [`CodecError::AmbiguousParameter`] when it holds more than one value.
    pub fn get_single(&self, name: &str, descriptor: &str) -> Result<Option<&str>, CodecError> {
        match self.entries.get(name).map(Vec::as_slice) {
            None | Some([]) => Ok(None),
            Some([value]) => Ok(Some(value.as_str())),
            Some(values) => Err(CodecError::AmbiguousParameter {
                descriptor: descriptor.to_string(),
                name: name.to_string(),
                count: values.len(),
            }),
        }
    }

    /// Remove `name`, keeping the order of the remaining keys.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.entries.shift_remove(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Every `(name, value)` pair; repeated keys yield one pair per value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| (name.as_str(), v.as_str())))
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse an `application/x-www-form-urlencoded` query string (without `?`).
    pub fn from_query(query: &str) -> Self {
        form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Serialize as `name=value` pairs joined by `&`; empty map → empty string.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in self.iter() {
            serializer.append_pair(name, value);
        }
        serializer.finish()
    }
}

impl<K, V> FromIterator<(K, V)> for ParameterMultiMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = ParameterMultiMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}
