//! Ordered name-keyed associations
//!
//! Every name-keyed result the engine emits (columns, constraints, tables)
//! must come out in natural, case-insensitive order so identical schemas
//! always produce byte-identical payloads. Plain maps cannot promise that,
//! so results are carried as an ordered list of key-value pairs that is
//! re-sorted explicitly after construction.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

/// Compare two strings naturally and case-insensitively: digit runs are
/// compared by numeric value, everything else by lower-cased character.
/// Ties fall back to a plain byte comparison so the ordering is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (mut i, mut j) = (0usize, 0usize);

    while i < a_chars.len() && j < b_chars.len() {
        let ca = a_chars[i];
        let cb = b_chars[j];

        if ca.is_ascii_digit() && cb.is_ascii_digit() {
            let start_a = i;
            while i < a_chars.len() && a_chars[i].is_ascii_digit() {
                i += 1;
            }
            let start_b = j;
            while j < b_chars.len() && b_chars[j].is_ascii_digit() {
                j += 1;
            }

            match cmp_digit_runs(&a_chars[start_a..i], &b_chars[start_b..j]) {
                Ordering::Equal => {}
                other => return other,
            }
        } else {
            let la = lowered(ca);
            let lb = lowered(cb);
            match la.cmp(&lb) {
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
                other => return other,
            }
        }
    }

    let remaining = (a_chars.len() - i).cmp(&(b_chars.len() - j));
    if remaining != Ordering::Equal {
        return remaining;
    }
    a.cmp(b)
}

fn lowered(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// Compare two digit runs by numeric value without parsing: strip leading
/// zeros, then longer run wins, then lexicographic digits.
fn cmp_digit_runs(a: &[char], b: &[char]) -> Ordering {
    let a = strip_leading_zeros(a);
    let b = strip_leading_zeros(b);

    match a.len().cmp(&b.len()) {
        Ordering::Equal => a.iter().cmp(b.iter()),
        other => other,
    }
}

fn strip_leading_zeros(digits: &[char]) -> &[char] {
    let first = digits.iter().position(|c| *c != '0').unwrap_or(digits.len());
    &digits[first..]
}

/// An association of string keys to values that keeps an explicit order and
/// serializes as a JSON object in that order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(Vec<(String, V)>);

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert at the end, replacing any existing entry with the same key
    /// in place.
    pub fn insert(&mut self, key: String, value: V) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.0.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut V)> {
        self.0.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Re-sort entries by natural, case-insensitive key order.
    pub fn sort_by_natural_key(&mut self) {
        self.0.sort_by(|(a, _), (b, _)| natural_cmp(a, b));
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<V> IntoIterator for OrderedMap<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for MapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map with string keys")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, V>()? {
                    entries.push((key, value));
                }
                Ok(OrderedMap(entries))
            }
        }

        deserializer.deserialize_map(MapVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_natural_cmp_digit_runs() {
        assert_eq!(natural_cmp("table2", "table10"), Ordering::Less);
        assert_eq!(natural_cmp("table10", "table2"), Ordering::Greater);
        assert_eq!(natural_cmp("v2_users", "v10_users"), Ordering::Less);
    }

    #[test]
    fn test_natural_cmp_case_insensitive() {
        assert_eq!(natural_cmp("Users", "accounts"), Ordering::Greater);
        assert_eq!(natural_cmp("ORDERS", "orders_archive"), Ordering::Less);
    }

    #[test]
    fn test_natural_cmp_is_total() {
        // Numerically equal digit runs still order deterministically
        assert_ne!(natural_cmp("a01", "a1"), Ordering::Equal);
        assert_eq!(natural_cmp("a1", "a1"), Ordering::Equal);
    }

    #[test]
    fn test_sort_by_natural_key() {
        let mut map: OrderedMap<u32> = [
            ("shard10".to_string(), 1),
            ("Shard2".to_string(), 2),
            ("shard1".to_string(), 3),
        ]
        .into_iter()
        .collect();
        map.sort_by_natural_key();

        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["shard1", "Shard2", "shard10"]);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut map = OrderedMap::new();
        map.insert("a".to_string(), 1);
        map.insert("b".to_string(), 2);
        map.insert("a".to_string(), 3);

        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a"), Some(&3));
        let keys: Vec<&str> = map.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_serializes_as_object_in_list_order() {
        let mut map = OrderedMap::new();
        map.insert("zeta".to_string(), 1);
        map.insert("alpha".to_string(), 2);

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"zeta":1,"alpha":2}"#);

        map.sort_by_natural_key();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"alpha":2,"zeta":1}"#);
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let mut map = OrderedMap::new();
        map.insert("b10".to_string(), "x".to_string());
        map.insert("B2".to_string(), "y".to_string());
        map.sort_by_natural_key();

        let first = serde_json::to_string(&map).unwrap();
        let second = serde_json::to_string(&map).unwrap();
        assert_eq!(first, second);

        let round_trip: OrderedMap<String> = serde_json::from_str(&first).unwrap();
        assert_eq!(round_trip, map);
    }
}
