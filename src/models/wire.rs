//! Conventions of the backend's JSON encoding.
//!
//! 64-bit numbers usually arrive as strings, tuples arrive as arrays and maps
//! keyed by ids arrive as arrays of `[id, value]` pairs.

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serializer};
use serde_json::{Map, Value};

/// Fields of a payload the typed structs do not know about.
pub type Extra = Map<String, Value>;

/// Drops derived keys a previous decode may have left in a payload.
pub(crate) fn strip_derived(extra: &mut Extra, derived: &[&str]) {
    extra.retain(|key, _| !derived.contains(&key.as_str()));
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(i64),
    Float(f64),
    Str(String),
}

pub fn de_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    match NumberOrString::deserialize(d)? {
        NumberOrString::Int(v) => Ok(v),
        NumberOrString::Float(v) => integral(v).ok_or_else(|| {
            de::Error::custom(format!("expected an integer, found {}", v))
        }),
        NumberOrString::Str(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

fn integral(v: f64) -> Option<i64> {
    let in_range = v >= i64::MIN as f64 && v < i64::MAX as f64;
    (v.fract() == 0.0 && in_range).then_some(v as i64)
}

pub fn de_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    match NumberOrString::deserialize(d)? {
        NumberOrString::Int(v) => Ok(v as f64),
        NumberOrString::Float(v) => Ok(v),
        NumberOrString::Str(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

/// Accepts both `[[id, value], ...]` and `{"id": value, ...}`.
pub fn de_id_map<'de, D, V>(d: D) -> Result<BTreeMap<i32, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Table<V> {
        Pairs(Vec<(i32, V)>),
        Keyed(BTreeMap<String, V>),
    }

    match Table::<V>::deserialize(d)? {
        Table::Pairs(pairs) => Ok(pairs.into_iter().collect()),
        Table::Keyed(keyed) => keyed
            .into_iter()
            .map(|(k, v)| k.parse::<i32>().map(|k| (k, v)).map_err(de::Error::custom))
            .collect(),
    }
}

/// An `i64` written as a decimal string, read from either form.
pub mod i64_string {
    use super::*;

    pub fn serialize<S: Serializer>(v: &i64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&v.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        de_i64(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(deserialize_with = "de_i64")]
        n: i64,
        #[serde(deserialize_with = "de_id_map")]
        table: BTreeMap<i32, String>,
    }

    #[test]
    fn whole_floats_are_integers() {
        let h: Holder = serde_json::from_value(json!({"n": 4.0, "table": []})).unwrap();
        assert_eq!(h.n, 4);
    }

    #[test]
    fn fractional_numbers_are_rejected() {
        let err = serde_json::from_value::<Holder>(json!({"n": 4.7, "table": []}))
            .err()
            .unwrap();
        assert!(err.to_string().contains("expected an integer"));
        assert!(serde_json::from_value::<Holder>(json!({"n": 1e30, "table": []})).is_err());
    }

    #[test]
    fn numbers_as_strings() {
        let h: Holder = serde_json::from_value(json!({"n": "1468000000000", "table": []})).unwrap();
        assert_eq!(h.n, 1_468_000_000_000);
        let h: Holder = serde_json::from_value(json!({"n": 7, "table": {}})).unwrap();
        assert_eq!(h.n, 7);
    }

    #[test]
    fn id_tables_in_both_shapes() {
        let pairs: Holder =
            serde_json::from_value(json!({"n": 0, "table": [[1, "a"], [0, "b"]]})).unwrap();
        let keyed: Holder =
            serde_json::from_value(json!({"n": 0, "table": {"1": "a", "0": "b"}})).unwrap();
        assert_eq!(pairs.table, keyed.table);
        assert_eq!(pairs.table.get(&0).map(String::as_str), Some("b"));
    }

    #[test]
    fn bad_number_is_an_error() {
        let res = serde_json::from_value::<Holder>(json!({"n": "soon", "table": []}));
        assert!(res.is_err());
    }
}
