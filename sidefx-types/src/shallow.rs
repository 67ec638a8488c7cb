//! One-level structural equality
//!
//! Two maps are shallow-equal when they hold the same own keys and every value
//! matches under the value type's one-level comparison. Nested containers are
//! not walked.

use crate::props::{PropValue, PropsBag};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Key-value map abstraction for [`shallow_equal`]
pub trait PropsMap {
    type Value;

    fn prop_count(&self) -> usize;

    fn prop(&self, key: &str) -> Option<&Self::Value>;

    fn prop_keys(&self) -> impl Iterator<Item = &str>;
}

/// Compare two maps one level deep
///
/// `same` decides whether two values stored under the same key match.
pub fn shallow_equal<M, F>(a: &M, b: &M, same: F) -> bool
where
    M: PropsMap,
    F: Fn(&M::Value, &M::Value) -> bool,
{
    if std::ptr::eq(a, b) {
        return true;
    }
    if a.prop_count() != b.prop_count() {
        return false;
    }
    a.prop_keys().all(|key| match (a.prop(key), b.prop(key)) {
        (Some(left), Some(right)) => same(left, right),
        _ => false,
    })
}

/// Props types the lifecycle adapter can compare to skip no-op updates
pub trait ShallowEq {
    fn shallow_eq(&self, other: &Self) -> bool;
}

/// Scalars have no inner level, so plain equality is the shallow comparison.
macro_rules! scalar_shallow_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ShallowEq for $ty {
                fn shallow_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

scalar_shallow_eq!(bool, char, i32, i64, u32, u64, usize, f32, f64, String);

impl PropsMap for PropsBag {
    type Value = PropValue;

    fn prop_count(&self) -> usize {
        self.len()
    }

    fn prop(&self, key: &str) -> Option<&PropValue> {
        self.get(key)
    }

    fn prop_keys(&self) -> impl Iterator<Item = &str> {
        self.keys()
    }
}

impl ShallowEq for PropsBag {
    fn shallow_eq(&self, other: &Self) -> bool {
        shallow_equal(self, other, PropValue::same)
    }
}

impl<V> PropsMap for BTreeMap<String, V> {
    type Value = V;

    fn prop_count(&self) -> usize {
        self.len()
    }

    fn prop(&self, key: &str) -> Option<&V> {
        self.get(key)
    }

    fn prop_keys(&self) -> impl Iterator<Item = &str> {
        self.keys().map(String::as_str)
    }
}

impl<V: PartialEq> ShallowEq for BTreeMap<String, V> {
    fn shallow_eq(&self, other: &Self) -> bool {
        shallow_equal(self, other, V::eq)
    }
}

impl<V, S: BuildHasher> PropsMap for HashMap<String, V, S> {
    type Value = V;

    fn prop_count(&self) -> usize {
        self.len()
    }

    fn prop(&self, key: &str) -> Option<&V> {
        self.get(key)
    }

    fn prop_keys(&self) -> impl Iterator<Item = &str> {
        self.keys().map(String::as_str)
    }
}

impl<V: PartialEq, S: BuildHasher> ShallowEq for HashMap<String, V, S> {
    fn shallow_eq(&self, other: &Self) -> bool {
        shallow_equal(self, other, V::eq)
    }
}

impl PropsMap for serde_json::Map<String, serde_json::Value> {
    type Value = serde_json::Value;

    fn prop_count(&self) -> usize {
        self.len()
    }

    fn prop(&self, key: &str) -> Option<&serde_json::Value> {
        self.get(key)
    }

    fn prop_keys(&self) -> impl Iterator<Item = &str> {
        self.keys().map(String::as_str)
    }
}

/// Plain JSON values carry no identity, so nested arrays and objects never
/// match one level deep.
impl ShallowEq for serde_json::Map<String, serde_json::Value> {
    fn shallow_eq(&self, other: &Self) -> bool {
        use serde_json::Value;
        shallow_equal(self, other, |a, b| match (a, b) {
            (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => false,
            _ => a == b,
        })
    }
}
