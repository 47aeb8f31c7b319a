//! JSON-DOM value type carried by entities and relationship payloads.
//!
//! Entities are opaque string-keyed objects (spec §9, "dynamically typed
//! payloads"). Rather than bind this store to a concrete Rust struct per
//! entity kind, values are carried as this small sum type — the same shape
//! `serde_json::Value` has, but owned by this crate so index-key coercion
//! and ordering rules stay under our control instead of `serde_json`'s.

use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fmt,
};

use serde::{Deserialize, Serialize};

///
/// Value
/// A JSON-DOM scalar, array, or object.
///
/// `Object` is backed by a `BTreeMap` (not a `HashMap`) so two entities with
/// the same fields always serialize identically — this is load-bearing for
/// the backup blob, whose keys must be stable, and for `Eq`/`Ord` on index
/// components.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object_mut(&mut self) -> Option<&mut BTreeMap<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Coerce this value to the string component used in an index key
    /// (`<property>--<propertyValue>`). Scalars only; arrays/objects/null
    /// have no stable index representation and are skipped by callers.
    #[must_use]
    pub fn index_component(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(b.to_string()),
            Self::Number(n) => Some(format_number(*n)),
            Self::String(s) => Some(s.clone()),
            Self::Array(_) | Self::Object(_) => None,
        }
    }

    /// Ordering used by range-query `{min, max}` predicates. Numbers compare
    /// numerically; everything else falls back to its index-component
    /// string form. Returns `None` when the two values aren't comparable
    /// (e.g. one is an object).
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.partial_cmp(b),
            _ => match (self.index_component(), other.index_component()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => None,
            },
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index_component() {
            Some(s) => write!(f, "{s}"),
            None => write!(f, "{self:?}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

///
/// EntityMap
/// The canonical representation of one entity payload: a string-keyed
/// object. Thin enough to be `Deref`-transparent to the inner map, but
/// named so engine signatures read as entity operations, not map algebra.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct EntityMap(pub BTreeMap<String, Value>);

impl EntityMap {
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    #[must_use]
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.0.get(property)
    }

    pub fn insert(&mut self, property: impl Into<String>, value: Value) {
        self.0.insert(property.into(), value);
    }

    /// Resolve this entity's `id` per spec §3: the payload's own `id` field
    /// if present, otherwise the caller-supplied storage key.
    #[must_use]
    pub fn resolved_id(&self, fallback_key: &str) -> String {
        match self.get("id").and_then(Value::as_str) {
            Some(id) => id.to_owned(),
            None => fallback_key.to_owned(),
        }
    }

    /// Shallow-merge `patch` over `self`, matching spec's updateQuery
    /// contract: `{...current, ...patch}`. Properties absent from the
    /// patch are preserved; properties present in the patch overwrite.
    #[must_use]
    pub fn merged(&self, patch: &Self) -> Self {
        let mut merged = self.clone();
        for (k, v) in &patch.0 {
            merged.0.insert(k.clone(), v.clone());
        }
        merged
    }

    /// Entity with `id` set per spec §3's create-time rule.
    #[must_use]
    pub fn with_resolved_id(mut self, fallback_key: &str) -> Self {
        let id = self.resolved_id(fallback_key);
        self.0.insert("id".to_owned(), Value::String(id));
        self
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl std::ops::Deref for EntityMap {
    type Target = BTreeMap<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<BTreeMap<String, Value>> for EntityMap {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}
