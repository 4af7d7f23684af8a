/// Shared data map passed through every phase of a run.
///
/// By convention values live under `store[point][hook_or_phase]`; hooks may
/// also write free top-level keys. The store is not synchronized: the default
/// runner hands out one `&mut Store` at a time, and concurrent runners give
/// each branch its own copy and merge afterwards (see [`Store::merge_branch`]).
use std::ops::Index;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

static NULL: Value = Value::Null;

/// Key under which a point's `before_all` result is recorded.
pub const BEFORE_ALL_KEY: &str = "beforeAll";
/// Key under which a point's `after_all` result is recorded.
pub const AFTER_ALL_KEY: &str = "afterAll";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Store {
    entries: Map<String, Value>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Write `value` at `store[point][key]`, creating the point namespace.
    /// A non-object value already sitting at `store[point]` is replaced.
    pub fn record(&mut self, point: &str, key: &str, value: Value) {
        let slot = self
            .entries
            .entry(point.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(namespace) = slot {
            namespace.insert(key.to_string(), value);
        }
    }

    /// Value recorded at `store[point][key]`.
    pub fn recorded(&self, point: &str, key: &str) -> Option<&Value> {
        self.namespace(point)?.get(key)
    }

    /// The whole namespace of a point, if it is an object.
    pub fn namespace(&self, point: &str) -> Option<&Map<String, Value>> {
        self.entries.get(point)?.as_object()
    }

    /// Fold a branch store back into this one.
    ///
    /// `base` is the snapshot the branch started from; only keys the branch
    /// changed are written. When both sides hold an object the comparison
    /// goes one level down, so two branches touching different entries of
    /// the same namespace both land. Otherwise the branch value wins.
    /// Removals made by the branch are not carried over.
    pub fn merge_branch(&mut self, base: &Store, branch: Store) {
        for (key, value) in branch.entries {
            if base.get(&key) == Some(&value) {
                continue;
            }
            let incoming = match value {
                Value::Object(incoming) => incoming,
                other => {
                    self.entries.insert(key, other);
                    continue;
                }
            };

            let before = base.namespace(&key);
            match self.entries.get_mut(&key) {
                Some(Value::Object(current)) => {
                    for (inner, inner_value) in incoming {
                        if before.and_then(|b| b.get(&inner)) != Some(&inner_value) {
                            current.insert(inner, inner_value);
                        }
                    }
                }
                _ => {
                    self.entries.insert(key, Value::Object(incoming));
                }
            }
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.entries
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.entries)
    }
}

impl Index<&str> for Store {
    type Output = Value;

    /// Missing keys index to `Value::Null`, like `serde_json::Value`.
    fn index(&self, key: &str) -> &Value {
        self.entries.get(key).unwrap_or(&NULL)
    }
}

impl From<Map<String, Value>> for Store {
    fn from(entries: Map<String, Value>) -> Self {
        Self { entries }
    }
}
