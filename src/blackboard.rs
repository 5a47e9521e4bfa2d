use crate::Symbol;
use std::{
    any::Any,
    collections::{BTreeMap, HashMap},
    fmt,
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

pub type BlackboardValue = Arc<dyn Any + Send + Sync>;

/// Shared key-value context of one tree instance.
///
/// A `Blackboard` is a handle: cloning it yields another reference to the same
/// store, which is how every node of a tree sees the same values after
/// [`crate::BehaviourTree::bind`]. Use [`Blackboard::deep_copy`] to get an
/// independent store.
///
/// Values sit behind an `Arc`, so a deep copy shares payloads without
/// requiring `Clone` from the stored types. Writing a key replaces its `Arc`;
/// a copy never observes writes made to its source.
///
/// The map lock is held for a single read or write only.
#[derive(Clone, Default)]
pub struct Blackboard {
    entries: Arc<Mutex<HashMap<Symbol, BlackboardValue>>>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a blackboard holding string values, e.g. the defaults of a
    /// persisted template.
    pub fn from_literals<K, V>(literals: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Symbol>,
        V: Into<String>,
    {
        let ret = Self::new();
        for (key, value) in literals {
            ret.set(key, value.into());
        }
        ret
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Symbol, BlackboardValue>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get<T: Any + Send + Sync>(&self, key: impl Into<Symbol>) -> Option<Arc<T>> {
        let value = self.lock().get(&key.into())?.clone();
        value.downcast::<T>().ok()
    }

    /// Reads a value of type `T`, falling back to parsing it from a stored
    /// `String`.
    pub fn get_parse<T>(&self, key: impl Into<Symbol>) -> Option<T>
    where
        T: FromStr + Clone + Any + Send + Sync,
    {
        let value = self.lock().get(&key.into())?.clone();
        if let Some(value) = value.downcast_ref::<T>() {
            return Some(value.clone());
        }
        value
            .downcast_ref::<String>()
            .and_then(|s| s.parse().ok())
    }

    pub fn set<T: Any + Send + Sync>(&self, key: impl Into<Symbol>, value: T) {
        self.lock().insert(key.into(), Arc::new(value));
    }

    pub fn set_any(&self, key: impl Into<Symbol>, value: BlackboardValue) {
        self.lock().insert(key.into(), value);
    }

    pub fn contains(&self, key: impl Into<Symbol>) -> bool {
        self.lock().contains_key(&key.into())
    }

    pub fn remove(&self, key: impl Into<Symbol>) -> bool {
        self.lock().remove(&key.into()).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn keys(&self) -> Vec<Symbol> {
        let mut keys: Vec<_> = self.lock().keys().copied().collect();
        keys.sort();
        keys
    }

    /// Whether both handles refer to the same store.
    pub fn ptr_eq(&self, other: &Blackboard) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    pub fn deep_copy(&self) -> Blackboard {
        Blackboard {
            entries: Arc::new(Mutex::new(self.lock().clone())),
        }
    }

    /// The entries holding a `String`, which is all a persisted template can
    /// carry.
    pub fn literals(&self) -> BTreeMap<String, String> {
        self.lock()
            .iter()
            .filter_map(|(key, value)| {
                value
                    .downcast_ref::<String>()
                    .map(|value| (key.as_str().to_owned(), value.clone()))
            })
            .collect()
    }
}

impl fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blackboard")
            .field("keys", &self.keys())
            .finish()
    }
}
