use std::{
    collections::BTreeMap,
    env,
    sync::{Mutex, MutexGuard, PoisonError},
};

/// Process-wide key/value store the resolver reads from and mirrors into
///
/// Writes are last-writer-wins; callers are expected to resolve from a single
/// thread during startup.
pub trait ProcessEnv: Send + Sync {
    /// Current value of `key`, None if unset or not valid unicode
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str);

    fn remove(&self, key: &str);

    /// Snapshot of every variable
    fn vars(&self) -> Vec<(String, String)>;
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct StdEnv;

impl ProcessEnv for StdEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }

    fn set(&self, key: &str, value: &str) {
        env::set_var(key, value);
    }

    fn remove(&self, key: &str) {
        env::remove_var(key);
    }

    fn vars(&self) -> Vec<(String, String)> {
        env::vars().collect()
    }
}

/// In-memory environment for tests and sandboxed resolution
#[derive(Debug, Default)]
pub struct MockEnv {
    vars: Mutex<BTreeMap<String, String>>,
}

impl MockEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock environment pre-populated with `vars`
    pub fn from_pairs<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: Mutex::new(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.vars.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProcessEnv for MockEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    fn vars(&self) -> Vec<(String, String)> {
        self.lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
