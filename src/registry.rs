use crate::{
    checker::{Builtin, CheckResult, TypeChecker},
    error::ConfigError,
    path::{FileSystem, StdFileSystem},
};
use serde_json::Value;
use std::{fmt, sync::Arc};

/// Lookup table from type name to checker
///
/// Custom types are consulted before built-ins, most recently added first, so
/// a custom type can shadow a built-in or an earlier custom type of the same
/// name.
#[derive(Clone)]
pub struct Registry {
    custom: Vec<TypeChecker>,
    fs: Arc<dyn FileSystem>,
}

impl Registry {
    /// Create a registry holding only the built-in types
    pub fn new() -> Self {
        Self {
            custom: Vec::new(),
            fs: Arc::new(StdFileSystem),
        }
    }

    /// Replace the filesystem used by the `path:*` types
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Filesystem used by the `path:*` types
    pub fn file_system(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Register a custom type backed by `check`
    pub fn define<F>(&mut self, name: impl Into<String>, check: F)
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.add(TypeChecker::custom(name, check));
    }

    /// Register a custom type matching strings against `pattern`
    pub fn define_regex(&mut self, name: impl Into<String>, pattern: &str) -> Result<(), ConfigError> {
        self.add(TypeChecker::regex(name, pattern)?);
        Ok(())
    }

    /// Add a checker ahead of every type registered so far
    pub fn add(&mut self, checker: TypeChecker) {
        log::debug!("registering custom type '{}'", checker.name());
        self.custom.insert(0, checker);
    }

    /// Resolve a type name, custom types first
    pub fn get(&self, name: &str) -> Option<TypeChecker> {
        self.custom
            .iter()
            .find(|c| c.name() == name)
            .cloned()
            .or_else(|| Builtin::from_name(name).map(TypeChecker::Builtin))
    }

    /// Resolve every name of a declaration, failing on the first unknown one
    pub fn lookup(&self, key: &str, names: &[String]) -> Result<Vec<TypeChecker>, ConfigError> {
        if names.is_empty() {
            return Err(ConfigError::EmptyTypeList {
                key: key.to_string(),
            });
        }
        names
            .iter()
            .map(|name| {
                self.get(name).ok_or_else(|| ConfigError::UnknownType {
                    key: key.to_string(),
                    name: name.clone(),
                })
            })
            .collect()
    }

    /// Whether `name` resolves to a type
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All resolvable names, custom ones first
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let all = self
            .custom
            .iter()
            .map(|c| c.name().to_string())
            .chain(Builtin::ALL.iter().map(|b| b.name().to_string()));
        for name in all {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Run `checker` with this registry's filesystem
    pub fn check(&self, checker: &TypeChecker, value: &Value) -> CheckResult {
        checker.check(value, self.fs.as_ref())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("custom", &self.custom)
            .finish_non_exhaustive()
    }
}
