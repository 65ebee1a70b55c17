use crate::{
    checker::{CheckResult, TypeChecker},
    error::{ConfigError, VariableError},
    path::{FileSystem, StdFileSystem},
    process::{ProcessEnv, StdEnv},
    registry::Registry,
    result::EnvResult,
    value::{EnvMap, to_env_string},
};
use serde_json::Value;
use std::sync::Arc;

/// Ordered mapping from variable name to the names of its accepted types
///
/// # Example
/// ```rust
/// use typenv::VariableTypes;
///
/// let types = VariableTypes::new()
///     .with("PORT", ["port"])
///     .with("DNS_SERVERS", ["json:array", "csv:array"]);
/// assert_eq!(types.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableTypes {
    entries: Vec<(String, Vec<String>)>,
}

impl VariableTypes {
    /// Create an empty declaration list
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `key`, replacing an earlier declaration in place
    pub fn with<I, S>(mut self, key: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(key, types);
        self
    }

    /// Declare `key` in place, appending it when new
    pub fn set<I, S>(&mut self, key: impl Into<String>, types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let key = key.into();
        let types: Vec<String> = types.into_iter().map(Into::into).collect();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = types,
            None => self.entries.push((key, types)),
        }
    }

    /// Drop the declaration of `key`, returning its types
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Declared types of `key`
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, types)| types.as_slice())
    }

    /// Declarations in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(k, types)| (k.as_str(), types.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, I, S> FromIterator<(K, I)> for VariableTypes
where
    K: Into<String>,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, I)>>(iter: T) -> Self {
        let mut types = VariableTypes::new();
        for (key, names) in iter {
            types.set(key, names);
        }
        types
    }
}

/// How the process environment takes part in resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Read candidate values from the process environment at all
    pub load_process_env: bool,
    /// Process values win over supplied defaults; when false they only fill gaps
    pub process_env_overrides: bool,
    /// Write each successfully converted value back into the process environment
    pub mirror_process_env: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            load_process_env: true,
            process_env_overrides: true,
            mirror_process_env: true,
        }
    }
}

/// Try `checkers` in order and return the first match
///
/// Uses the real filesystem for `path:*` types. `Ok(None)` means no checker
/// matched; that is an ordinary outcome, not an error.
pub fn parse_value(value: &Value, checkers: &[TypeChecker]) -> CheckResult {
    parse_value_in(value, checkers, &StdFileSystem)
}

pub(crate) fn parse_value_in(
    value: &Value,
    checkers: &[TypeChecker],
    fs: &dyn FileSystem,
) -> CheckResult {
    for checker in checkers {
        if let Some(converted) = checker.check(value, fs)? {
            return Ok(Some(converted));
        }
    }
    Ok(None)
}

/// Resolve `types` against `defaults` and the real process environment
///
/// Unknown type names abort with a [`ConfigError`]; values that match none of
/// their types are collected on the returned [`EnvResult`].
pub fn parse_env(defaults: EnvMap, types: &VariableTypes) -> Result<EnvResult, ConfigError> {
    Resolver::new(&Registry::default(), Arc::new(StdEnv)).parse_env(defaults, types)
}

/// Resolution pass over a registry and a process environment
pub struct Resolver<'a> {
    registry: &'a Registry,
    process: Arc<dyn ProcessEnv>,
    options: ResolveOptions,
}

impl<'a> Resolver<'a> {
    /// Create a resolver with default options
    pub fn new(registry: &'a Registry, process: Arc<dyn ProcessEnv>) -> Self {
        Self {
            registry,
            process,
            options: ResolveOptions::default(),
        }
    }

    /// Replace the process environment options
    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// [`parse_value`] with this resolver's filesystem
    pub fn parse_value(&self, value: &Value, checkers: &[TypeChecker]) -> CheckResult {
        parse_value_in(value, checkers, self.registry.file_system())
    }

    /// Candidate raw value for `key`, given the value the supplied sources hold
    pub fn raw_value(&self, key: &str, supplied: Option<&Value>) -> Option<Value> {
        let supplied = supplied.filter(|v| !v.is_null()).cloned();
        let from_process = if self.options.load_process_env {
            self.process
                .get(key)
                .filter(|v| !v.is_empty())
                .map(Value::String)
        } else {
            None
        };
        if self.options.process_env_overrides {
            from_process.or(supplied)
        } else {
            supplied.or(from_process)
        }
    }

    /// Check every declared name before touching any value
    pub(crate) fn lookup_all(
        &self,
        types: &VariableTypes,
    ) -> Result<Vec<(String, Vec<String>, Vec<TypeChecker>)>, ConfigError> {
        types
            .iter()
            .map(|(key, names)| -> Result<_, ConfigError> {
                let checkers = self.registry.lookup(key, names)?;
                Ok((key.to_string(), names.to_vec(), checkers))
            })
            .collect()
    }

    /// Resolve one key and record the outcome into `env`
    ///
    /// On a match the converted value replaces the entry and, when enabled, is
    /// mirrored into the process environment. On a mismatch the entry keeps
    /// whatever it held before and the error is returned.
    pub(crate) fn resolve_key(
        &self,
        env: &mut EnvMap,
        key: &str,
        names: &[String],
        checkers: &[TypeChecker],
        raw: Option<Value>,
    ) -> Result<Option<VariableError>, ConfigError> {
        let raw = raw.unwrap_or(Value::Null);
        match self.parse_value(&raw, checkers)? {
            Some(converted) => {
                log::debug!("resolved {key} as {converted}");
                if self.options.mirror_process_env {
                    self.process.set(key, &to_env_string(&converted));
                }
                env.insert(key.to_string(), converted);
                Ok(None)
            }
            None => {
                let error = VariableError::new(key, names.to_vec(), raw);
                log::warn!("{error}");
                Ok(Some(error))
            }
        }
    }

    /// Resolve every key of `types`, collecting mismatches
    pub fn parse_env(&self, defaults: EnvMap, types: &VariableTypes) -> Result<EnvResult, ConfigError> {
        let declared = self.lookup_all(types)?;

        let mut env = defaults;
        let mut errors = Vec::new();
        for (key, names, checkers) in &declared {
            let raw = self.raw_value(key, env.get(key));
            if let Some(error) = self.resolve_key(&mut env, key, names, checkers, raw)? {
                errors.push(error);
            }
        }

        Ok(EnvResult::new(env, errors, Arc::clone(&self.process)))
    }
}
