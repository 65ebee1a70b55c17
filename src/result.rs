use crate::{
    convert::FromValue,
    error::{ConfigError, VariableError},
    process::ProcessEnv,
    value::{EnvMap, is_truthy, to_env_string},
};
use colored::Colorize;
use serde_json::Value;
use std::{
    fmt,
    io::{self, Write},
    sync::Arc,
};

/// Resolved environment plus the errors collected while resolving it
///
/// Post-processing methods consume and return the result so calls chain:
///
/// ```rust
/// use std::sync::Arc;
/// use serde_json::json;
/// use typenv::{MockEnv, Registry, Resolver, VariableTypes, env_map};
///
/// let registry = Registry::new();
/// let process = Arc::new(MockEnv::new());
/// let types = VariableTypes::new().with("PORT", ["port"]);
///
/// let env = Resolver::new(&registry, process)
///     .parse_env(env_map(json!({"PORT": "8080"})).unwrap(), &types)
///     .unwrap()
///     .err_throw()
///     .unwrap()
///     .clear_process_env(true)
///     .into_env();
/// assert_eq!(env["PORT"], json!(8080));
/// ```
pub struct EnvResult {
    env: EnvMap,
    errors: Vec<VariableError>,
    process: Arc<dyn ProcessEnv>,
}

impl EnvResult {
    pub fn new(env: EnvMap, errors: Vec<VariableError>, process: Arc<dyn ProcessEnv>) -> Self {
        Self {
            env,
            errors,
            process,
        }
    }

    pub fn env(&self) -> &EnvMap {
        &self.env
    }

    pub fn errors(&self) -> &[VariableError] {
        &self.errors
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.env.get(key)
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Convert the value of `key` into a Rust type
    pub fn extract<T: FromValue>(&self, key: &str) -> Result<T, ConfigError> {
        T::from_value(key, self.env.get(key).unwrap_or(&Value::Null))
    }

    pub fn into_env(self) -> EnvMap {
        self.env
    }

    pub fn into_parts(self) -> (EnvMap, Vec<VariableError>) {
        (self.env, self.errors)
    }

    /// Set every key of `patch`, replacing existing values
    pub fn overwrite_env(mut self, patch: EnvMap) -> Self {
        for (key, value) in patch {
            self.env.insert(key, value);
        }
        self
    }

    /// Set keys of `patch` whose current value is falsy
    /// (missing, null, false, zero or an empty string)
    pub fn set_missing_env(mut self, patch: EnvMap) -> Self {
        for (key, value) in patch {
            if !is_truthy(self.env.get(&key)) {
                self.env.insert(key, value);
            }
        }
        self
    }

    /// Write every resolved value into the process environment
    pub fn set_process_env(self) -> Self {
        for (key, value) in &self.env {
            self.process.set(key, &to_env_string(value));
        }
        self
    }

    /// Remove resolved keys from the process environment
    ///
    /// With `just_equal_values`, a key is only removed while the process still
    /// holds the string form of the resolved value, so values changed by other
    /// code after resolution survive.
    pub fn clear_process_env(self, just_equal_values: bool) -> Self {
        for (key, value) in &self.env {
            if just_equal_values && self.process.get(key) != Some(to_env_string(value)) {
                continue;
            }
            self.process.remove(key);
        }
        self
    }

    /// Render the error report into `out`; writes nothing without errors
    pub fn err_print_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if self.errors.is_empty() {
            return Ok(());
        }
        writeln!(out, "{}", "Environment Errors:".yellow().bold())?;
        for error in &self.errors {
            writeln!(out, "########## [ {} ]:", error.key.magenta().bold())?;
            let message = error
                .message()
                .lines()
                .filter(|line| !line.trim().is_empty())
                .collect::<Vec<_>>()
                .join("\n");
            writeln!(out, "{}", message)?;
        }
        Ok(())
    }

    /// Print the error report to stderr
    pub fn err_print(self) -> Self {
        // A closed stderr leaves nothing to report to
        let _ = self.err_print_to(&mut io::stderr().lock());
        self
    }

    /// Print the errors and fail with a single aggregate error
    pub fn err_throw(self) -> Result<Self, ConfigError> {
        if self.errors.is_empty() {
            return Ok(self);
        }
        let count = self.errors.len();
        self.err_print();
        Err(ConfigError::Validation { count })
    }

    /// Print the errors and terminate the process with `exit_code`
    pub fn err_exit(self, exit_code: i32) -> Self {
        if !self.errors.is_empty() {
            self.err_print();
            std::process::exit(exit_code);
        }
        self
    }
}

impl fmt::Debug for EnvResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvResult")
            .field("env", &self.env)
            .field("errors", &self.errors)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{process::MockEnv, value::env_map};
    use serde_json::json;

    fn result(env: Value, errors: Vec<VariableError>, process: Arc<MockEnv>) -> EnvResult {
        EnvResult::new(env_map(env).unwrap(), errors, process)
    }

    fn port_error() -> VariableError {
        VariableError::new("PORT", vec!["port".to_string()], json!("true"))
    }

    #[test]
    fn test_overwrite_env() {
        let res = result(json!({"A": 1, "B": 2}), vec![], Arc::new(MockEnv::new()))
            .overwrite_env(env_map(json!({"B": 0, "C": "x"})).unwrap());

        assert_eq!(res.get("A"), Some(&json!(1)));
        assert_eq!(res.get("B"), Some(&json!(0)));
        assert_eq!(res.get("C"), Some(&json!("x")));
    }

    #[test]
    fn test_set_missing_env_uses_truthiness() {
        let res = result(
            json!({"ZERO": 0, "EMPTY": "", "FALSE": false, "NULL": null, "SET": "x", "LIST": []}),
            vec![],
            Arc::new(MockEnv::new()),
        )
        .set_missing_env(
            env_map(json!({
                "ZERO": 1, "EMPTY": "e", "FALSE": true, "NULL": "n",
                "SET": "y", "LIST": [1], "NEW": 5
            }))
            .unwrap(),
        );

        assert_eq!(res.get("ZERO"), Some(&json!(1)));
        assert_eq!(res.get("EMPTY"), Some(&json!("e")));
        assert_eq!(res.get("FALSE"), Some(&json!(true)));
        assert_eq!(res.get("NULL"), Some(&json!("n")));
        assert_eq!(res.get("SET"), Some(&json!("x")));
        assert_eq!(res.get("LIST"), Some(&json!([])));
        assert_eq!(res.get("NEW"), Some(&json!(5)));
    }

    #[test]
    fn test_set_process_env() {
        let process = Arc::new(MockEnv::new());
        result(json!({"PORT": 443, "VERBOSE": true}), vec![], process.clone()).set_process_env();

        assert_eq!(process.get("PORT").as_deref(), Some("443"));
        assert_eq!(process.get("VERBOSE").as_deref(), Some("true"));
    }

    #[test]
    fn test_clear_process_env_equal_values_only() {
        let process = Arc::new(MockEnv::from_pairs([("PORT", "443"), ("HOST", "changed")]));
        result(json!({"PORT": 443, "HOST": "localhost"}), vec![], process.clone())
            .clear_process_env(true);

        assert_eq!(process.get("PORT"), None);
        assert_eq!(process.get("HOST").as_deref(), Some("changed"));
    }

    #[test]
    fn test_clear_process_env_all() {
        let process = Arc::new(MockEnv::from_pairs([
            ("PORT", "443"),
            ("HOST", "changed"),
            ("OTHER", "kept"),
        ]));
        result(json!({"PORT": 443, "HOST": "localhost"}), vec![], process.clone())
            .clear_process_env(false);

        assert_eq!(process.get("PORT"), None);
        assert_eq!(process.get("HOST"), None);
        assert_eq!(process.get("OTHER").as_deref(), Some("kept"));
    }

    #[test]
    fn test_err_print_to_format() {
        colored::control::set_override(false);

        let res = result(json!({}), vec![port_error()], Arc::new(MockEnv::new()));
        let mut out = Vec::new();
        res.err_print_to(&mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Environment Errors:\n\
             ########## [ PORT ]:\n\
             environment variable 'PORT' is not type of 'port'\n"
        );
    }

    #[test]
    fn test_err_print_to_without_errors() {
        let res = result(json!({}), vec![], Arc::new(MockEnv::new()));
        let mut out = Vec::new();
        res.err_print_to(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_err_throw() {
        let ok = result(json!({"A": 1}), vec![], Arc::new(MockEnv::new())).err_throw();
        assert!(ok.is_ok());

        let err = result(json!({}), vec![port_error()], Arc::new(MockEnv::new()))
            .err_throw()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { count: 1 }));
    }

    #[test]
    fn test_err_exit_returns_without_errors() {
        let res = result(json!({"A": 1}), vec![], Arc::new(MockEnv::new())).err_exit(3);
        assert_eq!(res.get("A"), Some(&json!(1)));
    }

    #[test]
    fn test_extract() {
        let res = result(
            json!({"PORT": 8080, "HOST": "localhost", "DNS": ["1.1.1.1"]}),
            vec![],
            Arc::new(MockEnv::new()),
        );
        assert_eq!(res.extract::<u16>("PORT").unwrap(), 8080);
        assert_eq!(res.extract::<String>("HOST").unwrap(), "localhost");
        assert_eq!(res.extract::<Vec<String>>("DNS").unwrap(), vec!["1.1.1.1"]);
        assert_eq!(res.extract::<Option<String>>("MISSING").unwrap(), None);
        assert!(res.extract::<u16>("HOST").is_err());
    }

    #[test]
    fn test_into_parts() {
        let (env, errors) =
            result(json!({"A": 1}), vec![port_error()], Arc::new(MockEnv::new())).into_parts();
        assert_eq!(env.len(), 1);
        assert_eq!(errors.len(), 1);
    }
}
