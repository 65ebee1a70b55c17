use crate::{
    declaration::Declaration,
    error::{ConfigError, format_errors},
    path::FileSystem,
    process::{ProcessEnv, StdEnv},
    registry::Registry,
    resolve::{ResolveOptions, Resolver, VariableTypes},
    result::EnvResult,
    value::{EnvMap, to_env_string},
};
use serde_json::Value;
use std::{fmt, fs, path::Path, slice, sync::Arc};

/// Reads a dotenv file into a value source for [`EnvironmentParser::parse_env`]
///
/// Unlike `dotenvy::from_path` this does not touch the process environment.
pub fn dotenv_source(path: impl AsRef<Path>) -> Result<EnvMap, ConfigError> {
    let path = path.as_ref();
    let to_error = |e: dotenvy::Error| ConfigError::Dotenv {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut source = EnvMap::new();
    for item in dotenvy::from_path_iter(path).map_err(to_error)? {
        let (key, value) = item.map_err(to_error)?;
        source.insert(key, Value::String(value));
    }
    Ok(source)
}

/// Configuration-level failure of [`EnvironmentParser::parse_env`]
///
/// Inspect it through [`EnvFailure::error`], or call [`EnvFailure::exe`] to
/// report it and end the process.
#[derive(Debug)]
pub struct EnvFailure {
    err: ConfigError,
}

impl EnvFailure {
    pub fn error(&self) -> &ConfigError {
        &self.err
    }

    pub fn into_error(self) -> ConfigError {
        self.err
    }

    /// Print the failure to stderr and exit with status 1
    pub fn exe(&self) -> ! {
        eprintln!("{}", format_errors(slice::from_ref(&self.err)));
        std::process::exit(1)
    }
}

impl From<ConfigError> for EnvFailure {
    fn from(err: ConfigError) -> Self {
        Self { err }
    }
}

impl fmt::Display for EnvFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.err.fmt(f)
    }
}

impl std::error::Error for EnvFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.err)
    }
}

/// Declarative builder collecting variable declarations before resolution
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use serde_json::json;
/// use typenv::{EnvironmentParser, MockEnv, env_map};
///
/// let mut parser = EnvironmentParser::new().with_process_env(Arc::new(MockEnv::new()));
/// parser
///     .define("PORT", ["port"])
///     .require("SECRET", ["string"]);
///
/// let defaults = env_map(json!({"PORT": 8080, "SECRET": "hunter2"})).unwrap();
/// let env = match parser.parse_env(defaults, &[]) {
///     Ok(result) => result.into_env(),
///     Err(failure) => failure.exe(),
/// };
/// assert_eq!(env["PORT"], json!(8080));
/// ```
pub struct EnvironmentParser {
    registry: Registry,
    declarations: Vec<Declaration>,
    defaults: EnvMap,
    process: Arc<dyn ProcessEnv>,
    options: ResolveOptions,
}

/// Alternative name for [`EnvironmentParser`]
pub type Environment = EnvironmentParser;

impl EnvironmentParser {
    /// Create a parser over the real process environment
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            declarations: Vec::new(),
            defaults: EnvMap::new(),
            process: Arc::new(StdEnv),
            options: ResolveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_process_env(mut self, process: Arc<dyn ProcessEnv>) -> Self {
        self.process = process;
        self
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.registry = self.registry.with_file_system(fs);
        self
    }

    fn declare(&mut self, declaration: Declaration) -> &mut Self {
        match self
            .declarations
            .iter_mut()
            .find(|d| d.key == declaration.key)
        {
            Some(existing) => *existing = declaration,
            None => self.declarations.push(declaration),
        }
        self
    }

    /// Declare an optional variable, replacing any earlier declaration of `key`
    pub fn define<I, S>(&mut self, key: impl Into<String>, types: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declare(Declaration::optional(key, types))
    }

    /// Declare a variable that must resolve for parsing to succeed
    pub fn require<I, S>(&mut self, key: impl Into<String>, types: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declare(Declaration::required(key, types))
    }

    pub fn undefine(&mut self, key: &str) -> &mut Self {
        self.declarations.retain(|d| d.key != key);
        self
    }

    /// Register a type checked before the built-ins
    pub fn define_custom_type<F>(&mut self, name: impl Into<String>, check: F) -> &mut Self
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.registry.define(name, check);
        self
    }

    /// Register a type matching strings against `pattern`
    pub fn define_custom_regex_type(
        &mut self,
        name: impl Into<String>,
        pattern: &str,
    ) -> Result<&mut Self, ConfigError> {
        self.registry.define_regex(name, pattern)?;
        Ok(self)
    }

    /// Fallback value used when no other source has one
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// First non-null value for `key` across the supplied mappings
    fn supplied<'a>(&'a self, key: &str, defaults: &'a EnvMap, sources: &'a [EnvMap]) -> Option<&'a Value> {
        std::iter::once(defaults)
            .chain(sources)
            .chain(std::iter::once(&self.defaults))
            .filter_map(|source| source.get(key))
            .find(|value| !value.is_null())
    }

    /// Resolve every declared variable
    ///
    /// `defaults` is consulted first, then each of `sources` in order and
    /// finally the values given to [`EnvironmentParser::set_default`]; the
    /// first non-null value wins. The process environment is layered on top
    /// as configured by [`ResolveOptions`]. Only declared keys end up in the
    /// result.
    ///
    /// A variable without any value is checked as `null`, so types such as
    /// `null` or `any` still resolve it. Unknown types and required variables
    /// that are missing or invalid fail the whole call. Optional variables
    /// that no type accepts are skipped when they have no value and collected
    /// as errors on the returned [`EnvResult`] when they have a bad one.
    pub fn parse_env(self, defaults: EnvMap, sources: &[EnvMap]) -> Result<EnvResult, EnvFailure> {
        let resolver =
            Resolver::new(&self.registry, Arc::clone(&self.process)).with_options(self.options);

        let types: VariableTypes = self
            .declarations
            .iter()
            .map(|d| (d.key.clone(), d.types.clone()))
            .collect();
        let declared = resolver.lookup_all(&types)?;

        let mut env = EnvMap::new();
        let mut errors = Vec::new();
        for ((key, names, checkers), declaration) in declared.iter().zip(&self.declarations) {
            let supplied = self.supplied(key, &defaults, sources);
            let raw = match resolver.raw_value(key, supplied) {
                Some(raw) => raw,
                // No value anywhere: only types accepting null can still match
                None => match resolver.parse_value(&Value::Null, checkers)? {
                    Some(_) => Value::Null,
                    None if declaration.required => {
                        return Err(ConfigError::MissingRequired {
                            key: key.clone(),
                            types: names.clone(),
                        }
                        .into());
                    }
                    None => {
                        log::debug!("skipping {key}: no value and not required");
                        continue;
                    }
                },
            };

            if let Some(value) = supplied {
                env.insert(key.clone(), value.clone());
            }
            if let Some(error) = resolver.resolve_key(&mut env, key, names, checkers, Some(raw))? {
                if declaration.required {
                    return Err(ConfigError::InvalidRequired {
                        key: error.key,
                        value: to_env_string(&error.value),
                        types: error.types,
                    }
                    .into());
                }
                errors.push(error);
            }
        }

        log::debug!(
            "resolved {} of {} declared variables, {} error(s)",
            env.len(),
            self.declarations.len(),
            errors.len()
        );
        Ok(EnvResult::new(env, errors, self.process))
    }

    /// Write a markdown table describing every declaration
    ///
    /// # Example
    /// ```no_run
    /// use typenv::EnvironmentParser;
    ///
    /// let mut parser = EnvironmentParser::new();
    /// parser.define("PORT", ["port"]).set_default("PORT", 8080);
    /// parser.write_docs("CONFIG.md").unwrap();
    /// ```
    pub fn write_docs(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        fs::write(path, self.docs_markdown())
    }

    pub fn docs_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str("## Environment Variables Summary\n\n");
        md.push_str("| Variable | Required | Types | Default |\n");
        md.push_str("|----------|----------|-------|---------|\n");
        for declaration in &self.declarations {
            let required_str = if declaration.required { "Yes" } else { "No" };
            let default_display = match self.defaults.get(&declaration.key) {
                Some(value) => format!("`{}`", to_env_string(value)),
                None => "-".to_string(),
            };
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                declaration.key,
                required_str,
                declaration.types.join(", "),
                default_display
            ));
        }
        md
    }
}

impl Default for EnvironmentParser {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EnvironmentParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentParser")
            .field("declarations", &self.declarations)
            .field("defaults", &self.defaults)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
