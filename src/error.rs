use colored::Colorize;
use serde_json::Value;
use std::{fmt, io, path::PathBuf};

/// Fatal errors raised while declaring or resolving the environment
///
/// These are never collected: they surface at the point of detection.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// A declaration references a type name the registry does not know
    UnknownType { key: String, name: String },
    /// A declaration was made without any type names
    EmptyTypeList { key: String },
    /// A required variable has no value in any source
    MissingRequired { key: String, types: Vec<String> },
    /// A required variable has a value that matches none of its types
    InvalidRequired {
        key: String,
        value: String,
        types: Vec<String>,
    },
    /// A value that had to be an object was something else
    NotAnObject { what: String },
    /// A custom regex type was given a pattern that does not compile
    InvalidPattern { name: String, message: String },
    /// A filesystem check failed for a reason other than "not found"
    Filesystem {
        path: PathBuf,
        kind: io::ErrorKind,
        message: String,
    },
    /// A dotenv file could not be read or parsed
    Dotenv { path: PathBuf, message: String },
    /// A resolved value could not be converted into the requested Rust type
    Conversion {
        key: String,
        expected: String,
        value: String,
    },
    /// A collected variable error promoted to a fatal one
    TypeMismatch(VariableError),
    /// Collected variable errors were escalated by `err_throw`
    Validation { count: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownType { key, name } => write!(
                f,
                "{}: Unknown type {}",
                key.magenta().bold(),
                format!("'{}'", name).red()
            ),
            ConfigError::EmptyTypeList { key } => write!(
                f,
                "{}: Declared without any type",
                key.magenta().bold()
            ),
            ConfigError::MissingRequired { key, types } => {
                writeln!(
                    f,
                    "{}: Is missing from environment and is required",
                    key.magenta().bold()
                )?;
                write!(f, "\tTypes: {}", quote_types(types).cyan())
            }
            ConfigError::InvalidRequired { key, value, types } => {
                writeln!(
                    f,
                    "{}: Invalid value {}",
                    key.magenta().bold(),
                    format!("'{}'", value).red(),
                )?;
                write!(f, "\tTypes: {}", quote_types(types).cyan())
            }
            ConfigError::NotAnObject { what } => {
                write!(f, "Expected an object but got {}", what.red())
            }
            ConfigError::InvalidPattern { name, message } => write!(
                f,
                "{}: Invalid pattern: {}",
                name.magenta().bold(),
                message
            ),
            ConfigError::Filesystem {
                path,
                kind,
                message,
            } => write!(
                f,
                "{}: Filesystem check failed ({:?}): {}",
                path.display().to_string().magenta().bold(),
                kind,
                message
            ),
            ConfigError::Dotenv { path, message } => write!(
                f,
                "{}: Could not load dotenv file: {}",
                path.display().to_string().magenta().bold(),
                message
            ),
            ConfigError::Conversion {
                key,
                expected,
                value,
            } => write!(
                f,
                "{}: Value {} is not a valid {}",
                key.magenta().bold(),
                format!("'{}'", value).red(),
                expected.cyan()
            ),
            ConfigError::TypeMismatch(error) => {
                writeln!(
                    f,
                    "{}: Invalid value {}",
                    error.key.magenta().bold(),
                    format!("'{}'", crate::value::to_env_string(&error.value)).red(),
                )?;
                write!(f, "\tTypes: {}", quote_types(&error.types).cyan())
            }
            ConfigError::Validation { count } => write!(
                f,
                "Error in environment variables ({} error(s))",
                count.to_string().yellow().bold()
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ConfigError {
    pub(crate) fn from_io(path: PathBuf, err: &io::Error) -> Self {
        ConfigError::Filesystem {
            path,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// A variable whose value matched none of its declared types
///
/// One of these is collected per failing key, never per failing checker.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableError {
    pub key: String,
    pub types: Vec<String>,
    pub value: Value,
}

impl VariableError {
    pub fn new(key: impl Into<String>, types: Vec<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            types,
            value,
        }
    }

    /// Plain message listing the attempted types in declaration order
    pub fn message(&self) -> String {
        format!(
            "environment variable '{}' is not type of {}",
            self.key,
            quote_types(&self.types)
        )
    }
}

impl fmt::Display for VariableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for VariableError {}

impl From<VariableError> for ConfigError {
    fn from(error: VariableError) -> Self {
        ConfigError::TypeMismatch(error)
    }
}

fn quote_types(types: &[String]) -> String {
    format!("'{}'", types.join("', '"))
}

/// Helper to format multiple configuration errors into a single message
pub fn format_errors(errors: &[ConfigError]) -> String {
    let error_summary = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Configuration failed with {} error(s):\n{}",
        errors.len().to_string().yellow().bold(),
        error_summary
    )
}
