pub mod builder;
pub mod calc;
pub mod checker;
pub mod convert;
pub mod declaration;
pub mod error;
pub mod path;
pub mod process;
pub mod registry;
pub mod resolve;
pub mod result;
pub mod value;

// Re-export main types
pub use builder::{EnvFailure, Environment, EnvironmentParser, dotenv_source};
pub use checker::{Builtin, CheckFn, CheckResult, TypeChecker};
pub use convert::FromValue;
pub use declaration::Declaration;
pub use error::{ConfigError, VariableError, format_errors};
pub use path::{FileKind, FileSystem, StdFileSystem};
pub use process::{MockEnv, ProcessEnv, StdEnv};
pub use registry::Registry;
pub use resolve::{ResolveOptions, Resolver, VariableTypes, parse_env, parse_value};
pub use result::EnvResult;
pub use serde_json::Value;
pub use value::{EnvMap, env_map};

// Re-export macro
pub use typenv_macros::define_env;

#[doc(hidden)]
pub mod __private {
    pub use dotenvy;
}

/// Trait for loading a typed environment struct, implemented by `define_env!`
pub trait Load: Sized {
    /// Load from the environment, printing errors and exiting the process on failure
    fn load() -> Self {
        match Self::load_or_error() {
            Ok(loaded) => loaded,
            Err(errors) => {
                eprintln!("{}", format_errors(&errors));
                std::process::exit(1)
            }
        }
    }

    /// Load from the environment, returning every error instead of exiting
    fn load_or_error() -> Result<Self, Vec<ConfigError>>;

    /// The parser holding this struct's declarations and defaults
    fn parser() -> EnvironmentParser;
}
