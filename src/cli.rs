use serde_json::json;
use std::sync::Arc;
use typenv::{
    Builtin, EnvironmentParser, Load, MockEnv, Registry, ResolveOptions, Resolver, Value,
    VariableTypes, define_env, env_map, parse_value,
};

define_env!(
    #[derive(Debug)]
    pub struct WorkingEnv {
        #[var(env = "TEST_HOST", types("string"), default = "localhost")]
        pub host: String,

        #[var(env = "TEST_PORT", types("port"), default = 8080u16)]
        pub port: u16,

        #[var(env = "TEST_VERBOSE", types("boolean"), default = false)]
        pub verbose: bool,

        #[var(env = "TEST_DNS", types("json:array", "csv:array"))]
        pub dns: Option<Vec<String>>,
    }
);

define_env!(
    #[derive(Debug)]
    pub struct ErrorEnv {
        #[var(env = "ERROR_TEST_SECRET", types("string"), required)]
        pub secret: String,

        #[var(env = "TEST_WRONG_TYPE", types("port"), default = 42u16)]
        pub wrong_type: u16,
    }
);

fn main() {
    dotenvy::from_filename("./test.env").ok();
    match std::env::args().nth(1) {
        Some(arg) => match arg.as_str() {
            "default" => load_working(),
            "error" => load_error(),
            "error_result" => load_error_result(),
            "check" => check_values(),
            "strict" => check_strict(),
            "require" => require_secret(),
            "docs" => generate_docs(),
            "declarations" => show_declarations(),
            _ => println!(
                "unknown arg: {}. Available: default, error, error_result, check, strict, require, docs, declarations",
                arg
            ),
        },
        None => {
            println!("Usage: typenv-cli [command]");
            println!("Commands:");
            println!("  default      - Load an environment with defaults");
            println!("  error        - Load an environment with errors and exit");
            println!("  error_result - Load an environment with errors and print them");
            println!("  check        - Resolve a few values without touching the process");
            println!("  strict       - Resolve an invalid value and exit with code 3");
            println!("  require      - Parse with a missing required variable and exit");
            println!("  docs         - Generate ENVIRONMENT.md documentation");
            println!("  declarations - Show declared variables");
        }
    };
}

fn load_working() {
    let env = WorkingEnv::load();
    println!("Environment loaded successfully!");
    println!("  host: {}", env.host);
    println!("  port: {}", env.port);
    println!("  verbose: {}", env.verbose);
    println!("  dns: {:?}", env.dns);
}

fn load_error() {
    let _env = ErrorEnv::load();
    println!("you should not see this");
}

fn load_error_result() {
    match ErrorEnv::load_or_error() {
        Ok(env) => println!("Environment loaded successfully: {:?}", env),
        Err(errors) => {
            eprintln!("Failed to load environment:");
            for error in errors {
                eprintln!("\t- {}", error);
            }
        }
    }
    println!("all done");
}

fn check_values() {
    let registry = Registry::new();
    let process = Arc::new(MockEnv::new());
    let types = VariableTypes::new()
        .with("VERBOSE", ["boolean"])
        .with("PORT", ["port"])
        .with("TIMEOUT", ["calculation"]);
    let options = ResolveOptions {
        load_process_env: false,
        ..ResolveOptions::default()
    };

    let defaults = match env_map(json!({
        "VERBOSE": "false",
        "PORT": "true",
        "TIMEOUT": "60 * 5",
    })) {
        Ok(defaults) => defaults,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };

    match Resolver::new(&registry, process)
        .with_options(options)
        .parse_env(defaults, &types)
    {
        Ok(result) => {
            let result = result.err_print();
            for (key, value) in result.env() {
                println!("  {}: {}", key, value);
            }
        }
        Err(e) => eprintln!("{}", e),
    }

    match parse_value(&Value::from("{\"a\":1}"), &[Builtin::JsonObject.into()]) {
        Ok(Some(value)) => println!("  json:object -> {}", value),
        Ok(None) => println!("  json:object -> no match"),
        Err(e) => eprintln!("{}", e),
    }
}

fn check_strict() {
    let registry = Registry::new();
    let types = VariableTypes::new()
        .with("VERBOSE", ["boolean"])
        .with("PORT", ["port"]);
    let defaults = match env_map(json!({"VERBOSE": true, "PORT": "true"})) {
        Ok(defaults) => defaults,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };

    match Resolver::new(&registry, Arc::new(MockEnv::new())).parse_env(defaults, &types) {
        Ok(result) => {
            result.err_exit(3);
            println!("you should not see this");
        }
        Err(e) => eprintln!("{}", e),
    }
}

fn require_secret() {
    let mut parser = EnvironmentParser::new().with_process_env(Arc::new(MockEnv::new()));
    parser.define("PORT", ["port"]).require("SECRET", ["string"]);

    match parser.parse_env(typenv::EnvMap::new(), &[]) {
        Ok(_) => println!("you should not see this"),
        Err(failure) => failure.exe(),
    }
}

fn generate_docs() {
    println!("Generating documentation for WorkingEnv...");
    let parser = WorkingEnv::parser();
    match parser.write_docs("ENVIRONMENT.md") {
        Ok(_) => println!("✓ Documentation written to ENVIRONMENT.md"),
        Err(e) => eprintln!("✗ Failed to write documentation: {}", e),
    }

    println!("\nGenerating documentation for ErrorEnv...");
    let parser = ErrorEnv::parser();
    match parser.write_docs("ERROR_ENVIRONMENT.md") {
        Ok(_) => println!("✓ Documentation written to ERROR_ENVIRONMENT.md"),
        Err(e) => eprintln!("✗ Failed to write documentation: {}", e),
    }
}

fn show_declarations() {
    let parser: EnvironmentParser = WorkingEnv::parser();
    println!("WorkingEnv declarations:");
    for declaration in parser.declarations() {
        println!("  {}:", declaration.key);
        println!("    types: {}", declaration.type_list());
        println!("    required: {}", declaration.required);
    }
}
