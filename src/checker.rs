use crate::{
    calc,
    error::ConfigError,
    path::{FileSystem, PathMode, check_path},
    value::number_value,
};
use regex::Regex;
use serde_json::Value;
use std::{fmt, sync::Arc, sync::OnceLock};
use url::Url;

/// Signature of a user supplied checker: `None` means "not this type"
pub type CheckFn = dyn Fn(&Value) -> Option<Value> + Send + Sync;

/// Outcome of a single check: `Ok(None)` is an ordinary mismatch,
/// `Err` is reserved for fatal problems such as filesystem failures
pub type CheckResult = Result<Option<Value>, ConfigError>;

const EMAIL_PATTERN: &str = r#"^(([^<>()\[\]\\.,:\s@"]+(\.[^<>()\[\]\\.,:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is valid"))
}

/// The types every registry knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    String,
    StringEmpty,
    StringAnd,
    Boolean,
    Number,
    Port,
    Calculation,
    Json,
    JsonObject,
    JsonArray,
    JsonValue,
    Object,
    Array,
    CsvArray,
    Null,
    NullValue,
    Email,
    Url,
    UrlHttp,
    Path,
    PathDir,
    PathFile,
    PathExist,
    PathNotExist,
    Any,
}

impl Builtin {
    pub const ALL: [Builtin; 25] = [
        Builtin::String,
        Builtin::StringEmpty,
        Builtin::StringAnd,
        Builtin::Boolean,
        Builtin::Number,
        Builtin::Port,
        Builtin::Calculation,
        Builtin::Json,
        Builtin::JsonObject,
        Builtin::JsonArray,
        Builtin::JsonValue,
        Builtin::Object,
        Builtin::Array,
        Builtin::CsvArray,
        Builtin::Null,
        Builtin::NullValue,
        Builtin::Email,
        Builtin::Url,
        Builtin::UrlHttp,
        Builtin::Path,
        Builtin::PathDir,
        Builtin::PathFile,
        Builtin::PathExist,
        Builtin::PathNotExist,
        Builtin::Any,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::String => "string",
            Builtin::StringEmpty => "string:empty",
            Builtin::StringAnd => "string:and",
            Builtin::Boolean => "boolean",
            Builtin::Number => "number",
            Builtin::Port => "port",
            Builtin::Calculation => "calculation",
            Builtin::Json => "json",
            Builtin::JsonObject => "json:object",
            Builtin::JsonArray => "json:array",
            Builtin::JsonValue => "json:value",
            Builtin::Object => "object",
            Builtin::Array => "array",
            Builtin::CsvArray => "csv:array",
            Builtin::Null => "null",
            Builtin::NullValue => "null:value",
            Builtin::Email => "email",
            Builtin::Url => "url",
            Builtin::UrlHttp => "url:http",
            Builtin::Path => "path",
            Builtin::PathDir => "path:dir",
            Builtin::PathFile => "path:file",
            Builtin::PathExist => "path:exist",
            Builtin::PathNotExist => "path:notexist",
            Builtin::Any => "any",
        }
    }

    pub fn from_name(name: &str) -> Option<Builtin> {
        Builtin::ALL.into_iter().find(|b| b.name() == name)
    }

    pub fn check(self, value: &Value, fs: &dyn FileSystem) -> CheckResult {
        let checked = match self {
            Builtin::String => match value {
                Value::String(s) if !s.is_empty() => Some(value.clone()),
                _ => None,
            },
            Builtin::StringEmpty | Builtin::StringAnd => value.is_string().then(|| value.clone()),
            Builtin::Boolean => check_boolean(value),
            Builtin::Number => check_number(value),
            Builtin::Port => check_number(value).filter(|n| {
                n.as_f64()
                    .is_some_and(|f| f.fract() == 0.0 && (0.0..=65535.0).contains(&f))
            }),
            Builtin::Calculation => check_number(value).or_else(|| check_calculation(value)),
            Builtin::Json => match value {
                Value::String(s) => serde_json::from_str(s).ok(),
                _ => None,
            },
            Builtin::JsonObject => decode_json(value).filter(Value::is_object),
            Builtin::JsonArray => decode_json(value).filter(Value::is_array),
            Builtin::JsonValue => decode_json(value).filter(|v| !v.is_object() && !v.is_array()),
            Builtin::Object => value.is_object().then(|| value.clone()),
            Builtin::Array => value.is_array().then(|| value.clone()),
            Builtin::CsvArray => check_csv(value),
            Builtin::Null | Builtin::NullValue => check_null(value),
            Builtin::Email => match value {
                Value::String(s) if email_regex().is_match(s) => Some(value.clone()),
                _ => None,
            },
            Builtin::Url => check_url(value, false),
            Builtin::UrlHttp => check_url(value, true),
            Builtin::Path => return check_path(value, PathMode::Any, fs),
            Builtin::PathDir => return check_path(value, PathMode::Dir, fs),
            Builtin::PathFile => return check_path(value, PathMode::File, fs),
            Builtin::PathExist => return check_path(value, PathMode::Exist, fs),
            Builtin::PathNotExist => return check_path(value, PathMode::NotExist, fs),
            Builtin::Any => Some(value.clone()),
        };
        Ok(checked)
    }
}

fn check_boolean(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(_) => Some(value.clone()),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
        _ => None,
    }
}

fn check_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(n) = parse_radix(s) {
        return Some(Value::from(n));
    }
    if let Ok(n) = s.parse::<i64>() {
        return Some(Value::from(n));
    }
    if let Ok(n) = s.parse::<u64>() {
        return Some(Value::from(n));
    }
    // f64 parsing also accepts "inf" and "NaN", which number_value drops
    s.parse::<f64>().ok().and_then(number_value)
}

/// Unsigned `0x`, `0o` and `0b` literals, prefix in either case
fn parse_radix(s: &str) -> Option<u64> {
    let radix = match s.get(..2)? {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };
    let digits = s.get(2..)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}

fn check_calculation(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) if s.chars().all(calc::is_expression_char) => {
            calc::evaluate(s).and_then(number_value)
        }
        _ => None,
    }
}

/// Decodes strings as JSON when possible, passes other values through
fn decode_json(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => Some(serde_json::from_str(s).unwrap_or_else(|_| value.clone())),
        _ => Some(value.clone()),
    }
}

fn check_csv(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(Value::Array(
            s.split(',')
                .map(|item| Value::String(item.trim().to_string()))
                .collect(),
        )),
        _ => None,
    }
}

fn check_null(value: &Value) -> Option<Value> {
    match value {
        Value::Null => Some(Value::Null),
        Value::String(s) if s.eq_ignore_ascii_case("null") => Some(Value::Null),
        _ => None,
    }
}

fn check_url(value: &Value, http_only: bool) -> Option<Value> {
    let Value::String(s) = value else {
        return None;
    };
    let url = Url::parse(s).ok()?;
    if http_only && !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    Some(Value::String(url.to_string()))
}

/// A named checker: a built-in, a user function or a regex
#[derive(Clone)]
pub enum TypeChecker {
    Builtin(Builtin),
    Custom { name: String, check: Arc<CheckFn> },
    Regex { name: String, pattern: Regex },
}

impl TypeChecker {
    pub fn custom<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    {
        TypeChecker::Custom {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// Wraps `pattern` into a checker matching strings only
    pub fn regex(name: impl Into<String>, pattern: &str) -> Result<Self, ConfigError> {
        let name = name.into();
        match Regex::new(pattern) {
            Ok(pattern) => Ok(TypeChecker::Regex { name, pattern }),
            Err(e) => Err(ConfigError::InvalidPattern {
                name,
                message: e.to_string(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypeChecker::Builtin(builtin) => builtin.name(),
            TypeChecker::Custom { name, .. } | TypeChecker::Regex { name, .. } => name,
        }
    }

    pub fn check(&self, value: &Value, fs: &dyn FileSystem) -> CheckResult {
        match self {
            TypeChecker::Builtin(builtin) => builtin.check(value, fs),
            TypeChecker::Custom { check, .. } => Ok(check(value)),
            TypeChecker::Regex { pattern, .. } => Ok(match value {
                Value::String(s) if pattern.is_match(s) => Some(value.clone()),
                _ => None,
            }),
        }
    }
}

impl fmt::Debug for TypeChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeChecker::Builtin(builtin) => f.debug_tuple("Builtin").field(builtin).finish(),
            TypeChecker::Custom { name, .. } => {
                f.debug_struct("Custom").field("name", name).finish_non_exhaustive()
            }
            TypeChecker::Regex { name, pattern } => f
                .debug_struct("Regex")
                .field("name", name)
                .field("pattern", &pattern.as_str())
                .finish(),
        }
    }
}

impl From<Builtin> for TypeChecker {
    fn from(builtin: Builtin) -> Self {
        TypeChecker::Builtin(builtin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::StdFileSystem;
    use serde_json::json;

    fn check(builtin: Builtin, value: Value) -> Option<Value> {
        builtin.check(&value, &StdFileSystem).unwrap()
    }

    #[test]
    fn test_names_roundtrip() {
        for builtin in Builtin::ALL {
            assert_eq!(Builtin::from_name(builtin.name()), Some(builtin));
        }
        assert_eq!(Builtin::from_name("prot"), None);
    }

    #[test]
    fn test_string() {
        assert_eq!(check(Builtin::String, json!("abc")), Some(json!("abc")));
        assert_eq!(check(Builtin::String, json!("")), None);
        assert_eq!(check(Builtin::String, json!(1)), None);
        assert_eq!(check(Builtin::String, Value::Null), None);
    }

    #[test]
    fn test_string_empty() {
        assert_eq!(check(Builtin::StringEmpty, json!("")), Some(json!("")));
        assert_eq!(check(Builtin::StringAnd, json!("x")), Some(json!("x")));
        assert_eq!(check(Builtin::StringEmpty, json!(false)), None);
    }

    #[test]
    fn test_boolean() {
        assert_eq!(check(Builtin::Boolean, json!(true)), Some(json!(true)));
        assert_eq!(check(Builtin::Boolean, json!(false)), Some(json!(false)));
        assert_eq!(check(Builtin::Boolean, json!("TRUE")), Some(json!(true)));
        assert_eq!(check(Builtin::Boolean, json!("true")), Some(json!(true)));
        assert_eq!(check(Builtin::Boolean, json!("False")), Some(json!(false)));
        assert_eq!(check(Builtin::Boolean, json!("false")), Some(json!(false)));
        assert_eq!(check(Builtin::Boolean, json!("123")), None);
        assert_eq!(check(Builtin::Boolean, json!(1)), None);
    }

    #[test]
    fn test_number() {
        assert_eq!(check(Builtin::Number, json!(80)), Some(json!(80)));
        assert_eq!(check(Builtin::Number, json!("54321")), Some(json!(54321)));
        assert_eq!(check(Builtin::Number, json!(" 12 ")), Some(json!(12)));
        assert_eq!(check(Builtin::Number, json!("-1.5")), Some(json!(-1.5)));
        assert_eq!(check(Builtin::Number, json!("1e3")), Some(json!(1000)));
        assert_eq!(check(Builtin::Number, json!("NaN")), None);
        assert_eq!(check(Builtin::Number, json!("inf")), None);
        assert_eq!(check(Builtin::Number, json!("")), None);
        assert_eq!(check(Builtin::Number, json!("12px")), None);
        assert_eq!(check(Builtin::Number, json!(true)), None);
    }

    #[test]
    fn test_number_radix_literals() {
        assert_eq!(check(Builtin::Number, json!("0x1F")), Some(json!(31)));
        assert_eq!(check(Builtin::Number, json!("0o17")), Some(json!(15)));
        assert_eq!(check(Builtin::Number, json!("0B101")), Some(json!(5)));
        assert_eq!(check(Builtin::Port, json!("0x50")), Some(json!(80)));
        assert_eq!(check(Builtin::Number, json!("0x")), None);
        assert_eq!(check(Builtin::Number, json!("0x+1")), None);
        assert_eq!(check(Builtin::Number, json!("0b2")), None);
        assert_eq!(check(Builtin::Number, json!("-0x10")), None);
    }

    #[test]
    fn test_port_bounds() {
        assert_eq!(check(Builtin::Port, json!(0)), Some(json!(0)));
        assert_eq!(check(Builtin::Port, json!(65535)), Some(json!(65535)));
        assert_eq!(check(Builtin::Port, json!("443")), Some(json!(443)));
        assert_eq!(check(Builtin::Port, json!(-1)), None);
        assert_eq!(check(Builtin::Port, json!(65536)), None);
        assert_eq!(check(Builtin::Port, json!("65536")), None);
        assert_eq!(check(Builtin::Port, json!(80.5)), None);
        assert_eq!(check(Builtin::Port, json!("true")), None);
    }

    #[test]
    fn test_calculation() {
        assert_eq!(check(Builtin::Calculation, json!(5)), Some(json!(5)));
        assert_eq!(check(Builtin::Calculation, json!("5")), Some(json!(5)));
        assert_eq!(
            check(Builtin::Calculation, json!("60 * 60 * 24")),
            Some(json!(86400))
        );
        assert_eq!(check(Builtin::Calculation, json!("1/4")), Some(json!(0.25)));
        assert_eq!(check(Builtin::Calculation, json!("1/0")), None);
        assert_eq!(check(Builtin::Calculation, json!("alert(1)")), None);
    }

    #[test]
    fn test_json() {
        assert_eq!(check(Builtin::Json, json!("{}")), Some(json!({})));
        assert_eq!(check(Builtin::Json, json!("[1,2]")), Some(json!([1, 2])));
        assert_eq!(check(Builtin::Json, json!("null")), Some(Value::Null));
        assert_eq!(check(Builtin::Json, json!("{")), None);
        assert_eq!(check(Builtin::Json, json!({})), None);
    }

    #[test]
    fn test_json_object() {
        assert_eq!(check(Builtin::JsonObject, json!("{}")), Some(json!({})));
        assert_eq!(
            check(Builtin::JsonObject, json!(r#"{"a":1}"#)),
            Some(json!({"a": 1}))
        );
        assert_eq!(check(Builtin::JsonObject, json!("[]")), None);
        assert_eq!(check(Builtin::JsonObject, json!("null")), None);
        assert_eq!(check(Builtin::JsonObject, json!("not json")), None);
    }

    #[test]
    fn test_json_array() {
        assert_eq!(check(Builtin::JsonArray, json!("[]")), Some(json!([])));
        assert_eq!(check(Builtin::JsonArray, json!(["a"])), Some(json!(["a"])));
        assert_eq!(check(Builtin::JsonArray, json!("{}")), None);
        assert_eq!(check(Builtin::JsonArray, json!("a,b")), None);
    }

    #[test]
    fn test_json_value() {
        assert_eq!(check(Builtin::JsonValue, json!("123")), Some(json!(123)));
        assert_eq!(check(Builtin::JsonValue, json!("false")), Some(json!(false)));
        assert_eq!(check(Builtin::JsonValue, json!("null")), Some(Value::Null));
        assert_eq!(check(Builtin::JsonValue, json!("plain")), Some(json!("plain")));
        assert_eq!(check(Builtin::JsonValue, Value::Null), Some(Value::Null));
        assert_eq!(check(Builtin::JsonValue, json!("[1]")), None);
        assert_eq!(check(Builtin::JsonValue, json!({})), None);
    }

    #[test]
    fn test_object_and_array_do_not_decode() {
        assert_eq!(check(Builtin::Object, json!({"test": []})), Some(json!({"test": []})));
        assert_eq!(check(Builtin::Object, json!("{}")), None);
        assert_eq!(check(Builtin::Object, json!([])), None);
        assert_eq!(check(Builtin::Object, Value::Null), None);

        assert_eq!(check(Builtin::Array, json!([1])), Some(json!([1])));
        assert_eq!(check(Builtin::Array, json!("[1]")), None);
    }

    #[test]
    fn test_csv_array() {
        assert_eq!(
            check(Builtin::CsvArray, json!("1.1.1.1, 8.8.8.8 ,9.9.9.9")),
            Some(json!(["1.1.1.1", "8.8.8.8", "9.9.9.9"]))
        );
        assert_eq!(check(Builtin::CsvArray, json!("single")), Some(json!(["single"])));
        assert_eq!(check(Builtin::CsvArray, json!("  ")), None);
        assert_eq!(check(Builtin::CsvArray, json!(["a"])), None);
    }

    #[test]
    fn test_null() {
        for builtin in [Builtin::Null, Builtin::NullValue] {
            assert_eq!(check(builtin, Value::Null), Some(Value::Null));
            assert_eq!(check(builtin, json!("NULL")), Some(Value::Null));
            assert_eq!(check(builtin, json!("null")), Some(Value::Null));
            assert_eq!(check(builtin, json!("")), None);
            assert_eq!(check(builtin, json!(0)), None);
        }
    }

    #[test]
    fn test_email() {
        for valid in [
            "halsmaulmajo@coreunit.net",
            "halsmaulmajo@gmail.com",
            "majo@coreunit.net",
            "example@example.com",
            "qwer@domain.org",
            "first.last@sub.domain.io",
            "\"quoted name\"@example.com",
            "user@[192.168.0.1]",
        ] {
            assert!(check(Builtin::Email, json!(valid)).is_some(), "{valid}");
        }
        for invalid in [
            "test",
            "w.qöä@p34t8324@ät83ä´4üt8qä@3ßt4",
            "öp3a4@giuz3p.09tgu3ßäö54guäa3c",
            "p-43t9783p.ö4@t73äpt7p",
            "a..b@example.com",
            "user@example.c",
        ] {
            assert!(check(Builtin::Email, json!(invalid)).is_none(), "{invalid}");
        }
    }

    #[test]
    fn test_url() {
        assert_eq!(
            check(Builtin::Url, json!("https://example.com")),
            Some(json!("https://example.com/"))
        );
        assert_eq!(
            check(Builtin::Url, json!("postgres://user@db:5432/app")),
            Some(json!("postgres://user@db:5432/app"))
        );
        assert_eq!(check(Builtin::Url, json!("not a url")), None);
        assert_eq!(check(Builtin::Url, json!("/relative/path")), None);
    }

    #[test]
    fn test_url_http() {
        assert_eq!(
            check(Builtin::UrlHttp, json!("HTTP://Example.com/a")),
            Some(json!("http://example.com/a"))
        );
        assert_eq!(check(Builtin::UrlHttp, json!("ftp://example.com")), None);
        assert_eq!(check(Builtin::UrlHttp, json!(42)), None);
    }

    #[test]
    fn test_any() {
        assert_eq!(check(Builtin::Any, Value::Null), Some(Value::Null));
        assert_eq!(check(Builtin::Any, json!({"a": 1})), Some(json!({"a": 1})));
    }

    #[test]
    fn test_purity() {
        let value = json!("60*2");
        for builtin in Builtin::ALL {
            if builtin.name().starts_with("path") {
                continue;
            }
            assert_eq!(check(builtin, value.clone()), check(builtin, value.clone()));
        }
    }

    #[test]
    fn test_custom_checker() {
        let percent = TypeChecker::custom("percent", |value| {
            let n = value.as_f64()?;
            (0.0..=1.0).contains(&n).then(|| value.clone())
        });
        assert_eq!(percent.name(), "percent");
        assert_eq!(percent.check(&json!(0.5), &StdFileSystem).unwrap(), Some(json!(0.5)));
        assert_eq!(percent.check(&json!(2), &StdFileSystem).unwrap(), None);
    }

    #[test]
    fn test_custom_checker_may_return_null() {
        let nothing = TypeChecker::custom("nothing", |value| {
            (value == "-").then_some(Value::Null)
        });
        assert_eq!(nothing.check(&json!("-"), &StdFileSystem).unwrap(), Some(Value::Null));
        assert_eq!(nothing.check(&json!("x"), &StdFileSystem).unwrap(), None);
    }

    #[test]
    fn test_regex_checker() {
        let semver = TypeChecker::regex("semver", r"^\d+\.\d+\.\d+$").unwrap();
        assert_eq!(semver.name(), "semver");
        assert_eq!(
            semver.check(&json!("1.2.3"), &StdFileSystem).unwrap(),
            Some(json!("1.2.3"))
        );
        assert_eq!(semver.check(&json!("1.2"), &StdFileSystem).unwrap(), None);
        assert_eq!(semver.check(&json!(123), &StdFileSystem).unwrap(), None);
    }

    #[test]
    fn test_regex_checker_invalid_pattern() {
        let err = TypeChecker::regex("broken", "(").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { ref name, .. } if name == "broken"));
    }

    #[test]
    fn test_debug_format() {
        let custom = TypeChecker::custom("two", |_| None);
        assert!(format!("{:?}", custom).contains("two"));
        let builtin = TypeChecker::from(Builtin::Port);
        assert_eq!(format!("{:?}", builtin), "Builtin(Port)");
    }
}
