use crate::{
    error::ConfigError,
    value::{EnvMap, kind_name, to_env_string},
};
use serde_json::Value;
use std::path::PathBuf;

/// Conversion from a resolved value into a Rust type
///
/// Resolution already checked the value against its declared types, so this
/// only bridges the JSON representation to the field type.
pub trait FromValue: Sized {
    fn from_value(key: &str, value: &Value) -> Result<Self, ConfigError>;
}

fn mismatch(key: &str, expected: &str, value: &Value) -> ConfigError {
    ConfigError::Conversion {
        key: key.to_string(),
        expected: expected.to_string(),
        value: match value {
            Value::Null => kind_name(value).to_string(),
            _ => to_env_string(value),
        },
    }
}

impl FromValue for Value {
    fn from_value(_key: &str, value: &Value) -> Result<Self, ConfigError> {
        Ok(value.clone())
    }
}

impl FromValue for String {
    fn from_value(key: &str, value: &Value) -> Result<Self, ConfigError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch(key, "string", value))
    }
}

impl FromValue for bool {
    fn from_value(key: &str, value: &Value) -> Result<Self, ConfigError> {
        value.as_bool().ok_or_else(|| mismatch(key, "boolean", value))
    }
}

impl FromValue for f64 {
    fn from_value(key: &str, value: &Value) -> Result<Self, ConfigError> {
        value.as_f64().ok_or_else(|| mismatch(key, "number", value))
    }
}

impl FromValue for PathBuf {
    fn from_value(key: &str, value: &Value) -> Result<Self, ConfigError> {
        value
            .as_str()
            .map(PathBuf::from)
            .ok_or_else(|| mismatch(key, "path", value))
    }
}

impl FromValue for EnvMap {
    fn from_value(key: &str, value: &Value) -> Result<Self, ConfigError> {
        value
            .as_object()
            .cloned()
            .ok_or_else(|| mismatch(key, "object", value))
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(key: &str, value: &Value) -> Result<Self, ConfigError> {
                    let expected = stringify!($ty);
                    let whole = value
                        .as_i64()
                        .map(i128::from)
                        .or_else(|| value.as_u64().map(i128::from))
                        .or_else(|| {
                            value
                                .as_f64()
                                .filter(|f| f.fract() == 0.0)
                                .map(|f| f as i128)
                        })
                        .ok_or_else(|| mismatch(key, expected, value))?;
                    <$ty>::try_from(whole).map_err(|_| mismatch(key, expected, value))
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(key: &str, value: &Value) -> Result<Self, ConfigError> {
        match value {
            Value::Null => Ok(None),
            _ => T::from_value(key, value).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(key: &str, value: &Value) -> Result<Self, ConfigError> {
        value
            .as_array()
            .ok_or_else(|| mismatch(key, "array", value))?
            .iter()
            .map(|item| T::from_value(key, item))
            .collect()
    }
}
