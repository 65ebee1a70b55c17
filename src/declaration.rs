/// A declared variable: its key, accepted types in priority order and
/// whether it must be present
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Declaration {
    /// Environment variable key
    pub key: String,
    /// Type names, the first one that matches wins
    pub types: Vec<String>,
    /// Whether resolution fails outright when this variable cannot be resolved
    pub required: bool,
}

impl Declaration {
    pub fn optional<I, S>(key: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            types: types.into_iter().map(Into::into).collect(),
            required: false,
        }
    }

    pub fn required<I, S>(key: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: true,
            ..Self::optional(key, types)
        }
    }

    /// Type names joined for display, e.g. `json:array | csv:array`
    pub fn type_list(&self) -> String {
        self.types.join(" | ")
    }
}
