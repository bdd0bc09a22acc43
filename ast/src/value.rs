use serde::{Deserialize, Serialize};

/// A literal constant as written in the schema, already type checked against
/// its declared type.
///
/// Structured constants (struct and exception literals) are carried as a
/// `Map` whose keys are `String` values naming the fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstValue {
    Integer(i64),
    Double(f64),
    String(String),
    Bool(bool),
    List(Vec<ConstValue>),
    Map(Vec<(ConstValue, ConstValue)>),
}

impl ConstValue {
    pub fn string(s: &str) -> ConstValue {
        ConstValue::String(s.to_owned())
    }

    /// Builds a struct literal from `(field name, value)` pairs.
    pub fn fields<'a, I>(pairs: I) -> ConstValue
    where
        I: IntoIterator<Item = (&'a str, ConstValue)>,
    {
        ConstValue::Map(
            pairs
                .into_iter()
                .map(|(name, value)| (ConstValue::string(name), value))
                .collect(),
        )
    }

    /// Integer view, treating booleans as 0/1.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ConstValue::Integer(i) => Some(*i),
            ConstValue::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ConstValue::Integer(_) => "integer",
            ConstValue::Double(_) => "double",
            ConstValue::String(_) => "string",
            ConstValue::Bool(_) => "bool",
            ConstValue::List(_) => "list",
            ConstValue::Map(_) => "map",
        }
    }
}
