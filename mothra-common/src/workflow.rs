//! Workflow component ABI
//!
//! Every component takes one [`InputDict`] and returns one [`OutputDict`]. The
//! workflow engine wires output keys of one component to input keys of the next,
//! so both sides are plain string-keyed JSON maps.
//!
//! Components never read the raw map in their bodies. Each one declares a typed
//! request record implementing [`FromInput`], which performs all key lookup,
//! flag decoding and validation at the boundary, and a `Serialize` response record
//! turned back into an [`OutputDict`] with [`OutputDict::from_response`].
//!
//! Flags arrive as the literal strings `"true"` / `"false"` and are decoded exactly
//! once, by [`InputDict::flag`].

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Component input parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputDict(Map<String, Value>);

/// Component results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputDict(Map<String, Value>);

/// Typed request record decoded from an [`InputDict`]
pub trait FromInput: Sized {
    fn from_input(input: &InputDict) -> Result<Self>;
}

impl InputDict {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build from a JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(Error::invalid(format!(
                "component input must be an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Builder-style insert, mostly for tests and chaining outputs into inputs
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Raw value; JSON `null` counts as absent
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Scalar parameter rendered as text; absent or null gives `None`
    pub fn optional_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(scalar_text)
    }

    /// Like [`optional_str`](Self::optional_str) but also maps `""` to `None`
    pub fn non_empty_str(&self, key: &str) -> Option<String> {
        self.optional_str(key).filter(|s| !s.is_empty())
    }

    /// Required scalar parameter rendered as text
    pub fn required_str(&self, key: &str) -> Result<String> {
        match self.get(key) {
            None => Err(missing(key)),
            Some(value) => scalar_text(value).ok_or_else(|| {
                Error::invalid(format!(
                    "parameter '{}' must be a scalar, got {}",
                    key,
                    json_kind(value)
                ))
            }),
        }
    }

    /// Decode a `'true'` / `'false'` flag. Anything other than `true` is false.
    pub fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::String(s)) => s == "true",
            Some(Value::Bool(b)) => *b,
            _ => false,
        }
    }

    /// Optional numeric parameter; empty strings count as absent
    pub fn optional_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
    {
        match self.non_empty_str(key) {
            None => Ok(None),
            Some(text) => text.trim().parse::<T>().map(Some).map_err(|_| {
                Error::invalid(format!("parameter '{}' has invalid value '{}'", key, text))
            }),
        }
    }

    /// Required structured parameter (connection, context, ...)
    pub fn required_typed<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.get(key).ok_or_else(|| missing(key))?;
        serde_json::from_value(value.clone())
            .map_err(|e| Error::invalid(format!("parameter '{}' is malformed: {}", key, e)))
    }

    /// Optional structured parameter
    pub fn optional_typed<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(_) => self.required_typed(key).map(Some),
        }
    }

    /// List of strings; a single string is treated as a one-element list
    pub fn string_list(&self, key: &str) -> Result<Vec<String>> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    scalar_text(item).ok_or_else(|| {
                        Error::invalid(format!("parameter '{}' must be a list of strings", key))
                    })
                })
                .collect(),
            Some(value) => scalar_text(value)
                .map(|s| vec![s])
                .ok_or_else(|| Error::invalid(format!("parameter '{}' must be a list", key))),
        }
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for InputDict {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl OutputDict {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Serialize a typed response record; it must serialize to a JSON object
    pub fn from_response<T: Serialize>(response: &T) -> Result<Self> {
        match serde_json::to_value(response)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::invalid(format!(
                "component response must be an object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Feed these outputs into the next component's input
    pub fn into_input(self) -> InputDict {
        InputDict(self.0)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

fn missing(key: &str) -> Error {
    Error::invalid(format!("missing required parameter '{}'", key))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flag_decoding() {
        let input = InputDict::new()
            .with("a", "true")
            .with("b", "false")
            .with("c", "True")
            .with("d", true);

        assert!(input.flag("a"));
        assert!(!input.flag("b"));
        assert!(!input.flag("c"));
        assert!(input.flag("d"));
        assert!(!input.flag("absent"));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let input = InputDict::from_value(json!({"b": null, "n": 3})).unwrap();
        assert!(input.required_str("b").is_err());
        assert_eq!(input.required_str("n").unwrap(), "3");
        assert_eq!(input.optional_str("b"), None);
    }

    #[test]
    fn test_missing_parameter_message_names_key() {
        let err = InputDict::new().required_str("target_att_val").unwrap_err();
        assert!(err.to_string().contains("target_att_val"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_optional_parsed_treats_empty_as_absent() {
        let input = InputDict::new().with("cutoff", "").with("noise", "5").with("bad", "x");
        assert_eq!(input.optional_parsed::<u32>("cutoff").unwrap(), None);
        assert_eq!(input.optional_parsed::<u32>("noise").unwrap(), Some(5));
        assert!(input.optional_parsed::<u32>("bad").is_err());
    }

    #[test]
    fn test_string_list_accepts_single_string() {
        let input = InputDict::new()
            .with("one", "go.owl")
            .with("many", json!(["a.owl", "b.owl"]));
        assert_eq!(input.string_list("one").unwrap(), vec!["go.owl"]);
        assert_eq!(input.string_list("many").unwrap().len(), 2);
        assert!(input.string_list("none").unwrap().is_empty());
    }

    #[test]
    fn test_output_from_response_requires_object() {
        #[derive(Serialize)]
        struct Response {
            theory: String,
        }

        let out = OutputDict::from_response(&Response {
            theory: "p(X).".to_string(),
        })
        .unwrap();
        assert_eq!(out.get("theory"), Some(&json!("p(X).")));
        assert!(OutputDict::from_response(&vec![1, 2]).is_err());
    }

    #[test]
    fn test_input_from_non_object_fails() {
        assert!(InputDict::from_value(json!([1])).is_err());
        assert!(InputDict::from_value(Value::Null).unwrap().into_inner().is_empty());
    }
}
