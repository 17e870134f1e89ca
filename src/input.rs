//! Request input.
//!
//! Filter values normally arrive as GET parameters. [`RequestInput`] parses a
//! URL query string the way HTML forms submit it: `role[]=admin&role[]=editor`
//! collects a list, and a repeated scalar key keeps the last value.
//!
//! Anything implementing [`InputSource`] can feed the compiler, including
//! plain `HashMap<String, String>` maps.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;

/// A submitted value: a single string or a list (from `key[]` parameters).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Single(String),
    List(Vec<String>),
}

impl InputValue {
    /// Empty string, or a list without a non-empty entry (`role[]=`).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(value) => value.is_empty(),
            Self::List(values) => values.iter().all(String::is_empty),
        }
    }

    #[must_use]
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::List(_) => None,
        }
    }
}

impl Default for InputValue {
    fn default() -> Self {
        Self::Single(String::new())
    }
}

impl From<&str> for InputValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for InputValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for InputValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

impl From<Vec<&str>> for InputValue {
    fn from(values: Vec<&str>) -> Self {
        Self::List(values.into_iter().map(str::to_string).collect())
    }
}

/// Key/value source the compiler reads submitted values from.
pub trait InputSource {
    fn get(&self, key: &str) -> Option<InputValue>;
}

impl InputSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<InputValue> {
        HashMap::get(self, key).cloned().map(InputValue::Single)
    }
}

impl InputSource for HashMap<String, InputValue> {
    fn get(&self, key: &str) -> Option<InputValue> {
        HashMap::get(self, key).cloned()
    }
}

impl<T: InputSource + ?Sized> InputSource for &T {
    fn get(&self, key: &str) -> Option<InputValue> {
        (**self).get(key)
    }
}

/// Parsed request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInput {
    values: HashMap<String, InputValue>,
}

impl RequestInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string (with or without the leading `?`).
    #[must_use]
    pub fn from_query_str(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut input = Self::new();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.strip_suffix("[]") {
                Some(list_key) => input.push(list_key, value.into_owned()),
                None => input.set(key.into_owned(), value.into_owned()),
            }
        }
        input
    }

    /// Set a value, replacing whatever was stored under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<InputValue>) {
        self.values.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<InputValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Append to the list stored under `key`, turning a scalar into a list.
    pub fn push(&mut self, key: &str, value: String) {
        match self.values.get_mut(key) {
            Some(InputValue::List(values)) => values.push(value),
            _ => {
                self.values
                    .insert(key.to_string(), InputValue::List(vec![value]));
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl InputSource for RequestInput {
    fn get(&self, key: &str) -> Option<InputValue> {
        self.values.get(key).cloned()
    }
}

impl<K, V> FromIterator<(K, V)> for RequestInput
where
    K: Into<String>,
    V: Into<InputValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl<S> FromRequestParts<S> for RequestInput
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .uri
            .query()
            .map(Self::from_query_str)
            .unwrap_or_default())
    }
}
