//! Filter table model.
//!
//! A [`FilterTable`] is an ordered list of filterable fields, each described by a
//! [`FieldSpec`]. Tables are usually built in code:
//!
//! ```rust,ignore
//! let table = FilterTable::new()
//!     .field("act", FieldSpec::new(FieldType::Equals).value("search"))
//!     .field("name", FieldSpec::new(FieldType::String).compare(CompareType::Contains))
//!     .field("age", FieldSpec::new(FieldType::Int).validation(Validation::new().min(18)));
//! ```
//!
//! or loaded from JSON using the familiar data-grid configuration keys
//! (`type`, `compareType`, `validation.minLength`, `relationXref`, `htmlOptions`, ...):
//!
//! ```json
//! {
//!   "act":  {"type": "equals", "value": "search"},
//!   "name": {"title": "Name", "type": "string", "compareType": "%like%"},
//!   "role": {"title": "Role", "type": "user_role", "source": {"admin": "Admin", "user": "User"}}
//! }
//! ```
//!
//! Key order is significant and preserved in both cases.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_with::{NoneAsEmptyString, serde_as};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use crate::query::{Operand, Operator};
use crate::validation::Number;

/// Field type, deciding both validation and predicate emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum FieldType {
    /// `int` / `integer`: numeric value, optional inclusive `min`/`max`
    Int,
    /// `string`: text, optional `minLength`/`maxLength`
    #[default]
    String,
    /// `set`: one of the `source` keys
    Set,
    /// `date`: a 10 character `YYYY-MM-DD` value
    Date,
    /// `equals`: hidden marker that must equal `value`, never filtered on
    Equals,
    /// `url_parameter`: pass-through marker, same rules as `equals`
    UrlParameter,
    /// `user_role`: comma list of role names, `user` meaning "no role"
    UserRole,
    /// `user_status`: `verified` or anything else
    UserStatus,
    /// `user_active`: `active` or anything else
    UserActive,
}

impl FieldType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::String => "string",
            Self::Set => "set",
            Self::Date => "date",
            Self::Equals => "equals",
            Self::UrlParameter => "url_parameter",
            Self::UserRole => "user_role",
            Self::UserStatus => "user_status",
            Self::UserActive => "user_active",
        }
    }

    /// Whether accepted values go through `compareType` and `relation`.
    #[must_use]
    pub const fn uses_comparison(self) -> bool {
        matches!(self, Self::Int | Self::String | Self::Set | Self::Date)
    }
}

impl From<&str> for FieldType {
    /// Unknown names fall back to `string`.
    fn from(name: &str) -> Self {
        match name {
            "int" | "integer" => Self::Int,
            "set" => Self::Set,
            "date" => Self::Date,
            "equals" => Self::Equals,
            "url_parameter" => Self::UrlParameter,
            "user_role" => Self::UserRole,
            "user_status" => Self::UserStatus,
            "user_active" => Self::UserActive,
            _ => Self::String,
        }
    }
}

impl From<String> for FieldType {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String matching mode for comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum CompareType {
    /// `%like%`
    Contains,
    /// `like%`
    StartsWith,
    /// `%like`
    EndsWith,
    /// `like`: the value is used as the pattern verbatim
    Like,
    /// Anything else: equality
    #[default]
    Exact,
}

impl CompareType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contains => "%like%",
            Self::StartsWith => "like%",
            Self::EndsWith => "%like",
            Self::Like => "like",
            Self::Exact => "=",
        }
    }

    /// Operator and bound value for a raw submitted value.
    ///
    /// LIKE modes always bind text; `Exact` binds `typed`.
    #[must_use]
    pub fn comparison(self, raw: &str, typed: Operand) -> (Operator, Operand) {
        match self {
            Self::Contains => (Operator::Like, Operand::Text(format!("%{raw}%"))),
            Self::StartsWith => (Operator::Like, Operand::Text(format!("{raw}%"))),
            Self::EndsWith => (Operator::Like, Operand::Text(format!("%{raw}"))),
            Self::Like => (Operator::Like, Operand::Text(raw.to_string())),
            Self::Exact => (Operator::Eq, typed),
        }
    }
}

impl From<&str> for CompareType {
    fn from(name: &str) -> Self {
        match name {
            "%like%" => Self::Contains,
            "like%" => Self::StartsWith,
            "%like" => Self::EndsWith,
            "like" => Self::Like,
            _ => Self::Exact,
        }
    }
}

impl From<String> for CompareType {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

/// Optional constraints checked before a value is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Validation {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    /// Inclusive bounds; integer or fractional
    pub min: Option<Number>,
    pub max: Option<Number>,
}

impl Validation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    #[must_use]
    pub const fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    #[must_use]
    pub const fn min(mut self, min: i64) -> Self {
        self.min = Some(Number::Int(min));
        self
    }

    #[must_use]
    pub const fn max(mut self, max: i64) -> Self {
        self.max = Some(Number::Int(max));
        self
    }
}

/// Related collection(s) a comparison is applied through.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RelationSpec {
    /// Rows whose `relation` has a matching entry
    One(String),
    /// Rows where at least one of the relations has a matching entry
    Many(Vec<String>),
}

impl RelationSpec {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(name) => name.is_empty(),
            Self::Many(names) => names.iter().all(String::is_empty),
        }
    }

    /// Relation names, skipping blanks.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        let names: &[String] = match self {
            Self::One(name) => std::slice::from_ref(name),
            Self::Many(names) => names,
        };
        names.iter().map(String::as_str).filter(|name| !name.is_empty())
    }
}

/// Declarative description of one filterable field.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldSpec {
    /// Display label used in messages; defaults to the table key
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub compare_type: CompareType,
    /// Expected literal for `equals` / `url_parameter`
    pub value: String,
    /// Allowed values (key) and their labels, in display order
    #[serde(deserialize_with = "ordered_entries")]
    pub source: Vec<(String, String)>,
    pub validation: Option<Validation>,
    pub relation: Option<RelationSpec>,
    /// Join-table alias prefixed to the column (`xref.key`)
    #[serde_as(as = "NoneAsEmptyString")]
    pub relation_xref: Option<String>,
    pub disabled: bool,
    /// Presentation options; only `name` is read here, as the input key override
    pub html_options: HashMap<String, serde_json::Value>,
}

impl FieldSpec {
    #[must_use]
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub const fn compare(mut self, compare_type: CompareType) -> Self {
        self.compare_type = compare_type;
        self
    }

    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    #[must_use]
    pub fn source<I, K, V>(mut self, source: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.source = source
            .into_iter()
            .map(|(key, label)| (key.into(), label.into()))
            .collect();
        self
    }

    #[must_use]
    pub const fn validation(mut self, validation: Validation) -> Self {
        self.validation = Some(validation);
        self
    }

    #[must_use]
    pub fn relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = Some(RelationSpec::One(relation.into()));
        self
    }

    #[must_use]
    pub fn relations<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relation = Some(RelationSpec::Many(
            relations.into_iter().map(Into::into).collect(),
        ));
        self
    }

    #[must_use]
    pub fn relation_xref(mut self, xref: impl Into<String>) -> Self {
        let xref = xref.into();
        self.relation_xref = (!xref.is_empty()).then_some(xref);
        self
    }

    #[must_use]
    pub const fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Read the value from input key `name` instead of the table key.
    #[must_use]
    pub fn input_name(mut self, name: impl Into<String>) -> Self {
        self.html_options
            .insert("name".to_string(), serde_json::Value::String(name.into()));
        self
    }

    /// Label for messages: `title`, or the table key when unset.
    #[must_use]
    pub fn title_or<'a>(&'a self, key: &'a str) -> &'a str {
        self.title.as_deref().unwrap_or(key)
    }

    /// Input key the value is read from.
    #[must_use]
    pub fn input_key<'a>(&'a self, key: &'a str) -> &'a str {
        self.html_options
            .get("name")
            .and_then(serde_json::Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(key)
    }

    /// Column a comparison targets: `xref.key` when a join alias is set.
    #[must_use]
    pub fn column(&self, key: &str) -> String {
        match self.relation_xref.as_deref() {
            Some(xref) if !xref.is_empty() => format!("{xref}.{key}"),
            _ => key.to_string(),
        }
    }

    #[must_use]
    pub fn has_source_key(&self, value: &str) -> bool {
        self.source.iter().any(|(key, _)| key == value)
    }

    /// Relation spec, ignoring blank names.
    #[must_use]
    pub fn active_relation(&self) -> Option<&RelationSpec> {
        self.relation.as_ref().filter(|relation| !relation.is_empty())
    }
}

/// Ordered mapping of field key to [`FieldSpec`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterTable {
    fields: Vec<(String, FieldSpec)>,
}

impl FilterTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, or replace the spec of an existing key in place.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, spec: FieldSpec) -> Self {
        self.insert(key, spec);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, spec: FieldSpec) {
        let key = key.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = spec,
            None => self.fields.push((key, spec)),
        }
    }

    /// Parse a JSON table, keeping document order.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error for malformed input.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, spec)| spec)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(key, spec)| (key.as_str(), spec))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'de> Deserialize<'de> for FilterTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        ordered_entries(deserializer).map(|fields| Self { fields })
    }
}

/// Deserialize a map into `(key, value)` pairs in document order.
fn ordered_entries<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct EntriesVisitor<V>(PhantomData<V>);

    impl<'de, V> Visitor<'de> for EntriesVisitor<V>
    where
        V: Deserialize<'de>,
    {
        type Value = Vec<(String, V)>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a map")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, value)) = map.next_entry::<String, V>()? {
                entries.push((key, value));
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor(PhantomData))
}
