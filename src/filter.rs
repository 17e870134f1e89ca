//! Filter predicate compiler.
//!
//! Walks a [`FilterTable`] in order, validates each submitted value against its
//! field type and turns the accepted ones into predicates on a query handle.
//!
//! ```rust,ignore
//! let mut filter = Filter::new(table).with_query(ConditionQuery::new("users"));
//! filter.filter(&RequestInput::from_query_str("act=search&name=bob"))?;
//!
//! if filter.is_filtered() {
//!     let condition = filter.into_query().unwrap().into_condition();
//! }
//! ```
//!
//! A pass never stops on bad input: invalid values are reported through
//! [`Filter::errors`] and simply left out of the query. Only an unusable query
//! handle aborts the pass, with a [`FilterError`], before anything is touched.

use serde::{Deserialize, Serialize, Serializer};

use crate::errors::FilterError;
use crate::input::{InputSource, InputValue};
use crate::query::{Operand, QueryHandle};
use crate::table::{FieldSpec, FieldType, FilterTable, RelationSpec};
use crate::validation::{Number, ValidationError, ValidationErrors, validators};

/// Field key whose value marks a submitted search form.
pub const ACTION_FIELD: &str = "act";
/// [`ACTION_FIELD`] value of a submitted search.
pub const SEARCH_ACTION: &str = "search";

/// Relation holding a user's roles.
pub const ROLES_RELATION: &str = "roles";
/// Role name column inside [`ROLES_RELATION`].
pub const ROLE_NAME_COLUMN: &str = "name";
/// `user_role` value meaning "has no role at all".
pub const PLAIN_USER_ROLE: &str = "user";
pub const EMAIL_VERIFIED_COLUMN: &str = "email_verified_at";
pub const VERIFIED_STATUS: &str = "verified";
pub const ACTIVE_COLUMN: &str = "active";
pub const ACTIVE_STATUS: &str = "active";

const MAX_ROLE_TEXT_LEN: usize = 100;
const MAX_ROLE_LIST_LEN: usize = 500;
const DATE_LEN: usize = 10;

/// Compiler settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Report type mismatches (non-numeric int, unknown set value, ...).
    /// Range and length violations are reported regardless.
    pub debug: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self { debug: true }
    }
}

/// Accepted values per field key, in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValues {
    values: Vec<(String, InputValue)>,
}

impl FieldValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One empty entry per table key.
    #[must_use]
    pub fn for_table(table: &FilterTable) -> Self {
        Self {
            values: table
                .keys()
                .map(|key| (key.to_string(), InputValue::default()))
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&InputValue> {
        self.values
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value)
    }

    pub fn set(&mut self, key: &str, value: InputValue) {
        match self.values.iter_mut().find(|(existing, _)| existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((key.to_string(), value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &InputValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
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

impl Serialize for FieldValues {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.iter())
    }
}

/// A filter table bound to a query handle.
///
/// Field values survive between passes; errors are reset on each pass.
#[derive(Debug, Clone)]
pub struct Filter<Q> {
    table: FilterTable,
    query: Option<Q>,
    config: FilterConfig,
    values: FieldValues,
    errors: ValidationErrors,
}

impl<Q> Filter<Q> {
    #[must_use]
    pub fn new(table: FilterTable) -> Self {
        let values = FieldValues::for_table(&table);
        Self {
            table,
            query: None,
            config: FilterConfig::default(),
            values,
            errors: ValidationErrors::new(),
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: Q) -> Self {
        self.query = Some(query);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: FilterConfig) -> Self {
        self.config = config;
        self
    }

    /// Start from caller-provided values instead of empty ones.
    #[must_use]
    pub fn with_field_values(mut self, values: FieldValues) -> Self {
        self.values = values;
        self
    }

    pub fn set_query(&mut self, query: Q) {
        self.query = Some(query);
    }

    #[must_use]
    pub const fn query(&self) -> Option<&Q> {
        self.query.as_ref()
    }

    pub fn query_mut(&mut self) -> Option<&mut Q> {
        self.query.as_mut()
    }

    #[must_use]
    pub fn into_query(self) -> Option<Q> {
        self.query
    }

    #[must_use]
    pub const fn table(&self) -> &FilterTable {
        &self.table
    }

    #[must_use]
    pub const fn config(&self) -> FilterConfig {
        self.config
    }

    #[must_use]
    pub const fn field_values(&self) -> &FieldValues {
        &self.values
    }

    #[must_use]
    pub const fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    /// Whether the `act` field holds `search`.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        self.values
            .get(ACTION_FIELD)
            .and_then(InputValue::as_single)
            == Some(SEARCH_ACTION)
    }
}

impl<Q: QueryHandle> Filter<Q> {
    /// Run one pass over `input`.
    ///
    /// # Errors
    ///
    /// Returns a [`FilterError`] when no query is attached, the query rejects
    /// predicates, or a field needs a relation the query cannot traverse. In
    /// that case nothing was modified.
    pub fn filter(&mut self, input: &impl InputSource) -> Result<&mut Self, FilterError> {
        let query = self.query.as_mut().ok_or(FilterError::MissingQuery)?;
        run_pass(
            &self.table,
            self.config,
            input,
            query,
            &mut self.values,
            &mut self.errors,
        )?;
        Ok(self)
    }
}

/// Compile `table` against `input` onto `query` with the default config.
///
/// # Errors
///
/// See [`Filter::filter`].
pub fn compile<Q: QueryHandle>(
    table: &FilterTable,
    input: &impl InputSource,
    query: &mut Q,
) -> Result<(FieldValues, ValidationErrors), FilterError> {
    compile_with(FilterConfig::default(), table, input, query)
}

/// [`compile`] with an explicit config.
///
/// # Errors
///
/// See [`Filter::filter`].
pub fn compile_with<Q: QueryHandle>(
    config: FilterConfig,
    table: &FilterTable,
    input: &impl InputSource,
    query: &mut Q,
) -> Result<(FieldValues, ValidationErrors), FilterError> {
    let mut values = FieldValues::for_table(table);
    let mut errors = ValidationErrors::new();
    run_pass(table, config, input, query, &mut values, &mut errors)?;
    Ok((values, errors))
}

fn run_pass<Q: QueryHandle>(
    table: &FilterTable,
    config: FilterConfig,
    input: &impl InputSource,
    query: &mut Q,
    values: &mut FieldValues,
    errors: &mut ValidationErrors,
) -> Result<(), FilterError> {
    check_contract(table, query)?;
    errors.clear();

    for (key, spec) in table.iter() {
        if spec.disabled {
            tracing::debug!(field = %key, "Skipping disabled filter field");
            continue;
        }

        let Some(value) = input
            .get(spec.input_key(key))
            .filter(|value| !value.is_empty())
        else {
            continue;
        };

        match spec.field_type.validate(key, spec, &value) {
            Ok(accepted) => {
                tracing::debug!(field = %key, value = ?value, "Applying filter");
                values.set(key, value);
                accepted.emit(query, key, spec);
            }
            Err(Rejection::TypeMismatch(message)) => {
                tracing::debug!(field = %key, reported = config.debug, "{message}");
                if config.debug {
                    errors.add(ValidationError::new(key, message));
                }
            }
            Err(Rejection::Constraint(violations)) => {
                for violation in violations {
                    tracing::debug!(field = %key, "{}", violation.message);
                    errors.add(violation);
                }
            }
        }
    }
    Ok(())
}

/// Entry guard: every relation the table can touch must be traversable.
fn check_contract<Q: QueryHandle>(table: &FilterTable, query: &Q) -> Result<(), FilterError> {
    query.check_capabilities()?;

    for (key, spec) in table.iter().filter(|(_, spec)| !spec.disabled) {
        if spec.field_type.uses_comparison()
            && let Some(relation) = spec.active_relation()
            && let Some(missing) = relation
                .names()
                .find(|name| !query.supports_relation(name))
        {
            return Err(FilterError::unknown_relation(key, missing));
        }

        if spec.field_type == FieldType::UserRole && !query.supports_relation(ROLES_RELATION) {
            return Err(FilterError::unknown_relation(key, ROLES_RELATION));
        }
    }
    Ok(())
}

/// Why a submitted value was not applied.
enum Rejection {
    /// Wrong shape for the type; reported only in debug mode
    TypeMismatch(String),
    /// Shape is fine but a declared bound is violated
    Constraint(Vec<ValidationError>),
}

/// A validated value, ready to be turned into predicates.
enum Accepted {
    Compare { raw: String, operand: Operand },
    Marker,
    Roles(Vec<String>),
    Verified(bool),
    Active(bool),
}

impl FieldType {
    fn validate(self, key: &str, spec: &FieldSpec, value: &InputValue) -> Result<Accepted, Rejection> {
        let title = spec.title_or(key);
        let single = value.as_single();

        match self {
            Self::Int => {
                let Some((number, operand)) = single.and_then(parse_numeric) else {
                    return Err(Rejection::TypeMismatch(format!(
                        "The field {title} must be a numeric value."
                    )));
                };
                let validation = spec.validation.unwrap_or_default();
                let violations: Vec<_> = [
                    validators::validate_range(key, title, number, validation.min, None),
                    validators::validate_range(key, title, number, None, validation.max),
                ]
                .into_iter()
                .filter_map(Result::err)
                .collect();
                if !violations.is_empty() {
                    return Err(Rejection::Constraint(violations));
                }
                Ok(Accepted::Compare {
                    raw: single.unwrap_or_default().to_string(),
                    operand,
                })
            }
            Self::String => {
                let Some(text) = single else {
                    return Err(Rejection::TypeMismatch(format!(
                        "The field {title} must be a string value."
                    )));
                };
                let validation = spec.validation.unwrap_or_default();
                let violations: Vec<_> = [
                    validators::validate_length(key, title, text, validation.min_length, None),
                    validators::validate_length(key, title, text, None, validation.max_length),
                ]
                .into_iter()
                .filter_map(Result::err)
                .collect();
                if !violations.is_empty() {
                    return Err(Rejection::Constraint(violations));
                }
                Ok(Accepted::text(text))
            }
            Self::Set => match single.filter(|text| spec.has_source_key(text)) {
                Some(text) => Ok(Accepted::text(text)),
                None => Err(Rejection::TypeMismatch(format!(
                    "The field {title} must be one of a pre-defined values of set."
                ))),
            },
            Self::Date => match single.filter(|text| text.chars().count() == DATE_LEN) {
                Some(text) => Ok(Accepted::text(text)),
                None => Err(Rejection::TypeMismatch(format!(
                    "The field {title} must be a date value."
                ))),
            },
            Self::Equals | Self::UrlParameter => match single.filter(|text| *text == spec.value) {
                Some(_) => Ok(Accepted::Marker),
                None => Err(Rejection::TypeMismatch(format!(
                    "The field {title} must be equal to {}.",
                    spec.value
                ))),
            },
            Self::UserRole => {
                let names: Option<Vec<String>> = match value {
                    InputValue::Single(text) if text.chars().count() < MAX_ROLE_TEXT_LEN => Some(
                        text.split(',')
                            .filter(|name| !name.is_empty())
                            .map(str::to_string)
                            .collect(),
                    ),
                    InputValue::List(list) if list.len() < MAX_ROLE_LIST_LEN => Some(
                        list.iter().filter(|name| !name.is_empty()).cloned().collect(),
                    ),
                    _ => None,
                };
                names.map(Accepted::Roles).ok_or_else(|| undefined_value(title))
            }
            Self::UserStatus => single
                .map(|text| Accepted::Verified(text == VERIFIED_STATUS))
                .ok_or_else(|| undefined_value(title)),
            Self::UserActive => single
                .map(|text| Accepted::Active(text == ACTIVE_STATUS))
                .ok_or_else(|| undefined_value(title)),
        }
    }
}

fn undefined_value(title: &str) -> Rejection {
    Rejection::TypeMismatch(format!("The field {title} has undefined value."))
}

/// Numeric text: optional sign, decimals and exponent, surrounding whitespace allowed.
fn parse_numeric(raw: &str) -> Option<(Number, Operand)> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || !trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return None;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Some((Number::Int(int), Operand::Integer(int)));
    }
    let float = trimmed.parse::<f64>().ok().filter(|float| float.is_finite())?;
    Some((Number::Float(float), Operand::Float(float)))
}

impl Accepted {
    fn text(text: &str) -> Self {
        Self::Compare {
            raw: text.to_string(),
            operand: Operand::Text(text.to_string()),
        }
    }

    fn emit<Q: QueryHandle>(self, query: &mut Q, key: &str, spec: &FieldSpec) {
        match self {
            Self::Compare { raw, operand } => emit_comparison(query, key, spec, &raw, operand),
            Self::Marker => {}
            Self::Roles(names) => emit_roles(query, names),
            Self::Verified(true) => query.where_not_null(EMAIL_VERIFIED_COLUMN),
            Self::Verified(false) => query.where_null(EMAIL_VERIFIED_COLUMN),
            Self::Active(active) => query.where_eq(ACTIVE_COLUMN, i64::from(active)),
        }
    }
}

fn emit_comparison<Q: QueryHandle>(
    query: &mut Q,
    key: &str,
    spec: &FieldSpec,
    raw: &str,
    operand: Operand,
) {
    let column = spec.column(key);
    let (operator, value) = spec.compare_type.comparison(raw, operand);

    match spec.active_relation() {
        None => query.where_compare(&column, operator, value),
        Some(RelationSpec::One(relation)) => {
            query.where_has(relation, |sub| sub.where_compare(&column, operator, value));
        }
        Some(relations) => query.where_nested(|group| {
            for relation in relations.names() {
                group.or_where_has(relation, |sub| {
                    sub.where_compare(&column, operator, value.clone());
                });
            }
        }),
    }
}

/// `user` means "no role"; it ORs with the named roles, the first listed
/// role being the primary match inside the relation scope.
fn emit_roles<Q: QueryHandle>(query: &mut Q, mut names: Vec<String>) {
    let mut or_has = false;
    if let Some(position) = names.iter().position(|name| name == PLAIN_USER_ROLE) {
        query.where_doesnt_have(ROLES_RELATION);
        names.remove(position);
        or_has = true;
    }
    if names.is_empty() {
        return;
    }

    let scope = |sub: &mut Q| {
        let mut named = names.iter().filter(|name| *name != PLAIN_USER_ROLE);
        if let Some(first) = named.next() {
            sub.where_eq(ROLE_NAME_COLUMN, first.as_str());
        }
        for name in named {
            sub.or_where_eq(ROLE_NAME_COLUMN, name.as_str());
        }
    };

    if or_has {
        query.or_where_has(ROLES_RELATION, scope);
    } else {
        query.where_has(ROLES_RELATION, scope);
    }
}
