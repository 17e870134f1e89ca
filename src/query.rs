//! Query capability interfaces.
//!
//! The filter compiler never builds SQL itself. It talks to whatever query
//! abstraction the caller hands it through two small traits:
//!
//! - [`SupportsWhere`]: plain column predicates (`where`, `orWhere`, null checks, nested groups)
//! - [`SupportsRelationExists`]: predicates scoped to a related collection (`whereHas`, `orWhereHas`, `whereDoesntHave`)
//!
//! Boolean composition follows SQL precedence: every `or_*` call opens a new OR
//! branch, and consecutive AND calls bind inside the current branch. So
//! `a; b; or c` means `(a AND b) OR c`.
//!
//! Two adapters ship with the crate: [`crate::predicate::PredicateQuery`]
//! (an inspectable predicate tree) and [`crate::condition::ConditionQuery`]
//! (a sea-orm `Condition`).

use std::fmt;

use crate::errors::FilterError;

/// Comparison operator used by a column predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equality (=)
    Eq,
    /// LIKE pattern matching
    Like,
}

impl Operator {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Like => "LIKE",
        }
    }
}

/// Typed value bound to a column predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Integer(int) => write!(f, "{int}"),
            Self::Float(float) => write!(f, "{float}"),
        }
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Operand {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Operand {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Operand> for sea_orm::Value {
    fn from(operand: Operand) -> Self {
        match operand {
            Operand::Text(text) => text.into(),
            Operand::Integer(int) => int.into(),
            Operand::Float(float) => float.into(),
        }
    }
}

/// How a clause joins the clauses before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boolean {
    And,
    Or,
}

impl Boolean {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Column-level predicate capability.
pub trait SupportsWhere {
    /// `WHERE column <operator> value`, AND-ed with the current branch.
    fn where_compare(&mut self, column: &str, operator: Operator, value: Operand);

    /// `OR column <operator> value`, opening a new branch.
    fn or_where_compare(&mut self, column: &str, operator: Operator, value: Operand);

    fn where_null(&mut self, column: &str);

    fn where_not_null(&mut self, column: &str);

    /// Parenthesised AND group built by `scope` on a fresh query of the same kind.
    fn where_nested<F>(&mut self, scope: F)
    where
        F: FnOnce(&mut Self);

    /// Implicit equality, the two-argument `where(column, value)` form.
    fn where_eq(&mut self, column: &str, value: impl Into<Operand>) {
        self.where_compare(column, Operator::Eq, value.into());
    }

    fn or_where_eq(&mut self, column: &str, value: impl Into<Operand>) {
        self.or_where_compare(column, Operator::Eq, value.into());
    }

    /// Entry guard hook, called once before a compilation pass mutates anything.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::UnsupportedQuery`] when the handle cannot accept predicates.
    fn check_capabilities(&self) -> Result<(), FilterError> {
        Ok(())
    }
}

/// Relation-scoped predicate capability.
///
/// The `scope` callbacks receive a sub-query of the same type, positioned on
/// the related collection.
pub trait SupportsRelationExists: SupportsWhere {
    /// `WHERE EXISTS (related rows matching scope)`
    fn where_has<F>(&mut self, relation: &str, scope: F)
    where
        F: FnOnce(&mut Self);

    /// `OR EXISTS (related rows matching scope)`
    fn or_where_has<F>(&mut self, relation: &str, scope: F)
    where
        F: FnOnce(&mut Self);

    /// `WHERE NOT EXISTS (any related row)`
    fn where_doesnt_have(&mut self, relation: &str);

    /// Whether `relation` can be traversed from this query.
    fn supports_relation(&self, _relation: &str) -> bool {
        true
    }
}

/// Everything the filter compiler needs from a query handle.
pub trait QueryHandle: SupportsWhere + SupportsRelationExists {}

impl<T> QueryHandle for T where T: SupportsWhere + SupportsRelationExists {}
