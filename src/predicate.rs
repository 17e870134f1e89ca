//! Backend-independent query adapter.
//!
//! [`PredicateQuery`] records every capability call as a [`Clause`], producing
//! a tree that can be inspected, compared or printed. It is what the compiler
//! is tested against and a convenient way to preview what a filter table will
//! do before wiring it to a database.

use std::fmt;

use crate::query::{Boolean, Operand, Operator, SupportsRelationExists, SupportsWhere};

/// A single predicate node.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        column: String,
        operator: Operator,
        value: Operand,
    },
    Null {
        column: String,
    },
    NotNull {
        column: String,
    },
    /// Related rows exist that match `scope`
    Exists {
        relation: String,
        scope: Vec<Clause>,
    },
    /// No related rows exist at all
    NotExists {
        relation: String,
    },
    /// Parenthesised group
    Group(Vec<Clause>),
}

/// A predicate plus the boolean that joins it to the clauses before it.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub boolean: Boolean,
    pub predicate: Predicate,
}

impl Clause {
    #[must_use]
    pub const fn and(predicate: Predicate) -> Self {
        Self {
            boolean: Boolean::And,
            predicate,
        }
    }

    #[must_use]
    pub const fn or(predicate: Predicate) -> Self {
        Self {
            boolean: Boolean::Or,
            predicate,
        }
    }
}

/// Query handle that records predicates instead of executing them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateQuery {
    clauses: Vec<Clause>,
    relations: Option<Vec<String>>,
}

impl PredicateQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict traversable relations to `relations`.
    ///
    /// Without this every relation name is accepted.
    #[must_use]
    pub fn with_relations<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relations = Some(relations.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    #[must_use]
    pub fn into_clauses(self) -> Vec<Clause> {
        self.clauses
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    fn scoped(&self) -> Self {
        Self {
            clauses: Vec::new(),
            relations: self.relations.clone(),
        }
    }
}

impl SupportsWhere for PredicateQuery {
    fn where_compare(&mut self, column: &str, operator: Operator, value: Operand) {
        self.clauses.push(Clause::and(Predicate::Compare {
            column: column.to_string(),
            operator,
            value,
        }));
    }

    fn or_where_compare(&mut self, column: &str, operator: Operator, value: Operand) {
        self.clauses.push(Clause::or(Predicate::Compare {
            column: column.to_string(),
            operator,
            value,
        }));
    }

    fn where_null(&mut self, column: &str) {
        self.clauses.push(Clause::and(Predicate::Null {
            column: column.to_string(),
        }));
    }

    fn where_not_null(&mut self, column: &str) {
        self.clauses.push(Clause::and(Predicate::NotNull {
            column: column.to_string(),
        }));
    }

    fn where_nested<F>(&mut self, scope: F)
    where
        F: FnOnce(&mut Self),
    {
        let mut group = self.scoped();
        scope(&mut group);
        if !group.is_empty() {
            self.clauses.push(Clause::and(Predicate::Group(group.clauses)));
        }
    }
}

impl SupportsRelationExists for PredicateQuery {
    fn where_has<F>(&mut self, relation: &str, scope: F)
    where
        F: FnOnce(&mut Self),
    {
        let mut sub = self.scoped();
        scope(&mut sub);
        self.clauses.push(Clause::and(Predicate::Exists {
            relation: relation.to_string(),
            scope: sub.clauses,
        }));
    }

    fn or_where_has<F>(&mut self, relation: &str, scope: F)
    where
        F: FnOnce(&mut Self),
    {
        let mut sub = self.scoped();
        scope(&mut sub);
        self.clauses.push(Clause::or(Predicate::Exists {
            relation: relation.to_string(),
            scope: sub.clauses,
        }));
    }

    fn where_doesnt_have(&mut self, relation: &str) {
        self.clauses.push(Clause::and(Predicate::NotExists {
            relation: relation.to_string(),
        }));
    }

    fn supports_relation(&self, relation: &str) -> bool {
        self.relations
            .as_ref()
            .is_none_or(|allowed| allowed.iter().any(|name| name == relation))
    }
}

fn write_clauses(f: &mut fmt::Formatter<'_>, clauses: &[Clause]) -> fmt::Result {
    for (index, clause) in clauses.iter().enumerate() {
        if index > 0 {
            write!(f, " {} ", clause.boolean.as_sql())?;
        }
        write!(f, "{}", clause.predicate)?;
    }
    Ok(())
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compare {
                column,
                operator,
                value,
            } => match value {
                Operand::Text(text) => {
                    write!(f, "{column} {} '{}'", operator.as_sql(), text.replace('\'', "''"))
                }
                _ => write!(f, "{column} {} {value}", operator.as_sql()),
            },
            Self::Null { column } => write!(f, "{column} IS NULL"),
            Self::NotNull { column } => write!(f, "{column} IS NOT NULL"),
            Self::Exists { relation, scope } => {
                write!(f, "EXISTS {relation}")?;
                if !scope.is_empty() {
                    f.write_str(" (")?;
                    write_clauses(f, scope)?;
                    f.write_str(")")?;
                }
                Ok(())
            }
            Self::NotExists { relation } => write!(f, "NOT EXISTS {relation}"),
            Self::Group(clauses) => {
                f.write_str("(")?;
                write_clauses(f, clauses)?;
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for PredicateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_clauses(f, &self.clauses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_clauses_in_call_order() {
        let mut query = PredicateQuery::new();
        query.where_eq("status", "open");
        query.or_where_compare("title", Operator::Like, Operand::from("%bug%"));
        query.where_null("deleted_at");

        assert_eq!(query.clauses().len(), 3);
        assert_eq!(query.clauses()[1].boolean, Boolean::Or);
        assert_eq!(
            query.to_string(),
            "status = 'open' OR title LIKE '%bug%' AND deleted_at IS NULL"
        );
    }

    #[test]
    fn test_relation_scope_is_nested() {
        let mut query = PredicateQuery::new();
        query.where_doesnt_have("roles");
        query.or_where_has("roles", |q| {
            q.where_eq("name", "admin");
            q.or_where_eq("name", "editor");
        });

        assert_eq!(
            query.to_string(),
            "NOT EXISTS roles OR EXISTS roles (name = 'admin' OR name = 'editor')"
        );
    }

    #[test]
    fn test_empty_group_is_dropped() {
        let mut query = PredicateQuery::new();
        query.where_nested(|_| {});
        assert!(query.is_empty());

        query.where_nested(|q| q.where_not_null("email_verified_at"));
        assert_eq!(query.to_string(), "(email_verified_at IS NOT NULL)");
    }

    #[test]
    fn test_numeric_values_are_unquoted() {
        let mut query = PredicateQuery::new();
        query.where_eq("active", 1_i64);
        assert_eq!(query.to_string(), "active = 1");
    }

    #[test]
    fn test_relation_allowlist() {
        let query = PredicateQuery::new().with_relations(["roles"]);
        assert!(query.supports_relation("roles"));
        assert!(!query.supports_relation("teams"));

        assert!(PredicateQuery::new().supports_relation("anything"));
    }
}
