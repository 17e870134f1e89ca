//! sea-orm query adapter.
//!
//! [`ConditionQuery`] turns capability calls into a sea-orm [`Condition`] that
//! can be passed straight to `Entity::find().filter(..)`. Relation traversals
//! become correlated `EXISTS (SELECT 1 FROM related ...)` subqueries, so the
//! relations have to be registered up front with a [`RelationDef`].
//!
//! ```rust,ignore
//! let mut query = ConditionQuery::new("users")
//!     .relation("roles", RelationDef::has_many("roles", "user_id"))
//!     .relation("teams", RelationDef::many_to_many("teams", "team_user", "user_id", "team_id"));
//!
//! Filter::new(table).with_query(query).filter(&input)?;
//! let users = user::Entity::find().filter(filter.into_query().unwrap().into_condition()).all(db).await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::{
    Condition,
    sea_query::{Alias, Expr, Query, SelectStatement, SimpleExpr},
};

use crate::errors::FilterError;
use crate::query::{Operand, Operator, SupportsRelationExists, SupportsWhere};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pivot {
    table: String,
    parent_key: String,
    related_key: String,
}

/// How to reach a related table from its parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    table: String,
    /// Column on the related table (or pivot) pointing back at the parent
    foreign_key: String,
    /// Parent column referenced by `foreign_key`
    local_key: String,
    /// Key on the related table joined from the pivot
    related_key: String,
    pivot: Option<Pivot>,
}

impl RelationDef {
    /// Related rows carry the parent key: `related.foreign_key = parent.id`.
    #[must_use]
    pub fn has_many(table: impl Into<String>, foreign_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            foreign_key: foreign_key.into(),
            local_key: "id".to_string(),
            related_key: "id".to_string(),
            pivot: None,
        }
    }

    /// Related rows are reached through a pivot table:
    /// `pivot.pivot_parent_key = parent.id AND pivot.pivot_related_key = related.id`.
    ///
    /// Columns of the pivot can be filtered on with a `relationXref` prefix.
    #[must_use]
    pub fn many_to_many(
        table: impl Into<String>,
        pivot: impl Into<String>,
        pivot_parent_key: impl Into<String>,
        pivot_related_key: impl Into<String>,
    ) -> Self {
        let pivot_parent_key = pivot_parent_key.into();
        Self {
            table: table.into(),
            foreign_key: pivot_parent_key.clone(),
            local_key: "id".to_string(),
            related_key: "id".to_string(),
            pivot: Some(Pivot {
                table: pivot.into(),
                parent_key: pivot_parent_key,
                related_key: pivot_related_key.into(),
            }),
        }
    }

    /// Override the parent column (defaults to `id`).
    #[must_use]
    pub fn local_key(mut self, local_key: impl Into<String>) -> Self {
        self.local_key = local_key.into();
        self
    }

    /// Override the related table key joined from the pivot (defaults to `id`).
    #[must_use]
    pub fn related_key(mut self, related_key: impl Into<String>) -> Self {
        self.related_key = related_key.into();
        self
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    fn subquery(&self, parent_table: &str, scope: Option<Condition>) -> SelectStatement {
        let mut select = Query::select();
        select.expr(Expr::val(1)).from(Alias::new(&self.table));

        let link_table = match &self.pivot {
            Some(pivot) => {
                select.inner_join(
                    Alias::new(&pivot.table),
                    Expr::col((Alias::new(&pivot.table), Alias::new(&pivot.related_key)))
                        .equals((Alias::new(&self.table), Alias::new(&self.related_key))),
                );
                pivot.table.as_str()
            }
            None => self.table.as_str(),
        };

        select.and_where(
            Expr::col((Alias::new(link_table), Alias::new(&self.foreign_key)))
                .equals((Alias::new(parent_table), Alias::new(&self.local_key))),
        );

        if let Some(scope) = scope {
            select.cond_where(scope);
        }
        select
    }
}

/// Query handle producing a sea-orm [`Condition`].
#[derive(Debug, Clone)]
pub struct ConditionQuery {
    table: String,
    relations: Arc<HashMap<String, RelationDef>>,
    branches: Vec<Condition>,
    predicates: usize,
}

impl ConditionQuery {
    /// Start an empty query over `table`; bare column names are qualified with it.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            relations: Arc::new(HashMap::new()),
            branches: Vec::new(),
            predicates: 0,
        }
    }

    /// Register a traversable relation under `name`.
    #[must_use]
    pub fn relation(mut self, name: impl Into<String>, def: RelationDef) -> Self {
        Arc::make_mut(&mut self.relations).insert(name.into(), def);
        self
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Number of predicates added so far (nested scopes count once).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.predicates
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.predicates == 0
    }

    /// Combine the OR branches into the final condition.
    #[must_use]
    pub fn into_condition(mut self) -> Condition {
        if self.branches.len() <= 1 {
            return self.branches.pop().unwrap_or_else(Condition::all);
        }
        self.branches
            .into_iter()
            .fold(Condition::any(), Condition::add)
    }

    fn scoped(&self, table: &str) -> Self {
        Self {
            table: table.to_string(),
            relations: Arc::clone(&self.relations),
            branches: Vec::new(),
            predicates: 0,
        }
    }

    fn push_and(&mut self, condition: Condition) {
        let branch = self.branches.pop().unwrap_or_else(Condition::all);
        self.branches.push(branch.add(condition));
        self.predicates += 1;
    }

    fn push_or(&mut self, condition: Condition) {
        self.branches.push(Condition::all().add(condition));
        self.predicates += 1;
    }

    /// `xref.column` addresses another table; anything else is a column of this query's table.
    fn column(&self, column: &str) -> Expr {
        match column.split_once('.') {
            Some((table, name)) => Expr::col((Alias::new(table), Alias::new(name))),
            None => Expr::col((Alias::new(&self.table), Alias::new(column))),
        }
    }

    fn compare(&self, column: &str, operator: Operator, value: Operand) -> Condition {
        let column = self.column(column);
        let expr = match operator {
            Operator::Eq => column.eq(sea_orm::Value::from(value)),
            Operator::Like => column.like(value.to_string()),
        };
        Condition::all().add(expr)
    }

    /// `EXISTS` subquery for `relation`, `None` when it is not registered.
    fn exists<F>(&self, relation: &str, scope: F) -> Option<SimpleExpr>
    where
        F: FnOnce(&mut Self),
    {
        let Some(def) = self.relations.get(relation) else {
            tracing::warn!(
                relation = %relation,
                table = %self.table,
                "Relation is not registered, predicate matches no rows"
            );
            return None;
        };

        let mut sub = self.scoped(&def.table);
        scope(&mut sub);
        let scope = (!sub.is_empty()).then(|| sub.into_condition());
        Some(Expr::exists(def.subquery(&self.table, scope)))
    }
}

impl SupportsWhere for ConditionQuery {
    fn where_compare(&mut self, column: &str, operator: Operator, value: Operand) {
        let condition = self.compare(column, operator, value);
        self.push_and(condition);
    }

    fn or_where_compare(&mut self, column: &str, operator: Operator, value: Operand) {
        let condition = self.compare(column, operator, value);
        self.push_or(condition);
    }

    fn where_null(&mut self, column: &str) {
        let condition = Condition::all().add(self.column(column).is_null());
        self.push_and(condition);
    }

    fn where_not_null(&mut self, column: &str) {
        let condition = Condition::all().add(self.column(column).is_not_null());
        self.push_and(condition);
    }

    fn where_nested<F>(&mut self, scope: F)
    where
        F: FnOnce(&mut Self),
    {
        let mut group = self.scoped(&self.table);
        scope(&mut group);
        if !group.is_empty() {
            self.push_and(group.into_condition());
        }
    }

    fn check_capabilities(&self) -> Result<(), FilterError> {
        if self.table.trim().is_empty() {
            return Err(FilterError::unsupported_query(
                "condition query has no table name",
            ));
        }
        Ok(())
    }
}

impl SupportsRelationExists for ConditionQuery {
    fn where_has<F>(&mut self, relation: &str, scope: F)
    where
        F: FnOnce(&mut Self),
    {
        let exists = self.exists(relation, scope).unwrap_or_else(matches_nothing);
        let condition = Condition::all().add(exists);
        self.push_and(condition);
    }

    fn or_where_has<F>(&mut self, relation: &str, scope: F)
    where
        F: FnOnce(&mut Self),
    {
        let exists = self.exists(relation, scope).unwrap_or_else(matches_nothing);
        let condition = Condition::all().add(exists);
        self.push_or(condition);
    }

    fn where_doesnt_have(&mut self, relation: &str) {
        let missing = self
            .exists(relation, |_| {})
            .map_or_else(matches_nothing, SimpleExpr::not);
        let condition = Condition::all().add(missing);
        self.push_and(condition);
    }

    fn supports_relation(&self, relation: &str) -> bool {
        self.relations.contains_key(relation)
    }
}

fn matches_nothing() -> SimpleExpr {
    Expr::cust("1 = 0")
}

/// Render a condition as a SQLite `WHERE` clause, mostly for logs and tests.
#[must_use]
pub fn to_sql(table: &str, condition: Condition) -> String {
    Query::select()
        .column(sea_orm::sea_query::Asterisk)
        .from(Alias::new(table))
        .cond_where(condition)
        .to_string(sea_orm::sea_query::SqliteQueryBuilder)
}
