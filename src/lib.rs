//! Data grid helpers for axum and sea-orm: a filter predicate compiler,
//! request input parsing, pagination windows and sorting.
//!
//! ```rust,ignore
//! use datagrid::{ConditionQuery, FieldSpec, FieldType, CompareType, Filter, FilterTable, RelationDef, RequestInput};
//!
//! async fn list_users(input: RequestInput, Query(page): Query<PageParams>) -> Result<impl IntoResponse, FilterError> {
//!     let table = FilterTable::new()
//!         .field("act", FieldSpec::new(FieldType::Equals).value("search"))
//!         .field("name", FieldSpec::new(FieldType::String).compare(CompareType::Contains))
//!         .field("role", FieldSpec::new(FieldType::UserRole));
//!
//!     let query = ConditionQuery::new("users").relation("roles", RelationDef::has_many("roles", "user_id"));
//!     let mut filter = Filter::new(table).with_query(query);
//!     filter.filter(&input)?;
//!     // ...
//! }
//! ```

pub mod condition;
pub mod errors;
pub mod filter;
pub mod input;
pub mod pagination;
pub mod predicate;
pub mod query;
pub mod sort;
pub mod table;
pub mod validation;

pub use condition::{ConditionQuery, RelationDef};
pub use errors::FilterError;
pub use filter::{FieldValues, Filter, FilterConfig, compile, compile_with};
pub use input::{InputSource, InputValue, RequestInput};
pub use pagination::{Page, PageParams, PaginationFields, paginate};
pub use predicate::{Clause, Predicate, PredicateQuery};
pub use query::{Boolean, Operand, Operator, QueryHandle, SupportsRelationExists, SupportsWhere};
pub use serde_with;
pub use sort::parse_sorting;
pub use table::{CompareType, FieldSpec, FieldType, FilterTable, RelationSpec, Validation};
pub use validation::{Number, ValidationError, ValidationErrors};
