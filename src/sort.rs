use sea_orm::{ColumnTrait, sea_query::Order};

const DESCENDING: &str = "desc";

/// Convert a `direction` parameter to an `Order`; only `desc` sorts descending.
fn parse_order(direction: Option<&str>) -> Order {
    match direction {
        Some(direction) if direction.trim().eq_ignore_ascii_case(DESCENDING) => Order::Desc,
        _ => Order::Asc,
    }
}

/// Find column by name or return default
fn find_column<C>(column_name: &str, columns: &[(&str, C)], default: C) -> C
where
    C: ColumnTrait + Copy,
{
    columns
        .iter()
        .find(|&&(col_name, _)| col_name == column_name)
        .map_or(default, |&(_, col)| col)
}

/// Resolve `sort`/`direction` request parameters against the sortable columns.
///
/// Unknown or missing columns fall back to `default_column`.
///
/// ```rust,ignore
/// let (column, order) = parse_sorting(
///     params.sort.as_deref(),
///     params.direction.as_deref(),
///     &[("name", user::Column::Name), ("created_at", user::Column::CreatedAt)],
///     user::Column::Id,
/// );
/// let select = user::Entity::find().order_by(column, order);
/// ```
pub fn parse_sorting<C>(
    sort: Option<&str>,
    direction: Option<&str>,
    sortable_columns: &[(&str, C)],
    default_column: C,
) -> (C, Order)
where
    C: ColumnTrait + Copy,
{
    let column = sort.map_or(default_column, |name| {
        find_column(name.trim(), sortable_columns, default_column)
    });
    let order = parse_order(direction);

    tracing::debug!(sort = ?sort, direction = ?direction, ?order, "Resolved sorting");
    (column, order)
}
