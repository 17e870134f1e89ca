// Compiled conditions executed against an in-memory SQLite database.

mod common;

use common::{setup_test_db, user, users_query};
use datagrid::{
    CompareType, FieldSpec, FieldType, Filter, FilterTable, RequestInput, SupportsRelationExists,
    SupportsWhere,
};
use sea_orm::{DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

async fn user_ids(db: &DatabaseConnection, table: FilterTable, query_string: &str) -> Vec<i32> {
    let mut filter = Filter::new(table).with_query(users_query());
    filter
        .filter(&RequestInput::from_query_str(query_string))
        .unwrap();
    assert!(filter.errors().is_empty(), "{:?}", filter.errors());

    let condition = filter.into_query().unwrap().into_condition();
    user::Entity::find()
        .filter(condition)
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .unwrap()
        .into_iter()
        .map(|user| user.id)
        .collect()
}

fn grid_table() -> FilterTable {
    FilterTable::new()
        .field("act", FieldSpec::new(FieldType::Equals).value("search"))
        .field(
            "email",
            FieldSpec::new(FieldType::String).compare(CompareType::EndsWith),
        )
        .field("age", FieldSpec::new(FieldType::Int))
        .field("role", FieldSpec::new(FieldType::UserRole))
        .field("status", FieldSpec::new(FieldType::UserStatus))
        .field("active", FieldSpec::new(FieldType::UserActive))
        .field(
            "created_at",
            FieldSpec::new(FieldType::Date).compare(CompareType::StartsWith),
        )
}

#[tokio::test]
async fn test_no_input_returns_everything() {
    let db = setup_test_db().await.unwrap();
    assert_eq!(user_ids(&db, grid_table(), "").await, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_like_and_equality() {
    let db = setup_test_db().await.unwrap();
    let table = FilterTable::new()
        .field("name", FieldSpec::new(FieldType::String).compare(CompareType::Contains));

    assert_eq!(user_ids(&db, table, "name=o").await, vec![2, 3]);
    assert_eq!(user_ids(&db, grid_table(), "email=.org").await, vec![2, 3]);
    assert_eq!(user_ids(&db, grid_table(), "age=19").await, vec![2]);
    assert_eq!(user_ids(&db, grid_table(), "created_at=2024-03-20").await, vec![4]);
}

#[tokio::test]
async fn test_user_status_and_active() {
    let db = setup_test_db().await.unwrap();
    assert_eq!(user_ids(&db, grid_table(), "status=verified").await, vec![1, 3]);
    assert_eq!(user_ids(&db, grid_table(), "status=unverified").await, vec![2, 4]);
    assert_eq!(user_ids(&db, grid_table(), "active=active").await, vec![1, 2, 4]);
    assert_eq!(user_ids(&db, grid_table(), "active=inactive").await, vec![3]);
}

#[tokio::test]
async fn test_user_roles() {
    let db = setup_test_db().await.unwrap();
    assert_eq!(user_ids(&db, grid_table(), "role=admin,editor").await, vec![1, 2, 3]);
    assert_eq!(user_ids(&db, grid_table(), "role=editor").await, vec![2, 3]);
    assert_eq!(user_ids(&db, grid_table(), "role=user").await, vec![4]);
    assert_eq!(user_ids(&db, grid_table(), "role[]=user&role[]=admin").await, vec![1, 3, 4]);
}

#[tokio::test]
async fn test_user_role_or_is_top_level() {
    let db = setup_test_db().await.unwrap();

    // (email LIKE '%.com' AND no roles) OR has admin role
    assert_eq!(
        user_ids(&db, grid_table(), "email=.com&role=user,admin").await,
        vec![1, 3, 4]
    );
}

#[tokio::test]
async fn test_single_relation() {
    let db = setup_test_db().await.unwrap();
    let table = FilterTable::new().field(
        "name",
        FieldSpec::new(FieldType::String)
            .relation("teams")
            .input_name("team"),
    );

    assert_eq!(user_ids(&db, table.clone(), "team=red").await, vec![1, 3]);
    assert_eq!(user_ids(&db, table, "team=green").await, Vec::<i32>::new());
}

#[tokio::test]
async fn test_relation_list_ands_with_other_fields() {
    let db = setup_test_db().await.unwrap();
    let table = FilterTable::new()
        .field(
            "email",
            FieldSpec::new(FieldType::String).compare(CompareType::EndsWith),
        )
        .field(
            "name",
            FieldSpec::new(FieldType::String)
                .relations(["roles", "teams"])
                .input_name("group"),
        );

    assert_eq!(user_ids(&db, table.clone(), "group=admin").await, vec![1, 3]);
    assert_eq!(user_ids(&db, table.clone(), "group=blue").await, vec![2]);
    assert_eq!(user_ids(&db, table, "email=.org&group=admin").await, vec![3]);
}

#[tokio::test]
async fn test_pivot_column_through_xref() {
    let db = setup_test_db().await.unwrap();
    let table = FilterTable::new().field(
        "assigned_at",
        FieldSpec::new(FieldType::Date)
            .relation("teams")
            .relation_xref("team_user"),
    );

    assert_eq!(user_ids(&db, table, "assigned_at=2024-06-01").await, vec![2]);
}

#[tokio::test]
async fn test_where_doesnt_have_directly() {
    let db = setup_test_db().await.unwrap();
    let mut query = users_query();
    query.where_doesnt_have("roles");
    query.or_where_has("teams", |q| q.where_eq("name", "blue"));

    let ids: Vec<i32> = user::Entity::find()
        .filter(query.into_condition())
        .order_by_asc(user::Column::Id)
        .all(&db)
        .await
        .unwrap()
        .into_iter()
        .map(|user| user.id)
        .collect();
    assert_eq!(ids, vec![2, 4]);
}

#[tokio::test]
async fn test_unregistered_relation_fails_the_pass() {
    let table = FilterTable::new().field(
        "name",
        FieldSpec::new(FieldType::String).relation("projects"),
    );
    let mut filter = Filter::new(table).with_query(users_query());

    let err = filter
        .filter(&RequestInput::from_query_str("name=x"))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Field 'name' references unknown relation 'projects'"
    );
    assert!(filter.query().unwrap().is_empty());
}
