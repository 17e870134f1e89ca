#![allow(dead_code)]

use datagrid::{ConditionQuery, RelationDef};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};
use sea_orm_migration::prelude::*;

pub mod user {
    use sea_orm::entity::prelude::*;
    use serde::Serialize;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub name: String,
        pub email: String,
        pub age: i32,
        pub active: i32,
        pub email_verified_at: Option<String>,
        pub created_at: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod role {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "roles")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub user_id: i32,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod team {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "teams")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub mod team_user {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "team_user")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i32,
        pub team_id: i32,
        pub user_id: i32,
        pub assigned_at: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateGridTables)]
    }
}

pub struct CreateGridTables;

impl MigrationName for CreateGridTables {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_grid_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateGridTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());
        manager
            .create_table(schema.create_table_from_entity(user::Entity))
            .await?;
        manager
            .create_table(schema.create_table_from_entity(role::Entity))
            .await?;
        manager
            .create_table(schema.create_table_from_entity(team::Entity))
            .await?;
        manager
            .create_table(schema.create_table_from_entity(team_user::Entity))
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in ["team_user", "teams", "roles", "users"] {
            manager
                .drop_table(Table::drop().table(Alias::new(table)).to_owned())
                .await?;
        }
        Ok(())
    }
}

/// Log to the test writer, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Users 1-4 (alice, bob, carol, dave).
///
/// - roles: alice admin, bob editor, carol admin + editor, dave none
/// - teams: red = {alice, carol}, blue = {bob}
/// - verified: alice, carol; inactive: carol
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    init_tracing();
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;

    let seed = [
        "INSERT INTO users (id, name, email, age, active, email_verified_at, created_at) VALUES \
            (1, 'alice', 'alice@example.com', 34, 1, '2024-01-10', '2024-01-05'), \
            (2, 'bob', 'bob@example.org', 19, 1, NULL, '2024-02-11'), \
            (3, 'carol', 'carol@example.org', 45, 0, '2024-03-01', '2024-03-15'), \
            (4, 'dave', 'dave@example.com', 27, 1, NULL, '2024-03-20')",
        "INSERT INTO roles (id, user_id, name) VALUES \
            (1, 1, 'admin'), (2, 2, 'editor'), (3, 3, 'admin'), (4, 3, 'editor')",
        "INSERT INTO teams (id, name) VALUES (1, 'red'), (2, 'blue')",
        "INSERT INTO team_user (id, team_id, user_id, assigned_at) VALUES \
            (1, 1, 1, '2024-05-01'), (2, 2, 2, '2024-06-01'), (3, 1, 3, '2024-06-02')",
    ];
    for statement in seed {
        db.execute_unprepared(statement).await?;
    }

    Ok(db)
}

/// Condition query over `users` with the `roles` and `teams` relations registered.
pub fn users_query() -> ConditionQuery {
    ConditionQuery::new("users")
        .relation("roles", RelationDef::has_many("roles", "user_id"))
        .relation(
            "teams",
            RelationDef::many_to_many("teams", "team_user", "user_id", "team_id"),
        )
}
