#![allow(dead_code)]

use axum::{Router, body::Body, http::Request};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr};
use sea_orm_migration::prelude::*;
use serde_json::Value as JsonValue;
use tower::ServiceExt;

use gridcrate::{GridConfig, GridState, routes::grid_router};

/// Users seeded by [`setup_test_db`]: `(id, name, email, active, role_id)`.
pub const USERS: [(i32, &str, &str, bool, i32); 3] = [
    (1, "John", "j@x", true, 1),
    (2, "Joana", "jo@y", true, 2),
    (3, "Bob", "b@z", false, 1),
];

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    // Run migrations
    Migrator::up(&db, None).await?;
    seed(&db).await?;

    Ok(db)
}

async fn seed(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();

    let roles = Query::insert()
        .into_table(RoleEntity)
        .columns([RoleColumn::Id, RoleColumn::Name])
        .values_panic([1.into(), "admin".into()])
        .values_panic([2.into(), "editor".into()])
        .to_owned();
    db.execute(backend.build(&roles)).await?;

    let mut users = Query::insert()
        .into_table(UserEntity)
        .columns([
            UserColumn::Id,
            UserColumn::Name,
            UserColumn::Email,
            UserColumn::Active,
            UserColumn::RoleId,
        ])
        .to_owned();
    for (id, name, email, active, role_id) in USERS {
        users.values_panic([
            id.into(),
            name.into(),
            email.into(),
            active.into(),
            role_id.into(),
        ]);
    }
    db.execute(backend.build(&users)).await?;

    Ok(())
}

pub fn setup_test_app(config: GridConfig, db: DatabaseConnection) -> Router {
    Router::new().nest("/api/v1/users/grid", grid_router(GridState::new(config, db)))
}

/// Send `request` through `app`, returning the status and the JSON body.
pub async fn send(app: Router, request: Request<Body>) -> (axum::http::StatusCode, JsonValue) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(JsonValue::Null);
    (status, json)
}

/// Install a test-writer subscriber once; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateRoleTable), Box::new(CreateUserTable)]
    }
}

pub struct CreateRoleTable;

#[async_trait::async_trait]
impl MigrationName for CreateRoleTable {
    fn name(&self) -> &'static str {
        "m20240101_000001_create_role_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateRoleTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(RoleEntity)
            .if_not_exists()
            .col(ColumnDef::new(RoleColumn::Id).integer().not_null().primary_key())
            .col(ColumnDef::new(RoleColumn::Name).string().not_null())
            .to_owned();

        manager.create_table(table).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RoleEntity).to_owned())
            .await?;
        Ok(())
    }
}

pub struct CreateUserTable;

#[async_trait::async_trait]
impl MigrationName for CreateUserTable {
    fn name(&self) -> &'static str {
        "m20240101_000002_create_user_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for CreateUserTable {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let table = Table::create()
            .table(UserEntity)
            .if_not_exists()
            .col(ColumnDef::new(UserColumn::Id).integer().not_null().primary_key())
            .col(ColumnDef::new(UserColumn::Name).string().not_null())
            .col(ColumnDef::new(UserColumn::Email).string().not_null())
            .col(
                ColumnDef::new(UserColumn::Active)
                    .boolean()
                    .not_null()
                    .default(true),
            )
            .col(ColumnDef::new(UserColumn::RoleId).integer().not_null())
            .to_owned();

        manager.create_table(table).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserEntity).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(Debug)]
pub enum UserColumn {
    Id,
    Name,
    Email,
    Active,
    RoleId,
}

impl Iden for UserColumn {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(
            s,
            "{}",
            match self {
                Self::Id => "id",
                Self::Name => "name",
                Self::Email => "email",
                Self::Active => "active",
                Self::RoleId => "role_id",
            }
        )
        .unwrap();
    }
}

#[derive(Debug)]
pub struct UserEntity;

impl Iden for UserEntity {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "users").unwrap();
    }
}

#[derive(Debug)]
pub enum RoleColumn {
    Id,
    Name,
}

impl Iden for RoleColumn {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(
            s,
            "{}",
            match self {
                Self::Id => "id",
                Self::Name => "name",
            }
        )
        .unwrap();
    }
}

#[derive(Debug)]
pub struct RoleEntity;

impl Iden for RoleEntity {
    fn unquoted(&self, s: &mut dyn std::fmt::Write) {
        write!(s, "roles").unwrap();
    }
}
