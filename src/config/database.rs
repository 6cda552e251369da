//! Database configuration module.
//!
//! This module handles the `SQLite` connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. Every statement is `IF NOT EXISTS`, which makes startup idempotent
//! against an existing database file.

use crate::entities::{
    AuthToken, Cart, Favorite, Ingredient, Recipe, RecipeIngredient, RecipeTag, Subscription, Tag,
    User, ingredient,
};
use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, sea_query::Index,
};
use tracing::{debug, info, instrument};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/larder.sqlite?mode=rwc";

/// Gets the database URL from the environment or returns the default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Opens a connection pool for `database_url` with foreign keys enforced.
///
/// Cascading deletes of recipe join rows rely on `SQLite` foreign key support,
/// so the pragma is issued explicitly rather than trusting driver defaults.
#[instrument]
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to {}", database_url);
    let db = Database::connect(database_url).await?;
    db.execute_unprepared("PRAGMA foreign_keys = ON;").await?;
    Ok(db)
}

async fn create_entity_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(builder.build(&index)).await?;
    }

    Ok(())
}

/// Creates all tables and indexes.
///
/// Parents are created before the join tables that reference them. The
/// ingredient (`name`, `measurement_unit`) uniqueness spans two columns and is
/// added as a separate unique index.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_entity_table(db, &schema, User).await?;
    create_entity_table(db, &schema, AuthToken).await?;
    create_entity_table(db, &schema, Tag).await?;
    create_entity_table(db, &schema, Ingredient).await?;
    create_entity_table(db, &schema, Recipe).await?;
    create_entity_table(db, &schema, RecipeIngredient).await?;
    create_entity_table(db, &schema, RecipeTag).await?;
    create_entity_table(db, &schema, Favorite).await?;
    create_entity_table(db, &schema, Cart).await?;
    create_entity_table(db, &schema, Subscription).await?;

    let ingredient_unique = Index::create()
        .name("idx_ingredients_name_unit_unique")
        .table(Ingredient)
        .col(ingredient::Column::Name)
        .col(ingredient::Column::MeasurementUnit)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&ingredient_unique)).await?;

    info!("Database tables ensured.");
    Ok(())
}
