//! Shared test utilities for Larder.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

use crate::{
    core::{
        ingredient,
        recipe::{self, IngredientAmount, RecipeInput},
        tag,
        user::{self, NewUser},
    },
    entities,
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, prelude::*};

/// Password every fixture user is registered with.
pub const TEST_PASSWORD: &str = "s3cret-pa55word";

/// Image URL attached to fixture recipes. No file backs it.
pub const TEST_IMAGE_URL: &str = "/media/recipes/images/test.png";

/// Routes `tracing` output through the test harness so it shows up only for
/// failing tests. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = crate::config::database::create_connection("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Registers a test user.
///
/// # Defaults
/// * `email`: `{username}@example.com`
/// * `first_name` / `last_name`: "Test" / "User"
/// * `password`: [`TEST_PASSWORD`]
pub async fn create_test_user<C>(db: &C, username: &str) -> Result<entities::user::Model>
where
    C: ConnectionTrait,
{
    user::register(
        db,
        NewUser {
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password: TEST_PASSWORD.to_string(),
        },
    )
    .await
}

/// Adds an ingredient to the catalog.
pub async fn create_test_ingredient<C>(
    db: &C,
    name: &str,
    measurement_unit: &str,
) -> Result<entities::ingredient::Model>
where
    C: ConnectionTrait,
{
    ingredient::create_ingredient(db, name, measurement_unit).await
}

/// Looks up a catalog ingredient by exact name.
pub async fn get_test_ingredient<C>(db: &C, name: &str) -> Result<entities::ingredient::Model>
where
    C: ConnectionTrait,
{
    entities::Ingredient::find()
        .filter(entities::ingredient::Column::Name.eq(name))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Ingredient", name))
}

/// Creates a tag whose name is the slug and whose color is `#336699`.
pub async fn create_test_tag<C>(db: &C, slug: &str) -> Result<entities::tag::Model>
where
    C: ConnectionTrait,
{
    tag::create_tag(db, slug, "#336699", slug).await
}

/// Looks up a tag by slug.
pub async fn get_test_tag<C>(db: &C, slug: &str) -> Result<entities::tag::Model>
where
    C: ConnectionTrait,
{
    tag::get_tag_by_slug(db, slug)
        .await?
        .ok_or_else(|| Error::not_found("Tag", slug))
}

/// Builds a recipe payload.
///
/// # Defaults
/// * `text`: "Mix everything and bake."
/// * `cooking_time`: 30
pub fn recipe_input(name: &str, ingredients: &[(i64, i32)], tags: &[i64]) -> RecipeInput {
    RecipeInput {
        name: name.to_string(),
        text: "Mix everything and bake.".to_string(),
        cooking_time: 30,
        ingredients: ingredients
            .iter()
            .map(|&(id, amount)| IngredientAmount { id, amount })
            .collect(),
        tags: tags.to_vec(),
    }
}

/// Creates a recipe with [`TEST_IMAGE_URL`] as its image.
pub async fn create_test_recipe(
    db: &DatabaseConnection,
    author_id: i64,
    name: &str,
    ingredients: &[(i64, i32)],
    tags: &[i64],
) -> Result<entities::recipe::Model> {
    recipe::create_recipe(
        db,
        author_id,
        recipe_input(name, ingredients, tags),
        TEST_IMAGE_URL.to_string(),
    )
    .await
}

/// Sets up a complete test environment with one recipe.
/// Returns (db, author, recipe) where the recipe is "Bread" by `author`,
/// needing 500 g of flour and tagged `dinner`.
pub async fn setup_with_recipe() -> Result<(
    DatabaseConnection,
    entities::user::Model,
    entities::recipe::Model,
)> {
    let db = setup_test_db().await?;
    let author = create_test_user(&db, "author").await?;
    let flour = create_test_ingredient(&db, "flour", "g").await?;
    let dinner = create_test_tag(&db, "dinner").await?;
    let recipe =
        create_test_recipe(&db, author.id, "Bread", &[(flour.id, 500)], &[dinner.id]).await?;
    Ok((db, author, recipe))
}
