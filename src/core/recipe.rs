//! Recipe business logic - The recipe store and its nested representation.
//!
//! A recipe owns its ingredient quantities and tag links. Create and update
//! write the recipe row and both link sets in one transaction, so an unknown
//! ingredient or tag id leaves nothing behind. Reads hydrate a page of recipes
//! with a fixed number of queries regardless of the page size.

use crate::{
    core::{
        filter::RecipeFilter,
        marks::{self, MarkKind},
        user::{self, UserProfile},
    },
    entities::{
        Ingredient, Recipe, RecipeIngredient, RecipeTag, Tag, User, ingredient, recipe,
        recipe_ingredient, recipe_tag, tag, user as user_entity,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, instrument};

const MAX_RECIPE_NAME_LEN: usize = 200;
/// Smallest accepted cooking time or ingredient amount
pub const MIN_QUANTITY: i32 = 1;
/// Largest accepted cooking time or ingredient amount
pub const MAX_QUANTITY: i32 = 5999;

/// One `{id, amount}` entry of a recipe payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IngredientAmount {
    pub id: i64,
    pub amount: i32,
}

/// The writable fields of a recipe, minus the image.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeInput {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub ingredients: Vec<IngredientAmount>,
    pub tags: Vec<i64>,
}

/// Compact representation used by favorites, the cart and subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<recipe::Model> for RecipeSummary {
    fn from(recipe: recipe::Model) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name,
            image: recipe.image,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// An ingredient line of a recipe: catalog entry plus the recipe's amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeIngredientView {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full recipe representation as seen by a particular requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub tags: Vec<tag::Model>,
    pub author: UserProfile,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Result of an update. `replaced_image` is the URL of the image that a new
/// upload superseded, so the caller can drop the stale file.
#[derive(Debug, Clone)]
pub struct UpdatedRecipe {
    pub recipe: recipe::Model,
    pub replaced_image: Option<String>,
}

fn check_quantity(field: &str, value: i32) -> Result<()> {
    if (MIN_QUANTITY..=MAX_QUANTITY).contains(&value) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "{field} must be between {MIN_QUANTITY} and {MAX_QUANTITY}"
        )))
    }
}

/// Checks a recipe payload without touching the database.
///
/// # Errors
/// Returns `Error::Validation` if:
/// - The name is blank or longer than 200 characters, or the text is blank
/// - The cooking time or any amount is outside 1..=5999
/// - There are no ingredients or no tags
/// - An ingredient or tag id appears twice
pub fn validate_input(input: &RecipeInput) -> Result<()> {
    let name = input.name.trim();
    if name.is_empty() || name.chars().count() > MAX_RECIPE_NAME_LEN {
        return Err(Error::validation(
            "Recipe name must be between 1 and 200 characters",
        ));
    }
    if input.text.trim().is_empty() {
        return Err(Error::validation("Recipe text cannot be empty"));
    }
    check_quantity("cooking_time", input.cooking_time)?;

    if input.ingredients.is_empty() {
        return Err(Error::validation("A recipe needs at least one ingredient"));
    }
    let mut seen = HashSet::new();
    for line in &input.ingredients {
        check_quantity("amount", line.amount)?;
        if !seen.insert(line.id) {
            return Err(Error::validation(format!(
                "Ingredient {} is listed more than once",
                line.id
            )));
        }
    }

    if input.tags.is_empty() {
        return Err(Error::validation("A recipe needs at least one tag"));
    }
    let mut seen = HashSet::new();
    if let Some(dup) = input.tags.iter().find(|id| !seen.insert(**id)) {
        return Err(Error::validation(format!("Tag {dup} is listed more than once")));
    }

    Ok(())
}

/// Writes the ingredient and tag links of `recipe_id`.
///
/// Every referenced id must exist; the first unknown one is reported as
/// `Error::NotFound`.
async fn write_composition<C>(db: &C, recipe_id: i64, input: &RecipeInput) -> Result<()>
where
    C: ConnectionTrait,
{
    let ingredient_ids: Vec<i64> = input.ingredients.iter().map(|line| line.id).collect();
    let known: HashSet<i64> = Ingredient::find()
        .select_only()
        .column(ingredient::Column::Id)
        .filter(ingredient::Column::Id.is_in(ingredient_ids.iter().copied()))
        .into_tuple::<i64>()
        .all(db)
        .await?
        .into_iter()
        .collect();
    if let Some(missing) = ingredient_ids.iter().find(|id| !known.contains(id)) {
        return Err(Error::not_found("Ingredient", missing));
    }

    let known: HashSet<i64> = Tag::find()
        .select_only()
        .column(tag::Column::Id)
        .filter(tag::Column::Id.is_in(input.tags.iter().copied()))
        .into_tuple::<i64>()
        .all(db)
        .await?
        .into_iter()
        .collect();
    if let Some(missing) = input.tags.iter().find(|id| !known.contains(id)) {
        return Err(Error::not_found("Tag", missing));
    }

    RecipeIngredient::insert_many(input.ingredients.iter().map(|line| {
        recipe_ingredient::ActiveModel {
            recipe_id: Set(recipe_id),
            ingredient_id: Set(line.id),
            amount: Set(line.amount),
        }
    }))
    .exec_without_returning(db)
    .await?;

    RecipeTag::insert_many(input.tags.iter().map(|tag_id| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(*tag_id),
    }))
    .exec_without_returning(db)
    .await?;

    debug!(
        "Linked recipe {recipe_id} to {} ingredients and {} tags",
        input.ingredients.len(),
        input.tags.len()
    );
    Ok(())
}

/// Creates a recipe with its full ingredient and tag sets.
///
/// `image` is the public URL of an already stored image.
///
/// # Errors
/// Returns an error if:
/// - The payload fails [`validate_input`]
/// - An ingredient or tag id does not exist (`Error::NotFound`); nothing is persisted
#[instrument(skip(db, input, image), fields(name = %input.name))]
pub async fn create_recipe(
    db: &DatabaseConnection,
    author_id: i64,
    input: RecipeInput,
    image: String,
) -> Result<recipe::Model> {
    validate_input(&input)?;

    let txn = db.begin().await?;

    let recipe = recipe::ActiveModel {
        author_id: Set(author_id),
        name: Set(input.name.trim().to_string()),
        text: Set(input.text.clone()),
        image: Set(image),
        cooking_time: Set(input.cooking_time),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    write_composition(&txn, recipe.id, &input).await?;

    txn.commit().await?;

    info!("Created recipe {} for author {author_id}", recipe.id);
    Ok(recipe)
}

/// Replaces a recipe's fields and both link sets.
///
/// The image is kept unless a new one is supplied.
///
/// # Errors
/// Returns an error if:
/// - The payload fails [`validate_input`]
/// - The recipe does not exist (`Error::NotFound`)
/// - `editor_id` is not the author (`Error::Forbidden`)
/// - An ingredient or tag id does not exist (`Error::NotFound`); nothing changes
#[instrument(skip(db, input, image))]
pub async fn update_recipe(
    db: &DatabaseConnection,
    recipe_id: i64,
    editor_id: i64,
    input: RecipeInput,
    image: Option<String>,
) -> Result<UpdatedRecipe> {
    validate_input(&input)?;

    let txn = db.begin().await?;

    let existing = require_recipe(&txn, recipe_id).await?;
    if existing.author_id != editor_id {
        return Err(Error::Forbidden);
    }

    let previous_image = existing.image.clone();
    let mut active: recipe::ActiveModel = existing.into();
    active.name = Set(input.name.trim().to_string());
    active.text = Set(input.text.clone());
    active.cooking_time = Set(input.cooking_time);
    let replaced_image = match image {
        Some(url) => {
            active.image = Set(url);
            Some(previous_image)
        }
        None => None,
    };
    let recipe = active.update(&txn).await?;

    RecipeIngredient::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    RecipeTag::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    write_composition(&txn, recipe_id, &input).await?;

    txn.commit().await?;

    info!("Updated recipe {recipe_id}");
    Ok(UpdatedRecipe {
        recipe,
        replaced_image,
    })
}

/// Deletes a recipe and returns the removed row.
///
/// Quantity rows, tag links, favorites and cart entries go with it through the
/// foreign key cascade; catalog entries are untouched.
///
/// # Errors
/// - `Error::NotFound` if the recipe does not exist
/// - `Error::Forbidden` if `editor_id` is not the author
#[instrument(skip(db))]
pub async fn delete_recipe<C>(db: &C, recipe_id: i64, editor_id: i64) -> Result<recipe::Model>
where
    C: ConnectionTrait,
{
    let recipe = require_recipe(db, recipe_id).await?;
    if recipe.author_id != editor_id {
        return Err(Error::Forbidden);
    }

    Recipe::delete_by_id(recipe_id).exec(db).await?;
    info!("Deleted recipe {recipe_id}");
    Ok(recipe)
}

/// Retrieves a specific recipe by its unique ID.
pub async fn get_recipe<C>(db: &C, recipe_id: i64) -> Result<Option<recipe::Model>>
where
    C: ConnectionTrait,
{
    Recipe::find_by_id(recipe_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Like [`get_recipe`], but a missing recipe is an `Error::NotFound`.
pub async fn require_recipe<C>(db: &C, recipe_id: i64) -> Result<recipe::Model>
where
    C: ConnectionTrait,
{
    get_recipe(db, recipe_id)
        .await?
        .ok_or_else(|| Error::not_found("Recipe", recipe_id))
}

/// Lists recipes matching `filter`, newest first, as seen by `viewer`.
///
/// # Errors
/// Returns `Error::AuthorizationRequired` when an identity-scoped flag is set
/// without a viewer.
pub async fn list_recipes<C>(
    db: &C,
    filter: &RecipeFilter,
    viewer: Option<i64>,
) -> Result<Vec<RecipeDetail>>
where
    C: ConnectionTrait,
{
    let recipes = filter
        .select(viewer)?
        .order_by_desc(recipe::Column::Id)
        .all(db)
        .await?;
    debug!("Recipe filter matched {} recipes", recipes.len());
    hydrate(db, viewer, recipes).await
}

/// Builds the full representation of one recipe.
pub async fn recipe_detail<C>(
    db: &C,
    recipe: recipe::Model,
    viewer: Option<i64>,
) -> Result<RecipeDetail>
where
    C: ConnectionTrait,
{
    let recipe_id = recipe.id;
    hydrate(db, viewer, vec![recipe])
        .await?
        .pop()
        .ok_or_else(|| Error::not_found("Recipe", recipe_id))
}

/// Expands recipes into their nested representation, preserving order.
async fn hydrate<C>(
    db: &C,
    viewer: Option<i64>,
    recipes: Vec<recipe::Model>,
) -> Result<Vec<RecipeDetail>>
where
    C: ConnectionTrait,
{
    if recipes.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();

    let mut ingredients: HashMap<i64, Vec<RecipeIngredientView>> = HashMap::new();
    for (line, catalog) in RecipeIngredient::find()
        .filter(recipe_ingredient::Column::RecipeId.is_in(ids.iter().copied()))
        .find_also_related(Ingredient)
        .order_by_asc(ingredient::Column::Name)
        .all(db)
        .await?
    {
        let Some(catalog) = catalog else { continue };
        ingredients
            .entry(line.recipe_id)
            .or_default()
            .push(RecipeIngredientView {
                id: catalog.id,
                name: catalog.name,
                measurement_unit: catalog.measurement_unit,
                amount: line.amount,
            });
    }

    let mut tags: HashMap<i64, Vec<tag::Model>> = HashMap::new();
    for (link, tag) in RecipeTag::find()
        .filter(recipe_tag::Column::RecipeId.is_in(ids.iter().copied()))
        .find_also_related(Tag)
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await?
    {
        if let Some(tag) = tag {
            tags.entry(link.recipe_id).or_default().push(tag);
        }
    }

    let author_ids: HashSet<i64> = recipes.iter().map(|r| r.author_id).collect();
    let authors = User::find()
        .filter(user_entity::Column::Id.is_in(author_ids))
        .all(db)
        .await?;
    let authors: HashMap<i64, UserProfile> = user::profiles(db, viewer, authors)
        .await?
        .into_iter()
        .map(|profile| (profile.id, profile))
        .collect();

    let favorited = marks::marked_recipe_ids(db, MarkKind::Favorite, viewer, &ids).await?;
    let in_cart = marks::marked_recipe_ids(db, MarkKind::ShoppingCart, viewer, &ids).await?;

    recipes
        .into_iter()
        .map(|recipe| {
            let author = authors
                .get(&recipe.author_id)
                .cloned()
                .ok_or_else(|| Error::not_found("User", recipe.author_id))?;
            Ok(RecipeDetail {
                id: recipe.id,
                tags: tags.remove(&recipe.id).unwrap_or_default(),
                author,
                ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                name: recipe.name,
                image: recipe.image,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            })
        })
        .collect()
}
