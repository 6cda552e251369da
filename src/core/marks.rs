//! Favorite and shopping cart markers.
//!
//! Both are per-user sets of recipes with the same rules: adding a recipe
//! twice is a conflict, removing one that is not marked is a conflict, and the
//! uniqueness is enforced by the composite primary key of the join table.

use crate::{
    core::recipe::{self, RecipeSummary},
    entities::{Cart, Favorite, cart, favorite},
    errors::{Error, Result},
};
use sea_orm::{QuerySelect, prelude::*};
use std::collections::HashSet;
use tracing::instrument;

/// Which per-user recipe set an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkKind {
    Favorite,
    ShoppingCart,
}

impl MarkKind {
    const fn label(self) -> &'static str {
        match self {
            Self::Favorite => "favorites",
            Self::ShoppingCart => "the shopping cart",
        }
    }
}

/// Marks `recipe_id` for `user_id` and returns the recipe summary.
///
/// # Errors
/// - `Error::NotFound` if the recipe does not exist
/// - `Error::Conflict` if the recipe is already marked
#[instrument(skip(db))]
pub async fn add_mark<C>(
    db: &C,
    kind: MarkKind,
    user_id: i64,
    recipe_id: i64,
) -> Result<RecipeSummary>
where
    C: ConnectionTrait,
{
    let recipe = recipe::require_recipe(db, recipe_id).await?;

    let inserted = match kind {
        MarkKind::Favorite => {
            Favorite::insert(favorite::ActiveModel {
                user_id: sea_orm::Set(user_id),
                recipe_id: sea_orm::Set(recipe_id),
            })
            .exec_without_returning(db)
            .await
        }
        MarkKind::ShoppingCart => {
            Cart::insert(cart::ActiveModel {
                user_id: sea_orm::Set(user_id),
                recipe_id: sea_orm::Set(recipe_id),
            })
            .exec_without_returning(db)
            .await
        }
    };
    inserted.map_err(|e| {
        Error::from_db_unique(e, || {
            Error::conflict(format!("Recipe is already in {}", kind.label()))
        })
    })?;

    Ok(RecipeSummary::from(recipe))
}

/// Unmarks `recipe_id` for `user_id`.
///
/// # Errors
/// - `Error::NotFound` if the recipe does not exist
/// - `Error::Conflict` if the recipe was not marked
#[instrument(skip(db))]
pub async fn remove_mark<C>(db: &C, kind: MarkKind, user_id: i64, recipe_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    recipe::require_recipe(db, recipe_id).await?;

    let result = match kind {
        MarkKind::Favorite => {
            Favorite::delete_many()
                .filter(favorite::Column::UserId.eq(user_id))
                .filter(favorite::Column::RecipeId.eq(recipe_id))
                .exec(db)
                .await?
        }
        MarkKind::ShoppingCart => {
            Cart::delete_many()
                .filter(cart::Column::UserId.eq(user_id))
                .filter(cart::Column::RecipeId.eq(recipe_id))
                .exec(db)
                .await?
        }
    };

    if result.rows_affected == 0 {
        return Err(Error::conflict(format!(
            "Recipe is not in {}",
            kind.label()
        )));
    }
    Ok(())
}

/// Returns which of `recipe_ids` the viewer has marked. Always empty for an
/// anonymous viewer.
pub async fn marked_recipe_ids<C>(
    db: &C,
    kind: MarkKind,
    viewer: Option<i64>,
    recipe_ids: &[i64],
) -> Result<HashSet<i64>>
where
    C: ConnectionTrait,
{
    let Some(user_id) = viewer else {
        return Ok(HashSet::new());
    };
    if recipe_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let ids: Vec<i64> = match kind {
        MarkKind::Favorite => {
            Favorite::find()
                .select_only()
                .column(favorite::Column::RecipeId)
                .filter(favorite::Column::UserId.eq(user_id))
                .filter(favorite::Column::RecipeId.is_in(recipe_ids.iter().copied()))
                .into_tuple()
                .all(db)
                .await?
        }
        MarkKind::ShoppingCart => {
            Cart::find()
                .select_only()
                .column(cart::Column::RecipeId)
                .filter(cart::Column::UserId.eq(user_id))
                .filter(cart::Column::RecipeId.is_in(recipe_ids.iter().copied()))
                .into_tuple()
                .all(db)
                .await?
        }
    };
    Ok(ids.into_iter().collect())
}

/// Ids of every recipe the user has in the shopping cart.
pub async fn cart_recipe_ids<C>(db: &C, user_id: i64) -> Result<Vec<i64>>
where
    C: ConnectionTrait,
{
    Cart::find()
        .select_only()
        .column(cart::Column::RecipeId)
        .filter(cart::Column::UserId.eq(user_id))
        .into_tuple()
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_favorite_twice_conflicts_then_readd_succeeds() -> Result<()> {
        let (db, author, recipe) = setup_with_recipe().await?;

        let summary = add_mark(&db, MarkKind::Favorite, author.id, recipe.id).await?;
        assert_eq!(summary.id, recipe.id);
        assert_eq!(summary.name, recipe.name);

        let again = add_mark(&db, MarkKind::Favorite, author.id, recipe.id).await;
        assert!(matches!(again.unwrap_err(), Error::Conflict { .. }));

        remove_mark(&db, MarkKind::Favorite, author.id, recipe.id).await?;
        add_mark(&db, MarkKind::Favorite, author.id, recipe.id).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_remove_unmarked_recipe_conflicts() -> Result<()> {
        let (db, author, recipe) = setup_with_recipe().await?;

        let result = remove_mark(&db, MarkKind::ShoppingCart, author.id, recipe.id).await;
        assert!(matches!(result.unwrap_err(), Error::Conflict { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_recipe_is_not_found() -> Result<()> {
        let (db, author, _recipe) = setup_with_recipe().await?;

        let result = add_mark(&db, MarkKind::ShoppingCart, author.id, 999).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        let result = remove_mark(&db, MarkKind::Favorite, author.id, 999).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_favorites_and_cart_are_independent() -> Result<()> {
        let (db, author, recipe) = setup_with_recipe().await?;

        add_mark(&db, MarkKind::ShoppingCart, author.id, recipe.id).await?;

        let favorited =
            marked_recipe_ids(&db, MarkKind::Favorite, Some(author.id), &[recipe.id]).await?;
        let in_cart =
            marked_recipe_ids(&db, MarkKind::ShoppingCart, Some(author.id), &[recipe.id]).await?;
        assert!(favorited.is_empty());
        assert!(in_cart.contains(&recipe.id));

        let anonymous = marked_recipe_ids(&db, MarkKind::ShoppingCart, None, &[recipe.id]).await?;
        assert!(anonymous.is_empty());

        assert_eq!(cart_recipe_ids(&db, author.id).await?, vec![recipe.id]);

        Ok(())
    }

    #[tokio::test]
    async fn test_marks_are_per_user() -> Result<()> {
        let (db, author, recipe) = setup_with_recipe().await?;
        let other = create_test_user(&db, "other").await?;

        add_mark(&db, MarkKind::Favorite, author.id, recipe.id).await?;
        add_mark(&db, MarkKind::Favorite, other.id, recipe.id).await?;

        let others =
            marked_recipe_ids(&db, MarkKind::Favorite, Some(other.id), &[recipe.id]).await?;
        assert!(others.contains(&recipe.id));

        Ok(())
    }
}
