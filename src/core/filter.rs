//! Recipe filter - Narrows recipe listings by query parameters.
//!
//! Every supplied predicate must hold. Tag slugs are OR-matched among
//! themselves. The favorite and cart flags only filter when true, and then
//! need a requester to scope them to.

use crate::{
    entities::{Cart, Favorite, Recipe, RecipeTag, Tag, cart, favorite, recipe, recipe_tag, tag},
    errors::{Error, Result},
};
use sea_orm::{QuerySelect, QueryTrait, prelude::*};

/// Query parameters accepted by the recipe listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    /// Only recipes by this author
    pub author: Option<i64>,
    /// Only recipes carrying at least one of these tag slugs
    pub tags: Vec<String>,
    /// Only recipes the requester has favorited
    pub is_favorited: bool,
    /// Only recipes in the requester's shopping cart
    pub is_in_shopping_cart: bool,
}

impl RecipeFilter {
    /// Builds the recipe query for `viewer`.
    ///
    /// # Errors
    /// Returns `Error::AuthorizationRequired` if `is_favorited` or
    /// `is_in_shopping_cart` is set and there is no viewer.
    pub fn select(&self, viewer: Option<i64>) -> Result<Select<Recipe>> {
        let mut query = Recipe::find();

        if let Some(author) = self.author {
            query = query.filter(recipe::Column::AuthorId.eq(author));
        }

        if !self.tags.is_empty() {
            let tagged = RecipeTag::find()
                .select_only()
                .column(recipe_tag::Column::RecipeId)
                .inner_join(Tag)
                .filter(tag::Column::Slug.is_in(self.tags.iter().cloned()))
                .into_query();
            query = query.filter(recipe::Column::Id.in_subquery(tagged));
        }

        if self.is_favorited {
            let user_id = viewer.ok_or(Error::AuthorizationRequired)?;
            let favorites = Favorite::find()
                .select_only()
                .column(favorite::Column::RecipeId)
                .filter(favorite::Column::UserId.eq(user_id))
                .into_query();
            query = query.filter(recipe::Column::Id.in_subquery(favorites));
        }

        if self.is_in_shopping_cart {
            let user_id = viewer.ok_or(Error::AuthorizationRequired)?;
            let cart = Cart::find()
                .select_only()
                .column(cart::Column::RecipeId)
                .filter(cart::Column::UserId.eq(user_id))
                .into_query();
            query = query.filter(recipe::Column::Id.in_subquery(cart));
        }

        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{
            marks::{self, MarkKind},
            recipe::list_recipes,
        },
        test_utils::*,
    };

    fn ids(details: &[crate::core::recipe::RecipeDetail]) -> Vec<i64> {
        details.iter().map(|d| d.id).collect()
    }

    #[tokio::test]
    async fn test_no_parameters_lists_everything_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let author = create_test_user(&db, "author").await?;
        let flour = create_test_ingredient(&db, "flour", "g").await?;
        let dinner = create_test_tag(&db, "dinner").await?;
        let first =
            create_test_recipe(&db, author.id, "First", &[(flour.id, 1)], &[dinner.id]).await?;
        let second =
            create_test_recipe(&db, author.id, "Second", &[(flour.id, 1)], &[dinner.id]).await?;

        let all = list_recipes(&db, &RecipeFilter::default(), None).await?;
        assert_eq!(ids(&all), vec![second.id, first.id]);

        Ok(())
    }

    #[tokio::test]
    async fn test_author_and_tags_combine_with_and() -> Result<()> {
        let db = setup_test_db().await?;
        let alice = create_test_user(&db, "alice").await?;
        let bob = create_test_user(&db, "bob").await?;
        let flour = create_test_ingredient(&db, "flour", "g").await?;
        let breakfast = create_test_tag(&db, "breakfast").await?;
        let lunch = create_test_tag(&db, "lunch").await?;
        let dinner = create_test_tag(&db, "dinner").await?;

        let pancakes =
            create_test_recipe(&db, alice.id, "Pancakes", &[(flour.id, 1)], &[breakfast.id])
                .await?;
        let sandwich =
            create_test_recipe(&db, alice.id, "Sandwich", &[(flour.id, 1)], &[lunch.id]).await?;
        let _stew =
            create_test_recipe(&db, alice.id, "Stew", &[(flour.id, 1)], &[dinner.id]).await?;
        let bobs = create_test_recipe(
            &db,
            bob.id,
            "Bob's toast",
            &[(flour.id, 1)],
            &[breakfast.id, lunch.id],
        )
        .await?;

        // Tags are OR-matched
        let filter = RecipeFilter {
            tags: vec!["breakfast".to_string(), "lunch".to_string()],
            ..Default::default()
        };
        let found = list_recipes(&db, &filter, None).await?;
        assert_eq!(ids(&found), vec![bobs.id, sandwich.id, pancakes.id]);

        // Author narrows the tag match further
        let filter = RecipeFilter {
            author: Some(alice.id),
            tags: vec!["breakfast".to_string(), "lunch".to_string()],
            ..Default::default()
        };
        let found = list_recipes(&db, &filter, None).await?;
        assert_eq!(ids(&found), vec![sandwich.id, pancakes.id]);

        let unknown_slug = RecipeFilter {
            tags: vec!["brunch".to_string()],
            ..Default::default()
        };
        assert!(list_recipes(&db, &unknown_slug, None).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_identity_scoped_flags() -> Result<()> {
        let (db, author, recipe) = setup_with_recipe().await?;
        let flour = get_test_ingredient(&db, "flour").await?;
        let dinner = get_test_tag(&db, "dinner").await?;
        let other =
            create_test_recipe(&db, author.id, "Rolls", &[(flour.id, 100)], &[dinner.id]).await?;
        marks::add_mark(&db, MarkKind::Favorite, author.id, recipe.id).await?;
        marks::add_mark(&db, MarkKind::ShoppingCart, author.id, other.id).await?;

        let favorites = RecipeFilter {
            is_favorited: true,
            ..Default::default()
        };
        let found = list_recipes(&db, &favorites, Some(author.id)).await?;
        assert_eq!(ids(&found), vec![recipe.id]);
        assert!(found[0].is_favorited);

        let cart = RecipeFilter {
            is_in_shopping_cart: true,
            ..Default::default()
        };
        let found = list_recipes(&db, &cart, Some(author.id)).await?;
        assert_eq!(ids(&found), vec![other.id]);
        assert!(found[0].is_in_shopping_cart);

        let result = list_recipes(&db, &favorites, None).await;
        assert!(matches!(result.unwrap_err(), Error::AuthorizationRequired));

        Ok(())
    }
}
