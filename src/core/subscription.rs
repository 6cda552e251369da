//! Subscription business logic - Following authors.

use crate::{
    core::{
        recipe::RecipeSummary,
        user::{self, UserProfile},
    },
    entities::{Recipe, Subscription, User, recipe, subscription, user as user_entity},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, QuerySelect, Set, prelude::*};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// A followed author with a preview of their recipes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionView {
    #[serde(flatten)]
    pub author: UserProfile,
    pub recipes: Vec<RecipeSummary>,
    pub recipes_count: u64,
}

/// Checks a recipe preview size before it reaches a `LIMIT` clause, which
/// the store binds as a signed 64-bit integer.
///
/// # Errors
/// Returns `Error::Validation` if `recipes_limit` exceeds `i64::MAX`.
pub fn check_recipes_limit(recipes_limit: u64) -> Result<()> {
    if i64::try_from(recipes_limit).is_err() {
        return Err(Error::validation(format!(
            "recipes_limit must not exceed {}",
            i64::MAX
        )));
    }
    Ok(())
}

async fn subscription_view<C>(
    db: &C,
    author: user_entity::Model,
    recipes_limit: u64,
) -> Result<SubscriptionView>
where
    C: ConnectionTrait,
{
    let recipes_count = Recipe::find()
        .filter(recipe::Column::AuthorId.eq(author.id))
        .count(db)
        .await?;
    let recipes = Recipe::find()
        .filter(recipe::Column::AuthorId.eq(author.id))
        .order_by_desc(recipe::Column::Id)
        .limit(recipes_limit)
        .all(db)
        .await?;

    Ok(SubscriptionView {
        author: UserProfile::new(author, true),
        recipes: recipes.into_iter().map(RecipeSummary::from).collect(),
        recipes_count,
    })
}

/// Makes `user_id` follow `author_id`.
///
/// # Errors
/// - `Error::Validation` if `recipes_limit` is out of range, before anything
///   is written
/// - `Error::NotFound` if the author does not exist
/// - `Error::Validation` when following oneself or an author already followed
#[instrument(skip(db))]
pub async fn subscribe<C>(
    db: &C,
    user_id: i64,
    author_id: i64,
    recipes_limit: u64,
) -> Result<SubscriptionView>
where
    C: ConnectionTrait,
{
    check_recipes_limit(recipes_limit)?;
    let author = user::require_user(db, author_id).await?;
    if user_id == author_id {
        return Err(Error::validation("You cannot subscribe to yourself"));
    }

    Subscription::insert(subscription::ActiveModel {
        user_id: Set(user_id),
        author_id: Set(author_id),
        created_at: Set(chrono::Utc::now().naive_utc()),
    })
    .exec_without_returning(db)
    .await
    .map_err(|e| {
        Error::from_db_unique(e, || {
            Error::validation("You are already subscribed to this author")
        })
    })?;

    info!("User {user_id} subscribed to {author_id}");
    subscription_view(db, author, recipes_limit).await
}

/// Stops `user_id` following `author_id`. Not following is not an error.
///
/// # Errors
/// Returns `Error::NotFound` if the author does not exist.
#[instrument(skip(db))]
pub async fn unsubscribe<C>(db: &C, user_id: i64, author_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    user::require_user(db, author_id).await?;

    let result = Subscription::delete_many()
        .filter(subscription::Column::UserId.eq(user_id))
        .filter(subscription::Column::AuthorId.eq(author_id))
        .exec(db)
        .await?;
    debug!(
        "Unsubscribe {user_id} from {author_id} removed {} rows",
        result.rows_affected
    );
    Ok(())
}

/// Lists every author `user_id` follows, newest subscription first.
pub async fn list_subscriptions<C>(
    db: &C,
    user_id: i64,
    recipes_limit: u64,
) -> Result<Vec<SubscriptionView>>
where
    C: ConnectionTrait,
{
    check_recipes_limit(recipes_limit)?;
    let author_ids: Vec<i64> = Subscription::find()
        .select_only()
        .column(subscription::Column::AuthorId)
        .filter(subscription::Column::UserId.eq(user_id))
        .order_by_desc(subscription::Column::CreatedAt)
        .order_by_desc(subscription::Column::AuthorId)
        .into_tuple()
        .all(db)
        .await?;

    let mut authors: HashMap<i64, user_entity::Model> = User::find()
        .filter(user_entity::Column::Id.is_in(author_ids.iter().copied()))
        .all(db)
        .await?
        .into_iter()
        .map(|author| (author.id, author))
        .collect();

    let mut views = Vec::with_capacity(author_ids.len());
    for author_id in author_ids {
        if let Some(author) = authors.remove(&author_id) {
            views.push(subscription_view(db, author, recipes_limit).await?);
        }
    }
    Ok(views)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_subscribe_to_self_fails() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "narcissus").await?;

        let result = subscribe(&db, user.id, user.id, 3).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_subscribe_twice_fails_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let reader = create_test_user(&db, "reader").await?;
        let author = create_test_user(&db, "author").await?;

        let view = subscribe(&db, reader.id, author.id, 3).await?;
        assert!(view.author.is_subscribed);
        assert_eq!(view.recipes_count, 0);

        let result = subscribe(&db, reader.id, author.id, 3).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_author_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;
        let reader = create_test_user(&db, "reader").await?;

        let result = subscribe(&db, reader.id, 999, 3).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        let result = unsubscribe(&db, reader.id, 999).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let reader = create_test_user(&db, "reader").await?;
        let author = create_test_user(&db, "author").await?;

        subscribe(&db, reader.id, author.id, 3).await?;
        unsubscribe(&db, reader.id, author.id).await?;
        unsubscribe(&db, reader.id, author.id).await?;

        assert!(list_subscriptions(&db, reader.id, 3).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_preview_is_bounded_and_newest_first() -> Result<()> {
        let (db, author, first) = setup_with_recipe().await?;
        let reader = create_test_user(&db, "reader").await?;
        let flour = get_test_ingredient(&db, "flour").await?;
        let dinner = get_test_tag(&db, "dinner").await?;
        let second =
            create_test_recipe(&db, author.id, "Rolls", &[(flour.id, 1)], &[dinner.id]).await?;
        let third =
            create_test_recipe(&db, author.id, "Buns", &[(flour.id, 1)], &[dinner.id]).await?;

        let view = subscribe(&db, reader.id, author.id, 2).await?;
        assert_eq!(view.recipes_count, 3);
        let preview: Vec<i64> = view.recipes.iter().map(|r| r.id).collect();
        assert_eq!(preview, vec![third.id, second.id]);
        assert!(!preview.contains(&first.id));

        Ok(())
    }

    #[tokio::test]
    async fn test_oversized_preview_limit_is_rejected_before_writing() -> Result<()> {
        let (db, author, _) = setup_with_recipe().await?;
        let reader = create_test_user(&db, "reader").await?;

        let result = subscribe(&db, reader.id, author.id, u64::MAX).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        assert_eq!(Subscription::find().count(&db).await?, 0);

        let result = list_subscriptions(&db, reader.id, u64::MAX).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        // The largest bindable limit still works
        let largest = u64::try_from(i64::MAX).unwrap();
        let view = subscribe(&db, reader.id, author.id, largest).await?;
        assert_eq!(view.recipes.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_list_subscriptions_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let reader = create_test_user(&db, "reader").await?;
        let older = create_test_user(&db, "older").await?;
        let newer = create_test_user(&db, "newer").await?;

        subscribe(&db, reader.id, older.id, 3).await?;
        subscribe(&db, reader.id, newer.id, 3).await?;

        let listed = list_subscriptions(&db, reader.id, 3).await?;
        let ids: Vec<i64> = listed.iter().map(|v| v.author.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        assert!(listed.iter().all(|v| v.author.is_subscribed));

        Ok(())
    }
}
