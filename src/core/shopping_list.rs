//! Shopping list aggregation.
//!
//! Quantities are summed per (ingredient name, measurement unit) across every
//! recipe in the user's cart, so "flour (g)" from two recipes becomes one line
//! while "milk (ml)" and "milk (cup)" stay apart.

use crate::{
    core::marks,
    entities::{Ingredient, RecipeIngredient, ingredient, recipe_ingredient, user},
    errors::{Error, Result},
};
use chrono::{Datelike, NaiveDate};
use sea_orm::{FromQueryResult, QueryOrder, QuerySelect, prelude::*, sea_query::Expr};
use tracing::{debug, instrument};

/// One aggregated line of the shopping list.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// A rendered list ready to be sent as a file.
#[derive(Debug, Clone)]
pub struct ShoppingList {
    pub filename: String,
    pub content: String,
}

/// Sums ingredient amounts over the user's cart, ordered by name then unit.
///
/// # Errors
/// Returns `Error::Validation` if the cart is empty.
pub async fn collect_items<C>(db: &C, user_id: i64) -> Result<Vec<ShoppingItem>>
where
    C: ConnectionTrait,
{
    let recipe_ids = marks::cart_recipe_ids(db, user_id).await?;
    if recipe_ids.is_empty() {
        return Err(Error::validation("Shopping cart is empty"));
    }

    let items = RecipeIngredient::find()
        .select_only()
        .column_as(ingredient::Column::Name, "name")
        .column_as(ingredient::Column::MeasurementUnit, "measurement_unit")
        .column_as(
            Expr::col((RecipeIngredient, recipe_ingredient::Column::Amount)).sum(),
            "total",
        )
        .inner_join(Ingredient)
        .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids))
        .group_by(ingredient::Column::Name)
        .group_by(ingredient::Column::MeasurementUnit)
        .order_by_asc(ingredient::Column::Name)
        .order_by_asc(ingredient::Column::MeasurementUnit)
        .into_model::<ShoppingItem>()
        .all(db)
        .await?;

    debug!("Shopping list for user {user_id} has {} lines", items.len());
    Ok(items)
}

fn display_name(user: &user::Model) -> String {
    let full = format!("{} {}", user.first_name.trim(), user.last_name.trim());
    let full = full.trim();
    if full.is_empty() {
        user.username.clone()
    } else {
        full.to_string()
    }
}

/// Renders the plain text report.
#[must_use]
pub fn render(user: &user::Model, items: &[ShoppingItem], date: NaiveDate) -> String {
    let mut out = format!(
        "Shopping list for: {}\nDate: {}\n\n",
        display_name(user),
        date.format("%Y-%m-%d")
    );
    for item in items {
        out.push_str(&format!(
            "- {} ({}) - {}\n",
            item.name, item.measurement_unit, item.total
        ));
    }
    out.push_str(&format!("\nLarder ({})\n", date.year()));
    out
}

/// Builds the downloadable shopping list for `user`.
///
/// # Errors
/// Returns `Error::Validation` if the cart is empty.
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn build_shopping_list<C>(db: &C, user: &user::Model) -> Result<ShoppingList>
where
    C: ConnectionTrait,
{
    let items = collect_items(db, user.id).await?;
    Ok(ShoppingList {
        filename: format!("{}_shopping_list.txt", user.username),
        content: render(user, &items, chrono::Utc::now().date_naive()),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::marks::{MarkKind, add_mark},
        test_utils::*,
    };

    #[tokio::test]
    async fn test_sums_across_cart_recipes() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "cook").await?;
        let flour = create_test_ingredient(&db, "flour", "g").await?;
        let eggs = create_test_ingredient(&db, "eggs", "pcs").await?;
        let sugar = create_test_ingredient(&db, "sugar", "g").await?;
        let tag = create_test_tag(&db, "baking").await?;

        let a = create_test_recipe(&db, user.id, "A", &[(flour.id, 200), (eggs.id, 3)], &[tag.id])
            .await?;
        let b = create_test_recipe(&db, user.id, "B", &[(flour.id, 300)], &[tag.id]).await?;
        // Not in the cart
        create_test_recipe(&db, user.id, "C", &[(sugar.id, 50)], &[tag.id]).await?;

        add_mark(&db, MarkKind::ShoppingCart, user.id, a.id).await?;
        add_mark(&db, MarkKind::ShoppingCart, user.id, b.id).await?;

        let items = collect_items(&db, user.id).await?;
        assert_eq!(
            items,
            vec![
                ShoppingItem {
                    name: "eggs".to_string(),
                    measurement_unit: "pcs".to_string(),
                    total: 3,
                },
                ShoppingItem {
                    name: "flour".to_string(),
                    measurement_unit: "g".to_string(),
                    total: 500,
                },
            ]
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_same_name_different_units_stay_apart() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "cook").await?;
        let milk_ml = create_test_ingredient(&db, "milk", "ml").await?;
        let milk_cup = create_test_ingredient(&db, "milk", "cup").await?;
        let tag = create_test_tag(&db, "drinks").await?;
        let a = create_test_recipe(&db, user.id, "A", &[(milk_ml.id, 250)], &[tag.id]).await?;
        let b = create_test_recipe(&db, user.id, "B", &[(milk_cup.id, 1)], &[tag.id]).await?;
        add_mark(&db, MarkKind::ShoppingCart, user.id, a.id).await?;
        add_mark(&db, MarkKind::ShoppingCart, user.id, b.id).await?;

        let items = collect_items(&db, user.id).await?;
        let lines: Vec<(&str, i64)> = items
            .iter()
            .map(|i| (i.measurement_unit.as_str(), i.total))
            .collect();
        assert_eq!(lines, vec![("cup", 1), ("ml", 250)]);

        Ok(())
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "cook").await?;

        let result = build_shopping_list(&db, &user).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_build_names_file_after_username() -> Result<()> {
        let (db, author, recipe) = setup_with_recipe().await?;
        add_mark(&db, MarkKind::ShoppingCart, author.id, recipe.id).await?;

        let list = build_shopping_list(&db, &author).await?;
        assert_eq!(list.filename, "author_shopping_list.txt");
        assert!(list.content.contains("- flour (g) - 500\n"));

        Ok(())
    }

    #[tokio::test]
    async fn test_render_layout() -> Result<()> {
        let db = setup_test_db().await?;
        let cook = create_test_user(&db, "cook").await?;
        let items = vec![ShoppingItem {
            name: "flour".to_string(),
            measurement_unit: "g".to_string(),
            total: 500,
        }];
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

        let text = render(&cook, &items, date);
        assert_eq!(
            text,
            "Shopping list for: Test User\nDate: 2024-03-09\n\n- flour (g) - 500\n\nLarder (2024)\n"
        );

        let nameless = user::Model {
            first_name: " ".to_string(),
            last_name: String::new(),
            ..cook
        };
        assert!(render(&nameless, &items, date).starts_with("Shopping list for: cook\n"));

        Ok(())
    }
}
