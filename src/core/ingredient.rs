//! Ingredient business logic - The shared ingredient catalog.
//!
//! Recipes reference catalog entries by id. The (`name`, `measurement_unit`)
//! pair is unique, and deleting an entry removes it from every recipe that
//! used it.

use crate::{
    entities::{Ingredient, ingredient},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::instrument;

const MAX_INGREDIENT_FIELD_LEN: usize = 200;

/// Lists catalog entries ordered by name, optionally narrowed to names that
/// start with `prefix`.
///
/// The match is case-sensitive: `ap` finds "apple" but neither "Apple" nor
/// "pineapple". `SQLite`'s `LIKE` folds ASCII case, so the database narrows
/// the candidates and the exact prefix check happens here.
pub async fn list_ingredients<C>(db: &C, prefix: Option<&str>) -> Result<Vec<ingredient::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Ingredient::find().order_by_asc(ingredient::Column::Name);

    let Some(prefix) = prefix.filter(|p| !p.is_empty()) else {
        return query.all(db).await.map_err(Into::into);
    };

    query = query.filter(ingredient::Column::Name.starts_with(prefix));
    let candidates = query.all(db).await?;

    Ok(candidates
        .into_iter()
        .filter(|ingredient| ingredient.name.starts_with(prefix))
        .collect())
}

/// Retrieves a specific ingredient by its unique ID.
pub async fn get_ingredient<C>(db: &C, ingredient_id: i64) -> Result<Option<ingredient::Model>>
where
    C: ConnectionTrait,
{
    Ingredient::find_by_id(ingredient_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Adds an ingredient to the catalog.
///
/// # Errors
/// Returns an error if:
/// - The name or unit is empty or longer than 200 characters
/// - The same name and unit are already in the catalog (`Error::Conflict`)
#[instrument(skip(db))]
pub async fn create_ingredient<C>(
    db: &C,
    name: &str,
    measurement_unit: &str,
) -> Result<ingredient::Model>
where
    C: ConnectionTrait,
{
    let name = name.trim();
    let measurement_unit = measurement_unit.trim();

    for (field, value) in [("name", name), ("measurement_unit", measurement_unit)] {
        if value.is_empty() || value.chars().count() > MAX_INGREDIENT_FIELD_LEN {
            return Err(Error::validation(format!(
                "Ingredient {field} must be between 1 and 200 characters"
            )));
        }
    }

    let ingredient = ingredient::ActiveModel {
        name: Set(name.to_string()),
        measurement_unit: Set(measurement_unit.to_string()),
        ..Default::default()
    };
    ingredient.insert(db).await.map_err(|e| {
        Error::from_db_unique(e, || {
            Error::conflict(format!(
                "Ingredient {name:?} measured in {measurement_unit:?} already exists"
            ))
        })
    })
}

/// Removes an ingredient from the catalog.
///
/// Recipe quantity rows referencing it are removed by the foreign key cascade.
///
/// # Errors
/// Returns `Error::NotFound` if no ingredient has this id.
#[instrument(skip(db))]
pub async fn delete_ingredient<C>(db: &C, ingredient_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = Ingredient::delete_by_id(ingredient_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Ingredient", ingredient_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_prefix_search_is_case_sensitive_prefix() -> Result<()> {
        let db = setup_test_db().await?;
        for name in ["apple", "apricot", "pineapple", "Apple pie spice"] {
            create_ingredient(&db, name, "g").await?;
        }

        let found = list_ingredients(&db, Some("ap")).await?;
        let names: Vec<&str> = found.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["apple", "apricot"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_list_without_prefix_returns_everything_sorted() -> Result<()> {
        let db = setup_test_db().await?;
        create_ingredient(&db, "sugar", "g").await?;
        create_ingredient(&db, "butter", "g").await?;

        let all = list_ingredients(&db, None).await?;
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "butter");

        let empty_prefix = list_ingredients(&db, Some("")).await?;
        assert_eq!(empty_prefix.len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_name_and_unit_pair_is_unique() -> Result<()> {
        let db = setup_test_db().await?;
        create_ingredient(&db, "milk", "ml").await?;

        // Same name in another unit is a distinct catalog entry
        create_ingredient(&db, "milk", "cup").await?;

        let result = create_ingredient(&db, "milk", "ml").await;
        assert!(matches!(result.unwrap_err(), Error::Conflict { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_ingredient_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_ingredient(&db, "", "g").await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let result = create_ingredient(&db, "salt", "   ").await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_ingredient() -> Result<()> {
        let db = setup_test_db().await?;
        let salt = create_ingredient(&db, "salt", "g").await?;

        delete_ingredient(&db, salt.id).await?;
        assert!(get_ingredient(&db, salt.id).await?.is_none());

        let result = delete_ingredient(&db, salt.id).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));

        Ok(())
    }
}
