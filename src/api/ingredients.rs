//! `/api/ingredients` handlers.

use crate::{
    api::{
        AppState,
        extract::{ApiPath, ApiQuery, CurrentUser, Payload},
    },
    core::ingredient,
    entities::IngredientModel,
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct IngredientQuery {
    /// Case-sensitive name prefix
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

pub async fn list_ingredients(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<IngredientQuery>,
) -> Result<Json<Vec<IngredientModel>>> {
    Ok(Json(
        ingredient::list_ingredients(&state.db, query.name.as_deref()).await?,
    ))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    ApiPath(ingredient_id): ApiPath<i64>,
) -> Result<Json<IngredientModel>> {
    ingredient::get_ingredient(&state.db, ingredient_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Ingredient", ingredient_id))
}

pub async fn create_ingredient(
    State(state): State<AppState>,
    current: CurrentUser,
    Payload(new): Payload<NewIngredient>,
) -> Result<(StatusCode, Json<IngredientModel>)> {
    let created =
        ingredient::create_ingredient(&state.db, &new.name, &new.measurement_unit).await?;
    info!(
        "User {} added ingredient {} ({})",
        current.user.id, created.name, created.measurement_unit
    );
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn delete_ingredient(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(ingredient_id): ApiPath<i64>,
) -> Result<StatusCode> {
    ingredient::delete_ingredient(&state.db, ingredient_id).await?;
    info!("User {} removed ingredient {ingredient_id}", current.user.id);
    Ok(StatusCode::NO_CONTENT)
}
