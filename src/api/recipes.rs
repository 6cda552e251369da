//! `/api/recipes` handlers: the recipe store, favorites, cart and the
//! shopping list download.

use crate::{
    api::{
        AppState,
        extract::{ApiPath, ApiQuery, CurrentUser, MaybeUser, RecipeForm, RecipeQuery},
    },
    core::{
        filter::RecipeFilter,
        marks::{self, MarkKind},
        recipe::{self, RecipeDetail, RecipeSummary},
        shopping_list,
    },
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::State,
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::IntoResponse,
};

pub async fn list_recipes(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiQuery(query): ApiQuery<RecipeQuery>,
) -> Result<Json<Vec<RecipeDetail>>> {
    let filter = RecipeFilter::try_from(query)?;
    Ok(Json(
        recipe::list_recipes(&state.db, &filter, viewer.id()).await?,
    ))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(recipe_id): ApiPath<i64>,
) -> Result<Json<RecipeDetail>> {
    let found = recipe::require_recipe(&state.db, recipe_id).await?;
    Ok(Json(
        recipe::recipe_detail(&state.db, found, viewer.id()).await?,
    ))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    current: CurrentUser,
    form: RecipeForm,
) -> Result<(StatusCode, Json<RecipeDetail>)> {
    recipe::validate_input(&form.input)?;
    let image = form
        .image
        .ok_or_else(|| Error::validation("Recipe image is required"))?;
    let image_url = state.images.save(image).await?;

    let created =
        match recipe::create_recipe(&state.db, current.user.id, form.input, image_url.clone())
            .await
        {
            Ok(created) => created,
            Err(e) => {
                state.images.remove(&image_url).await;
                return Err(e);
            }
        };

    let detail = recipe::recipe_detail(&state.db, created, Some(current.user.id)).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn update_recipe(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(recipe_id): ApiPath<i64>,
    form: RecipeForm,
) -> Result<Json<RecipeDetail>> {
    // Reject before storing an upload nobody will reference
    let existing = recipe::require_recipe(&state.db, recipe_id).await?;
    if existing.author_id != current.user.id {
        return Err(Error::Forbidden);
    }
    recipe::validate_input(&form.input)?;

    let image_url = match form.image {
        Some(image) => Some(state.images.save(image).await?),
        None => None,
    };

    let updated = match recipe::update_recipe(
        &state.db,
        recipe_id,
        current.user.id,
        form.input,
        image_url.clone(),
    )
    .await
    {
        Ok(updated) => updated,
        Err(e) => {
            if let Some(url) = &image_url {
                state.images.remove(url).await;
            }
            return Err(e);
        }
    };
    if let Some(stale) = &updated.replaced_image {
        state.images.remove(stale).await;
    }

    let detail = recipe::recipe_detail(&state.db, updated.recipe, Some(current.user.id)).await?;
    Ok(Json(detail))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(recipe_id): ApiPath<i64>,
) -> Result<StatusCode> {
    let deleted = recipe::delete_recipe(&state.db, recipe_id, current.user.id).await?;
    state.images.remove(&deleted.image).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_mark(
    state: &AppState,
    kind: MarkKind,
    current: &CurrentUser,
    recipe_id: i64,
) -> Result<(StatusCode, Json<RecipeSummary>)> {
    let summary = marks::add_mark(&state.db, kind, current.user.id, recipe_id).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn remove_mark(
    state: &AppState,
    kind: MarkKind,
    current: &CurrentUser,
    recipe_id: i64,
) -> Result<StatusCode> {
    marks::remove_mark(&state.db, kind, current.user.id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_favorite(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(recipe_id): ApiPath<i64>,
) -> Result<(StatusCode, Json<RecipeSummary>)> {
    add_mark(&state, MarkKind::Favorite, &current, recipe_id).await
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(recipe_id): ApiPath<i64>,
) -> Result<StatusCode> {
    remove_mark(&state, MarkKind::Favorite, &current, recipe_id).await
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(recipe_id): ApiPath<i64>,
) -> Result<(StatusCode, Json<RecipeSummary>)> {
    add_mark(&state, MarkKind::ShoppingCart, &current, recipe_id).await
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(recipe_id): ApiPath<i64>,
) -> Result<StatusCode> {
    remove_mark(&state, MarkKind::ShoppingCart, &current, recipe_id).await
}

pub async fn download_shopping_cart(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse> {
    let list = shopping_list::build_shopping_list(&state.db, &current.user).await?;
    Ok((
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename={}", list.filename),
            ),
        ],
        list.content,
    ))
}
