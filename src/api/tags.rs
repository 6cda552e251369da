//! `/api/tags` handlers. The catalog is read-only over HTTP.

use crate::{
    api::{AppState, extract::ApiPath},
    core::tag,
    entities::TagModel,
    errors::{Error, Result},
};
use axum::{Json, extract::State};

pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagModel>>> {
    Ok(Json(tag::list_tags(&state.db).await?))
}

pub async fn get_tag(
    State(state): State<AppState>,
    ApiPath(tag_id): ApiPath<i64>,
) -> Result<Json<TagModel>> {
    tag::get_tag(&state.db, tag_id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("Tag", tag_id))
}
