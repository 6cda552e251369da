//! `/api/users` handlers: registration, profiles, passwords and subscriptions.

use crate::{
    api::{
        AppState,
        extract::{ApiPath, ApiQuery, CurrentUser, MaybeUser, Payload},
    },
    core::{
        subscription::{self, SubscriptionView},
        user::{self, NewUser, UserProfile},
    },
    errors::Result,
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

/// Registration response; a fresh account has no viewer to be subscribed to.
#[derive(Debug, Serialize)]
pub struct RegisteredUser {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub new_password: String,
    pub current_password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PreviewQuery {
    pub recipes_limit: Option<u64>,
}

impl PreviewQuery {
    fn limit(&self, state: &AppState) -> u64 {
        self.recipes_limit
            .unwrap_or(state.settings.recipes_preview_limit)
    }
}

pub async fn register(
    State(state): State<AppState>,
    Payload(new_user): Payload<NewUser>,
) -> Result<(StatusCode, Json<RegisteredUser>)> {
    let user = user::register(&state.db, new_user).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisteredUser {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }),
    ))
}

pub async fn list_users(
    State(state): State<AppState>,
    viewer: MaybeUser,
) -> Result<Json<Vec<UserProfile>>> {
    let users = user::list_users(&state.db).await?;
    Ok(Json(user::profiles(&state.db, viewer.id(), users).await?))
}

pub async fn me(State(state): State<AppState>, current: CurrentUser) -> Result<Json<UserProfile>> {
    let viewer = Some(current.user.id);
    Ok(Json(user::profile(&state.db, viewer, current.user).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    viewer: MaybeUser,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<Json<UserProfile>> {
    let found = user::require_user(&state.db, user_id).await?;
    Ok(Json(user::profile(&state.db, viewer.id(), found).await?))
}

pub async fn set_password(
    State(state): State<AppState>,
    current: CurrentUser,
    Payload(request): Payload<SetPasswordRequest>,
) -> Result<StatusCode> {
    user::set_password(
        &state.db,
        current.user,
        &request.current_password,
        &request.new_password,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn subscriptions(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiQuery(query): ApiQuery<PreviewQuery>,
) -> Result<Json<Vec<SubscriptionView>>> {
    let limit = query.limit(&state);
    Ok(Json(
        subscription::list_subscriptions(&state.db, current.user.id, limit).await?,
    ))
}

pub async fn subscribe(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(author_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<PreviewQuery>,
) -> Result<(StatusCode, Json<SubscriptionView>)> {
    let limit = query.limit(&state);
    let view = subscription::subscribe(&state.db, current.user.id, author_id, limit).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    current: CurrentUser,
    ApiPath(author_id): ApiPath<i64>,
) -> Result<StatusCode> {
    subscription::unsubscribe(&state.db, current.user.id, author_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
