//! User directory business logic - registration, lookup and profiles.
//!
//! A profile is the public view of a user as seen by a particular requester:
//! `is_subscribed` tells whether that requester follows the user.

use crate::{
    core::auth,
    entities::{Subscription, User, subscription, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, instrument};

const MAX_EMAIL_LEN: usize = 254;
const MAX_NAME_LEN: usize = 150;

/// Registration request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Public view of a user relative to the requester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserProfile {
    #[must_use]
    pub fn new(user: user::Model, is_subscribed: bool) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= MAX_NAME_LEN
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'))
}

fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LEN
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'))
        && !email.chars().any(char::is_whitespace)
}

fn validate_new_user(new_user: &NewUser) -> Result<()> {
    if !is_valid_email(new_user.email.trim()) {
        return Err(Error::validation("Enter a valid email address"));
    }
    if !is_valid_username(&new_user.username) {
        return Err(Error::validation(
            "Username may contain only letters, digits and @/./+/-/_ (at most 150 characters)",
        ));
    }
    // `me` is routed to the requester's own profile
    if new_user.username == "me" {
        return Err(Error::validation("Username \"me\" is reserved"));
    }
    for (field, value) in [
        ("first_name", &new_user.first_name),
        ("last_name", &new_user.last_name),
    ] {
        if value.trim().is_empty() || value.chars().count() > MAX_NAME_LEN {
            return Err(Error::validation(format!(
                "{field} must be between 1 and 150 characters"
            )));
        }
    }
    if new_user.password.is_empty() {
        return Err(Error::validation("Password cannot be empty"));
    }
    Ok(())
}

/// Registers a new account.
///
/// # Errors
/// Returns an error if:
/// - Any field fails validation
/// - The email or username is already taken (`Error::Conflict`)
#[instrument(skip(db, new_user), fields(username = %new_user.username))]
pub async fn register<C>(db: &C, new_user: NewUser) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    validate_new_user(&new_user)?;

    let user = user::ActiveModel {
        email: Set(new_user.email.trim().to_lowercase()),
        username: Set(new_user.username),
        first_name: Set(new_user.first_name.trim().to_string()),
        last_name: Set(new_user.last_name.trim().to_string()),
        password: Set(auth::hash_password(&new_user.password)?),
        ..Default::default()
    };
    let user = user.insert(db).await.map_err(|e| {
        Error::from_db_unique(e, || {
            Error::conflict("A user with that email or username already exists")
        })
    })?;

    info!("Registered user {}", user.id);
    Ok(user)
}

/// Retrieves a specific user by its unique ID.
pub async fn get_user<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Like [`get_user`], but a missing user is an `Error::NotFound`.
pub async fn require_user<C>(db: &C, user_id: i64) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    get_user(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))
}

/// Retrieves every user ordered by id.
pub async fn list_users<C>(db: &C) -> Result<Vec<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Changes a password after checking the current one.
///
/// Every token the user holds is revoked in the same transaction, so other
/// sessions must log in again.
///
/// # Errors
/// Returns `Error::Validation` if `current_password` is wrong or
/// `new_password` is empty.
#[instrument(skip_all, fields(user_id = user.id))]
pub async fn set_password(
    db: &DatabaseConnection,
    user: user::Model,
    current_password: &str,
    new_password: &str,
) -> Result<()> {
    if new_password.is_empty() {
        return Err(Error::validation("New password cannot be empty"));
    }
    if !auth::verify_password(current_password, &user.password)? {
        return Err(Error::validation("Current password is incorrect"));
    }

    let user_id = user.id;
    let txn = db.begin().await?;

    let mut active: user::ActiveModel = user.into();
    active.password = Set(auth::hash_password(new_password)?);
    active.update(&txn).await?;
    auth::revoke_all_tokens(&txn, user_id).await?;

    txn.commit().await?;
    Ok(())
}

/// Returns the subset of `author_ids` that `viewer` follows.
pub async fn followed_author_ids<C>(
    db: &C,
    viewer: Option<i64>,
    author_ids: &[i64],
) -> Result<HashSet<i64>>
where
    C: ConnectionTrait,
{
    let Some(viewer) = viewer else {
        return Ok(HashSet::new());
    };
    if author_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let rows = Subscription::find()
        .filter(subscription::Column::UserId.eq(viewer))
        .filter(subscription::Column::AuthorId.is_in(author_ids.iter().copied()))
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|row| row.author_id).collect())
}

/// Builds profiles for `users` as seen by `viewer`, preserving order.
pub async fn profiles<C>(
    db: &C,
    viewer: Option<i64>,
    users: Vec<user::Model>,
) -> Result<Vec<UserProfile>>
where
    C: ConnectionTrait,
{
    let ids: Vec<i64> = users.iter().map(|u| u.id).collect();
    let followed = followed_author_ids(db, viewer, &ids).await?;

    Ok(users
        .into_iter()
        .map(|user| {
            let is_subscribed = followed.contains(&user.id);
            UserProfile::new(user, is_subscribed)
        })
        .collect())
}

/// Builds a single profile as seen by `viewer`.
pub async fn profile<C>(db: &C, viewer: Option<i64>, user: user::Model) -> Result<UserProfile>
where
    C: ConnectionTrait,
{
    let is_subscribed = !followed_author_ids(db, viewer, &[user.id]).await?.is_empty();
    Ok(UserProfile::new(user, is_subscribed))
}
