//! Password hashing and bearer token sessions.
//!
//! Passwords are stored as argon2 PHC strings. Tokens are opaque random keys
//! kept in the `auth_tokens` table; presenting one identifies its owner until
//! it is revoked at logout or on a password change.

use crate::{
    entities::{AuthToken, User, auth_token, user},
    errors::{Error, Result},
};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::rngs::OsRng;
use sea_orm::{Set, prelude::*};
use tracing::{debug, instrument};
use uuid::Uuid;

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Issues a fresh token for `user_id`.
pub async fn issue_token<C>(db: &C, user_id: i64) -> Result<String>
where
    C: ConnectionTrait,
{
    let key = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());

    auth_token::ActiveModel {
        key: Set(key.clone()),
        user_id: Set(user_id),
        created_at: Set(chrono::Utc::now().naive_utc()),
    }
    .insert(db)
    .await?;

    Ok(key)
}

/// Exchanges credentials for a token.
///
/// Unknown emails and wrong passwords are indistinguishable to the caller.
#[instrument(skip(db, password))]
pub async fn login<C>(db: &C, email: &str, password: &str) -> Result<String>
where
    C: ConnectionTrait,
{
    let user = User::find()
        .filter(user::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await?
        .ok_or(Error::AuthorizationRequired)?;

    if !verify_password(password, &user.password)? {
        debug!("Password mismatch for user {}", user.id);
        return Err(Error::AuthorizationRequired);
    }

    issue_token(db, user.id).await
}

/// Resolves a presented token to its owner.
///
/// # Errors
/// Returns `Error::AuthorizationRequired` when the token is unknown.
pub async fn authenticate<C>(db: &C, key: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    AuthToken::find_by_id(key.to_string())
        .find_also_related(User)
        .one(db)
        .await?
        .and_then(|(_, user)| user)
        .ok_or(Error::AuthorizationRequired)
}

/// Revokes a single token. Revoking an unknown token is a no-op.
pub async fn revoke_token<C>(db: &C, key: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    AuthToken::delete_by_id(key.to_string()).exec(db).await?;
    Ok(())
}

/// Revokes every token `user_id` holds.
pub async fn revoke_all_tokens<C>(db: &C, user_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = AuthToken::delete_many()
        .filter(auth_token::Column::UserId.eq(user_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_hash_and_verify_password() -> Result<()> {
        let hash = hash_password("correct horse")?;
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash)?);
        assert!(!verify_password("battery staple", &hash)?);
        Ok(())
    }

    #[tokio::test]
    async fn test_login_and_authenticate() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "alice").await?;

        let token = login(&db, &user.email, TEST_PASSWORD).await?;
        let resolved = authenticate(&db, &token).await?;
        assert_eq!(resolved.id, user.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "alice").await?;

        let wrong_password = login(&db, &user.email, "not-the-password").await;
        assert!(matches!(
            wrong_password.unwrap_err(),
            Error::AuthorizationRequired
        ));

        let unknown_email = login(&db, "nobody@example.com", TEST_PASSWORD).await;
        assert!(matches!(
            unknown_email.unwrap_err(),
            Error::AuthorizationRequired
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_revoked_token_no_longer_authenticates() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "alice").await?;
        let first = issue_token(&db, user.id).await?;
        let second = issue_token(&db, user.id).await?;

        revoke_token(&db, &first).await?;
        assert!(authenticate(&db, &first).await.is_err());
        assert!(authenticate(&db, &second).await.is_ok());

        assert_eq!(revoke_all_tokens(&db, user.id).await?, 1);
        assert!(authenticate(&db, &second).await.is_err());

        Ok(())
    }
}
