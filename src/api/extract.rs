//! Request extractors: bearer identity, JSON payloads, path and query
//! parameters, and recipe forms. Each one rejects with [`Error`].

use crate::{
    api::AppState,
    core::{auth, filter::RecipeFilter, image::ImageInput, recipe::RecipeInput},
    entities::user,
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Multipart, Request},
    http::{header::CONTENT_TYPE, request::Parts},
};
use axum_extra::{
    TypedHeader,
    extract::Query,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejectionReason,
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use std::path::Path;

/// The authenticated requester. Rejects anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: user::Model,
    /// The token the request was authenticated with
    pub token: String,
}

/// The requester if a token was presented. A missing `Authorization` header
/// is anonymous; a malformed or unknown token is still rejected with 401.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|current| current.user.id)
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
            Ok(TypedHeader(Authorization(bearer))) => {
                let token = bearer.token().to_string();
                let user = auth::authenticate(&state.db, &token).await?;
                Ok(Self(Some(CurrentUser { user, token })))
            }
            Err(rejection) if matches!(rejection.reason(), TypedHeaderRejectionReason::Missing) => {
                Ok(Self(None))
            }
            Err(_) => Err(Error::AuthorizationRequired),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        MaybeUser::from_request_parts(parts, state)
            .await?
            .0
            .ok_or(Error::AuthorizationRequired)
    }
}

/// JSON body whose rejection is a validation error in the API's error format.
#[derive(Debug)]
pub struct Payload<T>(pub T);

#[axum::async_trait]
impl<T> FromRequest<AppState> for Payload<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = Error;

    async fn from_request(req: Request, state: &AppState) -> Result<Self> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| Error::validation(e.body_text()))?;
        Ok(Self(value))
    }
}

/// Path parameters whose rejection is a validation error.
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

#[axum::async_trait]
impl<T> FromRequestParts<AppState> for ApiPath<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let axum::extract::Path(value) =
            axum::extract::Path::<T>::from_request_parts(parts, state)
                .await
                .map_err(|e| Error::validation(e.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string whose rejection is a validation error. Repeated keys
/// deserialize into a `Vec`.
#[derive(Debug)]
pub struct ApiQuery<T>(pub T);

#[axum::async_trait]
impl<T> FromRequestParts<AppState> for ApiQuery<T>
where
    T: DeserializeOwned + Send,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| Error::validation(e.to_string()))?;
        Ok(Self(value))
    }
}

/// Parses `1`/`0`/`true`/`false` query flags.
pub fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(Error::validation(format!(
            "{name} must be one of 1, 0, true or false"
        ))),
    }
}

/// Raw query string of the recipe listing. `tags` may repeat.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeQuery {
    pub author: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
}

impl TryFrom<RecipeQuery> for RecipeFilter {
    type Error = Error;

    fn try_from(query: RecipeQuery) -> Result<Self> {
        let flag = |name: &str, raw: Option<&String>| {
            raw.map_or(Ok(false), |value| parse_flag(name, value))
        };
        Ok(Self {
            author: query.author,
            is_favorited: flag("is_favorited", query.is_favorited.as_ref())?,
            is_in_shopping_cart: flag("is_in_shopping_cart", query.is_in_shopping_cart.as_ref())?,
            tags: query.tags,
        })
    }
}

/// A recipe write: the fields plus an optional image.
///
/// Accepts either a JSON body with `image` as a data URI, or a multipart body
/// with a `payload` JSON part and an `image` file part.
#[derive(Debug)]
pub struct RecipeForm {
    pub input: RecipeInput,
    pub image: Option<ImageInput>,
}

impl RecipeForm {
    fn from_json(mut value: Value) -> Result<Self> {
        let image = match value.as_object_mut().and_then(|fields| fields.remove("image")) {
            None | Some(Value::Null) => None,
            Some(Value::String(uri)) => Some(ImageInput::DataUri(uri)),
            Some(_) => return Err(Error::validation("image must be a data URI string")),
        };
        let input = serde_json::from_value(value)
            .map_err(|e| Error::validation(format!("Invalid recipe payload: {e}")))?;
        Ok(Self { input, image })
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut payload = None;
        let mut image = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| Error::validation(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "payload" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| Error::validation(e.body_text()))?;
                    payload = Some(text);
                }
                "image" => {
                    let extension = field
                        .file_name()
                        .and_then(|file_name| Path::new(file_name).extension())
                        .and_then(|ext| ext.to_str())
                        .or_else(|| {
                            field
                                .content_type()
                                .and_then(|mime| mime.strip_prefix("image/"))
                        })
                        .map(str::to_string)
                        .ok_or_else(|| Error::validation("Cannot tell the image type"))?;
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| Error::validation(e.body_text()))?;
                    image = Some(ImageInput::Upload {
                        extension,
                        bytes: bytes.to_vec(),
                    });
                }
                _ => {}
            }
        }

        let payload = payload.ok_or_else(|| Error::validation("Missing payload part"))?;
        let input = serde_json::from_str(&payload)
            .map_err(|e| Error::validation(format!("Invalid recipe payload: {e}")))?;
        Ok(Self { input, image })
    }
}

#[axum::async_trait]
impl FromRequest<AppState> for RecipeForm {
    type Rejection = Error;

    async fn from_request(req: Request, state: &AppState) -> Result<Self> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| Error::validation(e.body_text()))?;
            Self::from_multipart(multipart).await
        } else {
            let Payload(value) = Payload::<Value>::from_request(req, state).await?;
            Self::from_json(value)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("f", "1").unwrap());
        assert!(parse_flag("f", "TRUE").unwrap());
        assert!(!parse_flag("f", "0").unwrap());
        assert!(!parse_flag("f", "false").unwrap());
        assert!(parse_flag("f", "yes").is_err());
    }

    #[test]
    fn test_query_to_filter() {
        let query = RecipeQuery {
            author: Some(3),
            tags: vec!["lunch".to_string()],
            is_favorited: Some("1".to_string()),
            is_in_shopping_cart: None,
        };
        let filter = RecipeFilter::try_from(query).unwrap();
        assert_eq!(filter.author, Some(3));
        assert_eq!(filter.tags, vec!["lunch".to_string()]);
        assert!(filter.is_favorited);
        assert!(!filter.is_in_shopping_cart);
    }

    #[test]
    fn test_json_form_splits_image() {
        let form = RecipeForm::from_json(json!({
            "name": "Soup",
            "text": "Boil.",
            "cooking_time": 20,
            "ingredients": [{"id": 1, "amount": 2}],
            "tags": [1],
            "image": "data:image/png;base64,AAEC",
        }))
        .unwrap();
        assert_eq!(form.input.name, "Soup");
        assert_eq!(
            form.image,
            Some(ImageInput::DataUri("data:image/png;base64,AAEC".to_string()))
        );

        let without_image = RecipeForm::from_json(json!({
            "name": "Soup",
            "text": "Boil.",
            "cooking_time": 20,
            "ingredients": [{"id": 1, "amount": 2}],
            "tags": [1],
        }))
        .unwrap();
        assert!(without_image.image.is_none());

        let missing_fields = RecipeForm::from_json(json!({"name": "Soup"}));
        assert!(matches!(missing_fields, Err(Error::Validation { .. })));
    }
}
