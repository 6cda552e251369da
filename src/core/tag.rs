//! Tag business logic - The curated catalog recipes are filed under.
//!
//! Tags are read-only over the API; new ones arrive through config seeding.
//! Slugs are unique at the store level.

use crate::{
    config::tags::TagConfig,
    entities::{Tag, tag},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info, instrument};

const MAX_TAG_FIELD_LEN: usize = 200;

/// Retrieves every tag, ordered alphabetically by name.
pub async fn list_tags<C>(db: &C) -> Result<Vec<tag::Model>>
where
    C: ConnectionTrait,
{
    Tag::find()
        .order_by_asc(tag::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a specific tag by its unique ID.
pub async fn get_tag<C>(db: &C, tag_id: i64) -> Result<Option<tag::Model>>
where
    C: ConnectionTrait,
{
    Tag::find_by_id(tag_id).one(db).await.map_err(Into::into)
}

/// Finds a tag by its slug.
pub async fn get_tag_by_slug<C>(db: &C, slug: &str) -> Result<Option<tag::Model>>
where
    C: ConnectionTrait,
{
    Tag::find()
        .filter(tag::Column::Slug.eq(slug))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns true for colors of the form `#RRGGBB`.
#[must_use]
pub fn is_hex_color(color: &str) -> bool {
    color
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Returns true for non-empty slugs made of ASCII letters, digits, `-` and `_`.
#[must_use]
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= MAX_TAG_FIELD_LEN
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Creates a new tag after validating its fields.
///
/// # Errors
/// Returns an error if:
/// - The name is empty or longer than 200 characters
/// - The color is not `#RRGGBB`
/// - The slug contains characters outside `[-a-zA-Z0-9_]`
/// - A tag with the same slug already exists (`Error::Conflict`)
#[instrument(skip(db))]
pub async fn create_tag<C>(db: &C, name: &str, color: &str, slug: &str) -> Result<tag::Model>
where
    C: ConnectionTrait,
{
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_TAG_FIELD_LEN {
        return Err(Error::validation(
            "Tag name must be between 1 and 200 characters",
        ));
    }
    if !is_hex_color(color) {
        return Err(Error::validation(format!(
            "Tag color {color:?} is not a #RRGGBB hex color"
        )));
    }
    if !is_valid_slug(slug) {
        return Err(Error::validation(format!(
            "Tag slug {slug:?} may only contain letters, digits, '-' and '_'"
        )));
    }

    let tag = tag::ActiveModel {
        name: Set(name.to_string()),
        color: Set(color.to_uppercase()),
        slug: Set(slug.to_string()),
        ..Default::default()
    };
    tag.insert(db).await.map_err(|e| {
        Error::from_db_unique(e, || {
            Error::conflict(format!("A tag with slug {slug:?} already exists"))
        })
    })
}

/// Seeds the catalog from configuration, skipping slugs that already exist.
///
/// Returns the number of tags inserted.
pub async fn seed_tags<C>(db: &C, tags: &[TagConfig]) -> Result<usize>
where
    C: ConnectionTrait,
{
    let mut inserted = 0;
    for config in tags {
        if get_tag_by_slug(db, &config.slug).await?.is_some() {
            debug!("Tag {} already present, skipping", config.slug);
            continue;
        }
        create_tag(db, &config.name, &config.color, &config.slug).await?;
        inserted += 1;
    }
    info!("Seeded {inserted} of {} configured tags", tags.len());
    Ok(inserted)
}
