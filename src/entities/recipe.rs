//! Recipe entity - A dish with instructions, authored by one user.
//!
//! Ingredients (with amounts) and tags hang off the recipe through the
//! `recipe_ingredients` and `recipe_tags` join tables. Favorites and cart rows
//! reference it weakly and disappear with it.

use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Recipe database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "recipes")]
pub struct Model {
    /// Unique identifier for the recipe
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Author of the recipe
    #[sea_orm(indexed)]
    pub author_id: i64,
    /// Dish name
    pub name: String,
    /// Cooking instructions
    pub text: String,
    /// Public URL of the stored image
    pub image: String,
    /// Cooking time in minutes, always positive
    pub cooking_time: i32,
    /// When the recipe was published
    pub created_at: DateTime,
}

/// Defines relationships between Recipe and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each recipe belongs to one author
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
    /// Ingredient quantities
    #[sea_orm(has_many = "super::recipe_ingredient::Entity")]
    RecipeIngredients,
    /// Tag links
    #[sea_orm(has_many = "super::recipe_tag::Entity")]
    RecipeTags,
    /// Users who favorited the recipe
    #[sea_orm(has_many = "super::favorite::Entity")]
    Favorites,
    /// Users with the recipe in their cart
    #[sea_orm(has_many = "super::cart::Entity")]
    Carts,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::recipe_ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeIngredients.def()
    }
}

impl Related<super::recipe_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RecipeTags.def()
    }
}

impl Related<super::favorite::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Favorites.def()
    }
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Carts.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::recipe_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::recipe_tag::Relation::Recipe.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
