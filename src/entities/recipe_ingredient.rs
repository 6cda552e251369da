//! Recipe ingredient entity - How much of an ingredient a recipe needs.
//!
//! Keyed by (`recipe_id`, `ingredient_id`), so a recipe lists each ingredient
//! once. Rows cascade away with either side.

use sea_orm::entity::prelude::*;

/// Recipe ingredient database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "recipe_ingredients")]
pub struct Model {
    /// Owning recipe
    #[sea_orm(primary_key, auto_increment = false)]
    pub recipe_id: i64,
    /// Referenced catalog ingredient
    #[sea_orm(primary_key, auto_increment = false)]
    pub ingredient_id: i64,
    /// Quantity in the ingredient's measurement unit
    pub amount: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::recipe::Entity",
        from = "Column::RecipeId",
        to = "super::recipe::Column::Id",
        on_delete = "Cascade"
    )]
    Recipe,
    #[sea_orm(
        belongs_to = "super::ingredient::Entity",
        from = "Column::IngredientId",
        to = "super::ingredient::Column::Id",
        on_delete = "Cascade"
    )]
    Ingredient,
}

impl Related<super::recipe::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Recipe.def()
    }
}

impl Related<super::ingredient::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ingredient.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
