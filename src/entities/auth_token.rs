//! Auth token entity - Opaque bearer keys issued at login.

use sea_orm::entity::prelude::*;

/// Auth token database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "auth_tokens")]
pub struct Model {
    /// The bearer key itself
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    /// Owner of the token
    #[sea_orm(indexed)]
    pub user_id: i64,
    /// When the token was issued
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each token belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
