//! Subscription entity - A follow relation from one user to an author.
//!
//! The composite primary key makes the (`user_id`, `author_id`) pair unique at
//! the store level.

use sea_orm::entity::prelude::*;

/// Subscription database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    /// The follower
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    /// The followed author
    #[sea_orm(primary_key, auto_increment = false)]
    pub author_id: i64,
    /// When the subscription was created, used for listing order
    pub created_at: DateTime,
}

/// Both sides point at the users table
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// The subscribing user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Subscriber,
    /// The author being followed
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,
}

impl ActiveModelBehavior for ActiveModel {}
