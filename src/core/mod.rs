//! Core business logic, independent of the HTTP layer.
//!
//! Functions take any `sea_orm::ConnectionTrait`, so they run the same against a
//! pooled connection or inside a transaction. Multi-row writes that must be
//! atomic take a `DatabaseConnection` and open the transaction themselves.

pub mod auth;
pub mod filter;
pub mod image;
pub mod ingredient;
pub mod marks;
pub mod recipe;
pub mod shopping_list;
pub mod subscription;
pub mod tag;
pub mod user;
