//! HTTP handler factories for CRUD routes over a [`Model`](crate::model::Model).

pub mod crud;
pub use crud::*;
