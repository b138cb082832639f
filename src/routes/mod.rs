//! Routers assembled from the handler factories.

mod common;
mod crud;

pub use common::common_routes;
pub use crud::crud_routes;
