//! Handler factories for CRUD routes: each takes a model and options and returns an axum handler.

pub mod cache;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod model;
pub mod options;
pub mod pg;
pub mod response;
pub mod routes;
pub mod user;

pub use cache::{Cache, MemoryCache};
pub use error::{AppError, ConfigError, ModelError};
pub use handlers::{create, create_or_update, destroy, find, get, list, update, CrudHandler, Operation};
pub use memory::MemoryModel;
pub use model::{Model, Record, Where};
pub use options::CrudOptions;
pub use pg::{ColumnDef, PgModel, TableDef};
pub use routes::{common_routes, crud_routes};
pub use user::RequestUser;
