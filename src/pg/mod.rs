//! PostgreSQL-backed [`Model`](crate::model::Model): safe SQL builder, identifiers from the table
//! definition only, values as parameters.

pub mod builder;
mod model;
mod params;
mod table;

pub use model::PgModel;
pub use params::PgBindValue;
pub use table::{ColumnDef, TableDef};
