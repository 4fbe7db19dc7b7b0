//! Catalog database operations

pub mod games;
pub mod metadata;
pub mod schema;

pub use schema::initialize_schema;
