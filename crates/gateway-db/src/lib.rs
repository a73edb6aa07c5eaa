//! Domain model and repository traits for the fuzzing platform gateway,
//! plus a PostgreSQL backend and an in-memory fake for tests.

pub mod fake;
pub mod model;
pub mod postgres;
pub mod traits;

pub use postgres::PgDatabase;
pub use traits::Database;
