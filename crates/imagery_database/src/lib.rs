//! Image metadata persistence.
//!
//! One row per uploaded image in the `images` table, behind the
//! [`ImageRepository`] trait. [`PostgresImageRepository`] is the production
//! implementation; [`InMemoryImageRepository`] backs tests and local runs
//! without a database.
//!
//! Inserts are transactional with respect to a caller-supplied persist step,
//! so a row only becomes visible once the image bytes were saved.
//!
//! # Example
//!
//! ```rust,ignore
//! use imagery_database::{ImageRepository, PostgresImageRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = PostgresImageRepository::connect("postgres://localhost/imagery").await?;
//! let record = repo.get_image(uuid::Uuid::new_v4()).await;
//! assert!(record.is_err());
//! # Ok(())
//! # }
//! ```

mod connection;
mod in_memory;
mod models;
mod postgres;
mod repository;

pub mod schema;

pub use connection::{ImagePool, establish_pool, run_migrations};
pub use in_memory::InMemoryImageRepository;
pub use models::{ImageRow, NewImageRow};
pub use postgres::PostgresImageRepository;
pub use repository::{ImageRepository, PersistFuture};

use imagery_error::DatabaseError;

/// Result type for database operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;
