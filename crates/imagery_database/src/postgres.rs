//! PostgreSQL-backed image repository.

use crate::models::{ImageRow, NewImageRow};
use crate::schema::images;
use crate::{ImagePool, ImageRepository, PersistFuture, establish_pool, run_migrations};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use imagery_core::ImageRecord;
use imagery_error::{DatabaseError, DatabaseErrorKind, ImageryError, ImageryResult};
use uuid::Uuid;

/// Image repository over a diesel connection pool.
///
/// Diesel is synchronous; every call runs on the blocking pool.
#[derive(Clone)]
pub struct PostgresImageRepository {
    pool: ImagePool,
}

impl PostgresImageRepository {
    /// Create a repository with the given connection pool.
    pub fn new(pool: ImagePool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url` and apply pending migrations.
    #[tracing::instrument(skip(database_url))]
    pub async fn connect(database_url: &str) -> ImageryResult<Self> {
        let database_url = database_url.to_string();
        let pool = tokio::task::spawn_blocking(move || -> ImageryResult<ImagePool> {
            let pool = establish_pool(&database_url)?;
            let mut conn = pool.get().map_err(DatabaseError::from)?;
            run_migrations(&mut conn)?;
            Ok(pool)
        })
        .await
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Connection(e.to_string())))??;

        Ok(Self::new(pool))
    }

    async fn with_conn<T, F>(&self, f: F) -> ImageryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> ImageryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(DatabaseError::from)?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Query(e.to_string())))?
    }
}

#[async_trait]
impl ImageRepository for PostgresImageRepository {
    #[tracing::instrument(skip(self, record, persist), fields(id = %record.id, store = %record.store_name))]
    async fn insert_image(
        &self,
        record: &ImageRecord,
        persist: PersistFuture,
    ) -> ImageryResult<()> {
        let row = NewImageRow::try_from(record)?;
        let handle = tokio::runtime::Handle::current();

        self.with_conn(move |conn| {
            conn.transaction::<_, ImageryError, _>(|conn| {
                diesel::insert_into(images::table)
                    .values(&row)
                    .execute(conn)?;
                // The row stays uncommitted until the bytes are saved.
                handle.block_on(persist)
            })
        })
        .await?;

        tracing::info!("Inserted image row");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_image(&self, id: Uuid) -> ImageryResult<ImageRecord> {
        let row = self
            .with_conn(move |conn| {
                images::table
                    .find(id)
                    .select(ImageRow::as_select())
                    .first::<ImageRow>(conn)
                    .map_err(ImageryError::from)
            })
            .await?;

        Ok(ImageRecord::try_from(row)?)
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn get_images(&self, ids: &[Uuid]) -> ImageryResult<Vec<ImageRecord>> {
        let ids = ids.to_vec();
        let rows = self
            .with_conn(move |conn| {
                images::table
                    .filter(images::id.eq_any(ids))
                    .select(ImageRow::as_select())
                    .load::<ImageRow>(conn)
                    .map_err(ImageryError::from)
            })
            .await?;

        rows.into_iter()
            .map(|row| ImageRecord::try_from(row).map_err(ImageryError::from))
            .collect()
    }

    #[tracing::instrument(skip(self, ids), fields(count = ids.len()))]
    async fn delete_images(&self, ids: &[Uuid]) -> ImageryResult<usize> {
        let ids = ids.to_vec();
        let deleted = self
            .with_conn(move |conn| {
                diesel::delete(images::table.filter(images::id.eq_any(ids)))
                    .execute(conn)
                    .map_err(ImageryError::from)
            })
            .await?;

        tracing::info!(deleted, "Deleted image rows");
        Ok(deleted)
    }
}
