//! Diesel row types for the `images` table.

use crate::schema::images;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use imagery_core::{ImageFormat, ImageRecord, Rgb};
use imagery_error::{DatabaseError, DatabaseErrorKind};
use uuid::Uuid;

/// Row read from the `images` table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = images)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ImageRow {
    pub id: Uuid,
    pub store_name: String,
    pub format: String,
    pub width: i32,
    pub height: i32,
    pub size: i64,
    pub upload_size: i64,
    pub average_color: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for the `images` table.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = images)]
pub struct NewImageRow {
    pub id: Uuid,
    pub store_name: String,
    pub format: String,
    pub width: i32,
    pub height: i32,
    pub size: i64,
    pub upload_size: i64,
    pub average_color: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

fn serialization(message: String) -> DatabaseError {
    DatabaseError::new(DatabaseErrorKind::Serialization(message))
}

impl TryFrom<&ImageRecord> for NewImageRow {
    type Error = DatabaseError;

    fn try_from(record: &ImageRecord) -> Result<Self, Self::Error> {
        let out_of_range = |field: &str| serialization(format!("{} out of range", field));
        Ok(Self {
            id: record.id,
            store_name: record.store_name.clone(),
            format: record.format.as_str().to_string(),
            width: i32::try_from(record.width).map_err(|_| out_of_range("width"))?,
            height: i32::try_from(record.height).map_err(|_| out_of_range("height"))?,
            size: i64::try_from(record.size).map_err(|_| out_of_range("size"))?,
            upload_size: i64::try_from(record.upload_size)
                .map_err(|_| out_of_range("upload_size"))?,
            average_color: record.average_color.to_bytes().to_vec(),
            created_at: record.created_at,
        })
    }
}

impl TryFrom<ImageRow> for ImageRecord {
    type Error = DatabaseError;

    fn try_from(row: ImageRow) -> Result<Self, Self::Error> {
        let negative = |field: &str| serialization(format!("negative {} in row {}", field, row.id));
        Ok(Self {
            id: row.id,
            format: row
                .format
                .parse::<ImageFormat>()
                .map_err(|_| serialization(format!("unknown format {:?}", row.format)))?,
            width: u32::try_from(row.width).map_err(|_| negative("width"))?,
            height: u32::try_from(row.height).map_err(|_| negative("height"))?,
            size: u64::try_from(row.size).map_err(|_| negative("size"))?,
            upload_size: u64::try_from(row.upload_size).map_err(|_| negative("upload_size"))?,
            average_color: Rgb::from_bytes(&row.average_color).map_err(serialization)?,
            created_at: row.created_at,
            store_name: row.store_name,
        })
    }
}
