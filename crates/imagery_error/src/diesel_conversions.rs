//! Diesel error conversions (only available with the `database` feature).

use crate::{DatabaseError, DatabaseErrorKind, ImageryErrorKind};

impl From<diesel::result::Error> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => DatabaseError::new(DatabaseErrorKind::NotFound),
            _ => DatabaseError::new(DatabaseErrorKind::Query(err.to_string())),
        }
    }
}

impl From<diesel::ConnectionError> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        DatabaseError::new(DatabaseErrorKind::Connection(err.to_string()))
    }
}

impl From<diesel::r2d2::PoolError> for DatabaseError {
    #[track_caller]
    fn from(err: diesel::r2d2::PoolError) -> Self {
        DatabaseError::new(DatabaseErrorKind::Connection(err.to_string()))
    }
}

// Lets `ImageryError` be the error type of a diesel transaction closure.
impl From<diesel::result::Error> for ImageryErrorKind {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        ImageryErrorKind::Database(err.into())
    }
}
