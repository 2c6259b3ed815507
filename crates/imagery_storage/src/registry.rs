//! Name-indexed collection of storage backends.

use crate::ImageStore;
use imagery_error::{ImageryResult, StorageError, StorageErrorKind};
use std::fmt;
use std::sync::Arc;

/// Backends available to this process, looked up by the name stored on rows.
///
/// Built once during startup with [`register`](Self::register), then wrapped
/// in an `Arc` and only read. Names are unique.
#[derive(Clone, Default)]
pub struct StoreRegistry {
    stores: Vec<Arc<dyn ImageStore>>,
}

impl StoreRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a backend.
    ///
    /// # Errors
    ///
    /// `StorageErrorKind::DuplicateStore` if a backend with the same name is
    /// already registered. The existing registration is left untouched.
    #[tracing::instrument(skip(self, store), fields(store = store.name()))]
    pub fn register(&mut self, store: Arc<dyn ImageStore>) -> ImageryResult<()> {
        if self.contains(store.name()) {
            return Err(StorageError::new(StorageErrorKind::DuplicateStore(
                store.name().to_string(),
            ))
            .into());
        }
        tracing::info!("Registered image store");
        self.stores.push(store);
        Ok(())
    }

    /// Look up a backend by name.
    ///
    /// # Errors
    ///
    /// `StorageErrorKind::StoreNotRegistered` if no backend has that name.
    pub fn get(&self, name: &str) -> ImageryResult<Arc<dyn ImageStore>> {
        self.stores
            .iter()
            .find(|store| store.name() == name)
            .cloned()
            .ok_or_else(|| {
                StorageError::new(StorageErrorKind::StoreNotRegistered(name.to_string())).into()
            })
    }

    /// Whether a backend with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.stores.iter().any(|store| store.name() == name)
    }

    /// Names of all registered backends, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.stores.iter().map(|store| store.name()).collect()
    }
}

impl fmt::Debug for StoreRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreRegistry")
            .field("stores", &self.names())
            .finish()
    }
}
