//! Catalog cache — process-scoped, init-once with explicit invalidation.
//!
//! The catalog is loaded lazily on first access and shared as an `Arc` after
//! that. `invalidate()` drops the cached value so the next access reloads from
//! disk. There is no implicit refresh; a stale catalog persists until someone
//! asks for a reload or the process restarts.

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use anyhow::Result;

use crate::catalog::loader::load_catalog;
use crate::catalog::RoleCatalog;

pub struct CatalogCache {
    path: PathBuf,
    inner: RwLock<Option<Arc<RoleCatalog>>>,
}

impl CatalogCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: RwLock::new(None),
        }
    }

    /// Returns the cached catalog, loading it on first access.
    pub fn get(&self) -> Result<Arc<RoleCatalog>> {
        if let Some(catalog) = self.inner.read().expect("catalog lock poisoned").as_ref() {
            return Ok(Arc::clone(catalog));
        }

        let mut guard = self.inner.write().expect("catalog lock poisoned");
        // Another request may have loaded it while we waited for the write lock.
        if let Some(catalog) = guard.as_ref() {
            return Ok(Arc::clone(catalog));
        }

        let catalog = Arc::new(load_catalog(&self.path)?);
        *guard = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Drops the cached catalog. The next `get()` reloads from disk.
    /// In-flight requests keep their `Arc` to the old catalog.
    pub fn invalidate(&self) {
        *self.inner.write().expect("catalog lock poisoned") = None;
    }
}
