//! Catalog loader — reads the role catalog from a JSON document on disk.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::catalog::{Role, RoleCatalog};

/// Parses a catalog from a JSON array of role documents.
pub fn parse_catalog(json: &str) -> Result<RoleCatalog> {
    let roles: Vec<Role> =
        serde_json::from_str(json).context("Role catalog is not a valid JSON array of roles")?;
    RoleCatalog::new(roles)
}

/// Loads the catalog from `path`. Called once at startup and again only on
/// explicit cache invalidation.
pub fn load_catalog(path: &Path) -> Result<RoleCatalog> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read role catalog at {}", path.display()))?;
    let catalog = parse_catalog(&raw)?;
    info!(
        "Loaded role catalog: {} roles from {}",
        catalog.len(),
        path.display()
    );
    Ok(catalog)
}
