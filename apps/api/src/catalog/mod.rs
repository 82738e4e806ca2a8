//! Role catalog — the fixed reference library that grounds every generation.
//!
//! Roles are loaded once from a JSON catalog and are read-only for the life of
//! the process. The catalog is replaced wholesale on explicit invalidation;
//! individual roles are never mutated.

pub mod cache;
pub mod loader;

use std::collections::HashMap;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// A concrete project a candidate can build to demonstrate readiness for a role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofProject {
    pub title: String,
    #[serde(default)]
    pub deliverables: Vec<String>,
}

/// One role in the reference catalog.
///
/// Everything the repair engine backfills from (starter plan, proof-project
/// titles) lives on this struct. Repair never invents text outside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub core_skills: Vec<String>,
    #[serde(default)]
    pub nice_to_have_skills: Vec<String>,
    /// Ordered first-steps list for someone entering this role.
    #[serde(default)]
    pub starter_plan: Vec<String>,
    #[serde(default)]
    pub proof_projects: Vec<ProofProject>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub responsibility_areas: Vec<String>,
}

/// The loaded role catalog, indexed by role id.
#[derive(Debug)]
pub struct RoleCatalog {
    roles: Vec<Role>,
    by_id: HashMap<String, usize>,
}

impl RoleCatalog {
    /// Builds a catalog, rejecting duplicate role ids.
    pub fn new(roles: Vec<Role>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(roles.len());
        for (idx, role) in roles.iter().enumerate() {
            if by_id.insert(role.id.clone(), idx).is_some() {
                bail!("Duplicate role id in catalog: '{}'", role.id);
            }
        }
        Ok(Self { roles, by_id })
    }

    /// Roles in catalog order. Iteration order is the scorer's tie-break.
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn get(&self, id: &str) -> Option<&Role> {
        self.by_id.get(id).map(|&idx| &self.roles[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}
