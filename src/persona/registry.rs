//! Persona catalog: an in-memory set of persona definitions.
//!
//! Definitions are read from a TOML file of `[[persona]]` tables. Writing
//! definitions back is left to the host's config storage.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::store::PersonaLookup;

use super::types::{Persona, PersonaId};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "persona")]
    personas: Vec<Persona>,
}

/// Registry of known personas, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct PersonaRegistry {
    personas: HashMap<PersonaId, Persona>,
}

impl PersonaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog. Every persona is validated and ids must be unique.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content).map_err(|e| Error::ConfigParse {
            message: format!("Failed to parse persona catalog: {}", e),
            source: Some(e),
        })?;

        let mut registry = Self::new();
        for persona in file.personas {
            registry.insert(persona)?;
        }
        Ok(registry)
    }

    /// Load a catalog file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::IoRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let registry = Self::from_toml_str(&content)?;
        info!(path = %path.display(), count = registry.len(), "Persona catalog loaded");
        Ok(registry)
    }

    /// Add a persona. Rejects invalid definitions and duplicate ids.
    pub fn insert(&mut self, persona: Persona) -> Result<()> {
        persona.validate()?;
        if self.personas.contains_key(persona.id()) {
            return Err(Error::persona_invalid(persona.id(), "Duplicate persona id"));
        }
        debug!(persona = %persona.id(), roles = ?persona.roles(), "Persona registered");
        self.personas.insert(persona.id().to_string(), persona);
        Ok(())
    }

    /// Replace an existing definition, e.g. after a role change.
    pub fn update(&mut self, persona: Persona) -> Result<()> {
        persona.validate()?;
        match self.personas.get_mut(persona.id()) {
            Some(existing) => {
                *existing = persona;
                Ok(())
            }
            None => Err(Error::persona_not_found(persona.id())),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.get(id)
    }

    /// Like [`get`](Self::get) but an unknown id is an error.
    pub fn require(&self, id: &str) -> Result<&Persona> {
        self.get(id).ok_or_else(|| Error::persona_not_found(id))
    }

    /// All personas ordered by label, then id.
    pub fn list(&self) -> Vec<&Persona> {
        let mut personas: Vec<&Persona> = self.personas.values().collect();
        personas.sort_by(|a, b| a.label().cmp(b.label()).then_with(|| a.id().cmp(b.id())));
        personas
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

impl PersonaLookup for PersonaRegistry {
    fn load_personas(&self, ids: &[PersonaId]) -> Vec<Persona> {
        ids.iter().filter_map(|id| self.personas.get(id).cloned()).collect()
    }
}
