//! Canonical schema and source-system profile registry.
//!
//! The registry is the only process-wide state in the pipeline: the ordered
//! canonical field list (with its required subset) and one declared
//! column mapping per known source system. It is built once from a YAML
//! document, validated fail-fast, and read-only afterwards.
//!
//! Adding support for a new ERP export means adding a profile entry to the
//! configuration, never changing the engine.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};

/// Canonical field names the validator attaches semantics to.
pub const TRANSACTION_ID: &str = "transaction_id";
pub const QUANTITY: &str = "quantity";
pub const UNIT_PRICE: &str = "unit_price";
pub const COST_PRICE: &str = "cost_price";

const DEFAULT_REGISTRY_YAML: &str = include_str!("../config/default_registry.yaml");

/// Drives which cleaner the pipeline applies to a canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Identifier,
    Date,
    Numeric,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalField {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalSchema {
    pub fields: Vec<CanonicalField>,
}

impl CanonicalSchema {
    pub fn field(&self, name: &str) -> Option<&CanonicalField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &CanonicalField> {
        self.fields.iter().filter(|f| f.required)
    }

    pub fn fields_of_kind(&self, kind: FieldKind) -> impl Iterator<Item = &CanonicalField> {
        self.fields.iter().filter(move |f| f.kind == kind)
    }
}

/// One declared mapping entry: canonical field -> expected source column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileColumn {
    pub field: String,
    pub column: String,
}

/// A named source system and its expected column layout for the
/// sales-transaction entity. Entry order is declaration order and is
/// semantic: the matcher resolves fields in this order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceProfile {
    pub name: String,
    pub columns: Vec<ProfileColumn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub canonical: CanonicalSchema,
    pub profiles: Vec<SourceProfile>,
}

#[derive(Debug, Clone)]
pub struct Registry {
    schema: CanonicalSchema,
    profiles: Vec<SourceProfile>,
}

impl Registry {
    /// Validates a parsed configuration and builds the registry. Any
    /// malformed declaration aborts here, before a single row is read.
    pub fn from_config(config: RegistryConfig) -> Result<Self> {
        ensure!(
            !config.canonical.fields.is_empty(),
            "Canonical schema declares no fields"
        );
        let mut field_names = Vec::new();
        for field in &config.canonical.fields {
            ensure!(!field.name.is_empty(), "Canonical field with empty name");
            if field_names.contains(&field.name.as_str()) {
                bail!("Duplicate canonical field '{}'", field.name);
            }
            field_names.push(field.name.as_str());
        }

        ensure!(
            !config.profiles.is_empty(),
            "Registry declares no source-system profiles"
        );
        let mut profile_names: Vec<&str> = Vec::new();
        for profile in &config.profiles {
            ensure!(!profile.name.is_empty(), "Profile with empty name");
            if profile_names.contains(&profile.name.as_str()) {
                bail!("Duplicate profile '{}'", profile.name);
            }
            profile_names.push(profile.name.as_str());
            ensure!(
                !profile.columns.is_empty(),
                "Profile '{}' declares no column mappings",
                profile.name
            );
            let mut mapped: Vec<&str> = Vec::new();
            for entry in &profile.columns {
                ensure!(
                    field_names.contains(&entry.field.as_str()),
                    "Profile '{}' maps unknown canonical field '{}'",
                    profile.name,
                    entry.field
                );
                if mapped.contains(&entry.field.as_str()) {
                    bail!(
                        "Profile '{}' maps canonical field '{}' twice",
                        profile.name,
                        entry.field
                    );
                }
                mapped.push(entry.field.as_str());
                ensure!(
                    !entry.column.is_empty(),
                    "Profile '{}' maps '{}' to an empty column name",
                    profile.name,
                    entry.field
                );
            }
        }

        Ok(Self {
            schema: config.canonical,
            profiles: config.profiles,
        })
    }

    /// Loads and validates a registry document from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Reading registry configuration {path:?}"))?;
        let config: RegistryConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("Parsing registry configuration {path:?}"))?;
        Self::from_config(config)
    }

    /// Builds the registry from the embedded default document.
    pub fn builtin() -> Result<Self> {
        let config: RegistryConfig = serde_yaml::from_str(DEFAULT_REGISTRY_YAML)
            .context("Parsing built-in registry configuration")?;
        Self::from_config(config)
    }

    pub fn schema(&self) -> &CanonicalSchema {
        &self.schema
    }

    /// Profiles in declaration order. Order matters: detection ties are
    /// broken by the first profile encountered.
    pub fn profiles(&self) -> &[SourceProfile] {
        &self.profiles
    }

    pub fn profile(&self, name: &str) -> Option<&SourceProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }
}
