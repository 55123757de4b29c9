//! Schema and vocabulary registry.
//!
//! Loads every definition under a schema directory once at startup and serves
//! read-only lookups afterwards. The registry is shared across threads behind
//! an `Arc` and never mutated after `load`.
//!
//! Directory layout:
//! ```text
//! <dir>/registry.{yaml,yml,toml}           optional registry table
//! <dir>/schemas-vocab/<name>.{json,yaml,yml,toml}  vocabularies
//! <dir>/schemas-core/<name>.json           core schemas
//! <dir>/schemas-domains/<domain>/<name>.json  schemas named "<name>.<domain>"
//! ```

use super::types::{Schema, Vocabulary, split_enum_ref};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Registry table candidates, first match wins.
const REGISTRY_FILES: [&str; 3] = ["registry.yaml", "registry.yml", "registry.toml"];
const VOCAB_DIR: &str = "schemas-vocab";
const CORE_DIR: &str = "schemas-core";
const DOMAINS_DIR: &str = "schemas-domains";

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Schema directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type SchemaResult<T> = Result<T, SchemaError>;

/// A definition file that could not be loaded. Loading continues past it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadIssue {
    pub path: PathBuf,
    pub message: String,
}

/// An `enum_ref` that does not point at an existing vocabulary enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub field: String,
    pub reference: String,
}

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Schema>,
    vocabularies: BTreeMap<String, Vocabulary>,
    registry: toml::Table,
    issues: Vec<LoadIssue>,
}

impl SchemaRegistry {
    /// A registry with no schemas. Every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a registry from in-memory definitions.
    pub fn from_parts<S, V>(schemas: S, vocabularies: V) -> Self
    where
        S: IntoIterator<Item = (String, Schema)>,
        V: IntoIterator<Item = (String, Vocabulary)>,
    {
        let registry = Self {
            schemas: schemas.into_iter().collect(),
            vocabularies: vocabularies.into_iter().collect(),
            ..Default::default()
        };
        registry.report_unresolved();
        registry
    }

    /// Eagerly load all definitions under `dir`.
    ///
    /// Only a missing root is an error. Unreadable or malformed files are
    /// logged, recorded in [`issues`](Self::issues) and skipped.
    pub fn load(dir: &Path) -> SchemaResult<Self> {
        if !dir.is_dir() {
            return Err(SchemaError::DirectoryNotFound(dir.to_path_buf()));
        }

        let mut registry = Self::default();
        registry.load_registry_table(dir)?;
        registry.load_vocabularies(&dir.join(VOCAB_DIR));
        registry.load_core_schemas(&dir.join(CORE_DIR));
        registry.load_domain_schemas(&dir.join(DOMAINS_DIR));

        tracing::info!(
            target: "schema",
            "loaded {} schemas and {} vocabularies from {}",
            registry.schemas.len(),
            registry.vocabularies.len(),
            dir.display()
        );
        registry.report_unresolved();

        Ok(registry)
    }

    fn load_registry_table(&mut self, dir: &Path) -> SchemaResult<()> {
        let Some(path) = REGISTRY_FILES.iter().map(|f| dir.join(f)).find(|p| p.is_file()) else {
            tracing::debug!(target: "schema", "no registry file in {}", dir.display());
            return Ok(());
        };

        let raw = std::fs::read_to_string(&path).map_err(|source| SchemaError::Io {
            path: path.clone(),
            source,
        })?;
        let parsed = match extension(&path).as_deref() {
            Some("toml") => toml::from_str::<toml::Table>(&raw).map_err(|e| e.to_string()),
            _ => serde_yaml::from_str::<toml::Table>(&raw).map_err(|e| e.to_string()),
        };
        match parsed {
            Ok(table) => self.registry = table,
            Err(e) => self.record_issue(&path, format!("invalid registry: {e}")),
        }
        Ok(())
    }

    fn load_vocabularies(&mut self, dir: &Path) {
        for path in self.files_in(dir, 1) {
            let Some(name) = file_stem(&path) else {
                continue;
            };
            let parsed = match extension(&path).as_deref() {
                Some("json") => read_json::<Vocabulary>(&path),
                Some("yaml" | "yml") => read_yaml::<Vocabulary>(&path),
                Some("toml") => read_toml::<Vocabulary>(&path),
                _ => continue,
            };
            match parsed {
                Ok(vocab) => {
                    tracing::debug!(target: "schema", "loaded vocabulary {name}");
                    self.vocabularies.insert(name, vocab);
                }
                Err(message) => self.record_issue(&path, message),
            }
        }
    }

    fn load_core_schemas(&mut self, dir: &Path) {
        for path in self.files_in(dir, 1) {
            if extension(&path).as_deref() != Some("json") {
                continue;
            }
            let Some(name) = file_stem(&path) else {
                continue;
            };
            self.insert_schema_file(name, &path);
        }
    }

    fn load_domain_schemas(&mut self, dir: &Path) {
        for path in self.files_in(dir, 2) {
            if extension(&path).as_deref() != Some("json") {
                continue;
            }
            let domain = path
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned());
            let (Some(stem), Some(domain)) = (file_stem(&path), domain) else {
                continue;
            };
            self.insert_schema_file(format!("{stem}.{domain}"), &path);
        }
    }

    fn insert_schema_file(&mut self, name: String, path: &Path) {
        match read_json::<Schema>(path) {
            Ok(schema) => {
                let missing = schema.undeclared_required();
                if !missing.is_empty() {
                    tracing::warn!(
                        target: "schema",
                        "schema {name} requires undeclared fields: {}",
                        missing.join(", ")
                    );
                }
                tracing::debug!(target: "schema", "loaded schema {name}");
                self.schemas.insert(name, schema);
            }
            Err(message) => self.record_issue(path, message),
        }
    }

    /// Regular files exactly `depth` levels below `dir`, sorted by name.
    fn files_in(&mut self, dir: &Path, depth: usize) -> Vec<PathBuf> {
        if !dir.is_dir() {
            return Vec::new();
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(depth)
            .max_depth(depth)
            .sort_by_file_name()
        {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => {
                    let path = e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
                    self.record_issue(&path, e.to_string());
                }
            }
        }
        files
    }

    fn record_issue(&mut self, path: &Path, message: String) {
        tracing::warn!(target: "schema", "skipping {}: {message}", path.display());
        self.issues.push(LoadIssue {
            path: path.to_path_buf(),
            message,
        });
    }

    fn report_unresolved(&self) {
        for name in self.schemas.keys() {
            for unresolved in self.unresolved_references(name) {
                tracing::warn!(
                    target: "schema",
                    "invalid enum reference in {name}.{}: {}",
                    unresolved.field,
                    unresolved.reference
                );
            }
        }
    }

    pub fn get_schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn get_vocabulary(&self, name: &str) -> Option<&Vocabulary> {
        self.vocabularies.get(name)
    }

    /// Schema names in sorted order.
    pub fn list_schemas(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }

    pub fn list_vocabularies(&self) -> Vec<&str> {
        self.vocabularies.keys().map(String::as_str).collect()
    }

    /// Contents of the registry file, empty when none is present.
    pub fn registry(&self) -> &toml::Table {
        &self.registry
    }

    pub fn issues(&self) -> &[LoadIssue] {
        &self.issues
    }

    /// `true` when the schema exists and every `enum_ref` resolves.
    pub fn validate_schema_references(&self, name: &str) -> bool {
        self.schemas.contains_key(name) && self.unresolved_references(name).is_empty()
    }

    /// Every `enum_ref` of the named schema that fails to resolve.
    pub fn unresolved_references(&self, name: &str) -> Vec<UnresolvedReference> {
        let Some(schema) = self.schemas.get(name) else {
            return Vec::new();
        };

        schema
            .fields
            .iter()
            .filter_map(|(field, def)| {
                let reference = def.enum_ref.as_deref()?;
                if self.resolve_enum(reference).is_some() {
                    None
                } else {
                    Some(UnresolvedReference {
                        field: field.clone(),
                        reference: reference.to_string(),
                    })
                }
            })
            .collect()
    }

    /// Schemas that loaded but carry at least one unresolved reference.
    pub fn flagged_schemas(&self) -> Vec<&str> {
        self.schemas
            .keys()
            .filter(|name| !self.unresolved_references(name).is_empty())
            .map(String::as_str)
            .collect()
    }

    /// Values behind a `vocabulary.enum_name` reference.
    pub fn resolve_enum(&self, reference: &str) -> Option<&[String]> {
        let (vocab, enum_name) = split_enum_ref(reference)?;
        self.vocabularies
            .get(vocab)?
            .get(enum_name)
            .map(Vec::as_slice)
    }
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&raw).map_err(|e| format!("invalid JSON: {e}"))
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_yaml::from_str(&raw).map_err(|e| format!("invalid YAML: {e}"))
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let raw = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    toml::from_str(&raw).map_err(|e| format!("invalid TOML: {e}"))
}
