use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;

use crate::composition::{Resolve, SchemaRef};
use crate::config::RegistryConfig;
use crate::document::SchemaDocument;
use crate::error::{Result, SchemaError};
use crate::spec::{SchemaDefinition, SchemaId, SpecNode};
use crate::validator::{explain, validate, ValidationResult};

/// Immutable view of the registry at one point in time.
pub type Snapshot = HashMap<SchemaId, Arc<SchemaDefinition>>;

const SCHEMA_FILE_SUFFIX: &str = ".spec.json";

/// Id-keyed store of schema definitions, shared across threads.
///
/// Reads take a cheap snapshot of the current map; writes copy the map and
/// swap the new one in, so a validation in flight always sees one consistent
/// set of schemas. The last registration under an id wins.
pub struct SchemaRegistry {
    schemas: RwLock<Arc<Snapshot>>,
    config: RegistryConfig,
}

impl SchemaRegistry {
    /// Create an empty registry with default config.
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry with explicit config.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            schemas: RwLock::new(Arc::new(HashMap::new())),
            config,
        }
    }

    /// Store `spec` under `id`, replacing any previous definition.
    pub fn register(&self, id: impl Into<SchemaId>, spec: SpecNode) -> SchemaId {
        let id = id.into();
        let definition = Arc::new(SchemaDefinition::new(id.clone(), spec));

        let mut guard = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = (**guard).clone();
        let replaced = next.insert(id.clone(), definition).is_some();
        *guard = Arc::new(next);

        debug!(schema = %id, replaced, "registered schema");
        id
    }

    /// Register a schema from a JSON document string.
    pub fn register_document(&self, document_json: &str) -> Result<SchemaId> {
        let document: SchemaDocument = serde_json::from_str(document_json)?;
        self.register_parsed(document)
    }

    /// Register a schema from a JSON document value.
    pub fn register_value(&self, document: &Value) -> Result<SchemaId> {
        let document = SchemaDocument::deserialize_value(document)?;
        self.register_parsed(document)
    }

    fn register_parsed(&self, document: SchemaDocument) -> Result<SchemaId> {
        let spec = document.compile()?;
        Ok(self.register(document.id, spec))
    }

    /// Remove a schema. Returns the definition that was stored, if any.
    pub fn remove(&self, id: &str) -> Option<Arc<SchemaDefinition>> {
        let mut guard = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
        if !guard.contains_key(id) {
            return None;
        }
        let mut next = (**guard).clone();
        let removed = next.remove(id);
        *guard = Arc::new(next);

        debug!(schema = id, "removed schema");
        removed
    }

    /// Load schemas from a directory.
    pub fn from_directory(path: &Path) -> Result<Self> {
        Self::from_directory_with_config(path, RegistryConfig::default())
    }

    /// Load `*.spec.json` documents from a directory with explicit config.
    pub fn from_directory_with_config(path: &Path, config: RegistryConfig) -> Result<Self> {
        let registry = Self::with_config(config);
        let mut loaded_schema_count = 0usize;
        let mut loaded_ids: HashSet<SchemaId> = HashSet::new();

        let entries = std::fs::read_dir(path)
            .map_err(|err| SchemaError::LoadFailed(format!("{}: {err}", path.display())))?;

        for entry in entries {
            let entry = entry.map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            let is_schema_file = file_name.to_ascii_lowercase().ends_with(SCHEMA_FILE_SUFFIX);
            let entry_path = entry.path();
            let path_metadata = std::fs::symlink_metadata(&entry_path)
                .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;
            let file_type = path_metadata.file_type();

            if !is_schema_file {
                continue;
            }
            if file_type.is_symlink() {
                return Err(SchemaError::LoadFailed(format!(
                    "refusing to load schema symlink: {file_name}"
                )));
            }
            if !file_type.is_file() {
                continue;
            }

            loaded_schema_count = loaded_schema_count.saturating_add(1);
            if loaded_schema_count > registry.config.max_schemas_from_directory {
                return Err(SchemaError::LoadFailed(format!(
                    "schema count exceeds configured max ({}): {}",
                    registry.config.max_schemas_from_directory, loaded_schema_count
                )));
            }

            let file = std::fs::File::open(&entry_path).map_err(|err| {
                SchemaError::LoadFailed(format!(
                    "failed opening schema {}: {err}",
                    entry_path.display()
                ))
            })?;
            let opened_metadata = file
                .metadata()
                .map_err(|err| SchemaError::LoadFailed(err.to_string()))?;

            #[cfg(unix)]
            {
                if !same_file_identity(&path_metadata, &opened_metadata) {
                    return Err(SchemaError::LoadFailed(format!(
                        "schema file changed during load: {file_name}"
                    )));
                }
            }

            if opened_metadata.len() > registry.config.max_schema_file_size as u64 {
                return Err(SchemaError::LoadFailed(format!(
                    "schema file too large ({} bytes): {file_name}",
                    opened_metadata.len()
                )));
            }

            let max_bytes = registry.config.max_schema_file_size;
            let read_limit = u64::try_from(max_bytes.saturating_add(1)).unwrap_or(u64::MAX);
            let mut content = String::new();
            file.take(read_limit)
                .read_to_string(&mut content)
                .map_err(|err| {
                    SchemaError::LoadFailed(format!(
                        "failed reading schema {}: {err}",
                        entry_path.display()
                    ))
                })?;
            if content.len() > max_bytes {
                return Err(SchemaError::LoadFailed(format!(
                    "schema file too large while reading: {file_name}"
                )));
            }

            let document: SchemaDocument = serde_json::from_str(&content)
                .map_err(|err| SchemaError::LoadFailed(format!("{file_name}: {err}")))?;
            if !loaded_ids.insert(document.id.clone()) {
                return Err(SchemaError::LoadFailed(format!(
                    "duplicate schema id {} in {file_name}",
                    document.id
                )));
            }
            let id = registry.register_parsed(document)?;
            debug!(schema = %id, file = %file_name, "loaded schema file");
        }

        Ok(registry)
    }

    /// Load from embedded schema documents.
    pub fn from_embedded(documents: &[&str]) -> Result<Self> {
        let registry = Self::new();
        for document in documents {
            registry.register_document(document)?;
        }
        Ok(registry)
    }

    /// Current definition for `id`, if registered.
    pub fn get(&self, id: &str) -> Option<Arc<SchemaDefinition>> {
        self.snapshot().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.snapshot().contains_key(id)
    }

    /// All registered ids, sorted.
    pub fn list(&self) -> Vec<SchemaId> {
        let mut ids: Vec<SchemaId> = self.snapshot().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// The current set of schemas. Later registrations do not affect it.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        let guard = self.schemas.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Validate `value` against the schema registered as `id`.
    pub fn validate(&self, value: &Value, id: &str) -> Result<bool> {
        let snapshot = self.snapshot();
        let definition = lookup(&snapshot, id)?;
        Ok(validate(value, definition.spec(), snapshot.as_ref()))
    }

    /// Explain every failure of `value` against the schema registered as `id`.
    pub fn explain(&self, value: &Value, id: &str) -> Result<ValidationResult> {
        let snapshot = self.snapshot();
        let definition = lookup(&snapshot, id)?;
        Ok(explain(value, definition.spec(), snapshot.as_ref()))
    }

    /// A matcher for the schema registered as `id`.
    ///
    /// Each check resolves `id` and everything it references against one snapshot.
    pub fn schema_ref(&self, id: impl Into<SchemaId>) -> SchemaRef<'_, Self> {
        SchemaRef::new(id, self)
    }

    /// Get registry configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolve for SchemaRegistry {
    fn resolve(&self, id: &SchemaId) -> Option<Arc<SchemaDefinition>> {
        self.get(id.as_str())
    }

    fn pinned(&self) -> Option<Arc<Snapshot>> {
        Some(self.snapshot())
    }
}

fn lookup(snapshot: &Snapshot, id: &str) -> Result<Arc<SchemaDefinition>> {
    snapshot
        .get(id)
        .cloned()
        .ok_or_else(|| SchemaError::SchemaNotFound(SchemaId::from(id)))
}

#[cfg(unix)]
fn same_file_identity(
    path_metadata: &std::fs::Metadata,
    opened_metadata: &std::fs::Metadata,
) -> bool {
    use std::os::unix::fs::MetadataExt;
    path_metadata.dev() == opened_metadata.dev() && path_metadata.ino() == opened_metadata.ino()
}
