/// Controls registry loading and topic lookup behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Maximum number of schemas loaded from a directory.
    pub max_schemas_from_directory: usize,
    /// Maximum bytes allowed per schema file loaded from a directory.
    pub max_schema_file_size: usize,
    /// Variant name tried first when resolving a topic (`"{topic}/{variant}"`).
    pub default_variant: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_schemas_from_directory: 256,
            max_schema_file_size: 256 * 1024,
            default_variant: "default".to_string(),
        }
    }
}
