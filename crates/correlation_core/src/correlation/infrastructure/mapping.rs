//! Resource records and the mapping document they are loaded from.
//!
//! The mapping file is a YAML document with a top-level `mapping` sequence:
//!
//! ```yaml
//! mapping:
//!   - path: /v1/orders
//!     api_id: a1
//!     version: "1.0"
//!     stage: prod
//!     client_id: c1
//! ```
use std::{collections::HashMap, fs, path::Path};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::correlation::error::CorrelationError;

/// Identity record associated with a request path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Resource {
    pub path: String,
    pub api_id: String,
    pub version: String,
    pub stage: String,
    pub client_id: String,
}

impl Resource {
    pub fn new(
        path: impl Into<String>,
        api_id: impl Into<String>,
        version: impl Into<String>,
        stage: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            api_id: api_id.into(),
            version: version.into(),
            stage: stage.into(),
            client_id: client_id.into(),
        }
    }
}

/// Lookup table from request path to resource.
pub type ResourceMappings = HashMap<String, Resource>;

/// Parsed resource mapping file.
///
/// Entries keep their file order so that callers iterating the document (the
/// client batch mode) do so deterministically.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MappingDocument {
    #[serde(default)]
    pub mapping: Vec<Resource>,
}

impl MappingDocument {
    /// Parses a mapping document from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file is a document without entries
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Reads and parses the mapping file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `MappingFile` when the file cannot be read and `MappingFormat` when
    /// its content is not a valid mapping document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CorrelationError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| CorrelationError::MappingFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let document = Self::from_yaml(&contents).map_err(|e| CorrelationError::MappingFormat {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), entries = document.mapping.len(), "loaded resource mapping");
        Ok(document)
    }

    /// Paths of all entries, in file order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.mapping.iter().map(|resource| resource.path.as_str())
    }

    /// Builds the lookup table. A path listed twice keeps its last entry.
    pub fn to_mappings(&self) -> ResourceMappings {
        self.mapping.iter().map(|resource| (resource.path.clone(), resource.clone())).collect()
    }
}

impl From<MappingDocument> for ResourceMappings {
    fn from(document: MappingDocument) -> Self {
        document.mapping.into_iter().map(|resource| (resource.path.clone(), resource)).collect()
    }
}
