use serde::{Deserialize, Serialize};

use crate::errors::DescriptorError;

/// Metadata a module declares about itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleDescriptor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(alias = "type", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// Extra files installed next to the module library
    #[serde(alias = "include", skip_serializing_if = "Vec::is_empty")]
    pub auxiliary_files: Vec<String>,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        ModuleDescriptor {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Parse descriptor JSON. `origin` only labels errors.
    pub fn from_json(json: &str, origin: &str) -> Result<Self, DescriptorError> {
        Self::from_slice(json.as_bytes(), origin)
    }

    pub fn from_slice(bytes: &[u8], origin: &str) -> Result<Self, DescriptorError> {
        let descriptor: ModuleDescriptor =
            serde_json::from_slice(bytes).map_err(|source| DescriptorError::Parse {
                origin: origin.to_string(),
                source,
            })?;
        descriptor.validated(origin)
    }

    pub fn to_json_pretty(&self) -> Result<String, DescriptorError> {
        serde_json::to_string_pretty(self).map_err(DescriptorError::Serialize)
    }

    /// Registry key this descriptor's module is tracked under
    pub fn key(&self) -> String {
        modhost_abi::normalize_name(&self.name)
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_auxiliary_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.auxiliary_files = files.into_iter().map(Into::into).collect();
        self
    }

    fn validated(self, origin: &str) -> Result<Self, DescriptorError> {
        if self.name.trim().is_empty() {
            return Err(DescriptorError::MissingName(origin.to_string()));
        }
        Ok(self)
    }
}
