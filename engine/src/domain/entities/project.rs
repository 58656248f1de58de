//! Project entity
//! A registered application: name, working directory and launch descriptor

use crate::domain::DomainError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project descriptor - the persisted catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    name: String,
    working_dir: PathBuf,
    entry_point: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

impl Project {
    pub fn builder(name: impl Into<String>, working_dir: impl Into<PathBuf>) -> ProjectBuilder {
        ProjectBuilder::new(name, working_dir)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Script path relative to the working directory (or absolute)
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

/// Builder for [`Project`]
#[derive(Debug)]
pub struct ProjectBuilder {
    name: String,
    working_dir: PathBuf,
    entry_point: String,
    description: Option<String>,
    version: Option<String>,
}

impl ProjectBuilder {
    fn new(name: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            working_dir: working_dir.into(),
            entry_point: String::new(),
            description: None,
            version: None,
        }
    }

    pub fn entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn version(mut self, version: Option<String>) -> Self {
        self.version = version;
        self
    }

    pub fn build(self) -> Result<Project, DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidManifest(
                "project name cannot be empty".to_string(),
            ));
        }
        if self.entry_point.trim().is_empty() {
            return Err(DomainError::NoEntryPoint(self.name));
        }

        Ok(Project {
            name: self.name,
            working_dir: self.working_dir,
            entry_point: self.entry_point,
            description: self.description,
            version: self.version,
        })
    }
}
