use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::target::Target;

/// File name of the persisted project description.
pub const PROJECT_FILENAME: &str = "project.json";

#[derive(Debug, Error)]
pub enum ModelError {
  #[error("failed to read {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },

  #[error("failed to serialize project: {0}")]
  Serialize(#[source] serde_json::Error),
}

/// A buildable project: metadata plus its targets.
///
/// Loaded once before a build and treated as read-only afterwards.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub copyright: String,
  #[serde(default)]
  pub license: String,
  #[serde(default)]
  pub targets: Vec<Target>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub predefined_targets: Option<Vec<String>>,
}

impl Project {
  /// First target with the given name.
  pub fn target(&self, name: &str) -> Option<&Target> {
    self.targets.iter().find(|t| t.name == name)
  }

  /// Deep copy used when instantiating a project from a template.
  ///
  /// Goes through a JSON value round trip; any failure yields `None` and the
  /// caller falls back to an empty project.
  pub fn secure_clone(&self) -> Option<Project> {
    let value = serde_json::to_value(self).ok()?;
    serde_json::from_value(value).ok()
  }

  pub fn load(path: &Path) -> Result<Project, ModelError> {
    let content = fs::read_to_string(path).map_err(|source| ModelError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| ModelError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Load `project.json` from `dir`.
  ///
  /// Returns `Ok(None)` if the directory holds no project.
  pub fn find_in(dir: &Path) -> Result<Option<Project>, ModelError> {
    let path = dir.join(PROJECT_FILENAME);
    match fs::metadata(&path) {
      Ok(_) => Project::load(&path).map(Some),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(source) => Err(ModelError::Read { path, source }),
    }
  }

  /// Write the project as pretty JSON.
  ///
  /// The build never writes `project.json`; this is for scaffolding a new
  /// project from a template (see [`Project::secure_clone`]).
  pub fn save(&self, path: &Path) -> Result<(), ModelError> {
    let content = serde_json::to_string_pretty(self).map_err(ModelError::Serialize)?;
    fs::write(path, content).map_err(|source| ModelError::Write {
      path: path.to_path_buf(),
      source,
    })
  }
}
