use std::path::{Path, PathBuf};

use serde::Serialize;

/// Identity of a project as listed in a solution or a project reference:
/// its file, GUID and display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectInfo {
    path: PathBuf,
    guid: String,
    name: String,
}

impl ProjectInfo {
    pub fn new(path: impl Into<PathBuf>, guid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            guid: guid.into(),
            name: name.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All three of path, GUID and name are present.
    pub fn is_valid(&self) -> bool {
        !self.path.as_os_str().is_empty() && !self.guid.is_empty() && !self.name.is_empty()
    }
}
