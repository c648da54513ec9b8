use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("IO error: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("XML error in {path}: {source}")]
    Xml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("{path}: expected a <{expected}> root element, found <{found}>")]
    UnexpectedRoot {
        path: PathBuf,
        expected: &'static str,
        found: String,
    },

    #[error("The VS.NET macro '{0}' cannot be found.")]
    UnknownMacro(String),

    #[error("Macro expansion of '{0}' does not terminate")]
    MacroRecursion(String),

    #[error("The target framework version '{0}' is not known.")]
    UnknownFrameworkVersion(String),

    #[error("The specified platform '{0}' is not available.")]
    PlatformNotAvailable(String),

    #[error("Invalid configuration type '{0}'")]
    InvalidConfigurationType(String),

    #[error("The project is not well-formed, a project reference in {0} has no project GUID.")]
    MissingReferenceGuid(PathBuf),

    #[error("The argument '{0}' is required and cannot be empty.")]
    MissingArgument(&'static str),

    #[error("The path '{0}' does not exist.")]
    PathNotFound(PathBuf),
}

impl ProjectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, ProjectError>;
