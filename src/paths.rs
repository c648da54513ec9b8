//! Path handling with Visual Studio project-file conventions.
//!
//! Project and solution files are written on Windows: values use `\` as the
//! separator and directory macros end with one. These helpers accept both
//! separators on every host and resolve paths lexically, the way
//! `Path.GetFullPath` does, without touching the file system.

use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

/// Replace `\` with the host separator (no-op on Windows).
pub fn normalize_separators(value: &str) -> String {
    if cfg!(windows) {
        value.to_string()
    } else {
        value.replace('\\', "/")
    }
}

/// Absolute, lexically normalised form of `path`.
///
/// Relative paths are anchored at the current directory; `.` components are
/// dropped and `..` removes the preceding component.
pub fn full_path(path: &Path) -> PathBuf {
    let anchored = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in anchored.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Resolve a path value read from a project file.
///
/// Rooted values are normalised as they are; anything else is taken
/// relative to `base`.
pub fn resolve(base: &Path, value: &str) -> PathBuf {
    let value = normalize_separators(value.trim());
    let candidate = Path::new(&value);
    if candidate.is_absolute() {
        full_path(candidate)
    } else {
        full_path(&base.join(candidate))
    }
}

/// Directory path as a string ending with the separator, the form the
/// `$(ProjectDir)` / `$(SolutionDir)` macros expand to.
pub fn with_trailing_separator(dir: &Path) -> String {
    let mut text = dir.to_string_lossy().into_owned();
    if !text.ends_with(MAIN_SEPARATOR) {
        text.push(MAIN_SEPARATOR);
    }
    text
}

/// File name without its extension, or an empty string.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File name including its extension, or an empty string.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Extension with its leading dot (`.csproj`), or an empty string.
pub fn extension(path: &Path) -> String {
    path.extension()
        .map(|s| format!(".{}", s.to_string_lossy()))
        .unwrap_or_default()
}
