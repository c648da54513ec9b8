//! Active solution configuration stored in a solution's `.suo` file.
//!
//! The `.suo` file is a compound document; the `SolutionConfiguration`
//! stream holds `name=value;` pairs, among them `ActiveCfg=Release|x64;`.
//! Rather than walking the storage structure, the whole file is reduced to
//! its printable characters and the last `ActiveCfg` entry is taken. Since
//! the stream text is UTF-16, dropping the NUL bytes leaves the ASCII
//! content readable.

use std::path::{Path, PathBuf};

use tracing::debug;

/// The `configuration|platform` pair last active in Visual Studio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveConfiguration {
    pub configuration: String,
    pub platform: String,
}

/// Path of the `.suo` file belonging to `solution_file`.
pub fn storage_file(solution_file: &Path) -> PathBuf {
    solution_file.with_extension("suo")
}

/// Read the active configuration recorded next to `solution_file`.
///
/// Missing or unreadable files, and files without a well-formed
/// `ActiveCfg` entry, give `None`.
pub fn read_active_configuration(solution_file: &Path) -> Option<ActiveConfiguration> {
    let storage = storage_file(solution_file);
    let bytes = match std::fs::read(&storage) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %storage.display(), error = %e, "no solution options file");
            return None;
        }
    };
    let active = parse_active_configuration(&bytes);
    debug!(path = %storage.display(), ?active, "read solution options");
    active
}

/// Extract the active configuration from raw `.suo` bytes.
pub fn parse_active_configuration(bytes: &[u8]) -> Option<ActiveConfiguration> {
    let value = active_cfg_value(bytes)?;
    let mut parts = value.split('|');
    let (Some(configuration), Some(platform), None) = (parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    Some(ActiveConfiguration {
        configuration: configuration.trim().to_string(),
        platform: platform.trim().to_string(),
    })
}

/// Text following `ActiveCfg=` in the last `ActiveCfg` entry.
fn active_cfg_value(bytes: &[u8]) -> Option<String> {
    let text: String = String::from_utf8_lossy(bytes)
        .chars()
        .filter(|c| !c.is_control() && !c.is_whitespace() && *c != char::REPLACEMENT_CHARACTER)
        .collect();

    text.split(';')
        .rev()
        .find(|part| {
            part.len() > 10
                && part
                    .get(..9)
                    .is_some_and(|head| head.eq_ignore_ascii_case("ActiveCfg"))
        })
        .and_then(|part| part.get(10..))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
