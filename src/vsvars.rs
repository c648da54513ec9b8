//! Parse Visual Studio environment batch files into a variable map.
//!
//! `vsvars32.bat` (and the output of `VsDevCmd.bat` captured with `set`)
//! contains `@SET KEY=VALUE` lines defining `VSINSTALLDIR`, `VCINSTALLDIR`,
//! `FrameworkDir`, `WindowsSdkDir` and friends. Those variables back the
//! `$(VCInstallDir)`-style macros found in project files.
//!
//! The same `%VAR%` expansion is applied to project and solution paths
//! handed to the factory.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{ProjectError, Result};

/// Expand `%VAR%` references using the accumulated map, then the process
/// environment. Unknown variables expand to the empty string, as the batch
/// interpreter does.
fn expand_percent_vars(s: &str, vars: &HashMap<String, String>) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '%' {
            let var_name: String = chars.by_ref().take_while(|&ch| ch != '%').collect();
            if let Some(val) = lookup(vars, &var_name) {
                result.push_str(val);
            } else if let Ok(val) = std::env::var(&var_name) {
                result.push_str(&val);
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Case-insensitive lookup: batch variable names ignore case.
fn lookup<'a>(vars: &'a HashMap<String, String>, name: &str) -> Option<&'a String> {
    vars.get(name).or_else(|| {
        vars.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

/// Expand `%VAR%` references the way `Environment.ExpandEnvironmentVariables`
/// does: names are looked up case-insensitively in `env`, and references to
/// unknown variables are left untouched.
pub fn expand_environment_variables(text: &str, env: &HashMap<String, String>) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('%') {
        result.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) => {
                let name = &after[..end];
                match lookup(env, name) {
                    Some(value) if !name.is_empty() => {
                        result.push_str(value);
                        rest = &after[end + 1..];
                    }
                    _ => {
                        // Keep the first '%' and retry from the closing one,
                        // which may open the next reference.
                        result.push('%');
                        rest = after;
                    }
                }
            }
            None => {
                result.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    result.push_str(rest);
    result
}

/// Parse the **contents** of a `vsvars32.bat`-style file into a variable map.
///
/// Each line of the form `@SET KEY=VALUE` or `SET KEY=VALUE` (case-insensitive)
/// is parsed. `%VAR%` references inside values are expanded using the
/// variables accumulated so far (document order).
///
/// Lines that don't match the `@SET` / `SET` pattern are silently skipped.
///
/// # Example
/// ```
/// let content = r#"
/// @SET VSINSTALLDIR=C:\VS9\
/// @SET VCINSTALLDIR=%VSINSTALLDIR%VC\
/// "#;
/// let vars = project_sections::vsvars::parse_vsvars(content);
/// assert_eq!(vars["VSINSTALLDIR"], r"C:\VS9\");
/// assert_eq!(vars["VCINSTALLDIR"], r"C:\VS9\VC\");
/// ```
pub fn parse_vsvars(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in content.lines() {
        let trimmed = line.trim();

        let rest = trimmed.strip_prefix('@').unwrap_or(trimmed);

        // Must start with SET (case-insensitive), then whitespace.
        let rest = match rest.get(..4) {
            Some(head)
                if head.get(..3).is_some_and(|s| s.eq_ignore_ascii_case("set"))
                    && head.ends_with(char::is_whitespace) =>
            {
                &rest[4..]
            }
            _ => continue,
        };

        let rest = rest.trim_start();

        let Some(eq_pos) = rest.find('=') else {
            continue;
        };

        let key = rest[..eq_pos].trim().to_string();
        if key.is_empty() {
            continue;
        }

        let raw_value = rest[eq_pos + 1..].to_string();

        let value = if raw_value.contains('%') {
            expand_percent_vars(&raw_value, &vars)
        } else {
            raw_value
        };

        vars.insert(key, value);
    }

    vars
}

/// Parse a `vsvars32.bat`-style file from disk into a variable map.
pub fn parse_vsvars_file(path: impl AsRef<Path>) -> Result<HashMap<String, String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ProjectError::io(path, e))?;
    Ok(parse_vsvars(&content))
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
