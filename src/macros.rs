//! `$(Name)` macro substitution.
//!
//! References are replaced left to right. Replaced text is scanned again, so
//! a value may itself contain references; a substitution budget stops
//! self-referencing values.

use crate::error::{ProjectError, Result};

const MAX_SUBSTITUTIONS: usize = 256;

/// What to do with one `$(Name)` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Replace the reference with this text.
    Value(String),
    /// Leave the reference as written.
    Keep,
    /// The name is not known anywhere.
    Unknown,
}

/// Position and name of the first `$(Name)` reference at or after `from`.
/// Names may not contain `$`, `(` or `)`.
fn next_reference(text: &str, from: usize) -> Option<(usize, usize, &str)> {
    let mut search = from;
    while let Some(offset) = text.get(search..)?.find("$(") {
        let start = search + offset;
        let name_start = start + 2;
        let rest = &text[name_start..];
        match rest.find(|c| matches!(c, '$' | '(' | ')')) {
            Some(pos) if rest.as_bytes()[pos] == b')' => {
                let end = name_start + pos + 1;
                return Some((start, end, &rest[..pos]));
            }
            Some(_) => search = start + 1,
            None => return None,
        }
    }
    None
}

/// Replace every `$(Name)` in `text` using `resolve`.
pub fn expand<F>(text: &str, mut resolve: F) -> Result<String>
where
    F: FnMut(&str) -> Resolution,
{
    let mut output = text.to_string();
    let mut from = 0;
    let mut substitutions = 0;

    while let Some((start, end, name)) = next_reference(&output, from) {
        match resolve(name) {
            Resolution::Value(value) => {
                substitutions += 1;
                if substitutions > MAX_SUBSTITUTIONS {
                    return Err(ProjectError::MacroRecursion(text.to_string()));
                }
                output.replace_range(start..end, &value);
                from = start;
            }
            Resolution::Keep => from = end,
            Resolution::Unknown => return Err(ProjectError::UnknownMacro(name.to_string())),
        }
    }

    Ok(output)
}
