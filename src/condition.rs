//! `Condition` attributes of MSBuild project files.
//!
//! Visual Studio writes conditions on `<PropertyGroup>`, `<When>`,
//! `<ItemDefinitionGroup>` and single properties, for example:
//!
//! - `'$(Configuration)|$(Platform)' == 'Debug|AnyCPU'`
//! - ` '$(Configuration)' == '' `
//! - `'$(Configuration)'=='Debug' And '$(Platform)'=='x86'`
//! - `Exists('$(VCTargetsPath)\Microsoft.Cpp.props')`
//!
//! The supported subset, parsed with [`chumsky`]:
//!
//! ```text
//! condition   = disjunction
//! disjunction = conjunction (OR conjunction)*
//! conjunction = term (AND term)*
//! term        = operand ('==' | '!=') operand
//!             | EXISTS '(' operand ')'
//!             | '(' condition ')'
//! operand     = "'" text "'"
//! ```
//!
//! Keywords ignore case. Property functions and numeric comparisons are
//! not part of the subset; such conditions fail to parse.

use chumsky::prelude::*;
use std::collections::HashMap;
use std::path::Path;

use crate::paths;

// ═══════════════════════════════════════════════════════════════════════════════
//  Syntax tree
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `'left' == 'right'`; `negated` for `!=`.
    Compare {
        left: Vec<Fragment>,
        negated: bool,
        right: Vec<Fragment>,
    },
    Exists(Vec<Fragment>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

/// Piece of a quoted operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Text(String),
    /// `$(Name)`
    Property(String),
}

/// `$(Configuration)\bin` → `[Property("Configuration"), Text("\bin")]`.
///
/// An unterminated `$(` takes the rest of the operand as the name.
fn split_fragments(operand: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut rest = operand;
    while let Some(start) = rest.find("$(") {
        if start > 0 {
            fragments.push(Fragment::Text(rest[..start].to_string()));
        }
        let after = &rest[start + 2..];
        let end = after.find(')').unwrap_or(after.len());
        fragments.push(Fragment::Property(after[..end].to_string()));
        rest = after.get(end + 1..).unwrap_or("");
    }
    if !rest.is_empty() {
        fragments.push(Fragment::Text(rest.to_string()));
    }
    fragments
}

/// The operand as written, `$(Name)` references included.
fn render(fragments: &[Fragment]) -> String {
    let mut text = String::new();
    for fragment in fragments {
        match fragment {
            Fragment::Text(t) => text.push_str(t),
            Fragment::Property(name) => {
                text.push_str("$(");
                text.push_str(name);
                text.push(')');
            }
        }
    }
    text
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Grammar
// ═══════════════════════════════════════════════════════════════════════════════

type ParseError<'a> = extra::Err<Simple<'a, char>>;

/// A word matched without regard to case, e.g. `And`, `OR`, `exists`.
fn keyword<'a>(word: &'static str) -> impl Parser<'a, &'a str, (), ParseError<'a>> + Clone {
    any()
        .filter(|c: &char| c.is_ascii_alphabetic())
        .repeated()
        .at_least(1)
        .to_slice()
        .filter(move |found: &&str| found.eq_ignore_ascii_case(word))
        .ignored()
        .padded()
}

fn grammar<'a>() -> impl Parser<'a, &'a str, Condition, ParseError<'a>> {
    recursive(|condition| {
        let operand = none_of('\'')
            .repeated()
            .to_slice()
            .delimited_by(just('\''), just('\''))
            .map(split_fragments)
            .padded();

        let operator = choice((just("==").to(false), just("!=").to(true))).padded();

        let compare = operand
            .clone()
            .then(operator)
            .then(operand.clone())
            .map(|((left, negated), right)| Condition::Compare { left, negated, right });

        let exists = keyword("exists")
            .ignore_then(operand.delimited_by(just('(').padded(), just(')').padded()))
            .map(Condition::Exists);

        let group = condition.delimited_by(just('(').padded(), just(')').padded());

        let term = choice((compare, exists, group)).padded();

        let conjunction = term.clone().foldl(
            keyword("and").ignore_then(term).repeated(),
            |a, b| Condition::And(Box::new(a), Box::new(b)),
        );

        conjunction.clone().foldl(
            keyword("or").ignore_then(conjunction).repeated(),
            |a, b| Condition::Or(Box::new(a), Box::new(b)),
        )
    })
}

/// Parse the text of a `Condition` attribute.
pub fn parse_condition(input: &str) -> Result<Condition, String> {
    grammar().parse(input).into_result().map_err(|errors| {
        let reasons: Vec<String> = errors.iter().map(ToString::to_string).collect();
        format!("invalid condition `{input}`: {}", reasons.join("; "))
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Evaluation
// ═══════════════════════════════════════════════════════════════════════════════

/// Substitute property values; unset properties are empty.
fn substitute(fragments: &[Fragment], properties: &HashMap<String, String>) -> String {
    let mut text = String::new();
    for fragment in fragments {
        match fragment {
            Fragment::Text(t) => text.push_str(t),
            Fragment::Property(name) => {
                if let Some(value) = properties.get(name.as_str()) {
                    text.push_str(value);
                }
            }
        }
    }
    text
}

/// Evaluate `condition` with the given property values.
///
/// Comparisons ignore ASCII case and surrounding blanks. `Exists` checks the
/// file system, resolving relative paths against `MSBuildProjectDirectory`
/// when that property is set.
pub fn evaluate(condition: &Condition, properties: &HashMap<String, String>) -> bool {
    match condition {
        Condition::Compare { left, negated, right } => {
            let left = substitute(left, properties);
            let right = substitute(right, properties);
            left.trim().eq_ignore_ascii_case(right.trim()) != *negated
        }
        Condition::Exists(fragments) => {
            let raw = substitute(fragments, properties);
            if raw.trim().is_empty() {
                return false;
            }
            let path = match properties.get("MSBuildProjectDirectory") {
                Some(dir) => paths::resolve(Path::new(dir), &raw),
                None => paths::full_path(Path::new(&paths::normalize_separators(&raw))),
            };
            path.exists()
        }
        Condition::And(a, b) => evaluate(a, properties) && evaluate(b, properties),
        Condition::Or(a, b) => evaluate(a, properties) || evaluate(b, properties),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Configuration / platform matching
// ═══════════════════════════════════════════════════════════════════════════════

/// Map the `$(Name)` references of a condition's left-hand side to the
/// corresponding `|`-separated pieces of its right-hand side.
///
/// `('$(Configuration)|$(Platform)', 'Debug|x86')` gives
/// `{configuration: Debug, platform: x86}`. Keys are lowercased; the last
/// recognised name receives the remainder of the right-hand side.
pub fn extract_condition_map(left: &str, right: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let names: Vec<&str> = left.split('|').collect();
    let mut rest = right;

    for (i, part) in names.iter().enumerate() {
        let Some(name) = property_reference(part.trim()) else {
            continue;
        };
        let value = match rest.find('|') {
            Some(pos) if i != names.len() - 1 => {
                let value = &rest[..pos];
                rest = &rest[pos + 1..];
                value
            }
            _ => {
                map.insert(name.to_ascii_lowercase(), rest.trim().to_string());
                break;
            }
        };
        map.insert(name.to_ascii_lowercase(), value.trim().to_string());
    }

    map
}

/// `$(Name)` → `Name`; anything else → `None`.
fn property_reference(text: &str) -> Option<&str> {
    let name = text.strip_prefix("$(")?.strip_suffix(')')?;
    if name.contains(['$', '(', ')']) {
        return None;
    }
    Some(name)
}

/// Simple condition matching for configuration and platform conditions,
/// e.g. `'$(Configuration)|$(Platform)' == 'Debug|x86'`.
///
/// Only a single `==` comparison naming both the configuration and the
/// platform is understood; a configuration-only condition or an empty
/// `platform` never matches. `AnyCPU` and `Any CPU` are treated as the
/// same platform.
pub fn is_condition_matched(configuration: &str, platform: &str, condition: &str) -> bool {
    if condition.trim().is_empty() || configuration.is_empty() {
        return false;
    }

    let Ok(Condition::Compare { left, negated: false, right }) = parse_condition(condition) else {
        return false;
    };

    let map = extract_condition_map(&render(&left), &render(&right));

    let Some(config_value) = map.get("configuration").filter(|v| !v.is_empty()) else {
        return false;
    };
    if !configuration.eq_ignore_ascii_case(config_value) {
        return false;
    }

    if platform.is_empty() || map.len() < 2 {
        return false;
    }

    match map.get("platform").filter(|v| !v.is_empty()) {
        None => false,
        Some(platform_value) if is_any_cpu(platform) => platform
            .replace(' ', "")
            .eq_ignore_ascii_case(&platform_value.replace(' ', "")),
        Some(platform_value) => platform.eq_ignore_ascii_case(platform_value),
    }
}

fn is_any_cpu(platform: &str) -> bool {
    platform.eq_ignore_ascii_case("AnyCPU") || platform.eq_ignore_ascii_case("Any CPU")
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
