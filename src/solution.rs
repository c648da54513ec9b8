//! Project list of a Visual Studio solution (`.sln`) file.
//!
//! Only the project declaration lines are read:
//!
//! ```text
//! Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "App", "App\App.csproj", "{6F2A4B8C-1D3E-4F50-8A9B-0C1D2E3F4A5B}"
//! ```
//!
//! Uses [`chumsky`] for the line grammar.

use chumsky::prelude::*;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{ProjectError, Result};
use crate::info::ProjectInfo;
use crate::paths;

/// Project type GUID of solution folders, which are not projects on disk.
pub const SOLUTION_FOLDER_TYPE: &str = "{2150E333-8FDC-42A3-9474-1A3956D46DE8}";

/// One `Project(...)` declaration, exactly as written in the solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionProject {
    pub type_guid: String,
    pub name: String,
    pub path: String,
    pub guid: String,
}

impl SolutionProject {
    pub fn is_solution_folder(&self) -> bool {
        self.type_guid.eq_ignore_ascii_case(SOLUTION_FOLDER_TYPE)
    }
}

fn project_line_parser<'a>() -> impl Parser<'a, &'a str, SolutionProject, extra::Err<Simple<'a, char>>>
{
    let quoted = just('"')
        .ignore_then(none_of('"').repeated().to_slice())
        .then_ignore(just('"'));
    let comma = just(',').padded();

    just("Project(")
        .ignore_then(quoted.clone())
        .then_ignore(just(')'))
        .then_ignore(just('=').padded())
        .then(quoted.clone())
        .then_ignore(comma.clone())
        .then(quoted.clone())
        .then_ignore(comma)
        .then(quoted)
        .then_ignore(end())
        .map(|(((type_guid, name), path), guid): (((&str, &str), &str), &str)| SolutionProject {
            type_guid: type_guid.to_string(),
            name: name.to_string(),
            path: path.to_string(),
            guid: guid.to_string(),
        })
}

/// Parse a single (trimmed) solution line; `None` unless it declares a project.
pub fn parse_project_line(line: &str) -> Option<SolutionProject> {
    project_line_parser().parse(line.trim()).into_result().ok()
}

/// All projects declared in the solution `content`, with paths resolved
/// against `solution_dir`.
///
/// Declarations with an empty name, path or GUID, and solution folders,
/// are left out.
pub fn parse_solution(content: &str, solution_dir: &Path) -> Vec<ProjectInfo> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut projects = Vec::new();

    for line in content.lines() {
        let Some(project) = parse_project_line(line) else {
            continue;
        };
        if project.is_solution_folder() {
            continue;
        }
        if project.name.is_empty() || project.path.is_empty() || project.guid.is_empty() {
            warn!(line = line.trim(), "incomplete project declaration");
            continue;
        }

        let info = ProjectInfo::new(
            paths::resolve(solution_dir, &project.path),
            project.guid,
            project.name,
        );
        if info.is_valid() {
            debug!(name = info.name(), guid = info.guid(), "solution project");
            projects.push(info);
        }
    }

    projects
}

/// Read the projects of the solution at `solution_file`.
///
/// A solution that does not exist has no projects.
pub fn solution_projects(solution_file: &Path) -> Result<Vec<ProjectInfo>> {
    if !solution_file.is_file() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(solution_file)
        .map_err(|e| ProjectError::io(solution_file, e))?;
    let dir = solution_file.parent().unwrap_or(Path::new(""));
    Ok(parse_solution(&content, &paths::full_path(dir)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOLUTION: &str = "\u{feff}
Microsoft Visual Studio Solution File, Format Version 11.00
# Visual Studio 2010
Project(\"{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}\") = \"App\", \"App\\App.csproj\", \"{6F2A4B8C-1D3E-4F50-8A9B-0C1D2E3F4A5B}\"
EndProject
Project(\"{2150E333-8FDC-42A3-9474-1A3956D46DE8}\") = \"Solution Items\", \"Solution Items\", \"{3B960F8F-AD5D-45E7-92C0-05B65E200AC4}\"
EndProject
  Project(\"{8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942}\")  =  \"Native\" , \"..\\Native\\Native.vcxproj\" , \"{0A1B2C3D-4E5F-4061-8293-A4B5C6D7E8F9}\"
EndProject
Project(\"{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}\") = \"\", \"Empty\\Empty.csproj\", \"{11111111-2222-3333-4444-555555555555}\"
EndProject
Global
EndGlobal
";

    #[test]
    fn parse_line_fields() {
        let project = parse_project_line(
            r#"Project("{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}") = "App", "App\App.csproj", "{6F2A4B8C-1D3E-4F50-8A9B-0C1D2E3F4A5B}""#,
        )
        .unwrap();
        assert_eq!(project.type_guid, "{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}");
        assert_eq!(project.name, "App");
        assert_eq!(project.path, r"App\App.csproj");
        assert_eq!(project.guid, "{6F2A4B8C-1D3E-4F50-8A9B-0C1D2E3F4A5B}");
        assert!(!project.is_solution_folder());
    }

    #[test]
    fn non_project_lines_are_ignored() {
        assert!(parse_project_line("EndProject").is_none());
        assert!(parse_project_line("GlobalSection(SolutionConfigurationPlatforms) = preSolution").is_none());
        assert!(parse_project_line(r#"Project("{X}") = "A", "B""#).is_none());
    }

    #[test]
    fn solution_lists_projects_with_resolved_paths() {
        let dir = std::env::temp_dir().join("sln").join("src");
        let projects = parse_solution(SOLUTION, &dir);

        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].name(), "App");
        assert_eq!(projects[0].path(), dir.join("App").join("App.csproj"));
        assert_eq!(projects[1].name(), "Native");
        assert_eq!(
            projects[1].path(),
            std::env::temp_dir().join("sln").join("Native").join("Native.vcxproj")
        );
    }

    #[test]
    fn missing_solution_has_no_projects() {
        let dir = tempfile::tempdir().unwrap();
        let projects = solution_projects(&dir.path().join("Missing.sln")).unwrap();
        assert!(projects.is_empty());
    }

    #[test]
    fn reads_solution_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("App.sln");
        std::fs::write(&path, SOLUTION).unwrap();

        let projects = solution_projects(&path).unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].path(), dir.path().join("App").join("App.csproj"));
    }
}
