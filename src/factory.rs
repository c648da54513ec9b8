//! Creating sections for project files and whole solutions.
//!
//! The project file extension picks the parser. Sections for projects
//! referenced from several places are parsed once and shared through the
//! context's registry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::context::ProjectSectionContext;
use crate::error::{ProjectError, Result};
use crate::info::ProjectInfo;
use crate::paths;
use crate::section::{ProjectSection, StandardProjectType};
use crate::solution;
use crate::standard;
use crate::suo;
use crate::vc;
use crate::vcx;
use crate::vsvars;

type SectionParser = fn(&mut ProjectSectionContext, &Path) -> Result<ProjectSection>;

/// Lowercased extension without the dot.
fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .filter(|e| !e.is_empty())
}

/// `%VAR%` expansion against the context's environment, then an absolute
/// path.
fn expand_path(ctx: &ProjectSectionContext, path: &Path) -> Option<PathBuf> {
    let raw = path.to_string_lossy();
    if raw.trim().is_empty() {
        return None;
    }
    let expanded = vsvars::expand_environment_variables(&raw, ctx.environment());
    Some(paths::full_path(Path::new(&paths::normalize_separators(&expanded))))
}

/// Language of a standard project file, from its extension.
pub fn standard_type(path: &Path) -> StandardProjectType {
    match extension_of(path).as_deref() {
        Some("csproj") => StandardProjectType::CsProj,
        Some("vbproj") => StandardProjectType::VbProj,
        Some("fsproj") => StandardProjectType::FsProj,
        Some("pyproj") => StandardProjectType::PyProj,
        Some("rbproj") => StandardProjectType::RbProj,
        Some("vjsproj") => StandardProjectType::VjsProj,
        _ => StandardProjectType::None,
    }
}

/// Visual C++ projects need the solution on disk, and a platform and
/// configuration unless the solution's `.suo` file records them.
pub fn requires_all(ctx: &ProjectSectionContext) -> Result<()> {
    let Some(solution) = ctx.solution_file() else {
        return Err(ProjectError::MissingArgument("solutionFile"));
    };
    if !solution.exists() {
        return Err(ProjectError::PathNotFound(solution.to_path_buf()));
    }
    if suo::storage_file(solution).is_file() {
        return Ok(());
    }
    if ctx.platform().trim().is_empty() {
        return Err(ProjectError::MissingArgument("platform"));
    }
    if ctx.configuration().trim().is_empty() {
        return Err(ProjectError::MissingArgument("configuration"));
    }
    Ok(())
}

/// Parse `project_file` into a section.
///
/// Files whose extension is not a known project type give `None`, as does
/// a project that is already being parsed further up a chain of project
/// references.
pub fn create_section(
    ctx: &mut ProjectSectionContext,
    project_file: impl AsRef<Path>,
) -> Result<Option<Arc<ProjectSection>>> {
    let Some(file) = expand_path(ctx, project_file.as_ref()) else {
        return Ok(None);
    };
    let Some(extension) = extension_of(&file) else {
        return Ok(None);
    };

    let parser: SectionParser = match extension.as_str() {
        "csproj" | "vbproj" | "fsproj" | "pyproj" | "rbproj" | "vjsproj" => standard::parse,
        "vcproj" => {
            requires_all(ctx)?;
            vc::parse
        }
        "vcxproj" => {
            requires_all(ctx)?;
            vcx::parse
        }
        _ => {
            debug!(file = %file.display(), "not a supported project type");
            return Ok(None);
        }
    };

    if !ctx.begin_parse(&file) {
        warn!(file = %file.display(), "project reference cycle, skipping");
        return Ok(None);
    }
    let result = parser(ctx, &file);
    ctx.end_parse(&file);

    let section = result?;
    info!(
        name = %section.project_name,
        complete = section.is_complete,
        output = ?section.output_file,
        "project parsed"
    );
    Ok(Some(Arc::new(section)))
}

/// The section the context already holds for the project's GUID, else a
/// newly parsed one.
pub fn create_section_for(
    ctx: &mut ProjectSectionContext,
    info: &ProjectInfo,
) -> Result<Option<Arc<ProjectSection>>> {
    if let Some(section) = ctx.project_section(info.guid()) {
        return Ok(Some(section));
    }
    create_section(ctx, info.path())
}

/// Parse a single project with a fresh context built from the process
/// environment.
pub fn create_standalone_section(
    project_file: impl AsRef<Path>,
    solution_file: Option<&Path>,
    platform: &str,
    configuration: &str,
) -> Result<Option<Arc<ProjectSection>>> {
    let mut builder = ProjectSectionContext::builder()
        .system_env()
        .platform(platform)
        .configuration(configuration);
    if let Some(solution) = solution_file {
        builder = builder.solution_file(solution);
    }
    let mut ctx = builder.build();
    create_section(&mut ctx, project_file)
}

/// Sections for a solution or a single project, using a fresh context
/// built from the process environment.
///
/// `targets` restricts a solution to the projects with those GUIDs.
pub fn create_sections<I, S>(
    source: impl AsRef<Path>,
    platform: &str,
    configuration: &str,
    targets: I,
) -> Result<Vec<Arc<ProjectSection>>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut ctx = ProjectSectionContext::builder()
        .system_env()
        .platform(platform)
        .configuration(configuration)
        .targets(targets)
        .build();
    create_sections_in(&mut ctx, source)
}

/// Sections for `source` using an existing context.
///
/// A solution registers all of its projects for reference resolution and
/// yields a section for every target project; with no targets registered,
/// every project is a target. Any other file yields its own section.
pub fn create_sections_in(
    ctx: &mut ProjectSectionContext,
    source: impl AsRef<Path>,
) -> Result<Vec<Arc<ProjectSection>>> {
    let Some(file) = expand_path(ctx, source.as_ref()) else {
        return Ok(Vec::new());
    };
    let Some(extension) = extension_of(&file) else {
        return Ok(Vec::new());
    };

    let mut sections = Vec::new();

    if extension != "sln" {
        if let Some(section) = create_section(ctx, &file)? {
            ctx.register_section(section.clone());
            sections.push(section);
        }
        return Ok(sections);
    }

    ctx.set_solution_file(&file);
    let infos = solution::solution_projects(&file)?;
    info!(solution = %file.display(), projects = infos.len(), "solution read");
    if infos.is_empty() {
        return Ok(sections);
    }

    ctx.register_infos(infos.iter().cloned());
    if !ctx.has_targets() {
        ctx.register_targets(infos.iter().filter(|i| i.is_valid()).map(ProjectInfo::guid));
    }

    for info in infos.iter() {
        if !(info.is_valid() && ctx.is_target(info.guid())) {
            continue;
        }
        if let Some(section) = create_section_for(ctx, info)? {
            ctx.register_section(section.clone());
            sections.push(section);
        }
    }

    Ok(sections)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
