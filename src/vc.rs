//! Sections of Visual C++ 2002-2008 projects (`.vcproj`).

use std::path::Path;

use tracing::{debug, warn};

use crate::context::ProjectSectionContext;
use crate::error::{ProjectError, Result};
use crate::info::ProjectInfo;
use crate::known::is_known_assembly_name;
use crate::msbuild_section as shared;
use crate::paths;
use crate::section::{ProjectKind, ProjectSection};
use crate::vcproj::{VcConfiguration, VcProject};

const COMPILER_TOOL: &str = "VCCLCompilerTool";
const XDC_TOOL: &str = "VCXDCMakeTool";
const LINKER_TOOL: &str = "VCLinkerTool";

/// Parse a `.vcproj` into a section.
///
/// # Errors
///
/// Besides I/O and XML errors: an unknown framework version, a platform the
/// project does not build for, a non-numeric configuration type, and a
/// project reference without a GUID.
pub fn parse(ctx: &mut ProjectSectionContext, project_file: &Path) -> Result<ProjectSection> {
    let mut section = ProjectSection::new(ctx, ProjectKind::Vc { version: String::new() }, project_file);
    let project = VcProject::from_file(&section.project_file)?;

    section.platform = ctx.active_platform().to_string();
    section.configuration = ctx.active_configuration().to_string();
    section.kind = ProjectKind::Vc { version: project.version().to_string() };

    section.target_framework_version = framework_version(&project)?.to_string();
    if let Some(keyword) = project.keyword() {
        section.target_framework_identifier = if keyword.eq_ignore_ascii_case("ManagedCProj") {
            ".NETFramework".to_string()
        } else {
            keyword.to_string()
        };
    }
    if let Some(name) = project.name() {
        section.project_name = name.to_string();
    }
    if let Some(guid) = project.project_guid() {
        section.project_guid = guid.to_string();
    }
    if let Some(namespace) = project.attributes.non_empty("RootNamespace") {
        section.set_property("RootNamespace", namespace);
    }

    validate_platform(&section, &project)?;

    let complete = parse_configurations(ctx, &mut section, &project)?;
    section.is_complete = complete;
    if !complete {
        warn!(project = %section.project_name, configuration = %section.configuration, "build output not found");
        return Ok(section);
    }

    let referenced = parse_reference_items(ctx, &mut section, &project)?;
    section.create_children(ctx, &referenced)?;
    Ok(section)
}

/// `TargetFrameworkVersion` is a packed `major << 16 | minor`; files without
/// it target the framework their Visual Studio version shipped with.
fn framework_version(project: &VcProject) -> Result<&'static str> {
    match project.target_framework_version() {
        Some(value) => match value.trim() {
            "196613" => Ok("v3.5"),
            "196608" => Ok("v3.0"),
            "131072" => Ok("v2.0"),
            other => Err(ProjectError::UnknownFrameworkVersion(other.to_string())),
        },
        None => {
            let version = project.version();
            let mut parts = version.split('.').map(|p| p.trim().parse::<u32>().ok());
            match (parts.next().flatten(), parts.next().flatten()) {
                (Some(8), _) => Ok("v2.0"),
                (Some(7), Some(1)) => Ok("v1.1"),
                (Some(7), _) => Ok("v1.0"),
                _ => Err(ProjectError::UnknownFrameworkVersion(version.to_string())),
            }
        }
    }
}

fn validate_platform(section: &ProjectSection, project: &VcProject) -> Result<()> {
    let platform = section.platform.as_str();
    if platform.is_empty() {
        return Err(ProjectError::PlatformNotAvailable(String::new()));
    }
    if shared::is_mixed_platforms(platform)
        || project.platforms.iter().any(|p| p.eq_ignore_ascii_case(platform))
    {
        return Ok(());
    }
    Err(ProjectError::PlatformNotAvailable(platform.to_string()))
}

/// The exact `configuration|platform` entry, else the first entry for the
/// configuration on any platform.
fn select_configuration<'a>(
    section: &ProjectSection,
    project: &'a VcProject,
) -> Option<&'a VcConfiguration> {
    let mut partial = None;
    for config in &project.configurations {
        let Some((name, platform)) = config.split_name() else {
            continue;
        };
        if !name.eq_ignore_ascii_case(&section.configuration) {
            continue;
        }
        if platform.eq_ignore_ascii_case(&section.platform) {
            return Some(config);
        }
        partial.get_or_insert(config);
    }
    partial
}

fn parse_configurations(
    ctx: &ProjectSectionContext,
    section: &mut ProjectSection,
    project: &VcProject,
) -> Result<bool> {
    let Some(config) = select_configuration(section, project) else {
        debug!(project = %section.project_name, configuration = %section.configuration, "no matching configuration");
        return Ok(false);
    };

    let config_type = config.attributes.get("ConfigurationType").unwrap_or_default();
    let mut output_file = match config_type.trim().parse::<i32>() {
        Ok(1) => {
            section.output_type = "Application".into();
            Some(r"$(OutDir)\$(ProjectName).exe")
        }
        Ok(2) => {
            section.output_type = "Library".into();
            Some(r"$(OutDir)\$(ProjectName).dll")
        }
        Ok(_) => None,
        Err(_) => return Err(ProjectError::InvalidConfigurationType(config_type.to_string())),
    };

    let output_dir = config
        .attributes
        .non_empty("OutputDirectory")
        .unwrap_or("$(SolutionDir)$(ConfigurationName)");
    let output_dir = section.evaluate_macros(ctx, output_dir)?;
    if output_dir.trim().is_empty() {
        return Ok(false);
    }
    let output_dir = section.resolve_path(&output_dir);
    if !output_dir.is_dir() {
        debug!(project = %section.project_name, dir = %output_dir.display(), "output directory does not exist");
        return Ok(false);
    }
    section.output_path = Some(output_dir);

    let (Some(compiler), Some(xdc), Some(linker)) = (
        config.tool(COMPILER_TOOL),
        config.tool(XDC_TOOL),
        config.tool(LINKER_TOOL),
    ) else {
        warn!(project = %section.project_name, "compiler, XDC or linker tool missing");
        return Ok(false);
    };

    if let Some(file) = linker.get("OutputFile").filter(|f| !f.is_empty()) {
        output_file = Some(file);
    }
    let Some(output_file) = output_file else {
        return Ok(false);
    };
    let output_file = section.evaluate_macros(ctx, output_file)?;
    if output_file.trim().is_empty() {
        return Ok(false);
    }
    let output_file = section.resolve_path(&output_file);
    section.assembly_name = paths::file_stem(&output_file);
    section.output_file = Some(output_file);

    if generates_documentation(compiler.get("GenerateXMLDocumentationFiles")) {
        let document = xdc
            .get("OutputDocumentFile")
            .filter(|d| !d.is_empty())
            .unwrap_or("$(TargetDir)$(TargetName).xml");
        let document = section.evaluate_macros(ctx, document)?;
        if !document.trim().is_empty() {
            let document = section.resolve_path(&document);
            if document.is_file() {
                section.comment_file = Some(document);
            }
        }
        section.fall_back_to_output_xml();
    }

    Ok(section.output_exists())
}

fn generates_documentation(value: Option<&str>) -> bool {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return false;
    };
    if value.eq_ignore_ascii_case("true") {
        true
    } else if value.eq_ignore_ascii_case("false") {
        false
    } else {
        warn!(value, "GenerateXMLDocumentationFiles is not a boolean");
        false
    }
}

/// Assembly references go into the section; project references are
/// returned.
fn parse_reference_items(
    ctx: &ProjectSectionContext,
    section: &mut ProjectSection,
    project: &VcProject,
) -> Result<Vec<ProjectInfo>> {
    for reference in &project.references.assemblies {
        let Some(relative) = reference.non_empty("RelativePath") else {
            continue;
        };
        let assembly = section.evaluate_macros(ctx, relative)?;
        if assembly.trim().is_empty() {
            continue;
        }
        let name = paths::file_name(Path::new(&paths::normalize_separators(&assembly)));
        if is_known_assembly_name(&name) {
            section.referenced_known_assemblies.push(name);
            continue;
        }
        let path = section.resolve_path(&assembly);
        if path.is_file() {
            section.referenced_assemblies.push(path);
        }
    }

    let mut referenced = Vec::new();
    for reference in &project.references.projects {
        let Some(guid) = reference.non_empty("ReferencedProjectIdentifier") else {
            return Err(ProjectError::MissingReferenceGuid(section.project_file.clone()));
        };
        let path = match reference.non_empty("RelativePathToProject") {
            Some(path) => section.evaluate_macros(ctx, path)?,
            None => String::new(),
        };
        let name = reference.get("Name").unwrap_or_default();
        if let Some(info) = shared::reference_info(section, ctx, &path, guid, name) {
            referenced.push(info);
        }
    }

    Ok(referenced)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
