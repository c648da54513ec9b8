//! Sections of Visual C++ 2010+ projects (`.vcxproj`).

use std::path::Path;

use tracing::{debug, warn};

use crate::context::ProjectSectionContext;
use crate::error::Result;
use crate::msbuild::{MsBuildProject, PropertyGroup};
use crate::msbuild_section::{self as shared, group_matches, property_applies};
use crate::paths;
use crate::section::{ProjectKind, ProjectSection};

/// Parse a `.vcxproj` into a section.
///
/// The configuration and platform are the solution's active ones. A project
/// that does not declare that pair under `ProjectConfigurations` gives an
/// incomplete section.
pub fn parse(ctx: &mut ProjectSectionContext, project_file: &Path) -> Result<ProjectSection> {
    let mut section = ProjectSection::new(ctx, ProjectKind::Vcx, project_file);
    let project = shared::open(&section)?;

    section.platform = ctx.active_platform().to_string();
    section.configuration = ctx.active_configuration().to_string();

    if !validate_configurations(&section, &project) {
        warn!(
            project = %section.project_name,
            configuration = %section.configuration,
            platform = %section.platform,
            "configuration not declared by the project"
        );
        return Ok(section);
    }

    let mut complete = parse_properties(ctx, &mut section, &project)?;
    if !complete {
        complete = shared::parse_choose(&mut section, &project, |section, group| {
            parse_property_group(ctx, section, group)
        })?;
    }
    if !complete || !section.comment_exists() {
        complete = parse_defaults(ctx, &mut section, &project)?;
    }

    section.is_complete = complete;
    if !complete {
        warn!(project = %section.project_name, "build output not found");
        return Ok(section);
    }

    let referenced = shared::parse_reference_items(&mut section, ctx, &project);
    section.create_children(ctx, &referenced)?;
    Ok(section)
}

/// The `ProjectConfigurations` item group must declare the section's
/// configuration and platform.
fn validate_configurations(section: &ProjectSection, project: &MsBuildProject) -> bool {
    let Some(group) = project.item_group_labelled("ProjectConfigurations") else {
        return false;
    };

    let configuration = section.configuration.to_ascii_lowercase();
    let platform = section.platform.to_ascii_lowercase();
    let Some(item) = group.items.iter().find(|item| {
        let include = item.include.to_ascii_lowercase();
        !include.is_empty() && include.contains(&configuration) && include.contains(&platform)
    }) else {
        return false;
    };

    let configuration_matched = item
        .metadata("Configuration")
        .is_some_and(|c| c.eq_ignore_ascii_case(&section.configuration));
    let platform_matched = shared::is_mixed_platforms(&section.platform)
        || item
            .metadata("Platform")
            .is_some_and(|p| p.eq_ignore_ascii_case(&section.platform));

    configuration_matched && platform_matched
}

/// Read properties in document order: unconditioned groups and groups
/// matching the configuration and platform. Then look for the output in
/// the matching groups.
fn parse_properties(
    ctx: &ProjectSectionContext,
    section: &mut ProjectSection,
    project: &MsBuildProject,
) -> Result<bool> {
    let mut conditioned: Vec<&PropertyGroup> = Vec::new();

    for group in &project.property_groups {
        let global = group.condition.as_deref().is_none_or(|c| c.trim().is_empty());
        if !global {
            if !group_matches(section, group.condition.as_deref()) {
                continue;
            }
            conditioned.push(group);
        }

        for property in &group.properties {
            if !property_applies(section, property) {
                continue;
            }
            apply_property(ctx, section, &property.name, &property.value, global)?;
            section.set_property(&property.name, &property.value);
        }
    }

    if section.assembly_name.is_empty() {
        section.assembly_name = paths::file_stem(&section.project_file);
    }

    for group in conditioned {
        if parse_property_group(ctx, section, group)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn apply_property(
    ctx: &ProjectSectionContext,
    section: &mut ProjectSection,
    name: &str,
    value: &str,
    global: bool,
) -> Result<()> {
    match name {
        "Platform" => section.platform = value.to_string(),
        "ProjectGuid" if global => section.project_guid = value.to_string(),
        "OutputType" | "ConfigurationType" => section.output_type = value.to_string(),
        "AssemblyName" | "TargetName" => {
            section.assembly_name = section.evaluate_macros(ctx, value)?;
        }
        "Configuration" => section.configuration = value.to_string(),
        "TargetFrameworkVersion" => section.target_framework_version = value.to_string(),
        "TargetFrameworkIdentifier" => section.target_framework_identifier = value.to_string(),
        "Keyword" if global && section.target_framework_identifier.is_empty() => {
            section.target_framework_identifier = if value.eq_ignore_ascii_case("ManagedCProj") {
                ".NETFramework".to_string()
            } else {
                value.to_string()
            };
        }
        _ => {}
    }
    Ok(())
}

/// Locate the output from an `OutDir` property. Succeeds when the output
/// file exists.
fn parse_property_group(
    ctx: &ProjectSectionContext,
    section: &mut ProjectSection,
    group: &PropertyGroup,
) -> Result<bool> {
    if group.properties.is_empty() || section.assembly_name.is_empty() {
        return Ok(false);
    }

    let Some(out_dir) = group
        .properties
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case("OutDir"))
    else {
        return Ok(false);
    };

    let value = section.evaluate_macros(ctx, &out_dir.value)?;
    if !value.is_empty() {
        let dir = section.resolve_path(&value);
        shared::set_output_directory(section, &dir);
        debug!(project = %section.project_name, output = ?section.output_file, "output directory");
    }
    section.fall_back_to_output_xml();

    Ok(section.output_exists())
}

/// Fill in what Visual C++ builds by default.
///
/// With the output on disk, the comment file comes from the `Xdcmake`
/// item definition. Otherwise the output is looked for in
/// `$(SolutionDir)<configuration>`.
fn parse_defaults(
    ctx: &ProjectSectionContext,
    section: &mut ProjectSection,
    project: &MsBuildProject,
) -> Result<bool> {
    if section.output_exists() {
        let output_file = project
            .item_definition_groups
            .iter()
            .filter(|g| group_matches(section, g.condition.as_deref()))
            .flat_map(|g| &g.definitions)
            .filter(|d| d.item_type.eq_ignore_ascii_case("Xdcmake"))
            .find_map(|d| d.metadata("OutputFile").filter(|v| !v.is_empty()));

        if let Some(value) = output_file {
            let value = section.evaluate_macros(ctx, value)?;
            section.comment_file = Some(section.resolve_path(&value));
        }
        return Ok(true);
    }

    let Some(solution_dir) = ctx.solution_dir() else {
        return Ok(false);
    };
    let working_dir = paths::full_path(&solution_dir.join(&section.configuration));
    if working_dir.is_dir() {
        debug!(project = %section.project_name, dir = %working_dir.display(), "default output directory");
        if section.output_path.is_none() {
            section.output_path = Some(working_dir.clone());
        }
        section.output_file = section.output_file_in(&working_dir);
        if !section.comment_exists() {
            section.comment_file = Some(working_dir.join(format!("{}.xml", section.assembly_name)));
        }
    }

    Ok(section.output_exists())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
