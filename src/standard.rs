//! Sections of the MSBuild language projects: `.csproj`, `.vbproj`,
//! `.fsproj`, `.pyproj`, `.rbproj` and `.vjsproj`.

use std::path::Path;

use tracing::{debug, warn};

use crate::context::ProjectSectionContext;
use crate::error::Result;
use crate::factory;
use crate::msbuild::{MsBuildProject, PropertyGroup};
use crate::msbuild_section::{self as shared, group_matches, property_applies};
use crate::section::{ProjectKind, ProjectSection};

const SILVERLIGHT_TYPE: &str = "{A1591282-1198-4647-A2B1-27E5FF5F6F3B}";
const PORTABLE_CS_TYPE: &str = "{786C830F-07A1-408B-BD7F-6EE04809D6DB}";
const PORTABLE_VB_TYPE: &str = "{14182A97-F7F0-4C62-8B27-98AA8AE2109A}";
const CSHARP_TYPE: &str = "{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}";
const VBNET_TYPE: &str = "{F184B08F-C81C-45F6-A57F-5ABD9991F28F}";

/// Parse a language project into a section.
///
/// The section is marked complete when its build output was found on disk;
/// referenced projects are only followed for complete sections.
pub fn parse(ctx: &mut ProjectSectionContext, project_file: &Path) -> Result<ProjectSection> {
    let project_type = factory::standard_type(project_file);
    let mut section = ProjectSection::new(ctx, ProjectKind::Standard { project_type }, project_file);
    let project = shared::open(&section)?;

    section.configuration = ctx.active_configuration().to_string();
    if !shared::is_mixed_platforms(ctx.active_platform()) {
        section.platform = ctx.active_platform().to_string();
    }

    let mut complete = parse_properties(ctx, &mut section, &project)?;
    if !complete {
        complete = shared::parse_choose(&mut section, &project, |section, group| {
            parse_property_group(ctx, section, group)
        })?;
    }

    section.is_complete = complete;
    if !complete {
        warn!(project = %section.project_name, configuration = %section.configuration, platform = %section.platform, "build output not found");
        return Ok(section);
    }

    let referenced = shared::parse_reference_items(&mut section, ctx, &project);
    section.create_children(ctx, &referenced)?;
    Ok(section)
}

/// Global properties first, then the first matching conditioned group that
/// locates the build output.
fn parse_properties(
    ctx: &ProjectSectionContext,
    section: &mut ProjectSection,
    project: &MsBuildProject,
) -> Result<bool> {
    let globals: Vec<&PropertyGroup> = project
        .property_groups
        .iter()
        .filter(|g| g.condition.as_deref().is_none_or(|c| c.trim().is_empty()))
        .collect();

    for group in globals {
        for property in &group.properties {
            if !property_applies(section, property) {
                continue;
            }
            apply_global_property(ctx, section, &property.name, &property.value)?;
            section.set_property(&property.name, &property.value);
        }
    }

    if is_compact_family(&section.platform_family_name) {
        section.target_framework_identifier = "Compact".into();
    }
    if section.target_framework_identifier.is_empty() {
        let script_sharp = project
            .imports
            .iter()
            .any(|i| ends_with_ignore_case(&i.project, "ScriptSharp.targets"));
        section.target_framework_identifier =
            if script_sharp { "ScriptSharp" } else { ".NETFramework" }.into();
    }

    if section.assembly_name.is_empty() {
        warn!(project = %section.project_file.display(), "no AssemblyName property");
        return Ok(false);
    }

    let conditioned: Vec<&PropertyGroup> = project
        .property_groups
        .iter()
        .filter(|g| group_matches(section, g.condition.as_deref()))
        .collect();

    for group in conditioned {
        if parse_property_group(ctx, section, group)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn apply_global_property(
    ctx: &ProjectSectionContext,
    section: &mut ProjectSection,
    name: &str,
    value: &str,
) -> Result<()> {
    match name {
        "Platform" => section.platform = value.to_string(),
        "ProjectGuid" => section.project_guid = value.to_string(),
        "ProjectTypeGuids" => {
            if let Some(identifier) = identifier_from_type_guids(value) {
                section.target_framework_identifier = identifier.into();
            }
        }
        "OutputType" => section.output_type = value.to_string(),
        "AssemblyName" => section.assembly_name = value.to_string(),
        "Configuration" => section.configuration = value.to_string(),
        "TargetFrameworkVersion" => section.target_framework_version = value.to_string(),
        "TargetFrameworkIdentifier" => section.target_framework_identifier = value.to_string(),
        "PlatformFamilyName" => section.platform_family_name = value.to_string(),
        "ReferencePath" => {
            for path in value.split(';').filter(|p| !p.is_empty()) {
                let mut path = section.evaluate_macros(ctx, path)?;
                if !path.ends_with(['\\', '/']) {
                    path.push('\\');
                }
                section.referenced_paths.push(path);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Framework identifier implied by a `ProjectTypeGuids` list.
fn identifier_from_type_guids(value: &str) -> Option<&'static str> {
    if !value.contains(';') {
        return None;
    }
    let value = value.to_ascii_uppercase();
    if value.contains(SILVERLIGHT_TYPE) {
        Some("Silverlight")
    } else if value.contains(PORTABLE_CS_TYPE) || value.contains(PORTABLE_VB_TYPE) {
        Some(".NETPortable")
    } else if value.contains(CSHARP_TYPE) || value.contains(VBNET_TYPE) {
        Some(".NETFramework")
    } else {
        None
    }
}

fn is_compact_family(family: &str) -> bool {
    ["PocketPC", "Smartphone", "WindowsCE"]
        .iter()
        .any(|f| f.eq_ignore_ascii_case(family))
}

fn ends_with_ignore_case(text: &str, suffix: &str) -> bool {
    text.len() >= suffix.len()
        && text
            .get(text.len() - suffix.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
}

/// Read output and documentation settings from one property group.
/// Succeeds when the output file exists.
fn parse_property_group(
    ctx: &ProjectSectionContext,
    section: &mut ProjectSection,
    group: &PropertyGroup,
) -> Result<bool> {
    if group.properties.is_empty() || section.assembly_name.is_empty() {
        return Ok(false);
    }

    if let Some(constants) = group.find("DefineConstants") {
        let upper = constants.value.to_ascii_uppercase();
        if upper.contains("SCRIPTSHARP") {
            section.target_framework_identifier = "ScriptSharp".into();
        } else if upper.contains("SILVERLIGHT") {
            section.target_framework_identifier = "Silverlight".into();
        }
    }

    let documentation = group.find("DocumentationFile");
    if let Some(doc) = documentation.filter(|d| !d.value.is_empty()) {
        let value = section.evaluate_macros(ctx, &doc.value)?;
        section.comment_file = Some(section.resolve_path(&value));
    }

    if let Some(output) = group.find("OutputPath") {
        if !output.value.is_empty() {
            let value = section.evaluate_macros(ctx, &output.value)?;
            let dir = section.resolve_path(&value);
            shared::set_output_directory(section, &dir);
            debug!(project = %section.project_name, output = ?section.output_file, "output path");
        }
        if documentation.is_none() || !section.comment_exists() {
            section.fall_back_to_output_xml();
        }
    }

    Ok(section.output_exists())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::StandardProjectType;
    use std::fs;

    const APP_GUID: &str = "{6F2A4B8C-1D3E-4F50-8A9B-0C1D2E3F4A5B}";

    const LIBRARY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="4.0" DefaultTargets="Build" xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup>
    <Configuration Condition=" '$(Configuration)' == '' ">Debug</Configuration>
    <Platform Condition=" '$(Platform)' == '' ">AnyCPU</Platform>
    <ProjectGuid>{6F2A4B8C-1D3E-4F50-8A9B-0C1D2E3F4A5B}</ProjectGuid>
    <OutputType>Library</OutputType>
    <RootNamespace>Acme.Core</RootNamespace>
    <AssemblyName>Acme.Core</AssemblyName>
    <TargetFrameworkVersion>v4.0</TargetFrameworkVersion>
    <ReferencePath>..\refs;$(MSBuildProjectDirectory)\more\</ReferencePath>
  </PropertyGroup>
  <PropertyGroup Condition=" '$(Configuration)|$(Platform)' == 'Debug|AnyCPU' ">
    <DefineConstants>DEBUG;TRACE</DefineConstants>
    <OutputPath>bin\Debug\</OutputPath>
    <DocumentationFile>bin\Debug\Acme.Core.XML</DocumentationFile>
  </PropertyGroup>
  <PropertyGroup Condition=" '$(Configuration)|$(Platform)' == 'Release|AnyCPU' ">
    <DefineConstants>TRACE;SILVERLIGHT</DefineConstants>
    <OutputPath>bin\Release\</OutputPath>
  </PropertyGroup>
  <ItemGroup>
    <Reference Include="System" />
    <Reference Include="System.Core" />
  </ItemGroup>
  <Import Project="$(MSBuildToolsPath)\Microsoft.CSharp.targets" />
</Project>
"#;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn context(configuration: &str, platform: &str) -> ProjectSectionContext {
        ProjectSectionContext::builder()
            .configuration(configuration)
            .platform(platform)
            .build()
    }

    #[test]
    fn library_with_output_and_documentation() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Core").join("Acme.Core.csproj");
        write(&file, LIBRARY);
        let bin = dir.path().join("Core").join("bin").join("Debug");
        write(&bin.join("Acme.Core.dll"), "");
        write(&bin.join("Acme.Core.XML"), "");

        let mut ctx = context("Debug", "Any CPU");
        let section = parse(&mut ctx, &file).unwrap();

        assert!(section.is_complete);
        assert_eq!(
            section.kind,
            ProjectKind::Standard { project_type: StandardProjectType::CsProj }
        );
        assert_eq!(section.project_guid, APP_GUID);
        assert_eq!(section.project_name, "Acme.Core");
        assert_eq!(section.configuration, "Debug");
        assert_eq!(section.platform, "Any CPU");
        assert_eq!(section.output_type, "Library");
        assert_eq!(section.target_framework_version, "v4.0");
        assert_eq!(section.target_framework_identifier, ".NETFramework");
        assert_eq!(section.output_path.as_deref(), Some(bin.as_path()));
        assert_eq!(section.output_file, Some(bin.join("Acme.Core.dll")));
        assert_eq!(section.comment_file, Some(bin.join("Acme.Core.XML")));
        assert_eq!(section.referenced_known_assemblies, ["System.dll", "System.Core.dll"]);
        assert_eq!(section.property("rootnamespace"), Some("Acme.Core"));

        let core_dir = dir.path().join("Core");
        assert_eq!(section.referenced_paths.len(), 2);
        assert!(section.referenced_paths[0].ends_with('\\'));
        assert_eq!(
            section.referenced_paths[1],
            format!("{}\\more\\", core_dir.display())
        );
    }

    #[test]
    fn defaults_apply_without_a_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Acme.Core.csproj");
        write(&file, LIBRARY);
        write(&dir.path().join("bin").join("Debug").join("Acme.Core.dll"), "");

        let mut ctx = context("", "");
        let section = parse(&mut ctx, &file).unwrap();
        assert_eq!(section.configuration, "Debug");
        assert_eq!(section.platform, "AnyCPU");
        assert!(section.is_complete);
    }

    #[test]
    fn comment_file_next_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Acme.Core.csproj");
        write(&file, LIBRARY);
        let bin = dir.path().join("bin").join("Release");
        write(&bin.join("Acme.Core.dll"), "");
        write(&bin.join("Acme.Core.xml"), "");

        let mut ctx = context("Release", "AnyCPU");
        let section = parse(&mut ctx, &file).unwrap();
        assert!(section.is_complete);
        assert_eq!(section.comment_file, Some(bin.join("Acme.Core.xml")));
        assert!(section.is_silverlight());
    }

    #[test]
    fn missing_output_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Acme.Core.csproj");
        write(&file, LIBRARY);

        let mut ctx = context("Debug", "AnyCPU");
        let section = parse(&mut ctx, &file).unwrap();
        assert!(!section.is_complete);
        assert!(section.referenced_known_assemblies.is_empty());
        assert_eq!(
            section.output_file,
            Some(dir.path().join("bin").join("Debug").join("Acme.Core.dll"))
        );
    }

    #[test]
    fn choose_supplies_output_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Application1.vbproj");
        write(
            &file,
            r#"<Project xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup>
    <Configuration Condition="'$(Configuration)' == ''">Debug</Configuration>
    <OutputType>Exe</OutputType>
    <AssemblyName>Application1</AssemblyName>
  </PropertyGroup>
  <Choose>
    <When Condition=" '$(Configuration)'=='debug' ">
      <PropertyGroup><OutputPath>.\bin\Debug\</OutputPath></PropertyGroup>
    </When>
    <Otherwise>
      <PropertyGroup><OutputPath>.\bin\$(Configuration)\</OutputPath></PropertyGroup>
    </Otherwise>
  </Choose>
</Project>"#,
        );
        write(&dir.path().join("bin").join("Retail").join("Application1.exe"), "");

        let mut ctx = context("Retail", "");
        let section = parse(&mut ctx, &file).unwrap();
        assert!(section.is_complete);
        assert_eq!(
            section.kind,
            ProjectKind::Standard { project_type: StandardProjectType::VbProj }
        );
        assert_eq!(
            section.output_file,
            Some(dir.path().join("bin").join("Retail").join("Application1.exe"))
        );
    }

    #[test]
    fn framework_identifiers() {
        assert_eq!(
            identifier_from_type_guids(
                "{a1591282-1198-4647-a2b1-27e5ff5f6f3b};{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}"
            ),
            Some("Silverlight")
        );
        assert_eq!(
            identifier_from_type_guids(
                "{786C830F-07A1-408B-BD7F-6EE04809D6DB};{FAE04EC0-301F-11D3-BF4B-00C04F79EFBC}"
            ),
            Some(".NETPortable")
        );
        assert_eq!(identifier_from_type_guids(CSHARP_TYPE), None);
        assert!(is_compact_family("smartphone"));
        assert!(!is_compact_family(""));
    }

    #[test]
    fn compact_and_script_sharp_projects() {
        let dir = tempfile::tempdir().unwrap();
        let compact = dir.path().join("Device.csproj");
        write(
            &compact,
            r#"<Project><PropertyGroup>
  <AssemblyName>Device</AssemblyName>
  <PlatformFamilyName>PocketPC</PlatformFamilyName>
</PropertyGroup></Project>"#,
        );
        let script = dir.path().join("Script.csproj");
        write(
            &script,
            r#"<Project><PropertyGroup>
  <AssemblyName>Script</AssemblyName>
</PropertyGroup>
<Import Project="$(ProgramFiles)\ScriptSharp\v1.0\ScriptSharp.targets" /></Project>"#,
        );

        let mut ctx = context("Debug", "");
        assert_eq!(parse(&mut ctx, &compact).unwrap().target_framework_identifier, "Compact");
        assert_eq!(parse(&mut ctx, &script).unwrap().target_framework_identifier, "ScriptSharp");
    }

    #[test]
    fn missing_assembly_name_is_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("Empty.csproj");
        write(&file, "<Project><PropertyGroup><OutputType>Library</OutputType></PropertyGroup></Project>");

        let mut ctx = context("Debug", "AnyCPU");
        let section = parse(&mut ctx, &file).unwrap();
        assert!(!section.is_complete);
        assert_eq!(section.project_name, "Empty");
    }
}
