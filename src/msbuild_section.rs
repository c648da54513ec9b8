//! Parsing steps shared by the MSBuild project dialects (`.csproj` and
//! friends, `.vcxproj`).

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::condition::{self, is_condition_matched};
use crate::context::ProjectSectionContext;
use crate::error::Result;
use crate::info::ProjectInfo;
use crate::known::is_known_assembly_name;
use crate::msbuild::{Item, MsBuildProject, Property, PropertyGroup};
use crate::paths;
use crate::section::ProjectSection;

/// Whether a property's own `Condition` holds for the section.
///
/// Conditions are evaluated with `Configuration`, `Platform` and
/// `MSBuildProjectDirectory` bound. A condition that cannot be parsed
/// never holds.
pub(crate) fn property_applies(section: &ProjectSection, property: &Property) -> bool {
    let Some(text) = property.condition.as_deref().filter(|c| !c.trim().is_empty()) else {
        return true;
    };

    match condition::parse_condition(text) {
        Ok(expr) => {
            let vars = HashMap::from([
                ("Configuration".to_string(), section.configuration.clone()),
                ("Platform".to_string(), section.platform.clone()),
                (
                    "MSBuildProjectDirectory".to_string(),
                    section.project_dir.to_string_lossy().into_owned(),
                ),
            ]);
            condition::evaluate(&expr, &vars)
        }
        Err(e) => {
            debug!(property = %property.name, "skipping property: {e}");
            false
        }
    }
}

/// Whether a group-level condition selects the section's configuration and
/// platform.
pub(crate) fn group_matches(section: &ProjectSection, condition: Option<&str>) -> bool {
    condition.is_some_and(|c| is_condition_matched(&section.configuration, &section.platform, c))
}

/// Try the property groups of the matching `<When>` branches, then those of
/// the `<Otherwise>` branches, stopping at the first group `parse_group`
/// accepts.
pub(crate) fn parse_choose<F>(
    section: &mut ProjectSection,
    project: &MsBuildProject,
    mut parse_group: F,
) -> Result<bool>
where
    F: FnMut(&mut ProjectSection, &PropertyGroup) -> Result<bool>,
{
    if project.chooses.is_empty() {
        return Ok(false);
    }

    let mut conditioned: Vec<&PropertyGroup> = Vec::new();
    let mut otherwise: Vec<&PropertyGroup> = Vec::new();
    for choose in &project.chooses {
        for when in &choose.whens {
            if group_matches(section, when.condition.as_deref()) {
                conditioned.extend(&when.property_groups);
            }
        }
        if let Some(branch) = &choose.otherwise {
            otherwise.extend(&branch.property_groups);
        }
    }

    for group in conditioned.into_iter().chain(otherwise) {
        if parse_group(section, group)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Collect assembly references into the section and return the projects it
/// references.
///
/// `COMReference` items are not followed.
pub(crate) fn parse_reference_items(
    section: &mut ProjectSection,
    ctx: &ProjectSectionContext,
    project: &MsBuildProject,
) -> Vec<ProjectInfo> {
    let mut referenced = Vec::new();

    for item in project.items() {
        match item.item_type.as_str() {
            "Reference" => parse_assembly_reference(section, ctx, item),
            "ProjectReference" => {
                if let Some(info) = parse_project_reference(section, ctx, item) {
                    referenced.push(info);
                }
            }
            _ => {}
        }
    }

    referenced
}

/// `log4net, Version=1.2.10.0, Culture=neutral` → `log4net`.
fn simple_assembly_name(include: &str) -> &str {
    match include.find(',') {
        Some(pos) if pos > 0 => include[..pos].trim(),
        _ => include.trim(),
    }
}

fn parse_assembly_reference(section: &mut ProjectSection, ctx: &ProjectSectionContext, item: &Item) {
    let name = simple_assembly_name(&item.include);
    if name.is_empty() {
        return;
    }

    let file_name = format!("{name}.dll");
    if is_known_assembly_name(&file_name) {
        section.referenced_known_assemblies.push(file_name);
        return;
    }

    if item.has_metadata() {
        let Some(hint) = item.metadata("HintPath").filter(|h| !h.is_empty()) else {
            return;
        };
        let hint = match section.evaluate_macros(ctx, hint) {
            Ok(expanded) => expanded,
            Err(e) => {
                debug!(hint, "hint path kept as written: {e}");
                hint.to_string()
            }
        };
        let path = section.resolve_path(&hint);
        if path.is_file() {
            section.referenced_assemblies.push(path);
        } else {
            debug!(reference = name, path = %path.display(), "hint path does not exist");
        }
        return;
    }

    let extension = match crate::section::output_extension(&section.output_type) {
        Some(ext @ ("dll" | "exe")) => ext,
        _ => return,
    };
    let file = format!("{name}.{extension}");

    let mut path = section.resolve_path(&file);
    if !path.is_file() {
        if let Some(output) = section.output_path.as_deref().filter(|p| p.is_dir()) {
            path = paths::full_path(&output.join(&file));
        }
    }
    if path.is_file() {
        section.referenced_assemblies.push(path);
    }
}

fn parse_project_reference(
    section: &ProjectSection,
    ctx: &ProjectSectionContext,
    item: &Item,
) -> Option<ProjectInfo> {
    if item.include.is_empty() || !item.has_metadata() {
        return None;
    }
    let guid = item.metadata("Project").unwrap_or_default();
    let name = item.metadata("Name").unwrap_or_default();

    reference_info(section, ctx, &item.include, guid, name)
}

/// A referenced project, from its file when it exists, else from the
/// projects the context already knows by GUID.
pub(crate) fn reference_info(
    section: &ProjectSection,
    ctx: &ProjectSectionContext,
    path: &str,
    guid: &str,
    name: &str,
) -> Option<ProjectInfo> {
    let path = section.resolve_path(path);

    if path.is_file() {
        let name = if name.is_empty() {
            paths::file_stem(&path)
        } else {
            name.to_string()
        };
        let info = ProjectInfo::new(path, guid, name);
        return info.is_valid().then_some(info);
    }

    if guid.is_empty() {
        warn!(project = %section.project_name, reference = %path.display(), "referenced project not found");
        return None;
    }
    let info = ctx.project_info(guid).filter(|info| info.is_valid()).cloned();
    if info.is_none() {
        warn!(project = %section.project_name, guid, "referenced project not found");
    }
    info
}

/// Read an MSBuild project for `section`, logging what was found.
pub(crate) fn open(section: &ProjectSection) -> Result<MsBuildProject> {
    let project = MsBuildProject::from_file(&section.project_file)?;
    debug!(
        project = %section.project_file.display(),
        property_groups = project.property_groups.len(),
        item_groups = project.item_groups.len(),
        chooses = project.chooses.len(),
        "project opened"
    );
    Ok(project)
}

/// Strip the spaces Visual Studio shows in `Mixed Platforms`.
pub(crate) fn is_mixed_platforms(platform: &str) -> bool {
    platform.replace(' ', "").eq_ignore_ascii_case("MixedPlatforms")
}

/// Resolve an `<OutputPath>`-style directory value and derive the output
/// file from the section's output type.
pub(crate) fn set_output_directory(section: &mut ProjectSection, dir: &Path) {
    section.output_file = section.output_file_in(dir);
    section.output_path = Some(dir.to_path_buf());
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::{ProjectKind, StandardProjectType};
    use std::fs;

    const LIB_GUID: &str = "{0A1B2C3D-4E5F-4061-8293-A4B5C6D7E8F9}";

    fn section(ctx: &ProjectSectionContext, file: &Path) -> ProjectSection {
        let mut section = ProjectSection::new(
            ctx,
            ProjectKind::Standard { project_type: StandardProjectType::CsProj },
            file,
        );
        section.configuration = "Debug".into();
        section.platform = "AnyCPU".into();
        section
    }

    fn property(name: &str, condition: Option<&str>) -> Property {
        Property {
            name: name.into(),
            value: String::new(),
            condition: condition.map(String::from),
        }
    }

    #[test]
    fn property_conditions() {
        let ctx = ProjectSectionContext::default();
        let section = section(&ctx, Path::new("/src/App/App.csproj"));

        assert!(property_applies(&section, &property("A", None)));
        assert!(property_applies(&section, &property("A", Some("  "))));
        assert!(!property_applies(
            &section,
            &property("Configuration", Some(" '$(Configuration)' == '' "))
        ));
        assert!(property_applies(
            &section,
            &property("X", Some("'$(Configuration)|$(Platform)' == 'debug|anycpu'"))
        ));
        assert!(!property_applies(&section, &property("X", Some("not a condition"))));
    }

    #[test]
    fn choose_prefers_matching_when_over_otherwise() {
        let ctx = ProjectSectionContext::default();
        let mut section = section(&ctx, Path::new("/src/App/App.csproj"));
        let project = MsBuildProject::parse(
            r#"<Project>
  <Choose>
    <When Condition=" '$(Configuration)|$(Platform)'=='retail|AnyCPU' ">
      <PropertyGroup><OutputPath>retail</OutputPath></PropertyGroup>
    </When>
    <When Condition=" '$(Configuration)'=='debug' ">
      <PropertyGroup><OutputPath>debug-only</OutputPath></PropertyGroup>
    </When>
    <When Condition=" '$(Configuration)|$(Platform)'=='debug|AnyCPU' ">
      <PropertyGroup><OutputPath>debug</OutputPath></PropertyGroup>
    </When>
    <Otherwise>
      <PropertyGroup><OutputPath>other</OutputPath></PropertyGroup>
    </Otherwise>
  </Choose>
</Project>"#,
            Path::new("App.csproj"),
        )
        .unwrap();

        let mut seen = Vec::new();
        let found = parse_choose(&mut section, &project, |_, group| {
            seen.push(group.properties[0].value.clone());
            Ok(false)
        })
        .unwrap();
        assert!(!found);
        assert_eq!(seen, ["debug", "other"]);

        let found = parse_choose(&mut section, &project, |_, group| {
            Ok(group.properties[0].value == "debug")
        })
        .unwrap();
        assert!(found);
    }

    #[test]
    fn choose_without_choose_elements() {
        let ctx = ProjectSectionContext::default();
        let mut section = section(&ctx, Path::new("/src/App/App.csproj"));
        let project = MsBuildProject::default();
        assert!(!parse_choose(&mut section, &project, |_, _| Ok(true)).unwrap());
    }

    #[test]
    fn strong_names_are_stripped() {
        assert_eq!(simple_assembly_name("log4net, Version=1.2.10.0"), "log4net");
        assert_eq!(simple_assembly_name("System"), "System");
        assert_eq!(simple_assembly_name(",odd"), ",odd");
    }

    #[test]
    fn references_are_classified() {
        let dir = tempfile::tempdir().unwrap();
        let app_dir = dir.path().join("App");
        fs::create_dir_all(app_dir.join("bin")).unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();
        fs::create_dir_all(dir.path().join("Lib")).unwrap();
        fs::write(dir.path().join("lib").join("log4net.dll"), "").unwrap();
        fs::write(app_dir.join("Local.dll"), "").unwrap();
        fs::write(app_dir.join("bin").join("Built.dll"), "").unwrap();
        fs::write(dir.path().join("Lib").join("Lib.csproj"), "<Project />").unwrap();

        let mut ctx = ProjectSectionContext::default();
        ctx.register_info(ProjectInfo::new(
            dir.path().join("Known").join("Known.csproj"),
            "{11111111-2222-3333-4444-555555555555}",
            "Known",
        ));

        let mut section = section(&ctx, &app_dir.join("App.csproj"));
        section.output_type = "Library".into();
        section.output_path = Some(app_dir.join("bin"));

        let project = MsBuildProject::parse(
            &format!(
                r#"<Project>
  <ItemGroup>
    <Reference Include="System.Xml, Version=2.0.0.0" />
    <Reference Include="log4net, Version=1.2.10.0">
      <HintPath>..\lib\log4net.dll</HintPath>
    </Reference>
    <Reference Include="Missing"><HintPath>..\lib\Missing.dll</HintPath></Reference>
    <Reference Include="Local" Private="False" />
    <Reference Include="Built" />
    <COMReference Include="Shell32"><Guid>{{50A7E9B0}}</Guid></COMReference>
    <ProjectReference Include="..\Lib\Lib.csproj">
      <Project>{LIB_GUID}</Project>
    </ProjectReference>
    <ProjectReference Include="..\Known\Known.csproj">
      <Project>{{11111111-2222-3333-4444-555555555555}}</Project>
      <Name>Known</Name>
    </ProjectReference>
    <ProjectReference Include="..\Gone\Gone.csproj">
      <Project>{{99999999-2222-3333-4444-555555555555}}</Project>
    </ProjectReference>
    <ProjectReference Include="..\Lib\Lib.csproj" />
  </ItemGroup>
</Project>"#
            ),
            Path::new("App.csproj"),
        )
        .unwrap();

        let referenced = parse_reference_items(&mut section, &ctx, &project);

        assert_eq!(section.referenced_known_assemblies, ["System.Xml.dll"]);
        assert_eq!(
            section.referenced_assemblies,
            [
                dir.path().join("lib").join("log4net.dll"),
                app_dir.join("Local.dll"),
                app_dir.join("bin").join("Built.dll"),
            ]
        );

        assert_eq!(referenced.len(), 2);
        assert_eq!(referenced[0].name(), "Lib");
        assert_eq!(referenced[0].guid(), LIB_GUID);
        assert_eq!(referenced[0].path(), dir.path().join("Lib").join("Lib.csproj"));
        assert_eq!(referenced[1].name(), "Known");
    }

    #[test]
    fn mixed_platforms_spelling() {
        assert!(is_mixed_platforms("Mixed Platforms"));
        assert!(is_mixed_platforms("mixedplatforms"));
        assert!(!is_mixed_platforms("Win32"));
    }
}
