//! Build metadata extracted from one project file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::context::ProjectSectionContext;
use crate::error::Result;
use crate::factory;
use crate::info::ProjectInfo;
use crate::macros::{self, Resolution};
use crate::paths;
use crate::vsvars;

/// Language of a standard (non C++) MSBuild project, from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StandardProjectType {
    None,
    CsProj,
    VbProj,
    FsProj,
    PyProj,
    RbProj,
    VjsProj,
}

/// Project file dialect a section was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "dialect", rename_all = "snake_case")]
pub enum ProjectKind {
    /// `.csproj`, `.vbproj` and the other MSBuild language projects.
    Standard { project_type: StandardProjectType },
    /// Visual C++ 2002-2008 `.vcproj`, with the file format version.
    Vc { version: String },
    /// Visual C++ 2010+ `.vcxproj`.
    Vcx,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectSection {
    pub kind: ProjectKind,
    pub project_guid: String,
    pub project_name: String,
    pub project_file: PathBuf,
    pub project_dir: PathBuf,
    pub platform: String,
    pub configuration: String,
    pub output_type: String,
    pub output_path: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub comment_file: Option<PathBuf>,
    pub assembly_name: String,
    pub target_framework_version: String,
    pub target_framework_identifier: String,
    pub platform_family_name: String,
    pub referenced_assemblies: Vec<PathBuf>,
    /// Reference search directories, each ending with a separator.
    pub referenced_paths: Vec<String>,
    pub referenced_known_assemblies: Vec<String>,
    /// Global property values, as written in the project.
    pub properties: BTreeMap<String, String>,
    pub children: Vec<Arc<ProjectSection>>,
    /// The build output was located and exists on disk.
    pub is_complete: bool,
}

impl ProjectSection {
    /// A blank section for `project_file`.
    ///
    /// `%VAR%` references in the path are expanded from the context's
    /// environment and the path is made absolute. The GUID is a fresh
    /// placeholder until the project file supplies one.
    pub fn new(ctx: &ProjectSectionContext, kind: ProjectKind, project_file: &Path) -> Self {
        let expanded =
            vsvars::expand_environment_variables(&project_file.to_string_lossy(), ctx.environment());
        let project_file = paths::full_path(Path::new(&paths::normalize_separators(&expanded)));
        let project_dir = project_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self {
            kind,
            project_guid: format!("{{{}}}", Uuid::new_v4()).to_uppercase(),
            project_name: paths::file_stem(&project_file),
            project_file,
            project_dir,
            platform: String::new(),
            configuration: String::new(),
            output_type: String::new(),
            output_path: None,
            output_file: None,
            comment_file: None,
            assembly_name: String::new(),
            target_framework_version: String::new(),
            target_framework_identifier: String::new(),
            platform_family_name: String::new(),
            referenced_assemblies: Vec::new(),
            referenced_paths: Vec::new(),
            referenced_known_assemblies: Vec::new(),
            properties: BTreeMap::new(),
            children: Vec::new(),
            is_complete: false,
        }
    }

    pub fn is_silverlight(&self) -> bool {
        self.target_framework_identifier
            .eq_ignore_ascii_case("Silverlight")
    }

    /// Global property value by case-insensitive name.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .or_else(|| {
                self.properties
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
            .map(String::as_str)
    }

    /// Record a global property; a later definition replaces an earlier one
    /// regardless of case.
    pub(crate) fn set_property(&mut self, name: &str, value: &str) {
        let existing = self
            .properties
            .keys()
            .find(|key| key.eq_ignore_ascii_case(name))
            .cloned();
        if let Some(key) = existing {
            self.properties.remove(&key);
        }
        self.properties.insert(name.to_string(), value.to_string());
    }

    /// Project directory with a trailing separator, as `$(ProjectDir)` gives it.
    pub fn project_dir_text(&self) -> String {
        paths::with_trailing_separator(&self.project_dir)
    }

    /// Resolve a path value from the project against the project directory.
    pub(crate) fn resolve_path(&self, value: &str) -> PathBuf {
        paths::resolve(&self.project_dir, value)
    }

    /// `<output path>/<assembly name>.<ext>` for the current output type, if
    /// the type produces an assembly.
    pub(crate) fn output_file_in(&self, dir: &Path) -> Option<PathBuf> {
        let extension = output_extension(&self.output_type)?;
        Some(paths::full_path(
            &dir.join(format!("{}.{extension}", self.assembly_name)),
        ))
    }

    pub(crate) fn output_exists(&self) -> bool {
        self.output_file.as_deref().is_some_and(Path::is_file)
    }

    pub(crate) fn comment_exists(&self) -> bool {
        self.comment_file.as_deref().is_some_and(Path::is_file)
    }

    /// Use `<output>.xml` as the comment file when it sits next to an
    /// existing output and no comment file was found yet.
    pub(crate) fn fall_back_to_output_xml(&mut self) {
        if self.comment_exists() || !self.output_exists() {
            return;
        }
        if let Some(candidate) = self.output_file.as_ref().map(|f| f.with_extension("xml")) {
            if candidate.is_file() {
                debug!(comment = %candidate.display(), "comment file next to output");
                self.comment_file = Some(candidate);
            }
        }
    }

    // ─── Macros ──────────────────────────────────────────────────────────

    /// Replace `$(Name)` references in `text`.
    ///
    /// Names resolve, in order, to the Visual Studio macros this section can
    /// answer, the project's MSBuild properties, then environment variables.
    /// Visual Studio macros without a value here stay as written; any other
    /// unknown name is an error.
    pub fn evaluate_macros(&self, ctx: &ProjectSectionContext, text: &str) -> Result<String> {
        macros::expand(text, |name| {
            if let Some(value) = self.visual_studio_macro(ctx, name) {
                return Resolution::Value(value);
            }
            if let Some(value) = self.msbuild_property(ctx, name) {
                return Resolution::Value(value);
            }
            if let Some(value) = ctx.env_var(name) {
                return Resolution::Value(value.to_string());
            }
            if name.is_empty() || ctx.is_macro_name(name) {
                Resolution::Keep
            } else {
                Resolution::Unknown
            }
        })
    }

    fn visual_studio_macro(&self, ctx: &ProjectSectionContext, name: &str) -> Option<String> {
        let solution = ctx.solution_file();
        let value = match name.to_ascii_lowercase().as_str() {
            "configurationname" => non_empty_or(&self.configuration, ctx.active_configuration()),
            "platformname" => non_empty_or(&self.platform, ctx.active_platform()),
            "outdir" | "targetdir" => paths::with_trailing_separator(self.output_path.as_deref()?),
            "projectdir" => self.project_dir_text(),
            "projectext" => paths::extension(&self.project_file),
            "projectfilename" => paths::file_name(&self.project_file),
            "projectname" => self.project_name.clone(),
            "projectpath" => self.project_file.to_string_lossy().into_owned(),
            "solutiondir" => paths::with_trailing_separator(ctx.solution_dir()?),
            "solutionext" => paths::extension(solution?),
            "solutionfilename" => paths::file_name(solution?),
            "solutionname" => paths::file_stem(solution?),
            "solutionpath" => solution?.to_string_lossy().into_owned(),
            "targetname" if !self.assembly_name.is_empty() => self.assembly_name.clone(),
            "targetext" => paths::extension(self.output_file.as_deref()?),
            "targetfilename" => paths::file_name(self.output_file.as_deref()?),
            "targetpath" => self.output_file.as_deref()?.to_string_lossy().into_owned(),
            "rootnamespace" => self.property("RootNamespace")?.to_string(),
            _ => return None,
        };
        Some(value)
    }

    fn msbuild_property(&self, ctx: &ProjectSectionContext, name: &str) -> Option<String> {
        let value = match name.to_ascii_lowercase().as_str() {
            "configuration" => non_empty_or(&self.configuration, ctx.active_configuration()),
            "platform" => non_empty_or(&self.platform, ctx.active_platform()),
            "msbuildprojectdirectory" => self.project_dir.to_string_lossy().into_owned(),
            "msbuildprojectname" => paths::file_stem(&self.project_file),
            "msbuildprojectfile" => paths::file_name(&self.project_file),
            "msbuildprojectextension" => paths::extension(&self.project_file),
            "msbuildprojectfullpath" => self.project_file.to_string_lossy().into_owned(),
            _ => self.property(name)?.to_string(),
        };
        Some(value)
    }

    // ─── Children ────────────────────────────────────────────────────────

    /// Append a referenced project and register it with the context.
    pub fn add_child(&mut self, ctx: &mut ProjectSectionContext, section: Arc<ProjectSection>) {
        ctx.register_section(section.clone());
        self.children.push(section);
    }

    /// Attach a section for every valid referenced project, reusing sections
    /// the context already holds.
    pub fn create_children(
        &mut self,
        ctx: &mut ProjectSectionContext,
        referenced: &[ProjectInfo],
    ) -> Result<()> {
        for info in referenced.iter().filter(|info| info.is_valid()) {
            if let Some(child) = factory::create_section_for(ctx, info)? {
                debug!(parent = %self.project_name, child = %child.project_name, "project reference");
                self.add_child(ctx, child);
            }
        }
        Ok(())
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() { fallback } else { value }.to_string()
}

/// File extension (without the dot) of the assembly an output type builds.
pub fn output_extension(output_type: &str) -> Option<&'static str> {
    match output_type.trim().to_ascii_lowercase().as_str() {
        "library" | "dynamiclibrary" | "dll" => Some("dll"),
        "exe" | "winexe" | "application" | "appcontainerexe" => Some("exe"),
        "module" => Some("netmodule"),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProjectError;

    fn section_in(ctx: &ProjectSectionContext, file: &Path) -> ProjectSection {
        ProjectSection::new(ctx, ProjectKind::Vcx, file)
    }

    #[test]
    fn new_section_has_placeholder_guid_and_name() {
        let ctx = ProjectSectionContext::default();
        let section = section_in(&ctx, Path::new("/src/App/App.vcxproj"));

        assert_eq!(section.project_name, "App");
        assert_eq!(section.project_dir, Path::new("/src/App"));
        assert_eq!(section.project_guid.len(), 38);
        assert!(section.project_guid.starts_with('{') && section.project_guid.ends_with('}'));
        assert_eq!(section.project_guid, section.project_guid.to_uppercase());
        assert!(!section.is_complete);
    }

    #[test]
    fn new_section_expands_environment() {
        let ctx = ProjectSectionContext::builder().env_var("SRC", "/work").build();
        let section = section_in(&ctx, Path::new("%SRC%/Lib/Lib.vcxproj"));
        assert_eq!(section.project_file, Path::new("/work/Lib/Lib.vcxproj"));
    }

    #[test]
    fn silverlight_detection() {
        let ctx = ProjectSectionContext::default();
        let mut section = section_in(&ctx, Path::new("/src/App/App.csproj"));
        assert!(!section.is_silverlight());
        section.target_framework_identifier = "silverlight".into();
        assert!(section.is_silverlight());
    }

    #[test]
    fn properties_ignore_case() {
        let ctx = ProjectSectionContext::default();
        let mut section = section_in(&ctx, Path::new("/src/App/App.csproj"));
        section.set_property("RootNamespace", "Acme.App");
        assert_eq!(section.property("rootnamespace"), Some("Acme.App"));

        section.set_property("ROOTNAMESPACE", "Acme.Other");
        assert_eq!(section.properties.len(), 1);
        assert_eq!(section.property("RootNamespace"), Some("Acme.Other"));
    }

    #[test]
    fn output_extensions() {
        assert_eq!(output_extension("Library"), Some("dll"));
        assert_eq!(output_extension("DynamicLibrary"), Some("dll"));
        assert_eq!(output_extension("WinExe"), Some("exe"));
        assert_eq!(output_extension("Application"), Some("exe"));
        assert_eq!(output_extension("StaticLibrary"), None);
        assert_eq!(output_extension(""), None);
    }

    // ── Macros ───────────────────────────────────────────────────────────

    fn macro_fixture() -> (tempfile::TempDir, ProjectSectionContext, ProjectSection) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ProjectSectionContext::builder()
            .env_var("VCInstallDir", "/vs/VC/")
            .env_var("BuildRoot", "/build")
            .configuration("Debug")
            .platform("Win32")
            .solution_file(dir.path().join("Suite.sln"))
            .build();
        let mut section = section_in(&ctx, &dir.path().join("App").join("App.vcxproj"));
        section.assembly_name = "AppLib".into();
        section.output_path = Some(dir.path().join("out"));
        section.output_file = Some(dir.path().join("out").join("AppLib.dll"));
        section.set_property("RootNamespace", "Acme");
        section.set_property("Flavor", "$(Configuration)-$(Platform)");
        (dir, ctx, section)
    }

    #[test]
    fn visual_studio_macros() {
        let (dir, ctx, section) = macro_fixture();
        let sep = std::path::MAIN_SEPARATOR;
        let eval = |text: &str| section.evaluate_macros(&ctx, text).unwrap();

        assert_eq!(eval("$(ConfigurationName)|$(PlatformName)"), "Debug|Win32");
        assert_eq!(
            eval("$(SolutionDir)"),
            format!("{}{sep}", dir.path().display())
        );
        assert_eq!(eval("$(SolutionName)$(SolutionExt)"), "Suite.sln");
        assert_eq!(eval("$(ProjectName)$(ProjectExt)"), "App.vcxproj");
        assert_eq!(eval("$(ProjectFileName)"), "App.vcxproj");
        assert_eq!(eval("$(TargetName)$(TargetExt)"), "AppLib.dll");
        assert_eq!(eval("$(TargetFileName)"), "AppLib.dll");
        assert_eq!(
            eval("$(OutDir)"),
            format!("{}{sep}", dir.path().join("out").display())
        );
        assert_eq!(eval("$(RootNamespace)"), "Acme");
    }

    #[test]
    fn section_values_win_over_context() {
        let (_dir, ctx, mut section) = macro_fixture();
        section.configuration = "Release".into();
        assert_eq!(
            section.evaluate_macros(&ctx, "$(ConfigurationName)").unwrap(),
            "Release"
        );
    }

    #[test]
    fn msbuild_properties_and_environment() {
        let (dir, ctx, section) = macro_fixture();
        let eval = |text: &str| section.evaluate_macros(&ctx, text).unwrap();

        assert_eq!(eval("$(Flavor)"), "Debug-Win32");
        assert_eq!(eval("$(MSBuildProjectName)"), "App");
        assert_eq!(
            eval("$(MSBuildProjectDirectory)"),
            dir.path().join("App").display().to_string()
        );
        assert_eq!(eval("$(vcinstalldir)bin"), "/vs/VC/bin");
        assert_eq!(eval("$(BUILDROOT)/x"), "/build/x");
    }

    #[test]
    fn unresolved_visual_studio_macro_is_kept() {
        let (_dir, ctx, section) = macro_fixture();
        assert_eq!(
            section.evaluate_macros(&ctx, "$(IntDir)obj").unwrap(),
            "$(IntDir)obj"
        );
    }

    #[test]
    fn unknown_macro_is_an_error() {
        let (_dir, ctx, section) = macro_fixture();
        let err = section.evaluate_macros(&ctx, "$(NoSuchThing)").unwrap_err();
        assert!(matches!(err, ProjectError::UnknownMacro(ref name) if name == "NoSuchThing"));
    }
}
