//! Shared state of one run over a solution and its projects.
//!
//! The context carries the user's platform and configuration, the active
//! configuration read from the solution's `.suo` file, the environment used
//! for `%VAR%` and `$(Var)` expansion, and the registries that let projects
//! referenced from several places be parsed only once.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::info::ProjectInfo;
use crate::paths;
use crate::section::ProjectSection;
use crate::suo::{self, ActiveConfiguration};
use crate::vsvars;

/// Macros Visual Studio defines for project files. A name in this list is
/// never reported as unknown, even when it has no value here.
const VISUAL_STUDIO_MACROS: &[&str] = &[
    "ConfigurationName",
    "DevEnvDir",
    "FrameworkDir",
    "FrameworkSDKDir",
    "FrameworkVersion",
    "FxCopDir",
    "InputDir",
    "InputExt",
    "InputFileName",
    "InputName",
    "InputPath",
    "IntDir",
    "OutDir",
    "ParentName",
    "PlatformName",
    "ProjectDir",
    "ProjectExt",
    "ProjectFileName",
    "ProjectName",
    "ProjectPath",
    "References",
    "RemoteMachine",
    "RootNamespace",
    "SafeInputName",
    "SafeParentName",
    "SafeRootNamespace",
    "SolutionDir",
    "SolutionExt",
    "SolutionFileName",
    "SolutionName",
    "SolutionPath",
    "TargetDir",
    "TargetExt",
    "TargetFileName",
    "TargetFramework",
    "TargetName",
    "TargetPath",
    "VCInstallDir",
    "VSInstallDir",
    "WebDeployPath",
    "WebDeployRoot",
    "WindowsSdkDir",
    "WindowsSdkDirIA64",
];

/// GUIDs compare without regard to case.
fn guid_key(guid: &str) -> String {
    guid.trim().to_ascii_uppercase()
}

#[derive(Debug, Default)]
pub struct ProjectSectionContext {
    platform: String,
    configuration: String,
    active: Option<ActiveConfiguration>,
    solution_file: Option<PathBuf>,
    solution_dir: Option<PathBuf>,
    /// Keyed by the uppercased variable name.
    env: HashMap<String, String>,
    targets: HashSet<String>,
    sections: HashMap<String, Arc<ProjectSection>>,
    infos: HashMap<String, ProjectInfo>,
    in_progress: HashSet<PathBuf>,
}

impl ProjectSectionContext {
    /// A context seeded with the process environment.
    pub fn new() -> Self {
        ProjectSectionContextBuilder::new().system_env().build()
    }

    pub fn builder() -> ProjectSectionContextBuilder {
        ProjectSectionContextBuilder::new()
    }

    // ─── Platform and configuration ──────────────────────────────────────

    pub fn platform(&self) -> &str {
        &self.platform
    }

    pub fn set_platform(&mut self, platform: impl Into<String>) {
        self.platform = platform.into();
    }

    pub fn configuration(&self) -> &str {
        &self.configuration
    }

    pub fn set_configuration(&mut self, configuration: impl Into<String>) {
        self.configuration = configuration.into();
    }

    /// The platform last active in Visual Studio, else the user's.
    pub fn active_platform(&self) -> &str {
        match &self.active {
            Some(active) if !active.platform.is_empty() => &active.platform,
            _ => &self.platform,
        }
    }

    /// The configuration last active in Visual Studio, else the user's.
    pub fn active_configuration(&self) -> &str {
        match &self.active {
            Some(active) if !active.configuration.is_empty() => &active.configuration,
            _ => &self.configuration,
        }
    }

    /// Both halves of the active configuration came from the `.suo` file.
    pub fn is_valid_active_configuration(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| !a.platform.is_empty() && !a.configuration.is_empty())
    }

    // ─── Solution ────────────────────────────────────────────────────────

    pub fn solution_file(&self) -> Option<&Path> {
        self.solution_file.as_deref()
    }

    pub fn solution_dir(&self) -> Option<&Path> {
        self.solution_dir.as_deref()
    }

    /// Point the context at a solution. `%VAR%` references are expanded and
    /// the path made absolute; the active configuration is re-read from the
    /// solution's `.suo` file. An empty path detaches the solution.
    pub fn set_solution_file(&mut self, path: impl AsRef<Path>) {
        self.active = None;

        let raw = path.as_ref().to_string_lossy();
        if raw.trim().is_empty() {
            self.solution_file = None;
            self.solution_dir = None;
            return;
        }

        let expanded = vsvars::expand_environment_variables(&raw, &self.env);
        let file = paths::full_path(Path::new(&paths::normalize_separators(&expanded)));
        self.solution_dir = file.parent().map(Path::to_path_buf);

        if file.is_file() {
            self.active = suo::read_active_configuration(&file);
        }
        debug!(solution = %file.display(), active = ?self.active, "solution attached");
        self.solution_file = Some(file);
    }

    // ─── Environment ─────────────────────────────────────────────────────

    /// Environment variables, keyed by uppercased name.
    pub fn environment(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// Case-insensitive environment lookup.
    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env.get(&name.to_ascii_uppercase()).map(String::as_str)
    }

    pub fn set_env_var(&mut self, name: &str, value: impl Into<String>) {
        self.env.insert(name.to_ascii_uppercase(), value.into());
    }

    pub fn macro_names(&self) -> &'static [&'static str] {
        VISUAL_STUDIO_MACROS
    }

    pub fn is_macro_name(&self, name: &str) -> bool {
        VISUAL_STUDIO_MACROS
            .iter()
            .any(|m| m.eq_ignore_ascii_case(name))
    }

    // ─── Targets ─────────────────────────────────────────────────────────

    pub fn register_target(&mut self, guid: &str) -> bool {
        if guid.trim().is_empty() {
            return false;
        }
        self.targets.insert(guid_key(guid))
    }

    pub fn register_targets<'a>(&mut self, guids: impl IntoIterator<Item = &'a str>) {
        for guid in guids {
            self.register_target(guid);
        }
    }

    pub fn has_targets(&self) -> bool {
        !self.targets.is_empty()
    }

    /// With no registered targets, every project is a target.
    pub fn is_target(&self, guid: &str) -> bool {
        if guid.trim().is_empty() {
            return false;
        }
        self.targets.is_empty() || self.targets.contains(&guid_key(guid))
    }

    // ─── Sections and project infos ──────────────────────────────────────

    pub fn project_section(&self, guid: &str) -> Option<Arc<ProjectSection>> {
        if guid.trim().is_empty() {
            return None;
        }
        self.sections.get(&guid_key(guid)).cloned()
    }

    /// Register a parsed section under its GUID. The first section for a
    /// GUID wins. A matching [`ProjectInfo`] is registered when missing.
    pub fn register_section(&mut self, section: Arc<ProjectSection>) -> bool {
        let guid = section.project_guid.as_str();
        if guid.trim().is_empty() {
            return false;
        }
        let key = guid_key(guid);
        if self.sections.contains_key(&key) {
            return false;
        }

        if !self.infos.contains_key(&key) {
            let info = ProjectInfo::new(
                section.project_file.clone(),
                guid,
                section.project_name.clone(),
            );
            if info.is_valid() {
                self.infos.insert(key.clone(), info);
            }
        }

        debug!(name = %section.project_name, guid, "section registered");
        self.sections.insert(key, section);
        true
    }

    pub fn project_info(&self, guid: &str) -> Option<&ProjectInfo> {
        if guid.trim().is_empty() {
            return None;
        }
        self.infos.get(&guid_key(guid))
    }

    pub fn register_info(&mut self, info: ProjectInfo) -> bool {
        if !info.is_valid() {
            return false;
        }
        let key = guid_key(info.guid());
        if self.infos.contains_key(&key) {
            return false;
        }
        self.infos.insert(key, info);
        true
    }

    /// Register every info in `infos`; `false` only when there were none.
    pub fn register_infos(&mut self, infos: impl IntoIterator<Item = ProjectInfo>) -> bool {
        let mut any = false;
        for info in infos {
            any = true;
            self.register_info(info);
        }
        any
    }

    // ─── Reference cycles ────────────────────────────────────────────────

    /// Mark `project_file` as being parsed; `false` when it already is.
    pub(crate) fn begin_parse(&mut self, project_file: &Path) -> bool {
        self.in_progress.insert(project_file.to_path_buf())
    }

    pub(crate) fn end_parse(&mut self, project_file: &Path) {
        self.in_progress.remove(project_file);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  ProjectSectionContextBuilder
// ═══════════════════════════════════════════════════════════════════════════════

/// Builder for a [`ProjectSectionContext`].
///
/// Environment variables feed the `$(VCInstallDir)`-style macros and the
/// `%VAR%` expansion of project and solution paths.
///
/// # Example
/// ```no_run
/// use project_sections::ProjectSectionContext;
///
/// let ctx = ProjectSectionContext::builder()
///     .system_env()
///     .vsvars_file(r"C:\Program Files\Microsoft Visual Studio 9.0\Common7\Tools\vsvars32.bat")
///     .unwrap()
///     .platform("Win32")
///     .configuration("Release")
///     .solution_file("App.sln")
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProjectSectionContextBuilder {
    env: HashMap<String, String>,
    platform: String,
    configuration: String,
    solution_file: Option<PathBuf>,
    targets: Vec<String>,
}

impl ProjectSectionContextBuilder {
    /// Create a new builder with an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an entire variable map into the environment.
    ///
    /// Later calls override earlier values for the same key.
    pub fn env(mut self, vars: HashMap<String, String>) -> Self {
        for (k, v) in vars {
            self.env.insert(k.to_ascii_uppercase(), v);
        }
        self
    }

    /// Set a single environment variable.
    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into().to_ascii_uppercase(), value.into());
        self
    }

    /// Parse a `vsvars32.bat` file from its contents and merge the resulting
    /// variables into the environment.
    pub fn vsvars(self, content: &str) -> Self {
        let vars = vsvars::parse_vsvars(content);
        self.env(vars)
    }

    /// Parse a `vsvars32.bat` file from disk and merge the resulting variables
    /// into the environment.
    pub fn vsvars_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let vars = vsvars::parse_vsvars_file(path)?;
        Ok(self.env(vars))
    }

    /// Pull all current process environment variables into the map.
    ///
    /// Call this *before* [`vsvars`](Self::vsvars) so that the batch file's
    /// values take precedence over stale system variables.
    pub fn system_env(self) -> Self {
        self.env(std::env::vars().collect())
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn configuration(mut self, configuration: impl Into<String>) -> Self {
        self.configuration = configuration.into();
        self
    }

    pub fn solution_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.solution_file = Some(path.into());
        self
    }

    /// Restrict the run to the projects with these GUIDs.
    pub fn targets<I, S>(mut self, guids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets.extend(guids.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> ProjectSectionContext {
        let mut ctx = ProjectSectionContext {
            platform: self.platform,
            configuration: self.configuration,
            env: self.env,
            ..Default::default()
        };
        ctx.register_targets(self.targets.iter().map(String::as_str));
        if let Some(solution) = self.solution_file {
            ctx.set_solution_file(solution);
        }
        ctx
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
