//! Owned model of a Visual C++ 2002-2008 project file (`.vcproj`).
//!
//! These files are plain XML rooted at `<VisualStudioProject>`; every
//! setting is an attribute. Attributes are kept as written and looked up
//! without regard to case.

use std::path::Path;

use crate::error::{ProjectError, Result};

/// Attributes of one element, in document order.
#[derive(Debug, Clone, Default)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    fn from_node(node: &roxmltree::Node) -> Self {
        Self(
            node.attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect(),
        )
    }

    /// Attribute value by case-insensitive name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Attribute value, treating an empty value as missing.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default)]
pub struct VcProject {
    /// `Version`, `Name`, `ProjectGUID`, `Keyword`, `TargetFrameworkVersion`, ...
    pub attributes: Attributes,
    /// Names of the `<Platforms>/<Platform>` entries.
    pub platforms: Vec<String>,
    pub configurations: Vec<VcConfiguration>,
    pub references: VcReferences,
}

#[derive(Debug, Clone, Default)]
pub struct VcConfiguration {
    /// `Name` (`Debug|Win32`), `OutputDirectory`, `ConfigurationType`, ...
    pub attributes: Attributes,
    pub tools: Vec<VcTool>,
}

#[derive(Debug, Clone, Default)]
pub struct VcTool {
    pub name: String,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Default)]
pub struct VcReferences {
    pub assemblies: Vec<Attributes>,
    pub projects: Vec<Attributes>,
    pub activex: Vec<Attributes>,
}

impl VcProject {
    pub fn version(&self) -> &str {
        self.attributes.get("Version").unwrap_or_default()
    }

    pub fn name(&self) -> Option<&str> {
        self.attributes.non_empty("Name")
    }

    pub fn project_guid(&self) -> Option<&str> {
        self.attributes.non_empty("ProjectGUID")
    }

    pub fn keyword(&self) -> Option<&str> {
        self.attributes.non_empty("Keyword")
    }

    pub fn target_framework_version(&self) -> Option<&str> {
        self.attributes.non_empty("TargetFrameworkVersion")
    }
}

impl VcConfiguration {
    pub fn name(&self) -> &str {
        self.attributes.get("Name").unwrap_or_default()
    }

    /// `Debug|Win32` → `("Debug", "Win32")`.
    pub fn split_name(&self) -> Option<(&str, &str)> {
        let (configuration, platform) = self.name().split_once('|')?;
        if platform.contains('|') {
            return None;
        }
        Some((configuration.trim(), platform.trim()))
    }

    pub fn tool(&self, name: &str) -> Option<&VcTool> {
        self.tools.iter().find(|t| t.name == name)
    }
}

impl VcTool {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Parsing
// ═══════════════════════════════════════════════════════════════════════════════

impl VcProject {
    pub fn parse(source: &str, path: &Path) -> Result<Self> {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let doc = roxmltree::Document::parse(source).map_err(|e| ProjectError::Xml {
            path: path.to_path_buf(),
            source: e,
        })?;

        let root = doc.root_element();
        if root.tag_name().name() != "VisualStudioProject" {
            return Err(ProjectError::UnexpectedRoot {
                path: path.to_path_buf(),
                expected: "VisualStudioProject",
                found: root.tag_name().name().to_string(),
            });
        }

        let mut project = Self {
            attributes: Attributes::from_node(&root),
            ..Default::default()
        };

        for child in root.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "Platforms" => project.platforms.extend(
                    elements(&child, "Platform")
                        .filter_map(|n| n.attribute("Name").map(String::from)),
                ),
                "Configurations" => project.configurations.extend(
                    elements(&child, "Configuration").map(|n| VcConfiguration::parse(&n)),
                ),
                "References" => project.references.parse(&child),
                _ => {}
            }
        }

        Ok(project)
    }

    /// Load a project from disk. Files written in a legacy code page are
    /// read lossily.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| ProjectError::io(path, e))?;
        Self::parse(&crate::msbuild::decode_text(&bytes), path)
    }
}

fn elements<'a, 'input>(
    node: &roxmltree::Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = roxmltree::Node<'a, 'input>> {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

impl VcConfiguration {
    fn parse(node: &roxmltree::Node) -> Self {
        Self {
            attributes: Attributes::from_node(node),
            tools: elements(node, "Tool")
                .map(|n| VcTool {
                    name: n.attribute("Name").unwrap_or("").to_string(),
                    attributes: Attributes::from_node(&n),
                })
                .collect(),
        }
    }
}

impl VcReferences {
    fn parse(&mut self, node: &roxmltree::Node) {
        for child in node.children().filter(|n| n.is_element()) {
            let attributes = Attributes::from_node(&child);
            match child.tag_name().name() {
                "AssemblyReference" => self.assemblies.push(attributes),
                "ProjectReference" => self.projects.push(attributes),
                "ActiveXReference" => self.activex.push(attributes),
                _ => {}
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const VCPROJ: &str = r#"<?xml version="1.0" encoding="Windows-1252"?>
<VisualStudioProject
	ProjectType="Visual C++"
	Version="9.00"
	Name="Native"
	ProjectGUID="{3C4D5E6F-7A8B-4C9D-8E0F-1A2B3C4D5E6F}"
	RootNamespace="Native"
	Keyword="ManagedCProj"
	TargetFrameworkVersion="196613"
	>
	<Platforms>
		<Platform Name="Win32" />
		<Platform Name="x64" />
	</Platforms>
	<ToolFiles />
	<Configurations>
		<Configuration
			Name="Debug|Win32"
			OutputDirectory="$(SolutionDir)$(ConfigurationName)"
			ConfigurationType="2"
			>
			<Tool Name="VCCLCompilerTool" GenerateXMLDocumentationFiles="true" />
			<Tool Name="VCXDCMakeTool" />
			<Tool Name="VCLinkerTool" OutputFile="$(OutDir)\$(ProjectName).dll" />
		</Configuration>
	</Configurations>
	<References>
		<AssemblyReference RelativePath="System.dll" AssemblyName="System, Version=2.0.0.0" />
		<ProjectReference ReferencedProjectIdentifier="{0A1B2C3D-4E5F-4061-8293-A4B5C6D7E8F9}" RelativePathToProject=".\Lib\Lib.vcproj" />
		<ActiveXReference ControlGUID="{EAB22AC0-30C1-11CF-A7EB-0000C05BAE0B}" />
	</References>
	<Files />
	<Globals />
</VisualStudioProject>
"#;

    #[test]
    fn reads_project_attributes() {
        let project = VcProject::parse(VCPROJ, Path::new("Native.vcproj")).unwrap();
        assert_eq!(project.version(), "9.00");
        assert_eq!(project.name(), Some("Native"));
        assert_eq!(project.project_guid(), Some("{3C4D5E6F-7A8B-4C9D-8E0F-1A2B3C4D5E6F}"));
        assert_eq!(project.keyword(), Some("ManagedCProj"));
        assert_eq!(project.target_framework_version(), Some("196613"));
        assert_eq!(project.attributes.get("projecttype"), Some("Visual C++"));
        assert_eq!(project.platforms, ["Win32", "x64"]);
    }

    #[test]
    fn reads_configurations_and_tools() {
        let project = VcProject::parse(VCPROJ, Path::new("Native.vcproj")).unwrap();
        let config = &project.configurations[0];
        assert_eq!(config.split_name(), Some(("Debug", "Win32")));
        assert_eq!(config.attributes.get("ConfigurationType"), Some("2"));
        assert_eq!(config.tools.len(), 3);
        assert_eq!(
            config.tool("VCCLCompilerTool").unwrap().get("generatexmldocumentationfiles"),
            Some("true")
        );
        assert!(config.tool("VCMIDLTool").is_none());
    }

    #[test]
    fn reads_references() {
        let project = VcProject::parse(VCPROJ, Path::new("Native.vcproj")).unwrap();
        assert_eq!(project.references.assemblies[0].get("RelativePath"), Some("System.dll"));
        assert_eq!(
            project.references.projects[0].get("RelativePathToProject"),
            Some(r".\Lib\Lib.vcproj")
        );
        assert_eq!(project.references.activex.len(), 1);
    }

    #[test]
    fn configuration_names_need_two_parts() {
        let config = |name: &str| VcConfiguration {
            attributes: Attributes(vec![("Name".into(), name.into())]),
            tools: Vec::new(),
        };
        assert_eq!(config(" Release | x64 ").split_name(), Some(("Release", "x64")));
        assert_eq!(config("Release").split_name(), None);
        assert_eq!(config("a|b|c").split_name(), None);
    }

    #[test]
    fn rejects_msbuild_projects() {
        let err = VcProject::parse("<Project />", Path::new("Native.vcproj")).unwrap_err();
        assert!(matches!(err, ProjectError::UnexpectedRoot { expected: "VisualStudioProject", .. }));
    }

    #[test]
    fn legacy_code_page_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Native.vcproj");
        let mut bytes = br#"<VisualStudioProject Version="8.00" Name="Caf"#.to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(br#"" />"#);
        std::fs::write(&path, bytes).unwrap();

        let project = VcProject::from_file(&path).unwrap();
        assert_eq!(project.version(), "8.00");
        assert!(project.name().unwrap().starts_with("Caf"));
    }
}
