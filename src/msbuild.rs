//! Owned model of an MSBuild project file.
//!
//! Reading is done by parsing into fully owned types via `roxmltree`.
//! Element names are matched without their namespace, so both the 2003
//! `http://schemas.microsoft.com/developer/msbuild/2003` projects and
//! namespace-less SDK projects are understood. Only the structure the
//! section parsers need is kept; unknown elements are skipped.

use std::path::Path;

use crate::error::{ProjectError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
//  Type definitions
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
pub struct MsBuildProject {
    /// Top-level property groups, in document order.
    pub property_groups: Vec<PropertyGroup>,
    /// Top-level item groups, in document order.
    pub item_groups: Vec<ItemGroup>,
    pub item_definition_groups: Vec<ItemDefinitionGroup>,
    pub chooses: Vec<Choose>,
    /// Imports, including those inside `<ImportGroup>`.
    pub imports: Vec<Import>,
}

#[derive(Debug, Clone, Default)]
pub struct PropertyGroup {
    pub condition: Option<String>,
    pub label: Option<String>,
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, Default)]
pub struct Property {
    pub name: String,
    pub value: String,
    pub condition: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ItemGroup {
    pub condition: Option<String>,
    pub label: Option<String>,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default)]
pub struct Item {
    pub item_type: String,
    pub include: String,
    pub condition: Option<String>,
    pub metadata: Vec<Metadata>,
}

#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub name: String,
    pub value: String,
    /// Written as an attribute of the item rather than a child element.
    pub is_attribute: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ItemDefinitionGroup {
    pub condition: Option<String>,
    pub label: Option<String>,
    pub definitions: Vec<ItemDefinition>,
}

#[derive(Debug, Clone, Default)]
pub struct ItemDefinition {
    pub item_type: String,
    pub metadata: Vec<Metadata>,
}

/// `<Choose>` with its `<When>` branches and optional `<Otherwise>`.
#[derive(Debug, Clone, Default)]
pub struct Choose {
    pub whens: Vec<ChooseBranch>,
    pub otherwise: Option<ChooseBranch>,
}

/// Contents of a `<When>` (with its condition) or `<Otherwise>` element.
#[derive(Debug, Clone, Default)]
pub struct ChooseBranch {
    pub condition: Option<String>,
    pub property_groups: Vec<PropertyGroup>,
    pub item_groups: Vec<ItemGroup>,
    pub chooses: Vec<Choose>,
}

#[derive(Debug, Clone, Default)]
pub struct Import {
    pub project: String,
    pub condition: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Queries
// ═══════════════════════════════════════════════════════════════════════════════

impl MsBuildProject {
    /// Every item of the project, including those inside `<Choose>` branches.
    pub fn items(&self) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.item_groups.iter().flat_map(|g| &g.items).collect();
        for choose in &self.chooses {
            choose.collect_items(&mut items);
        }
        items
    }

    /// First top-level item group with the given label (case-insensitive).
    pub fn item_group_labelled(&self, label: &str) -> Option<&ItemGroup> {
        self.item_groups.iter().find(|g| {
            g.label
                .as_deref()
                .is_some_and(|l| l.eq_ignore_ascii_case(label))
        })
    }
}

impl Choose {
    fn collect_items<'a>(&'a self, items: &mut Vec<&'a Item>) {
        for branch in self.whens.iter().chain(self.otherwise.iter()) {
            items.extend(branch.item_groups.iter().flat_map(|g| &g.items));
            for nested in &branch.chooses {
                nested.collect_items(items);
            }
        }
    }
}

impl PropertyGroup {
    /// Last property with the given name (case-insensitive).
    pub fn find(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .rev()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

impl Item {
    /// Metadata value by case-insensitive name.
    pub fn metadata(&self, name: &str) -> Option<&str> {
        find_metadata(&self.metadata, name)
    }

    /// Whether the item has child metadata elements. Attribute metadata
    /// such as `Private="False"` does not count.
    pub fn has_metadata(&self) -> bool {
        self.metadata.iter().any(|m| !m.is_attribute)
    }
}

impl ItemDefinition {
    pub fn metadata(&self, name: &str) -> Option<&str> {
        find_metadata(&self.metadata, name)
    }
}

fn find_metadata<'a>(metadata: &'a [Metadata], name: &str) -> Option<&'a str> {
    metadata
        .iter()
        .find(|m| m.name.eq_ignore_ascii_case(name))
        .map(|m| m.value.as_str())
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Parsing – roxmltree → owned types
// ═══════════════════════════════════════════════════════════════════════════════

impl MsBuildProject {
    /// Parse an MSBuild project from its XML source. The root element must be
    /// `<Project>`.
    pub fn parse(source: &str, path: &Path) -> Result<Self> {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);
        let doc = roxmltree::Document::parse(source).map_err(|e| ProjectError::Xml {
            path: path.to_path_buf(),
            source: e,
        })?;

        let root = doc.root_element();
        if root.tag_name().name() != "Project" {
            return Err(ProjectError::UnexpectedRoot {
                path: path.to_path_buf(),
                expected: "Project",
                found: root.tag_name().name().to_string(),
            });
        }

        let mut project = Self::default();
        for child in root.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "PropertyGroup" => project.property_groups.push(PropertyGroup::parse(&child)),
                "ItemGroup" => project.item_groups.push(ItemGroup::parse(&child)),
                "ItemDefinitionGroup" => project
                    .item_definition_groups
                    .push(ItemDefinitionGroup::parse(&child)),
                "Choose" => project.chooses.push(Choose::parse(&child)),
                "Import" => project.imports.push(Import::parse(&child)),
                "ImportGroup" => project.imports.extend(
                    child
                        .children()
                        .filter(|n| n.is_element() && n.tag_name().name() == "Import")
                        .map(|n| Import::parse(&n)),
                ),
                _ => {}
            }
        }

        Ok(project)
    }

    /// Load an MSBuild project from disk. UTF-16 files are recognised by
    /// their byte order mark; anything else is read as UTF-8, lossily.
    pub fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| ProjectError::io(path, e))?;
        Self::parse(&decode_text(&bytes), path)
    }
}

/// Text of a project file: UTF-16 with a byte order mark, else UTF-8.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    let utf16 = |rest: &[u8], from: fn([u8; 2]) -> u16| {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| from([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    };
    match bytes {
        [0xFF, 0xFE, rest @ ..] => utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => utf16(rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn attribute(node: &roxmltree::Node, name: &str) -> Option<String> {
    node.attribute(name).map(String::from)
}

fn element_text(node: &roxmltree::Node) -> String {
    node.text().unwrap_or("").trim().to_string()
}

impl PropertyGroup {
    fn parse(node: &roxmltree::Node) -> Self {
        Self {
            condition: attribute(node, "Condition"),
            label: attribute(node, "Label"),
            properties: node
                .children()
                .filter(|n| n.is_element())
                .map(|n| Property {
                    name: n.tag_name().name().to_string(),
                    value: element_text(&n),
                    condition: attribute(&n, "Condition"),
                })
                .collect(),
        }
    }
}

/// Attributes on an item element that are not metadata.
const ITEM_ATTRIBUTES: &[&str] = &[
    "Include", "Exclude", "Remove", "Update", "Condition", "Label", "KeepMetadata",
    "RemoveMetadata", "KeepDuplicates",
];

fn parse_metadata(node: &roxmltree::Node) -> Vec<Metadata> {
    let mut metadata: Vec<Metadata> = node
        .attributes()
        .filter(|a| !ITEM_ATTRIBUTES.contains(&a.name()))
        .map(|a| Metadata {
            name: a.name().to_string(),
            value: a.value().trim().to_string(),
            is_attribute: true,
        })
        .collect();
    metadata.extend(node.children().filter(|n| n.is_element()).map(|n| Metadata {
        name: n.tag_name().name().to_string(),
        value: element_text(&n),
        is_attribute: false,
    }));
    metadata
}

impl ItemGroup {
    fn parse(node: &roxmltree::Node) -> Self {
        Self {
            condition: attribute(node, "Condition"),
            label: attribute(node, "Label"),
            items: node
                .children()
                .filter(|n| n.is_element())
                .map(|n| Item {
                    item_type: n.tag_name().name().to_string(),
                    include: n.attribute("Include").unwrap_or("").trim().to_string(),
                    condition: attribute(&n, "Condition"),
                    metadata: parse_metadata(&n),
                })
                .collect(),
        }
    }
}

impl ItemDefinitionGroup {
    fn parse(node: &roxmltree::Node) -> Self {
        Self {
            condition: attribute(node, "Condition"),
            label: attribute(node, "Label"),
            definitions: node
                .children()
                .filter(|n| n.is_element())
                .map(|n| ItemDefinition {
                    item_type: n.tag_name().name().to_string(),
                    metadata: parse_metadata(&n),
                })
                .collect(),
        }
    }
}

impl Choose {
    fn parse(node: &roxmltree::Node) -> Self {
        let mut choose = Self::default();
        for child in node.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "When" => choose.whens.push(ChooseBranch::parse(&child)),
                "Otherwise" => choose.otherwise = Some(ChooseBranch::parse(&child)),
                _ => {}
            }
        }
        choose
    }
}

impl ChooseBranch {
    fn parse(node: &roxmltree::Node) -> Self {
        let mut branch = Self {
            condition: attribute(node, "Condition"),
            ..Default::default()
        };
        for child in node.children().filter(|n| n.is_element()) {
            match child.tag_name().name() {
                "PropertyGroup" => branch.property_groups.push(PropertyGroup::parse(&child)),
                "ItemGroup" => branch.item_groups.push(ItemGroup::parse(&child)),
                "Choose" => branch.chooses.push(Choose::parse(&child)),
                _ => {}
            }
        }
        branch
    }
}

impl Import {
    fn parse(node: &roxmltree::Node) -> Self {
        Self {
            project: node.attribute("Project").unwrap_or("").to_string(),
            condition: attribute(node, "Condition"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
