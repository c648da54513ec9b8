//! Build metadata from Visual Studio solutions and project files.
//!
//! For every project of a solution (or a single project file) a
//! [`ProjectSection`] records where the build output and its XML
//! documentation file are, which framework it targets, the assemblies it
//! references and, as child sections, the projects it references.
//!
//! ```no_run
//! use project_sections::factory;
//!
//! let sections = factory::create_sections("Suite.sln", "Any CPU", "Release", Vec::<String>::new())?;
//! for section in &sections {
//!     println!("{} -> {:?}", section.project_name, section.output_file);
//! }
//! # Ok::<(), project_sections::ProjectError>(())
//! ```

pub mod condition;
pub mod context;
pub mod error;
pub mod factory;
pub mod info;
pub mod known;
pub mod macros;
pub mod msbuild;
mod msbuild_section;
pub mod paths;
pub mod section;
pub mod solution;
pub mod standard;
pub mod suo;
pub mod vc;
pub mod vcproj;
pub mod vcx;
pub mod vsvars;

pub use context::{ProjectSectionContext, ProjectSectionContextBuilder};
pub use error::{ProjectError, Result};
pub use factory::{create_section, create_sections, create_sections_in};
pub use info::ProjectInfo;
pub use known::is_known_assembly_name;
pub use section::{ProjectKind, ProjectSection, StandardProjectType};
