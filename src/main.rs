use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use project_sections::{ProjectSection, ProjectSectionContext, factory};

#[derive(Parser)]
#[command(name = "projsect")]
#[command(about = "Show the build outputs, documentation files and references of Visual Studio projects")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Every project of a solution, using the configuration last active in Visual Studio
    projsect Suite.sln

    # A single project in Release|x64
    projsect Native\Native.vcxproj -c Release -p x64

    # Only two projects of a solution, as JSON
    projsect Suite.sln -t {6F2A4B8C-1D3E-4F50-8A9B-0C1D2E3F4A5B} -t {0A1B2C3D-4E5F-4061-8293-A4B5C6D7E8F9} --json
"#)]
struct Cli {
    /// Solution (.sln) or project file
    source: PathBuf,

    /// Platform, e.g. "Any CPU", Win32, x64
    #[arg(short, long, default_value = "")]
    platform: String,

    /// Configuration, e.g. Debug or Release
    #[arg(short, long, default_value = "")]
    configuration: String,

    /// GUID of a project to document; repeat for more. Defaults to all
    #[arg(short, long = "target")]
    targets: Vec<String>,

    /// vsvars32.bat whose SET lines extend the environment
    #[arg(long)]
    vsvars: Option<PathBuf>,

    /// Print JSON instead of a tree
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "project_sections=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let mut builder = ProjectSectionContext::builder().system_env();
    if let Some(vsvars) = &cli.vsvars {
        builder = builder
            .vsvars_file(vsvars)
            .with_context(|| format!("reading {}", vsvars.display()))?;
    }
    let mut ctx = builder
        .platform(&cli.platform)
        .configuration(&cli.configuration)
        .targets(&cli.targets)
        .build();

    let sections = factory::create_sections_in(&mut ctx, &cli.source)
        .with_context(|| format!("reading {}", cli.source.display()))?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&sections)?);
    } else if sections.is_empty() {
        println!("No projects found in {}", cli.source.display());
    } else {
        for section in &sections {
            print_section(section, 0);
        }
    }

    Ok(())
}

fn print_section(section: &Arc<ProjectSection>, depth: usize) {
    let indent = "  ".repeat(depth);
    let status = if section.is_complete { "" } else { " (incomplete)" };
    println!("{indent}{} {}{status}", section.project_name, section.project_guid);
    println!("{indent}  project:   {}", section.project_file.display());
    if !section.configuration.is_empty() || !section.platform.is_empty() {
        println!("{indent}  config:    {}|{}", section.configuration, section.platform);
    }
    if !section.target_framework_identifier.is_empty() {
        println!(
            "{indent}  framework: {} {}",
            section.target_framework_identifier, section.target_framework_version
        );
    }
    if let Some(output) = &section.output_file {
        println!("{indent}  output:    {}", output.display());
    }
    if let Some(comments) = &section.comment_file {
        println!("{indent}  comments:  {}", comments.display());
    }
    for assembly in &section.referenced_assemblies {
        println!("{indent}  reference: {}", assembly.display());
    }
    if !section.referenced_known_assemblies.is_empty() {
        println!("{indent}  framework references: {}", section.referenced_known_assemblies.join(", "));
    }
    for child in &section.children {
        print_section(child, depth + 1);
    }
}
