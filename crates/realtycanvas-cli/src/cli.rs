use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use realtycanvas_core::{ExportFormat, MeasurementUnit, TemplateCategory};

#[derive(Debug, Parser)]
#[command(name = "realtycanvas", version)]
#[command(about = "Annotate real-estate photos with shapes, labels and measurements")]
pub struct Cli {
    /// Directory for settings, templates and projects (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Load a photo, apply a project and templates, and export the result
    Annotate(AnnotateArgs),
    /// List the template catalog
    Templates(TemplatesArgs),
    /// Print the keyboard shortcuts
    Shortcuts,
}

#[derive(Debug, Args)]
pub struct AnnotateArgs {
    /// Photo to annotate
    #[arg(long)]
    pub image: PathBuf,

    /// Template to apply (repeatable)
    #[arg(long = "template")]
    pub templates: Vec<String>,

    /// Offset added to every template element
    #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
    pub at: Option<Vec<f64>>,

    /// Saved project JSON to apply before the templates
    #[arg(long)]
    pub project: Option<PathBuf>,

    /// Measurement calibration in pixels per foot
    #[arg(long)]
    pub ppf: Option<f64>,

    /// Unit for measurement labels
    #[arg(long, value_enum)]
    pub unit: Option<UnitArg>,

    /// TrueType/OpenType font used for labels
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Output format (defaults to the settings)
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Encoder quality between 0 and 1 (defaults to the settings)
    #[arg(long)]
    pub quality: Option<f64>,

    /// Output file (defaults to a timestamped name in the current directory)
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Also store the annotated project as the saved project
    #[arg(long)]
    pub save_project: bool,
}

#[derive(Debug, Args)]
pub struct TemplatesArgs {
    /// Only this category
    #[arg(long, value_parser = parse_category)]
    pub category: Option<TemplateCategory>,

    /// Case-insensitive search in names and descriptions
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnitArg {
    Feet,
    Meters,
    Yards,
}

impl From<UnitArg> for MeasurementUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Feet => MeasurementUnit::Feet,
            UnitArg::Meters => MeasurementUnit::Meters,
            UnitArg::Yards => MeasurementUnit::Yards,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Png,
    #[value(alias = "jpeg")]
    Jpg,
    Webp,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Png => ExportFormat::Png,
            FormatArg::Jpg => ExportFormat::Jpg,
            FormatArg::Webp => ExportFormat::Webp,
        }
    }
}

/// Category names as stored in template files (`property-lines`, `features`, ...).
fn parse_category(name: &str) -> Result<TemplateCategory, String> {
    TemplateCategory::parse(name).ok_or_else(|| {
        let names: Vec<&str> = TemplateCategory::ALL.iter().map(|c| c.name()).collect();
        format!("unknown category '{}', expected one of: {}", name, names.join(", "))
    })
}
