//! RealtyCanvas command line entry point.

mod cli;

use clap::Parser;
use kurbo::Vec2;
use realtycanvas_core::canvas::Canvas;
use realtycanvas_core::files::{self, ImportError};
use realtycanvas_core::storage::{self, FileStorage, ProjectData, Storage, StorageError};
use realtycanvas_core::templates::{self, TemplateError};
use realtycanvas_core::{ExportFormat, ShortcutRegistry};
use realtycanvas_render::{RendererError, Session, load_font};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

use crate::cli::{AnnotateArgs, Cli, CliCommand, TemplatesArgs};

#[derive(Debug, Error)]
enum CliError {
    #[error("Cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Image import failed: {0}")]
    Import(#[from] ImportError),
    #[error("Render failed: {0}")]
    Render(#[from] RendererError),
    #[error("Storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
    #[error("Invalid project file: {0}")]
    Project(#[from] serde_json::Error),
}

type CliResult<T> = Result<T, CliError>;

fn read_file(path: &Path) -> CliResult<Vec<u8>> {
    std::fs::read(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn open_storage(data_dir: Option<PathBuf>) -> CliResult<FileStorage> {
    let storage = match data_dir {
        Some(dir) => FileStorage::new(dir)?,
        None => FileStorage::default_location()?,
    };
    log::debug!("Using data directory {}", storage.base_path().display());
    Ok(storage)
}

/// Load the photo, apply project, calibration and templates, then export.
/// Returns the path written.
fn annotate(storage: &dyn Storage, args: AnnotateArgs) -> CliResult<PathBuf> {
    let mut settings = pollster::block_on(storage::load_settings(storage));

    let bytes = read_file(&args.image)?;
    let name = args.image.to_string_lossy();
    let mime = files::mime_from_filename(&name).unwrap_or("application/octet-stream");
    files::validate_image_file(mime, bytes.len() as u64)?;

    let mut canvas = Canvas::new(settings.clone());
    canvas.import_image(mime, &bytes)?;

    if let Some(path) = &args.project {
        let data: ProjectData = serde_json::from_slice(&read_file(path)?)?;
        for ticket in canvas.apply_project(&data) {
            match ticket.decode() {
                Ok(image) => {
                    canvas.resolve_logo(&ticket, image);
                }
                Err(e) => log::warn!("Logo {} could not be decoded: {}", ticket.logo_id, e),
            }
        }
    }

    if let Some(ppf) = args.ppf {
        canvas.set_pixels_per_foot(ppf);
    }
    if let Some(unit) = args.unit {
        canvas.set_unit(unit.into());
    }

    if !args.templates.is_empty() {
        let mut catalog = pollster::block_on(templates::load_catalog(storage));
        let origin = match args.at.as_deref() {
            Some([x, y]) => Vec2::new(*x, *y),
            _ => Vec2::ZERO,
        };
        for id in &args.templates {
            let template = catalog.require(id)?.clone();
            let added = templates::instantiate(&template, &mut canvas, origin);
            log::debug!("Template '{}' added {} elements", id, added.len());
            catalog.use_template(id);
        }
        pollster::block_on(templates::save_catalog(storage, &catalog))?;
    }

    let font = match &args.font {
        Some(path) => Some(load_font(read_file(path)?)?),
        None => None,
    };
    let mut session = Session::with_font(canvas, font);

    let format: ExportFormat = args.format.map(Into::into).unwrap_or(settings.default_export_format);
    let quality = args.quality.unwrap_or(settings.export_quality).clamp(0.0, 1.0);
    let exported = session.export(format, quality)?;

    let out = args
        .out
        .unwrap_or_else(|| PathBuf::from(files::generate_filename("realtycanvas-export", format.extension())));
    std::fs::write(&out, &exported.bytes).map_err(|source| CliError::Io {
        path: out.clone(),
        source,
    })?;
    log::info!("Wrote {}", out.display());

    let filename = out
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| out.display().to_string());
    settings.add_export_record(exported.record(filename));
    pollster::block_on(storage::save_settings(storage, &settings))?;

    if args.save_project {
        pollster::block_on(storage::save_project(storage, &session.canvas().project_state()))?;
    }

    Ok(out)
}

fn list_templates(storage: &dyn Storage, args: &TemplatesArgs) -> Vec<String> {
    let catalog = pollster::block_on(templates::load_catalog(storage));
    catalog
        .templates(args.category, args.search.as_deref())
        .into_iter()
        .map(|t| {
            format!(
                "{:<28} {:<15} {:>3} uses  {}",
                t.id,
                t.category.name(),
                t.use_count,
                t.name
            )
        })
        .collect()
}

fn list_shortcuts() -> Vec<String> {
    ShortcutRegistry::all()
        .iter()
        .map(|s| format!("{:<10} {}", s.format(), s.description))
        .collect()
}

fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        CliCommand::Annotate(args) => {
            let storage = open_storage(cli.data_dir)?;
            let out = annotate(&storage, args)?;
            println!("{}", out.display());
        }
        CliCommand::Templates(args) => {
            let storage = open_storage(cli.data_dir)?;
            for line in list_templates(&storage, &args) {
                println!("{line}");
            }
        }
        CliCommand::Shortcuts => {
            for line in list_shortcuts() {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    log::info!("Starting RealtyCanvas");

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
