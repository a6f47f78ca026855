//! Headless front end: list a folder, run one edit, or trash a file.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::app::App;
use crate::browser;
use crate::config::{load_app_config, AppConfig};
use crate::error::AppError;
use crate::filters::FilterSelection;
use crate::geometry::{Point, RasterBounds};
use crate::storage::{SaveFormat, SaveMode};

/// Browse a folder of images and apply quick edits.
#[derive(Parser, Debug)]
#[command(name = "folio", version, about)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the supported images in DIR in browsing order.
    List { dir: PathBuf },
    /// Print the available filter names.
    Filters,
    /// Edit one image and save the result.
    Edit(EditArgs),
    /// Move FILE to the desktop trash.
    Trash { file: PathBuf },
}

#[derive(Args, Debug)]
pub struct EditArgs {
    pub file: PathBuf,

    /// Filter to apply (see `folio filters`).
    #[arg(long, value_parser = parse_filter)]
    pub filter: Option<FilterSelection>,

    /// Crop rect in image pixels from the top-left corner.
    #[arg(long, value_name = "X,Y,W,H", value_parser = parse_crop)]
    pub crop: Option<RasterBounds>,

    /// Overlay text, centered on the image. `\n` starts a new line.
    #[arg(long)]
    pub text: Option<String>,

    /// Drag the text by this many display units from the center.
    #[arg(long, value_name = "DX,DY", value_parser = parse_offset, allow_hyphen_values = true)]
    pub text_offset: Option<Point>,

    /// Output format: png, jpeg or webp. Defaults to the configured format.
    #[arg(long)]
    pub format: Option<SaveFormat>,

    /// `replace` keeps the basename, `new` writes `<name>-edited.<ext>`.
    #[arg(long)]
    pub mode: Option<SaveMode>,
}

pub fn run(args: CliArgs) -> ExitCode {
    match execute(args.command, load_app_config()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

pub fn execute(command: Command, config: AppConfig) -> Result<()> {
    match command {
        Command::List { dir } => {
            let images = browser::list_images(&dir)
                .with_context(|| format!("could not list {}", dir.display()))?;
            for image in images {
                println!("{}", image.display());
            }
        }
        Command::Filters => {
            for filter in FilterSelection::ALL {
                println!("{:<8} {}", filter.catalog_name().unwrap_or("none"), filter.label());
            }
        }
        Command::Edit(args) => {
            let saved = edit(App::new(config), args)?;
            println!("{}", saved.display());
        }
        Command::Trash { file } => {
            let mut app = App::new(config);
            open_file(&mut app, &file)?;
            let trashed = app
                .trash_current()
                .with_context(|| format!("could not trash {}", file.display()))?;
            println!("{}", trashed.display());
        }
    }
    Ok(())
}

pub fn edit(mut app: App, args: EditArgs) -> Result<PathBuf> {
    open_file(&mut app, &args.file)?;
    let session = app
        .begin_edit()
        .with_context(|| format!("could not open {}", args.file.display()))?;
    if let Some(filter) = args.filter {
        session.select_filter(filter);
    }

    if let Some(bounds) = args.crop {
        app.open_crop()?;
        app.session_mut()
            .ok_or(AppError::NoSession)?
            .set_crop_bounds(bounds)
            .context("invalid --crop")?;
        app.apply_crop()?;
    }

    if let Some(text) = &args.text {
        app.place_text(&text.replace("\\n", "\n"))?;
        if let Some(offset) = args.text_offset {
            let session = app.session_mut().ok_or(AppError::NoSession)?;
            session.text_begin_drag()?;
            session.text_drag(offset)?;
            session.text_end_drag()?;
        }
    }

    let mode = args.mode.unwrap_or(app.config().save_mode);
    let format = args.format.unwrap_or(app.config().save_format);
    let saved = app
        .save_blocking(mode, format)
        .with_context(|| format!("could not save {}", args.file.display()))?;
    Ok(saved)
}

fn open_file(app: &mut App, file: &Path) -> Result<()> {
    app.open_file(file)
        .with_context(|| format!("{} is not a supported image in its folder", file.display()))
}

fn parse_filter(value: &str) -> std::result::Result<FilterSelection, String> {
    FilterSelection::from_name(value).ok_or_else(|| format!("unknown filter `{value}`"))
}

fn parse_numbers<const N: usize>(value: &str) -> std::result::Result<[f64; N], String> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|err| format!("`{value}`: {err}"))?;
    <[f64; N]>::try_from(parts).map_err(|_| format!("`{value}`: expected {N} comma-separated numbers"))
}

fn parse_crop(value: &str) -> std::result::Result<RasterBounds, String> {
    let [x, y, width, height] = parse_numbers::<4>(value)?;
    if [x, y, width, height].iter().any(|part| *part < 0.0 || part.fract() != 0.0) {
        return Err(format!("`{value}`: crop values must be whole non-negative pixels"));
    }
    Ok(RasterBounds::new(x as u32, y as u32, width as u32, height as u32))
}

fn parse_offset(value: &str) -> std::result::Result<Point, String> {
    let [dx, dy] = parse_numbers::<2>(value)?;
    if !(dx.is_finite() && dy.is_finite()) {
        return Err(format!("`{value}`: offset must be finite"));
    }
    Ok(Point::new(dx, dy))
}
