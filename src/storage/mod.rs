use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage, RgbaImage};
use serde::Deserialize;
use thiserror::Error;

const EDITED_SUFFIX: &str = "-edited";
const TEMP_SUFFIX: &str = ".folio-tmp";
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cannot encode image as {format}: {message}")]
    EncodeFailed { format: SaveFormat, message: String },
    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("a save to {path} is already in progress")]
    SaveInFlight { path: PathBuf },
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveFormat {
    #[default]
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
    Webp,
}

impl SaveFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

impl fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
        };
        f.write_str(name)
    }
}

impl FromStr for SaveFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "webp" => Ok(Self::Webp),
            other => Err(format!("unknown save format `{other}` (expected png, jpeg or webp)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    /// Same basename as the original, extension of the chosen format.
    Replace,
    /// `<stem>-edited.<ext>` next to the original.
    #[default]
    CreateNew,
}

impl FromStr for SaveMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "new" | "create_new" | "create-new" => Ok(Self::CreateNew),
            other => Err(format!("unknown save mode `{other}` (expected replace or new)")),
        }
    }
}

/// Encodes `image` in memory. WebP is accepted as a format value but has no
/// encoder path, so it always fails.
pub fn encode(image: &RgbaImage, format: SaveFormat, jpeg_quality: u8) -> StorageResult<Vec<u8>> {
    let encode_failed = |message: String| StorageError::EncodeFailed { format, message };
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(encode_failed("image has no pixels".to_string()));
    }

    let mut bytes = Vec::new();
    match format {
        SaveFormat::Png => PngEncoder::new(&mut bytes)
            .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
            .map_err(|err| encode_failed(err.to_string()))?,
        SaveFormat::Jpeg => {
            let rgb: RgbImage = image.convert();
            JpegEncoder::new_with_quality(&mut bytes, jpeg_quality.clamp(1, 100))
                .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
                .map_err(|err| encode_failed(err.to_string()))?;
        }
        SaveFormat::Webp => {
            return Err(encode_failed("no webp encoder is available".to_string()));
        }
    }
    Ok(bytes)
}

pub fn target_path(original: &Path, mode: SaveMode, format: SaveFormat) -> PathBuf {
    let stem = original
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let name = match mode {
        SaveMode::Replace => format!("{stem}.{}", format.extension()),
        SaveMode::CreateNew => format!("{stem}{EDITED_SUFFIX}.{}", format.extension()),
    };
    original.with_file_name(name)
}

/// Writes through a hidden sibling file and renames it over `destination`.
pub fn write_atomic(destination: &Path, bytes: &[u8]) -> StorageResult<()> {
    let write_failed = |source: io::Error| StorageError::WriteFailed {
        path: destination.to_path_buf(),
        source,
    };
    let file_name = destination
        .file_name()
        .ok_or_else(|| write_failed(io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")))?;

    let mut temp_name = std::ffi::OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(TEMP_SUFFIX);
    let temp = destination.with_file_name(temp_name);

    if let Some(parent) = destination.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_failed)?;
    }

    if let Err(err) = fs::write(&temp, bytes).and_then(|()| fs::rename(&temp, destination)) {
        if let Err(cleanup) = fs::remove_file(&temp) {
            if cleanup.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %temp.display(), ?cleanup, "failed to remove temp save file");
            }
        }
        return Err(write_failed(err));
    }
    Ok(())
}

/// A baked image plus where and how to write it.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    image: RgbaImage,
    source: PathBuf,
    target: PathBuf,
    format: SaveFormat,
    jpeg_quality: u8,
}

impl SaveRequest {
    pub fn new(image: RgbaImage, source: PathBuf, mode: SaveMode, format: SaveFormat, jpeg_quality: u8) -> Self {
        let target = target_path(&source, mode, format);
        Self {
            image,
            source,
            target,
            format,
            jpeg_quality,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn format(&self) -> SaveFormat {
        self.format
    }

    /// Encodes first so an encoder failure never touches the disk.
    pub fn execute(&self) -> StorageResult<PathBuf> {
        let bytes = encode(&self.image, self.format, self.jpeg_quality)?;
        write_atomic(&self.target, &bytes)?;
        tracing::info!(
            target = %self.target.display(),
            format = %self.format,
            bytes = bytes.len(),
            "image saved"
        );
        Ok(self.target.clone())
    }
}

/// Paths with a save currently running, shared between the UI side and the
/// save worker.
#[derive(Debug, Clone, Default)]
pub struct SaveTracker {
    in_flight: Arc<Mutex<HashSet<PathBuf>>>,
}

impl SaveTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_in_flight(&self, path: &Path) -> bool {
        self.lock().contains(path)
    }

    /// Claims both the source and the target of `request`. The claim is
    /// released when the returned guard drops.
    pub fn try_begin(&self, request: &SaveRequest) -> StorageResult<SaveGuard> {
        let mut in_flight = self.lock();
        let mut paths = vec![request.source().to_path_buf()];
        if request.target() != request.source() {
            paths.push(request.target().to_path_buf());
        }
        if let Some(busy) = paths.iter().find(|path| in_flight.contains(*path)) {
            return Err(StorageError::SaveInFlight { path: busy.clone() });
        }
        in_flight.extend(paths.iter().cloned());
        Ok(SaveGuard {
            tracker: self.clone(),
            paths,
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Debug)]
pub struct SaveGuard {
    tracker: SaveTracker,
    paths: Vec<PathBuf>,
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        let mut in_flight = self.tracker.lock();
        for path in &self.paths {
            in_flight.remove(path);
        }
    }
}
