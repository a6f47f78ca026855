//! Folder listing, navigation and soft deletion.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use thiserror::Error;

pub const SUPPORTED_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "heic", "tiff", "bmp", "webp"];

#[derive(Debug, Error)]
pub enum BrowseError {
    #[error("failed to read directory {path}: {source}")]
    DirectoryReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to move {path} to trash: {message}")]
    TrashFailed { path: PathBuf, message: String },
    #[error("failed to decode {path}: {message}")]
    ImageDecodeFailed { path: PathBuf, message: String },
    #[error("no image is selected")]
    NoSelection,
}

pub type BrowseResult<T> = std::result::Result<T, BrowseError>;

pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
}

/// Regular files in `dir` with a supported extension, sorted by file name.
pub fn list_images(dir: &Path) -> BrowseResult<Vec<PathBuf>> {
    let read_failed = |source: io::Error| BrowseError::DirectoryReadFailed {
        path: dir.to_path_buf(),
        source,
    };

    let mut images = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_failed)? {
        let entry = entry.map_err(read_failed)?;
        let path = entry.path();
        if path.is_file() && is_supported_image(&path) {
            images.push(path);
        }
    }
    images.sort_by(|left, right| left.file_name().cmp(&right.file_name()));

    tracing::debug!(dir = %dir.display(), count = images.len(), "listed images");
    Ok(images)
}

pub fn load_image(path: &Path) -> BrowseResult<RgbaImage> {
    let image = image::open(path).map_err(|err| BrowseError::ImageDecodeFailed {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    Ok(image.to_rgba8())
}

pub trait TrashBackend {
    fn trash(&self, path: &Path) -> BrowseResult<()>;
}

/// Desktop trash through the `trash` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTrash;

impl TrashBackend for SystemTrash {
    fn trash(&self, path: &Path) -> BrowseResult<()> {
        trash::delete(path).map_err(|err| BrowseError::TrashFailed {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }
}

/// Sorted listing of one folder with a clamped selection cursor.
#[derive(Debug, Clone, Default)]
pub struct FolderBrowser {
    dir: PathBuf,
    entries: Vec<PathBuf>,
    selected: Option<usize>,
}

impl FolderBrowser {
    pub fn open(dir: &Path) -> BrowseResult<Self> {
        let entries = list_images(dir)?;
        Ok(Self::from_entries(dir.to_path_buf(), entries))
    }

    pub fn from_entries(dir: PathBuf, entries: Vec<PathBuf>) -> Self {
        let selected = (!entries.is_empty()).then_some(0);
        tracing::info!(dir = %dir.display(), count = entries.len(), "folder opened");
        Self {
            dir,
            entries,
            selected,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn current(&self) -> Option<&Path> {
        self.selected
            .and_then(|index| self.entries.get(index))
            .map(PathBuf::as_path)
    }

    pub fn next(&mut self) -> Option<&Path> {
        if let Some(index) = self.selected {
            self.selected = Some((index + 1).min(self.entries.len().saturating_sub(1)));
        }
        self.current()
    }

    pub fn previous(&mut self) -> Option<&Path> {
        if let Some(index) = self.selected {
            self.selected = Some(index.saturating_sub(1));
        }
        self.current()
    }

    pub fn first(&mut self) -> Option<&Path> {
        self.select(0)
    }

    pub fn last(&mut self) -> Option<&Path> {
        self.select(self.entries.len().saturating_sub(1))
    }

    /// Selects `index`, clamped to the listing.
    pub fn select(&mut self, index: usize) -> Option<&Path> {
        if !self.entries.is_empty() {
            self.selected = Some(index.min(self.entries.len() - 1));
        }
        self.current()
    }

    pub fn select_path(&mut self, path: &Path) -> Option<&Path> {
        let index = self.entries.iter().position(|entry| entry == path)?;
        self.select(index)
    }

    pub fn open_current(&self) -> BrowseResult<RgbaImage> {
        let path = self.current().ok_or(BrowseError::NoSelection)?;
        load_image(path)
    }

    /// Moves the selected file to the trash and drops it from the listing.
    /// The selection stays on the following entry, or the new last one.
    pub fn trash_current(&mut self, backend: &dyn TrashBackend) -> BrowseResult<PathBuf> {
        let index = self.selected.ok_or(BrowseError::NoSelection)?;
        let path = self.entries.get(index).cloned().ok_or(BrowseError::NoSelection)?;
        backend.trash(&path)?;

        self.entries.remove(index);
        self.selected = if self.entries.is_empty() {
            None
        } else {
            Some(index.min(self.entries.len() - 1))
        };
        tracing::info!(path = %path.display(), remaining = self.entries.len(), "moved to trash");
        Ok(path)
    }
}
