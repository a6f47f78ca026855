//! Headless application controller: folder browsing, one edit session at a
//! time, background listing and saving.

use std::path::{Path, PathBuf};

use crate::browser::{self, BrowseError, BrowseResult, FolderBrowser, SystemTrash, TrashBackend};
use crate::config::AppConfig;
use crate::editor::{EditSession, Typeface};
use crate::error::{AppError, AppResult};
use crate::filters::ImageFilterCatalog;
use crate::notification;
use crate::state::{AppEvent, AppState, StateMachine};
use crate::storage::{self, SaveFormat, SaveMode, SaveTracker, StorageError, StorageResult};

mod worker;

pub use worker::{WorkerPoll, WorkerTask};

/// Work finished off the interaction thread, as published by
/// [`App::poll_background`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackgroundEvent {
    FolderOpened { dir: PathBuf, count: usize },
    Saved { path: PathBuf },
    Failed { message: String },
}

type ListingTask = WorkerTask<BrowseResult<Vec<PathBuf>>>;
type SaveTask = WorkerTask<StorageResult<PathBuf>>;

pub struct App {
    machine: StateMachine,
    config: AppConfig,
    catalog: ImageFilterCatalog,
    trash: Box<dyn TrashBackend>,
    saves: SaveTracker,
    browser: Option<FolderBrowser>,
    session: Option<EditSession>,
    listing: Option<(PathBuf, ListingTask)>,
    pending_save: Option<SaveTask>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        Self::with_trash(config, Box::new(SystemTrash))
    }

    pub fn with_trash(config: AppConfig, trash: Box<dyn TrashBackend>) -> Self {
        Self {
            machine: StateMachine::new(),
            config,
            catalog: ImageFilterCatalog::default(),
            trash,
            saves: SaveTracker::new(),
            browser: None,
            session: None,
            listing: None,
            pending_save: None,
        }
    }

    /// Shares in-flight save bookkeeping with another controller.
    pub fn with_save_tracker(mut self, saves: SaveTracker) -> Self {
        self.saves = saves;
        self
    }

    pub fn state(&self) -> AppState {
        self.machine.state()
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ImageFilterCatalog {
        &self.catalog
    }

    pub fn browser(&self) -> Option<&FolderBrowser> {
        self.browser.as_ref()
    }

    pub fn browser_mut(&mut self) -> Option<&mut FolderBrowser> {
        self.browser.as_mut()
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut EditSession> {
        self.session.as_mut()
    }

    pub fn is_busy(&self) -> bool {
        self.listing.is_some() || self.pending_save.is_some()
    }

    pub fn open_folder(&mut self, dir: &Path) -> AppResult<usize> {
        self.machine.check(AppEvent::OpenFolder)?;
        let browser = FolderBrowser::open(dir)?;
        let count = browser.len();
        self.browser = Some(browser);
        self.machine.transition(AppEvent::OpenFolder)?;
        Ok(count)
    }

    /// Lists `dir` on a worker; the browser is replaced once
    /// [`App::poll_background`] sees the result.
    pub fn open_folder_in_background(&mut self, dir: &Path) -> AppResult<()> {
        self.machine.check(AppEvent::OpenFolder)?;
        let owned = dir.to_path_buf();
        let task = WorkerTask::spawn("folder listing", move || browser::list_images(&owned));
        self.listing = Some((dir.to_path_buf(), task));
        Ok(())
    }

    /// Opens the folder containing `file` with `file` selected.
    pub fn open_file(&mut self, file: &Path) -> AppResult<()> {
        let dir = match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        self.open_folder(&dir)?;
        let browser = self.browser.as_mut().ok_or(BrowseError::NoSelection)?;
        let wanted = dir.join(file.file_name().unwrap_or_default());
        browser.select_path(&wanted).ok_or(BrowseError::NoSelection)?;
        Ok(())
    }

    pub fn poll_background(&mut self) -> Vec<BackgroundEvent> {
        let mut events = Vec::new();

        if let Some((dir, task)) = self.listing.take() {
            match task.poll() {
                WorkerPoll::Pending => self.listing = Some((dir, task)),
                WorkerPoll::Ready(result) => events.push(self.finish_listing(dir, result)),
                WorkerPoll::Lost => events.push(self.fail(format!("listing {} was interrupted", dir.display()))),
            }
        }

        if let Some(task) = self.pending_save.take() {
            match task.poll() {
                WorkerPoll::Pending => self.pending_save = Some(task),
                WorkerPoll::Ready(result) => events.push(self.finish_save(result)),
                WorkerPoll::Lost => events.push(self.finish_save(Err(save_worker_lost()))),
            }
        }

        events
    }

    pub fn begin_edit(&mut self) -> AppResult<&mut EditSession> {
        self.machine.check(AppEvent::OpenEditor)?;
        let browser = self.browser.as_ref().ok_or(BrowseError::NoSelection)?;
        let path = browser.current().ok_or(BrowseError::NoSelection)?.to_path_buf();
        if self.saves.is_in_flight(&path) {
            return Err(StorageError::SaveInFlight { path }.into());
        }

        let image = browser.open_current()?;
        let typeface = Typeface::load(self.config.text_family, self.config.font_path.as_deref());
        let session = EditSession::new(path, image, self.config.viewport(), typeface);
        self.machine.transition(AppEvent::OpenEditor)?;
        Ok(self.session.insert(session))
    }

    pub fn open_crop(&mut self) -> AppResult<()> {
        self.machine.check(AppEvent::OpenCrop)?;
        self.session.as_mut().ok_or(AppError::NoSession)?.open_crop();
        self.machine.transition(AppEvent::OpenCrop)?;
        Ok(())
    }

    pub fn apply_crop(&mut self) -> AppResult<(u32, u32)> {
        self.machine.check(AppEvent::ApplyCrop)?;
        let size = self.session.as_mut().ok_or(AppError::NoSession)?.apply_crop()?;
        self.machine.transition(AppEvent::ApplyCrop)?;
        Ok(size)
    }

    pub fn cancel_crop(&mut self) -> AppResult<()> {
        self.machine.check(AppEvent::CancelCrop)?;
        self.session.as_mut().ok_or(AppError::NoSession)?.cancel_crop();
        self.machine.transition(AppEvent::CancelCrop)?;
        Ok(())
    }

    /// Places `content` with the configured text style.
    pub fn place_text(&mut self, content: &str) -> AppResult<()> {
        let options = self.config.text_options();
        self.session
            .as_mut()
            .ok_or(AppError::NoSession)?
            .place_text(content, options);
        Ok(())
    }

    /// Drops the session and any pending crop or text without writing.
    pub fn cancel_edit(&mut self) -> AppResult<()> {
        self.machine.check(AppEvent::CancelEdit)?;
        if let Some(session) = self.session.take() {
            tracing::info!(path = %session.source_path().display(), "edit cancelled");
        }
        self.machine.transition(AppEvent::CancelEdit)?;
        Ok(())
    }

    pub fn save(&mut self) -> AppResult<PathBuf> {
        self.save_as(self.config.save_mode, self.config.save_format)
    }

    /// Bakes the session and writes it on a worker. Returns the target path;
    /// completion is published by [`App::poll_background`].
    pub fn save_as(&mut self, mode: SaveMode, format: SaveFormat) -> AppResult<PathBuf> {
        self.machine.check(AppEvent::Save)?;
        let source = self
            .session
            .as_ref()
            .ok_or(AppError::NoSession)?
            .source_path()
            .to_path_buf();
        let target = storage::target_path(&source, mode, format);
        for path in [&source, &target] {
            if self.saves.is_in_flight(path) {
                return Err(StorageError::SaveInFlight { path: path.clone() }.into());
            }
        }

        let session = self.session.take().ok_or(AppError::NoSession)?;
        let request = session.into_save_request(&self.catalog, mode, format, self.config.jpeg_quality());
        let guard = self.saves.try_begin(&request)?;
        self.pending_save = Some(WorkerTask::spawn("image save", move || {
            let _guard = guard;
            request.execute()
        }));
        self.machine.transition(AppEvent::Save)?;
        Ok(target)
    }

    /// Saves and waits for the write to land.
    pub fn save_blocking(&mut self, mode: SaveMode, format: SaveFormat) -> AppResult<PathBuf> {
        self.save_as(mode, format)?;
        let result = self
            .pending_save
            .take()
            .and_then(WorkerTask::wait)
            .unwrap_or_else(|| Err(save_worker_lost()));
        self.complete_save(result).map_err(AppError::from)
    }

    /// Moves the selected file to the trash. Not allowed while it is open or
    /// being saved.
    pub fn trash_current(&mut self) -> AppResult<PathBuf> {
        if self.state().has_session() {
            return Err(AppError::SessionOpen);
        }
        let browser = self.browser.as_mut().ok_or(BrowseError::NoSelection)?;
        if let Some(path) = browser.current().filter(|path| self.saves.is_in_flight(path)) {
            return Err(StorageError::SaveInFlight {
                path: path.to_path_buf(),
            }
            .into());
        }
        match browser.trash_current(self.trash.as_ref()) {
            Ok(path) => Ok(path),
            Err(err) => {
                self.report(&err.to_string());
                Err(err.into())
            }
        }
    }

    /// Surfaces a failure to the user.
    pub fn report(&self, message: &str) {
        if self.config.notifications {
            notification::send(message);
        } else {
            tracing::warn!(message, "operation failed");
        }
    }

    fn finish_listing(&mut self, dir: PathBuf, result: BrowseResult<Vec<PathBuf>>) -> BackgroundEvent {
        let entries = match result {
            Ok(entries) => entries,
            Err(err) => return self.fail(err.to_string()),
        };
        if let Err(err) = self.machine.transition(AppEvent::OpenFolder) {
            return self.fail(err.to_string());
        }
        let count = entries.len();
        self.browser = Some(FolderBrowser::from_entries(dir.clone(), entries));
        BackgroundEvent::FolderOpened { dir, count }
    }

    fn finish_save(&mut self, result: StorageResult<PathBuf>) -> BackgroundEvent {
        match self.complete_save(result) {
            Ok(path) => BackgroundEvent::Saved { path },
            Err(err) => BackgroundEvent::Failed {
                message: err.to_string(),
            },
        }
    }

    fn complete_save(&mut self, result: StorageResult<PathBuf>) -> StorageResult<PathBuf> {
        if let Err(err) = self.machine.transition(AppEvent::SaveFinished) {
            tracing::warn!(%err, "save finished outside of saving state");
        }
        match result {
            Ok(path) => {
                self.refresh_listing_with(&path);
                Ok(path)
            }
            Err(err) => {
                self.report(&err.to_string());
                Err(err)
            }
        }
    }

    fn fail(&self, message: String) -> BackgroundEvent {
        self.report(&message);
        BackgroundEvent::Failed { message }
    }

    /// Re-lists the open folder so a newly written file shows up selected.
    fn refresh_listing_with(&mut self, saved: &Path) {
        let Some(dir) = self.browser.as_ref().map(|browser| browser.dir().to_path_buf()) else {
            return;
        };
        if saved.parent() != Some(dir.as_path()) {
            return;
        }
        match FolderBrowser::open(&dir) {
            Ok(mut refreshed) => {
                refreshed.select_path(saved);
                self.browser = Some(refreshed);
            }
            Err(err) => tracing::warn!(%err, "failed to refresh listing after save"),
        }
    }
}

fn save_worker_lost() -> StorageError {
    StorageError::WriteFailed {
        path: PathBuf::new(),
        source: std::io::Error::other("save worker exited without a result"),
    }
}
