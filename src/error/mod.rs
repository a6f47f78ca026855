use crate::browser::BrowseError;
use crate::editor::EditorError;
use crate::state::StateError;
use crate::storage::StorageError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Browse(#[from] BrowseError),
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("no edit session is open")]
    NoSession,
    #[error("an edit session is open")]
    SessionOpen,
}
