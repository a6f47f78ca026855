#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppState {
    #[default]
    Idle,
    Browsing,
    Editing,
    Cropping,
    Saving,
}

impl AppState {
    /// States in which an edit session is alive.
    pub const fn has_session(self) -> bool {
        matches!(self, Self::Editing | Self::Cropping | Self::Saving)
    }
}
