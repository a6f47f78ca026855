use super::error::{StateError, StateResult};
use super::{event::StateTransition, AppEvent, AppState};

#[derive(Debug)]
pub struct StateMachine {
    state: AppState,
    transition_history: Vec<StateTransition>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: AppState::default(),
            transition_history: Vec::new(),
        }
    }

    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.transition_history
    }

    pub fn can_transition(&self, event: AppEvent) -> bool {
        self.next_state(event).is_some()
    }

    pub fn next_state(&self, event: AppEvent) -> Option<AppState> {
        use AppEvent::*;
        match (self.state, event) {
            (AppState::Idle | AppState::Browsing, OpenFolder) => Some(AppState::Browsing),
            (AppState::Browsing, OpenEditor) => Some(AppState::Editing),
            (AppState::Editing, OpenCrop) => Some(AppState::Cropping),
            (AppState::Cropping, ApplyCrop | CancelCrop) => Some(AppState::Editing),
            (AppState::Editing | AppState::Cropping, CancelEdit) => Some(AppState::Browsing),
            (AppState::Editing, Save) => Some(AppState::Saving),
            (AppState::Saving, SaveFinished) => Some(AppState::Browsing),
            _ => None,
        }
    }

    /// Target state for `event`, without applying it.
    pub fn check(&self, event: AppEvent) -> StateResult<AppState> {
        self.next_state(event).ok_or_else(|| {
            let from = self.state;
            tracing::warn!(from = ?from, event = ?event, "invalid state transition requested");
            StateError::InvalidStateTransition { from, event }
        })
    }

    pub fn transition(&mut self, event: AppEvent) -> StateResult<AppState> {
        tracing::debug!(from = ?self.state, event = ?event, "request state transition");
        let next = self.check(event)?;

        let record = StateTransition::new(Some(self.state), event, next);
        tracing::info!(from = ?self.state, to = ?next, ?event, "state transition");
        self.state = next;
        self.transition_history.push(record);

        Ok(self.state)
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AppState::{:?}", self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_transition_tracks_valid_and_invalid_events() {
        let mut machine = StateMachine::new();
        assert!(machine.can_transition(AppEvent::OpenFolder));
        assert!(!machine.can_transition(AppEvent::OpenEditor));
        assert!(!machine.can_transition(AppEvent::Save));

        let _ = machine
            .transition(AppEvent::OpenFolder)
            .expect("idle -> browsing should transition");

        assert!(machine.can_transition(AppEvent::OpenEditor));
        assert!(machine.can_transition(AppEvent::OpenFolder));
        assert!(!machine.can_transition(AppEvent::ApplyCrop));
    }

    #[test]
    fn edit_cycle_records_history_with_ordered_entries() {
        let mut machine = StateMachine::new();
        for event in [
            AppEvent::OpenFolder,
            AppEvent::OpenEditor,
            AppEvent::OpenCrop,
            AppEvent::ApplyCrop,
            AppEvent::Save,
            AppEvent::SaveFinished,
        ] {
            let _ = machine
                .transition(event)
                .unwrap_or_else(|err| panic!("{event:?} should be valid: {err}"));
        }

        assert_eq!(machine.state(), AppState::Browsing);
        assert_eq!(machine.history().len(), 6);
        assert_eq!(
            machine.history()[0],
            StateTransition::new(Some(AppState::Idle), AppEvent::OpenFolder, AppState::Browsing)
        );
        assert_eq!(
            machine.history()[2],
            StateTransition::new(
                Some(AppState::Editing),
                AppEvent::OpenCrop,
                AppState::Cropping
            )
        );
        assert_eq!(
            machine.history()[4],
            StateTransition::new(Some(AppState::Editing), AppEvent::Save, AppState::Saving)
        );
    }

    #[test]
    fn cancel_from_crop_discards_back_to_browsing() {
        let mut machine = StateMachine::new();
        for event in [AppEvent::OpenFolder, AppEvent::OpenEditor, AppEvent::OpenCrop] {
            let _ = machine.transition(event).expect("setup transition");
        }
        assert_eq!(
            machine.transition(AppEvent::CancelEdit).expect("cancel edit"),
            AppState::Browsing
        );
        assert!(!machine.state().has_session());
    }

    #[test]
    fn saving_blocks_new_edits_until_finished() {
        let mut machine = StateMachine::new();
        for event in [AppEvent::OpenFolder, AppEvent::OpenEditor, AppEvent::Save] {
            let _ = machine.transition(event).expect("setup transition");
        }
        assert!(!machine.can_transition(AppEvent::OpenEditor));
        assert!(!machine.can_transition(AppEvent::CancelEdit));
        assert!(machine.can_transition(AppEvent::SaveFinished));
    }

    #[test]
    fn invalid_transition_returns_error_without_mutating_history() {
        let mut machine = StateMachine::new();

        let err = machine
            .transition(AppEvent::ApplyCrop)
            .expect_err("idle -> apply crop should fail");
        assert!(matches!(
            err,
            StateError::InvalidStateTransition {
                from: AppState::Idle,
                event: AppEvent::ApplyCrop
            }
        ));
        assert_eq!(machine.state(), AppState::Idle);
        assert!(machine.history().is_empty());
    }
}
