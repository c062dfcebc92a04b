//! Local selection of the participant targeted by the next command.

use shared::domain::Participant;

/// Pure UI intent. Nothing here is validated against the projection;
/// a selected participant may have left by the time a command goes out,
/// which the dispatcher detects at dispatch time.
#[derive(Debug, Default)]
pub struct SelectionTracker {
    selected: Option<Participant>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, participant: Participant) {
        self.selected = Some(participant);
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&Participant> {
        self.selected.as_ref()
    }
}
