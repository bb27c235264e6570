//! Keyboard bindings.

use crate::page::{ScrollBehavior, ScrollTarget};
use crate::protocol::ClientCommand;

pub const DEFAULT_SCROLL_STEP: i64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyChordState {
    #[default]
    Idle,
    /// A single `g` has been seen.
    PendingG,
}

impl KeyChordState {
    /// Returns the next state and whether the `g g` chord fired.
    pub fn next(self, key: char) -> (Self, bool) {
        match (self, key) {
            (KeyChordState::Idle, 'g') => (KeyChordState::PendingG, false),
            (KeyChordState::PendingG, 'g') => (KeyChordState::Idle, true),
            (_, _) => (KeyChordState::Idle, false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Send(ClientCommand),
    ScrollBy(i64, ScrollBehavior),
    ScrollTo(ScrollTarget, ScrollBehavior),
}

#[derive(Debug)]
pub struct CommandDispatcher {
    chord: KeyChordState,
    scroll_step: i64,
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLL_STEP)
    }
}

impl CommandDispatcher {
    pub fn new(scroll_step: i64) -> Self {
        Self {
            chord: KeyChordState::Idle,
            scroll_step,
        }
    }

    pub fn chord(&self) -> KeyChordState {
        self.chord
    }

    /// Map one key press to its actions, in the order they must run.
    pub fn dispatch(&mut self, key: char) -> Vec<Action> {
        let (chord, fired) = self.chord.next(key);
        self.chord = chord;
        if fired {
            return vec![Action::ScrollTo(ScrollTarget::Top, ScrollBehavior::Smooth)];
        }

        match key {
            'c' => vec![Action::Send(ClientCommand::ChangeCssNext)],
            'C' => vec![Action::Send(ClientCommand::ChangeCssPrev)],
            'e' => vec![Action::Send(ClientCommand::ExportHtml)],
            'r' => vec![
                Action::Send(ClientCommand::RedirectDefault),
                Action::ScrollTo(ScrollTarget::Top, ScrollBehavior::Instant),
            ],
            'j' => vec![Action::ScrollBy(self.scroll_step, ScrollBehavior::Smooth)],
            'k' => vec![Action::ScrollBy(
                self.scroll_step.saturating_neg(),
                ScrollBehavior::Smooth,
            )],
            'G' => vec![Action::ScrollTo(ScrollTarget::Bottom, ScrollBehavior::Smooth)],
            _ => Vec::new(),
        }
    }
}
