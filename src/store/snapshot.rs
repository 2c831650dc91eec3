/// Snapshot support for the store's optimistic-mutation protocol
///
/// Every mutating store action follows the same discipline: capture the
/// affected collections, apply the tentative local mutation, attempt the
/// remote effect, and restore the capture wholesale if the remote effect
/// fails. Restoring the full collections (rather than a compensating
/// partial edit) guarantees the post-rollback state is exactly the
/// pre-mutation state even when several fields changed together.

use std::collections::HashMap;

use crate::domain::{Habit, HabitCompletion, HabitId, Streak};
use crate::store::StoreState;

/// A capture of selected store collections
///
/// Only the collections an action actually mutates are captured; `restore`
/// puts back exactly those and leaves the rest untouched.
#[derive(Default)]
pub(crate) struct Snapshot {
    habits: Option<Vec<Habit>>,
    completions: Option<Vec<HabitCompletion>>,
    streaks: Option<HashMap<HabitId, Streak>>,
}

impl Snapshot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn habits(mut self, state: &StoreState) -> Self {
        self.habits = Some(state.habits.clone());
        self
    }

    pub(crate) fn completions(mut self, state: &StoreState) -> Self {
        self.completions = Some(state.completions.clone());
        self
    }

    pub(crate) fn streaks(mut self, state: &StoreState) -> Self {
        self.streaks = Some(state.streaks.clone());
        self
    }

    /// Restore every captured collection into the state
    pub(crate) fn restore(self, state: &mut StoreState) {
        if let Some(habits) = self.habits {
            state.habits = habits;
        }
        if let Some(completions) = self.completions {
            state.completions = completions;
        }
        if let Some(streaks) = self.streaks {
            state.streaks = streaks;
        }
    }
}
