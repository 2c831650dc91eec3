/// Local state store for habits, completions, and streaks
///
/// This is the single source of truth for the running client. Every mutation
/// goes through the optimistic-update protocol: apply the change locally for
/// immediate feedback, confirm it with the persistence gateway, then either
/// reconcile the authoritative values or restore the pre-mutation snapshot.
/// No action returns an error to the caller; failures land in the shared
/// error field and the store stays usable.

pub(crate) mod demo;
mod snapshot;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::domain::{
    Frequency, Habit, HabitCompletion, HabitId, HabitPatch, Streak, UserId,
};
use crate::gateway::{GatewayError, PersistenceGateway};
use snapshot::Snapshot;

/// Change notifications emitted by the store
///
/// Consumers subscribe instead of polling; a notification names what changed
/// and the read accessors supply the current values.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// State was replaced wholesale by a fetch
    Loaded,
    HabitAdded(HabitId),
    HabitEdited(HabitId),
    HabitDeleted(HabitId),
    Completed { habit_id: HabitId, date: NaiveDate },
    Uncompleted { habit_id: HabitId, date: NaiveDate },
    /// A mutation failed remotely and the local state was restored
    RolledBack(HabitId),
    Reset,
}

/// Input for creating a habit through the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitDraft {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub frequency: Frequency,
    pub reminder_time: Option<NaiveTime>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// The collections and flags behind the store mutex
pub(crate) struct StoreState {
    pub(crate) habits: Vec<Habit>,
    /// Rolling window of recent completions (trailing 30 days on fetch)
    pub(crate) completions: Vec<HabitCompletion>,
    pub(crate) streaks: HashMap<HabitId, Streak>,
    loading: bool,
    error: Option<String>,
    /// Habits with an outstanding completion/uncompletion mutation; a second
    /// mutation for the same habit is suppressed until the first resolves
    in_flight: HashSet<HabitId>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            habits: Vec::new(),
            completions: Vec::new(),
            streaks: HashMap::new(),
            loading: true,
            error: None,
            in_flight: HashSet::new(),
        }
    }
}

type TodayFn = Box<dyn Fn() -> NaiveDate + Send + Sync>;

/// The habit store
///
/// Constructed either connected (gateway + user) or in demo mode (neither);
/// demo mode substitutes a fixed local dataset for every gateway call.
pub struct HabitStore {
    backend: Option<(Arc<dyn PersistenceGateway>, UserId)>,
    state: Mutex<StoreState>,
    events: broadcast::Sender<StoreEvent>,
    today: TodayFn,
}

impl HabitStore {
    /// Create a store bound to a gateway and an authenticated user
    pub fn connected(gateway: Arc<dyn PersistenceGateway>, user: UserId) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            backend: Some((gateway, user)),
            state: Mutex::new(StoreState::default()),
            events,
            today: Box::new(|| Local::now().date_naive()),
        }
    }

    /// Create a guest-mode store that never calls a gateway
    pub fn demo() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            backend: None,
            state: Mutex::new(StoreState::default()),
            events,
            today: Box::new(|| Local::now().date_naive()),
        }
    }

    /// Override the clock used for "today" (tests pin it to a fixed date)
    pub fn with_today(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Box::new(today);
        self
    }

    /// Subscribe to change notifications
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// The authenticated user, or None in demo mode
    pub fn user_id(&self) -> Option<UserId> {
        self.backend.as_ref().map(|(_, user)| *user)
    }

    /// Today according to the store's clock
    pub fn today(&self) -> NaiveDate {
        (self.today)()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().expect("store state poisoned")
    }

    fn emit(&self, event: StoreEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    // --- Loading -----------------------------------------------------------

    /// Load habits, the trailing 30-day completion window, and all streaks
    ///
    /// Replaces in-memory state wholesale on success. Fetch errors are
    /// non-fatal: the previous state stays usable and the error field is
    /// populated.
    pub async fn fetch_habits(&self) {
        {
            let mut state = self.lock();
            state.loading = true;
            state.error = None;
        }

        match &self.backend {
            None => {
                let (habits, completions, streaks) = demo::demo_dataset(self.today());
                let mut state = self.lock();
                state.habits = habits;
                state.completions = completions;
                state.streaks = streaks;
                state.loading = false;
                drop(state);
                info!("loaded demo dataset");
                self.emit(StoreEvent::Loaded);
            }
            Some((gateway, user)) => {
                let since = self.today() - Duration::days(29);
                let loaded = Self::load_remote(gateway.as_ref(), *user, since).await;

                let mut state = self.lock();
                match loaded {
                    Ok((habits, completions, streaks)) => {
                        let mut by_habit: HashMap<HabitId, Streak> =
                            streaks.into_iter().map(|s| (s.habit_id, s)).collect();
                        // Every habit gets a streak entry, zeroed if the
                        // gateway has none yet
                        for habit in &habits {
                            by_habit.entry(habit.id).or_insert_with(|| Streak::new(habit.id));
                        }

                        info!(habits = habits.len(), completions = completions.len(), "loaded state from gateway");
                        state.habits = habits;
                        state.completions = completions;
                        state.streaks = by_habit;
                        state.loading = false;
                        drop(state);
                        self.emit(StoreEvent::Loaded);
                    }
                    Err(e) => {
                        warn!(error = %e, "failed to load state from gateway");
                        state.loading = false;
                        state.error = Some(format!("Failed to load habits: {}", e));
                    }
                }
            }
        }
    }

    async fn load_remote(
        gateway: &dyn PersistenceGateway,
        user: UserId,
        since: NaiveDate,
    ) -> Result<(Vec<Habit>, Vec<HabitCompletion>, Vec<Streak>), GatewayError> {
        let habits = gateway.fetch_habits(user).await?;
        let completions = gateway.fetch_completions(user, since).await?;
        let streaks = gateway.fetch_streaks(user).await?;
        Ok((habits, completions, streaks))
    }

    // --- Habit CRUD --------------------------------------------------------

    /// Create a habit; returns the stored record or None on failure
    ///
    /// Demo mode appends a locally-minted record; connected mode appends the
    /// server-assigned record. Either way a zeroed streak entry is seeded.
    pub async fn add_habit(&self, draft: HabitDraft) -> Option<Habit> {
        let mut habit = match Habit::new(
            self.user_id(),
            draft.name,
            draft.description,
            draft.category,
            draft.frequency,
            draft.reminder_time,
        ) {
            Ok(habit) => habit,
            Err(e) => {
                self.lock().error = Some(e.to_string());
                return None;
            }
        };
        habit.color = draft.color;
        habit.icon = draft.icon;

        let stored = match &self.backend {
            None => habit,
            Some((gateway, _)) => match gateway.insert_habit(&habit).await {
                Ok(created) => created,
                Err(e) => {
                    warn!(error = %e, "failed to insert habit");
                    self.lock().error = Some(format!("Failed to add habit: {}", e));
                    return None;
                }
            },
        };

        {
            let mut state = self.lock();
            state.streaks.insert(stored.id, Streak::new(stored.id));
            state.habits.push(stored.clone());
        }
        debug!(habit_id = %stored.id, name = %stored.name, "added habit");
        self.emit(StoreEvent::HabitAdded(stored.id));
        Some(stored)
    }

    /// Merge-patch a habit optimistically; returns success
    pub async fn edit_habit(&self, habit_id: HabitId, patch: HabitPatch) -> bool {
        let snapshot;
        {
            let mut state = self.lock();
            let Some(index) = state.habits.iter().position(|h| h.id == habit_id) else {
                return false;
            };

            let mut updated = state.habits[index].clone();
            if let Err(e) = updated.apply_patch(&patch) {
                state.error = Some(e.to_string());
                return false;
            }

            snapshot = Snapshot::new().habits(&state);
            state.habits[index] = updated;
        }

        match &self.backend {
            None => {
                self.emit(StoreEvent::HabitEdited(habit_id));
                true
            }
            Some((gateway, _)) => match gateway.update_habit(habit_id, &patch).await {
                Ok(()) => {
                    debug!(%habit_id, "habit update confirmed");
                    self.emit(StoreEvent::HabitEdited(habit_id));
                    true
                }
                Err(e) => {
                    warn!(%habit_id, error = %e, "habit update failed, rolling back");
                    let mut state = self.lock();
                    snapshot.restore(&mut state);
                    state.error = Some(format!("Failed to update habit: {}", e));
                    drop(state);
                    self.emit(StoreEvent::RolledBack(habit_id));
                    false
                }
            },
        }
    }

    /// Soft-delete a habit: remove it, its streak, and its completions from
    /// local state; the gateway only flips the inactive flag. Returns success.
    pub async fn delete_habit(&self, habit_id: HabitId) -> bool {
        let snapshot;
        {
            let mut state = self.lock();
            if !state.habits.iter().any(|h| h.id == habit_id) {
                return false;
            }

            snapshot = Snapshot::new().habits(&state).completions(&state).streaks(&state);
            state.habits.retain(|h| h.id != habit_id);
            state.completions.retain(|c| c.habit_id != habit_id);
            state.streaks.remove(&habit_id);
        }

        match &self.backend {
            None => {
                self.emit(StoreEvent::HabitDeleted(habit_id));
                true
            }
            Some((gateway, _)) => match gateway.deactivate_habit(habit_id).await {
                Ok(()) => {
                    debug!(%habit_id, "habit deletion confirmed");
                    self.emit(StoreEvent::HabitDeleted(habit_id));
                    true
                }
                Err(e) => {
                    warn!(%habit_id, error = %e, "habit deletion failed, rolling back");
                    let mut state = self.lock();
                    snapshot.restore(&mut state);
                    state.error = Some(format!("Failed to delete habit: {}", e));
                    drop(state);
                    self.emit(StoreEvent::RolledBack(habit_id));
                    false
                }
            },
        }
    }

    // --- Completion write path ---------------------------------------------

    /// Mark a habit complete for a date (defaults to today); returns whether
    /// a completion was recorded and confirmed
    ///
    /// Optimistically appends a provisional completion and bumps the streak,
    /// then confirms with the gateway. The gateway's recomputed streak is
    /// authoritative when available; on failure the pre-mutation completions
    /// and streaks are restored exactly. At most one completion mutation per
    /// habit may be outstanding; concurrent calls for the same habit are
    /// suppressed no-ops.
    pub async fn complete_habit(&self, habit_id: HabitId, date: Option<NaiveDate>) -> bool {
        let today = self.today();
        let date = date.unwrap_or(today);

        let snapshot;
        {
            let mut state = self.lock();
            if state.in_flight.contains(&habit_id) {
                debug!(%habit_id, "completion already in flight, suppressed");
                return false;
            }
            if !state.habits.iter().any(|h| h.id == habit_id) {
                return false;
            }
            if state
                .completions
                .iter()
                .any(|c| c.habit_id == habit_id && c.completed_date == date)
            {
                // Already completed for that day; idempotent no-op
                return false;
            }

            let completion =
                match HabitCompletion::new(habit_id, self.user_id(), date, None, today) {
                    Ok(completion) => completion,
                    Err(e) => {
                        state.error = Some(e.to_string());
                        return false;
                    }
                };

            snapshot = Snapshot::new().completions(&state).streaks(&state);
            state.completions.push(completion);
            state
                .streaks
                .entry(habit_id)
                .or_insert_with(|| Streak::new(habit_id))
                .record_completion(date);
            state.in_flight.insert(habit_id);
        }

        let confirmed = match &self.backend {
            None => Ok(None),
            Some((gateway, _)) => gateway.complete(habit_id, date).await.map(Some),
        };

        let mut state = self.lock();
        state.in_flight.remove(&habit_id);

        match confirmed {
            Ok(receipt) => {
                if let Some(receipt) = receipt {
                    // Adopt the authoritative completion id and streak value
                    if let Some(completion) = state
                        .completions
                        .iter_mut()
                        .find(|c| c.habit_id == habit_id && c.completed_date == date)
                    {
                        completion.id = receipt.completion_id;
                    }
                    if let Some(streak) = state.streaks.get_mut(&habit_id) {
                        streak.adopt_authoritative(receipt.streak, date);
                    }
                }
                drop(state);
                debug!(%habit_id, %date, "completion recorded");
                self.emit(StoreEvent::Completed { habit_id, date });
                true
            }
            Err(e) => {
                warn!(%habit_id, %date, error = %e, "completion failed, rolling back");
                snapshot.restore(&mut state);
                state.error = Some(format!("Failed to complete habit: {}", e));
                drop(state);
                self.emit(StoreEvent::RolledBack(habit_id));
                false
            }
        }
    }

    /// Remove the completion for a (habit, date); returns whether a removal
    /// was recorded and confirmed
    ///
    /// Symmetric inverse of `complete_habit`: no completion for that day is a
    /// pure no-op with no gateway call. The optimistic estimate decrements
    /// the streak floored at zero; the gateway's recomputation is adopted on
    /// confirmation.
    pub async fn uncomplete_habit(&self, habit_id: HabitId, date: Option<NaiveDate>) -> bool {
        let date = date.unwrap_or_else(|| self.today());

        let snapshot;
        {
            let mut state = self.lock();
            if state.in_flight.contains(&habit_id) {
                debug!(%habit_id, "mutation already in flight, suppressed");
                return false;
            }
            let Some(position) = state
                .completions
                .iter()
                .position(|c| c.habit_id == habit_id && c.completed_date == date)
            else {
                return false;
            };

            snapshot = Snapshot::new().completions(&state).streaks(&state);
            state.completions.remove(position);
            if let Some(streak) = state.streaks.get_mut(&habit_id) {
                streak.record_uncompletion();
            }
            state.in_flight.insert(habit_id);
        }

        let confirmed = match &self.backend {
            None => Ok(None),
            Some((gateway, _)) => gateway.uncomplete(habit_id, date).await.map(Some),
        };

        let mut state = self.lock();
        state.in_flight.remove(&habit_id);

        match confirmed {
            Ok(receipt) => {
                if let (Some(receipt), Some(streak)) = (receipt, state.streaks.get_mut(&habit_id))
                {
                    streak.current_streak = receipt.streak;
                    streak.longest_streak = streak.longest_streak.max(receipt.streak);
                    streak.last_completed_date = receipt.last_completed_date;
                }
                drop(state);
                debug!(%habit_id, %date, "uncompletion recorded");
                self.emit(StoreEvent::Uncompleted { habit_id, date });
                true
            }
            Err(e) => {
                warn!(%habit_id, %date, error = %e, "uncompletion failed, rolling back");
                snapshot.restore(&mut state);
                state.error = Some(format!("Failed to uncomplete habit: {}", e));
                drop(state);
                self.emit(StoreEvent::RolledBack(habit_id));
                false
            }
        }
    }

    // --- Reads -------------------------------------------------------------

    /// True iff a completion exists for (habit, today)
    pub fn is_completed_today(&self, habit_id: HabitId) -> bool {
        let today = self.today();
        self.lock()
            .completions
            .iter()
            .any(|c| c.habit_id == habit_id && c.completed_date == today)
    }

    /// Ids of all habits completed today (used by the reminder scheduler)
    pub fn completed_today_ids(&self) -> HashSet<HabitId> {
        let today = self.today();
        self.lock()
            .completions
            .iter()
            .filter(|c| c.completed_date == today)
            .map(|c| c.habit_id)
            .collect()
    }

    pub fn get_streak(&self, habit_id: HabitId) -> Option<Streak> {
        self.lock().streaks.get(&habit_id).cloned()
    }

    pub fn habits(&self) -> Vec<Habit> {
        self.lock().habits.clone()
    }

    pub fn habit(&self, habit_id: HabitId) -> Option<Habit> {
        self.lock().habits.iter().find(|h| h.id == habit_id).cloned()
    }

    pub fn completions(&self) -> Vec<HabitCompletion> {
        self.lock().completions.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// The most recent failure message, if any
    pub fn last_error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Clear all state back to initial empty/loading values (used on sign-out)
    pub fn reset(&self) {
        *self.lock() = StoreState::default();
        info!("store reset");
        self.emit(StoreEvent::Reset);
    }
}
