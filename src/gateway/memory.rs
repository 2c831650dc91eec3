/// In-memory implementation of the persistence gateway
///
/// A full in-process backend: it stores habits and completions, and plays
/// the server's role in streak arithmetic by recomputing streaks from the
/// completion history on every mutation. It also carries a fault-injection
/// switch so the store's rollback paths can be exercised without a network.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::debug;

use crate::domain::{
    CompletionId, Habit, HabitCompletion, HabitId, HabitPatch, Streak, UserId,
};
use crate::gateway::{
    CompletionReceipt, GatewayError, PersistenceGateway, UncompletionReceipt,
};

#[derive(Default)]
struct MemoryState {
    habits: HashMap<HabitId, Habit>,
    /// Completion id per (habit, date); at most one per pair
    completions: HashMap<HabitId, HashMap<NaiveDate, HabitCompletion>>,
    /// Pinned "today" for deterministic streak recomputation; real clock if unset
    today: Option<NaiveDate>,
}

/// In-memory persistence gateway
pub struct InMemoryGateway {
    state: Mutex<MemoryState>,
    fail_requests: AtomicBool,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            fail_requests: AtomicBool::new(false),
        }
    }

    /// When enabled, every gateway call fails with `GatewayError::Unavailable`
    pub fn set_fail_requests(&self, fail: bool) {
        self.fail_requests.store(fail, Ordering::SeqCst);
    }

    /// Pin the date used for streak recomputation
    pub fn set_today(&self, today: NaiveDate) {
        self.state.lock().expect("gateway state poisoned").today = Some(today);
    }

    /// Seed the gateway with pre-existing habits and completions
    pub fn seed(&self, habits: Vec<Habit>, completions: Vec<HabitCompletion>) {
        let mut state = self.state.lock().expect("gateway state poisoned");
        for habit in habits {
            state.habits.insert(habit.id, habit);
        }
        for completion in completions {
            state
                .completions
                .entry(completion.habit_id)
                .or_default()
                .insert(completion.completed_date, completion);
        }
    }

    fn check_available(&self) -> Result<(), GatewayError> {
        if self.fail_requests.load(Ordering::SeqCst) {
            Err(GatewayError::Unavailable("fault injection enabled".to_string()))
        } else {
            Ok(())
        }
    }

    fn recompute_streak(state: &MemoryState, habit: &Habit) -> Streak {
        let dates: BTreeSet<NaiveDate> = state
            .completions
            .get(&habit.id)
            .map(|by_date| by_date.keys().copied().collect())
            .unwrap_or_default();
        let today = state.today.unwrap_or_else(|| Utc::now().date_naive());
        Streak::recompute(habit.id, &habit.frequency, &dates, today)
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn fetch_habits(&self, user: UserId) -> Result<Vec<Habit>, GatewayError> {
        self.check_available()?;
        let state = self.state.lock().expect("gateway state poisoned");

        let mut habits: Vec<Habit> = state
            .habits
            .values()
            .filter(|h| h.is_active && h.user_id == Some(user))
            .cloned()
            .collect();
        habits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(habits)
    }

    async fn fetch_completions(
        &self,
        user: UserId,
        since: NaiveDate,
    ) -> Result<Vec<HabitCompletion>, GatewayError> {
        self.check_available()?;
        let state = self.state.lock().expect("gateway state poisoned");

        let mut completions: Vec<HabitCompletion> = state
            .completions
            .values()
            .flat_map(|by_date| by_date.values())
            .filter(|c| c.user_id == Some(user) && c.completed_date >= since)
            .cloned()
            .collect();
        completions.sort_by_key(|c| c.completed_date);
        Ok(completions)
    }

    async fn fetch_streaks(&self, user: UserId) -> Result<Vec<Streak>, GatewayError> {
        self.check_available()?;
        let state = self.state.lock().expect("gateway state poisoned");

        let streaks = state
            .habits
            .values()
            .filter(|h| h.user_id == Some(user))
            .map(|habit| Self::recompute_streak(&state, habit))
            .collect();
        Ok(streaks)
    }

    async fn insert_habit(&self, habit: &Habit) -> Result<Habit, GatewayError> {
        self.check_available()?;
        let mut state = self.state.lock().expect("gateway state poisoned");

        state.habits.insert(habit.id, habit.clone());
        debug!(habit_id = %habit.id, "stored habit");
        Ok(habit.clone())
    }

    async fn update_habit(
        &self,
        habit_id: HabitId,
        patch: &HabitPatch,
    ) -> Result<(), GatewayError> {
        self.check_available()?;
        let mut state = self.state.lock().expect("gateway state poisoned");

        let habit = state.habits.get_mut(&habit_id).ok_or_else(|| {
            GatewayError::HabitNotFound { habit_id: habit_id.to_string() }
        })?;
        habit
            .apply_patch(patch)
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn deactivate_habit(&self, habit_id: HabitId) -> Result<(), GatewayError> {
        self.check_available()?;
        let mut state = self.state.lock().expect("gateway state poisoned");

        let habit = state.habits.get_mut(&habit_id).ok_or_else(|| {
            GatewayError::HabitNotFound { habit_id: habit_id.to_string() }
        })?;
        habit.is_active = false;
        debug!(%habit_id, "soft-deleted habit");
        Ok(())
    }

    async fn complete(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
    ) -> Result<CompletionReceipt, GatewayError> {
        self.check_available()?;
        let mut state = self.state.lock().expect("gateway state poisoned");

        let habit = state
            .habits
            .get(&habit_id)
            .ok_or_else(|| GatewayError::HabitNotFound { habit_id: habit_id.to_string() })?
            .clone();

        // Idempotent per day: an existing completion keeps its id
        let by_date = state.completions.entry(habit_id).or_default();
        let completion_id = match by_date.get(&date) {
            Some(existing) => existing.id,
            None => {
                let id = CompletionId::new();
                by_date.insert(
                    date,
                    HabitCompletion {
                        id,
                        habit_id,
                        user_id: habit.user_id,
                        completed_date: date,
                        notes: None,
                        logged_at: Utc::now(),
                    },
                );
                id
            }
        };

        let streak = Self::recompute_streak(&state, &habit);
        debug!(%habit_id, %date, streak = streak.current_streak, "recorded completion");

        Ok(CompletionReceipt { completion_id, streak: streak.current_streak })
    }

    async fn uncomplete(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
    ) -> Result<UncompletionReceipt, GatewayError> {
        self.check_available()?;
        let mut state = self.state.lock().expect("gateway state poisoned");

        let habit = state
            .habits
            .get(&habit_id)
            .ok_or_else(|| GatewayError::HabitNotFound { habit_id: habit_id.to_string() })?
            .clone();

        if let Some(by_date) = state.completions.get_mut(&habit_id) {
            by_date.remove(&date);
        }

        let streak = Self::recompute_streak(&state, &habit);
        debug!(%habit_id, %date, streak = streak.current_streak, "removed completion");

        Ok(UncompletionReceipt {
            streak: streak.current_streak,
            last_completed_date: streak.last_completed_date,
        })
    }
}
