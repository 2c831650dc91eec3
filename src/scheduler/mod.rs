/// Reminder scheduler: polling tick, snooze timers, and reminder CRUD
///
/// Once per tick (~60s) the scheduler re-evaluates every reminder against
/// wall-clock time and the store's latest habits/streaks/completions,
/// delivering a notification for each one that is due. Snoozing replaces any
/// pending snooze timer with a one-shot that re-fires when it elapses. Every
/// reminder mutation is written through to local device storage immediately.

pub mod notify;
pub mod reminder;

// Re-export the scheduler surface
pub use notify::*;
pub use reminder::*;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::{Frequency, HabitId};
use crate::local_store::{reminders_key, LocalStore};
use crate::store::{HabitStore, StoreEvent};

/// Polling cadence for the recurring evaluation pass
const TICK_PERIOD: Duration = Duration::from_secs(60);

/// Partial update for a reminder's configuration
///
/// Snooze state is not patchable here; it only changes through
/// `snooze_reminder` and the snooze timer itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReminderPatch {
    pub reminder_time: Option<NaiveTime>,
    pub enabled: Option<bool>,
    pub frequency: Option<Frequency>,
    pub custom_message: Option<Option<String>>,
    pub snooze_options: Option<Vec<u32>>,
}

struct SchedulerInner {
    store: Arc<HabitStore>,
    notifier: Arc<dyn Notifier>,
    local_store: LocalStore,
    storage_key: String,
    reminders: Mutex<Vec<HabitReminder>>,
    snooze_timers: Mutex<HashMap<HabitId, JoinHandle<()>>>,
}

impl SchedulerInner {
    fn reminders(&self) -> MutexGuard<'_, Vec<HabitReminder>> {
        self.reminders.lock().expect("reminder list poisoned")
    }

    fn timers(&self) -> MutexGuard<'_, HashMap<HabitId, JoinHandle<()>>> {
        self.snooze_timers.lock().expect("snooze timers poisoned")
    }

    /// Write the reminder list through to local storage
    fn persist(&self) {
        let reminders = self.reminders().clone();
        self.local_store.set(&self.storage_key, &reminders);
    }

    /// One evaluation pass at the given clock readings
    fn evaluate(&self, local_now: NaiveDateTime, utc_now: DateTime<Utc>) {
        if !self.notifier.is_available() {
            // Delivery impossible; stay silent but keep state consistent so
            // granting permission later just works
            return;
        }

        let today = local_now.date();
        let completed = self.store.completed_today_ids();
        let mut deliveries = Vec::new();

        {
            let mut reminders = self.reminders();
            for reminder in reminders.iter_mut() {
                let Some(habit) = self.store.habit(reminder.habit_id) else {
                    continue;
                };
                if !habit.is_active {
                    continue;
                }

                if reminder.is_due(local_now, utc_now, completed.contains(&reminder.habit_id)) {
                    reminder.last_fired_on = Some(today);
                    let streak = self.store.get_streak(reminder.habit_id);
                    deliveries.push(render_notification(reminder, &habit, streak.as_ref()));
                }
            }
        }

        if !deliveries.is_empty() {
            self.persist();
        }
        for notification in deliveries {
            debug!(tag = %notification.tag, "firing reminder");
            self.notifier.notify(notification);
        }
    }

    /// Drop a habit's reminder and cancel any pending snooze timer
    fn remove(&self, habit_id: HabitId) -> bool {
        let removed = {
            let mut reminders = self.reminders();
            let before = reminders.len();
            reminders.retain(|r| r.habit_id != habit_id);
            reminders.len() != before
        };
        if removed {
            if let Some(handle) = self.timers().remove(&habit_id) {
                handle.abort();
            }
            self.persist();
        }
        removed
    }

    /// Snooze window elapsed: clear the state and re-fire once
    fn finish_snooze(&self, habit_id: HabitId) {
        let reminder = {
            let mut reminders = self.reminders();
            let Some(reminder) = reminders.iter_mut().find(|r| r.habit_id == habit_id) else {
                return;
            };
            reminder.snoozed_until = None;
            reminder.clone()
        };
        self.persist();
        self.timers().remove(&habit_id);

        if !self.notifier.is_available() {
            return;
        }
        // Completing the habit during the snooze window cancels the re-fire
        if self.store.completed_today_ids().contains(&habit_id) {
            return;
        }
        let Some(habit) = self.store.habit(habit_id) else {
            return;
        };
        if !habit.is_active {
            return;
        }

        let streak = self.store.get_streak(habit_id);
        let notification = render_notification(&reminder, &habit, streak.as_ref());
        debug!(tag = %notification.tag, "re-firing snoozed reminder");
        self.notifier.notify(notification);
    }
}

/// The reminder scheduler
pub struct ReminderScheduler {
    inner: Arc<SchedulerInner>,
    tick_handle: Mutex<Option<JoinHandle<()>>>,
    events_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReminderScheduler {
    /// Create a scheduler over the given store, loading any persisted
    /// reminders for the store's user (malformed data falls back to empty)
    pub fn new(
        store: Arc<HabitStore>,
        notifier: Arc<dyn Notifier>,
        local_store: LocalStore,
    ) -> Self {
        let storage_key = reminders_key(store.user_id());
        let reminders: Vec<HabitReminder> =
            local_store.get(&storage_key).unwrap_or_default();

        Self {
            inner: Arc::new(SchedulerInner {
                store,
                notifier,
                local_store,
                storage_key,
                reminders: Mutex::new(reminders),
                snooze_timers: Mutex::new(HashMap::new()),
            }),
            tick_handle: Mutex::new(None),
            events_handle: Mutex::new(None),
        }
    }

    // --- Reminder CRUD -----------------------------------------------------

    /// Insert or replace the reminder for a habit
    pub fn set_reminder(&self, reminder: HabitReminder) {
        {
            let mut reminders = self.inner.reminders();
            match reminders.iter_mut().find(|r| r.habit_id == reminder.habit_id) {
                Some(existing) => *existing = reminder,
                None => reminders.push(reminder),
            }
        }
        self.inner.persist();
    }

    /// Patch an existing reminder; returns false when none exists
    pub fn update_reminder(&self, habit_id: HabitId, patch: ReminderPatch) -> bool {
        {
            let mut reminders = self.inner.reminders();
            let Some(reminder) = reminders.iter_mut().find(|r| r.habit_id == habit_id) else {
                return false;
            };

            if let Some(reminder_time) = patch.reminder_time {
                reminder.reminder_time = reminder_time;
            }
            if let Some(enabled) = patch.enabled {
                reminder.enabled = enabled;
            }
            if let Some(frequency) = patch.frequency {
                reminder.frequency = frequency;
            }
            if let Some(custom_message) = patch.custom_message {
                reminder.custom_message = custom_message;
            }
            if let Some(snooze_options) = patch.snooze_options {
                reminder.snooze_options = snooze_options;
            }
        }
        self.inner.persist();
        true
    }

    /// Remove a habit's reminder and cancel any pending snooze timer
    pub fn remove_reminder(&self, habit_id: HabitId) -> bool {
        self.inner.remove(habit_id)
    }

    pub fn get_reminder(&self, habit_id: HabitId) -> Option<HabitReminder> {
        self.inner.reminders().iter().find(|r| r.habit_id == habit_id).cloned()
    }

    pub fn reminders(&self) -> Vec<HabitReminder> {
        self.inner.reminders().clone()
    }

    // --- Evaluation --------------------------------------------------------

    /// Evaluate all reminders against the real clock right now
    pub fn check_reminders(&self) {
        self.inner.evaluate(Local::now().naive_local(), Utc::now());
    }

    /// Evaluate all reminders at an explicit clock reading
    pub fn check_reminders_at(&self, local_now: NaiveDateTime, utc_now: DateTime<Utc>) {
        self.inner.evaluate(local_now, utc_now);
    }

    /// Snooze a habit's reminder for the given number of minutes
    ///
    /// Replaces any pending snooze timer for that habit with a fresh one-shot
    /// that re-fires the reminder and clears the snooze state when it
    /// elapses. Returns false when the habit has no reminder.
    pub fn snooze_reminder(&self, habit_id: HabitId, minutes: u32) -> bool {
        let until = Utc::now() + chrono::Duration::minutes(minutes as i64);
        {
            let mut reminders = self.inner.reminders();
            let Some(reminder) = reminders.iter_mut().find(|r| r.habit_id == habit_id) else {
                return false;
            };
            reminder.snoozed_until = Some(until);
        }
        self.inner.persist();
        debug!(%habit_id, minutes, "reminder snoozed");

        let mut timers = self.inner.timers();
        if let Some(previous) = timers.remove(&habit_id) {
            previous.abort();
        }
        let inner = self.inner.clone();
        timers.insert(
            habit_id,
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(minutes as u64 * 60)).await;
                inner.finish_snooze(habit_id);
            }),
        );
        true
    }

    // --- Lifecycle ---------------------------------------------------------

    /// Install the recurring tick, replacing any previous one
    ///
    /// The first evaluation runs immediately so a reminder matching the
    /// current minute is not missed for up to a full tick period. While
    /// running, the scheduler also follows store events and drops the
    /// reminder of any habit that gets deleted.
    pub fn start(&self) {
        let mut guard = self.tick_handle.lock().expect("tick handle poisoned");
        if let Some(previous) = guard.take() {
            previous.abort();
        }

        let inner = self.inner.clone();
        *guard = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK_PERIOD);
            loop {
                ticker.tick().await;
                inner.evaluate(Local::now().naive_local(), Utc::now());
            }
        }));
        drop(guard);

        let mut guard = self.events_handle.lock().expect("events handle poisoned");
        if let Some(previous) = guard.take() {
            previous.abort();
        }

        let inner = self.inner.clone();
        let mut events = inner.store.subscribe();
        *guard = Some(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(StoreEvent::HabitDeleted(habit_id)) => {
                        if inner.remove(habit_id) {
                            debug!(%habit_id, "dropped reminder for deleted habit");
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "store event stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
        info!("reminder scheduler started");
    }

    /// Cancel the recurring tick, the store-event listener, and every
    /// pending snooze timer; idempotent
    pub fn stop(&self) {
        if let Some(handle) = self.tick_handle.lock().expect("tick handle poisoned").take() {
            handle.abort();
        }
        if let Some(handle) = self.events_handle.lock().expect("events handle poisoned").take() {
            handle.abort();
        }
        for (_, handle) in self.inner.timers().drain() {
            handle.abort();
        }
        info!("reminder scheduler stopped");
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
