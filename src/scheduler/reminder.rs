/// Per-habit reminder configuration and due-evaluation
///
/// Reminders are client-local, not server-authoritative: they live in local
/// device storage and are consulted on every scheduler tick. The evaluation
/// functions here are pure over an injected clock so they can be tested
/// without timers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Frequency, Habit, HabitId, Streak};
use crate::scheduler::notify::Notification;

/// Default snooze durations offered to the user, in minutes
pub const DEFAULT_SNOOZE_OPTIONS: [u32; 3] = [5, 15, 30];

/// Client-local reminder configuration for one habit
///
/// Lifecycle: created/updated via settings, persisted to local storage on
/// every mutation, mutated when snoozed, removed when the reminder is
/// disabled or the habit is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitReminder {
    pub habit_id: HabitId,
    /// Local wall-clock firing time, minute granularity
    pub reminder_time: NaiveTime,
    pub enabled: bool,
    /// Daily, or only on specific weekday indices
    pub frequency: Frequency,
    /// Overrides the rendered notification body when set
    pub custom_message: Option<String>,
    /// Candidate snooze durations in minutes
    pub snooze_options: Vec<u32>,
    /// Suppresses firing until it elapses
    pub snoozed_until: Option<DateTime<Utc>>,
    /// Last calendar day this reminder fired; guards against refiring within
    /// the same day outside the snooze path
    pub last_fired_on: Option<NaiveDate>,
}

impl HabitReminder {
    /// A daily reminder at the given time with default snooze options
    pub fn daily(habit_id: HabitId, reminder_time: NaiveTime) -> Self {
        Self {
            habit_id,
            reminder_time,
            enabled: true,
            frequency: Frequency::Daily,
            custom_message: None,
            snooze_options: DEFAULT_SNOOZE_OPTIONS.to_vec(),
            snoozed_until: None,
            last_fired_on: None,
        }
    }

    /// Whether this reminder is eligible to fire at all on the given day
    pub fn should_fire_today(&self, today: NaiveDate) -> bool {
        self.enabled && self.frequency.is_scheduled_on(today)
    }

    /// Whether an active snooze window suppresses firing right now
    pub fn is_snoozed(&self, now: DateTime<Utc>) -> bool {
        matches!(self.snoozed_until, Some(until) if now < until)
    }

    /// Full due-condition: configured time matches `now` to the minute, the
    /// day qualifies, no active snooze, not already fired today, and the
    /// habit has no completion recorded today
    pub fn is_due(
        &self,
        local_now: NaiveDateTime,
        utc_now: DateTime<Utc>,
        completed_today: bool,
    ) -> bool {
        let today = local_now.date();
        self.should_fire_today(today)
            && minute_of(local_now.time()) == minute_of(self.reminder_time)
            && !self.is_snoozed(utc_now)
            && self.last_fired_on != Some(today)
            && !completed_today
    }
}

/// Truncate a time to minute granularity
fn minute_of(time: NaiveTime) -> (u32, u32) {
    (time.hour(), time.minute())
}

/// Render the notification payload for a due reminder
///
/// Body preference: custom message, then habit description, then a generic
/// default; an active streak adds context.
pub fn render_notification(
    reminder: &HabitReminder,
    habit: &Habit,
    streak: Option<&Streak>,
) -> Notification {
    let mut body = reminder
        .custom_message
        .clone()
        .or_else(|| habit.description.clone())
        .unwrap_or_else(|| "Time to check in on your habit!".to_string());

    if let Some(streak) = streak {
        if streak.current_streak > 0 {
            body.push_str(&format!(
                " You're on a {}-day streak.",
                streak.current_streak
            ));
        }
    }

    Notification {
        title: format!("Reminder: {}", habit.name),
        body,
        tag: format!("habit-reminder-{}", habit.id),
        require_interaction: false,
    }
}
