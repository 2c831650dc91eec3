/// Streak calculation and tracking functionality
///
/// This module defines the Streak aggregate that holds per-habit streak
/// counters, the optimistic increment/decrement arithmetic used by the
/// store's completion path, and the full recomputation from a completion
/// history that the in-memory gateway uses as its server-side arithmetic.

use serde::{Deserialize, Serialize};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use crate::domain::{Frequency, HabitId};

/// Calculated streak information for a habit
///
/// `current_streak` counts consecutive expected days completed up to the most
/// recent completion; `longest_streak` is the historical maximum and never
/// drops below `current_streak`. The store's local values are advisory until
/// reconciled with the gateway's authoritative recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    /// Which habit this streak data is for
    pub habit_id: HabitId,
    /// Current consecutive expected days completed
    pub current_streak: u32,
    /// Best streak ever achieved for this habit
    pub longest_streak: u32,
    /// When the habit was last completed (None if never completed)
    pub last_completed_date: Option<NaiveDate>,
}

impl Streak {
    /// Create a new streak record with zero values
    ///
    /// This creates an empty streak record for a new habit that hasn't
    /// been completed yet.
    pub fn new(habit_id: HabitId) -> Self {
        Self {
            habit_id,
            current_streak: 0,
            longest_streak: 0,
            last_completed_date: None,
        }
    }

    /// Optimistic local estimate after completing a day
    ///
    /// Increments the current streak by one and raises the longest streak to
    /// match if overtaken. This is a provisional value for UI responsiveness;
    /// the gateway's recomputed streak wins on reconciliation.
    pub fn record_completion(&mut self, date: NaiveDate) {
        self.current_streak += 1;
        self.longest_streak = self.longest_streak.max(self.current_streak);
        self.last_completed_date = Some(date);
    }

    /// Optimistic local estimate after uncompleting a day
    ///
    /// Decrements the current streak floored at zero; a zeroed streak clears
    /// the last-completed date. Deliberately does not re-derive from history
    /// (the gateway owns the authoritative value).
    pub fn record_uncompletion(&mut self) {
        self.current_streak = self.current_streak.saturating_sub(1);
        if self.current_streak == 0 {
            self.last_completed_date = None;
        }
    }

    /// Adopt the gateway's authoritative streak value after a completion
    pub fn adopt_authoritative(&mut self, current: u32, date: NaiveDate) {
        self.current_streak = current;
        self.longest_streak = self.longest_streak.max(current);
        self.last_completed_date = Some(date);
    }

    /// Recompute the streak from the complete set of completion dates
    ///
    /// This is the authoritative arithmetic: walk backwards from today (or
    /// from the most recent expected day if today is not completed yet)
    /// counting consecutive expected days, and scan the whole history for the
    /// longest run. Non-expected days never break a streak.
    pub fn recompute(
        habit_id: HabitId,
        frequency: &Frequency,
        dates: &BTreeSet<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        if dates.is_empty() {
            return Self::new(habit_id);
        }

        let last_completed_date = dates.iter().next_back().copied();
        let current_streak = Self::current_run(frequency, dates, today);
        let longest_streak = Self::longest_run(frequency, dates).max(current_streak);

        Self {
            habit_id,
            current_streak,
            longest_streak,
            last_completed_date,
        }
    }

    /// Count the active run ending at today (or the last expected day)
    fn current_run(frequency: &Frequency, dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
        let mut checking = today;
        if !frequency.is_scheduled_on(checking) || !dates.contains(&checking) {
            // Today doesn't count yet; a streak survives until the previous
            // expected day is actually missed.
            checking = frequency.previous_scheduled_before(today);
        }

        let mut run = 0;
        for _ in 0..366 {
            if dates.contains(&checking) {
                run += 1;
                checking = frequency.previous_scheduled_before(checking);
            } else {
                break;
            }
        }
        run
    }

    /// Scan the whole history for the longest run of consecutive expected days
    fn longest_run(frequency: &Frequency, dates: &BTreeSet<NaiveDate>) -> u32 {
        let mut longest = 0;
        let mut run = 0;
        let mut previous: Option<NaiveDate> = None;

        for &date in dates.iter() {
            // Chained when the previous completion is no earlier than this
            // date's scheduled predecessor; off-schedule completions in
            // between extend the run rather than break it.
            let chained = match previous {
                Some(prev) => frequency.previous_scheduled_before(date) <= prev,
                None => false,
            };
            run = if chained { run + 1 } else { 1 };
            longest = longest.max(run);
            previous = Some(date);
        }

        longest
    }

    /// Whether the streak invariants hold for this record
    pub fn is_consistent(&self) -> bool {
        self.longest_streak >= self.current_streak
            && (self.current_streak == 0 || self.last_completed_date.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dates(specs: &[(i32, u32, u32)]) -> BTreeSet<NaiveDate> {
        specs.iter().map(|&(y, m, d)| date(y, m, d)).collect()
    }

    #[test]
    fn test_new_streak() {
        let habit_id = HabitId::new();
        let streak = Streak::new(habit_id);

        assert_eq!(streak.habit_id, habit_id);
        assert_eq!(streak.current_streak, 0);
        assert_eq!(streak.longest_streak, 0);
        assert_eq!(streak.last_completed_date, None);
        assert!(streak.is_consistent());
    }

    #[test]
    fn test_optimistic_completion_raises_longest() {
        let mut streak = Streak::new(HabitId::new());
        streak.current_streak = 5;
        streak.longest_streak = 5;

        streak.record_completion(date(2024, 1, 10));

        assert_eq!(streak.current_streak, 6);
        assert_eq!(streak.longest_streak, 6);
        assert_eq!(streak.last_completed_date, Some(date(2024, 1, 10)));
    }

    #[test]
    fn test_uncompletion_floors_at_zero() {
        let mut streak = Streak::new(HabitId::new());
        streak.record_uncompletion();
        assert_eq!(streak.current_streak, 0);
        assert_eq!(streak.last_completed_date, None);

        streak.current_streak = 1;
        streak.longest_streak = 4;
        streak.last_completed_date = Some(date(2024, 1, 10));
        streak.record_uncompletion();
        assert_eq!(streak.current_streak, 0);
        assert_eq!(streak.last_completed_date, None);
        assert_eq!(streak.longest_streak, 4);
    }

    #[test]
    fn test_recompute_daily_consecutive() {
        let habit_id = HabitId::new();
        let completed = dates(&[(2024, 1, 8), (2024, 1, 9), (2024, 1, 10)]);

        let streak = Streak::recompute(habit_id, &Frequency::Daily, &completed, date(2024, 1, 10));

        assert_eq!(streak.current_streak, 3);
        assert_eq!(streak.longest_streak, 3);
        assert_eq!(streak.last_completed_date, Some(date(2024, 1, 10)));
    }

    #[test]
    fn test_recompute_survives_incomplete_today() {
        let habit_id = HabitId::new();
        let completed = dates(&[(2024, 1, 8), (2024, 1, 9)]);

        // Today (the 10th) isn't completed yet; the run up to yesterday holds
        let streak = Streak::recompute(habit_id, &Frequency::Daily, &completed, date(2024, 1, 10));
        assert_eq!(streak.current_streak, 2);

        // But a full missed day resets the current run
        let streak = Streak::recompute(habit_id, &Frequency::Daily, &completed, date(2024, 1, 11));
        assert_eq!(streak.current_streak, 0);
        assert_eq!(streak.longest_streak, 2);
    }

    #[test]
    fn test_recompute_gap_keeps_longest() {
        let habit_id = HabitId::new();
        let completed = dates(&[
            (2024, 1, 1), (2024, 1, 2), (2024, 1, 3), (2024, 1, 4), // run of 4
            (2024, 1, 9), (2024, 1, 10),                             // run of 2
        ]);

        let streak = Streak::recompute(habit_id, &Frequency::Daily, &completed, date(2024, 1, 10));

        assert_eq!(streak.current_streak, 2);
        assert_eq!(streak.longest_streak, 4);
        assert!(streak.is_consistent());
    }

    #[test]
    fn test_recompute_target_days_skips_off_days() {
        let habit_id = HabitId::new();
        // Mon/Wed/Fri habit completed on Mon 8th, Wed 10th, Fri 12th
        let freq = Frequency::TargetDays([1u8, 3, 5].into_iter().collect());
        let completed = dates(&[(2024, 1, 8), (2024, 1, 10), (2024, 1, 12)]);

        // Saturday the 13th: the Friday run is still alive
        let streak = Streak::recompute(habit_id, &freq, &completed, date(2024, 1, 13));

        assert_eq!(streak.current_streak, 3);
        assert_eq!(streak.longest_streak, 3);
    }

    #[test]
    fn test_recompute_target_days_missed_day_resets() {
        let habit_id = HabitId::new();
        let freq = Frequency::TargetDays([1u8, 3, 5].into_iter().collect());
        // Missed Wednesday the 10th
        let completed = dates(&[(2024, 1, 8), (2024, 1, 12)]);

        let streak = Streak::recompute(habit_id, &freq, &completed, date(2024, 1, 12));

        assert_eq!(streak.current_streak, 1);
        assert_eq!(streak.longest_streak, 1);
    }
}
