/// Fixed demo dataset for guest mode
///
/// When the store has no authenticated user it loads this dataset instead of
/// calling the gateway. Completions are generated relative to the supplied
/// date and streaks are derived from them, so the dataset is always
/// internally consistent regardless of when it is loaded.

use std::collections::{BTreeSet, HashMap};

use chrono::{Duration, NaiveDate, NaiveTime};

use crate::domain::{Frequency, Habit, HabitCompletion, HabitId, Streak};

/// Build the demo habits, their recent completions, and matching streaks
pub(crate) fn demo_dataset(
    today: NaiveDate,
) -> (Vec<Habit>, Vec<HabitCompletion>, HashMap<HabitId, Streak>) {
    let specs: [(&str, Option<&str>, &str, Frequency, Option<NaiveTime>, u32); 3] = [
        (
            "Morning Tea Ritual",
            Some("A quiet cup before the day starts"),
            "mindfulness",
            Frequency::Daily,
            NaiveTime::from_hms_opt(7, 30, 0),
            5,
        ),
        (
            "Evening Walk",
            Some("Twenty minutes around the block"),
            "health",
            Frequency::Daily,
            NaiveTime::from_hms_opt(18, 0, 0),
            2,
        ),
        (
            "Read Before Bed",
            None,
            "personal",
            Frequency::Daily,
            None,
            0,
        ),
    ];

    let mut habits = Vec::new();
    let mut completions = Vec::new();
    let mut streaks = HashMap::new();

    for (name, description, category, frequency, reminder_time, run_length) in specs {
        let habit = Habit::new(
            None,
            name.to_string(),
            description.map(str::to_string),
            Some(category.to_string()),
            frequency.clone(),
            reminder_time,
        )
        .expect("demo habit is valid");

        // A run of completions ending yesterday, so today is still open
        let mut dates = BTreeSet::new();
        for offset in 1..=run_length {
            dates.insert(today - Duration::days(offset as i64));
        }

        for &date in &dates {
            completions.push(
                HabitCompletion::new(habit.id, None, date, None, today)
                    .expect("demo completion is valid"),
            );
        }

        streaks.insert(habit.id, Streak::recompute(habit.id, &habit.frequency, &dates, today));
        habits.push(habit);
    }

    (habits, completions, streaks)
}
