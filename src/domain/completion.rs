/// HabitCompletion entity for tracking habit completions
///
/// This module defines the HabitCompletion struct that represents a single
/// instance of completing a habit on a specific calendar day, with optional
/// free-text notes.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use crate::domain::{CompletionId, DomainError, HabitId, UserId};

/// A record of completing a habit on a specific day
///
/// There is at most one completion per (habit, date) pair - completion is
/// idempotent per day. The store mints a provisional id for optimistic
/// appends; the gateway's authoritative id replaces it on reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HabitCompletion {
    /// Unique identifier for this completion
    pub id: CompletionId,
    /// Which habit this completion is for
    pub habit_id: HabitId,
    /// Owning user; None in demo mode
    pub user_id: Option<UserId>,
    /// Which calendar day this completion is for (day granularity)
    pub completed_date: NaiveDate,
    /// User's notes about this completion
    pub notes: Option<String>,
    /// When this record was created locally
    pub logged_at: DateTime<Utc>,
}

impl HabitCompletion {
    /// Create a new completion with validation
    ///
    /// The logged_at timestamp is set to the current time; `today` anchors
    /// the future-date check so callers control the clock.
    pub fn new(
        habit_id: HabitId,
        user_id: Option<UserId>,
        completed_date: NaiveDate,
        notes: Option<String>,
        today: NaiveDate,
    ) -> Result<Self, DomainError> {
        Self::validate_date(completed_date, today)?;
        Self::validate_notes(&notes)?;

        Ok(Self {
            id: CompletionId::new(),
            habit_id,
            user_id,
            completed_date,
            notes,
            logged_at: Utc::now(),
        })
    }

    // Validation helper methods

    /// Completions cannot be logged for future dates
    fn validate_date(date: NaiveDate, today: NaiveDate) -> Result<(), DomainError> {
        if date > today {
            return Err(DomainError::InvalidDate(
                "Cannot complete a habit for a future date".to_string()
            ));
        }
        Ok(())
    }

    /// Validate the optional notes field
    fn validate_notes(notes: &Option<String>) -> Result<(), DomainError> {
        if let Some(note_text) = notes {
            if note_text.len() > 500 {
                return Err(DomainError::Validation {
                    message: "Notes cannot be longer than 500 characters".to_string()
                });
            }
        }
        Ok(())
    }
}
