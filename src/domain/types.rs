/// Core types and enums used throughout the domain layer
///
/// This module defines the fundamental types like Frequency and the ID
/// newtypes that are used by Habit, HabitCompletion, and other domain
/// entities.

use serde::{Deserialize, Serialize};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Unique identifier for a habit
///
/// This is a wrapper around UUID to provide type safety - you can't
/// accidentally pass a habit ID where a completion ID is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HabitId(pub Uuid);

impl HabitId {
    /// Generate a new random habit ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a habit ID from a string (useful when loading from the gateway)
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for HabitId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for HabitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a completion record
///
/// Similar to HabitId but for individual habit completion facts. The store
/// mints provisional ids for optimistic completions; the gateway replaces
/// them with its authoritative id on reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompletionId(pub Uuid);

impl CompletionId {
    /// Generate a new random completion ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a completion ID from a string
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl std::fmt::Display for CompletionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a user account
///
/// A store running without a UserId is in demo mode and never touches the
/// gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Day-of-week index with Sunday = 0 through Saturday = 6
///
/// The wire format and the reminder configuration both use this convention,
/// so it is the single weekday representation in the engine.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// How often a habit is expected to be performed
///
/// Daily habits are expected every day; target-day habits only on the listed
/// weekday indices. The frequency drives both streak recomputation and
/// reminder scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "days", rename_all = "snake_case")]
pub enum Frequency {
    /// Every single day
    Daily,
    /// Only on the given weekday indices (0 = Sunday .. 6 = Saturday)
    TargetDays(BTreeSet<u8>),
}

impl Frequency {
    /// Validate that a frequency value is reasonable
    pub fn validate(&self) -> Result<(), crate::domain::DomainError> {
        match self {
            Frequency::Daily => Ok(()),
            Frequency::TargetDays(days) => {
                if days.is_empty() {
                    return Err(crate::domain::DomainError::InvalidFrequency(
                        "Target days must specify at least one day".to_string()
                    ));
                }
                if let Some(bad) = days.iter().find(|d| **d > 6) {
                    return Err(crate::domain::DomainError::InvalidFrequency(
                        format!("Weekday index must be 0-6, got {}", bad)
                    ));
                }
                Ok(())
            }
        }
    }

    /// Check if this frequency expects the habit to be done on a given date
    pub fn is_scheduled_on(&self, date: NaiveDate) -> bool {
        match self {
            Frequency::Daily => true,
            Frequency::TargetDays(days) => days.contains(&weekday_index(date)),
        }
    }

    /// The most recent scheduled date strictly before `date`
    ///
    /// For daily habits this is simply the previous day. Target-day habits
    /// step back at most a week.
    pub fn previous_scheduled_before(&self, date: NaiveDate) -> NaiveDate {
        let mut candidate = date - chrono::Duration::days(1);
        for _ in 0..7 {
            if self.is_scheduled_on(candidate) {
                break;
            }
            candidate -= chrono::Duration::days(1);
        }
        candidate
    }
}
