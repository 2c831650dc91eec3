/// Habit entity and related functionality
///
/// This module defines the core Habit struct that represents a habit a user
/// wants to track, along with validation and the merge-patch used by the
/// store's optimistic edit path.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveTime, Utc};
use crate::domain::{DomainError, Frequency, HabitId, UserId};

/// A habit represents something the user wants to do regularly
///
/// This is the core entity in the engine. Each habit has a name, a free-form
/// category tag, a frequency (every day or specific weekdays), and optional
/// display and reminder metadata. Inactive habits are soft-deleted: they are
/// excluded from scheduling and default queries but never physically removed
/// while completions reference them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    /// Unique identifier for this habit
    pub id: HabitId,
    /// Owning user; None for demo-mode habits that never touch the gateway
    pub user_id: Option<UserId>,
    /// Display name (e.g., "Morning Run", "Read for 30min")
    pub name: String,
    /// Optional detailed description
    pub description: Option<String>,
    /// Free-form category tag for organization
    pub category: Option<String>,
    /// How often this habit is expected to be performed
    pub frequency: Frequency,
    /// Preferred local reminder time, minute granularity
    pub reminder_time: Option<NaiveTime>,
    /// Display color (hex string, purely presentational)
    pub color: Option<String>,
    /// Display icon name (purely presentational)
    pub icon: Option<String>,
    /// Whether this habit is currently active (false = soft-deleted)
    pub is_active: bool,
    /// When this habit was created
    pub created_at: DateTime<Utc>,
}

impl Habit {
    /// Create a new habit with validation
    ///
    /// This is the main constructor that validates all fields and returns
    /// an error if any validation fails.
    pub fn new(
        user_id: Option<UserId>,
        name: String,
        description: Option<String>,
        category: Option<String>,
        frequency: Frequency,
        reminder_time: Option<NaiveTime>,
    ) -> Result<Self, DomainError> {
        Self::validate_name(&name)?;
        Self::validate_description(&description)?;
        frequency.validate()?;

        Ok(Self {
            id: HabitId::new(),
            user_id,
            name,
            description,
            category,
            frequency,
            reminder_time,
            color: None,
            icon: None,
            is_active: true,
            created_at: Utc::now(),
        })
    }

    /// Apply a merge-patch to this habit with validation
    ///
    /// Used by the store's edit path: fields present in the patch replace the
    /// current values, absent fields are left untouched. All validation rules
    /// are checked before anything is applied.
    pub fn apply_patch(&mut self, patch: &HabitPatch) -> Result<(), DomainError> {
        if let Some(ref new_name) = patch.name {
            Self::validate_name(new_name)?;
        }
        if let Some(ref new_desc) = patch.description {
            Self::validate_description(new_desc)?;
        }
        if let Some(ref new_freq) = patch.frequency {
            new_freq.validate()?;
        }

        if let Some(name) = patch.name.clone() {
            self.name = name;
        }
        if let Some(description) = patch.description.clone() {
            self.description = description;
        }
        if let Some(category) = patch.category.clone() {
            self.category = category;
        }
        if let Some(frequency) = patch.frequency.clone() {
            self.frequency = frequency;
        }
        if let Some(reminder_time) = patch.reminder_time {
            self.reminder_time = reminder_time;
        }
        if let Some(color) = patch.color.clone() {
            self.color = color;
        }
        if let Some(icon) = patch.icon.clone() {
            self.icon = icon;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }

        Ok(())
    }

    /// Whether the store created this habit without a backing gateway row
    pub fn is_demo(&self) -> bool {
        self.user_id.is_none()
    }

    // Validation helper methods

    /// Validate habit name according to business rules
    fn validate_name(name: &str) -> Result<(), DomainError> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be empty".to_string()
            ));
        }

        if trimmed.len() > 100 {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be longer than 100 characters".to_string()
            ));
        }

        Ok(())
    }

    /// Validate optional description
    fn validate_description(description: &Option<String>) -> Result<(), DomainError> {
        if let Some(desc) = description {
            if desc.len() > 500 {
                return Err(DomainError::Validation {
                    message: "Description cannot be longer than 500 characters".to_string()
                });
            }
        }
        Ok(())
    }
}

/// Partial update for a habit
///
/// Outer Option = "is this field being changed"; for the optional habit
/// fields the inner Option distinguishes "set to value" from "clear".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HabitPatch {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub frequency: Option<Frequency>,
    pub reminder_time: Option<Option<NaiveTime>>,
    pub color: Option<Option<String>>,
    pub icon: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl HabitPatch {
    /// Patch that only renames the habit
    pub fn rename(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), ..Self::default() }
    }

    /// Patch that soft-deletes the habit
    pub fn deactivate() -> Self {
        Self { is_active: Some(false), ..Self::default() }
    }
}
