/// Persistence gateway for the remote habit service
///
/// This module defines the interface the local store uses to talk to the
/// backend: CRUD for habits plus the completion/uncompletion endpoints that
/// recompute streaks server-side. The gateway is an opaque collaborator with
/// network latency and failure modes; the store treats its streak values as
/// authoritative.

pub mod http;
pub mod memory;

// Re-export the concrete gateways
pub use http::*;
pub use memory::*;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::domain::{CompletionId, Habit, HabitCompletion, HabitId, HabitPatch, Streak, UserId};

/// Errors that can occur during gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gateway returned status {status} for {operation}")]
    Status { status: u16, operation: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Habit not found: {habit_id}")]
    HabitNotFound { habit_id: String },

    #[error("Gateway unavailable: {0}")]
    Unavailable(String),
}

/// Body of the per-habit completion and uncompletion requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteRequest {
    /// Calendar day being completed, serialized as YYYY-MM-DD
    pub date: NaiveDate,
}

/// Response from the completion endpoint
///
/// Carries the authoritative completion id (which replaces the store's
/// provisional one) and the server-recomputed current streak.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionReceipt {
    pub completion_id: CompletionId,
    pub streak: u32,
}

/// Response from the uncompletion endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UncompletionReceipt {
    /// Server-recomputed current streak after removal
    pub streak: u32,
    /// Most recent remaining completion date, if any
    pub last_completed_date: Option<NaiveDate>,
}

/// Trait defining the remote persistence interface
///
/// This trait allows swapping the HTTP gateway for the in-memory one (and
/// for test doubles) while keeping the store identical.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Load all active habits for a user
    async fn fetch_habits(&self, user: UserId) -> Result<Vec<Habit>, GatewayError>;

    /// Load completions on or after `since` for a user
    async fn fetch_completions(
        &self,
        user: UserId,
        since: NaiveDate,
    ) -> Result<Vec<HabitCompletion>, GatewayError>;

    /// Load all streak records for a user
    async fn fetch_streaks(&self, user: UserId) -> Result<Vec<Streak>, GatewayError>;

    /// Insert a new habit; returns the server-assigned record
    async fn insert_habit(&self, habit: &Habit) -> Result<Habit, GatewayError>;

    /// Apply a merge-patch to an existing habit
    async fn update_habit(&self, habit_id: HabitId, patch: &HabitPatch) -> Result<(), GatewayError>;

    /// Soft-delete a habit (sets the inactive flag, never destroys rows)
    async fn deactivate_habit(&self, habit_id: HabitId) -> Result<(), GatewayError>;

    /// Record a completion for (habit, date) and recompute the streak
    async fn complete(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
    ) -> Result<CompletionReceipt, GatewayError>;

    /// Remove the completion for (habit, date) and recompute the streak
    async fn uncomplete(
        &self,
        habit_id: HabitId,
        date: NaiveDate,
    ) -> Result<UncompletionReceipt, GatewayError>;
}
