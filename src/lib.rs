/// Public library interface for the Tea Time habit engine
///
/// This crate implements the client-side habit completion and streak engine:
/// an optimistic-update local state store over a remote persistence gateway,
/// and a polling reminder scheduler with snooze support. The `HabitEngine`
/// facade wires a store and scheduler together for embedding applications.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

// Internal modules
mod domain;
mod gateway;
mod local_store;
mod scheduler;
mod store;

// Re-export public modules and types
pub use domain::*;
pub use gateway::{
    CompleteRequest, CompletionReceipt, GatewayError, HttpGateway, InMemoryGateway,
    PersistenceGateway, UncompletionReceipt,
};
pub use local_store::{
    reminders_key, AccessibilitySettings, LocalStore, LocalStoreError, ACCESSIBILITY_KEY,
    ONBOARDING_KEY,
};
pub use scheduler::{
    HabitReminder, LogNotifier, Notification, Notifier, ReminderPatch, ReminderScheduler,
    DEFAULT_SNOOZE_OPTIONS,
};
pub use store::{HabitDraft, HabitStore, StoreEvent};

/// Errors that can occur while assembling the engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Local storage error: {0}")]
    LocalStore(#[from] LocalStoreError),

    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),
}

/// A wired-together habit store and reminder scheduler
///
/// Applications that want the two components pre-connected (store feeding
/// the scheduler's completion and streak lookups) construct one of these;
/// anything needing finer control builds the pieces directly.
pub struct HabitEngine {
    store: Arc<HabitStore>,
    scheduler: ReminderScheduler,
    local_store: LocalStore,
}

impl HabitEngine {
    /// Build a guest-mode engine backed by the fixed demo dataset
    pub fn demo(data_dir: Option<PathBuf>) -> Result<Self, EngineError> {
        let store = Arc::new(HabitStore::demo());
        Self::assemble(store, data_dir)
    }

    /// Build an engine connected to the remote service for a user
    pub fn connected(
        base_url: &str,
        user: UserId,
        data_dir: Option<PathBuf>,
    ) -> Result<Self, EngineError> {
        let gateway = Arc::new(HttpGateway::new(base_url)?);
        let store = Arc::new(HabitStore::connected(gateway, user));
        Self::assemble(store, data_dir)
    }

    fn assemble(store: Arc<HabitStore>, data_dir: Option<PathBuf>) -> Result<Self, EngineError> {
        let local_store = match data_dir {
            Some(dir) => LocalStore::open(dir)?,
            None => LocalStore::open_default()?,
        };

        tracing::info!(user = ?store.user_id(), "initializing habit engine");
        let scheduler = ReminderScheduler::new(
            store.clone(),
            Arc::new(LogNotifier),
            local_store.clone(),
        );

        Ok(Self { store, scheduler, local_store })
    }

    pub fn store(&self) -> &Arc<HabitStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &ReminderScheduler {
        &self.scheduler
    }

    pub fn local_store(&self) -> &LocalStore {
        &self.local_store
    }
}
