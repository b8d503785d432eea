//! Staged lifecycle shared by patients and appointments.
//!
//! `draft -> confirm -> done`, with `cancel` reachable from anywhere and
//! `draft` reopening anything. Every action is unconditional and
//! idempotent: the resulting state depends only on the action invoked.
//! Doctors do not carry this lifecycle; the `Staged` bound keeps the
//! actions from being called on them.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::error::HospitalError;
use crate::models::LifecycleState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    Confirm,
    Done,
    Draft,
    Cancel,
}

impl LifecycleAction {
    /// The state an action lands in, whatever the starting state.
    pub fn target(self) -> LifecycleState {
        match self {
            Self::Confirm => LifecycleState::Confirm,
            Self::Done => LifecycleState::Done,
            Self::Draft => LifecycleState::Draft,
            Self::Cancel => LifecycleState::Cancel,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Confirm => "action_confirm",
            Self::Done => "action_done",
            Self::Draft => "action_draft",
            Self::Cancel => "action_cancel",
        }
    }
}

impl LifecycleState {
    pub fn apply(self, action: LifecycleAction) -> LifecycleState {
        action.target()
    }

    pub fn confirm(self) -> LifecycleState {
        self.apply(LifecycleAction::Confirm)
    }

    pub fn done(self) -> LifecycleState {
        self.apply(LifecycleAction::Done)
    }

    pub fn draft(self) -> LifecycleState {
        self.apply(LifecycleAction::Draft)
    }

    pub fn cancel(self) -> LifecycleState {
        self.apply(LifecycleAction::Cancel)
    }
}

/// A record kind carrying a persisted `LifecycleState`.
pub trait Staged {
    const ENTITY: &'static str;

    fn load_state(conn: &Connection, id: &Uuid) -> Result<Option<LifecycleState>, DatabaseError>;

    fn store_state(conn: &Connection, id: &Uuid, state: LifecycleState) -> Result<(), DatabaseError>;

    /// Runs inside the transition's transaction, after the new state is stored.
    fn after_transition(
        _conn: &Connection,
        _id: &Uuid,
        _action: LifecycleAction,
    ) -> Result<(), HospitalError> {
        Ok(())
    }
}

/// Applies `action` to the stored record in one transaction and returns the new state.
pub fn run_action<T: Staged>(
    conn: &Connection,
    id: &Uuid,
    action: LifecycleAction,
) -> Result<LifecycleState, HospitalError> {
    let tx = conn.unchecked_transaction()?;

    let current = T::load_state(&tx, id)?.ok_or_else(|| HospitalError::NotFound {
        entity_type: T::ENTITY,
        id: id.to_string(),
    })?;
    let next = current.apply(action);

    T::store_state(&tx, id, next)?;
    T::after_transition(&tx, id, action)?;
    tx.commit()?;

    tracing::info!(
        entity = T::ENTITY,
        id = %id,
        action = action.as_str(),
        from = %current,
        to = %next,
        "Lifecycle transition"
    );
    Ok(next)
}

pub fn action_confirm<T: Staged>(conn: &Connection, id: &Uuid) -> Result<LifecycleState, HospitalError> {
    run_action::<T>(conn, id, LifecycleAction::Confirm)
}

pub fn action_done<T: Staged>(conn: &Connection, id: &Uuid) -> Result<LifecycleState, HospitalError> {
    run_action::<T>(conn, id, LifecycleAction::Done)
}

pub fn action_draft<T: Staged>(conn: &Connection, id: &Uuid) -> Result<LifecycleState, HospitalError> {
    run_action::<T>(conn, id, LifecycleAction::Draft)
}

pub fn action_cancel<T: Staged>(conn: &Connection, id: &Uuid) -> Result<LifecycleState, HospitalError> {
    run_action::<T>(conn, id, LifecycleAction::Cancel)
}
