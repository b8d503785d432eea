use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Gender, LifecycleState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub gender: Option<Gender>,
    pub note: String,
    pub age: Option<i32>,
    pub state: LifecycleState,
    pub appointment_count: i64,
    pub created_at: NaiveDateTime,
}

/// Fields accepted when registering a patient.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPatient {
    pub name: String,
    pub gender: Option<Gender>,
    pub note: Option<String>,
    pub age: Option<i32>,
}

/// Partial update. Outer `None` leaves a field untouched; `Some(None)`
/// clears an optional field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientUpdate {
    pub name: Option<String>,
    pub gender: Option<Option<Gender>>,
    pub note: Option<String>,
    pub age: Option<Option<i32>>,
}
