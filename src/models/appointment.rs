use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Gender, LifecycleState};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub name: String,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    /// Mirrored from the linked patient; not authoritative.
    pub gender: Option<Gender>,
    /// Mirrored from the linked patient; not authoritative.
    pub note: Option<String>,
    pub state: LifecycleState,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewAppointment {
    pub name: Option<String>,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentUpdate {
    pub name: Option<String>,
    pub patient_id: Option<Option<Uuid>>,
    pub doctor_id: Option<Option<Uuid>>,
}
