use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::Gender;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub doctor_name: String,
    pub gender: Option<Gender>,
    pub active: bool,
    pub appointment_count: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDoctor {
    pub doctor_name: String,
    pub gender: Option<Gender>,
    /// Defaults to `true` when omitted.
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DoctorUpdate {
    pub doctor_name: Option<String>,
    pub gender: Option<Option<Gender>>,
}
