use uuid::Uuid;

use super::enums::LifecycleState;

#[derive(Debug, Default)]
pub struct PatientFilter {
    pub name: Option<String>,
    /// Excludes one record, e.g. the patient being validated.
    pub exclude_id: Option<Uuid>,
    pub state: Option<LifecycleState>,
}

#[derive(Debug, Default)]
pub struct DoctorFilter {
    pub doctor_name: Option<String>,
    pub include_archived: bool,
}

#[derive(Debug, Default)]
pub struct AppointmentFilter {
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub state: Option<LifecycleState>,
}
