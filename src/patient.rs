//! Patient registry — creation, validated updates, deletion and the
//! derived appointment counter.
//!
//! Invariants held on every mutation path:
//! - `name` is unique across patients (case-sensitive, exact).
//! - `age` is unset or strictly positive.
//!
//! The manager pre-checks both to produce a descriptive validation error;
//! the schema's UNIQUE index and CHECK constraint back them up.

use rusqlite::Connection;
use uuid::Uuid;

use crate::config::NEW_PATIENT_NOTE;
use crate::db::repository;
use crate::db::DatabaseError;
use crate::error::HospitalError;
use crate::lifecycle::Staged;
use crate::models::*;

impl Staged for Patient {
    const ENTITY: &'static str = "Patient";

    fn load_state(conn: &Connection, id: &Uuid) -> Result<Option<LifecycleState>, DatabaseError> {
        Ok(repository::get_patient(conn, id)?.map(|p| p.state))
    }

    fn store_state(conn: &Connection, id: &Uuid, state: LifecycleState) -> Result<(), DatabaseError> {
        repository::set_patient_state(conn, id, state)
    }
}

// ═══════════════════════════════════════════
// Validation
// ═══════════════════════════════════════════

fn validate_name(conn: &Connection, name: &str, exclude_id: Option<Uuid>) -> Result<(), HospitalError> {
    if name.trim().is_empty() {
        return Err(HospitalError::validation("name", "Patient name is required"));
    }

    let clashes = repository::count_patients(conn, &PatientFilter {
        name: Some(name.to_string()),
        exclude_id,
        ..Default::default()
    })?;
    if clashes > 0 {
        return Err(HospitalError::validation(
            "name",
            format!("Name {name} already exists"),
        ));
    }
    Ok(())
}

fn validate_age(age: Option<i32>) -> Result<(), HospitalError> {
    match age {
        Some(age) if age <= 0 => Err(HospitalError::validation(
            "age",
            format!("Age must be greater than zero, got {age}"),
        )),
        _ => Ok(()),
    }
}

// ═══════════════════════════════════════════
// Operations
// ═══════════════════════════════════════════

/// Registers a patient in `draft`. An empty or missing note becomes
/// `"New Patient"`.
pub fn create_patient(conn: &Connection, input: &NewPatient) -> Result<Patient, HospitalError> {
    let tx = conn.unchecked_transaction()?;

    validate_name(&tx, &input.name, None)?;
    validate_age(input.age)?;

    let note = match input.note.as_deref() {
        Some(note) if !note.is_empty() => note.to_string(),
        _ => NEW_PATIENT_NOTE.to_string(),
    };

    let patient = Patient {
        id: Uuid::new_v4(),
        name: input.name.clone(),
        gender: input.gender,
        note,
        age: input.age,
        state: LifecycleState::Draft,
        appointment_count: 0,
        created_at: now_timestamp(),
    };
    repository::insert_patient(&tx, &patient)?;
    tx.commit()?;

    tracing::info!(patient_id = %patient.id, name = %patient.name, "Patient created");
    Ok(patient)
}

/// Applies a partial update under the same validations as creation.
/// On failure the stored record is left untouched.
pub fn write_patient(
    conn: &Connection,
    id: &Uuid,
    update: &PatientUpdate,
) -> Result<Patient, HospitalError> {
    let tx = conn.unchecked_transaction()?;

    let mut patient = require_patient(&tx, id)?;

    if let Some(name) = &update.name {
        validate_name(&tx, name, Some(*id))?;
        patient.name = name.clone();
    }
    if let Some(age) = update.age {
        validate_age(age)?;
        patient.age = age;
    }
    if let Some(gender) = update.gender {
        patient.gender = gender;
    }
    if let Some(note) = &update.note {
        patient.note = note.clone();
    }

    repository::update_patient(&tx, &patient)?;
    tx.commit()?;

    tracing::info!(patient_id = %id, "Patient updated");
    Ok(patient)
}

pub fn load_patient(conn: &Connection, id: &Uuid) -> Result<Patient, HospitalError> {
    require_patient(conn, id)
}

pub fn list_patients(conn: &Connection, filter: &PatientFilter) -> Result<Vec<Patient>, HospitalError> {
    Ok(repository::find_patients(conn, filter)?)
}

/// Deletes a patient. Appointments that referenced it keep existing with
/// the link cleared, and lose the gender / note mirrored from it.
pub fn unlink_patient(conn: &Connection, id: &Uuid) -> Result<(), HospitalError> {
    let tx = conn.unchecked_transaction()?;
    require_patient(&tx, id)?;

    let linked = repository::find_appointments(&tx, &AppointmentFilter {
        patient_id: Some(*id),
        ..Default::default()
    })?;
    for mut appt in linked {
        appt.patient_id = None;
        crate::appointment::onchange_patient_id(&tx, &mut appt)?;
        repository::update_appointment(&tx, &appt)?;
    }

    repository::delete_patient(&tx, id)?;
    tx.commit()?;

    tracing::info!(patient_id = %id, "Patient deleted");
    Ok(())
}

/// Re-counts appointments referencing this patient and stores the result.
pub fn recompute_appointment_count(conn: &Connection, id: &Uuid) -> Result<i64, HospitalError> {
    require_patient(conn, id)?;
    let count = repository::count_appointments(conn, &AppointmentFilter {
        patient_id: Some(*id),
        ..Default::default()
    })?;
    repository::set_patient_appointment_count(conn, id, count)?;

    tracing::debug!(patient_id = %id, count, "Recomputed patient appointment count");
    Ok(count)
}

fn require_patient(conn: &Connection, id: &Uuid) -> Result<Patient, HospitalError> {
    repository::get_patient(conn, id)?.ok_or_else(|| HospitalError::NotFound {
        entity_type: "Patient",
        id: id.to_string(),
    })
}
