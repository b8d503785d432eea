//! Doctor registry — creation, duplication, archiving and the derived
//! appointment counter. Doctors have no staged lifecycle; `active` is
//! their only status.

use rusqlite::Connection;
use uuid::Uuid;

use crate::config::copy_name;
use crate::db::repository;
use crate::error::HospitalError;
use crate::models::*;

fn validate_doctor_name(name: &str) -> Result<(), HospitalError> {
    if name.trim().is_empty() {
        return Err(HospitalError::validation("doctor_name", "Doctor name is required"));
    }
    Ok(())
}

/// Registers a doctor; `active` defaults to true.
pub fn create_doctor(conn: &Connection, input: &NewDoctor) -> Result<Doctor, HospitalError> {
    validate_doctor_name(&input.doctor_name)?;

    let doctor = Doctor {
        id: Uuid::new_v4(),
        doctor_name: input.doctor_name.clone(),
        gender: input.gender,
        active: input.active.unwrap_or(true),
        appointment_count: 0,
        created_at: now_timestamp(),
    };
    repository::insert_doctor(conn, &doctor)?;

    tracing::info!(doctor_id = %doctor.id, name = %doctor.doctor_name, "Doctor created");
    Ok(doctor)
}

pub fn write_doctor(
    conn: &Connection,
    id: &Uuid,
    update: &DoctorUpdate,
) -> Result<Doctor, HospitalError> {
    let tx = conn.unchecked_transaction()?;
    let mut doctor = require_doctor(&tx, id)?;

    if let Some(name) = &update.doctor_name {
        validate_doctor_name(name)?;
        doctor.doctor_name = name.clone();
    }
    if let Some(gender) = update.gender {
        doctor.gender = gender;
    }

    repository::update_doctor(&tx, &doctor)?;
    tx.commit()?;

    tracing::info!(doctor_id = %id, "Doctor updated");
    Ok(doctor)
}

/// Copies a doctor under a fresh id, naming it `"<name> (Copy)"`.
///
/// The copy starts with no appointments, so its counter is zero.
pub fn duplicate_doctor(conn: &Connection, id: &Uuid) -> Result<Doctor, HospitalError> {
    let source = require_doctor(conn, id)?;

    let copy = Doctor {
        id: Uuid::new_v4(),
        doctor_name: copy_name(&source.doctor_name),
        appointment_count: 0,
        created_at: now_timestamp(),
        ..source
    };
    repository::insert_doctor(conn, &copy)?;

    tracing::info!(source_id = %id, doctor_id = %copy.id, "Doctor duplicated");
    Ok(copy)
}

pub fn archive_doctor(conn: &Connection, id: &Uuid) -> Result<Doctor, HospitalError> {
    set_active(conn, id, false)
}

pub fn unarchive_doctor(conn: &Connection, id: &Uuid) -> Result<Doctor, HospitalError> {
    set_active(conn, id, true)
}

fn set_active(conn: &Connection, id: &Uuid, active: bool) -> Result<Doctor, HospitalError> {
    let tx = conn.unchecked_transaction()?;
    let mut doctor = require_doctor(&tx, id)?;
    doctor.active = active;
    repository::update_doctor(&tx, &doctor)?;
    tx.commit()?;

    tracing::info!(doctor_id = %id, active, "Doctor active flag changed");
    Ok(doctor)
}

pub fn load_doctor(conn: &Connection, id: &Uuid) -> Result<Doctor, HospitalError> {
    require_doctor(conn, id)
}

/// Lists doctors; archived ones only when the filter asks for them.
pub fn list_doctors(conn: &Connection, filter: &DoctorFilter) -> Result<Vec<Doctor>, HospitalError> {
    Ok(repository::find_doctors(conn, filter)?)
}

/// Deletes a doctor. Appointments that referenced it keep existing with
/// the link cleared.
pub fn unlink_doctor(conn: &Connection, id: &Uuid) -> Result<(), HospitalError> {
    let tx = conn.unchecked_transaction()?;
    require_doctor(&tx, id)?;
    repository::delete_doctor(&tx, id)?;
    tx.commit()?;

    tracing::info!(doctor_id = %id, "Doctor deleted");
    Ok(())
}

/// Re-counts appointments referencing this doctor and stores the result.
pub fn recompute_appointment_count(conn: &Connection, id: &Uuid) -> Result<i64, HospitalError> {
    require_doctor(conn, id)?;
    let count = repository::count_appointments(conn, &AppointmentFilter {
        doctor_id: Some(*id),
        ..Default::default()
    })?;
    repository::set_doctor_appointment_count(conn, id, count)?;

    tracing::debug!(doctor_id = %id, count, "Recomputed doctor appointment count");
    Ok(count)
}

fn require_doctor(conn: &Connection, id: &Uuid) -> Result<Doctor, HospitalError> {
    repository::get_doctor(conn, id)?.ok_or_else(|| HospitalError::NotFound {
        entity_type: "Doctor",
        id: id.to_string(),
    })
}
