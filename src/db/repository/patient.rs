use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid, Predicate};
use crate::db::DatabaseError;
use crate::models::*;

const PATIENT_COLUMNS: &str =
    "id, name, gender, note, age, state, appointment_count, created_at";

pub fn insert_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (id, name, gender, note, age, state, appointment_count, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            patient.id.to_string(),
            patient.name,
            patient.gender.map(|g| g.as_str()),
            patient.note,
            patient.age,
            patient.state.as_str(),
            patient.appointment_count,
            patient.created_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(())
}

pub fn get_patient(conn: &Connection, id: &Uuid) -> Result<Option<Patient>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
            params![id.to_string()],
            patient_row_from_rusqlite,
        )
        .optional()?;

    row.map(patient_from_row).transpose()
}

/// Overwrites every mutable column of an existing patient.
pub fn update_patient(conn: &Connection, patient: &Patient) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE patients SET name = ?2, gender = ?3, note = ?4, age = ?5, state = ?6,
             appointment_count = ?7
             WHERE id = ?1",
            params![
                patient.id.to_string(),
                patient.name,
                patient.gender.map(|g| g.as_str()),
                patient.note,
                patient.age,
                patient.state.as_str(),
                patient.appointment_count,
            ],
        )
        .map_err(DatabaseError::from_write)?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: patient.id.to_string(),
        });
    }
    Ok(())
}

pub fn set_patient_state(
    conn: &Connection,
    id: &Uuid,
    state: LifecycleState,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE patients SET state = ?1 WHERE id = ?2",
        params![state.as_str(), id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn set_patient_appointment_count(
    conn: &Connection,
    id: &Uuid,
    count: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE patients SET appointment_count = ?1 WHERE id = ?2",
        params![count, id.to_string()],
    )?;
    Ok(())
}

pub fn delete_patient(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM patients WHERE id = ?1", params![id.to_string()])?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Patient".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn patient_predicate(filter: &PatientFilter) -> Predicate {
    Predicate::new()
        .eq_opt("name", filter.name.clone())
        .ne_opt("id", filter.exclude_id.map(|id| id.to_string()))
        .eq_opt("state", filter.state.map(|s| s.as_str().to_string()))
}

/// Patients matching the filter, in creation order.
pub fn find_patients(conn: &Connection, filter: &PatientFilter) -> Result<Vec<Patient>, DatabaseError> {
    let predicate = patient_predicate(filter);
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients{} ORDER BY created_at ASC, rowid ASC",
        predicate.where_clause()
    ))?;

    let rows = stmt.query_map(predicate.params(), patient_row_from_rusqlite)?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

pub fn count_patients(conn: &Connection, filter: &PatientFilter) -> Result<i64, DatabaseError> {
    let predicate = patient_predicate(filter);
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM patients{}", predicate.where_clause()),
        predicate.params(),
        |row| row.get(0),
    )?;
    Ok(count)
}

// Internal row type for Patient mapping
struct PatientRow {
    id: String,
    name: String,
    gender: Option<String>,
    note: String,
    age: Option<i32>,
    state: String,
    appointment_count: i64,
    created_at: String,
}

fn patient_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<PatientRow, rusqlite::Error> {
    Ok(PatientRow {
        id: row.get(0)?,
        name: row.get(1)?,
        gender: row.get(2)?,
        note: row.get(3)?,
        age: row.get(4)?,
        state: row.get(5)?,
        appointment_count: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: parse_uuid(&row.id)?,
        name: row.name,
        gender: row.gender.as_deref().map(Gender::from_str).transpose()?,
        note: row.note,
        age: row.age,
        state: LifecycleState::from_str(&row.state)?,
        appointment_count: row.appointment_count,
        created_at: parse_timestamp(&row.created_at)?,
    })
}
