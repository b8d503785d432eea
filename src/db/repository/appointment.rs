use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_optional_uuid, parse_timestamp, parse_uuid, Predicate};
use crate::db::DatabaseError;
use crate::models::*;

const APPOINTMENT_COLUMNS: &str =
    "id, name, patient_id, doctor_id, gender, note, state, created_at";

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO appointments (id, name, patient_id, doctor_id, gender, note, state, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            appt.id.to_string(),
            appt.name,
            appt.patient_id.map(|id| id.to_string()),
            appt.doctor_id.map(|id| id.to_string()),
            appt.gender.map(|g| g.as_str()),
            appt.note,
            appt.state.as_str(),
            appt.created_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(())
}

pub fn get_appointment(conn: &Connection, id: &Uuid) -> Result<Option<Appointment>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1"),
            params![id.to_string()],
            appointment_row_from_rusqlite,
        )
        .optional()?;

    row.map(appointment_from_row).transpose()
}

pub fn update_appointment(conn: &Connection, appt: &Appointment) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE appointments SET name = ?2, patient_id = ?3, doctor_id = ?4, gender = ?5,
             note = ?6, state = ?7
             WHERE id = ?1",
            params![
                appt.id.to_string(),
                appt.name,
                appt.patient_id.map(|id| id.to_string()),
                appt.doctor_id.map(|id| id.to_string()),
                appt.gender.map(|g| g.as_str()),
                appt.note,
                appt.state.as_str(),
            ],
        )
        .map_err(DatabaseError::from_write)?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: appt.id.to_string(),
        });
    }
    Ok(())
}

pub fn set_appointment_state(
    conn: &Connection,
    id: &Uuid,
    state: LifecycleState,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET state = ?1 WHERE id = ?2",
        params![state.as_str(), id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

pub fn delete_appointment(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute(
        "DELETE FROM appointments WHERE id = ?1",
        params![id.to_string()],
    )?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Appointment".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn appointment_predicate(filter: &AppointmentFilter) -> Predicate {
    Predicate::new()
        .eq_opt("patient_id", filter.patient_id.map(|id| id.to_string()))
        .eq_opt("doctor_id", filter.doctor_id.map(|id| id.to_string()))
        .eq_opt("state", filter.state.map(|s| s.as_str().to_string()))
}

/// Appointments matching the filter, in creation order.
pub fn find_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, DatabaseError> {
    let predicate = appointment_predicate(filter);
    let mut stmt = conn.prepare(&format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments{} ORDER BY created_at ASC, rowid ASC",
        predicate.where_clause()
    ))?;

    let rows = stmt.query_map(predicate.params(), appointment_row_from_rusqlite)?;

    let mut appts = Vec::new();
    for row in rows {
        appts.push(appointment_from_row(row?)?);
    }
    Ok(appts)
}

pub fn count_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<i64, DatabaseError> {
    let predicate = appointment_predicate(filter);
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM appointments{}", predicate.where_clause()),
        predicate.params(),
        |row| row.get(0),
    )?;
    Ok(count)
}

// Internal row type for Appointment mapping
struct AppointmentRow {
    id: String,
    name: String,
    patient_id: Option<String>,
    doctor_id: Option<String>,
    gender: Option<String>,
    note: Option<String>,
    state: String,
    created_at: String,
}

fn appointment_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<AppointmentRow, rusqlite::Error> {
    Ok(AppointmentRow {
        id: row.get(0)?,
        name: row.get(1)?,
        patient_id: row.get(2)?,
        doctor_id: row.get(3)?,
        gender: row.get(4)?,
        note: row.get(5)?,
        state: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    Ok(Appointment {
        id: parse_uuid(&row.id)?,
        name: row.name,
        patient_id: parse_optional_uuid(row.patient_id)?,
        doctor_id: parse_optional_uuid(row.doctor_id)?,
        gender: row.gender.as_deref().map(Gender::from_str).transpose()?,
        note: row.note,
        state: LifecycleState::from_str(&row.state)?,
        created_at: parse_timestamp(&row.created_at)?,
    })
}
