use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{parse_timestamp, parse_uuid, Predicate};
use crate::db::DatabaseError;
use crate::models::*;

const DOCTOR_COLUMNS: &str = "id, doctor_name, gender, active, appointment_count, created_at";

pub fn insert_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO doctors (id, doctor_name, gender, active, appointment_count, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            doctor.id.to_string(),
            doctor.doctor_name,
            doctor.gender.map(|g| g.as_str()),
            doctor.active as i32,
            doctor.appointment_count,
            doctor.created_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )
    .map_err(DatabaseError::from_write)?;
    Ok(())
}

pub fn get_doctor(conn: &Connection, id: &Uuid) -> Result<Option<Doctor>, DatabaseError> {
    let row = conn
        .query_row(
            &format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = ?1"),
            params![id.to_string()],
            doctor_row_from_rusqlite,
        )
        .optional()?;

    row.map(doctor_from_row).transpose()
}

pub fn update_doctor(conn: &Connection, doctor: &Doctor) -> Result<(), DatabaseError> {
    let changed = conn
        .execute(
            "UPDATE doctors SET doctor_name = ?2, gender = ?3, active = ?4, appointment_count = ?5
             WHERE id = ?1",
            params![
                doctor.id.to_string(),
                doctor.doctor_name,
                doctor.gender.map(|g| g.as_str()),
                doctor.active as i32,
                doctor.appointment_count,
            ],
        )
        .map_err(DatabaseError::from_write)?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Doctor".into(),
            id: doctor.id.to_string(),
        });
    }
    Ok(())
}

pub fn set_doctor_appointment_count(
    conn: &Connection,
    id: &Uuid,
    count: i64,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE doctors SET appointment_count = ?1 WHERE id = ?2",
        params![count, id.to_string()],
    )?;
    Ok(())
}

pub fn delete_doctor(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM doctors WHERE id = ?1", params![id.to_string()])?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Doctor".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

fn doctor_predicate(filter: &DoctorFilter) -> Predicate {
    let predicate = Predicate::new().eq_opt("doctor_name", filter.doctor_name.clone());
    if filter.include_archived {
        predicate
    } else {
        predicate.eq("active", 1i64)
    }
}

/// Doctors matching the filter, in creation order. Archived doctors are
/// skipped unless `include_archived` is set.
pub fn find_doctors(conn: &Connection, filter: &DoctorFilter) -> Result<Vec<Doctor>, DatabaseError> {
    let predicate = doctor_predicate(filter);
    let mut stmt = conn.prepare(&format!(
        "SELECT {DOCTOR_COLUMNS} FROM doctors{} ORDER BY created_at ASC, rowid ASC",
        predicate.where_clause()
    ))?;

    let rows = stmt.query_map(predicate.params(), doctor_row_from_rusqlite)?;

    let mut doctors = Vec::new();
    for row in rows {
        doctors.push(doctor_from_row(row?)?);
    }
    Ok(doctors)
}

pub fn count_doctors(conn: &Connection, filter: &DoctorFilter) -> Result<i64, DatabaseError> {
    let predicate = doctor_predicate(filter);
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM doctors{}", predicate.where_clause()),
        predicate.params(),
        |row| row.get(0),
    )?;
    Ok(count)
}

// Internal row type for Doctor mapping
struct DoctorRow {
    id: String,
    doctor_name: String,
    gender: Option<String>,
    active: i32,
    appointment_count: i64,
    created_at: String,
}

fn doctor_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<DoctorRow, rusqlite::Error> {
    Ok(DoctorRow {
        id: row.get(0)?,
        doctor_name: row.get(1)?,
        gender: row.get(2)?,
        active: row.get(3)?,
        appointment_count: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn doctor_from_row(row: DoctorRow) -> Result<Doctor, DatabaseError> {
    Ok(Doctor {
        id: parse_uuid(&row.id)?,
        doctor_name: row.doctor_name,
        gender: row.gender.as_deref().map(Gender::from_str).transpose()?,
        active: row.active != 0,
        appointment_count: row.appointment_count,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn make_doctor(name: &str, active: bool) -> Doctor {
        Doctor {
            id: Uuid::new_v4(),
            doctor_name: name.into(),
            gender: Some(Gender::Male),
            active,
            appointment_count: 0,
            created_at: now_timestamp(),
        }
    }

    #[test]
    fn insert_and_get_doctor() {
        let conn = open_memory_database().unwrap();
        let doctor = make_doctor("Doctor 1", true);
        insert_doctor(&conn, &doctor).unwrap();

        assert_eq!(get_doctor(&conn, &doctor.id).unwrap(), Some(doctor));
    }

    #[test]
    fn archived_doctors_hidden_by_default() {
        let conn = open_memory_database().unwrap();
        insert_doctor(&conn, &make_doctor("Doctor 1", true)).unwrap();
        insert_doctor(&conn, &make_doctor("Doctor 2", false)).unwrap();

        let visible = find_doctors(&conn, &DoctorFilter::default()).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].doctor_name, "Doctor 1");

        let all = count_doctors(&conn, &DoctorFilter {
            include_archived: true,
            ..Default::default()
        }).unwrap();
        assert_eq!(all, 2);
    }

    #[test]
    fn doctor_names_need_not_be_unique() {
        let conn = open_memory_database().unwrap();
        insert_doctor(&conn, &make_doctor("Doctor 1", true)).unwrap();
        insert_doctor(&conn, &make_doctor("Doctor 1", true)).unwrap();

        let count = count_doctors(&conn, &DoctorFilter {
            doctor_name: Some("Doctor 1".into()),
            ..Default::default()
        }).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn update_doctor_persists_active_flag() {
        let conn = open_memory_database().unwrap();
        let mut doctor = make_doctor("Doctor 1", true);
        insert_doctor(&conn, &doctor).unwrap();

        doctor.active = false;
        update_doctor(&conn, &doctor).unwrap();

        let loaded = get_doctor(&conn, &doctor.id).unwrap().unwrap();
        assert!(!loaded.active);
    }

    #[test]
    fn delete_missing_doctor_not_found() {
        let conn = open_memory_database().unwrap();
        let err = delete_doctor(&conn, &Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
