//! Appointment book — links one patient and one doctor.
//!
//! The patient's `gender` and `note` are mirrored onto the appointment
//! whenever the patient link is set or changed (see `cascade_from_patient`).
//! Creating, relinking or deleting an appointment recomputes the
//! `appointment_count` of every patient and doctor involved, inside the
//! same transaction. A `done` appointment cannot be deleted.

use rusqlite::Connection;
use uuid::Uuid;

use crate::config::{APPOINTMENT_SENTINEL_NAME, APPOINTMENT_SEQUENCE_CODE};
use crate::db::repository;
use crate::db::DatabaseError;
use crate::error::HospitalError;
use crate::lifecycle::{LifecycleAction, Staged};
use crate::models::*;
use crate::{doctor, patient};

impl Staged for Appointment {
    const ENTITY: &'static str = "Appointment";

    fn load_state(conn: &Connection, id: &Uuid) -> Result<Option<LifecycleState>, DatabaseError> {
        Ok(repository::get_appointment(conn, id)?.map(|a| a.state))
    }

    fn store_state(conn: &Connection, id: &Uuid, state: LifecycleState) -> Result<(), DatabaseError> {
        repository::set_appointment_state(conn, id, state)
    }

    /// Confirming an appointment still named `"New"` gives it the next
    /// reference from the appointment sequence.
    fn after_transition(
        conn: &Connection,
        id: &Uuid,
        action: LifecycleAction,
    ) -> Result<(), HospitalError> {
        if action != LifecycleAction::Confirm {
            return Ok(());
        }
        let mut appt = require_appointment(conn, id)?;
        if appt.name != APPOINTMENT_SENTINEL_NAME {
            return Ok(());
        }
        appt.name = repository::next_sequence_value(conn, APPOINTMENT_SEQUENCE_CODE)?;
        repository::update_appointment(conn, &appt)?;

        tracing::info!(appointment_id = %id, reference = %appt.name, "Appointment reference assigned");
        Ok(())
    }
}

// ═══════════════════════════════════════════
// Patient cascade
// ═══════════════════════════════════════════

/// The `(gender, note)` an appointment mirrors from its patient; both
/// empty when no patient is linked.
pub fn cascade_from_patient(patient: Option<&Patient>) -> (Option<Gender>, Option<String>) {
    match patient {
        Some(p) => (p.gender, Some(p.note.clone())),
        None => (None, None),
    }
}

/// Refreshes `gender` / `note` on an in-memory appointment from the
/// patient it currently points to. Does not persist anything.
pub fn onchange_patient_id(conn: &Connection, appt: &mut Appointment) -> Result<(), HospitalError> {
    let linked = match appt.patient_id {
        Some(patient_id) => Some(patient::load_patient(conn, &patient_id)?),
        None => None,
    };
    let (gender, note) = cascade_from_patient(linked.as_ref());
    appt.gender = gender;
    appt.note = note;

    tracing::debug!(appointment_id = %appt.id, patient_id = ?appt.patient_id, "Patient fields cascaded");
    Ok(())
}

/// Re-applies the patient cascade to a stored appointment and persists it.
pub fn sync_patient_fields(conn: &Connection, id: &Uuid) -> Result<Appointment, HospitalError> {
    let tx = conn.unchecked_transaction()?;
    let mut appt = require_appointment(&tx, id)?;
    onchange_patient_id(&tx, &mut appt)?;
    repository::update_appointment(&tx, &appt)?;
    tx.commit()?;
    Ok(appt)
}

// ═══════════════════════════════════════════
// Operations
// ═══════════════════════════════════════════

/// An unset or empty name falls back to the `"New"` sentinel.
fn appointment_name(name: Option<&str>) -> String {
    match name {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => APPOINTMENT_SENTINEL_NAME.to_string(),
    }
}

/// Books an appointment in `draft`, named `"New"` unless a name is given.
pub fn create_appointment(
    conn: &Connection,
    input: &NewAppointment,
) -> Result<Appointment, HospitalError> {
    let tx = conn.unchecked_transaction()?;

    let mut appt = Appointment {
        id: Uuid::new_v4(),
        name: appointment_name(input.name.as_deref()),
        patient_id: input.patient_id,
        doctor_id: input.doctor_id,
        gender: None,
        note: None,
        state: LifecycleState::Draft,
        created_at: now_timestamp(),
    };
    onchange_patient_id(&tx, &mut appt)?;
    if let Some(doctor_id) = appt.doctor_id {
        doctor::load_doctor(&tx, &doctor_id)?;
    }

    repository::insert_appointment(&tx, &appt)?;
    recompute_counters(&tx, &[appt.patient_id], &[appt.doctor_id])?;
    tx.commit()?;

    tracing::info!(
        appointment_id = %appt.id,
        name = %appt.name,
        patient_id = ?appt.patient_id,
        doctor_id = ?appt.doctor_id,
        "Appointment created"
    );
    Ok(appt)
}

/// Updates name and links. A patient change in the patch re-runs the
/// cascade; any link change recomputes counters on old and new targets.
pub fn write_appointment(
    conn: &Connection,
    id: &Uuid,
    update: &AppointmentUpdate,
) -> Result<Appointment, HospitalError> {
    let tx = conn.unchecked_transaction()?;

    let mut appt = require_appointment(&tx, id)?;
    let previous_patient = appt.patient_id;
    let previous_doctor = appt.doctor_id;

    if let Some(name) = update.name.as_deref() {
        appt.name = appointment_name(Some(name));
    }
    if let Some(doctor_id) = update.doctor_id {
        if let Some(doctor_id) = doctor_id {
            doctor::load_doctor(&tx, &doctor_id)?;
        }
        appt.doctor_id = doctor_id;
    }
    if let Some(patient_id) = update.patient_id {
        appt.patient_id = patient_id;
        onchange_patient_id(&tx, &mut appt)?;
    }

    repository::update_appointment(&tx, &appt)?;
    recompute_counters(
        &tx,
        &[previous_patient, appt.patient_id],
        &[previous_doctor, appt.doctor_id],
    )?;
    tx.commit()?;

    tracing::info!(appointment_id = %id, "Appointment updated");
    Ok(appt)
}

/// Deletes an appointment unless it is `done`; move it back to `draft`
/// first to remove it.
pub fn unlink_appointment(conn: &Connection, id: &Uuid) -> Result<(), HospitalError> {
    let tx = conn.unchecked_transaction()?;

    let appt = require_appointment(&tx, id)?;
    if appt.state == LifecycleState::Done {
        return Err(HospitalError::validation(
            "state",
            format!("You cannot delete appointment {} in done state", appt.name),
        ));
    }

    repository::delete_appointment(&tx, id)?;
    recompute_counters(&tx, &[appt.patient_id], &[appt.doctor_id])?;
    tx.commit()?;

    tracing::info!(appointment_id = %id, name = %appt.name, "Appointment deleted");
    Ok(())
}

pub fn load_appointment(conn: &Connection, id: &Uuid) -> Result<Appointment, HospitalError> {
    require_appointment(conn, id)
}

pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> Result<Vec<Appointment>, HospitalError> {
    Ok(repository::find_appointments(conn, filter)?)
}

/// Recomputes counters for each distinct linked patient and doctor.
fn recompute_counters(
    conn: &Connection,
    patients: &[Option<Uuid>],
    doctors: &[Option<Uuid>],
) -> Result<(), HospitalError> {
    let mut seen: Vec<Uuid> = Vec::new();
    for patient_id in patients.iter().flatten() {
        if !seen.contains(patient_id) {
            patient::recompute_appointment_count(conn, patient_id)?;
            seen.push(*patient_id);
        }
    }
    seen.clear();
    for doctor_id in doctors.iter().flatten() {
        if !seen.contains(doctor_id) {
            doctor::recompute_appointment_count(conn, doctor_id)?;
            seen.push(*doctor_id);
        }
    }
    Ok(())
}

fn require_appointment(conn: &Connection, id: &Uuid) -> Result<Appointment, HospitalError> {
    repository::get_appointment(conn, id)?.ok_or_else(|| HospitalError::NotFound {
        entity_type: "Appointment",
        id: id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::lifecycle::{action_cancel, action_confirm, action_done, action_draft};

    struct Fixture {
        conn: Connection,
        patient: Patient,
        doctor: Doctor,
        appointment: Appointment,
    }

    fn setup_db() -> Fixture {
        let conn = open_memory_database().expect("open_memory_database");

        let patient = patient::create_patient(&conn, &NewPatient {
            name: "Patient 1".into(),
            note: Some("Test patient note".into()),
            gender: Some(Gender::Female),
            age: None,
        }).unwrap();

        let doctor = doctor::create_doctor(&conn, &NewDoctor {
            doctor_name: "Doctor 1".into(),
            gender: Some(Gender::Male),
            active: Some(true),
        }).unwrap();

        let appointment = create_appointment(&conn, &NewAppointment {
            name: Some("Appt 1".into()),
            patient_id: Some(patient.id),
            doctor_id: Some(doctor.id),
        }).unwrap();

        Fixture { conn, patient, doctor, appointment }
    }

    fn add_patient(conn: &Connection, name: &str, gender: Gender, note: &str) -> Patient {
        patient::create_patient(conn, &NewPatient {
            name: name.into(),
            gender: Some(gender),
            note: Some(note.into()),
            age: Some(40),
        }).unwrap()
    }

    #[test]
    fn create_cascades_patient_fields() {
        let f = setup_db();
        assert_eq!(f.appointment.gender, Some(Gender::Female));
        assert_eq!(f.appointment.note.as_deref(), Some("Test patient note"));
        assert_eq!(f.appointment.state, LifecycleState::Draft);

        let stored = load_appointment(&f.conn, &f.appointment.id).unwrap();
        assert_eq!(stored, f.appointment);
    }

    #[test]
    fn name_defaults_to_sentinel() {
        let f = setup_db();
        let appt = create_appointment(&f.conn, &NewAppointment::default()).unwrap();
        assert_eq!(appt.name, "New");
        assert_eq!(appt.gender, None);
        assert_eq!(appt.note, None);
    }

    #[test]
    fn onchange_patient_id_copies_gender_and_note() {
        let f = setup_db();
        let mut appt = f.appointment.clone();
        appt.gender = None;
        appt.note = Some("stale".into());

        onchange_patient_id(&f.conn, &mut appt).unwrap();
        assert_eq!(appt.gender, f.patient.gender);
        assert_eq!(appt.note.as_deref(), Some(f.patient.note.as_str()));
        assert_eq!(appt.gender, Some(Gender::Female));
        assert_eq!(appt.note.as_deref(), Some("Test patient note"));
    }

    #[test]
    fn onchange_patient_id_is_idempotent() {
        let f = setup_db();
        let mut once = f.appointment.clone();
        onchange_patient_id(&f.conn, &mut once).unwrap();
        let mut twice = once.clone();
        onchange_patient_id(&f.conn, &mut twice).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn onchange_with_cleared_patient_empties_fields() {
        let f = setup_db();
        let mut appt = f.appointment.clone();
        appt.patient_id = None;

        onchange_patient_id(&f.conn, &mut appt).unwrap();
        assert_eq!(appt.gender, None);
        assert_eq!(appt.note, None);

        // Preview only: the stored record still mirrors the patient
        let stored = load_appointment(&f.conn, &f.appointment.id).unwrap();
        assert_eq!(stored.patient_id, Some(f.patient.id));
        assert_eq!(stored.gender, Some(Gender::Female));
    }

    #[test]
    fn cascade_from_patient_is_pure() {
        let f = setup_db();
        assert_eq!(
            cascade_from_patient(Some(&f.patient)),
            (Some(Gender::Female), Some("Test patient note".to_string()))
        );
        assert_eq!(cascade_from_patient(None), (None, None));
    }

    #[test]
    fn appointment_unlink_validation_error() {
        let f = setup_db();
        action_done::<Appointment>(&f.conn, &f.appointment.id).unwrap();

        let err = unlink_appointment(&f.conn, &f.appointment.id).unwrap_err();
        match err {
            HospitalError::Validation { field, message } => {
                assert_eq!(field, "state");
                assert!(message.contains("Appt 1"));
            }
            other => panic!("expected validation error, got {other}"),
        }
        assert!(load_appointment(&f.conn, &f.appointment.id).is_ok());
        assert_eq!(doctor::load_doctor(&f.conn, &f.doctor.id).unwrap().appointment_count, 1);
    }

    #[test]
    fn done_appointment_deletable_after_reset_to_draft() {
        let f = setup_db();
        action_done::<Appointment>(&f.conn, &f.appointment.id).unwrap();
        action_draft::<Appointment>(&f.conn, &f.appointment.id).unwrap();

        unlink_appointment(&f.conn, &f.appointment.id).unwrap();
        assert!(matches!(
            load_appointment(&f.conn, &f.appointment.id).unwrap_err(),
            HospitalError::NotFound { .. }
        ));
    }

    #[test]
    fn cancelled_appointment_is_deletable() {
        let f = setup_db();
        action_cancel::<Appointment>(&f.conn, &f.appointment.id).unwrap();
        assert!(unlink_appointment(&f.conn, &f.appointment.id).is_ok());
    }

    #[test]
    fn unlink_missing_appointment_not_found() {
        let f = setup_db();
        let err = unlink_appointment(&f.conn, &Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, HospitalError::NotFound { entity_type: "Appointment", .. }));
    }

    #[test]
    fn action_confirm_appointment() {
        let f = setup_db();
        let id = f.appointment.id;

        action_confirm::<Appointment>(&f.conn, &id).unwrap();
        assert_eq!(load_appointment(&f.conn, &id).unwrap().state, LifecycleState::Confirm);

        action_done::<Appointment>(&f.conn, &id).unwrap();
        assert_eq!(load_appointment(&f.conn, &id).unwrap().state, LifecycleState::Done);

        action_draft::<Appointment>(&f.conn, &id).unwrap();
        assert_eq!(load_appointment(&f.conn, &id).unwrap().state, LifecycleState::Draft);

        action_cancel::<Appointment>(&f.conn, &id).unwrap();
        assert_eq!(load_appointment(&f.conn, &id).unwrap().state, LifecycleState::Cancel);
    }

    #[test]
    fn confirm_keeps_supplied_name() {
        let f = setup_db();
        action_confirm::<Appointment>(&f.conn, &f.appointment.id).unwrap();
        assert_eq!(load_appointment(&f.conn, &f.appointment.id).unwrap().name, "Appt 1");
    }

    #[test]
    fn confirm_assigns_reference_to_sentinel_name() {
        let f = setup_db();
        let a = create_appointment(&f.conn, &NewAppointment::default()).unwrap();
        let b = create_appointment(&f.conn, &NewAppointment::default()).unwrap();

        action_confirm::<Appointment>(&f.conn, &a.id).unwrap();
        action_confirm::<Appointment>(&f.conn, &b.id).unwrap();
        assert_eq!(load_appointment(&f.conn, &a.id).unwrap().name, "APT00001");
        assert_eq!(load_appointment(&f.conn, &b.id).unwrap().name, "APT00002");

        // A second confirm does not draw again
        action_confirm::<Appointment>(&f.conn, &a.id).unwrap();
        assert_eq!(load_appointment(&f.conn, &a.id).unwrap().name, "APT00001");
    }

    #[test]
    fn creating_appointments_recomputes_counters() {
        let f = setup_db();
        let before = doctor::recompute_appointment_count(&f.conn, &f.doctor.id).unwrap();

        let mut created = Vec::new();
        for _ in 0..3 {
            created.push(create_appointment(&f.conn, &NewAppointment {
                name: None,
                patient_id: Some(f.patient.id),
                doctor_id: Some(f.doctor.id),
            }).unwrap());
        }

        let after = doctor::recompute_appointment_count(&f.conn, &f.doctor.id).unwrap();
        assert!(after >= 3);
        assert_eq!(after, before + 3);
        assert_eq!(doctor::load_doctor(&f.conn, &f.doctor.id).unwrap().appointment_count, 4);
        assert_eq!(patient::load_patient(&f.conn, &f.patient.id).unwrap().appointment_count, 4);

        unlink_appointment(&f.conn, &created[0].id).unwrap();
        let after_delete = doctor::recompute_appointment_count(&f.conn, &f.doctor.id).unwrap();
        assert!(after_delete < after);
        assert_eq!(doctor::load_doctor(&f.conn, &f.doctor.id).unwrap().appointment_count, 3);
        assert_eq!(patient::load_patient(&f.conn, &f.patient.id).unwrap().appointment_count, 3);
    }

    #[test]
    fn create_with_unknown_patient_applies_nothing() {
        let f = setup_db();
        let err = create_appointment(&f.conn, &NewAppointment {
            name: None,
            patient_id: Some(Uuid::new_v4()),
            doctor_id: Some(f.doctor.id),
        }).unwrap_err();
        assert!(matches!(err, HospitalError::NotFound { entity_type: "Patient", .. }));

        assert_eq!(list_appointments(&f.conn, &AppointmentFilter::default()).unwrap().len(), 1);
        assert_eq!(doctor::load_doctor(&f.conn, &f.doctor.id).unwrap().appointment_count, 1);
    }

    #[test]
    fn relinking_patient_cascades_and_moves_count() {
        let f = setup_db();
        let other = add_patient(&f.conn, "Patient 2", Gender::Male, "Allergic to penicillin");

        let updated = write_appointment(&f.conn, &f.appointment.id, &AppointmentUpdate {
            patient_id: Some(Some(other.id)),
            ..Default::default()
        }).unwrap();
        assert_eq!(updated.gender, Some(Gender::Male));
        assert_eq!(updated.note.as_deref(), Some("Allergic to penicillin"));

        assert_eq!(patient::load_patient(&f.conn, &f.patient.id).unwrap().appointment_count, 0);
        assert_eq!(patient::load_patient(&f.conn, &other.id).unwrap().appointment_count, 1);
        assert_eq!(load_appointment(&f.conn, &f.appointment.id).unwrap(), updated);
    }

    #[test]
    fn clearing_patient_link_empties_mirrored_fields() {
        let f = setup_db();
        let updated = write_appointment(&f.conn, &f.appointment.id, &AppointmentUpdate {
            patient_id: Some(None),
            ..Default::default()
        }).unwrap();
        assert_eq!(updated.patient_id, None);
        assert_eq!(updated.gender, None);
        assert_eq!(updated.note, None);
        assert_eq!(patient::load_patient(&f.conn, &f.patient.id).unwrap().appointment_count, 0);
    }

    #[test]
    fn changing_doctor_moves_count() {
        let f = setup_db();
        let other = doctor::create_doctor(&f.conn, &NewDoctor {
            doctor_name: "Doctor 2".into(),
            ..Default::default()
        }).unwrap();

        write_appointment(&f.conn, &f.appointment.id, &AppointmentUpdate {
            doctor_id: Some(Some(other.id)),
            ..Default::default()
        }).unwrap();

        assert_eq!(doctor::load_doctor(&f.conn, &f.doctor.id).unwrap().appointment_count, 0);
        assert_eq!(doctor::load_doctor(&f.conn, &other.id).unwrap().appointment_count, 1);
    }

    #[test]
    fn write_without_patient_change_keeps_mirrored_fields() {
        let f = setup_db();
        patient::write_patient(&f.conn, &f.patient.id, &PatientUpdate {
            note: Some("Updated note".into()),
            ..Default::default()
        }).unwrap();

        let updated = write_appointment(&f.conn, &f.appointment.id, &AppointmentUpdate {
            name: Some("Renamed".into()),
            ..Default::default()
        }).unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.note.as_deref(), Some("Test patient note"));
    }

    #[test]
    fn sync_patient_fields_persists_cascade() {
        let f = setup_db();
        patient::write_patient(&f.conn, &f.patient.id, &PatientUpdate {
            note: Some("Updated note".into()),
            gender: Some(Some(Gender::Other)),
            ..Default::default()
        }).unwrap();

        let synced = sync_patient_fields(&f.conn, &f.appointment.id).unwrap();
        assert_eq!(synced.note.as_deref(), Some("Updated note"));
        assert_eq!(synced.gender, Some(Gender::Other));
        assert_eq!(load_appointment(&f.conn, &f.appointment.id).unwrap(), synced);
    }

    #[test]
    fn deleting_patient_clears_mirrored_fields() {
        let f = setup_db();
        patient::unlink_patient(&f.conn, &f.patient.id).unwrap();

        let stored = load_appointment(&f.conn, &f.appointment.id).unwrap();
        assert_eq!(stored.patient_id, None);
        assert_eq!(stored.gender, None);
        assert_eq!(stored.note, None);
        assert_eq!(stored.doctor_id, Some(f.doctor.id));
        assert_eq!(doctor::load_doctor(&f.conn, &f.doctor.id).unwrap().appointment_count, 1);
    }

    #[test]
    fn empty_name_on_write_becomes_sentinel() {
        let f = setup_db();
        let updated = write_appointment(&f.conn, &f.appointment.id, &AppointmentUpdate {
            name: Some(String::new()),
            ..Default::default()
        }).unwrap();
        assert_eq!(updated.name, "New");
        assert_eq!(load_appointment(&f.conn, &f.appointment.id).unwrap().name, "New");
    }

    #[test]
    fn list_appointments_by_doctor() {
        let f = setup_db();
        create_appointment(&f.conn, &NewAppointment::default()).unwrap();

        let for_doctor = list_appointments(&f.conn, &AppointmentFilter {
            doctor_id: Some(f.doctor.id),
            ..Default::default()
        }).unwrap();
        assert_eq!(for_doctor.len(), 1);
        assert_eq!(for_doctor[0].id, f.appointment.id);
    }
}
