use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "HospitalRecords";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Note given to a patient registered without one.
pub const NEW_PATIENT_NOTE: &str = "New Patient";

/// Placeholder name of an appointment until it receives a reference.
pub const APPOINTMENT_SENTINEL_NAME: &str = "New";

/// Sequence issuing appointment references at confirmation.
pub const APPOINTMENT_SEQUENCE_CODE: &str = "hospital.appointment";

/// Suffix appended to a duplicated record's display name.
pub const COPY_SUFFIX: &str = " (Copy)";

/// Display name of a duplicated record: original name plus the copy suffix.
pub fn copy_name(original: &str) -> String {
    format!("{original}{COPY_SUFFIX}")
}

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "hospital_lib=info,warn"
}

/// Get the application data directory.
/// Platform data dir (e.g. ~/.local/share) joined with the app name;
/// falls back to the working directory when no data dir is known.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Get the records database path
pub fn database_path() -> PathBuf {
    app_data_dir().join("hospital.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with(APP_NAME));
    }

    #[test]
    fn database_under_app_data() {
        let db = database_path();
        assert!(db.starts_with(app_data_dir()));
        assert!(db.ends_with("hospital.db"));
    }

    #[test]
    fn copy_name_appends_suffix() {
        assert_eq!(copy_name("Doctor 1"), "Doctor 1 (Copy)");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
