use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;

/// Draws the next reference from a named sequence (e.g. `APT00001`).
///
/// The draw belongs to the caller's transaction: if it rolls back, the
/// number is released with it.
pub fn next_sequence_value(conn: &Connection, code: &str) -> Result<String, DatabaseError> {
    let (prefix, padding, next): (String, i64, i64) = conn
        .query_row(
            "SELECT prefix, padding, next_number FROM sequences WHERE code = ?1",
            params![code],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?
        .ok_or_else(|| DatabaseError::NotFound {
            entity_type: "Sequence".into(),
            id: code.into(),
        })?;

    conn.execute(
        "UPDATE sequences SET next_number = next_number + 1 WHERE code = ?1",
        params![code],
    )?;

    Ok(format_sequence(&prefix, padding, next))
}

fn format_sequence(prefix: &str, padding: i64, number: i64) -> String {
    let width = usize::try_from(padding).unwrap_or(0);
    format!("{prefix}{number:0width$}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn sequence_increments() {
        let conn = open_memory_database().unwrap();
        assert_eq!(next_sequence_value(&conn, "hospital.appointment").unwrap(), "APT00001");
        assert_eq!(next_sequence_value(&conn, "hospital.appointment").unwrap(), "APT00002");
    }

    #[test]
    fn unknown_sequence_not_found() {
        let conn = open_memory_database().unwrap();
        let err = next_sequence_value(&conn, "hospital.nothing").unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn padding_widens_but_never_truncates() {
        assert_eq!(format_sequence("APT", 5, 42), "APT00042");
        assert_eq!(format_sequence("APT", 2, 1234), "APT1234");
    }
}
