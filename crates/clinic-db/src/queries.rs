use crate::Database;
use crate::models::UserRow;
use anyhow::Result;
use chrono::Utc;
use clinic_types::models::{
    NewPatient, Patient, PatientChanges, PatientFilter, PatientStatus, UnknownStatus,
};
use rusqlite::{Connection, Row, params};

const PATIENT_COLUMNS: &str =
    "id, name, phone, address, status, in_date_at, out_date_at, created_at, updated_at";

impl Database {
    // -- Users --

    /// Returns the id assigned to the new user, or `None` if the email is
    /// already registered.
    pub fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<Option<i64>> {
        self.with_conn_mut(|conn| {
            let now = Utc::now();
            let inserted = conn.execute(
                "INSERT INTO users (name, email, password, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![name, email, password_hash, now],
            );
            match inserted {
                Ok(_) => Ok(Some(conn.last_insert_rowid())),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, email, password, created_at, updated_at FROM users WHERE email = ?1",
                [email],
                user_from_row,
            )
            .optional()
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, email, password, created_at, updated_at FROM users WHERE id = ?1",
                [id],
                user_from_row,
            )
            .optional()
        })
    }

    // -- Patients --

    pub fn list_patients(&self, filter: &PatientFilter) -> Result<Vec<Patient>> {
        self.with_conn(|conn| query_patients(conn, filter))
    }

    pub fn create_patient(&self, patient: &NewPatient) -> Result<Patient> {
        self.with_conn_mut(|conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO patients
                    (name, phone, address, status, in_date_at, out_date_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
                params![
                    patient.name,
                    patient.phone,
                    patient.address,
                    patient.status.as_str(),
                    patient.in_date_at,
                    patient.out_date_at,
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();
            query_patient(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("Patient {} vanished after insert", id))
        })
    }

    pub fn get_patient(&self, id: i64) -> Result<Option<Patient>> {
        self.with_conn(|conn| query_patient(conn, id))
    }

    /// Applies the supplied fields and returns the stored record, or `None`
    /// if no patient has this id.
    pub fn update_patient(&self, id: i64, changes: &PatientChanges) -> Result<Option<Patient>> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE patients SET
                    name        = COALESCE(?1, name),
                    phone       = COALESCE(?2, phone),
                    address     = COALESCE(?3, address),
                    status      = COALESCE(?4, status),
                    in_date_at  = COALESCE(?5, in_date_at),
                    out_date_at = COALESCE(?6, out_date_at),
                    updated_at  = ?7
                 WHERE id = ?8",
                params![
                    changes.name,
                    changes.phone,
                    changes.address,
                    changes.status.map(PatientStatus::as_str),
                    changes.in_date_at,
                    changes.out_date_at,
                    Utc::now(),
                    id,
                ],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            query_patient(conn, id)
        })
    }

    /// Returns false if no patient has this id.
    pub fn delete_patient(&self, id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute("DELETE FROM patients WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}

fn query_patient(conn: &Connection, id: i64) -> Result<Option<Patient>> {
    conn.query_row(
        &format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"),
        [id],
        patient_from_row,
    )
    .optional()
}

fn query_patients(conn: &Connection, filter: &PatientFilter) -> Result<Vec<Patient>> {
    // Column names and sort keywords come from enums, never from the request.
    // Text filters fold both sides with `ulower`, so matching is Unicode
    // case-insensitive.
    let (clause, term) = match filter {
        PatientFilter::Name(term) => (contains_clause("name"), Some(term)),
        PatientFilter::Address(term) => (contains_clause("address"), Some(term)),
        PatientFilter::Status(term) => (contains_clause("status"), Some(term)),
        PatientFilter::Sorted { column, order } => (
            format!("ORDER BY {} {}, id ASC", column.column(), order.keyword()),
            None,
        ),
        PatientFilter::All => ("ORDER BY id".to_string(), None),
    };

    let mut stmt = conn.prepare(&format!("SELECT {PATIENT_COLUMNS} FROM patients {clause}"))?;
    let rows = match term {
        Some(term) => stmt.query_map([contains_pattern(&term.to_lowercase())], patient_from_row)?,
        None => stmt.query_map([], patient_from_row)?,
    }
    .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn contains_clause(column: &str) -> String {
    format!(r"WHERE ulower({column}) LIKE ?1 ESCAPE '\' ORDER BY id")
}

/// `%term%` with LIKE wildcards in the term matched literally.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<Patient> {
    let status: String = row.get(4)?;
    let status: PatientStatus = status.parse().map_err(|e: UnknownStatus| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Patient {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        address: row.get(3)?,
        status,
        in_date_at: row.get(5)?,
        out_date_at: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clinic_types::models::{SortColumn, SortOrder};

    fn new_patient(name: &str, address: &str, status: PatientStatus) -> NewPatient {
        NewPatient {
            name: name.into(),
            phone: "08123".into(),
            address: address.into(),
            status,
            in_date_at: None,
            out_date_at: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn names(patients: &[Patient]) -> Vec<&str> {
        patients.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn create_then_get() {
        let db = Database::open_in_memory().unwrap();
        let created = db
            .create_patient(&NewPatient {
                in_date_at: date(2021, 7, 1),
                ..new_patient("Budi", "Jakarta", PatientStatus::Positif)
            })
            .unwrap();

        let fetched = db.get_patient(created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.in_date_at, date(2021, 7, 1));
        assert_eq!(fetched.out_date_at, None);
        assert!(db.get_patient(created.id + 1).unwrap().is_none());
    }

    #[test]
    fn name_filter_is_case_insensitive_substring() {
        let db = Database::open_in_memory().unwrap();
        db.create_patient(&new_patient("Tania", "Bogor", PatientStatus::Positif)).unwrap();
        db.create_patient(&new_patient("Hartanto", "Depok", PatientStatus::Sembuh)).unwrap();
        db.create_patient(&new_patient("Budi", "Jakarta", PatientStatus::Positif)).unwrap();

        let found = db.list_patients(&PatientFilter::Name("Tan".into())).unwrap();
        assert_eq!(names(&found), ["Tania", "Hartanto"]);
    }

    #[test]
    fn like_wildcards_match_literally() {
        let db = Database::open_in_memory().unwrap();
        db.create_patient(&new_patient("Budi", "Jl. Merdeka 10%", PatientStatus::Positif)).unwrap();
        db.create_patient(&new_patient("Sari", "Jl. Sudirman", PatientStatus::Positif)).unwrap();

        let found = db.list_patients(&PatientFilter::Address("%".into())).unwrap();
        assert_eq!(names(&found), ["Budi"]);
        let found = db.list_patients(&PatientFilter::Name("_".into())).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn status_filter_matches_substring() {
        let db = Database::open_in_memory().unwrap();
        db.create_patient(&new_patient("Budi", "Jakarta", PatientStatus::Positif)).unwrap();
        db.create_patient(&new_patient("Sari", "Bandung", PatientStatus::Sembuh)).unwrap();

        let found = db.list_patients(&PatientFilter::Status("semb".into())).unwrap();
        assert_eq!(names(&found), ["Sari"]);
    }

    #[test]
    fn sorted_by_admission_date() {
        let db = Database::open_in_memory().unwrap();
        for (name, day) in [("A", 3), ("B", 1), ("C", 2)] {
            db.create_patient(&NewPatient {
                in_date_at: date(2021, 7, day),
                ..new_patient(name, "Jakarta", PatientStatus::Positif)
            })
            .unwrap();
        }

        let asc = db
            .list_patients(&PatientFilter::Sorted {
                column: SortColumn::InDate,
                order: SortOrder::Asc,
            })
            .unwrap();
        assert_eq!(names(&asc), ["B", "C", "A"]);

        let desc = db
            .list_patients(&PatientFilter::Sorted {
                column: SortColumn::InDate,
                order: SortOrder::Desc,
            })
            .unwrap();
        assert_eq!(names(&desc), ["A", "C", "B"]);
    }

    #[test]
    fn update_applies_only_supplied_fields() {
        let db = Database::open_in_memory().unwrap();
        let created = db
            .create_patient(&new_patient("Budi", "Jakarta", PatientStatus::Positif))
            .unwrap();

        let changes = PatientChanges {
            phone: Some("123".into()),
            out_date_at: date(2021, 8, 1),
            ..Default::default()
        };
        let updated = db.update_patient(created.id, &changes).unwrap().unwrap();
        assert_eq!(updated.phone, "123");
        assert_eq!(updated.out_date_at, date(2021, 8, 1));
        assert_eq!(updated.name, "Budi");
        assert_eq!(updated.address, "Jakarta");
        assert_eq!(updated.status, PatientStatus::Positif);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn update_and_delete_missing_patient() {
        let db = Database::open_in_memory().unwrap();
        let changes = PatientChanges {
            name: Some("X".into()),
            ..Default::default()
        };
        assert!(db.update_patient(42, &changes).unwrap().is_none());
        assert!(!db.delete_patient(42).unwrap());
    }

    #[test]
    fn delete_removes_record() {
        let db = Database::open_in_memory().unwrap();
        let created = db
            .create_patient(&new_patient("Budi", "Jakarta", PatientStatus::Meninggal))
            .unwrap();
        assert!(db.delete_patient(created.id).unwrap());
        assert!(db.get_patient(created.id).unwrap().is_none());
    }

    #[test]
    fn users_by_email_and_id() {
        let db = Database::open_in_memory().unwrap();
        let id = db
            .create_user("Budi", "budi@example.com", "$argon2id$hash")
            .unwrap()
            .unwrap();

        let by_email = db.get_user_by_email("budi@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, id);
        assert_eq!(by_email.password, "$argon2id$hash");
        assert!(db.get_user_by_id(id).unwrap().is_some());
        assert!(db.get_user_by_email("other@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_reported_not_raised() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_user("Budi", "budi@example.com", "x").unwrap().is_some());
        assert_eq!(db.create_user("Budi 2", "budi@example.com", "y").unwrap(), None);
    }

    #[test]
    fn text_filters_fold_non_ascii_case() {
        let db = Database::open_in_memory().unwrap();
        db.create_patient(&new_patient("Élia", "Ñuñoa", PatientStatus::Positif)).unwrap();
        db.create_patient(&new_patient("Budi", "Jakarta", PatientStatus::Positif)).unwrap();

        for term in ["élia", "ÉLIA", "li"] {
            let found = db.list_patients(&PatientFilter::Name(term.into())).unwrap();
            assert_eq!(names(&found), ["Élia"], "searching {term}");
        }
        let found = db.list_patients(&PatientFilter::Address("ÑUÑ".into())).unwrap();
        assert_eq!(names(&found), ["Élia"]);
    }
}
