use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::calc::{
    AssessmentRecord, ClassInfo, ClassPeriod, EducationLevel, Snapshot, StudentInfo, SubjectInfo,
    Term,
};

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0}")]
    Query(#[from] rusqlite::Error),
    #[error("{0}")]
    Insert(rusqlite::Error),
    #[error("{0}")]
    Update(rusqlite::Error),
    #[error("{0}")]
    Delete(rusqlite::Error),
    #[error("{0} not found")]
    NotFound(&'static str),
}

impl DbError {
    pub fn code(&self) -> &'static str {
        match self {
            DbError::Query(_) => "db_query_failed",
            DbError::Insert(_) => "db_insert_failed",
            DbError::Update(_) => "db_update_failed",
            DbError::Delete(_) => "db_delete_failed",
            DbError::NotFound(_) => "not_found",
        }
    }
}

pub fn open_db(workspace: &Path, db_file: &str) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let conn = Connection::open(workspace.join(db_file))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            level TEXT NOT NULL,
            description TEXT,
            academic_year INTEGER NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            student_number TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            level TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class ON students(class_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            level TEXT NOT NULL,
            description TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
        )",
        [],
    )?;

    // Sub-scores are canonical decimal TEXT so no float enters the engine.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS marks(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            class_id TEXT NOT NULL,
            academic_year INTEGER NOT NULL,
            term INTEGER NOT NULL,
            bot TEXT,
            mot TEXT,
            eot TEXT,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            last_modified TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now')),
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id),
            FOREIGN KEY(class_id) REFERENCES classes(id),
            UNIQUE(student_id, subject_id, academic_year, term)
        )",
        [],
    )?;
    ensure_marks_points(&conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_marks_student ON marks(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_marks_class_period ON marks(class_id, academic_year, term)",
        [],
    )?;

    Ok(conn)
}

fn ensure_marks_points(conn: &Connection) -> anyhow::Result<()> {
    // Workspaces created before O-Level points were captured lack the column.
    if table_has_column(conn, "marks", "points")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE marks ADD COLUMN points TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn conversion_err(idx: usize, ty: Type, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, msg.into())
}

fn decimal_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        Decimal::from_str(&s)
            .map_err(|e| conversion_err(idx, Type::Text, format!("bad decimal {:?}: {}", s, e)))
    })
    .transpose()
}

fn level_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<EducationLevel> {
    let raw: String = row.get(idx)?;
    EducationLevel::parse(&raw)
        .ok_or_else(|| conversion_err(idx, Type::Text, format!("bad level {:?}", raw)))
}

fn term_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Term> {
    let raw: i64 = row.get(idx)?;
    Term::from_number(raw)
        .ok_or_else(|| conversion_err(idx, Type::Integer, format!("bad term {}", raw)))
}

pub fn decimal_to_sql(v: Option<Decimal>) -> Option<String> {
    v.map(|d| d.normalize().to_string())
}

const CLASS_COLS: &str = "id, name, level, academic_year, is_active";
const STUDENT_COLS: &str = "id, full_name, student_number, class_id, level";
const SUBJECT_COLS: &str = "id, code, name, level, is_active";
const MARK_COLS: &str =
    "m.student_id, m.subject_id, m.class_id, m.academic_year, m.term, m.bot, m.mot, m.eot, m.points";

fn class_row(r: &Row<'_>) -> rusqlite::Result<ClassInfo> {
    Ok(ClassInfo {
        id: r.get(0)?,
        name: r.get(1)?,
        level: level_col(r, 2)?,
        academic_year: r.get(3)?,
        is_active: r.get::<_, i64>(4)? != 0,
    })
}

fn student_row(r: &Row<'_>) -> rusqlite::Result<StudentInfo> {
    Ok(StudentInfo {
        id: r.get(0)?,
        full_name: r.get(1)?,
        student_number: r.get(2)?,
        class_id: r.get(3)?,
        level: level_col(r, 4)?,
    })
}

fn subject_row(r: &Row<'_>) -> rusqlite::Result<SubjectInfo> {
    Ok(SubjectInfo {
        id: r.get(0)?,
        code: r.get(1)?,
        name: r.get(2)?,
        level: level_col(r, 3)?,
        is_active: r.get::<_, i64>(4)? != 0,
    })
}

fn mark_row(r: &Row<'_>) -> rusqlite::Result<AssessmentRecord> {
    Ok(AssessmentRecord {
        student_id: r.get(0)?,
        subject_id: r.get(1)?,
        class_id: r.get(2)?,
        academic_year: r.get(3)?,
        term: term_col(r, 4)?,
        bot: decimal_col(r, 5)?,
        mot: decimal_col(r, 6)?,
        eot: decimal_col(r, 7)?,
        points: decimal_col(r, 8)?,
    })
}

pub fn list_classes(conn: &Connection) -> Result<Vec<ClassInfo>, DbError> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM classes ORDER BY name", CLASS_COLS))?;
    let rows = stmt
        .query_map([], class_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_class(conn: &Connection, class_id: &str) -> Result<ClassInfo, DbError> {
    conn.query_row(
        &format!("SELECT {} FROM classes WHERE id = ?", CLASS_COLS),
        [class_id],
        class_row,
    )
    .optional()?
    .ok_or(DbError::NotFound("class"))
}

/// Students in insertion order, optionally limited to one class.
pub fn list_students(conn: &Connection, class_id: Option<&str>) -> Result<Vec<StudentInfo>, DbError> {
    let rows = match class_id {
        Some(cid) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM students WHERE class_id = ? ORDER BY created_at, rowid",
                STUDENT_COLS
            ))?;
            let rows = stmt
                .query_map([cid], student_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM students ORDER BY created_at, rowid",
                STUDENT_COLS
            ))?;
            let rows = stmt
                .query_map([], student_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };
    Ok(rows)
}

pub fn get_student(conn: &Connection, student_id: &str) -> Result<StudentInfo, DbError> {
    conn.query_row(
        &format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLS),
        [student_id],
        student_row,
    )
    .optional()?
    .ok_or(DbError::NotFound("student"))
}

pub fn list_subjects(
    conn: &Connection,
    level: Option<EducationLevel>,
) -> Result<Vec<SubjectInfo>, DbError> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM subjects ORDER BY name", SUBJECT_COLS))?;
    let rows = stmt
        .query_map([], subject_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows
        .into_iter()
        .filter(|s| level.map(|l| s.level == l).unwrap_or(true))
        .collect())
}

pub fn get_subject(conn: &Connection, subject_id: &str) -> Result<SubjectInfo, DbError> {
    conn.query_row(
        &format!("SELECT {} FROM subjects WHERE id = ?", SUBJECT_COLS),
        [subject_id],
        subject_row,
    )
    .optional()?
    .ok_or(DbError::NotFound("subject"))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFilter {
    pub academic_year: Option<i64>,
    pub term: Option<Term>,
}

/// Records in storage order, each with its last write time.
fn load_records(
    conn: &Connection,
    filter: &RecordFilter,
) -> Result<(Vec<AssessmentRecord>, Vec<String>), DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {}, m.last_modified
         FROM marks m
         WHERE (?1 IS NULL OR m.academic_year = ?1)
           AND (?2 IS NULL OR m.term = ?2)
         ORDER BY m.rowid",
        MARK_COLS
    ))?;
    let rows = stmt
        .query_map((filter.academic_year, filter.term.map(Term::number)), |r| {
            Ok((mark_row(r)?, r.get::<_, String>(9)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows.into_iter().unzip())
}

/// The whole school in one read transaction.
pub fn load_school_snapshot(conn: &Connection, filter: &RecordFilter) -> Result<Snapshot, DbError> {
    let tx = conn.unchecked_transaction()?;
    let (records, modified) = load_records(&tx, filter)?;
    let snapshot = Snapshot {
        classes: list_classes(&tx)?,
        students: list_students(&tx, None)?,
        subjects: list_subjects(&tx, None)?,
        records,
        modified,
    };
    tx.commit()?;
    Ok(snapshot)
}

/// One class, its students and their records for a single period.
#[derive(Debug, Clone)]
pub struct ClassSnapshot {
    pub class: ClassInfo,
    pub students: Vec<StudentInfo>,
    pub subjects: Vec<SubjectInfo>,
    pub records: Vec<AssessmentRecord>,
    pub academic_year: i64,
    pub term: Term,
}

impl ClassSnapshot {
    pub fn period(&self) -> ClassPeriod<'_> {
        ClassPeriod {
            class: &self.class,
            students: &self.students,
            subjects: &self.subjects,
            records: &self.records,
            academic_year: self.academic_year,
            term: self.term,
        }
    }
}

/// Records are ordered by student name so tie order in rankings matches the
/// name-ordered sheets.
pub fn load_class_snapshot(
    conn: &Connection,
    class_id: &str,
    academic_year: i64,
    term: Term,
) -> Result<ClassSnapshot, DbError> {
    let tx = conn.unchecked_transaction()?;
    let snapshot = read_class(&tx, class_id, academic_year, term)?;
    tx.commit()?;
    Ok(snapshot)
}

/// The student and their current class, read in the same transaction.
pub fn load_student_snapshot(
    conn: &Connection,
    student_id: &str,
    academic_year: i64,
    term: Term,
) -> Result<(StudentInfo, ClassSnapshot), DbError> {
    let tx = conn.unchecked_transaction()?;
    let student = get_student(&tx, student_id)?;
    let snapshot = read_class(&tx, &student.class_id, academic_year, term)?;
    tx.commit()?;
    Ok((student, snapshot))
}

fn read_class(
    conn: &Connection,
    class_id: &str,
    academic_year: i64,
    term: Term,
) -> Result<ClassSnapshot, DbError> {
    let class = get_class(conn, class_id)?;

    let mut students_stmt = conn.prepare(&format!(
        "SELECT {} FROM students WHERE class_id = ? ORDER BY full_name, rowid",
        STUDENT_COLS
    ))?;
    let students = students_stmt
        .query_map([class_id], student_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let mut marks_stmt = conn.prepare(&format!(
        "SELECT {}
         FROM marks m
         JOIN students s ON s.id = m.student_id
         WHERE s.class_id = ?1 AND m.academic_year = ?2 AND m.term = ?3
         ORDER BY s.full_name, s.rowid, m.rowid",
        MARK_COLS
    ))?;
    let records = marks_stmt
        .query_map((class_id, academic_year, term.number()), mark_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let subjects = list_subjects(conn, None)?;

    Ok(ClassSnapshot {
        class,
        students,
        subjects,
        records,
        academic_year,
        term,
    })
}

#[derive(Debug, Clone)]
pub struct MarkWrite {
    pub student_id: String,
    pub subject_id: String,
    pub class_id: String,
    pub academic_year: i64,
    pub term: Term,
    pub bot: Option<Decimal>,
    pub mot: Option<Decimal>,
    pub eot: Option<Decimal>,
    /// `None` leaves stored points untouched on update.
    pub points: Option<Option<Decimal>>,
}

/// Inserts or overwrites the record for (student, subject, year, term) and
/// returns its id. The caller owns the transaction.
pub fn upsert_mark(conn: &Connection, m: &MarkWrite) -> Result<String, DbError> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM marks
             WHERE student_id = ? AND subject_id = ? AND academic_year = ? AND term = ?",
            (&m.student_id, &m.subject_id, m.academic_year, m.term.number()),
            |r| r.get(0),
        )
        .optional()?;

    match existing {
        Some(id) => {
            conn.execute(
                "UPDATE marks
                 SET class_id = ?1, bot = ?2, mot = ?3, eot = ?4,
                     points = CASE WHEN ?5 THEN ?6 ELSE points END,
                     last_modified = strftime('%Y-%m-%dT%H:%M:%fZ','now')
                 WHERE id = ?7",
                (
                    &m.class_id,
                    decimal_to_sql(m.bot),
                    decimal_to_sql(m.mot),
                    decimal_to_sql(m.eot),
                    m.points.is_some(),
                    decimal_to_sql(m.points.flatten()),
                    &id,
                ),
            )
            .map_err(DbError::Update)?;
            Ok(id)
        }
        None => {
            let id = Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO marks(id, student_id, subject_id, class_id, academic_year, term, bot, mot, eot, points, last_modified)
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, strftime('%Y-%m-%dT%H:%M:%fZ','now'))",
                (
                    &id,
                    &m.student_id,
                    &m.subject_id,
                    &m.class_id,
                    m.academic_year,
                    m.term.number(),
                    decimal_to_sql(m.bot),
                    decimal_to_sql(m.mot),
                    decimal_to_sql(m.eot),
                    decimal_to_sql(m.points.flatten()),
                ),
            )
            .map_err(DbError::Insert)?;
            Ok(id)
        }
    }
}

/// What `delete_subject` did to the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectRemoval {
    /// The subject had marks, so it was only deactivated.
    Deactivated,
    Deleted,
}

/// Subjects with marks are kept and deactivated; unused subjects are deleted.
pub fn delete_subject(conn: &Connection, subject_id: &str) -> Result<SubjectRemoval, DbError> {
    let tx = conn.unchecked_transaction()?;
    get_subject(&tx, subject_id)?;
    let marks: i64 = tx.query_row(
        "SELECT COUNT(*) FROM marks WHERE subject_id = ?",
        [subject_id],
        |r| r.get(0),
    )?;
    let removal = if marks > 0 {
        tx.execute("UPDATE subjects SET is_active = 0 WHERE id = ?", [subject_id])
            .map_err(DbError::Update)?;
        SubjectRemoval::Deactivated
    } else {
        tx.execute("DELETE FROM subjects WHERE id = ?", [subject_id])
            .map_err(DbError::Delete)?;
        SubjectRemoval::Deleted
    };
    tx.commit()?;
    Ok(removal)
}

pub fn set_subject_active(conn: &Connection, subject_id: &str, active: bool) -> Result<(), DbError> {
    let changed = conn
        .execute(
            "UPDATE subjects SET is_active = ? WHERE id = ?",
            (active as i64, subject_id),
        )
        .map_err(DbError::Update)?;
    if changed == 0 {
        return Err(DbError::NotFound("subject"));
    }
    Ok(())
}

/// Deletes the student and all of their marks. Returns the number of marks
/// removed.
pub fn delete_student(conn: &Connection, student_id: &str) -> Result<usize, DbError> {
    let tx = conn.unchecked_transaction()?;
    let marks = tx
        .execute("DELETE FROM marks WHERE student_id = ?", [student_id])
        .map_err(DbError::Delete)?;
    let removed = tx
        .execute("DELETE FROM students WHERE id = ?", [student_id])
        .map_err(DbError::Delete)?;
    if removed == 0 {
        return Err(DbError::NotFound("student"));
    }
    tx.commit()?;
    Ok(marks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn open_db_is_idempotent_and_adds_points_column() {
        let dir = temp_dir("marksheet-db-open");
        let conn = open_db(&dir, "test.sqlite3").expect("open");
        assert!(table_has_column(&conn, "marks", "points").expect("pragma"));
        drop(conn);
        let conn = open_db(&dir, "test.sqlite3").expect("reopen");
        assert!(table_has_column(&conn, "marks", "points").expect("pragma"));
    }

    #[test]
    fn decimals_round_trip_through_text_columns() {
        let dir = temp_dir("marksheet-db-decimal");
        let conn = open_db(&dir, "test.sqlite3").expect("open");
        conn.execute(
            "INSERT INTO classes(id, name, level, academic_year) VALUES('c1', 'S1', 'O-Level', 2024)",
            [],
        )
        .expect("class");
        conn.execute(
            "INSERT INTO students(id, class_id, student_number, full_name, level)
             VALUES('s1', 'c1', 'N1', 'Amy', 'O-Level')",
            [],
        )
        .expect("student");
        conn.execute(
            "INSERT INTO subjects(id, code, name, level) VALUES('m', 'MTC', 'Maths', 'O-Level')",
            [],
        )
        .expect("subject");
        conn.execute(
            "INSERT INTO marks(id, student_id, subject_id, class_id, academic_year, term, bot, mot, eot)
             VALUES('k1', 's1', 'm', 'c1', 2024, 1, ?, ?, NULL)",
            (decimal_to_sql(Some(dec!(79.990))), decimal_to_sql(Some(dec!(0)))),
        )
        .expect("mark");

        let snap = load_class_snapshot(&conn, "c1", 2024, Term::One).expect("snapshot");
        assert_eq!(snap.records.len(), 1);
        assert_eq!(snap.records[0].bot, Some(dec!(79.99)));
        assert_eq!(snap.records[0].mot, Some(Decimal::ZERO));
        assert_eq!(snap.records[0].eot, None);

        let write = MarkWrite {
            student_id: "s1".into(),
            subject_id: "m".into(),
            class_id: "c1".into(),
            academic_year: 2024,
            term: Term::One,
            bot: Some(dec!(50)),
            mot: Some(dec!(60)),
            eot: Some(dec!(70)),
            points: None,
        };
        let first = upsert_mark(&conn, &write).expect("upsert");
        assert_eq!(first, "k1");
        let snap = load_class_snapshot(&conn, "c1", 2024, Term::One).expect("snapshot");
        assert_eq!(snap.records.len(), 1);
        assert_eq!(snap.records[0].eot, Some(dec!(70)));

        let other_term = load_class_snapshot(&conn, "c1", 2024, Term::Two).expect("snapshot");
        assert!(other_term.records.is_empty());

        let err = load_class_snapshot(&conn, "missing", 2024, Term::One).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    fn seeded(prefix: &str) -> Connection {
        let conn = open_db(&temp_dir(prefix), "test.sqlite3").expect("open");
        conn.execute_batch(
            "INSERT INTO classes(id, name, level, academic_year) VALUES('c1', 'S1', 'O-Level', 2024);
             INSERT INTO students(id, class_id, student_number, full_name, level)
                 VALUES('s1', 'c1', 'N1', 'Amy', 'O-Level');
             INSERT INTO students(id, class_id, student_number, full_name, level)
                 VALUES('s2', 'c1', 'N2', 'Ben', 'O-Level');
             INSERT INTO subjects(id, code, name, level) VALUES('m', 'MTC', 'Maths', 'O-Level');
             INSERT INTO subjects(id, code, name, level) VALUES('a', 'ART', 'Art', 'O-Level');
             INSERT INTO marks(id, student_id, subject_id, class_id, academic_year, term, eot, last_modified)
                 VALUES('k1', 's1', 'm', 'c1', 2024, 1, '70', '2024-03-01T08:00:00.000Z');
             INSERT INTO marks(id, student_id, subject_id, class_id, academic_year, term, eot, last_modified)
                 VALUES('k2', 's2', 'm', 'c1', 2024, 1, '80', '2024-03-02T08:00:00.000Z');",
        )
        .expect("seed");
        conn
    }

    #[test]
    fn subjects_with_marks_are_deactivated_not_deleted() {
        let conn = seeded("marksheet-db-subject-delete");
        assert_eq!(delete_subject(&conn, "m").expect("delete"), SubjectRemoval::Deactivated);
        assert!(!get_subject(&conn, "m").expect("kept").is_active);

        assert_eq!(delete_subject(&conn, "a").expect("delete"), SubjectRemoval::Deleted);
        assert_eq!(get_subject(&conn, "a").unwrap_err().code(), "not_found");
        assert_eq!(delete_subject(&conn, "a").unwrap_err().code(), "not_found");

        set_subject_active(&conn, "m", true).expect("activate");
        assert!(get_subject(&conn, "m").expect("subject").is_active);
        assert_eq!(
            set_subject_active(&conn, "a", true).unwrap_err().code(),
            "not_found"
        );
    }

    #[test]
    fn deleting_a_student_removes_their_marks() {
        let conn = seeded("marksheet-db-student-delete");
        assert_eq!(delete_student(&conn, "s1").expect("delete"), 1);
        assert_eq!(get_student(&conn, "s1").unwrap_err().code(), "not_found");
        let snap = load_class_snapshot(&conn, "c1", 2024, Term::One).expect("snapshot");
        assert_eq!(snap.students.len(), 1);
        assert_eq!(snap.records.len(), 1);
        assert_eq!(delete_student(&conn, "s1").unwrap_err().code(), "not_found");
    }

    #[test]
    fn student_snapshot_resolves_the_class() {
        let conn = seeded("marksheet-db-student-snapshot");
        let (student, snap) = load_student_snapshot(&conn, "s2", 2024, Term::One).expect("load");
        assert_eq!(student.full_name, "Ben");
        assert_eq!(snap.class.id, "c1");
        assert_eq!(snap.records.len(), 2);
        let err = load_student_snapshot(&conn, "nobody", 2024, Term::One).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn school_snapshot_carries_write_times() {
        let conn = seeded("marksheet-db-modified");
        let snap = load_school_snapshot(&conn, &RecordFilter::default()).expect("load");
        assert_eq!(snap.records.len(), snap.modified.len());
        assert_eq!(snap.modified[1], "2024-03-02T08:00:00.000Z");
    }
}
