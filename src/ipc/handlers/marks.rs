use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::collections::HashSet;
use tracing::info;

use crate::calc::final_mark::is_complete;
use crate::calc::grade::{grade_from_percent, grade_label};
use crate::calc::reports::entry_sheet;
use crate::calc::{completion_percentage, final_mark, AssessmentRecord, Term};
use crate::db::{self, DbError, MarkWrite};
use crate::ipc::error::{db_err, err, ok, ok_serialized};
use crate::ipc::helpers::{
    db_conn, optional_score, required_period, required_str, Reply, ScoreRange,
};
use crate::ipc::types::{AppState, Request};

struct Scores {
    bot: Option<Decimal>,
    mot: Option<Decimal>,
    eot: Option<Decimal>,
    points: Option<Option<Decimal>>,
}

impl Scores {
    fn any_entered(&self) -> bool {
        self.bot.is_some() || self.mot.is_some() || self.eot.is_some()
    }
}

fn parse_scores(req: &Request, obj: &Value) -> Reply<Scores> {
    let points = match obj.get("points") {
        None => None,
        Some(_) => Some(optional_score(req, obj, "points", ScoreRange::Points)?),
    };
    Ok(Scores {
        bot: optional_score(req, obj, "bot", ScoreRange::Percent)?,
        mot: optional_score(req, obj, "mot", ScoreRange::Percent)?,
        eot: optional_score(req, obj, "eot", ScoreRange::Percent)?,
        points,
    })
}

fn handle_marks_upsert(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (academic_year, term) = match required_period(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let scores = match parse_scores(req, &req.params) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let student = match db::get_student(conn, &student_id) {
        Ok(s) => s,
        Err(e) => return db_err(&req.id, &e),
    };
    if let Err(e) = db::get_subject(conn, &subject_id) {
        return db_err(&req.id, &e);
    }

    let write = MarkWrite {
        student_id: student.id.clone(),
        subject_id: subject_id.clone(),
        class_id: student.class_id.clone(),
        academic_year,
        term,
        bot: scores.bot,
        mot: scores.mot,
        eot: scores.eot,
        points: scores.points,
    };
    let mark_id = match db::upsert_mark(conn, &write) {
        Ok(id) => id,
        Err(e) => return db_err(&req.id, &e),
    };

    let record = AssessmentRecord {
        student_id: write.student_id,
        subject_id: write.subject_id,
        class_id: write.class_id,
        academic_year,
        term,
        bot: write.bot,
        mot: write.mot,
        eot: write.eot,
        points: None,
    };
    let mark = final_mark(&record);
    ok(
        &req.id,
        json!({
            "markId": mark_id,
            "finalMark": mark,
            "grade": grade_label(mark.map(grade_from_percent)),
            "isComplete": is_complete(&record),
            "completionPercentage": completion_percentage(&record),
        }),
    )
}

struct ClassEntry {
    student_id: String,
    scores: Scores,
}

fn parse_entries(req: &Request) -> Reply<Vec<ClassEntry>> {
    let Some(items) = req.params.get("entries").and_then(|v| v.as_array()) else {
        return Err(err(&req.id, "bad_params", "missing/invalid entries", None));
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let Some(student_id) = item.get("studentId").and_then(|v| v.as_str()) else {
            return Err(err(
                &req.id,
                "bad_params",
                "entries[].studentId is required",
                Some(json!({ "index": i })),
            ));
        };
        out.push(ClassEntry {
            student_id: student_id.to_string(),
            scores: parse_scores(req, item)?,
        });
    }
    Ok(out)
}

/// Saves a whole class column for one subject. Existing records are
/// overwritten as given; a new record is only created when at least one
/// sub-score was entered.
fn handle_marks_save_class_entry(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (academic_year, term) = match required_period(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let entries = match parse_entries(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let snapshot = match db::load_class_snapshot(conn, &class_id, academic_year, term) {
        Ok(s) => s,
        Err(e) => return db_err(&req.id, &e),
    };
    if !snapshot.subjects.iter().any(|s| s.id == subject_id) {
        return err(&req.id, "not_found", "subject not found", None);
    }
    let members: HashSet<&str> = snapshot.students.iter().map(|s| s.id.as_str()).collect();
    let existing: HashSet<&str> = snapshot
        .records
        .iter()
        .filter(|r| r.subject_id == subject_id)
        .map(|r| r.student_id.as_str())
        .collect();

    if let Some(stranger) = entries
        .iter()
        .find(|e| !members.contains(e.student_id.as_str()))
    {
        return err(
            &req.id,
            "bad_params",
            "student is not in this class",
            Some(json!({ "studentId": stranger.student_id })),
        );
    }

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => return db_err(&req.id, &DbError::Query(e)),
    };
    let mut saved = 0usize;
    let mut skipped = 0usize;
    for entry in entries {
        if !existing.contains(entry.student_id.as_str()) && !entry.scores.any_entered() {
            skipped += 1;
            continue;
        }
        let write = MarkWrite {
            student_id: entry.student_id,
            subject_id: subject_id.clone(),
            class_id: class_id.clone(),
            academic_year,
            term,
            bot: entry.scores.bot,
            mot: entry.scores.mot,
            eot: entry.scores.eot,
            points: entry.scores.points,
        };
        if let Err(e) = db::upsert_mark(&tx, &write) {
            let _ = tx.rollback();
            return db_err(&req.id, &e);
        }
        saved += 1;
    }
    if let Err(e) = tx.commit() {
        return db_err(&req.id, &DbError::Query(e));
    }

    info!(
        class_id = %class_id,
        subject_id = %subject_id,
        academic_year,
        term = term.number(),
        saved,
        "class entry saved"
    );
    ok(&req.id, json!({ "saved": saved, "skipped": skipped }))
}

fn handle_marks_entry_sheet(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (academic_year, term): (i64, Term) = match required_period(req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let snapshot = match db::load_class_snapshot(conn, &class_id, academic_year, term) {
        Ok(s) => s,
        Err(e) => return db_err(&req.id, &e),
    };
    match entry_sheet(&snapshot.period(), &subject_id) {
        Some(sheet) => ok_serialized(&req.id, &sheet),
        None => err(&req.id, "not_found", "subject not found", None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "marks.upsert" => Some(handle_marks_upsert(state, req)),
        "marks.saveClassEntry" => Some(handle_marks_save_class_entry(state, req)),
        "marks.entrySheet" => Some(handle_marks_entry_sheet(state, req)),
        _ => None,
    }
}
