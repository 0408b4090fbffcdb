use rusqlite::OptionalExtension;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::calc::stats::subject_statistics;
use crate::db::{self, RecordFilter, SubjectRemoval};
use crate::ipc::error::{db_err, err, ok, ok_serialized};
use crate::ipc::helpers::{
    db_conn, optional_bool, optional_level, optional_str, optional_term, optional_year,
    required_level, required_str, Patch,
};
use crate::ipc::types::{AppState, Request};

fn handle_subjects_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "subjects": [] }));
    };
    let level = match optional_level(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut stmt = match conn.prepare(
        "SELECT id, code, name, level, description, is_active, created_at
         FROM subjects
         WHERE (?1 IS NULL OR level = ?1)
         ORDER BY name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([level.map(|l| l.as_str())], |row| {
            let id: String = row.get(0)?;
            let code: String = row.get(1)?;
            let name: String = row.get(2)?;
            let level: String = row.get(3)?;
            let description: Option<String> = row.get(4)?;
            let is_active: i64 = row.get(5)?;
            let created_at: String = row.get(6)?;
            Ok(json!({
                "id": id,
                "code": code,
                "name": name,
                "level": level,
                "description": description,
                "isActive": is_active != 0,
                "createdAt": created_at
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(subjects) => ok(&req.id, json!({ "subjects": subjects })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_subjects_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let code = match required_str(req, "code") {
        Ok(v) => v.to_ascii_uppercase(),
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let level = match required_level(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let is_active = match optional_bool(req, "isActive") {
        Ok(v) => v.unwrap_or(true),
        Err(e) => return e,
    };
    let description = optional_str(req, "description").filter(|s| !s.is_empty());

    let taken: Option<String> = match conn
        .query_row("SELECT id FROM subjects WHERE code = ?", [&code], |r| {
            r.get(0)
        })
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if taken.is_some() {
        return err(
            &req.id,
            "bad_params",
            "subject code already in use",
            Some(json!({ "code": code })),
        );
    }

    let subject_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO subjects(id, code, name, level, description, is_active)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &subject_id,
            &code,
            &name,
            level.as_str(),
            &description,
            is_active as i64,
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "subjects" })),
        );
    }

    ok(&req.id, json!({ "subjectId": subject_id, "code": code }))
}

fn handle_subjects_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let result = Patch::from_request(req).and_then(|mut patch| {
        patch.text("code", "code")?;
        patch.text("name", "name")?;
        patch.level("level", "level")?;
        patch.nullable_text("description", "description")?;
        patch.flag("isActive", "is_active")?;
        patch.apply(conn, "subjects", &subject_id, "subject")
    });

    match result {
        Ok(()) => ok(&req.id, json!({ "subjectId": subject_id })),
        Err(e) => e,
    }
}

/// One subject when `subjectId` is given, otherwise every subject (optionally
/// of one level). Records can be narrowed to a year and term.
fn handle_subjects_statistics(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let subject_id = optional_str(req, "subjectId");
    let level = match optional_level(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let filter = RecordFilter {
        academic_year: match optional_year(req, "academicYear") {
            Ok(v) => v,
            Err(e) => return e,
        },
        term: match optional_term(req) {
            Ok(v) => v,
            Err(e) => return e,
        },
    };

    let snapshot = match db::load_school_snapshot(conn, &filter) {
        Ok(s) => s,
        Err(e) => return db_err(&req.id, &e),
    };

    if let Some(sid) = subject_id {
        let Some(subject) = snapshot.subjects.iter().find(|s| s.id == sid) else {
            return err(&req.id, "not_found", "subject not found", None);
        };
        return ok_serialized(&req.id, &subject_statistics(subject, &snapshot));
    }

    let stats: Vec<_> = snapshot
        .subjects
        .iter()
        .filter(|s| level.map(|l| s.level == l).unwrap_or(true))
        .map(|s| subject_statistics(s, &snapshot))
        .collect();
    ok(&req.id, json!({ "subjects": stats }))
}

fn handle_subjects_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::delete_subject(conn, &subject_id) {
        Ok(removal) => {
            info!(subject_id = %subject_id, ?removal, "subject removed");
            ok(
                &req.id,
                json!({
                    "subjectId": subject_id,
                    "deleted": removal == SubjectRemoval::Deleted,
                    "deactivated": removal == SubjectRemoval::Deactivated,
                }),
            )
        }
        Err(e) => db_err(&req.id, &e),
    }
}

fn handle_subjects_activate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let subject_id = match required_str(req, "subjectId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::set_subject_active(conn, &subject_id, true) {
        Ok(()) => ok(&req.id, json!({ "subjectId": subject_id, "isActive": true })),
        Err(e) => db_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "subjects.list" => Some(handle_subjects_list(state, req)),
        "subjects.create" => Some(handle_subjects_create(state, req)),
        "subjects.update" => Some(handle_subjects_update(state, req)),
        "subjects.statistics" => Some(handle_subjects_statistics(state, req)),
        "subjects.delete" => Some(handle_subjects_delete(state, req)),
        "subjects.activate" => Some(handle_subjects_activate(state, req)),
        _ => None,
    }
}
