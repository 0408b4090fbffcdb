use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::calc::EducationLevel;
use crate::db;
use crate::ipc::error::{db_err, err, ok, ok_serialized};
use crate::ipc::helpers::{db_conn, optional_level, optional_str, required_str, Patch, Reply};
use crate::ipc::types::{AppState, Request};

/// Class level, or `not_found`.
fn class_level(conn: &Connection, req: &Request, class_id: &str) -> Reply<EducationLevel> {
    db::get_class(conn, class_id)
        .map(|c| c.level)
        .map_err(|e| db_err(&req.id, &e))
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "students": [] }));
    };
    let class_id = optional_str(req, "classId");
    match db::list_students(conn, class_id.as_deref()) {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(e) => db_err(&req.id, &e),
    }
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::get_student(conn, &student_id) {
        Ok(s) => ok_serialized(&req.id, &s),
        Err(e) => db_err(&req.id, &e),
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let full_name = match required_str(req, "fullName") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_number = match required_str(req, "studentNumber") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let default_level = match class_level(conn, req, &class_id) {
        Ok(v) => v,
        Err(e) => return e,
    };
    // Level follows the class unless given explicitly.
    let level = match optional_level(req) {
        Ok(v) => v.unwrap_or(default_level),
        Err(e) => return e,
    };

    let taken: Option<String> = match conn
        .query_row(
            "SELECT id FROM students WHERE student_number = ?",
            [&student_number],
            |r| r.get(0),
        )
        .optional()
    {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if taken.is_some() {
        return err(
            &req.id,
            "bad_params",
            "studentNumber already in use",
            Some(json!({ "studentNumber": student_number })),
        );
    }

    let student_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO students(id, class_id, student_number, full_name, level)
         VALUES(?, ?, ?, ?, ?)",
        (
            &student_id,
            &class_id,
            &student_number,
            &full_name,
            level.as_str(),
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "students" })),
        );
    }

    ok(&req.id, json!({ "studentId": student_id }))
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let result = Patch::from_request(req).and_then(|mut patch| {
        if let Some(cid) = patch.get("classId").and_then(|v| v.as_str()) {
            class_level(conn, req, cid.trim())?;
        }
        patch.text("fullName", "full_name")?;
        patch.text("studentNumber", "student_number")?;
        patch.text("classId", "class_id")?;
        patch.level("level", "level")?;
        patch.apply(conn, "students", &student_id, "student")
    });

    match result {
        Ok(()) => ok(&req.id, json!({ "studentId": student_id })),
        Err(e) => e,
    }
}

/// Removes the student together with every mark they hold.
fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::delete_student(conn, &student_id) {
        Ok(marks_deleted) => {
            info!(student_id = %student_id, marks_deleted, "student deleted");
            ok(
                &req.id,
                json!({ "studentId": student_id, "marksDeleted": marks_deleted }),
            )
        }
        Err(e) => db_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        _ => None,
    }
}
