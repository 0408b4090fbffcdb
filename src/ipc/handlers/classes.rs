use chrono::Datelike;
use serde_json::json;
use uuid::Uuid;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, optional_bool, optional_str, optional_year, required_level, required_str, Patch,
};
use crate::ipc::types::{AppState, Request};

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "classes": [] }));
    };

    // Correlated subquery keeps the count independent of other joins.
    let mut stmt = match conn.prepare(
        "SELECT
           c.id,
           c.name,
           c.level,
           c.description,
           c.academic_year,
           c.is_active,
           c.created_at,
           (SELECT COUNT(*) FROM students s WHERE s.class_id = c.id) AS student_count
         FROM classes c
         ORDER BY c.name",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let level: String = row.get(2)?;
            let description: Option<String> = row.get(3)?;
            let academic_year: i64 = row.get(4)?;
            let is_active: i64 = row.get(5)?;
            let created_at: String = row.get(6)?;
            let student_count: i64 = row.get(7)?;
            Ok(json!({
                "id": id,
                "name": name,
                "level": level,
                "description": description,
                "academicYear": academic_year,
                "isActive": is_active != 0,
                "createdAt": created_at,
                "studentCount": student_count
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(classes) => ok(&req.id, json!({ "classes": classes })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_classes_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
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
    let academic_year = match optional_year(req, "academicYear") {
        Ok(v) => v.unwrap_or_else(|| chrono::Local::now().year() as i64),
        Err(e) => return e,
    };
    let is_active = match optional_bool(req, "isActive") {
        Ok(v) => v.unwrap_or(true),
        Err(e) => return e,
    };
    let description = optional_str(req, "description").filter(|s| !s.is_empty());

    let class_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO classes(id, name, level, description, academic_year, is_active)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &class_id,
            &name,
            level.as_str(),
            &description,
            academic_year,
            is_active as i64,
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "classes" })),
        );
    }

    ok(
        &req.id,
        json!({ "classId": class_id, "name": name, "academicYear": academic_year }),
    )
}

fn handle_classes_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let class_id = match required_str(req, "classId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let result = Patch::from_request(req).and_then(|mut patch| {
        patch.text("name", "name")?;
        patch.level("level", "level")?;
        patch.nullable_text("description", "description")?;
        patch.year("academicYear", "academic_year")?;
        patch.flag("isActive", "is_active")?;
        patch.apply(conn, "classes", &class_id, "class")
    });

    match result {
        Ok(()) => ok(&req.id, json!({ "classId": class_id })),
        Err(e) => e,
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        "classes.create" => Some(handle_classes_create(state, req)),
        "classes.update" => Some(handle_classes_update(state, req)),
        _ => None,
    }
}
