use crate::calc::reports::{
    class_mark_sheet, class_ranking, class_report_cards, student_report, subs_mark_sheet,
};
use crate::db::{self, ClassSnapshot};
use crate::ipc::error::{db_err, err, ok, ok_serialized};
use crate::ipc::helpers::{db_conn, required_mark_type, required_period, required_str, Reply};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

/// `classId`, `academicYear` and `term` resolved into a loaded class period.
fn class_snapshot(state: &AppState, req: &Request) -> Reply<ClassSnapshot> {
    let conn = db_conn(state, req)?;
    let class_id = required_str(req, "classId")?;
    let (academic_year, term) = required_period(req)?;
    db::load_class_snapshot(conn, &class_id, academic_year, term).map_err(|e| db_err(&req.id, &e))
}

fn handle_student_report(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (academic_year, term) = match required_period(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let (student, snapshot) =
        match db::load_student_snapshot(conn, &student_id, academic_year, term) {
            Ok(v) => v,
            Err(e) => return db_err(&req.id, &e),
        };
    match student_report(&snapshot.period(), &student.id) {
        Some(report) => ok_serialized(&req.id, &report),
        None => err(&req.id, "not_found", "student not found", None),
    }
}

fn handle_class_report_cards(state: &mut AppState, req: &Request) -> serde_json::Value {
    match class_snapshot(state, req) {
        Ok(snapshot) => {
            let reports = class_report_cards(&snapshot.period());
            ok(&req.id, json!({ "reports": reports }))
        }
        Err(e) => e,
    }
}

fn handle_class_mark_sheet(state: &mut AppState, req: &Request) -> serde_json::Value {
    match class_snapshot(state, req) {
        Ok(snapshot) => ok_serialized(&req.id, &class_mark_sheet(&snapshot.period())),
        Err(e) => e,
    }
}

fn handle_subs_mark_sheet(state: &mut AppState, req: &Request) -> serde_json::Value {
    let mark_type = match required_mark_type(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match class_snapshot(state, req) {
        Ok(snapshot) => ok_serialized(&req.id, &subs_mark_sheet(&snapshot.period(), mark_type)),
        Err(e) => e,
    }
}

fn handle_class_ranking(state: &mut AppState, req: &Request) -> serde_json::Value {
    match class_snapshot(state, req) {
        Ok(snapshot) => ok_serialized(&req.id, &class_ranking(&snapshot.period())),
        Err(e) => e,
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.studentReport" => Some(handle_student_report(state, req)),
        "reports.classReportCards" => Some(handle_class_report_cards(state, req)),
        "reports.classMarkSheet" => Some(handle_class_mark_sheet(state, req)),
        "reports.subsMarkSheet" => Some(handle_subs_mark_sheet(state, req)),
        "reports.classRanking" => Some(handle_class_ranking(state, req)),
        _ => None,
    }
}
