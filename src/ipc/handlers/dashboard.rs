use crate::calc::stats::dashboard_summary;
use crate::db::{self, RecordFilter};
use crate::ipc::error::{db_err, ok_serialized};
use crate::ipc::helpers::{db_conn, optional_term, optional_year};
use crate::ipc::types::{AppState, Request};

/// School-wide summary. Without `academicYear`/`term` every stored record
/// counts.
fn handle_dashboard_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
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
    match db::load_school_snapshot(conn, &filter) {
        Ok(snapshot) => ok_serialized(&req.id, &dashboard_summary(&snapshot)),
        Err(e) => db_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.summary" => Some(handle_dashboard_summary(state, req)),
        _ => None,
    }
}
