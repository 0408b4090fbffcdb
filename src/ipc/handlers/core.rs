use serde_json::json;
use std::path::PathBuf;
use tracing::info;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let workspace = state.workspace.as_ref().map(|p| p.display().to_string());
    ok(
        &req.id,
        json!({ "version": env!("CARGO_PKG_VERSION"), "workspacePath": workspace }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    if let Err(e) = state.open_workspace(&path) {
        return err(
            &req.id,
            "db_open_failed",
            format!("{:#}", e),
            Some(json!({ "path": path.display().to_string() })),
        );
    }
    info!(workspace = %path.display(), "workspace opened");
    ok(&req.id, json!({ "workspacePath": path.display().to_string() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
