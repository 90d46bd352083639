use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_str, state_result};
use crate::ipc::types::Request;
use crate::session::Session;
use serde_json::json;
use std::path::PathBuf;
use std::time::Instant;

fn handle_health(session: &mut Session, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": session.workspace().map(|p| p.to_string_lossy().to_string()),
            "sync": session.status(),
        }),
    )
}

fn handle_workspace_select(session: &mut Session, req: &Request) -> serde_json::Value {
    let path = match get_str(req, "path") {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p.trim()),
        _ => return err(&req.id, "bad_params", "missing params.path", None),
    };

    match session.select_workspace(&path, Instant::now()) {
        Ok(()) => ok(
            &req.id,
            json!({
                "workspacePath": path.to_string_lossy(),
                "version": session.version(),
            }),
        ),
        Err(e) => err(
            &req.id,
            "storage_failed",
            format!("{e:#}"),
            Some(json!({ "path": path.to_string_lossy() })),
        ),
    }
}

fn handle_state_get(session: &mut Session, req: &Request) -> serde_json::Value {
    ok(&req.id, state_result(session))
}

pub fn try_handle(session: &mut Session, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(session, req)),
        "workspace.select" => Some(handle_workspace_select(session, req)),
        "state.get" => Some(handle_state_get(session, req)),
        _ => None,
    }
}
