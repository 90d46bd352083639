use crate::ipc::error::ok;
use crate::ipc::helpers::{get_str, HandlerErr};
use crate::ipc::types::Request;
use crate::session::Session;
use serde_json::json;
use std::time::Instant;

type HandlerResult = Result<serde_json::Value, HandlerErr>;

fn handle_auth_login(session: &mut Session, req: &Request) -> HandlerResult {
    let uid = get_str(req, "uid")?;
    let status = session.login(uid.trim(), Instant::now())?;
    Ok(ok(&req.id, json!({ "sync": status })))
}

fn handle_auth_logout(session: &mut Session, req: &Request) -> HandlerResult {
    Ok(ok(&req.id, json!({ "sync": session.logout() })))
}

fn handle_sync_status(session: &mut Session, req: &Request) -> HandlerResult {
    Ok(ok(&req.id, json!({ "sync": session.status() })))
}

fn handle_sync_refresh(session: &mut Session, req: &Request) -> HandlerResult {
    let status = session.refresh(Instant::now())?;
    Ok(ok(&req.id, json!({ "sync": status })))
}

pub fn try_handle(session: &mut Session, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "auth.login" => handle_auth_login(session, req),
        "auth.logout" => handle_auth_logout(session, req),
        "sync.status" => handle_sync_status(session, req),
        "sync.refresh" => handle_sync_refresh(session, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|e| e.response(&req.id)))
}
