use super::handlers;
use super::types::Request;
use crate::ipc::error::err;
use crate::session::Session;

pub fn handle_request(session: &mut Session, req: Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(session, &req) {
        return resp;
    }
    if let Some(resp) = handlers::classes::try_handle(session, &req) {
        return resp;
    }
    if let Some(resp) = handlers::students::try_handle(session, &req) {
        return resp;
    }
    if let Some(resp) = handlers::homework::try_handle(session, &req) {
        return resp;
    }
    if let Some(resp) = handlers::seating::try_handle(session, &req) {
        return resp;
    }
    if let Some(resp) = handlers::groups::try_handle(session, &req) {
        return resp;
    }
    if let Some(resp) = handlers::settings::try_handle(session, &req) {
        return resp;
    }
    if let Some(resp) = handlers::backup::try_handle(session, &req) {
        return resp;
    }
    if let Some(resp) = handlers::sync::try_handle(session, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
