use crate::ipc::helpers::{get_str, mutate, HandlerErr};
use crate::ipc::types::Request;
use crate::ops;
use crate::session::Session;

type HandlerResult = Result<serde_json::Value, HandlerErr>;

fn handle_seating_save(session: &mut Session, req: &Request) -> HandlerResult {
    let name = get_str(req, "name")?;
    Ok(mutate(session, req, |s| ops::save_seat_arrangement(s, &name)))
}

fn handle_seating_load(session: &mut Session, req: &Request) -> HandlerResult {
    let arrangement_id = get_str(req, "arrangementId")?;
    Ok(mutate(session, req, |s| {
        ops::load_seat_arrangement(s, &arrangement_id)
    }))
}

fn handle_seating_delete(session: &mut Session, req: &Request) -> HandlerResult {
    let arrangement_id = get_str(req, "arrangementId")?;
    Ok(mutate(session, req, |s| {
        ops::delete_seat_arrangement(s, &arrangement_id)
    }))
}

pub fn try_handle(session: &mut Session, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "seating.save" => handle_seating_save(session, req),
        "seating.load" => handle_seating_load(session, req),
        "seating.delete" => handle_seating_delete(session, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|e| e.response(&req.id)))
}
